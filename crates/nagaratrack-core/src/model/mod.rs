//! Canonical data model
//!
//! The shapes every data source (mock store, live backend) is normalized
//! into before anything downstream sees it.

mod geojson;
mod normalize;

pub use geojson::{
    routes_from_feature_collection, routes_to_feature_collection, stops_from_feature_collection,
    stops_to_feature_collection,
};
pub use normalize::{
    normalize_route, normalize_routes, normalize_status, normalize_stop, normalize_stops,
    normalize_vehicle, normalize_vehicles,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default route color when the source provides none
pub const DEFAULT_ROUTE_COLOR: &str = "#2563eb";

/// Operational status of a vehicle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VehicleStatus {
    /// Moving between stops
    InTransit,
    /// Dwelling at a stop
    AtStop,
    /// Running behind schedule
    Delayed,
    /// Not reporting; the simulator never touches offline vehicles
    Offline,
}

impl VehicleStatus {
    /// Canonical lowercase string form (`in_transit`, `at_stop`, ...)
    pub fn as_str(&self) -> &'static str {
        match self {
            VehicleStatus::InTransit => "in_transit",
            VehicleStatus::AtStop => "at_stop",
            VehicleStatus::Delayed => "delayed",
            VehicleStatus::Offline => "offline",
        }
    }
}

/// A tracked vehicle with its last known GPS fix
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    /// Vehicle identifier (registration number or device id)
    pub id: String,
    /// Assigned route, if any
    pub route_id: Option<String>,
    /// Latitude in WGS84 degrees
    pub latitude: f64,
    /// Longitude in WGS84 degrees
    pub longitude: f64,
    /// Compass heading in degrees, 0 = north, clockwise
    pub bearing: f64,
    /// Ground speed in km/h, never negative
    pub speed_kmh: f64,
    /// Operational status
    pub status: VehicleStatus,
    /// Wall-clock time of the last position or status update
    pub last_updated: DateTime<Utc>,
}

/// A bus stop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stop {
    /// Stop identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// Latitude in WGS84 degrees
    pub latitude: f64,
    /// Longitude in WGS84 degrees
    pub longitude: f64,
    /// Identifiers of routes serving this stop
    pub routes: Vec<String>,
    /// Whether the stop is wheelchair accessible
    pub accessibility: bool,
}

/// A bus route with its display polyline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    /// Route identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// Display color as a hex string, e.g. `#2563eb`
    pub color: String,
    /// Whether the route is currently operating
    pub is_active: bool,
    /// Ordered, directional (latitude, longitude) pairs describing the path
    pub coordinates: Vec<(f64, f64)>,
    /// Identifiers of stops on this route, in route order
    pub stops: Vec<String>,
}

/// Partial stop used for creation; every field is optional and defaulted
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StopDraft {
    /// Explicit identifier; a synthetic one is assigned when absent
    pub id: Option<String>,
    /// Display name
    pub name: Option<String>,
    /// Latitude in WGS84 degrees
    pub latitude: Option<f64>,
    /// Longitude in WGS84 degrees
    pub longitude: Option<f64>,
    /// Serving route identifiers
    pub routes: Option<Vec<String>>,
    /// Accessibility flag, defaults to true
    pub accessibility: Option<bool>,
}

/// Merge-patch for an existing stop; `None` fields are left untouched
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StopPatch {
    /// New display name
    pub name: Option<String>,
    /// New latitude
    pub latitude: Option<f64>,
    /// New longitude
    pub longitude: Option<f64>,
    /// New serving-route set
    pub routes: Option<Vec<String>>,
    /// New accessibility flag
    pub accessibility: Option<bool>,
}

/// Partial route used for creation
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RouteDraft {
    /// Explicit identifier; a synthetic one is assigned when absent
    pub id: Option<String>,
    /// Display name
    pub name: Option<String>,
    /// Display color
    pub color: Option<String>,
    /// Active flag, defaults to true
    pub is_active: Option<bool>,
    /// Ordered (latitude, longitude) path
    pub coordinates: Option<Vec<(f64, f64)>>,
    /// Stop identifiers in route order
    pub stops: Option<Vec<String>>,
}

/// Merge-patch for an existing route
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RoutePatch {
    /// New display name
    pub name: Option<String>,
    /// New display color
    pub color: Option<String>,
    /// New active flag
    pub is_active: Option<bool>,
    /// New path
    pub coordinates: Option<Vec<(f64, f64)>>,
    /// New stop set
    pub stops: Option<Vec<String>>,
}

/// Partial vehicle used for creation
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VehicleDraft {
    /// Explicit identifier; a synthetic one is assigned when absent
    pub id: Option<String>,
    /// Assigned route
    pub route_id: Option<String>,
    /// Latitude in WGS84 degrees
    pub latitude: Option<f64>,
    /// Longitude in WGS84 degrees
    pub longitude: Option<f64>,
    /// Compass heading in degrees
    pub bearing: Option<f64>,
    /// Ground speed in km/h
    pub speed_kmh: Option<f64>,
    /// Initial status, defaults to in_transit
    pub status: Option<VehicleStatus>,
}

/// Merge-patch for an existing vehicle
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VehiclePatch {
    /// New route assignment (`Some(None)` clears it)
    pub route_id: Option<Option<String>>,
    /// New latitude
    pub latitude: Option<f64>,
    /// New longitude
    pub longitude: Option<f64>,
    /// New bearing
    pub bearing: Option<f64>,
    /// New speed
    pub speed_kmh: Option<f64>,
    /// New status; this is the only way a vehicle enters or leaves `offline`
    pub status: Option<VehicleStatus>,
}

impl Stop {
    /// Build a stop from a draft, filling defaults for missing fields.
    /// Creation never fails validation.
    pub fn from_draft(id: String, draft: StopDraft) -> Self {
        Stop {
            id,
            name: draft.name.unwrap_or_default(),
            latitude: draft.latitude.unwrap_or(0.0),
            longitude: draft.longitude.unwrap_or(0.0),
            routes: draft.routes.unwrap_or_default(),
            accessibility: draft.accessibility.unwrap_or(true),
        }
    }

    /// Apply a merge-patch in place
    pub fn apply(&mut self, patch: StopPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(lat) = patch.latitude {
            self.latitude = lat;
        }
        if let Some(lon) = patch.longitude {
            self.longitude = lon;
        }
        if let Some(routes) = patch.routes {
            self.routes = routes;
        }
        if let Some(acc) = patch.accessibility {
            self.accessibility = acc;
        }
    }
}

impl Route {
    /// Build a route from a draft, filling defaults for missing fields
    pub fn from_draft(id: String, draft: RouteDraft) -> Self {
        Route {
            id,
            name: draft.name.unwrap_or_default(),
            color: draft.color.unwrap_or_else(|| DEFAULT_ROUTE_COLOR.to_string()),
            is_active: draft.is_active.unwrap_or(true),
            coordinates: draft.coordinates.unwrap_or_default(),
            stops: draft.stops.unwrap_or_default(),
        }
    }

    /// Apply a merge-patch in place
    pub fn apply(&mut self, patch: RoutePatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(color) = patch.color {
            self.color = color;
        }
        if let Some(active) = patch.is_active {
            self.is_active = active;
        }
        if let Some(coords) = patch.coordinates {
            self.coordinates = coords;
        }
        if let Some(stops) = patch.stops {
            self.stops = stops;
        }
    }
}

impl Vehicle {
    /// Build a vehicle from a draft, filling defaults for missing fields
    pub fn from_draft(id: String, draft: VehicleDraft, now: DateTime<Utc>) -> Self {
        Vehicle {
            id,
            route_id: draft.route_id,
            latitude: draft.latitude.unwrap_or(0.0),
            longitude: draft.longitude.unwrap_or(0.0),
            bearing: draft.bearing.unwrap_or(0.0),
            speed_kmh: draft.speed_kmh.unwrap_or(0.0).max(0.0),
            status: draft.status.unwrap_or(VehicleStatus::InTransit),
            last_updated: now,
        }
    }

    /// Apply a merge-patch in place, bumping the update timestamp
    pub fn apply(&mut self, patch: VehiclePatch, now: DateTime<Utc>) {
        if let Some(route_id) = patch.route_id {
            self.route_id = route_id;
        }
        if let Some(lat) = patch.latitude {
            self.latitude = lat;
        }
        if let Some(lon) = patch.longitude {
            self.longitude = lon;
        }
        if let Some(bearing) = patch.bearing {
            self.bearing = bearing;
        }
        if let Some(speed) = patch.speed_kmh {
            self.speed_kmh = speed.max(0.0);
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        self.last_updated = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for status in [
            VehicleStatus::InTransit,
            VehicleStatus::AtStop,
            VehicleStatus::Delayed,
            VehicleStatus::Offline,
        ] {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
            let back: VehicleStatus = serde_json::from_str(&json).unwrap();
            assert_eq!(back, status);
        }
    }

    #[test]
    fn test_stop_from_empty_draft_uses_defaults() {
        let stop = Stop::from_draft("BTS001".into(), StopDraft::default());
        assert_eq!(stop.name, "");
        assert!(stop.accessibility);
        assert!(stop.routes.is_empty());
    }

    #[test]
    fn test_vehicle_patch_clears_route() {
        let now = Utc::now();
        let mut v = Vehicle::from_draft(
            "BUS001".into(),
            VehicleDraft {
                route_id: Some("RT001".into()),
                ..Default::default()
            },
            now,
        );
        v.apply(
            VehiclePatch {
                route_id: Some(None),
                ..Default::default()
            },
            now,
        );
        assert_eq!(v.route_id, None);
    }

    #[test]
    fn test_vehicle_speed_never_negative() {
        let now = Utc::now();
        let mut v = Vehicle::from_draft(
            "BUS001".into(),
            VehicleDraft {
                speed_kmh: Some(-12.0),
                ..Default::default()
            },
            now,
        );
        assert_eq!(v.speed_kmh, 0.0);
        v.apply(
            VehiclePatch {
                speed_kmh: Some(-3.0),
                ..Default::default()
            },
            now,
        );
        assert_eq!(v.speed_kmh, 0.0);
    }
}
