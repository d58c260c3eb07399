//! Backend response normalization
//!
//! The live backend (and older CSV exports it serves) uses several names for
//! the same field. Each entity gets one dedicated normalization function with
//! a documented precedence order per field, so the coalescing is explicit
//! rather than scattered through call sites.
//!
//! Missing optional fields coerce to defaults and never error. A record with
//! no usable coordinates is unusable and is skipped by the list normalizers.

use chrono::{DateTime, Utc};
use serde_json::Value;

use super::{Route, Stop, Vehicle, VehicleStatus, DEFAULT_ROUTE_COLOR};

/// Field aliases for latitude, in precedence order
const LAT_KEYS: &[&str] = &["latitude", "lat", "last_lat", "stop_lat"];
/// Field aliases for longitude, in precedence order
const LON_KEYS: &[&str] = &["longitude", "lon", "lng", "last_lon", "stop_lon"];

/// Map a status string onto the canonical enum.
///
/// The four canonical names pass through; the legacy backend's
/// `active` maps to in_transit and `inactive`/`not active` to offline.
/// Anything unrecognized defaults to in_transit.
pub fn normalize_status(raw: &str) -> VehicleStatus {
    match raw.trim().to_ascii_lowercase().as_str() {
        "in_transit" | "active" => VehicleStatus::InTransit,
        "at_stop" => VehicleStatus::AtStop,
        "delayed" => VehicleStatus::Delayed,
        "offline" | "inactive" | "not active" => VehicleStatus::Offline,
        _ => VehicleStatus::InTransit,
    }
}

/// Normalize one vehicle record.
///
/// Precedence: id `vehicle_id` > `device_id` > `id`; speed `speed` >
/// `last_speed`; bearing `bearing` > `last_heading` > `heading`; timestamp
/// `last_updated` > `updated_at`. Returns `None` when there is no usable
/// id or position.
pub fn normalize_vehicle(value: &Value) -> Option<Vehicle> {
    let id = first_string(value, &["vehicle_id", "device_id", "id"])?;
    let latitude = first_f64(value, LAT_KEYS)?;
    let longitude = first_f64(value, LON_KEYS)?;
    let status = first_string(value, &["status"])
        .map(|s| normalize_status(&s))
        .unwrap_or(VehicleStatus::InTransit);
    let last_updated = first_string(value, &["last_updated", "updated_at"])
        .and_then(|s| parse_timestamp(&s))
        .unwrap_or_else(Utc::now);

    Some(Vehicle {
        id,
        route_id: first_string(value, &["route_id"]).filter(|s| !s.is_empty()),
        latitude,
        longitude,
        bearing: first_f64(value, &["bearing", "last_heading", "heading"]).unwrap_or(0.0),
        speed_kmh: first_f64(value, &["speed", "last_speed"]).unwrap_or(0.0).max(0.0),
        status,
        last_updated,
    })
}

/// Normalize an array of vehicle records, skipping unusable entries
pub fn normalize_vehicles(value: &Value) -> Vec<Vehicle> {
    normalize_list(value, normalize_vehicle)
}

/// Normalize one stop record.
///
/// Precedence: id `stop_id` > `id`; name `name` > `stop_name`.
/// `accessibility` accepts booleans or the strings `true`/`1`/`yes`
/// and defaults to true. Returns `None` without a usable id or position.
pub fn normalize_stop(value: &Value) -> Option<Stop> {
    let id = first_string(value, &["stop_id", "id"])?;
    let latitude = first_f64(value, LAT_KEYS)?;
    let longitude = first_f64(value, LON_KEYS)?;

    Some(Stop {
        id,
        name: first_string(value, &["name", "stop_name"]).unwrap_or_default(),
        latitude,
        longitude,
        routes: string_list(value, "routes"),
        accessibility: first_bool(value, &["accessibility"]).unwrap_or(true),
    })
}

/// Normalize an array of stop records, skipping unusable entries
pub fn normalize_stops(value: &Value) -> Vec<Stop> {
    normalize_list(value, normalize_stop)
}

/// Normalize one route record.
///
/// Precedence: id `route_id` > `id`; name `route_name` > `name` >
/// `route_long_name` > `route_short_name`; color `route_color` > `color`
/// with a fixed default. `coordinates` accepts an array of `[lat, lon]`
/// pairs or the same JSON-encoded as a string (CSV heritage).
pub fn normalize_route(value: &Value) -> Option<Route> {
    let id = first_string(value, &["route_id", "id"])?;

    Some(Route {
        id,
        name: first_string(
            value,
            &["route_name", "name", "route_long_name", "route_short_name"],
        )
        .unwrap_or_default(),
        color: first_string(value, &["route_color", "color"])
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| DEFAULT_ROUTE_COLOR.to_string()),
        is_active: first_bool(value, &["is_active"]).unwrap_or(true),
        coordinates: coordinate_pairs(value, "coordinates"),
        stops: string_list(value, "stops"),
    })
}

/// Normalize an array of route records, skipping unusable entries
pub fn normalize_routes(value: &Value) -> Vec<Route> {
    normalize_list(value, normalize_route)
}

fn normalize_list<T>(value: &Value, one: impl Fn(&Value) -> Option<T>) -> Vec<T> {
    match value.as_array() {
        Some(rows) => rows.iter().filter_map(one).collect(),
        None => Vec::new(),
    }
}

/// First present key as a string; numbers are stringified
fn first_string(value: &Value, keys: &[&str]) -> Option<String> {
    for key in keys {
        match value.get(key) {
            Some(Value::String(s)) if !s.trim().is_empty() => return Some(s.trim().to_string()),
            Some(Value::Number(n)) => return Some(n.to_string()),
            _ => continue,
        }
    }
    None
}

/// First present key as a finite f64; numeric strings are parsed
fn first_f64(value: &Value, keys: &[&str]) -> Option<f64> {
    for key in keys {
        let parsed = match value.get(key) {
            Some(Value::Number(n)) => n.as_f64(),
            Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        if let Some(v) = parsed.filter(|v| v.is_finite()) {
            return Some(v);
        }
    }
    None
}

/// First present key as a bool; accepts `true`/`1`/`yes` strings
fn first_bool(value: &Value, keys: &[&str]) -> Option<bool> {
    for key in keys {
        match value.get(key) {
            Some(Value::Bool(b)) => return Some(*b),
            Some(Value::String(s)) => {
                return Some(matches!(
                    s.trim().to_ascii_lowercase().as_str(),
                    "true" | "1" | "yes"
                ))
            }
            Some(Value::Number(n)) => return Some(n.as_f64().unwrap_or(0.0) != 0.0),
            _ => continue,
        }
    }
    None
}

/// A list of strings, given either as a JSON array or a JSON-encoded string
fn string_list(value: &Value, key: &str) -> Vec<String> {
    let raw = match value.get(key) {
        Some(Value::Array(items)) => {
            return items
                .iter()
                .filter_map(|v| match v {
                    Value::String(s) => Some(s.clone()),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                })
                .collect()
        }
        Some(Value::String(s)) => s.clone(),
        _ => return Vec::new(),
    };
    serde_json::from_str::<Vec<Value>>(&raw)
        .map(|items| {
            items
                .iter()
                .filter_map(|v| match v {
                    Value::String(s) => Some(s.clone()),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default()
}

/// `[lat, lon]` pairs, given either as a JSON array or a JSON-encoded string
fn coordinate_pairs(value: &Value, key: &str) -> Vec<(f64, f64)> {
    let parsed: Option<Vec<Vec<f64>>> = match value.get(key) {
        Some(Value::Array(_)) => {
            serde_json::from_value(value.get(key).cloned().unwrap_or(Value::Null)).ok()
        }
        Some(Value::String(s)) => serde_json::from_str(s).ok(),
        _ => None,
    };
    parsed
        .unwrap_or_default()
        .into_iter()
        .filter_map(|pair| match pair.as_slice() {
            [a, b] if a.is_finite() && b.is_finite() => Some((*a, *b)),
            _ => None,
        })
        .collect()
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|| {
            // Naive ISO-8601 without an offset; treat as UTC
            chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|naive| naive.and_utc())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_vehicle_field_precedence() {
        let v = normalize_vehicle(&json!({
            "vehicle_id": "BUS001",
            "device_id": "ignored",
            "latitude": 28.61,
            "lat": 99.0,
            "lon": 77.21,
            "last_speed": 24.5,
            "last_heading": 90.0,
            "status": "active",
            "updated_at": "2025-09-15T08:30:00Z"
        }))
        .unwrap();
        assert_eq!(v.id, "BUS001");
        assert_eq!(v.latitude, 28.61);
        assert_eq!(v.longitude, 77.21);
        assert_eq!(v.speed_kmh, 24.5);
        assert_eq!(v.bearing, 90.0);
        assert_eq!(v.status, VehicleStatus::InTransit);
    }

    #[test]
    fn test_vehicle_missing_position_is_skipped() {
        let rows = json!([
            { "vehicle_id": "BUS001", "lat": 28.6, "lon": 77.2 },
            { "vehicle_id": "BUS002", "lon": 77.2 },
            { "vehicle_id": "BUS003", "lat": "not-a-number", "lon": 77.2 }
        ]);
        let vehicles = normalize_vehicles(&rows);
        assert_eq!(vehicles.len(), 1);
        assert_eq!(vehicles[0].id, "BUS001");
    }

    #[test]
    fn test_numeric_strings_are_parsed() {
        let stop = normalize_stop(&json!({
            "stop_id": "BTS001",
            "stop_name": "Central Station",
            "latitude": "28.613900",
            "longitude": "77.209000",
            "accessibility": "True"
        }))
        .unwrap();
        assert_eq!(stop.latitude, 28.6139);
        assert_eq!(stop.name, "Central Station");
        assert!(stop.accessibility);
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(normalize_status("in_transit"), VehicleStatus::InTransit);
        assert_eq!(normalize_status("at_stop"), VehicleStatus::AtStop);
        assert_eq!(normalize_status("Delayed"), VehicleStatus::Delayed);
        assert_eq!(normalize_status("offline"), VehicleStatus::Offline);
        assert_eq!(normalize_status("not active"), VehicleStatus::Offline);
        assert_eq!(normalize_status("active"), VehicleStatus::InTransit);
        assert_eq!(normalize_status("???"), VehicleStatus::InTransit);
    }

    #[test]
    fn test_route_coordinates_from_json_string() {
        let route = normalize_route(&json!({
            "route_id": "RT001",
            "route_name": "Ring Road",
            "coordinates": "[[28.60, 77.20], [28.62, 77.23]]",
            "stops": "[\"BTS001\", \"BTS002\"]"
        }))
        .unwrap();
        assert_eq!(route.coordinates, vec![(28.60, 77.20), (28.62, 77.23)]);
        assert_eq!(route.stops, vec!["BTS001", "BTS002"]);
        assert_eq!(route.color, DEFAULT_ROUTE_COLOR);
    }

    #[test]
    fn test_naive_timestamp_is_accepted() {
        let v = normalize_vehicle(&json!({
            "vehicle_id": "BUS001",
            "lat": 28.6,
            "lon": 77.2,
            "last_updated": "2025-09-15T08:30:00.123456"
        }))
        .unwrap();
        assert_eq!(v.last_updated.to_rfc3339(), "2025-09-15T08:30:00.123456+00:00");
    }
}
