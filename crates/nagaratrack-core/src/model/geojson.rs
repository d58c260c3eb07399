//! GeoJSON encode/decode for stops and routes
//!
//! Stops travel as a FeatureCollection of Point features, routes as a
//! FeatureCollection of LineString features. GeoJSON orders coordinates
//! `[longitude, latitude]`; that ordering is preserved on the wire and
//! flipped only when crossing into the canonical (lat, lon) model types.

use geojson::{Feature, FeatureCollection, Geometry, JsonObject, Value as GeoValue};
use serde_json::{json, Value};

use super::{normalize_route, normalize_stop, Route, Stop};

/// Encode stops as a FeatureCollection of Point features with
/// `stop_id`, `stop_name`, `routes`, and `accessibility` properties
pub fn stops_to_feature_collection(stops: &[Stop]) -> FeatureCollection {
    let features = stops
        .iter()
        .map(|stop| {
            let mut properties = JsonObject::new();
            properties.insert("stop_id".into(), json!(stop.id));
            properties.insert("stop_name".into(), json!(stop.name));
            properties.insert("routes".into(), json!(stop.routes));
            properties.insert("accessibility".into(), json!(stop.accessibility));
            Feature {
                bbox: None,
                geometry: Some(Geometry::new(GeoValue::Point(vec![
                    stop.longitude,
                    stop.latitude,
                ]))),
                id: None,
                properties: Some(properties),
                foreign_members: None,
            }
        })
        .collect();
    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

/// Decode stops from a FeatureCollection, skipping features without a
/// Point geometry or a usable `stop_id`
pub fn stops_from_feature_collection(fc: &FeatureCollection) -> Vec<Stop> {
    fc.features
        .iter()
        .filter_map(|feature| {
            let position = match feature.geometry.as_ref().map(|g| &g.value) {
                Some(GeoValue::Point(pos)) if pos.len() >= 2 => pos,
                _ => return None,
            };
            let mut record = properties_value(feature);
            // Geometry wins over any positional properties
            record["longitude"] = json!(position[0]);
            record["latitude"] = json!(position[1]);
            normalize_stop(&record)
        })
        .collect()
}

/// Encode routes as a FeatureCollection of LineString features with
/// `route_id`, `route_name`, `route_color`, `is_active`, and `stops`
/// properties. Path coordinates are emitted `[lon, lat]`.
pub fn routes_to_feature_collection(routes: &[Route]) -> FeatureCollection {
    let features = routes
        .iter()
        .map(|route| {
            let mut properties = JsonObject::new();
            properties.insert("route_id".into(), json!(route.id));
            properties.insert("route_name".into(), json!(route.name));
            properties.insert("route_color".into(), json!(route.color));
            properties.insert("is_active".into(), json!(route.is_active));
            properties.insert("stops".into(), json!(route.stops));
            let line = route
                .coordinates
                .iter()
                .map(|(lat, lon)| vec![*lon, *lat])
                .collect();
            Feature {
                bbox: None,
                geometry: Some(Geometry::new(GeoValue::LineString(line))),
                id: None,
                properties: Some(properties),
                foreign_members: None,
            }
        })
        .collect();
    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

/// Decode routes from a FeatureCollection, flipping `[lon, lat]`
/// positions back to (lat, lon) pairs
pub fn routes_from_feature_collection(fc: &FeatureCollection) -> Vec<Route> {
    fc.features
        .iter()
        .filter_map(|feature| {
            let mut record = properties_value(feature);
            if let Some(GeoValue::LineString(line)) = feature.geometry.as_ref().map(|g| &g.value) {
                let pairs: Vec<Vec<f64>> = line
                    .iter()
                    .filter(|pos| pos.len() >= 2)
                    .map(|pos| vec![pos[1], pos[0]])
                    .collect();
                record["coordinates"] = json!(pairs);
            }
            normalize_route(&record)
        })
        .collect()
}

fn properties_value(feature: &Feature) -> Value {
    match &feature.properties {
        Some(map) => Value::Object(map.clone()),
        None => json!({}),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample_stop() -> Stop {
        Stop {
            id: "BTS001".into(),
            name: "Central Station".into(),
            latitude: 28.6139,
            longitude: 77.209,
            routes: vec!["RT001".into()],
            accessibility: true,
        }
    }

    #[test]
    fn test_stop_point_is_lon_lat() {
        let fc = stops_to_feature_collection(&[sample_stop()]);
        let geometry = fc.features[0].geometry.as_ref().unwrap();
        match &geometry.value {
            GeoValue::Point(pos) => {
                assert_eq!(pos[0], 77.209); // longitude first
                assert_eq!(pos[1], 28.6139);
            }
            other => panic!("expected Point, got {other:?}"),
        }
    }

    #[test]
    fn test_stops_round_trip() {
        let stops = vec![sample_stop()];
        let decoded = stops_from_feature_collection(&stops_to_feature_collection(&stops));
        assert_eq!(decoded, stops);
    }

    #[test]
    fn test_routes_round_trip_flips_ordering() {
        let route = Route {
            id: "RT001".into(),
            name: "Ring Road".into(),
            color: "#0066CC".into(),
            is_active: true,
            coordinates: vec![(28.60, 77.20), (28.62, 77.23)],
            stops: vec!["BTS001".into(), "BTS002".into()],
        };
        let fc = routes_to_feature_collection(std::slice::from_ref(&route));
        match &fc.features[0].geometry.as_ref().unwrap().value {
            GeoValue::LineString(line) => assert_eq!(line[0], vec![77.20, 28.60]),
            other => panic!("expected LineString, got {other:?}"),
        }
        let decoded = routes_from_feature_collection(&fc);
        assert_eq!(decoded, vec![route]);
    }

    #[test]
    fn test_feature_without_geometry_is_skipped() {
        let mut fc = stops_to_feature_collection(&[sample_stop()]);
        fc.features[0].geometry = None;
        assert!(stops_from_feature_collection(&fc).is_empty());
    }
}
