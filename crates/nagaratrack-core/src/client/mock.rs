//! Mock data store
//!
//! Stands in for the backend with no network dependency. Collections are
//! seeded from bundled JSON documents, every operation simulates a little
//! latency, and mutations happen purely in memory.
//!
//! Lookups on unknown identifiers are explicit negative results
//! (`None` / `false`), never errors. Creation accepts partial entities and
//! never fails validation.

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use geojson::FeatureCollection;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::import::{ImportMode, ImportSummary};
use crate::model::{
    normalize_routes, normalize_stops, normalize_vehicles, routes_to_feature_collection,
    stops_to_feature_collection, Route, RouteDraft, RoutePatch, Stop, StopDraft, StopPatch,
    Vehicle, VehicleDraft, VehiclePatch,
};

/// Simulated latency applied before every operation resolves
pub const DEFAULT_LATENCY: Duration = Duration::from_millis(300);

/// Synthetic id prefix for stops
const STOP_ID_PREFIX: &str = "BTS";
/// Synthetic id prefix for routes
const ROUTE_ID_PREFIX: &str = "RT";
/// Synthetic id prefix for vehicles
const VEHICLE_ID_PREFIX: &str = "BUS";

/// One entity collection with its sequential-id counter
struct Collection<T> {
    items: Vec<T>,
    next_seq: u32,
}

impl<T> Default for Collection<T> {
    fn default() -> Self {
        Collection {
            items: Vec::new(),
            next_seq: 1,
        }
    }
}

impl<T> Collection<T> {
    /// Next synthetic id: prefix plus zero-padded counter, e.g. `BTS001`
    fn next_id(&mut self, prefix: &str) -> String {
        let id = format!("{}{:03}", prefix, self.next_seq);
        self.next_seq += 1;
        id
    }

    /// Replace contents, advancing the counter past any seeded
    /// numeric suffix so synthetic ids stay unique
    fn replace(&mut self, items: Vec<T>, prefix: &str, id_of: impl Fn(&T) -> &str) {
        let highest = items
            .iter()
            .filter_map(|item| {
                id_of(item)
                    .strip_prefix(prefix)
                    .and_then(|rest| rest.parse::<u32>().ok())
            })
            .max()
            .unwrap_or(0);
        self.next_seq = self.next_seq.max(highest + 1);
        self.items = items;
    }
}

/// In-memory stand-in for the backend
pub struct MockStore {
    stops: Mutex<Collection<Stop>>,
    routes: Mutex<Collection<Route>>,
    vehicles: Mutex<Collection<Vehicle>>,
    latency: Duration,
}

impl Default for MockStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MockStore {
    /// Create an empty store with the default simulated latency.
    /// Collections stay empty until one of the seed methods completes;
    /// reads in that window return empty results rather than blocking.
    pub fn new() -> Self {
        MockStore {
            stops: Mutex::new(Collection::default()),
            routes: Mutex::new(Collection::default()),
            vehicles: Mutex::new(Collection::default()),
            latency: DEFAULT_LATENCY,
        }
    }

    /// Override the simulated latency (tests use zero)
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Seed from the documents bundled into the binary at compile time
    pub async fn load_bundled(&self) {
        let stops = normalize_stops(&parse_seed(include_str!("../../data/stops.json"), "stops"));
        let routes = normalize_routes(&parse_seed(include_str!("../../data/routes.json"), "routes"));
        let vehicles =
            normalize_vehicles(&parse_seed(include_str!("../../data/vehicles.json"), "vehicles"));
        self.seed(stops, routes, vehicles).await;
    }

    /// Seed asynchronously from `stops.json`, `routes.json`, and
    /// `vehicles.json` in the given directory. A missing or malformed
    /// file logs a warning and leaves that collection empty.
    pub async fn load_seed(&self, dir: &Path) {
        let stops = match read_seed_file(&dir.join("stops.json")).await {
            Ok(value) => normalize_stops(&value),
            Err(err) => {
                tracing::warn!(error = %err, "stop seed unavailable");
                Vec::new()
            }
        };
        let routes = match read_seed_file(&dir.join("routes.json")).await {
            Ok(value) => normalize_routes(&value),
            Err(err) => {
                tracing::warn!(error = %err, "route seed unavailable");
                Vec::new()
            }
        };
        let vehicles = match read_seed_file(&dir.join("vehicles.json")).await {
            Ok(value) => normalize_vehicles(&value),
            Err(err) => {
                tracing::warn!(error = %err, "vehicle seed unavailable");
                Vec::new()
            }
        };
        self.seed(stops, routes, vehicles).await;
    }

    /// Replace all three collections at once
    pub async fn seed(&self, stops: Vec<Stop>, routes: Vec<Route>, vehicles: Vec<Vehicle>) {
        tracing::debug!(
            stops = stops.len(),
            routes = routes.len(),
            vehicles = vehicles.len(),
            "seeding mock store"
        );
        self.stops
            .lock()
            .await
            .replace(stops, STOP_ID_PREFIX, |s| &s.id);
        self.routes
            .lock()
            .await
            .replace(routes, ROUTE_ID_PREFIX, |r| &r.id);
        self.vehicles
            .lock()
            .await
            .replace(vehicles, VEHICLE_ID_PREFIX, |v| &v.id);
    }

    async fn simulate_latency(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }

    // --- stops ---

    /// List all stops
    pub async fn list_stops(&self) -> Vec<Stop> {
        self.simulate_latency().await;
        self.stops.lock().await.items.clone()
    }

    /// Stops as a GeoJSON FeatureCollection
    pub async fn stops_geojson(&self) -> FeatureCollection {
        self.simulate_latency().await;
        stops_to_feature_collection(&self.stops.lock().await.items)
    }

    /// Look up a stop; unknown ids are `None`, not an error
    pub async fn get_stop(&self, id: &str) -> Option<Stop> {
        self.simulate_latency().await;
        self.stops.lock().await.items.iter().find(|s| s.id == id).cloned()
    }

    /// Create a stop, assigning a synthetic sequential id when the
    /// draft has none. Never fails validation.
    pub async fn create_stop(&self, draft: StopDraft) -> Stop {
        self.simulate_latency().await;
        let mut stops = self.stops.lock().await;
        let id = draft
            .id
            .clone()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| stops.next_id(STOP_ID_PREFIX));
        let stop = Stop::from_draft(id, draft);
        stops.items.push(stop.clone());
        stop
    }

    /// Merge-patch a stop by id; unknown ids are `None`
    pub async fn update_stop(&self, id: &str, patch: StopPatch) -> Option<Stop> {
        self.simulate_latency().await;
        let mut stops = self.stops.lock().await;
        let stop = stops.items.iter_mut().find(|s| s.id == id)?;
        stop.apply(patch);
        Some(stop.clone())
    }

    /// Delete a stop by id; unknown ids are `false`
    pub async fn delete_stop(&self, id: &str) -> bool {
        self.simulate_latency().await;
        let mut stops = self.stops.lock().await;
        let before = stops.items.len();
        stops.items.retain(|s| s.id != id);
        stops.items.len() < before
    }

    /// Delete every stop, returning how many were removed. The id
    /// counter keeps advancing so later synthetic ids stay unique.
    pub async fn clear_stops(&self) -> usize {
        self.simulate_latency().await;
        let mut stops = self.stops.lock().await;
        let removed = stops.items.len();
        stops.items.clear();
        removed
    }

    /// Bulk import stops with replace/append semantics keyed by id
    pub async fn import_stops(&self, rows: Vec<Stop>, mode: ImportMode) -> ImportSummary {
        self.simulate_latency().await;
        let mut stops = self.stops.lock().await;
        let imported = rows.len();
        let merged = merge_import(std::mem::take(&mut stops.items), rows, mode, |s| s.id.clone());
        stops.replace(merged, STOP_ID_PREFIX, |s| &s.id);
        ImportSummary {
            imported,
            saved: stops.items.len(),
        }
    }

    // --- routes ---

    /// List all routes
    pub async fn list_routes(&self) -> Vec<Route> {
        self.simulate_latency().await;
        self.routes.lock().await.items.clone()
    }

    /// Routes as a GeoJSON FeatureCollection of LineStrings
    pub async fn routes_geojson(&self) -> FeatureCollection {
        self.simulate_latency().await;
        routes_to_feature_collection(&self.routes.lock().await.items)
    }

    /// Look up a route; unknown ids are `None`
    pub async fn get_route(&self, id: &str) -> Option<Route> {
        self.simulate_latency().await;
        self.routes.lock().await.items.iter().find(|r| r.id == id).cloned()
    }

    /// Create a route, assigning a synthetic sequential id when needed
    pub async fn create_route(&self, draft: RouteDraft) -> Route {
        self.simulate_latency().await;
        let mut routes = self.routes.lock().await;
        let id = draft
            .id
            .clone()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| routes.next_id(ROUTE_ID_PREFIX));
        let route = Route::from_draft(id, draft);
        routes.items.push(route.clone());
        route
    }

    /// Merge-patch a route by id; unknown ids are `None`
    pub async fn update_route(&self, id: &str, patch: RoutePatch) -> Option<Route> {
        self.simulate_latency().await;
        let mut routes = self.routes.lock().await;
        let route = routes.items.iter_mut().find(|r| r.id == id)?;
        route.apply(patch);
        Some(route.clone())
    }

    /// Delete a route by id; unknown ids are `false`
    pub async fn delete_route(&self, id: &str) -> bool {
        self.simulate_latency().await;
        let mut routes = self.routes.lock().await;
        let before = routes.items.len();
        routes.items.retain(|r| r.id != id);
        routes.items.len() < before
    }

    /// Delete every route, returning how many were removed
    pub async fn clear_routes(&self) -> usize {
        self.simulate_latency().await;
        let mut routes = self.routes.lock().await;
        let removed = routes.items.len();
        routes.items.clear();
        removed
    }

    /// Bulk import routes with replace/append semantics keyed by id
    pub async fn import_routes(&self, rows: Vec<Route>, mode: ImportMode) -> ImportSummary {
        self.simulate_latency().await;
        let mut routes = self.routes.lock().await;
        let imported = rows.len();
        let merged = merge_import(std::mem::take(&mut routes.items), rows, mode, |r| r.id.clone());
        routes.replace(merged, ROUTE_ID_PREFIX, |r| &r.id);
        ImportSummary {
            imported,
            saved: routes.items.len(),
        }
    }

    // --- vehicles ---

    /// List all vehicles
    pub async fn list_vehicles(&self) -> Vec<Vehicle> {
        self.simulate_latency().await;
        self.vehicles.lock().await.items.clone()
    }

    /// Look up a vehicle; unknown ids are `None`
    pub async fn get_vehicle(&self, id: &str) -> Option<Vehicle> {
        self.simulate_latency().await;
        self.vehicles.lock().await.items.iter().find(|v| v.id == id).cloned()
    }

    /// Create a vehicle, assigning a synthetic sequential id when needed
    pub async fn create_vehicle(&self, draft: VehicleDraft) -> Vehicle {
        self.simulate_latency().await;
        let mut vehicles = self.vehicles.lock().await;
        let id = draft
            .id
            .clone()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| vehicles.next_id(VEHICLE_ID_PREFIX));
        let vehicle = Vehicle::from_draft(id, draft, Utc::now());
        vehicles.items.push(vehicle.clone());
        vehicle
    }

    /// Merge-patch a vehicle by id; unknown ids are `None`. This is the
    /// only path that moves a vehicle into or out of `offline`.
    pub async fn update_vehicle(&self, id: &str, patch: VehiclePatch) -> Option<Vehicle> {
        self.simulate_latency().await;
        let mut vehicles = self.vehicles.lock().await;
        let vehicle = vehicles.items.iter_mut().find(|v| v.id == id)?;
        vehicle.apply(patch, Utc::now());
        Some(vehicle.clone())
    }

    /// Delete a vehicle by id; unknown ids are `false`
    pub async fn delete_vehicle(&self, id: &str) -> bool {
        self.simulate_latency().await;
        let mut vehicles = self.vehicles.lock().await;
        let before = vehicles.items.len();
        vehicles.items.retain(|v| v.id != id);
        vehicles.items.len() < before
    }

    /// Delete every vehicle, returning how many were removed
    pub async fn clear_vehicles(&self) -> usize {
        self.simulate_latency().await;
        let mut vehicles = self.vehicles.lock().await;
        let removed = vehicles.items.len();
        vehicles.items.clear();
        removed
    }

    /// Bulk import vehicles with replace/append semantics keyed by id
    pub async fn import_vehicles(&self, rows: Vec<Vehicle>, mode: ImportMode) -> ImportSummary {
        self.simulate_latency().await;
        let mut vehicles = self.vehicles.lock().await;
        let imported = rows.len();
        let merged =
            merge_import(std::mem::take(&mut vehicles.items), rows, mode, |v| v.id.clone());
        vehicles.replace(merged, VEHICLE_ID_PREFIX, |v| &v.id);
        ImportSummary {
            imported,
            saved: vehicles.items.len(),
        }
    }
}

/// Replace drops existing rows; append upserts by id, imported rows winning
fn merge_import<T>(
    existing: Vec<T>,
    rows: Vec<T>,
    mode: ImportMode,
    id_of: impl Fn(&T) -> String,
) -> Vec<T> {
    let mut merged: Vec<T> = match mode {
        ImportMode::Replace => Vec::new(),
        ImportMode::Append => existing,
    };
    for row in rows {
        let id = id_of(&row);
        if let Some(slot) = merged.iter_mut().find(|item| id_of(item) == id) {
            *slot = row;
        } else {
            merged.push(row);
        }
    }
    merged
}

fn parse_seed(raw: &str, what: &str) -> Value {
    match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(err) => {
            tracing::warn!(seed = what, error = %err, "bundled seed failed to parse");
            Value::Array(Vec::new())
        }
    }
}

async fn read_seed_file(path: &Path) -> anyhow::Result<Value> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}
