//! Dual-mode API client
//!
//! One capability surface with two interchangeable strategies behind it:
//! the in-memory [`MockStore`] (static mode) or the [`BackendClient`]
//! (dynamic mode). Mode selection happens once at startup and the chosen
//! variant is treated as immutable session state from then on.

mod backend;
mod error;
mod mock;
mod mode;

pub use backend::{BackendClient, HealthStatus, RetryPolicy, DEFAULT_TIMEOUT};
pub use error::ApiError;
pub use mock::{MockStore, DEFAULT_LATENCY};
pub use mode::{
    resolve_base_url, select_mode, ClientConfig, ClientMode, BACKEND_FALLBACK_PORT,
};

use geojson::FeatureCollection;
use serde_json::Value;

use crate::import::{ImportMode, ImportSummary};
use crate::model::{
    Route, RouteDraft, RoutePatch, Stop, StopDraft, StopPatch, Vehicle, VehicleDraft, VehiclePatch,
};

/// The selected data-access strategy for this session
pub enum BusClient {
    /// Static mode: bundled data mutated in memory
    Mock(MockStore),
    /// Dynamic mode: live REST backend
    Backend(BackendClient),
}

impl BusClient {
    /// Run mode selection once and build the matching variant.
    ///
    /// Never fails: an unparseable base URL logs a warning and falls
    /// back to static mode.
    pub fn select(config: &ClientConfig) -> BusClient {
        let mode = select_mode(
            config.static_override,
            &config.hostname,
            config.api_base.as_deref(),
        );
        tracing::info!(?mode, hostname = %config.hostname, "client mode selected");
        match mode {
            ClientMode::Static => BusClient::Mock(MockStore::new()),
            ClientMode::Dynamic => {
                let base = resolve_base_url(
                    config.api_base.as_deref().unwrap_or_default(),
                    &config.hostname,
                );
                match reqwest::Url::parse(&base) {
                    Ok(url) => BusClient::Backend(BackendClient::new(url)),
                    Err(err) => {
                        tracing::warn!(%base, error = %err, "invalid API base, falling back to static mode");
                        BusClient::Mock(MockStore::new())
                    }
                }
            }
        }
    }

    /// Which mode this client runs in
    pub fn mode(&self) -> ClientMode {
        match self {
            BusClient::Mock(_) => ClientMode::Static,
            BusClient::Backend(_) => ClientMode::Dynamic,
        }
    }

    /// List all vehicles
    pub async fn list_vehicles(&self) -> Result<Vec<Vehicle>, ApiError> {
        match self {
            BusClient::Mock(store) => Ok(store.list_vehicles().await),
            BusClient::Backend(api) => api.list_vehicles().await,
        }
    }

    /// Look up a vehicle by id
    pub async fn get_vehicle(&self, id: &str) -> Result<Option<Vehicle>, ApiError> {
        match self {
            BusClient::Mock(store) => Ok(store.get_vehicle(id).await),
            BusClient::Backend(api) => api.get_vehicle(id).await,
        }
    }

    /// Create a vehicle
    pub async fn create_vehicle(&self, draft: VehicleDraft) -> Result<Vehicle, ApiError> {
        match self {
            BusClient::Mock(store) => Ok(store.create_vehicle(draft).await),
            BusClient::Backend(api) => api.create_vehicle(draft).await,
        }
    }

    /// Merge-patch a vehicle by id
    pub async fn update_vehicle(
        &self,
        id: &str,
        patch: VehiclePatch,
    ) -> Result<Option<Vehicle>, ApiError> {
        match self {
            BusClient::Mock(store) => Ok(store.update_vehicle(id, patch).await),
            BusClient::Backend(api) => api.update_vehicle(id, patch).await,
        }
    }

    /// Delete a vehicle by id; `false` when unknown
    pub async fn delete_vehicle(&self, id: &str) -> Result<bool, ApiError> {
        match self {
            BusClient::Mock(store) => Ok(store.delete_vehicle(id).await),
            BusClient::Backend(api) => api.delete_vehicle(id).await,
        }
    }

    /// Delete every vehicle
    pub async fn clear_vehicles(&self) -> Result<(), ApiError> {
        match self {
            BusClient::Mock(store) => {
                store.clear_vehicles().await;
                Ok(())
            }
            BusClient::Backend(api) => api.delete_all_vehicles().await,
        }
    }

    /// List all stops
    pub async fn list_stops(&self) -> Result<Vec<Stop>, ApiError> {
        match self {
            BusClient::Mock(store) => Ok(store.list_stops().await),
            BusClient::Backend(api) => api.list_stops().await,
        }
    }

    /// Stops as a GeoJSON FeatureCollection of Point features
    pub async fn stops_geojson(&self) -> Result<FeatureCollection, ApiError> {
        match self {
            BusClient::Mock(store) => Ok(store.stops_geojson().await),
            BusClient::Backend(api) => api.stops_geojson().await,
        }
    }

    /// Look up a stop by id
    pub async fn get_stop(&self, id: &str) -> Result<Option<Stop>, ApiError> {
        match self {
            BusClient::Mock(store) => Ok(store.get_stop(id).await),
            BusClient::Backend(api) => api.get_stop(id).await,
        }
    }

    /// Create a stop
    pub async fn create_stop(&self, draft: StopDraft) -> Result<Stop, ApiError> {
        match self {
            BusClient::Mock(store) => Ok(store.create_stop(draft).await),
            BusClient::Backend(api) => api.create_stop(draft).await,
        }
    }

    /// Merge-patch a stop by id
    pub async fn update_stop(
        &self,
        id: &str,
        patch: StopPatch,
    ) -> Result<Option<Stop>, ApiError> {
        match self {
            BusClient::Mock(store) => Ok(store.update_stop(id, patch).await),
            BusClient::Backend(api) => api.update_stop(id, patch).await,
        }
    }

    /// Delete a stop by id; `false` when unknown
    pub async fn delete_stop(&self, id: &str) -> Result<bool, ApiError> {
        match self {
            BusClient::Mock(store) => Ok(store.delete_stop(id).await),
            BusClient::Backend(api) => api.delete_stop(id).await,
        }
    }

    /// Delete every stop
    pub async fn clear_stops(&self) -> Result<(), ApiError> {
        match self {
            BusClient::Mock(store) => {
                store.clear_stops().await;
                Ok(())
            }
            BusClient::Backend(api) => api.delete_all_stops().await,
        }
    }

    /// List all routes
    pub async fn list_routes(&self) -> Result<Vec<Route>, ApiError> {
        match self {
            BusClient::Mock(store) => Ok(store.list_routes().await),
            BusClient::Backend(api) => api.list_routes().await,
        }
    }

    /// Routes as a GeoJSON FeatureCollection of LineString features,
    /// `[lon, lat]` coordinate order
    pub async fn routes_geojson(&self) -> Result<FeatureCollection, ApiError> {
        match self {
            BusClient::Mock(store) => Ok(store.routes_geojson().await),
            BusClient::Backend(api) => api.routes_geojson().await,
        }
    }

    /// Look up a route by id
    pub async fn get_route(&self, id: &str) -> Result<Option<Route>, ApiError> {
        match self {
            BusClient::Mock(store) => Ok(store.get_route(id).await),
            BusClient::Backend(api) => api.get_route(id).await,
        }
    }

    /// Create a route
    pub async fn create_route(&self, draft: RouteDraft) -> Result<Route, ApiError> {
        match self {
            BusClient::Mock(store) => Ok(store.create_route(draft).await),
            BusClient::Backend(api) => api.create_route(draft).await,
        }
    }

    /// Merge-patch a route by id
    pub async fn update_route(
        &self,
        id: &str,
        patch: RoutePatch,
    ) -> Result<Option<Route>, ApiError> {
        match self {
            BusClient::Mock(store) => Ok(store.update_route(id, patch).await),
            BusClient::Backend(api) => api.update_route(id, patch).await,
        }
    }

    /// Delete a route by id; `false` when unknown
    pub async fn delete_route(&self, id: &str) -> Result<bool, ApiError> {
        match self {
            BusClient::Mock(store) => Ok(store.delete_route(id).await),
            BusClient::Backend(api) => api.delete_route(id).await,
        }
    }

    /// Delete every route
    pub async fn clear_routes(&self) -> Result<(), ApiError> {
        match self {
            BusClient::Mock(store) => {
                store.clear_routes().await;
                Ok(())
            }
            BusClient::Backend(api) => api.delete_all_routes().await,
        }
    }

    /// Bulk import rows already validated by [`crate::import`].
    ///
    /// `resource` is one of `stops`, `routes`, `vehicles`; rows are raw
    /// JSON records so the mock and backend paths normalize identically.
    pub async fn import(
        &self,
        resource: &str,
        rows: &[Value],
        mode: ImportMode,
    ) -> Result<ImportSummary, ApiError> {
        match self {
            BusClient::Mock(store) => {
                let list = Value::Array(rows.to_vec());
                Ok(match resource {
                    "routes" => {
                        store
                            .import_routes(crate::model::normalize_routes(&list), mode)
                            .await
                    }
                    "vehicles" => {
                        store
                            .import_vehicles(crate::model::normalize_vehicles(&list), mode)
                            .await
                    }
                    _ => {
                        store
                            .import_stops(crate::model::normalize_stops(&list), mode)
                            .await
                    }
                })
            }
            BusClient::Backend(api) => api.import(resource, rows, mode).await,
        }
    }

    /// Service health. Static mode reports itself healthy with no
    /// services attached.
    pub async fn health(&self) -> Result<HealthStatus, ApiError> {
        match self {
            BusClient::Mock(_) => Ok(HealthStatus {
                status: "healthy".to_string(),
                services: [("data".to_string(), "bundled".to_string())].into(),
                uptime: None,
                timestamp: Some(chrono::Utc::now().to_rfc3339()),
            }),
            BusClient::Backend(api) => api.health().await,
        }
    }
}
