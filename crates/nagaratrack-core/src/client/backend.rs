//! Backend adapter
//!
//! Translates the normalized client calls into REST requests against the
//! configured base URL and coalesces the backend's heterogeneous response
//! shapes into the canonical model types.
//!
//! Retryable failures (transport, timeout, 5xx) are retried with linear
//! backoff; 4xx and decode errors surface immediately.

use std::collections::HashMap;
use std::time::Duration;

use geojson::FeatureCollection;
use reqwest::{Method, Url};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::ApiError;
use crate::import::{ImportMode, ImportSummary};
use crate::model::{
    normalize_route, normalize_routes, normalize_stop, normalize_vehicle, normalize_vehicles,
    routes_from_feature_collection, stops_from_feature_collection, Route, RouteDraft, RoutePatch,
    Stop, StopDraft, StopPatch, Vehicle, VehicleDraft, VehiclePatch,
};

/// Default client-side timeout per HTTP request, independent of retry backoff
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Linear backoff retry policy: delay = attempt number x backoff unit
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Retries after the original attempt (3 retries = 4 attempts total)
    pub max_retries: u32,
    /// Backoff unit; attempt N waits N x this before retrying
    pub backoff_unit: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_retries: 3,
            backoff_unit: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Backoff before retry number `attempt` (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.backoff_unit * attempt
    }
}

/// Service status reported by `GET /health`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    /// Overall status, e.g. `healthy` or `degraded`
    pub status: String,
    /// Per-service status map
    #[serde(default)]
    pub services: HashMap<String, String>,
    /// Uptime as `HH:MM:SS`
    #[serde(default)]
    pub uptime: Option<String>,
    /// Server wall-clock timestamp
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// HTTP client for the live REST backend
pub struct BackendClient {
    base: Url,
    http: reqwest::Client,
    retry: RetryPolicy,
}

impl BackendClient {
    /// Create a client against the given base URL with the default
    /// timeout and retry policy
    pub fn new(base: Url) -> Self {
        // Builder failure here means the TLS backend itself is broken;
        // running without the timeout would be worse than failing fast.
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .user_agent(concat!("NagaraTrack/", env!("CARGO_PKG_VERSION")))
            .build()
            .expect("HTTP client construction failed");
        BackendClient {
            base,
            http,
            retry: RetryPolicy::default(),
        }
    }

    /// Override the retry policy (tests use millisecond backoff)
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// The base URL requests are issued against
    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// `GET /api/vehicles`, normalized
    pub async fn list_vehicles(&self) -> Result<Vec<Vehicle>, ApiError> {
        let body = self.request(Method::GET, "/api/vehicles", None).await?;
        Ok(normalize_vehicles(&body))
    }

    /// `GET /api/vehicles/{id}`; 404 maps to `Ok(None)`
    pub async fn get_vehicle(&self, id: &str) -> Result<Option<Vehicle>, ApiError> {
        self.get_by_id(&format!("/api/vehicles/{id}"), normalize_vehicle)
            .await
    }

    /// `POST /api/vehicles`, returning the created record
    pub async fn create_vehicle(&self, draft: VehicleDraft) -> Result<Vehicle, ApiError> {
        let payload = json!({
            "vehicle_id": draft.id,
            "route_id": draft.route_id,
            "latitude": draft.latitude,
            "longitude": draft.longitude,
            "bearing": draft.bearing,
            "speed": draft.speed_kmh,
            "status": draft.status.map(|s| s.as_str()),
        });
        let body = self.request(Method::POST, "/api/vehicles", Some(&payload)).await?;
        normalize_vehicle(&body)
            .ok_or_else(|| ApiError::Decode("created vehicle missing id or position".into()))
    }

    /// `PUT /api/vehicles/{id}`; 404 maps to `Ok(None)`
    pub async fn update_vehicle(
        &self,
        id: &str,
        patch: VehiclePatch,
    ) -> Result<Option<Vehicle>, ApiError> {
        let payload = json!({
            "route_id": patch.route_id,
            "latitude": patch.latitude,
            "longitude": patch.longitude,
            "bearing": patch.bearing,
            "speed": patch.speed_kmh,
            "status": patch.status.map(|s| s.as_str()),
        });
        self.update_by_id(&format!("/api/vehicles/{id}"), &payload, normalize_vehicle)
            .await
    }

    /// `DELETE /api/vehicles/{id}`; 404 maps to `Ok(false)`
    pub async fn delete_vehicle(&self, id: &str) -> Result<bool, ApiError> {
        self.delete_by_id(&format!("/api/vehicles/{id}")).await
    }

    /// `DELETE /api/vehicles`: delete every vehicle
    pub async fn delete_all_vehicles(&self) -> Result<(), ApiError> {
        self.request(Method::DELETE, "/api/vehicles", None).await?;
        Ok(())
    }

    /// `GET /api/stops`. The backend serves stops as a GeoJSON
    /// FeatureCollection; a plain array of stop records is also accepted.
    pub async fn list_stops(&self) -> Result<Vec<Stop>, ApiError> {
        let body = self.request(Method::GET, "/api/stops", None).await?;
        if body.is_array() {
            return Ok(crate::model::normalize_stops(&body));
        }
        let fc = feature_collection(body)?;
        Ok(stops_from_feature_collection(&fc))
    }

    /// `GET /api/stops` raw, as a FeatureCollection
    pub async fn stops_geojson(&self) -> Result<FeatureCollection, ApiError> {
        let body = self.request(Method::GET, "/api/stops", None).await?;
        feature_collection(body)
    }

    /// `GET /api/stops/{id}`; 404 maps to `Ok(None)`
    pub async fn get_stop(&self, id: &str) -> Result<Option<Stop>, ApiError> {
        self.get_by_id(&format!("/api/stops/{id}"), normalize_stop).await
    }

    /// `POST /api/stops`, returning the created record
    pub async fn create_stop(&self, draft: StopDraft) -> Result<Stop, ApiError> {
        let payload = json!({
            "stop_id": draft.id,
            "name": draft.name,
            "latitude": draft.latitude,
            "longitude": draft.longitude,
            "routes": draft.routes,
            "accessibility": draft.accessibility,
        });
        let body = self.request(Method::POST, "/api/stops", Some(&payload)).await?;
        normalize_stop(&body)
            .ok_or_else(|| ApiError::Decode("created stop missing id or position".into()))
    }

    /// `PUT /api/stops/{id}`; 404 maps to `Ok(None)`
    pub async fn update_stop(&self, id: &str, patch: StopPatch) -> Result<Option<Stop>, ApiError> {
        let payload = json!({
            "name": patch.name,
            "latitude": patch.latitude,
            "longitude": patch.longitude,
            "routes": patch.routes,
            "accessibility": patch.accessibility,
        });
        self.update_by_id(&format!("/api/stops/{id}"), &payload, normalize_stop)
            .await
    }

    /// `DELETE /api/stops/{id}`; 404 maps to `Ok(false)`
    pub async fn delete_stop(&self, id: &str) -> Result<bool, ApiError> {
        self.delete_by_id(&format!("/api/stops/{id}")).await
    }

    /// `DELETE /api/stops`: delete every stop
    pub async fn delete_all_stops(&self) -> Result<(), ApiError> {
        self.request(Method::DELETE, "/api/stops", None).await?;
        Ok(())
    }

    /// `GET /api/routes`. The backend serves routes as a plain array; a
    /// GeoJSON FeatureCollection of LineStrings is also accepted.
    pub async fn list_routes(&self) -> Result<Vec<Route>, ApiError> {
        let body = self.request(Method::GET, "/api/routes", None).await?;
        if body.is_array() {
            return Ok(normalize_routes(&body));
        }
        let fc = feature_collection(body)?;
        Ok(routes_from_feature_collection(&fc))
    }

    /// `GET /api/routes/geojson`: LineString features, `[lon, lat]` order
    /// preserved as served
    pub async fn routes_geojson(&self) -> Result<FeatureCollection, ApiError> {
        let body = self.request(Method::GET, "/api/routes/geojson", None).await?;
        feature_collection(body)
    }

    /// `GET /api/routes/{id}`; 404 maps to `Ok(None)`
    pub async fn get_route(&self, id: &str) -> Result<Option<Route>, ApiError> {
        self.get_by_id(&format!("/api/routes/{id}"), normalize_route).await
    }

    /// `POST /api/routes`, returning the created record
    pub async fn create_route(&self, draft: RouteDraft) -> Result<Route, ApiError> {
        let payload = json!({
            "route_id": draft.id,
            "route_name": draft.name,
            "route_color": draft.color,
            "is_active": draft.is_active,
            "coordinates": draft.coordinates,
            "stops": draft.stops,
        });
        let body = self.request(Method::POST, "/api/routes", Some(&payload)).await?;
        normalize_route(&body).ok_or_else(|| ApiError::Decode("created route missing id".into()))
    }

    /// `PUT /api/routes/{id}`; 404 maps to `Ok(None)`
    pub async fn update_route(
        &self,
        id: &str,
        patch: RoutePatch,
    ) -> Result<Option<Route>, ApiError> {
        let payload = json!({
            "route_name": patch.name,
            "route_color": patch.color,
            "is_active": patch.is_active,
            "coordinates": patch.coordinates,
            "stops": patch.stops,
        });
        self.update_by_id(&format!("/api/routes/{id}"), &payload, normalize_route)
            .await
    }

    /// `DELETE /api/routes/{id}`; 404 maps to `Ok(false)`
    pub async fn delete_route(&self, id: &str) -> Result<bool, ApiError> {
        self.delete_by_id(&format!("/api/routes/{id}")).await
    }

    /// `DELETE /api/routes`: delete every route
    pub async fn delete_all_routes(&self) -> Result<(), ApiError> {
        self.request(Method::DELETE, "/api/routes", None).await?;
        Ok(())
    }

    /// `POST /api/{resource}/import` with `{ "data": [...], "mode": ... }`
    pub async fn import(
        &self,
        resource: &str,
        rows: &[Value],
        mode: ImportMode,
    ) -> Result<ImportSummary, ApiError> {
        let payload = json!({ "data": rows, "mode": mode });
        let body = self
            .request(Method::POST, &format!("/api/{resource}/import"), Some(&payload))
            .await?;
        serde_json::from_value(body).map_err(|e| ApiError::Decode(e.to_string()))
    }

    /// `GET /health`
    pub async fn health(&self) -> Result<HealthStatus, ApiError> {
        let body = self.request(Method::GET, "/health", None).await?;
        serde_json::from_value(body).map_err(|e| ApiError::Decode(e.to_string()))
    }

    async fn get_by_id<T>(
        &self,
        path: &str,
        normalize: impl Fn(&Value) -> Option<T>,
    ) -> Result<Option<T>, ApiError> {
        match self.request(Method::GET, path, None).await {
            Ok(body) => Ok(normalize(&body)),
            Err(ApiError::Status { code: 404, .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn update_by_id<T>(
        &self,
        path: &str,
        payload: &Value,
        normalize: impl Fn(&Value) -> Option<T>,
    ) -> Result<Option<T>, ApiError> {
        match self.request(Method::PUT, path, Some(payload)).await {
            Ok(body) => Ok(normalize(&body)),
            Err(ApiError::Status { code: 404, .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn delete_by_id(&self, path: &str) -> Result<bool, ApiError> {
        match self.request(Method::DELETE, path, None).await {
            Ok(_) => Ok(true),
            Err(ApiError::Status { code: 404, .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Issue one logical request, retrying per the policy. The final
    /// error after exhausting retries surfaces to the caller.
    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, ApiError> {
        let url = self
            .base
            .join(path)
            .map_err(|e| ApiError::InvalidRequest(format!("{path}: {e}")))?;

        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match self.send_once(method.clone(), url.clone(), body).await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && attempt <= self.retry.max_retries => {
                    let delay = self.retry.delay_for(attempt);
                    tracing::warn!(
                        %url,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => {
                    tracing::debug!(%url, attempt, error = %err, "request failed");
                    return Err(err);
                }
            }
        }
    }

    async fn send_once(
        &self,
        method: Method,
        url: Url,
        body: Option<&Value>,
    ) -> Result<Value, ApiError> {
        let mut request = self.http.request(method, url);
        if let Some(payload) = body {
            request = request.json(payload);
        }
        let response = request.send().await.map_err(classify)?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                code: status.as_u16(),
                message,
            });
        }
        response
            .json::<Value>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }
}

/// Map a reqwest error onto the taxonomy
fn classify(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        ApiError::Timeout
    } else if err.is_decode() {
        ApiError::Decode(err.to_string())
    } else {
        ApiError::Transport(err.to_string())
    }
}

/// Parse a JSON body as a GeoJSON FeatureCollection
fn feature_collection(body: Value) -> Result<FeatureCollection, ApiError> {
    serde_json::from_value(body).map_err(|e| ApiError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_backoff() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(1), Duration::from_secs(1));
        assert_eq!(policy.delay_for(2), Duration::from_secs(2));
        assert_eq!(policy.delay_for(3), Duration::from_secs(3));
    }

    #[test]
    fn test_health_status_tolerates_missing_fields() {
        let health: HealthStatus = serde_json::from_value(serde_json::json!({
            "status": "healthy"
        }))
        .unwrap();
        assert_eq!(health.status, "healthy");
        assert!(health.services.is_empty());
        assert_eq!(health.uptime, None);
    }
}
