//! Realtime vehicle simulator
//!
//! Animates a working set of vehicles on a single shared timer to emulate a
//! live GPS feed, independent of which client supplied the initial data.
//! Each tick displaces every non-offline vehicle along its bearing by the
//! distance its speed covers in one tick period, adds a little jitter, and
//! occasionally nudges speed, bearing, or status.
//!
//! The simulator only touches in-memory state and cannot fail; a vehicle
//! with non-finite coordinates is skipped for that tick instead of halting
//! the pass.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::events::{AppEvent, EventBus};
use crate::model::{Vehicle, VehicleStatus};

/// Kilometres per degree of latitude (small-area approximation)
pub const KM_PER_DEGREE: f64 = 111.0;

/// Speed ceiling applied to random speed adjustments, km/h
pub const MAX_SPEED_KMH: f64 = 60.0;

/// Default tick period
pub const DEFAULT_TICK: Duration = Duration::from_millis(3000);

/// Geographic box the simulation is clamped into
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    /// Southern edge, degrees latitude
    pub min_lat: f64,
    /// Northern edge, degrees latitude
    pub max_lat: f64,
    /// Western edge, degrees longitude
    pub min_lon: f64,
    /// Eastern edge, degrees longitude
    pub max_lon: f64,
}

impl BoundingBox {
    /// Clamp a position into the box
    pub fn clamp(&self, lat: f64, lon: f64) -> (f64, f64) {
        (
            lat.clamp(self.min_lat, self.max_lat),
            lon.clamp(self.min_lon, self.max_lon),
        )
    }

    /// Whether a position lies inside the box
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        (self.min_lat..=self.max_lat).contains(&lat) && (self.min_lon..=self.max_lon).contains(&lon)
    }
}

impl Default for BoundingBox {
    /// The demo operating region around Delhi, where the seed data lives
    fn default() -> Self {
        BoundingBox {
            min_lat: 28.40,
            max_lat: 28.90,
            min_lon: 76.90,
            max_lon: 77.60,
        }
    }
}

/// Tunable simulation parameters
#[derive(Debug, Clone, Copy)]
pub struct SimulatorConfig {
    /// Tick period of the shared timer
    pub tick: Duration,
    /// Region vehicles are kept inside
    pub bounds: BoundingBox,
    /// Maximum per-axis random jitter in degrees; zero disables jitter
    pub jitter_deg: f64,
    /// Per-tick chance of a bounded random speed adjustment
    pub speed_change_prob: f64,
    /// Per-tick chance of a bounded random bearing adjustment
    pub bearing_change_prob: f64,
    /// Per-tick chance of resampling status among the non-offline states
    pub status_change_prob: f64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        SimulatorConfig {
            tick: DEFAULT_TICK,
            bounds: BoundingBox::default(),
            jitter_deg: 1e-4,
            speed_change_prob: 0.10,
            bearing_change_prob: 0.05,
            status_change_prob: 0.02,
        }
    }
}

/// Advance one vehicle by one tick. Returns whether it was mutated.
///
/// Offline vehicles are never touched. A same-state status resample still
/// counts as a mutation, so the timestamp bumps either way.
pub fn advance_vehicle(
    vehicle: &mut Vehicle,
    config: &SimulatorConfig,
    rng: &mut StdRng,
    now: DateTime<Utc>,
) -> bool {
    if vehicle.status == VehicleStatus::Offline {
        return false;
    }
    if !vehicle.latitude.is_finite() || !vehicle.longitude.is_finite() {
        tracing::warn!(vehicle = %vehicle.id, "skipping vehicle with non-finite coordinates");
        return false;
    }

    // Distance covered this tick, converted to angular degrees
    let tick_ms = config.tick.as_millis() as f64;
    let km = vehicle.speed_kmh.max(0.0) * tick_ms / 3_600_000.0;
    let degrees = km / KM_PER_DEGREE;

    let bearing_rad = vehicle.bearing.to_radians();
    let jitter_lat = if config.jitter_deg > 0.0 {
        rng.gen_range(-config.jitter_deg..config.jitter_deg)
    } else {
        0.0
    };
    let jitter_lon = if config.jitter_deg > 0.0 {
        rng.gen_range(-config.jitter_deg..config.jitter_deg)
    } else {
        0.0
    };

    let (lat, lon) = config.bounds.clamp(
        vehicle.latitude + bearing_rad.cos() * degrees + jitter_lat,
        vehicle.longitude + bearing_rad.sin() * degrees + jitter_lon,
    );
    vehicle.latitude = lat;
    vehicle.longitude = lon;

    if rng.gen_bool(config.speed_change_prob) {
        vehicle.speed_kmh = (vehicle.speed_kmh + rng.gen_range(-8.0..8.0)).clamp(0.0, MAX_SPEED_KMH);
    }
    if rng.gen_bool(config.bearing_change_prob) {
        vehicle.bearing = (vehicle.bearing + rng.gen_range(-45.0..45.0)).rem_euclid(360.0);
    }
    if rng.gen_bool(config.status_change_prob) {
        // Offline is never entered here; only explicit CRUD does that
        vehicle.status = match rng.gen_range(0..3) {
            0 => VehicleStatus::InTransit,
            1 => VehicleStatus::AtStop,
            _ => VehicleStatus::Delayed,
        };
    }

    vehicle.last_updated = now;
    true
}

/// Advance every vehicle in the working set, returning how many moved
pub fn advance_all(
    vehicles: &mut [Vehicle],
    config: &SimulatorConfig,
    rng: &mut StdRng,
    now: DateTime<Utc>,
) -> usize {
    vehicles
        .iter_mut()
        .map(|v| usize::from(advance_vehicle(v, config, rng, now)))
        .sum()
}

/// Ticking simulator owning a working set of vehicles.
///
/// One shared timer drives all vehicles; at most one tick callback is
/// pending, and a tick missed under contention is skipped rather than
/// queued. Stopping aborts the timer task immediately and freezes the
/// last computed state.
pub struct RealtimeSimulator {
    vehicles: Arc<Mutex<Vec<Vehicle>>>,
    config: SimulatorConfig,
    events: Option<EventBus>,
    rng_seed: Option<u64>,
    task: Option<JoinHandle<()>>,
}

impl RealtimeSimulator {
    /// Create a stopped simulator with the given config and an empty
    /// working set
    pub fn new(config: SimulatorConfig) -> Self {
        RealtimeSimulator {
            vehicles: Arc::new(Mutex::new(Vec::new())),
            config,
            events: None,
            rng_seed: None,
            task: None,
        }
    }

    /// Attach an event bus; every completed tick publishes
    /// [`AppEvent::VehiclesTicked`]
    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    /// Fix the RNG seed (deterministic tests)
    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng_seed = Some(seed);
        self
    }

    /// Whether the shared timer is currently running
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Replace the working set immediately, preserving run state
    pub async fn seed(&self, vehicles: Vec<Vehicle>) {
        *self.vehicles.lock().await = vehicles;
    }

    /// Clone of the current working set
    pub async fn snapshot(&self) -> Vec<Vehicle> {
        self.vehicles.lock().await.clone()
    }

    /// Start ticking. A no-op when already running; after a stop this
    /// resumes with a fresh timer at the configured period.
    pub fn start(&mut self) {
        if self.is_running() {
            return;
        }
        let vehicles = Arc::clone(&self.vehicles);
        let config = self.config;
        let events = self.events.clone();
        let mut rng = match self.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        tracing::debug!(tick_ms = config.tick.as_millis() as u64, "simulator started");
        self.task = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(config.tick);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first interval tick completes immediately; consume it so
            // the first mutation lands one full period after start.
            interval.tick().await;
            loop {
                interval.tick().await;
                let now = Utc::now();
                let moved = {
                    let mut working_set = vehicles.lock().await;
                    advance_all(&mut working_set, &config, &mut rng, now)
                };
                tracing::trace!(moved, "simulator tick");
                if let Some(bus) = &events {
                    bus.publish(AppEvent::VehiclesTicked);
                }
            }
        }));
    }

    /// Cancel the shared timer immediately. No tick callback fires after
    /// this returns; the working set keeps its last computed state.
    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            tracing::debug!("simulator stopped");
        }
    }
}

impl Drop for RealtimeSimulator {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn test_config() -> SimulatorConfig {
        // Deterministic: no jitter, no random nudges
        SimulatorConfig {
            jitter_deg: 0.0,
            speed_change_prob: 0.0,
            bearing_change_prob: 0.0,
            status_change_prob: 0.0,
            ..SimulatorConfig::default()
        }
    }

    fn vehicle(lat: f64, lon: f64, bearing: f64, speed: f64, status: VehicleStatus) -> Vehicle {
        Vehicle {
            id: "BUS001".into(),
            route_id: Some("RT001".into()),
            latitude: lat,
            longitude: lon,
            bearing,
            speed_kmh: speed,
            status,
            last_updated: Utc::now(),
        }
    }

    #[test]
    fn test_northbound_displacement() {
        // 36 km/h for 3000 ms heading due north: latitude rises by
        // 36/111 * (3000/3600000) degrees, longitude is unchanged.
        let config = test_config();
        let mut rng = StdRng::seed_from_u64(7);
        let mut v = vehicle(28.60, 77.20, 0.0, 36.0, VehicleStatus::InTransit);
        assert!(advance_vehicle(&mut v, &config, &mut rng, Utc::now()));

        let expected_dlat = 36.0 / KM_PER_DEGREE * (3000.0 / 3_600_000.0);
        assert!((v.latitude - (28.60 + expected_dlat)).abs() < 1e-12);
        assert!((expected_dlat - 0.00027).abs() < 1e-5);
        assert_eq!(v.longitude, 77.20);
    }

    #[test]
    fn test_offline_vehicle_is_never_mutated() {
        let config = SimulatorConfig::default();
        let mut rng = StdRng::seed_from_u64(7);
        let mut v = vehicle(28.60, 77.20, 45.0, 30.0, VehicleStatus::Offline);
        let before = v.clone();
        for _ in 0..10 {
            assert!(!advance_vehicle(&mut v, &config, &mut rng, Utc::now()));
        }
        assert_eq!(v, before);
    }

    #[test]
    fn test_zero_speed_means_jitter_only() {
        let config = test_config();
        let mut rng = StdRng::seed_from_u64(7);
        let mut v = vehicle(28.60, 77.20, 135.0, 0.0, VehicleStatus::AtStop);
        advance_vehicle(&mut v, &config, &mut rng, Utc::now());
        assert_eq!((v.latitude, v.longitude), (28.60, 77.20));
    }

    #[test]
    fn test_position_stays_in_bounds() {
        let config = SimulatorConfig::default();
        let mut rng = StdRng::seed_from_u64(42);
        // Start on the northern edge heading north at top speed
        let mut v = vehicle(28.90, 77.60, 0.0, 60.0, VehicleStatus::InTransit);
        for _ in 0..50 {
            advance_vehicle(&mut v, &config, &mut rng, Utc::now());
            assert!(config.bounds.contains(v.latitude, v.longitude));
        }
    }

    #[test]
    fn test_status_resample_never_goes_offline() {
        let config = SimulatorConfig {
            status_change_prob: 1.0,
            ..test_config()
        };
        let mut rng = StdRng::seed_from_u64(9);
        let mut v = vehicle(28.60, 77.20, 0.0, 20.0, VehicleStatus::InTransit);
        for _ in 0..200 {
            advance_vehicle(&mut v, &config, &mut rng, Utc::now());
            assert_ne!(v.status, VehicleStatus::Offline);
        }
    }

    #[test]
    fn test_speed_stays_clamped() {
        let config = SimulatorConfig {
            speed_change_prob: 1.0,
            ..test_config()
        };
        let mut rng = StdRng::seed_from_u64(11);
        let mut v = vehicle(28.60, 77.20, 0.0, 58.0, VehicleStatus::InTransit);
        for _ in 0..200 {
            advance_vehicle(&mut v, &config, &mut rng, Utc::now());
            assert!((0.0..=MAX_SPEED_KMH).contains(&v.speed_kmh));
        }
    }

    #[test]
    fn test_non_finite_coordinates_are_skipped() {
        let config = test_config();
        let mut rng = StdRng::seed_from_u64(3);
        let mut vehicles = vec![
            vehicle(f64::NAN, 77.20, 0.0, 20.0, VehicleStatus::InTransit),
            vehicle(28.60, 77.20, 0.0, 20.0, VehicleStatus::InTransit),
        ];
        let moved = advance_all(&mut vehicles, &config, &mut rng, Utc::now());
        assert_eq!(moved, 1);
        assert!(vehicles[0].latitude.is_nan());
        assert!(vehicles[1].latitude > 28.60);
    }
}
