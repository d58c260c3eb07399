use std::time::Duration;

use chrono::Utc;
use nagaratrack_core::events::{AppEvent, EventBus};
use nagaratrack_core::model::{Vehicle, VehicleStatus};
use nagaratrack_core::sim::{RealtimeSimulator, SimulatorConfig};
use pretty_assertions::assert_eq;

fn fleet() -> Vec<Vehicle> {
    vec![
        Vehicle {
            id: "BUS001".into(),
            route_id: Some("RT001".into()),
            latitude: 28.60,
            longitude: 77.20,
            bearing: 0.0,
            speed_kmh: 36.0,
            status: VehicleStatus::InTransit,
            last_updated: Utc::now(),
        },
        Vehicle {
            id: "BUS002".into(),
            route_id: None,
            latitude: 28.55,
            longitude: 77.25,
            bearing: 90.0,
            speed_kmh: 20.0,
            status: VehicleStatus::Offline,
            last_updated: Utc::now(),
        },
    ]
}

fn deterministic_config() -> SimulatorConfig {
    SimulatorConfig {
        jitter_deg: 0.0,
        speed_change_prob: 0.0,
        bearing_change_prob: 0.0,
        status_change_prob: 0.0,
        ..SimulatorConfig::default()
    }
}

#[tokio::test(start_paused = true)]
async fn test_tick_moves_vehicles_and_skips_offline() {
    let mut sim = RealtimeSimulator::new(deterministic_config()).with_rng_seed(1);
    sim.seed(fleet()).await;
    sim.start();
    assert!(sim.is_running());

    tokio::time::sleep(Duration::from_millis(3100)).await;
    let after = sim.snapshot().await;
    assert!(after[0].latitude > 28.60);
    assert_eq!(after[0].longitude, 77.20); // due north, no jitter
    assert_eq!((after[1].latitude, after[1].longitude), (28.55, 77.25));
    sim.stop();
}

#[tokio::test(start_paused = true)]
async fn test_offline_vehicle_untouched_after_ten_ticks() {
    let mut sim = RealtimeSimulator::new(SimulatorConfig::default()).with_rng_seed(2);
    sim.seed(fleet()).await;
    let offline_before = sim.snapshot().await[1].clone();
    sim.start();
    tokio::time::sleep(Duration::from_secs(31)).await;
    let offline_after = sim.snapshot().await[1].clone();
    assert_eq!(offline_after, offline_before);
    sim.stop();
}

#[tokio::test(start_paused = true)]
async fn test_stop_cancels_timer_immediately() {
    let mut sim = RealtimeSimulator::new(deterministic_config()).with_rng_seed(3);
    sim.seed(fleet()).await;
    sim.start();
    tokio::time::sleep(Duration::from_millis(3100)).await;
    sim.stop();
    assert!(!sim.is_running());

    let frozen = sim.snapshot().await;
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(sim.snapshot().await, frozen);
}

#[tokio::test(start_paused = true)]
async fn test_stop_then_start_without_tick_is_idempotent() {
    let mut sim = RealtimeSimulator::new(deterministic_config()).with_rng_seed(4);
    sim.seed(fleet()).await;
    let before = sim.snapshot().await;

    sim.start();
    sim.stop();
    sim.start();
    sim.stop();
    assert_eq!(sim.snapshot().await, before);
}

#[tokio::test(start_paused = true)]
async fn test_restart_uses_a_fresh_timer() {
    let mut sim = RealtimeSimulator::new(deterministic_config()).with_rng_seed(5);
    sim.seed(fleet()).await;
    sim.start();
    tokio::time::sleep(Duration::from_millis(3100)).await;
    sim.stop();
    let frozen = sim.snapshot().await;

    sim.start();
    // Less than a full period after restart: nothing may tick yet
    tokio::time::sleep(Duration::from_millis(2900)).await;
    assert_eq!(sim.snapshot().await, frozen);
    // ...and one period in, it does
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(sim.snapshot().await[0].latitude > frozen[0].latitude);
    sim.stop();
}

#[tokio::test(start_paused = true)]
async fn test_reseed_replaces_working_set_while_running() {
    let mut sim = RealtimeSimulator::new(deterministic_config()).with_rng_seed(6);
    sim.seed(fleet()).await;
    sim.start();
    tokio::time::sleep(Duration::from_millis(3100)).await;

    let replacement = vec![Vehicle {
        id: "BUS099".into(),
        route_id: None,
        latitude: 28.70,
        longitude: 77.30,
        bearing: 90.0,
        speed_kmh: 10.0,
        status: VehicleStatus::InTransit,
        last_updated: Utc::now(),
    }];
    sim.seed(replacement).await;
    assert!(sim.is_running());

    tokio::time::sleep(Duration::from_secs(3)).await;
    let after = sim.snapshot().await;
    assert_eq!(after.len(), 1);
    assert_eq!(after[0].id, "BUS099");
    assert!(after[0].longitude > 77.30); // heading east
    sim.stop();
}

#[tokio::test(start_paused = true)]
async fn test_each_tick_publishes_an_event() {
    let bus = EventBus::new();
    let mut rx = bus.subscribe();
    let mut sim = RealtimeSimulator::new(deterministic_config())
        .with_rng_seed(7)
        .with_events(bus);
    sim.seed(fleet()).await;
    sim.start();

    tokio::time::sleep(Duration::from_millis(6200)).await;
    sim.stop();
    assert_eq!(rx.try_recv().unwrap(), AppEvent::VehiclesTicked);
    assert_eq!(rx.try_recv().unwrap(), AppEvent::VehiclesTicked);
    assert!(rx.try_recv().is_err());
}
