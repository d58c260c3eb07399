//! Headless NagaraTrack demo
//!
//! Selects a client from the environment, seeds the mock store when
//! running in static mode, then drives the realtime simulator for a few
//! ticks and prints the fleet after each one. Useful as a smoke test and
//! as a worked example of the library surface.

use std::time::Duration;

use anyhow::Result;
use nagaratrack_core::client::{BusClient, ClientConfig, ClientMode};
use nagaratrack_core::events::{AppEvent, EventBus};
use nagaratrack_core::sim::{RealtimeSimulator, SimulatorConfig};
use tracing::info;

const DEMO_TICKS: usize = 5;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = ClientConfig::from_env();
    let client = BusClient::select(&config);
    if let BusClient::Mock(store) = &client {
        store.load_bundled().await;
    }

    let health = client.health().await?;
    info!(status = %health.status, mode = ?client.mode(), "connected");

    let stops = client.list_stops().await?;
    let routes = client.list_routes().await?;
    let vehicles = client.list_vehicles().await?;
    info!(
        stops = stops.len(),
        routes = routes.len(),
        vehicles = vehicles.len(),
        "collections loaded"
    );
    for route in &routes {
        info!(id = %route.id, name = %route.name, color = %route.color, "route");
    }

    // Only static mode animates locally; a live backend owns its own positions
    if client.mode() == ClientMode::Dynamic {
        for v in &vehicles {
            info!(id = %v.id, lat = v.latitude, lon = v.longitude, status = %v.status.as_str(), "vehicle");
        }
        return Ok(());
    }

    let events = EventBus::new();
    let mut ticks = events.subscribe();
    let mut sim = RealtimeSimulator::new(SimulatorConfig::default()).with_events(events);
    sim.seed(vehicles).await;
    sim.start();

    for tick in 1..=DEMO_TICKS {
        loop {
            match ticks.recv().await {
                Ok(AppEvent::VehiclesTicked) => break,
                Ok(_) => continue,
                Err(err) => anyhow::bail!("event stream closed: {err}"),
            }
        }
        info!(tick, "fleet positions");
        for v in sim.snapshot().await {
            info!(
                id = %v.id,
                lat = %format!("{:.5}", v.latitude),
                lon = %format!("{:.5}", v.longitude),
                speed_kmh = %format!("{:.1}", v.speed_kmh),
                status = %v.status.as_str(),
                "vehicle"
            );
        }
    }

    sim.stop();
    // Give the aborted tick task a moment to unwind before exit
    tokio::time::sleep(Duration::from_millis(50)).await;
    info!("demo complete");
    Ok(())
}
