//! # NagaraTrack Core Library
//!
//! Core functionality for the NagaraTrack bus tracking demo.
//!
//! This library provides:
//! - Canonical data model for stops, routes, and vehicles
//! - A dual-mode API client: in-memory mock store or live REST backend
//! - Runtime client selection from environment signals
//! - A ticking realtime simulator that animates vehicle positions
//! - Bulk import validation with explicit proceed/abort resolution
//!
//! ## Example
//!
//! ```rust,ignore
//! use nagaratrack_core::client::{BusClient, ClientConfig};
//!
//! let config = ClientConfig::from_env();
//! let client = BusClient::select(&config);
//! let vehicles = client.list_vehicles().await?;
//! ```

#![warn(missing_docs)]

pub mod client;
pub mod events;
pub mod import;
pub mod model;
pub mod sim;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::client::{
        ApiError, BackendClient, BusClient, ClientConfig, ClientMode, MockStore,
    };
    pub use crate::events::{AppEvent, EventBus};
    pub use crate::import::{ImportMode, ImportReport, ImportResolution};
    pub use crate::model::{Route, Stop, Vehicle, VehicleStatus};
    pub use crate::sim::{BoundingBox, RealtimeSimulator, SimulatorConfig};
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
