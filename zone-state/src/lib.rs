//! Zone resolution and state reconciliation for zoned vehicle controls
//!
//! Physical zones of a vehicle (driver, passenger, each windshield) expose
//! independently settable properties behind an asynchronous hardware
//! service. This crate keeps a display surface in sync with that hardware:
//!
//! - **Zone resolution**: bind each logical control to one zone of its
//!   property's zone mask with deterministic preference/fallback rules
//! - **Projection**: last-known value per (property, zone) in a shared store
//!   with push notification of changes
//! - **Command path**: clamp to the property domain, project optimistically,
//!   write fire-and-forget
//! - **Event path**: route hardware events by zone overlap; the latest event
//!   always wins, so echoes need no special handling
//! - **Serialization**: every mutation happens on one control loop thread
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use zone_state::{ControlEngine, ControlId, EngineConfig};
//!
//! let engine = ControlEngine::start(Arc::new(vehicle), EngineConfig::hvac())?;
//!
//! let driver = ControlId::from("driver_temperature");
//! println!("driver: {:?}", engine.current_value(&driver)?);
//!
//! engine.request_change(&driver, 24.0_f32)?;
//!
//! for change in engine.changes() {
//!     println!("{} -> {}", change.control, change.value);
//! }
//! ```
//!
//! # Architecture
//!
//! ```text
//! ControlEngine
//!     │
//!     ├── PropertyStore (state-store): (property, zone) -> value
//!     │
//!     └── worker thread: ControlLoop
//!             │
//!             └── EventRouter
//!                     ├── PropertyController (driver_temperature @ row-1-left)
//!                     ├── PropertyController (passenger_temperature @ row-1-right)
//!                     └── ...
//! ```

pub mod config;
pub mod control_loop;
pub mod controller;
pub mod engine;
pub mod error;
pub mod iter;
pub mod logging;
pub mod model;
pub mod resolver;
pub mod router;

pub use config::{ControlSpec, EngineConfig, RoleSpec};
pub use control_loop::{ControlLoop, ControlStatus, Input};
pub use controller::{ControllerState, PropertyController, ReadPolicy};
pub use engine::ControlEngine;
pub use error::{ControlError, Result};
pub use iter::{ControlChange, ControlChanges};
pub use model::{ControlId, PropertyKey, PropertyStore};
pub use resolver::{resolve, RolePreferences, ZoneBinding};
pub use router::{DispatchOutcome, EventRouter};

// Re-export the vehicle types that appear in this crate's API
pub use vehicle_api::{PropertyId, PropertyValue, Zone, ZoneMask};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::config::{ControlSpec, EngineConfig, RoleSpec};
    pub use crate::engine::ControlEngine;
    pub use crate::error::{ControlError, Result};
    pub use crate::iter::ControlChange;
    pub use crate::model::ControlId;
    pub use vehicle_api::{PropertyValue, Zone};
}
