//! Vehicle property API
//!
//! Typed building blocks shared by everything that talks to the vehicle
//! hardware service:
//!
//! - **Zones**: single-bit [`Zone`] flags and [`ZoneMask`] sets with
//!   deterministic ascending enumeration
//! - **Properties**: [`PropertyId`], [`PropertyValue`], [`ValueDomain`]
//!   (with clamping) and immutable [`PropertyDescriptor`]s
//! - **Transport**: the [`VehicleTransport`] contract (read, fire-and-forget
//!   write, listener subscription) and its [`TransportError`]s
//! - **HVAC**: well-known property ids and zone flags in [`hvac`]
//!
//! With the `test-support` feature, [`mock::MockVehicle`] emulates the
//! hardware service in memory.
//!
//! # Example
//!
//! ```rust
//! use vehicle_api::{hvac, PropertyValue, ValueDomain};
//!
//! let domain = ValueDomain::Float { min: 16.0, max: 30.0, step: 0.5 };
//! let clamped = domain.clamp(PropertyValue::Float(35.0)).unwrap();
//! assert_eq!(clamped, PropertyValue::Float(30.0));
//!
//! let zones = hvac::zones::ROW_1_LEFT | hvac::zones::ROW_1_RIGHT;
//! assert_eq!(zones.first_zone(), Some(hvac::zones::ROW_1_LEFT));
//! ```

pub mod error;
pub mod hvac;
pub mod property;
pub mod transport;
pub mod value;
pub mod zone;

#[cfg(any(test, feature = "test-support"))]
pub mod mock;

pub use error::{DomainError, Result, TransportError};
pub use property::{PropertyAccess, PropertyDescriptor, PropertyId, ValueDomain};
pub use transport::{HardwareErrorEvent, HardwareEvent, HardwareListener, ListenerId, VehicleTransport};
pub use value::{PropertyValue, ValueKind};
pub use zone::{InvalidZone, Zone, ZoneMask, Zones};
