//! Contract between the control layer and the vehicle hardware service
//!
//! The transport is the only way the control layer touches hardware:
//!
//! ```text
//! list_supported_properties() ──► descriptors (once, at setup)
//! read_property(id, zone)     ──► value       (blocking, bounded by timeout)
//! write_property(id, zone, v) ──► ()          (fire-and-forget)
//! subscribe(listener)         ──► change events + error events (async)
//! ```
//!
//! A write is confirmed only by a later change event. A write that fails
//! inside the hardware is observable solely as a missing confirmation.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::property::{PropertyDescriptor, PropertyId};
use crate::value::PropertyValue;
use crate::zone::{Zone, ZoneMask};

/// A property change reported by the hardware
///
/// One event may cover several zones at once (e.g. both windshields).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HardwareEvent {
    pub property: PropertyId,
    pub zones: ZoneMask,
    pub value: PropertyValue,
}

impl HardwareEvent {
    pub fn new(property: PropertyId, zones: impl Into<ZoneMask>, value: impl Into<PropertyValue>) -> Self {
        Self {
            property,
            zones: zones.into(),
            value: value.into(),
        }
    }
}

/// An error notification reported by the hardware for a property
///
/// An empty zone mask applies to every zone of the property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HardwareErrorEvent {
    pub property: PropertyId,
    pub zones: ZoneMask,
    pub code: i32,
}

impl HardwareErrorEvent {
    pub fn new(property: PropertyId, zones: impl Into<ZoneMask>, code: i32) -> Self {
        Self {
            property,
            zones: zones.into(),
            code,
        }
    }

    /// Whether this error concerns `zone`
    pub fn applies_to(&self, zone: Zone) -> bool {
        self.zones.is_empty() || self.zones.contains(zone)
    }
}

/// Handle returned by [`VehicleTransport::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// Receiver of asynchronous hardware notifications
///
/// Callbacks may arrive on any thread and must not block.
pub trait HardwareListener: Send + Sync {
    fn on_change_event(&self, event: HardwareEvent);

    fn on_error_event(&self, error: HardwareErrorEvent);
}

/// Hardware/service boundary consumed by the control layer
pub trait VehicleTransport: Send + Sync {
    /// Properties this vehicle supports
    fn list_supported_properties(&self) -> Result<Vec<PropertyDescriptor>>;

    /// Synchronously read the current value of `property` in `zone`
    ///
    /// Implementations must give up after `timeout`.
    fn read_property(&self, property: PropertyId, zone: Zone, timeout: Duration) -> Result<PropertyValue>;

    /// Request that the hardware set `property` in `zone` to `value`
    fn write_property(&self, property: PropertyId, zone: Zone, value: PropertyValue);

    fn subscribe(&self, listener: Arc<dyn HardwareListener>) -> ListenerId;

    fn unsubscribe(&self, id: ListenerId);
}
