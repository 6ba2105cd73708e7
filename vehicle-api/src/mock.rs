//! In-memory vehicle HAL emulator for tests and demos
//!
//! `MockVehicle` keeps per-zone property values, records every write and
//! lets tests inject change events, error events and read failures.
//!
//! ```rust,ignore
//! let vehicle = MockVehicle::hvac();
//! vehicle.set_confirm_mode(ConfirmMode::Silent);   // writes are lost
//! vehicle.fail_next_reads(2, TransportError::NotReady);
//! vehicle.inject_event(HardwareEvent::new(hvac::FAN_SPEED, hvac::zones::ROW_1_ALL, 4));
//! ```

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

use crate::error::{Result, TransportError};
use crate::hvac;
use crate::property::{PropertyDescriptor, PropertyId, ValueDomain};
use crate::transport::{HardwareErrorEvent, HardwareEvent, HardwareListener, ListenerId, VehicleTransport};
use crate::value::PropertyValue;
use crate::zone::Zone;

/// How the emulator reacts to a write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConfirmMode {
    /// Apply the write (clamped to the property domain) and emit a change event
    #[default]
    Echo,
    /// Record the write but never apply or confirm it
    Silent,
}

/// A write received by the emulator
#[derive(Debug, Clone, PartialEq)]
pub struct WriteRecord {
    pub property: PropertyId,
    pub zone: Zone,
    pub value: PropertyValue,
}

#[derive(Default)]
struct Inner {
    descriptors: Vec<PropertyDescriptor>,
    values: HashMap<(PropertyId, Zone), PropertyValue>,
    writes: Vec<WriteRecord>,
    reads: usize,
    read_failures: VecDeque<TransportError>,
    read_latency: Duration,
    confirm: ConfirmMode,
    listeners: Vec<(ListenerId, Arc<dyn HardwareListener>)>,
    next_listener: u64,
    list_failure: Option<TransportError>,
}

impl Inner {
    fn descriptor(&self, property: PropertyId) -> Option<&PropertyDescriptor> {
        self.descriptors.iter().find(|d| d.id == property)
    }
}

/// Vehicle HAL emulator implementing [`VehicleTransport`]
#[derive(Clone, Default)]
pub struct MockVehicle {
    inner: Arc<Mutex<Inner>>,
}

impl MockVehicle {
    pub fn new(descriptors: Vec<PropertyDescriptor>) -> Self {
        let inner = Inner {
            descriptors,
            ..Default::default()
        };
        Self {
            inner: Arc::new(Mutex::new(inner)),
        }
    }

    /// Emulator preloaded with [`hvac::cabin_descriptors`] and plausible values
    pub fn hvac() -> Self {
        let vehicle = Self::new(hvac::cabin_descriptors());
        vehicle.set_value(hvac::FAN_SPEED, hvac::zones::ROW_1_ALL, PropertyValue::Int(1));
        vehicle.set_value(
            hvac::FAN_DIRECTION,
            hvac::zones::ROW_1_ALL,
            hvac::FanDirection::Face.into(),
        );
        vehicle.set_value(hvac::TEMPERATURE_SETPOINT, hvac::zones::ROW_1_LEFT, PropertyValue::Float(23.0));
        vehicle.set_value(hvac::TEMPERATURE_SETPOINT, hvac::zones::ROW_1_RIGHT, PropertyValue::Float(23.0));
        vehicle.set_value(hvac::AC_ON, hvac::zones::ROW_1_ALL, PropertyValue::Bool(false));
        vehicle.set_value(hvac::DEFROSTER, hvac::windows::FRONT_WINDSHIELD, PropertyValue::Bool(false));
        vehicle.set_value(hvac::DEFROSTER, hvac::windows::REAR_WINDSHIELD, PropertyValue::Bool(false));
        vehicle
    }

    /// Set hardware state without emitting an event
    pub fn set_value(&self, property: PropertyId, zone: Zone, value: PropertyValue) {
        self.inner.lock().values.insert((property, zone), value);
    }

    /// Current hardware state
    pub fn value(&self, property: PropertyId, zone: Zone) -> Option<PropertyValue> {
        self.inner.lock().values.get(&(property, zone)).copied()
    }

    pub fn set_confirm_mode(&self, mode: ConfirmMode) {
        self.inner.lock().confirm = mode;
    }

    /// Make the next `count` reads fail with `error`
    pub fn fail_next_reads(&self, count: usize, error: TransportError) {
        let mut inner = self.inner.lock();
        inner.read_failures.extend(std::iter::repeat(error).take(count));
    }

    /// Delay every read by `latency`
    pub fn set_read_latency(&self, latency: Duration) {
        self.inner.lock().read_latency = latency;
    }

    /// Make property listing fail
    pub fn fail_listing(&self, error: TransportError) {
        self.inner.lock().list_failure = Some(error);
    }

    /// All writes received so far, oldest first
    pub fn writes(&self) -> Vec<WriteRecord> {
        self.inner.lock().writes.clone()
    }

    /// Number of read attempts received so far
    pub fn read_count(&self) -> usize {
        self.inner.lock().reads
    }

    pub fn listener_count(&self) -> usize {
        self.inner.lock().listeners.len()
    }

    /// Emit a change event, updating hardware state for every zone it covers
    pub fn inject_event(&self, event: HardwareEvent) {
        {
            let mut inner = self.inner.lock();
            for zone in event.zones {
                inner.values.insert((event.property, zone), event.value);
            }
        }
        for listener in self.listeners() {
            listener.on_change_event(event.clone());
        }
    }

    /// Emit an error notification
    pub fn inject_error(&self, error: HardwareErrorEvent) {
        for listener in self.listeners() {
            listener.on_error_event(error.clone());
        }
    }

    // listeners are called without the lock held so they may call back in
    fn listeners(&self) -> Vec<Arc<dyn HardwareListener>> {
        self.inner
            .lock()
            .listeners
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect()
    }
}

impl VehicleTransport for MockVehicle {
    fn list_supported_properties(&self) -> Result<Vec<PropertyDescriptor>> {
        let inner = self.inner.lock();
        match &inner.list_failure {
            Some(error) => Err(error.clone()),
            None => Ok(inner.descriptors.clone()),
        }
    }

    fn read_property(&self, property: PropertyId, zone: Zone, timeout: Duration) -> Result<PropertyValue> {
        let latency = {
            let mut inner = self.inner.lock();
            inner.reads += 1;
            if let Some(error) = inner.read_failures.pop_front() {
                return Err(error);
            }
            inner.read_latency
        };

        if latency > timeout {
            thread::sleep(timeout);
            return Err(TransportError::Timeout(timeout));
        }
        if !latency.is_zero() {
            thread::sleep(latency);
        }

        let inner = self.inner.lock();
        let descriptor = inner
            .descriptor(property)
            .ok_or(TransportError::PropertyNotFound(property))?;
        if !descriptor.access.readable() {
            return Err(TransportError::AccessDenied(property));
        }
        if !descriptor.zones.contains(zone) {
            return Err(TransportError::ZoneNotSupported { property, zone });
        }

        let value = inner
            .values
            .get(&(property, zone))
            .copied()
            .unwrap_or_else(|| default_value(&descriptor.domain));
        Ok(value)
    }

    fn write_property(&self, property: PropertyId, zone: Zone, value: PropertyValue) {
        let confirmation = {
            let mut inner = self.inner.lock();
            inner.writes.push(WriteRecord {
                property,
                zone,
                value,
            });

            let Some(descriptor) = inner.descriptor(property) else {
                tracing::warn!("Mock vehicle: write to unknown property {}", property);
                return;
            };
            if !descriptor.access.writable() || !descriptor.zones.contains(zone) {
                tracing::warn!("Mock vehicle: rejected write to {} zone {}", property, zone);
                return;
            }
            let applied = descriptor.domain.clamp(value).unwrap_or(value);

            match inner.confirm {
                ConfirmMode::Silent => None,
                ConfirmMode::Echo => {
                    inner.values.insert((property, zone), applied);
                    Some(HardwareEvent::new(property, zone, applied))
                }
            }
        };

        if let Some(event) = confirmation {
            for listener in self.listeners() {
                listener.on_change_event(event.clone());
            }
        }
    }

    fn subscribe(&self, listener: Arc<dyn HardwareListener>) -> ListenerId {
        let mut inner = self.inner.lock();
        inner.next_listener += 1;
        let id = ListenerId(inner.next_listener);
        inner.listeners.push((id, listener));
        id
    }

    fn unsubscribe(&self, id: ListenerId) {
        self.inner.lock().listeners.retain(|(existing, _)| *existing != id);
    }
}

fn default_value(domain: &ValueDomain) -> PropertyValue {
    match *domain {
        ValueDomain::Boolean => PropertyValue::Bool(false),
        ValueDomain::Int { min, .. } => PropertyValue::Int(min),
        ValueDomain::Float { min, .. } => PropertyValue::Float(min),
    }
}
