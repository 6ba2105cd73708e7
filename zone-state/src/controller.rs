//! Per-zone property controller
//!
//! One `PropertyController` drives one property in one zone. A paired
//! control (driver/passenger temperature) is two controllers that share
//! nothing but the store.
//!
//! ```text
//!                 initialize (read ok)
//!  Uninitialized ───────────────────────► Idle ◄──────────────┐
//!        │                                 │                   │
//!        │ read failed / timed out         │ request_change    │ hardware event
//!        ▼                                 ▼                   │
//!     Disabled ──── hardware event ──► PendingCommand ─────────┘
//! ```
//!
//! A hardware event always wins: whatever the state, its value becomes the
//! projected value and the controller returns to `Idle`. Echoes of our own
//! writes are not told apart from changes made by someone else.

use std::thread;
use std::time::{Duration, Instant};

use serde::Serialize;
use vehicle_api::{
    DomainError, PropertyDescriptor, PropertyId, PropertyValue, TransportError, VehicleTransport, Zone,
};

use crate::error::{ControlError, Result};
use crate::model::{ControlId, PropertyKey, PropertyStore};

/// Lifecycle of a controller
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ControllerState {
    /// Initial read not attempted yet
    Uninitialized,
    /// Initial state could not be read; commands are refused
    Disabled,
    /// Projection matches the last hardware report
    Idle,
    /// A command was sent and no hardware event has arrived since
    PendingCommand { requested: PropertyValue },
}

impl ControllerState {
    pub fn is_enabled(&self) -> bool {
        matches!(self, ControllerState::Idle | ControllerState::PendingCommand { .. })
    }

    pub fn pending(&self) -> Option<PropertyValue> {
        match self {
            ControllerState::PendingCommand { requested } => Some(*requested),
            _ => None,
        }
    }
}

/// Bounds of the blocking initial read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadPolicy {
    /// Overall budget for the read, retries included
    pub timeout: Duration,
    /// How many times a not-ready answer is retried
    pub retries: u32,
    /// Pause between retries
    pub retry_delay: Duration,
}

impl Default for ReadPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(1),
            retries: 3,
            retry_delay: Duration::from_millis(100),
        }
    }
}

/// Controller of one property in one zone
#[derive(Debug)]
pub struct PropertyController {
    id: ControlId,
    descriptor: PropertyDescriptor,
    zone: Zone,
    store: PropertyStore,
    state: ControllerState,
    last_error: Option<i32>,
}

impl PropertyController {
    pub fn new(id: ControlId, descriptor: PropertyDescriptor, zone: Zone, store: PropertyStore) -> Self {
        Self {
            id,
            descriptor,
            zone,
            store,
            state: ControllerState::Uninitialized,
            last_error: None,
        }
    }

    pub fn id(&self) -> &ControlId {
        &self.id
    }

    pub fn property(&self) -> PropertyId {
        self.descriptor.id
    }

    pub fn zone(&self) -> Zone {
        self.zone
    }

    pub fn key(&self) -> PropertyKey {
        PropertyKey::new(self.descriptor.id, self.zone)
    }

    pub fn descriptor(&self) -> &PropertyDescriptor {
        &self.descriptor
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn is_enabled(&self) -> bool {
        self.state.is_enabled()
    }

    /// Code of the last hardware error reported for this zone
    pub fn last_error(&self) -> Option<i32> {
        self.last_error
    }

    /// Last projected value, `None` while unknown
    pub fn current_value(&self) -> Option<PropertyValue> {
        self.store.get(&self.key())
    }

    /// Read the initial hardware state and seed the store
    ///
    /// On failure the controller is left `Disabled` and the error returned;
    /// a write-only property starts `Idle` with an unknown value.
    pub fn initialize(&mut self, transport: &dyn VehicleTransport, policy: &ReadPolicy) -> Result<()> {
        if !self.descriptor.access.readable() {
            tracing::debug!("{}: property {} is write-only, skipping initial read", self.id, self.property());
            self.state = ControllerState::Idle;
            return Ok(());
        }

        let value = match self.read_with_retry(transport, policy) {
            Ok(value) => value,
            Err(e) => {
                self.state = ControllerState::Disabled;
                return Err(e.into());
            }
        };

        let expected = self.descriptor.kind();
        if value.kind() != expected {
            self.state = ControllerState::Disabled;
            return Err(ControlError::Domain {
                control: self.id.clone(),
                source: DomainError::KindMismatch {
                    expected,
                    actual: value.kind(),
                },
            });
        }

        self.store.update(&self.key(), value);
        self.state = ControllerState::Idle;
        tracing::debug!("{}: initial value {}", self.id, value);
        Ok(())
    }

    fn read_with_retry(
        &self,
        transport: &dyn VehicleTransport,
        policy: &ReadPolicy,
    ) -> std::result::Result<PropertyValue, TransportError> {
        let deadline = Instant::now() + policy.timeout;
        let mut attempts = 0;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(TransportError::Timeout(policy.timeout));
            }

            match transport.read_property(self.property(), self.zone, remaining) {
                Err(e) if e.is_retryable() && attempts < policy.retries => {
                    attempts += 1;
                    tracing::debug!("{}: read not ready, retry {}/{}", self.id, attempts, policy.retries);
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    thread::sleep(policy.retry_delay.min(remaining));
                }
                result => return result,
            }
        }
    }

    /// Clamp `requested` to the property domain, project it and send it
    ///
    /// Returns the value actually written. The projection stays at that
    /// value until a hardware event says otherwise.
    pub fn request_change(&mut self, transport: &dyn VehicleTransport, requested: PropertyValue) -> Result<PropertyValue> {
        if !self.state.is_enabled() {
            return Err(ControlError::Disabled(self.id.clone()));
        }
        if !self.descriptor.access.writable() {
            return Err(ControlError::ReadOnly(self.id.clone()));
        }

        let value = self
            .descriptor
            .domain
            .clamp(requested)
            .map_err(|source| ControlError::Domain {
                control: self.id.clone(),
                source,
            })?;
        if value != requested {
            tracing::debug!("{}: clamped request {} to {}", self.id, requested, value);
        }

        self.store.update(&self.key(), value);
        self.state = ControllerState::PendingCommand { requested: value };
        transport.write_property(self.property(), self.zone, value);
        Ok(value)
    }

    /// Accept a value reported by the hardware for this zone
    ///
    /// Returns whether the projected value changed.
    pub fn on_hardware_event(&mut self, value: PropertyValue) -> bool {
        match self.state {
            ControllerState::PendingCommand { requested } if requested != value => {
                tracing::debug!("{}: hardware reported {} instead of requested {}", self.id, value, requested);
            }
            ControllerState::Disabled => {
                tracing::info!("{}: re-enabled by hardware event", self.id);
            }
            _ => {}
        }

        self.state = ControllerState::Idle;
        self.store.update(&self.key(), value)
    }

    /// Record a hardware error reported for this zone
    pub fn on_hardware_error(&mut self, code: i32) {
        self.last_error = Some(code);
    }
}
