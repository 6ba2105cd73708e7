//! Push notifications for the display surface
//!
//! A [`ControlChanges`] starts with the current value of every bound
//! (property, zone) key, then yields each later change, whether projected by
//! a command or reported by the hardware, tagged with the id of the control it
//! belongs to.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use state_store::{ChangeEvent, ChangeIterator};
use vehicle_api::PropertyValue;

use crate::model::{ControlId, PropertyKey};

/// A projected value of a control changed
#[derive(Debug, Clone)]
pub struct ControlChange {
    pub control: ControlId,
    pub value: PropertyValue,
    pub timestamp: Instant,
}

impl PartialEq for ControlChange {
    fn eq(&self, other: &Self) -> bool {
        self.control == other.control && self.value == other.value
    }
}

/// Blocking iterator over control changes
///
/// Each iterator is its own subscription and sees every change. Dropping it
/// unsubscribes.
pub struct ControlChanges {
    inner: ChangeIterator<PropertyKey, PropertyValue>,
    controls: Arc<HashMap<PropertyKey, ControlId>>,
}

impl ControlChanges {
    pub(crate) fn new(
        inner: ChangeIterator<PropertyKey, PropertyValue>,
        controls: Arc<HashMap<PropertyKey, ControlId>>,
    ) -> Self {
        Self { inner, controls }
    }

    /// Block until the next change; `None` once the engine is shut down
    pub fn recv(&self) -> Option<ControlChange> {
        loop {
            let event = self.inner.recv()?;
            if let Some(change) = self.to_control_change(event) {
                return Some(change);
            }
        }
    }

    /// Block until the next change or until `timeout` expires
    pub fn recv_timeout(&self, timeout: Duration) -> Option<ControlChange> {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let event = self.inner.recv_timeout(remaining)?;
            if let Some(change) = self.to_control_change(event) {
                return Some(change);
            }
        }
    }

    /// Next change if one is already queued
    pub fn try_recv(&self) -> Option<ControlChange> {
        loop {
            let event = self.inner.try_recv()?;
            if let Some(change) = self.to_control_change(event) {
                return Some(change);
            }
        }
    }

    /// Iterator over the changes queued right now
    pub fn try_iter(&self) -> impl Iterator<Item = ControlChange> + '_ {
        std::iter::from_fn(move || self.try_recv())
    }

    /// Iterator that stops after `timeout` passes without a change
    pub fn timeout_iter(&self, timeout: Duration) -> impl Iterator<Item = ControlChange> + '_ {
        std::iter::from_fn(move || self.recv_timeout(timeout))
    }

    fn to_control_change(&self, event: ChangeEvent<PropertyKey, PropertyValue>) -> Option<ControlChange> {
        let control = self.controls.get(&event.key)?.clone();
        Some(ControlChange {
            control,
            value: event.value,
            timestamp: event.timestamp,
        })
    }
}

impl Iterator for ControlChanges {
    type Item = ControlChange;

    fn next(&mut self) -> Option<Self::Item> {
        self.recv()
    }
}
