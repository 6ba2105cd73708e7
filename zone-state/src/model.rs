//! Identity types for controls and projected state

use std::fmt;

use serde::{Deserialize, Serialize};
use vehicle_api::{PropertyId, PropertyValue, Zone};

/// Identifier of a logical control as seen by the display surface
///
/// A paired control (left/right temperature) is two controls with two ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ControlId(String);

impl ControlId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ControlId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ControlId {
    fn from(s: &str) -> Self {
        ControlId::new(s)
    }
}

impl From<String> for ControlId {
    fn from(s: String) -> Self {
        ControlId::new(s)
    }
}

/// Key of one projected value: a property in one zone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PropertyKey {
    pub property: PropertyId,
    pub zone: Zone,
}

impl PropertyKey {
    pub fn new(property: PropertyId, zone: Zone) -> Self {
        Self { property, zone }
    }
}

impl fmt::Display for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.property, self.zone)
    }
}

/// In-memory projection of last-known hardware state
///
/// Written only by the control loop; read by anyone holding a clone.
pub type PropertyStore = state_store::StateStore<PropertyKey, PropertyValue>;
