//! Error types for zone-state

use thiserror::Error;
use vehicle_api::{DomainError, PropertyId, TransportError, Zone};

use crate::model::ControlId;

/// Result type for zone-state operations
pub type Result<T> = std::result::Result<T, ControlError>;

/// Errors surfaced by the control layer
///
/// None of these is fatal to the engine: a failing control degrades on its
/// own while every other control keeps working.
#[derive(Debug, Error)]
pub enum ControlError {
    /// No control with this id is registered
    #[error("Unknown control: {0}")]
    UnknownControl(ControlId),

    /// The control could not read its initial state and accepts no commands
    #[error("Control {0} is disabled")]
    Disabled(ControlId),

    /// The bound property cannot be written
    #[error("Control {0} is bound to a read-only property")]
    ReadOnly(ControlId),

    /// The requested value cannot be mapped onto the property domain
    #[error("Invalid value for control {control}: {source}")]
    Domain {
        control: ControlId,
        #[source]
        source: DomainError,
    },

    /// A control with the same id is already registered
    #[error("Duplicate control id: {0}")]
    DuplicateControl(ControlId),

    /// Another control already reads and writes this property zone
    #[error("Property {property} zone {zone} is already bound to control {existing}")]
    ZoneAlreadyBound {
        property: PropertyId,
        zone: Zone,
        existing: ControlId,
    },

    /// Error from the vehicle transport
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration could not be parsed
    #[error("Configuration parse error: {0}")]
    ConfigParse(#[from] serde_json::Error),

    /// Configuration file could not be read
    #[error("Configuration I/O error: {0}")]
    ConfigIo(#[from] std::io::Error),

    /// The control loop is no longer running
    #[error("Control loop has stopped")]
    LoopStopped,
}
