use std::time::Duration;

use thiserror::Error;

use crate::property::PropertyId;
use crate::value::ValueKind;
use crate::zone::Zone;

/// Errors reported by a vehicle transport
///
/// Writes are fire-and-forget and never surface these; only reads and
/// property listing do.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransportError {
    /// The hardware has not fetched its data yet; the request may be retried
    #[error("Vehicle hardware not ready")]
    NotReady,

    /// No answer within the allowed time
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// The property is not provided by this vehicle
    #[error("Property {0} not supported")]
    PropertyNotFound(PropertyId),

    /// The property exists but not in the requested zone
    #[error("Property {property} not supported in zone {zone}")]
    ZoneNotSupported { property: PropertyId, zone: Zone },

    /// The property cannot be accessed in the requested direction
    #[error("Access to property {0} not allowed")]
    AccessDenied(PropertyId),

    /// Connection to the vehicle service is gone
    #[error("Vehicle service disconnected")]
    Disconnected,
}

impl TransportError {
    /// Whether retrying the same request may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, TransportError::NotReady)
    }
}

/// Errors raised while mapping a value onto a property's domain
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("Expected a {expected} value, got {actual}")]
    KindMismatch { expected: ValueKind, actual: ValueKind },
}

/// Result type for transport operations
pub type Result<T> = std::result::Result<T, TransportError>;
