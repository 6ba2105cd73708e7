//! Property identity, value domains and descriptors
//!
//! A [`PropertyDescriptor`] is what the hardware layer reports for each
//! property it supports: the id, the zones it applies to, the legal value
//! domain and whether it can be read and/or written. Descriptors never change
//! after they are listed.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::value::{PropertyValue, ValueKind};
use crate::zone::ZoneMask;

/// Identifier of a hardware property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertyId(u32);

impl PropertyId {
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for PropertyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:04x}", self.0)
    }
}

/// Read/write capability of a property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyAccess {
    Read,
    Write,
    #[default]
    ReadWrite,
}

impl PropertyAccess {
    pub fn readable(self) -> bool {
        matches!(self, PropertyAccess::Read | PropertyAccess::ReadWrite)
    }

    pub fn writable(self) -> bool {
        matches!(self, PropertyAccess::Write | PropertyAccess::ReadWrite)
    }
}

/// Declared value domain of a property
///
/// Numeric domains carry `min`, `max` and `step`. A non-positive step (or an
/// int step of one) means any value in range is legal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValueDomain {
    Boolean,
    Int { min: i32, max: i32, step: i32 },
    Float { min: f32, max: f32, step: f32 },
}

impl ValueDomain {
    pub fn kind(&self) -> ValueKind {
        match self {
            ValueDomain::Boolean => ValueKind::Boolean,
            ValueDomain::Int { .. } => ValueKind::Int,
            ValueDomain::Float { .. } => ValueKind::Float,
        }
    }

    /// Whether `value` has the right kind and lies within [min, max]
    pub fn contains(&self, value: &PropertyValue) -> bool {
        match (self, value) {
            (ValueDomain::Boolean, PropertyValue::Bool(_)) => true,
            (ValueDomain::Int { min, max, .. }, PropertyValue::Int(v)) => min <= v && v <= max,
            (ValueDomain::Float { min, max, .. }, PropertyValue::Float(v)) => min <= v && v <= max,
            _ => false,
        }
    }

    /// Map a requested value onto the closest legal value of this domain
    ///
    /// Int and float requests are converted to the domain's numeric kind,
    /// bounded to [min, max] and snapped to the nearest step counted from
    /// `min`. Only a boolean/numeric mix is an error.
    pub fn clamp(&self, requested: PropertyValue) -> Result<PropertyValue, DomainError> {
        match (*self, requested) {
            (ValueDomain::Boolean, PropertyValue::Bool(b)) => Ok(PropertyValue::Bool(b)),
            (ValueDomain::Int { min, max, step }, PropertyValue::Int(v)) => {
                Ok(PropertyValue::Int(clamp_int(v, min, max, step)))
            }
            (ValueDomain::Int { min, max, step }, PropertyValue::Float(v)) => {
                // `as` saturates and maps NaN to zero
                Ok(PropertyValue::Int(clamp_int(v.round() as i32, min, max, step)))
            }
            (ValueDomain::Float { min, max, step }, PropertyValue::Float(v)) => {
                Ok(PropertyValue::Float(clamp_float(v, min, max, step)))
            }
            (ValueDomain::Float { min, max, step }, PropertyValue::Int(v)) => {
                Ok(PropertyValue::Float(clamp_float(v as f32, min, max, step)))
            }
            (domain, value) => Err(DomainError::KindMismatch {
                expected: domain.kind(),
                actual: value.kind(),
            }),
        }
    }
}

fn clamp_int(value: i32, min: i32, max: i32, step: i32) -> i32 {
    // no Ord::clamp here: a misreported domain with min > max must not panic
    let bounded = value.max(min).min(max);
    if step <= 1 {
        return bounded;
    }

    let step = i64::from(step);
    let offset = i64::from(bounded) - i64::from(min);
    let steps = (offset + step / 2).div_euclid(step);
    let snapped = i64::from(min) + steps * step;

    snapped.clamp(i64::from(i32::MIN), i64::from(max)) as i32
}

fn clamp_float(value: f32, min: f32, max: f32, step: f32) -> f32 {
    // f32::max ignores NaN, so a NaN request lands on `min`
    let bounded = value.max(min).min(max);
    if step.is_nan() || step <= 0.0 {
        return bounded;
    }

    let steps = ((bounded - min) / step).round();
    (min + steps * step).min(max)
}

/// Immutable description of a property supported by the vehicle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyDescriptor {
    pub id: PropertyId,
    /// Zones this property applies to
    pub zones: ZoneMask,
    pub domain: ValueDomain,
    #[serde(default)]
    pub access: PropertyAccess,
}

impl PropertyDescriptor {
    /// Create a read/write descriptor
    pub fn new(id: PropertyId, zones: ZoneMask, domain: ValueDomain) -> Self {
        Self {
            id,
            zones,
            domain,
            access: PropertyAccess::ReadWrite,
        }
    }

    pub fn with_access(mut self, access: PropertyAccess) -> Self {
        self.access = access;
        self
    }

    pub fn kind(&self) -> ValueKind {
        self.domain.kind()
    }
}
