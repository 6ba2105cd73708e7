//! Configuration for the control engine
//!
//! A configuration lists the logical controls of a panel and bounds the
//! blocking initial read. It can be built in code, from a named preset or
//! loaded from JSON:
//!
//! ```json
//! {
//!   "read_timeout_ms": 1000,
//!   "read_retries": 3,
//!   "retry_delay_ms": 100,
//!   "controls": [
//!     {
//!       "property": 1283,
//!       "primary": { "id": "driver_temperature", "prefer": [1] },
//!       "secondary": { "id": "passenger_temperature", "prefer": [4] }
//!     }
//!   ]
//! }
//! ```

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use vehicle_api::hvac::{self, windows, zones};
use vehicle_api::{PropertyId, Zone};

use crate::controller::ReadPolicy;
use crate::error::{ControlError, Result};
use crate::model::ControlId;
use crate::resolver::RolePreferences;

/// One role of a control: the id shown to the display and its zone choices
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleSpec {
    pub id: ControlId,
    /// Preferred zones, most preferred first
    #[serde(default)]
    pub prefer: Vec<Zone>,
}

impl RoleSpec {
    pub fn new(id: impl Into<ControlId>, prefer: impl IntoIterator<Item = Zone>) -> Self {
        Self {
            id: id.into(),
            prefer: prefer.into_iter().collect(),
        }
    }
}

/// A logical control driving one property
///
/// With a `secondary` role the control is paired: each role becomes its
/// own controller bound to its own zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlSpec {
    pub property: PropertyId,
    pub primary: RoleSpec,
    #[serde(default)]
    pub secondary: Option<RoleSpec>,
    /// Only bind to preferred zones, never to whatever the mask offers
    #[serde(default)]
    pub strict: bool,
}

impl ControlSpec {
    /// Unpaired control
    pub fn single(property: PropertyId, id: impl Into<ControlId>, prefer: impl IntoIterator<Item = Zone>) -> Self {
        Self {
            property,
            primary: RoleSpec::new(id, prefer),
            secondary: None,
            strict: false,
        }
    }

    /// Control with a primary and a secondary role
    pub fn paired(property: PropertyId, primary: RoleSpec, secondary: RoleSpec) -> Self {
        Self {
            property,
            primary,
            secondary: Some(secondary),
            strict: false,
        }
    }

    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    /// Control ids declared by this spec, primary first
    pub fn ids(&self) -> impl Iterator<Item = &ControlId> {
        std::iter::once(&self.primary.id).chain(self.secondary.as_ref().map(|s| &s.id))
    }

    /// Zone preferences fed to the resolver
    pub fn preferences(&self) -> RolePreferences {
        RolePreferences {
            primary: self.primary.prefer.clone(),
            secondary: self.secondary.as_ref().map(|s| s.prefer.clone()),
            fallback: !self.strict,
        }
    }
}

/// Configuration for the [`ControlEngine`](crate::ControlEngine)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Overall budget of each initial read, retries included
    /// Default: 1 second
    #[serde(rename = "read_timeout_ms", with = "duration_ms", default = "defaults::read_timeout")]
    pub read_timeout: Duration,

    /// Retries of a read answered with "not ready"
    /// Default: 3
    #[serde(default = "defaults::read_retries")]
    pub read_retries: u32,

    /// Pause between read retries
    /// Default: 100 milliseconds
    #[serde(rename = "retry_delay_ms", with = "duration_ms", default = "defaults::retry_delay")]
    pub retry_delay: Duration,

    /// Controls of the panel
    #[serde(default)]
    pub controls: Vec<ControlSpec>,
}

mod defaults {
    use std::time::Duration;

    pub fn read_timeout() -> Duration {
        Duration::from_secs(1)
    }

    pub fn read_retries() -> u32 {
        3
    }

    pub fn retry_delay() -> Duration {
        Duration::from_millis(100)
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        let millis = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        serializer.serialize_u64(millis)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            read_timeout: defaults::read_timeout(),
            read_retries: defaults::read_retries(),
            retry_delay: defaults::retry_delay(),
            controls: Vec::new(),
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Climate panel of a two-zone cabin
    ///
    /// Fan speed and direction, paired driver/passenger temperature, A/C and
    /// one defrost toggle per windshield. The defrost toggles only exist on
    /// vehicles that report their window.
    pub fn hvac() -> Self {
        Self::default()
            .with_control(ControlSpec::single(hvac::FAN_SPEED, "fan_speed", [zones::ROW_1_ALL]))
            .with_control(ControlSpec::single(hvac::FAN_DIRECTION, "fan_direction", [zones::ROW_1_ALL]))
            .with_control(ControlSpec::paired(
                hvac::TEMPERATURE_SETPOINT,
                RoleSpec::new("driver_temperature", [zones::ROW_1_LEFT]),
                RoleSpec::new("passenger_temperature", [zones::ROW_1_RIGHT]),
            ))
            .with_control(ControlSpec::single(hvac::AC_ON, "ac", [zones::ROW_1_ALL]))
            .with_control(ControlSpec::single(hvac::DEFROSTER, "front_defrost", [windows::FRONT_WINDSHIELD]).strict())
            .with_control(ControlSpec::single(hvac::DEFROSTER, "rear_defrost", [windows::REAR_WINDSHIELD]).strict())
    }

    /// Parse a JSON configuration and validate it
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON configuration file and validate it
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Validate the configuration and return any issues
    pub fn validate(&self) -> Result<()> {
        if self.read_timeout.is_zero() {
            return Err(ControlError::Config("Read timeout must be greater than 0".to_string()));
        }

        let mut seen = HashSet::new();
        for id in self.controls.iter().flat_map(|c| c.ids()) {
            if id.as_str().is_empty() {
                return Err(ControlError::Config("Control ids must not be empty".to_string()));
            }
            if !seen.insert(id) {
                return Err(ControlError::Config(format!("Control id {} is declared twice", id)));
            }
        }

        Ok(())
    }

    /// Bounds of the initial read derived from this configuration
    pub fn read_policy(&self) -> ReadPolicy {
        ReadPolicy {
            timeout: self.read_timeout,
            retries: self.read_retries,
            retry_delay: self.retry_delay,
        }
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn with_read_retries(mut self, retries: u32, delay: Duration) -> Self {
        self.read_retries = retries;
        self.retry_delay = delay;
        self
    }

    pub fn with_control(mut self, control: ControlSpec) -> Self {
        self.controls.push(control);
        self
    }
}
