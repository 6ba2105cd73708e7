//! Zone resolution for logical controls
//!
//! A logical control ("driver temperature", "front defrost") is bound once,
//! at setup, to one or two physical zones taken from the zone mask of the
//! property it drives. Resolution only depends on the mask and the role
//! preferences, so the same inputs always give the same binding:
//!
//! 1. Primary: the first preferred zone present in the mask, otherwise the
//!    lowest zone of the mask (unless fallback is disabled).
//! 2. Secondary (paired controls only): the first preferred zone present in
//!    the mask and distinct from the primary, otherwise the next zone after
//!    the primary.
//! 3. A mask with fewer than two zones never yields a secondary.

use serde::{Deserialize, Serialize};
use vehicle_api::{PropertyDescriptor, Zone, ZoneMask};

/// Preferred zones for each role of a control
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolePreferences {
    /// Candidates for the primary zone, most preferred first
    #[serde(default)]
    pub primary: Vec<Zone>,

    /// Candidates for the paired secondary zone; `None` for unpaired controls
    #[serde(default)]
    pub secondary: Option<Vec<Zone>>,

    /// Fall back to first/next zone of the mask when no preference matches
    #[serde(default = "default_fallback")]
    pub fallback: bool,
}

fn default_fallback() -> bool {
    true
}

impl Default for RolePreferences {
    fn default() -> Self {
        Self {
            primary: Vec::new(),
            secondary: None,
            fallback: true,
        }
    }
}

impl RolePreferences {
    /// Unpaired control preferring `zones` in order
    pub fn single(zones: impl IntoIterator<Item = Zone>) -> Self {
        Self {
            primary: zones.into_iter().collect(),
            ..Default::default()
        }
    }

    /// Paired control with separate preferences per role
    pub fn paired(primary: impl IntoIterator<Item = Zone>, secondary: impl IntoIterator<Item = Zone>) -> Self {
        Self {
            primary: primary.into_iter().collect(),
            secondary: Some(secondary.into_iter().collect()),
            fallback: true,
        }
    }

    /// Only bind to preferred zones
    pub fn strict(mut self) -> Self {
        self.fallback = false;
        self
    }
}

/// The zones a logical control reads and writes
///
/// Primary and secondary are never equal; secondary is only set when the
/// property has at least two zones.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ZoneBinding {
    pub primary: Option<Zone>,
    pub secondary: Option<Zone>,
}

impl ZoneBinding {
    /// Whether the control got a zone at all
    pub fn is_bound(&self) -> bool {
        self.primary.is_some()
    }

    /// Bound zones, primary first
    pub fn zones(&self) -> impl Iterator<Item = Zone> {
        self.primary.into_iter().chain(self.secondary)
    }
}

/// Resolve the binding of a control driving `descriptor`
pub fn resolve(descriptor: &PropertyDescriptor, preferences: &RolePreferences) -> ZoneBinding {
    resolve_mask(descriptor.zones, preferences)
}

/// Resolve a binding against a bare zone mask
pub fn resolve_mask(mask: ZoneMask, preferences: &RolePreferences) -> ZoneBinding {
    let primary = first_preferred(mask, &preferences.primary, None).or_else(|| {
        if preferences.fallback {
            mask.first_zone()
        } else {
            None
        }
    });

    let secondary = match (primary, &preferences.secondary) {
        (Some(primary), Some(preferred)) if mask.len() >= 2 => {
            first_preferred(mask, preferred, Some(primary)).or_else(|| {
                if preferences.fallback {
                    mask.next_zone(primary)
                } else {
                    None
                }
            })
        }
        _ => None,
    };

    ZoneBinding { primary, secondary }
}

fn first_preferred(mask: ZoneMask, preferred: &[Zone], exclude: Option<Zone>) -> Option<Zone> {
    preferred
        .iter()
        .copied()
        .find(|zone| mask.contains(*zone) && Some(*zone) != exclude)
}
