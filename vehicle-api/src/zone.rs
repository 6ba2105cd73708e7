//! Zone flags and zone masks
//!
//! Every physical region of the vehicle (a seat row position, a window) is a
//! single bit in a 32-bit flag word. A property's supported zones, an event's
//! affected zones and a subscription's zone filter are all unions of those
//! bits, represented by [`ZoneMask`].
//!
//! Enumeration over a mask is always in ascending bit order:
//!
//! ```rust
//! use vehicle_api::{Zone, ZoneMask};
//!
//! let mask: ZoneMask = [Zone::at_bit(4), Zone::at_bit(0), Zone::at_bit(31)]
//!     .into_iter()
//!     .collect();
//!
//! let bits: Vec<u32> = mask.iter().map(|z| z.bit()).collect();
//! assert_eq!(bits, vec![0, 4, 31]);
//! ```

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use serde::{Deserialize, Serialize};

/// Width of the zone flag word
pub const ZONE_BITS: u32 = 32;

/// A single zone flag (exactly one bit set)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Zone(u32);

impl Zone {
    /// The highest-order zone flag (`0x8000_0000`)
    pub const TOP: Zone = Zone(1 << (ZONE_BITS - 1));

    /// Build the zone at bit position `position`
    ///
    /// # Panics
    ///
    /// Panics if `position >= 32`. Intended for constant definitions.
    pub const fn at_bit(position: u32) -> Self {
        assert!(position < ZONE_BITS, "zone bit position out of range");
        Self(1 << position)
    }

    /// Create a zone from a raw flag, which must have exactly one bit set
    pub const fn new(flag: u32) -> Option<Self> {
        if flag.is_power_of_two() {
            Some(Self(flag))
        } else {
            None
        }
    }

    /// Raw flag value
    pub const fn flag(self) -> u32 {
        self.0
    }

    /// Bit position of this zone (0..=31)
    pub const fn bit(self) -> u32 {
        self.0.trailing_zeros()
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

impl TryFrom<u32> for Zone {
    type Error = InvalidZone;

    fn try_from(flag: u32) -> Result<Self, Self::Error> {
        Zone::new(flag).ok_or(InvalidZone(flag))
    }
}

impl From<Zone> for u32 {
    fn from(zone: Zone) -> Self {
        zone.0
    }
}

/// Raised when a raw flag does not name exactly one zone
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("0x{0:x} is not a single zone flag")]
pub struct InvalidZone(pub u32);

/// A set of zones
///
/// Zero is the empty set. Iteration yields zones in ascending bit position.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ZoneMask(u32);

impl ZoneMask {
    /// The empty set
    pub const EMPTY: ZoneMask = ZoneMask(0);

    /// Wrap a raw mask
    pub const fn new(bits: u32) -> Self {
        Self(bits)
    }

    /// Raw mask value
    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Number of zones in the set
    pub const fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Whether `zone` is a member of this set
    pub const fn contains(self, zone: Zone) -> bool {
        self.0 & zone.0 != 0
    }

    /// Whether the two sets share at least one zone
    pub const fn overlaps(self, other: ZoneMask) -> bool {
        self.0 & other.0 != 0
    }

    /// Lowest zone in the set
    pub const fn first_zone(self) -> Option<Zone> {
        if self.0 == 0 {
            None
        } else {
            // isolate the lowest set bit
            Some(Zone(self.0 & self.0.wrapping_neg()))
        }
    }

    /// Lowest zone whose bit position is strictly greater than `after`'s
    ///
    /// Returns `None` when no such zone exists, including when `after` is
    /// already the top bit.
    pub const fn next_zone(self, after: Zone) -> Option<Zone> {
        let shift = after.bit() + 1;
        if shift >= ZONE_BITS {
            return None;
        }
        ZoneMask(self.0 & (u32::MAX << shift)).first_zone()
    }

    /// Iterate zones in ascending bit order
    pub fn iter(self) -> Zones {
        Zones {
            mask: self,
            next: self.first_zone(),
        }
    }

    /// Return a copy with `zone` added
    pub const fn with(self, zone: Zone) -> Self {
        Self(self.0 | zone.0)
    }
}

impl fmt::Display for ZoneMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

impl From<Zone> for ZoneMask {
    fn from(zone: Zone) -> Self {
        ZoneMask(zone.0)
    }
}

impl BitOr for ZoneMask {
    type Output = ZoneMask;

    fn bitor(self, rhs: ZoneMask) -> ZoneMask {
        ZoneMask(self.0 | rhs.0)
    }
}

impl BitOr<Zone> for ZoneMask {
    type Output = ZoneMask;

    fn bitor(self, rhs: Zone) -> ZoneMask {
        self.with(rhs)
    }
}

impl BitOr for Zone {
    type Output = ZoneMask;

    fn bitor(self, rhs: Zone) -> ZoneMask {
        ZoneMask(self.0 | rhs.0)
    }
}

impl BitOrAssign<Zone> for ZoneMask {
    fn bitor_assign(&mut self, rhs: Zone) {
        self.0 |= rhs.0;
    }
}

impl FromIterator<Zone> for ZoneMask {
    fn from_iter<I: IntoIterator<Item = Zone>>(iter: I) -> Self {
        iter.into_iter().fold(ZoneMask::EMPTY, ZoneMask::with)
    }
}

impl IntoIterator for ZoneMask {
    type Item = Zone;
    type IntoIter = Zones;

    fn into_iter(self) -> Zones {
        self.iter()
    }
}

/// Ascending iterator over the zones of a mask
#[derive(Debug, Clone)]
pub struct Zones {
    mask: ZoneMask,
    next: Option<Zone>,
}

impl Iterator for Zones {
    type Item = Zone;

    fn next(&mut self) -> Option<Zone> {
        let current = self.next?;
        self.next = self.mask.next_zone(current);
        Some(current)
    }
}
