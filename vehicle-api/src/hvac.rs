//! Well-known HVAC properties and vehicle zones

use crate::property::{PropertyDescriptor, PropertyId, ValueDomain};
use crate::zone::{Zone, ZoneMask};

/// Fan speed setpoint (int)
pub const FAN_SPEED: PropertyId = PropertyId::new(0x0500);
/// Fan direction, see [`FanDirection`] (int)
pub const FAN_DIRECTION: PropertyId = PropertyId::new(0x0501);
/// Temperature setpoint in degrees Celsius (float)
pub const TEMPERATURE_SETPOINT: PropertyId = PropertyId::new(0x0503);
/// Window defroster on/off (boolean, window zones)
pub const DEFROSTER: PropertyId = PropertyId::new(0x0504);
/// A/C on/off (boolean)
pub const AC_ON: PropertyId = PropertyId::new(0x0505);

/// Seat zones
pub mod zones {
    use super::Zone;

    pub const ROW_1_LEFT: Zone = Zone::at_bit(0);
    pub const ROW_1_CENTER: Zone = Zone::at_bit(1);
    pub const ROW_1_RIGHT: Zone = Zone::at_bit(2);
    pub const ROW_1_ALL: Zone = Zone::at_bit(3);
    pub const ROW_2_LEFT: Zone = Zone::at_bit(4);
    pub const ROW_2_CENTER: Zone = Zone::at_bit(5);
    pub const ROW_2_RIGHT: Zone = Zone::at_bit(6);
    pub const ROW_2_ALL: Zone = Zone::at_bit(7);
    pub const ALL: Zone = Zone::TOP;
}

/// Window zones (a separate flag namespace from seat zones)
pub mod windows {
    use super::Zone;

    pub const FRONT_WINDSHIELD: Zone = Zone::at_bit(0);
    pub const REAR_WINDSHIELD: Zone = Zone::at_bit(1);
    pub const ROOF_TOP: Zone = Zone::at_bit(2);
    pub const ROW_1_LEFT: Zone = Zone::at_bit(4);
    pub const ROW_1_RIGHT: Zone = Zone::at_bit(5);
}

/// Air outlet direction reported by [`FAN_DIRECTION`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FanDirection {
    Face,
    Floor,
    FaceAndFloor,
    Defrost,
    DefrostAndFloor,
}

impl FanDirection {
    pub fn code(self) -> i32 {
        match self {
            FanDirection::Face => 1,
            FanDirection::Floor => 2,
            FanDirection::FaceAndFloor => 3,
            FanDirection::Defrost => 4,
            FanDirection::DefrostAndFloor => 5,
        }
    }
}

impl TryFrom<i32> for FanDirection {
    type Error = i32;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(FanDirection::Face),
            2 => Ok(FanDirection::Floor),
            3 => Ok(FanDirection::FaceAndFloor),
            4 => Ok(FanDirection::Defrost),
            5 => Ok(FanDirection::DefrostAndFloor),
            other => Err(other),
        }
    }
}

impl From<FanDirection> for crate::value::PropertyValue {
    fn from(direction: FanDirection) -> Self {
        crate::value::PropertyValue::Int(direction.code())
    }
}

/// Descriptors of a typical two-zone cabin
pub fn cabin_descriptors() -> Vec<PropertyDescriptor> {
    let row_1 = ZoneMask::from(zones::ROW_1_ALL);

    vec![
        PropertyDescriptor::new(
            FAN_SPEED,
            row_1,
            ValueDomain::Int {
                min: 1,
                max: 7,
                step: 1,
            },
        ),
        PropertyDescriptor::new(
            FAN_DIRECTION,
            row_1,
            ValueDomain::Int {
                min: 1,
                max: 5,
                step: 1,
            },
        ),
        PropertyDescriptor::new(
            TEMPERATURE_SETPOINT,
            zones::ROW_1_LEFT | zones::ROW_1_RIGHT,
            ValueDomain::Float {
                min: 16.0,
                max: 30.0,
                step: 0.5,
            },
        ),
        PropertyDescriptor::new(AC_ON, row_1, ValueDomain::Boolean),
        PropertyDescriptor::new(
            DEFROSTER,
            windows::FRONT_WINDSHIELD | windows::REAR_WINDSHIELD,
            ValueDomain::Boolean,
        ),
    ]
}
