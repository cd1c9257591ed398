use serde::{Deserialize, Serialize};
use std::fmt;

/// High 16 bits of a guid name the object family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HighGuid {
    Player,
    Item,
    GameObject,
    Unit,
    Pet,
    Vehicle,
    Corpse,
    Other(u16),
}

impl HighGuid {
    fn from_raw(high: u16) -> Self {
        match high {
            0x0000 => HighGuid::Player,
            0x4000 => HighGuid::Item,
            0xF110 => HighGuid::GameObject,
            0xF130 => HighGuid::Unit,
            0xF140 => HighGuid::Pet,
            0xF150 => HighGuid::Vehicle,
            0xF101 => HighGuid::Corpse,
            other => HighGuid::Other(other),
        }
    }

    fn raw(self) -> u16 {
        match self {
            HighGuid::Player => 0x0000,
            HighGuid::Item => 0x4000,
            HighGuid::GameObject => 0xF110,
            HighGuid::Unit => 0xF130,
            HighGuid::Pet => 0xF140,
            HighGuid::Vehicle => 0xF150,
            HighGuid::Corpse => 0xF101,
            HighGuid::Other(raw) => raw,
        }
    }
}

/// 64-bit object identity as it travels on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct ObjectGuid(u64);

impl ObjectGuid {
    pub const EMPTY: ObjectGuid = ObjectGuid(0);

    pub const fn from_raw(raw: u64) -> Self {
        ObjectGuid(raw)
    }

    /// Compose a guid from its family and low counter.
    pub fn new(high: HighGuid, low: u32) -> Self {
        ObjectGuid(((high.raw() as u64) << 48) | low as u64)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn high(self) -> HighGuid {
        HighGuid::from_raw((self.0 >> 48) as u16)
    }

    pub fn counter(self) -> u32 {
        (self.0 & 0xFFFF_FFFF) as u32
    }

    pub fn is_player(self) -> bool {
        !self.is_empty() && self.high() == HighGuid::Player
    }

    pub fn is_vehicle(self) -> bool {
        self.high() == HighGuid::Vehicle
    }

    pub fn is_creature_or_vehicle(self) -> bool {
        matches!(self.high(), HighGuid::Unit | HighGuid::Vehicle)
    }
}

impl fmt::Display for ObjectGuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}#{:#x}", self.high(), self.0)
    }
}

impl From<ObjectGuid> for u64 {
    fn from(guid: ObjectGuid) -> u64 {
        guid.0
    }
}
