//! Spell target block carried by cast and item-use commands.
//!
//! ```text
//! [Mask(4)]
//!   UNIT | UNIT_MINIPET          -> packed unit guid
//!   GAMEOBJECT                   -> packed object guid
//!   ITEM | TRADE_ITEM            -> packed item guid
//!   CORPSE_ENEMY | CORPSE_ALLY   -> packed corpse guid
//!   SOURCE_LOCATION              -> packed transport guid, x, y, z
//!   DEST_LOCATION                -> packed transport guid, x, y, z
//!   STRING                       -> C string
//! ```

use crate::core::buffer::CommandBuffer;
use crate::core::guid::ObjectGuid;
use crate::error::Result;

pub mod flags {
    pub const SELF: u32 = 0x0000_0000;
    pub const UNIT: u32 = 0x0000_0002;
    pub const ITEM: u32 = 0x0000_0010;
    pub const SOURCE_LOCATION: u32 = 0x0000_0020;
    pub const DEST_LOCATION: u32 = 0x0000_0040;
    pub const CORPSE_ENEMY: u32 = 0x0000_0200;
    pub const GAMEOBJECT: u32 = 0x0000_0800;
    pub const TRADE_ITEM: u32 = 0x0000_1000;
    pub const STRING: u32 = 0x0000_2000;
    pub const CORPSE_ALLY: u32 = 0x0000_8000;
    pub const UNIT_MINIPET: u32 = 0x0001_0000;

    pub const UNIT_MASK: u32 = UNIT | UNIT_MINIPET;
    pub const ITEM_MASK: u32 = ITEM | TRADE_ITEM;
    pub const CORPSE_MASK: u32 = CORPSE_ENEMY | CORPSE_ALLY;
}

/// Cast flag announcing the trailing projectile block.
pub const CAST_FLAG_HAS_TRAJECTORY: u8 = 0x02;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Position {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Position {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn read(buf: &mut CommandBuffer) -> Result<Self> {
        Ok(Self {
            x: buf.read_f32()?,
            y: buf.read_f32()?,
            z: buf.read_f32()?,
        })
    }

    pub fn write(&self, buf: &mut CommandBuffer) {
        buf.write_f32(self.x).write_f32(self.y).write_f32(self.z);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Location {
    pub transport: ObjectGuid,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpellCastTargets {
    pub mask: u32,
    pub unit: Option<ObjectGuid>,
    pub game_object: Option<ObjectGuid>,
    pub item: Option<ObjectGuid>,
    pub corpse: Option<ObjectGuid>,
    pub source: Option<Location>,
    pub destination: Option<Location>,
    pub text: Option<String>,
}

impl SpellCastTargets {
    /// Read a target block on behalf of `caster`. A self-target mask resolves
    /// the unit target to the caster.
    pub fn read_for_caster(buf: &mut CommandBuffer, caster: ObjectGuid) -> Result<Self> {
        let mask = buf.read_u32()?;
        let mut targets = Self {
            mask,
            ..Self::default()
        };

        if mask == flags::SELF {
            targets.unit = Some(caster);
            return Ok(targets);
        }
        if mask & flags::UNIT_MASK != 0 {
            targets.unit = Some(buf.read_packed_guid()?);
        }
        if mask & flags::GAMEOBJECT != 0 {
            targets.game_object = Some(buf.read_packed_guid()?);
        }
        if mask & flags::ITEM_MASK != 0 && caster.is_player() {
            targets.item = Some(buf.read_packed_guid()?);
        }
        if mask & flags::CORPSE_MASK != 0 {
            targets.corpse = Some(buf.read_packed_guid()?);
        }
        if mask & flags::SOURCE_LOCATION != 0 {
            targets.source = Some(Location {
                transport: buf.read_packed_guid()?,
                position: Position::read(buf)?,
            });
        }
        if mask & flags::DEST_LOCATION != 0 {
            targets.destination = Some(Location {
                transport: buf.read_packed_guid()?,
                position: Position::read(buf)?,
            });
        }
        if mask & flags::STRING != 0 {
            targets.text = Some(buf.read_cstring()?);
        }
        Ok(targets)
    }

    pub fn write(&self, buf: &mut CommandBuffer) {
        buf.write_u32(self.mask);
        if self.mask == flags::SELF {
            return;
        }
        let guids = [
            (flags::UNIT_MASK, self.unit),
            (flags::GAMEOBJECT, self.game_object),
            (flags::ITEM_MASK, self.item),
            (flags::CORPSE_MASK, self.corpse),
        ];
        for (bits, guid) in guids {
            if self.mask & bits != 0 {
                buf.write_packed_guid(guid.unwrap_or_default());
            }
        }
        for (bits, location) in [
            (flags::SOURCE_LOCATION, self.source),
            (flags::DEST_LOCATION, self.destination),
        ] {
            if self.mask & bits != 0 {
                let location = location.unwrap_or_default();
                buf.write_packed_guid(location.transport);
                location.position.write(buf);
            }
        }
        if self.mask & flags::STRING != 0 {
            buf.write_cstring(self.text.as_deref().unwrap_or_default());
        }
    }

    pub fn has_destination(&self) -> bool {
        self.mask & flags::DEST_LOCATION != 0
    }
}

/// Projectile block appended when the cast flags carry
/// [`CAST_FLAG_HAS_TRAJECTORY`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Trajectory {
    pub elevation: f32,
    pub speed: f32,
}

impl Trajectory {
    /// Read the projectile block. A trailing movement snapshot is consumed
    /// without interpretation.
    pub fn read_if_flagged(buf: &mut CommandBuffer, cast_flags: u8) -> Result<Option<Self>> {
        if cast_flags & CAST_FLAG_HAS_TRAJECTORY == 0 {
            return Ok(None);
        }
        let trajectory = Self {
            elevation: buf.read_f32()?,
            speed: buf.read_f32()?,
        };
        if buf.read_u8()? != 0 {
            buf.finish();
        }
        Ok(Some(trajectory))
    }
}
