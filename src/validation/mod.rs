//! # Action Validation
//!
//! Guard chains that turn item-use and spell-cast commands into
//! [`ActionRequest`]s for the simulation. Each chain is an ordered list of
//! short-circuiting checks; the first failure decides the outcome.
//!
//! Failures the client should hear about are expressed as [`Rejection`]s and
//! rendered by [`Rejection::packets`]. Everything else surfaces as a
//! [`SessionError`](crate::error::SessionError) of the matching class.

pub mod item_use;
pub mod mover;
pub mod spell_cast;

use crate::core::buffer::CommandBuffer;
use crate::core::command::OutboundPacket;
use crate::core::guid::ObjectGuid;
use crate::core::targets::{SpellCastTargets, Trajectory};
use crate::protocol::opcodes;

pub use item_use::{validate as validate_item_use, ItemUseOutcome};
pub use mover::resolve_acting_actor;
pub use spell_cast::validate as validate_spell_cast;

/// Spells players may cast without owning them.
pub const SPELLBOOK_BYPASS: &[u32] = &[
    1843, // open/close door
];

/// Casts the client may not cancel.
pub const CANCEL_CAST_EXEMPT: &[u32] = &[
    26679, // deadly throw
];

/// Totems that survive a client dismissal.
pub const UNDISMISSABLE_TOTEMS: &[u32] = &[
    3968, // sentry totem
];

/// Glyph slots are 0..6.
pub const MAX_GLYPH_SLOT_INDEX: u8 = 6;

/// Totem slots are 0..4.
pub const MAX_TOTEM_SLOT: u8 = 4;

/// Debuff marking a recently killed player as worth no honor.
pub const HONORLESS_TARGET: u32 = 2479;

/// Inventory error codes the engine emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EquipError {
    Ok,
    ItemNotFound,
    ObjectIsBusy,
    None,
    NotInCombat,
    NotDuringArenaMatch,
    Other(u8),
}

impl EquipError {
    pub fn code(self) -> u8 {
        match self {
            EquipError::Ok => 0,
            EquipError::ItemNotFound => 23,
            EquipError::ObjectIsBusy => 58,
            EquipError::None => 59,
            EquipError::NotInCombat => 60,
            EquipError::NotDuringArenaMatch => 78,
            EquipError::Other(code) => code,
        }
    }

    pub fn is_ok(self) -> bool {
        self == EquipError::Ok
    }
}

/// Cast failure reasons the engine emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpellCastResult {
    BadTargets,
    IncorrectArea,
    NoValidTargets,
    Other(u8),
}

impl SpellCastResult {
    pub fn code(self) -> u8 {
        match self {
            SpellCastResult::BadTargets => 0x0B,
            SpellCastResult::IncorrectArea => 0x27,
            SpellCastResult::NoValidTargets => 0x5E,
            SpellCastResult::Other(code) => code,
        }
    }
}

/// A refusal the client is told about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// Inventory error for an item (or none).
    Equip {
        error: EquipError,
        item: Option<ObjectGuid>,
    },
    /// Cast failure for a spell.
    Cast {
        spell_id: u32,
        cast_count: u8,
        result: SpellCastResult,
    },
    /// Target check failed on an item use: clears the item error, then
    /// reports the cast failure when the item carries a spell.
    Target {
        item: ObjectGuid,
        spell_id: Option<u32>,
        cast_count: u8,
        result: SpellCastResult,
    },
}

impl Rejection {
    pub fn equip(error: EquipError, item: Option<ObjectGuid>) -> Self {
        Rejection::Equip { error, item }
    }

    /// Packets that carry this rejection back to the client.
    pub fn packets(&self) -> Vec<OutboundPacket> {
        match *self {
            Rejection::Equip { error, item } => vec![inventory_change_failure(error, item)],
            Rejection::Cast {
                spell_id,
                cast_count,
                result,
            } => vec![cast_failed(spell_id, cast_count, result)],
            Rejection::Target {
                item,
                spell_id,
                cast_count,
                result,
            } => {
                let mut packets = vec![inventory_change_failure(EquipError::None, Some(item))];
                if let Some(spell_id) = spell_id {
                    packets.push(cast_failed(spell_id, cast_count, result));
                }
                packets
            }
        }
    }
}

fn inventory_change_failure(error: EquipError, item: Option<ObjectGuid>) -> OutboundPacket {
    let mut body = CommandBuffer::with_capacity(18);
    body.write_u8(error.code());
    if error.code() != 0 {
        body.write_guid(item.unwrap_or_default())
            .write_guid(ObjectGuid::EMPTY)
            .write_u8(0);
    }
    OutboundPacket::new(opcodes::SMSG_INVENTORY_CHANGE_FAILURE, body)
}

fn cast_failed(spell_id: u32, cast_count: u8, result: SpellCastResult) -> OutboundPacket {
    let mut body = CommandBuffer::with_capacity(6);
    body.write_u8(cast_count)
        .write_u32(spell_id)
        .write_u8(result.code());
    OutboundPacket::new(opcodes::SMSG_CAST_FAILED, body)
}

/// Where a validated action came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionSource {
    Spell,
    Item { item: ObjectGuid, glyph_index: u8 },
}

/// A validated action handed to the simulation.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionRequest {
    pub source: ActionSource,
    pub caster: ObjectGuid,
    /// Player that issued the command.
    pub original_caster: ObjectGuid,
    pub spell_id: u32,
    pub cast_count: u8,
    pub targets: SpellCastTargets,
    pub trajectory: Option<Trajectory>,
    pub triggered: bool,
    /// Aura that made this a triggered cast.
    pub triggered_by: Option<u32>,
}
