//! Item activation guard chain.
//!
//! ```text
//! [Bag(1)][Slot(1)][CastCount(1)][SpellId(4)][ItemGuid(8)][GlyphIndex(4)][CastFlags(1)]
//! [Targets...][Trajectory if CastFlags & 0x02]
//! ```

use crate::core::buffer::CommandBuffer;
use crate::core::guid::ObjectGuid;
use crate::core::targets::{SpellCastTargets, Trajectory};
use crate::error::{constants, ReferenceKind, Result, SessionError};
use crate::validation::{
    ActionRequest, ActionSource, EquipError, Rejection, SpellCastResult, MAX_GLYPH_SLOT_INDEX,
};
use crate::world::item::{ItemClass, ItemView};
use crate::world::WorldServices;
use tracing::debug;

/// Fixed-size head of an item-use command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemUseHeader {
    pub bag: u8,
    pub slot: u8,
    pub cast_count: u8,
    pub spell_id: u32,
    pub item: ObjectGuid,
    pub glyph_index: u32,
    pub cast_flags: u8,
}

impl ItemUseHeader {
    pub fn read(buf: &mut CommandBuffer) -> Result<Self> {
        Ok(Self {
            bag: buf.read_u8()?,
            slot: buf.read_u8()?,
            cast_count: buf.read_u8()?,
            spell_id: buf.read_u32()?,
            item: buf.read_guid()?,
            glyph_index: buf.read_u32()?,
            cast_flags: buf.read_u8()?,
        })
    }
}

/// How an accepted item use ends.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemUseOutcome {
    /// Hand the request to the simulation.
    Prepared(ActionRequest),
    /// A script consumed the use.
    Scripted,
}

fn not_found(item: Option<&ItemView>) -> SessionError {
    SessionError::Rejected(Rejection::equip(
        EquipError::ItemNotFound,
        item.map(|i| i.guid),
    ))
}

/// Run the item-use chain for `player`. On a rejection the unread tail of
/// `payload` is discarded.
pub fn validate(
    services: &WorldServices,
    player: ObjectGuid,
    payload: &mut CommandBuffer,
) -> Result<ItemUseOutcome> {
    let header = ItemUseHeader::read(payload)?;
    let outcome = check_and_build(services, player, &header, payload);
    if outcome.is_err() {
        payload.finish();
    }
    outcome
}

fn check_and_build(
    services: &WorldServices,
    player: ObjectGuid,
    header: &ItemUseHeader,
    payload: &mut CommandBuffer,
) -> Result<ItemUseOutcome> {
    let actors = &services.actors;
    let inventory = &services.inventory;

    if actors.mover_of(player) != player {
        return Err(SessionError::StateViolation(constants::ERR_REMOTE_CONTROL));
    }

    if header.glyph_index >= u32::from(MAX_GLYPH_SLOT_INDEX) {
        return Err(not_found(None));
    }

    let item = inventory
        .item_at(player, header.bag, header.slot)
        .ok_or_else(|| not_found(None))?;
    if item.guid != header.item {
        return Err(not_found(None));
    }

    debug!(
        bag = header.bag,
        slot = header.slot,
        cast_count = header.cast_count,
        spell_id = header.spell_id,
        glyph_index = header.glyph_index,
        "Item use"
    );

    let proto = item.proto.as_ref().ok_or_else(|| not_found(Some(&item)))?;

    if proto.equippable && !item.equipped {
        return Err(not_found(Some(&item)));
    }

    let usable = inventory.can_use_item(player, &item);
    if !usable.is_ok() {
        return Err(SessionError::Rejected(Rejection::equip(usable, Some(item.guid))));
    }

    if item.in_trade {
        return Err(not_found(Some(&item)));
    }

    if proto.class == ItemClass::Consumable && !proto.usable_in_arena && inventory.in_arena(player)
    {
        return Err(SessionError::Rejected(Rejection::equip(
            EquipError::NotDuringArenaMatch,
            Some(item.guid),
        )));
    }

    if (proto.area != 0 && proto.area != inventory.area_id(player))
        || (proto.map != 0 && proto.map != inventory.map_id(player))
    {
        return match services.spells.spell(header.spell_id) {
            Some(spell) => Err(SessionError::Rejected(Rejection::Cast {
                spell_id: spell.id,
                cast_count: header.cast_count,
                result: SpellCastResult::IncorrectArea,
            })),
            None => Err(SessionError::unknown(ReferenceKind::Spell, header.spell_id)),
        };
    }

    if actors.in_combat(player) {
        let non_combat = proto
            .spells
            .iter()
            .filter_map(|id| services.spells.spell(*id))
            .any(|spell| spell.non_combat);
        if non_combat {
            return Err(SessionError::Rejected(Rejection::equip(
                EquipError::NotInCombat,
                Some(item.guid),
            )));
        }
        if proto.potion && inventory.last_potion(player).is_some() {
            return Err(SessionError::Rejected(Rejection::equip(
                EquipError::ObjectIsBusy,
                Some(item.guid),
            )));
        }
    }

    if proto.bonding.binds_on_use() && !item.soulbound {
        inventory.bind_to_owner(player, item.guid);
    }

    let targets = SpellCastTargets::read_for_caster(payload, player)?;
    let trajectory = Trajectory::read_if_flagged(payload, header.cast_flags)?;

    let target_unit = targets
        .unit
        .and_then(|guid| actors.region_of(player).and_then(|region| region.unit(guid)));

    if !inventory.target_valid_for_item(&item, target_unit.as_ref()) {
        let spell = services.spells.spell(header.spell_id);
        let result = match &spell {
            Some(spell) if spell.effects[0].implicit_target.is_point_or_area() => {
                SpellCastResult::NoValidTargets
            }
            _ => SpellCastResult::BadTargets,
        };
        return Err(SessionError::Rejected(Rejection::Target {
            item: item.guid,
            spell_id: spell.map(|s| s.id),
            cast_count: header.cast_count,
            result,
        }));
    }

    if services.scripts.on_item_use(player, &item, &targets) {
        return Ok(ItemUseOutcome::Scripted);
    }

    Ok(ItemUseOutcome::Prepared(ActionRequest {
        source: ActionSource::Item {
            item: item.guid,
            // bounded by MAX_GLYPH_SLOT_INDEX above
            glyph_index: header.glyph_index as u8,
        },
        caster: player,
        original_caster: player,
        spell_id: header.spell_id,
        cast_count: header.cast_count,
        targets,
        trajectory,
        triggered: false,
        triggered_by: None,
    }))
}
