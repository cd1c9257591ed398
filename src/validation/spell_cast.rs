//! Spell cast guard chain.
//!
//! ```text
//! [CastCount(1)][SpellId(4)][Flags(1)][Targets...][Trajectory if Flags & 0x02]
//! ```

use crate::core::buffer::CommandBuffer;
use crate::core::guid::ObjectGuid;
use crate::core::targets::{SpellCastTargets, Trajectory};
use crate::error::{constants, ReferenceKind, Result, SessionError};
use crate::validation::{resolve_acting_actor, ActionRequest, ActionSource, SPELLBOOK_BYPASS};
use crate::world::{ActorKind, WorldServices};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpellCastHeader {
    pub cast_count: u8,
    pub spell_id: u32,
    pub flags: u8,
}

impl SpellCastHeader {
    pub fn read(buf: &mut CommandBuffer) -> Result<Self> {
        Ok(Self {
            cast_count: buf.read_u8()?,
            spell_id: buf.read_u32()?,
            flags: buf.read_u8()?,
        })
    }
}

/// Run the spell-cast chain for a command issued by `player`.
pub fn validate(
    services: &WorldServices,
    player: ObjectGuid,
    payload: &mut CommandBuffer,
) -> Result<ActionRequest> {
    let header = SpellCastHeader::read(payload)?;
    let request = check_and_build(services, player, header, payload);
    if request.is_err() {
        payload.finish();
    }
    request
}

fn check_and_build(
    services: &WorldServices,
    player: ObjectGuid,
    header: SpellCastHeader,
    payload: &mut CommandBuffer,
) -> Result<ActionRequest> {
    let actors = &services.actors;
    let mut cast_count = header.cast_count;
    let spell_id = header.spell_id;

    let mover_guid = actors.mover_of(player);
    if mover_guid != player && mover_guid.is_player() {
        return Err(SessionError::StateViolation(constants::ERR_REMOTE_CONTROL));
    }

    debug!(spell_id, cast_count, flags = header.flags, "Cast spell");

    if !services.anticheat.allow_spell_cast(player, spell_id) {
        return Err(SessionError::AntiCheatVeto { spell_id });
    }

    let mut spell = services
        .spells
        .spell(spell_id)
        .ok_or_else(|| SessionError::unknown(ReferenceKind::Spell, spell_id))?;

    let mover = actors
        .unit(mover_guid)
        .ok_or_else(|| SessionError::unknown(ReferenceKind::Unit, mover_guid))?;
    let seat = mover
        .controlling_player
        .and_then(|controller| actors.vehicle_seat_flags(mover.guid, controller));
    let caster = resolve_acting_actor(&mover, &spell, seat);

    let triggered_by = actors.triggering_client_aura(caster, spell_id);
    let triggered = triggered_by.is_some();
    if triggered {
        cast_count = 0;
    }

    let caster_kind = if caster == mover.guid {
        mover.kind
    } else {
        actors
            .unit(caster)
            .map(|u| u.kind)
            .ok_or_else(|| SessionError::unknown(ReferenceKind::Unit, caster))?
    };

    let owns_spell = match caster_kind {
        ActorKind::Player => {
            actors.spellbook_unrestricted(caster)
                || actors.has_active_spell(caster, spell_id)
                || triggered
                || SPELLBOOK_BYPASS.contains(&spell_id)
        }
        ActorKind::Creature => actors.creature_has_spell(caster, spell_id) || triggered,
    };
    if !owns_spell || (spell.passive && !triggered) {
        return Err(SessionError::CheatSuspected {
            actor: caster,
            spell_id,
        });
    }

    let targets = SpellCastTargets::read_for_caster(payload, caster)?;
    let trajectory = Trajectory::read_if_flagged(payload, header.flags)?;

    if let Some(target) = targets.unit.and_then(|guid| actors.unit(guid)) {
        if let Some(ranked) = services.spells.rank_for_level(&spell, target.level) {
            spell = ranked;
        }
    }

    Ok(ActionRequest {
        source: ActionSource::Spell,
        caster,
        original_caster: caster,
        spell_id: spell.id,
        cast_count,
        targets,
        trajectory,
        triggered,
        triggered_by,
    })
}
