//! Spell commands and cast control.
//!
//! The cast-control functions take the collaborators directly so simulation
//! triggers can call them without a session. Each returns the packet the
//! client should receive, if any.

use crate::core::buffer::CommandBuffer;
use crate::core::command::{Command, OutboundPacket};
use crate::core::guid::ObjectGuid;
use crate::core::targets::{flags, Position};
use crate::error::{constants, ReferenceKind, Result, SessionError};
use crate::protocol::opcodes;
use crate::session::Session;
use crate::validation::{
    validate_spell_cast, CANCEL_CAST_EXEMPT, HONORLESS_TARGET, MAX_TOTEM_SLOT, UNDISMISSABLE_TOTEMS,
};
use crate::world::{CastSlot, TrajectoryUpdate, WorldServices};
use tracing::{debug, error};

/// Pet action feedback code for a dead pet.
pub const FEEDBACK_PET_DEAD: u8 = 1;

/// Remote control of another player blocks most cast commands.
fn controlling_other_player(services: &WorldServices, player: ObjectGuid) -> bool {
    let mover = services.actors.mover_of(player);
    mover != player && mover.is_player()
}

fn is_self_mover(services: &WorldServices, player: ObjectGuid) -> bool {
    services.actors.mover_of(player) == player
}

pub fn handle_cast_spell(session: &mut Session, command: &mut Command) -> Result<()> {
    let player = session.require_actor()?;
    let ctx = session.context();
    let request = validate_spell_cast(&ctx.services, player, &mut command.payload)?;
    ctx.metrics.action_prepared();
    ctx.services.casts.prepare(request);
    Ok(())
}

/// Interrupt the mover's non-melee cast of `spell_id`.
pub fn cancel_cast(services: &WorldServices, player: ObjectGuid, spell_id: u32) -> Result<()> {
    if controlling_other_player(services, player) {
        return Err(SessionError::StateViolation(constants::ERR_REMOTE_CONTROL));
    }
    if CANCEL_CAST_EXEMPT.contains(&spell_id) {
        debug!(spell_id, "Ignoring cancel of exempt cast");
        return Ok(());
    }
    let mover = services.actors.mover_of(player);
    if services.casts.is_casting_non_melee(mover) {
        services.casts.interrupt_non_melee(mover, Some(spell_id));
    }
    Ok(())
}

pub fn handle_cancel_cast(session: &mut Session, command: &mut Command) -> Result<()> {
    let player = session.require_actor()?;
    command.payload.skip(1)?;
    let spell_id = command.payload.read_u32()?;
    cancel_cast(session.services(), player, spell_id)
}

/// Cancel one of the player's own auras.
///
/// Passive, uncancellable and honorless-target auras stay. Negative auras
/// only go while the player remote-controls a unit through a possession
/// aura. A channeled spell is stopped through its channel slot, never by
/// removing the aura, and an area aura cast by someone else stays.
pub fn cancel_aura(services: &WorldServices, player: ObjectGuid, spell_id: u32) -> Result<()> {
    let spell = services
        .spells
        .spell(spell_id)
        .ok_or_else(|| SessionError::unknown(ReferenceKind::Spell, spell_id))?;

    if spell.cant_cancel || spell.passive || spell.id == HONORLESS_TARGET {
        return Ok(());
    }

    if !spell.positive && (is_self_mover(services, player) || !spell.has_possession_aura()) {
        return Ok(());
    }

    let casts = &services.casts;
    if spell.channeled {
        if casts
            .current_cast(player, CastSlot::Channeled)
            .is_some_and(|cast| cast.spell_id == spell_id)
        {
            casts.interrupt(player, CastSlot::Channeled);
        }
        return Ok(());
    }

    if spell.has_area_aura()
        && casts
            .aura_caster(player, spell_id)
            .is_some_and(|caster| caster != player)
    {
        return Ok(());
    }

    casts.remove_aura_by_cancel(player, spell_id);
    Ok(())
}

pub fn handle_cancel_aura(session: &mut Session, command: &mut Command) -> Result<()> {
    let player = session.require_actor()?;
    let spell_id = command.payload.read_u32()?;
    cancel_aura(session.services(), player, spell_id)
}

/// Cancel an aura on the player's pet or charm.
pub fn cancel_pet_aura(
    services: &WorldServices,
    player: ObjectGuid,
    pet: ObjectGuid,
    spell_id: u32,
) -> Result<Option<OutboundPacket>> {
    if !is_self_mover(services, player) {
        return Err(SessionError::StateViolation(constants::ERR_REMOTE_CONTROL));
    }

    if services.spells.spell(spell_id).is_none() {
        error!(spell_id, "Unknown pet spell id");
        return Err(SessionError::unknown(ReferenceKind::Spell, spell_id));
    }

    let actors = &services.actors;
    let region = actors
        .region_of(player)
        .ok_or(SessionError::SubsystemAbsent(constants::ERR_NO_REGION))?;
    let unit = region
        .unit(pet)
        .ok_or_else(|| SessionError::unknown(ReferenceKind::Unit, pet))?;

    if Some(pet) != actors.pet_of(player) && Some(pet) != actors.charm_of(player) {
        error!(%pet, %player, "Pet aura cancel for a unit that is not the player's pet");
        return Err(SessionError::StateViolation(constants::ERR_NOT_OWN_PET));
    }

    if !unit.alive {
        let mut body = CommandBuffer::with_capacity(1);
        body.write_u8(FEEDBACK_PET_DEAD);
        return Ok(Some(OutboundPacket::new(opcodes::SMSG_PET_ACTION_FEEDBACK, body)));
    }

    services.casts.remove_pet_aura(pet, spell_id);
    Ok(None)
}

pub fn handle_pet_cancel_aura(session: &mut Session, command: &mut Command) -> Result<()> {
    let player = session.require_actor()?;
    let pet = command.payload.read_guid()?;
    let spell_id = command.payload.read_u32()?;
    if let Some(feedback) = cancel_pet_aura(session.services(), player, pet, spell_id)? {
        session.send(feedback);
    }
    Ok(())
}

/// Stop the mover's auto-repeat cast. No reply: the client would resend.
pub fn cancel_autorepeat(services: &WorldServices, player: ObjectGuid) {
    let mover = services.actors.mover_of(player);
    services.casts.interrupt(mover, CastSlot::AutoRepeat);
}

pub fn handle_cancel_autorepeat(session: &mut Session, _command: &mut Command) -> Result<()> {
    let player = session.require_actor()?;
    cancel_autorepeat(session.services(), player);
    Ok(())
}

pub fn cancel_channel(services: &WorldServices, player: ObjectGuid) -> Result<()> {
    if controlling_other_player(services, player) {
        return Err(SessionError::StateViolation(constants::ERR_REMOTE_CONTROL));
    }
    let mover = services.actors.mover_of(player);
    services.casts.interrupt(mover, CastSlot::Channeled);
    Ok(())
}

pub fn handle_cancel_channelling(session: &mut Session, command: &mut Command) -> Result<()> {
    let player = session.require_actor()?;
    // spell id, unused
    command.payload.skip(4)?;
    cancel_channel(session.services(), player)
}

/// Unsummon the totem in `slot`. Sentinel totems are never dismissed.
pub fn dismiss_totem(services: &WorldServices, player: ObjectGuid, slot: u8) -> Result<()> {
    if !is_self_mover(services, player) {
        return Err(SessionError::StateViolation(constants::ERR_REMOTE_CONTROL));
    }
    if slot >= MAX_TOTEM_SLOT {
        debug!(slot, "Totem slot out of range");
        return Ok(());
    }
    if let Some(totem) = services.casts.totem_in_slot(player, slot) {
        if UNDISMISSABLE_TOTEMS.contains(&totem.entry) {
            return Ok(());
        }
        services.casts.unsummon_totem(totem.guid);
    }
    Ok(())
}

pub fn handle_totem_destroyed(session: &mut Session, command: &mut Command) -> Result<()> {
    let player = session.require_actor()?;
    let slot = command.payload.read_u8()?;
    dismiss_totem(session.services(), player, slot)
}

/// Cast the pending self-resurrection spell once, then clear it.
pub fn consume_self_resurrection(services: &WorldServices, player: ObjectGuid) {
    let casts = &services.casts;
    if casts.has_prevent_resurrection(player) {
        return;
    }
    let spell_id = casts.self_res_spell(player);
    if spell_id == 0 {
        return;
    }
    if services.spells.spell(spell_id).is_some() {
        casts.cast_on(player, player, spell_id, false);
    }
    casts.clear_self_res_spell(player);
}

pub fn handle_self_res(session: &mut Session, _command: &mut Command) -> Result<()> {
    let player = session.require_actor()?;
    consume_self_resurrection(session.services(), player);
    Ok(())
}

/// Client correction for an in-flight missile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MissileTrajectory {
    pub caster: ObjectGuid,
    pub spell_id: u32,
    pub update: TrajectoryUpdate,
    pub has_movement: bool,
}

impl MissileTrajectory {
    /// `[Guid(8)][SpellId(4)][Elevation(4)][Speed(4)][Src xyz][Dst xyz][MoveFlag(1)][Movement...]`
    pub fn read(buf: &mut CommandBuffer) -> Result<Self> {
        let caster = buf.read_guid()?;
        let spell_id = buf.read_u32()?;
        let elevation = buf.read_f32()?;
        let speed = buf.read_f32()?;
        let source = Position::read(buf)?;
        let destination = Position::read(buf)?;
        let has_movement = buf.read_u8()? != 0;
        if has_movement {
            buf.finish();
        }
        Ok(Self {
            caster,
            spell_id,
            update: TrajectoryUpdate {
                source,
                destination,
                elevation,
                speed,
            },
            has_movement,
        })
    }
}

/// Apply a trajectory correction. Returns whether a cast was updated: the
/// caster must be generic-casting `spell_id` at a destination.
pub fn update_missile_trajectory(services: &WorldServices, trajectory: &MissileTrajectory) -> bool {
    let Some(unit) = services.actors.unit(trajectory.caster) else {
        return false;
    };
    let matches = services
        .casts
        .current_cast(unit.guid, CastSlot::Generic)
        .is_some_and(|cast| {
            cast.spell_id == trajectory.spell_id && cast.target_mask & flags::DEST_LOCATION != 0
        });
    if matches {
        debug!(spell_id = trajectory.spell_id, ?trajectory.update, "Missile trajectory adjusted");
        services.casts.update_trajectory(unit.guid, trajectory.update);
    }
    matches
}

pub fn handle_update_missile_trajectory(session: &mut Session, command: &mut Command) -> Result<()> {
    session.require_actor()?;
    let trajectory = MissileTrajectory::read(&mut command.payload)?;
    update_missile_trajectory(session.services(), &trajectory);
    Ok(())
}

/// Echo a projectile impact and fire the spell's trigger effects at it.
pub fn projectile_landed(
    services: &WorldServices,
    player: ObjectGuid,
    caster: ObjectGuid,
    spell_id: u32,
    cast_count: u8,
    impact: Position,
) -> Result<Option<OutboundPacket>> {
    let Some(unit) = services
        .actors
        .region_of(player)
        .and_then(|region| region.unit(caster))
    else {
        return Ok(None);
    };

    let spell = services
        .spells
        .spell(spell_id)
        .ok_or_else(|| SessionError::unknown(ReferenceKind::Spell, spell_id))?;

    let mut body = CommandBuffer::with_capacity(8 + 1 + 12);
    body.write_guid(caster).write_u8(cast_count);
    impact.write(&mut body);
    let collision = OutboundPacket::new(opcodes::SMSG_NOTIFY_MISSILE_TRAJECTORY_COLLISION, body);

    for triggered in spell.trigger_spells() {
        if services.spells.spell(triggered).is_some() {
            services.casts.cast_at(unit.guid, impact, triggered, true);
        }
    }
    Ok(Some(collision))
}

pub fn handle_update_projectile_position(session: &mut Session, command: &mut Command) -> Result<()> {
    let player = session.require_actor()?;
    let payload = &mut command.payload;
    let caster = payload.read_guid()?;
    let spell_id = payload.read_u32()?;
    let cast_count = payload.read_u8()?;
    let impact = Position::read(payload)?;
    if let Some(collision) =
        projectile_landed(session.services(), player, caster, spell_id, cast_count, impact)?
    {
        session.send(collision);
    }
    Ok(())
}
