#![allow(clippy::expect_used, clippy::unwrap_used)]
//! Cast-control operations: cancelling casts, auras and channels, totems,
//! self-resurrection and projectile bookkeeping.

mod common;

use common::{command, creature, player, tick, Harness, MockWorld};
use realm_session::core::guid::ObjectGuid;
use realm_session::core::targets::{flags, Position};
use realm_session::error::{ErrorClass, SessionError};
use realm_session::handlers::spell::{
    cancel_aura, cancel_cast, cancel_channel, cancel_pet_aura, consume_self_resurrection,
    dismiss_totem, projectile_landed, update_missile_trajectory, MissileTrajectory,
    FEEDBACK_PET_DEAD,
};
use realm_session::protocol::opcodes;
use realm_session::validation::{CANCEL_CAST_EXEMPT, HONORLESS_TARGET, UNDISMISSABLE_TOTEMS};
use realm_session::world::spell::{AuraKind, SpellInfo};
use realm_session::world::{CastSlot, InFlightCast, TotemInfo, TrajectoryUpdate, UnitInfo};

const ME: u32 = 1;

fn me() -> ObjectGuid {
    player(ME)
}

fn world() -> MockWorld {
    let world = MockWorld::new();
    world.spawn_player(me());
    world
}

fn channel(world: &MockWorld, unit: ObjectGuid, spell_id: u32) {
    world.state.lock().casts.insert(
        (unit, CastSlot::Channeled),
        InFlightCast {
            spell_id,
            target_mask: 0,
        },
    );
}

#[test]
fn cancelling_a_channeled_aura_stops_the_channel() {
    let world = world();
    world.add_spell(SpellInfo {
        channeled: true,
        ..SpellInfo::new(10)
    });
    channel(&world, me(), 10);

    cancel_aura(&world.services(), me(), 10).unwrap();

    assert_eq!(world.calls(), vec!["interrupt(Channeled)"]);
}

#[test]
fn channeled_aura_of_another_spell_is_left_alone() {
    let world = world();
    world.add_spell(SpellInfo {
        channeled: true,
        ..SpellInfo::new(10)
    });
    channel(&world, me(), 11);

    cancel_aura(&world.services(), me(), 10).unwrap();

    assert!(world.calls().is_empty());
}

#[test]
fn protected_auras_cannot_be_cancelled() {
    let world = world();
    world.add_spell(SpellInfo {
        passive: true,
        ..SpellInfo::new(20)
    });
    world.add_spell(SpellInfo {
        cant_cancel: true,
        ..SpellInfo::new(21)
    });
    world.add_spell(SpellInfo::new(HONORLESS_TARGET));
    let services = world.services();

    for spell_id in [20, 21, HONORLESS_TARGET] {
        cancel_aura(&services, me(), spell_id).unwrap();
    }
    assert!(world.calls().is_empty());
}

#[test]
fn negative_aura_needs_possession_of_another_unit() {
    let world = world();
    let mut curse = SpellInfo {
        positive: false,
        ..SpellInfo::new(30)
    };
    world.add_spell(curse.clone());
    let services = world.services();

    cancel_aura(&services, me(), 30).unwrap();
    assert!(world.calls().is_empty());

    curse.effects[0].aura = Some(AuraKind::ModPossess);
    world.add_spell(curse);
    world.state.lock().movers.insert(me(), creature(5));
    cancel_aura(&services, me(), 30).unwrap();
    assert_eq!(world.calls(), vec!["remove_aura_by_cancel(30)"]);
}

#[test]
fn area_aura_from_another_caster_stays() {
    let world = world();
    let mut aura = SpellInfo::new(40);
    aura.effects[1].aura = Some(AuraKind::AreaAura);
    world.add_spell(aura);
    world
        .state
        .lock()
        .aura_casters
        .insert((me(), 40), player(2));
    let services = world.services();

    cancel_aura(&services, me(), 40).unwrap();
    assert!(world.calls().is_empty());

    world.state.lock().aura_casters.insert((me(), 40), me());
    cancel_aura(&services, me(), 40).unwrap();
    assert_eq!(world.calls(), vec!["remove_aura_by_cancel(40)"]);
}

#[test]
fn cancelling_an_unknown_aura_is_an_unknown_reference() {
    let world = world();
    let err = cancel_aura(&world.services(), me(), 404).unwrap_err();
    assert_eq!(err.class(), ErrorClass::UnknownReference);
}

#[test]
fn cancel_cast_interrupts_only_real_casts() {
    let world = world();
    let services = world.services();

    cancel_cast(&services, me(), 133).unwrap();
    assert!(world.calls().is_empty());

    world.state.lock().casts.insert(
        (me(), CastSlot::Generic),
        InFlightCast {
            spell_id: 133,
            target_mask: 0,
        },
    );
    cancel_cast(&services, me(), CANCEL_CAST_EXEMPT[0]).unwrap();
    assert!(world.calls().is_empty());

    cancel_cast(&services, me(), 133).unwrap();
    assert_eq!(world.calls(), vec!["interrupt_non_melee(133)"]);
}

#[test]
fn cancel_cast_refused_while_controlling_a_player() {
    let world = world();
    world.state.lock().movers.insert(me(), player(2));
    let err = cancel_cast(&world.services(), me(), 133).unwrap_err();
    assert!(matches!(err, SessionError::StateViolation(_)));

    let err = cancel_channel(&world.services(), me()).unwrap_err();
    assert!(matches!(err, SessionError::StateViolation(_)));
}

#[test]
fn cancel_channel_targets_the_mover() {
    let world = world();
    let pet = creature(9);
    world.state.lock().movers.insert(me(), pet);
    channel(&world, pet, 55);

    cancel_channel(&world.services(), me()).unwrap();

    assert_eq!(world.calls(), vec!["interrupt(Channeled)"]);
    assert!(world.state.lock().casts.is_empty());
}

#[test]
fn totems_are_dismissed_by_slot() {
    let world = world();
    let fire = creature(70);
    let sentry = creature(71);
    {
        let mut s = world.state.lock();
        s.totems.insert(
            (me(), 0),
            TotemInfo {
                guid: fire,
                entry: 5_929,
            },
        );
        s.totems.insert(
            (me(), 1),
            TotemInfo {
                guid: sentry,
                entry: UNDISMISSABLE_TOTEMS[0],
            },
        );
    }
    let services = world.services();

    dismiss_totem(&services, me(), 1).unwrap();
    dismiss_totem(&services, me(), 2).unwrap();
    dismiss_totem(&services, me(), 9).unwrap();
    assert!(world.calls().is_empty());

    dismiss_totem(&services, me(), 0).unwrap();
    assert_eq!(world.calls(), vec!["unsummon_totem"]);
}

#[test]
fn totems_stay_while_moving_another_unit() {
    let world = world();
    world.state.lock().movers.insert(me(), creature(3));
    assert!(dismiss_totem(&world.services(), me(), 0).is_err());
}

#[test]
fn self_resurrection_is_consumed_once() {
    let world = world();
    world.add_spell(SpellInfo::new(20_608));
    world.state.lock().self_res.insert(me(), 20_608);
    let services = world.services();

    consume_self_resurrection(&services, me());
    consume_self_resurrection(&services, me());

    assert_eq!(
        world.calls(),
        vec!["cast_on(20608,false)", "clear_self_res_spell"]
    );
}

#[test]
fn self_resurrection_blocked_by_prevention_aura() {
    let world = world();
    world.add_spell(SpellInfo::new(20_608));
    {
        let mut s = world.state.lock();
        s.self_res.insert(me(), 20_608);
        s.prevent_resurrection.insert(me());
    }

    consume_self_resurrection(&world.services(), me());

    assert!(world.calls().is_empty());
    assert_eq!(world.state.lock().self_res.get(&me()), Some(&20_608));
}

#[test]
fn unknown_self_resurrection_spell_is_cleared_without_casting() {
    let world = world();
    world.state.lock().self_res.insert(me(), 1);

    consume_self_resurrection(&world.services(), me());

    assert_eq!(world.calls(), vec!["clear_self_res_spell"]);
}

#[test]
fn pet_aura_cancel_checks_ownership_and_life() {
    let world = world();
    let pet = creature(80);
    let stranger = creature(81);
    world.add_spell(SpellInfo::new(60));
    world.add_unit(UnitInfo::creature(pet, 70));
    world.add_unit(UnitInfo::creature(stranger, 70));
    world.state.lock().pets.insert(me(), pet);
    let services = world.services();

    let err = cancel_pet_aura(&services, me(), stranger, 60).unwrap_err();
    assert!(matches!(err, SessionError::StateViolation(_)));

    let err = cancel_pet_aura(&services, me(), creature(82), 60).unwrap_err();
    assert_eq!(err.class(), ErrorClass::UnknownReference);

    let err = cancel_pet_aura(&services, me(), pet, 61).unwrap_err();
    assert_eq!(err.class(), ErrorClass::UnknownReference);

    assert!(cancel_pet_aura(&services, me(), pet, 60).unwrap().is_none());
    assert_eq!(world.calls(), vec!["remove_pet_aura(60)"]);
}

#[test]
fn dead_pet_gets_feedback_instead_of_cancel() {
    let mut h = Harness::new();
    let mut session = h.in_world(1, me());
    let pet = creature(80);
    h.world.add_spell(SpellInfo::new(60));
    h.world.add_unit(UnitInfo {
        alive: false,
        ..UnitInfo::creature(pet, 70)
    });
    h.world.state.lock().charms.insert(me(), pet);

    session.enqueue(command(opcodes::CMSG_PET_CANCEL_AURA, |b| {
        b.write_guid(pet).write_u32(60);
    }));
    assert!(tick(&mut session));

    let sent = h.drain();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].opcode, opcodes::SMSG_PET_ACTION_FEEDBACK);
    assert_eq!(sent[0].reader().read_u8().unwrap(), FEEDBACK_PET_DEAD);
    assert!(!h.world.called("remove_pet_aura(60)"));
}

#[test]
fn missile_trajectory_applies_to_matching_destination_cast() {
    let world = world();
    let update = TrajectoryUpdate {
        source: Position::new(1.0, 2.0, 3.0),
        destination: Position::new(10.0, 20.0, 3.0),
        elevation: 0.4,
        speed: 28.0,
    };
    let correction = MissileTrajectory {
        caster: me(),
        spell_id: 64_000,
        update,
        has_movement: false,
    };
    let services = world.services();

    assert!(!update_missile_trajectory(&services, &correction));

    world.state.lock().casts.insert(
        (me(), CastSlot::Generic),
        InFlightCast {
            spell_id: 64_000,
            target_mask: flags::UNIT,
        },
    );
    assert!(!update_missile_trajectory(&services, &correction));

    world.state.lock().casts.insert(
        (me(), CastSlot::Generic),
        InFlightCast {
            spell_id: 64_000,
            target_mask: flags::DEST_LOCATION,
        },
    );
    assert!(update_missile_trajectory(&services, &correction));
    assert_eq!(world.call_count("update_trajectory"), 1);
}

#[test]
fn missile_trajectory_command_skips_movement_block() {
    let mut h = Harness::new();
    let mut session = h.in_world(1, me());
    h.world.state.lock().casts.insert(
        (me(), CastSlot::Generic),
        InFlightCast {
            spell_id: 64_000,
            target_mask: flags::DEST_LOCATION,
        },
    );

    session.enqueue(command(opcodes::CMSG_UPDATE_MISSILE_TRAJECTORY, |b| {
        b.write_guid(me()).write_u32(64_000).write_f32(0.4).write_f32(28.0);
        Position::new(1.0, 2.0, 3.0).write(b);
        Position::new(10.0, 20.0, 3.0).write(b);
        b.write_u8(1).write_bytes(&[0u8; 30]);
    }));
    assert!(tick(&mut session));

    assert!(h.world.called("update_trajectory"));
    assert_eq!(h.ctx.metrics.snapshot().protocol_violations, 0);
}

#[test]
fn projectile_impact_fires_known_triggers_and_echoes_collision() {
    let world = world();
    let mut spell = SpellInfo::new(70);
    spell.effects[0].trigger_spell = 71;
    spell.effects[2].trigger_spell = 72;
    world.add_spell(spell);
    world.add_spell(SpellInfo::new(71));
    let impact = Position::new(5.0, 6.0, 7.0);

    let collision = projectile_landed(&world.services(), me(), me(), 70, 2, impact)
        .unwrap()
        .unwrap();

    assert_eq!(world.calls(), vec!["cast_at(71,true)"]);
    assert_eq!(
        collision.opcode,
        opcodes::SMSG_NOTIFY_MISSILE_TRAJECTORY_COLLISION
    );
    let mut body = collision.reader();
    assert_eq!(body.read_guid().unwrap(), me());
    assert_eq!(body.read_u8().unwrap(), 2);
    assert_eq!(Position::read(&mut body).unwrap(), impact);
}

#[test]
fn projectile_from_an_unseen_caster_is_ignored() {
    let world = world();
    world.add_spell(SpellInfo::new(70));
    let landed = projectile_landed(
        &world.services(),
        me(),
        creature(99),
        70,
        1,
        Position::default(),
    )
    .unwrap();
    assert!(landed.is_none());
    assert!(world.calls().is_empty());
}

#[test]
fn projectile_command_sends_the_collision() {
    let mut h = Harness::new();
    let mut session = h.in_world(1, me());
    h.world.add_spell(SpellInfo::new(70));

    session.enqueue(command(opcodes::CMSG_UPDATE_PROJECTILE_POSITION, |b| {
        b.write_guid(me()).write_u32(70).write_u8(1);
        Position::new(1.0, 1.0, 1.0).write(b);
    }));
    assert!(tick(&mut session));

    let sent = h.drain();
    assert_eq!(sent.len(), 1);
    assert_eq!(
        sent[0].opcode,
        opcodes::SMSG_NOTIFY_MISSILE_TRAJECTORY_COLLISION
    );
}

#[test]
fn cancel_aura_command_runs_on_the_region_tick() {
    let mut h = Harness::new();
    let mut session = h.in_world(1, me());
    h.world.add_spell(SpellInfo::new(48_168));

    session.enqueue(command(opcodes::CMSG_CANCEL_AURA, |b| {
        b.write_u32(48_168);
    }));
    assert!(session.update());
    assert!(!h.world.called("remove_aura_by_cancel(48168)"));

    assert!(tick(&mut session));
    assert!(h.world.called("remove_aura_by_cancel(48168)"));
}
