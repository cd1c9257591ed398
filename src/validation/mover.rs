//! Acting-actor resolution for casts issued through a mover.

use crate::core::guid::ObjectGuid;
use crate::world::spell::SpellInfo;
use crate::world::{SeatFlags, UnitInfo};

/// Decide which unit actually casts `spell` when the client issued it
/// through `mover`.
///
/// The controlling player takes over when the spell may be cast from a
/// vehicle, or when `mover` is a vehicle whose seat lets its occupant
/// attack or cast. Otherwise the mover casts. `seat_flags` is the seat of the
/// controlling player in `mover`, when there is one.
pub fn resolve_acting_actor(
    mover: &UnitInfo,
    spell: &SpellInfo,
    seat_flags: Option<SeatFlags>,
) -> ObjectGuid {
    let Some(controller) = mover.controlling_player else {
        return mover.guid;
    };

    if spell.castable_on_vehicle {
        return controller;
    }

    if mover.is_vehicle
        && controller != mover.guid
        && seat_flags.is_some_and(SeatFlags::grants_casting)
    {
        return controller;
    }

    mover.guid
}
