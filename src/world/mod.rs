//! # World Collaborators
//!
//! Narrow interfaces the session engine calls into. Gameplay resolution,
//! storage schemas, anti-cheat heuristics and scripts live behind these
//! traits; the engine only asks questions and issues requests.
//!
//! All collaborators are injected through [`WorldServices`], shared
//! read-only across sessions.

pub mod item;
pub mod spell;
pub mod storage;

use crate::core::guid::ObjectGuid;
use crate::core::targets::{Position, SpellCastTargets};
use crate::error::Result;
use crate::validation::{ActionRequest, EquipError};
use item::ItemView;
use spell::SpellInfo;
use std::sync::Arc;
use storage::{Database, Row, Statement};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActorKind {
    Player,
    Creature,
}

/// Snapshot of a unit's identity and control relationships.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitInfo {
    pub guid: ObjectGuid,
    pub kind: ActorKind,
    pub level: u32,
    pub alive: bool,
    pub is_vehicle: bool,
    /// Charmer or owner, if any.
    pub owner: Option<ObjectGuid>,
    /// Charmer-or-owner player, or the unit itself when it is a player.
    pub controlling_player: Option<ObjectGuid>,
}

impl UnitInfo {
    pub fn player(guid: ObjectGuid, level: u32) -> Self {
        Self {
            guid,
            kind: ActorKind::Player,
            level,
            alive: true,
            is_vehicle: false,
            owner: None,
            controlling_player: Some(guid),
        }
    }

    pub fn creature(guid: ObjectGuid, level: u32) -> Self {
        Self {
            guid,
            kind: ActorKind::Creature,
            level,
            alive: true,
            is_vehicle: guid.is_vehicle(),
            owner: None,
            controlling_player: None,
        }
    }

    pub fn is_player(&self) -> bool {
        self.kind == ActorKind::Player
    }
}

/// Vehicle seat capability bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SeatFlags(pub u32);

impl SeatFlags {
    pub const CAN_CAST: u32 = 0x0000_0800;
    pub const CAN_ATTACK: u32 = 0x0000_4000;

    pub fn grants_casting(self) -> bool {
        self.0 & (Self::CAN_CAST | Self::CAN_ATTACK) != 0
    }
}

/// Current-spell slots a unit can hold at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CastSlot {
    Generic,
    Channeled,
    AutoRepeat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InFlightCast {
    pub spell_id: u32,
    pub target_mask: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrajectoryUpdate {
    pub source: Position,
    pub destination: Position,
    pub elevation: f32,
    pub speed: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TotemInfo {
    pub guid: ObjectGuid,
    pub entry: u32,
}

/// A simulated spatial region. Holding an `Arc` to one pins it.
pub trait Region: Send + Sync {
    fn id(&self) -> u32;
    fn unit(&self, guid: ObjectGuid) -> Option<UnitInfo>;
    fn attackers_of(&self, victim: ObjectGuid) -> Vec<ObjectGuid>;
    /// Graceful removal of a resident actor.
    fn remove_actor(&self, actor: ObjectGuid);
    /// Deallocation of an actor that is attached to the region but not resident.
    fn delete_from_world(&self, actor: ObjectGuid);
}

/// Actor state owned by the simulation.
pub trait ActorRuntime: Send + Sync {
    fn unit(&self, guid: ObjectGuid) -> Option<UnitInfo>;
    fn load_player(&self, account_id: u32, character: ObjectGuid) -> Result<()>;
    fn is_in_world(&self, player: ObjectGuid) -> bool;
    fn region_of(&self, player: ObjectGuid) -> Option<Arc<dyn Region>>;
    fn mover_of(&self, player: ObjectGuid) -> ObjectGuid;
    fn pet_of(&self, player: ObjectGuid) -> Option<ObjectGuid>;
    fn charm_of(&self, player: ObjectGuid) -> Option<ObjectGuid>;
    fn vehicle_of(&self, player: ObjectGuid) -> Option<ObjectGuid>;
    fn vehicle_seat_flags(&self, vehicle: ObjectGuid, occupant: ObjectGuid) -> Option<SeatFlags>;

    // relocation
    fn is_being_teleported_far(&self, player: ObjectGuid) -> bool;
    /// Same signal a client relocation acknowledgement produces.
    fn acknowledge_relocation(&self, player: ObjectGuid);
    fn set_teleport_deferrable(&self, player: ObjectGuid, deferrable: bool);
    /// Run a relocation deferred while a handler executed. Returns whether one ran.
    fn flush_deferred_relocation(&self, player: ObjectGuid) -> bool;
    fn instance_valid(&self, player: ObjectGuid) -> bool;
    fn is_game_master(&self, player: ObjectGuid) -> bool;
    fn teleport_to_homebind(&self, player: ObjectGuid);

    // combat and death
    fn in_combat(&self, unit: ObjectGuid) -> bool;
    fn death_timer_active(&self, player: ObjectGuid) -> bool;
    fn has_redemption_aura(&self, player: ObjectGuid) -> bool;
    fn has_pending_bind(&self, player: ObjectGuid) -> bool;
    fn can_logout_instantly(&self, player: ObjectGuid) -> bool;
    fn loot_in_progress(&self, player: ObjectGuid) -> Option<ObjectGuid>;
    fn release_loot(&self, player: ObjectGuid, loot: ObjectGuid);

    // terminal presentation
    fn present_as_ghost(&self, player: ObjectGuid);
    fn resolve_combat_death(&self, player: ObjectGuid, pvp: bool);
    fn resolve_redemption_death(&self, player: ObjectGuid);
    fn resolve_pending_bind(&self, player: ObjectGuid);
    fn reward_honor(&self, attacker: ObjectGuid, victim: ObjectGuid, group_size: usize);

    // teardown
    fn remove_pet(&self, player: ObjectGuid);
    fn exit_vehicle(&self, player: ObjectGuid);
    fn save_to_storage(&self, player: ObjectGuid) -> Result<()>;
    fn cleanup_before_delete(&self, player: ObjectGuid);
    /// Drop an actor that belongs to no region.
    fn discard(&self, player: ObjectGuid);

    // spellbook
    fn spellbook_unrestricted(&self, player: ObjectGuid) -> bool;
    fn has_active_spell(&self, player: ObjectGuid, spell_id: u32) -> bool;
    fn creature_has_spell(&self, creature: ObjectGuid, spell_id: u32) -> bool;
    /// Spell id of a client-driven aura that triggers `spell_id`, if any.
    fn triggering_client_aura(&self, caster: ObjectGuid, spell_id: u32) -> Option<u32>;
}

pub trait Inventory: Send + Sync {
    fn item_at(&self, player: ObjectGuid, bag: u8, slot: u8) -> Option<ItemView>;
    fn can_use_item(&self, player: ObjectGuid, item: &ItemView) -> EquipError;
    fn bind_to_owner(&self, player: ObjectGuid, item: ObjectGuid);
    fn last_potion(&self, player: ObjectGuid) -> Option<u32>;
    fn in_arena(&self, player: ObjectGuid) -> bool;
    fn area_id(&self, player: ObjectGuid) -> u32;
    fn map_id(&self, player: ObjectGuid) -> u32;
    fn target_valid_for_item(&self, item: &ItemView, target: Option<&UnitInfo>) -> bool;
}

/// Guild, group, social, channel, battleground and matchmaking services.
pub trait Community: Send + Sync {
    /// Returns `false` when the player is not in a battleground.
    fn battleground_logout(&self, player: ObjectGuid) -> bool;
    fn battleground_kill_credit(&self, victim: ObjectGuid, killer: ObjectGuid);
    /// Returns how many queues the player was removed from.
    fn leave_battleground_queues(&self, player: ObjectGuid) -> usize;
    fn leave_matchmaking(&self, player: ObjectGuid);
    fn guild_of(&self, player: ObjectGuid) -> Option<u32>;
    fn guild_member_logout(&self, guild: u32, player: ObjectGuid);
    fn leave_channels(&self, player: ObjectGuid);
    fn group_of(&self, player: ObjectGuid) -> Option<u32>;
    fn group_member_logout(&self, group: u32, player: ObjectGuid);
    fn broadcast_offline(&self, player: ObjectGuid);
}

pub trait Persistence: Send + Sync {
    fn execute(&self, db: Database, statement: Statement) -> Result<()>;
    fn query(&self, db: Database, statement: Statement) -> Result<Vec<Row>>;
    fn transaction(&self, db: Database, statements: Vec<Statement>) -> Result<()>;
}

pub trait AntiCheat: Send + Sync {
    fn allow_spell_cast(&self, player: ObjectGuid, spell_id: u32) -> bool;
}

pub trait ScriptHooks: Send + Sync {
    /// `true` when a script took over the item use.
    fn on_item_use(&self, player: ObjectGuid, item: &ItemView, targets: &SpellCastTargets) -> bool;
}

pub trait SpellStore: Send + Sync {
    fn spell(&self, id: u32) -> Option<Arc<SpellInfo>>;
    fn rank_for_level(&self, spell: &SpellInfo, level: u32) -> Option<Arc<SpellInfo>>;
}

/// Simulation-side spell execution and cast bookkeeping.
pub trait CastControl: Send + Sync {
    /// Hand a validated action to the simulation.
    fn prepare(&self, request: ActionRequest);
    fn is_casting_non_melee(&self, unit: ObjectGuid) -> bool;
    /// Interrupt non-melee casts; `spell_id` narrows it to one spell.
    fn interrupt_non_melee(&self, unit: ObjectGuid, spell_id: Option<u32>);
    fn current_cast(&self, unit: ObjectGuid, slot: CastSlot) -> Option<InFlightCast>;
    fn interrupt(&self, unit: ObjectGuid, slot: CastSlot);
    fn update_trajectory(&self, unit: ObjectGuid, update: TrajectoryUpdate);
    fn aura_caster(&self, unit: ObjectGuid, spell_id: u32) -> Option<ObjectGuid>;
    fn remove_aura_by_cancel(&self, unit: ObjectGuid, spell_id: u32);
    /// Remove the aura from a pet and start the spell's cooldowns.
    fn remove_pet_aura(&self, pet: ObjectGuid, spell_id: u32);
    fn totem_in_slot(&self, player: ObjectGuid, slot: u8) -> Option<TotemInfo>;
    fn unsummon_totem(&self, totem: ObjectGuid);
    fn has_prevent_resurrection(&self, player: ObjectGuid) -> bool;
    /// Pending self-resurrection spell, 0 for none.
    fn self_res_spell(&self, player: ObjectGuid) -> u32;
    fn clear_self_res_spell(&self, player: ObjectGuid);
    fn cast_on(&self, caster: ObjectGuid, target: ObjectGuid, spell_id: u32, triggered: bool);
    fn cast_at(&self, caster: ObjectGuid, position: Position, spell_id: u32, triggered: bool);
}

/// Anti-cheat that never objects.
#[derive(Debug, Default, Clone, Copy)]
pub struct PermissiveAntiCheat;

impl AntiCheat for PermissiveAntiCheat {
    fn allow_spell_cast(&self, _player: ObjectGuid, _spell_id: u32) -> bool {
        true
    }
}

/// Script layer with no hooks installed.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoScripts;

impl ScriptHooks for NoScripts {
    fn on_item_use(&self, _player: ObjectGuid, _item: &ItemView, _targets: &SpellCastTargets) -> bool {
        false
    }
}

/// The full set of collaborators a session talks to.
#[derive(Clone)]
pub struct WorldServices {
    pub actors: Arc<dyn ActorRuntime>,
    pub inventory: Arc<dyn Inventory>,
    pub community: Arc<dyn Community>,
    pub persistence: Arc<dyn Persistence>,
    pub anticheat: Arc<dyn AntiCheat>,
    pub scripts: Arc<dyn ScriptHooks>,
    pub spells: Arc<dyn SpellStore>,
    pub casts: Arc<dyn CastControl>,
}

impl std::fmt::Debug for WorldServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorldServices").finish_non_exhaustive()
    }
}
