//! In-memory world used by the integration tests.
//!
//! One [`MockWorld`] implements every collaborator trait. Mutating calls are
//! appended to a call log so tests can assert on what happened and in which
//! order; queries are not logged.

#![allow(dead_code, clippy::unwrap_used)]

use parking_lot::Mutex;
use realm_session::config::SessionConfig;
use realm_session::core::buffer::CommandBuffer;
use realm_session::core::command::{Command, OutboundPacket};
use realm_session::core::guid::{HighGuid, ObjectGuid};
use realm_session::core::targets::{Position, SpellCastTargets};
use realm_session::error::{Result, SessionError};
use realm_session::handlers::standard_table;
use realm_session::session::{AccountInfo, ConnectionLink, Session, SessionContext};
use realm_session::validation::{ActionRequest, EquipError};
use realm_session::world::item::ItemView;
use realm_session::world::spell::SpellInfo;
use realm_session::world::storage::{Database, Row, Statement};
use realm_session::world::{
    ActorRuntime, AntiCheat, CastControl, CastSlot, Community, InFlightCast, Inventory, Persistence,
    Region, ScriptHooks, SeatFlags, SpellStore, TotemInfo, TrajectoryUpdate, UnitInfo, WorldServices,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

pub const REGION_ID: u32 = 571;

pub fn player(low: u32) -> ObjectGuid {
    ObjectGuid::new(HighGuid::Player, low)
}

pub fn creature(low: u32) -> ObjectGuid {
    ObjectGuid::new(HighGuid::Unit, low)
}

pub fn vehicle(low: u32) -> ObjectGuid {
    ObjectGuid::new(HighGuid::Vehicle, low)
}

pub fn item(low: u32) -> ObjectGuid {
    ObjectGuid::new(HighGuid::Item, low)
}

#[derive(Default)]
pub struct WorldState {
    pub units: HashMap<ObjectGuid, UnitInfo>,
    /// Actors attached to the region.
    pub attached: HashSet<ObjectGuid>,
    /// Attached actors that are also resident.
    pub resident: HashSet<ObjectGuid>,
    pub movers: HashMap<ObjectGuid, ObjectGuid>,
    pub pets: HashMap<ObjectGuid, ObjectGuid>,
    pub charms: HashMap<ObjectGuid, ObjectGuid>,
    pub seat_flags: HashMap<(ObjectGuid, ObjectGuid), SeatFlags>,
    pub attackers: HashMap<ObjectGuid, Vec<ObjectGuid>>,

    /// Acknowledgements still needed before a far relocation settles.
    pub relocation_acks_needed: HashMap<ObjectGuid, u32>,
    pub in_combat: HashSet<ObjectGuid>,
    pub instant_logout: bool,
    pub loot: HashMap<ObjectGuid, ObjectGuid>,
    pub deferred_relocation: HashSet<ObjectGuid>,
    /// A flushed deferred relocation takes the actor out of its region.
    pub deferred_relocation_is_far: bool,
    /// A relocation ack lands the actor in its new region.
    pub ack_enters_world: bool,
    pub loadable: HashSet<ObjectGuid>,

    pub spells: HashMap<u32, Arc<SpellInfo>>,
    pub ranks: HashMap<(u32, u32), Arc<SpellInfo>>,
    pub active_spells: HashSet<(ObjectGuid, u32)>,
    pub creature_spells: HashSet<(ObjectGuid, u32)>,
    pub triggering_auras: HashMap<(ObjectGuid, u32), u32>,
    pub unrestricted: HashSet<ObjectGuid>,

    pub items: HashMap<(u8, u8), ItemView>,
    pub equip_result: Option<EquipError>,
    pub last_potion: Option<u32>,
    pub in_arena: bool,
    pub area_id: u32,
    pub map_id: u32,
    pub target_rule_passes: bool,

    pub casts: HashMap<(ObjectGuid, CastSlot), InFlightCast>,
    pub aura_casters: HashMap<(ObjectGuid, u32), ObjectGuid>,
    pub totems: HashMap<(ObjectGuid, u8), TotemInfo>,
    pub self_res: HashMap<ObjectGuid, u32>,
    pub prevent_resurrection: HashSet<ObjectGuid>,

    pub guilds: HashMap<ObjectGuid, u32>,
    pub groups: HashMap<ObjectGuid, u32>,
    pub in_battleground: HashSet<ObjectGuid>,

    pub rows: HashMap<&'static str, Vec<Row>>,
    pub statements: Vec<(Database, Statement)>,
    pub fail_saves: bool,
    pub fail_queries: bool,

    pub anticheat_allows: bool,
    pub scripts_handle_items: bool,

    pub prepared: Vec<ActionRequest>,
    pub calls: Vec<String>,
}

#[derive(Clone)]
pub struct MockWorld {
    pub state: Arc<Mutex<WorldState>>,
}

impl MockWorld {
    pub fn new() -> Self {
        let state = WorldState {
            anticheat_allows: true,
            target_rule_passes: true,
            ..WorldState::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub fn services(&self) -> WorldServices {
        let me = Arc::new(self.clone());
        WorldServices {
            actors: me.clone(),
            inventory: me.clone(),
            community: me.clone(),
            persistence: me.clone(),
            anticheat: me.clone(),
            scripts: me.clone(),
            spells: me.clone(),
            casts: me,
        }
    }

    /// Put a player into the region, resident and self-moving.
    pub fn spawn_player(&self, guid: ObjectGuid) {
        let mut s = self.state.lock();
        s.units.insert(guid, UnitInfo::player(guid, 80));
        s.attached.insert(guid);
        s.resident.insert(guid);
        s.loadable.insert(guid);
    }

    pub fn add_unit(&self, unit: UnitInfo) {
        self.state.lock().units.insert(unit.guid, unit);
    }

    pub fn add_spell(&self, spell: SpellInfo) {
        self.state.lock().spells.insert(spell.id, Arc::new(spell));
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().calls.clone()
    }

    pub fn called(&self, name: &str) -> bool {
        self.state.lock().calls.iter().any(|c| c == name)
    }

    pub fn call_count(&self, name: &str) -> usize {
        self.state.lock().calls.iter().filter(|c| *c == name).count()
    }

    pub fn prepared(&self) -> Vec<ActionRequest> {
        self.state.lock().prepared.clone()
    }

    pub fn statements(&self) -> Vec<(Database, Statement)> {
        self.state.lock().statements.clone()
    }

    fn log(&self, call: impl Into<String>) {
        self.state.lock().calls.push(call.into());
    }
}

struct MockRegion {
    state: Arc<Mutex<WorldState>>,
}

impl MockRegion {
    fn log(&self, call: &str) {
        self.state.lock().calls.push(call.to_string());
    }
}

impl Region for MockRegion {
    fn id(&self) -> u32 {
        REGION_ID
    }

    fn unit(&self, guid: ObjectGuid) -> Option<UnitInfo> {
        self.state.lock().units.get(&guid).cloned()
    }

    fn attackers_of(&self, victim: ObjectGuid) -> Vec<ObjectGuid> {
        self.state
            .lock()
            .attackers
            .get(&victim)
            .cloned()
            .unwrap_or_default()
    }

    fn remove_actor(&self, actor: ObjectGuid) {
        self.log("remove_actor");
        let mut s = self.state.lock();
        s.resident.remove(&actor);
        s.attached.remove(&actor);
    }

    fn delete_from_world(&self, actor: ObjectGuid) {
        self.log("delete_from_world");
        self.state.lock().attached.remove(&actor);
    }
}

impl ActorRuntime for MockWorld {
    fn unit(&self, guid: ObjectGuid) -> Option<UnitInfo> {
        self.state.lock().units.get(&guid).cloned()
    }

    fn load_player(&self, _account_id: u32, character: ObjectGuid) -> Result<()> {
        self.log("load_player");
        let mut s = self.state.lock();
        if !s.loadable.contains(&character) {
            return Err(SessionError::unknown(
                realm_session::error::ReferenceKind::Character,
                character,
            ));
        }
        s.units
            .entry(character)
            .or_insert_with(|| UnitInfo::player(character, 80));
        s.attached.insert(character);
        s.resident.insert(character);
        Ok(())
    }

    fn is_in_world(&self, player: ObjectGuid) -> bool {
        self.state.lock().resident.contains(&player)
    }

    fn region_of(&self, player: ObjectGuid) -> Option<Arc<dyn Region>> {
        if self.state.lock().attached.contains(&player) {
            Some(Arc::new(MockRegion {
                state: Arc::clone(&self.state),
            }))
        } else {
            None
        }
    }

    fn mover_of(&self, player: ObjectGuid) -> ObjectGuid {
        self.state.lock().movers.get(&player).copied().unwrap_or(player)
    }

    fn pet_of(&self, player: ObjectGuid) -> Option<ObjectGuid> {
        self.state.lock().pets.get(&player).copied()
    }

    fn charm_of(&self, player: ObjectGuid) -> Option<ObjectGuid> {
        self.state.lock().charms.get(&player).copied()
    }

    fn vehicle_of(&self, _player: ObjectGuid) -> Option<ObjectGuid> {
        None
    }

    fn vehicle_seat_flags(&self, vehicle: ObjectGuid, occupant: ObjectGuid) -> Option<SeatFlags> {
        self.state.lock().seat_flags.get(&(vehicle, occupant)).copied()
    }

    fn is_being_teleported_far(&self, player: ObjectGuid) -> bool {
        self.state
            .lock()
            .relocation_acks_needed
            .get(&player)
            .is_some_and(|n| *n > 0)
    }

    fn acknowledge_relocation(&self, player: ObjectGuid) {
        self.log("acknowledge_relocation");
        let mut s = self.state.lock();
        if let Some(n) = s.relocation_acks_needed.get_mut(&player) {
            *n = n.saturating_sub(1);
        }
        if s.ack_enters_world {
            s.resident.insert(player);
        }
    }

    fn set_teleport_deferrable(&self, _player: ObjectGuid, _deferrable: bool) {}

    fn flush_deferred_relocation(&self, player: ObjectGuid) -> bool {
        let ran = {
            let mut s = self.state.lock();
            let ran = s.deferred_relocation.remove(&player);
            if ran && s.deferred_relocation_is_far {
                s.resident.remove(&player);
            }
            ran
        };
        if ran {
            self.log("deferred_relocation");
        }
        ran
    }

    fn instance_valid(&self, _player: ObjectGuid) -> bool {
        true
    }

    fn is_game_master(&self, _player: ObjectGuid) -> bool {
        false
    }

    fn teleport_to_homebind(&self, _player: ObjectGuid) {
        self.log("teleport_to_homebind");
    }

    fn in_combat(&self, unit: ObjectGuid) -> bool {
        self.state.lock().in_combat.contains(&unit)
    }

    fn death_timer_active(&self, _player: ObjectGuid) -> bool {
        false
    }

    fn has_redemption_aura(&self, _player: ObjectGuid) -> bool {
        false
    }

    fn has_pending_bind(&self, _player: ObjectGuid) -> bool {
        false
    }

    fn can_logout_instantly(&self, _player: ObjectGuid) -> bool {
        self.state.lock().instant_logout
    }

    fn loot_in_progress(&self, player: ObjectGuid) -> Option<ObjectGuid> {
        self.state.lock().loot.get(&player).copied()
    }

    fn release_loot(&self, player: ObjectGuid, _loot: ObjectGuid) {
        self.log("release_loot");
        self.state.lock().loot.remove(&player);
    }

    fn present_as_ghost(&self, _player: ObjectGuid) {
        self.log("present_as_ghost");
    }

    fn resolve_combat_death(&self, _player: ObjectGuid, pvp: bool) {
        self.log(format!("resolve_combat_death(pvp={pvp})"));
    }

    fn resolve_redemption_death(&self, _player: ObjectGuid) {
        self.log("resolve_redemption_death");
    }

    fn resolve_pending_bind(&self, _player: ObjectGuid) {
        self.log("resolve_pending_bind");
    }

    fn reward_honor(&self, attacker: ObjectGuid, _victim: ObjectGuid, group_size: usize) {
        self.log(format!("reward_honor({},{group_size})", attacker.counter()));
    }

    fn remove_pet(&self, _player: ObjectGuid) {
        self.log("remove_pet");
    }

    fn exit_vehicle(&self, _player: ObjectGuid) {
        self.log("exit_vehicle");
    }

    fn save_to_storage(&self, _player: ObjectGuid) -> Result<()> {
        self.log("save_to_storage");
        if self.state.lock().fail_saves {
            return Err(SessionError::Persistence("storage offline".into()));
        }
        Ok(())
    }

    fn cleanup_before_delete(&self, _player: ObjectGuid) {
        self.log("cleanup_before_delete");
    }

    fn discard(&self, _player: ObjectGuid) {
        self.log("discard");
    }

    fn spellbook_unrestricted(&self, player: ObjectGuid) -> bool {
        self.state.lock().unrestricted.contains(&player)
    }

    fn has_active_spell(&self, player: ObjectGuid, spell_id: u32) -> bool {
        self.state.lock().active_spells.contains(&(player, spell_id))
    }

    fn creature_has_spell(&self, creature: ObjectGuid, spell_id: u32) -> bool {
        self.state.lock().creature_spells.contains(&(creature, spell_id))
    }

    fn triggering_client_aura(&self, caster: ObjectGuid, spell_id: u32) -> Option<u32> {
        self.state
            .lock()
            .triggering_auras
            .get(&(caster, spell_id))
            .copied()
    }
}

impl Inventory for MockWorld {
    fn item_at(&self, _player: ObjectGuid, bag: u8, slot: u8) -> Option<ItemView> {
        self.state.lock().items.get(&(bag, slot)).cloned()
    }

    fn can_use_item(&self, _player: ObjectGuid, _item: &ItemView) -> EquipError {
        self.state.lock().equip_result.unwrap_or(EquipError::Ok)
    }

    fn bind_to_owner(&self, _player: ObjectGuid, _item: ObjectGuid) {
        self.log("bind_to_owner");
    }

    fn last_potion(&self, _player: ObjectGuid) -> Option<u32> {
        self.state.lock().last_potion
    }

    fn in_arena(&self, _player: ObjectGuid) -> bool {
        self.state.lock().in_arena
    }

    fn area_id(&self, _player: ObjectGuid) -> u32 {
        self.state.lock().area_id
    }

    fn map_id(&self, _player: ObjectGuid) -> u32 {
        self.state.lock().map_id
    }

    fn target_valid_for_item(&self, _item: &ItemView, _target: Option<&UnitInfo>) -> bool {
        self.state.lock().target_rule_passes
    }
}

impl Community for MockWorld {
    fn battleground_logout(&self, player: ObjectGuid) -> bool {
        let inside = self.state.lock().in_battleground.remove(&player);
        if inside {
            self.log("battleground_logout");
        }
        inside
    }

    fn battleground_kill_credit(&self, _victim: ObjectGuid, killer: ObjectGuid) {
        self.log(format!("battleground_kill_credit({})", killer.counter()));
    }

    fn leave_battleground_queues(&self, _player: ObjectGuid) -> usize {
        0
    }

    fn leave_matchmaking(&self, _player: ObjectGuid) {
        self.log("leave_matchmaking");
    }

    fn guild_of(&self, player: ObjectGuid) -> Option<u32> {
        self.state.lock().guilds.get(&player).copied()
    }

    fn guild_member_logout(&self, _guild: u32, _player: ObjectGuid) {
        self.log("guild_member_logout");
    }

    fn leave_channels(&self, _player: ObjectGuid) {
        self.log("leave_channels");
    }

    fn group_of(&self, player: ObjectGuid) -> Option<u32> {
        self.state.lock().groups.get(&player).copied()
    }

    fn group_member_logout(&self, _group: u32, _player: ObjectGuid) {
        self.log("group_member_logout");
    }

    fn broadcast_offline(&self, _player: ObjectGuid) {
        self.log("broadcast_offline");
    }
}

impl Persistence for MockWorld {
    fn execute(&self, db: Database, statement: Statement) -> Result<()> {
        self.state.lock().statements.push((db, statement));
        Ok(())
    }

    fn query(&self, _db: Database, statement: Statement) -> Result<Vec<Row>> {
        let s = self.state.lock();
        if s.fail_queries {
            return Err(SessionError::Persistence("character database offline".into()));
        }
        Ok(s
            .rows
            .get(statement.sql)
            .cloned()
            .unwrap_or_default())
    }

    fn transaction(&self, db: Database, statements: Vec<Statement>) -> Result<()> {
        let mut s = self.state.lock();
        for statement in statements {
            s.statements.push((db, statement));
        }
        Ok(())
    }
}

impl AntiCheat for MockWorld {
    fn allow_spell_cast(&self, _player: ObjectGuid, _spell_id: u32) -> bool {
        self.state.lock().anticheat_allows
    }
}

impl ScriptHooks for MockWorld {
    fn on_item_use(&self, _player: ObjectGuid, _item: &ItemView, _targets: &SpellCastTargets) -> bool {
        self.state.lock().scripts_handle_items
    }
}

impl SpellStore for MockWorld {
    fn spell(&self, id: u32) -> Option<Arc<SpellInfo>> {
        self.state.lock().spells.get(&id).cloned()
    }

    fn rank_for_level(&self, spell: &SpellInfo, level: u32) -> Option<Arc<SpellInfo>> {
        self.state.lock().ranks.get(&(spell.id, level)).cloned()
    }
}

impl CastControl for MockWorld {
    fn prepare(&self, request: ActionRequest) {
        self.log("prepare");
        self.state.lock().prepared.push(request);
    }

    fn is_casting_non_melee(&self, unit: ObjectGuid) -> bool {
        let s = self.state.lock();
        [CastSlot::Generic, CastSlot::Channeled, CastSlot::AutoRepeat]
            .iter()
            .any(|slot| s.casts.contains_key(&(unit, *slot)))
    }

    fn interrupt_non_melee(&self, unit: ObjectGuid, spell_id: Option<u32>) {
        self.log(format!("interrupt_non_melee({})", spell_id.unwrap_or(0)));
        self.state
            .lock()
            .casts
            .retain(|(u, _), cast| *u != unit || spell_id.is_some_and(|id| id != cast.spell_id));
    }

    fn current_cast(&self, unit: ObjectGuid, slot: CastSlot) -> Option<InFlightCast> {
        self.state.lock().casts.get(&(unit, slot)).copied()
    }

    fn interrupt(&self, unit: ObjectGuid, slot: CastSlot) {
        self.log(format!("interrupt({slot:?})"));
        self.state.lock().casts.remove(&(unit, slot));
    }

    fn update_trajectory(&self, _unit: ObjectGuid, _update: TrajectoryUpdate) {
        self.log("update_trajectory");
    }

    fn aura_caster(&self, unit: ObjectGuid, spell_id: u32) -> Option<ObjectGuid> {
        self.state.lock().aura_casters.get(&(unit, spell_id)).copied()
    }

    fn remove_aura_by_cancel(&self, _unit: ObjectGuid, spell_id: u32) {
        self.log(format!("remove_aura_by_cancel({spell_id})"));
    }

    fn remove_pet_aura(&self, _pet: ObjectGuid, spell_id: u32) {
        self.log(format!("remove_pet_aura({spell_id})"));
    }

    fn totem_in_slot(&self, player: ObjectGuid, slot: u8) -> Option<TotemInfo> {
        self.state.lock().totems.get(&(player, slot)).copied()
    }

    fn unsummon_totem(&self, _totem: ObjectGuid) {
        self.log("unsummon_totem");
    }

    fn has_prevent_resurrection(&self, player: ObjectGuid) -> bool {
        self.state.lock().prevent_resurrection.contains(&player)
    }

    fn self_res_spell(&self, player: ObjectGuid) -> u32 {
        self.state.lock().self_res.get(&player).copied().unwrap_or(0)
    }

    fn clear_self_res_spell(&self, player: ObjectGuid) {
        self.log("clear_self_res_spell");
        self.state.lock().self_res.remove(&player);
    }

    fn cast_on(&self, _caster: ObjectGuid, _target: ObjectGuid, spell_id: u32, triggered: bool) {
        self.log(format!("cast_on({spell_id},{triggered})"));
    }

    fn cast_at(&self, _caster: ObjectGuid, _position: Position, spell_id: u32, triggered: bool) {
        self.log(format!("cast_at({spell_id},{triggered})"));
    }
}

/// Config with no sleeping and a short relocation poll limit.
pub fn fast_config() -> SessionConfig {
    SessionConfig {
        relocation_poll_interval: Duration::ZERO,
        relocation_poll_limit: 8,
        ..SessionConfig::default()
    }
}

pub struct Harness {
    pub world: MockWorld,
    pub ctx: Arc<SessionContext>,
    pub outbound: mpsc::UnboundedReceiver<OutboundPacket>,
    pub link: ConnectionLink,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(fast_config())
    }

    pub fn with_config(config: SessionConfig) -> Self {
        let world = MockWorld::new();
        let ctx = Arc::new(SessionContext::new(
            Arc::new(standard_table()),
            world.services(),
            config,
        ));
        let (link, outbound) = ConnectionLink::pair();
        Self {
            world,
            ctx,
            outbound,
            link,
        }
    }

    pub fn session(&self, account_id: u32) -> Session {
        let account = AccountInfo {
            id: account_id,
            address: "127.0.0.1".into(),
            ..AccountInfo::default()
        };
        Session::new(account, self.link.clone(), Arc::clone(&self.ctx))
    }

    /// A session with `actor` loaded and resident.
    pub fn in_world(&mut self, account_id: u32, actor: ObjectGuid) -> Session {
        self.world.spawn_player(actor);
        let mut session = self.session(account_id);
        session.login_player(actor).unwrap();
        self.drain();
        session
    }

    /// Everything sent so far.
    pub fn drain(&mut self) -> Vec<OutboundPacket> {
        let mut sent = Vec::new();
        while let Ok(packet) = self.outbound.try_recv() {
            sent.push(packet);
        }
        sent
    }
}

pub fn command(opcode: realm_session::core::command::Opcode, build: impl FnOnce(&mut CommandBuffer)) -> Command {
    let mut payload = CommandBuffer::new();
    build(&mut payload);
    Command::new(opcode, payload)
}

/// One region-tick pass over `session`.
pub fn tick(session: &mut Session) -> bool {
    let pass = realm_session::protocol::filter::SimulationFilter::new(session.residency());
    session.process_queued(&pass)
}
