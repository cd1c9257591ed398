//! # Logout Teardown
//!
//! Logout runs as an ordered list of [`LogoutStep`]s over a shared
//! [`LogoutContext`]. Steps never abort the pipeline: a step whose
//! precondition is missing reports [`StepOutcome::Skipped`], a step whose
//! collaborator fails reports [`StepOutcome::Failed`], and the next step runs
//! regardless. The caller gets a [`LogoutReport`] naming every step.
//!
//! The standard order:
//!
//! ```text
//! AwaitRelocation -> PinRegion -> ReleaseLoot -> ResolveTerminalPresentation
//! -> BattlegroundLogout -> InvalidInstanceHomebind -> AwaitRelocation
//! -> LeaveMatchmaking -> ResetAccountOnline -> GuildSignOff -> DismissCompanions
//! -> InterruptCasts -> PersistActor -> LeaveChannels -> LeaveGroup
//! -> BroadcastOffline -> DetachActor -> AcknowledgeLogout -> PersistOfflineFlag
//! ```

use crate::config::SessionConfig;
use crate::core::command::OutboundPacket;
use crate::core::guid::ObjectGuid;
use crate::protocol::opcodes;
use crate::utils::metrics::Timer;
use crate::world::storage::{sql, Database, SqlValue, Statement};
use crate::world::{Region, WorldServices};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// State threaded through the steps of one teardown.
pub struct LogoutContext<'a> {
    pub services: &'a WorldServices,
    pub config: &'a SessionConfig,
    pub account_id: u32,
    pub actor: ObjectGuid,
    pub persist: bool,
    /// Region pinned for the rest of teardown.
    pub region: Option<Arc<dyn Region>>,
    /// Packets for the client, sent once the pipeline finishes.
    pub outbound: Vec<OutboundPacket>,
}

impl<'a> LogoutContext<'a> {
    pub fn new(
        services: &'a WorldServices,
        config: &'a SessionConfig,
        account_id: u32,
        actor: ObjectGuid,
        persist: bool,
    ) -> Self {
        Self {
            services,
            config,
            account_id,
            actor,
            persist,
            region: None,
            outbound: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Done,
    Skipped(&'static str),
    Failed(String),
}

impl StepOutcome {
    pub fn is_done(&self) -> bool {
        matches!(self, StepOutcome::Done)
    }
}

pub trait LogoutStep: Send + Sync {
    fn name(&self) -> &'static str;
    fn run(&self, cx: &mut LogoutContext<'_>) -> StepOutcome;
}

/// Outcome of every step, in execution order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogoutReport {
    entries: Vec<(&'static str, StepOutcome)>,
}

impl LogoutReport {
    pub fn entries(&self) -> &[(&'static str, StepOutcome)] {
        &self.entries
    }

    /// First outcome recorded for `step`.
    pub fn outcome(&self, step: &str) -> Option<&StepOutcome> {
        self.entries
            .iter()
            .find(|(name, _)| *name == step)
            .map(|(_, outcome)| outcome)
    }

    pub fn failures(&self) -> impl Iterator<Item = &(&'static str, StepOutcome)> {
        self.entries
            .iter()
            .filter(|(_, o)| matches!(o, StepOutcome::Failed(_)))
    }
}

impl fmt::Display for LogoutReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let done = self.entries.iter().filter(|(_, o)| o.is_done()).count();
        write!(f, "{done}/{} steps done", self.entries.len())
    }
}

pub struct LogoutPipeline {
    steps: Vec<Box<dyn LogoutStep>>,
}

impl LogoutPipeline {
    pub fn new(steps: Vec<Box<dyn LogoutStep>>) -> Self {
        Self { steps }
    }

    pub fn standard() -> Self {
        Self::new(vec![
            Box::new(AwaitRelocation),
            Box::new(PinRegion),
            Box::new(ReleaseLoot),
            Box::new(ResolveTerminalPresentation),
            Box::new(BattlegroundLogout),
            Box::new(InvalidInstanceHomebind),
            Box::new(AwaitRelocation),
            Box::new(LeaveMatchmaking),
            Box::new(ResetAccountOnline),
            Box::new(GuildSignOff),
            Box::new(DismissCompanions),
            Box::new(InterruptCasts),
            Box::new(PersistActor),
            Box::new(LeaveChannels),
            Box::new(LeaveGroup),
            Box::new(BroadcastOffline),
            Box::new(DetachActor),
            Box::new(AcknowledgeLogout),
            Box::new(PersistOfflineFlag),
        ])
    }

    /// Drop every step called `name`.
    pub fn without(mut self, name: &str) -> Self {
        self.steps.retain(|s| s.name() != name);
        self
    }

    pub fn step_names(&self) -> Vec<&'static str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    pub fn run(&self, cx: &mut LogoutContext<'_>) -> LogoutReport {
        let _timer = Timer::start("logout");
        let mut report = LogoutReport::default();
        for step in &self.steps {
            let outcome = step.run(cx);
            match &outcome {
                StepOutcome::Done => debug!(step = step.name(), actor = %cx.actor, "Logout step done"),
                StepOutcome::Skipped(reason) => {
                    debug!(step = step.name(), actor = %cx.actor, reason, "Logout step skipped")
                }
                StepOutcome::Failed(reason) => {
                    warn!(step = step.name(), actor = %cx.actor, %reason, "Logout step failed")
                }
            }
            report.entries.push((step.name(), outcome));
        }
        info!(account = cx.account_id, actor = %cx.actor, %report, "Logout teardown finished");
        report
    }
}

impl Default for LogoutPipeline {
    fn default() -> Self {
        Self::standard()
    }
}

impl fmt::Debug for LogoutPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.step_names()).finish()
    }
}

/// Poll until an in-flight far relocation settles, acknowledging it on every poll.
pub struct AwaitRelocation;

impl LogoutStep for AwaitRelocation {
    fn name(&self) -> &'static str {
        "AwaitRelocation"
    }

    fn run(&self, cx: &mut LogoutContext<'_>) -> StepOutcome {
        let actors = &cx.services.actors;
        if !actors.is_being_teleported_far(cx.actor) {
            return StepOutcome::Skipped("no relocation in flight");
        }
        for _ in 0..cx.config.relocation_poll_limit {
            actors.acknowledge_relocation(cx.actor);
            if !actors.is_being_teleported_far(cx.actor) {
                return StepOutcome::Done;
            }
            std::thread::sleep(cx.config.relocation_poll_interval);
        }
        StepOutcome::Failed(format!(
            "relocation still pending after {} polls",
            cx.config.relocation_poll_limit
        ))
    }
}

pub struct PinRegion;

impl LogoutStep for PinRegion {
    fn name(&self) -> &'static str {
        "PinRegion"
    }

    fn run(&self, cx: &mut LogoutContext<'_>) -> StepOutcome {
        cx.region = cx.services.actors.region_of(cx.actor);
        match cx.region {
            Some(_) => StepOutcome::Done,
            None => StepOutcome::Skipped("actor has no region"),
        }
    }
}

pub struct ReleaseLoot;

impl LogoutStep for ReleaseLoot {
    fn name(&self) -> &'static str {
        "ReleaseLoot"
    }

    fn run(&self, cx: &mut LogoutContext<'_>) -> StepOutcome {
        match cx.services.actors.loot_in_progress(cx.actor) {
            Some(loot) => {
                cx.services.actors.release_loot(cx.actor, loot);
                StepOutcome::Done
            }
            None => StepOutcome::Skipped("no loot open"),
        }
    }
}

/// Settle how the actor is left in the world: ghost, combat death,
/// redemption death or pending bind. At most one applies.
pub struct ResolveTerminalPresentation;

impl ResolveTerminalPresentation {
    /// Players credited for a combat logout: the owning player of each
    /// attacker, or the attacker itself when it is an unowned player.
    fn credited_players(region: &dyn Region, victim: ObjectGuid) -> Vec<ObjectGuid> {
        let mut credited = Vec::new();
        for attacker in region.attackers_of(victim) {
            let Some(unit) = region.unit(attacker) else {
                continue;
            };
            let candidate = match unit.owner {
                Some(owner) => owner.is_player().then_some(owner),
                None => unit.is_player().then_some(unit.guid),
            };
            if let Some(player) = candidate {
                if !credited.contains(&player) {
                    credited.push(player);
                }
            }
        }
        credited
    }
}

impl LogoutStep for ResolveTerminalPresentation {
    fn name(&self) -> &'static str {
        "ResolveTerminalPresentation"
    }

    fn run(&self, cx: &mut LogoutContext<'_>) -> StepOutcome {
        let actors = &cx.services.actors;
        let actor = cx.actor;

        if actors.death_timer_active(actor) {
            actors.present_as_ghost(actor);
            return StepOutcome::Done;
        }

        if let Some(region) = cx.region.as_deref().filter(|_| actors.in_combat(actor)) {
            let credited = Self::credited_players(region, actor);
            actors.resolve_combat_death(actor, !credited.is_empty());
            for attacker in &credited {
                actors.reward_honor(*attacker, actor, credited.len());
            }
            if let Some(first) = credited.first() {
                cx.services.community.battleground_kill_credit(actor, *first);
            }
            return StepOutcome::Done;
        }

        if actors.has_redemption_aura(actor) {
            actors.resolve_redemption_death(actor);
            return StepOutcome::Done;
        }

        if actors.has_pending_bind(actor) {
            actors.resolve_pending_bind(actor);
            return StepOutcome::Done;
        }

        StepOutcome::Skipped("nothing to resolve")
    }
}

pub struct BattlegroundLogout;

impl LogoutStep for BattlegroundLogout {
    fn name(&self) -> &'static str {
        "BattlegroundLogout"
    }

    fn run(&self, cx: &mut LogoutContext<'_>) -> StepOutcome {
        if cx.services.community.battleground_logout(cx.actor) {
            StepOutcome::Done
        } else {
            StepOutcome::Skipped("not in a battleground")
        }
    }
}

pub struct InvalidInstanceHomebind;

impl LogoutStep for InvalidInstanceHomebind {
    fn name(&self) -> &'static str {
        "InvalidInstanceHomebind"
    }

    fn run(&self, cx: &mut LogoutContext<'_>) -> StepOutcome {
        let actors = &cx.services.actors;
        if actors.instance_valid(cx.actor) || actors.is_game_master(cx.actor) {
            return StepOutcome::Skipped("instance valid");
        }
        actors.teleport_to_homebind(cx.actor);
        StepOutcome::Done
    }
}

pub struct LeaveMatchmaking;

impl LogoutStep for LeaveMatchmaking {
    fn name(&self) -> &'static str {
        "LeaveMatchmaking"
    }

    fn run(&self, cx: &mut LogoutContext<'_>) -> StepOutcome {
        let community = &cx.services.community;
        let queues = community.leave_battleground_queues(cx.actor);
        community.leave_matchmaking(cx.actor);
        debug!(actor = %cx.actor, queues, "Left matchmaking");
        StepOutcome::Done
    }
}

pub struct ResetAccountOnline;

impl LogoutStep for ResetAccountOnline {
    fn name(&self) -> &'static str {
        "ResetAccountOnline"
    }

    fn run(&self, cx: &mut LogoutContext<'_>) -> StepOutcome {
        let stmt = Statement::new(sql::RESET_ACTIVE_REALM)
            .bind(SqlValue::U32(0))
            .bind(SqlValue::U32(cx.account_id));
        match cx.services.persistence.execute(Database::Login, stmt) {
            Ok(()) => StepOutcome::Done,
            Err(e) => StepOutcome::Failed(e.to_string()),
        }
    }
}

pub struct GuildSignOff;

impl LogoutStep for GuildSignOff {
    fn name(&self) -> &'static str {
        "GuildSignOff"
    }

    fn run(&self, cx: &mut LogoutContext<'_>) -> StepOutcome {
        let community = &cx.services.community;
        match community.guild_of(cx.actor) {
            Some(guild) => {
                community.guild_member_logout(guild, cx.actor);
                StepOutcome::Done
            }
            None => StepOutcome::Skipped("not in a guild"),
        }
    }
}

/// Pet first, then vehicle.
pub struct DismissCompanions;

impl LogoutStep for DismissCompanions {
    fn name(&self) -> &'static str {
        "DismissCompanions"
    }

    fn run(&self, cx: &mut LogoutContext<'_>) -> StepOutcome {
        let actors = &cx.services.actors;
        actors.remove_pet(cx.actor);
        if actors.vehicle_of(cx.actor).is_some() {
            actors.exit_vehicle(cx.actor);
        }
        StepOutcome::Done
    }
}

pub struct InterruptCasts;

impl LogoutStep for InterruptCasts {
    fn name(&self) -> &'static str {
        "InterruptCasts"
    }

    fn run(&self, cx: &mut LogoutContext<'_>) -> StepOutcome {
        cx.services.casts.interrupt_non_melee(cx.actor, None);
        StepOutcome::Done
    }
}

pub struct PersistActor;

impl LogoutStep for PersistActor {
    fn name(&self) -> &'static str {
        "PersistActor"
    }

    fn run(&self, cx: &mut LogoutContext<'_>) -> StepOutcome {
        if !cx.persist {
            return StepOutcome::Skipped("save not requested");
        }
        match cx.services.actors.save_to_storage(cx.actor) {
            Ok(()) => StepOutcome::Done,
            Err(e) => StepOutcome::Failed(e.to_string()),
        }
    }
}

pub struct LeaveChannels;

impl LogoutStep for LeaveChannels {
    fn name(&self) -> &'static str {
        "LeaveChannels"
    }

    fn run(&self, cx: &mut LogoutContext<'_>) -> StepOutcome {
        cx.services.community.leave_channels(cx.actor);
        StepOutcome::Done
    }
}

pub struct LeaveGroup;

impl LogoutStep for LeaveGroup {
    fn name(&self) -> &'static str {
        "LeaveGroup"
    }

    fn run(&self, cx: &mut LogoutContext<'_>) -> StepOutcome {
        let community = &cx.services.community;
        match community.group_of(cx.actor) {
            Some(group) => {
                community.group_member_logout(group, cx.actor);
                StepOutcome::Done
            }
            None => StepOutcome::Skipped("not in a group"),
        }
    }
}

pub struct BroadcastOffline;

impl LogoutStep for BroadcastOffline {
    fn name(&self) -> &'static str {
        "BroadcastOffline"
    }

    fn run(&self, cx: &mut LogoutContext<'_>) -> StepOutcome {
        cx.services.community.broadcast_offline(cx.actor);
        StepOutcome::Done
    }
}

/// Graceful region removal when resident, deallocation otherwise.
pub struct DetachActor;

impl LogoutStep for DetachActor {
    fn name(&self) -> &'static str {
        "DetachActor"
    }

    fn run(&self, cx: &mut LogoutContext<'_>) -> StepOutcome {
        let actors = &cx.services.actors;
        match cx.region.as_deref() {
            Some(region) if actors.is_in_world(cx.actor) => region.remove_actor(cx.actor),
            Some(region) => {
                actors.cleanup_before_delete(cx.actor);
                region.delete_from_world(cx.actor);
            }
            None => {
                actors.cleanup_before_delete(cx.actor);
                actors.discard(cx.actor);
            }
        }
        StepOutcome::Done
    }
}

pub struct AcknowledgeLogout;

impl LogoutStep for AcknowledgeLogout {
    fn name(&self) -> &'static str {
        "AcknowledgeLogout"
    }

    fn run(&self, cx: &mut LogoutContext<'_>) -> StepOutcome {
        cx.outbound
            .push(OutboundPacket::empty(opcodes::SMSG_LOGOUT_COMPLETE));
        StepOutcome::Done
    }
}

pub struct PersistOfflineFlag;

impl LogoutStep for PersistOfflineFlag {
    fn name(&self) -> &'static str {
        "PersistOfflineFlag"
    }

    fn run(&self, cx: &mut LogoutContext<'_>) -> StepOutcome {
        let stmt =
            Statement::new(sql::SET_CHARACTER_OFFLINE).bind(SqlValue::U32(cx.actor.counter()));
        match cx.services.persistence.execute(Database::Character, stmt) {
            Ok(()) => StepOutcome::Done,
            Err(e) => StepOutcome::Failed(e.to_string()),
        }
    }
}
