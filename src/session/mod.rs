//! # Sessions
//!
//! One [`Session`] per authenticated connection. The network side pushes
//! decoded commands into the session's [`CommandInbox`]; two passes drain it:
//!
//! - the session thread calls [`Session::update`] (or
//!   [`Session::process_queued`] with a [`SessionFilter`]), which also
//!   services delayed logouts and connection loss;
//! - the region tick calls [`Session::process_queued`] with a
//!   [`SimulationFilter`] while the actor is resident.
//!
//! Every drained command passes the status gate, then runs its handler
//! between the deferred-relocation brackets. Handler errors are handled here
//! by class (see [`ErrorClass`]).

pub mod account;
pub mod addons;
pub mod logout;
pub mod state;

use crate::config::SessionConfig;
use crate::core::buffer::CommandBuffer;
use crate::core::command::{Command, Opcode, OutboundPacket};
use crate::core::guid::ObjectGuid;
use crate::error::{constants, ErrorClass, Result, SessionError};
use crate::protocol::dispatcher::{admit, GateRefusal, GateSnapshot, OpcodeDescriptor, OpcodeTable, RequiredStatus};
use crate::protocol::filter::{CommandFilter, ResidencySnapshot, SessionFilter, SimulationFilter};
use crate::protocol::opcodes;
use crate::protocol::queue::{CommandInbox, CommandQueue};
use crate::utils::metrics::SessionMetrics;
use crate::world::storage::{sql, Database, SqlValue, Statement};
use crate::world::WorldServices;
use account::{AccountDataStore, Tutorials, GLOBAL_CACHE_MASK, PER_CHARACTER_CACHE_MASK};
use addons::AddonRecord;
use logout::{LogoutContext, LogoutPipeline, LogoutReport};
pub use state::SessionState;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use tokio::sync::{mpsc, Notify};
use tracing::{debug, error, info, warn};

/// Auth response codes used by the admission queue.
pub const AUTH_OK: u8 = 0x0C;
pub const AUTH_WAIT_QUEUE: u8 = 0x1B;

/// Logout response reasons.
pub const LOGOUT_OK: u32 = 0;
pub const LOGOUT_IN_COMBAT: u32 = 1;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountInfo {
    pub id: u32,
    pub security: u8,
    pub locale: u8,
    pub address: String,
    /// Unix time until which chat is muted, 0 for none.
    pub mute_until: u64,
}

/// Outbound half of a connection as the session sees it.
///
/// Clones share one closed flag; closing any clone wakes the transport pump.
#[derive(Debug, Clone)]
pub struct ConnectionLink {
    outbound: mpsc::UnboundedSender<OutboundPacket>,
    closed: Arc<AtomicBool>,
    wake: Arc<Notify>,
}

impl ConnectionLink {
    /// A link plus the receiver the transport drains.
    pub fn pair() -> (Self, mpsc::UnboundedReceiver<OutboundPacket>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                outbound: tx,
                closed: Arc::new(AtomicBool::new(false)),
                wake: Arc::new(Notify::new()),
            },
            rx,
        )
    }

    pub fn send(&self, packet: OutboundPacket) -> Result<()> {
        if self.is_closed() {
            return Err(SessionError::ConnectionClosed);
        }
        self.outbound
            .send(packet)
            .map_err(|_| SessionError::ConnectionClosed)
    }

    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            self.wake.notify_one();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire) || self.outbound.is_closed()
    }

    /// Resolves once [`close`](Self::close) has been called on any clone.
    pub async fn closed(&self) {
        loop {
            let notified = self.wake.notified();
            if self.closed.load(Ordering::Acquire) {
                return;
            }
            notified.await;
        }
    }
}

/// Read-only collaborators shared by every session of an engine.
#[derive(Debug)]
pub struct SessionContext {
    pub table: Arc<OpcodeTable>,
    pub services: WorldServices,
    pub config: SessionConfig,
    pub metrics: Arc<SessionMetrics>,
    pub logout: LogoutPipeline,
}

impl SessionContext {
    pub fn new(table: Arc<OpcodeTable>, services: WorldServices, config: SessionConfig) -> Self {
        Self {
            table,
            services,
            config,
            metrics: Arc::new(SessionMetrics::new()),
            logout: LogoutPipeline::standard(),
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<SessionMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn with_logout_pipeline(mut self, pipeline: LogoutPipeline) -> Self {
        self.logout = pipeline;
        self
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

pub struct Session {
    account: AccountInfo,
    state: SessionState,
    actor: Option<ObjectGuid>,
    last_character: Option<ObjectGuid>,
    player_loading: bool,
    logout_in_progress: bool,
    recently_logged_out: Option<Instant>,
    logout_requested_at: Option<Instant>,
    inbox: CommandInbox,
    link: Option<ConnectionLink>,
    account_data: AccountDataStore,
    tutorials: Tutorials,
    addons: Vec<AddonRecord>,
    ctx: Arc<SessionContext>,
}

impl Session {
    pub fn new(account: AccountInfo, link: ConnectionLink, ctx: Arc<SessionContext>) -> Self {
        ctx.metrics.session_opened();
        info!(account = account.id, address = %account.address, "Session opened");
        Self {
            account,
            state: SessionState::Authenticating,
            actor: None,
            last_character: None,
            player_loading: false,
            logout_in_progress: false,
            recently_logged_out: None,
            logout_requested_at: None,
            inbox: Arc::new(CommandQueue::new()),
            link: Some(link),
            account_data: AccountDataStore::default(),
            tutorials: Tutorials::default(),
            addons: Vec::new(),
            ctx,
        }
    }

    // --- status queries ---------------------------------------------------

    pub fn account(&self) -> &AccountInfo {
        &self.account
    }

    pub fn account_id(&self) -> u32 {
        self.account.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn actor(&self) -> Option<ObjectGuid> {
        self.actor
    }

    pub fn last_character(&self) -> Option<ObjectGuid> {
        self.last_character
    }

    pub fn context(&self) -> Arc<SessionContext> {
        Arc::clone(&self.ctx)
    }

    pub fn services(&self) -> &WorldServices {
        &self.ctx.services
    }

    pub fn inbox(&self) -> CommandInbox {
        Arc::clone(&self.inbox)
    }

    pub fn is_connected(&self) -> bool {
        self.link.as_ref().is_some_and(|l| !l.is_closed())
    }

    pub fn is_logging_out(&self) -> bool {
        self.logout_in_progress
    }

    pub fn is_player_loading(&self) -> bool {
        self.player_loading
    }

    pub fn is_logout_requested(&self) -> bool {
        self.logout_requested_at.is_some()
    }

    /// Inside the grace window that follows a completed logout.
    pub fn is_recently_logged_out(&self) -> bool {
        self.recently_logged_out
            .is_some_and(|at| at.elapsed() < self.ctx.config.recently_logged_out_grace)
    }

    pub fn residency(&self) -> ResidencySnapshot {
        match self.actor {
            Some(actor) => ResidencySnapshot {
                logged_in: true,
                in_region: self.ctx.services.actors.is_in_world(actor),
            },
            None => ResidencySnapshot::default(),
        }
    }

    pub fn account_data(&self) -> &AccountDataStore {
        &self.account_data
    }

    pub fn tutorials(&self) -> &Tutorials {
        &self.tutorials
    }

    pub fn tutorials_mut(&mut self) -> &mut Tutorials {
        &mut self.tutorials
    }

    pub fn addons(&self) -> &[AddonRecord] {
        &self.addons
    }

    /// The attached actor, or a state violation.
    pub fn require_actor(&self) -> Result<ObjectGuid> {
        self.actor
            .ok_or(SessionError::StateViolation(constants::ERR_NO_ACTOR))
    }

    fn gate_snapshot(&self) -> GateSnapshot {
        let residency = self.residency();
        GateSnapshot {
            has_actor: residency.logged_in,
            actor_resident: residency.resident(),
            recently_logged_out: self.is_recently_logged_out(),
            admission_queued: self.state == SessionState::Queued,
        }
    }

    // --- queue processing -------------------------------------------------

    /// Push a decoded command. Dropped if the session is closed.
    pub fn enqueue(&self, command: Command) {
        if self.state.is_closed() {
            return;
        }
        self.ctx.metrics.command_received();
        self.inbox.push(command);
    }

    /// Dispatch, oldest first, the commands `filter` accepts. Eligibility is
    /// re-checked against live residency before each command, so a handler
    /// that moves the actor in or out of its region hands the rest of the
    /// queue to the other pass. Returns `false` once the session should be
    /// removed.
    pub fn process_queued<F: CommandFilter>(&mut self, filter: &F) -> bool {
        let ctx = Arc::clone(&self.ctx);
        // commands pushed while this pass runs wait for the next one
        let mut budget = self.inbox.len();
        while budget > 0 && self.is_connected() {
            let live = filter.refreshed(self.residency());
            let Some(mut command) = self
                .inbox
                .pop_next(|c| live.accepts(ctx.table.affinity_of(c.opcode())))
            else {
                break;
            };
            budget -= 1;
            self.dispatch(&mut command);
        }

        if self.link.as_ref().is_some_and(ConnectionLink::is_closed) {
            debug!(account = self.account.id, "Connection closed");
            self.link = None;
        }

        if filter.processes_logout() {
            if self.link.is_none() || (self.should_log_out(Instant::now()) && !self.player_loading) {
                self.begin_logout(true);
            }
            if self.link.is_none() {
                self.close();
                return false;
            }
        }
        true
    }

    /// Session-thread tick. Runs the session pass and, while no region tick
    /// will drain this session, the simulation pass as well.
    pub fn update(&mut self) -> bool {
        let alive = self.process_queued(&SessionFilter::new(self.residency()));
        if alive && !self.residency().resident() {
            self.process_queued(&SimulationFilter::new(self.residency()));
        }
        alive
    }

    fn dispatch(&mut self, command: &mut Command) {
        let ctx = Arc::clone(&self.ctx);
        let opcode = command.opcode();
        let Some(descriptor) = ctx.table.get(opcode) else {
            ctx.metrics.unknown_reference();
            warn!(account = self.account.id, %opcode, "Unknown opcode");
            return;
        };

        match admit(descriptor.status, self.gate_snapshot()) {
            Ok(()) => {
                if descriptor.status == RequiredStatus::Authenticated
                    && opcode != opcodes::CMSG_SET_ACTIVE_VOICE_CHANNEL
                {
                    self.recently_logged_out = None;
                }
                self.execute(descriptor, command);
            }
            Err(refusal) => {
                ctx.metrics.gate_drop();
                self.log_refusal(descriptor, opcode, refusal);
            }
        }
    }

    fn log_refusal(&self, descriptor: &OpcodeDescriptor, opcode: Opcode, refusal: GateRefusal) {
        let account = self.account.id;
        let name = descriptor.name;
        match refusal {
            r if r.is_expected() => debug!(account, name, %opcode, ?r, "Command dropped"),
            GateRefusal::NeverAllowed | GateRefusal::ServerOnly => {
                error!(account, name, %opcode, ?refusal, "Command not allowed from client")
            }
            _ => warn!(account, name, %opcode, ?refusal, "Unexpected command for session state"),
        }
    }

    fn execute(&mut self, descriptor: &OpcodeDescriptor, command: &mut Command) {
        let ctx = Arc::clone(&self.ctx);
        let actors = &ctx.services.actors;

        if let Some(actor) = self.actor {
            actors.set_teleport_deferrable(actor, true);
        }

        let result = descriptor.invoke(self, command);
        ctx.metrics.command_dispatched();

        if let Some(actor) = self.actor {
            actors.set_teleport_deferrable(actor, false);
            if actors.flush_deferred_relocation(actor) {
                debug!(%actor, "Deferred relocation executed");
            }
        }

        match result {
            Ok(()) => {
                if ctx.config.log_unprocessed_tail && command.payload.remaining() > 0 {
                    debug!(
                        name = descriptor.name,
                        opcode = %command.opcode(),
                        rpos = command.payload.rpos(),
                        len = command.payload.len(),
                        "Command has unprocessed tail data"
                    );
                }
            }
            Err(err) => self.handle_error(descriptor.name, command, err),
        }
    }

    fn handle_error(&mut self, name: &'static str, command: &Command, err: SessionError) {
        let metrics = Arc::clone(&self.ctx.metrics);
        let account = self.account.id;
        let opcode = command.opcode();

        match err.class() {
            ErrorClass::ProtocolViolation => {
                metrics.protocol_violation();
                error!(account, name, %opcode, error = %err, "Malformed command");
                debug!(bytes = ?command.payload.as_slice(), "Offending payload");
                if self.ctx.config.kick_on_malformed_command {
                    info!(account, address = %self.account.address, "Disconnecting for malformed command");
                    self.kick();
                }
            }
            ErrorClass::ValidationRejection => {
                metrics.rejection();
                match err {
                    SessionError::Rejected(rejection) => {
                        debug!(account, name, ?rejection, "Action rejected");
                        for packet in rejection.packets() {
                            self.send(packet);
                        }
                    }
                    SessionError::CheatSuspected { actor, spell_id } => {
                        error!(account, %actor, spell_id, "Cast of a spell the actor does not have");
                    }
                    other => debug!(account, name, error = %other, "Action vetoed"),
                }
            }
            ErrorClass::UnknownReference => {
                metrics.unknown_reference();
                warn!(account, name, error = %err, "Command referenced an unknown id");
            }
            ErrorClass::StateViolation => {
                debug!(account, name, error = %err, "Command ignored in current state");
            }
            ErrorClass::SubsystemAbsent => {
                warn!(account, name, error = %err, "Command needs an absent subsystem");
            }
            ErrorClass::Infrastructure => {
                error!(account, name, error = %err, "Command failed");
            }
        }
    }

    // --- outbound ---------------------------------------------------------

    /// Queue a packet for the client. Dropped silently without a connection.
    pub fn send(&self, packet: OutboundPacket) {
        let Some(link) = &self.link else {
            return;
        };
        if link.send(packet).is_err() {
            link.close();
        }
    }

    pub fn send_notification(&self, text: &str) {
        let mut body = CommandBuffer::with_capacity(text.len() + 1);
        body.write_cstring(text);
        self.send(OutboundPacket::new(opcodes::SMSG_NOTIFICATION, body));
    }

    /// Close the connection. Pending commands are dropped; the session
    /// notices on its next session pass.
    pub fn kick(&mut self) {
        if let Some(link) = &self.link {
            link.close();
        }
        let dropped = self.inbox.clear();
        if dropped > 0 {
            debug!(account = self.account.id, dropped, "Dropped queued commands on kick");
        }
    }

    fn close(&mut self) {
        if !self.state.is_closed() {
            if let Err(e) = self.state.transition(SessionState::Closed) {
                debug!(error = %e, "Close transition refused");
            }
        }
        let dropped = self.inbox.clear();
        info!(account = self.account.id, dropped, "Session closed");
    }

    // --- admission and login ----------------------------------------------

    /// Report the admission queue position; 0 admits the session.
    pub fn set_queue_position(&mut self, position: u32) -> Result<()> {
        let mut body = CommandBuffer::with_capacity(6);
        if position == 0 {
            if self.state == SessionState::Queued {
                self.state.transition(SessionState::Authenticating)?;
            }
            body.write_u8(AUTH_OK);
        } else {
            if self.state != SessionState::Queued {
                self.state.transition(SessionState::Queued)?;
            }
            body.write_u8(AUTH_WAIT_QUEUE).write_u32(position).write_u8(0);
        }
        self.send(OutboundPacket::new(opcodes::SMSG_AUTH_RESPONSE, body));
        Ok(())
    }

    /// Attach a loaded actor and enter the world.
    pub fn attach_actor(&mut self, actor: ObjectGuid) -> Result<()> {
        if self.actor.is_some() {
            return Err(SessionError::StateViolation(constants::ERR_ACTOR_ATTACHED));
        }
        self.state.transition(SessionState::InWorld)?;
        self.actor = Some(actor);
        self.last_character = Some(actor);
        self.recently_logged_out = None;
        info!(account = self.account.id, %actor, "Actor attached");
        Ok(())
    }

    /// Load `character` through the actor runtime and attach it.
    pub fn login_player(&mut self, character: ObjectGuid) -> Result<()> {
        if self.actor.is_some() || self.state != SessionState::Authenticating {
            return Err(SessionError::StateViolation("login while not at character select"));
        }
        // nothing is loaded or attached if the settings cannot be read
        self.load_character_account_data(character)?;

        self.player_loading = true;
        let loaded = self
            .ctx
            .services
            .actors
            .load_player(self.account.id, character);
        self.player_loading = false;
        loaded?;

        self.attach_actor(character)?;
        self.send(
            self.account_data
                .times_packet(unix_now() as u32, PER_CHARACTER_CACHE_MASK),
        );
        Ok(())
    }

    // --- logout -----------------------------------------------------------

    pub fn request_logout(&mut self, at: Instant) {
        self.logout_requested_at = Some(at);
    }

    pub fn cancel_logout(&mut self) {
        self.logout_requested_at = None;
    }

    pub fn should_log_out(&self, now: Instant) -> bool {
        self.logout_requested_at
            .is_some_and(|at| now.saturating_duration_since(at) >= self.ctx.config.logout_delay)
    }

    /// Reply to a client logout request: refused in combat, immediate when
    /// the actor may leave instantly, otherwise delayed.
    pub fn handle_logout_request(&mut self) -> Result<()> {
        let actor = self.require_actor()?;
        let actors = &self.ctx.services.actors;

        let (reason, instant) = if actors.in_combat(actor) {
            (LOGOUT_IN_COMBAT, false)
        } else if actors.can_logout_instantly(actor) {
            (LOGOUT_OK, true)
        } else {
            (LOGOUT_OK, false)
        };

        let mut body = CommandBuffer::with_capacity(5);
        body.write_u32(reason).write_u8(instant as u8);
        self.send(OutboundPacket::new(opcodes::SMSG_LOGOUT_RESPONSE, body));

        if reason != LOGOUT_OK {
            return Ok(());
        }
        if instant {
            self.begin_logout(true);
        } else {
            self.request_logout(Instant::now());
        }
        Ok(())
    }

    /// Tear the actor down. No-op while a teardown runs, without an actor,
    /// or once closed.
    pub fn begin_logout(&mut self, persist: bool) -> Option<LogoutReport> {
        if self.logout_in_progress || self.state.is_closed() {
            return None;
        }
        let Some(actor) = self.actor else {
            self.logout_requested_at = None;
            return None;
        };

        self.logout_in_progress = true;
        if let Err(e) = self.state.transition(SessionState::LoggingOut) {
            debug!(error = %e, "Logout from unexpected state");
        }
        info!(account = self.account.id, address = %self.account.address, %actor, "Logout character");

        let ctx = Arc::clone(&self.ctx);
        let mut cx = LogoutContext::new(&ctx.services, &ctx.config, self.account.id, actor, persist);
        let report = ctx.logout.run(&mut cx);
        for packet in cx.outbound.drain(..) {
            self.send(packet);
        }

        self.actor = None;
        if persist {
            if let Err(e) = self.save_tutorials() {
                warn!(account = self.account.id, error = %e, "Failed to save tutorials");
            }
        }
        self.logout_in_progress = false;
        self.recently_logged_out = Some(Instant::now());
        self.logout_requested_at = None;

        let next = if self.is_connected() {
            SessionState::Authenticating
        } else {
            SessionState::Closed
        };
        if let Err(e) = self.state.transition(next) {
            debug!(error = %e, "Post-logout transition refused");
        }
        ctx.metrics.logout_completed();
        Some(report)
    }

    // --- account data and tutorials ---------------------------------------

    pub fn load_global_account_data(&mut self) -> Result<()> {
        let rows = self.ctx.services.persistence.query(
            Database::Character,
            Statement::new(sql::LOAD_ACCOUNT_DATA).bind(SqlValue::U32(self.account.id)),
        )?;
        self.account_data.load(&rows, GLOBAL_CACHE_MASK);
        Ok(())
    }

    pub fn load_character_account_data(&mut self, character: ObjectGuid) -> Result<()> {
        let rows = self.ctx.services.persistence.query(
            Database::Character,
            Statement::new(sql::LOAD_CHARACTER_ACCOUNT_DATA).bind(SqlValue::U32(character.counter())),
        )?;
        self.account_data.load(&rows, PER_CHARACTER_CACHE_MASK);
        Ok(())
    }

    /// Store one slot. Per-character slots need a character to key on and
    /// are ignored before the first login.
    pub fn set_account_data(&mut self, kind: usize, time: u64, data: String) -> Result<()> {
        let owner = if account::is_global(kind) {
            self.account.id
        } else {
            match self.last_character {
                Some(character) => character.counter(),
                None => return Ok(()),
            }
        };
        let statements = account::replace_statements(kind, owner, time, &data);
        self.ctx
            .services
            .persistence
            .transaction(Database::Character, statements)?;
        self.account_data.set(kind, time, data);
        Ok(())
    }

    pub fn send_account_data_times(&self, mask: u32) {
        self.send(self.account_data.times_packet(unix_now() as u32, mask));
    }

    pub fn load_tutorials(&mut self) -> Result<()> {
        let rows = self.ctx.services.persistence.query(
            Database::Character,
            Statement::new(sql::LOAD_TUTORIALS).bind(SqlValue::U32(self.account.id)),
        )?;
        self.tutorials = Tutorials::from_rows(&rows);
        Ok(())
    }

    pub fn send_tutorials(&self) {
        self.send(self.tutorials.flags_packet());
    }

    pub fn save_tutorials(&mut self) -> Result<()> {
        if let Some(stmt) = self.tutorials.save_statement(self.account.id) {
            self.ctx
                .services
                .persistence
                .execute(Database::Character, stmt)?;
        }
        self.tutorials.mark_saved();
        Ok(())
    }

    // --- addons -----------------------------------------------------------

    pub fn read_addon_info(&mut self, payload: &mut CommandBuffer) -> Result<()> {
        self.addons = addons::parse_addon_blob(payload)?;
        Ok(())
    }

    pub fn send_addon_info(&mut self) {
        let packet = addons::build_addon_info(&self.addons);
        self.addons.clear();
        self.send(packet);
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.actor.is_some() {
            self.begin_logout(true);
        }
        if let Some(link) = self.link.take() {
            link.close();
        }
        self.inbox.clear();
        self.ctx.metrics.session_closed();
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("account", &self.account.id)
            .field("state", &self.state)
            .field("actor", &self.actor)
            .finish_non_exhaustive()
    }
}
