use crate::core::command::{Command, Opcode};
use crate::error::Result;
use crate::session::Session;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

type HandlerFn = dyn Fn(&mut Session, &mut Command) -> Result<()> + Send + Sync + 'static;

/// Session status a command requires before its handler may run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequiredStatus {
    /// Consumed by the transport layer before the queue; never dispatched.
    NeverAllowed,
    /// Known but not handled.
    Unimplemented,
    /// Server-to-client only.
    ServerOnly,
    /// Actor attached and resident in a region.
    LoggedIn,
    /// Actor attached, or inside the recently-logged-out window.
    LoggedInOrRecentlyLoggedOut,
    /// Authenticated, pre-world.
    Authenticated,
    /// Actor attached but between regions.
    Transferring,
}

/// Which thread may run a command's handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Affinity {
    /// Runs wherever it is drained first.
    Inplace,
    /// Safe to run on the region tick while the actor is resident there.
    ThreadSafe,
    /// Session thread only.
    ThreadUnsafe,
}

/// Immutable routing entry for one opcode.
#[derive(Clone)]
pub struct OpcodeDescriptor {
    pub name: &'static str,
    pub status: RequiredStatus,
    pub affinity: Affinity,
    handler: Arc<HandlerFn>,
}

impl OpcodeDescriptor {
    pub fn invoke(&self, session: &mut Session, command: &mut Command) -> Result<()> {
        (self.handler)(session, command)
    }
}

impl std::fmt::Debug for OpcodeDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpcodeDescriptor")
            .field("name", &self.name)
            .field("status", &self.status)
            .field("affinity", &self.affinity)
            .finish()
    }
}

/// Opcode routing table. Built once, shared read-only between sessions.
#[derive(Debug, Default)]
pub struct OpcodeTable {
    entries: HashMap<Opcode, OpcodeDescriptor>,
}

impl OpcodeTable {
    pub fn builder() -> OpcodeTableBuilder {
        OpcodeTableBuilder::default()
    }

    pub fn get(&self, opcode: Opcode) -> Option<&OpcodeDescriptor> {
        self.entries.get(&opcode)
    }

    /// Unknown opcodes stay on the session thread, where the gate drops them.
    pub fn affinity_of(&self, opcode: Opcode) -> Affinity {
        self.entries
            .get(&opcode)
            .map(|d| d.affinity)
            .unwrap_or(Affinity::ThreadUnsafe)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Default)]
pub struct OpcodeTableBuilder {
    entries: HashMap<Opcode, OpcodeDescriptor>,
}

impl OpcodeTableBuilder {
    pub fn register<F>(
        mut self,
        opcode: Opcode,
        name: &'static str,
        status: RequiredStatus,
        affinity: Affinity,
        handler: F,
    ) -> Self
    where
        F: Fn(&mut Session, &mut Command) -> Result<()> + Send + Sync + 'static,
    {
        let descriptor = OpcodeDescriptor {
            name,
            status,
            affinity,
            handler: Arc::new(handler),
        };
        if let Some(previous) = self.entries.insert(opcode, descriptor) {
            warn!(%opcode, previous = previous.name, replacement = name, "Opcode registered twice");
        }
        self
    }

    pub fn build(self) -> OpcodeTable {
        OpcodeTable {
            entries: self.entries,
        }
    }
}

/// Session facts the gate decides on, read once per command.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GateSnapshot {
    pub has_actor: bool,
    pub actor_resident: bool,
    pub recently_logged_out: bool,
    pub admission_queued: bool,
}

/// Why the gate refused a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateRefusal {
    /// No actor, and not inside the recently-logged-out window.
    NoActor,
    /// No actor, but the session just logged out; expected lag.
    RecentlyLoggedOut,
    /// Actor exists but is between regions; expected lag after a transfer started.
    NotResident,
    /// Transfer command while the actor is still resident.
    StillResident,
    /// Pre-world command while in the admission queue.
    AdmissionQueued,
    NeverAllowed,
    Unimplemented,
    ServerOnly,
}

impl GateRefusal {
    /// Refusals that are normal traffic and only worth a debug line.
    pub fn is_expected(self) -> bool {
        matches!(
            self,
            GateRefusal::RecentlyLoggedOut | GateRefusal::NotResident | GateRefusal::Unimplemented
        )
    }
}

/// Decide whether a command with `status` may run given `snapshot`.
pub fn admit(status: RequiredStatus, snapshot: GateSnapshot) -> std::result::Result<(), GateRefusal> {
    match status {
        RequiredStatus::LoggedIn => {
            if !snapshot.has_actor {
                Err(if snapshot.recently_logged_out {
                    GateRefusal::RecentlyLoggedOut
                } else {
                    GateRefusal::NoActor
                })
            } else if !snapshot.actor_resident {
                Err(GateRefusal::NotResident)
            } else {
                Ok(())
            }
        }
        RequiredStatus::LoggedInOrRecentlyLoggedOut => {
            if snapshot.has_actor || snapshot.recently_logged_out {
                Ok(())
            } else {
                Err(GateRefusal::NoActor)
            }
        }
        RequiredStatus::Transferring => {
            if !snapshot.has_actor {
                Err(GateRefusal::NoActor)
            } else if snapshot.actor_resident {
                Err(GateRefusal::StillResident)
            } else {
                Ok(())
            }
        }
        RequiredStatus::Authenticated => {
            if snapshot.admission_queued {
                Err(GateRefusal::AdmissionQueued)
            } else {
                Ok(())
            }
        }
        RequiredStatus::NeverAllowed => Err(GateRefusal::NeverAllowed),
        RequiredStatus::Unimplemented => Err(GateRefusal::Unimplemented),
        RequiredStatus::ServerOnly => Err(GateRefusal::ServerOnly),
    }
}
