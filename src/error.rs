//! # Error Types
//!
//! Error handling for the session engine.
//!
//! Every failure a command can produce maps onto one of five classes
//! (see [`ErrorClass`]). The class decides how the dispatcher reacts:
//!
//! ## Error Classes
//! - **Protocol violations**: truncated or oversized payloads, broken addon blobs.
//!   Logged and dropped; the connection is closed only when policy asks for it.
//! - **State violations**: a command arrived in the wrong session status.
//!   Dropped at debug level, nothing is sent back.
//! - **Validation rejections**: a guard chain refused an action. Rendered to the
//!   client as an equip-error or cast-result where one exists.
//! - **Unknown references**: an opcode, spell, item or unit id that does not resolve.
//! - **Absent subsystems**: a collaborator the step needs is not present.
//!
//! Infrastructure failures (I/O, configuration, persistence) are surfaced to callers.
//!
//! ## Example Usage
//! ```rust
//! use realm_session::error::{ErrorClass, SessionError};
//!
//! let err = SessionError::Malformed { needed: 4, remaining: 1 };
//! assert_eq!(err.class(), ErrorClass::ProtocolViolation);
//! assert!(err.may_close_connection());
//! ```

use crate::core::guid::ObjectGuid;
use crate::validation::Rejection;
use std::io;
use thiserror::Error;

/// Error message constants to reduce allocations in error paths.
pub mod constants {
    /// Payload errors
    pub const ERR_ADDON_BLOB_TOO_LARGE: &str = "Addon info blob exceeds the decompressed size limit";
    pub const ERR_EMPTY_COMMAND: &str = "Command shorter than its opcode header";

    /// State errors
    pub const ERR_NO_ACTOR: &str = "No actor attached to session";
    pub const ERR_ACTOR_ATTACHED: &str = "An actor is already attached to the session";
    pub const ERR_REMOTE_CONTROL: &str = "Command issued while controlling another unit";
    pub const ERR_NOT_OWN_PET: &str = "Unit is neither the pet nor the charm of the actor";

    /// Subsystem errors
    pub const ERR_NO_REGION: &str = "Actor has no region";
}

/// Coarse classification used by the dispatcher to decide how to react.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    ProtocolViolation,
    StateViolation,
    ValidationRejection,
    UnknownReference,
    SubsystemAbsent,
    Infrastructure,
}

/// What kind of id failed to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    Opcode,
    Spell,
    Item,
    Unit,
    Character,
}

impl std::fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ReferenceKind::Opcode => "opcode",
            ReferenceKind::Spell => "spell",
            ReferenceKind::Item => "item",
            ReferenceKind::Unit => "unit",
            ReferenceKind::Character => "character",
        };
        f.write_str(name)
    }
}

// SessionError is the primary error type for all session operations
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Malformed command: needed {needed} bytes, {remaining} remaining")]
    Malformed { needed: usize, remaining: usize },

    #[error("Malformed command: {0}")]
    MalformedField(&'static str),

    #[error("Command too large: {0} bytes")]
    OversizedCommand(usize),

    #[error("Addon info rejected: {0}")]
    AddonBlob(&'static str),

    #[error("Decompression failed")]
    DecompressionFailure,

    #[error("State violation: {0}")]
    StateViolation(&'static str),

    #[error("Invalid session transition from {from} to {to}")]
    InvalidTransition { from: &'static str, to: &'static str },

    #[error("Action rejected: {0:?}")]
    Rejected(Rejection),

    #[error("Cheat suspected: actor {actor} does not own spell {spell_id}")]
    CheatSuspected { actor: ObjectGuid, spell_id: u32 },

    #[error("Anti-cheat vetoed spell {spell_id}")]
    AntiCheatVeto { spell_id: u32 },

    #[error("Unknown {kind} reference: {id}")]
    UnknownReference { kind: ReferenceKind, id: u64 },

    #[error("Subsystem absent: {0}")]
    SubsystemAbsent(&'static str),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Connection closed")]
    ConnectionClosed,
}

impl SessionError {
    /// Shorthand for an unresolved id.
    pub fn unknown(kind: ReferenceKind, id: impl Into<u64>) -> Self {
        SessionError::UnknownReference {
            kind,
            id: id.into(),
        }
    }

    /// Map the variant onto its handling class.
    pub fn class(&self) -> ErrorClass {
        match self {
            SessionError::Malformed { .. }
            | SessionError::MalformedField(_)
            | SessionError::OversizedCommand(_)
            | SessionError::AddonBlob(_)
            | SessionError::DecompressionFailure => ErrorClass::ProtocolViolation,
            SessionError::StateViolation(_) | SessionError::InvalidTransition { .. } => {
                ErrorClass::StateViolation
            }
            SessionError::Rejected(_)
            | SessionError::CheatSuspected { .. }
            | SessionError::AntiCheatVeto { .. } => ErrorClass::ValidationRejection,
            SessionError::UnknownReference { .. } => ErrorClass::UnknownReference,
            SessionError::SubsystemAbsent(_) => ErrorClass::SubsystemAbsent,
            SessionError::Io(_)
            | SessionError::Persistence(_)
            | SessionError::ConfigError(_)
            | SessionError::ConnectionClosed => ErrorClass::Infrastructure,
        }
    }

    /// Only protocol violations are allowed to end a connection.
    pub fn may_close_connection(&self) -> bool {
        self.class() == ErrorClass::ProtocolViolation
    }
}

/// Type alias for Results using SessionError
pub type Result<T> = std::result::Result<T, SessionError>;
