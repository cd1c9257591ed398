//! Session lifecycle states.
//!
//! ```text
//! Authenticating -> Queued | InWorld | Closed
//! Queued         -> Authenticating | Closed
//! InWorld        -> LoggingOut | Closed
//! LoggingOut     -> Authenticating | Closed
//! Closed         -> (terminal)
//! ```

use crate::error::{Result, SessionError};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SessionState {
    /// Authenticated, picking a character.
    #[default]
    Authenticating,
    /// Waiting in the admission queue.
    Queued,
    /// Actor attached.
    InWorld,
    /// Teardown in progress.
    LoggingOut,
    Closed,
}

impl SessionState {
    pub fn name(self) -> &'static str {
        match self {
            SessionState::Authenticating => "Authenticating",
            SessionState::Queued => "Queued",
            SessionState::InWorld => "InWorld",
            SessionState::LoggingOut => "LoggingOut",
            SessionState::Closed => "Closed",
        }
    }

    pub fn can_transition_to(self, next: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, next),
            (Authenticating, Queued | InWorld | Closed)
                | (Queued, Authenticating | Closed)
                | (InWorld, LoggingOut | Closed)
                | (LoggingOut, Authenticating | Closed)
        )
    }

    /// Move to `next`, or fail with [`SessionError::InvalidTransition`].
    pub fn transition(&mut self, next: SessionState) -> Result<()> {
        if !self.can_transition_to(next) {
            return Err(SessionError::InvalidTransition {
                from: self.name(),
                to: next.name(),
            });
        }
        *self = next;
        Ok(())
    }

    pub fn is_closed(self) -> bool {
        self == SessionState::Closed
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
