//! # realm-session
//!
//! Per-connection protocol engine for a multiplayer realm server.
//!
//! A connection's decoded commands land in a thread-safe queue owned by its
//! [`Session`](session::Session). Two passes drain that queue: the session
//! thread and the region tick, split by a command's thread affinity. Each
//! command passes a status gate before its handler runs. Item-use and
//! spell-cast commands go through guard chains that turn them into exactly
//! one [`ActionRequest`](validation::ActionRequest) or one rejection.
//! Logout tears the actor down through a pipeline of independently
//! skippable steps.
//!
//! ## Modules
//! - **core**: payload buffer, commands, transport codec, guids, target blocks
//! - **protocol**: opcode table, status gate, command queue, affinity filters
//! - **session**: lifecycle state machine, logout pipeline, account settings, addons
//! - **validation**: item-use and spell-cast chains, mover resolution
//! - **handlers**: the standard opcode table and cast-control operations
//! - **world**: traits for the simulation-side collaborators
//! - **service**: async transport pump
//! - **config**, **error**, **utils**: configuration, error taxonomy, logging and metrics
//!
//! ## Example
//! ```rust,no_run
//! use realm_session::config::EngineConfig;
//! use realm_session::utils::logging::init_logging;
//!
//! let config = EngineConfig::from_env()?;
//! init_logging(&config.logging)?;
//! # Ok::<(), realm_session::error::SessionError>(())
//! ```

#![warn(clippy::unwrap_used, clippy::expect_used)]

pub mod config;
pub mod core;
pub mod error;
pub mod handlers;
pub mod protocol;
pub mod service;
pub mod session;
pub mod utils;
pub mod validation;
pub mod world;

pub use crate::config::{EngineConfig, SessionConfig};
pub use crate::core::command::{Command, Opcode, OutboundPacket};
pub use crate::error::{ErrorClass, Result, SessionError};
pub use crate::handlers::standard_table;
pub use crate::protocol::filter::{CommandFilter, SessionFilter, SimulationFilter};
pub use crate::session::{Session, SessionContext, SessionState};
pub use crate::world::WorldServices;
