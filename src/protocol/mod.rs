//! # Protocol Layer
//!
//! Command admission: queueing, thread-affinity filtering and status gating.
//!
//! ## Components
//! - **Queue**: thread-safe per-session FIFO drained through a filter
//! - **Filter**: `SimulationFilter` / `SessionFilter`, complementary affinity predicates
//! - **Dispatcher**: immutable opcode table and the status gate
//! - **Opcodes**: opcode identifiers and their log names
//!
//! ## Flow
//! ```text
//! network -> CommandQueue::push
//! region tick   -> Session::process_queued(SimulationFilter)
//! session tick  -> Session::process_queued(SessionFilter)
//!                    -> admit(status) -> handler
//! ```

pub mod dispatcher;
pub mod filter;
pub mod opcodes;
pub mod queue;
