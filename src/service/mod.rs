//! Transport adapters that feed sessions from async byte streams.

pub mod connection;

pub use connection::{open_session, run_connection};
