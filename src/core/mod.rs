//! # Core Protocol Components
//!
//! Byte-level building blocks shared by every other module.
//!
//! ## Components
//! - **Buffer**: little-endian read/write cursor over a command payload
//! - **Command**: opcode + payload + arrival order, and outbound packets
//! - **Codec**: Tokio codec for the size-prefixed transport frame
//! - **Guid**: 64-bit object identity with family helpers
//! - **Targets**: the spell target block shared by cast and item-use commands
//!
//! ## Wire Format
//! ```text
//! [Size(2, BE)] [Opcode(2, LE)] [Payload(N)]
//! ```
//!
//! ## Safety
//! - Maximum command size: 10 KB
//! - Reads past the end of a payload surface as protocol violations, never panics

pub mod buffer;
pub mod codec;
pub mod command;
pub mod guid;
pub mod targets;
