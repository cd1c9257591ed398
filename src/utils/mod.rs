//! # Utility Modules
//!
//! Supporting utilities shared by the session engine.
//!
//! ## Components
//! - **Compression**: zlib inflate with a decompressed-size limit
//! - **Logging**: Structured logging configuration
//! - **Metrics**: Thread-safe session counters

pub mod compression;
pub mod logging;
pub mod metrics;

pub use metrics::{SessionMetrics, Timer};
