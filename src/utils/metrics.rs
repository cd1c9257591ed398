//! Observability and Metrics
//!
//! Atomic counters for command flow and session lifecycle. One
//! [`SessionMetrics`] is shared by every session of an engine through its
//! context.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::{debug, info};

/// Counters for session operations
#[derive(Debug)]
pub struct SessionMetrics {
    /// Commands pushed into session queues
    pub commands_received: AtomicU64,
    /// Commands whose handler ran
    pub commands_dispatched: AtomicU64,
    /// Commands refused by the status gate
    pub gate_drops: AtomicU64,
    /// Truncated, oversized or undecodable commands
    pub protocol_violations: AtomicU64,
    /// Validator rejections, cheat suspicions and anti-cheat vetoes
    pub rejections: AtomicU64,
    /// Unresolved opcodes, spells, items and units
    pub unknown_references: AtomicU64,
    /// Actions handed to the simulation
    pub actions_prepared: AtomicU64,
    /// Completed logout teardowns
    pub logouts_completed: AtomicU64,
    /// Live sessions
    pub sessions_active: AtomicU64,
    start_time: Instant,
}

impl SessionMetrics {
    pub fn new() -> Self {
        Self {
            commands_received: AtomicU64::new(0),
            commands_dispatched: AtomicU64::new(0),
            gate_drops: AtomicU64::new(0),
            protocol_violations: AtomicU64::new(0),
            rejections: AtomicU64::new(0),
            unknown_references: AtomicU64::new(0),
            actions_prepared: AtomicU64::new(0),
            logouts_completed: AtomicU64::new(0),
            sessions_active: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn command_received(&self) {
        self.commands_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn command_dispatched(&self) {
        self.commands_dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn gate_drop(&self) {
        self.gate_drops.fetch_add(1, Ordering::Relaxed);
    }

    pub fn protocol_violation(&self) {
        self.protocol_violations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn rejection(&self) {
        self.rejections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn unknown_reference(&self) {
        self.unknown_references.fetch_add(1, Ordering::Relaxed);
    }

    pub fn action_prepared(&self) {
        self.actions_prepared.fetch_add(1, Ordering::Relaxed);
    }

    pub fn logout_completed(&self) {
        self.logouts_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn session_opened(&self) {
        self.sessions_active.fetch_add(1, Ordering::Relaxed);
    }

    pub fn session_closed(&self) {
        self.sessions_active.fetch_sub(1, Ordering::Relaxed);
    }

    /// Get current metrics snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            commands_received: self.commands_received.load(Ordering::Relaxed),
            commands_dispatched: self.commands_dispatched.load(Ordering::Relaxed),
            gate_drops: self.gate_drops.load(Ordering::Relaxed),
            protocol_violations: self.protocol_violations.load(Ordering::Relaxed),
            rejections: self.rejections.load(Ordering::Relaxed),
            unknown_references: self.unknown_references.load(Ordering::Relaxed),
            actions_prepared: self.actions_prepared.load(Ordering::Relaxed),
            logouts_completed: self.logouts_completed.load(Ordering::Relaxed),
            sessions_active: self.sessions_active.load(Ordering::Relaxed),
            uptime_seconds: self.start_time.elapsed().as_secs(),
        }
    }

    /// Log current metrics
    pub fn log_metrics(&self) {
        let snapshot = self.snapshot();
        info!(
            commands_received = snapshot.commands_received,
            commands_dispatched = snapshot.commands_dispatched,
            gate_drops = snapshot.gate_drops,
            protocol_violations = snapshot.protocol_violations,
            rejections = snapshot.rejections,
            unknown_references = snapshot.unknown_references,
            actions_prepared = snapshot.actions_prepared,
            logouts_completed = snapshot.logouts_completed,
            sessions_active = snapshot.sessions_active,
            uptime_seconds = snapshot.uptime_seconds,
            "Session metrics snapshot"
        );
    }
}

impl Default for SessionMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of metrics at a point in time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub commands_received: u64,
    pub commands_dispatched: u64,
    pub gate_drops: u64,
    pub protocol_violations: u64,
    pub rejections: u64,
    pub unknown_references: u64,
    pub actions_prepared: u64,
    pub logouts_completed: u64,
    pub sessions_active: u64,
    pub uptime_seconds: u64,
}

/// Logs the elapsed time of an operation at debug level when dropped
pub struct Timer {
    start: Instant,
    operation: &'static str,
}

impl Timer {
    /// Start timing an operation
    pub fn start(operation: &'static str) -> Self {
        Self {
            start: Instant::now(),
            operation,
        }
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        let duration = self.start.elapsed();
        debug!(
            operation = self.operation,
            duration_us = duration.as_micros() as u64,
            "Operation completed"
        );
    }
}
