//! Per-session command FIFO.
//!
//! Many producers (the network side) push; one consumer at a time drains the
//! subset a filter accepts. Commands the filter skips keep their relative
//! order and wait for the complementary pass.

use crate::core::command::Command;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

#[derive(Debug, Default)]
struct Inner {
    commands: VecDeque<Command>,
    next_arrival: u64,
}

#[derive(Debug, Default)]
pub struct CommandQueue {
    inner: Mutex<Inner>,
}

/// Producer-side handle onto a session's queue.
pub type CommandInbox = Arc<CommandQueue>;

impl CommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a command, stamping its arrival order. Returns the stamp.
    pub fn push(&self, mut command: Command) -> u64 {
        let mut inner = self.inner.lock();
        let arrival = inner.next_arrival;
        inner.next_arrival += 1;
        command.set_arrival(arrival);
        inner.commands.push_back(command);
        arrival
    }

    /// Remove and return, in arrival order, every command `accept` says yes to.
    pub fn drain<P>(&self, mut accept: P) -> Vec<Command>
    where
        P: FnMut(&Command) -> bool,
    {
        let mut inner = self.inner.lock();
        let mut taken = Vec::new();
        let mut kept = VecDeque::with_capacity(inner.commands.len());
        for command in inner.commands.drain(..) {
            if accept(&command) {
                taken.push(command);
            } else {
                kept.push_back(command);
            }
        }
        inner.commands = kept;
        taken
    }

    /// Remove and return the oldest command `accept` says yes to.
    pub fn pop_next<P>(&self, mut accept: P) -> Option<Command>
    where
        P: FnMut(&Command) -> bool,
    {
        let mut inner = self.inner.lock();
        let index = inner.commands.iter().position(|c| accept(c))?;
        inner.commands.remove(index)
    }

    /// Drop everything still queued. Returns how many commands were discarded.
    pub fn clear(&self) -> usize {
        let mut inner = self.inner.lock();
        let dropped = inner.commands.len();
        inner.commands.clear();
        dropped
    }

    pub fn len(&self) -> usize {
        self.inner.lock().commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().commands.is_empty()
    }
}
