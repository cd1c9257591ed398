//! Thread-affinity filters deciding which pass drains a command.
//!
//! Both filters are built from the same [`ResidencySnapshot`] type. Built
//! from one snapshot, `SessionFilter` accepts exactly what
//! `SimulationFilter` rejects, so a scheduling round never runs a command
//! twice and never strands one. A pass re-evaluates its filter against live
//! residency before taking each command (see [`CommandFilter::refreshed`]).

use crate::protocol::dispatcher::Affinity;

/// Actor placement observed when a pass starts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResidencySnapshot {
    pub logged_in: bool,
    pub in_region: bool,
}

impl ResidencySnapshot {
    pub fn resident(&self) -> bool {
        self.logged_in && self.in_region
    }
}

pub trait CommandFilter {
    fn accepts(&self, affinity: Affinity) -> bool;

    /// Whether this pass also services pending logouts and connection loss.
    fn processes_logout(&self) -> bool;

    /// The same pass judged against a newer snapshot.
    fn refreshed(&self, snapshot: ResidencySnapshot) -> Self
    where
        Self: Sized;
}

/// Region-tick pass.
#[derive(Debug, Clone, Copy)]
pub struct SimulationFilter {
    snapshot: ResidencySnapshot,
}

impl SimulationFilter {
    pub fn new(snapshot: ResidencySnapshot) -> Self {
        Self { snapshot }
    }
}

impl CommandFilter for SimulationFilter {
    fn accepts(&self, affinity: Affinity) -> bool {
        match affinity {
            Affinity::Inplace => true,
            Affinity::ThreadUnsafe => false,
            Affinity::ThreadSafe => self.snapshot.resident(),
        }
    }

    fn processes_logout(&self) -> bool {
        false
    }

    fn refreshed(&self, snapshot: ResidencySnapshot) -> Self {
        Self::new(snapshot)
    }
}

/// Session-thread pass.
#[derive(Debug, Clone, Copy)]
pub struct SessionFilter {
    simulation: SimulationFilter,
}

impl SessionFilter {
    pub fn new(snapshot: ResidencySnapshot) -> Self {
        Self {
            simulation: SimulationFilter::new(snapshot),
        }
    }
}

impl CommandFilter for SessionFilter {
    fn accepts(&self, affinity: Affinity) -> bool {
        !self.simulation.accepts(affinity)
    }

    fn processes_logout(&self) -> bool {
        true
    }

    fn refreshed(&self, snapshot: ResidencySnapshot) -> Self {
        Self::new(snapshot)
    }
}
