//! Load sequencing.
//!
//! Every navigation takes a ticket before it starts loading. Only the holder of
//! the most recent ticket may apply its result; older loads finish and are
//! dropped.

use std::sync::atomic::{AtomicU64, Ordering};

/// Proof that a load was started. Compared against the sequencer on completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct LoadTicket(u64);

impl LoadTicket {
    pub fn value(&self) -> u64 {
        self.0
    }
}

#[derive(Debug, Default)]
pub struct LoadSequencer {
    latest: AtomicU64,
}

impl LoadSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new load, superseding every earlier ticket.
    pub fn next(&self) -> LoadTicket {
        LoadTicket(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_current(&self, ticket: LoadTicket) -> bool {
        self.latest.load(Ordering::SeqCst) == ticket.0
    }

    /// Tickets issued so far.
    pub fn issued(&self) -> u64 {
        self.latest.load(Ordering::SeqCst)
    }
}
