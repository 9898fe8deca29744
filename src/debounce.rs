//! Cancelable, time-delayed work keyed by purpose
//!
//! Key concepts:
//! - **Purpose**: what the work is for (show, hide, reposition, resize)
//! - **PendingWork**: a deadline for one purpose; at most one per purpose
//! - **Generation**: every schedule gets a fresh generation so a token held
//!   by a caller can tell whether its work was superseded
//!
//! Nothing here runs closures. Owners ask for `take_due(now)` and re-check
//! their own state before acting on each purpose returned.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

/// Handle to one scheduled unit of work
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkToken<P> {
    pub purpose: P,
    pub generation: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingWork<P> {
    pub purpose: P,
    pub generation: u64,
    pub due: Instant,
}

#[derive(Debug)]
pub struct Debouncer<P> {
    pending: HashMap<P, PendingWork<P>>,
    next_generation: u64,
}

impl<P> Default for Debouncer<P> {
    fn default() -> Self {
        Self {
            pending: HashMap::new(),
            next_generation: 0,
        }
    }
}

impl<P: Copy + Eq + Hash + std::fmt::Debug> Debouncer<P> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `purpose` to become due after `delay`, replacing any pending
    /// work of the same purpose.
    pub fn schedule(&mut self, purpose: P, now: Instant, delay: Duration) -> WorkToken<P> {
        let generation = self.next_generation;
        self.next_generation += 1;

        if let Some(previous) = self.pending.insert(
            purpose,
            PendingWork {
                purpose,
                generation,
                due: now + delay,
            },
        ) {
            log::trace!(
                "debounce: {:?} gen {} superseded by gen {}",
                purpose,
                previous.generation,
                generation
            );
        }

        WorkToken {
            purpose,
            generation,
        }
    }

    /// Cancel pending work for `purpose`. Returns true if something was pending.
    pub fn cancel(&mut self, purpose: P) -> bool {
        self.pending.remove(&purpose).is_some()
    }

    pub fn cancel_all(&mut self) {
        if !self.pending.is_empty() {
            log::trace!("debounce: cancelling {} pending", self.pending.len());
        }
        self.pending.clear();
    }

    pub fn is_pending(&self, purpose: P) -> bool {
        self.pending.contains_key(&purpose)
    }

    /// True if `token` is still the live work for its purpose
    pub fn is_current(&self, token: WorkToken<P>) -> bool {
        self.pending
            .get(&token.purpose)
            .is_some_and(|work| work.generation == token.generation)
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.values().map(|work| work.due).min()
    }

    /// Remove and return every purpose due at `now`, oldest deadline first
    pub fn take_due(&mut self, now: Instant) -> Vec<P> {
        let mut due: Vec<PendingWork<P>> = self
            .pending
            .values()
            .filter(|work| work.due <= now)
            .copied()
            .collect();
        due.sort_by_key(|work| (work.due, work.generation));

        for work in &due {
            self.pending.remove(&work.purpose);
        }

        due.into_iter().map(|work| work.purpose).collect()
    }
}
