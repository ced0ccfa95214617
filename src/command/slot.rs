//! Completion slot
//!
//! Single-assignment result cell shared between the dispatcher (which
//! settles it) and any number of caller threads (which wait on it).
//!
//! ## Phases
//! ```text
//!   QUEUED ──begin_encode──▶ ENCODING ──mark_in_flight──▶ IN_FLIGHT
//!     │
//!     └──cancel──▶ CANCELLED
//! ```
//! Settlement is independent of the phase: the first `settle` wins and
//! every later one is a no-op.

use std::sync::atomic::{AtomicU8, Ordering};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::error::{ClientError, Result};

const QUEUED: u8 = 0;
const ENCODING: u8 = 1;
const IN_FLIGHT: u8 = 2;
const CANCELLED: u8 = 3;

/// Where a command sits in the dispatch pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandPhase {
    /// In the outbound buffer, encode not begun
    Queued,
    /// Removed from the buffer, encode running
    Encoding,
    /// Encoded and handed to the transport
    InFlight,
    /// Cancelled while still queued
    Cancelled,
}

pub(crate) struct CompletionSlot<T> {
    phase: AtomicU8,
    outcome: Mutex<Option<Result<T>>>,
    settled: Condvar,
}

impl<T> CompletionSlot<T> {
    pub(crate) fn new() -> Self {
        Self {
            phase: AtomicU8::new(QUEUED),
            outcome: Mutex::new(None),
            settled: Condvar::new(),
        }
    }

    /// Store the outcome if none is stored yet. Returns whether this call won.
    pub(crate) fn settle(&self, outcome: Result<T>) -> bool {
        let mut guard = self.outcome.lock();
        if guard.is_some() {
            return false;
        }
        *guard = Some(outcome);
        self.settled.notify_all();
        true
    }

    pub(crate) fn is_settled(&self) -> bool {
        self.outcome.lock().is_some()
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        matches!(*self.outcome.lock(), Some(Err(ClientError::Cancelled)))
    }

    pub(crate) fn phase(&self) -> CommandPhase {
        match self.phase.load(Ordering::Acquire) {
            QUEUED => CommandPhase::Queued,
            ENCODING => CommandPhase::Encoding,
            IN_FLIGHT => CommandPhase::InFlight,
            _ => CommandPhase::Cancelled,
        }
    }

    /// Claim the command for encoding. Fails if it was cancelled first.
    pub(crate) fn begin_encode(&self) -> bool {
        self.phase
            .compare_exchange(QUEUED, ENCODING, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub(crate) fn mark_in_flight(&self) {
        self.phase.store(IN_FLIGHT, Ordering::Release);
    }

    /// Cancel a command that has not started encoding
    pub(crate) fn cancel(&self) -> bool {
        if self
            .phase
            .compare_exchange(QUEUED, CANCELLED, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }
        self.settle(Err(ClientError::Cancelled))
    }

    /// Block until settled or `timeout` elapses. Returns whether settled.
    pub(crate) fn wait(&self, timeout: Duration) -> bool {
        let deadline = Instant::now().checked_add(timeout);
        let mut guard = self.outcome.lock();
        while guard.is_none() {
            match deadline {
                Some(deadline) => {
                    if self.settled.wait_until(&mut guard, deadline).timed_out() {
                        return guard.is_some();
                    }
                }
                // Bound too large to represent: wait until settled.
                None => self.settled.wait(&mut guard),
            }
        }
        true
    }
}

impl<T: Clone> CompletionSlot<T> {
    pub(crate) fn peek(&self) -> Option<Result<T>> {
        self.outcome.lock().clone()
    }
}
