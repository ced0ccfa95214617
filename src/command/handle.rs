//! Command handle
//!
//! The caller's view of a submitted command.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use super::slot::{CommandPhase, CompletionSlot};
use crate::error::{ClientError, Result};

/// Handle to a submitted command
///
/// Waiting never blocks the dispatcher, and a timed-out wait leaves the
/// command where it is: the connection still expects its response.
pub struct CommandHandle<T> {
    id: u64,
    name: &'static str,
    slot: Arc<CompletionSlot<T>>,
    default_timeout: Duration,
}

impl<T> CommandHandle<T> {
    pub(crate) fn new(
        id: u64,
        name: &'static str,
        slot: Arc<CompletionSlot<T>>,
        default_timeout: Duration,
    ) -> Self {
        Self {
            id,
            name,
            slot,
            default_timeout,
        }
    }

    /// Connection-local command id (submission order)
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Whether the command has settled (result, error or cancellation)
    pub fn is_done(&self) -> bool {
        self.slot.is_settled()
    }

    pub fn is_cancelled(&self) -> bool {
        self.slot.is_cancelled()
    }

    /// Current pipeline phase
    pub fn phase(&self) -> CommandPhase {
        self.slot.phase()
    }

    /// Cancel the command if it is still waiting in the outbound buffer
    ///
    /// Returns `false` once encoding has begun or the command has settled.
    pub fn cancel(&self) -> bool {
        self.slot.cancel()
    }

    /// Wait up to `timeout` for settlement without reading the outcome
    pub fn await_done(&self, timeout: Duration) -> bool {
        self.slot.wait(timeout)
    }
}

impl<T: Clone> CommandHandle<T> {
    /// Wait for the outcome using the connection's default timeout
    pub fn await_result(&self) -> Result<T> {
        self.await_timeout(self.default_timeout)
    }

    /// Wait for the outcome, at most `timeout`
    pub fn await_timeout(&self, timeout: Duration) -> Result<T> {
        if !self.slot.wait(timeout) {
            return Err(ClientError::Timeout(timeout));
        }
        self.slot
            .peek()
            .unwrap_or(Err(ClientError::Timeout(timeout)))
    }

    /// The outcome, if already settled
    pub fn try_result(&self) -> Option<Result<T>> {
        self.slot.peek()
    }
}

impl<T> Clone for CommandHandle<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            name: self.name,
            slot: Arc::clone(&self.slot),
            default_timeout: self.default_timeout,
        }
    }
}

impl<T> fmt::Debug for CommandHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandHandle")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("phase", &self.slot.phase())
            .field("done", &self.slot.is_settled())
            .finish()
    }
}
