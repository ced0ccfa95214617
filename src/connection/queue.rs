//! Command queues
//!
//! - `OutboundBuffer`: submitted, not yet encoded. Shared with callers
//!   behind a mutex; also holds the connection state so that admission and
//!   state changes are atomic with respect to each other.
//! - `InFlightLedger`: encoded and flushed, awaiting responses. Owned by the
//!   dispatcher thread alone.

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::command::Dispatch;
use crate::error::{ClientError, Result};

/// Connection lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connected,
    Disconnected,
    /// Terminal
    Closed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Connected => "CONNECTED",
            ConnectionState::Disconnected => "DISCONNECTED",
            ConnectionState::Closed => "CLOSED",
        };
        f.write_str(name)
    }
}

// =============================================================================
// Outbound Buffer
// =============================================================================

pub(crate) struct OutboundBuffer {
    state: ConnectionState,
    commands: VecDeque<Box<dyn Dispatch>>,
    capacity: usize,
}

impl OutboundBuffer {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            state: ConnectionState::Connected,
            commands: VecDeque::new(),
            capacity,
        }
    }

    pub(crate) fn state(&self) -> ConnectionState {
        self.state
    }

    /// Move to `next`, returning the previous state. CLOSED never changes.
    pub(crate) fn set_state(&mut self, next: ConnectionState) -> ConnectionState {
        let previous = self.state;
        if previous != ConnectionState::Closed {
            self.state = next;
        }
        previous
    }

    /// Check that one more command may enter
    pub(crate) fn admit(&self) -> Result<()> {
        if self.state != ConnectionState::Connected {
            return Err(ClientError::NotConnected);
        }
        if self.commands.len() >= self.capacity {
            return Err(ClientError::QueueFull(self.capacity));
        }
        Ok(())
    }

    pub(crate) fn push(&mut self, command: Box<dyn Dispatch>) {
        self.commands.push_back(command);
    }

    pub(crate) fn pop(&mut self) -> Option<Box<dyn Dispatch>> {
        self.commands.pop_front()
    }

    pub(crate) fn drain(&mut self) -> Vec<Box<dyn Dispatch>> {
        self.commands.drain(..).collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.commands.len()
    }
}

// =============================================================================
// In-Flight Ledger
// =============================================================================

/// Flushed commands in send order; the head owns the next response
pub(crate) struct InFlightLedger {
    commands: VecDeque<Box<dyn Dispatch>>,

    /// Mirrors `commands.len()` for observers on other threads
    len: Arc<AtomicUsize>,
}

impl InFlightLedger {
    pub(crate) fn new(len: Arc<AtomicUsize>) -> Self {
        len.store(0, Ordering::Release);
        Self {
            commands: VecDeque::new(),
            len,
        }
    }

    pub(crate) fn push(&mut self, command: Box<dyn Dispatch>) {
        self.commands.push_back(command);
        self.len.store(self.commands.len(), Ordering::Release);
    }

    pub(crate) fn pop(&mut self) -> Option<Box<dyn Dispatch>> {
        let command = self.commands.pop_front();
        self.len.store(self.commands.len(), Ordering::Release);
        command
    }

    pub(crate) fn drain(&mut self) -> Vec<Box<dyn Dispatch>> {
        let drained: Vec<_> = self.commands.drain(..).collect();
        self.len.store(0, Ordering::Release);
        drained
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

impl Drop for InFlightLedger {
    fn drop(&mut self) {
        self.len.store(0, Ordering::Release);
    }
}
