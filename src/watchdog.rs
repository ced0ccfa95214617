//! Reconnect watchdog
//!
//! Layered on top of the dispatch core when `auto_reconnect` is enabled.
//! It only reopens the transport; commands drained by the disconnect have
//! already been settled and are never resent.

use std::sync::Arc;
use std::time::Duration;

use crossbeam::channel::Sender;

use crate::config::ClientOptions;
use crate::error::Result;
use crate::transport::{Connector, Transport, TransportEvent};

pub(crate) struct Watchdog {
    connector: Arc<dyn Connector>,
    endpoint: String,
    options: ClientOptions,

    /// Attempts since the last successful connect
    attempts: u32,
}

impl Watchdog {
    pub(crate) fn new(connector: Arc<dyn Connector>, endpoint: &str, options: ClientOptions) -> Self {
        Self {
            connector,
            endpoint: endpoint.to_string(),
            options,
            attempts: 0,
        }
    }

    /// Backoff before the next attempt, or None once attempts are used up
    ///
    /// Doubles from `reconnect_delay` up to `max_reconnect_delay`.
    pub(crate) fn next_delay(&mut self) -> Option<Duration> {
        if let Some(max) = self.options.max_reconnect_attempts {
            if self.attempts >= max {
                return None;
            }
        }

        let factor = 1u32 << self.attempts.min(16);
        let delay = self
            .options
            .reconnect_delay
            .saturating_mul(factor)
            .min(self.options.max_reconnect_delay);

        self.attempts += 1;
        Some(delay)
    }

    pub(crate) fn reconnect(&self, events: Sender<TransportEvent>) -> Result<Arc<dyn Transport>> {
        self.connector.open(&self.endpoint, &self.options, events)
    }

    pub(crate) fn reset(&mut self) {
        self.attempts = 0;
    }

    pub(crate) fn attempts(&self) -> u32 {
        self.attempts
    }

    pub(crate) fn endpoint(&self) -> &str {
        &self.endpoint
    }
}
