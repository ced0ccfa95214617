//! Dispatcher loop
//!
//! The single thread that owns the in-flight ledger and performs every
//! encode, flush and decode for one connection.
//!
//! ## Guarantees
//! - A command reaches the ledger only after its encode step succeeded
//!   and the transport was still open; it is written at most once
//! - Responses are matched to the ledger head, strictly in order
//! - A transport closure drains both queues; nothing is resent
//! - A response with no command in flight, or a framing error, is fatal

use std::sync::Arc;

use bytes::BytesMut;
use crossbeam::channel::{select, unbounded, Receiver, RecvTimeoutError};

use super::queue::{ConnectionState, InFlightLedger};
use super::{Shared, Signal};
use crate::command::Dispatch;
use crate::error::ClientError;
use crate::protocol::parse_response;
use crate::transport::{Transport, TransportEvent};
use crate::watchdog::Watchdog;

/// Flush mid-pass once this many encoded bytes are waiting
const FLUSH_THRESHOLD: usize = 64 * 1024;

/// What the loop does after handling one input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Continue,
    Shutdown,
}

pub(crate) struct Dispatcher {
    shared: Arc<Shared>,

    transport: Arc<dyn Transport>,

    /// Inbound side of the current transport
    events: Receiver<TransportEvent>,

    wake: Receiver<Signal>,

    ledger: InFlightLedger,

    /// Inbound bytes not yet forming a complete response
    read_buf: BytesMut,

    /// Encoded commands awaiting the flush at the end of a pass
    write_buf: BytesMut,

    /// Per-command encode target, discarded on failure
    scratch: BytesMut,

    watchdog: Option<Watchdog>,
}

impl Dispatcher {
    pub(crate) fn new(
        shared: Arc<Shared>,
        events: Receiver<TransportEvent>,
        wake: Receiver<Signal>,
        watchdog: Option<Watchdog>,
    ) -> Self {
        let transport = shared.transport();
        let ledger = InFlightLedger::new(shared.in_flight_counter());
        Self {
            shared,
            transport,
            events,
            wake,
            ledger,
            read_buf: BytesMut::with_capacity(8 * 1024),
            write_buf: BytesMut::with_capacity(8 * 1024),
            scratch: BytesMut::new(),
            watchdog,
        }
    }

    /// Run until close, or until the transport is lost for good
    pub(crate) fn run(mut self) {
        tracing::debug!("Dispatcher started for {}", self.transport.peer());

        loop {
            // Reconnect swaps `events`, so select over handles taken per turn.
            let (wake, events) = (self.wake.clone(), self.events.clone());
            let step = select! {
                recv(wake) -> signal => match signal {
                    Ok(Signal::Flush) => self.drain_and_encode(),
                    Ok(Signal::Close) | Err(_) => Step::Shutdown,
                },
                recv(events) -> event => match event {
                    Ok(TransportEvent::Data(chunk)) => self.on_data(&chunk),
                    Ok(TransportEvent::Closed(reason)) => self.on_transport_closed(&reason),
                    Err(_) => self.on_transport_closed("transport event channel closed"),
                },
            };

            if step == Step::Shutdown {
                break;
            }
        }

        self.shutdown();
    }

    // =========================================================================
    // Encode & flush
    // =========================================================================

    /// Encode every buffered command, then flush once
    fn drain_and_encode(&mut self) -> Step {
        self.shared.clear_wake();

        while let Some(mut command) = self.shared.pop_outbound() {
            if !command.begin_encode() {
                tracing::trace!("Skipping cancelled {} #{}", command.name(), command.id());
                continue;
            }

            if !self.transport.is_open() {
                command.fail(ClientError::closed("transport closed before encode"));
                continue;
            }

            self.scratch.clear();
            if let Err(err) = command.encode(&mut self.scratch) {
                tracing::debug!("{} #{} failed to encode: {}", command.name(), command.id(), err);
                command.fail(err);
                continue;
            }

            // The transport may have been torn down while the encode step ran.
            if !self.transport.is_open() {
                tracing::debug!(
                    "Transport closed while encoding {} #{}; not sent",
                    command.name(),
                    command.id()
                );
                command.fail(ClientError::closed("transport closed during encode"));
                continue;
            }

            self.write_buf.extend_from_slice(&self.scratch);
            command.mark_in_flight();
            tracing::trace!("Queued {} #{} for flush", command.name(), command.id());
            self.ledger.push(command);

            if self.write_buf.len() >= FLUSH_THRESHOLD && self.flush() == Step::Shutdown {
                return Step::Shutdown;
            }
        }

        self.flush()
    }

    /// Write and flush everything encoded so far
    fn flush(&mut self) -> Step {
        if self.write_buf.is_empty() {
            return Step::Continue;
        }

        let flushed = self
            .transport
            .write(&self.write_buf)
            .and_then(|_| self.transport.flush());
        self.write_buf.clear();

        match flushed {
            Ok(()) => Step::Continue,
            Err(e) => {
                tracing::warn!("Flush to {} failed: {}", self.transport.peer(), e);
                self.on_transport_closed(&format!("flush failed: {}", e))
            }
        }
    }

    // =========================================================================
    // Decode & demultiplex
    // =========================================================================

    /// Complete ledger commands for every whole response in the buffer
    fn on_data(&mut self, chunk: &[u8]) -> Step {
        self.read_buf.extend_from_slice(chunk);

        loop {
            let response = match parse_response(&mut self.read_buf) {
                Ok(Some(response)) => response,
                Ok(None) => return Step::Continue,
                Err(err) => {
                    tracing::warn!("Bad frame from {}: {}", self.transport.peer(), err);
                    return self.on_transport_closed(&err.to_string());
                }
            };

            let Some(command) = self.ledger.pop() else {
                let err = ClientError::Protocol(format!(
                    "{:?} response with no command in flight",
                    response.kind
                ));
                tracing::warn!("Desynchronized with {}: {}", self.transport.peer(), err);
                return self.on_transport_closed(&err.to_string());
            };

            let (name, id) = (command.name(), command.id());
            match command.complete(response) {
                None => tracing::trace!("Completed {} #{}", name, id),
                // The command already ran server-side; the error is the caller's to judge.
                Some(err) => tracing::debug!("{} #{} completed with error: {}", name, id, err),
            }
        }
    }

    // =========================================================================
    // Disconnect handling
    // =========================================================================

    /// Transport is gone: drain everything, then reconnect or stop
    fn on_transport_closed(&mut self, reason: &str) -> Step {
        self.transport.close();

        let previous = self.shared.set_state(ConnectionState::Disconnected);
        if previous == ConnectionState::Connected {
            tracing::debug!("Connection to {} lost: {}", self.transport.peer(), reason);
        }

        self.drain_all(reason);
        self.read_buf.clear();
        self.write_buf.clear();

        if previous == ConnectionState::Closed {
            return Step::Shutdown;
        }

        match self.watchdog.take() {
            Some(watchdog) => self.reconnect(watchdog),
            None => Step::Shutdown,
        }
    }

    /// Reopen the transport with backoff. Drained commands are not resent.
    fn reconnect(&mut self, mut watchdog: Watchdog) -> Step {
        while let Some(delay) = watchdog.next_delay() {
            match self.wake.recv_timeout(delay) {
                Ok(Signal::Close) | Err(RecvTimeoutError::Disconnected) => return Step::Shutdown,
                Ok(Signal::Flush) => self.shared.clear_wake(),
                Err(RecvTimeoutError::Timeout) => {}
            }

            if self.shared.state() == ConnectionState::Closed {
                return Step::Shutdown;
            }

            tracing::debug!(
                "Reconnecting to {} (attempt {})",
                watchdog.endpoint(),
                watchdog.attempts()
            );

            let (event_tx, event_rx) = unbounded();
            let transport = match watchdog.reconnect(event_tx) {
                Ok(transport) => transport,
                Err(err) => {
                    tracing::debug!("Reconnect to {} failed: {}", watchdog.endpoint(), err);
                    continue;
                }
            };

            self.shared.replace_transport(Arc::clone(&transport));
            self.transport = transport;
            self.events = event_rx;

            if self.shared.set_state(ConnectionState::Connected) == ConnectionState::Closed {
                return Step::Shutdown;
            }

            tracing::debug!("Reconnected to {}", self.transport.peer());
            watchdog.reset();
            self.watchdog = Some(watchdog);
            return Step::Continue;
        }

        tracing::warn!(
            "Giving up on {} after {} reconnect attempts",
            watchdog.endpoint(),
            watchdog.attempts()
        );
        Step::Shutdown
    }

    /// Settle every buffered and in-flight command with `ConnectionClosed`
    fn drain_all(&mut self, reason: &str) {
        let in_flight = self.ledger.drain();
        let buffered = self.shared.drain_outbound();

        if !in_flight.is_empty() || !buffered.is_empty() {
            tracing::debug!(
                "Draining {} in-flight and {} buffered commands: {}",
                in_flight.len(),
                buffered.len(),
                reason
            );
        }

        for command in in_flight.into_iter().chain(buffered) {
            command.fail(ClientError::closed(reason));
        }
    }

    fn shutdown(&mut self) {
        self.transport.close();
        self.drain_all("connection closed");
        debug_assert!(self.ledger.is_empty());
        tracing::debug!("Dispatcher for {} stopped", self.transport.peer());
    }
}
