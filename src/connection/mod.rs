//! Connection Module
//!
//! One logical connection to one server endpoint.
//!
//! ## Architecture
//! ```text
//!   caller threads                     dispatcher thread
//!   ──────────────                     ─────────────────
//!   submit() ──push──▶ OutboundBuffer ──pop──▶ encode ──▶ InFlightLedger
//!      │                (mutex)                   │            │
//!      └──── wake ─────────────────────────▶ flush ▼            ▼
//!                                          transport ──▶ decode head
//! ```
//! - Callers only append to the outbound buffer and wait on handles
//! - The dispatcher alone encodes, flushes, and pops the ledger
//! - State changes happen under the outbound buffer lock, so a command is
//!   either admitted before a disconnect (and drained by it) or rejected

mod queue;
mod dispatcher;

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam::channel::{unbounded, Sender};
use parking_lot::Mutex;

use crate::command::{Command, CommandHandle, Dispatch};
use crate::config::ClientOptions;
use crate::error::{ClientError, Result};
use crate::transport::{Connector, TcpConnector, Transport};
use crate::watchdog::Watchdog;

pub use queue::ConnectionState;

use dispatcher::Dispatcher;
use queue::OutboundBuffer;

/// Control messages for the dispatcher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Signal {
    /// The outbound buffer has work
    Flush,
    /// Caller requested close
    Close,
}

/// State shared between the connection handle and its dispatcher
pub(crate) struct Shared {
    outbound: Mutex<OutboundBuffer>,

    /// Current transport; replaced on reconnect
    transport: Mutex<Arc<dyn Transport>>,

    in_flight: Arc<AtomicUsize>,

    /// Set while a Flush signal is queued and not yet consumed
    wake_pending: AtomicBool,

    wake: Sender<Signal>,
}

impl Shared {
    fn new(transport: Arc<dyn Transport>, wake: Sender<Signal>, capacity: usize) -> Self {
        Self {
            outbound: Mutex::new(OutboundBuffer::new(capacity)),
            transport: Mutex::new(transport),
            in_flight: Arc::new(AtomicUsize::new(0)),
            wake_pending: AtomicBool::new(false),
            wake,
        }
    }

    pub(crate) fn state(&self) -> ConnectionState {
        self.outbound.lock().state()
    }

    pub(crate) fn set_state(&self, next: ConnectionState) -> ConnectionState {
        self.outbound.lock().set_state(next)
    }

    pub(crate) fn pop_outbound(&self) -> Option<Box<dyn Dispatch>> {
        self.outbound.lock().pop()
    }

    pub(crate) fn drain_outbound(&self) -> Vec<Box<dyn Dispatch>> {
        self.outbound.lock().drain()
    }

    pub(crate) fn transport(&self) -> Arc<dyn Transport> {
        Arc::clone(&self.transport.lock())
    }

    pub(crate) fn replace_transport(&self, transport: Arc<dyn Transport>) {
        *self.transport.lock() = transport;
    }

    pub(crate) fn in_flight_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.in_flight)
    }

    /// Ask the dispatcher to run an encode pass, coalescing repeated asks
    fn wake(&self) {
        if !self.wake_pending.swap(true, Ordering::AcqRel) {
            let _ = self.wake.send(Signal::Flush);
        }
    }

    /// Called by the dispatcher before it drains the outbound buffer
    pub(crate) fn clear_wake(&self) {
        self.wake_pending.store(false, Ordering::Release);
    }
}

/// A pipelined connection
///
/// Cheap to share across threads by reference; every method takes `&self`.
pub struct Connection {
    shared: Arc<Shared>,

    endpoint: String,

    options: ClientOptions,

    /// Dispatcher thread, joined on close
    dispatcher: Mutex<Option<JoinHandle<()>>>,

    next_id: AtomicU64,

    has_watchdog: bool,
}

impl Connection {
    /// Connect over TCP
    pub fn connect(endpoint: &str, options: ClientOptions) -> Result<Self> {
        Self::connect_with(Arc::new(TcpConnector), endpoint, options)
    }

    /// Connect through a custom transport connector
    pub fn connect_with(
        connector: Arc<dyn Connector>,
        endpoint: &str,
        options: ClientOptions,
    ) -> Result<Self> {
        options.validate()?;

        let (event_tx, event_rx) = unbounded();
        let transport = connector.open(endpoint, &options, event_tx)?;
        tracing::debug!("Connection to {} established", transport.peer());

        let (wake_tx, wake_rx) = unbounded();
        let shared = Arc::new(Shared::new(transport, wake_tx, options.request_queue_size));

        let watchdog = if options.auto_reconnect {
            Some(Watchdog::new(connector, endpoint, options.clone()))
        } else {
            None
        };
        let has_watchdog = watchdog.is_some();

        let dispatcher = Dispatcher::new(Arc::clone(&shared), event_rx, wake_rx, watchdog);
        let handle = thread::Builder::new()
            .name(format!("kvpipe-dispatcher-{}", endpoint))
            .spawn(move || dispatcher.run())?;

        Ok(Self {
            shared,
            endpoint: endpoint.to_string(),
            options,
            dispatcher: Mutex::new(Some(handle)),
            next_id: AtomicU64::new(1),
            has_watchdog,
        })
    }

    /// Submit a command for dispatch
    ///
    /// Fails fast with `NotConnected` unless the connection is CONNECTED;
    /// a rejected command never enters the outbound buffer.
    pub fn submit<T: Send + 'static>(&self, command: Command<T>) -> Result<CommandHandle<T>> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (entry, handle) = command.prepare(id, self.options.default_timeout);

        {
            let mut outbound = self.shared.outbound.lock();
            if let Err(err) = outbound.admit() {
                tracing::trace!("Rejected {} #{}: {}", handle.name(), id, err);
                return Err(err);
            }
            outbound.push(entry);
        }

        self.shared.wake();
        tracing::trace!("Submitted {} #{}", handle.name(), id);
        Ok(handle)
    }

    /// Submit and wait with the default timeout
    pub fn execute<T: Clone + Send + 'static>(&self, command: Command<T>) -> Result<T> {
        self.submit(command)?.await_result()
    }

    /// Close the connection
    ///
    /// Every buffered and in-flight command is settled with
    /// `ConnectionClosed` before this returns. Idempotent.
    pub fn close(&self) {
        let previous = self.shared.set_state(ConnectionState::Closed);
        if previous != ConnectionState::Closed {
            tracing::debug!("Closing connection to {} (was {})", self.endpoint, previous);
        }

        let _ = self.shared.wake.send(Signal::Close);
        self.shared.transport().close();

        let mut dispatcher = self.dispatcher.lock();
        if let Some(handle) = dispatcher.take() {
            if handle.thread().id() == thread::current().id() {
                // Close requested from inside a decode step; the loop exits on its own.
                return;
            }
            if handle.join().is_err() {
                tracing::warn!("Dispatcher for {} panicked", self.endpoint);
            }
        }

        // The dispatcher drained on its way out; anything left raced the shutdown.
        for command in self.shared.drain_outbound() {
            command.fail(ClientError::closed("connection closed"));
        }
    }

    /// Tear down the transport without closing the connection
    ///
    /// The dispatcher observes the closure, drains every outstanding command,
    /// and moves to DISCONNECTED (or reconnects, with a watchdog).
    pub fn disconnect(&self) {
        tracing::debug!("Disconnecting transport to {}", self.endpoint);
        self.shared.transport().close();
    }

    pub fn state(&self) -> ConnectionState {
        self.shared.state()
    }

    /// Whether new commands are accepted
    pub fn is_open(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Commands submitted but not yet taken for encoding
    pub fn buffered_len(&self) -> usize {
        self.shared.outbound.lock().len()
    }

    /// Commands flushed and awaiting a response
    pub fn in_flight_len(&self) -> usize {
        self.shared.in_flight.load(Ordering::Acquire)
    }

    /// Whether a reconnect watchdog is attached
    pub fn has_watchdog(&self) -> bool {
        self.has_watchdog
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.close();
    }
}
