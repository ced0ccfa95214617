//! Transport Module
//!
//! The byte pipe under a connection. The dispatcher writes and flushes
//! through `Transport`; inbound chunks and closure notices arrive on a
//! channel as `TransportEvent`s.
//!
//! ## Architecture
//! - `Connector::open` establishes the transport and starts its reader
//! - Reader side pushes `Data` / `Closed` events to the dispatcher
//! - `close()` may be called from any thread

mod tcp;

use std::io;
use std::sync::Arc;

use bytes::Bytes;
use crossbeam::channel::Sender;

use crate::config::ClientOptions;
use crate::error::Result;

pub use tcp::{TcpConnector, TcpTransport};

/// Notification from the transport's inbound side
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// A chunk of inbound bytes (not aligned to frames)
    Data(Bytes),

    /// The transport is gone; no more data will follow
    Closed(String),
}

/// Outbound side of an open transport
pub trait Transport: Send + Sync {
    /// Queue bytes for sending
    fn write(&self, bytes: &[u8]) -> io::Result<()>;

    /// Push queued bytes to the peer
    fn flush(&self) -> io::Result<()>;

    fn is_open(&self) -> bool;

    /// Tear the transport down. Idempotent.
    fn close(&self);

    /// Peer description for logs
    fn peer(&self) -> &str;
}

/// Opens transports to an endpoint
pub trait Connector: Send + Sync {
    fn open(
        &self,
        endpoint: &str,
        options: &ClientOptions,
        events: Sender<TransportEvent>,
    ) -> Result<Arc<dyn Transport>>;
}
