//! TCP transport
//!
//! Blocking `std::net` socket with a dedicated reader thread.

use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use bytes::Bytes;
use crossbeam::channel::Sender;

use super::{Connector, Transport, TransportEvent};
use crate::config::ClientOptions;
use crate::error::{ClientError, Result};

/// Opens `TcpTransport`s
#[derive(Debug, Default, Clone, Copy)]
pub struct TcpConnector;

impl Connector for TcpConnector {
    fn open(
        &self,
        endpoint: &str,
        options: &ClientOptions,
        events: Sender<TransportEvent>,
    ) -> Result<Arc<dyn Transport>> {
        let transport = TcpTransport::connect(endpoint, options, events)?;
        Ok(Arc::new(transport))
    }
}

/// A connected TCP socket
pub struct TcpTransport {
    stream: TcpStream,

    /// Cleared by `close()` or when the reader sees EOF
    open: Arc<AtomicBool>,

    /// Peer address for logging
    peer_addr: String,
}

impl TcpTransport {
    /// Connect and start the reader thread
    pub fn connect(
        endpoint: &str,
        options: &ClientOptions,
        events: Sender<TransportEvent>,
    ) -> Result<Self> {
        let stream = Self::connect_any(endpoint, options)?;

        let peer_addr = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| endpoint.to_string());

        if options.tcp_nodelay {
            stream.set_nodelay(true)?;
        }

        let open = Arc::new(AtomicBool::new(true));
        let read_stream = stream.try_clone()?;
        let reader_open = Arc::clone(&open);
        let reader_peer = peer_addr.clone();
        let chunk_size = options.read_buffer_size;

        thread::Builder::new()
            .name(format!("kvpipe-reader-{}", peer_addr))
            .spawn(move || read_loop(read_stream, reader_open, events, chunk_size, reader_peer))?;

        tracing::debug!("Connected to {}", peer_addr);

        Ok(Self {
            stream,
            open,
            peer_addr,
        })
    }

    /// Try each resolved address in turn
    fn connect_any(endpoint: &str, options: &ClientOptions) -> Result<TcpStream> {
        let mut last_err = None;
        for addr in endpoint.to_socket_addrs()? {
            match TcpStream::connect_timeout(&addr, options.connect_timeout) {
                Ok(stream) => return Ok(stream),
                Err(e) => last_err = Some(e),
            }
        }
        Err(match last_err {
            Some(e) => e.into(),
            None => ClientError::Config(format!("endpoint {} resolved to no addresses", endpoint)),
        })
    }
}

impl Transport for TcpTransport {
    fn write(&self, bytes: &[u8]) -> io::Result<()> {
        (&self.stream).write_all(bytes)
    }

    fn flush(&self) -> io::Result<()> {
        (&self.stream).flush()
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    fn close(&self) {
        if self.open.swap(false, Ordering::AcqRel) {
            tracing::debug!("Closing transport to {}", self.peer_addr);
            // The reader wakes up with EOF and reports closure.
            let _ = self.stream.shutdown(Shutdown::Both);
        }
    }

    fn peer(&self) -> &str {
        &self.peer_addr
    }
}

impl Drop for TcpTransport {
    fn drop(&mut self) {
        self.close();
    }
}

/// Forward inbound chunks until EOF or error
fn read_loop(
    mut stream: TcpStream,
    open: Arc<AtomicBool>,
    events: Sender<TransportEvent>,
    chunk_size: usize,
    peer_addr: String,
) {
    let mut buf = vec![0u8; chunk_size];

    let reason = loop {
        match stream.read(&mut buf) {
            Ok(0) => break "peer closed the connection".to_string(),
            Ok(n) => {
                tracing::trace!("Read {} bytes from {}", n, peer_addr);
                if events
                    .send(TransportEvent::Data(Bytes::copy_from_slice(&buf[..n])))
                    .is_err()
                {
                    // Dispatcher is gone; nobody to report to.
                    open.store(false, Ordering::Release);
                    return;
                }
            }
            Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => break e.to_string(),
        }
    };

    open.store(false, Ordering::Release);
    let _ = stream.shutdown(Shutdown::Both);
    tracing::debug!("Transport to {} closed: {}", peer_addr, reason);
    let _ = events.send(TransportEvent::Closed(reason));
}
