//! Test server
//!
//! Accepts connections and serves each on its own thread.

use std::collections::HashMap;
use std::io::{BufReader, BufWriter, ErrorKind};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::Mutex;

use super::Store;
use crate::error::{ClientError, Result};
use crate::protocol::{read_request, write_response, Request, Response};

/// State shared by the acceptor and connection threads
struct ServerState {
    store: Arc<Store>,
    shutdown: AtomicBool,

    /// Artificial delay before each reply (milliseconds)
    response_delay_ms: AtomicU64,

    /// Open client sockets by connection id, shut down with the server
    clients: Mutex<HashMap<u64, TcpStream>>,

    next_client_id: AtomicU64,
}

/// In-process protocol server
pub struct TestServer {
    addr: SocketAddr,
    state: Arc<ServerState>,
    acceptor: Option<JoinHandle<()>>,
}

impl TestServer {
    /// Start on an ephemeral localhost port
    pub fn start() -> Result<Self> {
        Self::bind("127.0.0.1:0")
    }

    /// Start on the given address
    pub fn bind(addr: &str) -> Result<Self> {
        let listener = TcpListener::bind(addr)?;
        let addr = listener.local_addr()?;

        let state = Arc::new(ServerState {
            store: Arc::new(Store::new()),
            shutdown: AtomicBool::new(false),
            response_delay_ms: AtomicU64::new(0),
            clients: Mutex::new(HashMap::new()),
            next_client_id: AtomicU64::new(0),
        });

        let accept_state = Arc::clone(&state);
        let acceptor = thread::Builder::new()
            .name("kvpipe-test-acceptor".to_string())
            .spawn(move || accept_loop(listener, accept_state))?;

        tracing::debug!("Test server listening on {}", addr);

        Ok(Self {
            addr,
            state,
            acceptor: Some(acceptor),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Endpoint string for `Connection::connect`
    pub fn endpoint(&self) -> String {
        self.addr.to_string()
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.state.store
    }

    /// Delay every subsequent reply (requests still execute immediately)
    pub fn set_response_delay(&self, delay: Duration) {
        self.state
            .response_delay_ms
            .store(u64::try_from(delay.as_millis()).unwrap_or(u64::MAX), Ordering::Relaxed);
    }

    /// Drop every client connection, keeping the listener up
    pub fn kick_clients(&self) {
        for (_, client) in self.state.clients.lock().drain() {
            let _ = client.shutdown(Shutdown::Both);
        }
    }

    /// Client connections currently being served
    pub fn client_count(&self) -> usize {
        self.state.clients.lock().len()
    }

    /// Block until the acceptor exits
    pub fn wait(mut self) {
        if let Some(acceptor) = self.acceptor.take() {
            let _ = acceptor.join();
        }
    }

    /// Stop accepting and close every client connection
    pub fn shutdown(&mut self) {
        if self.state.shutdown.swap(true, Ordering::AcqRel) {
            return;
        }
        // Wake the blocking accept.
        let _ = TcpStream::connect(self.addr);
        self.kick_clients();
        if let Some(acceptor) = self.acceptor.take() {
            let _ = acceptor.join();
        }
        tracing::debug!("Test server on {} stopped", self.addr);
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn accept_loop(listener: TcpListener, state: Arc<ServerState>) {
    for stream in listener.incoming() {
        if state.shutdown.load(Ordering::Acquire) {
            break;
        }

        let stream = match stream {
            Ok(stream) => stream,
            Err(e) => {
                tracing::warn!("Accept failed: {}", e);
                continue;
            }
        };

        let id = state.next_client_id.fetch_add(1, Ordering::Relaxed);
        let conn_state = Arc::clone(&state);
        let spawned = thread::Builder::new()
            .name("kvpipe-test-conn".to_string())
            .spawn(move || {
                if let Err(e) = serve(id, stream, &conn_state) {
                    tracing::warn!("Server connection error: {}", e);
                }
                conn_state.clients.lock().remove(&id);
            });
        if let Err(e) = spawned {
            tracing::warn!("Failed to spawn connection thread: {}", e);
        }
    }
}

/// Serve one client until it disconnects or sends QUIT
fn serve(id: u64, stream: TcpStream, state: &ServerState) -> Result<()> {
    let peer_addr = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    stream.set_nodelay(true)?;
    state.clients.lock().insert(id, stream.try_clone()?);

    let mut reader = BufReader::new(stream.try_clone()?);
    let mut writer = BufWriter::new(stream);

    tracing::debug!("Connection established from {}", peer_addr);

    loop {
        let request = match read_request(&mut reader) {
            Ok(request) => request,
            Err(ClientError::Io(ref e)) if is_disconnect(e.kind()) => {
                tracing::debug!("Client {} disconnected", peer_addr);
                return Ok(());
            }
            Err(e) => {
                tracing::warn!("Error reading from {}: {}", peer_addr, e);
                let _ = write_response(&mut writer, &Response::error(&e.to_string()));
                return Err(e);
            }
        };

        tracing::trace!("Received request from {}: {:?}", peer_addr, request);
        let response = state.store.execute(&request);

        let delay = state.response_delay_ms.load(Ordering::Relaxed);
        if delay > 0 {
            thread::sleep(Duration::from_millis(delay));
        }

        match write_response(&mut writer, &response) {
            Ok(()) => {}
            Err(ClientError::Io(ref e)) if is_disconnect(e.kind()) => {
                tracing::debug!("Client {} disconnected before response could be sent", peer_addr);
                return Ok(());
            }
            Err(e) => return Err(e),
        }

        if request == Request::Quit {
            tracing::debug!("Client {} quit", peer_addr);
            let _ = writer.get_ref().shutdown(Shutdown::Both);
            return Ok(());
        }
    }
}

fn is_disconnect(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::UnexpectedEof
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::BrokenPipe
            | ErrorKind::NotConnected
    )
}
