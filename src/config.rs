//! Configuration for kvpipe
//!
//! Centralized client options with sensible defaults. A `ClientOptions`
//! value is handed to every connection at build time; nothing is global.

use std::time::Duration;

use crate::error::{ClientError, Result};

/// Options shared by every connection a client builds
#[derive(Debug, Clone)]
pub struct ClientOptions {
    // -------------------------------------------------------------------------
    // Reconnection
    // -------------------------------------------------------------------------
    /// Attach a reconnect watchdog to each connection.
    /// When false, drain-and-fail is the only recovery path.
    pub auto_reconnect: bool,

    /// First backoff delay between reconnect attempts
    pub reconnect_delay: Duration,

    /// Upper bound for the exponential backoff
    pub max_reconnect_delay: Duration,

    /// Give up after this many failed attempts (None = keep trying)
    pub max_reconnect_attempts: Option<u32>,

    // -------------------------------------------------------------------------
    // Command Configuration
    // -------------------------------------------------------------------------
    /// Await bound used by `CommandHandle::await_result`
    pub default_timeout: Duration,

    /// Max commands held in the outbound buffer
    pub request_queue_size: usize,

    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// TCP connect timeout
    pub connect_timeout: Duration,

    /// Disable Nagle's algorithm
    pub tcp_nodelay: bool,

    /// Size of each inbound read (bytes)
    pub read_buffer_size: usize,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            auto_reconnect: false,
            reconnect_delay: Duration::from_millis(100),
            max_reconnect_delay: Duration::from_secs(30),
            max_reconnect_attempts: None,
            default_timeout: Duration::from_secs(60),
            request_queue_size: usize::MAX,
            connect_timeout: Duration::from_secs(10),
            tcp_nodelay: true,
            read_buffer_size: 8 * 1024, // 8 KB
        }
    }
}

impl ClientOptions {
    /// Create a new options builder
    pub fn builder() -> ClientOptionsBuilder {
        ClientOptionsBuilder::default()
    }

    /// Reject values the dispatcher cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.default_timeout.is_zero() {
            return Err(ClientError::Config("default_timeout must be non-zero".to_string()));
        }
        if self.connect_timeout.is_zero() {
            return Err(ClientError::Config("connect_timeout must be non-zero".to_string()));
        }
        if self.request_queue_size == 0 {
            return Err(ClientError::Config("request_queue_size must be at least 1".to_string()));
        }
        if self.read_buffer_size == 0 {
            return Err(ClientError::Config("read_buffer_size must be non-zero".to_string()));
        }
        if self.reconnect_delay > self.max_reconnect_delay {
            return Err(ClientError::Config(format!(
                "reconnect_delay ({:?}) exceeds max_reconnect_delay ({:?})",
                self.reconnect_delay, self.max_reconnect_delay
            )));
        }
        Ok(())
    }
}

/// Builder for ClientOptions
#[derive(Default)]
pub struct ClientOptionsBuilder {
    options: ClientOptions,
}

impl ClientOptionsBuilder {
    /// Enable or disable the reconnect watchdog
    pub fn auto_reconnect(mut self, enabled: bool) -> Self {
        self.options.auto_reconnect = enabled;
        self
    }

    /// Set the initial reconnect backoff
    pub fn reconnect_delay(mut self, delay: Duration) -> Self {
        self.options.reconnect_delay = delay;
        self
    }

    /// Set the reconnect backoff ceiling
    pub fn max_reconnect_delay(mut self, delay: Duration) -> Self {
        self.options.max_reconnect_delay = delay;
        self
    }

    /// Limit the number of reconnect attempts
    pub fn max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.options.max_reconnect_attempts = Some(attempts);
        self
    }

    /// Set the default await bound for command handles
    pub fn default_timeout(mut self, timeout: Duration) -> Self {
        self.options.default_timeout = timeout;
        self
    }

    /// Bound the outbound buffer
    pub fn request_queue_size(mut self, size: usize) -> Self {
        self.options.request_queue_size = size;
        self
    }

    /// Set the TCP connect timeout
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.options.connect_timeout = timeout;
        self
    }

    pub fn tcp_nodelay(mut self, enabled: bool) -> Self {
        self.options.tcp_nodelay = enabled;
        self
    }

    /// Set the inbound read chunk size (in bytes)
    pub fn read_buffer_size(mut self, size: usize) -> Self {
        self.options.read_buffer_size = size;
        self
    }

    pub fn build(self) -> ClientOptions {
        self.options
    }
}
