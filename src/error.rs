//! Error types for kvpipe
//!
//! Provides a unified error type for all operations. Every outcome a caller
//! can observe on a command handle is one of these variants.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

/// Result type alias using ClientError
pub type Result<T> = std::result::Result<T, ClientError>;

/// Unified error type for kvpipe operations
///
/// Cloneable so a settled outcome can be read from every clone of a handle.
#[derive(Debug, Clone, Error)]
pub enum ClientError {
    // -------------------------------------------------------------------------
    // Command Errors
    // -------------------------------------------------------------------------
    /// Encoding failed; the command was never sent
    #[error("Encode error: {0}")]
    Encode(String),

    /// Response arrived but could not be decoded; the command was sent
    #[error("Decode error: {0}")]
    Decode(String),

    /// The server answered with an error reply
    #[error("Server error: {0}")]
    Server(String),

    #[error("Command cancelled")]
    Cancelled,

    /// Caller stopped waiting; the command itself is untouched
    #[error("Command timed out after {0:?}")]
    Timeout(Duration),

    // -------------------------------------------------------------------------
    // Connection Errors
    // -------------------------------------------------------------------------
    /// Submission rejected before entering any queue
    #[error("Connection is not connected")]
    NotConnected,

    /// Drained at disconnect or close; transmission status unknown
    #[error("Connection closed: {0}")]
    ConnectionClosed(String),

    #[error("Outbound buffer full ({0} commands)")]
    QueueFull(usize),

    #[error("Protocol error: {0}")]
    Protocol(String),

    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(Arc<std::io::Error>),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        ClientError::Io(Arc::new(err))
    }
}

impl ClientError {
    /// Shorthand for a `ConnectionClosed` with a reason
    pub fn closed(reason: impl Into<String>) -> Self {
        ClientError::ConnectionClosed(reason.into())
    }

    /// Re-tag any failure raised by an encode step as `Encode`
    pub(crate) fn into_encode(self) -> Self {
        match self {
            ClientError::Encode(_) => self,
            other => ClientError::Encode(other.to_string()),
        }
    }

    pub fn is_connection_closed(&self) -> bool {
        matches!(self, ClientError::ConnectionClosed(_))
    }
}
