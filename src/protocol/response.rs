//! Response definitions
//!
//! Represents replies sent back to clients.

use bytes::Bytes;

/// Reply kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ReplyKind {
    Status = 0x00,
    Nil = 0x01,
    Error = 0x02,
    Integer = 0x03,
    Bulk = 0x04,
}

impl ReplyKind {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x00 => Some(ReplyKind::Status),
            0x01 => Some(ReplyKind::Nil),
            0x02 => Some(ReplyKind::Error),
            0x03 => Some(ReplyKind::Integer),
            0x04 => Some(ReplyKind::Bulk),
            _ => None,
        }
    }
}

/// A single server reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Reply kind
    pub kind: ReplyKind,

    /// Raw payload (interpretation depends on kind)
    pub payload: Bytes,
}

impl Response {
    /// Create a STATUS reply (e.g. "OK", "PONG")
    pub fn status(text: &str) -> Self {
        Self {
            kind: ReplyKind::Status,
            payload: Bytes::copy_from_slice(text.as_bytes()),
        }
    }

    /// Create a NIL reply
    pub fn nil() -> Self {
        Self {
            kind: ReplyKind::Nil,
            payload: Bytes::new(),
        }
    }

    /// Create an ERROR reply
    pub fn error(message: &str) -> Self {
        Self {
            kind: ReplyKind::Error,
            payload: Bytes::copy_from_slice(message.as_bytes()),
        }
    }

    /// Create an INTEGER reply
    pub fn integer(value: i64) -> Self {
        Self {
            kind: ReplyKind::Integer,
            payload: Bytes::copy_from_slice(&value.to_be_bytes()),
        }
    }

    /// Create a BULK reply
    pub fn bulk(value: impl Into<Bytes>) -> Self {
        Self {
            kind: ReplyKind::Bulk,
            payload: value.into(),
        }
    }
}
