//! Request definitions
//!
//! Represents commands sent by clients.

use bytes::Bytes;

/// Request types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RequestType {
    Get = 0x01,
    Set = 0x02,
    Del = 0x03,
    Ping = 0x04,
    Incr = 0x05,
    Quit = 0x06,
    FlushAll = 0x07,
}

impl RequestType {
    /// Upper-case command name, used in logs
    pub fn name(&self) -> &'static str {
        match self {
            RequestType::Get => "GET",
            RequestType::Set => "SET",
            RequestType::Del => "DEL",
            RequestType::Ping => "PING",
            RequestType::Incr => "INCR",
            RequestType::Quit => "QUIT",
            RequestType::FlushAll => "FLUSHALL",
        }
    }
}

/// A request payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Get a value by key
    Get { key: Bytes },

    /// Set a key-value pair
    Set { key: Bytes, value: Bytes },

    /// Delete a key
    Del { key: Bytes },

    /// Ping (health check)
    Ping,

    /// Increment the integer stored at key
    Incr { key: Bytes },

    /// Ask the server to close the connection
    Quit,

    /// Remove every key
    FlushAll,
}

impl Request {
    /// Get the request type
    pub fn request_type(&self) -> RequestType {
        match self {
            Request::Get { .. } => RequestType::Get,
            Request::Set { .. } => RequestType::Set,
            Request::Del { .. } => RequestType::Del,
            Request::Ping => RequestType::Ping,
            Request::Incr { .. } => RequestType::Incr,
            Request::Quit => RequestType::Quit,
            Request::FlushAll => RequestType::FlushAll,
        }
    }

    /// The key this request touches, if any
    pub fn key(&self) -> Option<&Bytes> {
        match self {
            Request::Get { key }
            | Request::Set { key, .. }
            | Request::Del { key }
            | Request::Incr { key } => Some(key),
            Request::Ping | Request::Quit | Request::FlushAll => None,
        }
    }
}
