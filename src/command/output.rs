//! Output decoders
//!
//! Decode steps for the reply shapes the protocol defines. An ERROR reply
//! is a successful decode of a server failure and maps to
//! `ClientError::Server`; any other unexpected shape is a `Decode` error.

use bytes::Bytes;

use crate::error::{ClientError, Result};
use crate::protocol::{ReplyKind, Response};

/// STATUS reply as text ("OK", "PONG")
pub fn status(response: Response) -> Result<String> {
    match response.kind {
        ReplyKind::Status => utf8(response.payload),
        _ => Err(unexpected("status", response)),
    }
}

/// INTEGER reply
pub fn integer(response: Response) -> Result<i64> {
    match response.kind {
        ReplyKind::Integer => {
            let raw: [u8; 8] = response.payload.as_ref().try_into().map_err(|_| {
                ClientError::Decode(format!(
                    "integer reply must be 8 bytes, got {}",
                    response.payload.len()
                ))
            })?;
            Ok(i64::from_be_bytes(raw))
        }
        _ => Err(unexpected("integer", response)),
    }
}

/// BULK reply, NIL as `None`
pub fn bulk(response: Response) -> Result<Option<Bytes>> {
    match response.kind {
        ReplyKind::Bulk => Ok(Some(response.payload)),
        ReplyKind::Nil => Ok(None),
        _ => Err(unexpected("bulk", response)),
    }
}

/// BULK reply as UTF-8 text, NIL as `None`
pub fn text(response: Response) -> Result<Option<String>> {
    bulk(response)?.map(utf8).transpose()
}

fn utf8(payload: Bytes) -> Result<String> {
    String::from_utf8(payload.to_vec())
        .map_err(|e| ClientError::Decode(format!("reply is not valid UTF-8: {}", e)))
}

fn unexpected(expected: &str, response: Response) -> ClientError {
    if response.kind == ReplyKind::Error {
        return ClientError::Server(String::from_utf8_lossy(&response.payload).into_owned());
    }
    ClientError::Decode(format!(
        "expected {} reply, got {:?}",
        expected, response.kind
    ))
}
