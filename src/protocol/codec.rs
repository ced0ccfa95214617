//! Protocol codec
//!
//! Encoding and decoding functions for the wire protocol.
//!
//! ## Wire Format
//!
//! ### Request Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │ Cmd (1)  │ Len (4)  │         Payload             │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//!
//! ### Payload by Request Type
//! - GET, DEL, INCR: key_len (4 bytes) + key
//! - SET:            key_len (4 bytes) + key + value
//! - PING, QUIT, FLUSHALL: empty
//!
//! ### Response Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │ Kind (1) │ Len (4)  │         Payload             │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```

use std::io::{Read, Write};

use bytes::{Buf, BufMut, Bytes, BytesMut};

use super::{ReplyKind, Request, RequestType, Response};
use crate::error::{ClientError, Result};

/// Header size: 1 byte command/kind + 4 bytes length
pub const HEADER_SIZE: usize = 5;

/// Maximum payload size (16 MB)
pub const MAX_PAYLOAD_SIZE: u32 = 16 * 1024 * 1024;

// =============================================================================
// Request Encoding/Decoding
// =============================================================================

/// Encode a request into `buf`
///
/// Format: cmd_type (1) + payload_len (4) + payload.
/// Fails without touching `buf` when the payload exceeds `MAX_PAYLOAD_SIZE`.
pub fn encode_request(request: &Request, buf: &mut BytesMut) -> Result<()> {
    let payload_len = match request {
        Request::Get { key } | Request::Del { key } | Request::Incr { key } => 4 + key.len(),
        Request::Set { key, value } => 4 + key.len() + value.len(),
        Request::Ping | Request::Quit | Request::FlushAll => 0,
    };

    if payload_len > MAX_PAYLOAD_SIZE as usize {
        return Err(ClientError::Encode(format!(
            "{} payload too large: {} bytes (max {})",
            request.request_type().name(),
            payload_len,
            MAX_PAYLOAD_SIZE
        )));
    }

    buf.reserve(HEADER_SIZE + payload_len);
    buf.put_u8(request.request_type() as u8);
    buf.put_u32(payload_len as u32);

    match request {
        Request::Get { key } | Request::Del { key } | Request::Incr { key } => {
            buf.put_u32(key.len() as u32);
            buf.put_slice(key);
        }
        Request::Set { key, value } => {
            buf.put_u32(key.len() as u32);
            buf.put_slice(key);
            buf.put_slice(value);
        }
        Request::Ping | Request::Quit | Request::FlushAll => {}
    }

    Ok(())
}

/// Decode a request from a complete frame
pub fn decode_request(bytes: &[u8]) -> Result<Request> {
    if bytes.len() < HEADER_SIZE {
        return Err(ClientError::Protocol(format!(
            "Incomplete header: expected {} bytes, got {}",
            HEADER_SIZE,
            bytes.len()
        )));
    }

    let cmd_type = bytes[0];
    let payload_len = u32::from_be_bytes([bytes[1], bytes[2], bytes[3], bytes[4]]) as usize;

    if payload_len > MAX_PAYLOAD_SIZE as usize {
        return Err(ClientError::Protocol(format!(
            "Payload too large: {} bytes (max {})",
            payload_len, MAX_PAYLOAD_SIZE
        )));
    }

    let total_len = HEADER_SIZE + payload_len;
    if bytes.len() < total_len {
        return Err(ClientError::Protocol(format!(
            "Incomplete payload: expected {} bytes, got {}",
            total_len,
            bytes.len()
        )));
    }

    let payload = &bytes[HEADER_SIZE..total_len];

    match cmd_type {
        0x01 => Ok(Request::Get { key: decode_key(RequestType::Get, payload)?.0 }),
        0x02 => {
            let (key, rest) = decode_key(RequestType::Set, payload)?;
            Ok(Request::Set {
                key,
                value: Bytes::copy_from_slice(rest),
            })
        }
        0x03 => Ok(Request::Del { key: decode_key(RequestType::Del, payload)?.0 }),
        0x04 => expect_empty(RequestType::Ping, payload).map(|_| Request::Ping),
        0x05 => Ok(Request::Incr { key: decode_key(RequestType::Incr, payload)?.0 }),
        0x06 => expect_empty(RequestType::Quit, payload).map(|_| Request::Quit),
        0x07 => expect_empty(RequestType::FlushAll, payload).map(|_| Request::FlushAll),
        _ => Err(ClientError::Protocol(format!(
            "Unknown command type: 0x{:02x}",
            cmd_type
        ))),
    }
}

/// Split `key_len + key` off the front of a payload
fn decode_key(kind: RequestType, payload: &[u8]) -> Result<(Bytes, &[u8])> {
    if payload.len() < 4 {
        return Err(ClientError::Protocol(format!(
            "{} command: missing key length",
            kind.name()
        )));
    }

    let key_len = u32::from_be_bytes([payload[0], payload[1], payload[2], payload[3]]) as usize;

    if payload.len() < 4 + key_len {
        return Err(ClientError::Protocol(format!(
            "{} command: incomplete key (expected {}, got {})",
            kind.name(),
            key_len,
            payload.len() - 4
        )));
    }

    let key = Bytes::copy_from_slice(&payload[4..4 + key_len]);
    Ok((key, &payload[4 + key_len..]))
}

fn expect_empty(kind: RequestType, payload: &[u8]) -> Result<()> {
    if !payload.is_empty() {
        return Err(ClientError::Protocol(format!(
            "{} command: unexpected payload of {} bytes",
            kind.name(),
            payload.len()
        )));
    }
    Ok(())
}

// =============================================================================
// Response Encoding/Decoding
// =============================================================================

/// Encode a response to bytes
///
/// Format: kind (1) + payload_len (4) + payload
pub fn encode_response(response: &Response) -> Vec<u8> {
    let mut message = Vec::with_capacity(HEADER_SIZE + response.payload.len());
    message.push(response.kind as u8);
    message.extend_from_slice(&(response.payload.len() as u32).to_be_bytes());
    message.extend_from_slice(&response.payload);
    message
}

/// Take one complete response off the front of `buf`
///
/// Returns `Ok(None)` while the frame is still incomplete. A bad header is a
/// framing error: the stream can no longer be trusted.
pub fn parse_response(buf: &mut BytesMut) -> Result<Option<Response>> {
    if buf.len() < HEADER_SIZE {
        return Ok(None);
    }

    let kind_byte = buf[0];
    let kind = ReplyKind::from_byte(kind_byte).ok_or_else(|| {
        ClientError::Protocol(format!("Unknown response kind: 0x{:02x}", kind_byte))
    })?;

    let payload_len = u32::from_be_bytes([buf[1], buf[2], buf[3], buf[4]]) as usize;
    if payload_len > MAX_PAYLOAD_SIZE as usize {
        return Err(ClientError::Protocol(format!(
            "Response payload too large: {} bytes (max {})",
            payload_len, MAX_PAYLOAD_SIZE
        )));
    }

    if buf.len() < HEADER_SIZE + payload_len {
        return Ok(None);
    }

    buf.advance(HEADER_SIZE);
    let payload = buf.split_to(payload_len).freeze();

    Ok(Some(Response { kind, payload }))
}

// =============================================================================
// Stream-based I/O helpers
// =============================================================================

/// Read a complete request from a stream
///
/// Blocks until a complete request is received or an error occurs
pub fn read_request<R: Read>(reader: &mut R) -> Result<Request> {
    let mut header = [0u8; HEADER_SIZE];
    reader.read_exact(&mut header)?;

    let payload_len = u32::from_be_bytes([header[1], header[2], header[3], header[4]]) as usize;

    if payload_len > MAX_PAYLOAD_SIZE as usize {
        return Err(ClientError::Protocol(format!(
            "Payload too large: {} bytes (max {})",
            payload_len, MAX_PAYLOAD_SIZE
        )));
    }

    let mut full_message = vec![0u8; HEADER_SIZE + payload_len];
    full_message[..HEADER_SIZE].copy_from_slice(&header);
    if payload_len > 0 {
        reader.read_exact(&mut full_message[HEADER_SIZE..])?;
    }

    decode_request(&full_message)
}

/// Write a response to a stream
pub fn write_response<W: Write>(writer: &mut W, response: &Response) -> Result<()> {
    let bytes = encode_response(response);
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(())
}
