//! Protocol Module
//!
//! Defines the wire protocol spoken between client and server.
//!
//! ## Request Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │ Cmd (1)  │ Len (4)  │         Payload             │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//!
//! ### Commands
//! - 0x01: GET      - Payload: key_len (4) + key
//! - 0x02: SET      - Payload: key_len (4) + key + value
//! - 0x03: DEL      - Payload: key_len (4) + key
//! - 0x04: PING     - Payload: empty
//! - 0x05: INCR     - Payload: key_len (4) + key
//! - 0x06: QUIT     - Payload: empty
//! - 0x07: FLUSHALL - Payload: empty
//!
//! ## Response Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │ Kind (1) │ Len (4)  │         Payload             │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//!
//! ### Reply Kinds
//! - 0x00: STATUS  - UTF-8 text
//! - 0x01: NIL     - empty
//! - 0x02: ERROR   - UTF-8 message
//! - 0x03: INTEGER - 8 byte big-endian i64
//! - 0x04: BULK    - raw bytes
//!
//! The server answers every request with exactly one response, in order.

mod request;
mod response;
mod codec;

pub use request::{Request, RequestType};
pub use response::{ReplyKind, Response};
pub use codec::{
    decode_request, encode_request, encode_response, parse_response, read_request,
    write_response, HEADER_SIZE, MAX_PAYLOAD_SIZE,
};
