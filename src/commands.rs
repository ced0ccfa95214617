//! Typed command builders
//!
//! ```ignore
//! let handle = connection.submit(commands::incr("counter"))?;
//! let value: i64 = handle.await_result()?;
//! ```

use bytes::Bytes;

use crate::command::{output, Command};
use crate::protocol::Request;

fn key_bytes(key: impl AsRef<[u8]>) -> Bytes {
    Bytes::copy_from_slice(key.as_ref())
}

/// GET key
pub fn get(key: impl AsRef<[u8]>) -> Command<Option<String>> {
    Command::new(Request::Get { key: key_bytes(key) }, output::text)
}

/// GET key, raw bytes
pub fn get_bytes(key: impl AsRef<[u8]>) -> Command<Option<Bytes>> {
    Command::new(Request::Get { key: key_bytes(key) }, output::bulk)
}

/// SET key value
pub fn set(key: impl AsRef<[u8]>, value: impl AsRef<[u8]>) -> Command<String> {
    Command::new(
        Request::Set {
            key: key_bytes(key),
            value: key_bytes(value),
        },
        output::status,
    )
}

/// DEL key, replies with the number of keys removed
pub fn del(key: impl AsRef<[u8]>) -> Command<i64> {
    Command::new(Request::Del { key: key_bytes(key) }, output::integer)
}

/// INCR key, replies with the new value
pub fn incr(key: impl AsRef<[u8]>) -> Command<i64> {
    Command::new(Request::Incr { key: key_bytes(key) }, output::integer)
}

pub fn ping() -> Command<String> {
    Command::new(Request::Ping, output::status)
}

/// QUIT: the server acknowledges and then closes the connection
pub fn quit() -> Command<String> {
    Command::new(Request::Quit, output::status)
}

pub fn flushall() -> Command<String> {
    Command::new(Request::FlushAll, output::status)
}
