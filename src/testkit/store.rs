//! In-memory store
//!
//! Executes requests against a map shared by every server connection.

use std::collections::HashMap;

use bytes::Bytes;
use parking_lot::Mutex;

use crate::protocol::{Request, Response};

/// Shared key-value map
#[derive(Default)]
pub struct Store {
    data: Mutex<HashMap<Bytes, Bytes>>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Execute a request and build its reply
    pub fn execute(&self, request: &Request) -> Response {
        match request {
            Request::Get { key } => match self.data.lock().get(key) {
                Some(value) => Response::bulk(value.clone()),
                None => Response::nil(),
            },
            Request::Set { key, value } => {
                self.data.lock().insert(key.clone(), value.clone());
                Response::status("OK")
            }
            Request::Del { key } => {
                let removed = self.data.lock().remove(key).is_some();
                Response::integer(removed as i64)
            }
            Request::Ping => Response::status("PONG"),
            Request::Incr { key } => self.incr(key),
            Request::Quit => Response::status("OK"),
            Request::FlushAll => {
                self.data.lock().clear();
                Response::status("OK")
            }
        }
    }

    /// Read a value directly, bypassing the protocol
    pub fn get(&self, key: &[u8]) -> Option<Bytes> {
        self.data.lock().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.data.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.lock().is_empty()
    }

    fn incr(&self, key: &Bytes) -> Response {
        let mut data = self.data.lock();

        let current = match data.get(key) {
            None => 0,
            Some(raw) => match std::str::from_utf8(raw).ok().and_then(|s| s.parse::<i64>().ok()) {
                Some(n) => n,
                None => return Response::error("ERR value is not an integer"),
            },
        };

        let Some(next) = current.checked_add(1) else {
            return Response::error("ERR increment would overflow");
        };

        data.insert(key.clone(), Bytes::from(next.to_string()));
        Response::integer(next)
    }
}
