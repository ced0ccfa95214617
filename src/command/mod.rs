//! Command Module
//!
//! A command is one unit of work: a request payload, the step that encodes
//! it onto the wire, and the step that decodes its single response.
//!
//! ## Ownership
//! ```text
//!   caller ──submit──▶ outbound buffer ──encode ok──▶ in-flight ledger
//!                            │                               │
//!                            ▼ encode failed                 ▼ response
//!                      slot settled ◀────────────────── slot settled
//! ```
//! The caller keeps only a `CommandHandle`; the command itself lives in
//! exactly one container at a time until its slot is settled.

mod slot;
mod handle;
pub mod output;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use bytes::BytesMut;

use crate::error::{ClientError, Result};
use crate::protocol::{encode_request, Request, Response};

pub use handle::CommandHandle;
pub use slot::CommandPhase;

use slot::CompletionSlot;

/// Encode step: writes the wire form of a request into a scratch buffer
pub type Encoder = Box<dyn FnMut(&Request, &mut BytesMut) -> Result<()> + Send>;

/// Decode step: turns the command's response into its output value
pub type Decoder<T> = Box<dyn FnOnce(Response) -> Result<T> + Send>;

/// A command awaiting submission
pub struct Command<T> {
    request: Request,
    encoder: Encoder,
    decoder: Decoder<T>,
}

impl<T: Send + 'static> Command<T> {
    /// Create a command encoded with the standard request codec
    pub fn new<F>(request: Request, decoder: F) -> Self
    where
        F: FnOnce(Response) -> Result<T> + Send + 'static,
    {
        Self {
            request,
            encoder: Box::new(encode_request),
            decoder: Box::new(decoder),
        }
    }

    /// Replace the encode step
    pub fn with_encoder<F>(mut self, encoder: F) -> Self
    where
        F: FnMut(&Request, &mut BytesMut) -> Result<()> + Send + 'static,
    {
        self.encoder = Box::new(encoder);
        self
    }

    /// Replace the decode step, changing the output type
    pub fn with_decoder<U, F>(self, decoder: F) -> Command<U>
    where
        F: FnOnce(Response) -> Result<U> + Send + 'static,
    {
        Command {
            request: self.request,
            encoder: self.encoder,
            decoder: Box::new(decoder),
        }
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn name(&self) -> &'static str {
        self.request.request_type().name()
    }

    /// Wrap for dispatch, returning the dispatch entry and the caller handle
    pub(crate) fn prepare(
        self,
        id: u64,
        default_timeout: Duration,
    ) -> (Box<dyn Dispatch>, CommandHandle<T>) {
        let slot = Arc::new(CompletionSlot::new());
        let handle = CommandHandle::new(id, self.name(), Arc::clone(&slot), default_timeout);
        let pending = Pending {
            id,
            command: Some(self),
            slot,
        };
        (Box::new(pending), handle)
    }
}

impl<T> fmt::Debug for Command<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("request", &self.request)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Type-erased dispatch entry
// =============================================================================

/// What the dispatcher sees of a command, whatever its output type
pub(crate) trait Dispatch: Send {
    fn id(&self) -> u64;

    fn name(&self) -> &'static str;

    /// Move QUEUED → ENCODING; false if the caller cancelled first
    fn begin_encode(&self) -> bool;

    fn encode(&mut self, buf: &mut BytesMut) -> Result<()>;

    fn mark_in_flight(&self);

    /// Decode the response and settle. Returns the decode error, if any.
    fn complete(self: Box<Self>, response: Response) -> Option<ClientError>;

    fn fail(self: Box<Self>, err: ClientError);
}

struct Pending<T> {
    id: u64,
    command: Option<Command<T>>,
    slot: Arc<CompletionSlot<T>>,
}

impl<T: Send + 'static> Dispatch for Pending<T> {
    fn id(&self) -> u64 {
        self.id
    }

    fn name(&self) -> &'static str {
        self.command.as_ref().map(Command::name).unwrap_or("?")
    }

    fn begin_encode(&self) -> bool {
        self.slot.begin_encode()
    }

    fn encode(&mut self, buf: &mut BytesMut) -> Result<()> {
        let command = self
            .command
            .as_mut()
            .ok_or_else(|| ClientError::Encode("command already consumed".to_string()))?;
        (command.encoder)(&command.request, buf).map_err(ClientError::into_encode)
    }

    fn mark_in_flight(&self) {
        self.slot.mark_in_flight();
    }

    fn complete(mut self: Box<Self>, response: Response) -> Option<ClientError> {
        let command = self.command.take()?;
        match (command.decoder)(response) {
            Ok(value) => {
                self.slot.settle(Ok(value));
                None
            }
            Err(err) => {
                self.slot.settle(Err(err.clone()));
                Some(err)
            }
        }
    }

    fn fail(self: Box<Self>, err: ClientError) {
        self.slot.settle(Err(err));
    }
}

impl<T> Drop for Pending<T> {
    fn drop(&mut self) {
        // No command leaves the pipeline unsettled.
        self.slot
            .settle(Err(ClientError::closed("command dropped before completion")));
    }
}
