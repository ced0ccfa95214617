//! # kvpipe
//!
//! The dispatch core of a pipelined key-value client:
//! - One connection, many concurrent callers
//! - Strict request/response ordering, no request ids on the wire
//! - At-most-once transmission: nothing is ever resent
//! - Every submitted command settles exactly once
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Caller Threads                           │
//! │              submit() / await_result()                       │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ push (mutex, O(1))
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                   Outbound Buffer                            │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                 Dispatcher Thread                            │
//! │        encode ─▶ ledger ─▶ flush     decode ◀─ inbound       │
//! └──────────┬──────────────────────────────────▲───────────────┘
//!            │                                  │
//!            ▼                                  │
//!   ┌─────────────────┐                ┌────────┴────────┐
//!   │    Transport    │───────────────▶│  Reader Thread  │
//!   │     (write)     │     server     │   (events)      │
//!   └─────────────────┘                └─────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod protocol;
pub mod command;
pub mod commands;
pub mod transport;
pub mod connection;
pub mod client;
pub mod testkit;

mod watchdog;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{ClientError, Result};
pub use config::ClientOptions;
pub use command::{Command, CommandHandle, CommandPhase};
pub use connection::{Connection, ConnectionState};
pub use client::Client;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of kvpipe
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
