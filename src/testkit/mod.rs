//! Testkit Module
//!
//! An in-process server speaking the wire protocol against an in-memory
//! store. Used by the integration tests, the benchmarks and the
//! `kvpipe-server` binary.
//!
//! ## Architecture
//! - Single acceptor thread
//! - One thread per client connection
//! - Requests routed through `Store::execute`

mod server;
mod store;

pub use server::TestServer;
pub use store::Store;
