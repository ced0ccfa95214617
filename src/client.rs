//! Client
//!
//! Pairs an endpoint with the options every connection it opens will use.

use std::sync::Arc;

use crate::config::ClientOptions;
use crate::connection::Connection;
use crate::error::Result;
use crate::transport::{Connector, TcpConnector};

/// Connection factory for one endpoint
#[derive(Clone)]
pub struct Client {
    endpoint: String,
    options: ClientOptions,
    connector: Arc<dyn Connector>,
}

impl Client {
    /// Create a client for `endpoint` ("host:port") with default options
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self::with_options(endpoint, ClientOptions::default())
    }

    pub fn with_options(endpoint: impl Into<String>, options: ClientOptions) -> Self {
        Self {
            endpoint: endpoint.into(),
            options,
            connector: Arc::new(TcpConnector),
        }
    }

    /// Use a custom transport connector
    pub fn with_connector(mut self, connector: Arc<dyn Connector>) -> Self {
        self.connector = connector;
        self
    }

    /// Replace the options used by connections opened from now on
    pub fn set_options(&mut self, options: ClientOptions) {
        self.options = options;
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Open a new connection
    pub fn connect(&self) -> Result<Connection> {
        Connection::connect_with(Arc::clone(&self.connector), &self.endpoint, self.options.clone())
    }
}
