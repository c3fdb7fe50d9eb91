//! Transport-facing abstractions
//!
//! The poller never speaks the wire protocol itself. It talks to a transport
//! through two small traits:
//!
//! - [`Connector`] opens a session to an [`Endpoint`].
//! - [`Session`] performs reads on that session and closes it.
//!
//! Implementations live in [`crate::simulated`] (in-process server) and
//! `crate::opcua_transport` (feature `opcua_client`).
//!
//! # Design Philosophy
//!
//! Like the other capability traits in this crate, both are async
//! (`#[async_trait]`), `Send + Sync`, and take `&self`. A session is used by
//! one poll at a time, but implementations still use interior mutability for
//! their own state.

use crate::error::{PollerError, PollerResult, ReadError, TransportError};
use crate::request::ReadRequest;
use crate::value::DataValue;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};
use url::Url;

/// URL schemes with a transport behind them.
pub const SUPPORTED_SCHEMES: &[&str] = &["opc.tcp", "sim"];

/// A validated connection target such as `opc.tcp://localhost:14840`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    url: Url,
}

impl Endpoint {
    /// Validate `input` as `<scheme>://<host>[:port][/path]` with a supported scheme.
    pub fn parse(input: &str) -> PollerResult<Self> {
        let input = input.trim();
        if input.is_empty() {
            return Err(PollerError::Configuration("endpoint is empty".to_string()));
        }

        let url = Url::parse(input).map_err(|e| {
            PollerError::Configuration(format!("endpoint '{input}' is not a valid URL: {e}"))
        })?;

        if !SUPPORTED_SCHEMES.contains(&url.scheme()) {
            return Err(PollerError::Configuration(format!(
                "endpoint '{input}' has unsupported scheme '{}'. Must be one of: {}",
                url.scheme(),
                SUPPORTED_SCHEMES.join(", ")
            )));
        }

        if url.host_str().map_or(true, str::is_empty) {
            return Err(PollerError::Configuration(format!(
                "endpoint '{input}' has no host"
            )));
        }

        Ok(Self { url })
    }

    /// Full URL.
    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }

    /// Scheme without `://`.
    pub fn scheme(&self) -> &str {
        self.url.scheme()
    }
}

impl FromStr for Endpoint {
    type Err = PollerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Endpoint::parse(s)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.url.as_str())
    }
}

/// Message security applied on the secure channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecurityMode {
    #[default]
    None,
    Sign,
    SignAndEncrypt,
}

impl fmt::Display for SecurityMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SecurityMode::None => "none",
            SecurityMode::Sign => "sign",
            SecurityMode::SignAndEncrypt => "sign_and_encrypt",
        };
        f.write_str(s)
    }
}

/// Settings handed to a transport when it is constructed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransportConfig {
    /// Verbose protocol-level tracing inside the transport
    pub debug: bool,
    /// Application name announced to the server
    pub application_name: String,
}

impl TransportConfig {
    /// Config with the crate's application name.
    pub fn new(debug: bool) -> Self {
        Self {
            debug,
            application_name: "ua_poller".to_string(),
        }
    }
}

/// Capability: open sessions.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Establish a session. No retries happen at this layer.
    async fn connect(
        &self,
        endpoint: &Endpoint,
        mode: SecurityMode,
    ) -> Result<Box<dyn Session>, TransportError>;
}

/// Capability: read from and close an open session.
#[async_trait]
pub trait Session: Send + Sync {
    /// Issue one read. Returns one [`DataValue`] per requested node on success.
    async fn read(&self, request: &ReadRequest) -> Result<Vec<DataValue>, ReadError>;

    /// Release the session.
    async fn close(&self) -> Result<(), TransportError>;
}

/// Lifecycle of a [`Connection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connected,
    Closed,
}

/// A live session plus the endpoint it belongs to.
///
/// Created by [`PollingReadClient::connect`](crate::poller::PollingReadClient::connect).
/// [`close`](Connection::close) consumes the handle, so release happens at most
/// once; dropping a connection that was never closed is logged.
pub struct Connection {
    endpoint: Endpoint,
    session: Box<dyn Session>,
    state: ConnectionState,
}

impl Connection {
    pub(crate) fn new(endpoint: Endpoint, session: Box<dyn Session>) -> Self {
        Self {
            endpoint,
            session,
            state: ConnectionState::Connected,
        }
    }

    /// Target this connection was opened against.
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub(crate) fn session(&self) -> &dyn Session {
        self.session.as_ref()
    }

    /// Release the session.
    pub async fn close(mut self) -> Result<(), TransportError> {
        debug!(endpoint = %self.endpoint, "Closing connection");
        self.state = ConnectionState::Closed;
        self.session.close().await
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("endpoint", &self.endpoint)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if self.state == ConnectionState::Connected {
            warn!(endpoint = %self.endpoint, "Connection dropped without close");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_parse() {
        let ep = Endpoint::parse("opc.tcp://localhost:14840").unwrap();
        assert_eq!(ep.scheme(), "opc.tcp");
        assert_eq!(ep.to_string(), "opc.tcp://localhost:14840");

        let sim: Endpoint = "sim://line1/press".parse().unwrap();
        assert_eq!(sim.scheme(), "sim");
    }

    #[test]
    fn test_endpoint_rejects_bad_urls() {
        for bad in [
            "localhost:4840",
            "http://plc:80",
            "opc.tcp://",
            "opc.tcp:///path",
            "",
            "opc.tcp://local host:4840",
            "opc.tcp://localhost:99999",
            "opc.tcp://localhost:port",
        ] {
            assert!(
                matches!(Endpoint::parse(bad), Err(PollerError::Configuration(_))),
                "'{bad}' should be rejected"
            );
        }
    }

    #[test]
    fn test_security_mode_display() {
        assert_eq!(SecurityMode::default(), SecurityMode::None);
        assert_eq!(SecurityMode::SignAndEncrypt.to_string(), "sign_and_encrypt");
    }
}
