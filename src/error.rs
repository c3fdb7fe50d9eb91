//! Custom error types for the poller.
//!
//! Errors are split by how the caller is expected to react:
//!
//! - **`PollerError`**: startup failures (bad configuration, unparseable node id,
//!   initial connect failure). The binary reports these once and exits non-zero.
//! - **`TransportError`**: failures reported by a transport collaborator. They
//!   surface from `connect`/`close`, and inside `ReadError` during polling.
//! - **`ReadError`**: a single failed poll. The loop logs it and waits for the
//!   next tick; it never ends the process.
//!
//! Node id parse failures have their own type,
//! [`InvalidIdentifierError`](crate::node_id::InvalidIdentifierError), next to
//! the parser.

use crate::node_id::InvalidIdentifierError;
use crate::value::StatusCode;
use std::time::Duration;
use thiserror::Error;

/// Convenience alias for results using the startup error type.
pub type PollerResult<T> = std::result::Result<T, PollerError>;

#[derive(Error, Debug)]
pub enum PollerError {
    #[error("Configuration error: {0}")]
    Config(#[from] Box<figment::Error>),

    #[error("Configuration validation error: {0}")]
    Configuration(String),

    #[error("invalid node id: {0}")]
    InvalidNodeId(#[from] InvalidIdentifierError),

    #[error("connect to {endpoint} failed: {source}")]
    Connect {
        endpoint: String,
        #[source]
        source: TransportError,
    },

    #[error("Feature '{0}' is not enabled. Please build with --features {0}")]
    FeatureNotEnabled(String),

    #[error("Logging initialisation failed: {0}")]
    Logging(String),
}

impl From<figment::Error> for PollerError {
    fn from(err: figment::Error) -> Self {
        PollerError::Config(Box::new(err))
    }
}

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("service fault: {0}")]
    Service(StatusCode),

    #[error("session closed")]
    SessionClosed,

    #[error("unsupported endpoint: {0}")]
    UnsupportedEndpoint(String),

    #[error("{0}")]
    Other(String),
}

#[derive(Error, Debug)]
pub enum ReadError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("read timed out after {0:?}")]
    Timeout(Duration),

    #[error("read cancelled")]
    Cancelled,

    #[error("expected {expected} results, server returned {received}")]
    MissingResults { expected: usize, received: usize },
}

impl ReadError {
    /// True when the read ended because the caller cancelled it.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ReadError::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_error_messages() {
        let err = ReadError::from(TransportError::Service(StatusCode::BAD_TIMEOUT));
        assert_eq!(err.to_string(), "service fault: BadTimeout (0x800A0000)");

        let err = ReadError::MissingResults {
            expected: 1,
            received: 0,
        };
        assert_eq!(err.to_string(), "expected 1 results, server returned 0");
        assert!(ReadError::Cancelled.is_cancelled());
    }

    #[test]
    fn test_connect_error_keeps_source() {
        let err = PollerError::Connect {
            endpoint: "opc.tcp://plc:4840".into(),
            source: TransportError::Io(std::io::Error::from(std::io::ErrorKind::ConnectionRefused)),
        };
        assert!(err.to_string().starts_with("connect to opc.tcp://plc:4840 failed"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
