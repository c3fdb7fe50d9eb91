//! Simulated transport
//!
//! An in-process stand-in for a server, used for `sim://` endpoints and in
//! tests. Reads never touch the network; the [`Behavior`] decides what each
//! read returns.
//!
//! # Example
//!
//! ```
//! use ua_poller::simulated::{Behavior, SimulatedConnector};
//! use ua_poller::value::{StatusCode, Variant};
//!
//! // Every read answers Good / Int32(42)
//! let connector = SimulatedConnector::new(Behavior::Constant {
//!     status: StatusCode::GOOD,
//!     value: Variant::Int32(42),
//! });
//! assert_eq!(connector.stats().closes(), 0);
//! ```

use crate::error::{ReadError, TransportError};
use crate::request::ReadRequest;
use crate::session::{Connector, Endpoint, SecurityMode, Session, TransportConfig};
use crate::value::{DataValue, StatusCode, Variant};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};

/// What a simulated read returns.
#[derive(Debug, Clone)]
pub enum Behavior {
    /// Same status and value for every node on every read.
    Constant { status: StatusCode, value: Variant },
    /// Every read fails at the transport level with this message.
    Fail(String),
    /// Good `Int64` value that increments on each read.
    Counter,
}

/// Shared counters so tests can observe a session after handing it off.
#[derive(Debug, Default)]
pub struct SessionStats {
    connects: AtomicUsize,
    reads: AtomicU64,
    closes: AtomicUsize,
}

impl SessionStats {
    /// Successful `connect` calls.
    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    /// `read` calls, successful or not.
    pub fn reads(&self) -> u64 {
        self.reads.load(Ordering::SeqCst)
    }

    /// `close` calls.
    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

/// [`Connector`] producing [`SimulatedSession`]s.
#[derive(Debug, Clone)]
pub struct SimulatedConnector {
    behavior: Behavior,
    latency: Duration,
    refuse: bool,
    config: TransportConfig,
    stats: Arc<SessionStats>,
}

impl SimulatedConnector {
    /// Connector whose sessions follow `behavior` with no latency.
    pub fn new(behavior: Behavior) -> Self {
        Self {
            behavior,
            latency: Duration::ZERO,
            refuse: false,
            config: TransportConfig::default(),
            stats: Arc::new(SessionStats::default()),
        }
    }

    /// Connector used for `sim://` endpoints.
    pub fn from_config(config: TransportConfig) -> Self {
        Self {
            config,
            ..Self::new(Behavior::Counter)
        }
    }

    /// Delay every read by `latency` (virtual time under a paused runtime).
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Make every `connect` fail.
    pub fn refusing(mut self) -> Self {
        self.refuse = true;
        self
    }

    /// Counters shared with every session this connector opens.
    pub fn stats(&self) -> Arc<SessionStats> {
        Arc::clone(&self.stats)
    }
}

#[async_trait]
impl Connector for SimulatedConnector {
    async fn connect(
        &self,
        endpoint: &Endpoint,
        mode: SecurityMode,
    ) -> Result<Box<dyn Session>, TransportError> {
        if self.refuse {
            return Err(TransportError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                format!("{endpoint} refused the connection"),
            )));
        }
        if self.config.debug {
            debug!(%endpoint, %mode, "simulated session opened");
        }
        self.stats.connects.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(SimulatedSession {
            behavior: self.behavior.clone(),
            latency: self.latency,
            debug: self.config.debug,
            counter: AtomicU64::new(0),
            closed: AtomicBool::new(false),
            stats: Arc::clone(&self.stats),
        }))
    }
}

/// A session answering reads from its [`Behavior`].
#[derive(Debug)]
pub struct SimulatedSession {
    behavior: Behavior,
    latency: Duration,
    debug: bool,
    counter: AtomicU64,
    closed: AtomicBool,
    stats: Arc<SessionStats>,
}

#[async_trait]
impl Session for SimulatedSession {
    async fn read(&self, request: &ReadRequest) -> Result<Vec<DataValue>, ReadError> {
        self.stats.reads.fetch_add(1, Ordering::SeqCst);
        if self.debug {
            trace!(?request, "simulated read request");
        }
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        if self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::SessionClosed.into());
        }

        let results = match &self.behavior {
            Behavior::Fail(message) => return Err(TransportError::Other(message.clone()).into()),
            Behavior::Constant { status, value } => request
                .nodes_to_read
                .iter()
                .map(|_| {
                    let now = Utc::now();
                    DataValue {
                        status: *status,
                        value: value.clone(),
                        source_timestamp: Some(now),
                        server_timestamp: Some(now),
                    }
                })
                .collect(),
            Behavior::Counter => {
                let n = self.counter.fetch_add(1, Ordering::SeqCst) as i64;
                request
                    .nodes_to_read
                    .iter()
                    .map(|_| DataValue::good(n))
                    .collect()
            }
        };
        Ok(results)
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.closed.store(true, Ordering::SeqCst);
        self.stats.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node_id::NodeId;
    use crate::request::build_request;

    fn endpoint() -> Endpoint {
        Endpoint::parse("sim://test").unwrap()
    }

    #[tokio::test]
    async fn test_constant_behavior_answers_every_node() {
        let connector = SimulatedConnector::new(Behavior::Constant {
            status: StatusCode::BAD_NOT_READABLE,
            value: Variant::Empty,
        });
        let session = connector.connect(&endpoint(), SecurityMode::None).await.unwrap();
        let request = build_request(&[NodeId::numeric(1, 1), NodeId::numeric(1, 2)]);

        let results = session.read(&request).await.unwrap();
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.status == StatusCode::BAD_NOT_READABLE));
    }

    #[tokio::test]
    async fn test_counter_increments() {
        let connector = SimulatedConnector::new(Behavior::Counter);
        let session = connector.connect(&endpoint(), SecurityMode::None).await.unwrap();
        let request = build_request(&[NodeId::numeric(1, 1)]);

        let first = session.read(&request).await.unwrap();
        let second = session.read(&request).await.unwrap();
        assert_eq!(first[0].value, Variant::Int64(0));
        assert_eq!(second[0].value, Variant::Int64(1));
        assert_eq!(connector.stats().reads(), 2);
    }

    #[tokio::test]
    async fn test_fail_and_closed_sessions_error() {
        let connector = SimulatedConnector::new(Behavior::Fail("link down".into()));
        let session = connector.connect(&endpoint(), SecurityMode::None).await.unwrap();
        let request = build_request(&[NodeId::numeric(1, 1)]);
        let err = session.read(&request).await.unwrap_err();
        assert_eq!(err.to_string(), "link down");

        let ok = SimulatedConnector::new(Behavior::Counter);
        let session = ok.connect(&endpoint(), SecurityMode::None).await.unwrap();
        session.close().await.unwrap();
        assert!(matches!(
            session.read(&request).await,
            Err(ReadError::Transport(TransportError::SessionClosed))
        ));
        assert_eq!(ok.stats().closes(), 1);
    }

    #[tokio::test]
    async fn test_refusing_connector() {
        let connector = SimulatedConnector::new(Behavior::Counter).refusing();
        let result = connector.connect(&endpoint(), SecurityMode::None).await;
        assert!(matches!(result, Err(TransportError::Io(_))));
        assert_eq!(connector.stats().connects(), 0);
    }
}
