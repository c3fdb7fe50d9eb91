//! Periodic read loop
//!
//! [`PollingReadClient`] connects once, then reads a fixed [`ReadRequest`] on a
//! fixed interval until cancelled. A failed read is logged and the loop waits
//! for the next tick; nothing short of cancellation (or a panic) ends it.
//!
//! # Log lines
//!
//! Each tick writes `Starting acquisition`. A failed read writes
//! `Read failed: <error>`. Every result whose status is not `Good` writes
//! `Status not OK: <status>`, and every result writes its value in `Debug`
//! form (e.g. `Int32(42)`), whether or not the status was good.
//!
//! # Connection lifecycle
//!
//! `run` takes ownership of the [`Connection`] and closes it exactly once when
//! the loop ends, including when the loop future panics; the panic is resumed
//! after the close.
//!
//! There is no reconnect: once the session is dead every tick logs a read
//! failure until the loop is cancelled.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//! use ua_poller::node_id::parse_node_identifier;
//! use ua_poller::poller::PollingReadClient;
//! use ua_poller::request::build_request;
//! use ua_poller::session::{Endpoint, SecurityMode};
//! use ua_poller::simulated::{Behavior, SimulatedConnector};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let client = PollingReadClient::new(Arc::new(SimulatedConnector::new(Behavior::Counter)));
//! let endpoint = Endpoint::parse("sim://demo")?;
//! let connection = client.connect(&endpoint, SecurityMode::None).await?;
//! let request = build_request(&[parse_node_identifier("ns=1;i=2345")?]);
//!
//! let cancel = CancellationToken::new();
//! cancel.cancel();
//! let summary = client.run(connection, &request, Duration::from_secs(10), cancel).await;
//! assert_eq!(summary.ticks, 0);
//! # Ok(())
//! # }
//! ```

use crate::error::{PollerError, PollerResult, ReadError};
use crate::request::ReadRequest;
use crate::session::{Connection, Connector, Endpoint, SecurityMode};
use crate::value::DataValue;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Interval between polls.
pub const POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Default upper bound on a single read.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(5);

/// What happens to ticks that come due while a read is still outstanding.
///
/// Reads never overlap: the connection serves one read at a time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlapPolicy {
    /// Drop missed ticks and resume on the original schedule.
    #[default]
    SkipTick,
    /// Fire missed ticks back-to-back once the slow read finishes.
    QueueNext,
}

impl OverlapPolicy {
    fn missed_tick_behavior(self) -> MissedTickBehavior {
        match self {
            OverlapPolicy::SkipTick => MissedTickBehavior::Skip,
            OverlapPolicy::QueueNext => MissedTickBehavior::Burst,
        }
    }
}

/// Loop tuning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollOptions {
    /// Overlap handling for slow reads
    pub overlap: OverlapPolicy,
    /// Per-read limit; `None` waits for the transport
    pub read_timeout: Option<Duration>,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            overlap: OverlapPolicy::default(),
            read_timeout: Some(DEFAULT_READ_TIMEOUT),
        }
    }
}

/// Counters reported when the loop stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Ticks that started an acquisition
    pub ticks: u64,
    /// Reads that failed (transport error, timeout, short response)
    pub failed_reads: u64,
    /// Result entries whose status was not `Good`
    pub status_warnings: u64,
}

/// Connects to an endpoint and polls a fixed request on an interval.
pub struct PollingReadClient {
    connector: Arc<dyn Connector>,
    options: PollOptions,
}

impl PollingReadClient {
    /// Client using `connector` with default [`PollOptions`].
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        Self {
            connector,
            options: PollOptions::default(),
        }
    }

    /// Replace the loop options.
    pub fn with_options(mut self, options: PollOptions) -> Self {
        self.options = options;
        self
    }

    /// Loop options in effect.
    pub fn options(&self) -> &PollOptions {
        &self.options
    }

    /// Open the single connection this client polls over. No retry.
    pub async fn connect(
        &self,
        endpoint: &Endpoint,
        mode: SecurityMode,
    ) -> PollerResult<Connection> {
        info!(%endpoint, %mode, "Connecting");
        let session = self
            .connector
            .connect(endpoint, mode)
            .await
            .map_err(|source| PollerError::Connect {
                endpoint: endpoint.to_string(),
                source,
            })?;
        info!(%endpoint, "Connected");
        Ok(Connection::new(endpoint.clone(), session))
    }

    /// Issue one read.
    ///
    /// Returns [`ReadError::Cancelled`] as soon as `cancel` fires, even if the
    /// transport is still waiting on the network.
    pub async fn poll_once(
        &self,
        connection: &Connection,
        request: &ReadRequest,
        cancel: &CancellationToken,
    ) -> Result<Vec<DataValue>, ReadError> {
        let results = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ReadError::Cancelled),
            results = self.read_with_timeout(connection, request) => results?,
        };

        if results.len() < request.len() {
            return Err(ReadError::MissingResults {
                expected: request.len(),
                received: results.len(),
            });
        }
        Ok(results)
    }

    async fn read_with_timeout(
        &self,
        connection: &Connection,
        request: &ReadRequest,
    ) -> Result<Vec<DataValue>, ReadError> {
        let read = connection.session().read(request);
        match self.options.read_timeout {
            Some(limit) => tokio::time::timeout(limit, read)
                .await
                .map_err(|_| ReadError::Timeout(limit))?,
            None => read.await,
        }
    }

    /// Poll `request` every `interval` until `cancel` fires, then close
    /// `connection`.
    ///
    /// The first poll happens one interval after the call. A zero interval is
    /// raised to one millisecond.
    pub async fn run(
        &self,
        connection: Connection,
        request: &ReadRequest,
        interval: Duration,
        cancel: CancellationToken,
    ) -> RunSummary {
        let interval = interval.max(Duration::from_millis(1));
        info!(
            endpoint = %connection.endpoint(),
            nodes = request.len(),
            ?interval,
            overlap = ?self.options.overlap,
            "Polling started"
        );

        let outcome = AssertUnwindSafe(self.poll_loop(&connection, request, interval, &cancel))
            .catch_unwind()
            .await;

        let endpoint = connection.endpoint().clone();
        match connection.close().await {
            Ok(()) => info!(%endpoint, "Connection closed"),
            Err(err) => warn!(%endpoint, error = %err, "Connection close failed"),
        }

        match outcome {
            Ok(summary) => summary,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }

    async fn poll_loop(
        &self,
        connection: &Connection,
        request: &ReadRequest,
        interval: Duration,
        cancel: &CancellationToken,
    ) -> RunSummary {
        let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(self.options.overlap.missed_tick_behavior());

        let mut summary = RunSummary::default();
        let mut consecutive_failures: u64 = 0;

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            summary.ticks += 1;
            info!("Starting acquisition");

            match self.poll_once(connection, request, cancel).await {
                Ok(results) => {
                    consecutive_failures = 0;
                    summary.status_warnings += report(request, &results);
                }
                Err(ReadError::Cancelled) => {
                    debug!("Read cancelled");
                    break;
                }
                Err(err) => {
                    consecutive_failures += 1;
                    summary.failed_reads += 1;
                    warn!(consecutive_failures, "Read failed: {}", err);
                }
            }
        }

        info!(
            ticks = summary.ticks,
            failed_reads = summary.failed_reads,
            status_warnings = summary.status_warnings,
            "Polling stopped"
        );
        summary
    }
}

/// Log every result; returns how many carried a non-OK status.
fn report(request: &ReadRequest, results: &[DataValue]) -> u64 {
    let mut warnings = 0;
    for (node, result) in request.node_ids().zip(results) {
        if !result.status.is_ok() {
            warnings += 1;
            warn!(node = %node, "Status not OK: {}", result.status);
        }
        info!(
            node = %node,
            source_timestamp = ?result.source_timestamp,
            server_timestamp = ?result.server_timestamp,
            "{:?}",
            result.value
        );
    }
    warnings
}
