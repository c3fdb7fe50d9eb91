//! # ua_poller
//!
//! A periodic read client for OPC UA servers. It opens one session, builds one
//! read request, and polls it on a fixed interval, logging every value and
//! every failure without ever stopping on a failed read.
//!
//! ## Crate Structure
//!
//! - **`poller`**: `PollingReadClient`, the connect / poll / run loop.
//! - **`node_id`**: `NodeId` and the `ns=<n>;i=<id>` text parser.
//! - **`request`**: `ReadRequest` and `build_request`.
//! - **`value`**: `StatusCode`, `Variant` and `DataValue` read results.
//! - **`session`**: `Connector` / `Session` transport traits, `Endpoint`,
//!   and the owned `Connection` handle.
//! - **`simulated`**: in-process transport for `sim://` endpoints and tests.
//! - **`opcua_transport`**: real OPC UA transport (feature `opcua_client`).
//! - **`transport`**: picks a connector from the endpoint scheme.
//! - **`config`**: layered configuration (defaults, TOML, env, CLI).
//! - **`logging`**: `tracing-subscriber` setup.
//! - **`error`**: `PollerError`, `TransportError`, `ReadError`.

pub mod config;
pub mod error;
pub mod logging;
pub mod node_id;
pub mod poller;
pub mod request;
pub mod session;
pub mod simulated;
pub mod transport;
pub mod value;

#[cfg(feature = "opcua_client")]
pub mod opcua_transport;

pub use error::{PollerError, PollerResult, ReadError, TransportError};
pub use node_id::{parse_node_identifier, InvalidIdentifierError, NodeId};
pub use poller::{OverlapPolicy, PollOptions, PollingReadClient, RunSummary, POLL_INTERVAL};
pub use request::{build_request, ReadRequest};
pub use value::{DataValue, StatusCode, Variant};
