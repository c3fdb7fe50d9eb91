//! Configuration System using Figment
//!
//! Settings are layered, later sources overriding earlier ones:
//! 1. Built-in defaults (`opc.tcp://localhost:14840`, node `ns=1;i=2345`)
//! 2. TOML file (`config/ua_poller.toml` unless `--config` names another)
//! 3. Environment variables prefixed with `UA_POLLER_`
//! 4. Command-line flags
//!
//! A missing TOML file is not an error; the defaults stand in for it.
//!
//! # Example
//! ```no_run
//! use ua_poller::config::{ConfigOverrides, PollerConfig};
//!
//! let config = PollerConfig::load_with(
//!     PollerConfig::DEFAULT_PATH,
//!     ConfigOverrides { debug: Some(true), ..Default::default() },
//! )?;
//! config.validate()?;
//! println!("Polling {} node(s) on {}", config.nodes.len(), config.endpoint);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use crate::error::{PollerError, PollerResult};
use crate::node_id::{parse_node_identifier, NodeId};
use crate::poller::{OverlapPolicy, PollOptions};
use crate::session::{Endpoint, SecurityMode, TransportConfig};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Effective poller configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollerConfig {
    /// OPC UA endpoint URL
    pub endpoint: String,
    /// Node ids to read, in result order
    pub nodes: Vec<String>,
    /// Message security mode for the session
    #[serde(default)]
    pub security_mode: SecurityMode,
    /// Verbose protocol tracing in the transport
    #[serde(default)]
    pub debug: bool,
    /// Handling of ticks that fall due during a slow read
    #[serde(default)]
    pub overlap_policy: OverlapPolicy,
    /// Per-read timeout in milliseconds (0 = wait for the transport)
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
    /// Logging level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Values supplied on the command line. `None` leaves lower layers in effect.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConfigOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nodes: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<bool>,
}

fn default_read_timeout_ms() -> u64 {
    5000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            endpoint: "opc.tcp://localhost:14840".to_string(),
            nodes: vec!["ns=1;i=2345".to_string()],
            security_mode: SecurityMode::None,
            debug: false,
            overlap_policy: OverlapPolicy::SkipTick,
            read_timeout_ms: default_read_timeout_ms(),
            log_level: default_log_level(),
        }
    }
}

impl PollerConfig {
    /// Default TOML location, relative to the working directory.
    pub const DEFAULT_PATH: &'static str = "config/ua_poller.toml";

    /// Environment variable prefix.
    pub const ENV_PREFIX: &'static str = "UA_POLLER_";

    /// Load from the default file and environment.
    pub fn load() -> PollerResult<Self> {
        Self::load_from(Self::DEFAULT_PATH)
    }

    /// Load from a specific file path and environment.
    pub fn load_from<P: AsRef<Path>>(path: P) -> PollerResult<Self> {
        Self::load_with(path, ConfigOverrides::default())
    }

    /// Load from file and environment, then apply command-line overrides.
    pub fn load_with<P: AsRef<Path>>(path: P, overrides: ConfigOverrides) -> PollerResult<Self> {
        Ok(Self::figment(path)
            .merge(Serialized::defaults(overrides))
            .extract()?)
    }

    /// Provider stack without command-line overrides.
    pub fn figment<P: AsRef<Path>>(path: P) -> Figment {
        Figment::from(Serialized::defaults(PollerConfig::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(Self::ENV_PREFIX))
    }

    /// Semantic checks the deserializer cannot express.
    pub fn validate(&self) -> PollerResult<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(PollerError::Configuration(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            )));
        }

        if self.nodes.is_empty() {
            return Err(PollerError::Configuration(
                "At least one node must be configured".to_string(),
            ));
        }

        self.endpoint()?;
        self.node_ids()?;
        Ok(())
    }

    /// Parsed endpoint.
    pub fn endpoint(&self) -> PollerResult<Endpoint> {
        Endpoint::parse(&self.endpoint)
    }

    /// Parsed node ids, in configured order.
    pub fn node_ids(&self) -> PollerResult<Vec<NodeId>> {
        self.nodes
            .iter()
            .map(|text| parse_node_identifier(text).map_err(PollerError::from))
            .collect()
    }

    /// Loop options derived from this config.
    pub fn poll_options(&self) -> PollOptions {
        PollOptions {
            overlap: self.overlap_policy,
            read_timeout: (self.read_timeout_ms > 0)
                .then(|| Duration::from_millis(self.read_timeout_ms)),
        }
    }

    /// Settings passed to the transport at construction.
    pub fn transport_config(&self) -> TransportConfig {
        TransportConfig::new(self.debug)
    }

    /// Render as TOML.
    pub fn to_toml(&self) -> PollerResult<String> {
        toml::to_string_pretty(self)
            .map_err(|e| PollerError::Configuration(format!("cannot render config: {e}")))
    }
}
