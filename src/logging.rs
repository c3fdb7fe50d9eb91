//! Tracing Infrastructure
//!
//! Structured logging for the poller, built on `tracing` and
//! `tracing-subscriber`:
//! - Output formats: pretty, compact (default), JSON
//! - `RUST_LOG` overrides the configured level when set
//! - The transport debug flag adds verbose directives for the OPC UA stack
//!   (records from the `log`-based `opcua` crate are bridged into tracing)
//!
//! # Example
//! ```no_run
//! use ua_poller::{config::PollerConfig, logging};
//! use tracing::info;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = PollerConfig::load()?;
//! logging::init_from_config(&config)?;
//! info!("Application started");
//! # Ok(())
//! # }
//! ```

use crate::config::PollerConfig;
use crate::error::{PollerError, PollerResult};
use tracing::Level;
use tracing_subscriber::{
    filter::Directive, fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
};

/// Filter directives added when transport debugging is on.
const TRANSPORT_DEBUG_DIRECTIVES: &[&str] = &[
    "opcua=debug",
    "ua_poller::opcua_transport=debug",
    "ua_poller::simulated=trace",
];

/// Output format for tracing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Multi-line, colored (for development)
    Pretty,
    /// One line per event
    #[default]
    Compact,
    /// JSON objects for log aggregation
    Json,
}

/// Tracing configuration options
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: Level,
    /// Output format
    pub format: OutputFormat,
    /// Whether to include file and line numbers
    pub with_file_and_line: bool,
    /// Whether to include the event target (module path)
    pub with_target: bool,
    /// Whether to enable ANSI colors (ignored for JSON)
    pub with_ansi: bool,
    /// Add verbose directives for the transport stack
    pub transport_debug: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: OutputFormat::Compact,
            with_file_and_line: false,
            with_target: false,
            with_ansi: true,
            transport_debug: false,
        }
    }
}

impl LoggingConfig {
    /// Create logging config from the poller configuration
    pub fn from_poller_config(config: &PollerConfig) -> PollerResult<Self> {
        Ok(Self {
            level: parse_log_level(&config.log_level)?,
            transport_debug: config.debug,
            ..Default::default()
        })
    }

    /// Create logging config with a level and defaults otherwise
    pub fn new(level: Level) -> Self {
        Self {
            level,
            ..Default::default()
        }
    }

    /// Set output format
    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    /// Enable or disable ANSI colors
    pub fn with_ansi(mut self, enabled: bool) -> Self {
        self.with_ansi = enabled;
        self
    }

    /// Enable or disable transport debug directives
    pub fn with_transport_debug(mut self, enabled: bool) -> Self {
        self.transport_debug = enabled;
        self
    }

    /// Env filter for this config. `RUST_LOG` wins over `level` when set.
    pub fn env_filter(&self) -> PollerResult<EnvFilter> {
        let mut filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(level_to_filter_string(self.level)));

        if self.transport_debug {
            for directive in TRANSPORT_DEBUG_DIRECTIVES {
                let directive: Directive = directive
                    .parse()
                    .map_err(|e| PollerError::Logging(format!("bad directive '{directive}': {e}")))?;
                filter = filter.add_directive(directive);
            }
        }
        Ok(filter)
    }
}

/// Initialize tracing from the poller configuration
pub fn init_from_config(config: &PollerConfig) -> PollerResult<()> {
    init(LoggingConfig::from_poller_config(config)?)
}

/// Initialize tracing with custom configuration
///
/// Idempotent: if a global subscriber is already installed this returns
/// `Ok(())`, which keeps tests and embedding callers simple.
pub fn init(config: LoggingConfig) -> PollerResult<()> {
    let env_filter = config.env_filter()?;

    let fmt_layer = match config.format {
        OutputFormat::Pretty => fmt::layer()
            .pretty()
            .with_file(config.with_file_and_line)
            .with_line_number(config.with_file_and_line)
            .with_target(config.with_target)
            .with_ansi(config.with_ansi)
            .boxed(),
        OutputFormat::Compact => fmt::layer()
            .compact()
            .with_file(config.with_file_and_line)
            .with_line_number(config.with_file_and_line)
            .with_target(config.with_target)
            .with_ansi(config.with_ansi)
            .boxed(),
        OutputFormat::Json => fmt::layer()
            .json()
            .with_file(config.with_file_and_line)
            .with_line_number(config.with_file_and_line)
            .with_target(config.with_target)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(fmt_layer.with_filter(env_filter))
        .try_init()
        .or_else(|e| {
            // Handle "already initialized" gracefully - expected in tests
            if e
                .to_string()
                .contains("a global default trace dispatcher has already been set")
            {
                Ok(())
            } else {
                Err(PollerError::Logging(e.to_string()))
            }
        })
}

/// Parse log level string into tracing Level
fn parse_log_level(level: &str) -> PollerResult<Level> {
    match level.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => Err(PollerError::Configuration(format!(
            "Invalid log level '{}'. Must be one of: trace, debug, info, warn, error",
            level
        ))),
    }
}

/// Convert Level to env filter string
fn level_to_filter_string(level: Level) -> String {
    match level {
        Level::TRACE => "trace".to_string(),
        Level::DEBUG => "debug".to_string(),
        Level::INFO => "info".to_string(),
        Level::WARN => "warn".to_string(),
        Level::ERROR => "error".to_string(),
    }
}
