//! Process-level logging setup
//!
//! The library only emits `tracing` events; installing a subscriber is left to
//! the process entry point, which builds a [`LogConfig`] and calls
//! [`LogConfig::init`] exactly once.

use tracing_subscriber::EnvFilter;

use crate::{RelayError, Result};

/// Default directives. The WebSocket stack is noisy at debug level.
pub const DEFAULT_LOG_FILTER: &str = "info,tungstenite=error,tokio_tungstenite=error";

/// Logging settings for one process
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// `EnvFilter` directives, overridden by `RUST_LOG` when set
    pub filter: String,
    /// Colored output
    pub ansi: bool,
    /// Include the event target (module path) in each line
    pub target: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self { filter: DEFAULT_LOG_FILTER.to_string(), ansi: true, target: false }
    }
}

impl LogConfig {
    /// Resolve the effective filter: `RUST_LOG` first, then the configured directives
    pub fn env_filter(&self) -> Result<EnvFilter> {
        if let Ok(filter) = EnvFilter::try_from_default_env() {
            return Ok(filter);
        }
        EnvFilter::try_new(&self.filter).map_err(|e| RelayError::Config {
            reason: format!("invalid log filter '{}': {}", self.filter, e),
            source: Some(Box::new(e)),
        })
    }

    /// Install the global subscriber
    pub fn init(&self) -> Result<()> {
        tracing_subscriber::fmt()
            .with_env_filter(self.env_filter()?)
            .with_ansi(self.ansi)
            .with_target(self.target)
            .try_init()
            .map_err(|e| RelayError::config_error(format!("logging already initialised: {}", e)))
    }
}
