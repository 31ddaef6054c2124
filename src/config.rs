//! Relay configuration
//!
//! Every field has a default, so an empty YAML document is a valid config:
//!
//! ```rust
//! use nui_relay::RelayConfig;
//!
//! let config = RelayConfig::from_yaml_str("idle_interval_secs: 5\n").unwrap();
//! assert_eq!(config.idle_interval_secs, 5);
//! assert_eq!(config.binding_name, "sendDevtools");
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::{EventSubscription, SubscriptionSet};
use crate::{RelayError, Result};

/// Listing endpoint exposed by the NUI devtools server
pub const DEFAULT_DISCOVERY_URL: &str = "http://localhost:13172/json/list";

/// Substring of the URL of the script that hosts the telemetry emitter
pub const DEFAULT_SCRIPT_MARKER: &str = "nui/main.js";

/// Name of the binding the emitter calls to post messages
pub const DEFAULT_BINDING_NAME: &str = "sendDevtools";

/// In-page function receiving outbound bridge calls
pub const DEFAULT_BRIDGE_FUNCTION: &str = "recvData";

/// Settings for one relay client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub discovery_url: String,
    pub script_marker: String,
    pub binding_name: String,
    pub bridge_function: String,

    /// Seconds between liveness checks while running
    pub idle_interval_secs: u64,

    /// Seconds to wait for the telemetry script before giving up
    pub ready_timeout_secs: u64,

    /// Seconds before an individual protocol call is abandoned
    pub request_timeout_secs: u64,

    /// Maximum buffered samples; the oldest is dropped when full.
    /// `None` leaves the buffer unbounded.
    pub buffer_capacity: Option<usize>,

    /// Subscriptions applied when none are given explicitly
    pub subscriptions: SubscriptionSet,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            discovery_url: DEFAULT_DISCOVERY_URL.to_string(),
            script_marker: DEFAULT_SCRIPT_MARKER.to_string(),
            binding_name: DEFAULT_BINDING_NAME.to_string(),
            bridge_function: DEFAULT_BRIDGE_FUNCTION.to_string(),
            idle_interval_secs: 30,
            ready_timeout_secs: 60,
            request_timeout_secs: 30,
            buffer_capacity: Some(100_000),
            subscriptions: SubscriptionSet::from(EventSubscription::EnablePosition),
        }
    }
}

impl RelayConfig {
    /// Parse and validate a YAML document
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: RelayConfig =
            if yaml.trim().is_empty() { RelayConfig::default() } else { serde_yaml_ng::from_str(yaml)? };
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading relay config from {}", path.display());
        let yaml = std::fs::read_to_string(path).map_err(|e| RelayError::Config {
            reason: format!("cannot read {}: {}", path.display(), e),
            source: Some(Box::new(e)),
        })?;
        Self::from_yaml_str(&yaml)
    }

    /// Reject settings the client cannot run with
    pub fn validate(&self) -> Result<()> {
        let non_empty = [
            ("discovery_url", &self.discovery_url),
            ("script_marker", &self.script_marker),
            ("binding_name", &self.binding_name),
            ("bridge_function", &self.bridge_function),
        ];
        for (field, value) in non_empty {
            if value.trim().is_empty() {
                return Err(RelayError::config_error(format!("{} must not be empty", field)));
            }
        }

        let non_zero = [
            ("idle_interval_secs", self.idle_interval_secs),
            ("ready_timeout_secs", self.ready_timeout_secs),
            ("request_timeout_secs", self.request_timeout_secs),
        ];
        for (field, value) in non_zero {
            if value == 0 {
                return Err(RelayError::config_error(format!("{} must be greater than zero", field)));
            }
        }

        if self.buffer_capacity == Some(0) {
            return Err(RelayError::config_error("buffer_capacity must be greater than zero"));
        }

        Ok(())
    }

    pub fn idle_interval(&self) -> Duration {
        Duration::from_secs(self.idle_interval_secs)
    }

    pub fn ready_timeout(&self) -> Duration {
        Duration::from_secs(self.ready_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
