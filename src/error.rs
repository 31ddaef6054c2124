//! Error types for the relay client.
//!
//! All errors implement the `std::error::Error` trait and carry enough context
//! to log a useful message without a backtrace.
//!
//! ## Error Categories
//!
//! - **Discovery Errors**: the debugging endpoint listing could not be fetched or read
//! - **Connection Errors**: the WebSocket session could not be opened
//! - **Protocol Errors**: a protocol call returned an error or the session closed
//! - **Context Errors**: no usable execution context for scripting-bridge calls
//! - **Config Errors**: invalid or unreadable configuration
//!
//! ## Recovery and Retry
//!
//! ```rust
//! use nui_relay::RelayError;
//!
//! let error = RelayError::connection_failed("devtools socket refused");
//! if error.is_retryable() {
//!     for suggestion in error.recovery_suggestions() {
//!         println!("  - {}", suggestion);
//!     }
//! }
//! ```

use std::time::Duration;
use thiserror::Error;

/// Result type alias for relay operations.
pub type Result<T, E = RelayError> = std::result::Result<T, E>;

/// Main error type for relay operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum RelayError {
    #[error("Endpoint discovery failed at {url}: {reason}")]
    Discovery {
        url: String,
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Failed to connect to debugging endpoint: {reason}")]
    Connection {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Protocol error from {method}: {message} (code: {code})")]
    Protocol { method: String, code: i64, message: String },

    #[error("Transport error: {reason}")]
    Transport { reason: String },

    #[error("Protocol session closed")]
    SessionClosed,

    #[error("{operation} timed out after {duration:?}")]
    Timeout { operation: String, duration: Duration },

    #[error("Failed to decode bridge payload: {details}")]
    Decode { details: String },

    #[error("No execution context captured yet; the telemetry script has not loaded")]
    ContextUnavailable,

    #[error("Execution context {context_id} no longer exists")]
    StaleContext { context_id: i64 },

    #[error("Invalid configuration: {reason}")]
    Config {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Operation cancelled by run signal")]
    Cancelled,
}

impl RelayError {
    /// Returns whether this error is potentially recoverable through retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            RelayError::Discovery { .. } => true,
            RelayError::Connection { .. } => true,
            RelayError::Timeout { .. } => true,
            RelayError::StaleContext { .. } => true,
            RelayError::ContextUnavailable => true,
            RelayError::SessionClosed => true,
            RelayError::Transport { .. } => true,
            RelayError::Protocol { .. } => false,
            RelayError::Decode { .. } => false,
            RelayError::Config { .. } => false,
            RelayError::Cancelled => false,
        }
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            RelayError::Discovery { .. } => vec![
                "Ensure the game client is running with NUI devtools enabled",
                "Check that the discovery URL and port are correct",
                "Verify nothing else is bound to the devtools port",
            ],
            RelayError::Connection { .. } => vec![
                "Ensure the devtools WebSocket is not already attached elsewhere",
                "Retry once the target page has finished loading",
            ],
            RelayError::Protocol { .. } => vec![
                "Check the protocol method and parameters",
                "Verify the target supports the requested domain",
            ],
            RelayError::Transport { .. } | RelayError::SessionClosed => vec![
                "Reconnect to the debugging endpoint",
                "Check whether the game client was closed or reloaded",
            ],
            RelayError::Timeout { .. } => vec![
                "Increase the request or readiness timeout",
                "Verify the target is responsive",
            ],
            RelayError::Decode { .. } => vec![
                "Check the in-game emitter payload format",
                "Verify the emitter and relay versions match",
            ],
            RelayError::ContextUnavailable => vec![
                "Wait for the telemetry script to load before subscribing",
                "Check the configured script marker",
            ],
            RelayError::StaleContext { .. } => vec![
                "Wait for the telemetry script to reload",
                "Re-send subscriptions once a new context is captured",
            ],
            RelayError::Config { .. } => vec![
                "Check the configuration file syntax",
                "Compare against the documented defaults",
            ],
            RelayError::Cancelled => vec!["No action needed; the run signal was cleared"],
        }
    }

    /// Helper constructor for discovery errors.
    pub fn discovery_failed(url: impl Into<String>, reason: impl Into<String>) -> Self {
        RelayError::Discovery { url: url.into(), reason: reason.into(), source: None }
    }

    /// Helper constructor for discovery errors with source.
    pub fn discovery_failed_with_source(
        url: impl Into<String>,
        reason: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        RelayError::Discovery { url: url.into(), reason: reason.into(), source: Some(source) }
    }

    /// Helper constructor for connection errors.
    pub fn connection_failed(reason: impl Into<String>) -> Self {
        RelayError::Connection { reason: reason.into(), source: None }
    }

    /// Helper constructor for connection errors with source.
    pub fn connection_failed_with_source(
        reason: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        RelayError::Connection { reason: reason.into(), source: Some(source) }
    }

    /// Helper constructor for protocol errors.
    pub fn protocol(method: impl Into<String>, code: i64, message: impl Into<String>) -> Self {
        RelayError::Protocol { method: method.into(), code, message: message.into() }
    }

    /// Helper constructor for decode errors.
    pub fn decode(details: impl Into<String>) -> Self {
        RelayError::Decode { details: details.into() }
    }

    /// Helper constructor for configuration errors.
    pub fn config_error(reason: impl Into<String>) -> Self {
        RelayError::Config { reason: reason.into(), source: None }
    }

    /// Helper constructor for timeouts.
    pub fn timeout(operation: impl Into<String>, duration: Duration) -> Self {
        RelayError::Timeout { operation: operation.into(), duration }
    }
}

impl From<serde_json::Error> for RelayError {
    fn from(err: serde_json::Error) -> Self {
        RelayError::Decode { details: err.to_string() }
    }
}

impl From<reqwest::Error> for RelayError {
    fn from(err: reqwest::Error) -> Self {
        let url = err.url().map(|u| u.to_string()).unwrap_or_else(|| "<unknown>".to_string());
        RelayError::Discovery { url, reason: err.to_string(), source: Some(Box::new(err)) }
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for RelayError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        RelayError::Transport { reason: err.to_string() }
    }
}

impl From<serde_yaml_ng::Error> for RelayError {
    fn from(err: serde_yaml_ng::Error) -> Self {
        RelayError::Config { reason: err.to_string(), source: Some(Box::new(err)) }
    }
}

impl From<std::io::Error> for RelayError {
    fn from(err: std::io::Error) -> Self {
        RelayError::Config { reason: err.to_string(), source: Some(Box::new(err)) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
          #[test]
          fn error_messages_carry_their_context(
            reason in ".*",
            method in "[A-Z][a-z]+\\.[a-z][a-zA-Z]+",
            code in -33000i64..0i64,
            context_id in 1i64..10_000i64,
          ) {
            let connection = RelayError::connection_failed(reason.clone());
            prop_assert!(connection.to_string().contains(&reason));

            let protocol = RelayError::protocol(method.clone(), code, reason.clone());
            let msg = protocol.to_string();
            prop_assert!(msg.contains(&method));
            prop_assert!(msg.contains(&code.to_string()));

            let stale = RelayError::StaleContext { context_id };
            prop_assert!(stale.to_string().contains(&context_id.to_string()));
          }

          #[test]
          fn source_chain_preserves_base_message(base_message in ".*", depth in 1usize..4usize) {
            let mut current: Box<dyn std::error::Error + Send + Sync> =
              Box::new(std::io::Error::other(base_message.clone()));
            for i in 0..depth {
              current = Box::new(RelayError::connection_failed_with_source(format!("layer {}", i), current));
            }

            let mut found = false;
            let mut traversed = 0;
            let mut next = std::error::Error::source(current.as_ref());
            while let Some(source) = next {
              traversed += 1;
              if source.to_string().contains(&base_message) {
                found = true;
              }
              next = std::error::Error::source(source);
            }
            prop_assert_eq!(traversed, depth);
            prop_assert!(found);
          }
        }
    }

    #[test]
    fn error_traits_validation() {
        fn assert_send_sync_static<T: Send + Sync + 'static>() {}
        assert_send_sync_static::<RelayError>();

        let error = RelayError::ContextUnavailable;
        let _: &dyn std::error::Error = &error;
    }

    #[test]
    fn retry_classification() {
        assert!(RelayError::connection_failed("refused").is_retryable());
        assert!(RelayError::StaleContext { context_id: 3 }.is_retryable());
        assert!(!RelayError::decode("bad json").is_retryable());
        assert!(!RelayError::config_error("empty marker").is_retryable());
        assert!(!RelayError::Cancelled.is_retryable());

        for suggestion in RelayError::ContextUnavailable.recovery_suggestions() {
            assert!(suggestion.len() > 5);
        }
    }

    #[test]
    fn from_conversions_work() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert!(matches!(RelayError::from(json_err), RelayError::Decode { .. }));

        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "relay.yaml");
        match RelayError::from(io_err) {
            RelayError::Config { reason, .. } => assert_eq!(reason, "relay.yaml"),
            other => panic!("Expected Config error, got {other:?}"),
        }
    }
}
