//! Relay in-game telemetry from a NUI devtools endpoint.
//!
//! The game's embedded browser exposes a remote-debugging endpoint. This crate
//! finds it, waits for the telemetry script to load, installs a scripting
//! bridge into that script's context and asks it for telemetry streams. Decoded
//! position samples land in a [`SampleBuffer`] the consumer drains.
//!
//! # Architecture
//!
//! - [`EndpointDiscovery`] resolves the WebSocket debugger address.
//! - A [`Connector`] opens a [`Transport`] plus a stream of protocol events.
//! - The [`driver`] task feeds events to an [`EventRouter`], where the
//!   [`ScriptLoadGate`], [`ContextTracker`] and [`TelemetryDecoder`] are
//!   registered.
//! - [`EventSubscriber`] sends the requested subscriptions once the gate is ready.
//! - [`CdpClient`] runs the whole lifecycle and drains the buffer on shutdown.
//!
//! # Example
//!
//! ```rust,no_run
//! use nui_relay::{Relay, RelayConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> nui_relay::Result<()> {
//!     let running = CancellationToken::new();
//!     let stop = running.clone();
//!     tokio::spawn(async move {
//!         let _ = tokio::signal::ctrl_c().await;
//!         stop.cancel();
//!     });
//!
//!     let samples = Relay::run(RelayConfig::default(), running).await?;
//!     println!("{} samples left at shutdown", samples.len());
//!     Ok(())
//! }
//! ```

mod error;
#[cfg(test)]
mod test_utils;

pub mod buffer;
pub mod client;
pub mod config;
pub mod decoder;
pub mod discovery;
pub mod driver;
pub mod gate;
pub mod logging;
pub mod router;
pub mod subscriber;
pub mod transport;
pub mod types;

pub use error::*;
pub use types::*;

pub use buffer::SampleBuffer;
pub use client::CdpClient;
pub use config::RelayConfig;
pub use decoder::{TelemetryDecoder, decode_payload};
pub use discovery::EndpointDiscovery;
pub use gate::{ContextSlot, ContextTracker, ScriptLoadGate};
pub use logging::LogConfig;
pub use router::{EventHandler, EventRouter};
pub use subscriber::{BridgeCall, EventSubscriber};
pub use transport::{Connector, DomainCommands, ProtocolEvent, Transport, WsConnector, WsTransport};

use tokio_util::sync::CancellationToken;

/// Entry point for relay sessions over the WebSocket transport.
///
/// # Examples
///
/// ```rust,no_run
/// use nui_relay::{Relay, RelayConfig};
/// use tokio_util::sync::CancellationToken;
///
/// # #[tokio::main]
/// # async fn main() -> nui_relay::Result<()> {
/// let client = Relay::client(RelayConfig::default(), CancellationToken::new())?;
/// let buffer = client.buffer().clone();
/// # Ok(())
/// # }
/// ```
pub struct Relay;

impl Relay {
    /// Validate `config` and build a client for it.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Config`] when the configuration is unusable.
    pub fn client(config: RelayConfig, running: CancellationToken) -> Result<CdpClient> {
        config.validate()?;
        Ok(CdpClient::new(config, running))
    }

    /// Run one session with the configured subscriptions until `running` is
    /// cancelled or the target goes away.
    ///
    /// Returns the samples still buffered at shutdown.
    pub async fn run(config: RelayConfig, running: CancellationToken) -> Result<Vec<Position>> {
        let subscriptions = config.subscriptions.clone();
        Self::client(config, running)?.entry(subscriptions).await
    }
}
