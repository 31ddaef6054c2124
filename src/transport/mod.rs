//! Remote-debugging protocol transport.
//!
//! The relay talks to the page through two seams:
//!
//! - [`Connector`] opens a session for a WebSocket debugger address and hands
//!   back the [`Transport`] together with the stream of inbound
//!   [`ProtocolEvent`]s.
//! - [`Transport`] issues request/response calls against protocol domains.
//!   [`DomainCommands`] layers the handful of typed commands the relay needs
//!   on top of any transport.
//!
//! [`WsConnector`] is the production implementation over `tokio-tungstenite`.

mod commands;
pub mod protocol;
mod websocket;

use serde_json::Value;
use tokio::sync::mpsc;

use crate::Result;

pub use commands::DomainCommands;
pub use protocol::ProtocolEvent;
pub use websocket::{WsConnector, WsTransport};

/// Inbound protocol events, in the order the target sent them
pub type EventReceiver = mpsc::UnboundedReceiver<ProtocolEvent>;

/// Sending half used by transports to publish events
pub type EventSender = mpsc::UnboundedSender<ProtocolEvent>;

/// Request/response access to an open protocol session
#[async_trait::async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Send `method` with `params` and wait for its result
    async fn call(&self, method: &str, params: Value) -> Result<Value>;

    /// Whether the underlying connection has ended
    fn is_closed(&self) -> bool;

    /// Tear the session down. Safe to call more than once.
    async fn dispose(&self) -> Result<()>;
}

/// Opens protocol sessions
#[async_trait::async_trait]
pub trait Connector: Send + Sync + 'static {
    type Transport: Transport;

    /// Connect to a `webSocketDebuggerUrl`
    async fn connect(&self, address: &str) -> Result<(Self::Transport, EventReceiver)>;
}
