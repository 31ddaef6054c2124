//! Core value types shared across the relay.
//!
//! ## Overview
//!
//! - [`Position`] is one decoded telemetry reading. Its identity is spatial
//!   only, see the type docs.
//! - [`EventSubscription`] is the closed set of streams the in-game script
//!   can emit, each with a fixed wire identifier.
//! - [`SubscriptionSet`] is an ordered list of those, applied once per session.
//! - [`ExecutionContextId`] identifies the page context hosting the script.
//! - [`BridgeMessage`] is the envelope the script posts through the binding.
//! - [`ClientState`] tracks the client lifecycle.
//!
//! ## Usage Example
//!
//! ```rust
//! use nui_relay::types::{BridgeMessage, EventSubscription, Position};
//!
//! let msg = BridgeMessage::parse(r#"{"type":"position","data":[1.0,2.0,3.0,90.0]}"#).unwrap();
//! assert!(msg.is_position());
//!
//! let a = Position::new(1.0, 2.0, 3.0, 90.0);
//! let b = Position::new(1.0, 2.0, 3.0, 270.0);
//! assert_eq!(a, b); // heading is not part of identity
//!
//! assert_eq!(EventSubscription::EnablePosition.wire_id(), "enablePosition");
//! ```

mod context;
mod message;
mod position;
mod state;
mod subscription;

pub use context::ExecutionContextId;
pub use message::{BridgeMessage, POSITION_KIND};
pub use position::Position;
pub use state::ClientState;
pub use subscription::{EventSubscription, SubscriptionSet};
