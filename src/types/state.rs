//! Lifecycle states of the relay client

use std::fmt;

use serde::{Deserialize, Serialize};

/// Where a [`CdpClient`](crate::CdpClient) is in its lifecycle.
///
/// `Idle → Connecting → Subscribing → Running → Closing → Closed`, with
/// `Failed` reachable from any non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub enum ClientState {
    Idle,
    Connecting,
    Subscribing,
    Running,
    Closing,
    Closed,
    Failed,
}

impl ClientState {
    pub fn is_terminal(self) -> bool {
        matches!(self, ClientState::Closed | ClientState::Failed)
    }
}

impl fmt::Display for ClientState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ClientState::Idle => "idle",
            ClientState::Connecting => "connecting",
            ClientState::Subscribing => "subscribing",
            ClientState::Running => "running",
            ClientState::Closing => "closing",
            ClientState::Closed => "closed",
            ClientState::Failed => "failed",
        };
        f.write_str(name)
    }
}
