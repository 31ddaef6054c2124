//! Scripting-bridge message envelope

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Result;

/// Message kind carrying a position reading
pub const POSITION_KIND: &str = "position";

/// Inbound message posted by the in-game script through the binding.
///
/// The binding delivers it as a JSON string; `data` stays untyped because its
/// shape depends on `kind`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeMessage {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: Value,
}

impl BridgeMessage {
    /// Parse the string payload of a `Runtime.bindingCalled` event
    pub fn parse(payload: &str) -> Result<Self> {
        Ok(serde_json::from_str(payload)?)
    }

    pub fn is_position(&self) -> bool {
        self.kind == POSITION_KIND
    }
}
