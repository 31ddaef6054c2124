//! Execution context handle

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque id of a script execution context inside the inspected page.
///
/// Captured from `Debugger.scriptParsed` and required by every
/// scripting-bridge call. It becomes stale when the page tears the context
/// down, e.g. on a resource restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub struct ExecutionContextId(pub i64);

impl ExecutionContextId {
    pub fn get(self) -> i64 {
        self.0
    }
}

impl From<i64> for ExecutionContextId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl fmt::Display for ExecutionContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
