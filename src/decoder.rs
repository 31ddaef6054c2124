//! Telemetry decoding for scripting-bridge messages

use serde_json::Value;
use tracing::{trace, warn};

use crate::buffer::SampleBuffer;
use crate::router::EventHandler;
use crate::transport::ProtocolEvent;
use crate::transport::protocol::{BindingCalled, methods};
use crate::types::{BridgeMessage, Position};
use crate::{RelayError, Result};

/// Decode a binding payload string.
///
/// Returns `Ok(None)` for well-formed messages of any kind other than
/// `position`, and an error when the payload is not a bridge message or a
/// position message does not carry exactly four numeric values.
pub fn decode_payload(payload: &str) -> Result<Option<Position>> {
    let message = BridgeMessage::parse(payload)?;
    if !message.is_position() {
        return Ok(None);
    }

    let values: Vec<f64> = serde_json::from_value(message.data)
        .map_err(|e| RelayError::decode(format!("position data is not a numeric array: {}", e)))?;
    Position::from_slice(&values).map(Some).ok_or_else(|| {
        RelayError::decode(format!("position data must be [x, y, z, heading], got {} values", values.len()))
    })
}

/// Handles `Runtime.bindingCalled`, pushing decoded positions into the buffer.
///
/// Never blocks and never fails: unknown kinds are skipped silently and
/// malformed payloads are logged and discarded.
pub struct TelemetryDecoder {
    buffer: SampleBuffer,
    binding_name: String,
}

impl TelemetryDecoder {
    pub fn new(buffer: SampleBuffer, binding_name: impl Into<String>) -> Self {
        Self { buffer, binding_name: binding_name.into() }
    }

    /// Process one `Runtime.bindingCalled` parameter object
    pub fn on_binding_called(&self, params: &Value) {
        let call: BindingCalled = match serde_json::from_value(params.clone()) {
            Ok(call) => call,
            Err(e) => {
                warn!("Discarding malformed bindingCalled event: {}", e);
                return;
            }
        };

        if let Some(name) = call.name.as_deref() {
            if name != self.binding_name {
                trace!("Ignoring call to foreign binding {}", name);
                return;
            }
        }

        match decode_payload(&call.payload) {
            Ok(Some(position)) => {
                trace!("{}", position);
                self.buffer.push(position);
            }
            Ok(None) => {}
            Err(e) => warn!(payload = %call.payload, "Discarding bridge message: {}", e),
        }
    }
}

#[async_trait::async_trait]
impl EventHandler for TelemetryDecoder {
    fn methods(&self) -> &[&'static str] {
        &[methods::BINDING_CALLED]
    }

    async fn handle(&self, event: &ProtocolEvent) -> Result<()> {
        self.on_binding_called(&event.params);
        Ok(())
    }
}
