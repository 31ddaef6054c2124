//! Script-load gate and execution context tracking
//!
//! The page loads many scripts; only the one whose URL contains the marker
//! hosts the telemetry emitter. When it appears, the gate installs the
//! binding in its context, runs the handshake, and only then publishes the
//! context id to the [`ContextSlot`]. Subscriptions wait on that slot.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::router::EventHandler;
use crate::subscriber::BridgeCall;
use crate::transport::protocol::{ContextDestroyed, ScriptParsed, methods};
use crate::transport::{DomainCommands, ProtocolEvent, Transport};
use crate::types::ExecutionContextId;
use crate::{RelayError, Result};

/// Shared slot holding the ready execution context, if any
#[derive(Clone)]
pub struct ContextSlot {
    tx: Arc<watch::Sender<Option<ExecutionContextId>>>,
}

impl ContextSlot {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    pub fn current(&self) -> Option<ExecutionContextId> {
        *self.tx.borrow()
    }

    pub(crate) fn publish(&self, context: ExecutionContextId) {
        self.tx.send_replace(Some(context));
    }

    /// Forget the context; the gate re-arms for the next matching script
    pub fn clear(&self) {
        self.tx.send_replace(None);
    }

    /// Clear only while the slot still holds `stale`
    pub fn clear_if(&self, stale: ExecutionContextId) -> bool {
        self.tx.send_if_modified(|current| {
            if *current == Some(stale) {
                *current = None;
                true
            } else {
                false
            }
        })
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<ExecutionContextId>> {
        self.tx.subscribe()
    }

    /// Wait until a context is published.
    ///
    /// Fails with [`RelayError::Timeout`] after `timeout` and with
    /// [`RelayError::Cancelled`] when `cancel` fires first.
    pub async fn wait_ready(
        &self,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<ExecutionContextId> {
        let mut rx = self.tx.subscribe();
        let ready = async move {
            loop {
                let current = *rx.borrow_and_update();
                if let Some(context) = current {
                    return Ok(context);
                }
                // The sender lives in this slot, so this only fails if the
                // slot itself is gone
                if rx.changed().await.is_err() {
                    return Err(RelayError::SessionClosed);
                }
            }
        };

        tokio::select! {
            _ = cancel.cancelled() => Err(RelayError::Cancelled),
            result = tokio::time::timeout(timeout, ready) => match result {
                Ok(outcome) => outcome,
                Err(_) => Err(RelayError::timeout("waiting for the telemetry script", timeout)),
            },
        }
    }
}

impl Default for ContextSlot {
    fn default() -> Self {
        Self::new()
    }
}

/// Handles `Debugger.scriptParsed`, arming the bridge for the telemetry script
pub struct ScriptLoadGate<T> {
    transport: Arc<T>,
    slot: ContextSlot,
    marker: String,
    binding_name: String,
    handshake: BridgeCall,
}

impl<T: Transport> ScriptLoadGate<T> {
    pub fn new(
        transport: Arc<T>,
        slot: ContextSlot,
        marker: impl Into<String>,
        binding_name: impl Into<String>,
        bridge_function: &str,
    ) -> Self {
        Self {
            transport,
            slot,
            marker: marker.into(),
            binding_name: binding_name.into(),
            handshake: BridgeCall::handshake(bridge_function),
        }
    }

    /// Process one `Debugger.scriptParsed` parameter object
    pub async fn on_script_parsed(&self, params: &Value) -> Result<()> {
        let script: ScriptParsed = serde_json::from_value(params.clone())?;
        debug!("Script parsed: {}", script.url);
        if !script.url.contains(&self.marker) {
            return Ok(());
        }

        let context = ExecutionContextId(script.execution_context_id);
        if self.slot.current() == Some(context) {
            debug!(context = context.get(), "Telemetry script re-parsed in the ready context");
            return Ok(());
        }

        info!(context = context.get(), "Telemetry script loaded from {}", script.url);
        self.transport.add_binding(&self.binding_name, context).await?;
        self.transport.evaluate(&self.handshake.expression(), context, true).await?;
        self.slot.publish(context);
        info!(context = context.get(), "Scripting bridge ready");
        Ok(())
    }
}

#[async_trait::async_trait]
impl<T: Transport> EventHandler for ScriptLoadGate<T> {
    fn methods(&self) -> &[&'static str] {
        &[methods::SCRIPT_PARSED]
    }

    async fn handle(&self, event: &ProtocolEvent) -> Result<()> {
        self.on_script_parsed(&event.params).await
    }
}

/// Clears the slot when the page destroys the ready context
pub struct ContextTracker {
    slot: ContextSlot,
}

impl ContextTracker {
    pub fn new(slot: ContextSlot) -> Self {
        Self { slot }
    }
}

#[async_trait::async_trait]
impl EventHandler for ContextTracker {
    fn methods(&self) -> &[&'static str] {
        &[methods::CONTEXT_DESTROYED, methods::CONTEXTS_CLEARED]
    }

    async fn handle(&self, event: &ProtocolEvent) -> Result<()> {
        let Some(current) = self.slot.current() else {
            return Ok(());
        };

        if event.method == methods::CONTEXT_DESTROYED {
            let destroyed: ContextDestroyed = serde_json::from_value(event.params.clone())?;
            if destroyed.execution_context_id != current.get() {
                return Ok(());
            }
        }

        info!(context = current.get(), "Execution context torn down, waiting for the script to reload");
        self.slot.clear();
        Ok(())
    }
}
