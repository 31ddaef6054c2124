//! Explicit handler registration for inbound protocol events

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{trace, warn};

use crate::Result;
use crate::transport::ProtocolEvent;

/// Reacts to one or more protocol event methods.
///
/// Handlers run on the single dispatch task, one event at a time. An error
/// returned from [`handle`](EventHandler::handle) is logged by the router and
/// never reaches the transport.
#[async_trait::async_trait]
pub trait EventHandler: Send + Sync + 'static {
    /// Protocol methods this handler wants, e.g. `Runtime.bindingCalled`
    fn methods(&self) -> &[&'static str];

    async fn handle(&self, event: &ProtocolEvent) -> Result<()>;
}

/// Routes events to handlers registered for their method
#[derive(Default, Clone)]
pub struct EventRouter {
    handlers: HashMap<&'static str, Vec<Arc<dyn EventHandler>>>,
}

impl EventRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for every method it declares
    pub fn register<H: EventHandler>(&mut self, handler: H) -> &mut Self {
        let handler: Arc<dyn EventHandler> = Arc::new(handler);
        for method in handler.methods() {
            self.handlers.entry(*method).or_default().push(handler.clone());
        }
        self
    }

    pub fn handles(&self, method: &str) -> bool {
        self.handlers.contains_key(method)
    }

    /// Run every handler registered for the event's method, in registration order
    pub async fn dispatch(&self, event: &ProtocolEvent) {
        let Some(handlers) = self.handlers.get(event.method.as_str()) else {
            trace!("No handler for {}", event.method);
            return;
        };

        for handler in handlers {
            if let Err(e) = handler.handle(event).await {
                warn!(method = %event.method, "Event handler failed: {}", e);
            }
        }
    }
}
