//! Outbound scripting-bridge calls

use std::sync::Arc;

use serde_json::{Value, json};
use tracing::{debug, info};

use crate::gate::ContextSlot;
use crate::transport::{DomainCommands, Transport};
use crate::types::{EventSubscription, SubscriptionSet};
use crate::{RelayError, Result};

/// Command the in-page bridge answers with a round trip through the binding
pub const HANDSHAKE_COMMAND: &str = "message";

/// One call into the page's bridge function, e.g. `recvData('enablePosition')`
#[derive(Debug, Clone, PartialEq)]
pub struct BridgeCall {
    function: String,
    command: String,
    argument: Option<Value>,
}

impl BridgeCall {
    pub fn new(function: impl Into<String>, command: impl Into<String>) -> Self {
        Self { function: function.into(), command: command.into(), argument: None }
    }

    /// Attach a JSON argument, passed to the page as a string
    pub fn with_argument(mut self, argument: Value) -> Self {
        self.argument = Some(argument);
        self
    }

    /// Request one telemetry stream
    pub fn subscription(function: impl Into<String>, subscription: EventSubscription) -> Self {
        Self::new(function, subscription.wire_id())
    }

    /// Handshake sent once the binding is installed
    pub fn handshake(function: impl Into<String>) -> Self {
        Self::new(function, HANDSHAKE_COMMAND).with_argument(json!({ "a": "b" }))
    }

    /// JavaScript expression evaluated in the target context
    pub fn expression(&self) -> String {
        let command = escape_single_quoted(&self.command);
        match &self.argument {
            None => format!("{}('{}')", self.function, command),
            // JSON text is a valid JavaScript literal
            Some(arg) => format!("{}('{}', JSON.stringify({}))", self.function, command, arg),
        }
    }
}

fn escape_single_quoted(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            _ => out.push(ch),
        }
    }
    out
}

/// Sends subscription requests into the captured execution context
pub struct EventSubscriber<T> {
    transport: Arc<T>,
    context: ContextSlot,
    bridge_function: String,
}

impl<T: Transport> EventSubscriber<T> {
    pub fn new(transport: Arc<T>, context: ContextSlot, bridge_function: impl Into<String>) -> Self {
        Self { transport, context, bridge_function: bridge_function.into() }
    }

    /// Request one stream.
    ///
    /// Fails with [`RelayError::ContextUnavailable`] before the script-load
    /// gate has published a context; nothing is sent in that case.
    pub async fn subscribe(&self, subscription: EventSubscription) -> Result<Value> {
        let context = self.context.current().ok_or(RelayError::ContextUnavailable)?;
        let call = BridgeCall::subscription(&self.bridge_function, subscription);
        info!(context = context.get(), "Subscribing to {}", subscription);
        self.transport.evaluate(&call.expression(), context, true).await
    }

    /// Request every stream in `subscriptions`, strictly in order, each
    /// awaited before the next. Stops at the first failure.
    pub async fn subscribe_all(&self, subscriptions: &SubscriptionSet) -> Result<usize> {
        let mut sent = 0;
        for subscription in subscriptions.iter() {
            self.subscribe(subscription).await?;
            sent += 1;
        }
        debug!("Sent {} subscription requests", sent);
        Ok(sent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::MockTransport;
    use crate::types::ExecutionContextId;
    use std::time::Duration;

    fn ready_subscriber(context: i64) -> (EventSubscriber<MockTransport>, MockTransport) {
        let transport = MockTransport::new();
        let slot = ContextSlot::new();
        slot.publish(ExecutionContextId(context));
        (EventSubscriber::new(Arc::new(transport.clone()), slot, "recvData"), transport)
    }

    #[test]
    fn expressions_match_bridge_shape() {
        assert_eq!(
            BridgeCall::subscription("recvData", EventSubscription::EnablePosition).expression(),
            "recvData('enablePosition')"
        );
        assert_eq!(
            BridgeCall::handshake("recvData").expression(),
            r#"recvData('message', JSON.stringify({"a":"b"}))"#
        );
    }

    #[test]
    fn command_quotes_are_escaped() {
        let call = BridgeCall::new("recvData", r"it's\here");
        assert_eq!(call.expression(), r"recvData('it\'s\\here')");
    }

    #[tokio::test]
    async fn subscribe_evaluates_in_captured_context() {
        let (subscriber, transport) = ready_subscriber(42);
        subscriber.subscribe(EventSubscription::EnablePosition).await.unwrap();

        let params = transport.calls_to("Runtime.evaluate");
        assert_eq!(params.len(), 1);
        assert_eq!(params[0]["expression"], "recvData('enablePosition')");
        assert_eq!(params[0]["contextId"], 42);
        assert_eq!(params[0]["awaitPromise"], true);
    }

    #[tokio::test]
    async fn subscribe_without_context_is_an_error() {
        let transport = MockTransport::new();
        let subscriber = EventSubscriber::new(Arc::new(transport.clone()), ContextSlot::new(), "recvData");

        let err = subscriber.subscribe(EventSubscription::EnablePosition).await.unwrap_err();
        assert!(matches!(err, RelayError::ContextUnavailable));
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn ordered_set_is_sent_sequentially() {
        let (subscriber, transport) = ready_subscriber(7);
        transport.set_delay(Duration::from_millis(10));

        let set = SubscriptionSet::from([
            EventSubscription::EnablePlayers,
            EventSubscription::EnableBlips,
            EventSubscription::EnablePlayers,
        ]);
        assert_eq!(subscriber.subscribe_all(&set).await.unwrap(), 3);

        assert_eq!(
            transport.expressions(),
            vec!["recvData('enablePlayers')", "recvData('enableBlips')", "recvData('enablePlayers')"]
        );
        // Each call finished before the next one started
        assert_eq!(
            transport.timeline(),
            vec![
                "start:Runtime.evaluate",
                "end:Runtime.evaluate",
                "start:Runtime.evaluate",
                "end:Runtime.evaluate",
                "start:Runtime.evaluate",
                "end:Runtime.evaluate",
            ]
        );
    }

    #[tokio::test]
    async fn first_failure_stops_the_set() {
        let (subscriber, transport) = ready_subscriber(7);
        transport.fail("Runtime.evaluate", RelayError::protocol("Runtime.evaluate", 0, "boom"));

        let set = SubscriptionSet::from([EventSubscription::EnablePeds, EventSubscription::EnableChat]);
        assert!(subscriber.subscribe_all(&set).await.is_err());
        assert_eq!(transport.expressions(), vec!["recvData('enablePeds')"]);
    }
}
