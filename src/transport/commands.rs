//! Typed protocol commands used by the relay

use serde_json::{Value, json};
use tracing::trace;

use super::Transport;
use crate::types::ExecutionContextId;
use crate::{RelayError, Result};

const MISSING_CONTEXT: &str = "cannot find context";

/// Domain commands available on every [`Transport`]
#[async_trait::async_trait]
pub trait DomainCommands: Transport {
    async fn page_enable(&self) -> Result<()> {
        self.call("Page.enable", Value::Null).await.map(drop)
    }

    async fn runtime_enable(&self) -> Result<()> {
        self.call("Runtime.enable", Value::Null).await.map(drop)
    }

    async fn debugger_enable(&self) -> Result<()> {
        self.call("Debugger.enable", Value::Null).await.map(drop)
    }

    /// Install `name` as a binding inside `context`
    async fn add_binding(&self, name: &str, context: ExecutionContextId) -> Result<()> {
        self.call("Runtime.addBinding", json!({ "name": name, "executionContextId": context.get() }))
            .await
            .map_err(|e| stale_context(e, context))
            .map(drop)
    }

    /// Evaluate `expression` in `context` and return the resulting remote object.
    ///
    /// A thrown exception in the page surfaces as [`RelayError::Protocol`]; a
    /// context the page has torn down surfaces as [`RelayError::StaleContext`].
    async fn evaluate(
        &self,
        expression: &str,
        context: ExecutionContextId,
        await_promise: bool,
    ) -> Result<Value> {
        trace!(context = context.get(), expression, "Runtime.evaluate");
        let response = self
            .call(
                "Runtime.evaluate",
                json!({
                    "expression": expression,
                    "contextId": context.get(),
                    "awaitPromise": await_promise,
                }),
            )
            .await
            .map_err(|e| stale_context(e, context))?;

        if let Some(exception) = response.get("exceptionDetails") {
            let text = exception["exception"]["description"]
                .as_str()
                .or_else(|| exception["text"].as_str())
                .unwrap_or("Unknown error");
            return Err(RelayError::protocol("Runtime.evaluate", 0, text));
        }

        Ok(response.get("result").cloned().unwrap_or(Value::Null))
    }
}

impl<T: Transport> DomainCommands for T {}

fn stale_context(error: RelayError, context: ExecutionContextId) -> RelayError {
    match error {
        RelayError::Protocol { ref message, .. }
            if message.to_ascii_lowercase().contains(MISSING_CONTEXT) =>
        {
            RelayError::StaleContext { context_id: context.get() }
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::MockTransport;

    #[tokio::test]
    async fn evaluate_sends_context_and_await_flag() {
        let transport = MockTransport::new();
        transport.respond("Runtime.evaluate", json!({"result": {"type": "number", "value": 2}}));

        let result = transport.evaluate("1 + 1", ExecutionContextId(42), true).await.unwrap();
        assert_eq!(result["value"], 2);

        let calls = transport.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "Runtime.evaluate");
        assert_eq!(
            calls[0].1,
            json!({"expression": "1 + 1", "contextId": 42, "awaitPromise": true})
        );
    }

    #[tokio::test]
    async fn exception_details_become_errors() {
        let transport = MockTransport::new();
        transport.respond(
            "Runtime.evaluate",
            json!({
                "result": {"type": "object"},
                "exceptionDetails": {"text": "Uncaught", "exception": {"description": "ReferenceError: recvData is not defined"}}
            }),
        );

        let err = transport.evaluate("recvData('x')", ExecutionContextId(1), true).await.unwrap_err();
        match err {
            RelayError::Protocol { message, .. } => assert!(message.contains("recvData")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_context_maps_to_stale() {
        let transport = MockTransport::new();
        transport.fail(
            "Runtime.evaluate",
            RelayError::protocol("Runtime.evaluate", -32000, "Cannot find context with specified id"),
        );

        let err = transport.evaluate("1", ExecutionContextId(9), true).await.unwrap_err();
        assert!(matches!(err, RelayError::StaleContext { context_id: 9 }));
    }

    #[tokio::test]
    async fn add_binding_scopes_to_context() {
        let transport = MockTransport::new();
        transport.add_binding("sendDevtools", ExecutionContextId(5)).await.unwrap();
        assert_eq!(
            transport.calls()[0],
            (
                "Runtime.addBinding".to_string(),
                json!({"name": "sendDevtools", "executionContextId": 5})
            )
        );
    }
}
