//! Protocol message shapes

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Outbound command frame
#[derive(Debug, Serialize)]
pub struct ProtocolRequest<'a> {
    pub id: u64,
    pub method: &'a str,
    #[serde(skip_serializing_if = "Value::is_null")]
    pub params: Value,
}

/// Any inbound frame: a response carries `id`, an event carries `method`
#[derive(Debug, Deserialize)]
pub struct ProtocolMessage {
    pub id: Option<u64>,
    pub result: Option<Value>,
    pub error: Option<ProtocolErrorBody>,
    pub method: Option<String>,
    #[serde(default)]
    pub params: Value,
}

/// Error object inside a response
#[derive(Debug, Clone, Deserialize)]
pub struct ProtocolErrorBody {
    pub code: i64,
    pub message: String,
    #[serde(default)]
    pub data: Option<Value>,
}

/// Inbound protocol event
#[derive(Debug, Clone, PartialEq)]
pub struct ProtocolEvent {
    pub method: String,
    pub params: Value,
}

impl ProtocolEvent {
    pub fn new(method: impl Into<String>, params: Value) -> Self {
        Self { method: method.into(), params }
    }
}

/// Target entry from the `/json/list` discovery endpoint
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetInfo {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, rename = "type")]
    pub target_type: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    pub web_socket_debugger_url: Option<String>,
}

/// `Debugger.scriptParsed` parameters the relay reads
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptParsed {
    #[serde(default)]
    pub script_id: Option<String>,
    #[serde(default)]
    pub url: String,
    pub execution_context_id: i64,
}

/// `Runtime.bindingCalled` parameters
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BindingCalled {
    #[serde(default)]
    pub name: Option<String>,
    pub payload: String,
    #[serde(default)]
    pub execution_context_id: Option<i64>,
}

/// `Runtime.executionContextDestroyed` parameters
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextDestroyed {
    pub execution_context_id: i64,
}

pub mod methods {
    pub const SCRIPT_PARSED: &str = "Debugger.scriptParsed";
    pub const BINDING_CALLED: &str = "Runtime.bindingCalled";
    pub const CONTEXT_DESTROYED: &str = "Runtime.executionContextDestroyed";
    pub const CONTEXTS_CLEARED: &str = "Runtime.executionContextsCleared";
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_omits_null_params() {
        let req = ProtocolRequest { id: 7, method: "Page.enable", params: Value::Null };
        assert_eq!(serde_json::to_value(&req).unwrap(), json!({"id": 7, "method": "Page.enable"}));
    }

    #[test]
    fn response_and_event_frames_parse() {
        let resp: ProtocolMessage =
            serde_json::from_str(r#"{"id":3,"result":{"result":{"type":"undefined"}}}"#).unwrap();
        assert_eq!(resp.id, Some(3));
        assert!(resp.method.is_none());

        let event: ProtocolMessage = serde_json::from_str(
            r#"{"method":"Debugger.scriptParsed","params":{"url":"a.js","executionContextId":2}}"#,
        )
        .unwrap();
        assert_eq!(event.method.as_deref(), Some(methods::SCRIPT_PARSED));
        let parsed: ScriptParsed = serde_json::from_value(event.params).unwrap();
        assert_eq!(parsed.execution_context_id, 2);
    }

    #[test]
    fn error_frame_parses() {
        let resp: ProtocolMessage = serde_json::from_str(
            r#"{"id":9,"error":{"code":-32000,"message":"Cannot find context with specified id"}}"#,
        )
        .unwrap();
        let err = resp.error.unwrap();
        assert_eq!(err.code, -32000);
    }
}
