//! Outgoing JSON-RPC 2.0 messages.
//!
//! Requests carry a correlation id and one of the three [`Method`]s the
//! client drives. Replies answer server-initiated requests.
//!
//! # Format
//!
//! ```json
//! {"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": { ... }}
//! {"jsonrpc": "2.0", "id": 9, "result": {"decision": "accept"}}
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::Serialize;
use serde_json::{Value, json};

use crate::identifiers::{RequestId, ThreadId};

// ============================================================================
// Constants
// ============================================================================

/// Protocol version tag on every message.
pub const JSONRPC_VERSION: &str = "2.0";

// ============================================================================
// Method
// ============================================================================

/// Request methods sent by the client, in handshake order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Method {
    /// Client introduction.
    #[serde(rename = "initialize")]
    Initialize,
    /// Creates the conversation thread.
    #[serde(rename = "thread/start")]
    ThreadStart,
    /// Submits the prompt.
    #[serde(rename = "turn/start")]
    TurnStart,
}

impl Method {
    /// Returns the wire name.
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Initialize => "initialize",
            Self::ThreadStart => "thread/start",
            Self::TurnStart => "turn/start",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Request
// ============================================================================

/// A JSON-RPC request from the client.
#[derive(Debug, Clone, Serialize)]
pub struct Request<P> {
    /// Always `"2.0"`.
    pub jsonrpc: &'static str,
    /// Correlation id.
    pub id: RequestId,
    /// Method name.
    pub method: Method,
    /// Method parameters.
    pub params: P,
}

impl<P: Serialize> Request<P> {
    /// Creates a request.
    #[inline]
    #[must_use]
    pub fn new(id: RequestId, method: Method, params: P) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            method,
            params,
        }
    }
}

// ============================================================================
// Reply
// ============================================================================

/// A result sent back for a server-initiated request.
///
/// The id is echoed verbatim, whatever JSON type the server used.
#[derive(Debug, Clone, Serialize)]
pub struct Reply {
    /// Always `"2.0"`.
    pub jsonrpc: &'static str,
    /// The server's request id.
    pub id: Value,
    /// Result payload.
    pub result: Value,
}

impl Reply {
    /// Creates a reply.
    #[inline]
    #[must_use]
    pub fn new(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            result,
        }
    }

    /// Creates an approval reply.
    #[inline]
    #[must_use]
    pub fn accept(id: Value) -> Self {
        Self::new(id, json!({ "decision": "accept" }))
    }
}

// ============================================================================
// Params
// ============================================================================

/// Client identity sent with `initialize`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientInfo {
    /// Client name.
    pub name: String,
    /// Client version.
    pub version: String,
}

impl ClientInfo {
    /// Creates client info.
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

impl Default for ClientInfo {
    fn default() -> Self {
        Self::new(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
    }
}

/// `initialize` params.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    /// Client identity.
    pub client_info: ClientInfo,
}

/// `thread/start` params.
#[derive(Debug, Clone, Serialize)]
pub struct ThreadStartParams {
    /// Model name.
    pub model: String,
    /// Thread is discarded after the session.
    pub ephemeral: bool,
    /// Working directory for the agent.
    pub cwd: String,
}

/// Reasoning effort requested for the turn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Effort {
    /// Fastest.
    Low,
    /// Balanced.
    #[default]
    Medium,
    /// Most thorough.
    High,
}

/// `turn/start` params.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnStartParams {
    /// Thread created by `thread/start`.
    pub thread_id: ThreadId,
    /// Reasoning effort.
    pub effort: Effort,
    /// Input items; always exactly one text item.
    pub input: Vec<InputItem>,
}

impl TurnStartParams {
    /// Creates params carrying one text prompt.
    #[must_use]
    pub fn text(thread_id: ThreadId, effort: Effort, prompt: impl Into<String>) -> Self {
        Self {
            thread_id,
            effort,
            input: vec![InputItem::text(prompt)],
        }
    }
}

/// One turn input item.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum InputItem {
    /// Plain text.
    Text {
        /// The text.
        text: String,
        /// Rich-text spans; always empty.
        #[serde(rename = "textElements")]
        text_elements: Vec<Value>,
    },
}

impl InputItem {
    /// Creates a text item without rich-text spans.
    #[inline]
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text {
            text: text.into(),
            text_elements: Vec::new(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initialize_request_serialization() {
        let request = Request::new(
            RequestId::FIRST,
            Method::Initialize,
            InitializeParams {
                client_info: ClientInfo::new("codex-markdown", "0.1.0"),
            },
        );

        let json = serde_json::to_string(&request).expect("serialize");
        assert_eq!(
            json,
            r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{"clientInfo":{"name":"codex-markdown","version":"0.1.0"}}}"#
        );
    }

    #[test]
    fn test_thread_start_params() {
        let params = ThreadStartParams {
            model: "gpt-5.3-codex-spark".to_string(),
            ephemeral: true,
            cwd: "/home/user".to_string(),
        };

        let value = serde_json::to_value(&params).expect("serialize");
        assert_eq!(
            value,
            json!({"model": "gpt-5.3-codex-spark", "ephemeral": true, "cwd": "/home/user"})
        );
    }

    #[test]
    fn test_turn_start_params() {
        let params = TurnStartParams::text(ThreadId::new("t1"), Effort::Medium, "prompt");

        let value = serde_json::to_value(&params).expect("serialize");
        assert_eq!(
            value,
            json!({
                "threadId": "t1",
                "effort": "medium",
                "input": [{"type": "text", "text": "prompt", "textElements": []}]
            })
        );
    }

    #[test]
    fn test_accept_reply_serialization() {
        let reply = Reply::accept(json!(9));
        let json = serde_json::to_string(&reply).expect("serialize");
        assert_eq!(json, r#"{"jsonrpc":"2.0","id":9,"result":{"decision":"accept"}}"#);
    }

    #[test]
    fn test_reply_echoes_string_id() {
        let reply = Reply::accept(json!("req-7"));
        let value = serde_json::to_value(&reply).expect("serialize");
        assert_eq!(value["id"], json!("req-7"));
    }

    #[test]
    fn test_method_names() {
        assert_eq!(Method::Initialize.as_str(), "initialize");
        assert_eq!(Method::ThreadStart.to_string(), "thread/start");
        assert_eq!(
            serde_json::to_value(Method::TurnStart).expect("serialize"),
            json!("turn/start")
        );
    }

    #[test]
    fn test_effort_lowercase() {
        assert_eq!(serde_json::to_value(Effort::High).expect("serialize"), json!("high"));
        assert_eq!(Effort::default(), Effort::Medium);
    }
}
