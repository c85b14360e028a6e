//! Incoming message classification.
//!
//! Every text frame is parsed once into an [`Envelope`] and then resolved
//! against the pending-request table into one [`Incoming`] kind.
//!
//! | Shape | Kind |
//! |-------|------|
//! | `id` known to the correlator | [`Incoming::Response`] |
//! | `id` + `method` | [`Incoming::ServerRequest`] |
//! | `method` only | [`Incoming::Notification`] |
//! | anything else, or invalid JSON | [`Incoming::Ignored`] |

// ============================================================================
// Imports
// ============================================================================

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::identifiers::{RequestId, ThreadId};

use super::Method;

// ============================================================================
// Constants
// ============================================================================

/// Streamed agent output fragment.
pub const AGENT_MESSAGE_DELTA: &str = "item/agentMessage/delta";

/// The turn finished.
pub const TURN_COMPLETED: &str = "turn/completed";

/// The turn failed.
pub const TURN_ERROR: &str = "turn/error";

/// Fallback message for an error object without one.
const UNKNOWN_ERROR: &str = "Unknown error";

/// Fallback message for `turn/error` without one.
const TURN_FAILED: &str = "Turn failed";

// ============================================================================
// Envelope
// ============================================================================

/// Loosely-typed JSON-RPC message as it came off the wire.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Envelope {
    /// Request or response id, any JSON type.
    #[serde(default)]
    pub id: Option<Value>,

    /// Method name for requests and notifications.
    #[serde(default)]
    pub method: Option<String>,

    /// Request or notification params.
    #[serde(default)]
    pub params: Option<Value>,

    /// Success payload of a response.
    #[serde(default)]
    pub result: Option<Value>,

    /// Error payload of a response.
    #[serde(default)]
    pub error: Option<Value>,
}

impl Envelope {
    /// Parses a JSON object, returning `None` for anything else.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        serde_json::from_str(text).ok()
    }

    /// Returns the id as a request id if it is a positive integer.
    #[inline]
    #[must_use]
    pub fn request_id(&self) -> Option<RequestId> {
        self.id.as_ref().and_then(Value::as_u64).and_then(RequestId::new)
    }
}

// ============================================================================
// Incoming
// ============================================================================

/// A classified inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum Incoming {
    /// Answer to one of our requests.
    Response(Response),
    /// Request initiated by the server.
    ServerRequest(ServerRequest),
    /// Notification from the server.
    Notification(Notification),
    /// Malformed or unrecognized; dropped without a state change.
    Ignored,
}

// ============================================================================
// Response
// ============================================================================

/// A response matched to a pending request.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    /// Correlation id.
    pub id: RequestId,
    /// Method of the request this answers.
    pub method: Method,
    /// Result object, or the server's error.
    pub outcome: Result<Value, RpcError>,
}

impl Response {
    /// Builds a response from an envelope whose id was pending.
    #[must_use]
    pub fn from_envelope(id: RequestId, method: Method, envelope: Envelope) -> Self {
        let outcome = match envelope.error {
            Some(Value::Object(error)) => Err(RpcError::from_object(&error)),
            _ => Ok(envelope.result.unwrap_or_else(|| Value::Object(Map::new()))),
        };

        Self { id, method, outcome }
    }
}

/// Error object of a failed response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcError {
    /// Error message.
    pub message: String,
}

impl RpcError {
    fn from_object(error: &Map<String, Value>) -> Self {
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or(UNKNOWN_ERROR)
            .to_string();
        Self { message }
    }
}

// ============================================================================
// ThreadStartResult
// ============================================================================

/// Successful `thread/start` result.
#[derive(Debug, Clone, Deserialize)]
pub struct ThreadStartResult {
    /// The created thread.
    pub thread: ThreadRef,
}

/// Thread reference inside a result.
#[derive(Debug, Clone, Deserialize)]
pub struct ThreadRef {
    /// Server-assigned id.
    pub id: ThreadId,
}

impl ThreadStartResult {
    /// Extracts `result.thread.id`, if present and a string.
    #[must_use]
    pub fn thread_id(result: &Value) -> Option<ThreadId> {
        Self::deserialize(result).ok().map(|parsed| parsed.thread.id)
    }
}

// ============================================================================
// ServerRequest
// ============================================================================

/// A request the server sent to us.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerRequest {
    /// The server's id, echoed in the reply.
    pub id: Value,
    /// Method name.
    pub method: String,
}

impl ServerRequest {
    /// Returns `true` for approval-style requests that get auto-accepted.
    #[must_use]
    pub fn is_approval(&self) -> bool {
        self.method.to_ascii_lowercase().contains("approval")
            || self.method == "commandExecution"
            || self.method == "fileChange"
    }
}

// ============================================================================
// Notification
// ============================================================================

/// Server notifications the session reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// Output fragment to append.
    AgentMessageDelta {
        /// The fragment.
        delta: String,
    },
    /// The turn finished.
    TurnCompleted,
    /// The turn failed.
    TurnError {
        /// Error message.
        message: String,
    },
    /// Any other notification.
    Other {
        /// Method name.
        method: String,
    },
}

impl Notification {
    /// Types a notification from its method and params.
    ///
    /// Returns `None` when a known notification is missing its payload.
    #[must_use]
    pub fn from_parts(method: String, params: Option<Value>) -> Option<Self> {
        let params = params.unwrap_or(Value::Null);

        match method.as_str() {
            AGENT_MESSAGE_DELTA => params
                .get("delta")
                .and_then(Value::as_str)
                .map(|delta| Self::AgentMessageDelta {
                    delta: delta.to_string(),
                }),
            TURN_COMPLETED => Some(Self::TurnCompleted),
            TURN_ERROR => {
                let error = params.get("error");
                let message = error
                    .and_then(Value::as_str)
                    .or_else(|| error.and_then(|e| e.get("message")).and_then(Value::as_str))
                    .unwrap_or(TURN_FAILED);
                Some(Self::TurnError {
                    message: message.to_string(),
                })
            }
            _ => Some(Self::Other { method }),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
