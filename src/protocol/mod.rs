//! JSON-RPC 2.0 message layer for the Codex app-server.
//!
//! # Protocol Overview
//!
//! | Message | Direction | Purpose |
//! |---------|-----------|---------|
//! | `Request` | Client → Server | `initialize`, `thread/start`, `turn/start` |
//! | `Response` | Server → Client | Result or error for a client request |
//! | `ServerRequest` | Server → Client | Approval prompts and similar |
//! | `Reply` | Client → Server | Result for a server request |
//! | `Notification` | Server → Client | Streamed deltas and turn status |
//!
//! # Notification Naming
//!
//! Notifications follow `domain/event` paths:
//!
//! - `item/agentMessage/delta`
//! - `turn/completed`
//! - `turn/error`
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `correlator` | Id allocation and response matching |
//! | `message` | Inbound envelope and classification |
//! | `request` | Outbound requests, replies and params |

// ============================================================================
// Submodules
// ============================================================================

/// Request id allocation and response matching.
pub mod correlator;

/// Inbound message types.
pub mod message;

/// Outbound message types.
pub mod request;

// ============================================================================
// Re-exports
// ============================================================================

pub use correlator::Correlator;
pub use message::{Envelope, Incoming, Notification, Response, RpcError, ServerRequest, ThreadStartResult};
pub use request::{
    ClientInfo, Effort, InitializeParams, InputItem, Method, Reply, Request, ThreadStartParams,
    TurnStartParams,
};
