//! WebSocket transport layer.
//!
//! A minimal RFC 6455 client written directly on a tokio [`TcpStream`]:
//! upgrade handshake, masked text frames out, re-entrant frame decoding in,
//! automatic pong replies.
//!
//! [`TcpStream`]: tokio::net::TcpStream
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐                              ┌─────────────────┐
//! │  Converter      │                              │  Codex          │
//! │                 │         WebSocket            │  app-server     │
//! │  Connection  ───┼─────────────────────────────►│                 │
//! │  (event loop)   │◄─────────────────────────────┤  JSON-RPC 2.0   │
//! │                 │     127.0.0.1:8080           │                 │
//! └─────────────────┘                              └─────────────────┘
//! ```
//!
//! # Connection Lifecycle
//!
//! 1. `Connection::connect` - Spawn the event loop, dial TCP
//! 2. `Handshake::perform` - HTTP/1.1 upgrade, expect status 101
//! 3. `TransportEvent::Connected` - Text frames may be sent
//! 4. `TransportEvent::Message` - One event per decoded text frame
//! 5. `Connection::disconnect` - Abort the loop and drop the socket
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `connection` | Socket-owning event loop and handle |
//! | `endpoint` | Host/port of the app-server |
//! | `frame` | Frame encoding, decoding, and masking |
//! | `handshake` | Upgrade request and response check |

// ============================================================================
// Submodules
// ============================================================================

/// WebSocket connection and event loop.
pub mod connection;

/// App-server endpoint address.
pub mod endpoint;

/// Frame codec.
pub mod frame;

/// HTTP upgrade handshake.
pub mod handshake;

// ============================================================================
// Re-exports
// ============================================================================

pub use connection::{Connection, ConnectionState, TransportEvent};
pub use endpoint::Endpoint;
pub use frame::{Frame, Inbound, OpCode};
pub use handshake::Handshake;
