//! Codex Markdown - Convert web pages to Markdown through a local Codex app-server.
//!
//! This library reads one page through a caller-supplied reader, sends it
//! to a Codex app-server over a hand-rolled WebSocket connection, and
//! streams the agent's Markdown back.
//!
//! # Architecture
//!
//! The converter follows a client-server model:
//!
//! - **Client (Rust)**: Reads the page, drives the JSON-RPC conversation
//! - **Server (Codex app-server)**: Runs the model turn, streams deltas
//!
//! Key design principles:
//!
//! - One task owns all session state; everything else posts events to it
//! - The transport never touches session state, only emits events
//! - Inbound JSON is classified once into a tagged union
//! - No retries; a failed conversion is restarted by the caller
//!
//! # Quick Start
//!
//! ```no_run
//! use codex_markdown::{Converter, PageContent, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let converter = Converter::builder()
//!         .endpoint("ws://127.0.0.1:8080")
//!         .reader(|| Ok(PageContent::new("https://example.com", "Example", "Hello, world")))
//!         .build()?;
//!
//!     let markdown = converter.run().await?;
//!     println!("{markdown}");
//!
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`converter`] | [`Converter`] handle, builder and options |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`page`] | [`PageContent`] and [`PageReader`] |
//! | [`protocol`] | JSON-RPC message types (internal) |
//! | [`session`] | Conversion state machine |
//! | [`transport`] | WebSocket client (internal) |

// ============================================================================
// Modules
// ============================================================================

/// Converter handle and configuration.
///
/// Use [`Converter::builder()`] to create a configured converter.
pub mod converter;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers for RPC correlation.
pub mod identifiers;

/// Page content and readers.
pub mod page;

/// JSON-RPC protocol message types.
///
/// Internal module defining request, reply and notification structures.
pub mod protocol;

/// Conversion session state machine.
pub mod session;

/// WebSocket transport layer.
///
/// Internal module handling the TCP stream, handshake and framing.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Converter types
pub use converter::{Converter, ConverterBuilder, ConverterOptions};

// Error types
pub use error::{Error, ReaderError, Result};

// Identifier types
pub use identifiers::{RequestId, ThreadId};

// Page types
pub use page::{PageContent, PageReader};

// Protocol types
pub use protocol::{ClientInfo, Effort};

// Session types
pub use session::{ConversionState, Snapshot};
