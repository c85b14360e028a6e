//! Error types for the Markdown converter.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use codex_markdown::{Converter, Result};
//!
//! async fn example(converter: &Converter) -> Result<String> {
//!     converter.convert();
//!     converter.finished().await
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`] |
//! | Reader | [`Error::Reader`] |
//! | Connection | [`Error::Connection`], [`Error::ConnectionTimeout`], [`Error::ConnectionClosed`], [`Error::Handshake`], [`Error::Unreachable`], [`Error::Disconnected`] |
//! | Protocol | [`Error::Protocol`], [`Error::Server`], [`Error::MissingThread`], [`Error::Turn`] |
//! | Outcome | [`Error::Failed`], [`Error::Cancelled`] |
//! | External | [`Error::Io`], [`Error::Json`], [`Error::Url`] |
//!
//! The display strings of the conversion-failure variants are the exact
//! messages shown in [`ConversionState::Error`](crate::ConversionState::Error).

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;

use thiserror::Error;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// ReaderError
// ============================================================================

/// Failure reported by a [`PageReader`](crate::PageReader).
///
/// Reader failures are terminal for the conversion and happen before any
/// network activity.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReaderError {
    /// The browser (or other page source) is not running.
    #[error("{app} is not running. Open a page in {app} and try again.")]
    NotRunning {
        /// Name of the application that was expected.
        app: String,
    },

    /// The scripting bridge failed to read the page.
    #[error("Could not read page content: {message}")]
    Scripting {
        /// Message from the scripting layer.
        message: String,
    },

    /// The page had no readable text.
    #[error("Page content is empty. The page may still be loading, or it may be a PDF/image.")]
    EmptyContent,
}

impl ReaderError {
    /// Creates a not-running error.
    #[inline]
    pub fn not_running(app: impl Into<String>) -> Self {
        Self::NotRunning { app: app.into() }
    }

    /// Creates a scripting error.
    #[inline]
    pub fn scripting(message: impl Into<String>) -> Self {
        Self::Scripting {
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when converter configuration is invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // Reader Errors
    // ========================================================================
    /// The page reader failed.
    #[error(transparent)]
    Reader(#[from] ReaderError),

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// TCP connection or socket I/O failed.
    #[error("Connection failed: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    /// Connect + upgrade did not finish within the configured bound.
    #[error("Connection timeout after {timeout_ms}ms")]
    ConnectionTimeout {
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    /// The peer closed the stream.
    #[error("Connection closed by peer")]
    ConnectionClosed,

    /// The HTTP upgrade was rejected or malformed.
    #[error("Handshake rejected: {response}")]
    Handshake {
        /// Leading part of the peer's response.
        response: String,
    },

    /// The app-server could not be reached while connecting.
    #[error("Could not connect to Codex server. Is `codex-app-server --listen {endpoint}` running?")]
    Unreachable {
        /// WebSocket URL that was dialed.
        endpoint: String,
    },

    /// The transport went away mid-conversation.
    #[error("Disconnected: {reason}")]
    Disconnected {
        /// Disconnect reason reported by the transport.
        reason: String,
    },

    // ========================================================================
    // Protocol Errors
    // ========================================================================
    /// Protocol violation or unexpected frame.
    #[error("Protocol error: {message}")]
    Protocol {
        /// Description of the protocol violation.
        message: String,
    },

    /// The server answered a request with a JSON-RPC error object.
    #[error("Server error ({method}): {message}")]
    Server {
        /// Method of the request that failed.
        method: String,
        /// Error message from the server.
        message: String,
    },

    /// `thread/start` succeeded without a thread id.
    #[error("Failed to create thread")]
    MissingThread,

    /// The server reported `turn/error`.
    #[error("{message}")]
    Turn {
        /// Error message from the notification.
        message: String,
    },

    // ========================================================================
    // Outcome Errors
    // ========================================================================
    /// The conversion ended in the error state.
    #[error("{message}")]
    Failed {
        /// Message carried by the error state.
        message: String,
    },

    /// The conversion was cancelled or reset before finishing.
    #[error("Conversion cancelled")]
    Cancelled,

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Endpoint URL parse error.
    #[error("Invalid endpoint: {0}")]
    Url(#[from] url::ParseError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a connection error.
    #[inline]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a connection timeout error.
    #[inline]
    pub fn connection_timeout(timeout_ms: u64) -> Self {
        Self::ConnectionTimeout { timeout_ms }
    }

    /// Creates a handshake error from the peer's response text.
    ///
    /// Only the first 100 characters are kept.
    #[inline]
    pub fn handshake(response: &str) -> Self {
        Self::Handshake {
            response: response.chars().take(100).collect(),
        }
    }

    /// Creates an unreachable-server error.
    #[inline]
    pub fn unreachable(endpoint: impl Into<String>) -> Self {
        Self::Unreachable {
            endpoint: endpoint.into(),
        }
    }

    /// Creates a disconnected error.
    #[inline]
    pub fn disconnected(reason: impl Into<String>) -> Self {
        Self::Disconnected {
            reason: reason.into(),
        }
    }

    /// Creates a protocol error.
    #[inline]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Creates a server error for a failed request.
    #[inline]
    pub fn server(method: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Server {
            method: method.into(),
            message: message.into(),
        }
    }

    /// Creates a turn error.
    #[inline]
    pub fn turn(message: impl Into<String>) -> Self {
        Self::Turn {
            message: message.into(),
        }
    }

    /// Creates a failed-conversion error.
    #[inline]
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. }
                | Self::ConnectionTimeout { .. }
                | Self::ConnectionClosed
                | Self::Handshake { .. }
                | Self::Unreachable { .. }
                | Self::Disconnected { .. }
                | Self::Io(_)
        )
    }

    /// Returns `true` if the peer violated or rejected the RPC exchange.
    #[inline]
    #[must_use]
    pub fn is_protocol_error(&self) -> bool {
        matches!(
            self,
            Self::Protocol { .. } | Self::Server { .. } | Self::MissingThread | Self::Turn { .. }
        )
    }

    /// Returns `true` if this is a page reader error.
    #[inline]
    #[must_use]
    pub fn is_reader_error(&self) -> bool {
        matches!(self, Self::Reader(_))
    }
}

// ============================================================================
// Tests
// ============================================================================
