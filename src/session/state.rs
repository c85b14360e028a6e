//! Conversion state and the observable snapshot.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

// ============================================================================
// ConversionState
// ============================================================================

/// Where a conversion currently is.
///
/// ```text
/// Idle ──► ReadingPage ──► Connecting ──► Converting ──► Done
///               │               │              │
///               └───────────────┴──────────────┴───────► Error(message)
/// ```
///
/// `Done` and `Error` are stable until the next `convert`, `cancel` or
/// `reset`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ConversionState {
    /// Nothing in flight.
    #[default]
    Idle,
    /// Waiting on the page reader.
    ReadingPage,
    /// Connecting, or running `initialize` and `thread/start`.
    Connecting,
    /// `turn/start` sent; streaming output.
    Converting,
    /// The turn completed.
    Done,
    /// The conversion failed with a user-facing message.
    Error(String),
}

impl ConversionState {
    /// Returns `true` if a new conversion may start from this state.
    #[inline]
    #[must_use]
    pub fn accepts_convert(&self) -> bool {
        matches!(self, Self::Idle | Self::Done | Self::Error(_))
    }

    /// Returns `true` while RPC traffic is meaningful.
    #[inline]
    #[must_use]
    pub fn is_online(&self) -> bool {
        matches!(self, Self::Connecting | Self::Converting)
    }

    /// Returns `true` for `Done` and `Error`.
    #[inline]
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Error(_))
    }

    /// Returns the error message, if any.
    #[inline]
    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Error(message) => Some(message),
            _ => None,
        }
    }
}

impl fmt::Display for ConversionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::ReadingPage => f.write_str("readingPage"),
            Self::Connecting => f.write_str("connecting"),
            Self::Converting => f.write_str("converting"),
            Self::Done => f.write_str("done"),
            Self::Error(_) => f.write_str("error"),
        }
    }
}

// ============================================================================
// Snapshot
// ============================================================================

/// Everything a presentation layer needs, published after every event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    /// Current state.
    pub state: ConversionState,
    /// Markdown streamed so far.
    pub output: String,
    /// Title of the page being converted.
    pub source_title: String,
    /// URL of the page being converted.
    pub source_url: String,
    /// Body length of the page, in characters.
    pub page_char_count: usize,
}

impl Snapshot {
    /// One-line status for display.
    #[must_use]
    pub fn status_text(&self) -> String {
        match &self.state {
            ConversionState::Idle => "Ready".to_string(),
            ConversionState::ReadingPage => "Reading page...".to_string(),
            ConversionState::Connecting => "Connecting to Codex server...".to_string(),
            ConversionState::Converting => "Converting to Markdown...".to_string(),
            ConversionState::Done => format!("Done — {} chars", self.output.chars().count()),
            ConversionState::Error(message) => message.clone(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
