//! Validated converter configuration.
//!
//! Produced by [`ConverterBuilder`](super::ConverterBuilder) and shared by
//! the orchestrator and the session.
//!
//! # Defaults
//!
//! | Field | Default |
//! |-------|---------|
//! | `endpoint` | `ws://127.0.0.1:8080` |
//! | `model` | `gpt-5.3-codex-spark` |
//! | `effort` | `medium` |
//! | `cwd` | home directory, else `.` |
//! | `client` | crate name and version |
//! | `connect_timeout` | none |
//! | `max_body_chars` | 60 000 |

// ============================================================================
// Imports
// ============================================================================

use std::path::PathBuf;
use std::time::Duration;

use crate::page::DEFAULT_MAX_BODY_CHARS;
use crate::protocol::{ClientInfo, Effort};
use crate::transport::Endpoint;

// ============================================================================
// Constants
// ============================================================================

/// Model requested in `thread/start` unless overridden.
pub const DEFAULT_MODEL: &str = "gpt-5.3-codex-spark";

// ============================================================================
// ConverterOptions
// ============================================================================

/// Converter configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConverterOptions {
    /// App-server address.
    pub endpoint: Endpoint,

    /// Model name for the thread.
    pub model: String,

    /// Reasoning effort for the turn.
    pub effort: Effort,

    /// Working directory reported to the agent.
    pub cwd: PathBuf,

    /// Client identity sent with `initialize`.
    pub client: ClientInfo,

    /// Optional bound on TCP connect plus upgrade handshake.
    pub connect_timeout: Option<Duration>,

    /// Page body cap, in characters.
    pub max_body_chars: usize,
}

impl Default for ConverterOptions {
    fn default() -> Self {
        Self {
            endpoint: Endpoint::default(),
            model: DEFAULT_MODEL.to_string(),
            effort: Effort::default(),
            cwd: default_cwd(),
            client: ClientInfo::default(),
            connect_timeout: None,
            max_body_chars: DEFAULT_MAX_BODY_CHARS,
        }
    }
}

impl ConverterOptions {
    /// Returns `cwd` as sent on the wire.
    #[inline]
    #[must_use]
    pub fn cwd_string(&self) -> String {
        self.cwd.to_string_lossy().into_owned()
    }
}

/// The user's home directory, or `.` when it cannot be determined.
#[must_use]
pub fn default_cwd() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = ConverterOptions::default();
        assert_eq!(options.endpoint.ws_url(), "ws://127.0.0.1:8080");
        assert_eq!(options.model, "gpt-5.3-codex-spark");
        assert_eq!(options.effort, Effort::Medium);
        assert_eq!(options.connect_timeout, None);
        assert_eq!(options.max_body_chars, 60_000);
        assert_eq!(options.client.name, env!("CARGO_PKG_NAME"));
    }

    #[test]
    fn test_cwd_string() {
        let options = ConverterOptions {
            cwd: PathBuf::from("/tmp/work"),
            ..Default::default()
        };
        assert_eq!(options.cwd_string(), "/tmp/work");
    }
}
