//! HTTP/1.1 upgrade handshake (client side).
//!
//! The peer is a trusted loopback app-server, so the response is accepted
//! once it carries status 101 and an upgrade token; `Sec-WebSocket-Accept`
//! is not verified.

// ============================================================================
// Imports
// ============================================================================

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, trace};

use crate::error::{Error, Result};

use super::Endpoint;

// ============================================================================
// Constants
// ============================================================================

/// Upper bound on the response head before giving up.
const MAX_RESPONSE_HEAD: usize = 16 * 1024;

/// Terminator of the HTTP response head.
const HEAD_TERMINATOR: &[u8] = b"\r\n\r\n";

// ============================================================================
// Handshake
// ============================================================================

/// One upgrade attempt with its random `Sec-WebSocket-Key`.
#[derive(Debug, Clone)]
pub struct Handshake {
    /// Base64 of 16 random bytes.
    key: String,
}

impl Default for Handshake {
    fn default() -> Self {
        Self::new()
    }
}

impl Handshake {
    /// Generates a fresh key.
    #[must_use]
    pub fn new() -> Self {
        let nonce: [u8; 16] = rand::random();
        Self {
            key: STANDARD.encode(nonce),
        }
    }

    /// Returns the `Sec-WebSocket-Key` value.
    #[inline]
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Builds the literal upgrade request.
    #[must_use]
    pub fn request(&self, endpoint: &Endpoint) -> String {
        format!(
            "GET / HTTP/1.1\r\n\
             Host: {}\r\n\
             Upgrade: websocket\r\n\
             Connection: Upgrade\r\n\
             Sec-WebSocket-Key: {}\r\n\
             Sec-WebSocket-Version: 13\r\n\
             \r\n",
            endpoint.authority(),
            self.key
        )
    }

    /// Sends the request and reads the response head.
    ///
    /// Bytes that arrive after the response head are left in `buffer`;
    /// they already belong to the frame stream.
    ///
    /// # Errors
    ///
    /// - [`Error::Io`] if the socket fails
    /// - [`Error::ConnectionClosed`] if the peer hangs up before answering
    /// - [`Error::Handshake`] if the response is not an upgrade
    pub async fn perform<S>(&self, stream: &mut S, endpoint: &Endpoint, buffer: &mut BytesMut) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        stream.write_all(self.request(endpoint).as_bytes()).await?;
        stream.flush().await?;
        trace!(endpoint = %endpoint, "Upgrade request sent");

        loop {
            if let Some(end) = head_end(buffer) {
                let head = buffer.split_to(end);
                let head = String::from_utf8_lossy(&head);
                validate_response(&head)?;
                debug!(leftover = buffer.len(), "Upgrade accepted");
                return Ok(());
            }

            if buffer.len() > MAX_RESPONSE_HEAD {
                return Err(Error::handshake(&String::from_utf8_lossy(buffer)));
            }

            buffer.reserve(1024);
            if stream.read_buf(buffer).await? == 0 {
                return Err(if buffer.is_empty() {
                    Error::ConnectionClosed
                } else {
                    Error::handshake(&String::from_utf8_lossy(buffer))
                });
            }
        }
    }
}

// ============================================================================
// Response Parsing
// ============================================================================

/// Returns the index just past `\r\n\r\n`, if present.
fn head_end(buf: &[u8]) -> Option<usize> {
    buf.windows(HEAD_TERMINATOR.len())
        .position(|window| window == HEAD_TERMINATOR)
        .map(|pos| pos + HEAD_TERMINATOR.len())
}

/// Accepts a response head with status 101 and an upgrade token.
///
/// # Errors
///
/// Returns [`Error::Handshake`] otherwise.
pub fn validate_response(head: &str) -> Result<()> {
    let mut lines = head.lines();
    let status_line = lines.next().unwrap_or_default();

    let mut parts = status_line.split_whitespace();
    let is_http = parts.next().is_some_and(|version| version.starts_with("HTTP/"));
    let switching = parts.next() == Some("101");

    let upgraded = lines.any(|line| {
        let Some((name, value)) = line.split_once(':') else {
            return false;
        };
        let name = name.trim();
        name.eq_ignore_ascii_case("upgrade")
            || (name.eq_ignore_ascii_case("connection")
                && value.to_ascii_lowercase().contains("upgrade"))
    });

    if is_http && switching && upgraded {
        Ok(())
    } else {
        Err(Error::handshake(head))
    }
}

// ============================================================================
// Tests
// ============================================================================
