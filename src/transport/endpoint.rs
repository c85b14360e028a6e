//! WebSocket endpoint address.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use url::{Host, Url};

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Loopback host the app-server listens on by default.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Port the app-server listens on by default.
pub const DEFAULT_PORT: u16 = 8080;

// ============================================================================
// Endpoint
// ============================================================================

/// Host and port of the app-server WebSocket listener.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    /// Host name or IP literal, without IPv6 brackets.
    host: String,
    /// TCP port.
    port: u16,
}

impl Default for Endpoint {
    fn default() -> Self {
        Self::new(DEFAULT_HOST, DEFAULT_PORT)
    }
}

impl Endpoint {
    /// Creates an endpoint from a host and port.
    #[inline]
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Parses a `ws://host[:port]` URL.
    ///
    /// # Errors
    ///
    /// - [`Error::Url`] if the URL is malformed
    /// - [`Error::Config`] if the scheme is not `ws` or the host is missing
    pub fn parse(input: &str) -> Result<Self> {
        let url = Url::parse(input)?;

        if url.scheme() != "ws" {
            return Err(Error::config(format!(
                "Unsupported endpoint scheme '{}'. Only ws:// is supported.",
                url.scheme()
            )));
        }

        let host = match url.host() {
            Some(Host::Domain(domain)) => domain.to_string(),
            Some(Host::Ipv4(addr)) => addr.to_string(),
            Some(Host::Ipv6(addr)) => addr.to_string(),
            None => return Err(Error::config(format!("Endpoint '{input}' has no host"))),
        };

        let port = url
            .port_or_known_default()
            .ok_or_else(|| Error::config(format!("Endpoint '{input}' has no port")))?;

        Ok(Self { host, port })
    }

    /// Returns the host.
    #[inline]
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the port.
    #[inline]
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Returns `host:port` as used in the `Host` request header.
    #[must_use]
    pub fn authority(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    /// Returns the WebSocket URL.
    #[inline]
    #[must_use]
    pub fn ws_url(&self) -> String {
        format!("ws://{}", self.authority())
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.ws_url())
    }
}

impl FromStr for Endpoint {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

// ============================================================================
// Tests
// ============================================================================
