//! Builder pattern for converter configuration.
//!
//! Provides a fluent API for configuring and creating [`Converter`] instances.
//!
//! # Example
//!
//! ```no_run
//! use codex_markdown::{Converter, PageContent};
//!
//! # async fn example() -> codex_markdown::Result<()> {
//! let converter = Converter::builder()
//!     .endpoint("ws://127.0.0.1:8080")
//!     .reader(|| Ok(PageContent::new("https://example.com", "Example", "Hello")))
//!     .build()?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::page::{PageReader, SharedReader};
use crate::protocol::{ClientInfo, Effort};
use crate::transport::Endpoint;

use super::core::Converter;
use super::options::ConverterOptions;

// ============================================================================
// ConverterBuilder
// ============================================================================

/// Builder for configuring a [`Converter`] instance.
///
/// Use [`Converter::builder()`] to create a new builder.
#[derive(Debug, Default, Clone)]
pub struct ConverterBuilder {
    /// Endpoint URL, parsed at build time.
    endpoint: Option<String>,
    /// Host override.
    host: Option<String>,
    /// Port override.
    port: Option<u16>,
    /// Model name.
    model: Option<String>,
    /// Reasoning effort.
    effort: Option<Effort>,
    /// Agent working directory.
    cwd: Option<PathBuf>,
    /// Client identity.
    client: Option<ClientInfo>,
    /// Connect plus handshake bound.
    connect_timeout: Option<Duration>,
    /// Body cap in characters.
    max_body_chars: Option<usize>,
    /// Page source.
    reader: Option<SharedReader>,
}

// ============================================================================
// ConverterBuilder Implementation
// ============================================================================

impl ConverterBuilder {
    /// Creates a new converter builder with no configuration.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the app-server URL.
    ///
    /// # Arguments
    ///
    /// * `url` - WebSocket URL (e.g., "ws://127.0.0.1:8080")
    #[inline]
    #[must_use]
    pub fn endpoint(mut self, url: impl Into<String>) -> Self {
        self.endpoint = Some(url.into());
        self
    }

    /// Sets the app-server host, overriding the endpoint URL's host.
    #[inline]
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Sets the app-server port, overriding the endpoint URL's port.
    #[inline]
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Sets the model requested in `thread/start`.
    #[inline]
    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sets the reasoning effort for `turn/start`.
    #[inline]
    #[must_use]
    pub fn effort(mut self, effort: Effort) -> Self {
        self.effort = Some(effort);
        self
    }

    /// Sets the working directory reported to the agent.
    #[inline]
    #[must_use]
    pub fn cwd(mut self, path: impl Into<PathBuf>) -> Self {
        self.cwd = Some(path.into());
        self
    }

    /// Sets the client identity sent with `initialize`.
    #[inline]
    #[must_use]
    pub fn client_info(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        self.client = Some(ClientInfo::new(name, version));
        self
    }

    /// Bounds TCP connect plus upgrade handshake.
    ///
    /// Without this the converter waits indefinitely, and no bound is ever
    /// applied to individual RPC steps.
    #[inline]
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Sets the page body cap, in characters.
    #[inline]
    #[must_use]
    pub fn max_body_chars(mut self, max: usize) -> Self {
        self.max_body_chars = Some(max);
        self
    }

    /// Sets the page source.
    ///
    /// # Arguments
    ///
    /// * `reader` - Any [`PageReader`], including a closure
    #[inline]
    #[must_use]
    pub fn reader(mut self, reader: impl PageReader) -> Self {
        self.reader = Some(SharedReader::new(reader));
        self
    }

    /// Builds the converter with validation.
    ///
    /// Spawns the converter task, so this must be called inside a tokio
    /// runtime.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if no reader is set or a value is out of range
    /// - [`Error::Url`] if the endpoint URL is malformed
    pub fn build(self) -> Result<Converter> {
        let options = self.validate_options()?;
        let reader = self.validate_reader()?;

        Ok(Converter::spawn(options, reader))
    }
}

// ============================================================================
// Validation
// ============================================================================

impl ConverterBuilder {
    /// Validates everything except the reader.
    fn validate_options(&self) -> Result<ConverterOptions> {
        let defaults = ConverterOptions::default();

        Ok(ConverterOptions {
            endpoint: self.validate_endpoint()?,
            model: self.validate_model()?.unwrap_or(defaults.model),
            effort: self.effort.unwrap_or(defaults.effort),
            cwd: self.cwd.clone().unwrap_or(defaults.cwd),
            client: self.client.clone().unwrap_or(defaults.client),
            connect_timeout: self.validate_connect_timeout()?,
            max_body_chars: self.validate_max_body_chars()?.unwrap_or(defaults.max_body_chars),
        })
    }

    /// Validates the endpoint configuration.
    fn validate_endpoint(&self) -> Result<Endpoint> {
        let base = match &self.endpoint {
            Some(url) => Endpoint::parse(url)?,
            None => Endpoint::default(),
        };

        let host = self.host.clone().unwrap_or_else(|| base.host().to_string());
        let port = self.port.unwrap_or(base.port());

        if host.trim().is_empty() {
            return Err(Error::config("Endpoint host must not be empty."));
        }
        if port == 0 {
            return Err(Error::config("Endpoint port must not be 0."));
        }

        Ok(Endpoint::new(host, port))
    }

    /// Validates the model name.
    fn validate_model(&self) -> Result<Option<String>> {
        match &self.model {
            Some(model) if model.trim().is_empty() => {
                Err(Error::config("Model name must not be empty."))
            }
            other => Ok(other.clone()),
        }
    }

    /// Validates the connect timeout.
    fn validate_connect_timeout(&self) -> Result<Option<Duration>> {
        match self.connect_timeout {
            Some(timeout) if timeout.is_zero() => Err(Error::config(
                "Connect timeout must be greater than zero. Omit it to wait indefinitely.",
            )),
            other => Ok(other),
        }
    }

    /// Validates the body cap.
    fn validate_max_body_chars(&self) -> Result<Option<usize>> {
        match self.max_body_chars {
            Some(0) => Err(Error::config("max_body_chars must be greater than zero.")),
            other => Ok(other),
        }
    }

    /// Validates the reader configuration.
    fn validate_reader(&self) -> Result<SharedReader> {
        self.reader.clone().ok_or_else(|| {
            Error::config(
                "A page reader is required. Use .reader() to set it.\n\
                 Example: Converter::builder().reader(|| Ok(PageContent::new(url, title, body)))",
            )
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::page::PageContent;

    #[test]
    fn test_new_creates_empty_builder() {
        let builder = ConverterBuilder::new();
        assert!(builder.endpoint.is_none());
        assert!(builder.reader.is_none());
    }

    #[test]
    fn test_defaults_apply() {
        let options = ConverterBuilder::new().validate_options().expect("options");
        assert_eq!(options, ConverterOptions::default());
    }

    #[test]
    fn test_endpoint_parsed() {
        let options = ConverterBuilder::new()
            .endpoint("ws://localhost:9000")
            .validate_options()
            .expect("options");
        assert_eq!(options.endpoint, Endpoint::new("localhost", 9000));
    }

    #[test]
    fn test_host_and_port_override_endpoint() {
        let options = ConverterBuilder::new()
            .endpoint("ws://localhost:9000")
            .host("10.0.0.2")
            .port(7000)
            .validate_options()
            .expect("options");
        assert_eq!(options.endpoint.ws_url(), "ws://10.0.0.2:7000");
    }

    #[test]
    fn test_rejects_non_ws_scheme() {
        let result = ConverterBuilder::new().endpoint("http://localhost:8080").validate_options();
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[test]
    fn test_rejects_malformed_url() {
        let result = ConverterBuilder::new().endpoint("not a url").validate_options();
        assert!(matches!(result, Err(Error::Url(_))));
    }

    #[test]
    fn test_rejects_port_zero() {
        let result = ConverterBuilder::new().port(0).validate_options();
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_blank_model() {
        let result = ConverterBuilder::new().model("  ").validate_options();
        assert!(result.unwrap_err().to_string().contains("Model"));
    }

    #[test]
    fn test_rejects_zero_timeout() {
        let result = ConverterBuilder::new()
            .connect_timeout(Duration::ZERO)
            .validate_options();
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_zero_body_cap() {
        let result = ConverterBuilder::new().max_body_chars(0).validate_options();
        assert!(result.is_err());
    }

    #[test]
    fn test_overrides_apply() {
        let options = ConverterBuilder::new()
            .model("gpt-test")
            .effort(Effort::High)
            .cwd("/srv")
            .client_info("tester", "9.9")
            .connect_timeout(Duration::from_secs(2))
            .max_body_chars(10)
            .validate_options()
            .expect("options");

        assert_eq!(options.model, "gpt-test");
        assert_eq!(options.effort, Effort::High);
        assert_eq!(options.cwd, PathBuf::from("/srv"));
        assert_eq!(options.client, ClientInfo::new("tester", "9.9"));
        assert_eq!(options.connect_timeout, Some(Duration::from_secs(2)));
        assert_eq!(options.max_body_chars, 10);
    }

    #[test]
    fn test_build_fails_without_reader() {
        let result = ConverterBuilder::new().build();
        let err = result.unwrap_err();
        assert!(err.to_string().contains("reader"));
    }

    #[test]
    fn test_reader_sets_source() {
        let builder = ConverterBuilder::new().reader(|| Ok(PageContent::new("u", "t", "b")));
        assert!(builder.validate_reader().is_ok());
    }

    #[test]
    fn test_builder_is_clone() {
        let builder = ConverterBuilder::new().model("m");
        let cloned = builder.clone();
        assert_eq!(builder.model, cloned.model);
    }
}
