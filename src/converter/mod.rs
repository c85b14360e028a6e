//! Converter handle, builder and configuration.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use codex_markdown::{Converter, Effort, PageContent};
//!
//! # async fn example() -> codex_markdown::Result<()> {
//! let converter = Converter::builder()
//!     .endpoint("ws://127.0.0.1:8080")
//!     .effort(Effort::High)
//!     .connect_timeout(Duration::from_secs(5))
//!     .reader(|| Ok(PageContent::new("https://example.com", "Example", "Hello")))
//!     .build()?;
//!
//! let markdown = converter.run().await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `builder` | Fluent [`ConverterBuilder`] with validation |
//! | `core` | [`Converter`] handle and event loop |
//! | `options` | [`ConverterOptions`] and defaults |

// ============================================================================
// Submodules
// ============================================================================

/// Converter builder.
pub mod builder;

/// Converter handle.
pub mod core;

/// Converter configuration.
pub mod options;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::ConverterBuilder;
pub use self::core::Converter;
pub use options::{ConverterOptions, DEFAULT_MODEL};
