//! Page content and the reader that supplies it.
//!
//! The converter never extracts text itself. A [`PageReader`] hands it one
//! [`PageContent`] per conversion, which is validated and capped before
//! it is folded into the prompt.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `content` | [`PageContent`] value and body preparation |
//! | `reader` | [`PageReader`] trait and [`SharedReader`] |

// ============================================================================
// Submodules
// ============================================================================

/// Page snapshot type.
pub mod content;

/// Reader trait.
pub mod reader;

// ============================================================================
// Re-exports
// ============================================================================

pub use content::{DEFAULT_MAX_BODY_CHARS, PageContent};
pub use reader::{PageReader, SharedReader};
