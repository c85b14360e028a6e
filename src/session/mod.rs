//! Conversion session: state, prompt and the event reducer.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `machine` | [`Session`] reducer, [`SessionEvent`] and [`Action`] |
//! | `prompt` | Fixed conversion prompt |
//! | `state` | [`ConversionState`] and [`Snapshot`] |

// ============================================================================
// Submodules
// ============================================================================

/// Event reducer.
pub mod machine;

/// Prompt template.
pub mod prompt;

/// State and snapshot types.
pub mod state;

// ============================================================================
// Re-exports
// ============================================================================

pub use machine::{Action, Actions, Session, SessionEvent};
pub use prompt::build_prompt;
pub use state::{ConversionState, Snapshot};
