//! Upload-target discovery.
//!
//! | Module | Description |
//! |--------|-------------|
//! | `walker` | [`DeepWalker`]: pattern matching across shadow roots and frames |
//! | `resolver` | [`pick_first_match`] and [`resolve_file_input`] |

// ============================================================================
// Submodules
// ============================================================================

/// Candidate and file-input resolution.
pub mod resolver;

/// Deep traversal.
pub mod walker;

// ============================================================================
// Re-exports
// ============================================================================

pub use resolver::{any_element, file_input, pick_first_match, resolve_file_input, visible};
pub use walker::{Candidate, DeepWalker, EXTENSION_ID_PREFIX};
