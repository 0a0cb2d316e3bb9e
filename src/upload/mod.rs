//! Upload orchestration.
//!
//! | Module | Description |
//! |--------|-------------|
//! | `scheduler` | [`Uploader`], [`CaptureSession`], [`UploadState`], [`UploadReport`] |
//! | `builder` | [`UploaderBuilder`] |
//! | `options` | [`UploadOptions`] |
//! | `fallback` | [`FallbackPresenter`], [`DownloadFallback`] |

// ============================================================================
// Submodules
// ============================================================================

/// Uploader builder.
pub mod builder;

/// Manual-completion fallback.
pub mod fallback;

/// Retry and delivery settings.
pub mod options;

/// Retry state machine.
pub mod scheduler;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::UploaderBuilder;
pub use fallback::{DownloadFallback, FallbackPresenter, FallbackRequest};
pub use options::UploadOptions;
pub use scheduler::{CancelHandle, CaptureSession, UploadReport, UploadState, Uploader};
