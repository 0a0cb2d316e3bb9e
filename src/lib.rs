//! Ask Screenshot - deliver a captured screenshot into an AI chat page.
//!
//! This library finds the upload affordance of a third-party chat page
//! (file input, upload button or drop zone) without prior knowledge of its
//! markup, and delivers a file to it by synthesizing the native events a
//! user's selection or drag-and-drop would produce.
//!
//! # Architecture
//!
//! Data flows leaf-first:
//!
//! - **Selector catalog**: ordered patterns per role, base plus platform overrides
//! - **Deep walker**: matches across shadow roots and same-origin frames
//! - **Resolvers**: first usable candidate; the real file input behind a control
//! - **Injector**: direct file assignment, else synthetic drag-and-drop
//! - **Scheduler**: bounded retries at a fixed interval, then the fallback
//!
//! Key design principles:
//!
//! - The page is reached only through the [`Dom`] trait
//! - Failures inside discovery and injection are logged, never propagated
//! - Cross-origin frames are skipped once and never retried
//! - The pending record is cleared exactly once per capture
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use ask_screenshot::{CaptureRequest, Document, DownloadFallback, PlatformKey, Result, Uploader};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let page = Arc::new(Document::parse(r#"<input type="file">"#)?);
//!
//!     let uploader = Uploader::builder()
//!         .dom(page)
//!         .fallback(Arc::new(DownloadFallback::new("./downloads")))
//!         .build()?;
//!
//!     let report = uploader
//!         .run(CaptureRequest::new(data_url, PlatformKey::Qwen))
//!         .await;
//!     println!("Delivered: {}", report.is_success());
//!
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`capture`] | Capture request, decoded file, pending record |
//! | [`discovery`] | Deep traversal and candidate resolution |
//! | [`dom`] | [`Dom`] host trait and the in-memory [`Document`] |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`inject`] | File assignment and drag-and-drop simulation |
//! | [`platform`] | Supported platforms and selector catalogs |
//! | [`upload`] | Retry scheduler, options, fallback |

// ============================================================================
// Modules
// ============================================================================

/// Capture input and the pending screenshot record.
pub mod capture;

/// Upload-target discovery.
///
/// - [`DeepWalker`] - pattern matching across shadow roots and frames
/// - [`pick_first_match`] - first usable candidate over a pattern list
/// - [`resolve_file_input`] - the native input behind a control
pub mod discovery;

/// DOM host abstraction.
pub mod dom;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers for DOM handles and sessions.
pub mod identifiers;

/// File injection strategies.
pub mod inject;

/// Supported platforms and their selector catalogs.
pub mod platform;

/// Retry scheduling and fallback.
///
/// Use [`Uploader::builder()`] to create a configured uploader.
pub mod upload;

// ============================================================================
// Re-exports
// ============================================================================

// Capture types
pub use capture::{
    CaptureFile, CaptureRequest, DEFAULT_FILE_NAME, ImageFormat, MemoryStore, PendingStore,
    ScreenshotRecord,
};

// Discovery
pub use discovery::{Candidate, DeepWalker, EXTENSION_ID_PREFIX, pick_first_match, resolve_file_input};

// DOM types
pub use dom::{DataTransfer, Document, Dom, DomEvent, EventKind, ListenerAction, Selector};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{CaptureId, NodeId, RootId, TransferId};

// Injection
pub use inject::{Injection, InjectionMethod, Injector};

// Platform types
pub use platform::catalog::{CompiledCatalog, Role, SelectorCatalog, build_catalog};
pub use platform::{PlatformKey, PlatformProfile};

// Upload types
pub use upload::{
    CancelHandle, CaptureSession, DownloadFallback, FallbackPresenter, FallbackRequest,
    UploadOptions, UploadReport, UploadState, Uploader, UploaderBuilder,
};
