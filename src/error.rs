//! Error types for the upload engine.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! Fallible operations return [`Result<T>`] which uses [`Error`]. Errors raised
//! while walking or injecting into a page never escape the engine: they are
//! logged and turned into a failed attempt.
//!
//! ```ignore
//! use ask_screenshot::{Result, Selector};
//!
//! fn compile(pattern: &str) -> Result<Selector> {
//!     Selector::parse(pattern)
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`], [`Error::InvalidArgument`], [`Error::UnknownPlatform`] |
//! | Selector | [`Error::InvalidSelector`] |
//! | DOM | [`Error::NodeNotFound`], [`Error::RootNotFound`], [`Error::CrossOriginFrame`], [`Error::NotFileInput`], [`Error::Markup`] |
//! | Injection | [`Error::Unsupported`], [`Error::Dispatch`] |
//! | Capture | [`Error::DataUrl`], [`Error::Image`] |
//! | External | [`Error::Io`], [`Error::Json`] |

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;

use thiserror::Error;

use crate::identifiers::{NodeId, RootId};

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for debugging.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when uploader configuration is invalid or incomplete.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// Invalid argument.
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Description of the invalid argument.
        message: String,
    },

    /// Platform key not in the supported set.
    #[error("Unknown platform: {key}")]
    UnknownPlatform {
        /// The unrecognized key.
        key: String,
    },

    // ========================================================================
    // Selector Errors
    // ========================================================================
    /// Match pattern could not be parsed.
    #[error("Invalid selector {selector:?}: {message}")]
    InvalidSelector {
        /// The offending pattern.
        selector: String,
        /// What went wrong.
        message: String,
    },

    // ========================================================================
    // DOM Errors
    // ========================================================================
    /// Node handle does not exist in the host.
    #[error("Node not found: {node_id}")]
    NodeNotFound {
        /// The stale handle.
        node_id: NodeId,
    },

    /// Root handle does not exist in the host.
    #[error("Root not found: {root_id}")]
    RootNotFound {
        /// The stale handle.
        root_id: RootId,
    },

    /// Frame content is not reachable from this origin.
    ///
    /// Never retried: the frame stays unreachable for the page lifetime.
    #[error("Cross-origin frame: {node_id}")]
    CrossOriginFrame {
        /// The frame element.
        node_id: NodeId,
    },

    /// Element is not a file-input control.
    #[error("Not a file input: {node_id}")]
    NotFileInput {
        /// The element that was targeted.
        node_id: NodeId,
    },

    /// HTML fragment could not be parsed.
    #[error("Markup error at byte {offset}: {message}")]
    Markup {
        /// Byte offset into the fragment.
        offset: usize,
        /// What went wrong.
        message: String,
    },

    // ========================================================================
    // Injection Errors
    // ========================================================================
    /// Host cannot perform the operation (e.g. no `DataTransfer`).
    #[error("Unsupported in this context: {feature}")]
    Unsupported {
        /// The missing capability.
        feature: String,
    },

    /// Event dispatch failed.
    #[error("Dispatch of {event} failed: {message}")]
    Dispatch {
        /// Event type name.
        event: String,
        /// Failure description.
        message: String,
    },

    // ========================================================================
    // Capture Errors
    // ========================================================================
    /// Malformed `data:` URL.
    #[error("Invalid data URL: {message}")]
    DataUrl {
        /// Failure description.
        message: String,
    },

    /// Image payload could not be decoded.
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates an invalid argument error.
    #[inline]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates an unknown platform error.
    #[inline]
    pub fn unknown_platform(key: impl Into<String>) -> Self {
        Self::UnknownPlatform { key: key.into() }
    }

    /// Creates an invalid selector error.
    #[inline]
    pub fn invalid_selector(selector: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidSelector {
            selector: selector.into(),
            message: message.into(),
        }
    }

    /// Creates a node not found error.
    #[inline]
    pub fn node_not_found(node_id: NodeId) -> Self {
        Self::NodeNotFound { node_id }
    }

    /// Creates a root not found error.
    #[inline]
    pub fn root_not_found(root_id: RootId) -> Self {
        Self::RootNotFound { root_id }
    }

    /// Creates a cross-origin frame error.
    #[inline]
    pub fn cross_origin_frame(node_id: NodeId) -> Self {
        Self::CrossOriginFrame { node_id }
    }

    /// Creates a not-a-file-input error.
    #[inline]
    pub fn not_file_input(node_id: NodeId) -> Self {
        Self::NotFileInput { node_id }
    }

    /// Creates a markup error.
    #[inline]
    pub fn markup(offset: usize, message: impl Into<String>) -> Self {
        Self::Markup {
            offset,
            message: message.into(),
        }
    }

    /// Creates an unsupported capability error.
    #[inline]
    pub fn unsupported(feature: impl Into<String>) -> Self {
        Self::Unsupported {
            feature: feature.into(),
        }
    }

    /// Creates a dispatch error.
    #[inline]
    pub fn dispatch(event: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Dispatch {
            event: event.into(),
            message: message.into(),
        }
    }

    /// Creates a data URL error.
    #[inline]
    pub fn data_url(message: impl Into<String>) -> Self {
        Self::DataUrl {
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if the error means a target was simply not there (yet).
    #[inline]
    #[must_use]
    pub fn is_discovery_miss(&self) -> bool {
        matches!(
            self,
            Self::NodeNotFound { .. } | Self::RootNotFound { .. } | Self::NotFileInput { .. }
        )
    }

    /// Returns `true` if this is a cross-origin access denial.
    #[inline]
    #[must_use]
    pub fn is_cross_origin(&self) -> bool {
        matches!(self, Self::CrossOriginFrame { .. })
    }

    /// Returns `true` if this is an injection failure.
    #[inline]
    #[must_use]
    pub fn is_injection_error(&self) -> bool {
        matches!(self, Self::Unsupported { .. } | Self::Dispatch { .. })
    }

    /// Returns `true` if this error is recoverable.
    ///
    /// Recoverable errors may succeed on a later attempt, once the page
    /// has rendered more of itself.
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        self.is_discovery_miss() || self.is_injection_error()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::ErrorKind;

    #[test]
    fn test_error_display() {
        let err = Error::invalid_selector("[class*=", "unterminated attribute");
        assert_eq!(
            err.to_string(),
            "Invalid selector \"[class*=\": unterminated attribute"
        );
    }

    #[test]
    fn test_config_error() {
        let err = Error::config("missing dom host");
        assert_eq!(err.to_string(), "Configuration error: missing dom host");
    }

    #[test]
    fn test_cross_origin_is_not_recoverable() {
        let err = Error::cross_origin_frame(NodeId::new(4));
        assert!(err.is_cross_origin());
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_is_recoverable() {
        assert!(Error::node_not_found(NodeId::new(1)).is_recoverable());
        assert!(Error::unsupported("DataTransfer").is_recoverable());
        assert!(!Error::config("test").is_recoverable());
    }

    #[test]
    fn test_is_discovery_miss() {
        assert!(Error::not_file_input(NodeId::new(2)).is_discovery_miss());
        assert!(!Error::dispatch("drop", "boom").is_discovery_miss());
    }

    #[test]
    fn test_from_io_error() {
        let io_err = IoError::new(ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<String>("invalid").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
    }
}
