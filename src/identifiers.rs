//! Type-safe identifiers for DOM handles and capture sessions.
//!
//! Newtype wrappers prevent mixing node handles, root handles and
//! session ids at compile time.
//!
//! | Type | Wraps | Meaning |
//! |------|-------|---------|
//! | [`NodeId`] | `usize` | Element handle inside a [`Dom`](crate::dom::Dom) host |
//! | [`RootId`] | `usize` | Document or shadow root handle |
//! | [`CaptureId`] | `Uuid` | One capture, from request to terminal state |
//! | [`TransferId`] | `Uuid` | One file-payload container instance |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// NodeId
// ============================================================================

/// Handle to an element owned by a DOM host.
///
/// Only meaningful for the host that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(usize);

impl NodeId {
    /// Creates a node handle from a host-specific index.
    #[inline]
    #[must_use]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Returns the host-specific index.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

// ============================================================================
// RootId
// ============================================================================

/// Handle to a traversable root: a document or a shadow root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RootId(usize);

impl RootId {
    /// Creates a root handle from a host-specific index.
    #[inline]
    #[must_use]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Returns the host-specific index.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for RootId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "root#{}", self.0)
    }
}

// ============================================================================
// CaptureId
// ============================================================================

/// Identifier of one capture session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CaptureId(Uuid);

impl CaptureId {
    /// Generates a new random capture id.
    #[inline]
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID.
    #[inline]
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for CaptureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

// ============================================================================
// TransferId
// ============================================================================

/// Identifier of one file-payload container.
///
/// Every dispatched drag event carries a container with its own id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransferId(Uuid);

impl TransferId {
    /// Generates a new random transfer id.
    #[inline]
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for TransferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id_display() {
        assert_eq!(NodeId::new(7).to_string(), "node#7");
        assert_eq!(RootId::new(0).to_string(), "root#0");
    }

    #[test]
    fn test_generated_ids_are_distinct() {
        assert_ne!(CaptureId::generate(), CaptureId::generate());
        assert_ne!(TransferId::generate(), TransferId::generate());
    }

    #[test]
    fn test_node_id_serializes_transparently() {
        let json = serde_json::to_string(&NodeId::new(3)).unwrap();
        assert_eq!(json, "3");
    }
}
