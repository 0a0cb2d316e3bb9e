//! Native DOM events dispatched into the page.
//!
//! Only standard event types are ever produced; third-party listeners
//! expect exactly these shapes.
//!
//! # Event Types
//!
//! | Kind | Type string | Bubbles | Cancelable | Payload |
//! |------|-------------|---------|------------|---------|
//! | [`EventKind::Input`] | `input` | yes | no | none |
//! | [`EventKind::Change`] | `change` | yes | no | none |
//! | [`EventKind::DragEnter`] | `dragenter` | yes | yes | [`DataTransfer`] |
//! | [`EventKind::DragOver`] | `dragover` | yes | yes | [`DataTransfer`] |
//! | [`EventKind::Drop`] | `drop` | yes | yes | [`DataTransfer`] |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::capture::CaptureFile;
use crate::identifiers::TransferId;

// ============================================================================
// EventKind
// ============================================================================

/// Standard event type names used by injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    /// `input`
    Input,
    /// `change`
    Change,
    /// `dragenter`
    DragEnter,
    /// `dragover`
    DragOver,
    /// `drop`
    Drop,
}

impl EventKind {
    /// Drag-family events in dispatch order.
    pub const DRAG_SEQUENCE: [EventKind; 3] = [Self::DragEnter, Self::DragOver, Self::Drop];

    /// Returns the DOM event type string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Change => "change",
            Self::DragEnter => "dragenter",
            Self::DragOver => "dragover",
            Self::Drop => "drop",
        }
    }

    /// Returns `true` for the drag-and-drop family.
    #[inline]
    #[must_use]
    pub const fn is_drag(self) -> bool {
        matches!(self, Self::DragEnter | Self::DragOver | Self::Drop)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// DataTransfer
// ============================================================================

/// File-payload container carried by drag events or assigned to inputs.
///
/// Each instance has its own [`TransferId`]. Some pages consume the
/// container on first read, so one instance is never shared between events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataTransfer {
    id: TransferId,
    files: Vec<CaptureFile>,
}

impl DataTransfer {
    /// Creates a container holding `files`.
    #[must_use]
    pub fn new(files: Vec<CaptureFile>) -> Self {
        Self {
            id: TransferId::generate(),
            files,
        }
    }

    /// Returns this container's id.
    #[inline]
    #[must_use]
    pub fn id(&self) -> TransferId {
        self.id
    }

    /// Returns the file list.
    #[inline]
    #[must_use]
    pub fn files(&self) -> &[CaptureFile] {
        &self.files
    }

    /// Returns the advertised data types (`Files` when non-empty).
    #[must_use]
    pub fn types(&self) -> &'static [&'static str] {
        if self.files.is_empty() { &[] } else { &["Files"] }
    }
}

// ============================================================================
// DomEvent
// ============================================================================

/// An event ready for dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DomEvent {
    /// Event type.
    #[serde(rename = "type")]
    pub kind: EventKind,

    /// Propagates to ancestors.
    pub bubbles: bool,

    /// Listeners may call `preventDefault`.
    pub cancelable: bool,

    /// Crosses shadow boundaries while bubbling.
    pub composed: bool,

    /// Payload for drag events.
    #[serde(skip)]
    pub data_transfer: Option<DataTransfer>,
}

impl DomEvent {
    /// Bubbling `input` event.
    #[must_use]
    pub fn input() -> Self {
        Self {
            kind: EventKind::Input,
            bubbles: true,
            cancelable: false,
            composed: true,
            data_transfer: None,
        }
    }

    /// Bubbling `change` event.
    #[must_use]
    pub fn change() -> Self {
        Self {
            kind: EventKind::Change,
            bubbles: true,
            cancelable: false,
            composed: false,
            data_transfer: None,
        }
    }

    /// Bubbling, cancelable drag-family event carrying `transfer`.
    #[must_use]
    pub fn drag(kind: EventKind, transfer: DataTransfer) -> Self {
        debug_assert!(kind.is_drag());
        Self {
            kind,
            bubbles: true,
            cancelable: true,
            composed: true,
            data_transfer: Some(transfer),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
