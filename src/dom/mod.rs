//! DOM host abstraction.
//!
//! The engine never touches a browser directly. Everything it needs from a
//! page goes through the [`Dom`] trait: structural matching inside one root,
//! enumeration of shadow roots and frame documents, attribute reads, file
//! assignment and synchronous event dispatch.
//!
//! | Module | Description |
//! |--------|-------------|
//! | `selector` | [`Selector`] parser and matcher |
//! | `event` | [`DomEvent`], [`EventKind`], [`DataTransfer`] |
//! | `document` | [`Document`], the bundled in-memory host |
//! | `markup` | HTML fragment parser feeding [`Document`] |
//!
//! # Example
//!
//! ```ignore
//! use ask_screenshot::dom::{Document, Dom};
//!
//! let doc = Document::parse(r#"<label for="f">Upload</label><input id="f" type="file" hidden>"#)?;
//! let root = doc.document();
//! assert_eq!(doc.elements(root).len(), 2);
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// In-memory arena DOM.
pub mod document;

/// Native-shaped DOM events.
pub mod event;

/// HTML fragment parser.
pub mod markup;

/// Structural match patterns.
pub mod selector;

// ============================================================================
// Re-exports
// ============================================================================

pub use document::{Document, FrameContent, Listener, ListenerAction};
pub use event::{DataTransfer, DomEvent, EventKind};
pub use selector::{ElementTree, Selector};

use crate::capture::CaptureFile;
use crate::error::Result;
use crate::identifiers::{NodeId, RootId};

// ============================================================================
// Parent
// ============================================================================

/// Insertion point for new nodes: a root or an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Parent {
    /// Top level of a document or shadow root.
    Root(RootId),
    /// Child list of an element.
    Element(NodeId),
}

impl From<RootId> for Parent {
    fn from(root: RootId) -> Self {
        Self::Root(root)
    }
}

impl From<NodeId> for Parent {
    fn from(node: NodeId) -> Self {
        Self::Element(node)
    }
}

// ============================================================================
// Dom
// ============================================================================

/// A page as seen by the engine.
///
/// All methods are synchronous: dispatching an event runs every listener to
/// completion before returning, so an injection attempt knows its outcome
/// immediately. Implementations must tolerate stale handles by returning
/// `None`/empty results or an error; they must never panic.
pub trait Dom: Send + Sync {
    /// The top-level document.
    fn document(&self) -> RootId;

    /// Native structural match over one root's light tree, in document order.
    ///
    /// Does not descend into shadow roots or frame documents.
    fn query_all(&self, root: RootId, selector: &Selector) -> Vec<NodeId>;

    /// Every element in one root's light tree, in document order.
    fn elements(&self, root: RootId) -> Vec<NodeId>;

    /// Top-level elements of a root.
    fn root_children(&self, root: RootId) -> Vec<NodeId>;

    /// Child elements of an element.
    fn children(&self, element: NodeId) -> Vec<NodeId>;

    /// Attached shadow root, if any.
    fn shadow_root(&self, element: NodeId) -> Option<RootId>;

    /// Nested document of a frame element.
    ///
    /// # Errors
    ///
    /// [`Error::CrossOriginFrame`](crate::Error::CrossOriginFrame) when the
    /// frame's content belongs to another origin.
    fn content_document(&self, frame: NodeId) -> Result<Option<RootId>>;

    /// Lowercase tag name.
    fn tag_name(&self, element: NodeId) -> Option<String>;

    /// Attribute value (names are ASCII-case-insensitive).
    fn attribute(&self, element: NodeId, name: &str) -> Option<String>;

    /// Parent element within the same tree; `None` at the tree root.
    fn parent(&self, element: NodeId) -> Option<NodeId>;

    /// Root the element currently lives in.
    fn root_of(&self, element: NodeId) -> Option<RootId>;

    /// Shadow host of a shadow root; `None` for documents.
    fn host(&self, root: RootId) -> Option<NodeId>;

    /// Element with the given `id` inside `root`.
    fn element_by_id(&self, root: RootId, id: &str) -> Option<NodeId>;

    /// Whether the element is rendered.
    fn is_visible(&self, element: NodeId) -> bool;

    /// Builds a file-payload container.
    ///
    /// # Errors
    ///
    /// [`Error::Unsupported`](crate::Error::Unsupported) when the host cannot
    /// construct one.
    fn create_data_transfer(&self, files: &[CaptureFile]) -> Result<DataTransfer>;

    /// Assigns the container's files to a file input.
    fn set_files(&self, input: NodeId, transfer: &DataTransfer) -> Result<()>;

    /// Dispatches an event; returns `false` if a listener cancelled it.
    fn dispatch_event(&self, target: NodeId, event: &DomEvent) -> Result<bool>;

    // ========================================================================
    // Provided
    // ========================================================================

    /// The element's `id` attribute.
    fn element_id(&self, element: NodeId) -> Option<String> {
        self.attribute(element, "id")
    }

    /// `iframe` or `frame` element.
    fn is_frame(&self, element: NodeId) -> bool {
        matches!(self.tag_name(element).as_deref(), Some("iframe" | "frame"))
    }

    /// Native file-input control (`<input type="file">`).
    fn is_file_input(&self, element: NodeId) -> bool {
        self.tag_name(element).as_deref() == Some("input")
            && self
                .attribute(element, "type")
                .is_some_and(|kind| kind.trim().eq_ignore_ascii_case("file"))
    }
}
