//! In-memory arena DOM.
//!
//! [`Document`] implements [`Dom`] over a flat arena of elements and roots.
//! It backs the test suite and any embedder that mirrors a page offline.
//!
//! Supported page shapes:
//!
//! - open shadow roots, including one root attached to several hosts
//! - same-origin frame documents (`<iframe srcdoc>` or [`Document::create_frame_document`])
//! - cross-origin frames (`<iframe src="https://…">` or [`Document::set_cross_origin`])
//! - listeners with bubbling propagation, crossing shadow hosts for composed events
//! - visibility from `hidden` and inline `display:none` / `visibility:hidden`
//!
//! # Example
//!
//! ```ignore
//! let doc = Document::parse(r#"<div id="app"><template shadowrootmode="open"><input type="file"></template></div>"#)?;
//! let app = doc.find_by_id("app").unwrap();
//! assert!(doc.shadow_root(app).is_some());
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;
use url::Url;

use crate::capture::CaptureFile;
use crate::error::{Error, Result};
use crate::identifiers::{NodeId, RootId};

use super::markup::{MarkupElement, parse_fragment};
use super::{DataTransfer, Dom, DomEvent, ElementTree, EventKind, Parent, Selector};

// ============================================================================
// Types
// ============================================================================

/// Event listener callback.
///
/// Runs synchronously inside [`Dom::dispatch_event`], after every internal
/// lock has been released, so it may freely read or mutate the document.
pub type Listener = Arc<dyn Fn(&DomEvent) -> ListenerAction + Send + Sync>;

/// What a listener asks of the dispatcher.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ListenerAction {
    /// Keep propagating.
    #[default]
    Continue,
    /// `preventDefault()`; ignored for non-cancelable events.
    PreventDefault,
    /// `stopPropagation()`; remaining listeners on the current node still run.
    StopPropagation,
}

/// Nested content of a frame element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameContent {
    /// Reachable document.
    SameOrigin(RootId),
    /// Foreign document; access is denied.
    CrossOrigin {
        /// Serialized origin of the frame's `src`.
        origin: String,
    },
}

// ============================================================================
// Arena
// ============================================================================

#[derive(Debug)]
struct NodeData {
    tag: String,
    attributes: Vec<(String, String)>,
    root: RootId,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    shadow_root: Option<RootId>,
    frame: Option<FrameContent>,
    files: Vec<CaptureFile>,
    connected: bool,
}

#[derive(Debug, Default)]
struct RootData {
    host: Option<NodeId>,
    children: Vec<NodeId>,
}

#[derive(Debug, Default)]
struct Arena {
    nodes: Vec<NodeData>,
    roots: Vec<RootData>,
}

impl Arena {
    fn node(&self, id: NodeId) -> Result<&NodeData> {
        self.nodes
            .get(id.index())
            .ok_or_else(|| Error::node_not_found(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut NodeData> {
        self.nodes
            .get_mut(id.index())
            .ok_or_else(|| Error::node_not_found(id))
    }

    fn root(&self, id: RootId) -> Result<&RootData> {
        self.roots
            .get(id.index())
            .ok_or_else(|| Error::root_not_found(id))
    }

    fn root_mut(&mut self, id: RootId) -> Result<&mut RootData> {
        self.roots
            .get_mut(id.index())
            .ok_or_else(|| Error::root_not_found(id))
    }

    fn new_root(&mut self, host: Option<NodeId>) -> RootId {
        self.roots.push(RootData {
            host,
            children: Vec::new(),
        });
        RootId::new(self.roots.len() - 1)
    }

    fn append(&mut self, parent: Parent, tag: &str, attributes: Vec<(String, String)>) -> Result<NodeId> {
        let id = NodeId::new(self.nodes.len());
        let (root, parent_node) = match parent {
            Parent::Root(root) => {
                self.root(root)?;
                (root, None)
            }
            Parent::Element(element) => (self.node(element)?.root, Some(element)),
        };

        self.nodes.push(NodeData {
            tag: tag.to_ascii_lowercase(),
            attributes,
            root,
            parent: parent_node,
            children: Vec::new(),
            shadow_root: None,
            frame: None,
            files: Vec::new(),
            connected: true,
        });

        match parent {
            Parent::Root(root) => self.root_mut(root)?.children.push(id),
            Parent::Element(element) => self.node_mut(element)?.children.push(id),
        }
        Ok(id)
    }

    /// Inserts a parsed element with its shadow root and frame content.
    fn insert(&mut self, parent: Parent, element: &MarkupElement) -> Result<NodeId> {
        let id = self.append(parent, &element.tag, element.attributes.clone())?;

        if let Some(shadow_children) = &element.shadow_root {
            let shadow = self.new_root(Some(id));
            self.node_mut(id)?.shadow_root = Some(shadow);
            for child in shadow_children {
                self.insert(Parent::Root(shadow), child)?;
            }
        }

        for child in &element.children {
            self.insert(Parent::Element(id), child)?;
        }

        if matches!(element.tag.as_str(), "iframe" | "frame") {
            if let Some(srcdoc) = element.attribute("srcdoc") {
                let nested = parse_fragment(srcdoc)?;
                let frame_doc = self.new_root(None);
                for child in &nested {
                    self.insert(Parent::Root(frame_doc), child)?;
                }
                self.node_mut(id)?.frame = Some(FrameContent::SameOrigin(frame_doc));
            } else if let Some(origin) = element.attribute("src").and_then(absolute_origin) {
                self.node_mut(id)?.frame = Some(FrameContent::CrossOrigin { origin });
            }
        }

        Ok(id)
    }

    /// Light-tree elements of `root` in document order.
    fn light_tree(&self, root: RootId) -> Vec<NodeId> {
        let Ok(root) = self.root(root) else {
            return Vec::new();
        };

        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = root.children.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            out.push(id);
            if let Ok(node) = self.node(id) {
                stack.extend(node.children.iter().rev().copied());
            }
        }
        out
    }

    /// Parent, or the shadow host when `id` is at the top of a shadow root.
    fn composed_parent(&self, id: NodeId) -> Option<NodeId> {
        let node = self.node(id).ok()?;
        node.parent
            .or_else(|| self.root(node.root).ok().and_then(|root| root.host))
    }

    fn is_rendered(&self, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(element) = current {
            let Ok(node) = self.node(element) else {
                return false;
            };
            if !node.connected || hides_itself(&node.attributes) {
                return false;
            }
            current = self.composed_parent(element);
        }
        true
    }
}

impl ElementTree for Arena {
    fn tag(&self, element: NodeId) -> Option<&str> {
        self.node(element).ok().map(|node| node.tag.as_str())
    }

    fn attr(&self, element: NodeId, name: &str) -> Option<&str> {
        let node = self.node(element).ok()?;
        node.attributes
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    fn parent_element(&self, element: NodeId) -> Option<NodeId> {
        self.node(element).ok()?.parent
    }
}

fn hides_itself(attributes: &[(String, String)]) -> bool {
    attributes.iter().any(|(name, value)| match name.as_str() {
        "hidden" => true,
        "style" => value.split(';').any(|declaration| {
            let Some((property, value)) = declaration.split_once(':') else {
                return false;
            };
            let property = property.trim();
            let value = value.trim();
            (property.eq_ignore_ascii_case("display") && value.eq_ignore_ascii_case("none"))
                || (property.eq_ignore_ascii_case("visibility")
                    && value.eq_ignore_ascii_case("hidden"))
        }),
        _ => false,
    })
}

fn absolute_origin(src: &str) -> Option<String> {
    let url = Url::parse(src).ok()?;
    matches!(url.scheme(), "http" | "https").then(|| url.origin().ascii_serialization())
}

// ============================================================================
// Document
// ============================================================================

/// In-memory page implementing [`Dom`].
pub struct Document {
    top: RootId,
    arena: RwLock<Arena>,
    listeners: Mutex<FxHashMap<(NodeId, EventKind), Vec<Listener>>>,
    data_transfer_supported: AtomicBool,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let arena = self.arena.read();
        f.debug_struct("Document")
            .field("nodes", &arena.nodes.len())
            .field("roots", &arena.roots.len())
            .field(
                "data_transfer_supported",
                &self.data_transfer_supported.load(Ordering::Relaxed),
            )
            .finish_non_exhaustive()
    }
}

impl Document {
    /// Creates an empty document.
    #[must_use]
    pub fn new() -> Self {
        let mut arena = Arena::default();
        let top = arena.new_root(None);
        Self {
            top,
            arena: RwLock::new(arena),
            listeners: Mutex::new(FxHashMap::default()),
            data_transfer_supported: AtomicBool::new(true),
        }
    }

    /// Creates a document from an HTML fragment.
    pub fn parse(html: &str) -> Result<Self> {
        let doc = Self::new();
        doc.append_markup(doc.top, html)?;
        Ok(doc)
    }

    // ========================================================================
    // Mutation
    // ========================================================================

    /// Appends a new element.
    pub fn append_element(
        &self,
        parent: impl Into<Parent>,
        tag: &str,
        attributes: &[(&str, &str)],
    ) -> Result<NodeId> {
        let attributes = attributes
            .iter()
            .map(|(n, v)| (n.to_ascii_lowercase(), (*v).to_string()))
            .collect();
        self.arena.write().append(parent.into(), tag, attributes)
    }

    /// Parses `html` and appends its top-level elements.
    ///
    /// Late-rendered page content is simulated this way.
    pub fn append_markup(&self, parent: impl Into<Parent>, html: &str) -> Result<Vec<NodeId>> {
        let parent = parent.into();
        let parsed = parse_fragment(html)?;
        let mut arena = self.arena.write();
        parsed
            .iter()
            .map(|element| arena.insert(parent, element))
            .collect()
    }

    /// Attaches an open shadow root to `host`.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] if `host` already has one.
    pub fn attach_shadow(&self, host: NodeId) -> Result<RootId> {
        let mut arena = self.arena.write();
        if arena.node(host)?.shadow_root.is_some() {
            return Err(Error::invalid_argument(format!(
                "{host} already hosts a shadow root"
            )));
        }
        let shadow = arena.new_root(Some(host));
        arena.node_mut(host)?.shadow_root = Some(shadow);
        Ok(shadow)
    }

    /// Attaches an existing shadow root to a second host.
    ///
    /// The root keeps its original host; only `host`'s `shadow_root` changes.
    pub fn share_shadow_root(&self, host: NodeId, root: RootId) -> Result<()> {
        let mut arena = self.arena.write();
        arena.root(root)?;
        arena.node_mut(host)?.shadow_root = Some(root);
        Ok(())
    }

    /// Creates an empty same-origin document inside a frame element.
    pub fn create_frame_document(&self, frame: NodeId) -> Result<RootId> {
        let mut arena = self.arena.write();
        let tag = arena.node(frame)?.tag.as_str();
        if !matches!(tag, "iframe" | "frame") {
            return Err(Error::invalid_argument(format!("{frame} is not a frame")));
        }
        let doc = arena.new_root(None);
        arena.node_mut(frame)?.frame = Some(FrameContent::SameOrigin(doc));
        Ok(doc)
    }

    /// Marks a frame's content as belonging to `origin`.
    pub fn set_cross_origin(&self, frame: NodeId, origin: impl Into<String>) -> Result<()> {
        let mut arena = self.arena.write();
        arena.node_mut(frame)?.frame = Some(FrameContent::CrossOrigin {
            origin: origin.into(),
        });
        Ok(())
    }

    /// Sets or replaces an attribute.
    pub fn set_attribute(&self, element: NodeId, name: &str, value: &str) -> Result<()> {
        let mut arena = self.arena.write();
        let node = arena.node_mut(element)?;
        let name = name.to_ascii_lowercase();
        match node.attributes.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = value.to_string(),
            None => node.attributes.push((name, value.to_string())),
        }
        Ok(())
    }

    /// Removes an attribute if present.
    pub fn remove_attribute(&self, element: NodeId, name: &str) -> Result<()> {
        let mut arena = self.arena.write();
        arena
            .node_mut(element)?
            .attributes
            .retain(|(n, _)| !n.eq_ignore_ascii_case(name));
        Ok(())
    }

    /// Detaches an element (and its subtree) from the page.
    pub fn remove(&self, element: NodeId) -> Result<()> {
        let mut arena = self.arena.write();
        let node = arena.node(element)?;
        let (root, parent) = (node.root, node.parent);

        match parent {
            Some(parent) => arena.node_mut(parent)?.children.retain(|c| *c != element),
            None => arena.root_mut(root)?.children.retain(|c| *c != element),
        }

        let mut stack = vec![element];
        while let Some(id) = stack.pop() {
            let node = arena.node_mut(id)?;
            node.connected = false;
            stack.extend(node.children.iter().copied());
        }
        Ok(())
    }

    /// Registers a listener for `kind` events reaching `target`.
    pub fn add_event_listener<F>(&self, target: NodeId, kind: EventKind, listener: F) -> Result<()>
    where
        F: Fn(&DomEvent) -> ListenerAction + Send + Sync + 'static,
    {
        self.arena.read().node(target)?;
        self.listeners
            .lock()
            .entry((target, kind))
            .or_default()
            .push(Arc::new(listener));
        Ok(())
    }

    /// Simulates a host without `DataTransfer` construction.
    pub fn set_data_transfer_supported(&self, supported: bool) {
        self.data_transfer_supported
            .store(supported, Ordering::Relaxed);
    }

    // ========================================================================
    // Inspection
    // ========================================================================

    /// Files currently assigned to an input.
    #[must_use]
    pub fn files(&self, input: NodeId) -> Vec<CaptureFile> {
        self.arena
            .read()
            .node(input)
            .map(|node| node.files.clone())
            .unwrap_or_default()
    }

    /// Frame content of a frame element.
    #[must_use]
    pub fn frame_content(&self, frame: NodeId) -> Option<FrameContent> {
        self.arena.read().node(frame).ok()?.frame.clone()
    }

    /// First connected element with `id`, searching every root.
    #[must_use]
    pub fn find_by_id(&self, id: &str) -> Option<NodeId> {
        let arena = self.arena.read();
        arena
            .nodes
            .iter()
            .enumerate()
            .find(|(_, node)| {
                node.connected && node.attributes.iter().any(|(n, v)| n == "id" && v == id)
            })
            .map(|(index, _)| NodeId::new(index))
    }

    /// Number of elements ever created.
    #[must_use]
    pub fn len(&self) -> usize {
        self.arena.read().nodes.len()
    }

    /// Returns `true` if no element was ever created.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn event_path(&self, target: NodeId, event: &DomEvent) -> Result<Vec<NodeId>> {
        let arena = self.arena.read();
        arena.node(target)?;

        let mut path = vec![target];
        if !event.bubbles {
            return Ok(path);
        }

        let mut current = target;
        loop {
            let node = arena.node(current)?;
            let next = match node.parent {
                Some(parent) => Some(parent),
                None if event.composed => arena.root(node.root)?.host,
                None => None,
            };
            let Some(next) = next else {
                break;
            };
            path.push(next);
            current = next;
        }
        Ok(path)
    }
}

// ============================================================================
// Dom
// ============================================================================

impl Dom for Document {
    fn document(&self) -> RootId {
        self.top
    }

    fn query_all(&self, root: RootId, selector: &Selector) -> Vec<NodeId> {
        let arena = self.arena.read();
        arena
            .light_tree(root)
            .into_iter()
            .filter(|id| selector.matches(&*arena, *id))
            .collect()
    }

    fn elements(&self, root: RootId) -> Vec<NodeId> {
        self.arena.read().light_tree(root)
    }

    fn root_children(&self, root: RootId) -> Vec<NodeId> {
        self.arena
            .read()
            .root(root)
            .map(|root| root.children.clone())
            .unwrap_or_default()
    }

    fn children(&self, element: NodeId) -> Vec<NodeId> {
        self.arena
            .read()
            .node(element)
            .map(|node| node.children.clone())
            .unwrap_or_default()
    }

    fn shadow_root(&self, element: NodeId) -> Option<RootId> {
        self.arena.read().node(element).ok()?.shadow_root
    }

    fn content_document(&self, frame: NodeId) -> Result<Option<RootId>> {
        match &self.arena.read().node(frame)?.frame {
            Some(FrameContent::SameOrigin(doc)) => Ok(Some(*doc)),
            Some(FrameContent::CrossOrigin { .. }) => Err(Error::cross_origin_frame(frame)),
            None => Ok(None),
        }
    }

    fn tag_name(&self, element: NodeId) -> Option<String> {
        self.arena.read().tag(element).map(str::to_string)
    }

    fn attribute(&self, element: NodeId, name: &str) -> Option<String> {
        self.arena.read().attr(element, name).map(str::to_string)
    }

    fn parent(&self, element: NodeId) -> Option<NodeId> {
        self.arena.read().parent_element(element)
    }

    fn root_of(&self, element: NodeId) -> Option<RootId> {
        self.arena.read().node(element).ok().map(|node| node.root)
    }

    fn host(&self, root: RootId) -> Option<NodeId> {
        self.arena.read().root(root).ok()?.host
    }

    fn element_by_id(&self, root: RootId, id: &str) -> Option<NodeId> {
        let arena = self.arena.read();
        arena
            .light_tree(root)
            .into_iter()
            .find(|node| arena.attr(*node, "id") == Some(id))
    }

    fn is_visible(&self, element: NodeId) -> bool {
        self.arena.read().is_rendered(element)
    }

    fn create_data_transfer(&self, files: &[CaptureFile]) -> Result<DataTransfer> {
        if !self.data_transfer_supported.load(Ordering::Relaxed) {
            return Err(Error::unsupported("DataTransfer"));
        }
        Ok(DataTransfer::new(files.to_vec()))
    }

    fn set_files(&self, input: NodeId, transfer: &DataTransfer) -> Result<()> {
        if !self.is_file_input(input) {
            return Err(Error::not_file_input(input));
        }
        self.arena.write().node_mut(input)?.files = transfer.files().to_vec();
        Ok(())
    }

    fn dispatch_event(&self, target: NodeId, event: &DomEvent) -> Result<bool> {
        let path = self.event_path(target, event)?;

        // Snapshot so listeners can re-enter the document.
        let per_node: Vec<Vec<Listener>> = {
            let listeners = self.listeners.lock();
            path.iter()
                .map(|node| {
                    listeners
                        .get(&(*node, event.kind))
                        .cloned()
                        .unwrap_or_default()
                })
                .collect()
        };

        let mut default_prevented = false;
        for listeners in per_node {
            let mut stopped = false;
            for listener in listeners {
                match listener(event) {
                    ListenerAction::Continue => {}
                    ListenerAction::PreventDefault => default_prevented |= event.cancelable,
                    ListenerAction::StopPropagation => stopped = true,
                }
            }
            if stopped {
                break;
            }
        }
        Ok(!default_prevented)
    }
}

// ============================================================================
// Tests
// ============================================================================
