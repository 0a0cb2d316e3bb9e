//! Deep tree walker.
//!
//! Runs a pattern against the top document and every shadow root and
//! same-origin frame document reachable from it, breadth-first. Each root is
//! visited once and each element reported once, so overlapping shadow roots
//! cannot cause loops or duplicates.
//!
//! Frames that deny access are remembered for the walker's lifetime and never
//! probed again: access will not become available later on the same page.

// ============================================================================
// Imports
// ============================================================================

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashSet;
use tracing::{debug, trace};

use crate::dom::{Dom, Selector};
use crate::identifiers::{NodeId, RootId};

// ============================================================================
// Constants
// ============================================================================

/// Id prefix marking the engine's own injected UI.
pub const EXTENSION_ID_PREFIX: &str = "ask-screenshot-";

// ============================================================================
// Candidate
// ============================================================================

/// A matched element and the root it was found in.
///
/// Valid for one discovery pass only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Candidate {
    /// The element.
    pub node: NodeId,
    /// Document or shadow root containing it.
    pub root: RootId,
}

// ============================================================================
// DeepWalker
// ============================================================================

/// Traverses documents, shadow roots and same-origin frames of one page.
pub struct DeepWalker<D: ?Sized> {
    dom: Arc<D>,
    denied_frames: Mutex<FxHashSet<NodeId>>,
}

impl<D: Dom + ?Sized> DeepWalker<D> {
    /// Creates a walker over `dom`.
    #[must_use]
    pub fn new(dom: Arc<D>) -> Self {
        Self {
            dom,
            denied_frames: Mutex::new(FxHashSet::default()),
        }
    }

    /// The page being walked.
    #[inline]
    #[must_use]
    pub fn dom(&self) -> &D {
        &self.dom
    }

    /// Number of frames found to be cross-origin so far.
    #[must_use]
    pub fn denied_frames(&self) -> usize {
        self.denied_frames.lock().len()
    }

    /// Every element matching `selector`, in traversal order.
    ///
    /// Roots are visited breadth-first starting from the top document;
    /// within a root, matches come in document order. Elements owned by the
    /// extension's own UI are never returned.
    #[must_use]
    pub fn find_all(&self, selector: &Selector) -> Vec<Candidate> {
        let mut found = Vec::new();
        let mut seen = FxHashSet::default();

        self.walk(|root| {
            for node in self.dom.query_all(root, selector) {
                if seen.insert(node) && !self.is_extension_owned(node) {
                    found.push(Candidate { node, root });
                }
            }
        });

        trace!(selector = %selector, matches = found.len(), "Deep match");
        found
    }

    /// Every reachable root, in traversal order.
    #[must_use]
    pub fn roots(&self) -> Vec<RootId> {
        let mut roots = Vec::new();
        self.walk(|root| roots.push(root));
        roots
    }

    /// Returns `true` if `node` or any ancestor (across shadow hosts) carries
    /// an id with [`EXTENSION_ID_PREFIX`].
    #[must_use]
    pub fn is_extension_owned(&self, node: NodeId) -> bool {
        let mut current = Some(node);
        let mut steps = 0usize;
        while let Some(element) = current {
            if self
                .dom
                .element_id(element)
                .is_some_and(|id| id.starts_with(EXTENSION_ID_PREFIX))
            {
                return true;
            }

            steps += 1;
            if steps > MAX_ANCESTRY {
                return false;
            }
            current = self.dom.parent(element).or_else(|| {
                self.dom
                    .root_of(element)
                    .and_then(|root| self.dom.host(root))
            });
        }
        false
    }

    /// Breadth-first over roots; `visit` runs once per root before its
    /// children are enqueued.
    fn walk(&self, mut visit: impl FnMut(RootId)) {
        let top = self.dom.document();
        let mut visited = FxHashSet::default();
        let mut queue = VecDeque::from([top]);
        visited.insert(top);

        while let Some(root) = queue.pop_front() {
            visit(root);

            for element in self.dom.elements(root) {
                if let Some(shadow) = self.dom.shadow_root(element)
                    && visited.insert(shadow)
                {
                    queue.push_back(shadow);
                }

                if self.dom.is_frame(element)
                    && let Some(frame_doc) = self.frame_document(element)
                    && visited.insert(frame_doc)
                {
                    queue.push_back(frame_doc);
                }
            }
        }
    }

    fn frame_document(&self, frame: NodeId) -> Option<RootId> {
        if self.denied_frames.lock().contains(&frame) {
            return None;
        }

        match self.dom.content_document(frame) {
            Ok(doc) => doc,
            Err(e) if e.is_cross_origin() => {
                debug!(frame = %frame, "Skipping cross-origin frame");
                self.denied_frames.lock().insert(frame);
                None
            }
            Err(e) => {
                debug!(frame = %frame, error = %e, "Frame document unavailable");
                None
            }
        }
    }
}

/// Upper bound on ancestor steps, against hosts reporting cyclic parents.
const MAX_ANCESTRY: usize = 4096;

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::dom::Document;

    fn walker(html: &str) -> DeepWalker<Document> {
        DeepWalker::new(Arc::new(Document::parse(html).unwrap()))
    }

    fn marked() -> Selector {
        Selector::parse("[data-mark]").unwrap()
    }

    fn ids(walker: &DeepWalker<Document>, found: &[Candidate]) -> Vec<String> {
        found
            .iter()
            .filter_map(|c| walker.dom().element_id(c.node))
            .collect()
    }

    #[test]
    fn test_finds_across_shadow_roots_and_frames() {
        let w = walker(
            r#"
            <div id="top" data-mark></div>
            <section>
              <template shadowrootmode="open">
                <div id="shadow1" data-mark></div>
                <span>
                  <template shadowrootmode="open"><b id="shadow2" data-mark></b></template>
                </span>
              </template>
            </section>
            <iframe srcdoc="<p id=&quot;framed&quot; data-mark></p>"></iframe>
            "#,
        );

        let found = w.find_all(&marked());
        let mut names = ids(&w, &found);
        names.sort();
        assert_eq!(names, ["framed", "shadow1", "shadow2", "top"]);

        // Breadth-first: the top document comes first.
        assert_eq!(found[0].root, w.dom().document());
    }

    #[test]
    fn test_depth_does_not_matter() {
        let mut html = String::from(r#"<i id="leaf" data-mark></i>"#);
        for _ in 0..12 {
            html = format!(r#"<div><template shadowrootmode="open">{html}</template></div>"#);
        }
        let w = walker(&html);
        assert_eq!(ids(&w, &w.find_all(&marked())), ["leaf"]);
        assert_eq!(w.roots().len(), 13);
    }

    #[test]
    fn test_shared_shadow_root_terminates_without_duplicates() {
        let doc = Arc::new(Document::new());
        let a = doc.append_element(doc.document(), "div", &[]).unwrap();
        let shadow = doc.attach_shadow(a).unwrap();
        let b = doc.append_element(shadow, "div", &[("data-mark", "")]).unwrap();
        doc.share_shadow_root(b, shadow).unwrap();
        let c = doc.append_element(doc.document(), "div", &[]).unwrap();
        doc.share_shadow_root(c, shadow).unwrap();

        let w = DeepWalker::new(doc);
        let found = w.find_all(&marked());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].node, b);
        assert_eq!(w.roots().len(), 2);
    }

    #[test]
    fn test_cross_origin_frames_are_skipped_and_remembered() {
        let w = walker(
            r#"<iframe src="https://ads.example.net/slot"></iframe><div id="ok" data-mark></div>"#,
        );
        assert_eq!(ids(&w, &w.find_all(&marked())), ["ok"]);
        assert_eq!(w.denied_frames(), 1);

        let again = w.find_all(&marked());
        assert_eq!(ids(&w, &again), ["ok"]);
        assert_eq!(w.denied_frames(), 1);
    }

    #[test]
    fn test_extension_elements_are_excluded() {
        let w = walker(
            r#"
            <div id="ask-screenshot-notice"><button id="inner" data-mark></button></div>
            <div id="ask-screenshot-host"><template shadowrootmode="open"><p id="deep" data-mark></p></template></div>
            <button id="ask-screenshot-prompt" data-mark></button>
            <button id="page" data-mark></button>
            "#,
        );
        assert_eq!(ids(&w, &w.find_all(&marked())), ["page"]);
    }

    #[test]
    fn test_late_content_is_found_on_next_walk() {
        let doc = Arc::new(Document::new());
        let w = DeepWalker::new(Arc::clone(&doc));
        assert!(w.find_all(&marked()).is_empty());

        doc.append_markup(doc.document(), r#"<p id="late" data-mark></p>"#)
            .unwrap();
        assert_eq!(ids(&w, &w.find_all(&marked())), ["late"]);
    }
}
