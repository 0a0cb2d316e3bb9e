//! Candidate and file-input resolution.

// ============================================================================
// Imports
// ============================================================================

use rustc_hash::FxHashSet;
use tracing::trace;

use crate::dom::{Dom, Selector};
use crate::identifiers::{NodeId, RootId};

use super::walker::{Candidate, DeepWalker};

// ============================================================================
// Candidate Resolver
// ============================================================================

/// First element, over `selectors` in order, that satisfies `predicate`.
///
/// Stops at the first hit: later patterns are not evaluated. For a fixed page
/// the result is stable.
pub fn pick_first_match<D, P>(
    walker: &DeepWalker<D>,
    selectors: &[Selector],
    predicate: P,
) -> Option<Candidate>
where
    D: Dom + ?Sized,
    P: Fn(&D, NodeId) -> bool,
{
    selectors.iter().find_map(|selector| {
        let hit = walker
            .find_all(selector)
            .into_iter()
            .find(|candidate| {
                !walker.is_extension_owned(candidate.node) && predicate(walker.dom(), candidate.node)
            });
        if let Some(candidate) = hit {
            trace!(selector = %selector, node = %candidate.node, "Pattern hit");
        }
        hit
    })
}

/// Predicate accepting every element.
#[inline]
pub fn any_element<D: Dom + ?Sized>(_dom: &D, _node: NodeId) -> bool {
    true
}

/// Predicate accepting native file inputs.
#[inline]
pub fn file_input<D: Dom + ?Sized>(dom: &D, node: NodeId) -> bool {
    dom.is_file_input(node)
}

/// Predicate accepting rendered elements.
#[inline]
pub fn visible<D: Dom + ?Sized>(dom: &D, node: NodeId) -> bool {
    dom.is_visible(node)
}

// ============================================================================
// File-Input Resolver
// ============================================================================

/// Finds the native file input behind `element`.
///
/// Tried in order, first hit wins:
///
/// 1. `element` itself
/// 2. the element its `for` attribute references
/// 3. its descendants, including its shadow root
/// 4. each ancestor's descendants and shadow root, walking up across shadow
///    hosts until the document root
///
/// Frame boundaries are not crossed. Extension-owned inputs are ignored.
pub fn resolve_file_input<D: Dom + ?Sized>(walker: &DeepWalker<D>, element: NodeId) -> Option<NodeId> {
    let dom = walker.dom();
    let usable = |node: NodeId| dom.is_file_input(node) && !walker.is_extension_owned(node);

    if usable(element) {
        return Some(element);
    }

    if let Some(target) = dom.attribute(element, "for")
        && let Some(root) = dom.root_of(element)
        && let Some(labelled) = dom.element_by_id(root, target.trim())
        && usable(labelled)
    {
        trace!(label = %element, input = %labelled, "Resolved through label");
        return Some(labelled);
    }

    let mut search = SubtreeSearch::default();
    if let Some(found) = search.run(dom, element, &usable) {
        return Some(found);
    }

    let mut current = element;
    while let Some(ancestor) = composed_parent(dom, current) {
        if let Some(found) = search.run(dom, ancestor, &usable) {
            trace!(from = %element, ancestor = %ancestor, input = %found, "Resolved near ancestor");
            return Some(found);
        }
        current = ancestor;
    }
    None
}

fn composed_parent<D: Dom + ?Sized>(dom: &D, element: NodeId) -> Option<NodeId> {
    dom.parent(element)
        .or_else(|| dom.root_of(element).and_then(|root| dom.host(root)))
}

/// Depth-first search shared across the upward walk, so each subtree is
/// scanned once.
#[derive(Default)]
struct SubtreeSearch {
    scanned: FxHashSet<NodeId>,
    shadows: FxHashSet<RootId>,
}

impl SubtreeSearch {
    fn run<D, F>(&mut self, dom: &D, start: NodeId, usable: &F) -> Option<NodeId>
    where
        D: Dom + ?Sized,
        F: Fn(NodeId) -> bool,
    {
        let mut stack = vec![start];
        while let Some(node) = stack.pop() {
            if !self.scanned.insert(node) {
                continue;
            }
            if usable(node) {
                return Some(node);
            }

            // Light children are popped before shadow content.
            if let Some(shadow) = dom.shadow_root(node)
                && self.shadows.insert(shadow)
            {
                stack.extend(dom.root_children(shadow).into_iter().rev());
            }
            stack.extend(dom.children(node).into_iter().rev());
        }
        None
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use crate::dom::Document;

    fn walker(html: &str) -> DeepWalker<Document> {
        DeepWalker::new(Arc::new(Document::parse(html).unwrap()))
    }

    fn by_id(walker: &DeepWalker<Document>, id: &str) -> NodeId {
        walker.dom().find_by_id(id).unwrap()
    }

    fn selectors(patterns: &[&str]) -> Vec<Selector> {
        patterns.iter().map(|p| Selector::parse(p).unwrap()).collect()
    }

    #[test]
    fn test_pick_first_match_respects_pattern_order() {
        let w = walker(r#"<button id="a" class="upload"></button><button id="b" class="attach"></button>"#);
        let hit = pick_first_match(&w, &selectors(&[".attach", ".upload"]), any_element).unwrap();
        assert_eq!(hit.node, by_id(&w, "b"));
    }

    #[test]
    fn test_pick_first_match_applies_predicate() {
        let w = walker(
            r#"<div id="hidden" class="drop" hidden></div><div id="shown" class="drop"></div>"#,
        );
        let hit = pick_first_match(&w, &selectors(&[".drop"]), visible).unwrap();
        assert_eq!(hit.node, by_id(&w, "shown"));
        assert!(pick_first_match(&w, &selectors(&[".drop"]), file_input).is_none());
    }

    #[test]
    fn test_pick_first_match_never_returns_extension_elements() {
        let w = walker(
            r#"<input id="ask-screenshot-picker" type="file" class="upload" data-testid="upload">"#,
        );
        let all = selectors(&[r#"input[type="file"]"#, ".upload", r#"[data-testid*="upload"]"#, "*"]);
        assert!(pick_first_match(&w, &all, any_element).is_none());
    }

    #[test]
    fn test_resolve_self() {
        let w = walker(r#"<input id="f" type="file">"#);
        let f = by_id(&w, "f");
        assert_eq!(resolve_file_input(&w, f), Some(f));
    }

    #[test]
    fn test_resolve_label_wrapped_hidden_input() {
        let w = walker(
            r#"<label id="lbl" class="upload-btn">Upload<input id="f" type="file" hidden></label>"#,
        );
        assert_eq!(resolve_file_input(&w, by_id(&w, "lbl")), Some(by_id(&w, "f")));
    }

    #[test]
    fn test_resolve_label_for_reference() {
        let w = walker(
            r#"<div><label id="lbl" for="picker">Attach</label></div><section><input id="picker" type="file" style="display:none"></section>"#,
        );
        assert_eq!(resolve_file_input(&w, by_id(&w, "lbl")), Some(by_id(&w, "picker")));
    }

    #[test]
    fn test_resolve_through_shadow_root_of_descendant() {
        let w = walker(
            r#"<button id="btn"><upload-widget><template shadowrootmode="open"><input id="f" type="file"></template></upload-widget></button>"#,
        );
        assert_eq!(resolve_file_input(&w, by_id(&w, "btn")), Some(by_id(&w, "f")));
    }

    #[test]
    fn test_resolve_via_ancestor_neighborhood_across_host() {
        let w = walker(
            r#"
            <div class="composer">
              <input id="f" type="file" hidden>
              <toolbar-el>
                <template shadowrootmode="open"><button id="clip"></button></template>
              </toolbar-el>
            </div>
            "#,
        );
        assert_eq!(resolve_file_input(&w, by_id(&w, "clip")), Some(by_id(&w, "f")));
    }

    #[test]
    fn test_resolve_none_when_neighborhood_is_empty() {
        let w = walker(
            r#"<div><button id="btn"></button></div><iframe srcdoc="<input type=&quot;file&quot;>"></iframe>"#,
        );
        assert_eq!(resolve_file_input(&w, by_id(&w, "btn")), None);
    }

    #[test]
    fn test_resolve_skips_extension_inputs() {
        let w = walker(
            r#"<div><button id="btn"></button><input id="ask-screenshot-file" type="file"></div>"#,
        );
        assert_eq!(resolve_file_input(&w, by_id(&w, "btn")), None);
    }
}
