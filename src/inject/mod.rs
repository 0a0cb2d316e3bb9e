//! File injection.
//!
//! Two mechanisms deliver the captured file, at most one per attempt:
//!
//! | Method | Target | Events |
//! |--------|--------|--------|
//! | Direct assignment | resolved `<input type="file">` | `input`, `change` |
//! | Drag-and-drop | drop zone, upload control or chat input | `dragenter`, `dragover`, `drop` |
//!
//! Failures inside either mechanism are logged and reported as `false`;
//! nothing propagates to the caller. A drop is considered delivered when all
//! three dispatches complete: whether the page's listeners actually accepted
//! the file cannot be observed.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::slice;

use serde::Serialize;
use tracing::{debug, warn};

use crate::capture::CaptureFile;
use crate::discovery::{DeepWalker, any_element, file_input, pick_first_match, resolve_file_input, visible};
use crate::dom::{Dom, DomEvent, EventKind};
use crate::error::Result;
use crate::identifiers::NodeId;
use crate::platform::catalog::{CompiledCatalog, Role};

// ============================================================================
// Types
// ============================================================================

/// How a file was delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum InjectionMethod {
    /// Files assigned to a native file input.
    AssignFiles,
    /// Dropped on a `dropZone` match.
    DropOnZone,
    /// Dropped on the matched upload control.
    DropOnControl,
    /// Dropped on the chat input.
    DropOnChatInput,
}

impl InjectionMethod {
    /// Returns `true` for the drag-and-drop variants.
    #[inline]
    #[must_use]
    pub const fn is_drop(self) -> bool {
        !matches!(self, Self::AssignFiles)
    }
}

impl fmt::Display for InjectionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::AssignFiles => "assign-files",
            Self::DropOnZone => "drop-on-zone",
            Self::DropOnControl => "drop-on-control",
            Self::DropOnChatInput => "drop-on-chat-input",
        })
    }
}

/// A successful delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Injection {
    /// Mechanism used.
    pub method: InjectionMethod,
    /// Element that received the file.
    pub target: NodeId,
}

// ============================================================================
// Injector
// ============================================================================

/// Runs discovery and injection for one platform's catalog.
pub struct Injector<'a, D: ?Sized> {
    walker: &'a DeepWalker<D>,
    catalog: &'a CompiledCatalog,
}

impl<'a, D: Dom + ?Sized> Injector<'a, D> {
    /// Creates an injector.
    #[must_use]
    pub fn new(walker: &'a DeepWalker<D>, catalog: &'a CompiledCatalog) -> Self {
        Self { walker, catalog }
    }

    /// One discovery-and-injection pass.
    ///
    /// Direct assignment is tried first, against a `fileInput` match or the
    /// file input behind the first `uploadControl` match that has one.
    /// Otherwise the file is dropped on the first visible drop zone, else on
    /// the first upload control, else on the first visible chat input.
    pub fn attempt(&self, file: &CaptureFile) -> Option<Injection> {
        let controls = self.catalog.get(Role::UploadControl);
        let control = pick_first_match(self.walker, controls, any_element).map(|candidate| candidate.node);

        let input = pick_first_match(self.walker, self.catalog.get(Role::FileInput), file_input)
            .map(|candidate| candidate.node)
            .or_else(|| {
                pick_first_match(self.walker, controls, |_, node| {
                    resolve_file_input(self.walker, node).is_some()
                })
                .and_then(|candidate| resolve_file_input(self.walker, candidate.node))
            });

        if let Some(input) = input {
            if self.assign_files(input, file) {
                return Some(Injection {
                    method: InjectionMethod::AssignFiles,
                    target: input,
                });
            }
        } else {
            debug!("No file input resolved");
        }

        let (method, target) = if let Some(zone) =
            pick_first_match(self.walker, self.catalog.get(Role::DropZone), visible)
        {
            (InjectionMethod::DropOnZone, zone.node)
        } else if let Some(control) = control {
            (InjectionMethod::DropOnControl, control)
        } else if let Some(chat) = pick_first_match(self.walker, self.catalog.chat_input(), visible) {
            (InjectionMethod::DropOnChatInput, chat.node)
        } else {
            debug!("No drop target found");
            return None;
        };

        self.simulate_drop(target, file)
            .then_some(Injection { method, target })
    }

    /// Assigns `file` to `input` and fires `input` then `change`.
    pub fn assign_files(&self, input: NodeId, file: &CaptureFile) -> bool {
        match self.try_assign(input, file) {
            Ok(()) => {
                debug!(input = %input, file = file.name(), "Assigned file to input");
                true
            }
            Err(e) => {
                warn!(input = %input, error = %e, "File assignment failed");
                false
            }
        }
    }

    /// Fires `dragenter`, `dragover` and `drop` at `target`, each with its
    /// own payload container.
    pub fn simulate_drop(&self, target: NodeId, file: &CaptureFile) -> bool {
        match self.try_drop(target, file) {
            Ok(()) => {
                debug!(target = %target, file = file.name(), "Simulated drop");
                true
            }
            Err(e) => {
                warn!(target = %target, error = %e, "Drop simulation failed");
                false
            }
        }
    }

    fn try_assign(&self, input: NodeId, file: &CaptureFile) -> Result<()> {
        let dom = self.walker.dom();
        let transfer = dom.create_data_transfer(slice::from_ref(file))?;
        dom.set_files(input, &transfer)?;
        dom.dispatch_event(input, &DomEvent::input())?;
        dom.dispatch_event(input, &DomEvent::change())?;
        Ok(())
    }

    fn try_drop(&self, target: NodeId, file: &CaptureFile) -> Result<()> {
        let dom = self.walker.dom();
        for kind in EventKind::DRAG_SEQUENCE {
            let transfer = dom.create_data_transfer(slice::from_ref(file))?;
            // Cancelled drag events are how pages accept drops; not a failure.
            dom.dispatch_event(target, &DomEvent::drag(kind, transfer))?;
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use parking_lot::Mutex;

    use crate::dom::{Document, ListenerAction};
    use crate::identifiers::TransferId;
    use crate::platform::PlatformKey;

    fn png() -> CaptureFile {
        CaptureFile::new("ask-screenshot.png", "image/png", vec![0x89, b'P', b'N', b'G'])
    }

    fn setup(html: &str, platform: PlatformKey) -> (DeepWalker<Document>, CompiledCatalog) {
        let walker = DeepWalker::new(Arc::new(Document::parse(html).unwrap()));
        (walker, CompiledCatalog::for_platform(platform).unwrap())
    }

    fn record(doc: &Document, target: NodeId, kinds: &[EventKind]) -> Arc<Mutex<Vec<(EventKind, Option<TransferId>)>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        for kind in kinds {
            let sink = Arc::clone(&seen);
            doc.add_event_listener(target, *kind, move |event| {
                sink.lock()
                    .push((event.kind, event.data_transfer.as_ref().map(|t| t.id())));
                ListenerAction::PreventDefault
            })
            .unwrap();
        }
        seen
    }

    #[test]
    fn test_direct_assignment_on_file_input() {
        let (walker, catalog) = setup(r#"<input id="f" type="file">"#, PlatformKey::Qwen);
        let doc = walker.dom();
        let f = doc.find_by_id("f").unwrap();
        let seen = record(doc, f, &[EventKind::Input, EventKind::Change]);

        let injection = Injector::new(&walker, &catalog).attempt(&png()).unwrap();
        assert_eq!(injection, Injection { method: InjectionMethod::AssignFiles, target: f });
        assert_eq!(doc.files(f), vec![png()]);

        let kinds: Vec<_> = seen.lock().iter().map(|(k, _)| *k).collect();
        assert_eq!(kinds, [EventKind::Input, EventKind::Change]);
    }

    #[test]
    fn test_hidden_file_input_is_still_assigned() {
        let (walker, catalog) = setup(
            r#"<div class="toolbar"><button aria-label="Upload image"></button><input type="text"></div><span><input id="g" type="file" hidden></span>"#,
            PlatformKey::Deepseek,
        );
        let injection = Injector::new(&walker, &catalog).attempt(&png()).unwrap();
        assert_eq!(injection.method, InjectionMethod::AssignFiles);
        assert_eq!(injection.target, walker.dom().find_by_id("g").unwrap());
    }

    #[test]
    fn test_upload_control_resolves_input_in_shadow() {
        // `type="FILE"` escapes the catalog's case-sensitive fileInput patterns.
        let (walker, catalog) = setup(
            r#"<attach-button class="attach-btn"><template shadowrootmode="open"><input id="f" type="FILE"></template></attach-button>"#,
            PlatformKey::Deepseek,
        );
        let doc = walker.dom();
        let injection = Injector::new(&walker, &catalog).attempt(&png()).unwrap();
        assert_eq!(injection.method, InjectionMethod::AssignFiles);
        assert_eq!(injection.target, doc.find_by_id("f").unwrap());
        assert_eq!(doc.files(injection.target).len(), 1);
    }

    #[test]
    fn test_later_control_with_input_beats_first_control() {
        let (walker, catalog) = setup(
            r#"<button id="btn" class="upload-trigger"></button><attach-button class="attach-btn"><template shadowrootmode="open"><input id="f" type="FILE"></template></attach-button>"#,
            PlatformKey::Deepseek,
        );
        let doc = walker.dom();
        let injection = Injector::new(&walker, &catalog).attempt(&png()).unwrap();
        assert_eq!(injection, Injection { method: InjectionMethod::AssignFiles, target: doc.find_by_id("f").unwrap() });
        assert!(doc.files(doc.find_by_id("btn").unwrap()).is_empty());
    }

    #[test]
    fn test_unsupported_data_transfer_fails_attempt() {
        let (walker, catalog) = setup(
            r#"<input id="f" type="file"><div id="zone" class="dropzone"></div>"#,
            PlatformKey::Qwen,
        );
        let doc = walker.dom();
        doc.set_data_transfer_supported(false);
        assert_eq!(Injector::new(&walker, &catalog).attempt(&png()), None);
        assert!(doc.files(doc.find_by_id("f").unwrap()).is_empty());
    }

    #[test]
    fn test_drop_on_visible_zone_with_fresh_transfers() {
        let (walker, catalog) = setup(
            r#"<div class="dropzone" hidden></div><div id="zone" class="chat-container"></div>"#,
            PlatformKey::Qwen,
        );
        let doc = walker.dom();
        let zone = doc.find_by_id("zone").unwrap();
        let seen = record(doc, zone, &EventKind::DRAG_SEQUENCE);

        let injection = Injector::new(&walker, &catalog).attempt(&png()).unwrap();
        assert_eq!(injection, Injection { method: InjectionMethod::DropOnZone, target: zone });

        let seen = seen.lock();
        let kinds: Vec<_> = seen.iter().map(|(k, _)| *k).collect();
        assert_eq!(kinds, EventKind::DRAG_SEQUENCE);
        let transfers: std::collections::HashSet<_> = seen.iter().map(|(_, t)| t.unwrap()).collect();
        assert_eq!(transfers.len(), 3);
    }

    #[test]
    fn test_drop_on_upload_control_without_input() {
        let (walker, catalog) = setup(r#"<button id="btn" class="upload-trigger"></button>"#, PlatformKey::Qwen);
        let injection = Injector::new(&walker, &catalog).attempt(&png()).unwrap();
        assert_eq!(injection.method, InjectionMethod::DropOnControl);
        assert_eq!(injection.target, walker.dom().find_by_id("btn").unwrap());
    }

    #[test]
    fn test_drop_on_chat_input_last() {
        let (walker, catalog) = setup(
            r#"<textarea id="other"></textarea><textarea id="chat-input"></textarea>"#,
            PlatformKey::Qwen,
        );
        let injection = Injector::new(&walker, &catalog).attempt(&png()).unwrap();
        assert_eq!(injection.method, InjectionMethod::DropOnChatInput);
        // Platform hint wins over the generic `textarea` pattern.
        assert_eq!(injection.target, walker.dom().find_by_id("chat-input").unwrap());
    }

    #[test]
    fn test_nothing_to_target() {
        let (walker, catalog) = setup(r#"<p></p><div style="display:none"><textarea></textarea></div>"#, PlatformKey::Deepseek);
        assert_eq!(Injector::new(&walker, &catalog).attempt(&png()), None);
    }

    #[test]
    fn test_listener_cancel_does_not_fail_drop() {
        let (walker, catalog) = setup(r#"<div id="zone" class="drop-zone"></div>"#, PlatformKey::Deepseek);
        let doc = walker.dom();
        let zone = doc.find_by_id("zone").unwrap();
        doc.add_event_listener(zone, EventKind::DragOver, |_| ListenerAction::PreventDefault)
            .unwrap();
        let injector = Injector::new(&walker, &catalog);
        assert!(injector.simulate_drop(zone, &png()));
    }
}
