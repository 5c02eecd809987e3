//! # Interaction Tracker
//!
//! Maps pointer and keyboard events onto identity-addressed hover and
//! selection state.
//!
//! ## Design
//!
//! Hover and selection are recorded as identities and mirrored in the tree as
//! marker classes. Stale identities never fail: a lookup that misses is a
//! no-op.
//!
//! Events are delegated at the root. The [`EventRouter`] is installed once
//! and resolves the nearest identity-bearing ancestor of each event target,
//! so restoring the tree never leaves stale or duplicated handlers behind.

use folio_dom::{Element, NodePath};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const HOVER_CLASS: &str = "editor-highlight-hover";
pub const SELECTED_CLASS: &str = "editor-highlight-selected";

/// Attribute enabling native content editing on a node
pub const CONTENT_EDITABLE_ATTR: &str = "contenteditable";

/// Current hover, selection and inline-edit target
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionState {
    pub selected: Vec<String>,
    pub hovered: Option<String>,
    pub inline_editing: Option<String>,
}

/// Applies hover/selection markers against the tree
#[derive(Debug, Default)]
pub struct InteractionTracker {
    state: SelectionState,
}

impl InteractionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &SelectionState {
        &self.state
    }

    pub fn selected(&self) -> Option<&str> {
        self.state.selected.first().map(String::as_str)
    }

    pub fn hovered(&self) -> Option<&str> {
        self.state.hovered.as_deref()
    }

    pub fn inline_editing(&self) -> Option<&str> {
        self.state.inline_editing.as_deref()
    }

    /// Move the hover marker to `identity`
    pub fn hover(&mut self, body: &mut Element, identity: &str) -> bool {
        self.clear_hover(body);
        let Some(el) = body.find_mut(identity) else {
            return false;
        };
        el.add_class(HOVER_CLASS);
        self.state.hovered = Some(identity.to_string());
        true
    }

    pub fn clear_hover(&mut self, body: &mut Element) {
        if let Some(previous) = self.state.hovered.take() {
            if let Some(el) = body.find_mut(&previous) {
                el.remove_class(HOVER_CLASS);
            }
        }
    }

    /// Select exactly `identity`, sweeping stray markers from the whole tree
    pub fn select(&mut self, body: &mut Element, identity: &str) -> bool {
        if body.find(identity).is_none() {
            debug!(identity, "Select target not found");
            return false;
        }
        sweep_class(body, SELECTED_CLASS);
        if let Some(el) = body.find_mut(identity) {
            el.add_class(SELECTED_CLASS);
        }
        self.state.selected = vec![identity.to_string()];
        true
    }

    pub fn clear_selection(&mut self, body: &mut Element) {
        sweep_class(body, SELECTED_CLASS);
        self.state.selected.clear();
    }

    /// Enable native editing on exactly one node
    pub fn begin_inline_edit(&mut self, body: &mut Element, identity: &str) -> bool {
        if self.state.inline_editing.as_deref() == Some(identity) {
            return true;
        }
        self.end_inline_edit(body);
        let Some(el) = body.find_mut(identity) else {
            return false;
        };
        el.set_attr(CONTENT_EDITABLE_ATTR, "true");
        self.state.inline_editing = Some(identity.to_string());
        true
    }

    /// Leave inline editing; returns the identity that was being edited
    pub fn end_inline_edit(&mut self, body: &mut Element) -> Option<String> {
        let identity = self.state.inline_editing.take()?;
        if let Some(el) = body.find_mut(&identity) {
            el.remove_attr(CONTENT_EDITABLE_ATTR);
        }
        Some(identity)
    }

    /// Re-apply the hover marker after the tree was restored
    pub fn resync_hover(&mut self, body: &mut Element) {
        sweep_class(body, HOVER_CLASS);
        let Some(hovered) = self.state.hovered.clone() else {
            return;
        };
        match body.find_mut(&hovered) {
            Some(el) => el.add_class(HOVER_CLASS),
            None => self.state.hovered = None,
        }
    }

    /// Forget inline-edit state whose node no longer exists
    pub fn forget_missing(&mut self, body: &Element) {
        if let Some(id) = &self.state.inline_editing {
            if body.find(id).is_none() {
                self.state.inline_editing = None;
            }
        }
        self.state.selected.retain(|id| body.find(id).is_some());
    }
}

/// Remove `class` from every element under `body`
pub fn sweep_class(body: &mut Element, class: &str) {
    body.for_each_descendant_mut(|el| {
        el.remove_class(class);
    });
}

// ----------------------------------------------------------------------
// Event routing
// ----------------------------------------------------------------------

/// Raw event delivered by the rendering surface
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EditorEvent {
    PointerEnter { target: NodePath },
    PointerLeave { target: NodePath },
    Click { target: NodePath },
    DoubleClick { target: NodePath },
    KeyDown {
        key: String,
        #[serde(default)]
        ctrl: bool,
        #[serde(default)]
        shift: bool,
    },
}

/// What the session should do in response to an event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoutedAction {
    Hover(String),
    ClearHover,
    Select(String),
    ClearSelection,
    BeginInlineEdit(String),
    Calibrate(String),
    Undo,
    Redo,
    Ignored,
}

/// Root-level event delegate
#[derive(Debug, Default)]
pub struct EventRouter {
    installed: bool,
    install_calls: usize,
}

impl EventRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the root listeners; returns false when already installed
    pub fn install(&mut self) -> bool {
        self.install_calls += 1;
        if self.installed {
            return false;
        }
        self.installed = true;
        debug!("Event router installed");
        true
    }

    pub fn is_installed(&self) -> bool {
        self.installed
    }

    /// Number of active root listeners, 1 once installed
    pub fn listener_count(&self) -> usize {
        usize::from(self.installed)
    }

    pub fn install_calls(&self) -> usize {
        self.install_calls
    }

    pub fn route(&self, event: &EditorEvent, body: &Element, calibrating: bool) -> RoutedAction {
        if !self.installed {
            return RoutedAction::Ignored;
        }
        match event {
            EditorEvent::PointerEnter { target } => match resolve_identity(body, target) {
                Some(id) => RoutedAction::Hover(id),
                None => RoutedAction::ClearHover,
            },
            EditorEvent::PointerLeave { .. } => RoutedAction::ClearHover,
            EditorEvent::Click { target } => match (resolve_identity(body, target), calibrating) {
                (Some(id), true) => RoutedAction::Calibrate(id),
                (None, true) => RoutedAction::Ignored,
                (Some(id), false) => RoutedAction::Select(id),
                (None, false) => RoutedAction::ClearSelection,
            },
            EditorEvent::DoubleClick { target } => match resolve_identity(body, target) {
                Some(_) if calibrating => RoutedAction::Ignored,
                Some(id) => RoutedAction::BeginInlineEdit(id),
                None => RoutedAction::Ignored,
            },
            EditorEvent::KeyDown { key, ctrl, shift } => {
                if !*ctrl || *shift {
                    return RoutedAction::Ignored;
                }
                match key.to_ascii_lowercase().as_str() {
                    "z" => RoutedAction::Undo,
                    "y" => RoutedAction::Redo,
                    _ => RoutedAction::Ignored,
                }
            }
        }
    }
}

/// Identity of the element at `path` or its nearest tagged ancestor
pub fn resolve_identity(body: &Element, path: &[usize]) -> Option<String> {
    (1..=path.len())
        .rev()
        .find_map(|depth| body.element_at(&path[..depth])?.identity().map(str::to_string))
}
