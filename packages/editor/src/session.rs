//! # Editor Session
//!
//! One open document and every piece of editing state attached to it.
//!
//! ## Design
//!
//! The session is an explicitly constructed value owning the document, the
//! identity tagger, the structural watch, interaction state, history,
//! calibration, the template catalog, durable storage and the host's
//! rich-text surface. Nothing is global, so any number of sessions can
//! coexist (tests open dozens).
//!
//! Every mutating operation follows the same shape:
//!
//! 1. Resolve the target by identity; a miss is a soft no-op (`false`/`None`)
//! 2. Mutate the tree
//! 3. Report inserted nodes to the structural watch
//! 4. Capture history, which also persists the clean export
//!
//! Undo and redo run the restore sequence: suspend the watch, reconcile the
//! live body to the stored snapshot (keeping focused input and scroll),
//! resume the watch, clear the selection and persist.
//!
//! ```rust,ignore
//! let mut session = EditorSession::open(config, Box::new(MemoryStorage::new()))?;
//! session.select(&paragraph_id);
//! session.execute(Command::Bold);
//! session.undo();
//! let html = session.export_html();
//! ```

use crate::ai::{build_prompt, parse_completion, AiError, AiProposal, CompletionService};
use crate::calibration::{clear_markers, Calibration, CalibrationStep};
use crate::commands::{
    apply_style, append_nodes, format_block, image_element, insert_html, link_element, table_element,
    target_path, Command, DetachedSurface, RichTextSurface,
};
use crate::config::{ConfigSelectors, EditorConfig};
use crate::errors::{CalibrationError, EditorError};
use crate::export::export_html;
use crate::history::{CaptureMode, CaptureOutcome, History};
use crate::identity::IdentityTagger;
use crate::interaction::{
    sweep_class, EditorEvent, EventRouter, InteractionTracker, RoutedAction, SelectionState,
    CONTENT_EDITABLE_ATTR, HOVER_CLASS, SELECTED_CLASS,
};
use crate::lists::{convert_to_list, ListKind};
use crate::pages::{
    enclosing_page, move_among_siblings, neighbour_page, new_page_element, renumber_pages, MoveDirection,
    PageDirection, PageTarget,
};
use crate::reconcile::reconcile;
use crate::storage::{content_key, Storage};
use crate::templates::{instantiate, TemplateCatalog, TemplateRecord};
use crate::watch::{InsertionEvent, StructuralWatch, WatchReport};
use folio_dom::{
    parse_document, parse_fragment, Document, Element, Node, NodePath, ScrollPosition, IDENTITY_ATTR,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, error, info, warn};

/// What an external replacement rewrites
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scope", content = "identity", rename_all = "camelCase")]
pub enum ReplacementScope {
    /// Exactly one element, by identity
    Element(String),
    /// The whole body
    Document,
}

pub struct EditorSession {
    config: EditorConfig,
    selectors: ConfigSelectors,
    document: Document,
    tagger: IdentityTagger,
    watch: StructuralWatch,
    tracker: InteractionTracker,
    router: EventRouter,
    history: History,
    calibration: Calibration,
    catalog: TemplateCatalog,
    storage: Box<dyn Storage>,
    surface: Box<dyn RichTextSurface>,
    page_count: usize,
}

impl EditorSession {
    /// Open a document: persisted content wins over the configured initial
    /// content
    pub fn open(config: EditorConfig, storage: Box<dyn Storage>) -> Result<Self, EditorError> {
        let selectors = config.validate()?;

        let stored = match storage.get(&content_key(&config.id)) {
            Ok(stored) => stored,
            Err(err) => {
                warn!(id = %config.id, error = %err, "Failed to read persisted content");
                None
            }
        };
        let document = parse_document(stored.as_deref().unwrap_or(&config.initial_content));
        let catalog = TemplateCatalog::load(storage.as_ref());

        let mut session = Self {
            watch: StructuralWatch::with_defaults(selectors.page.clone()),
            history: History::new(config.history_limit),
            selectors,
            document,
            tagger: IdentityTagger::new(),
            tracker: InteractionTracker::new(),
            router: EventRouter::new(),
            calibration: Calibration::new(),
            catalog,
            storage,
            surface: Box::new(DetachedSurface),
            page_count: 0,
            config,
        };

        session.router.install();
        session.notify(InsertionEvent::DocumentReplaced);
        session.capture();
        info!(
            id = %session.config.id,
            restored = stored.is_some(),
            pages = session.page_count,
            templates = session.catalog.len(),
            "Editor session opened"
        );
        Ok(session)
    }

    /// Use the host's rich-text surface for native commands
    pub fn with_surface(mut self, surface: Box<dyn RichTextSurface>) -> Self {
        self.surface = surface;
        self
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn body(&self) -> &Element {
        &self.document.body
    }

    pub fn find(&self, identity: &str) -> Option<&Element> {
        self.document.find(identity)
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn selection(&self) -> &SelectionState {
        self.tracker.state()
    }

    pub fn selected(&self) -> Option<&str> {
        self.tracker.selected()
    }

    pub fn page_count(&self) -> usize {
        self.page_count
    }

    pub fn catalog(&self) -> &TemplateCatalog {
        &self.catalog
    }

    pub fn calibration(&self) -> &Calibration {
        &self.calibration
    }

    pub fn router(&self) -> &EventRouter {
        &self.router
    }

    pub fn watch(&self) -> &StructuralWatch {
        &self.watch
    }

    pub fn storage(&self) -> &dyn Storage {
        self.storage.as_ref()
    }

    // ------------------------------------------------------------------
    // Host state
    // ------------------------------------------------------------------

    /// Record which element holds input focus
    pub fn set_focus(&mut self, identity: Option<&str>) {
        self.document.focused = identity.map(str::to_string);
    }

    /// Type into a form control without syncing it to the markup; the
    /// control takes focus
    pub fn set_control_value(&mut self, identity: &str, value: &str) -> bool {
        let Some(control) = self.document.find_mut(identity).filter(|el| el.is_form_control()) else {
            return false;
        };
        control.value = Some(value.to_string());
        self.document.focused = Some(identity.to_string());
        true
    }

    pub fn set_scroll(&mut self, scroll: ScrollPosition) {
        self.document.scroll = scroll;
    }

    // ------------------------------------------------------------------
    // Interaction
    // ------------------------------------------------------------------

    /// Route a raw surface event and act on it
    pub fn dispatch(&mut self, event: &EditorEvent) -> RoutedAction {
        let action = self
            .router
            .route(event, &self.document.body, self.calibration.is_active());
        match &action {
            RoutedAction::Hover(id) => {
                self.hover(id);
            }
            RoutedAction::ClearHover => self.clear_hover(),
            RoutedAction::Select(id) => {
                self.select(id);
            }
            RoutedAction::ClearSelection => self.clear_selection(),
            RoutedAction::BeginInlineEdit(id) => {
                self.begin_inline_edit(id);
            }
            RoutedAction::Calibrate(id) => {
                if let Err(err) = self.calibration_click(id) {
                    warn!(identity = %id, error = %err, "Calibration click rejected");
                }
            }
            RoutedAction::Undo => {
                self.undo();
            }
            RoutedAction::Redo => {
                self.redo();
            }
            RoutedAction::Ignored => {}
        }
        action
    }

    pub fn hover(&mut self, identity: &str) -> bool {
        self.tracker.hover(&mut self.document.body, identity)
    }

    pub fn clear_hover(&mut self) {
        self.tracker.clear_hover(&mut self.document.body);
    }

    /// Select one element; leaves inline editing on any other element
    pub fn select(&mut self, identity: &str) -> bool {
        if self.tracker.inline_editing().is_some_and(|id| id != identity) {
            self.finish_inline_edit();
        }
        self.tracker.select(&mut self.document.body, identity)
    }

    pub fn clear_selection(&mut self) {
        if self.tracker.inline_editing().is_some() {
            self.finish_inline_edit();
        }
        self.tracker.clear_selection(&mut self.document.body);
    }

    /// Enable native text editing on one element and focus it
    pub fn begin_inline_edit(&mut self, identity: &str) -> bool {
        if self.tracker.inline_editing().is_some_and(|id| id != identity) {
            self.finish_inline_edit();
        }
        if !self.tracker.begin_inline_edit(&mut self.document.body, identity) {
            return false;
        }
        self.document.focused = Some(identity.to_string());
        true
    }

    /// Leave inline editing and capture the edited text
    pub fn finish_inline_edit(&mut self) -> bool {
        let Some(identity) = self.tracker.end_inline_edit(&mut self.document.body) else {
            return false;
        };
        if self.document.focused.as_deref() == Some(identity.as_str()) {
            self.document.focused = None;
        }
        self.capture();
        true
    }

    // ------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------

    /// Run a formatting or structural command
    ///
    /// While inline editing, every command goes to the native surface.
    /// Otherwise it applies to the selected element. Returns false when
    /// there is nothing to apply it to.
    pub fn execute(&mut self, command: Command) -> bool {
        if let Some(identity) = self.tracker.inline_editing().map(str::to_string) {
            self.run_native(Some(&identity), &command);
            self.capture();
            return true;
        }

        let Some(identity) = self.tracker.selected().map(str::to_string) else {
            debug!(command = command.name(), "No selection for command");
            return false;
        };
        let Some(path) = target_path(&self.document.body, &identity) else {
            debug!(identity = %identity, "Selected element is gone");
            return false;
        };

        match &command {
            c if c.is_style() => {
                let focused = self.document.focused.clone();
                let Some(live) = self.document.body.element_at_mut(&path) else {
                    return false;
                };
                let mut target = live.clone();
                apply_style(&mut target, c);
                reconcile(live, &target, focused.as_deref());
            }
            Command::FormatBlock(tag) => {
                let Some(event) = format_block(&mut self.document.body, &path, tag) else {
                    return false;
                };
                self.notify(event);
            }
            Command::InsertUnorderedList | Command::InsertOrderedList => {
                let kind = if matches!(command, Command::InsertOrderedList) {
                    ListKind::Ordered
                } else {
                    ListKind::Unordered
                };
                let Some(change) = convert_to_list(&mut self.document.body, &path, kind, &mut self.tagger) else {
                    return false;
                };
                self.notify(change.event);
                match change.replacement {
                    Some(replacement) => {
                        self.tracker.select(&mut self.document.body, &replacement);
                    }
                    None => self.tracker.clear_selection(&mut self.document.body),
                }
            }
            Command::InsertHtml(markup) => {
                let Some(event) = insert_html(&mut self.document.body, &path, markup, &mut self.tagger) else {
                    return false;
                };
                self.notify(event);
            }
            _ => self.run_native(Some(&identity), &command),
        }

        self.capture();
        true
    }

    fn run_native(&mut self, target: Option<&str>, command: &Command) {
        let result = self
            .surface
            .exec_command(&mut self.document.body, target, command.name(), command.value());
        match result {
            Ok(()) => {
                // The surface may have inserted anything
                self.notify(InsertionEvent::DocumentReplaced);
            }
            Err(err) => error!(command = command.name(), error = %err, "Native command failed"),
        }
    }

    pub fn insert_table(&mut self, rows: usize, cols: usize) -> Option<String> {
        self.insert_element(table_element(rows, cols))
    }

    pub fn insert_image(&mut self, src: &str, alt: &str) -> Option<String> {
        self.insert_element(image_element(src, alt))
    }

    pub fn insert_link(&mut self, href: &str, text: &str) -> Option<String> {
        self.insert_element(link_element(href, text))
    }

    /// Append a new subtree inside the selection, or at the end of the body
    fn insert_element(&mut self, mut element: Element) -> Option<String> {
        let parent = self
            .tracker
            .selected()
            .and_then(|id| target_path(&self.document.body, id))
            .unwrap_or_default();
        self.tagger.retag_subtree(&mut element);
        let identity = element.identity().map(str::to_string);
        let event = append_nodes(&mut self.document.body, &parent, vec![Node::Element(element)])?;
        self.notify(event);
        self.capture();
        identity
    }

    // ------------------------------------------------------------------
    // Element operations
    // ------------------------------------------------------------------

    pub fn remove_element(&mut self, identity: &str) -> bool {
        let Some(path) = target_path(&self.document.body, identity) else {
            return false;
        };
        self.clear_selection();
        self.document.body.remove_at(&path);
        self.tracker.forget_missing(&self.document.body);
        self.tracker.resync_hover(&mut self.document.body);
        self.capture();
        true
    }

    pub fn move_element(&mut self, identity: &str, direction: MoveDirection) -> bool {
        let Some(path) = target_path(&self.document.body, identity) else {
            return false;
        };
        if move_among_siblings(&mut self.document.body, &path, direction).is_none() {
            return false;
        }
        self.capture();
        true
    }

    /// Set an attribute; an empty value removes it
    pub fn update_element_attribute(&mut self, identity: &str, name: &str, value: &str) -> bool {
        if name.eq_ignore_ascii_case(IDENTITY_ATTR) {
            warn!(identity, "Refusing to rewrite an element identity");
            return false;
        }
        let Some(el) = self.document.find_mut(identity) else {
            return false;
        };
        if value.is_empty() {
            el.remove_attr(name);
        } else {
            el.set_attr(name, value);
        }
        self.capture();
        true
    }

    /// Replace an element's inner markup
    pub fn update_element_content(&mut self, identity: &str, content: &str) -> bool {
        let Some(path) = target_path(&self.document.body, identity) else {
            return false;
        };
        let Some(el) = self.document.body.element_at_mut(&path) else {
            return false;
        };
        el.set_inner_html(content);
        self.notify(InsertionEvent::ChildrenReplaced { parent: path });
        self.capture();
        true
    }

    // ------------------------------------------------------------------
    // Pages
    // ------------------------------------------------------------------

    /// Append a blank page, renumber and capture
    pub fn add_new_page(&mut self) -> Option<String> {
        let path = self.append_new_page()?;
        self.renumber();
        self.capture();
        self.document
            .body
            .element_at(&path)
            .and_then(|page| page.identity().map(str::to_string))
    }

    fn append_new_page(&mut self) -> Option<NodePath> {
        let Some(template) = self.config.new_page_template.as_deref() else {
            debug!("No new-page template configured");
            return None;
        };
        let page = new_page_element(template, &self.selectors.content_removal)?;
        let index = self.document.body.children.len();
        self.document.body.children.push(Node::Element(page));
        self.notify(InsertionEvent::Inserted {
            parent: Vec::new(),
            index,
            count: 1,
        });
        Some(vec![index])
    }

    pub fn renumber_pages(&mut self) -> usize {
        let updated = self.renumber();
        self.capture();
        updated
    }

    fn renumber(&mut self) -> usize {
        let (Some(pages), Some(number)) = (&self.selectors.page, &self.selectors.page_number) else {
            return 0;
        };
        renumber_pages(
            &mut self.document.body,
            pages,
            number,
            &self.config.page_number_pattern,
        )
    }

    /// Move the selected element to the end of the previous or next page
    pub fn move_element_to_page(&mut self, direction: PageDirection) -> bool {
        let Some((path, target)) = self.page_destination(direction) else {
            return false;
        };
        let Some(node) = self.document.body.remove_at(&path) else {
            return false;
        };
        self.append_to_page(&target, node);
        self.capture();
        true
    }

    /// Copy the selected element, with fresh identities, to the end of the
    /// previous or next page
    pub fn copy_element_to_page(&mut self, direction: PageDirection) -> Option<String> {
        let (path, target) = self.page_destination(direction)?;
        let mut copy = self.document.body.element_at(&path)?.clone();
        self.tagger.retag_subtree(&mut copy);
        for class in [SELECTED_CLASS, HOVER_CLASS] {
            copy.remove_class(class);
            sweep_class(&mut copy, class);
        }
        let identity = copy.identity().map(str::to_string);
        self.append_to_page(&target, Node::Element(copy));
        self.capture();
        identity
    }

    /// Selected element path and the page it should go to; a page is added
    /// when moving past the last one
    fn page_destination(&mut self, direction: PageDirection) -> Option<(NodePath, NodePath)> {
        let identity = self.tracker.selected()?.to_string();
        let pages = self.selectors.page.clone()?;
        let path = target_path(&self.document.body, &identity)?;
        let current = enclosing_page(&self.document.body, &pages, &path)?;
        if current == path {
            debug!(identity = %identity, "Pages cannot be moved into pages");
            return None;
        }

        let target = match neighbour_page(&self.document.body, &pages, &path, direction) {
            PageTarget::Existing(target) => target,
            PageTarget::PastEnd => {
                let added = self.append_new_page()?;
                self.renumber();
                added
            }
            PageTarget::None => return None,
        };
        if target.starts_with(&current) || current.starts_with(&target) {
            return None;
        }
        Some((path, target))
    }

    fn append_to_page(&mut self, page: &[usize], node: Node) {
        let Some(page_el) = self.document.body.element_at_mut(page) else {
            return;
        };
        let index = page_el.children.len();
        page_el.children.push(node);
        self.notify(InsertionEvent::Inserted {
            parent: page.to_vec(),
            index,
            count: 1,
        });
    }

    // ------------------------------------------------------------------
    // History
    // ------------------------------------------------------------------

    /// Snapshot the body and persist the clean export
    pub fn capture(&mut self) -> CaptureOutcome {
        let body = self.snapshot_body();
        let outcome = self.history.capture(&body, CaptureMode::Normal);
        if outcome != CaptureOutcome::Suppressed {
            self.persist();
        }
        outcome
    }

    /// Body copy without transient interaction and calibration markers
    fn snapshot_body(&self) -> Element {
        let mut body = self.document.body.clone();
        sweep_class(&mut body, HOVER_CLASS);
        sweep_class(&mut body, SELECTED_CLASS);
        clear_markers(&mut body);
        body.for_each_descendant_mut(|el| {
            el.remove_attr(CONTENT_EDITABLE_ATTR);
        });
        body
    }

    pub fn undo(&mut self) -> bool {
        let Some(target) = self.history.step_back().map(|s| s.body.clone()) else {
            return false;
        };
        self.restore(target);
        true
    }

    pub fn redo(&mut self) -> bool {
        let Some(target) = self.history.step_forward().map(|s| s.body.clone()) else {
            return false;
        };
        self.restore(target);
        true
    }

    fn restore(&mut self, target: Element) {
        self.watch.suspend();
        self.history.begin_restore();

        let scroll = self.document.scroll;
        let focused = self.document.focused.clone();
        let stats = reconcile(&mut self.document.body, &target, focused.as_deref());
        self.document.scroll = scroll;
        self.router.install();

        self.history.end_restore();
        self.watch.resume();
        self.notify(InsertionEvent::DocumentReplaced);

        if focused.as_deref().is_some_and(|id| self.document.find(id).is_none()) {
            self.document.focused = None;
        }
        self.tracker.forget_missing(&self.document.body);
        if let Some(editing) = self.tracker.inline_editing().map(str::to_string) {
            if let Some(el) = self.document.find_mut(&editing) {
                el.set_attr(CONTENT_EDITABLE_ATTR, "true");
            }
        }
        self.tracker.clear_selection(&mut self.document.body);
        self.tracker.resync_hover(&mut self.document.body);
        self.persist();
        debug!(cursor = ?self.history.cursor(), ?stats, "History restored");
    }

    fn persist(&mut self) {
        let html = export_html(&self.document);
        if let Err(err) = self.storage.set(&content_key(&self.config.id), &html) {
            error!(id = %self.config.id, error = %err, "Failed to persist document");
        }
    }

    fn notify(&mut self, event: InsertionEvent) -> WatchReport {
        let report = self
            .watch
            .notify(&event, &mut self.document.body, &mut self.tagger);
        if let Some(count) = report.page_count {
            self.page_count = count;
        }
        report
    }

    // ------------------------------------------------------------------
    // External replacement
    // ------------------------------------------------------------------

    /// Replace one element or the whole body with externally produced
    /// markup
    ///
    /// History gets exactly one pre-image capture; the replacement itself is
    /// not captured.
    pub fn apply_external_replacement(&mut self, markup: &str, scope: &ReplacementScope) -> bool {
        let element_target = match scope {
            ReplacementScope::Element(identity) => {
                let Some(path) = target_path(&self.document.body, identity) else {
                    warn!(identity = %identity, "Replacement target not found");
                    return false;
                };
                let Some(element) = parse_fragment(markup).into_iter().find_map(|node| match node {
                    Node::Element(el) => Some(el),
                    _ => None,
                }) else {
                    warn!("Replacement markup has no element");
                    return false;
                };
                Some((path, element))
            }
            ReplacementScope::Document if markup.trim().is_empty() => {
                warn!("Refusing to replace the document with nothing");
                return false;
            }
            ReplacementScope::Document => None,
        };

        self.history.begin_bulk_edit();
        let pre_image = self.snapshot_body();
        self.history.capture(&pre_image, CaptureMode::PreImage);

        match element_target {
            Some((path, element)) => {
                self.document.body.replace_at(&path, vec![Node::Element(element)]);
                if let Some((index, parent)) = path.split_last() {
                    self.notify(InsertionEvent::Inserted {
                        parent: parent.to_vec(),
                        index: *index,
                        count: 1,
                    });
                }
            }
            None => {
                self.document.body.children = parse_document(markup).body.children;
                self.notify(InsertionEvent::ChildrenReplaced { parent: Vec::new() });
            }
        }

        self.tracker.forget_missing(&self.document.body);
        self.tracker.resync_hover(&mut self.document.body);
        self.router.install();
        self.history.end_bulk_edit();
        self.persist();
        true
    }

    /// Ask the completion service for a replacement; the session is not
    /// modified
    pub async fn request_ai_edit<S: CompletionService>(
        &self,
        service: &S,
        scope: ReplacementScope,
        instruction: &str,
    ) -> Result<AiProposal, AiError> {
        let request = build_prompt(&self.document, &scope, instruction).ok_or_else(|| match &scope {
            ReplacementScope::Element(identity) => AiError::MissingTarget(identity.clone()),
            ReplacementScope::Document => AiError::MissingTarget("document".to_string()),
        })?;
        let reply = service.complete(&request).await?;
        let markup = parse_completion(&reply)?;
        debug!(scope = ?scope, len = markup.len(), "AI proposal received");
        Ok(AiProposal { scope, markup })
    }

    pub fn apply_ai_proposal(&mut self, proposal: &AiProposal) -> bool {
        self.apply_external_replacement(&proposal.markup, &proposal.scope)
    }

    // ------------------------------------------------------------------
    // Calibration & templates
    // ------------------------------------------------------------------

    pub fn start_calibration(&mut self) {
        self.tracker.clear_selection(&mut self.document.body);
        self.calibration.start(&mut self.document.body);
    }

    pub fn calibration_click(&mut self, identity: &str) -> Result<CalibrationStep, CalibrationError> {
        self.calibration.click(&mut self.document.body, identity)
    }

    /// Turn the calibration picks into a template and store it
    ///
    /// A failed catalog write is logged; the template stays available for
    /// this session.
    pub fn confirm_calibration(&mut self, name: &str) -> Result<TemplateRecord, CalibrationError> {
        let record = self.calibration.confirm(&mut self.document.body, name)?;
        if let Err(err) = self.catalog.add(record.clone(), self.storage.as_mut()) {
            error!(id = %record.id, error = %err, "Failed to persist template catalog");
        }
        info!(id = %record.id, name = %record.name, "Template created");
        Ok(record)
    }

    pub fn cancel_calibration(&mut self) {
        self.calibration.cancel(&mut self.document.body);
    }

    /// Append a new instance of a template as a page, renumber and capture
    ///
    /// `content` maps the template's stored editable identities to new inner
    /// markup.
    pub fn instantiate_template(&mut self, template_id: &str, content: &HashMap<String, String>) -> Option<String> {
        let Some(record) = self.catalog.get(template_id) else {
            debug!(template_id, "Template not found");
            return None;
        };
        let instance = instantiate(record, content, &mut self.tagger)?;
        let identity = instance.identity().map(str::to_string);

        let index = self.document.body.children.len();
        self.document.body.children.push(Node::Element(instance.element));
        self.notify(InsertionEvent::Inserted {
            parent: Vec::new(),
            index,
            count: 1,
        });
        self.renumber();
        self.capture();
        identity
    }

    // ------------------------------------------------------------------
    // Export
    // ------------------------------------------------------------------

    pub fn export_html(&self) -> String {
        export_html(&self.document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    fn open(content: &str) -> EditorSession {
        EditorSession::open(EditorConfig::new("doc", content), Box::new(MemoryStorage::new())).unwrap()
    }

    fn first_id(session: &EditorSession, tag: &str) -> String {
        let mut found = None;
        session.body().for_each_descendant(|el, _| {
            if found.is_none() && el.tag == tag {
                found = el.identity().map(str::to_string);
            }
        });
        found.unwrap()
    }

    #[test]
    fn test_open_tags_and_captures() {
        let session = open("<p>a</p><p>b</p>");
        assert_eq!(session.body().identities().len(), 2);
        assert_eq!(session.history().len(), 1);
        assert!(session.router().is_installed());
        assert!(session.storage().get("editor-content-doc").unwrap().is_some());
    }

    #[test]
    fn test_command_without_selection_is_noop() {
        let mut session = open("<p>a</p>");
        assert!(!session.execute(Command::Bold));
        assert_eq!(session.history().len(), 1);
    }

    #[test]
    fn test_calibration_markers_stay_out_of_history() {
        use crate::calibration::{CALIBRATE_ELEMENT_CLASS, CALIBRATE_PAGE_CLASS, CALIBRATE_SELECTED_CLASS};

        let mut session = open("<div><p>a</p></div>");
        let p = first_id(&session, "p");
        session.start_calibration();
        assert!(session.update_element_attribute(&p, "title", "t"));
        session.cancel_calibration();
        assert!(session.update_element_attribute(&p, "title", "u"));

        assert!(session.undo());
        let html = session.body().inner_html();
        for class in [CALIBRATE_PAGE_CLASS, CALIBRATE_ELEMENT_CLASS, CALIBRATE_SELECTED_CLASS] {
            assert!(!html.contains(class), "{} restored by undo", class);
        }
        assert_eq!(session.find(&p).unwrap().attr("title"), Some("t"));
    }

    #[test]
    fn test_selection_markers_stay_out_of_history() {
        let mut session = open("<p>a</p>");
        let p = first_id(&session, "p");
        session.select(&p);
        session.hover(&p);
        assert_eq!(session.capture(), CaptureOutcome::Duplicate);
    }

    #[test]
    fn test_native_failure_still_captures() {
        let mut session = open("<p>a</p>");
        let p = first_id(&session, "p");
        assert!(session.begin_inline_edit(&p));
        assert!(session.execute(Command::parse("insertText", Some("x"))));
        // DetachedSurface rejects the command; nothing changed, so the
        // capture is a duplicate
        assert_eq!(session.history().len(), 1);
        assert!(session.finish_inline_edit());
        assert!(session.find(&p).unwrap().attr(CONTENT_EDITABLE_ATTR).is_none());
    }

    #[test]
    fn test_update_attribute_and_content() {
        let mut session = open("<p>a</p>");
        let p = first_id(&session, "p");
        assert!(session.update_element_attribute(&p, "title", "hi"));
        assert_eq!(session.find(&p).unwrap().attr("title"), Some("hi"));
        assert!(session.update_element_attribute(&p, "title", ""));
        assert!(!session.find(&p).unwrap().has_attr("title"));
        assert!(!session.update_element_attribute(&p, IDENTITY_ATTR, "x"));

        assert!(session.update_element_content(&p, "<b>new</b>"));
        let p_el = session.find(&p).unwrap();
        assert_eq!(p_el.text_content(), "new");
        assert!(p_el.element_at(&[0]).unwrap().identity().is_some());
        assert!(!session.update_element_content("missing", "x"));
    }

    #[test]
    fn test_remove_element_clears_selection() {
        let mut session = open("<p>a</p><p>b</p>");
        let p = first_id(&session, "p");
        session.select(&p);
        assert!(session.remove_element(&p));
        assert!(session.selected().is_none());
        assert!(session.find(&p).is_none());
        assert!(!session.remove_element(&p));
    }

    #[test]
    fn test_insert_table_into_selection() {
        let mut session = open("<div>x</div>");
        let div = first_id(&session, "div");
        session.select(&div);
        let table = session.insert_table(2, 3).unwrap();
        let path = session.document().find_path(&table).unwrap();
        assert_eq!(path.len(), 2);
        let table_el = session.find(&table).unwrap();
        assert_eq!(table_el.element_at(&[0]).unwrap().element_children().count(), 2);
        assert_eq!(session.history().len(), 2);
    }
}
