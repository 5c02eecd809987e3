//! # Editing Scripts
//!
//! A script is a JSON array of steps replayed against one session, in order.
//! Elements are addressed by CSS selector plus an optional match index,
//! since identities are random per load.
//!
//! ```json
//! [
//!   { "step": "select", "selector": "h1" },
//!   { "step": "command", "name": "bold" },
//!   { "step": "add-page" },
//!   { "step": "undo" }
//! ]
//! ```

use anyhow::{anyhow, Context, Result};
use folio_dom::Selector;
use folio_editor::{
    CalibrationError, Command, EditorSession, MoveDirection, PageDirection, ReplacementScope,
    TemplateRecord,
};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// Element addressed by selector; `index` picks among several matches
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Target {
    pub selector: String,
    #[serde(default)]
    pub index: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "step", rename_all = "kebab-case")]
pub enum ScriptStep {
    Select {
        selector: String,
        #[serde(default)]
        index: usize,
    },
    ClearSelection,
    InlineEdit {
        selector: String,
        #[serde(default)]
        index: usize,
    },
    FinishInline,
    Command {
        name: String,
        #[serde(default)]
        value: Option<String>,
    },
    Undo,
    Redo,
    AddPage,
    Renumber,
    MoveToPage {
        direction: PageDirection,
    },
    CopyToPage {
        direction: PageDirection,
    },
    Move {
        selector: String,
        #[serde(default)]
        index: usize,
        direction: MoveDirection,
    },
    Remove {
        selector: String,
        #[serde(default)]
        index: usize,
    },
    SetAttribute {
        selector: String,
        #[serde(default)]
        index: usize,
        name: String,
        value: String,
    },
    SetContent {
        selector: String,
        #[serde(default)]
        index: usize,
        content: String,
    },
    InsertTable {
        rows: usize,
        cols: usize,
    },
    InsertImage {
        src: String,
        #[serde(default)]
        alt: String,
    },
    InsertLink {
        href: String,
        text: String,
    },
    /// Replace one element, or the whole body when `target` is absent
    Replace {
        #[serde(default)]
        target: Option<Target>,
        markup: String,
    },
    /// Save a page as a template with the given editable regions
    Calibrate {
        name: String,
        page: Target,
        #[serde(default)]
        editable: Vec<Target>,
    },
    /// Append a page from a template; `content` fills editable regions in
    /// the order they were chosen during calibration
    Instantiate {
        template: String,
        #[serde(default)]
        content: Vec<String>,
    },
}

/// Result of a single step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Applied(Option<String>),
    Skipped,
}

impl StepOutcome {
    fn from_flag(applied: bool) -> Self {
        if applied {
            StepOutcome::Applied(None)
        } else {
            StepOutcome::Skipped
        }
    }

    fn from_identity(identity: Option<String>) -> Self {
        match identity {
            Some(identity) => StepOutcome::Applied(Some(identity)),
            None => StepOutcome::Skipped,
        }
    }
}

/// Read a script file
pub fn load_script(path: &Path) -> Result<Vec<ScriptStep>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read script {}", path.display()))?;
    parse_script(&content)
}

pub fn parse_script(json: &str) -> Result<Vec<ScriptStep>> {
    Ok(serde_json::from_str(json)?)
}

/// Identity of the `index`-th element matching `selector`
pub fn resolve(session: &EditorSession, selector: &str, index: usize) -> Result<Option<String>> {
    let selector = Selector::parse(selector)?;
    let body = session.body();
    Ok(selector
        .query_all(body)
        .get(index)
        .and_then(|path| body.element_at(path))
        .and_then(|el| el.identity())
        .map(str::to_string))
}

impl ScriptStep {
    pub fn name(&self) -> &'static str {
        match self {
            ScriptStep::Select { .. } => "select",
            ScriptStep::ClearSelection => "clear-selection",
            ScriptStep::InlineEdit { .. } => "inline-edit",
            ScriptStep::FinishInline => "finish-inline",
            ScriptStep::Command { .. } => "command",
            ScriptStep::Undo => "undo",
            ScriptStep::Redo => "redo",
            ScriptStep::AddPage => "add-page",
            ScriptStep::Renumber => "renumber",
            ScriptStep::MoveToPage { .. } => "move-to-page",
            ScriptStep::CopyToPage { .. } => "copy-to-page",
            ScriptStep::Move { .. } => "move",
            ScriptStep::Remove { .. } => "remove",
            ScriptStep::SetAttribute { .. } => "set-attribute",
            ScriptStep::SetContent { .. } => "set-content",
            ScriptStep::InsertTable { .. } => "insert-table",
            ScriptStep::InsertImage { .. } => "insert-image",
            ScriptStep::InsertLink { .. } => "insert-link",
            ScriptStep::Replace { .. } => "replace",
            ScriptStep::Calibrate { .. } => "calibrate",
            ScriptStep::Instantiate { .. } => "instantiate",
        }
    }

    /// Run this step. Unresolved selectors and library no-ops are skips;
    /// malformed selectors and failed calibrations are errors.
    pub fn apply(&self, session: &mut EditorSession) -> Result<StepOutcome> {
        let outcome = match self {
            ScriptStep::Select { selector, index } => match resolve(session, selector, *index)? {
                Some(id) => StepOutcome::from_flag(session.select(&id)),
                None => StepOutcome::Skipped,
            },
            ScriptStep::ClearSelection => {
                session.clear_selection();
                StepOutcome::Applied(None)
            }
            ScriptStep::InlineEdit { selector, index } => match resolve(session, selector, *index)? {
                Some(id) => StepOutcome::from_flag(session.begin_inline_edit(&id)),
                None => StepOutcome::Skipped,
            },
            ScriptStep::FinishInline => StepOutcome::from_flag(session.finish_inline_edit()),
            ScriptStep::Command { name, value } => {
                StepOutcome::from_flag(session.execute(Command::parse(name, value.as_deref())))
            }
            ScriptStep::Undo => StepOutcome::from_flag(session.undo()),
            ScriptStep::Redo => StepOutcome::from_flag(session.redo()),
            ScriptStep::AddPage => StepOutcome::from_identity(session.add_new_page()),
            ScriptStep::Renumber => {
                let updated = session.renumber_pages();
                StepOutcome::Applied(Some(format!("{} page numbers", updated)))
            }
            ScriptStep::MoveToPage { direction } => {
                StepOutcome::from_flag(session.move_element_to_page(*direction))
            }
            ScriptStep::CopyToPage { direction } => {
                StepOutcome::from_identity(session.copy_element_to_page(*direction))
            }
            ScriptStep::Move { selector, index, direction } => match resolve(session, selector, *index)? {
                Some(id) => StepOutcome::from_flag(session.move_element(&id, *direction)),
                None => StepOutcome::Skipped,
            },
            ScriptStep::Remove { selector, index } => match resolve(session, selector, *index)? {
                Some(id) => StepOutcome::from_flag(session.remove_element(&id)),
                None => StepOutcome::Skipped,
            },
            ScriptStep::SetAttribute { selector, index, name, value } => {
                match resolve(session, selector, *index)? {
                    Some(id) => StepOutcome::from_flag(session.update_element_attribute(&id, name, value)),
                    None => StepOutcome::Skipped,
                }
            }
            ScriptStep::SetContent { selector, index, content } => {
                match resolve(session, selector, *index)? {
                    Some(id) => StepOutcome::from_flag(session.update_element_content(&id, content)),
                    None => StepOutcome::Skipped,
                }
            }
            ScriptStep::InsertTable { rows, cols } => {
                StepOutcome::from_identity(session.insert_table(*rows, *cols))
            }
            ScriptStep::InsertImage { src, alt } => StepOutcome::from_identity(session.insert_image(src, alt)),
            ScriptStep::InsertLink { href, text } => StepOutcome::from_identity(session.insert_link(href, text)),
            ScriptStep::Replace { target, markup } => {
                let scope = match target {
                    Some(target) => match resolve(session, &target.selector, target.index)? {
                        Some(id) => ReplacementScope::Element(id),
                        None => return Ok(StepOutcome::Skipped),
                    },
                    None => ReplacementScope::Document,
                };
                StepOutcome::from_flag(session.apply_external_replacement(markup, &scope))
            }
            ScriptStep::Calibrate { name, page, editable } => calibrate(session, name, page, editable)?,
            ScriptStep::Instantiate { template, content } => instantiate(session, template, content),
        };
        Ok(outcome)
    }
}

fn calibrate(session: &mut EditorSession, name: &str, page: &Target, editable: &[Target]) -> Result<StepOutcome> {
    let page_id = resolve(session, &page.selector, page.index)?
        .ok_or_else(|| anyhow!("No page matches '{}'", page.selector))?;
    let mut editable_ids = Vec::with_capacity(editable.len());
    for target in editable {
        let id = resolve(session, &target.selector, target.index)?
            .ok_or_else(|| anyhow!("No element matches '{}'", target.selector))?;
        editable_ids.push(id);
    }

    session.start_calibration();
    match click_through(session, &page_id, &editable_ids, name) {
        Ok(record) => Ok(StepOutcome::Applied(Some(record.id))),
        Err(err) => {
            session.cancel_calibration();
            Err(err.into())
        }
    }
}

fn click_through(
    session: &mut EditorSession,
    page: &str,
    editable: &[String],
    name: &str,
) -> Result<TemplateRecord, CalibrationError> {
    session.calibration_click(page)?;
    for id in editable {
        session.calibration_click(id)?;
    }
    session.confirm_calibration(name)
}

fn instantiate(session: &mut EditorSession, template: &str, content: &[String]) -> StepOutcome {
    let Some(record) = session
        .catalog()
        .records()
        .iter()
        .find(|record| record.id == template || record.name == template)
    else {
        return StepOutcome::Skipped;
    };
    let id = record.id.clone();
    let content: HashMap<String, String> = record
        .editable_elements
        .iter()
        .cloned()
        .zip(content.iter().cloned())
        .collect();
    StepOutcome::from_identity(session.instantiate_template(&id, &content))
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_editor::{EditorConfig, MemoryStorage};

    fn open() -> EditorSession {
        let mut config = EditorConfig::new(
            "doc",
            r#"<div class="page"><span class="num">1</span><h1>Title</h1><p class="body">Text</p></div>"#,
        );
        config.page_structure_selector = Some(".page".to_string());
        config.new_page_template = Some(r#"<div class="page"><span class="num"></span></div>"#.to_string());
        config.page_number_element_selector = Some(".num".to_string());
        EditorSession::open(config, Box::new(MemoryStorage::new())).unwrap()
    }

    fn run(session: &mut EditorSession, json: &str) -> Vec<StepOutcome> {
        parse_script(json)
            .unwrap()
            .iter()
            .map(|step| step.apply(session).unwrap())
            .collect()
    }

    #[test]
    fn test_parse_steps() {
        let steps = parse_script(
            r#"[
                { "step": "select", "selector": "h1" },
                { "step": "command", "name": "fontSize", "value": "5" },
                { "step": "move-to-page", "direction": "next" },
                { "step": "replace", "markup": "<p>x</p>" }
            ]"#,
        )
        .unwrap();

        assert_eq!(
            steps[0],
            ScriptStep::Select {
                selector: "h1".to_string(),
                index: 0
            }
        );
        assert_eq!(
            steps[2],
            ScriptStep::MoveToPage {
                direction: PageDirection::Next
            }
        );
        assert_eq!(steps[3].name(), "replace");
    }

    #[test]
    fn test_unknown_step_is_error() {
        assert!(parse_script(r#"[{ "step": "explode" }]"#).is_err());
    }

    #[test]
    fn test_bold_then_undo() {
        let mut session = open();
        let outcomes = run(
            &mut session,
            r#"[
                { "step": "select", "selector": "h1" },
                { "step": "command", "name": "bold" }
            ]"#,
        );
        assert!(outcomes.iter().all(|o| *o != StepOutcome::Skipped));
        assert!(session.export_html().contains("font-weight: bold"));

        run(&mut session, r#"[{ "step": "undo" }]"#);
        assert!(!session.export_html().contains("font-weight"));
    }

    #[test]
    fn test_unmatched_selector_skips() {
        let mut session = open();
        let outcomes = run(&mut session, r#"[{ "step": "remove", "selector": "table" }]"#);
        assert_eq!(outcomes, vec![StepOutcome::Skipped]);
    }

    #[test]
    fn test_invalid_selector_is_error() {
        let mut session = open();
        let steps = parse_script(r#"[{ "step": "select", "selector": "h1[" }]"#).unwrap();
        assert!(steps[0].apply(&mut session).is_err());
    }

    #[test]
    fn test_add_page_renumbers() {
        let mut session = open();
        run(&mut session, r#"[{ "step": "add-page" }]"#);
        assert_eq!(session.page_count(), 2);
        assert!(session.export_html().contains(r#"<span class="num">2</span>"#));
    }

    #[test]
    fn test_calibrate_and_instantiate() {
        let mut session = open();
        let outcomes = run(
            &mut session,
            r#"[
                {
                    "step": "calibrate",
                    "name": "Chapter",
                    "page": { "selector": ".page" },
                    "editable": [{ "selector": "h1" }]
                },
                { "step": "instantiate", "template": "Chapter", "content": ["Second chapter"] }
            ]"#,
        );

        assert!(matches!(outcomes[0], StepOutcome::Applied(Some(_))));
        assert!(matches!(outcomes[1], StepOutcome::Applied(Some(_))));
        assert_eq!(session.catalog().len(), 1);
        assert_eq!(session.page_count(), 2);
        assert!(session.export_html().contains("Second chapter"));
    }

    #[test]
    fn test_calibrate_without_page_fails() {
        let mut session = open();
        let steps = parse_script(
            r#"[{ "step": "calibrate", "name": "X", "page": { "selector": "table" } }]"#,
        )
        .unwrap();
        assert!(steps[0].apply(&mut session).is_err());
        assert!(!session.calibration().is_active());
    }

    #[test]
    fn test_replace_element() {
        let mut session = open();
        run(
            &mut session,
            r#"[{ "step": "replace", "target": { "selector": "p.body" }, "markup": "<p>Rewritten</p>" }]"#,
        );
        let html = session.export_html();
        assert!(html.contains("<p>Rewritten</p>"));
        assert!(!html.contains("Text"));
    }
}
