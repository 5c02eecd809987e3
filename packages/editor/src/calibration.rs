//! # Calibration
//!
//! Interactive capture of a page as a reusable template.
//!
//! ## Design
//!
//! ```text
//! Idle ──start──▶ SelectingPageScope ──click (selector resolves)──▶ SelectingEditableElements
//!  ▲                    │  ▲                                                │
//!  │                    │  └── click (no selector) stays, error returned    │ click toggles
//!  └──────── cancel / confirm ◀──────────────────────────────────────────────┘
//! ```
//!
//! Candidates and picks are shown with marker classes. Confirm removes every
//! marker before the page markup is captured, so the stored template never
//! contains them.

use crate::derive::derive_selector;
use crate::errors::CalibrationError;
use crate::interaction::{sweep_class, HOVER_CLASS, SELECTED_CLASS};
use crate::templates::TemplateRecord;
use folio_dom::{Element, Selector};
use tracing::{debug, warn};

pub const CALIBRATE_PAGE_CLASS: &str = "template-calibrate-page";
pub const CALIBRATE_ELEMENT_CLASS: &str = "template-calibrate-element";
pub const CALIBRATE_SELECTED_CLASS: &str = "template-selected-element";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CalibrationStage {
    #[default]
    Idle,
    SelectingPageScope,
    SelectingEditableElements,
}

/// Outcome of a click while calibrating
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CalibrationStep {
    /// The page scope was chosen
    PageSelected { identity: String, selector: String },
    /// An editable element was added to or removed from the working set
    Toggled { identity: String, selected: bool },
    /// Click outside the chosen page
    Ignored,
}

#[derive(Debug, Clone, Default)]
pub struct Calibration {
    stage: CalibrationStage,
    page: Option<String>,
    page_selector: Option<String>,
    editable: Vec<String>,
}

impl Calibration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage(&self) -> CalibrationStage {
        self.stage
    }

    pub fn is_active(&self) -> bool {
        self.stage != CalibrationStage::Idle
    }

    pub fn page(&self) -> Option<&str> {
        self.page.as_deref()
    }

    pub fn page_selector(&self) -> Option<&str> {
        self.page_selector.as_deref()
    }

    pub fn editable(&self) -> &[String] {
        &self.editable
    }

    /// Enter page-scope selection, marking every element as a candidate
    pub fn start(&mut self, body: &mut Element) {
        self.cancel(body);
        body.for_each_descendant_mut(|el| el.add_class(CALIBRATE_PAGE_CLASS));
        self.stage = CalibrationStage::SelectingPageScope;
        debug!("Calibration started");
    }

    pub fn click(&mut self, body: &mut Element, identity: &str) -> Result<CalibrationStep, CalibrationError> {
        match self.stage {
            CalibrationStage::Idle => Err(CalibrationError::NotActive),
            CalibrationStage::SelectingPageScope => self.choose_page(body, identity),
            CalibrationStage::SelectingEditableElements => Ok(self.toggle(body, identity)),
        }
    }

    fn choose_page(&mut self, body: &mut Element, identity: &str) -> Result<CalibrationStep, CalibrationError> {
        let path = body
            .find_path(identity)
            .filter(|path| !path.is_empty())
            .ok_or_else(|| CalibrationError::SelectorNotFound(identity.to_string()))?;

        // Markers would leak into the derived class selector
        sweep_class(body, CALIBRATE_PAGE_CLASS);
        let selector = derive_selector(body, &path);
        let resolves = selector
            .as_deref()
            .and_then(|text| Selector::parse(text).ok())
            .is_some_and(|s| !s.query_all(body).is_empty());

        let Some(selector) = selector.filter(|_| resolves) else {
            body.for_each_descendant_mut(|el| el.add_class(CALIBRATE_PAGE_CLASS));
            warn!(identity, "No usable selector for calibration page");
            return Err(CalibrationError::SelectorNotFound(identity.to_string()));
        };

        if let Some(page) = body.element_at_mut(&path) {
            page.for_each_descendant_mut(|el| {
                if el.identity().is_some() {
                    el.add_class(CALIBRATE_ELEMENT_CLASS);
                }
            });
        }

        self.page = Some(identity.to_string());
        self.page_selector = Some(selector.clone());
        self.stage = CalibrationStage::SelectingEditableElements;
        debug!(identity, %selector, "Calibration page selected");
        Ok(CalibrationStep::PageSelected {
            identity: identity.to_string(),
            selector,
        })
    }

    fn toggle(&mut self, body: &mut Element, identity: &str) -> CalibrationStep {
        let inside_page = self
            .page
            .as_deref()
            .and_then(|page| body.find(page))
            .is_some_and(|page| page.identity() != Some(identity) && page.contains_identity(identity));
        if !inside_page {
            return CalibrationStep::Ignored;
        }
        let Some(el) = body.find_mut(identity) else {
            return CalibrationStep::Ignored;
        };

        let selected = match self.editable.iter().position(|id| id == identity) {
            Some(pos) => {
                self.editable.remove(pos);
                el.remove_class(CALIBRATE_SELECTED_CLASS);
                false
            }
            None => {
                self.editable.push(identity.to_string());
                el.add_class(CALIBRATE_SELECTED_CLASS);
                true
            }
        };
        CalibrationStep::Toggled {
            identity: identity.to_string(),
            selected,
        }
    }

    /// Build a template record from the current picks and return to idle
    ///
    /// Validation failures leave calibration active so the user can retry.
    pub fn confirm(&mut self, body: &mut Element, name: &str) -> Result<TemplateRecord, CalibrationError> {
        match self.stage {
            CalibrationStage::Idle => return Err(CalibrationError::NotActive),
            CalibrationStage::SelectingPageScope => return Err(CalibrationError::NoPageSelected),
            CalibrationStage::SelectingEditableElements => {}
        }
        if self.editable.is_empty() {
            return Err(CalibrationError::EmptySelection);
        }
        if name.trim().is_empty() {
            return Err(CalibrationError::EmptyName);
        }
        let (Some(page), Some(selector)) = (self.page.clone(), self.page_selector.clone()) else {
            return Err(CalibrationError::NoPageSelected);
        };
        let page_path = body.find_path(&page).ok_or(CalibrationError::NoPageSelected)?;

        clear_markers(body);
        let mut page_copy = body
            .element_at(&page_path)
            .cloned()
            .ok_or(CalibrationError::NoPageSelected)?;
        for class in [HOVER_CLASS, SELECTED_CLASS] {
            page_copy.remove_class(class);
            sweep_class(&mut page_copy, class);
        }
        let html = page_copy.outer_html();
        let page_index = Selector::parse(&selector)
            .map_err(|_| CalibrationError::SelectorNotFound(selector.clone()))?
            .query_all(body)
            .iter()
            .position(|path| *path == page_path)
            .unwrap_or(0);

        let record = TemplateRecord {
            id: TemplateRecord::generate_id(),
            name: name.trim().to_string(),
            page_index,
            html,
            editable_elements: std::mem::take(&mut self.editable),
            page_selector: selector,
        };
        self.reset();
        debug!(id = %record.id, "Calibration confirmed");
        Ok(record)
    }

    /// Drop all transient state and markers
    pub fn cancel(&mut self, body: &mut Element) {
        clear_markers(body);
        self.reset();
    }

    fn reset(&mut self) {
        self.stage = CalibrationStage::Idle;
        self.page = None;
        self.page_selector = None;
        self.editable.clear();
    }
}

/// Remove every calibration marker class under `body`
pub(crate) fn clear_markers(body: &mut Element) {
    sweep_class(body, CALIBRATE_PAGE_CLASS);
    sweep_class(body, CALIBRATE_ELEMENT_CLASS);
    sweep_class(body, CALIBRATE_SELECTED_CLASS);
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_dom::parse_fragment;

    fn body() -> Element {
        let mut body = Element::new("body");
        body.children = parse_fragment(concat!(
            r#"<div class="page" data-editor-id="p1"><h1 data-editor-id="t1">One</h1><p data-editor-id="b1">a</p></div>"#,
            r#"<div class="page" data-editor-id="p2"><h1 data-editor-id="t2">Two</h1><p data-editor-id="b2">b</p></div>"#,
        ));
        body
    }

    fn has_markers(body: &Element) -> bool {
        let html = body.inner_html();
        html.contains(CALIBRATE_PAGE_CLASS)
            || html.contains(CALIBRATE_ELEMENT_CLASS)
            || html.contains(CALIBRATE_SELECTED_CLASS)
    }

    #[test]
    fn test_full_calibration_flow() {
        let mut body = body();
        let mut calibration = Calibration::new();
        calibration.start(&mut body);
        assert!(body.find("t1").unwrap().has_class(CALIBRATE_PAGE_CLASS));

        let step = calibration.click(&mut body, "p2").unwrap();
        assert_eq!(
            step,
            CalibrationStep::PageSelected {
                identity: "p2".into(),
                selector: "div.page".into()
            }
        );
        assert_eq!(calibration.stage(), CalibrationStage::SelectingEditableElements);
        assert!(body.find("t2").unwrap().has_class(CALIBRATE_ELEMENT_CLASS));
        assert!(!body.find("t1").unwrap().has_class(CALIBRATE_ELEMENT_CLASS));

        calibration.click(&mut body, "t2").unwrap();
        calibration.click(&mut body, "b2").unwrap();
        let step = calibration.click(&mut body, "b2").unwrap();
        assert_eq!(
            step,
            CalibrationStep::Toggled {
                identity: "b2".into(),
                selected: false
            }
        );

        let record = calibration.confirm(&mut body, " Cover ").unwrap();
        assert_eq!(record.name, "Cover");
        assert_eq!(record.page_index, 1);
        assert_eq!(record.page_selector, "div.page");
        assert_eq!(record.editable_elements, vec!["t2".to_string()]);
        assert!(!record.html.contains("template-"));
        assert!(!has_markers(&body));
        assert!(!calibration.is_active());
    }

    #[test]
    fn test_confirm_leaves_interaction_markers_out_of_record() {
        let mut body = body();
        let mut calibration = Calibration::new();
        calibration.start(&mut body);
        calibration.click(&mut body, "p1").unwrap();
        calibration.click(&mut body, "t1").unwrap();
        body.find_mut("t1").unwrap().add_class(HOVER_CLASS);
        body.find_mut("p1").unwrap().add_class(SELECTED_CLASS);

        let record = calibration.confirm(&mut body, "Cover").unwrap();
        assert!(!record.html.contains(HOVER_CLASS));
        assert!(!record.html.contains(SELECTED_CLASS));
        assert!(body.find("t1").unwrap().has_class(HOVER_CLASS));
    }

    #[test]
    fn test_clicks_outside_page_are_ignored() {
        let mut body = body();
        let mut calibration = Calibration::new();
        calibration.start(&mut body);
        calibration.click(&mut body, "p1").unwrap();
        assert_eq!(calibration.click(&mut body, "t2").unwrap(), CalibrationStep::Ignored);
        assert_eq!(calibration.click(&mut body, "p1").unwrap(), CalibrationStep::Ignored);
        assert!(calibration.editable().is_empty());
    }

    #[test]
    fn test_confirm_validation_keeps_state() {
        let mut body = body();
        let mut calibration = Calibration::new();
        assert_eq!(calibration.confirm(&mut body, "x"), Err(CalibrationError::NotActive));

        calibration.start(&mut body);
        assert_eq!(calibration.confirm(&mut body, "x"), Err(CalibrationError::NoPageSelected));

        calibration.click(&mut body, "p1").unwrap();
        assert_eq!(calibration.confirm(&mut body, "x"), Err(CalibrationError::EmptySelection));

        calibration.click(&mut body, "b1").unwrap();
        assert_eq!(calibration.confirm(&mut body, "  "), Err(CalibrationError::EmptyName));
        assert!(calibration.is_active());
        assert_eq!(calibration.editable(), ["b1".to_string()]);
    }

    #[test]
    fn test_unknown_page_click_stays_in_scope_selection() {
        let mut body = body();
        let mut calibration = Calibration::new();
        calibration.start(&mut body);
        assert_eq!(
            calibration.click(&mut body, "missing"),
            Err(CalibrationError::SelectorNotFound("missing".into()))
        );
        assert_eq!(calibration.stage(), CalibrationStage::SelectingPageScope);
    }

    #[test]
    fn test_cancel_discards_everything() {
        let mut body = body();
        let mut calibration = Calibration::new();
        calibration.start(&mut body);
        calibration.click(&mut body, "p1").unwrap();
        calibration.click(&mut body, "t1").unwrap();
        calibration.cancel(&mut body);
        assert!(!calibration.is_active());
        assert!(calibration.page().is_none());
        assert!(!has_markers(&body));
    }
}
