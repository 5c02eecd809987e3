//! Clean export: the document as a standalone file, with every trace of the
//! editor removed.

use crate::calibration::{CALIBRATE_ELEMENT_CLASS, CALIBRATE_PAGE_CLASS, CALIBRATE_SELECTED_CLASS};
use crate::interaction::{CONTENT_EDITABLE_ATTR, HOVER_CLASS, SELECTED_CLASS};
use crate::templates::{TEMPLATE_EDITABLE_ATTR, TEMPLATE_EDITABLE_CLASS};
use folio_dom::{Document, Element, IDENTITY_ATTR};

pub const DOCTYPE: &str = "<!DOCTYPE html>";

/// Classes that only exist while editing
pub const EDITOR_ONLY_CLASSES: &[&str] = &[
    HOVER_CLASS,
    SELECTED_CLASS,
    TEMPLATE_EDITABLE_CLASS,
    CALIBRATE_PAGE_CLASS,
    CALIBRATE_ELEMENT_CLASS,
    CALIBRATE_SELECTED_CLASS,
];

/// Attributes that only exist while editing
pub const EDITOR_ONLY_ATTRIBUTES: &[&str] = &[
    CONTENT_EDITABLE_ATTR,
    "draggable",
    IDENTITY_ATTR,
    TEMPLATE_EDITABLE_ATTR,
];

/// Strip editor state from one element and its descendants
pub fn clean_element(el: &mut Element) {
    clean_one(el);
    el.for_each_descendant_mut(clean_one);
}

fn clean_one(el: &mut Element) {
    for class in EDITOR_ONLY_CLASSES {
        el.remove_class(class);
    }
    for name in EDITOR_ONLY_ATTRIBUTES {
        el.remove_attr(name);
    }
    for name in ["style", "class"] {
        if el.attr(name).is_some_and(|v| v.trim().is_empty()) {
            el.remove_attr(name);
        }
    }
}

/// Clean copy of the whole document
pub fn clean_document(doc: &Document) -> Document {
    let mut copy = doc.clone();
    clean_element(&mut copy.body);
    copy.focused = None;
    copy
}

/// Serialized clean document, prefixed with a doctype
pub fn export_html(doc: &Document) -> String {
    format!("{}\n{}", DOCTYPE, clean_document(doc).to_html())
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_dom::parse_document;

    #[test]
    fn test_export_strips_editor_state() {
        let doc = parse_document(concat!(
            r#"<html lang="en"><head><title>T</title></head><body>"#,
            r#"<div class="page editor-highlight-selected" data-editor-id="p1">"#,
            r#"<h1 class="editor-highlight-hover template-editable-element" data-template-editable="true" data-editor-id="h" contenteditable="true" draggable="true" style="">Title</h1>"#,
            r#"</div></body></html>"#,
        ));
        let html = export_html(&doc);

        assert!(html.starts_with("<!DOCTYPE html>\n<html lang=\"en\">"));
        assert!(html.contains(r#"<div class="page">"#));
        assert!(html.contains("<h1>Title</h1>"));
        assert!(!html.contains(IDENTITY_ATTR));
        assert!(!html.contains("editor-highlight"));
        assert!(!html.contains("contenteditable"));
    }

    #[test]
    fn test_export_leaves_document_untouched() {
        let doc = parse_document(r#"<p data-editor-id="a" class="editor-highlight-hover">x</p>"#);
        export_html(&doc);
        assert_eq!(doc.find("a").map(|p| p.has_class(HOVER_CLASS)), Some(true));
    }
}
