//! # Selector Derivation
//!
//! Best-effort selector for one element, used by calibration to remember
//! which element was picked as the page scope.
//!
//! Candidates are tried in priority order and the first acceptable one
//! wins:
//!
//! 1. `#id` when the id is a plain identifier and unique
//! 2. `tag.class1.class2` (editor marker classes ignored)
//! 3. `tag[attr="value"]` for the first distinguishing attribute that is unique
//! 4. `#parent > tag:nth-of-type(n)` under a uniquely identified parent
//! 5. `tag:nth-of-type(n)` when siblings share the tag
//! 6. `tag`

use crate::calibration::{CALIBRATE_ELEMENT_CLASS, CALIBRATE_PAGE_CLASS, CALIBRATE_SELECTED_CLASS};
use crate::interaction::{HOVER_CLASS, SELECTED_CLASS};
use crate::templates::{TEMPLATE_EDITABLE_ATTR, TEMPLATE_EDITABLE_CLASS};
use folio_dom::{is_identifier, nth_of_type, Element, Selector, IDENTITY_ATTR};
use regex::Regex;
use std::sync::OnceLock;

/// Marker classes the editor adds; never part of a derived selector
pub const EDITOR_CLASSES: &[&str] = &[
    HOVER_CLASS,
    SELECTED_CLASS,
    CALIBRATE_PAGE_CLASS,
    CALIBRATE_ELEMENT_CLASS,
    CALIBRATE_SELECTED_CLASS,
    "template-selectable-element",
    TEMPLATE_EDITABLE_CLASS,
];

const DISTINGUISHING_ATTRIBUTES: &[&str] = &[
    "name",
    "type",
    "role",
    "title",
    "alt",
    "for",
    "href",
    "src",
    "placeholder",
    "value",
];

fn plain_id() -> &'static Regex {
    static PLAIN_ID: OnceLock<Regex> = OnceLock::new();
    PLAIN_ID.get_or_init(|| Regex::new(r"^[a-zA-Z][a-zA-Z0-9_-]*$").expect("static pattern"))
}

/// Derive a selector for the element at `path` under `root`
///
/// Returns `None` for the root itself or a missing path.
pub fn derive_selector(root: &Element, path: &[usize]) -> Option<String> {
    if path.is_empty() {
        return None;
    }
    let el = root.element_at(path)?;
    let tag = el.tag.as_str();

    if let Some(id) = el.attr("id") {
        let candidate = format!("#{}", id);
        if plain_id().is_match(id) && is_unique(root, &candidate) {
            return Some(candidate);
        }
    }

    let classes: Vec<&str> = el
        .classes()
        .filter(|c| !EDITOR_CLASSES.contains(c) && is_identifier(c))
        .collect();
    if !classes.is_empty() {
        return Some(format!("{}.{}", tag, classes.join(".")));
    }

    for (name, value) in &el.attributes {
        let distinguishing = DISTINGUISHING_ATTRIBUTES.contains(&name.as_str())
            || (name.starts_with("data-") && name != IDENTITY_ATTR && name != TEMPLATE_EDITABLE_ATTR);
        if !distinguishing || value.contains('"') || value.contains('\\') || !is_identifier(name) {
            continue;
        }
        let candidate = format!("{}[{}=\"{}\"]", tag, name, value);
        if is_unique(root, &candidate) {
            return Some(candidate);
        }
    }

    let position = nth_of_type(root, path)?;
    let parent_path = &path[..path.len() - 1];

    if let Some(parent_id) = root
        .element_at(parent_path)
        .filter(|_| !parent_path.is_empty())
        .and_then(|parent| parent.attr("id"))
        .filter(|id| plain_id().is_match(id) && is_unique(root, &format!("#{}", id)))
    {
        let positional = format!("#{} > {}:nth-of-type({})", parent_id, tag, position);
        if is_unique(root, &positional) {
            return Some(positional);
        }
        let direct = format!("#{} > {}", parent_id, tag);
        if same_type_siblings(root, path) == 1 && is_unique(root, &direct) {
            return Some(direct);
        }
    }

    if same_type_siblings(root, path) > 1 {
        return Some(format!("{}:nth-of-type({})", tag, position));
    }
    Some(tag.to_string())
}

fn is_unique(root: &Element, selector: &str) -> bool {
    Selector::parse(selector)
        .map(|s| s.query_all(root).len() == 1)
        .unwrap_or(false)
}

fn same_type_siblings(root: &Element, path: &[usize]) -> usize {
    let Some((last, parent_path)) = path.split_last() else {
        return 0;
    };
    let Some(parent) = root.element_at(parent_path) else {
        return 0;
    };
    let Some(tag) = parent.children.get(*last).and_then(|n| n.as_element()).map(|e| &e.tag) else {
        return 0;
    };
    parent.element_children().filter(|e| e.tag == *tag).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_dom::parse_fragment;

    fn body(markup: &str) -> Element {
        let mut body = Element::new("body");
        body.children = parse_fragment(markup);
        body
    }

    #[test]
    fn test_unique_id_wins() {
        let root = body(r#"<div id="cover" class="page">x</div><div class="page">y</div>"#);
        assert_eq!(derive_selector(&root, &[0]).as_deref(), Some("#cover"));
    }

    #[test]
    fn test_duplicate_or_odd_id_falls_through() {
        let root = body(r#"<div id="a" class="page"></div><div id="a"></div><p id="1x"></p>"#);
        assert_eq!(derive_selector(&root, &[0]).as_deref(), Some("div.page"));
        assert_eq!(derive_selector(&root, &[2]).as_deref(), Some("p"));
    }

    #[test]
    fn test_class_selector_ignores_editor_markers() {
        let root = body(
            r#"<section class="sheet editor-highlight-selected template-calibrate-page" data-editor-id="s"></section>"#,
        );
        assert_eq!(derive_selector(&root, &[0]).as_deref(), Some("section.sheet"));
    }

    #[test]
    fn test_unique_attribute() {
        let root = body(
            r#"<input type="text" name="first" data-editor-id="a"><input type="text" name="last" data-editor-id="b">"#,
        );
        assert_eq!(
            derive_selector(&root, &[1]).as_deref(),
            Some(r#"input[name="last"]"#)
        );
    }

    #[test]
    fn test_editor_identity_is_not_distinguishing() {
        let root = body(r#"<p data-editor-id="a">1</p><p data-editor-id="b">2</p>"#);
        assert_eq!(derive_selector(&root, &[1]).as_deref(), Some("p:nth-of-type(2)"));
    }

    #[test]
    fn test_parent_scoped_position() {
        let root = body(r#"<div id="main"><span>a</span><span>b</span></div><span>c</span>"#);
        assert_eq!(
            derive_selector(&root, &[0, 1]).as_deref(),
            Some("#main > span:nth-of-type(2)")
        );
    }

    #[test]
    fn test_bare_tag_and_root() {
        let root = body("<article><h1>t</h1></article>");
        assert_eq!(derive_selector(&root, &[0]).as_deref(), Some("article"));
        assert_eq!(derive_selector(&root, &[]), None);
        assert_eq!(derive_selector(&root, &[5]), None);
    }
}
