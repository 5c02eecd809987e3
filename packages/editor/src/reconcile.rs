//! # Reconciler
//!
//! Patches a live subtree in place until it matches a target subtree.
//!
//! ## Algorithm
//!
//! 1. If the root tags differ, the live root is replaced wholesale
//! 2. Otherwise attributes are synced, then children are matched:
//!    - keyed elements (carrying an identity) by identity
//!    - unkeyed nodes by kind and tag, scanning forward in order
//!    - everything left in the target is inserted as a clone
//! 3. Live children that matched nothing are removed
//!
//! ## Focus preservation
//!
//! When the focused form control's live value differs from the target's,
//! the live value wins. In-progress typing is never clobbered by a patch.

use folio_dom::{Element, Node};
use serde::Serialize;
use std::collections::HashMap;

/// Counts of what a reconciliation touched
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileStats {
    pub reused: usize,
    pub inserted: usize,
    pub removed: usize,
    pub replaced: usize,
    pub attributes_changed: usize,
    pub text_updated: usize,
}

impl ReconcileStats {
    /// True when the live tree already matched
    pub fn is_noop(&self) -> bool {
        self.inserted == 0
            && self.removed == 0
            && self.replaced == 0
            && self.attributes_changed == 0
            && self.text_updated == 0
    }
}

/// Patch `live` to match `target`, honouring the focused control's value
pub fn reconcile(live: &mut Element, target: &Element, focused: Option<&str>) -> ReconcileStats {
    let mut stats = ReconcileStats::default();
    if live.tag != target.tag {
        let carried = focused.and_then(|id| focused_value(live, id).map(|v| (id, v)));
        *live = target.clone();
        if let Some((id, value)) = carried {
            if let Some(control) = live.find_mut(id).filter(|el| el.is_form_control()) {
                control.value = Some(value);
            }
        }
        stats.replaced += 1;
        return stats;
    }
    reconcile_element(live, target, focused, &mut stats);
    stats
}

fn focused_value(root: &Element, focused: &str) -> Option<String> {
    root.find(focused)
        .filter(|el| el.is_form_control())
        .map(Element::current_value)
}

fn reconcile_element(
    live: &mut Element,
    target: &Element,
    focused: Option<&str>,
    stats: &mut ReconcileStats,
) {
    let preserved = match focused {
        Some(id) if live.identity() == Some(id) && live.is_form_control() => {
            let live_value = live.current_value();
            (live_value != target.current_value()).then_some(live_value)
        }
        _ => None,
    };

    sync_attributes(live, target, stats);
    reconcile_children(live, target, focused, stats);

    match preserved {
        Some(value) => live.value = Some(value),
        None => live.value = target.value.clone(),
    }
}

fn sync_attributes(live: &mut Element, target: &Element, stats: &mut ReconcileStats) {
    let before = live.attributes.len();
    live.attributes
        .retain(|(name, _)| target.attributes.iter().any(|(t, _)| t == name));
    stats.attributes_changed += before - live.attributes.len();

    for (name, value) in &target.attributes {
        if live.attr(name) != Some(value.as_str()) {
            live.set_attr(name.clone(), value.clone());
            stats.attributes_changed += 1;
        }
    }

    // keep the target's attribute order so serializations compare equal
    if live.attributes != target.attributes {
        live.attributes = target.attributes.clone();
    }
}

fn reconcile_children(
    live: &mut Element,
    target: &Element,
    focused: Option<&str>,
    stats: &mut ReconcileStats,
) {
    let mut old: Vec<Option<Node>> = std::mem::take(&mut live.children)
        .into_iter()
        .map(Some)
        .collect();

    let keyed: HashMap<String, usize> = old
        .iter()
        .enumerate()
        .filter_map(|(i, node)| {
            let id = node.as_ref()?.as_element()?.identity()?;
            Some((id.to_string(), i))
        })
        .collect();

    let mut cursor = 0;
    let mut result = Vec::with_capacity(target.children.len());

    for wanted in &target.children {
        let matched = match wanted {
            Node::Element(el) => match el.identity() {
                Some(id) => keyed.get(id).and_then(|&i| old[i].take()),
                None => take_unkeyed(&mut old, &mut cursor, |node| match node {
                    Node::Element(candidate) => {
                        candidate.identity().is_none() && candidate.tag == el.tag
                    }
                    _ => false,
                }),
            },
            Node::Text { .. } => {
                take_unkeyed(&mut old, &mut cursor, |node| matches!(node, Node::Text { .. }))
            }
            Node::Comment { .. } => {
                take_unkeyed(&mut old, &mut cursor, |node| matches!(node, Node::Comment { .. }))
            }
        };

        let node = match (matched, wanted) {
            (Some(Node::Element(mut live_el)), Node::Element(target_el))
                if live_el.tag == target_el.tag =>
            {
                reconcile_element(&mut live_el, target_el, focused, stats);
                stats.reused += 1;
                Node::Element(live_el)
            }
            (Some(Node::Element(_)), _) => {
                stats.replaced += 1;
                wanted.clone()
            }
            (Some(Node::Text { content }), Node::Text { content: wanted_text }) => {
                stats.reused += 1;
                if content != *wanted_text {
                    stats.text_updated += 1;
                }
                Node::text(wanted_text.clone())
            }
            (Some(Node::Comment { .. }), Node::Comment { content }) => {
                stats.reused += 1;
                Node::comment(content.clone())
            }
            (Some(_), _) => {
                stats.replaced += 1;
                wanted.clone()
            }
            (None, _) => {
                stats.inserted += 1;
                wanted.clone()
            }
        };
        result.push(node);
    }

    stats.removed += old.iter().filter(|node| node.is_some()).count();
    live.children = result;
}

/// Take the first remaining unkeyed node at or after `cursor` that fits
fn take_unkeyed(
    old: &mut [Option<Node>],
    cursor: &mut usize,
    fits: impl Fn(&Node) -> bool,
) -> Option<Node> {
    let found = (*cursor..old.len()).find(|&i| old[i].as_ref().is_some_and(&fits))?;
    *cursor = found + 1;
    old[found].take()
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
    fn test_identical_trees_are_noop() {
        let mut live = body(r#"<p data-editor-id="a">x</p><p data-editor-id="b">y</p>"#);
        let target = live.clone();
        let stats = reconcile(&mut live, &target, None);
        assert!(stats.is_noop());
        assert_eq!(stats.reused, 4);
    }

    #[test]
    fn test_attribute_and_text_patch() {
        let mut live = body(r#"<p data-editor-id="a" class="x">old</p>"#);
        let target = body(r#"<p data-editor-id="a" style="font-weight: bold;">new</p>"#);
        let stats = reconcile(&mut live, &target, None);
        assert_eq!(live.inner_html(), target.inner_html());
        assert_eq!(stats.attributes_changed, 2);
        assert_eq!(stats.text_updated, 1);
        assert_eq!(stats.replaced, 0);
    }

    #[test]
    fn test_keyed_reorder_reuses_nodes() {
        let mut live = body(r#"<p data-editor-id="a">1</p><p data-editor-id="b">2</p><p data-editor-id="c">3</p>"#);
        let target = body(r#"<p data-editor-id="c">3</p><p data-editor-id="a">1</p>"#);
        let stats = reconcile(&mut live, &target, None);
        assert_eq!(live.inner_html(), target.inner_html());
        assert_eq!(stats.removed, 1);
        assert_eq!(stats.inserted, 0);
    }

    #[test]
    fn test_tag_change_under_same_identity_replaces() {
        let mut live = body(r#"<p data-editor-id="a">1</p>"#);
        let target = body(r#"<h1 data-editor-id="a">1</h1>"#);
        let stats = reconcile(&mut live, &target, None);
        assert_eq!(stats.replaced, 1);
        assert_eq!(live.inner_html(), target.inner_html());
    }

    #[test]
    fn test_root_tag_mismatch_replaces_root() {
        let mut live = Element::new("div").with_text("x");
        let target = Element::new("section").with_text("y");
        let stats = reconcile(&mut live, &target, None);
        assert_eq!(stats.replaced, 1);
        assert_eq!(live, target);
    }

    #[test]
    fn test_focused_input_keeps_live_value() {
        let mut live = body(r#"<input data-editor-id="in" value="saved">"#);
        live.find_mut("in").unwrap().value = Some("typing".to_string());
        let target = body(r#"<input data-editor-id="in" value="other">"#);

        reconcile(&mut live, &target, Some("in"));
        assert_eq!(live.find("in").unwrap().current_value(), "typing");
    }

    #[test]
    fn test_unfocused_input_takes_target_value() {
        let mut live = body(r#"<input data-editor-id="in" value="saved">"#);
        let mut target = live.clone();
        target.find_mut("in").unwrap().value = Some("restored".to_string());
        live.find_mut("in").unwrap().value = Some("typing".to_string());

        reconcile(&mut live, &target, None);
        assert_eq!(live.find("in").unwrap().current_value(), "restored");
    }

    #[test]
    fn test_unfocused_input_falls_back_to_serialized_value() {
        let mut live = body(r#"<input data-editor-id="in" value="saved">"#);
        let target = live.clone();
        live.find_mut("in").unwrap().value = Some("typing".to_string());

        reconcile(&mut live, &target, None);
        let input = live.find("in").unwrap();
        assert_eq!(input.value, None);
        assert_eq!(input.current_value(), "saved");
    }

    #[test]
    fn test_focused_textarea_survives_root_replacement() {
        let mut live = Element::new("div")
            .with_child(Element::new("textarea").with_identity("t").with_text("a"));
        live.find_mut("t").unwrap().value = Some("draft".to_string());
        let target = Element::new("section")
            .with_child(Element::new("textarea").with_identity("t").with_text("b"));

        reconcile(&mut live, &target, Some("t"));
        assert_eq!(live.tag, "section");
        assert_eq!(live.find("t").unwrap().current_value(), "draft");
    }
}
