//! List conversion for `insertUnorderedList` / `insertOrderedList`.
//!
//! - Same list kind: dissolve into paragraphs, one per item
//! - Other list kind: rename in place, keeping the identity
//! - Anything else: wrap into a new list, one item per `p` / `br` segment

use crate::commands::LIST_PLACEHOLDER;
use crate::identity::IdentityTagger;
use crate::watch::InsertionEvent;
use folio_dom::{Element, Node};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    Unordered,
    Ordered,
}

impl ListKind {
    pub fn tag(self) -> &'static str {
        match self {
            ListKind::Unordered => "ul",
            ListKind::Ordered => "ol",
        }
    }

    fn other(self) -> ListKind {
        match self {
            ListKind::Unordered => ListKind::Ordered,
            ListKind::Ordered => ListKind::Unordered,
        }
    }
}

/// Result of a list conversion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListChange {
    pub event: InsertionEvent,
    /// Identity of the node that now stands where the target was
    pub replacement: Option<String>,
}

/// Convert the element at `path` as described in the module docs
pub fn convert_to_list(
    body: &mut Element,
    path: &[usize],
    kind: ListKind,
    tagger: &mut IdentityTagger,
) -> Option<ListChange> {
    let (index, parent) = path.split_last()?;
    let target = body.element_at(path)?;

    let (nodes, replacement) = if target.tag == kind.tag() {
        let paragraphs = dissolve(target, tagger);
        let first = paragraphs
            .first()
            .and_then(Node::as_element)
            .and_then(|p| p.identity().map(str::to_string));
        (paragraphs, first)
    } else if target.tag == kind.other().tag() {
        let list = rename(target, kind);
        let id = list.identity().map(str::to_string);
        (vec![Node::Element(list)], id)
    } else {
        let list = wrap(target, kind, tagger);
        let id = list.identity().map(str::to_string);
        (vec![Node::Element(list)], id)
    };

    let count = nodes.len();
    if !body.replace_at(path, nodes) {
        return None;
    }
    Some(ListChange {
        event: InsertionEvent::Inserted {
            parent: parent.to_vec(),
            index: *index,
            count,
        },
        replacement,
    })
}

fn dissolve(list: &Element, tagger: &mut IdentityTagger) -> Vec<Node> {
    list.element_children()
        .filter(|item| item.tag == "li")
        .map(|item| {
            let mut p = Element::new("p");
            p.children = item.children.clone();
            tagger.tag_one(&mut p);
            Node::Element(p)
        })
        .collect()
}

fn rename(list: &Element, kind: ListKind) -> Element {
    let mut renamed = Element::new(kind.tag());
    if let Some(id) = list.identity() {
        renamed.set_identity(id);
    }
    renamed.children = list.children.clone();
    renamed
}

fn wrap(target: &Element, kind: ListKind, tagger: &mut IdentityTagger) -> Element {
    let mut list = Element::new(kind.tag());
    tagger.tag_one(&mut list);

    let segments = split_segments(&target.children);
    let segments = if segments.is_empty() {
        vec![vec![Node::text(LIST_PLACEHOLDER)]]
    } else {
        segments
    };

    for segment in segments {
        let mut item = Element::new("li");
        item.children = segment;
        tagger.tag_one(&mut item);
        list.children.push(Node::Element(item));
    }
    list
}

/// Split content on paragraph and line-break boundaries, dropping empty
/// segments
fn split_segments(children: &[Node]) -> Vec<Vec<Node>> {
    let mut segments = Vec::new();
    let mut current = Vec::new();

    for child in children {
        match child {
            Node::Element(el) if el.tag == "br" => flush(&mut current, &mut segments),
            Node::Element(el) if el.tag == "p" => {
                flush(&mut current, &mut segments);
                let mut inner = el.children.clone();
                flush(&mut inner, &mut segments);
            }
            other => current.push(other.clone()),
        }
    }
    flush(&mut current, &mut segments);
    segments
}

fn flush(current: &mut Vec<Node>, segments: &mut Vec<Vec<Node>>) {
    let segment = std::mem::take(current);
    if segment.iter().any(|node| !node.is_blank()) {
        segments.push(segment);
    }
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

    fn texts(list: &Element) -> Vec<String> {
        list.element_children().map(|li| li.text_content()).collect()
    }

    #[test]
    fn test_wrap_splits_on_line_breaks() {
        let mut body = body(r#"<p data-editor-id="p">one<br>two<br><br>three</p>"#);
        let mut tagger = IdentityTagger::new();
        let change = convert_to_list(&mut body, &[0], ListKind::Unordered, &mut tagger).unwrap();

        let list = body.element_at(&[0]).unwrap();
        assert_eq!(list.tag, "ul");
        assert_eq!(texts(list), vec!["one", "two", "three"]);
        assert_eq!(change.replacement.as_deref(), list.identity());
        assert!(list.element_children().all(|li| li.identity().is_some()));
    }

    #[test]
    fn test_wrap_splits_on_paragraphs() {
        let mut body = body("<div><p>a</p><p> </p><p>b</p></div>");
        let mut tagger = IdentityTagger::new();
        convert_to_list(&mut body, &[0], ListKind::Ordered, &mut tagger).unwrap();
        assert_eq!(texts(body.element_at(&[0]).unwrap()), vec!["a", "b"]);
    }

    #[test]
    fn test_wrap_whole_content_without_markers() {
        let mut body = body("<div>plain <b>text</b></div>");
        let mut tagger = IdentityTagger::new();
        convert_to_list(&mut body, &[0], ListKind::Unordered, &mut tagger).unwrap();
        assert_eq!(
            body.element_at(&[0]).unwrap().element_children().count(),
            1
        );
    }

    #[test]
    fn test_wrap_empty_uses_placeholder() {
        let mut body = body("<p></p>");
        let mut tagger = IdentityTagger::new();
        convert_to_list(&mut body, &[0], ListKind::Unordered, &mut tagger).unwrap();
        assert_eq!(texts(body.element_at(&[0]).unwrap()), vec![LIST_PLACEHOLDER]);
    }

    #[test]
    fn test_rename_keeps_identity_and_items() {
        let mut body = body(r#"<ul data-editor-id="l" class="x"><li data-editor-id="i">a</li></ul>"#);
        let mut tagger = IdentityTagger::new();
        let change = convert_to_list(&mut body, &[0], ListKind::Ordered, &mut tagger).unwrap();
        assert_eq!(
            body.inner_html(),
            r#"<ol data-editor-id="l"><li data-editor-id="i">a</li></ol>"#
        );
        assert_eq!(change.replacement.as_deref(), Some("l"));
    }

    #[test]
    fn test_dissolve_creates_paragraphs_in_place() {
        let mut body = body(r#"<h1>t</h1><ul data-editor-id="l"><li data-editor-id="i1">a</li><li>b</li></ul><p>after</p>"#);
        let mut tagger = IdentityTagger::new();
        let change = convert_to_list(&mut body, &[1], ListKind::Unordered, &mut tagger).unwrap();

        let tags: Vec<&str> = body.element_children().map(|e| e.tag.as_str()).collect();
        assert_eq!(tags, vec!["h1", "p", "p", "p"]);
        assert_eq!(body.element_at(&[1]).unwrap().text_content(), "a");
        assert_eq!(body.element_at(&[2]).unwrap().text_content(), "b");
        assert_ne!(body.element_at(&[1]).unwrap().identity(), Some("i1"));
        assert_eq!(
            change.event,
            InsertionEvent::Inserted { parent: vec![], index: 1, count: 2 }
        );
    }

    #[test]
    fn test_missing_path_is_noop() {
        let mut body = body("<p>x</p>");
        let mut tagger = IdentityTagger::new();
        assert!(convert_to_list(&mut body, &[3], ListKind::Unordered, &mut tagger).is_none());
        assert!(convert_to_list(&mut body, &[], ListKind::Unordered, &mut tagger).is_none());
    }
}
