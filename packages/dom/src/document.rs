use crate::node::{Element, Node, NodePath};
use serde::{Deserialize, Serialize};

/// Scroll offset of the rendering surface
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScrollPosition {
    pub x: f64,
    pub y: f64,
}

/// A whole document: `<html>` attributes, head nodes and the body container
///
/// The body is the root container that editing operates on; it is never
/// tagged with an identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub html_attributes: Vec<(String, String)>,

    #[serde(default)]
    pub head: Vec<Node>,

    pub body: Element,

    /// Identity of the element holding input focus
    #[serde(default)]
    pub focused: Option<String>,

    #[serde(default)]
    pub scroll: ScrollPosition,
}

impl Document {
    pub fn new(html_attributes: Vec<(String, String)>, head: Vec<Node>, body: Element) -> Self {
        Self {
            html_attributes,
            head,
            body,
            focused: None,
            scroll: ScrollPosition::default(),
        }
    }

    /// Empty document with an empty body
    pub fn empty() -> Self {
        Self::new(Vec::new(), Vec::new(), Element::new("body"))
    }

    pub fn find(&self, identity: &str) -> Option<&Element> {
        self.body.find(identity)
    }

    pub fn find_mut(&mut self, identity: &str) -> Option<&mut Element> {
        self.body.find_mut(identity)
    }

    pub fn find_path(&self, identity: &str) -> Option<NodePath> {
        self.body.find_path(identity)
    }

    pub fn focused_element(&self) -> Option<&Element> {
        self.focused.as_deref().and_then(|id| self.body.find(id))
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::html::parse_document;

    #[test]
    fn test_to_html_round_trip() {
        let source = r#"<html lang="en"><head><title>Doc</title></head><body><div class="page">x</div></body></html>"#;
        let doc = parse_document(source);
        assert_eq!(doc.to_html(), source);
        assert_eq!(parse_document(&doc.to_html()), doc);
    }

    #[test]
    fn test_focused_element_lookup() {
        let mut doc = parse_document(r#"<input data-editor-id="a">"#);
        assert!(doc.focused_element().is_none());
        doc.focused = Some("a".to_string());
        assert_eq!(doc.focused_element().map(|e| e.tag.as_str()), Some("input"));
    }

    #[test]
    fn test_json_shape() {
        let doc = parse_document("<p>x</p>");
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["body"]["children"][0]["type"], "Element");
        assert_eq!(json["body"]["children"][0]["tag"], "p");
    }
}
