//! # Document Nodes
//!
//! Owned, ordered tree of elements, text and comments.
//!
//! Nodes are addressed two ways:
//! - **By identity**: the `data-editor-id` attribute, stable across patches
//! - **By path**: child indices from a root element, valid until the next
//!   structural mutation
//!
//! Lookups that miss return `None` rather than failing; callers treat a
//! missing node as a soft no-op.

use crate::style::Style;
use serde::{Deserialize, Serialize};

/// Attribute carrying a node's editor identity
pub const IDENTITY_ATTR: &str = "data-editor-id";

/// Child-index path from a root element to a descendant
pub type NodePath = Vec<usize>;

/// Elements that never have children or a closing tag
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

/// Document tree node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Node {
    /// HTML element
    Element(Element),

    /// Text node
    Text { content: String },

    /// Comment node
    Comment { content: String },
}

impl Node {
    pub fn text(content: impl Into<String>) -> Self {
        Node::Text {
            content: content.into(),
        }
    }

    pub fn comment(content: impl Into<String>) -> Self {
        Node::Comment {
            content: content.into(),
        }
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn as_element_mut(&mut self) -> Option<&mut Element> {
        match self {
            Node::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn is_element(&self) -> bool {
        matches!(self, Node::Element(_))
    }

    /// Text content of this node and all descendants
    pub fn text_content(&self) -> String {
        match self {
            Node::Element(el) => el.text_content(),
            Node::Text { content } => content.clone(),
            Node::Comment { .. } => String::new(),
        }
    }

    /// True for text nodes containing only whitespace, and for comments
    pub fn is_blank(&self) -> bool {
        match self {
            Node::Element(_) => false,
            Node::Text { content } => content.trim().is_empty(),
            Node::Comment { .. } => true,
        }
    }
}

impl From<Element> for Node {
    fn from(el: Element) -> Self {
        Node::Element(el)
    }
}

/// HTML element with ordered attributes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub tag: String,

    /// Attributes in source order
    #[serde(default)]
    pub attributes: Vec<(String, String)>,

    #[serde(default)]
    pub children: Vec<Node>,

    /// Live form-control value that has not been written back to markup
    #[serde(skip)]
    pub value: Option<String>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into().to_ascii_lowercase(),
            attributes: Vec::new(),
            children: Vec::new(),
            value: None,
        }
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(name, value);
        self
    }

    pub fn with_child(mut self, child: impl Into<Node>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn with_text(mut self, content: impl Into<String>) -> Self {
        self.children.push(Node::text(content));
        self
    }

    pub fn with_identity(mut self, identity: impl Into<String>) -> Self {
        self.set_identity(identity);
        self
    }

    pub fn is_void(&self) -> bool {
        VOID_ELEMENTS.contains(&self.tag.as_str())
    }

    // ------------------------------------------------------------------
    // Attributes
    // ------------------------------------------------------------------

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attributes.iter().any(|(key, _)| key == name)
    }

    /// Set an attribute, keeping its position if it already exists
    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(key, _)| *key == name) {
            Some((_, existing)) => *existing = value,
            None => self.attributes.push((name, value)),
        }
    }

    pub fn remove_attr(&mut self, name: &str) -> Option<String> {
        let pos = self.attributes.iter().position(|(key, _)| key == name)?;
        Some(self.attributes.remove(pos).1)
    }

    pub fn identity(&self) -> Option<&str> {
        self.attr(IDENTITY_ATTR).filter(|id| !id.is_empty())
    }

    pub fn set_identity(&mut self, identity: impl Into<String>) {
        self.set_attr(IDENTITY_ATTR, identity);
    }

    // ------------------------------------------------------------------
    // Classes
    // ------------------------------------------------------------------

    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.attr("class").unwrap_or("").split_whitespace()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes().any(|c| c == class)
    }

    pub fn add_class(&mut self, class: &str) {
        if self.has_class(class) {
            return;
        }
        let mut classes: Vec<&str> = self.classes().collect();
        classes.push(class);
        let joined = classes.join(" ");
        self.set_attr("class", joined);
    }

    /// Remove a class; drops the attribute once no classes remain
    pub fn remove_class(&mut self, class: &str) -> bool {
        if !self.has_class(class) {
            return false;
        }
        let remaining: Vec<&str> = self.classes().filter(|c| *c != class).collect();
        if remaining.is_empty() {
            self.remove_attr("class");
        } else {
            let joined = remaining.join(" ");
            self.set_attr("class", joined);
        }
        true
    }

    // ------------------------------------------------------------------
    // Inline style
    // ------------------------------------------------------------------

    pub fn style(&self) -> Style {
        Style::parse(self.attr("style").unwrap_or(""))
    }

    /// Write inline style back; an empty style removes the attribute
    pub fn set_style(&mut self, style: &Style) {
        if style.is_empty() {
            self.remove_attr("style");
        } else {
            self.set_attr("style", style.to_string());
        }
    }

    pub fn update_style(&mut self, f: impl FnOnce(&mut Style)) {
        let mut style = self.style();
        f(&mut style);
        self.set_style(&style);
    }

    // ------------------------------------------------------------------
    // Form state
    // ------------------------------------------------------------------

    pub fn is_form_control(&self) -> bool {
        matches!(self.tag.as_str(), "input" | "textarea")
    }

    /// Effective value of a form control: live state first, markup second
    pub fn current_value(&self) -> String {
        if let Some(value) = &self.value {
            return value.clone();
        }
        match self.tag.as_str() {
            "textarea" => self.text_content(),
            _ => self.attr("value").unwrap_or("").to_string(),
        }
    }

    // ------------------------------------------------------------------
    // Content
    // ------------------------------------------------------------------

    pub fn text_content(&self) -> String {
        let mut out = String::new();
        collect_text(self, &mut out);
        out
    }

    /// Replace all children with a single text node
    pub fn set_text_content(&mut self, text: impl Into<String>) {
        let text = text.into();
        self.children.clear();
        if !text.is_empty() {
            self.children.push(Node::Text { content: text });
        }
    }

    pub fn element_children(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(Node::as_element)
    }

    // ------------------------------------------------------------------
    // Path addressing
    // ------------------------------------------------------------------

    /// Element at `path`; the empty path is `self`
    pub fn element_at(&self, path: &[usize]) -> Option<&Element> {
        let mut current = self;
        for &index in path {
            current = current.children.get(index)?.as_element()?;
        }
        Some(current)
    }

    pub fn element_at_mut(&mut self, path: &[usize]) -> Option<&mut Element> {
        let mut current = self;
        for &index in path {
            current = current.children.get_mut(index)?.as_element_mut()?;
        }
        Some(current)
    }

    /// Node at a non-empty `path`
    pub fn node_at(&self, path: &[usize]) -> Option<&Node> {
        let (last, parent) = path.split_last()?;
        self.element_at(parent)?.children.get(*last)
    }

    pub fn node_at_mut(&mut self, path: &[usize]) -> Option<&mut Node> {
        let (last, parent) = path.split_last()?;
        self.element_at_mut(parent)?.children.get_mut(*last)
    }

    /// Detach and return the node at `path`
    pub fn remove_at(&mut self, path: &[usize]) -> Option<Node> {
        let (last, parent) = path.split_last()?;
        let parent = self.element_at_mut(parent)?;
        if *last >= parent.children.len() {
            return None;
        }
        Some(parent.children.remove(*last))
    }

    /// Insert nodes under the element at `parent`, clamping `index`
    pub fn insert_at(&mut self, parent: &[usize], index: usize, nodes: Vec<Node>) -> bool {
        let Some(parent) = self.element_at_mut(parent) else {
            return false;
        };
        let index = index.min(parent.children.len());
        parent.children.splice(index..index, nodes);
        true
    }

    /// Replace the node at `path` with zero or more nodes
    pub fn replace_at(&mut self, path: &[usize], nodes: Vec<Node>) -> bool {
        let Some((last, parent)) = path.split_last() else {
            return false;
        };
        let Some(parent) = self.element_at_mut(parent) else {
            return false;
        };
        if *last >= parent.children.len() {
            return false;
        }
        parent.children.splice(*last..*last + 1, nodes);
        true
    }

    // ------------------------------------------------------------------
    // Identity lookups
    // ------------------------------------------------------------------

    /// Path of the element carrying `identity` (`[]` when it is `self`)
    pub fn find_path(&self, identity: &str) -> Option<NodePath> {
        let mut path = Vec::new();
        if find_path_in(self, identity, &mut path) {
            Some(path)
        } else {
            None
        }
    }

    pub fn find(&self, identity: &str) -> Option<&Element> {
        if self.identity() == Some(identity) {
            return Some(self);
        }
        self.element_children().find_map(|child| child.find(identity))
    }

    pub fn find_mut(&mut self, identity: &str) -> Option<&mut Element> {
        if self.identity() == Some(identity) {
            return Some(self);
        }
        self.children
            .iter_mut()
            .filter_map(Node::as_element_mut)
            .find_map(|child| child.find_mut(identity))
    }

    pub fn contains_identity(&self, identity: &str) -> bool {
        self.find(identity).is_some()
    }

    // ------------------------------------------------------------------
    // Traversal
    // ------------------------------------------------------------------

    /// Visit every descendant element in document order with its path
    pub fn for_each_descendant<'a>(&'a self, mut f: impl FnMut(&'a Element, &[usize])) {
        let mut path = Vec::new();
        walk(self, &mut path, &mut f);
    }

    /// Visit every descendant element mutably in document order
    pub fn for_each_descendant_mut(&mut self, mut f: impl FnMut(&mut Element)) {
        walk_mut(self, &mut f);
    }

    /// Paths of all descendant elements in document order
    pub fn descendant_paths(&self) -> Vec<NodePath> {
        let mut paths = Vec::new();
        self.for_each_descendant(|_, path| paths.push(path.to_vec()));
        paths
    }

    /// Identities of this element and its descendants, in document order
    pub fn identities(&self) -> Vec<String> {
        let mut ids = Vec::new();
        if let Some(id) = self.identity() {
            ids.push(id.to_string());
        }
        self.for_each_descendant(|el, _| {
            if let Some(id) = el.identity() {
                ids.push(id.to_string());
            }
        });
        ids
    }
}

fn collect_text(el: &Element, out: &mut String) {
    for child in &el.children {
        match child {
            Node::Element(child) => collect_text(child, out),
            Node::Text { content } => out.push_str(content),
            Node::Comment { .. } => {}
        }
    }
}

fn find_path_in(el: &Element, identity: &str, path: &mut Vec<usize>) -> bool {
    if el.identity() == Some(identity) {
        return true;
    }
    for (index, child) in el.children.iter().enumerate() {
        if let Node::Element(child) = child {
            path.push(index);
            if find_path_in(child, identity, path) {
                return true;
            }
            path.pop();
        }
    }
    false
}

fn walk<'a, F: FnMut(&'a Element, &[usize])>(el: &'a Element, path: &mut Vec<usize>, f: &mut F) {
    for (index, child) in el.children.iter().enumerate() {
        if let Node::Element(child) = child {
            path.push(index);
            f(child, path);
            walk(child, path, f);
            path.pop();
        }
    }
}

fn walk_mut<F: FnMut(&mut Element)>(el: &mut Element, f: &mut F) {
    for child in el.children.iter_mut() {
        if let Node::Element(child) = child {
            f(child);
            walk_mut(child, f);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Element {
        Element::new("body")
            .with_child(
                Element::new("div")
                    .with_identity("page-1")
                    .with_child(Element::new("p").with_identity("p-1").with_text("Hello"))
                    .with_child(Element::new("p").with_identity("p-2").with_text("World")),
            )
            .with_text("\n")
    }

    #[test]
    fn test_find_by_identity() {
        let body = sample();
        assert_eq!(body.find("p-2").unwrap().text_content(), "World");
        assert!(body.find("missing").is_none());
        assert_eq!(body.find_path("p-2"), Some(vec![0, 1]));
    }

    #[test]
    fn test_set_attr_keeps_position() {
        let mut el = Element::new("p").with_attr("a", "1").with_attr("b", "2");
        el.set_attr("a", "3");
        assert_eq!(el.attributes[0], ("a".to_string(), "3".to_string()));
        assert_eq!(el.attributes.len(), 2);
    }

    #[test]
    fn test_class_helpers() {
        let mut el = Element::new("p");
        el.add_class("one");
        el.add_class("two");
        el.add_class("one");
        assert_eq!(el.attr("class"), Some("one two"));
        assert!(el.remove_class("one"));
        assert!(el.remove_class("two"));
        assert!(!el.has_attr("class"));
    }

    #[test]
    fn test_remove_and_insert_at_path() {
        let mut body = sample();
        let removed = body.remove_at(&[0, 0]).unwrap();
        assert_eq!(removed.text_content(), "Hello");
        assert!(body.insert_at(&[0], 5, vec![removed]));
        assert_eq!(body.find_path("p-1"), Some(vec![0, 1]));
    }

    #[test]
    fn test_replace_at_with_many() {
        let mut body = sample();
        let replacement = vec![
            Node::from(Element::new("h1").with_text("A")),
            Node::from(Element::new("h2").with_text("B")),
        ];
        assert!(body.replace_at(&[0, 0], replacement));
        let page = body.element_at(&[0]).unwrap();
        let tags: Vec<&str> = page.element_children().map(|e| e.tag.as_str()).collect();
        assert_eq!(tags, vec!["h1", "h2", "p"]);
    }

    #[test]
    fn test_current_value_prefers_live_state() {
        let mut input = Element::new("input").with_attr("value", "saved");
        assert_eq!(input.current_value(), "saved");
        input.value = Some("typing".to_string());
        assert_eq!(input.current_value(), "typing");

        let textarea = Element::new("textarea").with_text("notes");
        assert_eq!(textarea.current_value(), "notes");
    }

    #[test]
    fn test_identities_in_document_order() {
        let body = sample();
        assert_eq!(body.identities(), vec!["page-1", "p-1", "p-2"]);
    }
}
