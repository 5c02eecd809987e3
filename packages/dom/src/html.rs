//! # HTML Parsing and Serialization
//!
//! A lenient byte-level scanner that turns markup into [`Node`] trees and a
//! deterministic serializer that turns them back into markup.
//!
//! ## Parsing rules
//!
//! - Never fails: malformed input degrades to text or is skipped
//! - Void elements (`br`, `img`, `input`, ...) never take children
//! - Raw-text elements (`script`, `style`, `textarea`, `title`) read verbatim
//!   up to their matching end tag
//! - An open `p` closes when a block-level element starts; an open `li`
//!   closes when a sibling `li` starts
//! - Unmatched end tags are ignored; elements still open at the end of input
//!   are closed implicitly
//! - Doctype declarations and processing instructions are dropped
//!
//! ## Serialization
//!
//! Attribute order is preserved, text and attribute values are escaped, and
//! `script`/`style` contents are written verbatim.

use crate::document::Document;
use crate::node::{Element, Node};

const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "textarea", "title"];

/// Elements whose start tag implicitly closes an open `p`
const CLOSES_PARAGRAPH: &[&str] = &[
    "address", "article", "aside", "blockquote", "div", "dl", "fieldset", "footer", "form",
    "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "main", "nav", "ol", "p", "pre",
    "section", "table", "ul",
];

/// Parse a markup fragment into a list of top-level nodes
pub fn parse_fragment(markup: &str) -> Vec<Node> {
    TreeBuilder::new(markup).build()
}

/// Parse markup into a document with separate head and body
///
/// Markup without a `body` element is treated as body content.
pub fn parse_document(markup: &str) -> Document {
    let nodes = parse_fragment(markup);

    let mut html_attributes = Vec::new();
    let mut top_level = Vec::new();
    for node in nodes {
        match node {
            Node::Element(el) if el.tag == "html" => {
                html_attributes = el.attributes;
                top_level.extend(el.children);
            }
            other => top_level.push(other),
        }
    }

    let mut head = Vec::new();
    let mut body: Option<Element> = None;
    let mut loose = Vec::new();
    for node in top_level {
        match node {
            Node::Element(el) if el.tag == "head" => head.extend(el.children),
            Node::Element(el) if el.tag == "body" && body.is_none() => body = Some(el),
            other if other.is_blank() && !matches!(other, Node::Comment { .. }) => {}
            other => loose.push(other),
        }
    }

    let body = match body {
        Some(mut body) => {
            body.children.splice(0..0, loose);
            body
        }
        None => {
            let mut body = Element::new("body");
            body.children = loose;
            body
        }
    };

    Document::new(html_attributes, head, body)
}

// ----------------------------------------------------------------------
// Tree building
// ----------------------------------------------------------------------

struct TreeBuilder<'a> {
    input: &'a str,
    bytes: &'a [u8],
    idx: usize,
    /// Open elements; index 0 is a synthetic container
    stack: Vec<Element>,
}

impl<'a> TreeBuilder<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            bytes: input.as_bytes(),
            idx: 0,
            stack: vec![Element::new("#fragment")],
        }
    }

    fn build(mut self) -> Vec<Node> {
        while self.idx < self.bytes.len() {
            if self.bytes[self.idx] != b'<' {
                let next = find_byte(self.bytes, self.idx, b'<').unwrap_or(self.bytes.len());
                let text = &self.input[self.idx..next];
                self.push_text(&decode_entities(text));
                self.idx = next;
                continue;
            }

            if starts_with(self.bytes, self.idx, b"<!--") {
                let (content, next) = read_comment(self.input, self.idx);
                self.append(Node::comment(content));
                self.idx = next;
                continue;
            }

            if starts_with(self.bytes, self.idx, b"<!") || starts_with(self.bytes, self.idx, b"<?")
            {
                self.idx = skip_to_gt(self.bytes, self.idx.saturating_add(2));
                continue;
            }

            if starts_with(self.bytes, self.idx, b"</") {
                match parse_end_tag(self.bytes, self.idx) {
                    Some((name, next)) => {
                        self.close(&name);
                        self.idx = next;
                    }
                    None => {
                        self.push_text("<");
                        self.idx += 1;
                    }
                }
                continue;
            }

            match parse_start_tag(self.input, self.idx) {
                Some((tag, next)) => {
                    self.idx = next;
                    self.open(tag);
                }
                None => {
                    self.push_text("<");
                    self.idx += 1;
                }
            }
        }

        while self.stack.len() > 1 {
            self.pop();
        }
        self.stack.pop().map(|root| root.children).unwrap_or_default()
    }

    fn open(&mut self, tag: StartTag) {
        let name = tag.name.as_str();

        if CLOSES_PARAGRAPH.contains(&name) && self.is_open("p") {
            self.close("p");
        }
        if name == "li" {
            self.close_list_item();
        }

        let mut element = Element::new(tag.name.clone());
        element.attributes = tag.attributes;

        if element.is_void() || tag.self_closing {
            self.append(Node::Element(element));
            return;
        }

        if RAW_TEXT_ELEMENTS.contains(&name) {
            let (content, next) = read_raw_text(self.input, self.idx, name);
            if !content.is_empty() {
                let content = if matches!(name, "textarea" | "title") {
                    decode_entities(content)
                } else {
                    content.to_string()
                };
                element.children.push(Node::text(content));
            }
            self.idx = next;
            self.append(Node::Element(element));
            return;
        }

        self.stack.push(element);
    }

    /// Close an open `li` unless a nested list sits between it and the top
    fn close_list_item(&mut self) {
        for i in (1..self.stack.len()).rev() {
            match self.stack[i].tag.as_str() {
                "li" => {
                    while self.stack.len() > i {
                        self.pop();
                    }
                    return;
                }
                "ul" | "ol" => return,
                _ => {}
            }
        }
    }

    fn is_open(&self, name: &str) -> bool {
        self.stack.iter().skip(1).any(|el| el.tag == name)
    }

    /// Close the nearest open element named `name`; unmatched names are ignored
    fn close(&mut self, name: &str) {
        let Some(pos) = self.stack.iter().skip(1).rposition(|el| el.tag == name) else {
            return;
        };
        let target = pos + 1;
        while self.stack.len() > target {
            self.pop();
        }
    }

    fn pop(&mut self) {
        if self.stack.len() <= 1 {
            return;
        }
        if let Some(el) = self.stack.pop() {
            self.append(Node::Element(el));
        }
    }

    fn append(&mut self, node: Node) {
        if let Some(top) = self.stack.last_mut() {
            top.children.push(node);
        }
    }

    fn push_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let Some(top) = self.stack.last_mut() else {
            return;
        };
        if let Some(Node::Text { content }) = top.children.last_mut() {
            content.push_str(text);
        } else {
            top.children.push(Node::text(text));
        }
    }
}

// ----------------------------------------------------------------------
// Tag scanning
// ----------------------------------------------------------------------

struct StartTag {
    name: String,
    attributes: Vec<(String, String)>,
    self_closing: bool,
}

fn parse_start_tag(input: &str, start: usize) -> Option<(StartTag, usize)> {
    let bytes = input.as_bytes();
    let mut idx = start + 1;
    if idx >= bytes.len() || !bytes[idx].is_ascii_alphabetic() {
        return None;
    }
    let name_start = idx;
    while idx < bytes.len() && is_tag_name_char(bytes[idx]) {
        idx += 1;
    }
    let name = input[name_start..idx].to_ascii_lowercase();

    let mut attributes: Vec<(String, String)> = Vec::new();
    let mut self_closing = false;
    loop {
        idx = skip_spaces(bytes, idx);
        if idx >= bytes.len() {
            return Some((StartTag { name, attributes, self_closing }, idx));
        }
        match bytes[idx] {
            b'>' => {
                return Some((StartTag { name, attributes, self_closing }, idx + 1));
            }
            b'/' => {
                self_closing = true;
                idx += 1;
                continue;
            }
            _ => {}
        }
        self_closing = false;

        let attr_start = idx;
        while idx < bytes.len()
            && !bytes[idx].is_ascii_whitespace()
            && !matches!(bytes[idx], b'=' | b'>' | b'/')
        {
            idx += 1;
        }
        if idx == attr_start {
            // stray '=' or similar
            idx += 1;
            continue;
        }
        let attr_name = input[attr_start..idx].to_ascii_lowercase();

        idx = skip_spaces(bytes, idx);
        let mut value = String::new();
        if idx < bytes.len() && bytes[idx] == b'=' {
            idx = skip_spaces(bytes, idx + 1);
            if idx < bytes.len() && matches!(bytes[idx], b'"' | b'\'') {
                let quote = bytes[idx];
                let value_start = idx + 1;
                let value_end = find_byte(bytes, value_start, quote).unwrap_or(bytes.len());
                value = decode_entities(&input[value_start..value_end]);
                idx = (value_end + 1).min(bytes.len());
            } else {
                let value_start = idx;
                while idx < bytes.len() && !bytes[idx].is_ascii_whitespace() && bytes[idx] != b'>'
                {
                    idx += 1;
                }
                value = decode_entities(&input[value_start..idx]);
            }
        }

        if !attributes.iter().any(|(existing, _)| *existing == attr_name) {
            attributes.push((attr_name, value));
        }
    }
}

fn parse_end_tag(bytes: &[u8], start: usize) -> Option<(String, usize)> {
    let mut idx = start + 2;
    if idx >= bytes.len() || !bytes[idx].is_ascii_alphabetic() {
        return None;
    }
    let name_start = idx;
    while idx < bytes.len() && is_tag_name_char(bytes[idx]) {
        idx += 1;
    }
    let name = String::from_utf8_lossy(&bytes[name_start..idx]).to_ascii_lowercase();
    Some((name, skip_to_gt(bytes, idx)))
}

fn read_comment(input: &str, start: usize) -> (String, usize) {
    let bytes = input.as_bytes();
    let content_start = start + 4;
    match find_subslice(bytes, content_start, b"-->") {
        Some(end) => (input[content_start..end].to_string(), end + 3),
        None => (input[content_start.min(bytes.len())..].to_string(), bytes.len()),
    }
}

fn read_raw_text<'a>(input: &'a str, start: usize, name: &str) -> (&'a str, usize) {
    let bytes = input.as_bytes();
    let mut search = start;
    while let Some(pos) = find_subslice(bytes, search, b"</") {
        let name_start = pos + 2;
        if starts_with_ignore_ascii_case(bytes, name_start, name.as_bytes())
            && tag_name_boundary(bytes, name_start + name.len())
        {
            return (&input[start..pos], skip_to_gt(bytes, name_start + name.len()));
        }
        search = pos + 2;
    }
    (&input[start..], bytes.len())
}

// ----------------------------------------------------------------------
// Entities
// ----------------------------------------------------------------------

fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let decoded = rest
            .find(';')
            .filter(|semi| *semi <= 10)
            .and_then(|semi| decode_entity(&rest[1..semi]).map(|c| (c, semi)));
        match decoded {
            Some((c, semi)) => {
                out.push(c);
                rest = &rest[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => {
            let code = if let Some(hex) = name.strip_prefix("#x").or_else(|| name.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok()?
            } else {
                name.strip_prefix('#')?.parse::<u32>().ok()?
            };
            char::from_u32(code)
        }
    }
}

fn escape_text(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(c),
        }
    }
}

fn escape_attr(value: &str, out: &mut String) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(c),
        }
    }
}

// ----------------------------------------------------------------------
// Serialization
// ----------------------------------------------------------------------

impl Element {
    pub fn outer_html(&self) -> String {
        let mut out = String::new();
        write_element(self, &mut out);
        out
    }

    pub fn inner_html(&self) -> String {
        let mut out = String::new();
        write_children(self, &mut out);
        out
    }

    /// Replace children with the parsed markup
    pub fn set_inner_html(&mut self, markup: &str) {
        self.children = parse_fragment(markup);
    }
}

impl Node {
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        write_node(self, false, &mut out);
        out
    }
}

impl Document {
    /// Serialize as an `<html>` element holding head and body
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        write_start_tag("html", &self.html_attributes, &mut out);
        out.push_str("<head>");
        for node in &self.head {
            write_node(node, false, &mut out);
        }
        out.push_str("</head>");
        write_element(&self.body, &mut out);
        out.push_str("</html>");
        out
    }
}

/// Serialize a list of sibling nodes
pub fn nodes_to_html(nodes: &[Node]) -> String {
    let mut out = String::new();
    for node in nodes {
        write_node(node, false, &mut out);
    }
    out
}

fn write_node(node: &Node, raw: bool, out: &mut String) {
    match node {
        Node::Element(el) => write_element(el, out),
        Node::Text { content } if raw => out.push_str(content),
        Node::Text { content } => escape_text(content, out),
        Node::Comment { content } => {
            out.push_str("<!--");
            out.push_str(content);
            out.push_str("-->");
        }
    }
}

fn write_start_tag(tag: &str, attributes: &[(String, String)], out: &mut String) {
    out.push('<');
    out.push_str(tag);
    for (name, value) in attributes {
        out.push(' ');
        out.push_str(name);
        out.push_str("=\"");
        escape_attr(value, out);
        out.push('"');
    }
    out.push('>');
}

fn write_element(el: &Element, out: &mut String) {
    write_start_tag(&el.tag, &el.attributes, out);
    if el.is_void() {
        return;
    }
    write_children(el, out);
    out.push_str("</");
    out.push_str(&el.tag);
    out.push('>');
}

fn write_children(el: &Element, out: &mut String) {
    let raw = matches!(el.tag.as_str(), "script" | "style");
    for child in &el.children {
        write_node(child, raw, out);
    }
}

// ----------------------------------------------------------------------
// Byte helpers
// ----------------------------------------------------------------------

fn skip_to_gt(bytes: &[u8], mut idx: usize) -> usize {
    while idx < bytes.len() {
        if bytes[idx] == b'>' {
            return idx + 1;
        }
        idx += 1;
    }
    bytes.len()
}

fn tag_name_boundary(bytes: &[u8], idx: usize) -> bool {
    idx >= bytes.len() || bytes[idx].is_ascii_whitespace() || matches!(bytes[idx], b'>' | b'/')
}

fn skip_spaces(bytes: &[u8], mut idx: usize) -> usize {
    while idx < bytes.len() && bytes[idx].is_ascii_whitespace() {
        idx += 1;
    }
    idx
}

fn is_tag_name_char(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b':')
}

fn starts_with(bytes: &[u8], idx: usize, pattern: &[u8]) -> bool {
    bytes.get(idx..idx + pattern.len()) == Some(pattern)
}

fn starts_with_ignore_ascii_case(bytes: &[u8], idx: usize, pattern: &[u8]) -> bool {
    bytes
        .get(idx..idx + pattern.len())
        .map(|slice| slice.eq_ignore_ascii_case(pattern))
        .unwrap_or(false)
}

fn find_subslice(bytes: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    if from >= bytes.len() {
        return None;
    }
    bytes[from..]
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|pos| pos + from)
}

fn find_byte(bytes: &[u8], from: usize, byte: u8) -> Option<usize> {
    bytes
        .get(from..)?
        .iter()
        .position(|b| *b == byte)
        .map(|pos| pos + from)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first_element(markup: &str) -> Element {
        parse_fragment(markup)
            .into_iter()
            .find_map(|n| match n {
                Node::Element(el) => Some(el),
                _ => None,
            })
            .expect("no element parsed")
    }

    #[test]
    fn test_parse_nested_elements() {
        let el = first_element(r#"<div class="page" data-x=1><p>Hi <b>there</b></p></div>"#);
        assert_eq!(el.tag, "div");
        assert_eq!(el.attr("class"), Some("page"));
        assert_eq!(el.attr("data-x"), Some("1"));
        assert_eq!(el.text_content(), "Hi there");
        assert_eq!(
            el.outer_html(),
            r#"<div class="page" data-x="1"><p>Hi <b>there</b></p></div>"#
        );
    }

    #[test]
    fn test_void_and_boolean_attributes() {
        let el = first_element("<p>a<br>b<input disabled value='x'/></p>");
        assert_eq!(el.children.len(), 4);
        assert_eq!(el.outer_html(), r#"<p>a<br>b<input disabled="" value="x"></p>"#);
    }

    #[test]
    fn test_implied_paragraph_and_list_item_ends() {
        let nodes = parse_fragment("<p>one<p>two<div>three</div>");
        let tags: Vec<&str> = nodes
            .iter()
            .filter_map(Node::as_element)
            .map(|e| e.tag.as_str())
            .collect();
        assert_eq!(tags, vec!["p", "p", "div"]);

        let list = first_element("<ul><li>a<li>b</ul>");
        assert_eq!(list.element_children().count(), 2);
    }

    #[test]
    fn test_unmatched_end_tag_is_ignored() {
        let el = first_element("<div>a</span>b</div>");
        assert_eq!(el.outer_html(), "<div>ab</div>");
    }

    #[test]
    fn test_raw_text_elements() {
        let el = first_element("<div><style>p > a { color: red }</style><script>if (a < b) {}</script></div>");
        assert_eq!(
            el.outer_html(),
            "<div><style>p > a { color: red }</style><script>if (a < b) {}</script></div>"
        );
    }

    #[test]
    fn test_entities_round_trip() {
        let el = first_element("<p title=\"a &quot;b&quot;\">x &amp; y &lt; z&nbsp;&#1633;</p>");
        assert_eq!(el.attr("title"), Some("a \"b\""));
        assert_eq!(el.text_content(), "x & y < z\u{a0}\u{661}");
        assert_eq!(
            el.outer_html(),
            "<p title=\"a &quot;b&quot;\">x &amp; y &lt; z&nbsp;\u{661}</p>"
        );
    }

    #[test]
    fn test_comments_are_kept() {
        let nodes = parse_fragment("<!-- note --><p>x</p>");
        assert_eq!(nodes[0], Node::comment(" note "));
        assert_eq!(nodes_to_html(&nodes), "<!-- note --><p>x</p>");
    }

    #[test]
    fn test_parse_document_splits_head_and_body() {
        let doc = parse_document(
            "<!DOCTYPE html>\n<html lang=\"fa\"><head><title>T</title></head>\n<body class=\"x\"><p>a</p></body></html>",
        );
        assert_eq!(doc.html_attributes, vec![("lang".to_string(), "fa".to_string())]);
        assert_eq!(doc.head.len(), 1);
        assert_eq!(doc.body.attr("class"), Some("x"));
        assert_eq!(doc.body.inner_html(), "<p>a</p>");
    }

    #[test]
    fn test_parse_document_without_body() {
        let doc = parse_document("<div>page</div>");
        assert_eq!(doc.body.inner_html(), "<div>page</div>");
        assert!(doc.head.is_empty());
    }

    #[test]
    fn test_unicode_text_survives() {
        let el = first_element("<p>صفحه ۱</p>");
        assert_eq!(el.text_content(), "صفحه ۱");
    }
}
