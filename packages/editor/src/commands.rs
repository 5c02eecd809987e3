//! # Command Executor
//!
//! Formatting and structural commands applied to the selected element.
//!
//! ## Paths
//!
//! - **Style commands** (bold, alignment, fonts, colours, ...) edit a clone of
//!   the target off-tree; the session then reconciles the live node to the
//!   clone so a focused control keeps its in-progress value.
//! - **Structural commands** (`formatBlock`, lists, `insertHTML`) mutate the
//!   live tree directly and report an insertion event.
//! - **Native commands** run through the host's [`RichTextSurface`] while
//!   inline editing, or for names this module does not know. Failures are
//!   logged and never abort the command.

use crate::errors::NativeCommandError;
use crate::identity::IdentityTagger;
use crate::watch::InsertionEvent;
use folio_dom::{parse_fragment, Element, Node, NodePath, Style};
use serde::{Deserialize, Serialize};

/// Placeholder content for empty list items
pub const LIST_PLACEHOLDER: &str = "New item";

/// Editor command, named after the native editing command it mirrors
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", content = "value", rename_all = "camelCase")]
pub enum Command {
    Bold,
    Italic,
    Underline,
    StrikeThrough,
    Superscript,
    Subscript,
    JustifyLeft,
    JustifyCenter,
    JustifyRight,
    FontSize(String),
    FontName(String),
    ForeColor(String),
    HiliteColor(String),
    FormatBlock(String),
    InsertUnorderedList,
    InsertOrderedList,
    #[serde(rename = "insertHTML")]
    InsertHtml(String),
    Native {
        name: String,
        value: Option<String>,
    },
}

impl Command {
    /// Build a command from its native name; unknown names become `Native`
    pub fn parse(name: &str, value: Option<&str>) -> Command {
        let text = || value.unwrap_or("").to_string();
        match name {
            "bold" => Command::Bold,
            "italic" => Command::Italic,
            "underline" => Command::Underline,
            "strikeThrough" => Command::StrikeThrough,
            "superscript" => Command::Superscript,
            "subscript" => Command::Subscript,
            "justifyLeft" => Command::JustifyLeft,
            "justifyCenter" => Command::JustifyCenter,
            "justifyRight" => Command::JustifyRight,
            "fontSize" => Command::FontSize(text()),
            "fontName" => Command::FontName(text()),
            "foreColor" => Command::ForeColor(text()),
            "hiliteColor" => Command::HiliteColor(text()),
            "formatBlock" => Command::FormatBlock(text()),
            "insertUnorderedList" => Command::InsertUnorderedList,
            "insertOrderedList" => Command::InsertOrderedList,
            "insertHTML" => Command::InsertHtml(text()),
            other => Command::Native {
                name: other.to_string(),
                value: value.map(str::to_string),
            },
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Command::Bold => "bold",
            Command::Italic => "italic",
            Command::Underline => "underline",
            Command::StrikeThrough => "strikeThrough",
            Command::Superscript => "superscript",
            Command::Subscript => "subscript",
            Command::JustifyLeft => "justifyLeft",
            Command::JustifyCenter => "justifyCenter",
            Command::JustifyRight => "justifyRight",
            Command::FontSize(_) => "fontSize",
            Command::FontName(_) => "fontName",
            Command::ForeColor(_) => "foreColor",
            Command::HiliteColor(_) => "hiliteColor",
            Command::FormatBlock(_) => "formatBlock",
            Command::InsertUnorderedList => "insertUnorderedList",
            Command::InsertOrderedList => "insertOrderedList",
            Command::InsertHtml(_) => "insertHTML",
            Command::Native { name, .. } => name,
        }
    }

    pub fn value(&self) -> Option<&str> {
        match self {
            Command::FontSize(v)
            | Command::FontName(v)
            | Command::ForeColor(v)
            | Command::HiliteColor(v)
            | Command::FormatBlock(v)
            | Command::InsertHtml(v) => Some(v),
            Command::Native { value, .. } => value.as_deref(),
            _ => None,
        }
    }

    /// Commands applied by editing the target's inline style
    pub fn is_style(&self) -> bool {
        matches!(
            self,
            Command::Bold
                | Command::Italic
                | Command::Underline
                | Command::StrikeThrough
                | Command::Superscript
                | Command::Subscript
                | Command::JustifyLeft
                | Command::JustifyCenter
                | Command::JustifyRight
                | Command::FontSize(_)
                | Command::FontName(_)
                | Command::ForeColor(_)
                | Command::HiliteColor(_)
        )
    }
}

/// Host mechanism for native rich-text commands
pub trait RichTextSurface {
    fn exec_command(
        &mut self,
        body: &mut Element,
        target: Option<&str>,
        command: &str,
        value: Option<&str>,
    ) -> Result<(), NativeCommandError>;
}

/// Surface used when the host provides none; rejects every command
#[derive(Debug, Default)]
pub struct DetachedSurface;

impl RichTextSurface for DetachedSurface {
    fn exec_command(
        &mut self,
        _body: &mut Element,
        _target: Option<&str>,
        _command: &str,
        _value: Option<&str>,
    ) -> Result<(), NativeCommandError> {
        Err(NativeCommandError::NoSurface)
    }
}

// ----------------------------------------------------------------------
// Style commands
// ----------------------------------------------------------------------

/// Apply a style command to `el`; returns false for non-style commands
pub fn apply_style(el: &mut Element, command: &Command) -> bool {
    if !command.is_style() {
        return false;
    }
    el.update_style(|style| match command {
        Command::Bold => toggle(style, "font-weight", "bold", "normal"),
        Command::Italic => toggle(style, "font-style", "italic", "normal"),
        Command::Underline => toggle_decoration(style, "underline"),
        Command::StrikeThrough => toggle_decoration(style, "line-through"),
        Command::Superscript => toggle_vertical(style, "super"),
        Command::Subscript => toggle_vertical(style, "sub"),
        Command::JustifyLeft => style.set("text-align", "left"),
        Command::JustifyCenter => style.set("text-align", "center"),
        Command::JustifyRight => style.set("text-align", "right"),
        Command::FontSize(size) => style.set("font-size", &pixel_size(size)),
        Command::FontName(family) => style.set("font-family", family),
        Command::ForeColor(color) => style.set("color", color),
        Command::HiliteColor(color) => style.set("background-color", color),
        _ => {}
    });
    true
}

fn toggle(style: &mut Style, property: &str, on: &str, off: &str) {
    let next = if style.get(property) == Some(on) { off } else { on };
    style.set(property, next);
}

fn toggle_decoration(style: &mut Style, token: &str) {
    let mut tokens = style.tokens("text-decoration");
    match tokens.iter().position(|t| t == token) {
        Some(pos) => {
            tokens.remove(pos);
        }
        None => tokens.push(token.to_string()),
    }
    style.set("text-decoration", &tokens.join(" "));
}

/// Superscript and subscript share `vertical-align`, so enabling one
/// replaces the other
fn toggle_vertical(style: &mut Style, position: &str) {
    if style.get("vertical-align") == Some(position) {
        style.remove("vertical-align");
        style.remove("font-size");
    } else {
        style.set("vertical-align", position);
        style.set("font-size", "smaller");
    }
}

/// Bare numbers are pixel sizes
fn pixel_size(value: &str) -> String {
    let value = value.trim();
    if !value.is_empty() && value.parse::<f64>().is_ok() {
        format!("{}px", value)
    } else {
        value.to_string()
    }
}

// ----------------------------------------------------------------------
// Structural commands
// ----------------------------------------------------------------------

/// Normalize a `formatBlock` value: `<h1>` → `h1`, empty → `p`
pub fn block_tag(value: &str) -> String {
    let tag = value
        .trim()
        .trim_start_matches('<')
        .trim_end_matches('>')
        .trim()
        .to_ascii_lowercase();
    if tag.is_empty() || !tag.chars().all(|c| c.is_ascii_alphanumeric()) {
        "p".to_string()
    } else {
        tag
    }
}

/// Replace the element at `path` with a `tag` element carrying the same
/// attributes (identity included), inline style and children
pub fn format_block(body: &mut Element, path: &[usize], tag: &str) -> Option<InsertionEvent> {
    let (index, parent) = path.split_last()?;
    let old = body.element_at(path)?;
    let mut block = Element::new(block_tag(tag));
    block.attributes = old.attributes.clone();
    block.children = old.children.clone();
    if !body.replace_at(path, vec![Node::Element(block)]) {
        return None;
    }
    Some(InsertionEvent::Inserted {
        parent: parent.to_vec(),
        index: *index,
        count: 1,
    })
}

/// Append detached nodes as children of the element at `parent`
pub fn append_nodes(body: &mut Element, parent: &[usize], nodes: Vec<Node>) -> Option<InsertionEvent> {
    let target = body.element_at_mut(parent)?;
    let index = target.children.len();
    let count = nodes.len();
    target.children.extend(nodes);
    Some(InsertionEvent::Inserted {
        parent: parent.to_vec(),
        index,
        count,
    })
}

/// Parse `markup`, give every element a fresh identity and append it under
/// the element at `parent`
pub fn insert_html(
    body: &mut Element,
    parent: &[usize],
    markup: &str,
    tagger: &mut IdentityTagger,
) -> Option<InsertionEvent> {
    body.element_at(parent)?;
    let mut nodes = parse_fragment(markup);
    tagger.retag_nodes(&mut nodes);
    append_nodes(body, parent, nodes)
}

/// `rows` × `cols` bordered table with empty cells
pub fn table_element(rows: usize, cols: usize) -> Element {
    let cell_style = "border: 1px solid #ccc; padding: 4px;";
    let mut tbody = Element::new("tbody");
    for _ in 0..rows.max(1) {
        let mut row = Element::new("tr");
        for _ in 0..cols.max(1) {
            row.children.push(Node::from(
                Element::new("td")
                    .with_attr("style", cell_style)
                    .with_text("\u{a0}"),
            ));
        }
        tbody.children.push(Node::from(row));
    }
    Element::new("table")
        .with_attr("style", "border-collapse: collapse; width: 100%;")
        .with_child(tbody)
}

pub fn image_element(src: &str, alt: &str) -> Element {
    Element::new("img")
        .with_attr("src", src)
        .with_attr("alt", alt)
        .with_attr("style", "max-width: 100%;")
}

pub fn link_element(href: &str, text: &str) -> Element {
    let label = if text.trim().is_empty() { href } else { text };
    Element::new("a").with_attr("href", href).with_text(label)
}

/// Path of the element carrying `identity`, for callers holding only an id
pub fn target_path(body: &Element, identity: &str) -> Option<NodePath> {
    body.find_path(identity).filter(|path| !path.is_empty())
}
