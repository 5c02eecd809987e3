//! # Selectors
//!
//! A small CSS selector subset used to address pages, page-number slots and
//! content-removal targets.
//!
//! ## Grammar
//!
//! ```text
//! selector  := complex ("," complex)*
//! complex   := compound ((" " | ">") compound)*
//! compound  := (tag | "*")? ("#" id | "." class | "[" attr ("=" value)? "]" | ":nth-of-type(" n ")")*
//! ```
//!
//! Queries run against an [`Element`] root and answer with [`NodePath`]s in
//! document order. The root itself is never a match, but it does count as an
//! ancestor for combinators.

use crate::node::{Element, NodePath};
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SelectorError {
    #[error("Empty selector")]
    Empty,

    #[error("Unexpected '{found}' at position {position}")]
    Unexpected { found: char, position: usize },

    #[error("Unterminated {what} starting at position {position}")]
    Unterminated { what: &'static str, position: usize },

    #[error("Unsupported pseudo-class ':{0}'")]
    UnsupportedPseudo(String),

    #[error("Invalid :nth-of-type argument '{0}'")]
    InvalidNth(String),
}

/// Comma-separated selector list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    pub groups: Vec<ComplexSelector>,
}

/// Compound selectors joined by combinators
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComplexSelector {
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    /// Relation to the previous part; ignored on the first part
    pub combinator: Combinator,
    pub compound: Compound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    Descendant,
    Child,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Compound {
    /// `None` matches any tag (`*` or omitted)
    pub tag: Option<String>,
    pub id: Option<String>,
    pub classes: Vec<String>,
    pub attributes: Vec<AttributeMatch>,
    /// 1-based position among same-tag siblings
    pub nth_of_type: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeMatch {
    pub name: String,
    /// `None` only checks presence
    pub value: Option<String>,
}

impl Selector {
    pub fn parse(text: &str) -> Result<Selector, SelectorError> {
        Parser::new(text).parse()
    }

    /// All matching descendants of `root`, in document order
    pub fn query_all(&self, root: &Element) -> Vec<NodePath> {
        root.descendant_paths()
            .into_iter()
            .filter(|path| self.matches_at(root, path))
            .collect()
    }

    pub fn query_first(&self, root: &Element) -> Option<NodePath> {
        let mut found = None;
        root.for_each_descendant(|_, path| {
            if found.is_none() && self.matches_at(root, path) {
                found = Some(path.to_vec());
            }
        });
        found
    }

    /// Matches strictly inside the element at `scope`, evaluated in the
    /// context of the whole tree
    pub fn query_within(&self, root: &Element, scope: &[usize]) -> Vec<NodePath> {
        let Some(scope_el) = root.element_at(scope) else {
            return Vec::new();
        };
        scope_el
            .descendant_paths()
            .into_iter()
            .map(|rel| {
                let mut path = scope.to_vec();
                path.extend(rel);
                path
            })
            .filter(|path| self.matches_at(root, path))
            .collect()
    }

    /// Whether the element at `path` (non-empty) matches any group
    pub fn matches_at(&self, root: &Element, path: &[usize]) -> bool {
        !path.is_empty()
            && self
                .groups
                .iter()
                .any(|group| matches_parts(root, path, &group.parts))
    }
}

fn matches_parts(root: &Element, path: &[usize], parts: &[Part]) -> bool {
    let Some((last, rest)) = parts.split_last() else {
        return true;
    };
    if !compound_matches(root, path, &last.compound) {
        return false;
    }
    if rest.is_empty() {
        return true;
    }
    if path.is_empty() {
        return false;
    }
    match last.combinator {
        Combinator::Child => matches_parts(root, &path[..path.len() - 1], rest),
        Combinator::Descendant => (0..path.len())
            .rev()
            .any(|depth| matches_parts(root, &path[..depth], rest)),
    }
}

fn compound_matches(root: &Element, path: &[usize], compound: &Compound) -> bool {
    let Some(el) = root.element_at(path) else {
        return false;
    };
    if let Some(tag) = &compound.tag {
        if el.tag != *tag {
            return false;
        }
    }
    if let Some(id) = &compound.id {
        if el.attr("id") != Some(id.as_str()) {
            return false;
        }
    }
    if !compound.classes.iter().all(|class| el.has_class(class)) {
        return false;
    }
    let attrs_ok = compound.attributes.iter().all(|m| match &m.value {
        Some(value) => el.attr(&m.name) == Some(value.as_str()),
        None => el.has_attr(&m.name),
    });
    if !attrs_ok {
        return false;
    }
    if let Some(n) = compound.nth_of_type {
        return nth_of_type(root, path) == Some(n);
    }
    true
}

/// 1-based index of the element at `path` among same-tag siblings
pub fn nth_of_type(root: &Element, path: &[usize]) -> Option<usize> {
    let (last, parent_path) = path.split_last()?;
    let parent = root.element_at(parent_path)?;
    let tag = &parent.children.get(*last)?.as_element()?.tag;
    let position = parent.children[..=*last]
        .iter()
        .filter_map(|n| n.as_element())
        .filter(|e| e.tag == *tag)
        .count();
    Some(position)
}

/// Whether `text` can be written as a bare identifier in a selector
pub fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' || c == '-' || !c.is_ascii() => {}
        _ => return false,
    }
    if text.starts_with("--") || (text.starts_with('-') && text[1..].starts_with(|c: char| c.is_ascii_digit())) {
        return false;
    }
    chars.all(is_ident_char)
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_' || !c.is_ascii()
}

// ----------------------------------------------------------------------
// Parsing
// ----------------------------------------------------------------------

struct Parser<'a> {
    chars: Vec<char>,
    pos: usize,
    source: &'a str,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            source,
        }
    }

    fn parse(mut self) -> Result<Selector, SelectorError> {
        if self.source.trim().is_empty() {
            return Err(SelectorError::Empty);
        }
        let mut groups = vec![self.parse_complex()?];
        while self.peek() == Some(',') {
            self.pos += 1;
            groups.push(self.parse_complex()?);
        }
        match self.peek() {
            None => Ok(Selector { groups }),
            Some(found) => Err(SelectorError::Unexpected {
                found,
                position: self.pos,
            }),
        }
    }

    fn parse_complex(&mut self) -> Result<ComplexSelector, SelectorError> {
        self.skip_ws();
        let mut parts = vec![Part {
            combinator: Combinator::Descendant,
            compound: self.parse_compound()?,
        }];
        loop {
            let had_ws = self.skip_ws();
            let combinator = match self.peek() {
                Some('>') => {
                    self.pos += 1;
                    self.skip_ws();
                    Combinator::Child
                }
                Some(',') | None => break,
                Some(_) if had_ws => Combinator::Descendant,
                Some(found) => {
                    return Err(SelectorError::Unexpected {
                        found,
                        position: self.pos,
                    })
                }
            };
            parts.push(Part {
                combinator,
                compound: self.parse_compound()?,
            });
        }
        Ok(ComplexSelector { parts })
    }

    fn parse_compound(&mut self) -> Result<Compound, SelectorError> {
        let start = self.pos;
        let mut compound = Compound::default();

        match self.peek() {
            Some('*') => self.pos += 1,
            Some(c) if is_ident_char(c) => {
                compound.tag = Some(self.ident().to_ascii_lowercase());
            }
            _ => {}
        }

        loop {
            match self.peek() {
                Some('#') => {
                    self.pos += 1;
                    compound.id = Some(self.required_ident()?);
                }
                Some('.') => {
                    self.pos += 1;
                    compound.classes.push(self.required_ident()?);
                }
                Some('[') => {
                    self.pos += 1;
                    compound.attributes.push(self.attribute()?);
                }
                Some(':') => {
                    self.pos += 1;
                    compound.nth_of_type = Some(self.pseudo()?);
                }
                _ => break,
            }
        }

        if self.pos == start {
            return match self.peek() {
                Some(found) => Err(SelectorError::Unexpected {
                    found,
                    position: self.pos,
                }),
                None => Err(SelectorError::Empty),
            };
        }
        Ok(compound)
    }

    fn attribute(&mut self) -> Result<AttributeMatch, SelectorError> {
        let start = self.pos - 1;
        self.skip_ws();
        let name = self.required_ident()?.to_ascii_lowercase();
        self.skip_ws();
        let value = match self.peek() {
            Some(']') => None,
            Some('=') => {
                self.pos += 1;
                self.skip_ws();
                let value = match self.peek() {
                    Some(quote @ ('"' | '\'')) => {
                        self.pos += 1;
                        let value_start = self.pos;
                        while self.peek().is_some_and(|c| c != quote) {
                            self.pos += 1;
                        }
                        if self.peek().is_none() {
                            return Err(SelectorError::Unterminated {
                                what: "string",
                                position: value_start - 1,
                            });
                        }
                        let value: String = self.chars[value_start..self.pos].iter().collect();
                        self.pos += 1;
                        value
                    }
                    _ => self.required_ident()?,
                };
                self.skip_ws();
                Some(value)
            }
            Some(found) => {
                return Err(SelectorError::Unexpected {
                    found,
                    position: self.pos,
                })
            }
            None => {
                return Err(SelectorError::Unterminated {
                    what: "attribute selector",
                    position: start,
                })
            }
        };
        match self.peek() {
            Some(']') => {
                self.pos += 1;
                Ok(AttributeMatch { name, value })
            }
            _ => Err(SelectorError::Unterminated {
                what: "attribute selector",
                position: start,
            }),
        }
    }

    fn pseudo(&mut self) -> Result<usize, SelectorError> {
        let name = self.ident();
        if name != "nth-of-type" {
            return Err(SelectorError::UnsupportedPseudo(name));
        }
        if self.peek() != Some('(') {
            return Err(SelectorError::InvalidNth(String::new()));
        }
        self.pos += 1;
        let arg_start = self.pos;
        while self.peek().is_some_and(|c| c != ')') {
            self.pos += 1;
        }
        let arg: String = self.chars[arg_start..self.pos].iter().collect();
        if self.peek().is_none() {
            return Err(SelectorError::Unterminated {
                what: ":nth-of-type",
                position: arg_start,
            });
        }
        self.pos += 1;
        match arg.trim().parse::<usize>() {
            Ok(n) if n > 0 => Ok(n),
            _ => Err(SelectorError::InvalidNth(arg)),
        }
    }

    fn ident(&mut self) -> String {
        let start = self.pos;
        while self.peek().is_some_and(is_ident_char) {
            self.pos += 1;
        }
        self.chars[start..self.pos].iter().collect()
    }

    fn required_ident(&mut self) -> Result<String, SelectorError> {
        let ident = self.ident();
        if !ident.is_empty() {
            return Ok(ident);
        }
        match self.peek() {
            Some(found) => Err(SelectorError::Unexpected {
                found,
                position: self.pos,
            }),
            None => Err(SelectorError::Unterminated {
                what: "identifier",
                position: self.pos,
            }),
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn skip_ws(&mut self) -> bool {
        let start = self.pos;
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
        self.pos != start
    }
}

// ----------------------------------------------------------------------
// Display
// ----------------------------------------------------------------------

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, group) in self.groups.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", group)?;
        }
        Ok(())
    }
}

impl fmt::Display for ComplexSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, part) in self.parts.iter().enumerate() {
            if i > 0 {
                match part.combinator {
                    Combinator::Descendant => write!(f, " ")?,
                    Combinator::Child => write!(f, " > ")?,
                }
            }
            write!(f, "{}", part.compound)?;
        }
        Ok(())
    }
}

impl fmt::Display for Compound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut wrote_any = false;
        if let Some(tag) = &self.tag {
            write!(f, "{}", tag)?;
            wrote_any = true;
        }
        if let Some(id) = &self.id {
            write!(f, "#{}", id)?;
            wrote_any = true;
        }
        for class in &self.classes {
            write!(f, ".{}", class)?;
            wrote_any = true;
        }
        for attr in &self.attributes {
            match &attr.value {
                Some(value) => write!(f, "[{}=\"{}\"]", attr.name, value)?,
                None => write!(f, "[{}]", attr.name)?,
            }
            wrote_any = true;
        }
        if let Some(n) = self.nth_of_type {
            write!(f, ":nth-of-type({})", n)?;
            wrote_any = true;
        }
        if !wrote_any {
            write!(f, "*")?;
        }
        Ok(())
    }
}

impl std::str::FromStr for Selector {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Selector::parse(s)
    }
}
