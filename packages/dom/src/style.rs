//! Inline `style` attribute declarations.

use std::fmt;

/// Ordered list of inline style declarations
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Style {
    declarations: Vec<(String, String)>,
}

impl Style {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `prop: value; prop: value` text, skipping malformed entries
    pub fn parse(text: &str) -> Self {
        let mut style = Style::new();
        for declaration in text.split(';') {
            let Some((property, value)) = declaration.split_once(':') else {
                continue;
            };
            let property = property.trim().to_ascii_lowercase();
            let value = value.trim();
            if property.is_empty() || value.is_empty() {
                continue;
            }
            style.set(&property, value);
        }
        style
    }

    pub fn get(&self, property: &str) -> Option<&str> {
        self.declarations
            .iter()
            .find(|(p, _)| p == property)
            .map(|(_, v)| v.as_str())
    }

    /// Set a property; an empty value removes it
    pub fn set(&mut self, property: &str, value: &str) {
        let value = value.trim();
        if value.is_empty() {
            self.remove(property);
            return;
        }
        match self.declarations.iter_mut().find(|(p, _)| p == property) {
            Some((_, existing)) => *existing = value.to_string(),
            None => self
                .declarations
                .push((property.to_string(), value.to_string())),
        }
    }

    pub fn remove(&mut self, property: &str) -> bool {
        let before = self.declarations.len();
        self.declarations.retain(|(p, _)| p != property);
        self.declarations.len() != before
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.declarations
            .iter()
            .map(|(p, v)| (p.as_str(), v.as_str()))
    }

    /// Whitespace-separated tokens of a property value (`text-decoration`)
    pub fn tokens(&self, property: &str) -> Vec<String> {
        self.get(property)
            .unwrap_or("")
            .split_whitespace()
            .filter(|t| *t != "none")
            .map(str::to_string)
            .collect()
    }
}

impl fmt::Display for Style {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (property, value)) in self.declarations.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}: {};", property, value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_serialize() {
        let style = Style::parse("font-weight: bold;color:red; ;bogus");
        assert_eq!(style.get("font-weight"), Some("bold"));
        assert_eq!(style.get("color"), Some("red"));
        assert_eq!(style.len(), 2);
        assert_eq!(style.to_string(), "font-weight: bold; color: red;");
    }

    #[test]
    fn test_set_empty_removes() {
        let mut style = Style::parse("color: red");
        style.set("color", "");
        assert!(style.is_empty());
    }

    #[test]
    fn test_tokens_skip_none() {
        let style = Style::parse("text-decoration: underline line-through");
        assert_eq!(style.tokens("text-decoration"), vec!["underline", "line-through"]);
        let style = Style::parse("text-decoration: none");
        assert!(style.tokens("text-decoration").is_empty());
    }
}
