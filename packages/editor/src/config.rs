use crate::errors::ConfigError;
use crate::history::DEFAULT_HISTORY_LIMIT;
use folio_dom::Selector;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Initial load contract for one editor instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorConfig {
    /// Document identity, used to key persisted content
    pub id: String,

    /// Display name
    #[serde(default)]
    pub name: String,

    /// Markup loaded when nothing was persisted for `id`
    #[serde(default)]
    pub initial_content: String,

    /// Selects the page elements among the root's children
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_structure_selector: Option<String>,

    /// Markup of a blank page
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_page_template: Option<String>,

    /// Elements emptied out of a freshly added page
    #[serde(default)]
    pub content_removal_selectors_for_new_page: Vec<String>,

    /// Element inside each page that shows its number
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_number_element_selector: Option<String>,

    #[serde(default)]
    pub page_number_pattern: PageNumberPattern,

    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

fn default_history_limit() -> usize {
    DEFAULT_HISTORY_LIMIT
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageNumberPattern {
    #[serde(default)]
    pub prefix: String,

    #[serde(default)]
    pub suffix: String,

    #[serde(default)]
    pub number_system: NumberSystem,
}

impl PageNumberPattern {
    pub fn format(&self, number: usize) -> String {
        format!("{}{}{}", self.prefix, self.number_system.digits(number), self.suffix)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NumberSystem {
    #[default]
    Western,
    Persian,
}

impl NumberSystem {
    pub fn digits(self, number: usize) -> String {
        let western = number.to_string();
        match self {
            NumberSystem::Western => western,
            NumberSystem::Persian => western
                .chars()
                .map(|c| match c.to_digit(10) {
                    Some(d) => char::from_u32(0x06F0 + d).unwrap_or(c),
                    None => c,
                })
                .collect(),
        }
    }
}

/// Selectors parsed from an [`EditorConfig`]
#[derive(Debug, Clone, Default)]
pub struct ConfigSelectors {
    pub page: Option<Selector>,
    pub page_number: Option<Selector>,
    pub content_removal: Vec<Selector>,
}

impl EditorConfig {
    /// Minimal config with just an identity and content
    pub fn new(id: impl Into<String>, initial_content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            initial_content: initial_content.into(),
            page_structure_selector: None,
            new_page_template: None,
            content_removal_selectors_for_new_page: Vec::new(),
            page_number_element_selector: None,
            page_number_pattern: PageNumberPattern::default(),
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }

    /// Load config from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Check required fields and parse every selector up front
    pub fn validate(&self) -> Result<ConfigSelectors, ConfigError> {
        if self.id.trim().is_empty() {
            return Err(ConfigError::MissingField("id"));
        }
        let page = parse_optional("pageStructureSelector", &self.page_structure_selector)?;
        let page_number =
            parse_optional("pageNumberElementSelector", &self.page_number_element_selector)?;
        let content_removal = self
            .content_removal_selectors_for_new_page
            .iter()
            .map(|text| parse("contentRemovalSelectorsForNewPage", text))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ConfigSelectors {
            page,
            page_number,
            content_removal,
        })
    }
}

fn parse(field: &'static str, text: &str) -> Result<Selector, ConfigError> {
    Selector::parse(text).map_err(|source| ConfigError::InvalidSelector {
        field,
        selector: text.to_string(),
        source,
    })
}

fn parse_optional(field: &'static str, text: &Option<String>) -> Result<Option<Selector>, ConfigError> {
    match text.as_deref().map(str::trim) {
        Some(text) if !text.is_empty() => parse(field, text).map(Some),
        _ => Ok(None),
    }
}
