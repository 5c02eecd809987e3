//! # Templates
//!
//! Reusable page subtrees captured through calibration.
//!
//! A [`TemplateRecord`] stores the markup of one page, the selector that
//! found it, and the identities of the descendants meant to receive fresh
//! content. Instantiating a record always remaps every identity, so two
//! instances never share one.

use crate::errors::StorageError;
use crate::identity::IdentityTagger;
use crate::storage::{Storage, TEMPLATES_KEY};
use chrono::Utc;
use folio_dom::{parse_fragment, Element, Node};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Class marking a substituted editable region
pub const TEMPLATE_EDITABLE_CLASS: &str = "template-editable-element";

/// Attribute marking a substituted editable region
pub const TEMPLATE_EDITABLE_ATTR: &str = "data-template-editable";

/// Persisted template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateRecord {
    pub id: String,
    pub name: String,
    /// Position of the source page among all matches of `page_selector`
    pub page_index: usize,
    pub html: String,
    pub editable_elements: Vec<String>,
    pub page_selector: String,
}

impl TemplateRecord {
    pub fn generate_id() -> String {
        format!(
            "template-{}-{:04x}",
            Utc::now().timestamp_millis(),
            rand::random::<u16>()
        )
    }
}

/// Freshly instantiated template subtree
#[derive(Debug, Clone)]
pub struct Instance {
    pub element: Element,
    /// Stored identity → identity in this instance
    pub mapping: HashMap<String, String>,
}

impl Instance {
    pub fn identity(&self) -> Option<&str> {
        self.element.identity()
    }
}

/// Parse `record` into a detached subtree with fresh identities, filling
/// editable regions from `content_by_identity` (keyed by stored identity)
pub fn instantiate(
    record: &TemplateRecord,
    content_by_identity: &HashMap<String, String>,
    tagger: &mut IdentityTagger,
) -> Option<Instance> {
    let mut element = parse_fragment(&record.html)
        .into_iter()
        .find_map(|node| match node {
            Node::Element(el) => Some(el),
            _ => None,
        })?;

    let mapping = tagger.retag_subtree(&mut element);

    for stored in &record.editable_elements {
        let Some(content) = content_by_identity.get(stored) else {
            continue;
        };
        let Some(target) = mapping.get(stored).and_then(|id| element.find_mut(id)) else {
            debug!(identity = %stored, "Editable region missing from template markup");
            continue;
        };
        target.set_inner_html(content);
        target.add_class(TEMPLATE_EDITABLE_CLASS);
        target.set_attr(TEMPLATE_EDITABLE_ATTR, "true");
    }

    Some(Instance { element, mapping })
}

/// All known templates, mirrored to storage under [`TEMPLATES_KEY`]
#[derive(Debug, Clone, Default)]
pub struct TemplateCatalog {
    records: Vec<TemplateRecord>,
}

impl TemplateCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the catalog; unreadable or corrupt data yields an empty catalog
    pub fn load(storage: &dyn Storage) -> Self {
        let raw = match storage.get(TEMPLATES_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Self::new(),
            Err(err) => {
                warn!(error = %err, "Failed to read template catalog");
                return Self::new();
            }
        };
        match serde_json::from_str::<Vec<TemplateRecord>>(&raw) {
            Ok(records) => Self { records },
            Err(err) => {
                warn!(error = %err, "Template catalog is corrupt, starting empty");
                Self::new()
            }
        }
    }

    pub fn records(&self) -> &[TemplateRecord] {
        &self.records
    }

    pub fn get(&self, id: &str) -> Option<&TemplateRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Add a record and rewrite the whole catalog
    ///
    /// The record stays in memory even when the write fails.
    pub fn add(&mut self, record: TemplateRecord, storage: &mut dyn Storage) -> Result<(), StorageError> {
        self.records.push(record);
        self.persist(storage)
    }

    pub fn persist(&self, storage: &mut dyn Storage) -> Result<(), StorageError> {
        let json = serde_json::to_string(&self.records)?;
        storage.set(TEMPLATES_KEY, &json)
    }
}
