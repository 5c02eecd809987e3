//! Error types for the editor

use folio_dom::SelectorError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Calibration error: {0}")]
    Calibration(#[from] CalibrationError),

    #[error("AI error: {0}")]
    Ai(#[from] crate::ai::AiError),

    #[error("Selector error: {0}")]
    Selector(#[from] SelectorError),
}

/// Durable storage failures
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage quota exceeded writing '{key}' ({size} bytes, limit {limit})")]
    QuotaExceeded { key: String, size: usize, limit: usize },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Editor configuration failures
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Missing required field '{0}'")]
    MissingField(&'static str),

    #[error("Invalid selector in '{field}' ({selector}): {source}")]
    InvalidSelector {
        field: &'static str,
        selector: String,
        #[source]
        source: SelectorError,
    },
}

/// Template calibration failures; calibration stays active so the user can retry
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CalibrationError {
    #[error("Calibration is not active")]
    NotActive,

    #[error("No page scope has been selected")]
    NoPageSelected,

    #[error("No editable elements have been selected")]
    EmptySelection,

    #[error("Template name is empty")]
    EmptyName,

    #[error("Could not derive a selector that matches the clicked element ({0})")]
    SelectorNotFound(String),
}

/// Rejections from the host's rich-text command mechanism
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NativeCommandError {
    #[error("No rich-text surface is attached")]
    NoSurface,

    #[error("Command '{0}' is not supported")]
    Unsupported(String),

    #[error("Command '{command}' was rejected: {reason}")]
    Rejected { command: String, reason: String },
}
