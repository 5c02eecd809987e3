use anyhow::{Context, Result};
use folio_editor::{EditorConfig, EditorSession, FileStorage, MemoryStorage, Storage};
use std::path::Path;

/// Storage directory used when none is given
pub const DEFAULT_STORAGE_DIR: &str = ".folio";

/// Open a file-backed store, or an in-memory one when `dir` is `None`
pub fn open_storage(dir: Option<&Path>) -> Box<dyn Storage> {
    match dir {
        Some(dir) => Box::new(FileStorage::new(dir)),
        None => Box::new(MemoryStorage::new()),
    }
}

/// Load an editor config from disk and open a session over it
pub fn open_session(config_path: &Path, storage_dir: Option<&Path>) -> Result<EditorSession> {
    let config = EditorConfig::load(config_path)
        .with_context(|| format!("Failed to load config {}", config_path.display()))?;
    let session = EditorSession::open(config, open_storage(storage_dir))?;
    Ok(session)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const CONFIG: &str = r#"{
        "id": "report",
        "name": "Quarterly report",
        "initialContent": "<div class=\"page\"><h1>Title</h1></div>",
        "pageStructureSelector": ".page",
        "newPageTemplate": "<div class=\"page\"></div>"
    }"#;

    #[test]
    fn test_open_session_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        fs::write(&path, CONFIG).unwrap();

        let session = open_session(&path, None).unwrap();
        assert_eq!(session.config().id, "report");
        assert_eq!(session.page_count(), 1);
    }

    #[test]
    fn test_open_session_missing_config() {
        let dir = tempfile::tempdir().unwrap();
        let err = open_session(&dir.path().join("missing.json"), None).err().expect("expected open_session to fail");
        assert!(err.to_string().contains("missing.json"));
    }

    #[test]
    fn test_open_session_uses_stored_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        fs::write(&path, CONFIG).unwrap();
        let storage_dir = dir.path().join("store");

        {
            let mut session = open_session(&path, Some(&storage_dir)).unwrap();
            session.add_new_page();
        }

        let session = open_session(&path, Some(&storage_dir)).unwrap();
        assert_eq!(session.page_count(), 2);
    }
}
