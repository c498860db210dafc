//! Local file source: glob expansion over the working directory.

use catsync_core::SourceLocal;
use tracing::debug;

use crate::entry::SourceEntry;
use crate::error::SourceError;

/// Expand the configured globs and read every matched file.
pub async fn load(config: &SourceLocal) -> Result<Vec<SourceEntry>, SourceError> {
    let mut entries = Vec::new();

    for pattern in &config.files {
        let paths = glob::glob(pattern).map_err(|e| SourceError::Pattern {
            pattern: pattern.clone(),
            message: e.to_string(),
        })?;

        for path in paths {
            let path = path.map_err(|e| SourceError::Io {
                path: e.path().display().to_string(),
                message: e.error().to_string(),
            })?;
            if path.is_dir() {
                continue;
            }

            let content = std::fs::read(&path).map_err(|e| SourceError::Io {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;

            debug!(path = %path.display(), bytes = content.len(), "loaded local file");
            entries.push(SourceEntry {
                origin: path.display().to_string(),
                filename: Some(path.display().to_string()),
                content,
            });
        }
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local(files: Vec<String>) -> SourceLocal {
        SourceLocal { files }
    }

    #[tokio::test]
    async fn test_loads_matched_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.json"), b"{\"id\": \"a\"}").unwrap();
        std::fs::write(dir.path().join("b.json"), b"{\"id\": \"b\"}").unwrap();
        std::fs::write(dir.path().join("ignored.txt"), b"nope").unwrap();

        let pattern = dir.path().join("*.json").display().to_string();
        let entries = load(&local(vec![pattern])).await.unwrap();

        assert_eq!(entries.len(), 2);
        assert!(entries[0].origin.ends_with("a.json"));
        assert_eq!(entries[0].filename.as_deref(), Some(entries[0].origin.as_str()));
    }

    #[tokio::test]
    async fn test_no_matches_is_empty_not_error() {
        let dir = tempfile::tempdir().unwrap();
        let pattern = dir.path().join("*.json").display().to_string();
        let entries = load(&local(vec![pattern])).await.unwrap();
        assert!(entries.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_pattern_is_error() {
        let err = load(&local(vec!["[".to_string()])).await.unwrap_err();
        assert!(matches!(err, SourceError::Pattern { .. }));
    }

    #[tokio::test]
    async fn test_entries_parse_to_records() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("team.yaml"), b"id: T1\nname: Core\n").unwrap();

        let pattern = dir.path().join("*.yaml").display().to_string();
        let entries = load(&local(vec![pattern])).await.unwrap();
        let records = entries[0].records().unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].record["id"], serde_json::json!("T1"));
        assert!(records[0].origin.ends_with("team.yaml"));
    }
}
