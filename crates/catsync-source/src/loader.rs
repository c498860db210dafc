//! Configuration file loading.
//!
//! The config file can be written in Jsonnet, YAML or JSON, chosen by
//! extension. The loaded configuration is validated before it is returned,
//! so a bad config never reaches the network.

use std::path::{Path, PathBuf};

use catsync_core::{ConfigError, SyncConfig};
use thiserror::Error;
use tracing::debug;

use crate::parse;

/// Error loading the configuration file.
#[derive(Debug, Error)]
pub enum LoadConfigError {
    #[error("reading {path}: {message}")]
    Io { path: String, message: String },

    #[error("parsing {path}: {message}")]
    Parse { path: String, message: String },

    #[error(transparent)]
    Invalid(#[from] ConfigError),
}

/// Loads and validates a [`SyncConfig`] from a file.
pub struct FileLoader {
    path: PathBuf,
}

impl FileLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn load(&self) -> Result<SyncConfig, LoadConfigError> {
        let content = std::fs::read(&self.path).map_err(|e| LoadConfigError::Io {
            path: self.path.display().to_string(),
            message: e.to_string(),
        })?;

        let config = self.deserialize(&content)?;
        config.validate()?;

        debug!(
            path = %self.path.display(),
            pipelines = config.pipelines.len(),
            "loaded config"
        );
        Ok(config)
    }

    fn deserialize(&self, content: &[u8]) -> Result<SyncConfig, LoadConfigError> {
        let path = self.path.display().to_string();
        let parse_err = |message: String| LoadConfigError::Parse {
            path: path.clone(),
            message,
        };

        match extension(&self.path) {
            Some("yaml" | "yml") => {
                serde_yaml::from_slice(content).map_err(|e| parse_err(e.to_string()))
            }
            Some("json") => serde_json::from_slice(content).map_err(|e| parse_err(e.to_string())),
            // Jsonnet by default: it subsumes JSON and is the conventional
            // config format for importer installations.
            _ => {
                let value = parse::jsonnet_to_value(&path, content)
                    .map_err(|e| parse_err(e.to_string()))?;
                serde_json::from_value(value).map_err(|e| parse_err(e.to_string()))
            }
        }
    }
}

fn extension(path: &Path) -> Option<&str> {
    path.extension().and_then(|ext| ext.to_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    const YAML_CONFIG: &str = r#"
sync_id: example-org/catalog
pipelines:
  - sources:
      - type: local
        files: ["catalog/*.yaml"]
    outputs:
      - name: Team
        type_name: team
        entry_source:
          external_id: id
          name: name
"#;

    #[test]
    fn test_load_yaml_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("importer.yaml");
        std::fs::write(&path, YAML_CONFIG).unwrap();

        let config = FileLoader::new(&path).load().unwrap();
        assert_eq!(config.sync_id, "example-org/catalog");
        assert_eq!(config.outputs().len(), 1);
    }

    #[test]
    fn test_load_jsonnet_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("importer.jsonnet");
        std::fs::write(
            &path,
            r#"
{
  sync_id: "example-org/catalog",
  pipelines: [{
    sources: [{ type: "inline", entries: [{ id: "T1", name: "Core" }] }],
    outputs: [{
      name: "Team",
      type_name: "team",
      entry_source: { external_id: "id", name: "name" },
    }],
  }],
}
"#,
        )
        .unwrap();

        let config = FileLoader::new(&path).load().unwrap();
        assert_eq!(config.pipelines.len(), 1);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("importer.yaml");
        std::fs::write(&path, "sync_id: ''\npipelines: []\n").unwrap();

        let err = FileLoader::new(&path).load().unwrap_err();
        assert!(matches!(err, LoadConfigError::Invalid(_)));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = FileLoader::new("/does/not/exist.yaml").load().unwrap_err();
        assert!(matches!(err, LoadConfigError::Io { .. }));
    }
}
