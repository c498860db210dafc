//! Importer configuration model.
//!
//! A configuration describes the desired state of the remote catalog: which
//! pipelines run, which upstream sources they pull from, and how upstream
//! records project into typed catalog entries. It is loaded once per run and
//! never mutated.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::credential::Credential;
use crate::error::ConfigError;
use crate::record::Record;

/// Top-level importer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Stable identifier for this importer installation. Written into
    /// annotations on every managed catalog type and entry; it is the only
    /// thing separating "ours" from "theirs" on the remote side.
    pub sync_id: String,

    /// Pipelines, run in order.
    pub pipelines: Vec<Pipeline>,
}

impl SyncConfig {
    /// All outputs across all pipelines, in declaration order.
    pub fn outputs(&self) -> Vec<&Output> {
        self.pipelines
            .iter()
            .flat_map(|pipeline| pipeline.outputs.iter())
            .collect()
    }

    /// Validate the whole configuration.
    ///
    /// Runs before any network call; a failure here aborts the run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sync_id.trim().is_empty() {
            return Err(ConfigError::invalid("sync_id", "must not be empty"));
        }
        if self.pipelines.is_empty() {
            return Err(ConfigError::invalid(
                "pipelines",
                "must declare at least one pipeline",
            ));
        }

        let mut seen_type_names = HashSet::new();
        for (pipeline_idx, pipeline) in self.pipelines.iter().enumerate() {
            if pipeline.outputs.is_empty() {
                return Err(ConfigError::invalid(
                    format!("pipelines.{pipeline_idx}.outputs"),
                    "must declare at least one output",
                ));
            }
            for (source_idx, source) in pipeline.sources.iter().enumerate() {
                source
                    .validate()
                    .map_err(|e| prefix(e, format!("pipelines.{pipeline_idx}.sources.{source_idx}")))?;
            }
            for (output_idx, output) in pipeline.outputs.iter().enumerate() {
                output
                    .validate()
                    .map_err(|e| prefix(e, format!("pipelines.{pipeline_idx}.outputs.{output_idx}")))?;

                if !seen_type_names.insert(output.type_name.clone()) {
                    return Err(ConfigError::DuplicateTypeName {
                        type_name: output.type_name.clone(),
                    });
                }
            }
        }

        Ok(())
    }
}

fn prefix(err: ConfigError, path: String) -> ConfigError {
    match err {
        ConfigError::Invalid { field, message } => ConfigError::Invalid {
            field: if field.is_empty() {
                path
            } else {
                format!("{path}.{field}")
            },
            message,
        },
        other => other,
    }
}

/// One unit of sync: a set of sources funnelling into a set of outputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pipeline {
    #[serde(default)]
    pub sources: Vec<Source>,
    #[serde(default)]
    pub outputs: Vec<Output>,
}

/// An upstream source of records. Tagged variant carrying only the active
/// variant's fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Source {
    /// Files on disk, matched by glob.
    Local(SourceLocal),
    /// A Backstage software catalog, pulled over its entities API.
    Backstage(SourceBackstage),
    /// Records embedded directly in the configuration.
    Inline(SourceInline),
}

impl Source {
    fn validate(&self) -> Result<(), ConfigError> {
        match self {
            Source::Local(local) => local.validate(),
            Source::Backstage(backstage) => backstage.validate(),
            Source::Inline(_) => Ok(()),
        }
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Source::Local(local) => write!(f, "local (files={})", local.files.join(", ")),
            Source::Backstage(backstage) => {
                write!(f, "backstage (endpoint={})", backstage.endpoint)
            }
            Source::Inline(inline) => write!(f, "inline ({} entries)", inline.entries.len()),
        }
    }
}

/// Local file source: every file matched by one of the globs becomes one
/// source entry, with the path kept as origin and format hint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceLocal {
    pub files: Vec<String>,
}

impl SourceLocal {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.files.is_empty() {
            return Err(ConfigError::invalid("files", "must list at least one glob"));
        }
        Ok(())
    }
}

/// Backstage entities API source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceBackstage {
    /// Entities endpoint, e.g. `https://backstage.company.io/api/catalog/entities/by-query`.
    pub endpoint: String,

    /// Optional bearer token. Depending on `sign_jwt` it is either sent
    /// as-is or used as an HMAC secret to mint a short-lived JWT.
    #[serde(default)]
    pub token: Credential,

    /// Whether to sign `token` into a JWT. Unset means yes, matching the
    /// Backstage external-caller auth scheme.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sign_jwt: Option<bool>,

    /// Optional entity filter, passed through as the `filter` query param.
    #[serde(default)]
    pub filters: String,

    /// Page size. Zero leaves paging to the server default.
    #[serde(default)]
    pub limit: u32,

    /// Initial cursor offset.
    #[serde(default)]
    pub offset: u32,
}

impl SourceBackstage {
    /// Whether the configured token should be signed into a JWT.
    pub fn should_sign_jwt(&self) -> bool {
        self.sign_jwt.unwrap_or(true)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.endpoint.trim().is_empty() {
            return Err(ConfigError::invalid(
                "endpoint",
                "must provide an endpoint for fetching Backstage entries",
            ));
        }
        if !self.endpoint.starts_with("http://") && !self.endpoint.starts_with("https://") {
            return Err(ConfigError::invalid("endpoint", "must be an http(s) URL"));
        }
        Ok(())
    }
}

/// Records embedded in config, for small constant catalogs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceInline {
    pub entries: Vec<Record>,
}

/// A desired catalog type plus the rules projecting records into its entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Output {
    /// Human-readable type name shown in the catalog UI.
    pub name: String,

    #[serde(default)]
    pub description: String,

    /// Stable external identifier of the type; unique across the whole
    /// configuration.
    pub type_name: String,

    /// Optional boolean expression applied to each record; absent means
    /// accept everything.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_filter: Option<String>,

    /// Attribute schema of the type.
    #[serde(default)]
    pub attributes: Vec<AttributeDefinition>,

    /// How surviving records map onto entries.
    pub entry_source: EntrySource,
}

impl Output {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::invalid("name", "must not be empty"));
        }
        if self.type_name.trim().is_empty() {
            return Err(ConfigError::invalid("type_name", "must not be empty"));
        }
        if self.entry_source.external_id.trim().is_empty() {
            return Err(ConfigError::invalid(
                "entry_source.external_id",
                "must provide an expression",
            ));
        }
        if self.entry_source.name.trim().is_empty() {
            return Err(ConfigError::invalid(
                "entry_source.name",
                "must provide an expression",
            ));
        }

        let mut ids = HashSet::new();
        for attribute in &self.attributes {
            if attribute.id.trim().is_empty() {
                return Err(ConfigError::invalid("attributes", "attribute id must not be empty"));
            }
            if !ids.insert(attribute.id.as_str()) {
                return Err(ConfigError::invalid(
                    "attributes",
                    format!("duplicate attribute id '{}'", attribute.id),
                ));
            }
            if attribute.required && !self.entry_source.values.contains_key(&attribute.id) {
                return Err(ConfigError::MissingRequiredBinding {
                    type_name: self.type_name.clone(),
                    attribute: attribute.id.clone(),
                });
            }
        }

        for bound in self.entry_source.values.keys() {
            if !ids.contains(bound.as_str()) {
                return Err(ConfigError::UnknownAttribute {
                    type_name: self.type_name.clone(),
                    attribute: bound.clone(),
                });
            }
        }

        Ok(())
    }
}

/// One attribute on a type's schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeDefinition {
    /// Stable attribute id, referenced by entry values.
    pub id: String,

    /// Display name.
    pub name: String,

    /// Value type: `string`, `bool`, `number`, or the `type_name` of another
    /// output, in which case values are external ids of that type's entries.
    #[serde(rename = "type")]
    pub data_type: String,

    /// Whether values are lists.
    #[serde(default)]
    pub array: bool,

    /// Whether every entry must bind a non-empty value.
    #[serde(default)]
    pub required: bool,
}

/// Expressions projecting one record into one entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntrySource {
    /// Expression for the stable per-type key; entries survive across runs
    /// through this id.
    pub external_id: String,

    /// Expression for the entry display name.
    pub name: String,

    /// Optional expression for the entry rank.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank: Option<String>,

    /// Expressions for entry aliases; each evaluates to one alias.
    #[serde(default)]
    pub aliases: Vec<String>,

    /// Value expression per attribute id.
    #[serde(default)]
    pub values: HashMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_output(type_name: &str) -> Output {
        Output {
            name: "Team".to_string(),
            description: String::new(),
            type_name: type_name.to_string(),
            source_filter: None,
            attributes: vec![],
            entry_source: EntrySource {
                external_id: "id".to_string(),
                name: "name".to_string(),
                rank: None,
                aliases: vec![],
                values: HashMap::new(),
            },
        }
    }

    fn minimal_config() -> SyncConfig {
        SyncConfig {
            sync_id: "test-sync".to_string(),
            pipelines: vec![Pipeline {
                sources: vec![Source::Inline(SourceInline { entries: vec![] })],
                outputs: vec![minimal_output("team")],
            }],
        }
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(minimal_config().validate().is_ok());
    }

    #[test]
    fn test_empty_sync_id_rejected() {
        let mut config = minimal_config();
        config.sync_id = "  ".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field, .. }) if field == "sync_id"
        ));
    }

    #[test]
    fn test_duplicate_type_name_rejected() {
        let mut config = minimal_config();
        config.pipelines.push(Pipeline {
            sources: vec![],
            outputs: vec![minimal_output("team")],
        });
        assert!(matches!(
            config.validate(),
            Err(ConfigError::DuplicateTypeName { type_name }) if type_name == "team"
        ));
    }

    #[test]
    fn test_unknown_attribute_binding_rejected() {
        let mut config = minimal_config();
        config.pipelines[0].outputs[0]
            .entry_source
            .values
            .insert("ghost".to_string(), "name".to_string());
        assert!(matches!(
            config.validate(),
            Err(ConfigError::UnknownAttribute { attribute, .. }) if attribute == "ghost"
        ));
    }

    #[test]
    fn test_required_attribute_needs_binding() {
        let mut config = minimal_config();
        config.pipelines[0].outputs[0].attributes.push(AttributeDefinition {
            id: "owner".to_string(),
            name: "Owner".to_string(),
            data_type: "string".to_string(),
            array: false,
            required: true,
        });
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingRequiredBinding { attribute, .. }) if attribute == "owner"
        ));
    }

    #[test]
    fn test_backstage_endpoint_must_be_url() {
        let mut config = minimal_config();
        config.pipelines[0].sources = vec![Source::Backstage(SourceBackstage {
            endpoint: "not a url".to_string(),
            token: Credential::default(),
            sign_jwt: None,
            filters: String::new(),
            limit: 0,
            offset: 0,
        })];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_source_deserializes_from_tagged_yaml() {
        let yaml = r"
type: backstage
endpoint: https://backstage.company.io/api/catalog/entities/by-query
token: secret
limit: 100
";
        let source: Source = serde_yaml::from_str(yaml).unwrap();
        match source {
            Source::Backstage(backstage) => {
                assert_eq!(backstage.limit, 100);
                assert!(backstage.should_sign_jwt());
            }
            other => panic!("expected backstage source, got {other}"),
        }
    }
}
