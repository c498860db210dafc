//! Configuration validation errors.
//!
//! These are always fatal and always surface before any network call.

use thiserror::Error;

/// Validation failure in the importer configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A field holds a value that cannot be used.
    #[error("invalid config at {field}: {message}")]
    Invalid { field: String, message: String },

    /// The same catalog type is declared by more than one output, which
    /// would make two reconcilers fight over one remote type.
    #[error("catalog type '{type_name}' is declared by more than one output")]
    DuplicateTypeName { type_name: String },

    /// An entry source references an attribute id that is not declared on
    /// the output's schema.
    #[error("output '{type_name}' binds a value for unknown attribute '{attribute}'")]
    UnknownAttribute {
        type_name: String,
        attribute: String,
    },

    /// A required attribute has no value expression, so no record could
    /// ever satisfy it.
    #[error("output '{type_name}' marks attribute '{attribute}' required but binds no value for it")]
    MissingRequiredBinding {
        type_name: String,
        attribute: String,
    },
}

impl ConfigError {
    /// Create an [`ConfigError::Invalid`] for the given config path.
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field: field.into(),
            message: message.into(),
        }
    }
}
