//! Wire types for the catalog API.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A catalog type as the server reports it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogType {
    /// Server-assigned id.
    pub id: String,

    /// Stable external identifier, unique per catalog.
    pub type_name: String,

    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub schema: CatalogTypeSchema,

    #[serde(default)]
    pub annotations: HashMap<String, String>,
}

/// Attribute schema of a type, with the version used as the
/// optimistic-concurrency token on schema updates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogTypeSchema {
    #[serde(default)]
    pub version: i64,

    #[serde(default)]
    pub attributes: Vec<CatalogTypeAttribute>,
}

/// One attribute on a type schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogTypeAttribute {
    pub id: String,

    pub name: String,

    /// `string`, `bool`, `number`, or the type_name of another catalog type
    /// for reference attributes.
    #[serde(rename = "type")]
    pub data_type: String,

    #[serde(default)]
    pub array: bool,

    #[serde(default)]
    pub required: bool,
}

/// A catalog entry as the server reports it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Server-assigned id.
    pub id: String,

    /// Stable key chosen by the importer; entries survive across runs
    /// through this id.
    pub external_id: String,

    pub name: String,

    #[serde(default)]
    pub rank: i32,

    #[serde(default)]
    pub aliases: Vec<String>,

    #[serde(default)]
    pub attribute_values: HashMap<String, BoundValue>,

    #[serde(default)]
    pub annotations: HashMap<String, String>,
}

/// Value binding for one attribute: either a scalar or an array, matching
/// whether the attribute schema is marked `array`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundValue {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<AttributeValue>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub array_value: Option<Vec<AttributeValue>>,
}

impl BoundValue {
    pub fn scalar(value: AttributeValue) -> Self {
        Self {
            value: Some(value),
            array_value: None,
        }
    }

    pub fn array(values: Vec<AttributeValue>) -> Self {
        Self {
            value: None,
            array_value: Some(values),
        }
    }

    /// True when the binding carries no value at all.
    pub fn is_empty(&self) -> bool {
        self.value.is_none()
            && self
                .array_value
                .as_ref()
                .is_none_or(|values| values.is_empty())
    }
}

/// A single typed attribute value. References are carried as the external
/// id of the referenced entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Bool(bool),
    Number(serde_json::Number),
    String(String),
}

impl AttributeValue {
    pub fn string(value: impl Into<String>) -> Self {
        AttributeValue::String(value.into())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTypeRequest {
    pub name: String,
    pub description: String,
    pub type_name: String,
    pub annotations: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateTypeRequest {
    pub name: String,
    pub description: String,
    pub type_name: String,
    pub annotations: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateEntryRequest {
    pub catalog_type_id: String,
    pub external_id: String,
    pub name: String,
    pub rank: i32,
    pub aliases: Vec<String>,
    pub attribute_values: HashMap<String, BoundValue>,
    pub annotations: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateEntryRequest {
    pub external_id: String,
    pub name: String,
    pub rank: i32,
    pub aliases: Vec<String>,
    pub attribute_values: HashMap<String, BoundValue>,
    pub annotations: HashMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_value_serializes_untagged() {
        assert_eq!(
            serde_json::to_string(&AttributeValue::string("P1")).unwrap(),
            "\"P1\""
        );
        assert_eq!(serde_json::to_string(&AttributeValue::Bool(true)).unwrap(), "true");
    }

    #[test]
    fn test_bound_value_empty() {
        assert!(BoundValue::default().is_empty());
        assert!(BoundValue::array(vec![]).is_empty());
        assert!(!BoundValue::scalar(AttributeValue::string("x")).is_empty());
    }

    #[test]
    fn test_entry_deserializes_with_defaults() {
        let entry: CatalogEntry = serde_json::from_str(
            r#"{"id": "01H", "external_id": "P1", "name": "Alpha"}"#,
        )
        .unwrap();
        assert_eq!(entry.rank, 0);
        assert!(entry.aliases.is_empty());
        assert!(entry.attribute_values.is_empty());
    }
}
