//! Desired-state models produced by projection.

use std::collections::HashMap;

use catsync_catalog::{BoundValue, CatalogTypeAttribute};

/// A desired catalog entry, before the server has assigned it an id.
#[derive(Debug, Clone, PartialEq)]
pub struct EntryModel {
    /// Stable key within the type; entries survive across runs through it.
    pub external_id: String,

    pub name: String,

    pub rank: i32,

    pub aliases: Vec<String>,

    /// Bound values per attribute id on the type's schema.
    pub attribute_values: HashMap<String, BoundValue>,
}

/// The desired shape of a catalog type, derived from an output declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct DesiredType {
    pub type_name: String,
    pub name: String,
    pub description: String,
    pub attributes: Vec<CatalogTypeAttribute>,
}
