//! Reconciliation error types.

use catsync_catalog::CatalogError;
use thiserror::Error;

/// The phase an entry operation belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Delete,
    Create,
    Update,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operation::Delete => f.write_str("delete"),
            Operation::Create => f.write_str("create"),
            Operation::Update => f.write_str("update"),
        }
    }
}

/// One failed entry operation. Accumulated, never fatal on its own.
#[derive(Debug, Clone)]
pub struct ItemFailure {
    pub external_id: String,
    pub operation: Operation,
    pub error: String,
}

/// Fatal reconciliation failure for one type. Other types proceed.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Listing the remote entries failed; nothing can be diffed.
    #[error("listing entries for type '{type_name}': {source}")]
    Listing {
        type_name: String,
        #[source]
        source: CatalogError,
    },

    /// Authentication failed mid-phase; remaining work for the type was
    /// abandoned after in-flight requests resolved.
    #[error("reconciling type '{type_name}': {message}")]
    Fatal { type_name: String, message: String },
}
