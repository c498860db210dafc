//! Record types produced by the ingest pipeline.

use serde_json::Value;

/// A parsed upstream record: a mapping from field name to JSON value.
///
/// This is the normal form every source format (JSON, YAML, Jsonnet, CSV)
/// is reduced to before filtering and projection.
pub type Record = serde_json::Map<String, Value>;

/// A record together with the provenance of the source entry it was parsed
/// from, so projection errors can point back at the offending input.
#[derive(Debug, Clone, PartialEq)]
pub struct SourcedRecord {
    /// Human-readable provenance, e.g. a file path or `backstage (endpoint=…)`.
    pub origin: String,
    /// The parsed record.
    pub record: Record,
}

impl SourcedRecord {
    pub fn new(origin: impl Into<String>, record: Record) -> Self {
        Self {
            origin: origin.into(),
            record,
        }
    }
}
