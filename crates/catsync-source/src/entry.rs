//! Raw entries yielded by source adapters.

use catsync_core::SourcedRecord;

use crate::error::SourceError;
use crate::parse;

/// One self-describing blob pulled from a source, before parsing.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceEntry {
    /// Human-readable provenance, e.g. a file path or the source endpoint.
    pub origin: String,

    /// Filename hint for format detection, when the source has one.
    pub filename: Option<String>,

    /// Raw content bytes.
    pub content: Vec<u8>,
}

impl SourceEntry {
    /// Parse this entry into records, tagging each with the entry's origin.
    pub fn records(&self) -> Result<Vec<SourcedRecord>, SourceError> {
        let records = parse::parse(self.filename.as_deref(), &self.content).map_err(|source| {
            SourceError::Parse {
                origin: self.origin.clone(),
                source,
            }
        })?;

        Ok(records
            .into_iter()
            .map(|record| SourcedRecord::new(&self.origin, record))
            .collect())
    }
}
