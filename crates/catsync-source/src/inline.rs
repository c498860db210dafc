//! Inline source: records embedded directly in the configuration.

use catsync_core::SourceInline;

use crate::entry::SourceEntry;
use crate::error::SourceError;

/// Turn each configured record into a JSON source entry, so inline data
/// flows through the same parse path as everything else.
pub fn load(config: &SourceInline) -> Result<Vec<SourceEntry>, SourceError> {
    config
        .entries
        .iter()
        .map(|record| {
            let content = serde_json::to_vec(record).map_err(|e| SourceError::Encode {
                message: e.to_string(),
            })?;
            Ok(SourceEntry {
                origin: "inline".to_string(),
                filename: Some("inline.json".to_string()),
                content,
            })
        })
        .collect()
}
