//! # catsync sources
//!
//! Everything between an upstream system and the projector: source adapters
//! that pull raw entries (local file globs, the Backstage entities API,
//! inline config records), the multi-format parser that reduces raw bytes to
//! records, and the configuration file loader.
//!
//! Adapters implement [`Load`] and produce [`SourceEntry`] values; each
//! entry parses into zero or more [`catsync_core::SourcedRecord`]s.

pub mod backstage;
pub mod entry;
pub mod error;
pub mod inline;
pub mod loader;
pub mod local;
pub mod parse;

use async_trait::async_trait;
use catsync_core::Source;

pub use entry::SourceEntry;
pub use error::{ParseError, SourceError};
pub use loader::{FileLoader, LoadConfigError};

/// Loader capability shared by all source variants.
#[async_trait]
pub trait Load {
    /// Pull all entries from the upstream. Must respect cancellation by
    /// returning promptly once its futures are dropped.
    async fn load(&self) -> Result<Vec<SourceEntry>, SourceError>;
}

#[async_trait]
impl Load for Source {
    async fn load(&self) -> Result<Vec<SourceEntry>, SourceError> {
        match self {
            Source::Local(local) => local::load(local).await,
            Source::Backstage(config) => backstage::load(config).await,
            Source::Inline(inline) => inline::load(inline),
        }
    }
}
