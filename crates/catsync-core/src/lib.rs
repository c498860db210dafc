//! # catsync core
//!
//! Shared building blocks for the catsync importer: the configuration model
//! (sync id, pipelines, sources and outputs), the post-parse record shape,
//! and configuration-time validation.
//!
//! Everything in this crate is inert data. Loading sources, evaluating
//! expressions and talking to the catalog API live in the sibling crates;
//! they all consume the types defined here.

pub mod config;
pub mod credential;
pub mod error;
pub mod record;

pub use config::{
    AttributeDefinition, EntrySource, Output, Pipeline, Source, SourceBackstage, SourceInline,
    SourceLocal, SyncConfig,
};
pub use credential::Credential;
pub use error::ConfigError;
pub use record::{Record, SourcedRecord};
