//! # catsync catalog client
//!
//! Typed access to the remote catalog API: list/create/update/destroy for
//! catalog types, type schemas and entries. The [`CatalogClient`] trait is
//! the seam the reconcilers are written against; [`HttpCatalogClient`] is
//! the production implementation with retries and backoff, and
//! [`MemoryCatalogClient`] is an in-memory stand-in used by tests.

pub mod annotations;
pub mod client;
pub mod error;
pub mod http;
pub mod memory;
pub mod retry;
pub mod types;

pub use annotations::{
    is_managed_by, managed_annotations, ANNOTATION_LAST_SYNC_AT, ANNOTATION_SYNC_ID,
    ANNOTATION_VERSION, CLIENT_VERSION,
};
pub use client::CatalogClient;
pub use error::CatalogError;
pub use http::HttpCatalogClient;
pub use memory::MemoryCatalogClient;
pub use retry::{RetryConfig, RetryExecutor};
pub use types::{
    AttributeValue, BoundValue, CatalogEntry, CatalogType, CatalogTypeAttribute,
    CatalogTypeSchema, CreateEntryRequest, CreateTypeRequest, UpdateEntryRequest,
    UpdateTypeRequest,
};
