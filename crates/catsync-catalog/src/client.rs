//! The client seam the reconcilers are written against.

use async_trait::async_trait;

use crate::error::CatalogError;
use crate::types::{
    CatalogEntry, CatalogType, CatalogTypeAttribute, CreateEntryRequest, CreateTypeRequest,
    UpdateEntryRequest, UpdateTypeRequest,
};

/// Typed operations of the catalog API.
///
/// All listing operations return the full materialised set; paging is an
/// implementation concern of the client.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    async fn list_types(&self) -> Result<Vec<CatalogType>, CatalogError>;

    async fn create_type(&self, request: CreateTypeRequest) -> Result<CatalogType, CatalogError>;

    async fn update_type(
        &self,
        id: &str,
        request: UpdateTypeRequest,
    ) -> Result<CatalogType, CatalogError>;

    /// Replace a type's attribute schema. `version` is the schema version
    /// just observed by the caller and acts as the optimistic-concurrency
    /// token; a stale version is a conflict.
    async fn update_type_schema(
        &self,
        id: &str,
        version: i64,
        attributes: Vec<CatalogTypeAttribute>,
    ) -> Result<CatalogType, CatalogError>;

    async fn destroy_type(&self, id: &str) -> Result<(), CatalogError>;

    async fn list_entries(&self, type_id: &str) -> Result<Vec<CatalogEntry>, CatalogError>;

    async fn create_entry(&self, request: CreateEntryRequest)
        -> Result<CatalogEntry, CatalogError>;

    async fn update_entry(
        &self,
        id: &str,
        request: UpdateEntryRequest,
    ) -> Result<CatalogEntry, CatalogError>;

    async fn destroy_entry(&self, id: &str) -> Result<(), CatalogError>;
}
