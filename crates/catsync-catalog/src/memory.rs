//! In-memory catalog client.
//!
//! Backs the reconciler test-suites and dry-run style assertions: same
//! trait, same optimistic-concurrency semantics, no network. Failure
//! injection knobs let tests exercise per-item error isolation.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::client::CatalogClient;
use crate::error::CatalogError;
use crate::types::{
    CatalogEntry, CatalogType, CatalogTypeAttribute, CatalogTypeSchema, CreateEntryRequest,
    CreateTypeRequest, UpdateEntryRequest, UpdateTypeRequest,
};

/// Counts of write operations issued against the fake, for idempotence
/// assertions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperationCounts {
    pub type_creates: usize,
    pub type_updates: usize,
    pub type_schema_updates: usize,
    pub type_destroys: usize,
    pub entry_creates: usize,
    pub entry_updates: usize,
    pub entry_destroys: usize,
}

impl OperationCounts {
    /// Total entry-level writes.
    pub fn entry_writes(&self) -> usize {
        self.entry_creates + self.entry_updates + self.entry_destroys
    }
}

#[derive(Default)]
struct State {
    types: Vec<CatalogType>,
    entries: HashMap<String, Vec<CatalogEntry>>,
    next_id: u64,
    counts: OperationCounts,
    fail_entry_external_ids: HashSet<String>,
}

impl State {
    fn assign_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}_{:04}", self.next_id)
    }
}

/// In-memory [`CatalogClient`] implementation.
#[derive(Default)]
pub struct MemoryCatalogClient {
    state: Mutex<State>,
}

impl MemoryCatalogClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a type directly into the fake, returning its assigned id.
    pub fn seed_type(&self, mut catalog_type: CatalogType) -> String {
        let mut state = self.lock();
        if catalog_type.id.is_empty() {
            catalog_type.id = state.assign_id("type");
        }
        let id = catalog_type.id.clone();
        state.entries.entry(id.clone()).or_default();
        state.types.push(catalog_type);
        id
    }

    /// Seed an entry directly into the fake, returning its assigned id.
    pub fn seed_entry(&self, type_id: &str, mut entry: CatalogEntry) -> String {
        let mut state = self.lock();
        if entry.id.is_empty() {
            entry.id = state.assign_id("entry");
        }
        let id = entry.id.clone();
        state.entries.entry(type_id.to_string()).or_default().push(entry);
        id
    }

    /// Make every write touching an entry with this external id fail with a
    /// 422, so tests can exercise per-item failure isolation.
    pub fn fail_writes_for(&self, external_id: &str) {
        self.lock()
            .fail_entry_external_ids
            .insert(external_id.to_string());
    }

    pub fn counts(&self) -> OperationCounts {
        self.lock().counts.clone()
    }

    pub fn reset_counts(&self) {
        self.lock().counts = OperationCounts::default();
    }

    /// Current remote types, for convergence assertions.
    pub fn types(&self) -> Vec<CatalogType> {
        self.lock().types.clone()
    }

    /// Current remote entries of a type, for convergence assertions.
    pub fn entries(&self, type_id: &str) -> Vec<CatalogEntry> {
        self.lock().entries.get(type_id).cloned().unwrap_or_default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check_injected_failure(
        state: &State,
        external_id: &str,
    ) -> Result<(), CatalogError> {
        if state.fail_entry_external_ids.contains(external_id) {
            return Err(CatalogError::Api {
                status: 422,
                message: format!("injected failure for entry '{external_id}'"),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl CatalogClient for MemoryCatalogClient {
    async fn list_types(&self) -> Result<Vec<CatalogType>, CatalogError> {
        Ok(self.lock().types.clone())
    }

    async fn create_type(&self, request: CreateTypeRequest) -> Result<CatalogType, CatalogError> {
        let mut state = self.lock();
        state.counts.type_creates += 1;

        if state.types.iter().any(|t| t.type_name == request.type_name) {
            return Err(CatalogError::Api {
                status: 409,
                message: format!("type '{}' already exists", request.type_name),
            });
        }

        let id = state.assign_id("type");
        let catalog_type = CatalogType {
            id: id.clone(),
            type_name: request.type_name,
            name: request.name,
            description: request.description,
            schema: CatalogTypeSchema::default(),
            annotations: request.annotations,
        };
        state.entries.entry(id).or_default();
        state.types.push(catalog_type.clone());
        Ok(catalog_type)
    }

    async fn update_type(
        &self,
        id: &str,
        request: UpdateTypeRequest,
    ) -> Result<CatalogType, CatalogError> {
        let mut state = self.lock();
        state.counts.type_updates += 1;

        let catalog_type = state
            .types
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| not_found("catalog type", id))?;
        catalog_type.name = request.name;
        catalog_type.description = request.description;
        catalog_type.type_name = request.type_name;
        catalog_type.annotations = request.annotations;
        Ok(catalog_type.clone())
    }

    async fn update_type_schema(
        &self,
        id: &str,
        version: i64,
        attributes: Vec<CatalogTypeAttribute>,
    ) -> Result<CatalogType, CatalogError> {
        let mut state = self.lock();
        state.counts.type_schema_updates += 1;

        let catalog_type = state
            .types
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| not_found("catalog type", id))?;
        if catalog_type.schema.version != version {
            return Err(CatalogError::Api {
                status: 409,
                message: format!(
                    "schema version conflict: have {}, got {version}",
                    catalog_type.schema.version
                ),
            });
        }

        catalog_type.schema = CatalogTypeSchema {
            version: version + 1,
            attributes,
        };
        Ok(catalog_type.clone())
    }

    async fn destroy_type(&self, id: &str) -> Result<(), CatalogError> {
        let mut state = self.lock();
        state.counts.type_destroys += 1;

        let before = state.types.len();
        state.types.retain(|t| t.id != id);
        if state.types.len() == before {
            return Err(not_found("catalog type", id));
        }
        state.entries.remove(id);
        Ok(())
    }

    async fn list_entries(&self, type_id: &str) -> Result<Vec<CatalogEntry>, CatalogError> {
        let state = self.lock();
        if !state.types.iter().any(|t| t.id == type_id) {
            return Err(not_found("catalog type", type_id));
        }
        Ok(state.entries.get(type_id).cloned().unwrap_or_default())
    }

    async fn create_entry(
        &self,
        request: CreateEntryRequest,
    ) -> Result<CatalogEntry, CatalogError> {
        let mut state = self.lock();
        state.counts.entry_creates += 1;

        Self::check_injected_failure(&state, &request.external_id)?;
        if !state.types.iter().any(|t| t.id == request.catalog_type_id) {
            return Err(not_found("catalog type", &request.catalog_type_id));
        }

        let id = state.assign_id("entry");
        let entry = CatalogEntry {
            id,
            external_id: request.external_id,
            name: request.name,
            rank: request.rank,
            aliases: request.aliases,
            attribute_values: request.attribute_values,
            annotations: request.annotations,
        };
        state
            .entries
            .entry(request.catalog_type_id)
            .or_default()
            .push(entry.clone());
        Ok(entry)
    }

    async fn update_entry(
        &self,
        id: &str,
        request: UpdateEntryRequest,
    ) -> Result<CatalogEntry, CatalogError> {
        let mut state = self.lock();
        state.counts.entry_updates += 1;

        Self::check_injected_failure(&state, &request.external_id)?;
        let entry = state
            .entries
            .values_mut()
            .flat_map(|entries| entries.iter_mut())
            .find(|entry| entry.id == id)
            .ok_or_else(|| not_found("catalog entry", id))?;

        entry.external_id = request.external_id;
        entry.name = request.name;
        entry.rank = request.rank;
        entry.aliases = request.aliases;
        entry.attribute_values = request.attribute_values;
        entry.annotations = request.annotations;
        Ok(entry.clone())
    }

    async fn destroy_entry(&self, id: &str) -> Result<(), CatalogError> {
        let mut state = self.lock();
        state.counts.entry_destroys += 1;

        let external_id = state
            .entries
            .values()
            .flat_map(|entries| entries.iter())
            .find(|entry| entry.id == id)
            .map(|entry| entry.external_id.clone())
            .ok_or_else(|| not_found("catalog entry", id))?;
        Self::check_injected_failure(&state, &external_id)?;

        for entries in state.entries.values_mut() {
            entries.retain(|entry| entry.id != id);
        }
        Ok(())
    }
}

fn not_found(kind: &str, id: &str) -> CatalogError {
    CatalogError::Api {
        status: 404,
        message: format!("{kind} '{id}' not found"),
    }
}
