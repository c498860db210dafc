//! Type reconciliation: prune, create missing, sync schemas.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use catsync_catalog::{
    is_managed_by, managed_annotations, CatalogClient, CatalogType, CreateTypeRequest,
    UpdateTypeRequest,
};
use catsync_output::DesiredType;
use tracing::{debug, warn};

/// A type whose reconciliation failed. Fatal for that type only: its entry
/// reconciliation is skipped and the other types proceed.
#[derive(Debug, Clone)]
pub struct TypeFailure {
    pub type_name: String,
    pub error: String,
}

/// Result of type reconciliation.
#[derive(Debug, Default)]
pub struct TypeSyncOutcome {
    /// Converged types by type name, each carrying its server id and fresh
    /// schema. Entry reconciliation runs only for types present here.
    pub types: HashMap<String, CatalogType>,

    /// Type names destroyed (or, in dry-run, that would be destroyed).
    pub pruned: Vec<String>,

    pub failures: Vec<TypeFailure>,
}

/// Ensures the remote catalog contains each declared type with the correct
/// schema, optionally pruning managed types that left the config.
pub struct TypeReconciler {
    prune: bool,
    dry_run: bool,
}

impl TypeReconciler {
    pub fn new() -> Self {
        Self {
            prune: false,
            dry_run: false,
        }
    }

    /// Remove managed types that are no longer in the configuration.
    #[must_use]
    pub fn with_prune(mut self, prune: bool) -> Self {
        self.prune = prune;
        self
    }

    /// Plan without issuing writes. Types that do not exist yet stay out of
    /// the outcome, so their entry counts are reported by the caller.
    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Converge remote types to the desired set. `existing` must already be
    /// filtered to types managed by this sync id.
    pub async fn reconcile(
        &self,
        client: Arc<dyn CatalogClient>,
        sync_id: &str,
        desired: &[DesiredType],
        existing: Vec<CatalogType>,
    ) -> TypeSyncOutcome {
        let mut outcome = TypeSyncOutcome::default();
        let desired_names: HashSet<&str> =
            desired.iter().map(|d| d.type_name.as_str()).collect();

        let mut existing_by_name: HashMap<String, CatalogType> = existing
            .into_iter()
            .map(|catalog_type| (catalog_type.type_name.clone(), catalog_type))
            .collect();

        if self.prune {
            self.prune_types(&client, sync_id, &desired_names, &existing_by_name, &mut outcome)
                .await;
        }

        // Create the types that do not exist yet.
        for desired_type in desired {
            if existing_by_name.contains_key(&desired_type.type_name) {
                continue;
            }
            if self.dry_run {
                continue;
            }

            debug!(type_name = %desired_type.type_name, "creating missing catalog type");
            match client
                .create_type(CreateTypeRequest {
                    name: desired_type.name.clone(),
                    description: desired_type.description.clone(),
                    type_name: desired_type.type_name.clone(),
                    annotations: managed_annotations(sync_id),
                })
                .await
            {
                Ok(created) => {
                    existing_by_name.insert(created.type_name.clone(), created);
                }
                Err(error) => outcome.failures.push(TypeFailure {
                    type_name: desired_type.type_name.clone(),
                    error: error.to_string(),
                }),
            }
        }

        // Sync name, description and schema for every desired type,
        // including the ones just created.
        for desired_type in desired {
            let Some(current) = existing_by_name.get(&desired_type.type_name) else {
                continue;
            };

            if self.dry_run {
                outcome
                    .types
                    .insert(desired_type.type_name.clone(), current.clone());
                continue;
            }

            match self.sync_one(&client, sync_id, desired_type, current).await {
                Ok(synced) => {
                    outcome.types.insert(desired_type.type_name.clone(), synced);
                }
                Err(error) => outcome.failures.push(TypeFailure {
                    type_name: desired_type.type_name.clone(),
                    error,
                }),
            }
        }

        outcome
    }

    async fn prune_types(
        &self,
        client: &Arc<dyn CatalogClient>,
        sync_id: &str,
        desired_names: &HashSet<&str>,
        existing_by_name: &HashMap<String, CatalogType>,
        outcome: &mut TypeSyncOutcome,
    ) {
        let mut to_prune: Vec<&CatalogType> = existing_by_name
            .values()
            .filter(|catalog_type| !desired_names.contains(catalog_type.type_name.as_str()))
            .collect();
        to_prune.sort_by(|a, b| a.type_name.cmp(&b.type_name));

        for catalog_type in to_prune {
            // Fail closed: never destroy anything whose annotations do not
            // name this sync id, whatever the caller passed in.
            if !is_managed_by(&catalog_type.annotations, sync_id) {
                warn!(
                    type_name = %catalog_type.type_name,
                    "refusing to prune type without our sync-id annotation"
                );
                continue;
            }

            if self.dry_run {
                outcome.pruned.push(catalog_type.type_name.clone());
                continue;
            }

            debug!(type_name = %catalog_type.type_name, "pruning catalog type no longer in config");
            match client.destroy_type(&catalog_type.id).await {
                Ok(()) => outcome.pruned.push(catalog_type.type_name.clone()),
                Err(error) => outcome.failures.push(TypeFailure {
                    type_name: catalog_type.type_name.clone(),
                    error: error.to_string(),
                }),
            }
        }
    }

    /// Update one type's metadata, then its schema using the version just
    /// observed as the concurrency token.
    async fn sync_one(
        &self,
        client: &Arc<dyn CatalogClient>,
        sync_id: &str,
        desired_type: &DesiredType,
        current: &CatalogType,
    ) -> Result<CatalogType, String> {
        let updated = client
            .update_type(
                &current.id,
                UpdateTypeRequest {
                    name: desired_type.name.clone(),
                    description: desired_type.description.clone(),
                    type_name: desired_type.type_name.clone(),
                    annotations: managed_annotations(sync_id),
                },
            )
            .await
            .map_err(|e| format!("updating catalog type: {e}"))?;

        client
            .update_type_schema(
                &updated.id,
                updated.schema.version,
                desired_type.attributes.clone(),
            )
            .await
            .map_err(|e| format!("updating catalog type schema: {e}"))
    }
}

impl Default for TypeReconciler {
    fn default() -> Self {
        Self::new()
    }
}
