//! Entry reconciliation: list, plan, execute.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use catsync_catalog::{
    is_managed_by, managed_annotations, CatalogClient, CatalogError, CatalogType,
    CreateEntryRequest, UpdateEntryRequest,
};
use catsync_output::EntryModel;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::error::{ItemFailure, Operation, ReconcileError};
use crate::plan::{plan_entries, EntriesPlan};
use crate::progress::Reporter;

/// Default width of the worker pool executing entry operations.
pub const DEFAULT_WORKER_WIDTH: usize = 5;

/// Progress of one type through reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Listing,
    Planning,
    Deleting,
    Creating,
    Updating,
    Done,
    Failed,
}

/// Result of reconciling one type's entries.
#[derive(Debug)]
pub struct EntrySyncOutcome {
    pub type_name: String,
    pub state: SyncState,
    pub deleted: usize,
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    /// Operations the plan wanted to issue.
    pub planned: usize,
    /// Per-item failures. Non-fatal: the run continues, but a non-empty
    /// list makes the whole sync exit non-zero.
    pub failures: Vec<ItemFailure>,
}

impl EntrySyncOutcome {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Reconciles the entries of a single catalog type.
pub struct EntryReconciler {
    width: usize,
    dry_run: bool,
}

impl EntryReconciler {
    pub fn new() -> Self {
        Self {
            width: DEFAULT_WORKER_WIDTH,
            dry_run: false,
        }
    }

    /// Override the worker pool width.
    #[must_use]
    pub fn with_width(mut self, width: usize) -> Self {
        self.width = width.max(1);
        self
    }

    /// Plan and report without issuing any writes.
    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Converge the remote entries of `catalog_type` to `desired`.
    ///
    /// Phases run strictly delete → create → update; within a phase,
    /// operations fan out over a bounded worker pool in external-id order.
    /// Per-item failures accumulate in the outcome; only list failures and
    /// authentication failures are fatal.
    pub async fn reconcile(
        &self,
        client: Arc<dyn CatalogClient>,
        catalog_type: &CatalogType,
        desired: Vec<EntryModel>,
        sync_id: &str,
        reporter: Arc<dyn Reporter>,
    ) -> Result<EntrySyncOutcome, ReconcileError> {
        let type_name = catalog_type.type_name.clone();

        debug!(%type_name, state = ?SyncState::Listing, "reconciling entries");
        let remote = client
            .list_entries(&catalog_type.id)
            .await
            .map_err(|source| ReconcileError::Listing {
                type_name: type_name.clone(),
                source,
            })?;

        // Fail closed: only entries annotated with this sync id are ours to
        // touch, whatever else lives under the type.
        let managed: Vec<_> = remote
            .into_iter()
            .filter(|entry| is_managed_by(&entry.annotations, sync_id))
            .collect();

        debug!(%type_name, state = ?SyncState::Planning, managed = managed.len(), "planning");
        let plan = plan_entries(&desired, &managed);
        let unchanged = plan.unchanged;
        let planned = plan.operations();

        if self.dry_run {
            return Ok(self.dry_run_outcome(type_name, plan, reporter.as_ref()));
        }

        let EntriesPlan {
            to_delete,
            to_create,
            to_update,
            ..
        } = plan;
        let (deletes, creates, updates) = (to_delete.len(), to_create.len(), to_update.len());
        let cancelled = Arc::new(AtomicBool::new(false));
        let mut failures = Vec::new();

        debug!(%type_name, state = ?SyncState::Deleting, total = deletes, "executing phase");
        let client_ref = client.clone();
        failures.extend(
            self.run_phase(Operation::Delete, to_delete, &reporter, &cancelled, |entry| {
                let client = client_ref.clone();
                let external_id = entry.external_id.clone();
                (external_id, async move { client.destroy_entry(&entry.id).await })
            })
            .await,
        );
        self.check_cancelled(&type_name, &cancelled)?;

        debug!(%type_name, state = ?SyncState::Creating, total = creates, "executing phase");
        let client_ref = client.clone();
        let type_id = catalog_type.id.clone();
        let annotations_sync_id = sync_id.to_string();
        failures.extend(
            self.run_phase(Operation::Create, to_create, &reporter, &cancelled, |model| {
                let client = client_ref.clone();
                let external_id = model.external_id.clone();
                let request = CreateEntryRequest {
                    catalog_type_id: type_id.clone(),
                    external_id: model.external_id,
                    name: model.name,
                    rank: model.rank,
                    aliases: model.aliases,
                    attribute_values: model.attribute_values,
                    annotations: managed_annotations(&annotations_sync_id),
                };
                (external_id, async move {
                    client.create_entry(request).await.map(|_| ())
                })
            })
            .await,
        );
        self.check_cancelled(&type_name, &cancelled)?;

        debug!(%type_name, state = ?SyncState::Updating, total = updates, "executing phase");
        let client_ref = client.clone();
        let annotations_sync_id = sync_id.to_string();
        failures.extend(
            self.run_phase(Operation::Update, to_update, &reporter, &cancelled, |update| {
                let client = client_ref.clone();
                let crate::plan::PlannedUpdate { id, model } = update;
                let external_id = model.external_id.clone();
                let request = UpdateEntryRequest {
                    external_id: model.external_id,
                    name: model.name,
                    rank: model.rank,
                    aliases: model.aliases,
                    attribute_values: model.attribute_values,
                    annotations: managed_annotations(&annotations_sync_id),
                };
                (external_id, async move {
                    client.update_entry(&id, request).await.map(|_| ())
                })
            })
            .await,
        );
        self.check_cancelled(&type_name, &cancelled)?;

        if !failures.is_empty() {
            warn!(
                %type_name,
                failed = failures.len(),
                planned,
                "entry reconciliation completed with failures"
            );
        }

        let failed_by = |operation: Operation| {
            failures
                .iter()
                .filter(|failure| failure.operation == operation)
                .count()
        };

        debug!(%type_name, state = ?SyncState::Done, "entries reconciled");
        Ok(EntrySyncOutcome {
            deleted: deletes - failed_by(Operation::Delete),
            created: creates - failed_by(Operation::Create),
            updated: updates - failed_by(Operation::Update),
            unchanged,
            planned,
            failures,
            state: SyncState::Done,
            type_name,
        })
    }

    /// Report the plan totals without touching the remote catalog.
    fn dry_run_outcome(
        &self,
        type_name: String,
        plan: EntriesPlan,
        reporter: &dyn Reporter,
    ) -> EntrySyncOutcome {
        reporter.on_delete_start(plan.to_delete.len());
        reporter.on_create_start(plan.to_create.len());
        reporter.on_update_start(plan.to_update.len());

        EntrySyncOutcome {
            deleted: plan.to_delete.len(),
            created: plan.to_create.len(),
            updated: plan.to_update.len(),
            unchanged: plan.unchanged,
            planned: plan.operations(),
            failures: Vec::new(),
            state: SyncState::Done,
            type_name,
        }
    }

    fn check_cancelled(
        &self,
        type_name: &str,
        cancelled: &AtomicBool,
    ) -> Result<(), ReconcileError> {
        if cancelled.load(Ordering::SeqCst) {
            debug!(%type_name, state = ?SyncState::Failed, "aborting after fatal error");
            return Err(ReconcileError::Fatal {
                type_name: type_name.to_string(),
                message: "authentication failed, abandoning remaining phases".to_string(),
            });
        }
        Ok(())
    }

    /// Execute one phase over the bounded worker pool.
    ///
    /// Items are submitted in the order given (already sorted by external
    /// id); completion order is not guaranteed. A fatal error flips
    /// `cancelled`, which stops further submissions while in-flight
    /// requests finish and have their outcomes recorded.
    async fn run_phase<T, F, Fut>(
        &self,
        operation: Operation,
        items: Vec<T>,
        reporter: &Arc<dyn Reporter>,
        cancelled: &Arc<AtomicBool>,
        make: F,
    ) -> Vec<ItemFailure>
    where
        T: Send + 'static,
        F: Fn(T) -> (String, Fut),
        Fut: std::future::Future<Output = Result<(), CatalogError>> + Send + 'static,
    {
        match operation {
            Operation::Delete => reporter.on_delete_start(items.len()),
            Operation::Create => reporter.on_create_start(items.len()),
            Operation::Update => reporter.on_update_start(items.len()),
        }

        let semaphore = Arc::new(Semaphore::new(self.width));
        let failures: Arc<Mutex<Vec<ItemFailure>>> = Arc::new(Mutex::new(Vec::new()));
        let mut join_set = JoinSet::new();

        for item in items {
            if cancelled.load(Ordering::SeqCst) {
                break;
            }
            let Ok(permit) = semaphore.clone().acquire_owned().await else {
                break;
            };

            let (external_id, future) = make(item);
            let reporter = reporter.clone();
            let failures = failures.clone();
            let cancelled = cancelled.clone();

            join_set.spawn(async move {
                let result = future.await;
                drop(permit);

                match operation {
                    Operation::Delete => reporter.on_delete_progress(),
                    Operation::Create => reporter.on_create_progress(),
                    Operation::Update => reporter.on_update_progress(),
                }

                if let Err(error) = result {
                    if error.is_auth() {
                        cancelled.store(true, Ordering::SeqCst);
                    }
                    warn!(%external_id, %operation, %error, "entry operation failed");
                    failures
                        .lock()
                        .unwrap_or_else(|poisoned| poisoned.into_inner())
                        .push(ItemFailure {
                            external_id,
                            operation,
                            error: error.to_string(),
                        });
                }
            });
        }

        while join_set.join_next().await.is_some() {}

        let mut failures = failures
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        std::mem::take(&mut *failures)
    }
}

impl Default for EntryReconciler {
    fn default() -> Self {
        Self::new()
    }
}
