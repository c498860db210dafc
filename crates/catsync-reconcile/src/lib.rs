//! # catsync reconciliation
//!
//! Converges the remote catalog to the desired state. The type reconciler
//! makes sure every declared type exists with the right schema (and prunes
//! abandoned managed types when asked to); the entry reconciler diffs
//! desired entry models against the remote set and issues the minimum
//! delete/create/update plan with bounded concurrency.
//!
//! Ownership is annotation-scoped and fail-closed: nothing is mutated
//! without first checking the object carries this run's sync id.

pub mod entries;
pub mod error;
pub mod plan;
pub mod progress;
pub mod types;

pub use entries::{EntryReconciler, EntrySyncOutcome, SyncState, DEFAULT_WORKER_WIDTH};
pub use error::{ItemFailure, Operation, ReconcileError};
pub use plan::{plan_entries, EntriesPlan, PlannedUpdate};
pub use progress::{NullReporter, ProgressEvent, RecordingReporter, Reporter};
pub use types::{TypeFailure, TypeReconciler, TypeSyncOutcome};
