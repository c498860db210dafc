//! The `sync` command: load config, converge types, converge entries.
//!
//! This is the orchestrator: pipelines run sequentially, type
//! reconciliation runs before any entry reconciliation, and a single sync
//! id scopes everything the run touches.

use std::path::PathBuf;
use std::sync::Arc;

use catsync_catalog::{is_managed_by, CatalogClient, HttpCatalogClient};
use catsync_core::{Credential, SourcedRecord, SyncConfig};
use catsync_output::{marshal_type, Projector};
use catsync_reconcile::{
    EntryReconciler, EntrySyncOutcome, Reporter, TypeReconciler,
};
use catsync_source::{FileLoader, Load};
use clap::Args;
use tracing::{debug, info};

use crate::error::{CliError, CliResult};
use crate::progress::TerminalReporter;

/// Catalog API connection flags, shared by every subcommand.
#[derive(Debug, Args)]
pub struct ApiArgs {
    /// Endpoint of the catalog API
    #[arg(long, env = "CATALOG_API_ENDPOINT", value_name = "URL")]
    pub api_endpoint: String,

    /// API key for the catalog API
    #[arg(long, env = "CATALOG_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,
}

impl ApiArgs {
    pub fn client(&self) -> CliResult<HttpCatalogClient> {
        Ok(HttpCatalogClient::new(
            &self.api_endpoint,
            self.api_key.clone().map(Credential::new),
        )?)
    }
}

#[derive(Debug, Args)]
pub struct SyncArgs {
    /// Config file in Jsonnet, YAML or JSON (e.g. importer.jsonnet)
    #[arg(long, value_name = "PATH")]
    pub config: PathBuf,

    #[command(flatten)]
    pub api: ApiArgs,

    /// Remove catalog types that are no longer in the config
    #[arg(long)]
    pub prune: bool,

    /// Plan and report without issuing any writes
    #[arg(long)]
    pub dry_run: bool,
}

pub async fn execute(args: SyncArgs) -> CliResult<()> {
    let config = FileLoader::new(&args.config).load()?;
    let (sources, outputs) = (
        config.pipelines.iter().map(|p| p.sources.len()).sum::<usize>(),
        config.outputs().len(),
    );
    println!(
        "✔ Loaded config ({} pipelines, {sources} sources, {outputs} outputs)",
        config.pipelines.len()
    );

    let client = Arc::new(args.api.client()?);
    println!("✔ Connected to catalog API ({})", args.api.api_endpoint);

    let options = RunOptions {
        prune: args.prune,
        dry_run: args.dry_run,
    };
    run_and_report(client, &config, &options).await
}

/// Run a sync and turn an unclean summary into a non-zero exit.
pub async fn run_and_report(
    client: Arc<dyn CatalogClient>,
    config: &SyncConfig,
    options: &RunOptions,
) -> CliResult<()> {
    let summary = run_sync(client, config, options, |_| {
        Arc::new(TerminalReporter::new()) as Arc<dyn Reporter>
    })
    .await?;

    if summary.is_clean() {
        println!("\n✔ Synced everything, catalog is up to date");
        Ok(())
    } else {
        Err(CliError::SyncFailed(summary.describe_failures()))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    pub prune: bool,
    pub dry_run: bool,
}

/// What a run did, unit by unit. A summary with any failure makes the run
/// exit non-zero, but every failure leaves sibling units untouched.
#[derive(Debug, Default)]
pub struct RunSummary {
    /// Type names destroyed by pruning.
    pub pruned: Vec<String>,

    /// Types whose reconciliation failed; their entries were skipped.
    pub type_failures: Vec<String>,

    /// Pipelines that failed before projection (source or parse errors).
    pub pipeline_failures: Vec<String>,

    /// Outputs that failed projection or fatally failed reconciliation.
    pub output_failures: Vec<String>,

    /// Entry reconciliation outcomes, one per converged output.
    pub outcomes: Vec<EntrySyncOutcome>,
}

impl RunSummary {
    pub fn is_clean(&self) -> bool {
        self.type_failures.is_empty()
            && self.pipeline_failures.is_empty()
            && self.output_failures.is_empty()
            && self.outcomes.iter().all(EntrySyncOutcome::is_clean)
    }

    pub fn describe_failures(&self) -> String {
        let mut lines = Vec::new();
        for failure in &self.type_failures {
            lines.push(format!("  type: {failure}"));
        }
        for failure in &self.pipeline_failures {
            lines.push(format!("  pipeline: {failure}"));
        }
        for failure in &self.output_failures {
            lines.push(format!("  output: {failure}"));
        }
        for outcome in &self.outcomes {
            for failure in &outcome.failures {
                lines.push(format!(
                    "  entry {} ({}): {} failed: {}",
                    failure.external_id, outcome.type_name, failure.operation, failure.error
                ));
            }
        }
        lines.join("\n")
    }
}

/// The orchestrator core, generic over the client so tests can drive it
/// against the in-memory catalog.
pub async fn run_sync(
    client: Arc<dyn CatalogClient>,
    config: &SyncConfig,
    options: &RunOptions,
    make_reporter: impl Fn(&str) -> Arc<dyn Reporter>,
) -> CliResult<RunSummary> {
    // Surface config errors (duplicate type names included) before any
    // network call.
    config.validate()?;

    let mut summary = RunSummary::default();

    // Load the remote types once and keep only the ones we own.
    let all_types = client.list_types().await?;
    let existing: Vec<_> = all_types
        .iter()
        .filter(|catalog_type| {
            let managed = is_managed_by(&catalog_type.annotations, &config.sync_id);
            if !managed {
                debug!(
                    type_name = %catalog_type.type_name,
                    "ignoring catalog type not managed by this importer"
                );
            }
            managed
        })
        .cloned()
        .collect();
    println!(
        "✔ Found {} catalog types, with {} that match our sync ID ({})",
        all_types.len(),
        existing.len(),
        config.sync_id
    );

    // Types first: entries cannot be written until schemas exist.
    let desired_types: Vec<_> = config.outputs().iter().map(|o| marshal_type(o)).collect();
    let type_outcome = TypeReconciler::new()
        .with_prune(options.prune)
        .with_dry_run(options.dry_run)
        .reconcile(client.clone(), &config.sync_id, &desired_types, existing)
        .await;

    if options.prune {
        println!("\n↻ Prune enabled (--prune), removing types that are no longer in config...");
        if type_outcome.pruned.is_empty() {
            println!("  ✔ Nothing to remove!");
        }
        for type_name in &type_outcome.pruned {
            println!("  ⌫ {type_name}");
        }
    }
    for failure in &type_outcome.failures {
        summary
            .type_failures
            .push(format!("{}: {}", failure.type_name, failure.error));
    }
    summary.pruned = type_outcome.pruned.clone();

    let projector = Projector::new();
    for (pipeline_idx, pipeline) in config.pipelines.iter().enumerate() {
        println!("\n↻ Syncing pipeline {}...", pipeline_idx + 1);

        // Sources load sequentially; a failure poisons this pipeline only.
        let records = match load_pipeline_records(pipeline).await {
            Ok(records) => records,
            Err(message) => {
                summary
                    .pipeline_failures
                    .push(format!("pipelines.{pipeline_idx}: {message}"));
                continue;
            }
        };

        for output in &pipeline.outputs {
            println!("\n    ↻ {}", output.type_name);

            let models = match projector
                .collect(output, &records)
                .and_then(|collected| {
                    println!(
                        "      ✔ Building entries... (found {} entries matching filters)",
                        collected.len()
                    );
                    projector.marshal_entries(output, &collected)
                }) {
                Ok(models) => models,
                Err(e) => {
                    summary
                        .output_failures
                        .push(format!("{}: {e}", output.type_name));
                    continue;
                }
            };

            let Some(catalog_type) = type_outcome.types.get(&output.type_name) else {
                if options.dry_run {
                    println!(
                        "      ✔ Would create type and {} entries (dry-run)",
                        models.len()
                    );
                } else {
                    // Type reconciliation failed for this output; already
                    // recorded above, skip its entries.
                    println!("      ✘ Skipping entries, type failed to reconcile");
                }
                continue;
            };

            info!(type_name = %output.type_name, desired = models.len(), "reconciling catalog entries");
            let reporter = make_reporter(&output.type_name);
            let result = EntryReconciler::new()
                .with_dry_run(options.dry_run)
                .reconcile(
                    client.clone(),
                    catalog_type,
                    models,
                    &config.sync_id,
                    reporter,
                )
                .await;

            match result {
                Ok(outcome) => summary.outcomes.push(outcome),
                Err(e) => summary
                    .output_failures
                    .push(format!("{}: {e}", output.type_name)),
            }
        }
    }

    Ok(summary)
}

/// Load and parse every source of a pipeline, in order.
async fn load_pipeline_records(
    pipeline: &catsync_core::Pipeline,
) -> Result<Vec<SourcedRecord>, String> {
    let mut records = Vec::new();
    for source in &pipeline.sources {
        let entries = source
            .load()
            .await
            .map_err(|e| format!("loading entries from source {source}: {e}"))?;

        for entry in &entries {
            records.extend(entry.records().map_err(|e| e.to_string())?);
        }
        println!("    ✔ {source} (found {} entries)", records.len());
    }
    Ok(records)
}
