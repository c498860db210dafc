//! The `backstage` command: sync a Backstage software catalog without
//! writing a config file. Builds the equivalent single-pipeline config and
//! hands it to the sync core.

use std::collections::HashMap;
use std::sync::Arc;

use catsync_core::{
    AttributeDefinition, Credential, EntrySource, Output, Pipeline, Source, SourceBackstage,
    SyncConfig,
};
use clap::Args;

use crate::commands::sync::{run_and_report, ApiArgs, RunOptions};
use crate::error::CliResult;

#[derive(Debug, Args)]
pub struct BackstageArgs {
    #[command(flatten)]
    pub api: ApiArgs,

    /// Endpoint of the Backstage entities API
    #[arg(
        long,
        env = "BACKSTAGE_ENDPOINT",
        default_value = "http://localhost:7007/api/catalog/entities/by-query"
    )]
    pub backstage_endpoint: String,

    /// Token for the Backstage entities API. Optional
    #[arg(long, env = "BACKSTAGE_TOKEN", default_value = "", hide_env_values = true)]
    pub backstage_token: String,

    /// Whether to sign the provided Backstage token into a JWT
    #[arg(
        long,
        env = "BACKSTAGE_SIGN_JWT",
        default_value_t = true,
        action = clap::ArgAction::Set,
        num_args = 0..=1,
        default_missing_value = "true"
    )]
    pub backstage_sign_jwt: bool,

    /// Query filters for the Backstage entities API
    #[arg(long, env = "BACKSTAGE_FILTERS", default_value = "")]
    pub filters: String,

    /// Page size for the Backstage entities API
    #[arg(long, env = "BACKSTAGE_LIMIT", default_value_t = 0)]
    pub limit: u32,

    /// Initial offset for the Backstage entities API
    #[arg(long, env = "BACKSTAGE_OFFSET", default_value_t = 0)]
    pub offset: u32,

    /// Sync id scoping the imported types
    #[arg(long, default_value = "backstage")]
    pub sync_id: String,

    /// Remove catalog types that are no longer in the config
    #[arg(long)]
    pub prune: bool,

    /// Plan and report without issuing any writes
    #[arg(long)]
    pub dry_run: bool,
}

pub async fn execute(args: BackstageArgs) -> CliResult<()> {
    let config = build_config(&args);
    println!("✔ Built single-pipeline Backstage config (sync_id={})", config.sync_id);

    let client = Arc::new(args.api.client()?);
    println!("✔ Connected to catalog API ({})", args.api.api_endpoint);

    let options = RunOptions {
        prune: args.prune,
        dry_run: args.dry_run,
    };
    run_and_report(client, &config, &options).await
}

/// The equivalent of a config file with one Backstage source and one
/// generic entity output.
fn build_config(args: &BackstageArgs) -> SyncConfig {
    SyncConfig {
        sync_id: args.sync_id.clone(),
        pipelines: vec![Pipeline {
            sources: vec![Source::Backstage(SourceBackstage {
                endpoint: args.backstage_endpoint.clone(),
                token: Credential::new(args.backstage_token.clone()),
                sign_jwt: Some(args.backstage_sign_jwt),
                filters: args.filters.clone(),
                limit: args.limit,
                offset: args.offset,
            })],
            outputs: vec![backstage_output()],
        }],
    }
}

fn backstage_output() -> Output {
    Output {
        name: "Backstage Entity".to_string(),
        description: "Entities imported from the Backstage software catalog".to_string(),
        type_name: "backstage_entity".to_string(),
        source_filter: None,
        attributes: vec![
            AttributeDefinition {
                id: "kind".to_string(),
                name: "Kind".to_string(),
                data_type: "string".to_string(),
                array: false,
                required: true,
            },
            AttributeDefinition {
                id: "api_version".to_string(),
                name: "API version".to_string(),
                data_type: "string".to_string(),
                array: false,
                required: false,
            },
        ],
        entry_source: EntrySource {
            external_id: "metadata.uid".to_string(),
            name: "metadata.name".to_string(),
            rank: None,
            aliases: vec![],
            values: HashMap::from([
                ("kind".to_string(), "kind".to_string()),
                ("api_version".to_string(), "apiVersion".to_string()),
            ]),
        },
    }
}
