//! CLI error types and exit codes.

use catsync_catalog::CatalogError;
use catsync_core::ConfigError;
use catsync_source::LoadConfigError;
use thiserror::Error;

/// Exit codes for the CLI
/// - 0: Success
/// - 1: Sync completed but some units failed to converge
/// - 2: Configuration error
/// - 3: Catalog API unreachable or rejected us
pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Catalog API error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Sync completed with failures:\n{0}")]
    SyncFailed(String),
}

impl CliError {
    /// Get the exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::SyncFailed(_) => 1,
            CliError::Config(_) => 2,
            CliError::Catalog(_) => 3,
        }
    }

    /// Print the error to stderr with appropriate formatting.
    pub fn print(&self) {
        let use_color = std::env::var("NO_COLOR").is_err();

        if use_color {
            eprintln!("\x1b[31mError:\x1b[0m {self}");
        } else {
            eprintln!("Error: {self}");
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Config(e.to_string())
    }
}

impl From<LoadConfigError> for CliError {
    fn from(e: LoadConfigError) -> Self {
        CliError::Config(e.to_string())
    }
}
