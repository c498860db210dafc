//! Source and parse error types.

use thiserror::Error;

/// Error loading entries from a source. Fatal for the pipeline the source
/// belongs to; other pipelines proceed.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Reading a local file failed.
    #[error("reading {path}: {message}")]
    Io { path: String, message: String },

    /// A configured glob pattern does not parse.
    #[error("invalid glob pattern '{pattern}': {message}")]
    Pattern { pattern: String, message: String },

    /// Backstage answered with a non-2xx status.
    #[error("received error from Backstage: {status}")]
    BackstageStatus { status: String },

    /// The HTTP request itself failed.
    #[error("fetching Backstage entries: {message}")]
    Http { message: String },

    /// A signing token was configured but is not valid base64.
    #[error("supplied backstage token must be a base64 string: {message}")]
    TokenNotBase64 { message: String },

    /// Minting the Backstage JWT failed.
    #[error("signing backstage JWT: {message}")]
    Jwt { message: String },

    /// Re-encoding an upstream record as JSON failed.
    #[error("encoding source entry: {message}")]
    Encode { message: String },

    /// A source entry could not be parsed into records. Better to fail loud
    /// than to silently drop records.
    #[error("parsing source entry from {origin}: {source}")]
    Parse {
        origin: String,
        #[source]
        source: ParseError,
    },
}

/// Error parsing raw bytes into records. Never yields a partial record
/// list: it is a full result or a typed failure.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("parsing JSON: {message}")]
    Json { message: String },

    #[error("parsing YAML: {message}")]
    Yaml { message: String },

    #[error("evaluating Jsonnet: {message}")]
    Jsonnet { message: String },

    #[error("parsing CSV: {message}")]
    Csv { message: String },

    #[error("content is not valid UTF-8: {message}")]
    Encoding { message: String },

    /// The document parsed, but is not an object or an array of objects.
    #[error("document is not an object or an array of objects")]
    NotRecords,

    /// No filename hint and no format accepted the content.
    #[error("unable to detect format: {message}")]
    UnknownFormat { message: String },
}
