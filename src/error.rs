// ABOUTME: Error types for configuration, drivers, and pair synchronization
// ABOUTME: Each variant names the endpoint or table involved so reports are self-explanatory

use std::path::PathBuf;
use thiserror::Error;

/// Configuration could not be loaded or failed validation.
///
/// Always fatal: the scheduler refuses to start when any pair is invalid.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse JSON config {path:?}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to parse TOML config {path:?}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("pair #{index} must have exactly two endpoints, found {found}")]
    EndpointCount { index: usize, found: usize },

    #[error("endpoint '{endpoint}': field '{field}' must not be empty")]
    MissingField {
        endpoint: String,
        field: &'static str,
    },

    #[error(
        "'{from}' sends {send} table(s) but '{to}' receives {receive}; \
         send and receive lists must line up positionally"
    )]
    TableCountMismatch {
        from: String,
        to: String,
        send: usize,
        receive: usize,
    },

    #[error("endpoint '{endpoint}': invalid table name '{table}': {reason}")]
    InvalidTable {
        endpoint: String,
        table: String,
        reason: String,
    },

    #[error("invalid schedule: {0}")]
    Schedule(String),
}

/// Failure reported by a database driver.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error(transparent)]
    Postgres(#[from] tokio_postgres::Error),

    #[error(transparent)]
    Tls(#[from] native_tls::Error),

    #[error("{0}")]
    Unsupported(String),

    #[error("{0}")]
    Other(String),
}

/// A single column value could not be rendered into an update fragment.
#[derive(Debug, Error)]
#[error("column {column}: value '{value}' is not numeric")]
pub struct TransformError {
    pub column: String,
    pub value: String,
}

/// Reading the latest rows from a source connection failed.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("failed to set session date format: {0}")]
    SessionSetup(#[source] DriverError),

    #[error("failed to read latest row from {table}: {source}")]
    Query {
        table: String,
        #[source]
        source: DriverError,
    },

    #[error("failed to build update for {table}: {source}")]
    Transform {
        table: String,
        #[source]
        source: TransformError,
    },
}

/// Applying a batch of statements to a destination failed; nothing was committed.
#[derive(Debug, Error)]
pub enum ApplyError {
    #[error("statement {index} failed: {source}")]
    Statement {
        index: usize,
        #[source]
        source: DriverError,
    },

    #[error("commit failed: {0}")]
    Commit(#[source] DriverError),
}

/// Errors that end a pair pass or one of its transfer directions.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("{endpoint} network is down: {reason}")]
    NetworkUnreachable { endpoint: String, reason: String },

    #[error("{endpoint} database connection failed: {source}")]
    Connection {
        endpoint: String,
        #[source]
        source: DriverError,
    },

    #[error("extraction from {endpoint} failed: {source}")]
    Extraction {
        endpoint: String,
        #[source]
        source: ExtractionError,
    },

    #[error("apply to {endpoint} failed: {source}")]
    Apply {
        endpoint: String,
        #[source]
        source: ApplyError,
    },
}
