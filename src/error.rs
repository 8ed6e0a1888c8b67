//! Harness error types
//!
//! Fatal conditions only: assertion mismatches are report data, not
//! errors, so one bad assertion never masks its siblings.

use thiserror::Error;

/// Result type for harness operations
pub type HarnessResult<T> = Result<T, HarnessError>;

/// Fatal harness errors
#[derive(Error, Debug)]
pub enum HarnessError {
    /// Engine process could not be spawned
    #[error("failed to spawn engine process: {0}")]
    Spawn(#[source] std::io::Error),

    /// No unused local port could be reserved
    #[error("failed to reserve a local port: {0}")]
    Port(#[source] std::io::Error),

    /// Engine never accepted a connection within the retry budget
    #[error("engine not reachable after {attempts} attempt(s): {source}")]
    Connect {
        attempts: u32,
        #[source]
        source: mysql_async::Error,
    },

    /// CREATE DATABASE for a non-default target failed
    #[error("CREATE DATABASE {database} failed: {source}")]
    CreateDatabase {
        database: String,
        #[source]
        source: mysql_async::Error,
    },

    /// A setup statement errored; setup errors are never tolerated
    #[error("setup statement {statement:?} failed in script {script:?}: {source}")]
    Setup {
        script: String,
        statement: String,
        #[source]
        source: mysql_async::Error,
    },

    /// A wire value could not be converted to the harness data model
    #[error("cannot decode result value: {0}")]
    Decode(String),

    /// A focused script was detected while running under CI
    #[error(
        "script {script:?} is focused but the CI environment variable is set; \
         focus mode must not narrow a CI run"
    )]
    FocusInCi { script: String },

    /// The caller cancelled the script's execution context
    #[error("script execution cancelled")]
    Cancelled,

    /// Any other wire protocol failure
    #[error("wire protocol error: {0}")]
    Protocol(#[from] mysql_async::Error),
}
