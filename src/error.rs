//! Error taxonomy for the collectors.
//!
//! Every failure in a collector ends the sampler loop and becomes the process
//! exit status. Codes follow the BSD `sysexits.h` convention.

use std::io;

use crate::store::StoreError;
use crate::sysexits;

/// Errors raised while fetching, normalizing or persisting one poll cycle.
#[derive(Debug, thiserror::Error)]
pub enum CollectError {
    /// The external command could not be run or exited non-zero.
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    /// The command output (or a node name) could not be interpreted.
    #[error("parse failed: {0}")]
    Parse(String),

    /// Inserting or committing a batch failed.
    #[error("write failed: {0}")]
    Write(#[source] StoreError),

    /// Closing the store during shutdown failed.
    #[error("I/O error: {0}")]
    Io(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl CollectError {
    /// Process exit status for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CollectError::Fetch(_) => sysexits::EX_UNAVAILABLE,
            CollectError::Parse(_) => sysexits::EX_DATAERR,
            CollectError::Write(_) => sysexits::EX_IOERR,
            CollectError::Io(_) => sysexits::EX_IOERR,
            CollectError::Config(_) => sysexits::EX_CONFIG,
        }
    }
}

impl From<serde_json::Error> for CollectError {
    fn from(e: serde_json::Error) -> Self {
        CollectError::Parse(format!("invalid JSON: {}", e))
    }
}

/// Failures of an external command invocation.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("command '{program}' not found")]
    NotFound { program: String },

    #[error("command '{program}' could not be started: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("command '{program}' exited with status {status}: {stderr}")]
    Exit {
        program: String,
        status: i32,
        stderr: String,
    },
}
