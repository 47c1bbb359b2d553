use std::io;
use thiserror::Error;

/// Failure of an external tool the compiler drives.
#[derive(Error, Debug)]
pub enum CollaboratorError {
    #[error("{tool} not found: {hint}")]
    NotFound { tool: &'static str, hint: String },

    #[error("{tool} timed out after {seconds}s")]
    Timeout { tool: &'static str, seconds: u64 },

    #[error("{tool} I/O error: {source}")]
    Io {
        tool: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("{tool} failed: {message}")]
    Failed { tool: &'static str, message: String },
}

pub type CollaboratorResult<T> = Result<T, CollaboratorError>;
