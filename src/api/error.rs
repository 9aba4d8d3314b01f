//! Server Error Types

use thiserror::Error;

/// Errors that stop the server from starting or running
#[derive(Error, Debug)]
pub enum ServerError {
    /// Binding or accepting failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for server operations
pub type ServerResult<T> = Result<T, ServerError>;
