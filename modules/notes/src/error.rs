//! Error types for the notes service.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Failures surfaced by `NoteStore` operations
#[derive(Debug, Error)]
pub enum NoteError {
    #[error("Invalid note name: {0:?}")]
    InvalidKey(String),

    #[error("Not found")]
    NotFound,

    #[error("Note already exists")]
    AlreadyExists,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type NoteResult<T> = Result<T, NoteError>;

impl NoteError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            NoteError::InvalidKey(_) | NoteError::AlreadyExists => StatusCode::BAD_REQUEST,
            NoteError::NotFound => StatusCode::NOT_FOUND,
            NoteError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for NoteError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            log::error!("[NOTES] {}", self);
            // Filesystem details stay in the log
            return (status, "Internal server error").into_response();
        }
        (status, self.to_string()).into_response()
    }
}

/// Startup failures returned from `main`
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
