//! Error types for the kbchat domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error type; bootstrap-phase errors
//! (`AuthError`, `TemplateLoadError`) halt session construction, while
//! per-turn errors (`RetrievalError`, `GenerationError`) are reported for
//! the turn and leave the session usable.

use std::path::PathBuf;
use thiserror::Error;

/// Session bootstrap error: everything that can stop a session from
/// becoming ready.
#[derive(Debug, Error)]
pub enum Error {
    // --- Credential exchange ---
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    // --- Prompt templates ---
    #[error("Template load error: {0}")]
    TemplateLoad(#[from] TemplateLoadError),

    // --- Service client construction ---
    #[error("Retrieval error: {0}")]
    Retrieval(#[from] RetrievalError),

    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Credential exchange failures. Fatal to session bootstrap.
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("No base credentials available: {0}")]
    MissingBaseCredentials(String),

    #[error("Role exchange rejected: {code}: {message} (status: {status_code})")]
    Rejected {
        status_code: u16,
        code: String,
        message: String,
    },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid credential response: {0}")]
    InvalidResponse(String),
}

/// The scoped session has passed its expiry. Fail closed until re-bootstrap.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Scoped session expired at {expired_at}")]
pub struct SessionExpired {
    pub expired_at: chrono::DateTime<chrono::Utc>,
}

/// Static prompt inputs missing or malformed. Fatal to session bootstrap.
#[derive(Debug, Error)]
pub enum TemplateLoadError {
    #[error("Template input not found: {path}")]
    Missing { path: PathBuf },

    #[error("Failed to read template input {path}: {reason}")]
    Unreadable { path: PathBuf, reason: String },

    #[error("Malformed template input {path}: {reason}")]
    Malformed { path: PathBuf, reason: String },
}

/// Knowledge-base search failures. Per-turn, never retried internally.
#[derive(Debug, Clone, Error)]
pub enum RetrievalError {
    #[error("Knowledge base request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Knowledge base throttled the request")]
    Throttled,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid knowledge base response: {0}")]
    InvalidResponse(String),

    #[error(transparent)]
    SessionExpired(#[from] SessionExpired),
}

/// Language-model invocation failures. Per-turn, never retried internally.
#[derive(Debug, Clone, Error)]
pub enum GenerationError {
    #[error("Model request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Model request throttled")]
    Throttled,

    #[error("Model quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("Model request rejected: {0}")]
    Rejected(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid model response: {0}")]
    InvalidResponse(String),

    #[error(transparent)]
    SessionExpired(#[from] SessionExpired),
}

/// Rendering a prompt template with a slot left unfilled.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("Template slot '{0}' was not provided")]
    MissingSlot(String),
}
