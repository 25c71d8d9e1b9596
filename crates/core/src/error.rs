//! Error types for the tabsplit domain.
//!
//! Uses `thiserror` for ergonomic error definitions. Each external model
//! call (extraction, interpretation, audit) has its own failure taxonomy:
//! all three are terminal for the operation that triggered them and none of
//! them may corrupt previously-committed assignment state.

use thiserror::Error;

/// The top-level error type for all tabsplit operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- External model call failures ---
    #[error("Extraction failed: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("Interpretation failed: {0}")]
    Interpretation(#[from] InterpretationError),

    #[error("Audit failed: {0}")]
    Audit(#[from] AuditError),

    // --- Session state ---
    #[error("a command is already being processed for this bill")]
    Busy,

    #[error("no receipt has been uploaded yet")]
    NoReceipt,

    // --- Configuration ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Transport- and API-level failure of an external model call.
///
/// Shared by all three capabilities; the capability-specific errors below
/// wrap it so callers can still tell *which* operation failed.
#[derive(Debug, Clone, Error)]
pub enum ModelError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError {
        status_code: u16,
        message: String,
    },

    #[error("Rate limited by model provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Model backend not configured: {0}")]
    NotConfigured(String),
}

/// Receipt extraction failed. Terminal for that upload: no receipt state is
/// created and the user must retry with a new image.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("model returned unusable receipt data: {0}")]
    Unusable(String),
}

/// Command interpretation failed. Terminal for that single command: prior
/// assignments remain unchanged.
#[derive(Debug, Error)]
pub enum InterpretationError {
    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("model returned an unusable instruction payload: {0}")]
    Unusable(String),
}

/// Audit narrative generation failed. Terminal for that audit invocation
/// only; displayed in place of the report.
#[derive(Debug, Error)]
pub enum AuditError {
    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("model returned an empty audit report")]
    Empty,
}
