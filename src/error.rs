//! Error types for the question-generation workflow.
//!
//! Defines error types for the major subsystems:
//! - Language-model capability calls
//! - Vector-store retrieval
//! - Workflow orchestration and batch coordination
//! - Configuration loading and validation
//!
//! Only `WorkflowError::Configuration` ever reaches the caller of the batch
//! entry point; every other failure kind is absorbed inside the pipeline and
//! surfaces as a fallback-generated question.

use thiserror::Error;

/// Errors that can occur when calling the language-model capability.
#[derive(Debug, Error)]
pub enum LlmError {
    /// Network failure, timeout, or other transport-level problem.
    #[error("Transient backend error: {0}")]
    Transient(String),

    /// The backend rate-limited the request.
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// The API returned a non-success status.
    #[error("API error ({code}): {message}")]
    Api { code: u16, message: String },

    /// The backend answered but the content is unusable.
    #[error("Malformed model output: {0}")]
    MalformedOutput(String),

    /// Missing API base URL in the environment.
    #[error("Missing API base URL: QUIZFORGE_API_BASE environment variable not set")]
    MissingApiBase,
}

impl LlmError {
    /// Whether this failure should count toward the circuit breaker.
    ///
    /// Transport problems, rate limits and server-side (5xx) statuses are
    /// transient; malformed output is a content error and does not indicate
    /// an unhealthy backend.
    pub fn is_transient(&self) -> bool {
        match self {
            LlmError::Transient(_) | LlmError::RateLimited(_) => true,
            LlmError::Api { code, .. } => *code >= 500,
            LlmError::MalformedOutput(_) | LlmError::MissingApiBase => false,
        }
    }
}

/// Errors that can occur during vector retrieval.
///
/// All of these degrade to "no context available" inside the workflow; none
/// are reported to the circuit breaker.
#[derive(Debug, Error)]
pub enum VectorStoreError {
    #[error("Vector retrieval failed: {0}")]
    RetrievalFailed(String),

    #[error("Vector store unavailable: {0}")]
    Unavailable(String),
}

/// Errors that can occur during workflow orchestration.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Malformed request: the only variant surfaced to the caller.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A pipeline stage failed in a way the fallback could not absorb.
    #[error("Workflow stage '{stage}' failed: {reason}")]
    StageFailed { stage: String, reason: String },

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable has an invalid value.
    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    /// Configuration validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Result type alias for workflow operations.
pub type WorkflowResult<T> = Result<T, WorkflowError>;
