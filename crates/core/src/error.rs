//! Error types for the Reagent domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each collaborator of the agent loop has its own error enum; the loop
//! collapses them into [`Error`].

use thiserror::Error;

/// The top-level error type for all Reagent operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Generation service errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Skill errors ---
    #[error("Skill error: {0}")]
    Skill(#[from] SkillError),

    // --- Action input that is not well-formed structured data ---
    #[error("Malformed input for skill '{skill}': {reason}")]
    MalformedSkillInput { skill: String, reason: String },

    // --- Configuration errors ---
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

// --- Collaborator errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Stream interrupted: {0}")]
    StreamInterrupted(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Network error: {0}")]
    Network(String),
}

#[derive(Debug, Error)]
pub enum SkillError {
    #[error("Skill not found: {0}")]
    NotFound(String),

    #[error("Skill execution failed: {skill_name} — {reason}")]
    ExecutionFailed { skill_name: String, reason: String },

    #[error("Invalid skill input: {0}")]
    InvalidInput(String),
}
