//! Error types for the Krishi workflow core.
//!
//! Uses `thiserror` for public API error types with structured variants
//! covering external capability calls, configuration, and the workflow itself.
//!
//! Most capability failures never surface here: the pipeline absorbs them at
//! the stage boundary and substitutes a safe default (see the individual
//! stage modules). Only a total generation failure reaches the caller.

use std::path::PathBuf;

/// Top-level error type for the Krishi core library.
#[derive(Debug, thiserror::Error)]
pub enum KrishiError {
    #[error("Capability error: {0}")]
    Capability(#[from] CapabilityError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Workflow error: {0}")]
    Workflow(#[from] WorkflowError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors from calls to external capabilities (classification, knowledge
/// store, grading, web search, answer generation).
#[derive(Debug, thiserror::Error)]
pub enum CapabilityError {
    #[error("API request failed: {message}")]
    ApiRequest { message: String },

    #[error("API response parse error: {message}")]
    ResponseParse { message: String },

    #[error("Authentication failed for capability {capability}")]
    AuthFailed { capability: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Provider connection failed: {message}")]
    Connection { message: String },
}

/// Errors from the configuration system.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Environment variable not set: {var}")]
    EnvVarMissing { var: String },

    #[error("Configuration parse error: {message}")]
    ParseError { message: String },
}

/// Errors from the workflow orchestrator.
///
/// Generation failure is the only unrecoverable path: every other stage fails
/// closed to a safe default so the pipeline always reaches generation.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("Answer generation failed on primary and fallback models: {message}")]
    GenerationFailed { message: String },
}

/// A type alias for results using the top-level `KrishiError`.
pub type Result<T> = std::result::Result<T, KrishiError>;
