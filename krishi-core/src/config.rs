//! Configuration system for Krishi.
//!
//! Uses `figment` for layered configuration: defaults -> `krishi.toml` ->
//! `KRISHI_`-prefixed environment variables (nested fields split on `__`,
//! e.g. `KRISHI_RETRIEVAL__TOP_K=5`).
//!
//! The workflow's thresholds (sufficiency floor, grading prefix, context
//! cap) are deliberately explicit named values here rather than inline
//! literals; their defaults bound grading cost and prompt size.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ConfigError;

/// Top-level configuration for the Krishi workflow.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KrishiConfig {
    pub llm: LlmConfig,
    pub retrieval: RetrievalConfig,
    pub generation: GenerationConfig,
    pub search: SearchConfig,
    pub memory: MemoryConfig,
}

/// LLM endpoint configuration for the classification, grading, and answer
/// capabilities. Any OpenAI-compatible chat-completions endpoint works.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Base URL of the chat-completions API.
    pub base_url: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    /// Model used for final answer synthesis.
    pub answer_model: String,
    /// Cheaper/faster model used for classification, grading, and as the
    /// generation fallback.
    pub utility_model: String,
    /// Sampling temperature for answer synthesis. Classification and grading
    /// always run at temperature zero.
    pub temperature: f64,
    /// Per-request wall-clock timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.groq.com/openai/v1".to_string(),
            api_key_env: "GROQ_API_KEY".to_string(),
            answer_model: "llama-3.3-70b-versatile".to_string(),
            utility_model: "llama-3.1-8b-instant".to_string(),
            temperature: 0.2,
            timeout_secs: 120,
        }
    }
}

/// Knowledge retrieval and sufficiency grading configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Chunks fetched for a single-intent query.
    pub top_k: usize,
    /// Chunks fetched per tag for a hybrid query (disease + scheme).
    pub hybrid_top_k: usize,
    /// Below this many characters of context, search is triggered without
    /// spending a grading call.
    pub sufficiency_floor_chars: usize,
    /// Only this many leading characters of context are shown to the grader.
    pub grading_prefix_chars: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 3,
            hybrid_top_k: 2,
            sufficiency_floor_chars: 100,
            grading_prefix_chars: 2000,
        }
    }
}

/// Answer synthesis configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Context is cut to this many characters before prompting.
    pub context_cap_chars: usize,
    /// How many recent session turns are rendered into the prompt.
    pub history_window_turns: usize,
    /// Each rendered history message is cut to this many characters.
    pub history_turn_chars: usize,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            context_cap_chars: 4000,
            history_window_turns: 2,
            history_turn_chars: 300,
        }
    }
}

/// Web search fallback configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Base URL of the search API.
    pub base_url: String,
    /// Environment variable holding the search API key.
    pub api_key_env: String,
    /// Maximum results per fallback search.
    pub max_results: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.tavily.com".to_string(),
            api_key_env: "TAVILY_API_KEY".to_string(),
            max_results: 2,
        }
    }
}

/// Session memory configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Session id used when the caller supplies none.
    pub default_session_id: String,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            default_session_id: "default-session".to_string(),
        }
    }
}

/// Load configuration with layered precedence: defaults, then an optional
/// TOML file, then `KRISHI_`-prefixed environment variables.
pub fn load_config(config_file: Option<&Path>) -> Result<KrishiConfig, ConfigError> {
    let mut figment = Figment::from(Serialized::defaults(KrishiConfig::default()));

    if let Some(path) = config_file {
        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        figment = figment.merge(Toml::file(path));
    } else {
        // Opportunistic: a krishi.toml in the working directory, if any
        figment = figment.merge(Toml::file("krishi.toml"));
    }

    figment = figment.merge(Env::prefixed("KRISHI_").split("__"));

    figment.extract().map_err(|e| ConfigError::ParseError {
        message: e.to_string(),
    })
}
