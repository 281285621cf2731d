//! Concrete capability implementations.
//!
//! Provides HTTP-backed adapters for the capability traits:
//! - OpenAI-compatible chat completions (Groq, OpenAI, Ollama, vLLM) for
//!   classification, grading, and answer generation
//! - Tavily-style web search
//!
//! Use [`build_workflow`] / [`build_feedback_handler`] to assemble the
//! pipeline from configuration.

pub mod openai_compat;
pub mod tavily;

pub use openai_compat::OpenAiCompatibleModel;
pub use tavily::TavilySearch;

use crate::capability::KnowledgeStore;
use crate::classify::IntentClassifier;
use crate::config::KrishiConfig;
use crate::error::{ConfigError, KrishiError};
use crate::feedback::FeedbackHandler;
use crate::generate::AnswerSynthesizer;
use crate::grade::SufficiencyGrader;
use crate::memory::SessionMemoryStore;
use crate::retrieve::RetrievalCoordinator;
use crate::search::WebSearchFallback;
use crate::workflow::Workflow;
use std::sync::Arc;
use tracing::warn;

/// Resolve a required API key from the configured environment variable.
fn require_key(var: &str) -> Result<String, ConfigError> {
    std::env::var(var).map_err(|_| ConfigError::EnvVarMissing {
        var: var.to_string(),
    })
}

/// Resolve the web-search key, tolerating its absence: a missing key means
/// search calls fail at runtime and the pipeline degrades gracefully, which
/// beats refusing to start.
fn search_key(var: &str) -> String {
    std::env::var(var).unwrap_or_else(|_| {
        warn!(var = %var, "Search API key not set; web search fallback will be degraded");
        String::new()
    })
}

/// Assemble a [`Workflow`] from configuration and a knowledge store.
///
/// The utility model runs classification and grading at temperature zero and
/// doubles as the generation fallback; the answer model is primary.
pub fn build_workflow(
    config: &KrishiConfig,
    store: Arc<dyn KnowledgeStore>,
) -> Result<Workflow, KrishiError> {
    let api_key = require_key(&config.llm.api_key_env)?;

    let utility = Arc::new(OpenAiCompatibleModel::new(
        &config.llm.base_url,
        &api_key,
        &config.llm.utility_model,
        0.0,
        config.llm.timeout_secs,
    )?);
    let answer_primary = Arc::new(OpenAiCompatibleModel::new(
        &config.llm.base_url,
        &api_key,
        &config.llm.answer_model,
        config.llm.temperature,
        config.llm.timeout_secs,
    )?);
    let answer_fallback = Arc::new(OpenAiCompatibleModel::new(
        &config.llm.base_url,
        &api_key,
        &config.llm.utility_model,
        config.llm.temperature,
        config.llm.timeout_secs,
    )?);
    let web = Arc::new(TavilySearch::new(
        &config.search.base_url,
        search_key(&config.search.api_key_env),
        config.llm.timeout_secs,
    )?);

    let memory = Arc::new(SessionMemoryStore::new());
    let grader = SufficiencyGrader::new(utility.clone(), config.retrieval.grading_prefix_chars);

    Ok(Workflow::new(
        IntentClassifier::new(utility.clone()),
        RetrievalCoordinator::new(store.clone(), grader, config.retrieval.clone()),
        WebSearchFallback::new(web, store, config.search.max_results),
        AnswerSynthesizer::new(
            answer_primary,
            answer_fallback,
            Arc::clone(&memory),
            config.generation.clone(),
        ),
        memory,
        config.memory.default_session_id.clone(),
    ))
}

/// Assemble a [`FeedbackHandler`] over the same store and search provider.
pub fn build_feedback_handler(
    config: &KrishiConfig,
    store: Arc<dyn KnowledgeStore>,
) -> Result<FeedbackHandler, KrishiError> {
    let web = Arc::new(TavilySearch::new(
        &config.search.base_url,
        search_key(&config.search.api_key_env),
        config.llm.timeout_secs,
    )?);
    Ok(FeedbackHandler::new(store, web))
}
