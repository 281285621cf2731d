//! The workflow orchestrator: a fixed, acyclic node pipeline.
//!
//! `classify → retrieve → (search if triggered) → generate → terminal`.
//! Each node runs at most once per request; the only branch is the optional
//! search detour, decided by a pure function of the state. One mutable
//! [`RequestState`] record is threaded through the nodes, and each stage
//! writes only the fields it owns.

use crate::classify::IntentClassifier;
use crate::error::Result;
use crate::generate::AnswerSynthesizer;
use crate::memory::SessionMemoryStore;
use crate::retrieve::RetrievalCoordinator;
use crate::search::WebSearchFallback;
use crate::types::{Citation, Intent, QueryRequest, QueryResponse, Turn};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Per-request pipeline state, owned exclusively by the orchestrator for the
/// request's lifetime.
#[derive(Debug, Clone)]
pub struct RequestState {
    /// Immutable input.
    pub question: String,
    /// Resolved session id (caller-supplied or the configured sentinel).
    pub session_id: String,
    /// Set once by classification; never reclassified mid-request.
    pub intent: Intent,
    /// Accumulated evidence text; grows monotonically until generation.
    pub context: String,
    /// Append-only, ordered: retrieval citations then search citations.
    pub sources: Vec<Citation>,
    /// Set by retrieval; read by the router and the synthesizer.
    pub search_triggered: bool,
    /// Read-only snapshot of the session's history at request start.
    pub history: Vec<Turn>,
}

/// Router decision: the only conditional edge in the pipeline.
fn should_search(state: &RequestState) -> bool {
    state.search_triggered
}

/// Sequences the pipeline components into one deterministic per-request run.
pub struct Workflow {
    classifier: IntentClassifier,
    retriever: RetrievalCoordinator,
    searcher: WebSearchFallback,
    synthesizer: AnswerSynthesizer,
    memory: Arc<SessionMemoryStore>,
    default_session_id: String,
}

impl Workflow {
    pub fn new(
        classifier: IntentClassifier,
        retriever: RetrievalCoordinator,
        searcher: WebSearchFallback,
        synthesizer: AnswerSynthesizer,
        memory: Arc<SessionMemoryStore>,
        default_session_id: impl Into<String>,
    ) -> Self {
        Self {
            classifier,
            retriever,
            searcher,
            synthesizer,
            memory,
            default_session_id: default_session_id.into(),
        }
    }

    /// The session memory backing this workflow.
    pub fn memory(&self) -> &Arc<SessionMemoryStore> {
        &self.memory
    }

    /// Run one question through the full pipeline.
    ///
    /// Every stage except generation absorbs its capability failures and
    /// substitutes a safe default, so the pipeline always reaches generation;
    /// only a total generation failure is returned as an error.
    pub async fn run(&self, request: QueryRequest) -> Result<QueryResponse> {
        let request_id = Uuid::new_v4();
        let session_id = request
            .session_id
            .unwrap_or_else(|| self.default_session_id.clone());
        info!(request_id = %request_id, session = %session_id, "Processing question");

        let history = self.memory.history(&session_id).await;

        // Node: classify
        let decision = self.classifier.classify(&request.question).await;
        let mut state = RequestState {
            question: request.question,
            session_id,
            intent: decision.intent,
            context: String::new(),
            sources: Vec::new(),
            search_triggered: false,
            history,
        };
        info!(request_id = %request_id, intent = %state.intent, "Intent classified");

        // Node: retrieve
        let retrieval = self.retriever.retrieve(&state.question, state.intent).await;
        state.context = retrieval.context;
        state.sources = retrieval.sources;
        state.search_triggered = retrieval.search_triggered;

        // Conditional detour: search
        if should_search(&state) {
            let augment = self.searcher.augment(&state.question, state.intent).await;
            state.context.push_str(&augment.context);
            state.sources.extend(augment.sources);
        }

        // Node: generate (appends the turn to session history)
        let answer = self.synthesizer.generate(&state).await?;
        info!(request_id = %request_id, sources = state.sources.len(), "Answer ready");

        Ok(QueryResponse {
            intent: state.intent,
            answer,
            sources: state.sources,
        })
    }
}
