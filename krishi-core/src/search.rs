//! Web search fallback and self-learning upsert.

use crate::capability::{KnowledgeStore, WebSearchProvider};
use crate::types::{Citation, Intent, LearnedKnowledge, SearchHit};
use std::sync::Arc;
use tracing::{info, warn};

/// Context marker appended when the search capability itself fails. The
/// pipeline continues to generation with degraded evidence; it never aborts.
pub const SEARCH_FAILED_MARKER: &str = "\n[Web search failed]";

/// Header separating retrieved knowledge from live search results.
const WEB_KNOWLEDGE_HEADER: &str = "\n\n--- ADDITIONAL WEB KNOWLEDGE ---\n";

/// What the search detour produced: text to append to the context and the
/// citations for it, in result order.
#[derive(Debug, Clone)]
pub struct SearchAugment {
    pub context: String,
    pub sources: Vec<Citation>,
}

/// Escalates to live web search when retrieval came up short, and writes the
/// discovered knowledge back into the store so future retrievals find it.
pub struct WebSearchFallback {
    web: Arc<dyn WebSearchProvider>,
    store: Arc<dyn KnowledgeStore>,
    max_results: usize,
}

impl WebSearchFallback {
    pub fn new(
        web: Arc<dyn WebSearchProvider>,
        store: Arc<dyn KnowledgeStore>,
        max_results: usize,
    ) -> Self {
        Self {
            web,
            store,
            max_results,
        }
    }

    /// Search the web for the question and return the context/citation
    /// additions. `intent` is the request's classified intent; learned
    /// knowledge is tagged with it so the new facts land in the topic area
    /// that produced them.
    pub async fn augment(&self, question: &str, intent: Intent) -> SearchAugment {
        info!("Searching the web for new knowledge");
        let hits = match self.web.search(question, self.max_results).await {
            Ok(hits) => hits,
            Err(e) => {
                warn!(error = %e, "Web search failed; continuing with degraded context");
                return SearchAugment {
                    context: SEARCH_FAILED_MARKER.to_string(),
                    sources: Vec::new(),
                };
            }
        };

        info!(results = hits.len(), "Web search returned results");
        let mut context = String::from(WEB_KNOWLEDGE_HEADER);
        let mut sources = Vec::with_capacity(hits.len());
        for hit in &hits {
            context.push_str(&format!("- {} (Source: {})\n", hit.content, hit.url));
            sources.push(Citation::web(&hit.url));
        }

        self.learn(&hits, intent).await;

        SearchAugment { context, sources }
    }

    /// Best-effort self-learning: concatenate the result contents and upsert
    /// one entry tagged with the request's intent. Failures are logged and
    /// swallowed; learning must never fail the request.
    async fn learn(&self, hits: &[SearchHit], intent: Intent) {
        let learned_content = hits
            .iter()
            .map(|h| h.content.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        if learned_content.trim().is_empty() {
            return;
        }

        let source_label = hits[0].url.clone();
        let entry = LearnedKnowledge::new(learned_content, source_label, intent);
        match self.store.upsert(entry).await {
            Ok(()) => info!(intent = %intent, "Learned new knowledge from web search"),
            Err(e) => warn!(error = %e, "Failed to store learned knowledge"),
        }
    }
}
