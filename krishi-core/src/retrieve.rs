//! Knowledge retrieval coordination and the search-escalation decision.

use crate::capability::KnowledgeStore;
use crate::config::RetrievalConfig;
use crate::grade::SufficiencyGrader;
use crate::text::char_count;
use crate::types::{Citation, Intent, Page, RetrievedChunk};
use std::sync::Arc;
use tracing::{info, warn};

/// What one retrieval pass produced: assembled context, its citations, and
/// whether the pipeline should escalate to live web search.
#[derive(Debug, Clone)]
pub struct Retrieval {
    pub context: String,
    pub sources: Vec<Citation>,
    pub search_triggered: bool,
}

impl Retrieval {
    fn empty() -> Self {
        Self {
            context: String::new(),
            sources: Vec::new(),
            search_triggered: false,
        }
    }
}

/// Queries the knowledge store per intent, assembles the context bundle, and
/// decides whether retrieved evidence is strong enough to skip web search.
///
/// Failure policy: store errors collapse to empty results (which force
/// search); grader errors collapse to "no search" (bounding latency and cost
/// over completeness).
pub struct RetrievalCoordinator {
    store: Arc<dyn KnowledgeStore>,
    grader: SufficiencyGrader,
    config: RetrievalConfig,
}

impl RetrievalCoordinator {
    pub fn new(
        store: Arc<dyn KnowledgeStore>,
        grader: SufficiencyGrader,
        config: RetrievalConfig,
    ) -> Self {
        Self {
            store,
            grader,
            config,
        }
    }

    /// Retrieve context for a classified question.
    pub async fn retrieve(&self, question: &str, intent: Intent) -> Retrieval {
        if intent == Intent::OutOfScope {
            // No store access at all for out-of-scope questions
            return Retrieval::empty();
        }

        info!(intent = %intent, "Retrieving from knowledge store");
        let chunks = self.fetch_chunks(question, intent).await;

        let mut context = String::new();
        let mut sources = Vec::with_capacity(chunks.len());
        for chunk in &chunks {
            let (block, citation) = format_chunk(chunk);
            context.push_str(&block);
            sources.push(citation);
        }

        let search_triggered = self.decide_search(question, &chunks, &context).await;

        Retrieval {
            context,
            sources,
            search_triggered,
        }
    }

    /// Issue the per-intent store queries. Hybrid questions get two
    /// tag-filtered queries, disease results strictly before scheme results.
    async fn fetch_chunks(&self, question: &str, intent: Intent) -> Vec<RetrievedChunk> {
        match intent {
            Intent::Hybrid => {
                let mut chunks = self
                    .query_tag(question, Intent::Disease, self.config.hybrid_top_k)
                    .await;
                chunks.extend(
                    self.query_tag(question, Intent::Scheme, self.config.hybrid_top_k)
                        .await,
                );
                chunks
            }
            _ => self.query_tag(question, intent, self.config.top_k).await,
        }
    }

    /// One tag-filtered store query, failing closed to no results.
    async fn query_tag(&self, question: &str, tag: Intent, top_k: usize) -> Vec<RetrievedChunk> {
        match self.store.search(question, Some(tag), top_k).await {
            Ok(chunks) => chunks,
            Err(e) => {
                warn!(tag = %tag, error = %e, "Knowledge store query failed; treating as empty");
                Vec::new()
            }
        }
    }

    /// The sufficiency decision.
    ///
    /// Empty or sub-floor context skips grading entirely and triggers search:
    /// there is no point spending a grading call on no evidence. A grading
    /// failure means no search.
    async fn decide_search(
        &self,
        question: &str,
        chunks: &[RetrievedChunk],
        context: &str,
    ) -> bool {
        if chunks.is_empty() || char_count(context) < self.config.sufficiency_floor_chars {
            info!("No usable knowledge retrieved; triggering web search");
            return true;
        }

        match self.grader.grade(question, context).await {
            Ok(grade) => {
                if grade.is_sufficient {
                    false
                } else {
                    info!(reason = %grade.reason, "Context insufficient; triggering web search");
                    true
                }
            }
            Err(e) => {
                warn!(error = %e, "Grading failed; skipping web search");
                false
            }
        }
    }
}

/// Format one chunk as a labeled context block and its citation. Missing
/// metadata defaults to `"Unknown"` / `"N/A"`.
fn format_chunk(chunk: &RetrievedChunk) -> (String, Citation) {
    let document = chunk.document.clone().unwrap_or_else(|| "Unknown".to_string());
    let page = chunk.page.clone().unwrap_or_else(Page::not_available);
    let block = format!(
        "\n--- SOURCE: {} (Page {}) ---\n{}\n",
        document, page, chunk.content
    );
    (block, Citation::new(document, page))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{InMemoryKnowledgeStore, MockGraderModel};
    use pretty_assertions::assert_eq;

    const FLOOR: usize = 100;

    fn coordinator(
        store: Arc<InMemoryKnowledgeStore>,
        grader: Arc<MockGraderModel>,
    ) -> RetrievalCoordinator {
        RetrievalCoordinator::new(
            store,
            SufficiencyGrader::new(grader, 2000),
            RetrievalConfig::default(),
        )
    }

    fn long_chunk(topic: &str) -> String {
        format!(
            "{} guidance: scout weekly, remove infected material, apply the \
             recommended treatment at label rates, and keep field records.",
            topic
        )
    }

    #[tokio::test]
    async fn test_out_of_scope_short_circuits_without_store_access() {
        let store = Arc::new(InMemoryKnowledgeStore::new());
        let grader = Arc::new(MockGraderModel::returning(true));
        let coord = coordinator(store.clone(), grader.clone());

        let retrieval = coord.retrieve("who won the match", Intent::OutOfScope).await;
        assert_eq!(retrieval.context, "");
        assert!(retrieval.sources.is_empty());
        assert!(!retrieval.search_triggered);
        assert_eq!(store.search_call_count(), 0);
        assert_eq!(grader.call_count(), 0);
    }

    #[tokio::test]
    async fn test_hybrid_orders_disease_before_scheme() {
        let store = Arc::new(InMemoryKnowledgeStore::new());
        store.seed(
            &format!("canker {}", long_chunk("Citrus canker")),
            "disease.pdf",
            Page::Number(1),
            Intent::Disease,
        );
        store.seed(
            &format!("canker {}", long_chunk("Scheme subsidy")),
            "scheme.pdf",
            Page::Number(9),
            Intent::Scheme,
        );
        let coord = coordinator(store, Arc::new(MockGraderModel::returning(true)));

        let retrieval = coord.retrieve("canker", Intent::Hybrid).await;
        assert_eq!(retrieval.sources.len(), 2);
        assert_eq!(retrieval.sources[0].document, "disease.pdf");
        assert_eq!(retrieval.sources[1].document, "scheme.pdf");
        assert!(!retrieval.search_triggered);
    }

    #[tokio::test]
    async fn test_one_citation_per_chunk_in_order() {
        let store = Arc::new(InMemoryKnowledgeStore::new());
        store.seed(
            &long_chunk("Citrus canker"),
            "canker.pdf",
            Page::Number(2),
            Intent::Disease,
        );
        store.seed_bare(&long_chunk("Citrus greening"), Intent::Disease);
        let coord = coordinator(store, Arc::new(MockGraderModel::returning(true)));

        let retrieval = coord.retrieve("citrus", Intent::Disease).await;
        assert_eq!(retrieval.sources.len(), 2);
        // Missing metadata falls back to Unknown / N/A
        let bare = retrieval
            .sources
            .iter()
            .find(|s| s.document == "Unknown")
            .unwrap();
        assert_eq!(bare.page, Page::not_available());
        assert!(retrieval.context.contains("--- SOURCE: canker.pdf (Page 2) ---"));
        assert!(retrieval.context.contains("--- SOURCE: Unknown (Page N/A) ---"));
    }

    #[tokio::test]
    async fn test_no_chunks_triggers_search_without_grading() {
        let store = Arc::new(InMemoryKnowledgeStore::new());
        let grader = Arc::new(MockGraderModel::returning(true));
        let coord = coordinator(store, grader.clone());

        let retrieval = coord.retrieve("citrus canker", Intent::Disease).await;
        assert!(retrieval.search_triggered);
        assert_eq!(grader.call_count(), 0);
    }

    #[tokio::test]
    async fn test_sub_floor_context_triggers_search_without_grading() {
        let store = Arc::new(InMemoryKnowledgeStore::new());
        store.seed("canker", "tiny.pdf", Page::Number(1), Intent::Disease);
        let grader = Arc::new(MockGraderModel::returning(true));
        let coord = coordinator(store, grader.clone());

        let retrieval = coord.retrieve("canker", Intent::Disease).await;
        assert!(char_count(&retrieval.context) < FLOOR);
        assert!(retrieval.search_triggered);
        assert_eq!(grader.call_count(), 0);
    }

    #[tokio::test]
    async fn test_grader_insufficient_triggers_search() {
        let store = Arc::new(InMemoryKnowledgeStore::new());
        store.seed(
            &long_chunk("Citrus canker"),
            "canker.pdf",
            Page::Number(1),
            Intent::Disease,
        );
        let grader = Arc::new(MockGraderModel::returning(false));
        let coord = coordinator(store, grader.clone());

        let retrieval = coord.retrieve("citrus canker", Intent::Disease).await;
        assert!(retrieval.search_triggered);
        assert_eq!(grader.call_count(), 1);
    }

    #[tokio::test]
    async fn test_grader_failure_fails_closed_to_no_search() {
        let store = Arc::new(InMemoryKnowledgeStore::new());
        // Weak but above-floor context: grading is attempted and fails
        store.seed(
            &long_chunk("Citrus canker"),
            "canker.pdf",
            Page::Number(1),
            Intent::Disease,
        );
        let grader = Arc::new(MockGraderModel::failing());
        let coord = coordinator(store, grader.clone());

        let retrieval = coord.retrieve("citrus canker", Intent::Disease).await;
        assert!(!retrieval.search_triggered);
        assert_eq!(grader.call_count(), 1);
    }

    #[tokio::test]
    async fn test_store_failure_collapses_to_empty_and_forces_search() {
        let store = Arc::new(InMemoryKnowledgeStore::new());
        store.fail_searches();
        let grader = Arc::new(MockGraderModel::returning(true));
        let coord = coordinator(store, grader.clone());

        let retrieval = coord.retrieve("citrus canker", Intent::Disease).await;
        assert!(retrieval.sources.is_empty());
        assert!(retrieval.search_triggered);
        assert_eq!(grader.call_count(), 0);
    }
}
