//! Capability interfaces consumed by the workflow.
//!
//! The pipeline itself owns no model inference, no vector index, and no
//! search provider; it talks to all of them through these traits. Concrete
//! HTTP-backed implementations live in `providers`; in-memory doubles for
//! tests and offline use live at the bottom of this module.

use crate::error::CapabilityError;
use crate::types::{GradeDecision, IntentDecision, LearnedKnowledge, RetrievedChunk, SearchHit};
use crate::types::{Intent, Page};
use async_trait::async_trait;

/// Structured intent classification. Deterministic (temperature-zero) and
/// constrained to the four labels; anything else is a parse failure.
#[async_trait]
pub trait IntentModel: Send + Sync {
    async fn classify(&self, question: &str) -> Result<IntentDecision, CapabilityError>;
}

/// The persistent knowledge store: tag-filtered similarity search plus
/// best-effort upsert of learned knowledge.
#[async_trait]
pub trait KnowledgeStore: Send + Sync {
    /// Search for chunks relevant to `query`, optionally filtered to one
    /// knowledge-base tag, returning at most `top_k` results.
    async fn search(
        &self,
        query: &str,
        tag: Option<Intent>,
        top_k: usize,
    ) -> Result<Vec<RetrievedChunk>, CapabilityError>;

    /// Write a learned-knowledge entry. Callers treat failures as
    /// best-effort: logged, never surfaced to the user.
    async fn upsert(&self, entry: LearnedKnowledge) -> Result<(), CapabilityError>;
}

/// Binary sufficiency grading of retrieved context against a question.
#[async_trait]
pub trait GraderModel: Send + Sync {
    async fn grade(&self, question: &str, context: &str)
        -> Result<GradeDecision, CapabilityError>;
}

/// Live web search. No freshness or recency guarantee is assumed.
#[async_trait]
pub trait WebSearchProvider: Send + Sync {
    async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<SearchHit>, CapabilityError>;
}

/// Final answer generation from a system prompt and the raw question.
#[async_trait]
pub trait AnswerModel: Send + Sync {
    async fn complete(
        &self,
        system_prompt: &str,
        user_message: &str,
    ) -> Result<String, CapabilityError>;

    /// The model name, for logging.
    fn model_name(&self) -> &str;
}

// ---------------------------------------------------------------------------
// In-memory knowledge store
// ---------------------------------------------------------------------------

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

/// One document chunk held by [`InMemoryKnowledgeStore`].
#[derive(Debug, Clone)]
pub struct StoredChunk {
    pub content: String,
    pub document: Option<String>,
    pub page: Option<Page>,
    pub tag: Intent,
}

/// A keyword-scored, tag-filtered knowledge store held entirely in memory.
///
/// Not a vector index: chunks are ranked by term overlap with the query.
/// Serves as the test double for [`KnowledgeStore`] and as the offline
/// default for the CLI.
#[derive(Default)]
pub struct InMemoryKnowledgeStore {
    chunks: Mutex<Vec<StoredChunk>>,
    learned: Mutex<Vec<LearnedKnowledge>>,
    search_calls: AtomicUsize,
    fail_search: AtomicBool,
    fail_upsert: AtomicBool,
}

impl InMemoryKnowledgeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a chunk under a knowledge-base tag.
    pub fn seed(&self, content: &str, document: &str, page: Page, tag: Intent) {
        self.chunks.lock().unwrap().push(StoredChunk {
            content: content.to_string(),
            document: Some(document.to_string()),
            page: Some(page),
            tag,
        });
    }

    /// Add a chunk with no document/page metadata.
    pub fn seed_bare(&self, content: &str, tag: Intent) {
        self.chunks.lock().unwrap().push(StoredChunk {
            content: content.to_string(),
            document: None,
            page: None,
            tag,
        });
    }

    /// Every learned-knowledge entry upserted so far, in order.
    pub fn learned_entries(&self) -> Vec<LearnedKnowledge> {
        self.learned.lock().unwrap().clone()
    }

    /// How many times `search` has been called.
    pub fn search_call_count(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    /// Make every subsequent `search` call fail.
    pub fn fail_searches(&self) {
        self.fail_search.store(true, Ordering::SeqCst);
    }

    /// Make every subsequent `upsert` call fail.
    pub fn fail_upserts(&self) {
        self.fail_upsert.store(true, Ordering::SeqCst);
    }

    /// Term-overlap score between a query and a chunk.
    fn score(query_terms: &[String], content: &str) -> usize {
        let content_lower = content.to_lowercase();
        query_terms
            .iter()
            .filter(|t| content_lower.contains(t.as_str()))
            .count()
    }
}

#[async_trait]
impl KnowledgeStore for InMemoryKnowledgeStore {
    async fn search(
        &self,
        query: &str,
        tag: Option<Intent>,
        top_k: usize,
    ) -> Result<Vec<RetrievedChunk>, CapabilityError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_search.load(Ordering::SeqCst) {
            return Err(CapabilityError::Connection {
                message: "knowledge store unavailable".to_string(),
            });
        }

        let query_terms: Vec<String> = query
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .map(str::to_string)
            .collect();

        let chunks = self.chunks.lock().unwrap();
        let mut scored: Vec<(usize, &StoredChunk)> = chunks
            .iter()
            .filter(|c| tag.map(|t| c.tag == t).unwrap_or(true))
            .map(|c| (Self::score(&query_terms, &c.content), c))
            .filter(|(score, _)| *score > 0)
            .collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0));

        Ok(scored
            .into_iter()
            .take(top_k)
            .map(|(_, c)| RetrievedChunk {
                content: c.content.clone(),
                document: c.document.clone(),
                page: c.page.clone(),
            })
            .collect())
    }

    async fn upsert(&self, entry: LearnedKnowledge) -> Result<(), CapabilityError> {
        if self.fail_upsert.load(Ordering::SeqCst) {
            return Err(CapabilityError::ApiRequest {
                message: "upsert rejected".to_string(),
            });
        }
        // Learned entries become searchable immediately
        self.chunks.lock().unwrap().push(StoredChunk {
            content: entry.content.clone(),
            document: Some("Web Search (Learned)".to_string()),
            page: None,
            tag: entry.tag,
        });
        self.learned.lock().unwrap().push(entry);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Mock capabilities for testing
// ---------------------------------------------------------------------------

/// A scripted [`IntentModel`] that returns a fixed decision or always fails.
pub struct MockIntentModel {
    decision: Option<IntentDecision>,
}

impl MockIntentModel {
    /// Always classify as `intent`.
    pub fn returning(intent: Intent) -> Self {
        Self {
            decision: Some(IntentDecision {
                intent,
                explanation: "scripted".to_string(),
            }),
        }
    }

    /// Always fail, as an unreachable classification capability would.
    pub fn failing() -> Self {
        Self { decision: None }
    }
}

#[async_trait]
impl IntentModel for MockIntentModel {
    async fn classify(&self, _question: &str) -> Result<IntentDecision, CapabilityError> {
        match &self.decision {
            Some(d) => Ok(d.clone()),
            None => Err(CapabilityError::Connection {
                message: "classifier offline".to_string(),
            }),
        }
    }
}

/// A scripted [`GraderModel`] that records what it was shown.
pub struct MockGraderModel {
    decision: Option<GradeDecision>,
    calls: AtomicUsize,
    last_context: Mutex<Option<String>>,
}

impl MockGraderModel {
    pub fn returning(is_sufficient: bool) -> Self {
        Self {
            decision: Some(GradeDecision {
                is_sufficient,
                reason: "scripted".to_string(),
            }),
            calls: AtomicUsize::new(0),
            last_context: Mutex::new(None),
        }
    }

    pub fn failing() -> Self {
        Self {
            decision: None,
            calls: AtomicUsize::new(0),
            last_context: Mutex::new(None),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// The context string passed to the most recent `grade` call.
    pub fn last_context(&self) -> Option<String> {
        self.last_context.lock().unwrap().clone()
    }
}

#[async_trait]
impl GraderModel for MockGraderModel {
    async fn grade(
        &self,
        _question: &str,
        context: &str,
    ) -> Result<GradeDecision, CapabilityError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_context.lock().unwrap() = Some(context.to_string());
        match &self.decision {
            Some(d) => Ok(d.clone()),
            None => Err(CapabilityError::Timeout { timeout_secs: 120 }),
        }
    }
}

/// A scripted [`WebSearchProvider`].
pub struct MockWebSearch {
    hits: Option<Vec<SearchHit>>,
    calls: AtomicUsize,
}

impl MockWebSearch {
    pub fn returning(hits: Vec<SearchHit>) -> Self {
        Self {
            hits: Some(hits),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            hits: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WebSearchProvider for MockWebSearch {
    async fn search(
        &self,
        _query: &str,
        max_results: usize,
    ) -> Result<Vec<SearchHit>, CapabilityError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.hits {
            Some(hits) => Ok(hits.iter().take(max_results).cloned().collect()),
            None => Err(CapabilityError::Connection {
                message: "search provider offline".to_string(),
            }),
        }
    }
}

/// A scripted [`AnswerModel`] that returns a fixed answer or always fails,
/// and records the last system prompt for assertions.
pub struct MockAnswerModel {
    model: String,
    answer: Option<String>,
    last_system_prompt: Mutex<Option<String>>,
}

impl MockAnswerModel {
    pub fn with_answer(answer: &str) -> Self {
        Self {
            model: "mock-model".to_string(),
            answer: Some(answer.to_string()),
            last_system_prompt: Mutex::new(None),
        }
    }

    pub fn failing() -> Self {
        Self {
            model: "mock-model".to_string(),
            answer: None,
            last_system_prompt: Mutex::new(None),
        }
    }

    pub fn with_model_name(mut self, name: &str) -> Self {
        self.model = name.to_string();
        self
    }

    /// The system prompt passed to the most recent `complete` call.
    pub fn last_system_prompt(&self) -> Option<String> {
        self.last_system_prompt.lock().unwrap().clone()
    }
}

#[async_trait]
impl AnswerModel for MockAnswerModel {
    async fn complete(
        &self,
        system_prompt: &str,
        _user_message: &str,
    ) -> Result<String, CapabilityError> {
        *self.last_system_prompt.lock().unwrap() = Some(system_prompt.to_string());
        match &self.answer {
            Some(a) => Ok(a.clone()),
            None => Err(CapabilityError::ApiRequest {
                message: "model unavailable".to_string(),
            }),
        }
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_store_tag_filter() {
        let store = InMemoryKnowledgeStore::new();
        store.seed(
            "Citrus canker causes raised lesions on leaves",
            "canker.pdf",
            Page::Number(3),
            Intent::Disease,
        );
        store.seed(
            "PM-KISAN provides income support to farmers",
            "schemes.pdf",
            Page::Number(1),
            Intent::Scheme,
        );

        let hits = store
            .search("citrus canker lesions", Some(Intent::Disease), 3)
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].document.as_deref(), Some("canker.pdf"));

        let hits = store
            .search("citrus canker lesions", Some(Intent::Scheme), 3)
            .await
            .unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn test_in_memory_store_top_k() {
        let store = InMemoryKnowledgeStore::new();
        for i in 0..5 {
            store.seed(
                &format!("canker note {}", i),
                "canker.pdf",
                Page::Number(i),
                Intent::Disease,
            );
        }
        let hits = store.search("canker", None, 2).await.unwrap();
        assert_eq!(hits.len(), 2);
    }

    #[tokio::test]
    async fn test_upserted_knowledge_is_searchable() {
        let store = InMemoryKnowledgeStore::new();
        store
            .upsert(LearnedKnowledge::new(
                "copper sprays control canker spread",
                "https://example.org",
                Intent::Disease,
            ))
            .await
            .unwrap();

        let hits = store
            .search("copper sprays", Some(Intent::Disease), 3)
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].document.as_deref(), Some("Web Search (Learned)"));
        assert_eq!(store.learned_entries().len(), 1);
    }

    #[tokio::test]
    async fn test_failing_store() {
        let store = InMemoryKnowledgeStore::new();
        store.fail_searches();
        assert!(store.search("anything", None, 3).await.is_err());
        assert_eq!(store.search_call_count(), 1);
    }

    #[tokio::test]
    async fn test_mock_grader_records_context() {
        let grader = MockGraderModel::returning(true);
        let decision = grader.grade("q", "some context").await.unwrap();
        assert!(decision.is_sufficient);
        assert_eq!(grader.last_context().as_deref(), Some("some context"));
        assert_eq!(grader.call_count(), 1);
    }
}
