//! The feedback flow: learning from user corrections.
//!
//! Independent of the main pipeline; it reuses only the knowledge-upsert
//! and web-search capabilities. Entries learned here are tagged `hybrid`
//! because a dissatisfied user tells us nothing about which topic area the
//! correction belongs to.

use crate::capability::{KnowledgeStore, WebSearchProvider};
use crate::error::Result;
use crate::types::{FeedbackOutcome, FeedbackRequest, Intent, LearnedKnowledge};
use std::sync::Arc;
use tracing::info;

/// Handles satisfaction feedback on previous answers.
pub struct FeedbackHandler {
    store: Arc<dyn KnowledgeStore>,
    web: Arc<dyn WebSearchProvider>,
}

impl FeedbackHandler {
    pub fn new(store: Arc<dyn KnowledgeStore>, web: Arc<dyn WebSearchProvider>) -> Self {
        Self { store, web }
    }

    /// Process one feedback submission.
    ///
    /// - Satisfied: acknowledged, no store access.
    /// - Unsatisfied with a correction: the correction is upserted directly.
    /// - Unsatisfied without one: a single-result web search runs and its top
    ///   result is upserted.
    pub async fn handle(&self, request: FeedbackRequest) -> Result<FeedbackOutcome> {
        if request.is_satisfied {
            return Ok(FeedbackOutcome::Acknowledged);
        }

        if let Some(correction) = &request.correct_info {
            let session = request.session_id.as_deref().unwrap_or("anonymous");
            info!(session = %session, "Learning from user correction");
            let entry = LearnedKnowledge::new(
                correction.clone(),
                format!("User correction (session: {})", session),
                Intent::Hybrid,
            );
            self.store.upsert(entry).await?;
            return Ok(FeedbackOutcome::CorrectionStored);
        }

        info!(question = %request.question, "Researching unsatisfying answer");
        let hits = self.web.search(&request.question, 1).await?;
        match hits.first() {
            Some(hit) => {
                let entry = LearnedKnowledge::new(
                    hit.content.clone(),
                    hit.url.clone(),
                    Intent::Hybrid,
                );
                self.store.upsert(entry).await?;
                Ok(FeedbackOutcome::Researched)
            }
            None => Ok(FeedbackOutcome::Acknowledged),
        }
    }
}
