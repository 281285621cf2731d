//! Context sufficiency grading.

use crate::capability::GraderModel;
use crate::error::CapabilityError;
use crate::text::truncate_chars;
use crate::types::GradeDecision;
use std::sync::Arc;

/// Single-shot binary grading of retrieved context against a question.
///
/// Only a leading prefix of the context is shown to the grading model; the
/// full context would waste tokens on a yes/no decision. Failures are not
/// retried here; the retrieval coordinator decides what a grading failure
/// means (no search).
pub struct SufficiencyGrader {
    model: Arc<dyn GraderModel>,
    prefix_chars: usize,
}

impl SufficiencyGrader {
    pub fn new(model: Arc<dyn GraderModel>, prefix_chars: usize) -> Self {
        Self {
            model,
            prefix_chars,
        }
    }

    /// Grade whether `context` is enough to answer `question` without a live
    /// web search.
    pub async fn grade(
        &self,
        question: &str,
        context: &str,
    ) -> Result<GradeDecision, CapabilityError> {
        let prefix = truncate_chars(context, self.prefix_chars);
        self.model.grade(question, prefix).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::MockGraderModel;

    #[tokio::test]
    async fn test_grade_truncates_context_to_prefix() {
        let model = Arc::new(MockGraderModel::returning(true));
        let grader = SufficiencyGrader::new(model.clone(), 10);
        let long_context = "x".repeat(50);

        grader.grade("q", &long_context).await.unwrap();
        assert_eq!(model.last_context().unwrap().len(), 10);
    }

    #[tokio::test]
    async fn test_grade_short_context_untouched() {
        let model = Arc::new(MockGraderModel::returning(false));
        let grader = SufficiencyGrader::new(model.clone(), 2000);

        let decision = grader.grade("q", "short context").await.unwrap();
        assert!(!decision.is_sufficient);
        assert_eq!(model.last_context().as_deref(), Some("short context"));
    }

    #[tokio::test]
    async fn test_grade_propagates_capability_failure() {
        let grader = SufficiencyGrader::new(Arc::new(MockGraderModel::failing()), 2000);
        assert!(grader.grade("q", "context").await.is_err());
    }
}
