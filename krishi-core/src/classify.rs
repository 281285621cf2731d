//! Intent classification with a fail-closed default.

use crate::capability::IntentModel;
use crate::types::{Intent, IntentDecision};
use std::sync::Arc;
use tracing::{debug, warn};

/// Maps a farmer question to one of the four intent labels.
///
/// Never fails: if the classification capability errors (timeout, malformed
/// structured response), the decision falls back to [`Intent::Hybrid`], the
/// superset label under which retrieval can still proceed safely.
pub struct IntentClassifier {
    model: Arc<dyn IntentModel>,
}

impl IntentClassifier {
    pub fn new(model: Arc<dyn IntentModel>) -> Self {
        Self { model }
    }

    /// Classify a question. Always returns exactly one of the four labels.
    pub async fn classify(&self, question: &str) -> IntentDecision {
        match self.model.classify(question).await {
            Ok(decision) => {
                debug!(
                    intent = %decision.intent,
                    explanation = %decision.explanation,
                    "Classified question"
                );
                decision
            }
            Err(e) => {
                warn!(error = %e, "Classification failed; falling back to hybrid");
                IntentDecision {
                    intent: Intent::Hybrid,
                    explanation: "classifier unavailable, defaulted to hybrid".to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::MockIntentModel;

    #[tokio::test]
    async fn test_classify_passes_through_decision() {
        let classifier = IntentClassifier::new(Arc::new(MockIntentModel::returning(
            Intent::Disease,
        )));
        let decision = classifier.classify("leaf spots on my orange trees").await;
        assert_eq!(decision.intent, Intent::Disease);
    }

    #[tokio::test]
    async fn test_classifier_failure_falls_back_to_hybrid() {
        let classifier = IntentClassifier::new(Arc::new(MockIntentModel::failing()));
        let decision = classifier.classify("any question at all").await;
        assert_eq!(decision.intent, Intent::Hybrid);
    }
}
