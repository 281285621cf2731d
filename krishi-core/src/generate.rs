//! Answer synthesis: prompt assembly, model fallback, and history recording.

use crate::capability::AnswerModel;
use crate::config::GenerationConfig;
use crate::error::WorkflowError;
use crate::memory::SessionMemoryStore;
use crate::text::truncate_chars;
use crate::types::{Intent, Turn};
use crate::workflow::RequestState;
use std::sync::Arc;
use tracing::{info, warn};

/// Marker appended when the context was cut to the configured cap.
pub const CONTEXT_TRIMMED_MARKER: &str = "\n... [Context trimmed for focus] ...";

/// Redirect template for questions outside the advisory's expertise.
const REDIRECT_PROMPT: &str = "\
You are a warm and helpful agricultural expert. The user has asked something \
outside your core expertise.

Response Rules:
1. Acknowledge the question kindly.
2. Gently steer them back to agricultural topics (crop diseases or government \
schemes) where you can provide real value.
3. Do not be a rigid robot; sound like a friendly neighbor who also happens to \
be a scientist.";

/// Produces the final answer and appends the completed turn to session
/// history.
///
/// In-scope questions get the structured four-section advisory prompt;
/// out-of-scope questions get a redirect with no structure. If the primary
/// model fails, the same prompt is retried once against the fallback model;
/// if both fail the error surfaces to the caller, the only unrecoverable
/// path in the pipeline.
pub struct AnswerSynthesizer {
    primary: Arc<dyn AnswerModel>,
    fallback: Arc<dyn AnswerModel>,
    memory: Arc<SessionMemoryStore>,
    config: GenerationConfig,
}

impl AnswerSynthesizer {
    pub fn new(
        primary: Arc<dyn AnswerModel>,
        fallback: Arc<dyn AnswerModel>,
        memory: Arc<SessionMemoryStore>,
        config: GenerationConfig,
    ) -> Self {
        Self {
            primary,
            fallback,
            memory,
            config,
        }
    }

    /// Generate the answer for a fully-staged request and record the turn.
    pub async fn generate(&self, state: &RequestState) -> Result<String, WorkflowError> {
        let system_prompt = if state.intent == Intent::OutOfScope {
            REDIRECT_PROMPT.to_string()
        } else {
            self.advisory_prompt(state)
        };

        let answer = self.complete_with_fallback(&system_prompt, &state.question).await?;

        self.memory
            .append(&state.session_id, Turn::new(&state.question, &answer))
            .await;

        Ok(answer)
    }

    /// Try the primary model, then the fallback once with the same prompt.
    async fn complete_with_fallback(
        &self,
        system_prompt: &str,
        question: &str,
    ) -> Result<String, WorkflowError> {
        let primary_err = match self.primary.complete(system_prompt, question).await {
            Ok(answer) => {
                info!(model = self.primary.model_name(), "Generated answer");
                return Ok(answer);
            }
            Err(e) => {
                warn!(
                    model = self.primary.model_name(),
                    error = %e,
                    "Primary generation failed; retrying on fallback model"
                );
                e
            }
        };

        match self.fallback.complete(system_prompt, question).await {
            Ok(answer) => {
                info!(model = self.fallback.model_name(), "Fallback model answered");
                Ok(answer)
            }
            Err(fallback_err) => Err(WorkflowError::GenerationFailed {
                message: format!("primary: {}; fallback: {}", primary_err, fallback_err),
            }),
        }
    }

    /// The four-section advisory prompt. Context is capped, history is a
    /// read-only window of the most recent turns, and the style rules forbid
    /// any mention of where the knowledge came from.
    fn advisory_prompt(&self, state: &RequestState) -> String {
        let context = self.capped_context(&state.context);
        let history = self.render_history(&state.history);
        let learning_note = if state.search_triggered {
            "I've included some fresh insights from my research to ensure you have \
             the most complete answer."
        } else {
            ""
        };

        format!(
            "You are the Elite Agri Consultant. Your signature answers are the gold \
             standard for agricultural advice.

KNOWLEDGE BASE CONTEXT: {context}
{history}
QUESTION: {question}

{learning_note}

SIGNATURE ANSWER FORMAT (MANDATORY):
1. **EXPERT ANALYSIS**: Start with a warm professional greeting. Summarize the \
core answer clearly. If the data is complex or in a table, DE-CLUTTER it and \
present only the most important facts in simple bullet points.
2. **ACTION PLAN**: Provide exactly 3 high-impact steps the farmer should take \
immediately.
3. **PRO-CONSULTANT TIP**: Provide one piece of unique, high-value advice based \
on the context.
4. **FINAL WORD**: A warm, professional closing.

STRICT STYLE RULES:
- NEVER mention \"PDF\", \"Source\", \"Database\", or \"Knowledge Base\".
- Use ONLY the headers above. No extra text or footers.
- Bold the headers (**EXPERT ANALYSIS**, etc.).
- Fix all raw data: Convert any messy text or table data into clear, \
human-readable sentences.",
            context = context,
            history = history,
            question = state.question,
            learning_note = learning_note,
        )
    }

    /// Cut the context to the configured cap, marking the cut.
    fn capped_context(&self, context: &str) -> String {
        let capped = truncate_chars(context, self.config.context_cap_chars);
        if capped.len() < context.len() {
            format!("{}{}", capped, CONTEXT_TRIMMED_MARKER)
        } else {
            capped.to_string()
        }
    }

    /// Render the last few turns as role-labeled lines, each message cut to
    /// the per-line cap. Empty history renders nothing.
    fn render_history(&self, history: &[Turn]) -> String {
        if history.is_empty() {
            return String::new();
        }

        let window_start = history.len().saturating_sub(self.config.history_window_turns);
        let mut rendered = String::from("\n--- RECENT CONVERSATION ---\n");
        for turn in &history[window_start..] {
            rendered.push_str(&format!(
                "Farmer: {}\nAdvisor: {}\n",
                truncate_chars(&turn.question, self.config.history_turn_chars),
                truncate_chars(&turn.answer, self.config.history_turn_chars),
            ));
        }
        rendered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::MockAnswerModel;
    use crate::types::Citation;
    use pretty_assertions::assert_eq;

    fn state(intent: Intent) -> RequestState {
        RequestState {
            question: "How to treat citrus canker?".to_string(),
            session_id: "s1".to_string(),
            intent,
            context: "Canker guidance from the knowledge base.".to_string(),
            sources: vec![Citation::web("https://e.org")],
            search_triggered: false,
            history: Vec::new(),
        }
    }

    fn synthesizer(
        primary: Arc<MockAnswerModel>,
        fallback: Arc<MockAnswerModel>,
    ) -> (AnswerSynthesizer, Arc<SessionMemoryStore>) {
        let memory = Arc::new(SessionMemoryStore::new());
        let synth = AnswerSynthesizer::new(
            primary,
            fallback,
            Arc::clone(&memory),
            GenerationConfig::default(),
        );
        (synth, memory)
    }

    #[tokio::test]
    async fn test_in_scope_uses_four_section_prompt() {
        let primary = Arc::new(MockAnswerModel::with_answer("answer"));
        let (synth, _) = synthesizer(primary.clone(), Arc::new(MockAnswerModel::failing()));

        synth.generate(&state(Intent::Disease)).await.unwrap();
        let prompt = primary.last_system_prompt().unwrap();
        assert!(prompt.contains("**EXPERT ANALYSIS**"));
        assert!(prompt.contains("**ACTION PLAN**"));
        assert!(prompt.contains("**PRO-CONSULTANT TIP**"));
        assert!(prompt.contains("**FINAL WORD**"));
        assert!(prompt.contains("Canker guidance from the knowledge base."));
        assert!(prompt.contains("QUESTION: How to treat citrus canker?"));
    }

    #[tokio::test]
    async fn test_out_of_scope_uses_redirect_prompt() {
        let primary = Arc::new(MockAnswerModel::with_answer("redirect answer"));
        let (synth, _) = synthesizer(primary.clone(), Arc::new(MockAnswerModel::failing()));

        synth.generate(&state(Intent::OutOfScope)).await.unwrap();
        let prompt = primary.last_system_prompt().unwrap();
        assert!(!prompt.contains("EXPERT ANALYSIS"));
        assert!(prompt.contains("Gently steer them back to agricultural topics"));
    }

    #[tokio::test]
    async fn test_context_capped_at_limit_with_marker() {
        let primary = Arc::new(MockAnswerModel::with_answer("answer"));
        let (synth, _) = synthesizer(primary.clone(), Arc::new(MockAnswerModel::failing()));

        let mut s = state(Intent::Disease);
        s.context = "x".repeat(4500);
        synth.generate(&s).await.unwrap();

        let prompt = primary.last_system_prompt().unwrap();
        let expected = format!("{}{}", "x".repeat(4000), CONTEXT_TRIMMED_MARKER);
        assert!(prompt.contains(&expected));
        assert!(!prompt.contains(&"x".repeat(4001)));
    }

    #[tokio::test]
    async fn test_short_context_not_marked() {
        let primary = Arc::new(MockAnswerModel::with_answer("answer"));
        let (synth, _) = synthesizer(primary.clone(), Arc::new(MockAnswerModel::failing()));

        synth.generate(&state(Intent::Disease)).await.unwrap();
        let prompt = primary.last_system_prompt().unwrap();
        assert!(!prompt.contains(CONTEXT_TRIMMED_MARKER));
    }

    #[tokio::test]
    async fn test_history_window_is_last_two_turns() {
        let primary = Arc::new(MockAnswerModel::with_answer("answer"));
        let (synth, _) = synthesizer(primary.clone(), Arc::new(MockAnswerModel::failing()));

        let mut s = state(Intent::Disease);
        s.history = vec![
            Turn::new("first question", "first answer"),
            Turn::new("second question", "second answer"),
            Turn::new("third question", "third answer"),
        ];
        synth.generate(&s).await.unwrap();

        let prompt = primary.last_system_prompt().unwrap();
        assert!(!prompt.contains("first question"));
        assert!(prompt.contains("Farmer: second question"));
        assert!(prompt.contains("Advisor: third answer"));
    }

    #[tokio::test]
    async fn test_history_lines_truncated() {
        let primary = Arc::new(MockAnswerModel::with_answer("answer"));
        let (synth, _) = synthesizer(primary.clone(), Arc::new(MockAnswerModel::failing()));

        let mut s = state(Intent::Disease);
        s.history = vec![Turn::new("q", "y".repeat(500))];
        synth.generate(&s).await.unwrap();

        let prompt = primary.last_system_prompt().unwrap();
        assert!(prompt.contains(&format!("Advisor: {}", "y".repeat(300))));
        assert!(!prompt.contains(&"y".repeat(301)));
    }

    #[tokio::test]
    async fn test_learning_note_reflects_search_flag() {
        let primary = Arc::new(MockAnswerModel::with_answer("answer"));
        let (synth, _) = synthesizer(primary.clone(), Arc::new(MockAnswerModel::failing()));

        let mut s = state(Intent::Disease);
        s.search_triggered = true;
        synth.generate(&s).await.unwrap();
        assert!(primary
            .last_system_prompt()
            .unwrap()
            .contains("fresh insights from my research"));

        synth.generate(&state(Intent::Disease)).await.unwrap();
        assert!(!primary
            .last_system_prompt()
            .unwrap()
            .contains("fresh insights from my research"));
    }

    #[tokio::test]
    async fn test_fallback_model_answers_when_primary_fails() {
        let fallback = Arc::new(MockAnswerModel::with_answer("fallback answer"));
        let (synth, memory) = synthesizer(Arc::new(MockAnswerModel::failing()), fallback);

        let answer = synth.generate(&state(Intent::Disease)).await.unwrap();
        assert_eq!(answer, "fallback answer");
        // Turn recorded regardless of which model produced the answer
        assert_eq!(memory.turn_count("s1").await, 1);
    }

    #[tokio::test]
    async fn test_both_models_failing_surfaces_error() {
        let (synth, memory) = synthesizer(
            Arc::new(MockAnswerModel::failing()),
            Arc::new(MockAnswerModel::failing()),
        );

        let result = synth.generate(&state(Intent::Disease)).await;
        assert!(matches!(
            result,
            Err(WorkflowError::GenerationFailed { .. })
        ));
        assert_eq!(memory.turn_count("s1").await, 0);
    }

    #[tokio::test]
    async fn test_turn_appended_after_success() {
        let primary = Arc::new(MockAnswerModel::with_answer("the answer"));
        let (synth, memory) = synthesizer(primary, Arc::new(MockAnswerModel::failing()));

        synth.generate(&state(Intent::Disease)).await.unwrap();
        let history = memory.history("s1").await;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].question, "How to treat citrus canker?");
        assert_eq!(history[0].answer, "the answer");
    }
}
