//! OpenAI-compatible chat-completions adapter.
//!
//! Works against Groq, OpenAI, Ollama, vLLM, and any endpoint following the
//! chat completions API format. One instance implements all three LLM-backed
//! capabilities: intent classification and sufficiency grading via
//! JSON-object responses, and free-text answer generation.

use crate::capability::{AnswerModel, GraderModel, IntentModel};
use crate::error::CapabilityError;
use crate::types::{GradeDecision, Intent, IntentDecision};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

/// System prompt for intent classification.
const CLASSIFIER_PROMPT: &str = "\
You are an expert agricultural intent classifier for a farmer chatbot. \
Classify the farmer's query into exactly one of four categories:
1. 'disease': the query is about crop pests, diseases, symptoms, or plant health.
2. 'scheme': the query is about government subsidies, financial help, or agricultural programs.
3. 'hybrid': the query combines both.
4. 'out_of_scope': the query is NOT about agriculture at all (general knowledge, sports, unrelated small talk).

RULES:
- ANY question related to farming, crops, or agriculture maps to 1, 2, or 3.
- Handle spelling mistakes gracefully.
- Use 'out_of_scope' ONLY for totally non-agricultural queries.

Respond with a JSON object: {\"intent\": \"<label>\", \"explanation\": \"<brief reason>\"}";

/// System prompt for sufficiency grading.
const GRADER_PROMPT: &str = "\
You are a quality grader. Given a user question and retrieved context, decide \
if the context matches the question well enough to provide a helpful answer \
WITHOUT searching the web.

Respond with a JSON object: {\"is_sufficient\": true|false, \"reason\": \"<brief reason>\"}";

/// An OpenAI-compatible chat-completions model.
pub struct OpenAiCompatibleModel {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f64,
    timeout_secs: u64,
}

impl OpenAiCompatibleModel {
    pub fn new(
        base_url: &str,
        api_key: &str,
        model: &str,
        temperature: f64,
        timeout_secs: u64,
    ) -> Result<Self, CapabilityError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| CapabilityError::Connection {
                message: format!("failed to build HTTP client: {}", e),
            })?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            temperature,
            timeout_secs,
        })
    }

    /// One chat-completions round trip, returning the assistant text.
    async fn chat(
        &self,
        system_prompt: &str,
        user_message: &str,
        json_mode: bool,
    ) -> Result<String, CapabilityError> {
        let mut body = json!({
            "model": self.model,
            "temperature": self.temperature,
            "messages": [
                {"role": "system", "content": system_prompt},
                {"role": "user", "content": user_message},
            ],
        });
        if json_mode {
            body["response_format"] = json!({"type": "json_object"});
        }

        debug!(model = %self.model, json_mode, "Sending chat completion request");
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    CapabilityError::Timeout {
                        timeout_secs: self.timeout_secs,
                    }
                } else {
                    CapabilityError::Connection {
                        message: e.to_string(),
                    }
                }
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(CapabilityError::AuthFailed {
                capability: format!("chat completions ({})", self.model),
            });
        }
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
                .unwrap_or(60);
            return Err(CapabilityError::RateLimited { retry_after_secs });
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(CapabilityError::ApiRequest {
                message: format!("HTTP {}: {}", status, text.chars().take(200).collect::<String>()),
            });
        }

        let body: Value = response.json().await.map_err(|e| CapabilityError::ResponseParse {
            message: format!("invalid JSON body: {}", e),
        })?;
        parse_completion_text(&body)
    }
}

/// Extract the assistant message text from a chat-completions response body.
fn parse_completion_text(body: &Value) -> Result<String, CapabilityError> {
    body.get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .map(str::to_string)
        .ok_or_else(|| CapabilityError::ResponseParse {
            message: "no message content in response".to_string(),
        })
}

/// Strip Markdown code fences some models wrap around JSON output.
fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

/// Parse the classifier's JSON decision, rejecting any label outside the
/// four-value taxonomy.
fn parse_intent_decision(text: &str) -> Result<IntentDecision, CapabilityError> {
    let value: Value =
        serde_json::from_str(strip_code_fences(text)).map_err(|e| CapabilityError::ResponseParse {
            message: format!("classifier returned invalid JSON: {}", e),
        })?;
    let label = value
        .get("intent")
        .and_then(|v| v.as_str())
        .ok_or_else(|| CapabilityError::ResponseParse {
            message: "classifier response missing 'intent'".to_string(),
        })?;
    let intent = Intent::from_label(label).ok_or_else(|| CapabilityError::ResponseParse {
        message: format!("classifier returned unknown label '{}'", label),
    })?;
    let explanation = value
        .get("explanation")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();
    Ok(IntentDecision { intent, explanation })
}

/// Parse the grader's JSON decision.
fn parse_grade_decision(text: &str) -> Result<GradeDecision, CapabilityError> {
    let value: Value =
        serde_json::from_str(strip_code_fences(text)).map_err(|e| CapabilityError::ResponseParse {
            message: format!("grader returned invalid JSON: {}", e),
        })?;
    let is_sufficient = value
        .get("is_sufficient")
        .and_then(|v| v.as_bool())
        .ok_or_else(|| CapabilityError::ResponseParse {
            message: "grader response missing 'is_sufficient'".to_string(),
        })?;
    let reason = value
        .get("reason")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();
    Ok(GradeDecision {
        is_sufficient,
        reason,
    })
}

#[async_trait]
impl IntentModel for OpenAiCompatibleModel {
    async fn classify(&self, question: &str) -> Result<IntentDecision, CapabilityError> {
        let text = self.chat(CLASSIFIER_PROMPT, question, true).await?;
        parse_intent_decision(&text)
    }
}

#[async_trait]
impl GraderModel for OpenAiCompatibleModel {
    async fn grade(
        &self,
        question: &str,
        context: &str,
    ) -> Result<GradeDecision, CapabilityError> {
        let user_message = format!(
            "Question: {}\nContext: {}\n\nIs the context sufficient?",
            question, context
        );
        let text = self.chat(GRADER_PROMPT, &user_message, true).await?;
        parse_grade_decision(&text)
    }
}

#[async_trait]
impl AnswerModel for OpenAiCompatibleModel {
    async fn complete(
        &self,
        system_prompt: &str,
        user_message: &str,
    ) -> Result<String, CapabilityError> {
        self.chat(system_prompt, user_message, false).await
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_completion_text() {
        let body = json!({
            "choices": [{"message": {"role": "assistant", "content": "hello"}}]
        });
        assert_eq!(parse_completion_text(&body).unwrap(), "hello");
    }

    #[test]
    fn test_parse_completion_missing_content() {
        let body = json!({"choices": []});
        assert!(parse_completion_text(&body).is_err());
    }

    #[test]
    fn test_parse_intent_decision() {
        let decision =
            parse_intent_decision(r#"{"intent": "disease", "explanation": "pest question"}"#)
                .unwrap();
        assert_eq!(decision.intent, Intent::Disease);
        assert_eq!(decision.explanation, "pest question");
    }

    #[test]
    fn test_parse_intent_decision_code_fenced() {
        let decision = parse_intent_decision(
            "```json\n{\"intent\": \"out_of_scope\", \"explanation\": \"sports\"}\n```",
        )
        .unwrap();
        assert_eq!(decision.intent, Intent::OutOfScope);
    }

    #[test]
    fn test_parse_intent_decision_rejects_unknown_label() {
        let result = parse_intent_decision(r#"{"intent": "weather", "explanation": ""}"#);
        assert!(matches!(
            result,
            Err(CapabilityError::ResponseParse { .. })
        ));
    }

    #[test]
    fn test_parse_intent_decision_rejects_prose() {
        assert!(parse_intent_decision("The intent is disease.").is_err());
    }

    #[test]
    fn test_parse_grade_decision() {
        let decision =
            parse_grade_decision(r#"{"is_sufficient": false, "reason": "no treatment info"}"#)
                .unwrap();
        assert!(!decision.is_sufficient);
        assert_eq!(decision.reason, "no treatment info");
    }

    #[test]
    fn test_parse_grade_decision_missing_field() {
        assert!(parse_grade_decision(r#"{"reason": "hmm"}"#).is_err());
    }

    #[test]
    fn test_strip_code_fences_plain_text_untouched() {
        assert_eq!(strip_code_fences("  {\"a\": 1}  "), "{\"a\": 1}");
    }
}
