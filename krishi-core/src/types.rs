//! Fundamental types shared across the Krishi workflow.
//!
//! Defines the intent taxonomy, citations, retrieved chunks, search hits,
//! session turns, learned-knowledge entries, and the request/response shapes
//! the core exposes to its caller.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The four fixed categories a farmer question can classify into.
///
/// `Hybrid` doubles as the fail-closed default when the classification
/// capability is unavailable: it is the superset that still lets retrieval
/// proceed safely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    /// Crop pests, diseases, symptoms, plant health.
    Disease,
    /// Government subsidies, financial help, agricultural programs.
    Scheme,
    /// A question combining both topic areas.
    Hybrid,
    /// Not about agriculture at all.
    OutOfScope,
}

impl Intent {
    /// The wire label for this intent.
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Disease => "disease",
            Intent::Scheme => "scheme",
            Intent::Hybrid => "hybrid",
            Intent::OutOfScope => "out_of_scope",
        }
    }

    /// Parse a wire label into an intent. Returns `None` for anything that is
    /// not exactly one of the four labels.
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "disease" => Some(Intent::Disease),
            "scheme" => Some(Intent::Scheme),
            "hybrid" => Some(Intent::Hybrid),
            "out_of_scope" => Some(Intent::OutOfScope),
            _ => None,
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A page reference inside a source document.
///
/// Store metadata may carry a page number, an arbitrary label, or nothing at
/// all; web results never have one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Page {
    Number(i64),
    Label(String),
}

impl Page {
    /// The placeholder used when no page information exists.
    pub fn not_available() -> Self {
        Page::Label("N/A".to_string())
    }
}

impl fmt::Display for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Page::Number(n) => write!(f, "{}", n),
            Page::Label(s) => f.write_str(s),
        }
    }
}

impl Default for Page {
    fn default() -> Self {
        Page::not_available()
    }
}

/// Where a context chunk originated. Emitted 1:1 with context chunks, in
/// emission order, never deduplicated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    pub document: String,
    pub page: Page,
}

impl Citation {
    pub fn new(document: impl Into<String>, page: Page) -> Self {
        Self {
            document: document.into(),
            page,
        }
    }

    /// Citation for a web search result.
    pub fn web(url: &str) -> Self {
        Self {
            document: format!("Web: {}", url),
            page: Page::not_available(),
        }
    }
}

/// One chunk returned by the knowledge store. `document` and `page` may be
/// absent in store metadata; callers substitute `"Unknown"` / `"N/A"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedChunk {
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<Page>,
}

/// One ranked result from the web search capability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub content: String,
    pub url: String,
}

/// A completed (question, answer) exchange in a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub question: String,
    pub answer: String,
    pub at: DateTime<Utc>,
}

impl Turn {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
            at: Utc::now(),
        }
    }
}

/// Knowledge discovered at runtime (web search or user correction) written
/// back into the store for future retrieval.
///
/// `tag` is the classified intent of the triggering request, not a fixed
/// constant: it ties the learned fact back to the topic area that produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearnedKnowledge {
    pub content: String,
    pub source_label: String,
    pub tag: Intent,
    pub is_learned: bool,
}

impl LearnedKnowledge {
    pub fn new(content: impl Into<String>, source_label: impl Into<String>, tag: Intent) -> Self {
        Self {
            content: content.into(),
            source_label: source_label.into(),
            tag,
            is_learned: true,
        }
    }
}

/// The classifier's structured decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentDecision {
    pub intent: Intent,
    /// Diagnostic only; never used downstream.
    pub explanation: String,
}

/// The sufficiency grader's binary decision. No partial scores.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradeDecision {
    pub is_sufficient: bool,
    pub reason: String,
}

/// A question entering the workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    pub question: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl QueryRequest {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            session_id: None,
        }
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }
}

/// The terminal output of one workflow run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    pub intent: Intent,
    pub answer: String,
    pub sources: Vec<Citation>,
}

/// User feedback on a previous answer; drives the correction flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackRequest {
    pub question: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub is_satisfied: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct_info: Option<String>,
}

/// What the feedback flow did with the submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackOutcome {
    /// Nothing to learn; feedback recorded.
    Acknowledged,
    /// The user's correction was written to the knowledge store.
    CorrectionStored,
    /// An automated search result was written to the knowledge store.
    Researched,
}

impl FeedbackOutcome {
    /// The user-facing acknowledgement text for this outcome.
    pub fn user_message(&self) -> &'static str {
        match self {
            FeedbackOutcome::Acknowledged => "Thanks for your feedback!",
            FeedbackOutcome::CorrectionStored => {
                "Thank you for the correction! I have learned this for future queries."
            }
            FeedbackOutcome::Researched => "I've learned more about this topic to improve!",
        }
    }
}
