//! # Krishi Core
//!
//! Core library for the Krishi farmer advisory agent. Provides the agentic
//! retrieval workflow (intent classification, tag-filtered knowledge
//! retrieval with sufficiency grading, conditional web-search fallback with
//! self-learning, and templated answer synthesis) plus per-session
//! conversation memory and the user-feedback learning flow.

pub mod capability;
pub mod classify;
pub mod config;
pub mod error;
pub mod feedback;
pub mod generate;
pub mod grade;
pub mod memory;
pub mod providers;
pub mod retrieve;
pub mod search;
pub mod text;
pub mod types;
pub mod workflow;

// Re-export commonly used types at the crate root.
pub use capability::{
    AnswerModel, GraderModel, InMemoryKnowledgeStore, IntentModel, KnowledgeStore,
    WebSearchProvider,
};
pub use classify::IntentClassifier;
pub use config::{load_config, KrishiConfig};
pub use error::{CapabilityError, ConfigError, KrishiError, Result, WorkflowError};
pub use feedback::FeedbackHandler;
pub use generate::AnswerSynthesizer;
pub use grade::SufficiencyGrader;
pub use memory::SessionMemoryStore;
pub use retrieve::RetrievalCoordinator;
pub use search::WebSearchFallback;
pub use types::{
    Citation, FeedbackOutcome, FeedbackRequest, Intent, LearnedKnowledge, Page, QueryRequest,
    QueryResponse, Turn,
};
pub use workflow::{RequestState, Workflow};
