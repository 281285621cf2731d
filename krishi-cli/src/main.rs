//! Krishi CLI: terminal interface for the farmer advisory agent.
//!
//! Runs a question through the full workflow against configured LLM and
//! search endpoints, with an in-memory knowledge store seeded from a JSON
//! file. Also exposes the feedback flow for corrections.

use anyhow::{bail, Context};
use clap::Parser;
use krishi_core::capability::InMemoryKnowledgeStore;
use krishi_core::providers::{build_feedback_handler, build_workflow};
use krishi_core::types::{FeedbackRequest, Page, QueryRequest};
use krishi_core::{load_config, Intent, KnowledgeStore};
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Krishi: agentic advisory for crop disease and government schemes
#[derive(Parser, Debug)]
#[command(name = "krishi", version, about, long_about = None)]
struct Cli {
    /// Question to ask (omit when using a subcommand)
    question: Option<String>,

    /// Session id for conversation memory
    #[arg(short, long)]
    session: Option<String>,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// JSON file of knowledge chunks to seed the in-memory store
    #[arg(short, long)]
    knowledge: Option<PathBuf>,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Submit feedback on a previous answer
    Feedback {
        /// The question the feedback is about
        question: String,

        /// The answer was satisfactory
        #[arg(long)]
        satisfied: bool,

        /// Corrected information to learn
        #[arg(long)]
        correction: Option<String>,
    },
}

/// One knowledge chunk in the seed file.
#[derive(Debug, Deserialize)]
struct SeedChunk {
    content: String,
    #[serde(default)]
    document: Option<String>,
    #[serde(default)]
    page: Option<Page>,
    tag: Intent,
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("krishi_core={0},krishi={0}", default_level)));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn seed_store(path: Option<&PathBuf>) -> anyhow::Result<Arc<InMemoryKnowledgeStore>> {
    let store = Arc::new(InMemoryKnowledgeStore::new());
    if let Some(path) = path {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read knowledge file {}", path.display()))?;
        let chunks: Vec<SeedChunk> = serde_json::from_str(&json)
            .with_context(|| format!("invalid knowledge file {}", path.display()))?;
        for chunk in &chunks {
            store.seed(
                &chunk.content,
                chunk.document.as_deref().unwrap_or("Unknown"),
                chunk.page.clone().unwrap_or_else(Page::not_available),
                chunk.tag,
            );
        }
        tracing::info!(chunks = chunks.len(), "Seeded knowledge store");
    }
    Ok(store)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    dotenvy::dotenv().ok();

    let config = load_config(cli.config.as_deref())?;
    let store: Arc<dyn KnowledgeStore> = seed_store(cli.knowledge.as_ref())?;

    match cli.command {
        Some(Commands::Feedback {
            question,
            satisfied,
            correction,
        }) => {
            let handler = build_feedback_handler(&config, store)?;
            let outcome = handler
                .handle(FeedbackRequest {
                    question,
                    session_id: cli.session,
                    is_satisfied: satisfied,
                    correct_info: correction,
                })
                .await?;
            println!("{}", outcome.user_message());
        }
        None => {
            let Some(question) = cli.question else {
                bail!("provide a question, or a subcommand (see --help)");
            };
            let workflow = build_workflow(&config, store)?;
            let mut request = QueryRequest::new(question);
            if let Some(session) = cli.session {
                request = request.with_session(session);
            }

            let response = workflow.run(request).await?;
            println!("[intent: {}]\n", response.intent);
            println!("{}", response.answer);
            if !response.sources.is_empty() {
                println!("\nSources:");
                for source in &response.sources {
                    println!("- {} (Page {})", source.document, source.page);
                }
            }
        }
    }

    Ok(())
}
