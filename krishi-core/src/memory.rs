//! Per-session conversation memory.
//!
//! Histories are append-only and live for the process lifetime; there is no
//! eviction. The prompt window (last 2 turns) is enforced at read time by the
//! answer synthesizer, not at storage time. Concurrent requests sharing a
//! session id serialize their appends through the per-session lock so turn
//! order is never interleaved across requests.

use crate::types::Turn;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// In-memory store of ordered per-session conversation turns.
#[derive(Default)]
pub struct SessionMemoryStore {
    sessions: RwLock<HashMap<String, Arc<Mutex<Vec<Turn>>>>>,
}

impl SessionMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create the lock guarding one session's history.
    async fn session(&self, session_id: &str) -> Arc<Mutex<Vec<Turn>>> {
        if let Some(history) = self.sessions.read().await.get(session_id) {
            return Arc::clone(history);
        }
        let mut sessions = self.sessions.write().await;
        Arc::clone(
            sessions
                .entry(session_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(Vec::new()))),
        )
    }

    /// A snapshot of the session's full history, oldest first.
    pub async fn history(&self, session_id: &str) -> Vec<Turn> {
        self.session(session_id).await.lock().await.clone()
    }

    /// Append a completed turn to the session's history.
    pub async fn append(&self, session_id: &str, turn: Turn) {
        self.session(session_id).await.lock().await.push(turn);
    }

    /// Number of turns recorded for a session.
    pub async fn turn_count(&self, session_id: &str) -> usize {
        self.session(session_id).await.lock().await.len()
    }
}
