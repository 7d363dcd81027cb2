//! In-memory session store with idle eviction.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use deskbot_core::error::Result;
use deskbot_core::session::{ConversationSession, SessionRepository};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Clone)]
pub struct InMemorySessionStore {
    sessions: Arc<RwLock<HashMap<String, ConversationSession>>>,
    ttl: Duration,
}

impl InMemorySessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    /// Drops every session idle for longer than the TTL.
    pub async fn evict_expired(&self) -> usize {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| !s.is_expired(now, self.ttl));
        before - sessions.len()
    }
}

#[async_trait]
impl SessionRepository for InMemorySessionStore {
    async fn load(&self, session_id: &str) -> Result<Option<ConversationSession>> {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        match sessions.get(session_id) {
            Some(session) if session.is_expired(now, self.ttl) => {
                tracing::debug!(session_id, "Evicting idle session");
                sessions.remove(session_id);
                Ok(None)
            }
            Some(session) => Ok(Some(session.clone())),
            None => Ok(None),
        }
    }

    async fn save(&self, session: &ConversationSession) -> Result<()> {
        self.sessions
            .write()
            .await
            .insert(session.id.clone(), session.clone());
        Ok(())
    }

    async fn delete(&self, session_id: &str) -> Result<()> {
        self.sessions.write().await.remove(session_id);
        Ok(())
    }
}
