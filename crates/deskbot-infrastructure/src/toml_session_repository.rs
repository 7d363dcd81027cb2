//! TOML-directory session store.
//!
//! One file per session:
//! ```text
//! sessions_dir/
//! ├── <session-id-1>.toml
//! └── <session-id-2>.toml
//! ```
//! Idle sessions are deleted when a load finds them expired.

use crate::storage::AtomicTomlFile;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use deskbot_core::error::{DeskbotError, Result};
use deskbot_core::session::{ConversationSession, SessionRepository};
use std::fs;
use std::path::{Path, PathBuf};

pub struct TomlSessionRepository {
    sessions_dir: PathBuf,
    ttl: Duration,
}

impl TomlSessionRepository {
    /// Creates the store, creating `sessions_dir` if needed.
    pub fn new(sessions_dir: impl AsRef<Path>, ttl: Duration) -> Result<Self> {
        let sessions_dir = sessions_dir.as_ref().to_path_buf();
        fs::create_dir_all(&sessions_dir)?;
        Ok(Self { sessions_dir, ttl })
    }

    fn session_file(&self, session_id: &str) -> Result<AtomicTomlFile<ConversationSession>> {
        // ids become file names
        let valid = !session_id.is_empty()
            && session_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(DeskbotError::validation(format!(
                "invalid session id '{}'",
                session_id
            )));
        }
        Ok(AtomicTomlFile::new(
            self.sessions_dir.join(format!("{}.toml", session_id)),
        ))
    }

    fn load_blocking(&self, session_id: &str) -> Result<Option<ConversationSession>> {
        let file = self.session_file(session_id)?;
        let Some(session) = file.load()? else {
            return Ok(None);
        };
        if session.is_expired(Utc::now(), self.ttl) {
            tracing::debug!(session_id, "Evicting idle session file");
            file.remove()?;
            return Ok(None);
        }
        Ok(Some(session))
    }
}

#[async_trait]
impl SessionRepository for TomlSessionRepository {
    async fn load(&self, session_id: &str) -> Result<Option<ConversationSession>> {
        self.load_blocking(session_id)
    }

    async fn save(&self, session: &ConversationSession) -> Result<()> {
        self.session_file(&session.id)?.save_locked(session)
    }

    async fn delete(&self, session_id: &str) -> Result<()> {
        self.session_file(session_id)?.remove()
    }
}
