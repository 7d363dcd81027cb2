//! Session store collaborator.

use super::model::ConversationSession;
use crate::error::Result;
use async_trait::async_trait;

/// Persistence for conversation sessions.
///
/// Eviction of idle sessions is the store's policy: an expired session is
/// reported as absent by `load`.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Finds a live session by its ID.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(session))`: session found and not expired
    /// - `Ok(None)`: no such session, or it was evicted
    /// - `Err(_)`: the store could not be read
    async fn load(&self, session_id: &str) -> Result<Option<ConversationSession>>;

    /// Inserts or replaces a session.
    async fn save(&self, session: &ConversationSession) -> Result<()>;

    /// Removes a session. Deleting a missing session is not an error.
    async fn delete(&self, session_id: &str) -> Result<()>;
}
