//! Per-turn driver tying routing, orchestration and persistence together.

use crate::formatter::{BotReply, ResponseFormatter};
use crate::orchestrator::TicketOrchestrator;
use crate::outcome::TurnOutcome;
use crate::session_locks::SessionLocks;
use chrono::Utc;
use deskbot_core::error::{DeskbotError, Result};
use deskbot_core::intent::{IntentRouter, IntentVerdict};
use deskbot_core::session::{ConversationSession, SessionRepository};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

/// Everything produced for one user message.
#[derive(Debug, Clone, Serialize)]
pub struct ChatReply {
    pub session_id: String,
    pub verdict: IntentVerdict,
    pub outcome: TurnOutcome,
    pub reply: BotReply,
}

/// Handles user messages for any number of concurrent sessions.
///
/// # Thread Safety
///
/// Turns of the same session are serialised through [`SessionLocks`]; the
/// session is loaded, advanced and saved while the lock is held. The lock is
/// released on every path, including errors, so idle sessions leave no entry.
pub struct ChatService {
    router: IntentRouter,
    orchestrator: TicketOrchestrator,
    sessions: Arc<dyn SessionRepository>,
    formatter: ResponseFormatter,
    locks: SessionLocks,
}

impl ChatService {
    pub fn new(router: IntentRouter, orchestrator: TicketOrchestrator, sessions: Arc<dyn SessionRepository>) -> Self {
        Self {
            router,
            orchestrator,
            sessions,
            formatter: ResponseFormatter,
            locks: SessionLocks::new(),
        }
    }

    /// Processes one message from `reporter_id` in `session_id`.
    ///
    /// # Errors
    ///
    /// Only session-store failures and a session that belongs to another
    /// reporter are errors; everything else is part of the reply.
    pub async fn handle_message(&self, session_id: &str, reporter_id: &str, message: &str) -> Result<ChatReply> {
        let turn = self.locks.acquire(session_id).await;
        let result = self.run_turn(session_id, reporter_id, message).await;
        self.locks.release(session_id, turn).await;
        result
    }

    /// One turn; the caller holds the session's turn lock.
    async fn run_turn(&self, session_id: &str, reporter_id: &str, message: &str) -> Result<ChatReply> {
        let now = Utc::now();

        let mut session = match self.sessions.load(session_id).await? {
            Some(session) if session.reporter_id == reporter_id => session,
            Some(_) => {
                return Err(DeskbotError::validation(
                    "This conversation belongs to someone else. Please start a new one.",
                ));
            }
            None => {
                info!(session_id, reporter_id, "Starting new session");
                ConversationSession::new(session_id, reporter_id, now)
            }
        };

        let verdict = self.router.route(message, session.stage).await;
        debug!(
            session_id,
            intent = %verdict.intent,
            confidence = verdict.confidence,
            source = %verdict.source,
            "Routed message"
        );

        let outcome = self.orchestrator.handle_turn(&mut session, message, &verdict, now).await;
        self.sessions.save(&session).await?;

        let reply = self.formatter.format(&outcome);
        Ok(ChatReply {
            session_id: session_id.to_string(),
            verdict,
            outcome,
            reply,
        })
    }

    /// The persisted session, if it has not expired.
    pub async fn session(&self, session_id: &str) -> Result<Option<ConversationSession>> {
        self.sessions.load(session_id).await
    }

    /// Drops the session.
    pub async fn end_session(&self, session_id: &str) -> Result<()> {
        let turn = self.locks.acquire(session_id).await;
        let deleted = self.sessions.delete(session_id).await;
        self.locks.release(session_id, turn).await;
        deleted?;
        info!(session_id, "Session ended");
        Ok(())
    }
}
