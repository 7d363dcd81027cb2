//! Conversation flow for the deskbot ticket assistant.
//!
//! `ChatService` drives each user turn: it routes the message, lets
//! `TicketOrchestrator` advance the session and formats the outcome.

pub mod chat_service;
pub mod formatter;
pub mod idempotency;
pub mod orchestrator;
pub mod outcome;
pub mod render;
pub mod session_locks;

pub use chat_service::{ChatReply, ChatService};
pub use formatter::{BotReply, ReplyKind, ResponseFormatter};
pub use idempotency::idempotency_key;
pub use orchestrator::TicketOrchestrator;
pub use outcome::{FlowState, PromptKind, TurnOutcome, TurnPayload};
pub use render::ReplyRenderer;
pub use deskbot_core::retry::RetryPolicy;
pub use session_locks::SessionLocks;
