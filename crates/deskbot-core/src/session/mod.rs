//! Conversation sessions and their persistence contract.

mod model;
mod repository;

pub use model::{CollectedFields, ConversationSession, Stage};
pub use repository::SessionRepository;
