pub mod config_service;
pub mod memory_knowledge_base;
pub mod memory_session_store;
pub mod memory_ticket_store;
pub mod paths;
pub mod storage;
pub mod toml_session_repository;

pub use crate::config_service::{ConfigService, load_config, load_knowledge_base, load_rule_table};
pub use crate::memory_knowledge_base::InMemoryKnowledgeBase;
pub use crate::memory_session_store::InMemorySessionStore;
pub use crate::memory_ticket_store::InMemoryTicketStore;
pub use crate::paths::DeskbotPaths;
pub use crate::toml_session_repository::TomlSessionRepository;
