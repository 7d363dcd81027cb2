//! Core domain of the deskbot ticket assistant.
//!
//! This crate holds the models, collaborator traits and the deterministic
//! engines (rules, duplicate scoring, intent routing, bounded retry). It performs no I/O of
//! its own beyond calling the traits it defines.

pub mod config;
pub mod duplicate;
pub mod error;
pub mod intent;
pub mod knowledge;
pub mod retry;
pub mod rules;
pub mod session;
pub mod text;
pub mod ticket;

pub use error::{DeskbotError, Result};
