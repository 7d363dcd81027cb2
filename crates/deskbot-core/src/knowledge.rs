//! Knowledge-base articles and the search collaborator.
//!
//! Search turns consult the knowledge base alongside the reporter's own
//! tickets, so a user asking how to do something gets a guide instead of a
//! ticket.

use crate::error::Result;
use crate::ticket::Category;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeArticle {
    /// Article identifier (e.g. KB0001)
    pub id: String,
    pub title: String,
    pub summary: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
}

/// Read access to a knowledge base.
#[async_trait]
pub trait KnowledgeBase: Send + Sync {
    /// Returns at most `limit` articles relevant to `text`, best first.
    ///
    /// `category`, when given, favours articles filed under it.
    async fn search(&self, text: &str, category: Option<Category>, limit: usize) -> Result<Vec<KnowledgeArticle>>;
}
