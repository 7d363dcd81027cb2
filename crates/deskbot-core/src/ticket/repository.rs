//! Ticket store collaborator traits.
//!
//! The store is external to the assistant. Querying and creating are split
//! into two traits so the query side can be handed to the duplicate
//! detector without granting it the ability to create tickets.

use super::model::{Category, TicketDraft, TicketRecord};
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Filter for [`TicketQueryService::query`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TicketQuery {
    /// Restrict to New, InProgress and OnHold. Applied by the store itself.
    pub active_states_only: bool,
    pub reporter_id: Option<String>,
    pub category: Option<Category>,
    pub since: Option<DateTime<Utc>>,
}

impl TicketQuery {
    /// A query for active tickets only.
    pub fn active() -> Self {
        Self {
            active_states_only: true,
            ..Self::default()
        }
    }

    pub fn with_reporter(mut self, reporter_id: impl Into<String>) -> Self {
        self.reporter_id = Some(reporter_id.into());
        self
    }

    pub fn with_category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }
}

/// Read access to the ticket store.
///
/// # Implementation Notes
///
/// Implementations must fail closed: when the store cannot honour
/// `active_states_only` they return an error rather than an unfiltered
/// result set.
#[async_trait]
pub trait TicketQueryService: Send + Sync {
    /// Returns tickets matching the query, newest first.
    async fn query(&self, query: &TicketQuery) -> Result<Vec<TicketRecord>>;
}

/// Ticket creation in the external store.
#[async_trait]
pub trait TicketCreateService: Send + Sync {
    /// Creates a ticket from the draft.
    ///
    /// # Returns
    ///
    /// - `Ok(TicketRecord)`: the newly created ticket
    /// - `Err(DeskbotError::Conflict)`: a ticket with this idempotency key exists
    /// - `Err(DeskbotError::Transient)`: the call may be retried with the same key
    async fn create(&self, draft: &TicketDraft, idempotency_key: &str) -> Result<TicketRecord>;

    /// Finds the ticket previously created with `idempotency_key`.
    async fn find_by_idempotency_key(&self, idempotency_key: &str)
    -> Result<Option<TicketRecord>>;
}
