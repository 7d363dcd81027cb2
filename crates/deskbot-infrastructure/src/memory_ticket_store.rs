//! In-process ticket store.
//!
//! Backs the interactive CLI and the scenario tests. Creation is
//! conditional on the idempotency key: the key lookup and the insert happen
//! under one lock, so two concurrent creates with the same key produce one
//! ticket and one `Conflict`.

use async_trait::async_trait;
use chrono::Utc;
use deskbot_core::error::{DeskbotError, Result};
use deskbot_core::ticket::{
    TicketCreateService, TicketDraft, TicketQuery, TicketQueryService, TicketRecord, TicketState,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

const FIRST_NUMBER: u64 = 10_001;

#[derive(Default)]
struct StoreState {
    tickets: Vec<TicketRecord>,
    /// idempotency key -> ticket id
    keys: HashMap<String, String>,
    next_number: u64,
}

/// Ticket store held in memory.
#[derive(Clone, Default)]
pub struct InMemoryTicketStore {
    state: Arc<RwLock<StoreState>>,
}

impl InMemoryTicketStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with existing tickets.
    pub async fn with_tickets(tickets: impl IntoIterator<Item = TicketRecord>) -> Self {
        let store = Self::new();
        for ticket in tickets {
            store.insert(ticket).await;
        }
        store
    }

    /// Adds an existing ticket as-is, bypassing idempotency.
    pub async fn insert(&self, ticket: TicketRecord) {
        self.state.write().await.tickets.push(ticket);
    }

    /// Every ticket, regardless of state.
    pub async fn all(&self) -> Vec<TicketRecord> {
        self.state.read().await.tickets.clone()
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.tickets.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn find_by_number(&self, number: &str) -> Option<TicketRecord> {
        self.state
            .read()
            .await
            .tickets
            .iter()
            .find(|t| t.number.eq_ignore_ascii_case(number))
            .cloned()
    }
}

fn matches(ticket: &TicketRecord, query: &TicketQuery) -> bool {
    if query.active_states_only && !ticket.state.is_active() {
        return false;
    }
    if let Some(reporter) = &query.reporter_id {
        if &ticket.reporter_id != reporter {
            return false;
        }
    }
    if let Some(category) = query.category {
        if ticket.category != category {
            return false;
        }
    }
    if let Some(since) = query.since {
        if ticket.created_at < since {
            return false;
        }
    }
    true
}

#[async_trait]
impl TicketQueryService for InMemoryTicketStore {
    async fn query(&self, query: &TicketQuery) -> Result<Vec<TicketRecord>> {
        let state = self.state.read().await;
        let mut found: Vec<TicketRecord> = state
            .tickets
            .iter()
            .filter(|t| matches(t, query))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(found)
    }
}

#[async_trait]
impl TicketCreateService for InMemoryTicketStore {
    async fn create(&self, draft: &TicketDraft, idempotency_key: &str) -> Result<TicketRecord> {
        if idempotency_key.trim().is_empty() {
            return Err(DeskbotError::validation("idempotency key must not be empty"));
        }

        let mut state = self.state.write().await;
        if state.keys.contains_key(idempotency_key) {
            return Err(DeskbotError::conflict(idempotency_key));
        }

        if state.next_number == 0 {
            state.next_number = FIRST_NUMBER;
        }
        let number = format!("{}{:07}", draft.ticket_type.number_prefix(), state.next_number);
        state.next_number += 1;

        let record = TicketRecord {
            id: uuid::Uuid::new_v4().to_string(),
            number,
            short_description: draft.short_description.clone(),
            description: draft.description.clone(),
            state: TicketState::New,
            category: draft.category,
            priority: draft.priority,
            created_at: Utc::now(),
            reporter_id: draft.reporter_id.clone(),
            resolution_notes: None,
        };
        state.keys.insert(idempotency_key.to_string(), record.id.clone());
        state.tickets.push(record.clone());

        tracing::debug!(ticket_number = %record.number, "Created ticket in memory store");
        Ok(record)
    }

    async fn find_by_idempotency_key(&self, idempotency_key: &str) -> Result<Option<TicketRecord>> {
        let state = self.state.read().await;
        Ok(state
            .keys
            .get(idempotency_key)
            .and_then(|id| state.tickets.iter().find(|t| &t.id == id))
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use deskbot_core::ticket::{Category, ImpactScope, Priority, TicketType};

    fn draft(text: &str) -> TicketDraft {
        TicketDraft {
            short_description: text.to_string(),
            description: text.to_string(),
            category: Category::Network,
            priority: Priority::LOW,
            reporter_id: "alice".to_string(),
            ticket_type: TicketType::Incident,
            impact: ImpactScope::Individual,
        }
    }

    fn existing(number: &str, state: TicketState, age_days: i64) -> TicketRecord {
        TicketRecord {
            id: number.to_lowercase(),
            number: number.to_string(),
            short_description: "VPN drops".into(),
            description: "VPN drops".into(),
            state,
            category: Category::Network,
            priority: Priority::LOW,
            created_at: Utc::now() - Duration::days(age_days),
            reporter_id: "bob".into(),
            resolution_notes: None,
        }
    }

    #[tokio::test]
    async fn create_assigns_sequential_numbers_and_new_state() {
        let store = InMemoryTicketStore::new();
        let a = store.create(&draft("printer jam"), "k1").await.unwrap();
        let b = store.create(&draft("vpn drops"), "k2").await.unwrap();
        assert_eq!(a.number, "INC0010001");
        assert_eq!(b.number, "INC0010002");
        assert_eq!(a.state, TicketState::New);
    }

    #[tokio::test]
    async fn number_prefix_follows_ticket_type() {
        let store = InMemoryTicketStore::new();
        let mut request = draft("need a new monitor");
        request.ticket_type = TicketType::Request;
        let created = store.create(&request, "k1").await.unwrap();
        assert_eq!(created.number, "REQ0010001");
        assert_eq!(store.find_by_number("req0010001").await, Some(created));
    }

    #[tokio::test]
    async fn same_key_conflicts_and_is_findable() {
        let store = InMemoryTicketStore::new();
        let first = store.create(&draft("printer jam"), "k1").await.unwrap();
        let err = store.create(&draft("printer jam"), "k1").await.unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(store.len().await, 1);
        assert_eq!(store.find_by_idempotency_key("k1").await.unwrap(), Some(first));
        assert_eq!(store.find_by_idempotency_key("k2").await.unwrap(), None);
    }

    #[tokio::test]
    async fn concurrent_creates_with_one_key_make_one_ticket() {
        let store = InMemoryTicketStore::new();
        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.create(&draft("printer jam"), "shared").await
            }));
        }
        let mut created = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                created += 1;
            }
        }
        assert_eq!(created, 1);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn query_filters_server_side() {
        let store = InMemoryTicketStore::with_tickets([
            existing("INC0000001", TicketState::New, 1),
            existing("INC0000002", TicketState::Resolved, 1),
            existing("INC0000003", TicketState::OnHold, 200),
        ])
        .await;

        let active = store.query(&TicketQuery::active()).await.unwrap();
        assert_eq!(active.len(), 2);
        assert!(active.iter().all(|t| t.state.is_active()));

        let recent = store
            .query(&TicketQuery::active().since(Utc::now() - Duration::days(90)))
            .await
            .unwrap();
        assert_eq!(recent.len(), 1);

        let mine = store
            .query(&TicketQuery::active().with_reporter("alice"))
            .await
            .unwrap();
        assert!(mine.is_empty());
    }
}
