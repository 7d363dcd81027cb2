//! Conversation session model.
//!
//! A session is the orchestrator's persisted memory between turns: the
//! stage it stopped at, what it has collected about the current issue, the
//! duplicate candidates last shown to the user and the idempotency key for
//! the ticket it is about to create.

use crate::duplicate::DuplicateCandidate;
use crate::ticket::{Category, ImpactScope, Priority, Sla, TicketType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Persisted position of a session in the ticket flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString)]
pub enum Stage {
    /// Waiting for an issue description.
    #[default]
    Start,
    /// Duplicate check done; creation failed and may be retried.
    DuplicateChecked,
    /// Duplicates shown; waiting for proceed / link / cancel / modify.
    AwaitingDecision,
    /// The last issue ended in a ticket or a link.
    Completed,
}

/// What the orchestrator has gathered about the current issue.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CollectedFields {
    pub description: Option<String>,
    pub short_description: Option<String>,
    pub category: Option<Category>,
    pub priority: Option<Priority>,
    pub sla: Option<Sla>,
    #[serde(default)]
    pub ticket_type: TicketType,
    #[serde(default)]
    pub impact: ImpactScope,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub escalations: Vec<String>,
    /// The duplicate check could not be completed for this issue.
    #[serde(default)]
    pub degraded: bool,
    pub submitted_at: Option<DateTime<Utc>>,
}

/// A single conversation with one reporter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationSession {
    pub id: String,
    pub reporter_id: String,
    pub stage: Stage,
    #[serde(default)]
    pub fields: CollectedFields,
    /// Candidates presented in the last `AwaitingDecision` turn.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pending_candidates: Vec<DuplicateCandidate>,
    /// Computed once per issue and reused for every create attempt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<String>,
    /// Number of the last ticket created or linked in this session.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_ticket_number: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ConversationSession {
    pub fn new(id: impl Into<String>, reporter_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            reporter_id: reporter_id.into(),
            stage: Stage::Start,
            fields: CollectedFields::default(),
            pending_candidates: Vec::new(),
            idempotency_key: None,
            last_ticket_number: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Drops everything collected for the current issue and returns to `Start`.
    pub fn reset_issue(&mut self) {
        self.stage = Stage::Start;
        self.fields = CollectedFields::default();
        self.pending_candidates.clear();
        self.idempotency_key = None;
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }

    /// True when the session has been idle for longer than `ttl`.
    pub fn is_expired(&self, now: DateTime<Utc>, ttl: chrono::Duration) -> bool {
        now.signed_duration_since(self.updated_at) > ttl
    }
}
