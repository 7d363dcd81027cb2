//! What a single orchestrated turn produced.

use deskbot_core::duplicate::DuplicateCandidate;
use deskbot_core::knowledge::KnowledgeArticle;
use deskbot_core::session::Stage;
use deskbot_core::ticket::{Category, Priority, Sla, TicketRecord};
use serde::{Deserialize, Serialize};
use strum::Display;

/// Flow states visited while handling a turn.
///
/// Only a subset is ever persisted; see [`Stage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
pub enum FlowState {
    Start,
    IntentDetected,
    DuplicateChecked,
    DuplicatesPresented,
    AwaitingDecision,
    LinkExisting,
    ProceedCreate,
    NoDuplicates,
    PriorityAssigned,
    TicketCreated,
    Completed,
    RetryableFailure,
    Abandoned,
}

/// Prompts that ask the user for something.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "prompt", rename_all = "snake_case")]
pub enum PromptKind {
    Welcome,
    DescribeIssue,
    DescribeAgain,
    Cancelled,
    ChooseDecision { candidates: Vec<DuplicateCandidate> },
    InvalidInput { message: String },
    UnknownCandidate { reference: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TurnPayload {
    TicketCreated {
        ticket: TicketRecord,
        sla: Sla,
        escalations: Vec<String>,
        /// The duplicate check was skipped for this issue.
        degraded: bool,
        /// The store already held a ticket for this idempotency key.
        reused_existing: bool,
    },
    Duplicates {
        candidates: Vec<DuplicateCandidate>,
        category: Category,
        priority: Priority,
        sla: Sla,
    },
    Linked {
        ticket: TicketRecord,
    },
    SearchResults {
        tickets: Vec<TicketRecord>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        articles: Vec<KnowledgeArticle>,
    },
    Prompt(PromptKind),
    /// User-safe failure text; never contains collaborator error detail.
    Failure {
        message: String,
        retryable: bool,
    },
}

/// Result of [`crate::TicketOrchestrator::handle_turn`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnOutcome {
    /// Last flow state reached this turn.
    pub state: FlowState,
    /// Every flow state visited this turn, in order.
    pub trace: Vec<FlowState>,
    pub payload: TurnPayload,
    /// Stage persisted in the session after the turn.
    pub stage: Stage,
}

impl TurnOutcome {
    pub fn visited(&self, state: FlowState) -> bool {
        self.trace.contains(&state)
    }

    /// The ticket created or linked this turn, if any.
    pub fn ticket(&self) -> Option<&TicketRecord> {
        match &self.payload {
            TurnPayload::TicketCreated { ticket, .. } | TurnPayload::Linked { ticket } => Some(ticket),
            _ => None,
        }
    }
}

/// Accumulates the flow-state trace while a turn runs.
#[derive(Debug, Default)]
pub(crate) struct Trace(Vec<FlowState>);

impl Trace {
    pub(crate) fn push(&mut self, state: FlowState) {
        self.0.push(state);
    }

    pub(crate) fn finish(mut self, state: FlowState, payload: TurnPayload, stage: Stage) -> TurnOutcome {
        if self.0.last() != Some(&state) {
            self.0.push(state);
        }
        TurnOutcome {
            state,
            trace: self.0,
            payload,
            stage,
        }
    }
}
