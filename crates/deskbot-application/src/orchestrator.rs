//! The ticket flow state machine.
//!
//! `TicketOrchestrator` advances one [`ConversationSession`] by one turn.
//! It is the only component that calls the ticket-create collaborator, and
//! every create carries the idempotency key stored in the session.

use crate::idempotency::idempotency_key;
use crate::outcome::{FlowState, PromptKind, Trace, TurnOutcome, TurnPayload};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use deskbot_core::config::RootConfig;
use deskbot_core::duplicate::{DuplicateCandidate, DuplicateDetector, IssueUnderCheck};
use deskbot_core::error::DeskbotError;
use deskbot_core::intent::{
    ClassificationRequest, DuplicateDecision, Intent, IntentRouter, IntentVerdict, LinkTarget, TextClassifier,
    is_cancellation, is_retry_request, parse_decision,
};
use deskbot_core::knowledge::{KnowledgeArticle, KnowledgeBase};
use deskbot_core::retry::RetryPolicy;
use deskbot_core::rules::PriorityClassifier;
use deskbot_core::session::{CollectedFields, ConversationSession, Stage};
use deskbot_core::text;
use deskbot_core::ticket::{
    Category, IssueReport, TicketCreateService, TicketDraft, TicketQuery, TicketQueryService, TicketRecord,
};
use std::cmp::Ordering;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use strum::IntoEnumIterator;
use tracing::{debug, info, warn};

/// Most tickets returned for a search turn.
const SEARCH_LIMIT: usize = 5;
/// Search lookback when no ticket number is given.
const SEARCH_LOOKBACK_DAYS: i64 = 180;
/// Shown instead of a ticket store's own validation text.
const STORE_REJECTED: &str =
    "The ticketing system couldn't accept this ticket as written. Please describe the issue again in your own words.";

pub struct TicketOrchestrator {
    tickets: Arc<dyn TicketQueryService>,
    creator: Arc<dyn TicketCreateService>,
    detector: DuplicateDetector,
    rules: Arc<PriorityClassifier>,
    category_classifier: Option<Arc<dyn TextClassifier>>,
    knowledge: Option<Arc<dyn KnowledgeBase>>,
    max_articles: usize,
    retry: RetryPolicy,
    bucket_minutes: i64,
    max_description_len: usize,
    query_timeout: Duration,
    create_timeout: Duration,
    classifier_timeout: Duration,
    min_confidence: f64,
}

impl TicketOrchestrator {
    pub fn new(
        tickets: Arc<dyn TicketQueryService>,
        creator: Arc<dyn TicketCreateService>,
        rules: Arc<PriorityClassifier>,
        config: &RootConfig,
    ) -> Self {
        let retry = RetryPolicy::from(&config.retry);
        let detector = DuplicateDetector::new(tickets.clone(), config.detection.clone(), config.timeouts.query())
            .with_retry_policy(retry.clone());
        Self {
            tickets,
            creator,
            detector,
            rules,
            category_classifier: None,
            knowledge: None,
            max_articles: config.knowledge.max_results,
            retry,
            bucket_minutes: config.orchestrator.idempotency_bucket_minutes,
            max_description_len: config.orchestrator.max_description_len,
            query_timeout: config.timeouts.query(),
            create_timeout: config.timeouts.create(),
            classifier_timeout: config.timeouts.classifier(),
            min_confidence: config.classifier.min_confidence,
        }
    }

    /// Consults `classifier` when no category keyword matches.
    pub fn with_category_classifier(mut self, classifier: Arc<dyn TextClassifier>) -> Self {
        self.category_classifier = Some(classifier);
        self
    }

    /// Adds knowledge-base articles to search turns.
    pub fn with_knowledge_base(mut self, knowledge: Arc<dyn KnowledgeBase>) -> Self {
        self.knowledge = Some(knowledge);
        self
    }

    /// Applies to ticket creation and to the duplicate-check query.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.detector = self.detector.with_retry_policy(retry.clone());
        self.retry = retry;
        self
    }

    /// Advances `session` by one user turn.
    ///
    /// Never fails: collaborator errors end the turn in `RetryableFailure`
    /// with a user-safe message, and the session keeps what it collected.
    pub async fn handle_turn(
        &self,
        session: &mut ConversationSession,
        message: &str,
        verdict: &IntentVerdict,
        now: DateTime<Utc>,
    ) -> TurnOutcome {
        if session.stage == Stage::Completed {
            session.reset_issue();
        }
        let intent = if verdict.is_unknown() {
            IntentRouter::expected_intent(session.stage)
        } else {
            verdict.intent
        };
        debug!(
            session_id = %session.id,
            stage = %session.stage,
            %intent,
            source = %verdict.source,
            "Handling turn"
        );

        let entry = entry_state(session.stage);
        let mut trace = Trace::default();
        trace.push(entry);

        let outcome = match (session.stage, intent) {
            (stage, Intent::Smalltalk) => trace.finish(entry, TurnPayload::Prompt(PromptKind::Welcome), stage),
            (_, Intent::Search) => self.search(session, message, now, trace, entry).await,
            (Stage::AwaitingDecision, Intent::CreateTicket) => {
                session.reset_issue();
                self.start_issue(session, message, now, trace).await
            }
            (Stage::AwaitingDecision, _) => self.decide(session, message, trace).await,
            (Stage::DuplicateChecked, Intent::DuplicateDecision) if is_cancellation(message) => {
                abandon(session, trace)
            }
            (Stage::DuplicateChecked, Intent::DuplicateDecision) => self.create(session, trace).await,
            (Stage::DuplicateChecked, _) if verdict.is_unknown() || is_retry_request(message) => {
                self.create(session, trace).await
            }
            (Stage::DuplicateChecked, _) => {
                session.reset_issue();
                self.start_issue(session, message, now, trace).await
            }
            (_, Intent::CreateTicket) => self.start_issue(session, message, now, trace).await,
            (stage, _) => trace.finish(entry, TurnPayload::Prompt(PromptKind::DescribeIssue), stage),
        };

        session.stage = outcome.stage;
        session.touch(now);
        info!(
            session_id = %session.id,
            state = %outcome.state,
            stage = %outcome.stage,
            "Turn complete"
        );
        outcome
    }

    /// Validates, classifies and duplicate-checks a new issue description.
    async fn start_issue(
        &self,
        session: &mut ConversationSession,
        message: &str,
        now: DateTime<Utc>,
        mut trace: Trace,
    ) -> TurnOutcome {
        trace.push(FlowState::IntentDetected);

        let report = IssueReport::new(session.reporter_id.clone(), message.trim(), now, None);
        if let Err(e) = report.validate(self.max_description_len) {
            debug!(session_id = %session.id, error = %e, "Issue description rejected");
            session.reset_issue();
            return trace.finish(
                FlowState::Start,
                TurnPayload::Prompt(PromptKind::InvalidInput {
                    message: e.user_message(),
                }),
                Stage::Start,
            );
        }

        let category = self.categorize(&report).await;
        let assessment = self.rules.assess(report.text(), category);
        session.fields = CollectedFields {
            description: Some(report.text().to_string()),
            short_description: Some(report.short_description()),
            category: Some(category),
            priority: Some(assessment.priority),
            sla: Some(assessment.sla),
            ticket_type: assessment.ticket_type,
            impact: assessment.impact,
            escalations: assessment.escalations.clone(),
            degraded: false,
            submitted_at: Some(now),
        };
        session.idempotency_key = Some(idempotency_key(
            report.reporter_id(),
            report.text(),
            now,
            self.bucket_minutes,
        ));
        session.pending_candidates.clear();

        let check = self
            .detector
            .check(IssueUnderCheck {
                report: &report,
                category,
                priority: assessment.priority,
            })
            .await;
        trace.push(FlowState::DuplicateChecked);

        if check.has_duplicates() {
            info!(
                session_id = %session.id,
                candidates = check.candidates.len(),
                score = check.candidates[0].score.score,
                ticket_number = %check.candidates[0].ticket.number,
                "Possible duplicates found"
            );
            session.pending_candidates = check.candidates.clone();
            return trace.finish(
                FlowState::DuplicatesPresented,
                TurnPayload::Duplicates {
                    candidates: check.candidates,
                    category,
                    priority: assessment.priority,
                    sla: assessment.sla,
                },
                Stage::AwaitingDecision,
            );
        }

        if check.degraded {
            warn!(session_id = %session.id, "Creating ticket without a duplicate check");
        }
        session.fields.degraded = check.degraded;
        trace.push(FlowState::NoDuplicates);
        self.create(session, trace).await
    }

    /// Applies the user's answer to the presented duplicates.
    async fn decide(&self, session: &mut ConversationSession, message: &str, mut trace: Trace) -> TurnOutcome {
        match parse_decision(message) {
            Some(DuplicateDecision::Proceed) => {
                trace.push(FlowState::ProceedCreate);
                self.create(session, trace).await
            }
            Some(DuplicateDecision::Link(target)) => {
                let Some(candidate) = resolve_candidate(&session.pending_candidates, target.as_ref()) else {
                    let reference = match target {
                        Some(LinkTarget::Number(number)) => number,
                        Some(LinkTarget::Position(position)) => format!("#{}", position),
                        None => String::new(),
                    };
                    return trace.finish(
                        FlowState::AwaitingDecision,
                        TurnPayload::Prompt(PromptKind::UnknownCandidate { reference }),
                        Stage::AwaitingDecision,
                    );
                };
                let ticket = candidate.ticket.clone();
                info!(session_id = %session.id, ticket_number = %ticket.number, "Linked to existing ticket");
                session.reset_issue();
                session.last_ticket_number = Some(ticket.number.clone());
                trace.finish(FlowState::LinkExisting, TurnPayload::Linked { ticket }, Stage::Completed)
            }
            Some(DuplicateDecision::Cancel) => abandon(session, trace),
            Some(DuplicateDecision::Modify) => {
                session.reset_issue();
                trace.finish(
                    FlowState::Start,
                    TurnPayload::Prompt(PromptKind::DescribeAgain),
                    Stage::Start,
                )
            }
            None => trace.finish(
                FlowState::AwaitingDecision,
                TurnPayload::Prompt(PromptKind::ChooseDecision {
                    candidates: session.pending_candidates.clone(),
                }),
                Stage::AwaitingDecision,
            ),
        }
    }

    /// Creates the ticket from the collected fields.
    async fn create(&self, session: &mut ConversationSession, mut trace: Trace) -> TurnOutcome {
        let (Some(draft), Some(key)) = (draft_from(session), session.idempotency_key.clone()) else {
            session.reset_issue();
            return trace.finish(
                FlowState::Start,
                TurnPayload::Prompt(PromptKind::DescribeIssue),
                Stage::Start,
            );
        };
        trace.push(FlowState::PriorityAssigned);

        let creator = self.creator.as_ref();
        let draft_ref = &draft;
        let key_ref = key.as_str();
        let created = self
            .retry
            .run("ticket-create", self.create_timeout, move || creator.create(draft_ref, key_ref))
            .await;

        match created {
            Ok(ticket) => created_outcome(session, ticket, false, trace),
            Err(e) if e.is_conflict() => {
                let existing = self
                    .retry
                    .run("ticket-lookup", self.query_timeout, move || {
                        creator.find_by_idempotency_key(key_ref)
                    })
                    .await;
                match existing {
                    Ok(Some(ticket)) => {
                        info!(
                            session_id = %session.id,
                            ticket_number = %ticket.number,
                            "Ticket already existed for idempotency key"
                        );
                        created_outcome(session, ticket, true, trace)
                    }
                    Ok(None) => failure(
                        session,
                        DeskbotError::internal(format!("conflict for key {} but no ticket found", key)),
                        trace,
                    ),
                    Err(e) => failure(session, e, trace),
                }
            }
            Err(e) if e.is_validation() => {
                warn!(session_id = %session.id, error = %e, "Ticket store rejected the draft");
                session.reset_issue();
                trace.finish(
                    FlowState::Start,
                    TurnPayload::Prompt(PromptKind::InvalidInput {
                        message: STORE_REJECTED.to_string(),
                    }),
                    Stage::Start,
                )
            }
            Err(e) => failure(session, e, trace),
        }
    }

    /// Rule-based category, then the optional classifier, then `General`.
    async fn categorize(&self, report: &IssueReport) -> Category {
        if let Some(category) = self.rules.classify_category(report.text(), report.category_hint()) {
            return category;
        }
        let Some(classifier) = &self.category_classifier else {
            return Category::General;
        };

        let request = ClassificationRequest::new(report.text(), Category::iter().map(|c| c.to_string()))
            .with_context("task", "support ticket category");
        let verdict = match tokio::time::timeout(self.classifier_timeout, classifier.classify(&request)).await {
            Ok(Ok(verdict)) => verdict,
            Ok(Err(e)) => {
                warn!(provider = classifier.name(), error = %e, "Category classifier failed");
                return Category::General;
            }
            Err(_) => {
                warn!(provider = classifier.name(), "Category classifier timed out");
                return Category::General;
            }
        };

        match request
            .resolve_label(&verdict.label)
            .and_then(|label| Category::from_str(label).ok())
        {
            Some(category) if verdict.confidence >= self.min_confidence => category,
            _ => Category::General,
        }
    }

    /// Looks up the reporter's tickets by number, or ranks their active
    /// tickets by similarity to the message and adds matching articles.
    async fn search(
        &self,
        session: &ConversationSession,
        message: &str,
        now: DateTime<Utc>,
        trace: Trace,
        entry: FlowState,
    ) -> TurnOutcome {
        let numbers = text::ticket_numbers(message);
        let query = if numbers.is_empty() {
            TicketQuery::active()
                .with_reporter(session.reporter_id.clone())
                .since(now - ChronoDuration::days(SEARCH_LOOKBACK_DAYS))
        } else {
            TicketQuery::default().with_reporter(session.reporter_id.clone())
        };

        let tickets_ref = self.tickets.as_ref();
        let query_ref = &query;
        let fetched = match self
            .retry
            .run("ticket-search", self.query_timeout, move || tickets_ref.query(query_ref))
            .await
        {
            Ok(records) => records,
            Err(e) => return search_failure(session, e, trace, entry),
        };

        let tickets: Vec<TicketRecord> = if numbers.is_empty() {
            let mut scored: Vec<(f64, TicketRecord)> = fetched
                .into_iter()
                .filter(|t| t.state.is_active())
                .map(|t| {
                    let score = text::similarity(message, &t.short_description)
                        .max(text::similarity(message, &t.description));
                    (score, t)
                })
                .collect();
            scored.sort_by(|(a, ta), (b, tb)| {
                b.partial_cmp(a)
                    .unwrap_or(Ordering::Equal)
                    .then_with(|| tb.created_at.cmp(&ta.created_at))
            });
            scored.into_iter().take(SEARCH_LIMIT).map(|(_, t)| t).collect()
        } else {
            fetched
                .into_iter()
                .filter(|t| numbers.iter().any(|n| t.number.eq_ignore_ascii_case(n)))
                .collect()
        };

        let articles = if numbers.is_empty() {
            self.articles(message).await
        } else {
            Vec::new()
        };

        debug!(
            session_id = %session.id,
            results = tickets.len(),
            articles = articles.len(),
            "Ticket search complete"
        );
        trace.finish(entry, TurnPayload::SearchResults { tickets, articles }, session.stage)
    }

    /// Knowledge-base articles for `message`; empty when none is configured
    /// or the lookup fails.
    async fn articles(&self, message: &str) -> Vec<KnowledgeArticle> {
        let Some(knowledge) = &self.knowledge else {
            return Vec::new();
        };
        if self.max_articles == 0 {
            return Vec::new();
        }
        let category = self.rules.classify_category(message, None);
        match tokio::time::timeout(
            self.query_timeout,
            knowledge.search(message, category, self.max_articles),
        )
        .await
        {
            Ok(Ok(articles)) => articles,
            Ok(Err(e)) => {
                warn!(error = %e, "Knowledge base search failed");
                Vec::new()
            }
            Err(_) => {
                warn!("Knowledge base search timed out");
                Vec::new()
            }
        }
    }
}

fn entry_state(stage: Stage) -> FlowState {
    match stage {
        Stage::Start => FlowState::Start,
        Stage::DuplicateChecked => FlowState::DuplicateChecked,
        Stage::AwaitingDecision => FlowState::AwaitingDecision,
        Stage::Completed => FlowState::Completed,
    }
}

fn draft_from(session: &ConversationSession) -> Option<TicketDraft> {
    let fields = &session.fields;
    Some(TicketDraft {
        short_description: fields.short_description.clone()?,
        description: fields.description.clone()?,
        category: fields.category?,
        priority: fields.priority?,
        reporter_id: session.reporter_id.clone(),
        ticket_type: fields.ticket_type,
        impact: fields.impact,
    })
}

fn resolve_candidate<'a>(
    candidates: &'a [DuplicateCandidate],
    target: Option<&LinkTarget>,
) -> Option<&'a DuplicateCandidate> {
    match target {
        None => candidates.first(),
        Some(LinkTarget::Position(position)) => position.checked_sub(1).and_then(|i| candidates.get(i)),
        Some(LinkTarget::Number(number)) => candidates
            .iter()
            .find(|c| c.ticket.number.eq_ignore_ascii_case(number)),
    }
}

fn created_outcome(
    session: &mut ConversationSession,
    ticket: TicketRecord,
    reused_existing: bool,
    trace: Trace,
) -> TurnOutcome {
    let fields = std::mem::take(&mut session.fields);
    info!(
        session_id = %session.id,
        ticket_number = %ticket.number,
        priority = ticket.priority.ordinal(),
        category = %ticket.category,
        degraded = fields.degraded,
        "Ticket created"
    );
    session.reset_issue();
    session.last_ticket_number = Some(ticket.number.clone());
    let sla = fields.sla.unwrap_or_else(|| ticket.priority.sla());
    trace.finish(
        FlowState::TicketCreated,
        TurnPayload::TicketCreated {
            ticket,
            sla,
            escalations: fields.escalations,
            degraded: fields.degraded,
            reused_existing,
        },
        Stage::Completed,
    )
}

/// Keeps fields and key so the next turn can retry the create.
///
/// Validation text here comes from the ticket store, so it is replaced
/// before it reaches the user.
fn failure(session: &ConversationSession, error: DeskbotError, trace: Trace) -> TurnOutcome {
    warn!(session_id = %session.id, error = %error, "Ticket creation failed");
    let message = if error.is_validation() {
        STORE_REJECTED.to_string()
    } else {
        error.user_message()
    };
    trace.finish(
        FlowState::RetryableFailure,
        TurnPayload::Failure {
            message,
            retryable: true,
        },
        Stage::DuplicateChecked,
    )
}

fn search_failure(session: &ConversationSession, error: DeskbotError, trace: Trace, entry: FlowState) -> TurnOutcome {
    warn!(session_id = %session.id, error = %error, "Ticket search failed");
    trace.finish(
        entry,
        TurnPayload::Failure {
            message: "I couldn't reach the ticketing system to look that up. Please try again shortly.".to_string(),
            retryable: error.is_retryable(),
        },
        session.stage,
    )
}

fn abandon(session: &mut ConversationSession, trace: Trace) -> TurnOutcome {
    info!(session_id = %session.id, "Issue abandoned");
    session.reset_issue();
    trace.finish(
        FlowState::Abandoned,
        TurnPayload::Prompt(PromptKind::Cancelled),
        Stage::Start,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use deskbot_core::error::Result;
    use deskbot_core::intent::ClassifierVerdict;
    use deskbot_core::ticket::{Priority, TicketState, TicketType};
    use deskbot_infrastructure::{InMemoryKnowledgeBase, InMemoryTicketStore};

    fn orchestrator(store: &InMemoryTicketStore) -> TicketOrchestrator {
        TicketOrchestrator::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(PriorityClassifier::builtin().unwrap()),
            &RootConfig::default(),
        )
        .with_retry_policy(RetryPolicy::none())
    }

    fn create_intent() -> IntentVerdict {
        IntentVerdict::rules(Intent::CreateTicket, 0.75)
    }

    fn decision_intent() -> IntentVerdict {
        IntentVerdict::rules(Intent::DuplicateDecision, 0.9)
    }

    #[tokio::test]
    async fn new_issue_on_empty_store_creates_ticket() {
        let store = InMemoryTicketStore::new();
        let orch = orchestrator(&store);
        let mut session = ConversationSession::new("s1", "alice", Utc::now());

        let outcome = orch
            .handle_turn(&mut session, "The office printer has a paper jam", &create_intent(), Utc::now())
            .await;

        assert_eq!(outcome.state, FlowState::TicketCreated);
        assert_eq!(
            outcome.trace,
            vec![
                FlowState::Start,
                FlowState::IntentDetected,
                FlowState::DuplicateChecked,
                FlowState::NoDuplicates,
                FlowState::PriorityAssigned,
                FlowState::TicketCreated,
            ]
        );
        assert_eq!(session.stage, Stage::Completed);
        assert_eq!(outcome.ticket().unwrap().category, Category::Printer);
        assert_eq!(session.last_ticket_number.as_deref(), Some(outcome.ticket().unwrap().number.as_str()));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn blank_description_is_reprompted() {
        let store = InMemoryTicketStore::new();
        let orch = orchestrator(&store);
        let mut session = ConversationSession::new("s1", "alice", Utc::now());

        let outcome = orch.handle_turn(&mut session, "?!", &create_intent(), Utc::now()).await;

        assert!(matches!(
            outcome.payload,
            TurnPayload::Prompt(PromptKind::InvalidInput { .. })
        ));
        assert_eq!(session.stage, Stage::Start);
        assert!(store.is_empty().await);
    }

    async fn awaiting_decision(store: &InMemoryTicketStore, orch: &TicketOrchestrator) -> ConversationSession {
        let text = "Outlook keeps crashing when I open attachments";
        let mut first = ConversationSession::new("s1", "alice", Utc::now());
        orch.handle_turn(&mut first, text, &create_intent(), Utc::now()).await;
        assert_eq!(store.len().await, 1);

        let mut second = ConversationSession::new("s2", "bob", Utc::now());
        let outcome = orch.handle_turn(&mut second, text, &create_intent(), Utc::now()).await;
        assert_eq!(outcome.state, FlowState::DuplicatesPresented);
        assert_eq!(second.stage, Stage::AwaitingDecision);
        second
    }

    #[tokio::test]
    async fn link_decision_attaches_to_top_candidate() {
        let store = InMemoryTicketStore::new();
        let orch = orchestrator(&store);
        let mut session = awaiting_decision(&store, &orch).await;

        let outcome = orch
            .handle_turn(&mut session, "yes, that's the one, link it", &decision_intent(), Utc::now())
            .await;

        assert_eq!(outcome.state, FlowState::LinkExisting);
        assert_eq!(session.stage, Stage::Completed);
        assert_eq!(store.len().await, 1);
        assert!(session.pending_candidates.is_empty());
    }

    #[tokio::test]
    async fn proceed_decision_creates_second_ticket() {
        let store = InMemoryTicketStore::new();
        let orch = orchestrator(&store);
        let mut session = awaiting_decision(&store, &orch).await;

        let outcome = orch
            .handle_turn(&mut session, "not the same, create it anyway", &decision_intent(), Utc::now())
            .await;

        assert_eq!(outcome.state, FlowState::TicketCreated);
        assert!(outcome.visited(FlowState::ProceedCreate));
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn unknown_candidate_reference_keeps_waiting() {
        let store = InMemoryTicketStore::new();
        let orch = orchestrator(&store);
        let mut session = awaiting_decision(&store, &orch).await;

        let outcome = orch.handle_turn(&mut session, "link the third one", &decision_intent(), Utc::now()).await;

        assert!(matches!(
            outcome.payload,
            TurnPayload::Prompt(PromptKind::UnknownCandidate { .. })
        ));
        assert_eq!(session.stage, Stage::AwaitingDecision);
        assert_eq!(session.pending_candidates.len(), 1);
    }

    #[tokio::test]
    async fn unrecognised_answer_reprompts_with_candidates() {
        let store = InMemoryTicketStore::new();
        let orch = orchestrator(&store);
        let mut session = awaiting_decision(&store, &orch).await;

        let outcome = orch
            .handle_turn(&mut session, "hmm", &IntentVerdict::unknown(), Utc::now())
            .await;

        match outcome.payload {
            TurnPayload::Prompt(PromptKind::ChooseDecision { candidates }) => assert_eq!(candidates.len(), 1),
            other => panic!("unexpected payload: {:?}", other),
        }
        assert_eq!(session.stage, Stage::AwaitingDecision);
    }

    #[tokio::test]
    async fn modify_asks_for_a_new_description() {
        let store = InMemoryTicketStore::new();
        let orch = orchestrator(&store);
        let mut session = awaiting_decision(&store, &orch).await;

        let outcome = orch.handle_turn(&mut session, "let me rephrase", &decision_intent(), Utc::now()).await;

        assert_eq!(outcome.payload, TurnPayload::Prompt(PromptKind::DescribeAgain));
        assert_eq!(session.stage, Stage::Start);
        assert!(session.fields.description.is_none());
    }

    struct FixedCategory(&'static str);

    #[async_trait]
    impl TextClassifier for FixedCategory {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn classify(&self, _request: &ClassificationRequest) -> Result<ClassifierVerdict> {
            Ok(ClassifierVerdict {
                label: self.0.to_string(),
                confidence: 0.9,
            })
        }
    }

    #[tokio::test]
    async fn classifier_fills_in_when_no_keyword_matches() {
        let store = InMemoryTicketStore::new();
        let orch = orchestrator(&store).with_category_classifier(Arc::new(FixedCategory("phone")));
        let mut session = ConversationSession::new("s1", "alice", Utc::now());

        let outcome = orch
            .handle_turn(&mut session, "Nobody hears me on calls", &create_intent(), Utc::now())
            .await;
        assert_eq!(outcome.ticket().unwrap().category, Category::Phone);

        let plain = orchestrator(&store);
        let mut other = ConversationSession::new("s2", "carol", Utc::now());
        let outcome = plain
            .handle_turn(&mut other, "Something odd with my desk drawer lock", &create_intent(), Utc::now())
            .await;
        assert_eq!(outcome.ticket().unwrap().category, Category::General);
    }

    #[tokio::test]
    async fn search_by_number_and_by_text() {
        let now = Utc::now();
        let ticket = TicketRecord {
            id: "t1".into(),
            number: "INC0000042".into(),
            short_description: "VPN disconnects every hour".into(),
            description: "VPN disconnects every hour".into(),
            state: TicketState::InProgress,
            category: Category::Network,
            priority: Priority::LOW,
            created_at: now - ChronoDuration::days(2),
            reporter_id: "alice".into(),
            resolution_notes: None,
        };
        let store = InMemoryTicketStore::with_tickets([ticket]).await;
        let orch = orchestrator(&store);
        let mut session = ConversationSession::new("s1", "alice", now);
        let search = IntentVerdict::rules(Intent::Search, 0.8);

        let outcome = orch.handle_turn(&mut session, "status of inc0000042?", &search, now).await;
        match &outcome.payload {
            TurnPayload::SearchResults { tickets, articles } => {
                assert_eq!(tickets[0].number, "INC0000042");
                assert!(articles.is_empty());
            }
            other => panic!("unexpected payload: {:?}", other),
        }

        let mut stranger = ConversationSession::new("s2", "mallory", now);
        let outcome = orch.handle_turn(&mut stranger, "status of INC0000042", &search, now).await;
        assert_eq!(
            outcome.payload,
            TurnPayload::SearchResults {
                tickets: vec![],
                articles: vec![]
            }
        );
        assert_eq!(stranger.stage, Stage::Start);
    }

    #[tokio::test]
    async fn how_to_search_returns_articles() {
        let store = InMemoryTicketStore::new();
        let orch = orchestrator(&store).with_knowledge_base(Arc::new(InMemoryKnowledgeBase::builtin()));
        let mut session = ConversationSession::new("s1", "alice", Utc::now());
        let search = IntentVerdict::rules(Intent::Search, 0.7);

        let outcome = orch
            .handle_turn(&mut session, "How do I reset my password?", &search, Utc::now())
            .await;

        match &outcome.payload {
            TurnPayload::SearchResults { tickets, articles } => {
                assert!(tickets.is_empty());
                assert_eq!(articles[0].id, "KB0001");
            }
            other => panic!("unexpected payload: {:?}", other),
        }
        assert_eq!(session.stage, Stage::Start);
    }

    /// Rejects every draft with a raw database message.
    struct RejectingCreator;

    #[async_trait]
    impl TicketCreateService for RejectingCreator {
        async fn create(&self, _draft: &TicketDraft, _idempotency_key: &str) -> Result<TicketRecord> {
            Err(DeskbotError::validation(
                "ORA-12899: value too large for column SN_PROD.INCIDENT.SHORT_DESC",
            ))
        }

        async fn find_by_idempotency_key(&self, _idempotency_key: &str) -> Result<Option<TicketRecord>> {
            Ok(None)
        }
    }

    #[tokio::test]
    async fn store_validation_text_is_not_shown_to_the_user() {
        let store = InMemoryTicketStore::new();
        let orch = TicketOrchestrator::new(
            Arc::new(store.clone()),
            Arc::new(RejectingCreator),
            Arc::new(PriorityClassifier::builtin().unwrap()),
            &RootConfig::default(),
        )
        .with_retry_policy(RetryPolicy::none());
        let mut session = ConversationSession::new("s1", "alice", Utc::now());

        let outcome = orch
            .handle_turn(&mut session, "The office printer has a paper jam", &create_intent(), Utc::now())
            .await;

        match &outcome.payload {
            TurnPayload::Prompt(PromptKind::InvalidInput { message }) => {
                assert_eq!(message, STORE_REJECTED);
                assert!(!message.contains("ORA-"));
            }
            other => panic!("unexpected payload: {:?}", other),
        }
        assert_eq!(session.stage, Stage::Start);
    }

    #[tokio::test]
    async fn access_request_is_filed_as_a_request() {
        let store = InMemoryTicketStore::new();
        let orch = orchestrator(&store);
        let mut session = ConversationSession::new("s1", "alice", Utc::now());

        let outcome = orch
            .handle_turn(
                &mut session,
                "I need access to the finance share drive",
                &create_intent(),
                Utc::now(),
            )
            .await;

        let ticket = outcome.ticket().unwrap();
        assert!(ticket.number.starts_with(TicketType::Request.number_prefix()));
        assert!(ticket.priority >= TicketType::Request.priority_ceiling());
    }
}
