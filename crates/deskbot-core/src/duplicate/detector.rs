//! Weighted multi-factor duplicate scoring.

use super::model::{DuplicateCandidate, DuplicateCheck, MatchFactor, Recommendation, SimilarityScore};
use crate::config::DetectionConfig;
use crate::retry::RetryPolicy;
use crate::text;
use crate::ticket::{Category, IssueReport, Priority, TicketQuery, TicketQueryService, TicketRecord};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Text similarity at or above this tags a candidate with `text`.
const TEXT_MATCH_TAG: f64 = 0.6;

/// The new issue as seen by the detector.
#[derive(Debug, Clone, Copy)]
pub struct IssueUnderCheck<'a> {
    pub report: &'a IssueReport,
    pub category: Category,
    pub priority: Priority,
}

/// Scores active tickets against a new issue report.
pub struct DuplicateDetector {
    tickets: Arc<dyn TicketQueryService>,
    config: DetectionConfig,
    query_timeout: Duration,
    retry: RetryPolicy,
}

impl DuplicateDetector {
    pub fn new(
        tickets: Arc<dyn TicketQueryService>,
        config: DetectionConfig,
        query_timeout: Duration,
    ) -> Self {
        Self {
            tickets,
            config,
            query_timeout,
            retry: RetryPolicy::none(),
        }
    }

    /// Retries transient query failures before degrading.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    /// Queries active tickets and ranks them against `issue`.
    ///
    /// Never fails: a store error or timeout that outlasts the retry policy
    /// yields a degraded check.
    pub async fn check(&self, issue: IssueUnderCheck<'_>) -> DuplicateCheck {
        let now = issue.report.submitted_at();
        let query = TicketQuery::active().since(now - ChronoDuration::days(self.config.lookback_days));

        let tickets = self.tickets.as_ref();
        let query_ref = &query;
        let fetched = match self
            .retry
            .run("ticket-query", self.query_timeout, move || tickets.query(query_ref))
            .await
        {
            Ok(records) => records,
            Err(e) => {
                warn!(
                    error = %e,
                    attempts = self.retry.max_attempts,
                    "Ticket query failed; duplicate check degraded"
                );
                return DuplicateCheck::degraded();
            }
        };

        let fetched_count = fetched.len();
        let active: Vec<TicketRecord> = fetched
            .into_iter()
            .filter(|record| {
                let keep = record.state.is_active();
                if !keep {
                    warn!(
                        ticket_number = %record.number,
                        state = %record.state,
                        "Ticket store returned an inactive ticket for an active-only query; ignoring it"
                    );
                }
                keep
            })
            .collect();

        let examined = active.len();
        let candidates = self.rank(issue, active, now);
        debug!(
            fetched = fetched_count,
            examined,
            candidates = candidates.len(),
            "Duplicate check complete"
        );

        DuplicateCheck {
            candidates,
            degraded: false,
            examined,
        }
    }

    /// Scores, filters by threshold, orders and truncates candidates.
    ///
    /// Inactive tickets are skipped here as well, so no caller can get one
    /// back as a candidate.
    pub fn rank(
        &self,
        issue: IssueUnderCheck<'_>,
        tickets: Vec<TicketRecord>,
        now: DateTime<Utc>,
    ) -> Vec<DuplicateCandidate> {
        let mut candidates: Vec<DuplicateCandidate> = tickets
            .into_iter()
            .filter(|ticket| ticket.state.is_active())
            .filter_map(|ticket| {
                let score = self.score(issue, &ticket, now);
                (score.score >= self.config.threshold).then(|| DuplicateCandidate {
                    recommendation: Recommendation::for_score(score.score),
                    score,
                    ticket,
                })
            })
            .collect();

        candidates.sort_by(|a, b| {
            b.score
                .score
                .total_cmp(&a.score.score)
                .then_with(|| b.ticket.created_at.cmp(&a.ticket.created_at))
        });
        candidates.truncate(self.config.max_candidates);
        candidates
    }

    /// Weighted score of one ticket, normalised by the weight total.
    pub fn score(&self, issue: IssueUnderCheck<'_>, ticket: &TicketRecord, now: DateTime<Utc>) -> SimilarityScore {
        let weights = &self.config.weights;
        let mut factors = Vec::new();

        let report_text = issue.report.text();
        let text_score = text::similarity(report_text, &ticket.short_description)
            .max(text::similarity(report_text, &ticket.description));
        if text_score >= TEXT_MATCH_TAG {
            factors.push(MatchFactor::Text);
        }

        let category_score = if ticket.category == issue.category {
            factors.push(MatchFactor::Category);
            1.0
        } else {
            0.0
        };

        let reporter_score = if ticket.reporter_id == issue.report.reporter_id() {
            factors.push(MatchFactor::Reporter);
            1.0
        } else {
            0.0
        };

        let priority_score = match ticket.priority.ordinal().abs_diff(issue.priority.ordinal()) {
            0 => {
                factors.push(MatchFactor::Priority);
                1.0
            }
            1 => 0.5,
            _ => 0.0,
        };

        let age_days = now.signed_duration_since(ticket.created_at).num_days().max(0);
        let recency_score = self.recency_factor(age_days);
        if age_days <= self.config.recency_window_days {
            factors.push(MatchFactor::Recency);
        }

        let total = weights.text + weights.category + weights.priority + weights.reporter + weights.recency;
        let weighted = weights.text * text_score
            + weights.category * category_score
            + weights.priority * priority_score
            + weights.reporter * reporter_score
            + weights.recency * recency_score;
        let score = if total > 0.0 {
            (weighted / total).clamp(0.0, 1.0)
        } else {
            0.0
        };

        SimilarityScore {
            ticket_id: ticket.id.clone(),
            score,
            factors,
        }
    }

    fn recency_factor(&self, age_days: i64) -> f64 {
        if age_days > self.config.recency_window_days {
            0.2
        } else if age_days <= 7 {
            1.0
        } else if age_days <= 14 {
            0.8
        } else {
            0.6
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{DeskbotError, Result};
    use crate::ticket::TicketState;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedStore {
        records: Vec<TicketRecord>,
        /// Number of leading calls that fail with a transient error.
        failures: usize,
        delay: Option<Duration>,
        calls: AtomicUsize,
    }

    impl FixedStore {
        fn new(records: Vec<TicketRecord>) -> Self {
            Self {
                records,
                failures: 0,
                delay: None,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl TicketQueryService for FixedStore {
        async fn query(&self, _query: &TicketQuery) -> Result<Vec<TicketRecord>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if call < self.failures {
                return Err(DeskbotError::transient("ticket-store", "429"));
            }
            Ok(self.records.clone())
        }
    }

    fn fast_retry(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
        }
    }

    fn ticket(id: &str, text: &str, state: TicketState, age_days: i64, now: DateTime<Utc>) -> TicketRecord {
        TicketRecord {
            id: id.to_string(),
            number: format!("INC00{}", id),
            short_description: text.to_string(),
            description: text.to_string(),
            state,
            category: Category::Network,
            priority: Priority::LOW,
            created_at: now - ChronoDuration::days(age_days),
            reporter_id: "alice".to_string(),
            resolution_notes: None,
        }
    }

    fn detector(records: Vec<TicketRecord>) -> DuplicateDetector {
        DuplicateDetector::new(
            Arc::new(FixedStore::new(records)),
            DetectionConfig::default(),
            Duration::from_millis(200),
        )
    }

    fn issue(report: &IssueReport) -> IssueUnderCheck<'_> {
        IssueUnderCheck {
            report,
            category: Category::Network,
            priority: Priority::LOW,
        }
    }

    const WIFI: &str = "My laptop won't connect to WiFi, authentication failed";

    #[tokio::test]
    async fn empty_store_yields_no_candidates() {
        let report = IssueReport::new("alice", WIFI, Utc::now(), None);
        let check = detector(Vec::new()).check(issue(&report)).await;
        assert!(check.candidates.is_empty());
        assert!(!check.degraded);
    }

    #[tokio::test]
    async fn identical_recent_ticket_is_a_strong_candidate() {
        let now = Utc::now();
        let report = IssueReport::new("alice", WIFI, now, None);
        let check = detector(vec![ticket("1", WIFI, TicketState::New, 0, now)])
            .check(issue(&report))
            .await;
        assert_eq!(check.candidates.len(), 1);
        let top = &check.candidates[0];
        assert!(top.score.score >= 0.70);
        assert_eq!(top.recommendation, Recommendation::Link);
        for factor in [
            MatchFactor::Text,
            MatchFactor::Category,
            MatchFactor::Reporter,
            MatchFactor::Priority,
            MatchFactor::Recency,
        ] {
            assert!(top.score.has(factor), "missing {factor}");
        }
    }

    #[tokio::test]
    async fn inactive_tickets_are_never_candidates() {
        let now = Utc::now();
        let report = IssueReport::new("alice", WIFI, now, None);
        let records = vec![
            ticket("1", WIFI, TicketState::Resolved, 0, now),
            ticket("2", WIFI, TicketState::Closed, 0, now),
            ticket("3", WIFI, TicketState::Cancelled, 0, now),
            ticket("4", WIFI, TicketState::OnHold, 0, now),
        ];
        let check = detector(records).check(issue(&report)).await;
        assert_eq!(check.examined, 1);
        assert!(check.candidates.iter().all(|c| c.ticket.state.is_active()));
        assert_eq!(check.candidates[0].ticket.id, "4");
    }

    #[test]
    fn adding_a_matching_factor_never_lowers_the_score() {
        let now = Utc::now();
        let report = IssueReport::new("alice", "VPN disconnects every few minutes", now, None);
        let d = detector(Vec::new());

        let mut base = ticket("1", "VPN keeps disconnecting", TicketState::New, 20, now);
        base.category = Category::Software;
        base.reporter_id = "bob".into();
        let without = d.score(issue(&report), &base, now).score;

        let mut same_category = base.clone();
        same_category.category = Category::Network;
        let with_category = d.score(issue(&report), &same_category, now).score;

        let mut same_both = same_category.clone();
        same_both.reporter_id = "alice".into();
        let with_both = d.score(issue(&report), &same_both, now).score;

        assert!(with_category >= without);
        assert!(with_both >= with_category);
        assert!((0.0..=1.0).contains(&with_both));
    }

    #[test]
    fn ranking_orders_by_score_then_recency_and_truncates() {
        let now = Utc::now();
        let report = IssueReport::new("alice", WIFI, now, None);
        let d = detector(Vec::new());
        let records = vec![
            ticket("old", WIFI, TicketState::New, 3, now),
            ticket("new", WIFI, TicketState::New, 1, now),
            ticket("mid", WIFI, TicketState::InProgress, 2, now),
            ticket("older", WIFI, TicketState::New, 5, now),
        ];
        let ranked = d.rank(issue(&report), records, now);
        let ids: Vec<&str> = ranked.iter().map(|c| c.ticket.id.as_str()).collect();
        assert_eq!(ids, vec!["new", "mid", "old"]);
    }

    #[test]
    fn recency_decays_past_the_window() {
        let d = detector(Vec::new());
        assert_eq!(d.recency_factor(0), 1.0);
        assert_eq!(d.recency_factor(10), 0.8);
        assert_eq!(d.recency_factor(25), 0.6);
        assert_eq!(d.recency_factor(31), 0.2);
    }

    #[test]
    fn future_ticket_counts_as_fresh() {
        let now = Utc::now();
        let report = IssueReport::new("alice", WIFI, now, None);
        let future = ticket("1", WIFI, TicketState::New, -2, now);
        let score = detector(Vec::new()).score(issue(&report), &future, now);
        assert!(score.has(MatchFactor::Recency));
    }

    #[test]
    fn unrelated_text_stays_below_threshold_despite_metadata() {
        let now = Utc::now();
        let report = IssueReport::new("alice", "Printer on floor 3 jams on every page", now, None);
        let d = detector(Vec::new());
        let other = ticket("1", "VPN certificate expired", TicketState::New, 0, now);
        let ranked = d.rank(issue(&report), vec![other], now);
        assert!(ranked.is_empty());
    }

    #[tokio::test]
    async fn store_failure_is_reported_as_degraded() {
        let mut store = FixedStore::new(Vec::new());
        store.failures = usize::MAX;
        let store = Arc::new(store);
        let d = DuplicateDetector::new(store.clone(), DetectionConfig::default(), Duration::from_millis(200))
            .with_retry_policy(fast_retry(3));
        let report = IssueReport::new("alice", WIFI, Utc::now(), None);
        let check = d.check(issue(&report)).await;
        assert!(check.degraded);
        assert!(check.candidates.is_empty());
        assert_eq!(store.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn transient_query_failure_is_retried_before_degrading() {
        let now = Utc::now();
        let mut store = FixedStore::new(vec![ticket("1", WIFI, TicketState::New, 0, now)]);
        store.failures = 1;
        let store = Arc::new(store);
        let d = DuplicateDetector::new(store.clone(), DetectionConfig::default(), Duration::from_millis(200))
            .with_retry_policy(fast_retry(3));
        let report = IssueReport::new("bob", WIFI, now, None);

        let check = d.check(issue(&report)).await;

        assert!(!check.degraded);
        assert_eq!(check.candidates.len(), 1);
        assert_eq!(store.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn slow_store_is_reported_as_degraded() {
        let mut store = FixedStore::new(Vec::new());
        store.delay = Some(Duration::from_millis(500));
        let d = DuplicateDetector::new(Arc::new(store), DetectionConfig::default(), Duration::from_millis(20));
        let report = IssueReport::new("alice", WIFI, Utc::now(), None);
        assert!(d.check(issue(&report)).await.degraded);
    }
}
