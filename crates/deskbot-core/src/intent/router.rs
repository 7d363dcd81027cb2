//! Turn classification: keyword rules first, external classifier second.

use super::classifier::{ClassificationRequest, TextClassifier};
use super::decision::{is_cancellation, is_retry_request, parse_decision};
use super::model::{Intent, IntentVerdict, VerdictSource};
use crate::session::Stage;
use crate::text;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use strum::IntoEnumIterator;
use tracing::{debug, warn};

const SEARCH: &[&str] = &[
    "status of", "my tickets", "my open tickets", "look up", "lookup", "find my ticket",
    "check on my ticket", "existing tickets", "open tickets", "search tickets",
    "search for ticket", "search my tickets",
];
const KNOWLEDGE: &[&str] = &[
    "how do i", "how can i", "how to", "knowledge base", "kb article", "article about",
    "guide for", "guide to", "instructions for", "documentation for",
];
const GREETING: &[&str] = &[
    "hi", "hello", "hey", "thanks", "thank you", "good morning", "good afternoon",
    "good evening", "bye", "goodbye", "help", "what can you do",
];
const PROBLEM: &[&str] = &[
    "not working", "doesnt work", "isnt working", "stopped working", "wont", "cant", "cannot",
    "unable", "error", "errors", "failed", "fails", "failing", "broken", "crash", "crashed",
    "crashes", "crashing", "down", "slow", "stuck", "frozen", "freezes", "issue", "problem",
    "help with", "locked out", "no longer", "keeps", "missing",
];
const REQUEST: &[&str] = &[
    "create a ticket", "open a ticket", "raise a ticket", "log a ticket", "new ticket",
    "report an issue", "report a problem", "need access", "request access", "need a new",
    "install",
];

/// Classifies a user turn into an [`Intent`].
pub struct IntentRouter {
    classifier: Option<Arc<dyn TextClassifier>>,
    timeout: Duration,
    min_confidence: f64,
}

impl IntentRouter {
    pub fn new(
        classifier: Option<Arc<dyn TextClassifier>>,
        timeout: Duration,
        min_confidence: f64,
    ) -> Self {
        Self {
            classifier,
            timeout,
            min_confidence,
        }
    }

    /// Router without an external classifier.
    pub fn rules_only() -> Self {
        Self::new(None, Duration::from_secs(1), 0.5)
    }

    /// The intent a stage is waiting for; used when a turn is `Unknown`.
    pub fn expected_intent(stage: Stage) -> Intent {
        match stage {
            Stage::AwaitingDecision => Intent::DuplicateDecision,
            Stage::Start | Stage::DuplicateChecked | Stage::Completed => Intent::CreateTicket,
        }
    }

    /// Classifies `message` given the session stage.
    ///
    /// Never fails: classifier errors, timeouts and low-confidence answers
    /// all come back as `Unknown` with confidence 0.
    pub async fn route(&self, message: &str, stage: Stage) -> IntentVerdict {
        if let Some(verdict) = self.route_by_rules(message, stage) {
            debug!(intent = %verdict.intent, confidence = verdict.confidence, %stage, "Intent from rules");
            return verdict;
        }
        let Some(classifier) = &self.classifier else {
            return IntentVerdict::unknown();
        };

        let labels: Vec<String> = Intent::iter().map(|i| i.to_string()).collect();
        let request = ClassificationRequest::new(message, labels).with_context("stage", stage.to_string());

        let verdict = match tokio::time::timeout(self.timeout, classifier.classify(&request)).await {
            Ok(Ok(verdict)) => verdict,
            Ok(Err(e)) => {
                warn!(provider = classifier.name(), error = %e, "Intent classifier failed");
                return IntentVerdict::unknown();
            }
            Err(_) => {
                warn!(provider = classifier.name(), "Intent classifier timed out");
                return IntentVerdict::unknown();
            }
        };

        let Some(intent) = request
            .resolve_label(&verdict.label)
            .and_then(|label| Intent::from_str(label).ok())
        else {
            warn!(provider = classifier.name(), label = %verdict.label, "Classifier returned an unknown label");
            return IntentVerdict::unknown();
        };
        if !verdict.confidence.is_finite() || verdict.confidence < self.min_confidence {
            debug!(
                provider = classifier.name(),
                %intent,
                confidence = verdict.confidence,
                "Classifier answer below minimum confidence"
            );
            return IntentVerdict::unknown();
        }

        IntentVerdict {
            intent,
            confidence: verdict.confidence.clamp(0.0, 1.0),
            source: VerdictSource::Classifier,
        }
    }

    /// The keyword pass alone; `None` when inconclusive.
    pub fn route_by_rules(&self, message: &str, stage: Stage) -> Option<IntentVerdict> {
        let normalized = text::normalize(message);
        if normalized.is_empty() {
            return None;
        }

        match stage {
            Stage::AwaitingDecision if parse_decision(message).is_some() => {
                return Some(IntentVerdict::rules(Intent::DuplicateDecision, 0.9));
            }
            Stage::DuplicateChecked => {
                if is_cancellation(message) {
                    return Some(IntentVerdict::rules(Intent::DuplicateDecision, 0.9));
                }
                if is_retry_request(message) {
                    return Some(IntentVerdict::rules(Intent::CreateTicket, 0.9));
                }
            }
            _ => {}
        }

        if !text::ticket_numbers(message).is_empty() || text::contains_any(&normalized, SEARCH) {
            return Some(IntentVerdict::rules(Intent::Search, 0.8));
        }

        let problem = text::contains_any(&normalized, PROBLEM) || text::contains_any(&normalized, REQUEST);
        if !problem && text::contains_any(&normalized, KNOWLEDGE) {
            return Some(IntentVerdict::rules(Intent::Search, 0.7));
        }
        if !problem && text::contains_any(&normalized, GREETING) {
            return Some(IntentVerdict::rules(Intent::Smalltalk, 0.8));
        }
        if problem {
            return Some(IntentVerdict::rules(Intent::CreateTicket, 0.75));
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{DeskbotError, Result};
    use crate::intent::ClassifierVerdict;
    use async_trait::async_trait;

    struct Scripted {
        answer: Result<ClassifierVerdict>,
        delay: Duration,
    }

    #[async_trait]
    impl TextClassifier for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn classify(&self, _request: &ClassificationRequest) -> Result<ClassifierVerdict> {
            tokio::time::sleep(self.delay).await;
            self.answer.clone()
        }
    }

    fn with_classifier(answer: Result<ClassifierVerdict>, delay_ms: u64) -> IntentRouter {
        IntentRouter::new(
            Some(Arc::new(Scripted {
                answer,
                delay: Duration::from_millis(delay_ms),
            })),
            Duration::from_millis(100),
            0.5,
        )
    }

    fn verdict(label: &str, confidence: f64) -> Result<ClassifierVerdict> {
        Ok(ClassifierVerdict {
            label: label.to_string(),
            confidence,
        })
    }

    #[tokio::test]
    async fn problem_description_is_create_ticket() {
        let router = IntentRouter::rules_only();
        let v = router
            .route("My laptop won't connect to WiFi, authentication failed", Stage::Start)
            .await;
        assert_eq!(v.intent, Intent::CreateTicket);
        assert_eq!(v.source, VerdictSource::Rules);
    }

    #[tokio::test]
    async fn decision_words_only_count_while_awaiting_decision() {
        let router = IntentRouter::rules_only();
        let awaiting = router.route("create it anyway", Stage::AwaitingDecision).await;
        assert_eq!(awaiting.intent, Intent::DuplicateDecision);
        assert_eq!(awaiting.confidence, 0.9);
    }

    #[tokio::test]
    async fn retry_after_failure_is_create_ticket() {
        let router = IntentRouter::rules_only();
        let v = router.route("retry", Stage::DuplicateChecked).await;
        assert_eq!(v.intent, Intent::CreateTicket);
        let v = router.route("never mind", Stage::DuplicateChecked).await;
        assert_eq!(v.intent, Intent::DuplicateDecision);
    }

    #[tokio::test]
    async fn greetings_and_searches() {
        let router = IntentRouter::rules_only();
        assert_eq!(router.route("Hello there!", Stage::Start).await.intent, Intent::Smalltalk);
        assert_eq!(
            router.route("hi, my printer is broken", Stage::Start).await.intent,
            Intent::CreateTicket
        );
        assert_eq!(
            router.route("what's the status of INC0010001", Stage::Start).await.intent,
            Intent::Search
        );
    }

    #[tokio::test]
    async fn how_to_questions_are_searches_unless_something_is_broken() {
        let router = IntentRouter::rules_only();
        assert_eq!(
            router.route("How do I reset my password?", Stage::Start).await.intent,
            Intent::Search
        );
        assert_eq!(
            router.route("how do I fix this error, Outlook crashed", Stage::Start).await.intent,
            Intent::CreateTicket
        );
    }

    #[tokio::test]
    async fn inconclusive_without_classifier_is_unknown() {
        let v = IntentRouter::rules_only().route("purple monkey dishwasher", Stage::Start).await;
        assert!(v.is_unknown());
        assert_eq!(v.confidence, 0.0);
        assert_eq!(IntentRouter::expected_intent(Stage::Start), Intent::CreateTicket);
        assert_eq!(
            IntentRouter::expected_intent(Stage::AwaitingDecision),
            Intent::DuplicateDecision
        );
    }

    #[tokio::test]
    async fn confident_classifier_answer_is_used() {
        let router = with_classifier(verdict("SEARCH", 0.82), 0);
        let v = router.route("purple monkey dishwasher", Stage::Start).await;
        assert_eq!(v.intent, Intent::Search);
        assert_eq!(v.source, VerdictSource::Classifier);
    }

    #[tokio::test]
    async fn classifier_failure_yields_unknown() {
        let router = with_classifier(Err(DeskbotError::transient("classifier", "429")), 0);
        let v = router.route("purple monkey dishwasher", Stage::Start).await;
        assert_eq!(v.intent, Intent::Unknown);
        assert_eq!(v.confidence, 0.0);
    }

    #[tokio::test]
    async fn classifier_timeout_yields_unknown() {
        let router = with_classifier(verdict("search", 0.99), 1_000);
        assert!(router.route("purple monkey dishwasher", Stage::Start).await.is_unknown());
    }

    #[tokio::test]
    async fn low_confidence_or_bad_label_yields_unknown() {
        let low = with_classifier(verdict("search", 0.2), 0);
        assert!(low.route("purple monkey dishwasher", Stage::Start).await.is_unknown());
        let bad = with_classifier(verdict("weather", 0.9), 0);
        assert!(bad.route("purple monkey dishwasher", Stage::Start).await.is_unknown());
    }
}
