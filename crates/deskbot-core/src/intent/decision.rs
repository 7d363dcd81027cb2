//! Parsing the user's answer to a list of duplicate candidates.

use crate::text;
use serde::{Deserialize, Serialize};

/// Which candidate the user wants to link to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinkTarget {
    /// 1-based position in the presented list.
    Position(usize),
    /// Ticket number as typed, upper-cased.
    Number(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DuplicateDecision {
    /// Create a new ticket anyway.
    Proceed,
    /// Attach to an existing ticket; the top candidate when no target is given.
    Link(Option<LinkTarget>),
    /// Drop this issue.
    Cancel,
    /// Describe the issue again.
    Modify,
}

const CANCEL: &[&str] = &[
    "cancel", "abort", "never mind", "nevermind", "forget it", "forget about it",
];
/// Only a cancellation when the whole message is one of these.
const CANCEL_EXACT: &[&str] = &["no", "no thanks", "nope", "stop", "stop it", "stop that"];
const PROCEED: &[&str] = &[
    "proceed", "create anyway", "create it anyway", "create it", "create new", "create a new",
    "new ticket", "open a new", "go ahead", "different issue", "different problem",
    "not the same", "not a duplicate", "yes create", "continue",
];
const LINK: &[&str] = &[
    "link", "same issue", "same problem", "that one", "thats it", "thats the one",
    "use existing", "use that", "add me", "follow",
];
const MODIFY: &[&str] = &[
    "modify", "change", "edit", "rephrase", "reword", "let me explain", "describe it again",
];
const RETRY: &[&str] = &["retry", "try again", "try it again", "resend"];
/// Only a retry when the whole message is one of these.
const RETRY_EXACT: &[&str] = &["yes", "yes please", "again", "go ahead", "ok", "okay", "sure"];
const ORDINALS: &[(&str, usize)] = &[
    ("first", 1), ("1st", 1), ("1", 1),
    ("second", 2), ("2nd", 2), ("2", 2),
    ("third", 3), ("3rd", 3), ("3", 3),
];

/// Reads a duplicate decision from free text.
///
/// Returns `None` when the message is not recognisably a decision; the
/// caller re-prompts.
pub fn parse_decision(message: &str) -> Option<DuplicateDecision> {
    let normalized = text::normalize(message);
    if normalized.is_empty() {
        return None;
    }

    if let Some(number) = text::ticket_numbers(message).into_iter().next() {
        return Some(DuplicateDecision::Link(Some(LinkTarget::Number(number))));
    }
    if CANCEL_EXACT.contains(&normalized.as_str()) || text::contains_any(&normalized, CANCEL) {
        return Some(DuplicateDecision::Cancel);
    }
    // "not the same" must win over the link phrase "same issue"
    if text::contains_any(&normalized, PROCEED) {
        return Some(DuplicateDecision::Proceed);
    }
    if text::contains_any(&normalized, LINK) {
        return Some(DuplicateDecision::Link(link_position(&normalized)));
    }
    if text::contains_any(&normalized, MODIFY) {
        return Some(DuplicateDecision::Modify);
    }
    // a bare "2" or "second" picks a candidate
    ORDINALS
        .iter()
        .find(|(word, _)| normalized == *word)
        .map(|(_, position)| DuplicateDecision::Link(Some(LinkTarget::Position(*position))))
}

fn link_position(normalized: &str) -> Option<LinkTarget> {
    ORDINALS
        .iter()
        .find(|(word, _)| text::contains_phrase(normalized, word))
        .map(|(_, position)| LinkTarget::Position(*position))
}

/// True for "cancel"-style messages outside the decision prompt.
pub fn is_cancellation(message: &str) -> bool {
    let normalized = text::normalize(message);
    CANCEL_EXACT.contains(&normalized.as_str()) || text::contains_any(&normalized, CANCEL)
}

/// True for "retry"-style messages after a failed creation.
pub fn is_retry_request(message: &str) -> bool {
    let normalized = text::normalize(message);
    RETRY_EXACT.contains(&normalized.as_str()) || text::contains_any(&normalized, RETRY)
}
