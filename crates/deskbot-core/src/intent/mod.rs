//! Intent routing for conversational turns.
//!
//! - `model`: intents and verdicts
//! - `classifier`: the pluggable external text classifier
//! - `decision`: parsing answers to a duplicate prompt
//! - `router`: rules first, classifier second

mod classifier;
mod decision;
mod model;
mod router;

pub use classifier::{ClassificationRequest, ClassifierVerdict, TextClassifier};
pub use decision::{DuplicateDecision, LinkTarget, is_cancellation, is_retry_request, parse_decision};
pub use model::{Intent, IntentVerdict, VerdictSource};
pub use router::IntentRouter;
