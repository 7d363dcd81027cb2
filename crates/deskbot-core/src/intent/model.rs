use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// What the user is trying to do with a message.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Intent {
    Search,
    CreateTicket,
    DuplicateDecision,
    Smalltalk,
    Unknown,
}

/// Where an [`IntentVerdict`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum VerdictSource {
    Rules,
    Classifier,
    /// No rule matched and the classifier was absent, failed or unsure.
    Fallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IntentVerdict {
    pub intent: Intent,
    pub confidence: f64,
    pub source: VerdictSource,
}

impl IntentVerdict {
    pub fn rules(intent: Intent, confidence: f64) -> Self {
        Self {
            intent,
            confidence,
            source: VerdictSource::Rules,
        }
    }

    pub fn unknown() -> Self {
        Self {
            intent: Intent::Unknown,
            confidence: 0.0,
            source: VerdictSource::Fallback,
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.intent == Intent::Unknown
    }
}
