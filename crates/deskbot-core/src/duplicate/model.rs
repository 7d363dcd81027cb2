use crate::ticket::TicketRecord;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Factor that contributed to a similarity score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MatchFactor {
    Text,
    Category,
    Reporter,
    Priority,
    Recency,
}

/// Score of one existing ticket against a new report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityScore {
    pub ticket_id: String,
    /// Always within `[0, 1]`.
    pub score: f64,
    #[serde(default)]
    pub factors: Vec<MatchFactor>,
}

impl SimilarityScore {
    pub fn has(&self, factor: MatchFactor) -> bool {
        self.factors.contains(&factor)
    }
}

/// What the user is advised to do with a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Recommendation {
    /// Almost certainly the same issue.
    Link,
    /// Likely the same issue.
    Review,
    /// Possibly related.
    Check,
}

impl Recommendation {
    pub fn for_score(score: f64) -> Self {
        if score >= 0.9 {
            Self::Link
        } else if score >= 0.8 {
            Self::Review
        } else {
            Self::Check
        }
    }
}

/// A ticket that scored at or above the duplicate threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateCandidate {
    pub score: SimilarityScore,
    pub ticket: TicketRecord,
    pub recommendation: Recommendation,
}

/// Outcome of a duplicate check.
///
/// `degraded` is set when the ticket store could not be queried; the
/// candidate list is then empty but must not be read as "no duplicates".
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DuplicateCheck {
    pub candidates: Vec<DuplicateCandidate>,
    pub degraded: bool,
    /// Active tickets that were scored.
    pub examined: usize,
}

impl DuplicateCheck {
    pub fn degraded() -> Self {
        Self {
            candidates: Vec::new(),
            degraded: true,
            examined: 0,
        }
    }

    pub fn has_duplicates(&self) -> bool {
        !self.candidates.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recommendation_bands() {
        assert_eq!(Recommendation::for_score(0.95), Recommendation::Link);
        assert_eq!(Recommendation::for_score(0.9), Recommendation::Link);
        assert_eq!(Recommendation::for_score(0.85), Recommendation::Review);
        assert_eq!(Recommendation::for_score(0.71), Recommendation::Check);
    }

    #[test]
    fn factor_tags_render_lowercase() {
        assert_eq!(MatchFactor::Reporter.to_string(), "reporter");
        assert_eq!(serde_json::to_string(&MatchFactor::Text).unwrap(), "\"text\"");
    }
}
