//! Duplicate detection against active tickets.

mod detector;
mod model;

pub use detector::{DuplicateDetector, IssueUnderCheck};
pub use model::{DuplicateCandidate, DuplicateCheck, MatchFactor, Recommendation, SimilarityScore};
