//! Versioned keyword rules for category, ticket type, impact and priority.

mod classifier;
mod table;

pub use classifier::{ORGANIZATION_IMPACT, PriorityAssessment, PriorityClassifier};
pub use table::{CategoryRule, EscalationRule, ImpactRule, RuleTable, TicketTypeRule};
