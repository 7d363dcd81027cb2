//! Deterministic priority and category classification over a [`RuleTable`].

use super::table::RuleTable;
use crate::error::{DeskbotError, Result};
use crate::text;
use crate::ticket::{Category, ImpactScope, Priority, Sla, TicketType};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Result of classifying an issue's priority.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriorityAssessment {
    pub category: Category,
    pub baseline: Priority,
    pub priority: Priority,
    pub sla: Sla,
    pub ticket_type: TicketType,
    pub impact: ImpactScope,
    /// Escalation classes that fired, in table order.
    pub escalations: Vec<String>,
    /// Version of the rule table that produced this result.
    pub rules_version: String,
}

/// Escalation recorded when an issue affects the whole organization.
pub const ORGANIZATION_IMPACT: &str = "organization_impact";

struct KeywordMatcher {
    pattern: Regex,
}

impl KeywordMatcher {
    /// Builds a whole-word alternation over the normalized keywords.
    fn compile(keywords: &[String]) -> Result<Option<Self>> {
        let alternatives: Vec<String> = keywords
            .iter()
            .map(|k| text::normalize(k))
            .filter(|k| !k.is_empty())
            .map(|k| regex::escape(&k))
            .collect();
        if alternatives.is_empty() {
            return Ok(None);
        }
        let pattern = Regex::new(&format!(r"\b(?:{})\b", alternatives.join("|")))
            .map_err(|e| DeskbotError::config(format!("invalid keyword pattern: {}", e)))?;
        Ok(Some(Self { pattern }))
    }

    fn is_match(&self, normalized: &str) -> bool {
        self.pattern.is_match(normalized)
    }

    /// Number of distinct keywords found.
    fn hits(&self, normalized: &str) -> usize {
        self.pattern
            .find_iter(normalized)
            .map(|m| m.as_str())
            .collect::<HashSet<_>>()
            .len()
    }
}

/// Compiled rule table.
///
/// Construction validates the table, so a `PriorityClassifier` that exists
/// can always classify.
pub struct PriorityClassifier {
    table: RuleTable,
    escalations: Vec<(String, KeywordMatcher)>,
    categories: Vec<(Category, KeywordMatcher)>,
    ticket_types: Vec<(TicketType, KeywordMatcher)>,
    impacts: Vec<(ImpactScope, KeywordMatcher)>,
}

impl std::fmt::Debug for PriorityClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PriorityClassifier")
            .field("version", &self.table.version)
            .field("escalations", &self.escalations.len())
            .field("categories", &self.categories.len())
            .finish()
    }
}

impl PriorityClassifier {
    pub fn new(table: RuleTable) -> Result<Self> {
        table.validate()?;

        let mut escalations = Vec::with_capacity(table.escalations.len());
        for rule in &table.escalations {
            if let Some(matcher) = KeywordMatcher::compile(&rule.keywords)? {
                escalations.push((rule.class.clone(), matcher));
            }
        }

        let mut categories = Vec::with_capacity(table.categories.len());
        for rule in &table.categories {
            if let Some(matcher) = KeywordMatcher::compile(&rule.keywords)? {
                categories.push((rule.category, matcher));
            }
        }

        let mut ticket_types = Vec::with_capacity(table.ticket_types.len());
        for rule in &table.ticket_types {
            if let Some(matcher) = KeywordMatcher::compile(&rule.keywords)? {
                ticket_types.push((rule.ticket_type, matcher));
            }
        }

        let mut impacts = Vec::with_capacity(table.impacts.len());
        for rule in &table.impacts {
            if let Some(matcher) = KeywordMatcher::compile(&rule.keywords)? {
                impacts.push((rule.scope, matcher));
            }
        }

        tracing::debug!(
            version = %table.version,
            escalation_classes = escalations.len(),
            category_rules = categories.len(),
            ticket_type_rules = ticket_types.len(),
            impact_rules = impacts.len(),
            "Compiled rule table"
        );

        Ok(Self {
            table,
            escalations,
            categories,
            ticket_types,
            impacts,
        })
    }

    /// Classifier over the built-in rule table.
    pub fn builtin() -> Result<Self> {
        Self::new(RuleTable::builtin())
    }

    pub fn table(&self) -> &RuleTable {
        &self.table
    }

    pub fn version(&self) -> String {
        self.table.version.to_string()
    }

    /// Picks a category from keyword rules.
    ///
    /// A hint always wins. Otherwise the rule with the most distinct keyword
    /// hits wins, earlier rules winning ties. Returns `None` when nothing
    /// matched so the caller can consult another classifier.
    pub fn classify_category(&self, text: &str, hint: Option<Category>) -> Option<Category> {
        if hint.is_some() {
            return hint;
        }
        let normalized = text::normalize(text);
        let mut best: Option<(Category, usize)> = None;
        for (category, matcher) in &self.categories {
            let hits = matcher.hits(&normalized);
            if hits == 0 {
                continue;
            }
            // strictly greater keeps the earlier rule on ties
            if best.is_none_or(|(_, top)| hits > top) {
                best = Some((*category, hits));
            }
        }
        best.map(|(category, _)| category)
    }

    /// Incident, request, change or problem; the first matching rule wins.
    pub fn classify_type(&self, text: &str) -> TicketType {
        let normalized = text::normalize(text);
        self.ticket_types
            .iter()
            .find(|(_, matcher)| matcher.is_match(&normalized))
            .map(|(ticket_type, _)| *ticket_type)
            .unwrap_or_default()
    }

    /// Who the issue affects; the first matching rule wins.
    pub fn impact_scope(&self, text: &str) -> ImpactScope {
        let normalized = text::normalize(text);
        self.impacts
            .iter()
            .find(|(_, matcher)| matcher.is_match(&normalized))
            .map(|(scope, _)| *scope)
            .unwrap_or_default()
    }

    /// Assigns priority and SLA for an issue in the given category.
    ///
    /// Each escalation class that matches raises the priority by one level,
    /// never past 1. Organization-wide impact adds one more level. Requests
    /// and changes are then held at their type's ceiling.
    pub fn assess(&self, text: &str, category: Category) -> PriorityAssessment {
        let normalized = text::normalize(text);
        let baseline = self.table.baseline_for(category);
        let ticket_type = self.classify_type(text);
        let impact = self.impact_scope(text);

        let mut escalations: Vec<String> = self
            .escalations
            .iter()
            .filter(|(_, matcher)| matcher.is_match(&normalized))
            .map(|(class, _)| class.clone())
            .collect();
        if impact == ImpactScope::Organization {
            escalations.push(ORGANIZATION_IMPACT.to_string());
        }

        let priority = escalations
            .iter()
            .fold(baseline, |priority, _| priority.escalate())
            .max(ticket_type.priority_ceiling());

        PriorityAssessment {
            category,
            baseline,
            priority,
            sla: priority.sla(),
            ticket_type,
            impact,
            escalations,
            rules_version: self.version(),
        }
    }
}
