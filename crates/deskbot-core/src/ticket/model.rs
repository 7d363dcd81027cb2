//! Ticket domain model.
//!
//! Tickets are owned by the external ticket store. The assistant reads them
//! for duplicate detection and creates new ones from a [`TicketDraft`]; it
//! never changes the state of an existing record.

use crate::error::{DeskbotError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Lifecycle state of a ticket in the external store.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
pub enum TicketState {
    New,
    InProgress,
    OnHold,
    Resolved,
    Closed,
    Cancelled,
}

impl TicketState {
    /// States eligible for duplicate matching.
    pub const ACTIVE: [TicketState; 3] = [Self::New, Self::InProgress, Self::OnHold];

    /// Returns true for New, InProgress and OnHold.
    pub fn is_active(self) -> bool {
        Self::ACTIVE.contains(&self)
    }
}

/// Support category of an issue.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[strum(ascii_case_insensitive)]
pub enum Category {
    Hardware,
    Software,
    Network,
    Access,
    Email,
    Phone,
    Printer,
    Security,
    General,
}

/// Kind of work a ticket asks for.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[strum(ascii_case_insensitive)]
pub enum TicketType {
    /// Something is broken.
    #[default]
    Incident,
    /// Something new is wanted: access, hardware, software.
    Request,
    /// A planned modification to a service.
    Change,
    /// A recurring fault that needs a root cause.
    Problem,
}

impl TicketType {
    /// Prefix of store-assigned ticket numbers.
    pub fn number_prefix(self) -> &'static str {
        match self {
            Self::Incident => "INC",
            Self::Request => "REQ",
            Self::Change => "CHG",
            Self::Problem => "PRB",
        }
    }

    /// Most urgent priority this kind of ticket may be assigned.
    ///
    /// Requests and changes are planned work and never go past High.
    pub fn priority_ceiling(self) -> Priority {
        match self {
            Self::Incident | Self::Problem => Priority::CRITICAL,
            Self::Request | Self::Change => Priority::HIGH,
        }
    }
}

/// Who is affected by an issue.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[strum(ascii_case_insensitive)]
pub enum ImpactScope {
    #[default]
    Individual,
    Department,
    Organization,
}

/// Ticket priority ordinal, 1 (critical) through 5 (planning).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Priority(u8);

impl Priority {
    pub const CRITICAL: Priority = Priority(1);
    pub const HIGH: Priority = Priority(2);
    pub const MEDIUM: Priority = Priority(3);
    pub const LOW: Priority = Priority(4);
    pub const PLANNING: Priority = Priority(5);

    /// Creates a priority, rejecting anything outside 1..=5.
    pub fn new(ordinal: u8) -> Result<Self> {
        if (1..=5).contains(&ordinal) {
            Ok(Self(ordinal))
        } else {
            Err(DeskbotError::validation(format!(
                "priority must be between 1 and 5, got {}",
                ordinal
            )))
        }
    }

    pub fn ordinal(self) -> u8 {
        self.0
    }

    /// Raises the priority by one level; stays at 1 once reached.
    pub fn escalate(self) -> Self {
        Self(self.0.saturating_sub(1).max(1))
    }

    pub fn name(self) -> &'static str {
        match self.0 {
            1 => "Critical",
            2 => "High",
            3 => "Medium",
            4 => "Low",
            _ => "Planning",
        }
    }

    /// Looks up the fixed SLA commitment for this priority.
    pub fn sla(self) -> Sla {
        SLA_TABLE[(self.0 - 1) as usize]
    }
}

impl TryFrom<u8> for Priority {
    type Error = DeskbotError;

    fn try_from(value: u8) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Priority> for u8 {
    fn from(value: Priority) -> Self {
        value.0
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "P{} ({})", self.0, self.name())
    }
}

/// Response and resolution commitment for a priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sla {
    pub response_hours: u32,
    pub resolution_hours: u32,
    pub business_hours_only: bool,
}

impl Sla {
    /// Human-readable response commitment.
    pub fn response_label(&self) -> String {
        if self.business_hours_only {
            format!("{} business hours", self.response_hours)
        } else {
            format!("{} hours", self.response_hours)
        }
    }

    /// Human-readable resolution commitment.
    pub fn resolution_label(&self) -> String {
        if self.business_hours_only {
            // 8-hour business day
            let days = self.resolution_hours.div_ceil(8);
            format!("{} business day{}", days, if days == 1 { "" } else { "s" })
        } else {
            format!("{} hours", self.resolution_hours)
        }
    }
}

const SLA_TABLE: [Sla; 5] = [
    Sla {
        response_hours: 1,
        resolution_hours: 4,
        business_hours_only: false,
    },
    Sla {
        response_hours: 4,
        resolution_hours: 8,
        business_hours_only: true,
    },
    Sla {
        response_hours: 8,
        resolution_hours: 24,
        business_hours_only: true,
    },
    Sla {
        response_hours: 24,
        resolution_hours: 40,
        business_hours_only: true,
    },
    Sla {
        response_hours: 48,
        resolution_hours: 80,
        business_hours_only: true,
    },
];

/// A ticket as stored in the external ticket store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketRecord {
    /// Store-assigned identifier
    pub id: String,
    /// Human-readable number (e.g. INC0010042)
    pub number: String,
    pub short_description: String,
    pub description: String,
    pub state: TicketState,
    pub category: Category,
    pub priority: Priority,
    pub created_at: DateTime<Utc>,
    pub reporter_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution_notes: Option<String>,
}

/// The fields the assistant supplies when asking the store to create a ticket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketDraft {
    pub short_description: String,
    pub description: String,
    pub category: Category,
    pub priority: Priority,
    pub reporter_id: String,
    #[serde(default)]
    pub ticket_type: TicketType,
    #[serde(default)]
    pub impact: ImpactScope,
}

/// A free-text issue report submitted by a user. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueReport {
    reporter_id: String,
    text: String,
    submitted_at: DateTime<Utc>,
    category_hint: Option<Category>,
}

impl IssueReport {
    pub fn new(
        reporter_id: impl Into<String>,
        text: impl Into<String>,
        submitted_at: DateTime<Utc>,
        category_hint: Option<Category>,
    ) -> Self {
        Self {
            reporter_id: reporter_id.into(),
            text: text.into(),
            submitted_at,
            category_hint,
        }
    }

    pub fn reporter_id(&self) -> &str {
        &self.reporter_id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn submitted_at(&self) -> DateTime<Utc> {
        self.submitted_at
    }

    pub fn category_hint(&self) -> Option<Category> {
        self.category_hint
    }

    /// Validates the report text.
    ///
    /// # Errors
    ///
    /// Returns `DeskbotError::Validation` if the text is blank, contains no
    /// letters or digits, or exceeds `max_len` characters.
    pub fn validate(&self, max_len: usize) -> Result<()> {
        let trimmed = self.text.trim();
        if trimmed.is_empty() {
            return Err(DeskbotError::validation(
                "Please describe the issue you are having.",
            ));
        }
        if !trimmed.chars().any(char::is_alphanumeric) {
            return Err(DeskbotError::validation(
                "I couldn't read that. Please describe the issue in a few words.",
            ));
        }
        if trimmed.chars().count() > max_len {
            return Err(DeskbotError::validation(format!(
                "That description is too long. Please keep it under {} characters.",
                max_len
            )));
        }
        Ok(())
    }

    /// The first line of the report, truncated for use as a short description.
    pub fn short_description(&self) -> String {
        let first_line = self.text.trim().lines().next().unwrap_or_default().trim();
        if first_line.chars().count() <= 80 {
            first_line.to_string()
        } else {
            let cut: String = first_line.chars().take(77).collect();
            format!("{}...", cut.trim_end())
        }
    }
}
