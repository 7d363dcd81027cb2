//! Versioned keyword rule table.
//!
//! The table is plain data so it can be shipped as a TOML file and swapped
//! per deployment. A built-in table is used when no file is configured.
//!
//! ```toml
//! version = "1.0.0"
//! default_priority = 4
//!
//! [baseline]
//! Network = 4
//! Security = 2
//!
//! [[escalation]]
//! class = "urgency"
//! keywords = ["urgent", "asap"]
//!
//! [[category]]
//! category = "Network"
//! keywords = ["wifi", "vpn"]
//!
//! [[ticket_type]]
//! ticket_type = "Request"
//! keywords = ["need access"]
//!
//! [[impact]]
//! scope = "Organization"
//! keywords = ["company wide"]
//! ```

use crate::error::{DeskbotError, Result};
use crate::ticket::{Category, ImpactScope, Priority, TicketType};
use semver::Version;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleTable {
    pub version: Version,
    /// Priority for categories missing from `baseline`.
    #[serde(default = "default_priority")]
    pub default_priority: Priority,
    /// Category name to baseline priority.
    #[serde(default)]
    pub baseline: BTreeMap<String, Priority>,
    #[serde(rename = "escalation", default)]
    pub escalations: Vec<EscalationRule>,
    /// Evaluated in order; earlier rules win ties.
    #[serde(rename = "category", default)]
    pub categories: Vec<CategoryRule>,
    /// First match wins; `Incident` when nothing matches.
    #[serde(rename = "ticket_type", default)]
    pub ticket_types: Vec<TicketTypeRule>,
    /// First match wins; `Individual` when nothing matches.
    #[serde(rename = "impact", default)]
    pub impacts: Vec<ImpactRule>,
}

fn default_priority() -> Priority {
    Priority::LOW
}

/// A keyword class that raises priority by one level when any keyword hits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EscalationRule {
    pub class: String,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRule {
    pub category: Category,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketTypeRule {
    pub ticket_type: TicketType,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImpactRule {
    pub scope: ImpactScope,
    pub keywords: Vec<String>,
}

impl RuleTable {
    /// Parses and validates a TOML rule table.
    ///
    /// # Errors
    ///
    /// Any parse or validation failure is a `FatalConfiguration` error.
    pub fn from_toml(content: &str) -> Result<Self> {
        let table: RuleTable = toml::from_str(content)
            .map_err(|e| DeskbotError::config(format!("invalid rule table: {}", e)))?;
        table.validate()?;
        Ok(table)
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Checks that the table only names known categories and has no empty
    /// keyword lists.
    pub fn validate(&self) -> Result<()> {
        for name in self.baseline.keys() {
            Category::from_str(name).map_err(|_| {
                DeskbotError::config(format!("rule table v{}: unknown category '{}' in baseline", self.version, name))
            })?;
        }
        for rule in &self.escalations {
            if rule.class.trim().is_empty() {
                return Err(DeskbotError::config(format!(
                    "rule table v{}: escalation class without a name",
                    self.version
                )));
            }
            if rule.keywords.iter().all(|k| k.trim().is_empty()) {
                return Err(DeskbotError::config(format!(
                    "rule table v{}: escalation class '{}' has no keywords",
                    self.version, rule.class
                )));
            }
        }
        for rule in &self.categories {
            if rule.keywords.iter().all(|k| k.trim().is_empty()) {
                return Err(DeskbotError::config(format!(
                    "rule table v{}: category rule '{}' has no keywords",
                    self.version, rule.category
                )));
            }
        }
        for rule in &self.ticket_types {
            if rule.keywords.iter().all(|k| k.trim().is_empty()) {
                return Err(DeskbotError::config(format!(
                    "rule table v{}: ticket type rule '{}' has no keywords",
                    self.version, rule.ticket_type
                )));
            }
        }
        for rule in &self.impacts {
            if rule.keywords.iter().all(|k| k.trim().is_empty()) {
                return Err(DeskbotError::config(format!(
                    "rule table v{}: impact rule '{}' has no keywords",
                    self.version, rule.scope
                )));
            }
        }
        Ok(())
    }

    /// Baseline priority for a category.
    pub fn baseline_for(&self, category: Category) -> Priority {
        self.baseline
            .iter()
            .find(|(name, _)| Category::from_str(name).ok() == Some(category))
            .map(|(_, priority)| *priority)
            .unwrap_or(self.default_priority)
    }

    /// The table compiled into the binary.
    ///
    /// Security is listed before Email so phishing reports are not filed as
    /// mail problems, and hardware starts one level higher than other
    /// single-user categories.
    pub fn builtin() -> Self {
        let words = |list: &[&str]| list.iter().map(|s| s.to_string()).collect::<Vec<_>>();

        let baseline = [
            (Category::Security, Priority::HIGH),
            (Category::Hardware, Priority::MEDIUM),
            (Category::Network, Priority::LOW),
            (Category::Software, Priority::LOW),
            (Category::Access, Priority::LOW),
            (Category::Email, Priority::LOW),
            (Category::Phone, Priority::LOW),
            (Category::Printer, Priority::LOW),
            (Category::General, Priority::LOW),
        ]
        .into_iter()
        .map(|(category, priority)| (category.to_string(), priority))
        .collect();

        let escalations = vec![
            EscalationRule {
                class: "urgency".to_string(),
                keywords: words(&[
                    "urgent", "urgently", "asap", "as soon as possible", "immediately",
                    "emergency", "critical", "right now", "outage", "system down",
                    "server down", "cannot work", "cant work", "blocking",
                ]),
            },
            EscalationRule {
                class: "multi_user_impact".to_string(),
                keywords: words(&[
                    "everyone", "all users", "whole team", "entire team", "whole office",
                    "entire office", "company wide", "whole department", "entire department",
                    "multiple users", "nobody can", "no one can", "all of us",
                ]),
            },
            EscalationRule {
                class: "security".to_string(),
                keywords: words(&[
                    "phishing", "breach", "malware", "ransomware", "virus", "hacked",
                    "compromised", "data leak", "suspicious",
                ]),
            },
        ];

        let categories = vec![
            CategoryRule {
                category: Category::Security,
                keywords: words(&[
                    "phishing", "phish", "malware", "virus", "ransomware", "hacked",
                    "compromised", "breach", "suspicious email", "suspicious link", "scam",
                ]),
            },
            CategoryRule {
                category: Category::Email,
                keywords: words(&[
                    "email", "e mail", "outlook", "mailbox", "inbox", "mail delivery",
                    "calendar invite",
                ]),
            },
            CategoryRule {
                category: Category::Network,
                keywords: words(&[
                    "wifi", "wi fi", "wireless", "internet", "network", "vpn", "connect",
                    "connection", "ethernet", "dns", "proxy",
                ]),
            },
            CategoryRule {
                category: Category::Access,
                keywords: words(&[
                    "password", "login", "log in", "sign in", "locked out", "account locked",
                    "permission", "permissions", "access denied", "mfa", "authentication",
                ]),
            },
            CategoryRule {
                category: Category::Printer,
                keywords: words(&["printer", "printing", "print", "paper jam", "toner", "scanner"]),
            },
            CategoryRule {
                category: Category::Phone,
                keywords: words(&[
                    "phone", "voicemail", "headset", "softphone", "conference call", "dial tone",
                ]),
            },
            CategoryRule {
                category: Category::Hardware,
                keywords: words(&[
                    "laptop", "computer", "desktop", "monitor", "screen", "keyboard", "mouse",
                    "docking station", "battery", "charger", "hard drive", "webcam",
                ]),
            },
            CategoryRule {
                category: Category::Software,
                keywords: words(&[
                    "application", "app", "software", "install", "installation", "update",
                    "upgrade", "excel", "teams", "license", "crash", "crashes",
                ]),
            },
        ];

        let ticket_types = vec![
            TicketTypeRule {
                ticket_type: TicketType::Change,
                keywords: words(&[
                    "planned change", "schedule a change", "change request", "maintenance window",
                    "deploy", "deployment", "rollout", "roll out", "migrate", "migration",
                    "decommission",
                ]),
            },
            TicketTypeRule {
                ticket_type: TicketType::Request,
                keywords: words(&[
                    "request", "requesting", "need access", "request access", "need a new",
                    "can i get", "could i get", "can i have", "please install", "new starter",
                    "onboarding", "order a", "provision",
                ]),
            },
            TicketTypeRule {
                ticket_type: TicketType::Problem,
                keywords: words(&[
                    "recurring", "keeps happening", "happens every", "every time", "every day",
                    "again and again", "repeatedly", "root cause", "intermittent", "intermittently",
                ]),
            },
        ];

        let impacts = vec![
            ImpactRule {
                scope: ImpactScope::Organization,
                keywords: words(&[
                    "entire company", "whole company", "company wide", "organization wide",
                    "organisation wide", "all offices", "every office", "all sites",
                    "all employees", "everyone in the company",
                ]),
            },
            ImpactRule {
                scope: ImpactScope::Department,
                keywords: words(&[
                    "department", "team", "division", "everyone", "all users", "whole office",
                    "entire office", "multiple users", "nobody can", "no one can", "all of us",
                    "colleagues",
                ]),
            },
        ];

        Self {
            version: Version::new(1, 1, 0),
            default_priority: Priority::LOW,
            baseline,
            escalations,
            categories,
            ticket_types,
            impacts,
        }
    }
}
