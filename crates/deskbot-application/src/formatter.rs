//! Turn outcomes to user-facing replies.

use crate::outcome::{PromptKind, TurnOutcome, TurnPayload};
use deskbot_core::duplicate::DuplicateCandidate;
use deskbot_core::knowledge::KnowledgeArticle;
use deskbot_core::ticket::{Priority, Sla, TicketRecord};
use serde::{Deserialize, Serialize};
use strum::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ReplyKind {
    TicketCreated,
    Duplicates,
    Linked,
    SearchResults,
    Prompt,
    Error,
}

/// Structured reply for one turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BotReply {
    pub kind: ReplyKind,
    pub headline: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<String>,
    /// Suggested next things the user can say.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticket_number: Option<String>,
    /// Shown when the duplicate check was skipped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
}

impl BotReply {
    fn new(kind: ReplyKind, headline: impl Into<String>) -> Self {
        Self {
            kind,
            headline: headline.into(),
            details: Vec::new(),
            actions: Vec::new(),
            ticket_number: None,
            notice: None,
        }
    }

    fn detail(mut self, line: impl Into<String>) -> Self {
        self.details.push(line.into());
        self
    }

    fn actions(mut self, actions: &[&str]) -> Self {
        self.actions = actions.iter().map(|a| a.to_string()).collect();
        self
    }
}

const DEGRADED_NOTICE: &str =
    "I couldn't check for similar open tickets just now, so this one was created without a duplicate check.";

/// Pure mapping from [`TurnOutcome`] to [`BotReply`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseFormatter;

impl ResponseFormatter {
    pub fn format(&self, outcome: &TurnOutcome) -> BotReply {
        match &outcome.payload {
            TurnPayload::TicketCreated {
                ticket,
                sla,
                escalations,
                degraded,
                reused_existing,
            } => {
                let headline = if *reused_existing {
                    format!("Your ticket {} is already logged.", ticket.number)
                } else {
                    format!("I've created ticket {} for you.", ticket.number)
                };
                let mut reply = BotReply::new(ReplyKind::TicketCreated, headline)
                    .detail(format!("Summary: {}", ticket.short_description))
                    .detail(format!("Category: {}", ticket.category))
                    .detail(priority_line(ticket.priority, sla));
                if !escalations.is_empty() {
                    reply = reply.detail(format!("Raised because of: {}", escalations.join(", ")));
                }
                reply.ticket_number = Some(ticket.number.clone());
                if *degraded {
                    reply.notice = Some(DEGRADED_NOTICE.to_string());
                }
                reply.actions(&["describe another issue", "check my tickets"])
            }
            TurnPayload::Duplicates {
                candidates,
                category,
                priority,
                sla,
            } => {
                let mut reply = BotReply::new(
                    ReplyKind::Duplicates,
                    format!(
                        "This looks similar to {} open ticket{}.",
                        candidates.len(),
                        if candidates.len() == 1 { "" } else { "s" }
                    ),
                );
                reply.details = candidate_lines(candidates);
                reply = reply
                    .detail(format!("If it's a new issue it would be filed as {}.", category))
                    .detail(priority_line(*priority, sla));
                reply.actions(&["link", "proceed", "modify", "cancel"])
            }
            TurnPayload::Linked { ticket } => {
                let mut reply = BotReply::new(
                    ReplyKind::Linked,
                    format!("Great, you're following {} instead of opening a new ticket.", ticket.number),
                )
                .detail(ticket_line(ticket));
                reply.ticket_number = Some(ticket.number.clone());
                reply
            }
            TurnPayload::SearchResults { tickets, articles } if tickets.is_empty() && articles.is_empty() => {
                BotReply::new(ReplyKind::SearchResults, "I couldn't find any matching tickets or articles.")
                    .actions(&["describe an issue"])
            }
            TurnPayload::SearchResults { tickets, articles } => {
                let mut reply = BotReply::new(ReplyKind::SearchResults, "Here is what I found:");
                reply.details = tickets.iter().map(ticket_line).collect();
                reply.details.extend(articles.iter().map(article_line));
                if tickets.is_empty() {
                    reply = reply.actions(&["describe an issue"]);
                }
                reply
            }
            TurnPayload::Prompt(prompt) => format_prompt(prompt),
            TurnPayload::Failure { message, retryable } => {
                let reply = BotReply::new(ReplyKind::Error, message.clone());
                if *retryable {
                    reply.actions(&["retry", "cancel"])
                } else {
                    reply
                }
            }
        }
    }
}

fn format_prompt(prompt: &PromptKind) -> BotReply {
    match prompt {
        PromptKind::Welcome => BotReply::new(
            ReplyKind::Prompt,
            "Hi! I can log IT issues for you and check on your existing tickets.",
        )
        .detail("Describe what's wrong in a sentence or two.")
        .actions(&["describe an issue", "check my tickets"]),
        PromptKind::DescribeIssue => BotReply::new(ReplyKind::Prompt, "What issue are you having?"),
        PromptKind::DescribeAgain => {
            BotReply::new(ReplyKind::Prompt, "Sure. Please describe the issue again.")
        }
        PromptKind::Cancelled => BotReply::new(
            ReplyKind::Prompt,
            "Okay, I've cancelled that. Let me know if anything else comes up.",
        ),
        PromptKind::ChooseDecision { candidates } => {
            let mut reply = BotReply::new(
                ReplyKind::Prompt,
                "Should I link you to one of these tickets or create a new one?",
            );
            reply.details = candidate_lines(candidates);
            reply.actions(&["link", "proceed", "modify", "cancel"])
        }
        PromptKind::InvalidInput { message } => BotReply::new(ReplyKind::Prompt, message.clone()),
        PromptKind::UnknownCandidate { reference } if reference.is_empty() => BotReply::new(
            ReplyKind::Prompt,
            "There is no similar ticket to link to. Say \"proceed\" to create a new one.",
        ),
        PromptKind::UnknownCandidate { reference } => BotReply::new(
            ReplyKind::Prompt,
            format!("{} isn't one of the tickets I listed.", reference),
        )
        .actions(&["link", "proceed", "cancel"]),
    }
}

fn priority_line(priority: Priority, sla: &Sla) -> String {
    format!(
        "Priority: {}, response within {}, resolution within {}",
        priority,
        sla.response_label(),
        sla.resolution_label()
    )
}

fn ticket_line(ticket: &TicketRecord) -> String {
    format!(
        "{} [{}] {} ({})",
        ticket.number, ticket.state, ticket.short_description, ticket.priority
    )
}

fn article_line(article: &KnowledgeArticle) -> String {
    format!("{} {}: {} ({})", article.id, article.title, article.summary, article.url)
}

fn candidate_lines(candidates: &[DuplicateCandidate]) -> Vec<String> {
    candidates
        .iter()
        .enumerate()
        .map(|(i, c)| {
            let factors: Vec<String> = c.score.factors.iter().map(|f| f.to_string()).collect();
            format!(
                "{}. {} {} (match {:.0}%, {}; {})",
                i + 1,
                c.ticket.number,
                c.ticket.short_description,
                c.score.score * 100.0,
                factors.join("+"),
                c.recommendation
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::FlowState;
    use chrono::Utc;
    use deskbot_core::session::Stage;
    use deskbot_core::ticket::{Category, TicketState};

    fn ticket() -> TicketRecord {
        TicketRecord {
            id: "t1".into(),
            number: "INC0010001".into(),
            short_description: "WiFi authentication fails".into(),
            description: "WiFi authentication fails".into(),
            state: TicketState::New,
            category: Category::Network,
            priority: Priority::LOW,
            created_at: Utc::now(),
            reporter_id: "alice".into(),
            resolution_notes: None,
        }
    }

    fn outcome(payload: TurnPayload) -> TurnOutcome {
        TurnOutcome {
            state: FlowState::TicketCreated,
            trace: vec![FlowState::TicketCreated],
            payload,
            stage: Stage::Completed,
        }
    }

    #[test]
    fn created_ticket_reply_carries_number_and_sla() {
        let reply = ResponseFormatter.format(&outcome(TurnPayload::TicketCreated {
            ticket: ticket(),
            sla: Priority::LOW.sla(),
            escalations: vec![],
            degraded: false,
            reused_existing: false,
        }));
        assert_eq!(reply.kind, ReplyKind::TicketCreated);
        assert_eq!(reply.ticket_number.as_deref(), Some("INC0010001"));
        assert!(reply.details.iter().any(|d| d.contains("24 business hours")));
        assert!(reply.notice.is_none());
    }

    #[test]
    fn degraded_creation_adds_notice() {
        let reply = ResponseFormatter.format(&outcome(TurnPayload::TicketCreated {
            ticket: ticket(),
            sla: Priority::LOW.sla(),
            escalations: vec!["urgency".into()],
            degraded: true,
            reused_existing: false,
        }));
        assert!(reply.notice.unwrap().contains("duplicate check"));
        assert!(reply.details.iter().any(|d| d.contains("urgency")));
    }

    #[test]
    fn failure_is_an_error_reply_with_retry_action() {
        let reply = ResponseFormatter.format(&outcome(TurnPayload::Failure {
            message: "The ticketing system is not responding right now.".into(),
            retryable: true,
        }));
        assert_eq!(reply.kind, ReplyKind::Error);
        assert_eq!(reply.actions, vec!["retry", "cancel"]);
    }

    #[test]
    fn reply_serializes_with_kind_tag() {
        let reply = ResponseFormatter.format(&outcome(TurnPayload::Prompt(PromptKind::Welcome)));
        let json = serde_json::to_value(&reply).unwrap();
        assert_eq!(json["kind"], "prompt");
        assert!(json.get("ticket_number").is_none());
    }

    #[test]
    fn articles_are_listed_after_tickets() {
        let article = KnowledgeArticle {
            id: "KB0002".into(),
            title: "VPN Connection Issues".into(),
            summary: "Troubleshooting guide".into(),
            url: "/kb/KB0002".into(),
            category: Some(Category::Network),
        };
        let reply = ResponseFormatter.format(&outcome(TurnPayload::SearchResults {
            tickets: vec![ticket()],
            articles: vec![article],
        }));
        assert_eq!(reply.details.len(), 2);
        assert!(reply.details[0].starts_with("INC0010001"));
        assert_eq!(reply.details[1], "KB0002 VPN Connection Issues: Troubleshooting guide (/kb/KB0002)");

        let empty = ResponseFormatter.format(&outcome(TurnPayload::SearchResults {
            tickets: vec![],
            articles: vec![],
        }));
        assert!(empty.headline.contains("tickets or articles"));
    }
}
