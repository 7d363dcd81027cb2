//! Interactive chat REPL over `ChatService`.

use anyhow::Result;
use colored::{ColoredString, Colorize};
use deskbot_application::{ChatService, ReplyKind, ReplyRenderer, TicketOrchestrator};
use deskbot_core::config::RootConfig;
use deskbot_core::intent::IntentRouter;
use deskbot_core::rules::PriorityClassifier;
use deskbot_core::session::SessionRepository;
use deskbot_infrastructure::{
    InMemorySessionStore, InMemoryTicketStore, TomlSessionRepository, load_knowledge_base, load_rule_table,
};
use deskbot_interaction::build_classifier;
use rustyline::completion::{Completer, Pair};
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{Context, Editor, Helper};
use std::borrow::Cow::{self, Borrowed, Owned};
use std::sync::Arc;
use uuid::Uuid;

use super::rules::effective_rules_path;

const COMMANDS: &[&str] = &["/new", "/session", "/tickets", "/quit"];

/// Completion and hints for slash commands.
#[derive(Clone)]
struct ChatHelper;

impl Helper for ChatHelper {}

impl Completer for ChatHelper {
    type Candidate = Pair;

    fn complete(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> rustyline::Result<(usize, Vec<Pair>)> {
        let line = &line[..pos];
        if !line.starts_with('/') {
            return Ok((0, vec![]));
        }
        let candidates = COMMANDS
            .iter()
            .filter(|cmd| cmd.starts_with(line))
            .map(|cmd| Pair {
                display: cmd.to_string(),
                replacement: cmd.to_string(),
            })
            .collect();
        Ok((0, candidates))
    }
}

impl Highlighter for ChatHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        if line.starts_with('/') {
            Owned(line.bright_cyan().to_string())
        } else {
            Borrowed(line)
        }
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        true
    }
}

impl Hinter for ChatHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<String> {
        let line = &line[..pos];
        if !line.starts_with('/') || line.contains(' ') {
            return None;
        }
        COMMANDS
            .iter()
            .find(|cmd| cmd.starts_with(line) && cmd.len() > line.len())
            .map(|cmd| cmd[line.len()..].to_string())
    }
}

impl Validator for ChatHelper {}

fn headline_color(kind: ReplyKind, line: &str) -> ColoredString {
    match kind {
        ReplyKind::TicketCreated | ReplyKind::Linked => line.bright_green().bold(),
        ReplyKind::Duplicates => line.bright_yellow().bold(),
        ReplyKind::Error => line.red().bold(),
        ReplyKind::SearchResults | ReplyKind::Prompt => line.bright_blue(),
    }
}

pub async fn run(config: &RootConfig, reporter: Option<String>, session: Option<String>) -> Result<()> {
    // ===== Service wiring =====
    let table = load_rule_table(effective_rules_path(config).as_deref())?;
    let rules = Arc::new(PriorityClassifier::new(table)?);
    let classifier = build_classifier(&config.classifier, |key| std::env::var(key).ok())?;
    let knowledge = load_knowledge_base(config.knowledge.path.as_deref())?;

    let tickets = InMemoryTicketStore::new();
    let mut orchestrator = TicketOrchestrator::new(
        Arc::new(tickets.clone()),
        Arc::new(tickets.clone()),
        rules.clone(),
        config,
    )
    .with_knowledge_base(Arc::new(knowledge));
    if let Some(classifier) = &classifier {
        orchestrator = orchestrator.with_category_classifier(classifier.clone());
    }
    let router = IntentRouter::new(classifier, config.timeouts.classifier(), config.classifier.min_confidence);

    let ttl = chrono::Duration::minutes(config.session.ttl_minutes);
    let sessions: Arc<dyn SessionRepository> = match &config.session.dir {
        Some(dir) => Arc::new(TomlSessionRepository::new(dir, ttl)?),
        None => Arc::new(InMemorySessionStore::new(ttl)),
    };
    let chat = ChatService::new(router, orchestrator, sessions);
    let renderer = ReplyRenderer::new()?;

    let reporter = reporter
        .or_else(|| std::env::var("USER").ok())
        .unwrap_or_else(|| "cli-user".to_string());
    let mut session_id = session.unwrap_or_else(|| Uuid::new_v4().to_string());

    // ===== REPL =====
    let mut rl = Editor::new()?;
    rl.set_helper(Some(ChatHelper));

    println!("{}", "=== deskbot ===".bright_magenta().bold());
    println!(
        "{}",
        format!(
            "Reporter {} | rules v{} | describe an issue, or /new, /session, /tickets, /quit",
            reporter,
            rules.version()
        )
        .bright_black()
    );
    println!();

    loop {
        let readline = rl.readline(">> ");

        match readline {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(&line);

                match trimmed {
                    "/quit" | "quit" | "exit" => {
                        println!("{}", "Goodbye!".bright_green());
                        break;
                    }
                    "/new" => {
                        chat.end_session(&session_id).await?;
                        session_id = Uuid::new_v4().to_string();
                        println!("{}", format!("New session {}", session_id).bright_black());
                        continue;
                    }
                    "/session" => {
                        match chat.session(&session_id).await? {
                            Some(s) => println!(
                                "{}",
                                format!(
                                    "Session {} | stage {} | last ticket {}",
                                    s.id,
                                    s.stage,
                                    s.last_ticket_number.as_deref().unwrap_or("-")
                                )
                                .bright_black()
                            ),
                            None => println!("{}", format!("Session {} (not started)", session_id).bright_black()),
                        }
                        continue;
                    }
                    "/tickets" => {
                        let all = tickets.all().await;
                        if all.is_empty() {
                            println!("{}", "No tickets yet.".bright_black());
                        }
                        for t in all {
                            println!(
                                "  {} [{}] {} {} ({})",
                                t.number.bright_white(),
                                t.state,
                                t.priority,
                                t.short_description,
                                t.reporter_id
                            );
                        }
                        continue;
                    }
                    _ => {}
                }

                match chat.handle_message(&session_id, &reporter, trimmed).await {
                    Ok(turn) => {
                        let text = renderer.render(&turn.reply)?;
                        let mut lines = text.lines();
                        if let Some(headline) = lines.next() {
                            println!("{}", headline_color(turn.reply.kind, headline));
                        }
                        for line in lines {
                            println!("{}", line.bright_blue());
                        }
                        println!();
                    }
                    Err(e) => {
                        tracing::error!(session_id = %session_id, error = %e, "Turn failed");
                        eprintln!("{}", e.user_message().red());
                    }
                }
            }
            Err(rustyline::error::ReadlineError::Interrupted) => {
                println!("{}", "CTRL-C detected. Type /quit to exit.".yellow());
            }
            Err(rustyline::error::ReadlineError::Eof) => {
                println!("{}", "CTRL-D detected. Exiting...".bright_green());
                break;
            }
            Err(err) => {
                eprintln!("{}", format!("Error: {:?}", err).red());
                break;
            }
        }
    }

    Ok(())
}
