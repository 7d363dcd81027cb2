use anyhow::Result;
use clap::{Parser, Subcommand};
use deskbot_infrastructure::ConfigService;
use std::path::PathBuf;

mod commands;
mod logging;

#[derive(Parser)]
#[command(name = "deskbot")]
#[command(about = "deskbot - duplicate-aware support ticket assistant", long_about = None)]
struct Cli {
    /// Path to config.toml (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive support conversation
    Chat {
        /// Reporter id used for tickets (defaults to $USER)
        #[arg(long)]
        reporter: Option<String>,
        /// Resume or name a session
        #[arg(long)]
        session: Option<String>,
    },
    /// Inspect or validate the priority rule table
    Rules {
        #[command(subcommand)]
        action: RulesAction,
    },
    /// Show configuration details
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum RulesAction {
    /// Print the effective rule table
    Show,
    /// Validate a rule-table file
    Check { file: PathBuf },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the resolved config file path
    Path,
    /// Print the effective configuration
    Show,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.log_json)?;

    let config_service = match cli.config {
        Some(path) => ConfigService::new(path),
        None => ConfigService::default_location()?,
    };

    match cli.command {
        Commands::Chat { reporter, session } => {
            let config = config_service.get_config()?;
            commands::chat::run(&config, reporter, session).await?
        }
        Commands::Rules { action } => match action {
            RulesAction::Show => {
                let config = config_service.get_config()?;
                commands::rules::show(&config)?
            }
            RulesAction::Check { file } => commands::rules::check(&file)?,
        },
        Commands::Config { action } => match action {
            ConfigAction::Path => commands::config::path(&config_service),
            ConfigAction::Show => commands::config::show(&config_service)?,
        },
    }

    Ok(())
}
