use anyhow::Result;
use colored::Colorize;
use deskbot_core::config::RootConfig;
use deskbot_core::rules::PriorityClassifier;
use deskbot_infrastructure::{DeskbotPaths, load_rule_table};
use std::path::{Path, PathBuf};

/// The configured rule file, else `rules.toml` in the config dir if present.
pub fn effective_rules_path(config: &RootConfig) -> Option<PathBuf> {
    config
        .rules
        .path
        .clone()
        .or_else(|| DeskbotPaths::rules_file().ok().filter(|p| p.exists()))
}

pub fn show(config: &RootConfig) -> Result<()> {
    let path = effective_rules_path(config);
    let table = load_rule_table(path.as_deref())?;
    match &path {
        Some(path) => println!("{}", format!("# rules from {}", path.display()).bright_black()),
        None => println!("{}", "# built-in rules".bright_black()),
    }
    print!("{}", table.to_toml()?);
    Ok(())
}

pub fn check(file: &Path) -> Result<()> {
    let table = load_rule_table(Some(file))?;
    let classifier = PriorityClassifier::new(table)?;
    let table = classifier.table();
    println!(
        "{} {} (version {}, {} category rules, {} escalation classes)",
        "OK".green().bold(),
        file.display(),
        classifier.version(),
        table.categories.len(),
        table.escalations.len()
    );
    Ok(())
}
