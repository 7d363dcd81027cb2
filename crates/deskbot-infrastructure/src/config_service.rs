//! Loading `config.toml`, the rule table and the knowledge base.
//!
//! All are read once at startup. A missing config file means defaults; a
//! file that exists but does not parse or validate is fatal.

use crate::memory_knowledge_base::InMemoryKnowledgeBase;
use crate::paths::DeskbotPaths;
use crate::storage::AtomicTomlFile;
use deskbot_core::config::RootConfig;
use deskbot_core::error::{DeskbotError, Result};
use deskbot_core::rules::RuleTable;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

/// Loads and caches the root configuration.
#[derive(Debug, Clone)]
pub struct ConfigService {
    path: PathBuf,
    cached: Arc<RwLock<Option<RootConfig>>>,
}

impl ConfigService {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cached: Arc::new(RwLock::new(None)),
        }
    }

    /// Service for the platform default `config.toml`.
    pub fn default_location() -> Result<Self> {
        Ok(Self::new(DeskbotPaths::config_file()?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the configuration, reading the file on first access.
    ///
    /// # Errors
    ///
    /// `FatalConfiguration` when the file exists but is malformed or fails
    /// validation.
    pub fn get_config(&self) -> Result<RootConfig> {
        {
            let read = self
                .cached
                .read()
                .map_err(|_| DeskbotError::internal("config cache lock poisoned"))?;
            if let Some(cached) = read.as_ref() {
                return Ok(cached.clone());
            }
        }

        let loaded = load_config(&self.path)?;

        let mut write = self
            .cached
            .write()
            .map_err(|_| DeskbotError::internal("config cache lock poisoned"))?;
        *write = Some(loaded.clone());
        Ok(loaded)
    }

    /// Writes a configuration file, replacing any existing one.
    pub fn save_config(&self, config: &RootConfig) -> Result<()> {
        config.validate()?;
        AtomicTomlFile::new(self.path.clone()).save_locked(config)?;
        self.invalidate_cache();
        Ok(())
    }

    pub fn invalidate_cache(&self) {
        if let Ok(mut write) = self.cached.write() {
            *write = None;
        }
    }
}

/// Reads `path` into a validated `RootConfig`; defaults when absent.
pub fn load_config(path: &Path) -> Result<RootConfig> {
    let config = AtomicTomlFile::<RootConfig>::new(path.to_path_buf())
        .load()
        .map_err(|e| DeskbotError::config(format!("{}: {}", path.display(), e)))?;

    let config = match config {
        Some(config) => {
            tracing::info!(path = %path.display(), "Loaded configuration");
            config
        }
        None => {
            tracing::debug!(path = %path.display(), "No configuration file; using defaults");
            RootConfig::default()
        }
    };
    config.validate()?;
    Ok(config)
}

/// Loads the rule table named in the config, or the built-in one.
///
/// # Errors
///
/// `FatalConfiguration` when a configured file is missing or invalid.
pub fn load_rule_table(path: Option<&Path>) -> Result<RuleTable> {
    let Some(path) = path else {
        return Ok(RuleTable::builtin());
    };
    let content = fs::read_to_string(path)
        .map_err(|e| DeskbotError::config(format!("cannot read rule table {}: {}", path.display(), e)))?;
    let table = RuleTable::from_toml(&content)?;
    tracing::info!(path = %path.display(), version = %table.version, "Loaded rule table");
    Ok(table)
}

/// Loads the knowledge-base articles named in the config, or the built-in
/// ones.
///
/// # Errors
///
/// `FatalConfiguration` when a configured file is missing or invalid.
pub fn load_knowledge_base(path: Option<&Path>) -> Result<InMemoryKnowledgeBase> {
    let Some(path) = path else {
        return Ok(InMemoryKnowledgeBase::builtin());
    };
    let content = fs::read_to_string(path)
        .map_err(|e| DeskbotError::config(format!("cannot read knowledge base {}: {}", path.display(), e)))?;
    let kb = InMemoryKnowledgeBase::from_toml(&content)?;
    tracing::info!(path = %path.display(), articles = kb.len(), "Loaded knowledge base");
    Ok(kb)
}

#[cfg(test)]
mod tests {
    use super::*;
    use deskbot_core::config::ClassifierBackend;
    use tempfile::TempDir;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let service = ConfigService::new(dir.path().join("config.toml"));
        assert_eq!(service.get_config().unwrap(), RootConfig::default());
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "[detection]\nthreshold = 0.75\n\n[classifier]\nbackend = \"claude\"\n",
        )
        .unwrap();
        let config = ConfigService::new(&path).get_config().unwrap();
        assert_eq!(config.detection.threshold, 0.75);
        assert_eq!(config.classifier.backend, ClassifierBackend::Claude);
    }

    #[test]
    fn malformed_file_is_fatal() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[detection\nthreshold = ").unwrap();
        let err = load_config(&path).unwrap_err();
        assert!(matches!(err, DeskbotError::FatalConfiguration(_)));
    }

    #[test]
    fn invalid_value_is_fatal() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[retry]\nmax_attempts = 0\n").unwrap();
        assert!(matches!(
            load_config(&path),
            Err(DeskbotError::FatalConfiguration(_))
        ));
    }

    #[test]
    fn save_invalidates_cache() {
        let dir = TempDir::new().unwrap();
        let service = ConfigService::new(dir.path().join("config.toml"));
        let mut config = service.get_config().unwrap();
        config.detection.max_candidates = 5;
        service.save_config(&config).unwrap();
        assert_eq!(service.get_config().unwrap().detection.max_candidates, 5);
    }

    #[test]
    fn rule_table_defaults_to_builtin() {
        assert_eq!(load_rule_table(None).unwrap(), RuleTable::builtin());
    }

    #[test]
    fn missing_rule_table_file_is_fatal() {
        let dir = TempDir::new().unwrap();
        let err = load_rule_table(Some(&dir.path().join("rules.toml"))).unwrap_err();
        assert!(matches!(err, DeskbotError::FatalConfiguration(_)));
    }

    #[test]
    fn rule_table_file_is_loaded() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rules.toml");
        fs::write(&path, "version = \"1.4.2\"\n[baseline]\nPrinter = 3\n").unwrap();
        let table = load_rule_table(Some(&path)).unwrap();
        assert_eq!(table.version.to_string(), "1.4.2");
    }

    #[test]
    fn knowledge_base_file_replaces_builtin_articles() {
        let dir = TempDir::new().unwrap();
        assert!(!load_knowledge_base(None).unwrap().is_empty());
        assert!(load_knowledge_base(Some(&dir.path().join("kb.toml"))).is_err());

        let path = dir.path().join("kb.toml");
        fs::write(
            &path,
            "[[article]]\nid = \"KB0900\"\ntitle = \"Parking permits\"\nsummary = \"Requesting a permit\"\nurl = \"/kb/KB0900\"\n",
        )
        .unwrap();
        assert_eq!(load_knowledge_base(Some(&path)).unwrap().len(), 1);
    }
}
