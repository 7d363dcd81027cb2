//! Root configuration model.
//!
//! Every section has serde defaults, so an empty or missing `config.toml`
//! yields a working configuration. `validate` is run once at startup; a
//! failure there is a fatal configuration error, never a per-request one.

use crate::error::{DeskbotError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RootConfig {
    #[serde(default)]
    pub detection: DetectionConfig,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub rules: RulesConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub knowledge: KnowledgeConfig,
}

impl RootConfig {
    /// Checks value ranges that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        self.detection.validate()?;
        if self.orchestrator.idempotency_bucket_minutes == 0 {
            return Err(DeskbotError::config(
                "orchestrator.idempotency_bucket_minutes must be at least 1",
            ));
        }
        if self.orchestrator.max_description_len == 0 {
            return Err(DeskbotError::config(
                "orchestrator.max_description_len must be at least 1",
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(DeskbotError::config("retry.max_attempts must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.classifier.min_confidence) {
            return Err(DeskbotError::config(
                "classifier.min_confidence must be within [0, 1]",
            ));
        }
        Ok(())
    }
}

/// Duplicate-detection tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Minimum score for a ticket to count as a duplicate candidate.
    pub threshold: f64,
    /// Maximum number of candidates surfaced to the user.
    pub max_candidates: usize,
    /// Tickets older than this get the lowest recency factor.
    pub recency_window_days: i64,
    /// How far back the store is queried.
    pub lookback_days: i64,
    pub weights: ScoreWeights,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            threshold: 0.70,
            max_candidates: 3,
            recency_window_days: 30,
            lookback_days: 90,
            weights: ScoreWeights::default(),
        }
    }
}

impl DetectionConfig {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(DeskbotError::config("detection.threshold must be within [0, 1]"));
        }
        if self.max_candidates == 0 {
            return Err(DeskbotError::config("detection.max_candidates must be at least 1"));
        }
        if self.recency_window_days <= 0 || self.lookback_days <= 0 {
            return Err(DeskbotError::config(
                "detection.recency_window_days and detection.lookback_days must be positive",
            ));
        }
        self.weights.validate()
    }
}

/// Weight of each similarity factor. All weights must be non-negative.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    pub text: f64,
    pub category: f64,
    pub priority: f64,
    pub reporter: f64,
    pub recency: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            text: 0.40,
            category: 0.20,
            priority: 0.15,
            reporter: 0.15,
            recency: 0.10,
        }
    }
}

impl ScoreWeights {
    pub fn validate(&self) -> Result<()> {
        let all = [self.text, self.category, self.priority, self.reporter, self.recency];
        if all.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(DeskbotError::config(
                "detection.weights must be finite and non-negative",
            ));
        }
        if all.iter().sum::<f64>() <= 0.0 {
            return Err(DeskbotError::config("detection.weights must not all be zero"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Width of the time bucket folded into the idempotency key.
    pub idempotency_bucket_minutes: i64,
    pub max_description_len: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            idempotency_bucket_minutes: 10,
            max_description_len: 4000,
        }
    }
}

/// Per-call timeouts for external collaborators, in milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    pub query_ms: u64,
    pub create_ms: u64,
    pub classifier_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            query_ms: 5_000,
            create_ms: 10_000,
            classifier_ms: 3_000,
        }
    }
}

impl TimeoutConfig {
    pub fn query(&self) -> Duration {
        Duration::from_millis(self.query_ms)
    }

    pub fn create(&self) -> Duration {
        Duration::from_millis(self.create_ms)
    }

    pub fn classifier(&self) -> Duration {
        Duration::from_millis(self.classifier_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts including the first call.
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 200,
            max_delay_ms: 2_000,
        }
    }
}

/// Which text-classification provider backs the intent router.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ClassifierBackend {
    /// Rules only.
    #[default]
    None,
    OpenAi,
    Gemini,
    Claude,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub backend: ClassifierBackend,
    /// Model override; each provider has its own default.
    pub model: Option<String>,
    /// Name of the environment variable holding the API key.
    pub api_key_env: Option<String>,
    /// Classifier answers below this confidence are treated as unknown.
    pub min_confidence: f64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            backend: ClassifierBackend::None,
            model: None,
            api_key_env: None,
            min_confidence: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RulesConfig {
    /// Rule table replacing the built-in one.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KnowledgeConfig {
    /// Article file replacing the built-in articles.
    pub path: Option<PathBuf>,
    /// Articles shown per search turn; 0 turns article search off.
    pub max_results: usize,
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            path: None,
            max_results: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Sessions idle longer than this are evicted by the store.
    pub ttl_minutes: i64,
    /// Directory for the file-backed session store; in-memory when unset.
    pub dir: Option<PathBuf>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_minutes: 30,
            dir: None,
        }
    }
}
