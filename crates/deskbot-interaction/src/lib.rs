//! Text-classification providers over HTTP.
//!
//! Each provider implements [`TextClassifier`]; [`build_classifier`] picks
//! one from `[classifier]` in the configuration.

pub mod claude_classifier;
pub mod gemini_classifier;
mod http;
pub mod openai_classifier;
mod prompt;

pub use claude_classifier::ClaudeClassifier;
pub use gemini_classifier::GeminiClassifier;
pub use openai_classifier::OpenAiClassifier;

use deskbot_core::config::{ClassifierBackend, ClassifierConfig};
use deskbot_core::error::{DeskbotError, Result};
use deskbot_core::intent::TextClassifier;
use std::sync::Arc;

/// Environment variable read when `api_key_env` is not configured.
pub fn default_api_key_env(backend: ClassifierBackend) -> Option<&'static str> {
    match backend {
        ClassifierBackend::None => None,
        ClassifierBackend::OpenAi => Some("OPENAI_API_KEY"),
        ClassifierBackend::Gemini => Some("GEMINI_API_KEY"),
        ClassifierBackend::Claude => Some("ANTHROPIC_API_KEY"),
    }
}

/// Builds the configured classifier.
///
/// `lookup_env` resolves environment variables; pass `|k| std::env::var(k).ok()`.
///
/// # Returns
///
/// - `Ok(None)`: no backend configured
/// - `Ok(Some(_))`: a ready provider
/// - `Err(FatalConfiguration)`: a backend is selected but its key is missing
pub fn build_classifier<F>(config: &ClassifierConfig, lookup_env: F) -> Result<Option<Arc<dyn TextClassifier>>>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(default_env) = default_api_key_env(config.backend) else {
        return Ok(None);
    };
    let env_name = config.api_key_env.as_deref().unwrap_or(default_env);
    let api_key = lookup_env(env_name)
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
        .ok_or_else(|| {
            DeskbotError::config(format!(
                "classifier backend {:?} selected but environment variable {} is not set",
                config.backend, env_name
            ))
        })?;

    let classifier: Arc<dyn TextClassifier> = match config.backend {
        ClassifierBackend::OpenAi => Arc::new(OpenAiClassifier::new(
            api_key,
            config.model.as_deref().unwrap_or(openai_classifier::DEFAULT_OPENAI_MODEL),
        )),
        ClassifierBackend::Gemini => Arc::new(GeminiClassifier::new(
            api_key,
            config.model.as_deref().unwrap_or(gemini_classifier::DEFAULT_GEMINI_MODEL),
        )),
        ClassifierBackend::Claude => Arc::new(ClaudeClassifier::new(
            api_key,
            config.model.as_deref().unwrap_or(claude_classifier::DEFAULT_CLAUDE_MODEL),
        )),
        ClassifierBackend::None => return Ok(None),
    };

    tracing::info!(provider = classifier.name(), "Text classifier enabled");
    Ok(Some(classifier))
}
