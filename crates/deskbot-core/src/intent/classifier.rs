//! Pluggable text-classification capability.
//!
//! Providers live in the interaction layer; core only knows this trait.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A closed-set classification request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationRequest {
    pub text: String,
    /// The answer must be one of these labels.
    pub labels: Vec<String>,
    /// Extra context such as the current session stage.
    #[serde(default)]
    pub context: BTreeMap<String, String>,
}

impl ClassificationRequest {
    pub fn new(text: impl Into<String>, labels: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            text: text.into(),
            labels: labels.into_iter().map(Into::into).collect(),
            context: BTreeMap::new(),
        }
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Returns the matching label, compared case-insensitively.
    pub fn resolve_label(&self, label: &str) -> Option<&str> {
        let wanted = label.trim();
        self.labels
            .iter()
            .find(|l| l.eq_ignore_ascii_case(wanted))
            .map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierVerdict {
    pub label: String,
    pub confidence: f64,
}

/// A text classifier backed by an external service.
#[async_trait]
pub trait TextClassifier: Send + Sync {
    /// Provider name for logs.
    fn name(&self) -> &str;

    /// Classifies `request.text` into one of `request.labels`.
    ///
    /// # Errors
    ///
    /// Transient errors for timeouts and rate limits; callers treat every
    /// error as "no answer".
    async fn classify(&self, request: &ClassificationRequest) -> Result<ClassifierVerdict>;
}
