//! Prompt construction and answer parsing common to all providers.

use deskbot_core::error::{DeskbotError, Result};
use deskbot_core::intent::{ClassificationRequest, ClassifierVerdict};
use serde::Deserialize;

pub(crate) const SYSTEM_PROMPT: &str = "You classify messages sent to an IT help desk assistant. \
Answer with a single JSON object of the form {\"label\": \"<one of the allowed labels>\", \"confidence\": <number between 0 and 1>} and nothing else.";

/// The user-turn text sent to the model.
pub(crate) fn build_prompt(request: &ClassificationRequest) -> String {
    let mut prompt = format!("Allowed labels: {}\n", request.labels.join(", "));
    for (key, value) in &request.context {
        prompt.push_str(&format!("{key}: {value}\n"));
    }
    prompt.push_str("Message:\n");
    prompt.push_str(&request.text);
    prompt
}

#[derive(Deserialize)]
struct RawVerdict {
    label: String,
    #[serde(default)]
    confidence: Option<f64>,
}

/// Extracts the JSON verdict from a model answer.
///
/// Models sometimes wrap JSON in prose or code fences, so the outermost
/// braces are taken. A missing confidence counts as 0.
pub(crate) fn parse_verdict(provider: &str, answer: &str) -> Result<ClassifierVerdict> {
    let start = answer.find('{');
    let end = answer.rfind('}');
    let json = match (start, end) {
        (Some(start), Some(end)) if start < end => &answer[start..=end],
        _ => {
            return Err(DeskbotError::internal(format!(
                "{provider} answer contained no JSON object"
            )));
        }
    };
    let raw: RawVerdict = serde_json::from_str(json)?;
    Ok(ClassifierVerdict {
        label: raw.label.trim().to_string(),
        confidence: raw.confidence.unwrap_or(0.0),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_lists_labels_and_context() {
        let request = ClassificationRequest::new("vpn is down", ["search", "create_ticket"])
            .with_context("stage", "Start");
        let prompt = build_prompt(&request);
        assert!(prompt.contains("Allowed labels: search, create_ticket"));
        assert!(prompt.contains("stage: Start"));
        assert!(prompt.ends_with("vpn is down"));
    }

    #[test]
    fn verdict_is_found_inside_fences() {
        let answer = "Sure!\n```json\n{\"label\": \"create_ticket\", \"confidence\": 0.86}\n```";
        let verdict = parse_verdict("test", answer).unwrap();
        assert_eq!(verdict.label, "create_ticket");
        assert_eq!(verdict.confidence, 0.86);
    }

    #[test]
    fn missing_json_is_an_error() {
        assert!(parse_verdict("test", "I think it is a search").is_err());
    }

    #[test]
    fn missing_confidence_is_zero() {
        let verdict = parse_verdict("test", "{\"label\":\"search\"}").unwrap();
        assert_eq!(verdict.confidence, 0.0);
    }
}
