//! Claude Messages API classifier.

use crate::http::{map_http_error, map_request_error, parse_retry_after};
use crate::prompt::{SYSTEM_PROMPT, build_prompt, parse_verdict};
use async_trait::async_trait;
use deskbot_core::error::{DeskbotError, Result};
use deskbot_core::intent::{ClassificationRequest, ClassifierVerdict, TextClassifier};
use reqwest::Client;
use serde::{Deserialize, Serialize};

pub const DEFAULT_CLAUDE_MODEL: &str = "claude-3-5-haiku-latest";
const BASE_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const PROVIDER: &str = "claude";

#[derive(Clone)]
pub struct ClaudeClassifier {
    client: Client,
    api_key: String,
    model: String,
    max_tokens: u32,
}

impl ClaudeClassifier {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            model: model.into(),
            max_tokens: 128,
        }
    }

    fn build_request(&self, request: &ClassificationRequest) -> CreateMessageRequest {
        CreateMessageRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            system: SYSTEM_PROMPT.to_string(),
            messages: vec![Message {
                role: "user",
                content: build_prompt(request),
            }],
        }
    }
}

#[async_trait]
impl TextClassifier for ClaudeClassifier {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn classify(&self, request: &ClassificationRequest) -> Result<ClassifierVerdict> {
        let body = self.build_request(request);
        let response = self
            .client
            .post(BASE_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|err| map_request_error(PROVIDER, err))?;

        if !response.status().is_success() {
            let status = response.status();
            let retry_after = parse_retry_after(response.headers().get("retry-after"));
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "failed to read error body".to_string());
            let message = serde_json::from_str::<ErrorResponse>(&body_text)
                .map(|wrapper| wrapper.error.message)
                .unwrap_or(body_text);
            return Err(map_http_error(PROVIDER, status, message, retry_after));
        }

        let parsed: CreateMessageResponse = response
            .json()
            .await
            .map_err(|err| map_request_error(PROVIDER, err))?;
        let answer = extract_text_response(parsed)?;
        parse_verdict(PROVIDER, &answer)
    }
}

#[derive(Serialize)]
struct CreateMessageRequest {
    model: String,
    max_tokens: u32,
    system: String,
    messages: Vec<Message>,
}

#[derive(Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct CreateMessageResponse {
    content: Vec<ContentBlockResponse>,
}

#[derive(Deserialize)]
#[serde(tag = "type")]
enum ContentBlockResponse {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(other)]
    Other,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

fn extract_text_response(response: CreateMessageResponse) -> Result<String> {
    response
        .content
        .into_iter()
        .find_map(|block| match block {
            ContentBlockResponse::Text { text } => Some(text),
            ContentBlockResponse::Other => None,
        })
        .ok_or_else(|| DeskbotError::internal("claude returned no text content"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_carries_system_prompt() {
        let classifier = ClaudeClassifier::new("key", DEFAULT_CLAUDE_MODEL);
        let request = ClassificationRequest::new("hello", ["smalltalk", "unknown"]);
        let body = serde_json::to_value(classifier.build_request(&request)).unwrap();
        assert_eq!(body["system"], SYSTEM_PROMPT);
        assert_eq!(body["max_tokens"], 128);
        assert_eq!(body["messages"][0]["role"], "user");
    }

    #[test]
    fn text_block_is_found_after_other_blocks() {
        let parsed: CreateMessageResponse = serde_json::from_str(
            r#"{"content":[{"type":"thinking"},{"type":"text","text":"{\"label\":\"smalltalk\",\"confidence\":0.7}"}]}"#,
        )
        .unwrap();
        let text = extract_text_response(parsed).unwrap();
        assert_eq!(parse_verdict(PROVIDER, &text).unwrap().label, "smalltalk");
    }
}
