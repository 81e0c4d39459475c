//! The classify() collaborator — the single point of entry for LLM calls.
//!
//! ARCHITECTURAL RULE: no other module may call the model API directly.
//! Everything the pipeline knows about a capture's meaning comes through
//! [`Classifier::classify`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

use crate::enrichment::prompts::{classify_user_prompt, CLASSIFY_SYSTEM};
use crate::models::metadata::ClassifyResponse;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
/// Pinned: the same content must classify the same way on every machine.
pub const MODEL: &str = "claude-sonnet-4-5";
const MAX_TOKENS: u32 = 2048;
const MAX_RETRIES: u32 = 3;

#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Rate limited after {retries} retries")]
    RateLimited { retries: u32 },

    #[error("Classifier returned empty content")]
    EmptyContent,
}

/// The opaque enrichment collaborator: raw content plus the known folder
/// catalog in, a loose classification record out.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(
        &self,
        content: &str,
        folders: &[String],
    ) -> Result<ClassifyResponse, ClassifyError>;
}

/// The slice of a messages-API reply the gateway cares about: the first
/// text block. Tool-use and thinking blocks are skipped.
#[derive(Debug, Deserialize)]
struct MessagesReply {
    content: Vec<ReplyBlock>,
}

#[derive(Debug, Deserialize)]
struct ReplyBlock {
    #[serde(rename = "type")]
    kind: String,
    text: Option<String>,
}

impl MessagesReply {
    fn text(&self) -> Option<&str> {
        self.content
            .iter()
            .find(|block| block.kind == "text")
            .and_then(|block| block.text.as_deref())
    }
}

/// Production classifier backed by the Anthropic Messages API.
#[derive(Clone)]
pub struct LlmClassifier {
    client: Client,
    api_key: String,
}

impl LlmClassifier {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(120))
                .build()
                .expect("reqwest client"),
            api_key,
        }
    }
}

#[async_trait]
impl Classifier for LlmClassifier {
    /// One model call per classification. Transport failures, 429 and 5xx
    /// retry with doubling backoff; any other non-success status is final.
    async fn classify(
        &self,
        content: &str,
        folders: &[String],
    ) -> Result<ClassifyResponse, ClassifyError> {
        let body = serde_json::json!({
            "model": MODEL,
            "max_tokens": MAX_TOKENS,
            "system": CLASSIFY_SYSTEM,
            "messages": [{
                "role": "user",
                "content": classify_user_prompt(content, folders),
            }],
        });

        let mut backoff = Duration::from_secs(1);
        let mut last_transient: Option<ClassifyError> = None;

        for attempt in 1..=MAX_RETRIES {
            if attempt > 1 {
                warn!("classify attempt {attempt}/{MAX_RETRIES}, waiting {backoff:?}");
                tokio::time::sleep(backoff).await;
                backoff *= 2;
            }

            let sent = self
                .client
                .post(ANTHROPIC_API_URL)
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .json(&body)
                .send()
                .await;

            let response = match sent {
                Ok(response) => response,
                Err(e) => {
                    last_transient = Some(ClassifyError::Http(e));
                    continue;
                }
            };

            let status = response.status().as_u16();
            if status == 429 || (500..600).contains(&status) {
                last_transient = Some(ClassifyError::Api {
                    status,
                    message: response.text().await.unwrap_or_default(),
                });
                continue;
            }
            if !response.status().is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(ClassifyError::Api {
                    status,
                    message: api_error_message(&body),
                });
            }

            let reply: MessagesReply = response.json().await?;
            let text = reply.text().ok_or(ClassifyError::EmptyContent)?;
            return serde_json::from_str(strip_json_fences(text)).map_err(ClassifyError::Parse);
        }

        Err(last_transient.unwrap_or(ClassifyError::RateLimited {
            retries: MAX_RETRIES,
        }))
    }
}

/// Pulls `error.message` out of an API error body, falling back to the
/// raw body when it is not the documented shape.
fn api_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}

/// Models wrap JSON in markdown code fences often enough that both the
/// json-tagged and the bare fence form are tolerated around the payload.
fn strip_json_fences(text: &str) -> &str {
    let mut text = text.trim();
    for opener in ["```json", "```"] {
        if let Some(rest) = text.strip_prefix(opener) {
            text = rest.strip_suffix("```").unwrap_or(rest).trim();
            break;
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fence_stripping_variants() {
        assert_eq!(strip_json_fences("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(strip_json_fences("```\n{}\n```"), "{}");
        assert_eq!(strip_json_fences("  {\"a\": 1}  "), "{\"a\": 1}");
        // Unterminated fence still yields the payload.
        assert_eq!(strip_json_fences("```json\n{}"), "{}");
    }

    #[test]
    fn test_api_error_message_prefers_structured_body() {
        let body = r#"{"error":{"type":"invalid_request_error","message":"bad key"}}"#;
        assert_eq!(api_error_message(body), "bad key");
        assert_eq!(api_error_message("plain text"), "plain text");
    }

    #[test]
    fn test_reply_text_skips_non_text_blocks() {
        let reply: MessagesReply = serde_json::from_str(
            r#"{"content": [
                {"type": "tool_use", "text": null},
                {"type": "text", "text": "{}"}
            ]}"#,
        )
        .unwrap();
        assert_eq!(reply.text(), Some("{}"));
    }

    #[test]
    fn test_classify_response_tolerates_missing_fields() {
        let parsed: ClassifyResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.summary.is_none());
        assert!(parsed.tags.is_none());
    }
}
