//! Anthropic native model backend.
//!
//! Uses Anthropic's Messages API directly (not an OpenAI-compatible proxy):
//! - `x-api-key` header authentication (not Bearer)
//! - `anthropic-version` header
//! - Receipt photos as base64 `image` content blocks
//! - Forced `tool_use` for structured interpretation output
//! - Plain text completion for the audit narrative

use async_trait::async_trait;
use base64::Engine as _;
use serde::Deserialize;
use tracing::{debug, warn};

use tabsplit_core::audit::{AuditRequest, SplitAuditor};
use tabsplit_core::error::{AuditError, ExtractionError, InterpretationError, ModelError};
use tabsplit_core::extract::{ReceiptExtractor, ReceiptImage};
use tabsplit_core::interpret::{CommandContext, CommandInterpreter, Interpretation};
use tabsplit_core::receipt::ReceiptData;

use crate::payload;
use crate::prompts;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";

/// Anthropic Messages API backend implementing all three capabilities.
pub struct AnthropicModel {
    name: String,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    client: reqwest::Client,
}

impl AnthropicModel {
    /// Create a new Anthropic backend.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            name: "anthropic".into(),
            base_url: DEFAULT_BASE_URL.into(),
            api_key: api_key.into(),
            model: model.into(),
            temperature: 0.2,
            max_tokens: 4096,
            client,
        }
    }

    /// Create with a custom base URL (e.g., for testing or proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// POST a Messages API body and map HTTP-level failures.
    async fn send(&self, body: serde_json::Value) -> Result<MessagesResponse, ModelError> {
        let url = format!("{}/v1/messages", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ModelError::Timeout(e.to_string())
                } else {
                    ModelError::Network(e.to_string())
                }
            })?;

        let status = response.status().as_u16();

        if status == 429 {
            return Err(ModelError::RateLimited {
                retry_after_secs: 5,
            });
        }
        if status == 401 || status == 403 {
            return Err(ModelError::AuthenticationFailed(
                "Invalid Anthropic API key".into(),
            ));
        }
        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Anthropic API error");
            return Err(ModelError::ApiError {
                status_code: status,
                message: error_body,
            });
        }

        response.json().await.map_err(|e| ModelError::ApiError {
            status_code: 200,
            message: format!("Failed to parse Anthropic response: {e}"),
        })
    }

    /// Concatenate all text blocks of a response.
    fn text_of(response: &MessagesResponse) -> String {
        let mut text = String::new();
        for block in &response.content {
            if let ContentBlock::Text { text: t } = block {
                if !text.is_empty() {
                    text.push('\n');
                }
                text.push_str(t);
            }
        }
        text
    }

    /// Find the input of the named tool call, if the model made one.
    fn tool_input(response: MessagesResponse, tool_name: &str) -> Option<serde_json::Value> {
        response.content.into_iter().find_map(|block| match block {
            ContentBlock::ToolUse { name, input } if name == tool_name => Some(input),
            _ => None,
        })
    }
}

#[async_trait]
impl ReceiptExtractor for AnthropicModel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn extract(
        &self,
        image: &ReceiptImage,
    ) -> std::result::Result<ReceiptData, ExtractionError> {
        let encoded = base64::engine::general_purpose::STANDARD.encode(&image.bytes);

        let body = serde_json::json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "temperature": self.temperature,
            "messages": [{
                "role": "user",
                "content": [
                    {
                        "type": "image",
                        "source": {
                            "type": "base64",
                            "media_type": image.mime_type,
                            "data": encoded,
                        },
                    },
                    { "type": "text", "text": prompts::EXTRACT_PROMPT },
                ],
            }],
        });

        debug!(backend = "anthropic", model = %self.model, bytes = image.bytes.len(), "Requesting receipt extraction");

        let response = self.send(body).await?;
        payload::parse_receipt(&Self::text_of(&response))
    }
}

#[async_trait]
impl CommandInterpreter for AnthropicModel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn interpret(
        &self,
        text: &str,
        context: &CommandContext,
    ) -> std::result::Result<Interpretation, InterpretationError> {
        let body = serde_json::json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "temperature": self.temperature,
            "messages": [{
                "role": "user",
                "content": prompts::interpret_prompt(text, context),
            }],
            "tools": [{
                "name": prompts::SPLIT_TOOL_NAME,
                "description": prompts::SPLIT_TOOL_DESCRIPTION,
                "input_schema": prompts::split_tool_schema(),
            }],
            "tool_choice": { "type": "tool", "name": prompts::SPLIT_TOOL_NAME },
        });

        debug!(backend = "anthropic", model = %self.model, "Requesting command interpretation");

        let response = self.send(body).await?;
        let input = Self::tool_input(response, prompts::SPLIT_TOOL_NAME).ok_or_else(|| {
            InterpretationError::Unusable("model did not call the split tool".into())
        })?;
        payload::parse_interpretation(input)
    }
}

#[async_trait]
impl SplitAuditor for AnthropicModel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn audit(&self, request: &AuditRequest) -> std::result::Result<String, AuditError> {
        let body = serde_json::json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "temperature": self.temperature,
            "messages": [{
                "role": "user",
                "content": prompts::audit_prompt(request),
            }],
        });

        debug!(backend = "anthropic", model = %self.model, "Requesting split audit");

        let response = self.send(body).await?;
        let report = Self::text_of(&response);
        let report = report.trim();
        if report.is_empty() {
            return Err(AuditError::Empty);
        }
        Ok(report.to_string())
    }
}

// --- Anthropic API types ---

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "tool_use")]
    ToolUse {
        name: String,
        input: serde_json::Value,
    },
    #[serde(other)]
    Other,
}
