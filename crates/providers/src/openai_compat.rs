//! OpenAI-compatible model backend.
//!
//! Works with OpenAI and any endpoint speaking `/chat/completions`:
//! OpenRouter, vLLM, Together AI, Fireworks AI, self-hosted gateways.
//!
//! - Bearer authentication
//! - Receipt photos as `image_url` data URLs
//! - Function calling for structured interpretation output

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

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// OpenAI-compatible chat completions backend implementing all three
/// capabilities.
pub struct OpenAiCompatModel {
    name: String,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    client: reqwest::Client,
}

impl OpenAiCompatModel {
    /// Create a new OpenAI-compatible backend.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
            temperature: 0.2,
            max_tokens: 4096,
            client,
        }
    }

    /// Create an OpenAI provider (convenience constructor).
    pub fn openai(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self::new("openai", DEFAULT_BASE_URL, api_key, model)
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// POST a chat completion body and map HTTP-level failures.
    async fn send(&self, body: serde_json::Value) -> Result<ChatResponse, ModelError> {
        let url = format!("{}/chat/completions", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
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
                "Invalid API key".into(),
            ));
        }
        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Chat completions API error");
            return Err(ModelError::ApiError {
                status_code: status,
                message: error_body,
            });
        }

        response.json().await.map_err(|e| ModelError::ApiError {
            status_code: 200,
            message: format!("Failed to parse chat completion response: {e}"),
        })
    }

    /// The assistant message of the first choice.
    fn first_message(response: ChatResponse) -> Option<ApiMessage> {
        response.choices.into_iter().next().map(|c| c.message)
    }
}

#[async_trait]
impl ReceiptExtractor for OpenAiCompatModel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn extract(
        &self,
        image: &ReceiptImage,
    ) -> std::result::Result<ReceiptData, ExtractionError> {
        let encoded = base64::engine::general_purpose::STANDARD.encode(&image.bytes);
        let data_url = format!("data:{};base64,{}", image.mime_type, encoded);

        let body = serde_json::json!({
            "model": self.model,
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
            "messages": [{
                "role": "user",
                "content": [
                    { "type": "image_url", "image_url": { "url": data_url } },
                    { "type": "text", "text": prompts::EXTRACT_PROMPT },
                ],
            }],
        });

        debug!(backend = %self.name, model = %self.model, bytes = image.bytes.len(), "Requesting receipt extraction");

        let response = self.send(body).await?;
        let text = Self::first_message(response)
            .and_then(|m| m.content)
            .unwrap_or_default();
        payload::parse_receipt(&text)
    }
}

#[async_trait]
impl CommandInterpreter for OpenAiCompatModel {
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
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
            "messages": [{
                "role": "user",
                "content": prompts::interpret_prompt(text, context),
            }],
            "tools": [{
                "type": "function",
                "function": {
                    "name": prompts::SPLIT_TOOL_NAME,
                    "description": prompts::SPLIT_TOOL_DESCRIPTION,
                    "parameters": prompts::split_tool_schema(),
                },
            }],
            "tool_choice": {
                "type": "function",
                "function": { "name": prompts::SPLIT_TOOL_NAME },
            },
        });

        debug!(backend = %self.name, model = %self.model, "Requesting command interpretation");

        let response = self.send(body).await?;
        let message = Self::first_message(response).ok_or_else(|| {
            InterpretationError::Unusable("chat completion had no choices".into())
        })?;

        let call = message
            .tool_calls
            .into_iter()
            .find(|tc| tc.function.name == prompts::SPLIT_TOOL_NAME)
            .ok_or_else(|| {
                InterpretationError::Unusable("model did not call the split function".into())
            })?;

        let input: serde_json::Value =
            serde_json::from_str(&call.function.arguments).map_err(|e| {
                InterpretationError::Unusable(format!("function arguments did not parse: {e}"))
            })?;
        payload::parse_interpretation(input)
    }
}

#[async_trait]
impl SplitAuditor for OpenAiCompatModel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn audit(&self, request: &AuditRequest) -> std::result::Result<String, AuditError> {
        let body = serde_json::json!({
            "model": self.model,
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
            "messages": [{
                "role": "user",
                "content": prompts::audit_prompt(request),
            }],
        });

        debug!(backend = %self.name, model = %self.model, "Requesting split audit");

        let response = self.send(body).await?;
        let report = Self::first_message(response)
            .and_then(|m| m.content)
            .unwrap_or_default();
        let report = report.trim();
        if report.is_empty() {
            return Err(AuditError::Empty);
        }
        Ok(report.to_string())
    }
}

// --- OpenAI-compatible API types ---

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ApiChoice>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiMessage,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    #[serde(default)]
    content: Option<String>,

    #[serde(default)]
    tool_calls: Vec<ApiToolCall>,
}

#[derive(Debug, Deserialize)]
struct ApiToolCall {
    function: ApiFunction,
}

#[derive(Debug, Deserialize)]
struct ApiFunction {
    name: String,
    arguments: String,
}
