//! LLM provider abstraction and implementations.
//!
//! A [`LlmProvider`] speaks to exactly one model at exactly one endpoint;
//! it knows nothing about retries or fallback — that is the gateway's job
//! (see [`crate::gateway`]).

pub mod anthropic;
#[cfg(feature = "bedrock")]
pub mod bedrock;
pub mod openai;

use serde::{Deserialize, Serialize};

use crate::ProviderError;

/// A message in the conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Role: "system", "user", "assistant", or "tool".
    pub role: String,
    /// Message content.
    pub content: MessageContent,
}

/// Content of a message — either simple text or structured blocks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    /// Simple text content.
    Text(String),
    /// Structured content blocks (for tool results, etc.).
    Blocks(Vec<ContentBlock>),
}

/// A structured content block within a message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    /// Text content.
    Text {
        /// The text.
        text: String,
    },
    /// A tool use request from the assistant.
    ToolUse {
        /// Unique ID for this tool use.
        id: String,
        /// Tool name.
        name: String,
        /// Tool input parameters.
        input: serde_json::Value,
    },
    /// A tool result being sent back.
    ToolResult {
        /// The `tool_use` ID this result corresponds to.
        tool_use_id: String,
        /// The result content.
        content: String,
    },
}

/// Response from the LLM provider.
#[derive(Debug, Clone)]
pub struct LlmResponse {
    /// Content blocks in the response.
    pub content: Vec<ContentBlock>,
    /// Whether the model wants to use tools (vs. providing a final answer).
    pub stop_reason: StopReason,
}

impl LlmResponse {
    /// Concatenates every [`ContentBlock::Text`] block, in order.
    #[must_use]
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|b| {
                if let ContentBlock::Text { text } = b {
                    Some(text.as_str())
                } else {
                    None
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Why the model stopped generating.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// Model finished its response naturally.
    EndTurn,
    /// Model wants to call one or more tools.
    ToolUse,
    /// Maximum tokens reached.
    MaxTokens,
}

/// Trait for LLM providers. A provider is stateless beyond its
/// credentials/model id and is safe to share across callers.
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    /// Send a chat completion request with tool definitions.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] if the request fails. The gateway
    /// classifies the returned error as transient/fatal for retry
    /// purposes — a provider only reports what happened, not whether
    /// it's worth retrying.
    async fn chat(
        &self,
        system_prompt: &str,
        messages: &[Message],
        tools: &[serde_json::Value],
    ) -> Result<LlmResponse, ProviderError>;

    /// Human-readable provider name (`"anthropic"`, `"openai"`, `"bedrock"`),
    /// used in the `{provider, model, used_fallback}` metadata.
    fn name(&self) -> &str;

    /// The model id this provider instance talks to.
    fn model(&self) -> &str;
}

/// Creates an LLM provider based on environment variables.
///
/// Checks `AI_PROVIDER` (default: "anthropic") and uses the corresponding
/// API key env var (`ANTHROPIC_API_KEY` or `OPENAI_API_KEY`).
///
/// # Errors
///
/// Returns [`ProviderError::Config`] if the required API key is not set.
pub fn create_provider_from_env() -> Result<Box<dyn LlmProvider>, ProviderError> {
    let provider = std::env::var("AI_PROVIDER").unwrap_or_else(|_| "anthropic".to_string());
    build_provider(&provider, None, None)
}

/// Creates the gateway's fallback provider from `PAPERWRIGHT_FALLBACK_PROVIDER`
/// / `PAPERWRIGHT_FALLBACK_MODEL`, if configured.
///
/// # Errors
///
/// Returns [`ProviderError::Config`] if a fallback provider is named but
/// its credentials are missing.
pub fn create_fallback_provider_from_env() -> Result<Option<Box<dyn LlmProvider>>, ProviderError> {
    let Ok(provider) = std::env::var("PAPERWRIGHT_FALLBACK_PROVIDER") else {
        return Ok(None);
    };
    let model = std::env::var("PAPERWRIGHT_FALLBACK_MODEL").ok();
    build_provider(&provider, model, None).map(Some)
}

fn build_provider(
    provider: &str,
    model_override: Option<String>,
    region: Option<String>,
) -> Result<Box<dyn LlmProvider>, ProviderError> {
    match provider.to_lowercase().as_str() {
        "anthropic" | "claude" => {
            let api_key = std::env::var("ANTHROPIC_API_KEY").map_err(|_| ProviderError::Config {
                message: "ANTHROPIC_API_KEY environment variable not set".to_string(),
            })?;
            let model = model_override
                .or_else(|| std::env::var("AI_MODEL").ok())
                .unwrap_or_else(|| "claude-sonnet-4-20250514".to_string());
            Ok(Box::new(anthropic::AnthropicProvider::new(api_key, model)))
        }
        "openai" | "gpt" => {
            let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| ProviderError::Config {
                message: "OPENAI_API_KEY environment variable not set".to_string(),
            })?;
            let model = model_override
                .or_else(|| std::env::var("AI_MODEL").ok())
                .unwrap_or_else(|| "gpt-4o".to_string());
            Ok(Box::new(openai::OpenAiProvider::new(api_key, model)))
        }
        #[cfg(feature = "bedrock")]
        "bedrock" => {
            let model = model_override.or_else(|| std::env::var("AI_MODEL").ok()).ok_or_else(|| {
                ProviderError::Config {
                    message: "AI_MODEL must be set to a Bedrock model id".to_string(),
                }
            })?;
            Ok(Box::new(bedrock::BedrockProviderHandle::new(model, region)))
        }
        other => Err(ProviderError::Config {
            message: format!("Unknown LLM provider: {other}. Use 'anthropic', 'openai', or 'bedrock'."),
        }),
    }
}
