//! Anthropic Client - 调用 Messages API

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{map_send_error, map_status_error, LlmClientConfig};
use crate::application::ports::{
    ChatMessage, Completion, CompletionOptions, LanguageModelPort, ProviderError, Role, TokenUsage,
};

pub const ANTHROPIC_DEFAULT_ENDPOINT: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 4096;

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<&'a ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    stop_sequences: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    model: Option<String>,
    content: Vec<ContentBlock>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}

/// 把 system 消息拆到顶层字段，其余消息原样保留
fn split_system(messages: &[ChatMessage]) -> (Option<String>, Vec<&ChatMessage>) {
    let system: Vec<&str> = messages
        .iter()
        .filter(|m| m.role == Role::System)
        .map(|m| m.content.as_str())
        .collect();
    let rest = messages.iter().filter(|m| m.role != Role::System).collect();
    let system = (!system.is_empty()).then(|| system.join("\n\n"));
    (system, rest)
}

/// Anthropic 客户端
pub struct AnthropicClient {
    client: Client,
    config: LlmClientConfig,
    api_key: String,
}

impl AnthropicClient {
    pub fn new(config: LlmClientConfig) -> Result<Self, ProviderError> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| ProviderError::Configuration("Anthropic API key required".to_string()))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ProviderError::Configuration(e.to_string()))?;

        Ok(Self {
            client,
            config,
            api_key,
        })
    }

    fn messages_url(&self) -> String {
        format!("{}/messages", self.config.endpoint.trim_end_matches('/'))
    }
}

#[async_trait]
impl LanguageModelPort for AnthropicClient {
    fn name(&self) -> &str {
        &self.config.model
    }

    async fn complete(
        &self,
        messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> Result<Completion, ProviderError> {
        // Messages API 没有 JSON 模式，依赖提示词约束输出
        let (system, rest) = split_system(messages);
        let body = MessagesRequest {
            model: &self.config.model,
            max_tokens: options.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            system,
            messages: rest,
            temperature: options.temperature,
            stop_sequences: options.stop.clone(),
        };

        tracing::debug!(
            url = %self.messages_url(),
            model = %self.config.model,
            messages = messages.len(),
            "Sending messages request"
        );

        let response = self
            .client
            .post(self.messages_url())
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(map_send_error)?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(map_status_error(status.as_u16(), error_text));
        }

        let raw = response
            .text()
            .await
            .map_err(|e| ProviderError::Transport(format!("Failed to read response: {}", e)))?;
        let parsed: MessagesResponse =
            serde_json::from_str(&raw).map_err(|e| ProviderError::Parse {
                message: format!("invalid messages envelope: {}", e),
                raw: raw.clone(),
                usage: TokenUsage::default(),
            })?;

        let usage = parsed
            .usage
            .map(|u| TokenUsage::new(u.input_tokens, u.output_tokens))
            .unwrap_or_default();
        let text: String = parsed
            .content
            .into_iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text)
            .collect();

        if text.is_empty() {
            return Err(ProviderError::Parse {
                message: "response has no text content".to_string(),
                raw,
                usage,
            });
        }

        tracing::debug!(tokens = usage.total_tokens, "Messages response received");

        Ok(Completion {
            text,
            usage,
            model: parsed.model.unwrap_or_else(|| self.config.model.clone()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_system() {
        let messages = [
            ChatMessage::system("a"),
            ChatMessage::user("q"),
            ChatMessage::system("b"),
        ];
        let (system, rest) = split_system(&messages);
        assert_eq!(system.as_deref(), Some("a\n\nb"));
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].role, Role::User);

        let (none, _) = split_system(&[ChatMessage::user("q")]);
        assert!(none.is_none());
    }

    #[test]
    fn test_requires_api_key() {
        let config = LlmClientConfig::new(ANTHROPIC_DEFAULT_ENDPOINT, "claude-3-5-haiku-latest");
        assert!(matches!(
            AnthropicClient::new(config),
            Err(ProviderError::Configuration(_))
        ));
    }
}
