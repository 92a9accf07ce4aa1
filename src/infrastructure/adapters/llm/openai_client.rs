//! OpenAI Compatible Client - 调用 `/chat/completions` 接口
//!
//! 适用于 OpenAI 以及兼容同一协议的本地服务（Ollama、vLLM 等）

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{map_send_error, map_status_error, LlmClientConfig};
use crate::application::ports::{
    ChatMessage, Completion, CompletionOptions, LanguageModelPort, ProviderError, TokenUsage,
};

pub const OPENAI_DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1";

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    stop: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    model: Option<String>,
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

/// OpenAI 兼容客户端
pub struct OpenAiCompatibleClient {
    client: Client,
    config: LlmClientConfig,
}

impl OpenAiCompatibleClient {
    /// 远程端点必须提供 API Key，本地端点可以省略
    pub fn new(config: LlmClientConfig) -> Result<Self, ProviderError> {
        if config.api_key.is_none() && !config.is_local() {
            return Err(ProviderError::Configuration(format!(
                "API key required for {}",
                config.endpoint
            )));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ProviderError::Configuration(e.to_string()))?;

        Ok(Self { client, config })
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.config.endpoint.trim_end_matches('/'))
    }

    fn models_url(&self) -> String {
        format!("{}/models", self.config.endpoint.trim_end_matches('/'))
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }
}

#[async_trait]
impl LanguageModelPort for OpenAiCompatibleClient {
    fn name(&self) -> &str {
        &self.config.model
    }

    async fn complete(
        &self,
        messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> Result<Completion, ProviderError> {
        let body = ChatCompletionRequest {
            model: &self.config.model,
            messages,
            temperature: options.temperature,
            max_tokens: options.max_tokens,
            stop: options.stop.clone(),
            response_format: options.json_mode.then_some(ResponseFormat {
                kind: "json_object",
            }),
        };

        tracing::debug!(
            url = %self.completions_url(),
            model = %self.config.model,
            messages = messages.len(),
            json_mode = options.json_mode,
            "Sending chat completion request"
        );

        let response = self
            .authorize(self.client.post(self.completions_url()))
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
        let parsed: ChatCompletionResponse =
            serde_json::from_str(&raw).map_err(|e| ProviderError::Parse {
                message: format!("invalid completion envelope: {}", e),
                raw: raw.clone(),
                usage: TokenUsage::default(),
            })?;

        let usage = parsed
            .usage
            .map(|u| TokenUsage::new(u.prompt_tokens, u.completion_tokens))
            .unwrap_or_default();
        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| ProviderError::Parse {
                message: "completion has no choices".to_string(),
                raw,
                usage,
            })?;

        tracing::debug!(tokens = usage.total_tokens, "Chat completion received");

        Ok(Completion {
            text,
            usage,
            model: parsed.model.unwrap_or_else(|| self.config.model.clone()),
        })
    }

    async fn is_available(&self) -> bool {
        match self
            .authorize(self.client.get(self.models_url()))
            .timeout(Duration::from_secs(5))
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_endpoint_requires_key() {
        let config = LlmClientConfig::new(OPENAI_DEFAULT_ENDPOINT, "gpt-4o-mini");
        assert!(matches!(
            OpenAiCompatibleClient::new(config),
            Err(ProviderError::Configuration(_))
        ));
    }

    #[test]
    fn test_local_endpoint_without_key() {
        let config = LlmClientConfig::new("http://localhost:11434/v1/", "llama3");
        let client = OpenAiCompatibleClient::new(config).unwrap();
        assert_eq!(client.completions_url(), "http://localhost:11434/v1/chat/completions");
        assert_eq!(client.name(), "llama3");
    }

    #[test]
    fn test_request_body_shape() {
        let messages = [ChatMessage::system("s"), ChatMessage::user("u")];
        let body = ChatCompletionRequest {
            model: "m",
            messages: &messages,
            temperature: Some(0.3),
            max_tokens: None,
            stop: Vec::new(),
            response_format: Some(ResponseFormat { kind: "json_object" }),
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["messages"][0]["role"], "system");
        assert_eq!(value["response_format"]["type"], "json_object");
        assert!(value.get("max_tokens").is_none());
        assert!(value.get("stop").is_none());
    }
}
