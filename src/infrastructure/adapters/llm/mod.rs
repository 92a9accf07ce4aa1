//! LLM Adapter - 语言模型客户端实现

mod anthropic_client;
mod openai_client;
mod scripted_client;

use std::str::FromStr;
use std::sync::Arc;

use crate::application::ports::{ChatMessage, LanguageModelPort, ProviderError};

pub use anthropic_client::{AnthropicClient, ANTHROPIC_DEFAULT_ENDPOINT};
pub use openai_client::{OpenAiCompatibleClient, OPENAI_DEFAULT_ENDPOINT};
pub use scripted_client::{RecordedRequest, ScriptedLanguageModel};

/// 模型后端
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProvider {
    OpenAi,
    Anthropic,
    /// 离线替身，回显原文
    Scripted,
}

impl FromStr for LlmProvider {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" | "openai-compatible" => Ok(Self::OpenAi),
            "anthropic" => Ok(Self::Anthropic),
            "scripted" => Ok(Self::Scripted),
            other => Err(ProviderError::Configuration(format!(
                "unknown llm provider: {}",
                other
            ))),
        }
    }
}

/// HTTP 客户端配置
#[derive(Debug, Clone)]
pub struct LlmClientConfig {
    pub endpoint: String,
    pub model: String,
    pub api_key: Option<String>,
    /// 请求超时时间（秒）
    pub timeout_secs: u64,
}

impl LlmClientConfig {
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            model: model.into(),
            api_key: None,
            timeout_secs: 120,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// 本地服务不需要凭据
    pub fn is_local(&self) -> bool {
        let host = self
            .endpoint
            .split("://")
            .nth(1)
            .unwrap_or(self.endpoint.as_str())
            .split(['/', ':'])
            .next()
            .unwrap_or_default();
        matches!(host, "localhost" | "127.0.0.1" | "0.0.0.0")
    }
}

/// 按后端创建模型客户端
pub fn create_language_model(
    provider: LlmProvider,
    config: LlmClientConfig,
) -> Result<Arc<dyn LanguageModelPort>, ProviderError> {
    tracing::info!(provider = ?provider, model = %config.model, "Creating language model client");
    let model: Arc<dyn LanguageModelPort> = match provider {
        LlmProvider::OpenAi => Arc::new(OpenAiCompatibleClient::new(config)?),
        LlmProvider::Anthropic => Arc::new(AnthropicClient::new(config)?),
        LlmProvider::Scripted => Arc::new(ScriptedLanguageModel::new().with_responder(echo)),
    };
    Ok(model)
}

/// 离线模式：回显待处理的文本（编辑请求只回显译文部分）
fn echo(messages: &[ChatMessage]) -> Result<String, ProviderError> {
    let content = messages.last().map(|m| m.content.as_str()).unwrap_or_default();
    let text = content
        .split_once("TRANSLATION:\n")
        .map(|(_, draft)| draft)
        .unwrap_or(content);
    Ok(text.to_string())
}

pub(crate) fn map_send_error(e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Timeout
    } else if e.is_connect() {
        ProviderError::Transport(format!("Cannot connect to model service: {}", e))
    } else {
        ProviderError::Transport(e.to_string())
    }
}

pub(crate) fn map_status_error(status: u16, body: String) -> ProviderError {
    match status {
        401 | 403 => ProviderError::Configuration(format!("HTTP {}: {}", status, body)),
        429 => ProviderError::RateLimited(body),
        _ => ProviderError::Service {
            status,
            message: body,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_parse() {
        assert_eq!("OpenAI".parse::<LlmProvider>().unwrap(), LlmProvider::OpenAi);
        assert_eq!(" anthropic ".parse::<LlmProvider>().unwrap(), LlmProvider::Anthropic);
        assert!("gemini".parse::<LlmProvider>().is_err());
    }

    #[test]
    fn test_echo_returns_draft_for_edit_requests() {
        let edit = [ChatMessage::user("ORIGINAL:\nHi.\n\nTRANSLATION:\nПривет.")];
        assert_eq!(echo(&edit).unwrap(), "Привет.");
        assert_eq!(echo(&[ChatMessage::user("Hi.")]).unwrap(), "Hi.");
    }

    #[test]
    fn test_is_local() {
        assert!(LlmClientConfig::new("http://localhost:11434/v1", "m").is_local());
        assert!(LlmClientConfig::new("http://127.0.0.1/v1", "m").is_local());
        assert!(!LlmClientConfig::new("https://api.openai.com/v1", "m").is_local());
    }

    #[test]
    fn test_status_mapping() {
        assert!(matches!(map_status_error(401, String::new()), ProviderError::Configuration(_)));
        assert!(matches!(map_status_error(429, String::new()), ProviderError::RateLimited(_)));
        let service = map_status_error(503, "busy".into());
        assert!(service.is_retryable());
        assert!(!map_status_error(400, String::new()).is_retryable());
    }
}
