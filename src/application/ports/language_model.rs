//! Language Model Port - 大语言模型抽象
//!
//! 定义模型调用的抽象接口，具体实现在 infrastructure/adapters/llm 层

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::chunker::estimate_tokens;

/// 模型调用错误
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    /// 缺少或无效的凭据、模型名等，不可重试
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Service error ({status}): {message}")]
    Service { status: u16, message: String },

    /// 响应无法解码为期望的结构
    #[error("Parse error: {message}")]
    Parse {
        message: String,
        raw: String,
        usage: TokenUsage,
    },
}

impl ProviderError {
    /// 只有传输类错误可以重试
    pub fn is_retryable(&self) -> bool {
        match self {
            ProviderError::Transport(_) | ProviderError::Timeout | ProviderError::RateLimited(_) => {
                true
            }
            ProviderError::Service { status, .. } => *status >= 500,
            ProviderError::Configuration(_) | ProviderError::Parse { .. } => false,
        }
    }
}

/// 消息角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// 单次调用选项
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompletionOptions {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub stop: Vec<String>,
    /// 要求模型只输出 JSON 对象
    pub json_mode: bool,
}

/// Token 用量
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl TokenUsage {
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }

    pub fn add(&mut self, other: &TokenUsage) {
        self.prompt_tokens += other.prompt_tokens;
        self.completion_tokens += other.completion_tokens;
        self.total_tokens += other.total_tokens;
    }
}

/// 文本补全结果
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub text: String,
    pub usage: TokenUsage,
    pub model: String,
}

/// 结构化补全结果
#[derive(Debug, Clone)]
pub struct Structured<T> {
    pub value: T,
    pub usage: TokenUsage,
    pub raw: String,
}

/// Language Model Port
///
/// 后端可以互换（OpenAI 兼容、Anthropic、脚本化测试替身）
#[async_trait]
pub trait LanguageModelPort: Send + Sync {
    /// 后端名称（用于日志）
    fn name(&self) -> &str;

    /// 执行一次对话补全
    async fn complete(
        &self,
        messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> Result<Completion, ProviderError>;

    /// 粗略估算 token 数，只用于分块与预算
    fn estimate_tokens(&self, text: &str) -> usize {
        estimate_tokens(text)
    }

    /// 检查服务是否可用
    async fn is_available(&self) -> bool {
        true // 默认实现
    }
}

/// 从模型回复中取出 JSON 部分
///
/// 兼容 ```json 代码块和前后夹杂说明文字的回复
pub fn extract_json(text: &str) -> Option<&str> {
    let mut body = text.trim();
    if let Some(rest) = body.strip_prefix("```") {
        let rest = rest.split_once('\n').map(|(_, r)| r).unwrap_or("");
        body = rest.trim_end().strip_suffix("```").unwrap_or(rest).trim();
    }

    let start = body.find(['{', '['])?;
    let open = body[start..].chars().next()?;
    let close = if open == '{' { '}' } else { ']' };
    let end = body.rfind(close)?;
    (end > start).then(|| &body[start..=end])
}

/// 结构化补全扩展
///
/// 对所有 LanguageModelPort 自动可用（包括 `dyn LanguageModelPort`）
#[async_trait]
pub trait LanguageModelExt: LanguageModelPort {
    /// 请求 JSON 输出并解码为 `T`
    ///
    /// 无法解码时返回 `ProviderError::Parse`，附带原始回复，不做任何替代
    async fn complete_structured<T>(
        &self,
        messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> Result<Structured<T>, ProviderError>
    where
        T: DeserializeOwned + Send + 'static;
}

#[async_trait]
impl<M> LanguageModelExt for M
where
    M: LanguageModelPort + ?Sized,
{
    async fn complete_structured<T>(
        &self,
        messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> Result<Structured<T>, ProviderError>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let mut options = options.clone();
        options.json_mode = true;
        let completion = self.complete(messages, &options).await?;

        let parse_error = |message: String| ProviderError::Parse {
            message,
            raw: completion.text.clone(),
            usage: completion.usage,
        };

        let json = extract_json(&completion.text)
            .ok_or_else(|| parse_error("no JSON object in response".to_string()))?;
        let value = serde_json::from_str::<T>(json).map_err(|e| parse_error(e.to_string()))?;

        Ok(Structured {
            value,
            usage: completion.usage,
            raw: completion.text,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_json_variants() {
        assert_eq!(extract_json(r#"{"a":1}"#), Some(r#"{"a":1}"#));
        assert_eq!(
            extract_json("```json\n{\"a\": [1, 2]}\n```"),
            Some("{\"a\": [1, 2]}")
        );
        assert_eq!(
            extract_json("Sure! Here it is: {\"a\":1} Hope this helps."),
            Some("{\"a\":1}")
        );
        assert_eq!(extract_json("[1,2]"), Some("[1,2]"));
        assert_eq!(extract_json("no json here"), None);
    }

    #[test]
    fn test_retryable_classification() {
        assert!(ProviderError::Timeout.is_retryable());
        assert!(ProviderError::Transport("reset".into()).is_retryable());
        assert!(ProviderError::Service { status: 503, message: String::new() }.is_retryable());
        assert!(!ProviderError::Service { status: 400, message: String::new() }.is_retryable());
        assert!(!ProviderError::Configuration("no key".into()).is_retryable());
    }

    #[test]
    fn test_usage_accumulates() {
        let mut usage = TokenUsage::new(10, 5);
        usage.add(&TokenUsage::new(1, 2));
        assert_eq!(usage, TokenUsage { prompt_tokens: 11, completion_tokens: 7, total_tokens: 18 });
    }
}
