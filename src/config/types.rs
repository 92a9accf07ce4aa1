//! Configuration Types
//!
//! 定义所有配置结构体

use serde::Deserialize;
use std::path::PathBuf;

use crate::application::pipeline::PipelineOptions;
use crate::domain::agent::{RetryPolicy, TranslationConfig};
use crate::infrastructure::adapters::llm::{
    LlmClientConfig, LlmProvider, ANTHROPIC_DEFAULT_ENDPOINT, OPENAI_DEFAULT_ENDPOINT,
};

/// 应用主配置
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// 模型配置
    #[serde(default)]
    pub llm: LlmConfig,

    /// 新建 Agent 时使用的翻译配置
    #[serde(default)]
    pub pipeline: TranslationConfig,

    /// 存储配置
    #[serde(default)]
    pub storage: StorageConfig,

    /// 日志配置
    #[serde(default)]
    pub log: LogConfig,
}

impl AppConfig {
    /// 翻译配置，重试策略取自 llm 段
    pub fn translation_config(&self) -> TranslationConfig {
        TranslationConfig {
            retry: self.llm.retry_policy(),
            ..self.pipeline.clone()
        }
    }

    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            max_output_tokens: Some(self.llm.max_output_tokens),
            ..Default::default()
        }
    }
}

/// 模型配置
#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    /// openai | anthropic | scripted
    #[serde(default = "default_provider")]
    pub provider: String,

    /// 为空时使用后端的官方地址
    #[serde(default)]
    pub endpoint: Option<String>,

    #[serde(default = "default_model")]
    pub model: String,

    /// 为空时读取 OPENAI_API_KEY / ANTHROPIC_API_KEY
    #[serde(default)]
    pub api_key: Option<String>,

    /// 请求超时时间（秒）
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// 传输错误的最大重试次数
    #[serde(default)]
    pub max_retries: u32,

    #[serde(default = "default_retry_backoff")]
    pub retry_backoff_ms: u64,

    /// 每次调用的输出 token 上限
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
}

fn default_provider() -> String {
    "openai".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_timeout() -> u64 {
    120
}

fn default_retry_backoff() -> u64 {
    1000
}

fn default_max_output_tokens() -> u32 {
    4096
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            endpoint: None,
            model: default_model(),
            api_key: None,
            timeout_secs: default_timeout(),
            max_retries: 0,
            retry_backoff_ms: default_retry_backoff(),
            max_output_tokens: default_max_output_tokens(),
        }
    }
}

impl LlmConfig {
    pub fn provider(&self) -> Result<LlmProvider, crate::application::ports::ProviderError> {
        self.provider.parse()
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_retries + 1,
            backoff_ms: self.retry_backoff_ms,
        }
    }

    /// 配置中的 key 优先，其次是后端约定的环境变量
    pub fn resolved_api_key(&self) -> Option<String> {
        let from_env = match self.provider().ok()? {
            LlmProvider::OpenAi => std::env::var("OPENAI_API_KEY").ok(),
            LlmProvider::Anthropic => std::env::var("ANTHROPIC_API_KEY").ok(),
            LlmProvider::Scripted => None,
        };
        self.api_key
            .clone()
            .or(from_env)
            .filter(|key| !key.trim().is_empty())
    }

    pub fn resolved_endpoint(&self) -> String {
        match (&self.endpoint, self.provider()) {
            (Some(endpoint), _) => endpoint.clone(),
            (None, Ok(LlmProvider::Anthropic)) => ANTHROPIC_DEFAULT_ENDPOINT.to_string(),
            (None, _) => OPENAI_DEFAULT_ENDPOINT.to_string(),
        }
    }

    pub fn client_config(&self) -> LlmClientConfig {
        let config = LlmClientConfig::new(self.resolved_endpoint(), &self.model)
            .with_timeout(self.timeout_secs);
        match self.resolved_api_key() {
            Some(key) => config.with_api_key(key),
            None => config,
        }
    }
}

/// 存储配置
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Agent 状态与章节状态目录
    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,
}

fn default_state_dir() -> PathBuf {
    PathBuf::from("data/agents")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            state_dir: default_state_dir(),
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// 日志级别: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// 是否输出 JSON 格式
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}
