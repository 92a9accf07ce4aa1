//! Configuration Loader
//!
//! 实现多源配置加载与合并逻辑
//!
//! 优先级（从高到低）：
//! 1. 环境变量
//! 2. 配置文件（translator.toml / translator.local.toml）
//! 3. 默认值

use config::{Config, ConfigError as ConfigCrateError, Environment, File};
use std::path::Path;
use thiserror::Error;

use super::types::{AppConfig, LlmConfig};
use crate::infrastructure::adapters::llm::LlmProvider;

/// 配置加载错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),

    /// 缺少凭据等，无法创建模型客户端
    #[error("Provider configuration error: {0}")]
    ProviderError(String),
}

impl From<ConfigCrateError> for ConfigError {
    fn from(err: ConfigCrateError) -> Self {
        ConfigError::LoadError(err.to_string())
    }
}

/// 配置文件搜索路径
const CONFIG_FILE_NAMES: &[&str] = &["translator", "translator.local"];

/// 环境变量前缀
const ENV_PREFIX: &str = "NOVEL_TRANSLATOR";

/// 加载应用配置
///
/// # 环境变量示例
/// - `NOVEL_TRANSLATOR_LLM__PROVIDER=anthropic`
/// - `NOVEL_TRANSLATOR_LLM__MODEL=claude-3-5-haiku-latest`
/// - `NOVEL_TRANSLATOR_PIPELINE__MAX_CONCURRENT_CHUNKS=4`
/// - `NOVEL_TRANSLATOR_STORAGE__STATE_DIR=/data/agents`
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from_path(None)
}

/// 从指定路径加载配置，None 时搜索默认文件名
pub fn load_config_from_path(config_path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut builder = Config::builder()
        .set_default("llm.provider", "openai")?
        .set_default("llm.model", "gpt-4o-mini")?
        .set_default("llm.timeout_secs", 120)?
        .set_default("llm.max_retries", 0)?
        .set_default("llm.retry_backoff_ms", 1000)?
        .set_default("storage.state_dir", "data/agents")?
        .set_default("log.level", "info")?
        .set_default("log.json", false)?;

    if let Some(path) = config_path {
        builder = builder.add_source(File::from(path).required(true));
    } else {
        for name in CONFIG_FILE_NAMES {
            builder = builder.add_source(File::with_name(name).required(false));
        }
    }

    // 例如: NOVEL_TRANSLATOR_LLM__API_KEY=sk-...
    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;

    let app_config: AppConfig = config.try_deserialize().map_err(|e| {
        ConfigError::ParseError(format!("Failed to deserialize config: {}", e))
    })?;

    validate_config(&app_config)?;

    Ok(app_config)
}

/// 验证配置有效性（不检查凭据）
pub fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    config
        .llm
        .provider()
        .map_err(|e| ConfigError::ValidationError(e.to_string()))?;

    if config.llm.model.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "LLM model cannot be empty".to_string(),
        ));
    }

    if config.pipeline.max_tokens_per_chunk == 0 {
        return Err(ConfigError::ValidationError(
            "pipeline.max_tokens_per_chunk cannot be 0".to_string(),
        ));
    }

    if config.pipeline.max_concurrent_chunks == 0 {
        return Err(ConfigError::ValidationError(
            "pipeline.max_concurrent_chunks cannot be 0".to_string(),
        ));
    }

    if config.storage.state_dir.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError(
            "storage.state_dir cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// 需要调用模型前检查凭据：远程后端必须有 API Key
pub fn validate_credentials(llm: &LlmConfig) -> Result<(), ConfigError> {
    let provider = llm
        .provider()
        .map_err(|e| ConfigError::ValidationError(e.to_string()))?;

    let needs_key = match provider {
        LlmProvider::Scripted => false,
        LlmProvider::Anthropic => true,
        LlmProvider::OpenAi => !llm.client_config().is_local(),
    };
    if needs_key && llm.resolved_api_key().is_none() {
        return Err(ConfigError::ProviderError(format!(
            "API key required for provider '{}' at {}",
            llm.provider,
            llm.resolved_endpoint()
        )));
    }
    Ok(())
}

/// 打印配置信息（用于启动时日志）
pub fn print_config(config: &AppConfig) {
    tracing::info!("=== Translator Configuration ===");
    tracing::info!("LLM Provider: {}", config.llm.provider);
    tracing::info!("LLM Endpoint: {}", config.llm.resolved_endpoint());
    tracing::info!("LLM Model: {}", config.llm.model);
    tracing::info!("LLM Timeout: {}s", config.llm.timeout_secs);
    tracing::info!("Max Retries: {}", config.llm.max_retries);
    tracing::info!("Chunk Budget: {} tokens", config.pipeline.max_tokens_per_chunk);
    tracing::info!("Concurrent Chunks: {}", config.pipeline.max_concurrent_chunks);
    tracing::info!("State Directory: {:?}", config.storage.state_dir);
    tracing::info!("Log Level: {}", config.log.level);
    tracing::info!("================================");
}
