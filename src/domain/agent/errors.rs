//! Agent Context - Errors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("无效的标题: {0}")]
    InvalidTitle(String),

    #[error("无效的小说 ID: {0}")]
    InvalidId(String),

    #[error("状态序列化失败: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("不支持的状态版本: {found}（当前 {expected}）")]
    UnsupportedSchema { found: u32, expected: u32 },
}
