//! Agent Store Port - Agent 状态持久化
//!
//! 具体实现在 infrastructure 层（内存 / JSON 文件）

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::agent::{NovelAgent, NovelId};

/// 存储错误
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Agent not found: {0}")]
    NotFound(String),

    #[error("Agent already exists: {0}")]
    Duplicate(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("IO error: {0}")]
    IoError(String),
}

/// Agent Store Port
#[async_trait]
pub trait AgentStorePort: Send + Sync {
    async fn load(&self, novel_id: &NovelId) -> Result<NovelAgent, StoreError>;

    /// 保存（覆盖）
    async fn save(&self, agent: &NovelAgent) -> Result<(), StoreError>;

    async fn exists(&self, novel_id: &NovelId) -> Result<bool, StoreError>;

    async fn delete(&self, novel_id: &NovelId) -> Result<(), StoreError>;

    async fn list(&self) -> Result<Vec<NovelId>, StoreError>;
}
