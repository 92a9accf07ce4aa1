//! Glossary Context - Errors

use thiserror::Error;

use super::EntityId;

#[derive(Debug, Error)]
pub enum GlossaryError {
    #[error("条目不存在: {0}")]
    NotFound(EntityId),

    #[error("无效的名称: {0}")]
    InvalidName(String),

    #[error("名称冲突: {name} 已属于 {owner}")]
    NameConflict { name: String, owner: String },
}
