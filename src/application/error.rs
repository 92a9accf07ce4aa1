//! 应用层错误定义
//!
//! 统一的命令/查询错误类型

use thiserror::Error;

use crate::application::pipeline::PipelineError;
use crate::application::ports::StoreError;
use crate::domain::agent::AgentError;
use crate::domain::glossary::GlossaryError;

/// 应用层错误
#[derive(Debug, Error)]
pub enum ApplicationError {
    /// 资源未找到
    #[error("{resource_type} not found: {id}")]
    NotFound {
        resource_type: &'static str,
        id: String,
    },

    /// 验证错误
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// 业务规则违反
    #[error("Business rule violation: {0}")]
    BusinessRuleViolation(String),

    /// 状态无效
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// 存储错误
    #[error("Storage error: {0}")]
    StorageError(String),

    /// 流水线错误
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

impl ApplicationError {
    /// 创建 NotFound 错误
    pub fn not_found(resource_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            resource_type,
            id: id.into(),
        }
    }

    /// 创建验证错误
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError(message.into())
    }

    /// 创建业务规则违反错误
    pub fn business_rule(message: impl Into<String>) -> Self {
        Self::BusinessRuleViolation(message.into())
    }

    /// 创建状态无效错误
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState(message.into())
    }

    /// 模型配置问题（缺少凭据等）
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Pipeline(e) if e.is_configuration())
    }
}

impl From<StoreError> for ApplicationError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => Self::not_found("NovelAgent", id),
            StoreError::Duplicate(id) => {
                Self::business_rule(format!("novel agent already exists: {}", id))
            }
            other => Self::StorageError(other.to_string()),
        }
    }
}

impl From<AgentError> for ApplicationError {
    fn from(err: AgentError) -> Self {
        match err {
            AgentError::InvalidTitle(_) | AgentError::InvalidId(_) => {
                Self::ValidationError(err.to_string())
            }
            other => Self::StorageError(other.to_string()),
        }
    }
}

impl From<GlossaryError> for ApplicationError {
    fn from(err: GlossaryError) -> Self {
        Self::ValidationError(err.to_string())
    }
}
