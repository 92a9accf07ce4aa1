//! 流水线错误

use thiserror::Error;

use crate::application::ports::ProviderError;
use crate::domain::Stage;

/// 流水线错误
///
/// - Configuration: 凭据或模型配置问题，立即终止，不重试
/// - Transport: 网络 / 超时 / 服务端错误
/// - Parse: 结构化响应与期望结构不符
/// - Validation: 质量检查未通过（空译文、错误哨兵、没有任何调用记录）
/// - Stage: 某个阶段失败导致整章失败
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("{stage} stage failed: {message}")]
    Stage { stage: Stage, message: String },
}

impl PipelineError {
    pub fn stage(stage: Stage, error: &PipelineError) -> Self {
        match error {
            PipelineError::Configuration(_) => error.clone(),
            other => PipelineError::Stage {
                stage,
                message: other.to_string(),
            },
        }
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, PipelineError::Configuration(_))
    }
}

impl From<ProviderError> for PipelineError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Configuration(message) => PipelineError::Configuration(message),
            ProviderError::Parse { message, .. } => PipelineError::Parse(message),
            other => PipelineError::Transport(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_error_mapping() {
        assert!(PipelineError::from(ProviderError::Configuration("no key".into())).is_configuration());
        assert!(matches!(
            PipelineError::from(ProviderError::Timeout),
            PipelineError::Transport(_)
        ));
        let parse = ProviderError::Parse {
            message: "bad".into(),
            raw: "x".into(),
            usage: Default::default(),
        };
        assert_eq!(PipelineError::from(parse), PipelineError::Parse("bad".into()));
    }

    #[test]
    fn test_stage_wrapping_keeps_configuration() {
        let config = PipelineError::Configuration("no key".into());
        assert_eq!(PipelineError::stage(Stage::Translate, &config), config);

        let wrapped = PipelineError::stage(Stage::Translate, &PipelineError::Transport("down".into()));
        assert_eq!(
            wrapped.to_string(),
            "translate stage failed: Transport error: down"
        );
    }
}
