//! Agent Commands

use crate::domain::agent::TranslationConfig;
use crate::domain::glossary::GlossaryUpdate;

/// 创建小说 Agent 命令
#[derive(Debug, Clone)]
pub struct CreateNovelAgent {
    /// 为空时生成随机 ID
    pub novel_id: Option<String>,
    pub title: String,
    pub config: Option<TranslationConfig>,
}

/// 人工修订术语表命令
#[derive(Debug, Clone)]
pub struct ApplyGlossaryUpdate {
    pub novel_id: String,
    pub update: GlossaryUpdate,
}

/// 替换翻译配置命令
#[derive(Debug, Clone)]
pub struct UpdateTranslationConfig {
    pub novel_id: String,
    pub config: TranslationConfig,
}
