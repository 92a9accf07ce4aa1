//! Agent Context - 跨章节记忆
//!
//! 职责:
//! - 持有术语表、文风档案、叙事上下文与章节摘要
//! - 合并分析结果
//! - JSON 序列化 / 反序列化

mod aggregate;
mod analysis;
mod errors;
mod value_objects;

pub use aggregate::{
    AgentContext, CreateAgentParams, NovelAgent, NovelAgentState, CONTEXT_WINDOW, SCHEMA_VERSION,
};
pub use analysis::{AnalysisResult, ExtractedEntity, StyleNotes};
pub use errors::AgentError;
pub use value_objects::{
    ChapterSummary, CurrentContext, LanguagePair, NovelId, RetryPolicy, StyleProfile, Title,
    TranslationConfig, MAX_LAST_EVENTS,
};
