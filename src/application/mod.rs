//! 应用层 - 用例编排
//!
//! 包含：
//! - ports: 六边形架构端口定义（LanguageModel、AgentStore、ChapterStatus、EventSink）
//! - pipeline: Analyze → Translate → Edit 章节流水线
//! - commands: CQRS 命令及处理器
//! - queries: CQRS 查询及处理器
//! - error: 应用层错误定义

pub mod commands;
pub mod error;
pub mod pipeline;
pub mod ports;
pub mod queries;

// Re-exports
pub use commands::{
    ApplyGlossaryUpdate, ApplyGlossaryUpdateHandler, CreateNovelAgent, CreateNovelAgentHandler,
    CreateNovelAgentResponse, ResetChapterStatus, ResetChapterStatusHandler, TranslateChapter,
    TranslateChapterHandler, UpdateTranslationConfig, UpdateTranslationConfigHandler,
};

pub use error::ApplicationError;

pub use pipeline::{
    ChapterInput, ChapterOutcome, ParagraphAlignment, PipelineError, PipelineOptions, StageReport,
    TranslationPipeline,
};

pub use ports::{
    AgentStorePort, ChapterStatusPort, ChatMessage, Completion, CompletionOptions,
    LanguageModelExt, LanguageModelPort, PipelineEvent, PipelineEventSink, ProviderError, Role,
    StoreError, TokenUsage,
};

pub use queries::{
    GetChapterStatuses, GetChapterStatusesHandler, GetGlossary, GetGlossaryHandler,
    GlossaryResponse, ListNovelAgents, ListNovelAgentsHandler, NovelAgentSummary,
};
