//! Application Ports - 出站端口定义
//!
//! 定义应用层与基础设施层的抽象接口

mod agent_store;
mod chapter_status;
mod events;
mod language_model;

pub use agent_store::{AgentStorePort, StoreError};
pub use chapter_status::ChapterStatusPort;
pub use events::{PipelineEvent, PipelineEventSink};
pub use language_model::{
    extract_json, ChatMessage, Completion, CompletionOptions, LanguageModelExt,
    LanguageModelPort, ProviderError, Role, Structured, TokenUsage,
};
