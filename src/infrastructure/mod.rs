//! Infrastructure Layer - 基础设施层
//!
//! 提供所有端口的具体实现

pub mod adapters;
pub mod events;
pub mod memory;
pub mod persistence;

pub use adapters::llm::{create_language_model, LlmClientConfig, LlmProvider};
pub use events::EventPublisher;
pub use memory::{InMemoryAgentStore, InMemoryChapterStatusTracker};
pub use persistence::{JsonFileAgentStore, JsonFileChapterStatusTracker};
