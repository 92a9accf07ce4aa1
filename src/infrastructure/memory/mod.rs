//! Memory Layer - In-Memory State Management
//!
//! 实现 AgentStore 和 ChapterStatus 端口的内存版本

mod agent_store;
mod chapter_status_tracker;

pub use agent_store::InMemoryAgentStore;
pub use chapter_status_tracker::InMemoryChapterStatusTracker;
