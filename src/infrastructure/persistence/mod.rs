//! Persistence Layer - 数据持久化
//!
//! Agent 状态与章节状态的 JSON 文件存储

mod json_agent_store;
mod json_status_tracker;

pub use json_agent_store::JsonFileAgentStore;
pub use json_status_tracker::JsonFileChapterStatusTracker;
