//! 应用层 - 查询（读操作）
//!
//! CQRS 查询侧：处理所有读操作

mod agent_queries;

pub mod handlers;

pub use agent_queries::*;
pub use handlers::*;
