//! 应用层 - 命令（写操作）
//!
//! CQRS 命令侧：处理所有写操作

mod agent_commands;
mod chapter_commands;

pub mod handlers;

pub use agent_commands::*;
pub use chapter_commands::*;
pub use handlers::*;
