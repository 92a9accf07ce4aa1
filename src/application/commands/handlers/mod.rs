//! Command Handlers 实现
//!
//! 所有 CommandHandler 的具体实现

mod agent_handlers;
mod chapter_handlers;

pub use agent_handlers::*;
pub use chapter_handlers::*;
