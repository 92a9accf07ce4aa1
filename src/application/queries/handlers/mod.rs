//! Query Handlers 实现

mod agent_handlers;

pub use agent_handlers::*;
