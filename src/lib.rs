//! Novel Translator - 英译俄长篇小说翻译代理
//!
//! 架构设计: DDD + CQRS + Hexagonal Architecture
//!
//! 领域层 (domain/):
//! - Language: 俄语变格与音译
//! - Glossary: 人名/地名/术语表聚合
//! - Agent: 每部小说的长期记忆（术语表、风格、章节摘要）
//! - Chunker: 按 token 预算切分章节
//!
//! 应用层 (application/):
//! - Ports: LanguageModel, AgentStore, ChapterStatus, EventSink
//! - Pipeline: Analyze → Translate → Edit
//! - Commands / Queries: CQRS 处理器
//!
//! 基础设施层 (infrastructure/):
//! - Adapters: OpenAI 兼容 / Anthropic / 脚本化模型客户端
//! - Memory / Persistence: Agent 与章节状态存储
//! - Events: broadcast 事件发布

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::{load_config, AppConfig};
