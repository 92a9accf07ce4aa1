//! Domain Layer - 领域层
//!
//! 包含两个限界上下文:
//! - Glossary Context: 人物 / 地点 / 术语
//! - Agent Context: 一部小说的跨章节记忆
//!
//! 以及无状态的语言模块（变格、音译）、分块器和章节状态机。

pub mod agent;
pub mod chapter;
pub mod chunker;
pub mod glossary;
pub mod language;

pub use chapter::{ChapterStatus, Stage};
pub use chunker::{chunk_text, join_chunks, ChunkOptions, TextChunk};
