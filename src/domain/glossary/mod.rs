//! Glossary Context - 术语表限界上下文
//!
//! 职责:
//! - 人物 / 地点 / 术语条目管理
//! - 名称同一性判定（原名 + 别名，忽略大小写）
//! - 版本号与提示词投影

mod aggregate;
mod entities;
mod errors;
mod projection;
mod value_objects;

pub use aggregate::Glossary;
pub use entities::{
    ApplyReport, CaseOverrides, Character, CharacterPatch, GlossaryUpdate, Location,
    LocationPatch, NamedPatch, NewCharacter, NewLocation, NewTerm, Term, TermPatch,
};
pub use errors::GlossaryError;
pub use value_objects::{EntityId, LocationType, TermCategory};
