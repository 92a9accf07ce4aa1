//! Language - 目标语言专用模块
//!
//! - inflection: 六格变格引擎
//! - transliteration: 源语言名字到目标语言写法的映射

mod inflection;
mod transliteration;

pub use inflection::{decline, Case, CaseSet, DeclensionPattern, Gender};
pub use transliteration::{
    lookup_known, resolve_gender, translate_and_decline, transliterate, NameForms,
};
