//! Glossary Context - Entities
//!
//! 人物、地点、术语三类条目，以及新增/修改它们的输入结构

use serde::{Deserialize, Serialize};

use super::{EntityId, LocationType, TermCategory};
use crate::domain::language::{Case, CaseSet, Gender};

/// 人物
///
/// 不变量:
/// - original_name 是稳定键
/// - declensions 六格始终完整
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Character {
    pub id: EntityId,
    pub original_name: String,
    pub translated_name: String,
    pub declensions: CaseSet,
    pub gender: Gender,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub first_appearance: Option<u32>,
    #[serde(default)]
    pub is_main_character: bool,
}

impl Character {
    /// 名字或别名是否匹配（忽略大小写）
    pub fn answers_to(&self, name: &str) -> bool {
        let needle = name.trim().to_lowercase();
        self.original_name.to_lowercase() == needle
            || self.aliases.iter().any(|a| a.to_lowercase() == needle)
    }
}

/// 地点
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub id: EntityId,
    pub original_name: String,
    pub translated_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub location_type: LocationType,
}

/// 术语
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Term {
    pub id: EntityId,
    pub original_term: String,
    pub translated_term: String,
    #[serde(default)]
    pub category: TermCategory,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub context: Option<String>,
}

/// 新增人物
///
/// translated_name 为空时由名字映射自动生成
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewCharacter {
    pub original_name: String,
    #[serde(default)]
    pub translated_name: Option<String>,
    #[serde(default)]
    pub gender: Option<Gender>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub first_appearance: Option<u32>,
    #[serde(default)]
    pub is_main_character: bool,
}

impl NewCharacter {
    pub fn named(original_name: impl Into<String>) -> Self {
        Self {
            original_name: original_name.into(),
            ..Default::default()
        }
    }

    pub fn with_translation(mut self, translated_name: impl Into<String>) -> Self {
        self.translated_name = Some(translated_name.into());
        self
    }

    pub fn with_gender(mut self, gender: Gender) -> Self {
        self.gender = Some(gender);
        self
    }
}

/// 新增地点
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewLocation {
    pub original_name: String,
    #[serde(default)]
    pub translated_name: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub location_type: LocationType,
}

impl NewLocation {
    pub fn named(original_name: impl Into<String>) -> Self {
        Self {
            original_name: original_name.into(),
            ..Default::default()
        }
    }
}

/// 新增术语
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewTerm {
    pub original_term: String,
    #[serde(default)]
    pub translated_term: Option<String>,
    #[serde(default)]
    pub category: TermCategory,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub context: Option<String>,
}

impl NewTerm {
    pub fn named(original_term: impl Into<String>) -> Self {
        Self {
            original_term: original_term.into(),
            ..Default::default()
        }
    }
}

/// 单格覆盖（只改写给出的格）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CaseOverrides {
    #[serde(default)]
    pub genitive: Option<String>,
    #[serde(default)]
    pub dative: Option<String>,
    #[serde(default)]
    pub accusative: Option<String>,
    #[serde(default)]
    pub instrumental: Option<String>,
    #[serde(default)]
    pub prepositional: Option<String>,
}

impl CaseOverrides {
    pub fn is_empty(&self) -> bool {
        self.entries().next().is_none()
    }

    pub fn entries(&self) -> impl Iterator<Item = (Case, &str)> + '_ {
        [
            (Case::Genitive, &self.genitive),
            (Case::Dative, &self.dative),
            (Case::Accusative, &self.accusative),
            (Case::Instrumental, &self.instrumental),
            (Case::Prepositional, &self.prepositional),
        ]
        .into_iter()
        .filter_map(|(case, form)| {
            form.as_deref()
                .map(str::trim)
                .filter(|f| !f.is_empty())
                .map(|f| (case, f))
        })
    }
}

/// 人物修改
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CharacterPatch {
    #[serde(default)]
    pub translated_name: Option<String>,
    #[serde(default)]
    pub gender: Option<Gender>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub add_aliases: Vec<String>,
    #[serde(default)]
    pub is_main_character: Option<bool>,
    #[serde(default)]
    pub case_overrides: CaseOverrides,
}

/// 地点修改
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocationPatch {
    #[serde(default)]
    pub translated_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location_type: Option<LocationType>,
}

/// 术语修改
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TermPatch {
    #[serde(default)]
    pub translated_term: Option<String>,
    #[serde(default)]
    pub category: Option<TermCategory>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub context: Option<String>,
}

/// 按原名定位的修改
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedPatch<P> {
    pub original_name: String,
    pub patch: P,
}

/// 一批术语表变更（来自分析阶段或人工编辑）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GlossaryUpdate {
    #[serde(default)]
    pub new_characters: Vec<NewCharacter>,
    #[serde(default)]
    pub updated_characters: Vec<NamedPatch<CharacterPatch>>,
    #[serde(default)]
    pub new_locations: Vec<NewLocation>,
    #[serde(default)]
    pub updated_locations: Vec<NamedPatch<LocationPatch>>,
    #[serde(default)]
    pub new_terms: Vec<NewTerm>,
    #[serde(default)]
    pub updated_terms: Vec<NamedPatch<TermPatch>>,
}

impl GlossaryUpdate {
    pub fn is_empty(&self) -> bool {
        self.new_characters.is_empty()
            && self.updated_characters.is_empty()
            && self.new_locations.is_empty()
            && self.updated_locations.is_empty()
            && self.new_terms.is_empty()
            && self.updated_terms.is_empty()
    }
}

/// apply_update 的结果统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyReport {
    pub added: usize,
    pub updated: usize,
    pub skipped: usize,
}

impl ApplyReport {
    pub fn changed(&self) -> bool {
        self.added > 0 || self.updated > 0
    }
}
