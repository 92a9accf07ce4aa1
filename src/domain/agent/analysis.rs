//! 分析阶段的结果
//!
//! 由分析阶段生成，交给 `NovelAgent::apply_analysis_result` 合并。

use serde::{Deserialize, Serialize};

use crate::domain::glossary::GlossaryUpdate;

/// 抽取到的一个命名实体及其新旧判定
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedEntity {
    pub name: String,
    /// 术语表中没有同名（忽略大小写，含别名）条目
    pub is_new: bool,
}

/// 模型给出的文风观察，空值表示没有新信息
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleNotes {
    #[serde(default)]
    pub writing_style: Option<String>,
    #[serde(default)]
    pub tone: Option<String>,
    #[serde(default)]
    pub vocabulary_level: Option<String>,
    #[serde(default)]
    pub dialogue_style: Option<String>,
    #[serde(default)]
    pub narrative_voice: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub characters: Vec<ExtractedEntity>,
    pub locations: Vec<ExtractedEntity>,
    pub terms: Vec<ExtractedEntity>,
    /// 只包含真正的新条目
    pub glossary_update: GlossaryUpdate,
    pub chapter_title: Option<String>,
    pub summary: String,
    pub key_events: Vec<String>,
    pub active_characters: Vec<String>,
    pub current_location: Option<String>,
    pub mood: Option<String>,
    pub open_plot_threads: Vec<String>,
    pub style_notes: StyleNotes,
}

impl AnalysisResult {
    pub fn new_character_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.characters
            .iter()
            .filter(|c| c.is_new)
            .map(|c| c.name.as_str())
    }
}
