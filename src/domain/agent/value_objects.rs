//! Agent Context - Value Objects

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::chunker::DEFAULT_MAX_TOKENS;

/// 当前上下文中保留的最近事件数
pub const MAX_LAST_EVENTS: usize = 5;

/// 小说唯一标识
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NovelId(String);

impl NovelId {
    /// 生成随机 ID
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// 使用调用方提供的 ID（去掉首尾空白，不能为空，只允许文件名安全字符）
    pub fn parse(id: impl Into<String>) -> Result<Self, &'static str> {
        let id = id.into().trim().to_string();
        if id.is_empty() {
            return Err("小说 ID 不能为空");
        }
        if !id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
            || id.starts_with('.')
        {
            return Err("小说 ID 只能包含字母、数字、'-'、'_' 和 '.'");
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for NovelId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for NovelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 小说标题
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Title(String);

impl Title {
    pub fn new(title: impl Into<String>) -> Result<Self, &'static str> {
        let title = title.into().trim().to_string();
        if title.is_empty() {
            return Err("标题不能为空");
        }
        if title.chars().count() > 200 {
            return Err("标题长度不能超过200字符");
        }
        Ok(Self(title))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Title {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 语言对
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguagePair {
    pub source: String,
    pub target: String,
}

impl Default for LanguagePair {
    fn default() -> Self {
        Self {
            source: "en".to_string(),
            target: "ru".to_string(),
        }
    }
}

/// 文风档案
///
/// writing_style 只追加不覆盖，其余各项在分析给出非空值时整体替换
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleProfile {
    #[serde(default)]
    pub writing_style: String,
    #[serde(default)]
    pub tone: String,
    #[serde(default)]
    pub vocabulary_level: String,
    #[serde(default)]
    pub dialogue_style: String,
    #[serde(default)]
    pub narrative_voice: String,
}

impl StyleProfile {
    /// 追加一条文风描述，重复的描述忽略
    pub fn append_writing_style(&mut self, note: &str) -> bool {
        let note = note.trim();
        if note.is_empty() || self.writing_style.lines().any(|line| line.trim() == note) {
            return false;
        }
        if !self.writing_style.is_empty() {
            self.writing_style.push('\n');
        }
        self.writing_style.push_str(note);
        true
    }

    pub fn is_empty(&self) -> bool {
        self.writing_style.is_empty()
            && self.tone.is_empty()
            && self.vocabulary_level.is_empty()
            && self.dialogue_style.is_empty()
            && self.narrative_voice.is_empty()
    }
}

/// 章节摘要
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterSummary {
    pub chapter_number: u32,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub key_events: Vec<String>,
    #[serde(default)]
    pub active_characters: Vec<String>,
    #[serde(default)]
    pub location: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

impl ChapterSummary {
    pub fn new(chapter_number: u32) -> Self {
        Self {
            chapter_number,
            title: None,
            summary: String::new(),
            key_events: Vec::new(),
            active_characters: Vec::new(),
            location: None,
            recorded_at: Utc::now(),
        }
    }
}

/// 叙事的当前状态，每次分析后整体替换
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentContext {
    #[serde(default)]
    pub last_events: Vec<String>,
    #[serde(default)]
    pub active_characters: Vec<String>,
    #[serde(default)]
    pub current_location: Option<String>,
    #[serde(default)]
    pub current_mood: Option<String>,
    #[serde(default)]
    pub open_plot_threads: Vec<String>,
}

impl CurrentContext {
    /// 只保留最后 MAX_LAST_EVENTS 条事件
    pub fn cap_events(&mut self) {
        if self.last_events.len() > MAX_LAST_EVENTS {
            let excess = self.last_events.len() - MAX_LAST_EVENTS;
            self.last_events.drain(..excess);
        }
    }
}

/// 模型调用重试策略（默认不重试）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// 总尝试次数，1 表示只调用一次
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// 第 n 次重试前等待 backoff_ms * n 毫秒
    #[serde(default)]
    pub backoff_ms: u64,
}

fn default_max_attempts() -> u32 {
    1
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_ms: 0,
        }
    }
}

/// 翻译配置（随 Agent 一起持久化）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslationConfig {
    pub enable_analysis: bool,
    pub enable_editing: bool,
    /// false 时分析失败导致整章失败
    pub skip_analysis_on_failure: bool,
    /// true 时润色失败导致整章失败
    pub fail_on_edit_error: bool,
    pub max_tokens_per_chunk: usize,
    pub preserve_paragraphs: bool,
    pub translate_temperature: f32,
    pub analysis_temperature: f32,
    pub edit_temperature: f32,
    pub max_concurrent_chunks: usize,
    pub retry: RetryPolicy,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            enable_analysis: true,
            enable_editing: true,
            skip_analysis_on_failure: true,
            fail_on_edit_error: false,
            max_tokens_per_chunk: DEFAULT_MAX_TOKENS,
            preserve_paragraphs: true,
            translate_temperature: 0.3,
            analysis_temperature: 0.2,
            edit_temperature: 0.4,
            max_concurrent_chunks: 1,
            retry: RetryPolicy::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_novel_id_validation() {
        assert_eq!(NovelId::parse(" my-novel_1 ").unwrap().as_str(), "my-novel_1");
        assert!(NovelId::parse("").is_err());
        assert!(NovelId::parse("../etc").is_err());
        assert!(NovelId::parse("a/b").is_err());
        assert!(NovelId::parse(NovelId::new().to_string()).is_ok());
    }

    #[test]
    fn test_title_validation() {
        assert!(Title::new("  ").is_err());
        assert!(Title::new("x".repeat(201)).is_err());
        assert_eq!(Title::new(" Dune ").unwrap().as_str(), "Dune");
    }

    #[test]
    fn test_writing_style_is_append_only() {
        let mut style = StyleProfile::default();
        assert!(style.append_writing_style("terse"));
        assert!(style.append_writing_style("ironic"));
        assert!(!style.append_writing_style("terse"));
        assert!(!style.append_writing_style("  "));
        assert_eq!(style.writing_style, "terse\nironic");
    }

    #[test]
    fn test_cap_events_keeps_latest() {
        let mut context = CurrentContext {
            last_events: (1..=7).map(|i| format!("e{}", i)).collect(),
            ..Default::default()
        };
        context.cap_events();
        assert_eq!(context.last_events, vec!["e3", "e4", "e5", "e6", "e7"]);
    }

    #[test]
    fn test_translation_config_partial_deserialize() {
        let config: TranslationConfig =
            serde_json::from_str(r#"{"enable_editing": false, "retry": {"max_attempts": 3}}"#)
                .unwrap();
        assert!(!config.enable_editing);
        assert!(config.enable_analysis);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.backoff_ms, 0);
        assert_eq!(config.max_tokens_per_chunk, DEFAULT_MAX_TOKENS);
    }
}
