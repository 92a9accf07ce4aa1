//! Agent Context - Aggregate Root

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{
    AgentError, AnalysisResult, ChapterSummary, CurrentContext, LanguagePair, NovelId,
    StyleProfile, Title, TranslationConfig,
};
use crate::domain::glossary::{ApplyReport, Glossary};

/// 持久化格式版本
pub const SCHEMA_VERSION: u32 = 1;

/// 上下文中暴露的最近章节摘要数
pub const CONTEXT_WINDOW: usize = 5;

/// 可序列化的 Agent 状态
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NovelAgentState {
    pub schema_version: u32,
    pub novel_id: NovelId,
    pub title: Title,
    #[serde(default)]
    pub languages: LanguagePair,
    #[serde(default)]
    pub glossary: Glossary,
    #[serde(default)]
    pub style_profile: StyleProfile,
    #[serde(default)]
    pub chapter_summaries: Vec<ChapterSummary>,
    #[serde(default)]
    pub current_context: CurrentContext,
    #[serde(default)]
    pub config: TranslationConfig,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 创建 Agent 的参数
#[derive(Debug, Clone, Default)]
pub struct CreateAgentParams {
    /// 为空时生成随机 ID
    pub novel_id: Option<String>,
    pub title: String,
    pub languages: Option<LanguagePair>,
    pub config: Option<TranslationConfig>,
}

/// 流水线读取的上下文快照
#[derive(Debug, Clone, PartialEq)]
pub struct AgentContext {
    pub glossary: Glossary,
    pub style_profile: StyleProfile,
    /// 最近 CONTEXT_WINDOW 章，按记录顺序
    pub previous_chapters: Vec<ChapterSummary>,
    pub current_context: CurrentContext,
}

/// NovelAgent 聚合根 - 一部小说的跨章节记忆
///
/// 不变量:
/// - 独占 Glossary / StyleProfile / CurrentContext
/// - 章节摘要只追加，同一章节号只保留最后一次
/// - 单写者：调用方按小说串行化访问
#[derive(Debug, Clone, PartialEq)]
pub struct NovelAgent {
    state: NovelAgentState,
}

impl NovelAgent {
    pub fn create(params: CreateAgentParams) -> Result<Self, AgentError> {
        let title = Title::new(params.title).map_err(|e| AgentError::InvalidTitle(e.to_string()))?;
        let novel_id = match params.novel_id {
            Some(id) => NovelId::parse(id).map_err(|e| AgentError::InvalidId(e.to_string()))?,
            None => NovelId::new(),
        };
        let now = Utc::now();

        Ok(Self {
            state: NovelAgentState {
                schema_version: SCHEMA_VERSION,
                novel_id,
                title,
                languages: params.languages.unwrap_or_default(),
                glossary: Glossary::new(),
                style_profile: StyleProfile::default(),
                chapter_summaries: Vec::new(),
                current_context: CurrentContext::default(),
                config: params.config.unwrap_or_default(),
                created_at: now,
                updated_at: now,
            },
        })
    }

    pub fn from_state(state: NovelAgentState) -> Result<Self, AgentError> {
        if state.schema_version != SCHEMA_VERSION {
            return Err(AgentError::UnsupportedSchema {
                found: state.schema_version,
                expected: SCHEMA_VERSION,
            });
        }
        Ok(Self { state })
    }

    // Getters
    pub fn state(&self) -> &NovelAgentState {
        &self.state
    }

    pub fn novel_id(&self) -> &NovelId {
        &self.state.novel_id
    }

    pub fn title(&self) -> &Title {
        &self.state.title
    }

    pub fn glossary(&self) -> &Glossary {
        &self.state.glossary
    }

    pub fn glossary_mut(&mut self) -> &mut Glossary {
        self.state.updated_at = Utc::now();
        &mut self.state.glossary
    }

    pub fn style_profile(&self) -> &StyleProfile {
        &self.state.style_profile
    }

    pub fn current_context(&self) -> &CurrentContext {
        &self.state.current_context
    }

    pub fn chapter_summaries(&self) -> &[ChapterSummary] {
        &self.state.chapter_summaries
    }

    pub fn chapter_count(&self) -> usize {
        self.state.chapter_summaries.len()
    }

    pub fn config(&self) -> &TranslationConfig {
        &self.state.config
    }

    pub fn set_config(&mut self, config: TranslationConfig) {
        self.state.config = config;
        self.state.updated_at = Utc::now();
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.state.updated_at
    }

    /// 最近的章节摘要（最多 CONTEXT_WINDOW 条）
    pub fn recent_chapters(&self) -> &[ChapterSummary] {
        let summaries = &self.state.chapter_summaries;
        &summaries[summaries.len().saturating_sub(CONTEXT_WINDOW)..]
    }

    pub fn context(&self) -> AgentContext {
        AgentContext {
            glossary: self.state.glossary.clone(),
            style_profile: self.state.style_profile.clone(),
            previous_chapters: self.recent_chapters().to_vec(),
            current_context: self.state.current_context.clone(),
        }
    }

    /// 合并分析结果
    ///
    /// - 术语表: apply_update
    /// - 当前上下文: 整体替换，事件最多保留 5 条
    /// - 文风: writing_style 追加，其余非空则替换
    pub fn apply_analysis_result(&mut self, result: &AnalysisResult) -> ApplyReport {
        let report = self.state.glossary.apply_update(&result.glossary_update);

        let mut context = CurrentContext {
            last_events: result.key_events.clone(),
            active_characters: result.active_characters.clone(),
            current_location: result.current_location.clone(),
            current_mood: result.mood.clone(),
            open_plot_threads: result.open_plot_threads.clone(),
        };
        context.cap_events();
        self.state.current_context = context;

        let notes = &result.style_notes;
        let style = &mut self.state.style_profile;
        if let Some(writing) = notes.writing_style.as_deref() {
            style.append_writing_style(writing);
        }
        for (target, value) in [
            (&mut style.tone, &notes.tone),
            (&mut style.vocabulary_level, &notes.vocabulary_level),
            (&mut style.dialogue_style, &notes.dialogue_style),
            (&mut style.narrative_voice, &notes.narrative_voice),
        ] {
            if let Some(value) = value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
                *target = value.to_string();
            }
        }

        self.state.updated_at = Utc::now();
        tracing::debug!(
            novel_id = %self.state.novel_id,
            added = report.added,
            updated = report.updated,
            glossary_version = self.state.glossary.version(),
            "Analysis result applied"
        );
        report
    }

    /// 记录一章的摘要
    ///
    /// 同一章节号重复记录（重置后重译）时替换旧条目并移到末尾
    pub fn record_chapter_translation(&mut self, summary: ChapterSummary) {
        self.state
            .chapter_summaries
            .retain(|s| s.chapter_number != summary.chapter_number);
        self.state.chapter_summaries.push(summary);
        self.state.updated_at = Utc::now();
    }

    pub fn to_json(&self) -> Result<String, AgentError> {
        Ok(serde_json::to_string_pretty(&self.state)?)
    }

    pub fn from_json(json: &str) -> Result<Self, AgentError> {
        let state: NovelAgentState = serde_json::from_str(json)?;
        Self::from_state(state)
    }
}
