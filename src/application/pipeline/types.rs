//! 流水线输入 / 输出类型

use std::time::Instant;

use super::PipelineError;
use crate::domain::agent::AnalysisResult;
use crate::domain::{ChapterStatus, Stage};

/// 章节输入：以空行分段的原文与章节序号
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterInput {
    pub chapter_number: u32,
    pub text: String,
    pub title: Option<String>,
}

impl ChapterInput {
    pub fn new(chapter_number: u32, text: impl Into<String>) -> Self {
        Self {
            chapter_number,
            text: text.into(),
            title: None,
        }
    }
}

/// 单个阶段的执行报告
#[derive(Debug, Clone, PartialEq)]
pub struct StageReport<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<PipelineError>,
    pub tokens_used: u64,
    pub duration_ms: u64,
    /// 阶段被配置关闭，没有执行
    pub skipped: bool,
}

impl<T> StageReport<T> {
    pub fn succeeded(data: T, tokens_used: u64, started: Instant) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            tokens_used,
            duration_ms: elapsed_ms(started),
            skipped: false,
        }
    }

    pub fn failed(error: PipelineError, tokens_used: u64, started: Instant) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error),
            tokens_used,
            duration_ms: elapsed_ms(started),
            skipped: false,
        }
    }

    pub fn skipped() -> Self {
        Self {
            success: false,
            data: None,
            error: None,
            tokens_used: 0,
            duration_ms: 0,
            skipped: true,
        }
    }

    pub fn error_message(&self) -> Option<String> {
        self.error.as_ref().map(ToString::to_string)
    }
}

pub(crate) fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// 原文段落与译文段落的对应关系
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParagraphAlignment {
    pub marker: String,
    pub source: String,
    pub translated: String,
}

/// 章节处理结果
#[derive(Debug, Clone, PartialEq)]
pub struct ChapterOutcome {
    pub chapter_number: u32,
    pub final_translation: String,
    /// 最终译文来自哪个阶段（Edit 或 Translate）
    pub final_stage: Stage,
    /// 分析
    pub stage1: StageReport<AnalysisResult>,
    /// 翻译
    pub stage2: StageReport<String>,
    /// 润色
    pub stage3: StageReport<String>,
    pub total_tokens: u64,
    pub total_duration_ms: u64,
    /// 段落标记全部回传时才有；对应翻译阶段的输出
    pub alignment: Option<Vec<ParagraphAlignment>>,
    pub status_trail: Vec<ChapterStatus>,
}

impl ChapterOutcome {
    /// 返回的 outcome 都代表成功完成的章节
    pub fn success(&self) -> bool {
        self.status_trail.last() == Some(&ChapterStatus::Completed)
    }
}

/// 流水线选项（模型相关；翻译行为由 Agent 的 TranslationConfig 决定）
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOptions {
    /// 每次调用的输出 token 上限
    pub max_output_tokens: Option<u32>,
    /// 只把在当前文本中出现的术语放进提示词
    pub filter_glossary: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            max_output_tokens: Some(4096),
            filter_glossary: true,
        }
    }
}
