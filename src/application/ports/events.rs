//! Event Sink Port - 流水线进度事件

use serde::{Deserialize, Serialize};

use crate::domain::{ChapterStatus, Stage};

/// 流水线事件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum PipelineEvent {
    /// 章节状态变更
    StatusChanged {
        novel_id: String,
        chapter: u32,
        status: ChapterStatus,
    },
    StageStarted {
        novel_id: String,
        chapter: u32,
        stage: Stage,
    },
    StageFinished {
        novel_id: String,
        chapter: u32,
        stage: Stage,
        success: bool,
        skipped: bool,
        tokens_used: u64,
        duration_ms: u64,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    ChapterCompleted {
        novel_id: String,
        chapter: u32,
        total_tokens: u64,
        duration_ms: u64,
        final_stage: Stage,
    },
    ChapterFailed {
        novel_id: String,
        chapter: u32,
        error: String,
    },
}

impl PipelineEvent {
    pub fn chapter(&self) -> u32 {
        match self {
            PipelineEvent::StatusChanged { chapter, .. }
            | PipelineEvent::StageStarted { chapter, .. }
            | PipelineEvent::StageFinished { chapter, .. }
            | PipelineEvent::ChapterCompleted { chapter, .. }
            | PipelineEvent::ChapterFailed { chapter, .. } => *chapter,
        }
    }
}

/// Event Sink Port
///
/// 发布不能阻塞流水线，也不能失败
pub trait PipelineEventSink: Send + Sync {
    fn publish(&self, event: PipelineEvent);
}
