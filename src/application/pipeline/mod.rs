//! Translation Pipeline - 章节翻译流水线
//!
//! 每章依次经过:
//! - Analyze（可关闭）: 抽取实体与叙事状态，更新术语表
//! - Translate: 分块翻译，按段落标记重组
//! - Edit（可关闭）: 整章润色
//!
//! 各阶段把自身错误收进 `StageReport`，由编排器按配置决定吸收还是终止。

mod analyze;
mod edit;
mod error;
mod orchestrator;
mod prompts;
mod quality;
mod retry;
mod translate;
mod types;

pub use error::PipelineError;
pub use orchestrator::TranslationPipeline;
pub use translate::strip_markers;
pub use types::{ChapterInput, ChapterOutcome, ParagraphAlignment, PipelineOptions, StageReport};
