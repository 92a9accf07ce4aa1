//! 章节流水线: Analyze → Translate → Edit

use std::sync::Arc;
use std::time::Instant;

use super::types::elapsed_ms;
use super::{analyze, edit, quality, translate, prompts};
use super::{ChapterInput, ChapterOutcome, PipelineError, PipelineOptions, StageReport};
use crate::application::ports::{LanguageModelPort, PipelineEvent, PipelineEventSink};
use crate::domain::agent::{AnalysisResult, ChapterSummary, NovelAgent};
use crate::domain::{ChapterStatus, Stage};

/// 翻译流水线
///
/// 只在一次 `translate_chapter` 调用期间借用 Agent，不跨调用保留。
/// 同一部小说的并发调用由调用方串行化。
pub struct TranslationPipeline {
    model: Arc<dyn LanguageModelPort>,
    options: PipelineOptions,
    events: Option<Arc<dyn PipelineEventSink>>,
}

/// 一次章节调用的状态记录
struct Run<'a> {
    pipeline: &'a TranslationPipeline,
    novel_id: String,
    chapter: u32,
    trail: Vec<ChapterStatus>,
}

impl Run<'_> {
    fn enter(&mut self, status: ChapterStatus) {
        self.trail.push(status);
        tracing::debug!(novel_id = %self.novel_id, chapter = self.chapter, status = %status, "Chapter status changed");
        self.pipeline.publish(PipelineEvent::StatusChanged {
            novel_id: self.novel_id.clone(),
            chapter: self.chapter,
            status,
        });
    }

    fn stage_started(&mut self, stage: Stage) {
        self.enter(stage.status());
        self.pipeline.publish(PipelineEvent::StageStarted {
            novel_id: self.novel_id.clone(),
            chapter: self.chapter,
            stage,
        });
    }

    fn stage_finished<T>(&self, stage: Stage, report: &StageReport<T>) {
        tracing::info!(
            novel_id = %self.novel_id,
            chapter = self.chapter,
            stage = %stage,
            success = report.success,
            tokens = report.tokens_used,
            duration_ms = report.duration_ms,
            "Stage finished"
        );
        self.pipeline.publish(PipelineEvent::StageFinished {
            novel_id: self.novel_id.clone(),
            chapter: self.chapter,
            stage,
            success: report.success,
            skipped: report.skipped,
            tokens_used: report.tokens_used,
            duration_ms: report.duration_ms,
            error: report.error_message(),
        });
    }

    fn fail(mut self, error: PipelineError) -> PipelineError {
        self.enter(ChapterStatus::Failed);
        tracing::error!(novel_id = %self.novel_id, chapter = self.chapter, error = %error, "Chapter failed");
        self.pipeline.publish(PipelineEvent::ChapterFailed {
            novel_id: self.novel_id,
            chapter: self.chapter,
            error: error.to_string(),
        });
        error
    }
}

fn summary_for(input: &ChapterInput, analysis: Option<&AnalysisResult>) -> ChapterSummary {
    let mut summary = ChapterSummary::new(input.chapter_number);
    summary.title = input.title.clone();
    if let Some(analysis) = analysis {
        if summary.title.is_none() {
            summary.title = analysis.chapter_title.clone();
        }
        summary.summary = analysis.summary.clone();
        summary.key_events = analysis.key_events.clone();
        summary.active_characters = analysis.active_characters.clone();
        summary.location = analysis.current_location.clone();
    }
    summary
}

impl TranslationPipeline {
    pub fn new(model: Arc<dyn LanguageModelPort>, options: PipelineOptions) -> Self {
        Self {
            model,
            options,
            events: None,
        }
    }

    pub fn with_event_sink(mut self, sink: Arc<dyn PipelineEventSink>) -> Self {
        self.events = Some(sink);
        self
    }

    fn publish(&self, event: PipelineEvent) {
        if let Some(sink) = &self.events {
            sink.publish(event);
        }
    }

    fn glossary_text(&self, agent: &NovelAgent, text: &str) -> String {
        if self.options.filter_glossary {
            agent.glossary().to_prompt_text_for(text)
        } else {
            agent.glossary().to_prompt_text()
        }
    }

    /// 翻译一章
    ///
    /// - 分析 / 润色失败按配置吸收为"阶段跳过"，翻译失败整章失败
    /// - 配置错误总是立即终止
    /// - 成功时分析结果与章节摘要已写入 Agent，由调用方持久化
    pub async fn translate_chapter(
        &self,
        agent: &mut NovelAgent,
        input: ChapterInput,
    ) -> Result<ChapterOutcome, PipelineError> {
        let started = Instant::now();
        let config = agent.config().clone();
        let languages = agent.state().languages.clone();
        let model = self.model.as_ref();
        let max_output_tokens = self.options.max_output_tokens;

        let mut run = Run {
            pipeline: self,
            novel_id: agent.novel_id().to_string(),
            chapter: input.chapter_number,
            trail: vec![ChapterStatus::Pending],
        };

        tracing::info!(
            novel_id = %run.novel_id,
            chapter = input.chapter_number,
            model = model.name(),
            chars = input.text.chars().count(),
            "Translating chapter"
        );

        if input.text.trim().is_empty() {
            return Err(run.fail(PipelineError::Validation("chapter text is empty".to_string())));
        }

        // Stage 1: Analyze
        let stage1 = if config.enable_analysis {
            run.stage_started(Stage::Analyze);
            let context = agent.context();
            let report = analyze::run(
                model,
                &context,
                &config,
                max_output_tokens,
                input.chapter_number,
                &input.text,
            )
            .await;
            run.stage_finished(Stage::Analyze, &report);

            if let Some(error) = &report.error {
                if error.is_configuration() || !config.skip_analysis_on_failure {
                    return Err(run.fail(PipelineError::stage(Stage::Analyze, error)));
                }
                tracing::warn!(chapter = input.chapter_number, "Analysis skipped after failure");
            }
            if let Some(analysis) = &report.data {
                let new_characters: Vec<&str> = analysis.new_character_names().collect();
                if !new_characters.is_empty() {
                    tracing::info!(
                        chapter = input.chapter_number,
                        characters = ?new_characters,
                        "New characters found"
                    );
                }
                agent.apply_analysis_result(analysis);
            }
            report
        } else {
            StageReport::skipped()
        };

        // Stage 2: Translate
        run.stage_started(Stage::Translate);
        let context = agent.context();
        let system_prompt = prompts::translation_system_prompt(
            &context,
            &languages,
            &self.glossary_text(agent, &input.text),
        );
        let (stage2, alignment) =
            translate::run(model, &system_prompt, &config, max_output_tokens, &input.text).await;
        run.stage_finished(Stage::Translate, &stage2);

        let draft = match (&stage2.data, &stage2.error) {
            (Some(draft), _) if stage2.success => draft.clone(),
            (_, Some(error)) => return Err(run.fail(PipelineError::stage(Stage::Translate, error))),
            _ => {
                let error = PipelineError::Validation("translation produced no text".to_string());
                return Err(run.fail(PipelineError::stage(Stage::Translate, &error)));
            }
        };

        // Stage 3: Edit
        let stage3 = if config.enable_editing {
            run.stage_started(Stage::Edit);
            let report = edit::run(
                model,
                &context,
                &languages,
                &self.glossary_text(agent, &input.text),
                &config,
                max_output_tokens,
                &input.text,
                &draft,
            )
            .await;
            run.stage_finished(Stage::Edit, &report);

            if let Some(error) = &report.error {
                if error.is_configuration() || config.fail_on_edit_error {
                    return Err(run.fail(PipelineError::stage(Stage::Edit, error)));
                }
                tracing::warn!(chapter = input.chapter_number, "Edit skipped after failure, keeping draft");
            }
            report
        } else {
            StageReport::skipped()
        };

        let (final_translation, final_stage) = match &stage3.data {
            Some(edited) if stage3.success => (edited.clone(), Stage::Edit),
            _ => (draft, Stage::Translate),
        };

        let total_tokens = stage1.tokens_used + stage2.tokens_used + stage3.tokens_used;
        let total_duration_ms = elapsed_ms(started);
        if let Err(e) = quality::check_chapter(&final_translation, total_tokens, total_duration_ms) {
            return Err(run.fail(e));
        }

        agent.record_chapter_translation(summary_for(&input, stage1.data.as_ref()));
        run.enter(ChapterStatus::Completed);

        tracing::info!(
            novel_id = %run.novel_id,
            chapter = input.chapter_number,
            final_stage = %final_stage,
            total_tokens,
            total_duration_ms,
            "Chapter completed"
        );
        self.publish(PipelineEvent::ChapterCompleted {
            novel_id: run.novel_id.clone(),
            chapter: input.chapter_number,
            total_tokens,
            duration_ms: total_duration_ms,
            final_stage,
        });

        Ok(ChapterOutcome {
            chapter_number: input.chapter_number,
            final_translation,
            final_stage,
            stage1,
            stage2,
            stage3,
            total_tokens,
            total_duration_ms,
            alignment,
            status_trail: run.trail,
        })
    }
}
