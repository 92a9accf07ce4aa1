//! Chapter Command Handlers

use std::sync::Arc;

use super::agent_handlers::parse_novel_id;
use crate::application::commands::{ResetChapterStatus, TranslateChapter};
use crate::application::error::ApplicationError;
use crate::application::pipeline::{ChapterInput, ChapterOutcome, PipelineOptions, TranslationPipeline};
use crate::application::ports::{
    AgentStorePort, ChapterStatusPort, LanguageModelPort, PipelineEvent, PipelineEventSink,
};
use crate::domain::agent::NovelId;
use crate::domain::ChapterStatus;

/// 把流水线的状态事件写入状态记录，再转发给下游
struct StatusRecordingSink {
    novel_id: NovelId,
    statuses: Arc<dyn ChapterStatusPort>,
    downstream: Option<Arc<dyn PipelineEventSink>>,
}

impl PipelineEventSink for StatusRecordingSink {
    fn publish(&self, event: PipelineEvent) {
        if let PipelineEvent::StatusChanged { chapter, status, .. } = &event {
            self.statuses.set(&self.novel_id, *chapter, *status);
        }
        if let Some(downstream) = &self.downstream {
            downstream.publish(event);
        }
    }
}

// ============================================================================
// TranslateChapter
// ============================================================================

/// TranslateChapter Handler
///
/// 读取 Agent → 校验章节状态 → 运行流水线 → 成功时保存 Agent。
/// 失败时不保存，Agent 保持调用前的状态。
pub struct TranslateChapterHandler {
    store: Arc<dyn AgentStorePort>,
    statuses: Arc<dyn ChapterStatusPort>,
    model: Arc<dyn LanguageModelPort>,
    options: PipelineOptions,
    events: Option<Arc<dyn PipelineEventSink>>,
}

impl TranslateChapterHandler {
    pub fn new(
        store: Arc<dyn AgentStorePort>,
        statuses: Arc<dyn ChapterStatusPort>,
        model: Arc<dyn LanguageModelPort>,
        options: PipelineOptions,
    ) -> Self {
        Self {
            store,
            statuses,
            model,
            options,
            events: None,
        }
    }

    pub fn with_event_sink(mut self, sink: Arc<dyn PipelineEventSink>) -> Self {
        self.events = Some(sink);
        self
    }

    pub async fn handle(&self, command: TranslateChapter) -> Result<ChapterOutcome, ApplicationError> {
        let novel_id = parse_novel_id(&command.novel_id)?;
        let chapter = command.chapter_number;

        match self.statuses.get(&novel_id, chapter) {
            status if status.is_in_progress() => {
                return Err(ApplicationError::invalid_state(format!(
                    "chapter {} is {}, reset it before retrying",
                    chapter, status
                )));
            }
            ChapterStatus::Completed => {
                return Err(ApplicationError::invalid_state(format!(
                    "chapter {} is already completed, reset it to translate again",
                    chapter
                )));
            }
            ChapterStatus::Failed => {
                tracing::info!(novel_id = %novel_id, chapter, "Retrying failed chapter");
                self.statuses.set(&novel_id, chapter, ChapterStatus::Pending);
            }
            _ => {}
        }

        let mut agent = self.store.load(&novel_id).await?;

        let sink = StatusRecordingSink {
            novel_id: novel_id.clone(),
            statuses: self.statuses.clone(),
            downstream: self.events.clone(),
        };
        let pipeline = TranslationPipeline::new(self.model.clone(), self.options.clone())
            .with_event_sink(Arc::new(sink));

        let mut input = ChapterInput::new(chapter, command.text);
        input.title = command.title;
        let outcome = pipeline.translate_chapter(&mut agent, input).await?;

        if let Err(e) = self.store.save(&agent).await {
            tracing::error!(novel_id = %novel_id, chapter, error = %e, "Failed to save agent after translation");
            self.statuses.set(&novel_id, chapter, ChapterStatus::Failed);
            return Err(e.into());
        }

        Ok(outcome)
    }
}

// ============================================================================
// ResetChapterStatus
// ============================================================================

/// ResetChapterStatus Handler - 外部重置回 Pending
pub struct ResetChapterStatusHandler {
    statuses: Arc<dyn ChapterStatusPort>,
}

impl ResetChapterStatusHandler {
    pub fn new(statuses: Arc<dyn ChapterStatusPort>) -> Self {
        Self { statuses }
    }

    /// 返回重置前的状态
    pub async fn handle(&self, command: ResetChapterStatus) -> Result<ChapterStatus, ApplicationError> {
        let novel_id = parse_novel_id(&command.novel_id)?;
        let previous = self.statuses.reset(&novel_id, command.chapter_number);

        tracing::info!(
            novel_id = %novel_id,
            chapter = command.chapter_number,
            previous = %previous,
            "Chapter status reset"
        );
        Ok(previous)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::commands::{CreateNovelAgent, CreateNovelAgentHandler};
    use crate::application::ports::ProviderError;
    use crate::domain::agent::TranslationConfig;
    use crate::infrastructure::adapters::llm::ScriptedLanguageModel;
    use crate::infrastructure::memory::{InMemoryAgentStore, InMemoryChapterStatusTracker};

    const REPLY: &str = r#"{"paragraphs":[{"translated":"Привет."}]}"#;

    struct Fixture {
        store: Arc<dyn AgentStorePort>,
        statuses: Arc<dyn ChapterStatusPort>,
    }

    impl Fixture {
        async fn new() -> Self {
            let store: Arc<dyn AgentStorePort> = Arc::new(InMemoryAgentStore::new());
            CreateNovelAgentHandler::new(store.clone())
                .handle(CreateNovelAgent {
                    novel_id: Some("greetings".to_string()),
                    title: "Greetings".to_string(),
                    config: Some(TranslationConfig {
                        enable_analysis: false,
                        enable_editing: false,
                        ..Default::default()
                    }),
                })
                .await
                .unwrap();
            Self {
                store,
                statuses: Arc::new(InMemoryChapterStatusTracker::new()),
            }
        }

        fn handler(&self, model: ScriptedLanguageModel) -> TranslateChapterHandler {
            TranslateChapterHandler::new(
                self.store.clone(),
                self.statuses.clone(),
                Arc::new(model),
                PipelineOptions::default(),
            )
        }

        fn status(&self, chapter: u32) -> ChapterStatus {
            self.statuses.get(&NovelId::parse("greetings").unwrap(), chapter)
        }
    }

    fn command(chapter: u32) -> TranslateChapter {
        TranslateChapter {
            novel_id: "greetings".to_string(),
            chapter_number: chapter,
            text: "Hello.".to_string(),
            title: Some("Opening".to_string()),
        }
    }

    #[tokio::test]
    async fn test_translate_saves_agent_and_completes() {
        let fixture = Fixture::new().await;
        let handler = fixture.handler(ScriptedLanguageModel::new().with_reply(REPLY));

        let outcome = handler.handle(command(1)).await.unwrap();
        assert_eq!(outcome.final_translation, "Привет.");
        assert_eq!(fixture.status(1), ChapterStatus::Completed);

        let agent = fixture
            .store
            .load(&NovelId::parse("greetings").unwrap())
            .await
            .unwrap();
        assert_eq!(agent.chapter_count(), 1);
        assert_eq!(agent.chapter_summaries()[0].title.as_deref(), Some("Opening"));
    }

    #[tokio::test]
    async fn test_completed_chapter_requires_reset() {
        let fixture = Fixture::new().await;
        let handler = fixture.handler(
            ScriptedLanguageModel::new()
                .with_reply(REPLY)
                .with_reply(REPLY),
        );
        handler.handle(command(1)).await.unwrap();

        let again = handler.handle(command(1)).await;
        assert!(matches!(again, Err(ApplicationError::InvalidState(_))));

        let previous = ResetChapterStatusHandler::new(fixture.statuses.clone())
            .handle(ResetChapterStatus {
                novel_id: "greetings".to_string(),
                chapter_number: 1,
            })
            .await
            .unwrap();
        assert_eq!(previous, ChapterStatus::Completed);
        assert_eq!(fixture.status(1), ChapterStatus::Pending);

        handler.handle(command(1)).await.unwrap();
        assert_eq!(fixture.status(1), ChapterStatus::Completed);
    }

    #[tokio::test]
    async fn test_stuck_chapter_resumes_after_reset() {
        let fixture = Fixture::new().await;
        let novel_id = NovelId::parse("greetings").unwrap();
        fixture.statuses.set(&novel_id, 3, ChapterStatus::Translating);

        let handler = fixture.handler(ScriptedLanguageModel::new().with_reply(REPLY));
        let blocked = handler.handle(command(3)).await;
        assert!(matches!(blocked, Err(ApplicationError::InvalidState(_))));

        fixture.statuses.reset(&novel_id, 3);
        handler.handle(command(3)).await.unwrap();
        assert_eq!(fixture.status(3), ChapterStatus::Completed);
    }

    #[tokio::test]
    async fn test_failed_chapter_recorded_and_retryable() {
        let fixture = Fixture::new().await;
        let handler = fixture.handler(
            ScriptedLanguageModel::new()
                .with_error(ProviderError::Transport("down".into()))
                .with_reply(REPLY),
        );

        let failed = handler.handle(command(2)).await;
        assert!(matches!(failed, Err(ApplicationError::Pipeline(_))));
        assert_eq!(fixture.status(2), ChapterStatus::Failed);

        let agent = fixture
            .store
            .load(&NovelId::parse("greetings").unwrap())
            .await
            .unwrap();
        assert_eq!(agent.chapter_count(), 0);

        handler.handle(command(2)).await.unwrap();
        assert_eq!(fixture.status(2), ChapterStatus::Completed);
    }

    #[tokio::test]
    async fn test_unknown_novel() {
        let fixture = Fixture::new().await;
        let handler = fixture.handler(ScriptedLanguageModel::new());
        let mut command = command(1);
        command.novel_id = "nobody".to_string();
        assert!(matches!(
            handler.handle(command).await,
            Err(ApplicationError::NotFound { .. })
        ));
    }
}
