//! 润色阶段
//!
//! 术语表的译名只作为提示要求模型保留，不做机械校验

use std::time::Instant;

use super::{prompts, quality, retry::with_retry, translate::strip_markers, PipelineError, StageReport};
use crate::application::ports::{CompletionOptions, LanguageModelPort};
use crate::domain::agent::{AgentContext, LanguagePair, TranslationConfig};
use crate::domain::Stage;

/// 去掉模型偶尔包上的代码块
fn unwrap_fence(text: &str) -> &str {
    let trimmed = text.trim();
    match trimmed.strip_prefix("```") {
        Some(rest) => {
            let body = rest.split_once('\n').map(|(_, b)| b).unwrap_or("");
            body.trim_end().strip_suffix("```").unwrap_or(body).trim()
        }
        None => trimmed,
    }
}

#[allow(clippy::too_many_arguments)]
pub(crate) async fn run(
    model: &dyn LanguageModelPort,
    context: &AgentContext,
    languages: &LanguagePair,
    glossary_text: &str,
    config: &TranslationConfig,
    max_output_tokens: Option<u32>,
    source: &str,
    draft: &str,
) -> StageReport<String> {
    let started = Instant::now();
    let messages = prompts::edit_messages(context, languages, glossary_text, source, draft);
    let options = CompletionOptions {
        temperature: Some(config.edit_temperature),
        max_tokens: max_output_tokens,
        ..Default::default()
    };

    let result = with_retry(&config.retry, Stage::Edit, || model.complete(&messages, &options)).await;

    match result {
        Ok(completion) => {
            let tokens = u64::from(completion.usage.total_tokens);
            let edited = strip_markers(unwrap_fence(&completion.text));
            match quality::check_text(&edited) {
                Ok(()) => {
                    tracing::info!(tokens, chars = edited.chars().count(), "Edit completed");
                    StageReport::succeeded(edited, tokens, started)
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Edited text rejected");
                    StageReport::failed(e, tokens, started)
                }
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "Edit failed");
            StageReport::failed(PipelineError::from(e), 0, started)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::agent::{CreateAgentParams, NovelAgent};
    use crate::infrastructure::adapters::llm::ScriptedLanguageModel;

    fn context() -> AgentContext {
        NovelAgent::create(CreateAgentParams {
            title: "T".to_string(),
            ..Default::default()
        })
        .unwrap()
        .context()
    }

    async fn edit_with(reply: &str) -> StageReport<String> {
        let model = ScriptedLanguageModel::new().with_reply(reply);
        run(
            &model,
            &context(),
            &LanguagePair::default(),
            "",
            &TranslationConfig::default(),
            None,
            "Hello.",
            "Привет.",
        )
        .await
    }

    #[test]
    fn test_unwrap_fence() {
        assert_eq!(unwrap_fence("```\nТекст\n```"), "Текст");
        assert_eq!(unwrap_fence("```text\nА\n\nБ\n```"), "А\n\nБ");
        assert_eq!(unwrap_fence(" Текст "), "Текст");
    }

    #[tokio::test]
    async fn test_edit_returns_polished_text() {
        let report = edit_with("```\nЗдравствуйте.\n```").await;
        assert!(report.success);
        assert_eq!(report.data.as_deref(), Some("Здравствуйте."));
        assert!(report.tokens_used > 0);
    }

    #[tokio::test]
    async fn test_edit_rejects_sentinel_reply() {
        let report = edit_with("I'm sorry, but I can't edit this.").await;
        assert!(!report.success);
        assert!(matches!(report.error, Some(PipelineError::Validation(_))));
    }
}
