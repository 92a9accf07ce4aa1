//! Scripted Language Model - 用于测试和离线运行的模型替身
//!
//! 按顺序返回预先排好的回复；队列用完后交给 responder 处理

use async_trait::async_trait;
use std::collections::VecDeque;
use tokio::sync::Mutex;

use crate::application::ports::{
    ChatMessage, Completion, CompletionOptions, LanguageModelPort, ProviderError, TokenUsage,
};
use crate::domain::chunker::estimate_tokens;

type Responder = Box<dyn Fn(&[ChatMessage]) -> Result<String, ProviderError> + Send + Sync>;

/// 记录的一次请求
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub messages: Vec<ChatMessage>,
    pub options: CompletionOptions,
}

/// Scripted Language Model
pub struct ScriptedLanguageModel {
    script: Mutex<VecDeque<Result<String, ProviderError>>>,
    responder: Option<Responder>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl ScriptedLanguageModel {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            responder: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// 追加一条成功回复
    pub fn with_reply(mut self, reply: &str) -> Self {
        self.script.get_mut().push_back(Ok(reply.to_string()));
        self
    }

    /// 追加一条错误
    pub fn with_error(mut self, error: ProviderError) -> Self {
        self.script.get_mut().push_back(Err(error));
        self
    }

    /// 队列耗尽后按消息内容生成回复
    pub fn with_responder<F>(mut self, responder: F) -> Self
    where
        F: Fn(&[ChatMessage]) -> Result<String, ProviderError> + Send + Sync + 'static,
    {
        self.responder = Some(Box::new(responder));
        self
    }

    pub async fn request_count(&self) -> usize {
        self.requests.lock().await.len()
    }

    pub async fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().await.clone()
    }
}

impl Default for ScriptedLanguageModel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LanguageModelPort for ScriptedLanguageModel {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(
        &self,
        messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> Result<Completion, ProviderError> {
        self.requests.lock().await.push(RecordedRequest {
            messages: messages.to_vec(),
            options: options.clone(),
        });

        let scripted = self.script.lock().await.pop_front();
        let text = match (scripted, &self.responder) {
            (Some(next), _) => next?,
            (None, Some(responder)) => responder(messages)?,
            (None, None) => {
                return Err(ProviderError::Transport("script exhausted".to_string()));
            }
        };

        let prompt: usize = messages.iter().map(|m| estimate_tokens(&m.content)).sum();
        let usage = TokenUsage::new(prompt.max(1) as u32, estimate_tokens(&text).max(1) as u32);

        tracing::trace!(tokens = usage.total_tokens, "Scripted completion");

        Ok(Completion {
            text,
            usage,
            model: "scripted".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_script_then_responder() {
        let model = ScriptedLanguageModel::new()
            .with_reply("first")
            .with_error(ProviderError::Timeout)
            .with_responder(|messages| Ok(format!("echo {}", messages[0].content)));
        let messages = [ChatMessage::user("hi")];
        let options = CompletionOptions::default();

        let first = model.complete(&messages, &options).await.unwrap();
        assert_eq!(first.text, "first");
        assert!(first.usage.total_tokens >= 2);

        assert!(matches!(
            model.complete(&messages, &options).await,
            Err(ProviderError::Timeout)
        ));
        assert_eq!(model.complete(&messages, &options).await.unwrap().text, "echo hi");
        assert_eq!(model.request_count().await, 3);
    }

    #[tokio::test]
    async fn test_exhausted_script() {
        let model = ScriptedLanguageModel::new();
        let result = model
            .complete(&[ChatMessage::user("hi")], &CompletionOptions::default())
            .await;
        assert!(matches!(result, Err(ProviderError::Transport(_))));
        assert_eq!(model.requests().await[0].messages[0].content, "hi");
    }
}
