//! Agent Query Handlers

use std::sync::Arc;

use crate::application::commands::handlers::parse_novel_id;
use crate::application::error::ApplicationError;
use crate::application::ports::{AgentStorePort, ChapterStatusPort};
use crate::application::queries::{GetChapterStatuses, GetGlossary, ListNovelAgents};
use crate::domain::agent::NovelId;
use crate::domain::ChapterStatus;

// ============================================================================
// Response DTOs
// ============================================================================

/// 术语表响应
#[derive(Debug, Clone)]
pub struct GlossaryResponse {
    pub novel_id: String,
    pub version: u64,
    pub updated_at: String,
    pub characters: usize,
    pub locations: usize,
    pub terms: usize,
    pub prompt_text: String,
}

/// Agent 摘要响应
#[derive(Debug, Clone)]
pub struct NovelAgentSummary {
    pub novel_id: String,
    pub title: String,
    pub chapters_translated: usize,
    pub glossary_version: u64,
    pub updated_at: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// GetGlossary Handler
pub struct GetGlossaryHandler {
    store: Arc<dyn AgentStorePort>,
}

impl GetGlossaryHandler {
    pub fn new(store: Arc<dyn AgentStorePort>) -> Self {
        Self { store }
    }

    pub async fn handle(&self, query: GetGlossary) -> Result<GlossaryResponse, ApplicationError> {
        let novel_id = parse_novel_id(&query.novel_id)?;
        let agent = self.store.load(&novel_id).await?;
        let glossary = agent.glossary();

        let prompt_text = match &query.source_text {
            Some(text) => glossary.to_prompt_text_for(text),
            None => glossary.to_prompt_text(),
        };

        Ok(GlossaryResponse {
            novel_id: novel_id.to_string(),
            version: glossary.version(),
            updated_at: glossary.updated_at().to_rfc3339(),
            characters: glossary.characters().len(),
            locations: glossary.locations().len(),
            terms: glossary.terms().len(),
            prompt_text,
        })
    }
}

/// ListNovelAgents Handler
pub struct ListNovelAgentsHandler {
    store: Arc<dyn AgentStorePort>,
}

impl ListNovelAgentsHandler {
    pub fn new(store: Arc<dyn AgentStorePort>) -> Self {
        Self { store }
    }

    pub async fn handle(&self, _query: ListNovelAgents) -> Result<Vec<NovelAgentSummary>, ApplicationError> {
        let mut summaries = Vec::new();
        for novel_id in self.store.list().await? {
            let agent = self.store.load(&novel_id).await?;
            summaries.push(NovelAgentSummary {
                novel_id: novel_id.to_string(),
                title: agent.title().to_string(),
                chapters_translated: agent.chapter_count(),
                glossary_version: agent.glossary().version(),
                updated_at: agent.updated_at().to_rfc3339(),
            });
        }
        Ok(summaries)
    }
}

/// GetChapterStatuses Handler
pub struct GetChapterStatusesHandler {
    statuses: Arc<dyn ChapterStatusPort>,
}

impl GetChapterStatusesHandler {
    pub fn new(statuses: Arc<dyn ChapterStatusPort>) -> Self {
        Self { statuses }
    }

    pub async fn handle(
        &self,
        query: GetChapterStatuses,
    ) -> Result<Vec<(u32, ChapterStatus)>, ApplicationError> {
        let novel_id: NovelId = parse_novel_id(&query.novel_id)?;
        Ok(self.statuses.list(&novel_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::commands::{
        ApplyGlossaryUpdate, ApplyGlossaryUpdateHandler, CreateNovelAgent, CreateNovelAgentHandler,
    };
    use crate::domain::glossary::{GlossaryUpdate, NewCharacter};
    use crate::infrastructure::memory::InMemoryAgentStore;

    async fn seeded_store() -> Arc<dyn AgentStorePort> {
        let store: Arc<dyn AgentStorePort> = Arc::new(InMemoryAgentStore::new());
        CreateNovelAgentHandler::new(store.clone())
            .handle(CreateNovelAgent {
                novel_id: Some("saga".to_string()),
                title: "Saga".to_string(),
                config: None,
            })
            .await
            .unwrap();
        ApplyGlossaryUpdateHandler::new(store.clone())
            .handle(ApplyGlossaryUpdate {
                novel_id: "saga".to_string(),
                update: GlossaryUpdate {
                    new_characters: vec![NewCharacter::named("John"), NewCharacter::named("Mary")],
                    ..Default::default()
                },
            })
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_get_glossary() {
        let handler = GetGlossaryHandler::new(seeded_store().await);

        let full = handler
            .handle(GetGlossary {
                novel_id: "saga".to_string(),
                source_text: None,
            })
            .await
            .unwrap();
        assert_eq!(full.version, 1);
        assert_eq!(full.characters, 2);
        assert!(full.prompt_text.starts_with("[CHARACTERS]"));

        let filtered = handler
            .handle(GetGlossary {
                novel_id: "saga".to_string(),
                source_text: Some("Mary smiled.".to_string()),
            })
            .await
            .unwrap();
        assert!(filtered.prompt_text.contains("Mary"));
        assert!(!filtered.prompt_text.contains("John"));
    }

    #[tokio::test]
    async fn test_list_agents() {
        let summaries = ListNovelAgentsHandler::new(seeded_store().await)
            .handle(ListNovelAgents)
            .await
            .unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].title, "Saga");
        assert_eq!(summaries[0].glossary_version, 1);
    }
}
