//! Agent Command Handlers

use std::sync::Arc;

use crate::application::commands::{ApplyGlossaryUpdate, CreateNovelAgent, UpdateTranslationConfig};
use crate::application::error::ApplicationError;
use crate::application::ports::AgentStorePort;
use crate::domain::agent::{CreateAgentParams, NovelAgent, NovelId};
use crate::domain::glossary::ApplyReport;

pub(crate) fn parse_novel_id(id: &str) -> Result<NovelId, ApplicationError> {
    NovelId::parse(id).map_err(ApplicationError::validation)
}

// ============================================================================
// CreateNovelAgent
// ============================================================================

/// 创建 Agent 响应
#[derive(Debug, Clone)]
pub struct CreateNovelAgentResponse {
    pub novel_id: NovelId,
    pub title: String,
}

/// CreateNovelAgent Handler
pub struct CreateNovelAgentHandler {
    store: Arc<dyn AgentStorePort>,
}

impl CreateNovelAgentHandler {
    pub fn new(store: Arc<dyn AgentStorePort>) -> Self {
        Self { store }
    }

    pub async fn handle(
        &self,
        command: CreateNovelAgent,
    ) -> Result<CreateNovelAgentResponse, ApplicationError> {
        let agent = NovelAgent::create(CreateAgentParams {
            novel_id: command.novel_id,
            title: command.title,
            languages: None,
            config: command.config,
        })?;

        if self.store.exists(agent.novel_id()).await? {
            return Err(ApplicationError::business_rule(format!(
                "novel agent already exists: {}",
                agent.novel_id()
            )));
        }

        self.store.save(&agent).await?;

        tracing::info!(
            novel_id = %agent.novel_id(),
            title = %agent.title(),
            "Novel agent created"
        );

        Ok(CreateNovelAgentResponse {
            novel_id: agent.novel_id().clone(),
            title: agent.title().to_string(),
        })
    }
}

// ============================================================================
// ApplyGlossaryUpdate
// ============================================================================

/// ApplyGlossaryUpdate Handler - 人工修订术语表
pub struct ApplyGlossaryUpdateHandler {
    store: Arc<dyn AgentStorePort>,
}

impl ApplyGlossaryUpdateHandler {
    pub fn new(store: Arc<dyn AgentStorePort>) -> Self {
        Self { store }
    }

    pub async fn handle(&self, command: ApplyGlossaryUpdate) -> Result<ApplyReport, ApplicationError> {
        let novel_id = parse_novel_id(&command.novel_id)?;
        let mut agent = self.store.load(&novel_id).await?;

        let report = agent.glossary_mut().apply_update(&command.update);
        if report.changed() {
            self.store.save(&agent).await?;
        }

        tracing::info!(
            novel_id = %novel_id,
            added = report.added,
            updated = report.updated,
            skipped = report.skipped,
            version = agent.glossary().version(),
            "Glossary updated"
        );
        Ok(report)
    }
}

// ============================================================================
// UpdateTranslationConfig
// ============================================================================

/// UpdateTranslationConfig Handler
pub struct UpdateTranslationConfigHandler {
    store: Arc<dyn AgentStorePort>,
}

impl UpdateTranslationConfigHandler {
    pub fn new(store: Arc<dyn AgentStorePort>) -> Self {
        Self { store }
    }

    pub async fn handle(&self, command: UpdateTranslationConfig) -> Result<(), ApplicationError> {
        let config = command.config;
        if config.max_tokens_per_chunk == 0 {
            return Err(ApplicationError::validation("max_tokens_per_chunk must be positive"));
        }
        if config.max_concurrent_chunks == 0 {
            return Err(ApplicationError::validation("max_concurrent_chunks must be positive"));
        }

        let novel_id = parse_novel_id(&command.novel_id)?;
        let mut agent = self.store.load(&novel_id).await?;
        agent.set_config(config);
        self.store.save(&agent).await?;

        tracing::info!(novel_id = %novel_id, "Translation config updated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::agent::TranslationConfig;
    use crate::domain::glossary::{GlossaryUpdate, NewCharacter};
    use crate::infrastructure::memory::InMemoryAgentStore;

    fn store() -> Arc<dyn AgentStorePort> {
        Arc::new(InMemoryAgentStore::new())
    }

    fn create(novel_id: &str) -> CreateNovelAgent {
        CreateNovelAgent {
            novel_id: Some(novel_id.to_string()),
            title: "Northern Lights".to_string(),
            config: None,
        }
    }

    #[tokio::test]
    async fn test_create_agent_rejects_duplicates() {
        let store = store();
        let handler = CreateNovelAgentHandler::new(store.clone());

        let response = handler.handle(create("north")).await.unwrap();
        assert_eq!(response.novel_id.as_str(), "north");
        assert!(store.exists(&response.novel_id).await.unwrap());

        let again = handler.handle(create("north")).await;
        assert!(matches!(again, Err(ApplicationError::BusinessRuleViolation(_))));
    }

    #[tokio::test]
    async fn test_create_agent_validates_title() {
        let handler = CreateNovelAgentHandler::new(store());
        let mut command = create("north");
        command.title = "   ".to_string();
        assert!(matches!(
            handler.handle(command).await,
            Err(ApplicationError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn test_apply_glossary_update_persists() {
        let store = store();
        CreateNovelAgentHandler::new(store.clone())
            .handle(create("north"))
            .await
            .unwrap();

        let handler = ApplyGlossaryUpdateHandler::new(store.clone());
        let report = handler
            .handle(ApplyGlossaryUpdate {
                novel_id: "north".to_string(),
                update: GlossaryUpdate {
                    new_characters: vec![NewCharacter::named("Anna")],
                    ..Default::default()
                },
            })
            .await
            .unwrap();
        assert_eq!(report.added, 1);

        let agent = store.load(&NovelId::parse("north").unwrap()).await.unwrap();
        assert_eq!(agent.glossary().find_character("anna").unwrap().translated_name, "Анна");
        assert_eq!(agent.glossary().version(), 1);
    }

    #[tokio::test]
    async fn test_apply_glossary_update_unknown_novel() {
        let handler = ApplyGlossaryUpdateHandler::new(store());
        let result = handler
            .handle(ApplyGlossaryUpdate {
                novel_id: "missing".to_string(),
                update: GlossaryUpdate::default(),
            })
            .await;
        assert!(matches!(result, Err(ApplicationError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_update_config_validates() {
        let store = store();
        CreateNovelAgentHandler::new(store.clone())
            .handle(create("north"))
            .await
            .unwrap();
        let handler = UpdateTranslationConfigHandler::new(store.clone());

        let bad = handler
            .handle(UpdateTranslationConfig {
                novel_id: "north".to_string(),
                config: TranslationConfig {
                    max_concurrent_chunks: 0,
                    ..Default::default()
                },
            })
            .await;
        assert!(matches!(bad, Err(ApplicationError::ValidationError(_))));

        handler
            .handle(UpdateTranslationConfig {
                novel_id: "north".to_string(),
                config: TranslationConfig {
                    enable_editing: false,
                    ..Default::default()
                },
            })
            .await
            .unwrap();
        let agent = store.load(&NovelId::parse("north").unwrap()).await.unwrap();
        assert!(!agent.config().enable_editing);
    }
}
