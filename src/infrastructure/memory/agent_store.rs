//! In-Memory Agent Store Implementation
//!
//! 保存序列化后的 JSON 文档，读写都经过完整的序列化往返

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;

use crate::application::ports::{AgentStorePort, StoreError};
use crate::domain::agent::{NovelAgent, NovelId};

/// 内存 Agent 存储
pub struct InMemoryAgentStore {
    documents: DashMap<NovelId, String>,
}

impl InMemoryAgentStore {
    pub fn new() -> Self {
        Self {
            documents: DashMap::new(),
        }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }
}

impl Default for InMemoryAgentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AgentStorePort for InMemoryAgentStore {
    async fn load(&self, novel_id: &NovelId) -> Result<NovelAgent, StoreError> {
        let document = self
            .documents
            .get(novel_id)
            .map(|d| d.clone())
            .ok_or_else(|| StoreError::NotFound(novel_id.to_string()))?;
        NovelAgent::from_json(&document).map_err(|e| StoreError::SerializationError(e.to_string()))
    }

    async fn save(&self, agent: &NovelAgent) -> Result<(), StoreError> {
        let document = agent
            .to_json()
            .map_err(|e| StoreError::SerializationError(e.to_string()))?;
        self.documents.insert(agent.novel_id().clone(), document);
        tracing::debug!(novel_id = %agent.novel_id(), "Agent saved (memory)");
        Ok(())
    }

    async fn exists(&self, novel_id: &NovelId) -> Result<bool, StoreError> {
        Ok(self.documents.contains_key(novel_id))
    }

    async fn delete(&self, novel_id: &NovelId) -> Result<(), StoreError> {
        self.documents
            .remove(novel_id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(novel_id.to_string()))
    }

    async fn list(&self) -> Result<Vec<NovelId>, StoreError> {
        let mut ids: Vec<NovelId> = self.documents.iter().map(|e| e.key().clone()).collect();
        ids.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::agent::CreateAgentParams;

    fn agent(id: &str) -> NovelAgent {
        NovelAgent::create(CreateAgentParams {
            novel_id: Some(id.to_string()),
            title: format!("Novel {}", id),
            ..Default::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_save_load_round_trip() {
        let store = InMemoryAgentStore::new();
        let original = agent("b");
        store.save(&original).await.unwrap();
        store.save(&agent("a")).await.unwrap();

        let loaded = store.load(original.novel_id()).await.unwrap();
        assert_eq!(loaded, original);

        let ids: Vec<String> = store.list().await.unwrap().iter().map(|i| i.to_string()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_missing_agent() {
        let store = InMemoryAgentStore::new();
        let id = NovelId::parse("nope").unwrap();
        assert!(matches!(store.load(&id).await, Err(StoreError::NotFound(_))));
        assert!(matches!(store.delete(&id).await, Err(StoreError::NotFound(_))));
        assert!(!store.exists(&id).await.unwrap());
    }
}
