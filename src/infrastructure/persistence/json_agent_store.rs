//! JSON File Agent Store - 每部小说一个 `<novel_id>.json`
//!
//! 写入先落到临时文件再 rename，避免中途崩溃留下半个文件

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::application::ports::{AgentStorePort, StoreError};
use crate::domain::agent::{NovelAgent, NovelId};

const EXTENSION: &str = "json";

/// 文件系统 Agent 存储
pub struct JsonFileAgentStore {
    /// 存储根目录
    base_dir: PathBuf,
}

impl JsonFileAgentStore {
    /// 创建存储，目录不存在时自动创建
    pub async fn new(base_dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let base_dir = base_dir.as_ref().to_path_buf();

        fs::create_dir_all(&base_dir)
            .await
            .map_err(|e| StoreError::IoError(e.to_string()))?;

        Ok(Self { base_dir })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn agent_path(&self, novel_id: &NovelId) -> PathBuf {
        self.base_dir.join(format!("{}.{}", novel_id, EXTENSION))
    }
}

#[async_trait]
impl AgentStorePort for JsonFileAgentStore {
    async fn load(&self, novel_id: &NovelId) -> Result<NovelAgent, StoreError> {
        let path = self.agent_path(novel_id);
        let document = match fs::read_to_string(&path).await {
            Ok(document) => document,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(novel_id.to_string()));
            }
            Err(e) => return Err(StoreError::IoError(e.to_string())),
        };

        NovelAgent::from_json(&document).map_err(|e| {
            StoreError::SerializationError(format!("{}: {}", path.display(), e))
        })
    }

    async fn save(&self, agent: &NovelAgent) -> Result<(), StoreError> {
        let document = agent
            .to_json()
            .map_err(|e| StoreError::SerializationError(e.to_string()))?;

        let path = self.agent_path(agent.novel_id());
        let tmp_path = path.with_extension("json.tmp");

        fs::write(&tmp_path, document.as_bytes())
            .await
            .map_err(|e| StoreError::IoError(e.to_string()))?;
        fs::rename(&tmp_path, &path)
            .await
            .map_err(|e| StoreError::IoError(e.to_string()))?;

        tracing::debug!(
            novel_id = %agent.novel_id(),
            path = %path.display(),
            size = document.len(),
            "Agent state saved"
        );
        Ok(())
    }

    async fn exists(&self, novel_id: &NovelId) -> Result<bool, StoreError> {
        fs::try_exists(self.agent_path(novel_id))
            .await
            .map_err(|e| StoreError::IoError(e.to_string()))
    }

    async fn delete(&self, novel_id: &NovelId) -> Result<(), StoreError> {
        match fs::remove_file(self.agent_path(novel_id)).await {
            Ok(()) => {
                tracing::info!(novel_id = %novel_id, "Agent state deleted");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::NotFound(novel_id.to_string()))
            }
            Err(e) => Err(StoreError::IoError(e.to_string())),
        }
    }

    async fn list(&self) -> Result<Vec<NovelId>, StoreError> {
        let mut entries = fs::read_dir(&self.base_dir)
            .await
            .map_err(|e| StoreError::IoError(e.to_string()))?;

        let mut ids = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StoreError::IoError(e.to_string()))?
        {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match NovelId::parse(stem) {
                Ok(id) => ids.push(id),
                Err(_) => tracing::warn!(path = %path.display(), "Skipping unrecognized state file"),
            }
        }

        ids.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::agent::{ChapterSummary, CreateAgentParams};
    use tempfile::TempDir;

    fn agent(id: &str) -> NovelAgent {
        NovelAgent::create(CreateAgentParams {
            novel_id: Some(id.to_string()),
            title: "Winter Roads".to_string(),
            ..Default::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileAgentStore::new(dir.path().join("state")).await.unwrap();

        let mut original = agent("winter");
        let mut summary = ChapterSummary::new(1);
        summary.summary = "Snow falls.".to_string();
        original.record_chapter_translation(summary);
        store.save(&original).await.unwrap();

        assert!(dir.path().join("state/winter.json").exists());
        assert!(!dir.path().join("state/winter.json.tmp").exists());

        let reloaded = store.load(original.novel_id()).await.unwrap();
        assert_eq!(reloaded, original);
        assert_eq!(reloaded.chapter_count(), 1);
    }

    #[tokio::test]
    async fn test_list_ignores_foreign_files() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileAgentStore::new(dir.path()).await.unwrap();
        store.save(&agent("b")).await.unwrap();
        store.save(&agent("a")).await.unwrap();
        std::fs::write(dir.path().join("notes.txt"), "x").unwrap();

        let ids: Vec<String> = store.list().await.unwrap().iter().map(|i| i.to_string()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_missing_and_delete() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileAgentStore::new(dir.path()).await.unwrap();
        let id = NovelId::parse("gone").unwrap();

        assert!(matches!(store.load(&id).await, Err(StoreError::NotFound(_))));
        store.save(&agent("gone")).await.unwrap();
        assert!(store.exists(&id).await.unwrap());
        store.delete(&id).await.unwrap();
        assert!(!store.exists(&id).await.unwrap());
    }

    #[tokio::test]
    async fn test_corrupt_document() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileAgentStore::new(dir.path()).await.unwrap();
        std::fs::write(dir.path().join("bad.json"), "{not json").unwrap();
        let id = NovelId::parse("bad").unwrap();
        assert!(matches!(
            store.load(&id).await,
            Err(StoreError::SerializationError(_))
        ));
    }
}
