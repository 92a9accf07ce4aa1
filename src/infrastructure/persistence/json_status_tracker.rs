//! JSON File Chapter Status Tracker
//!
//! 内存中用 DashMap 记录，每次变更后整体写回 `chapter_status.json`，
//! 让 CLI 的多次调用共享章节状态
//!
//! 端口是同步的：写盘在调用线程完成，在多线程运行时中通过
//! `block_in_place` 让出工作线程。写盘失败只记录下来，由 `flush` 报告。

use dashmap::DashMap;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tokio::runtime::{Handle, RuntimeFlavor};

use crate::application::ports::{ChapterStatusPort, StoreError};
use crate::domain::agent::NovelId;
use crate::domain::ChapterStatus;

const STATUS_FILE: &str = "chapter_status.json";

type StatusDocument = BTreeMap<String, BTreeMap<u32, ChapterStatus>>;

pub struct JsonFileChapterStatusTracker {
    path: PathBuf,
    statuses: DashMap<(NovelId, u32), ChapterStatus>,
    /// 串行化写盘，同时保存最近一次未恢复的写盘错误
    write_error: Mutex<Option<String>>,
}

/// 在多线程运行时中执行阻塞 IO 时通知调度器
fn blocking<T>(f: impl FnOnce() -> T) -> T {
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(f)
        }
        _ => f(),
    }
}

impl JsonFileChapterStatusTracker {
    /// 打开状态文件，不存在时从空状态开始
    pub fn open(base_dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let base_dir = base_dir.as_ref();
        std::fs::create_dir_all(base_dir).map_err(|e| StoreError::IoError(e.to_string()))?;
        let path = base_dir.join(STATUS_FILE);

        let statuses = DashMap::new();
        match std::fs::read_to_string(&path) {
            Ok(content) => {
                let document: StatusDocument = serde_json::from_str(&content)
                    .map_err(|e| StoreError::SerializationError(e.to_string()))?;
                for (novel_id, chapters) in document {
                    let Ok(novel_id) = NovelId::parse(novel_id) else {
                        continue;
                    };
                    for (chapter, status) in chapters {
                        statuses.insert((novel_id.clone(), chapter), status);
                    }
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(StoreError::IoError(e.to_string())),
        }

        tracing::debug!(path = %path.display(), entries = statuses.len(), "Chapter statuses loaded");
        Ok(Self {
            path,
            statuses,
            write_error: Mutex::new(None),
        })
    }

    /// 重试上次失败的写盘；没有待写内容时直接返回
    pub fn flush(&self) -> Result<(), StoreError> {
        let mut write_error = self.write_error.lock().unwrap_or_else(PoisonError::into_inner);
        if write_error.is_none() {
            return Ok(());
        }
        let result = blocking(|| self.write_snapshot());
        if result.is_ok() {
            *write_error = None;
        }
        result
    }

    fn persist(&self) {
        // 持锁期间快照并写入，后写入的总是更新的状态
        let mut write_error = self.write_error.lock().unwrap_or_else(PoisonError::into_inner);
        match blocking(|| self.write_snapshot()) {
            Ok(()) => *write_error = None,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to persist chapter statuses");
                *write_error = Some(e.to_string());
            }
        }
    }

    fn write_snapshot(&self) -> Result<(), StoreError> {
        let mut document = StatusDocument::new();
        for entry in self.statuses.iter() {
            let (novel_id, chapter) = entry.key();
            document
                .entry(novel_id.to_string())
                .or_default()
                .insert(*chapter, *entry.value());
        }

        let content = serde_json::to_string_pretty(&document)
            .map_err(|e| StoreError::SerializationError(e.to_string()))?;
        let tmp_path = self.path.with_extension("json.tmp");
        std::fs::write(&tmp_path, content)
            .and_then(|_| std::fs::rename(&tmp_path, &self.path))
            .map_err(|e| StoreError::IoError(e.to_string()))
    }
}

impl ChapterStatusPort for JsonFileChapterStatusTracker {
    fn get(&self, novel_id: &NovelId, chapter: u32) -> ChapterStatus {
        self.statuses
            .get(&(novel_id.clone(), chapter))
            .map(|s| *s)
            .unwrap_or_default()
    }

    fn set(&self, novel_id: &NovelId, chapter: u32, status: ChapterStatus) {
        self.statuses.insert((novel_id.clone(), chapter), status);
        self.persist();
    }

    fn reset(&self, novel_id: &NovelId, chapter: u32) -> ChapterStatus {
        let previous = self
            .statuses
            .insert((novel_id.clone(), chapter), ChapterStatus::Pending)
            .unwrap_or_default();
        self.persist();
        previous
    }

    fn list(&self, novel_id: &NovelId) -> Vec<(u32, ChapterStatus)> {
        let mut statuses: Vec<(u32, ChapterStatus)> = self
            .statuses
            .iter()
            .filter(|e| &e.key().0 == novel_id)
            .map(|e| (e.key().1, *e.value()))
            .collect();
        statuses.sort_by_key(|(chapter, _)| *chapter);
        statuses
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_statuses_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let id = NovelId::parse("saga").unwrap();

        let tracker = JsonFileChapterStatusTracker::open(dir.path()).unwrap();
        tracker.set(&id, 1, ChapterStatus::Completed);
        tracker.set(&id, 2, ChapterStatus::Translating);
        drop(tracker);

        let reopened = JsonFileChapterStatusTracker::open(dir.path()).unwrap();
        assert_eq!(reopened.get(&id, 2), ChapterStatus::Translating);
        assert_eq!(reopened.reset(&id, 2), ChapterStatus::Translating);
        assert_eq!(
            reopened.list(&id),
            vec![(1, ChapterStatus::Completed), (2, ChapterStatus::Pending)]
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_set_inside_runtime_writes_through() {
        let dir = TempDir::new().unwrap();
        let id = NovelId::parse("saga").unwrap();
        let tracker = JsonFileChapterStatusTracker::open(dir.path()).unwrap();

        tracker.set(&id, 4, ChapterStatus::Editing);

        let content = std::fs::read_to_string(dir.path().join(STATUS_FILE)).unwrap();
        let document: StatusDocument = serde_json::from_str(&content).unwrap();
        assert_eq!(document["saga"][&4], ChapterStatus::Editing);
        assert!(tracker.flush().is_ok());
    }

    #[test]
    fn test_failed_write_is_reported_by_flush() {
        let dir = TempDir::new().unwrap();
        let state_dir = dir.path().join("state");
        let id = NovelId::parse("saga").unwrap();
        let tracker = JsonFileChapterStatusTracker::open(&state_dir).unwrap();

        std::fs::remove_dir_all(&state_dir).unwrap();
        tracker.set(&id, 1, ChapterStatus::Completed);
        assert_eq!(tracker.get(&id, 1), ChapterStatus::Completed);
        assert!(matches!(tracker.flush(), Err(StoreError::IoError(_))));

        std::fs::create_dir_all(&state_dir).unwrap();
        tracker.flush().unwrap();
        let reopened = JsonFileChapterStatusTracker::open(&state_dir).unwrap();
        assert_eq!(reopened.get(&id, 1), ChapterStatus::Completed);
    }

    #[test]
    fn test_corrupt_file_is_rejected() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(STATUS_FILE), "[1,2").unwrap();
        assert!(matches!(
            JsonFileChapterStatusTracker::open(dir.path()),
            Err(StoreError::SerializationError(_))
        ));
    }
}
