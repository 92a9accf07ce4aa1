//! In-Memory Chapter Status Tracker

use dashmap::DashMap;
use std::sync::Arc;

use crate::application::ports::ChapterStatusPort;
use crate::domain::agent::NovelId;
use crate::domain::ChapterStatus;

/// 内存章节状态记录
pub struct InMemoryChapterStatusTracker {
    statuses: DashMap<(NovelId, u32), ChapterStatus>,
}

impl InMemoryChapterStatusTracker {
    pub fn new() -> Self {
        Self {
            statuses: DashMap::new(),
        }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }
}

impl Default for InMemoryChapterStatusTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ChapterStatusPort for InMemoryChapterStatusTracker {
    fn get(&self, novel_id: &NovelId, chapter: u32) -> ChapterStatus {
        self.statuses
            .get(&(novel_id.clone(), chapter))
            .map(|s| *s)
            .unwrap_or_default()
    }

    fn set(&self, novel_id: &NovelId, chapter: u32, status: ChapterStatus) {
        let previous = self.statuses.insert((novel_id.clone(), chapter), status);
        if let Some(previous) = previous {
            if !previous.can_transition_to(status) {
                tracing::warn!(
                    novel_id = %novel_id,
                    chapter,
                    from = %previous,
                    to = %status,
                    "Unexpected chapter status transition"
                );
            }
        }
    }

    fn reset(&self, novel_id: &NovelId, chapter: u32) -> ChapterStatus {
        self.statuses
            .insert((novel_id.clone(), chapter), ChapterStatus::Pending)
            .unwrap_or_default()
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

    #[test]
    fn test_untracked_chapter_is_pending() {
        let tracker = InMemoryChapterStatusTracker::new();
        let id = NovelId::parse("n").unwrap();
        assert_eq!(tracker.get(&id, 1), ChapterStatus::Pending);
    }

    #[test]
    fn test_reset_returns_previous() {
        let tracker = InMemoryChapterStatusTracker::new();
        let id = NovelId::parse("n").unwrap();
        tracker.set(&id, 2, ChapterStatus::Translating);
        assert_eq!(tracker.reset(&id, 2), ChapterStatus::Translating);
        assert_eq!(tracker.get(&id, 2), ChapterStatus::Pending);
    }

    #[test]
    fn test_list_is_scoped_and_sorted() {
        let tracker = InMemoryChapterStatusTracker::new();
        let a = NovelId::parse("a").unwrap();
        let b = NovelId::parse("b").unwrap();
        tracker.set(&a, 3, ChapterStatus::Completed);
        tracker.set(&a, 1, ChapterStatus::Failed);
        tracker.set(&b, 2, ChapterStatus::Editing);
        assert_eq!(
            tracker.list(&a),
            vec![(1, ChapterStatus::Failed), (3, ChapterStatus::Completed)]
        );
    }
}
