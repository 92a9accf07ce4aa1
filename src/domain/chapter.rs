//! 章节处理状态与流水线阶段

use serde::{Deserialize, Serialize};

/// 章节状态机
///
/// Pending → Analyzing → Translating → Editing → Completed
///                    ↘ Failed（任意处理中状态）
///
/// Analyzing、Editing 可以跳过；任何状态都可以被外部重置回 Pending。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChapterStatus {
    #[default]
    Pending,
    Analyzing,
    Translating,
    Editing,
    Completed,
    Failed,
}

impl ChapterStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChapterStatus::Pending => "pending",
            ChapterStatus::Analyzing => "analyzing",
            ChapterStatus::Translating => "translating",
            ChapterStatus::Editing => "editing",
            ChapterStatus::Completed => "completed",
            ChapterStatus::Failed => "failed",
        }
    }

    pub fn is_in_progress(&self) -> bool {
        matches!(
            self,
            ChapterStatus::Analyzing | ChapterStatus::Translating | ChapterStatus::Editing
        )
    }

    pub fn can_transition_to(&self, next: ChapterStatus) -> bool {
        use ChapterStatus::*;
        match (self, next) {
            (_, Pending) => true,
            (Pending, Analyzing | Translating) => true,
            (Analyzing, Translating | Failed) => true,
            (Translating, Editing | Completed | Failed) => true,
            (Editing, Completed | Failed) => true,
            (Pending, Failed) => true,
            _ => false,
        }
    }
}

/// 流水线阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Analyze,
    Translate,
    Edit,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Analyze => "analyze",
            Stage::Translate => "translate",
            Stage::Edit => "edit",
        }
    }

    /// 阶段运行期间章节所处的状态
    pub fn status(&self) -> ChapterStatus {
        match self {
            Stage::Analyze => ChapterStatus::Analyzing,
            Stage::Translate => ChapterStatus::Translating,
            Stage::Edit => ChapterStatus::Editing,
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::fmt::Display for ChapterStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::ChapterStatus::*;

    #[test]
    fn test_happy_path_transitions() {
        assert!(Pending.can_transition_to(Analyzing));
        assert!(Analyzing.can_transition_to(Translating));
        assert!(Translating.can_transition_to(Editing));
        assert!(Editing.can_transition_to(Completed));
    }

    #[test]
    fn test_skippable_stages() {
        assert!(Pending.can_transition_to(Translating));
        assert!(Translating.can_transition_to(Completed));
    }

    #[test]
    fn test_invalid_transitions() {
        assert!(!Completed.can_transition_to(Translating));
        assert!(!Failed.can_transition_to(Completed));
        assert!(!Editing.can_transition_to(Analyzing));
        assert!(!Pending.can_transition_to(Completed));
    }

    #[test]
    fn test_reset_allowed_from_anywhere() {
        for status in [Pending, Analyzing, Translating, Editing, Completed, Failed] {
            assert!(status.can_transition_to(Pending));
        }
    }
}
