//! Chapter Status Port - 章节处理状态记录

use crate::domain::agent::NovelId;
use crate::domain::ChapterStatus;

/// Chapter Status Port
///
/// 状态只是记录，不做转换校验；校验在命令处理器中完成。
/// 方法是同步的，可以直接在事件回调里调用。
pub trait ChapterStatusPort: Send + Sync {
    /// 未记录过的章节视为 Pending
    fn get(&self, novel_id: &NovelId, chapter: u32) -> ChapterStatus;

    fn set(&self, novel_id: &NovelId, chapter: u32, status: ChapterStatus);

    /// 外部重置回 Pending，返回重置前的状态
    fn reset(&self, novel_id: &NovelId, chapter: u32) -> ChapterStatus;

    /// 一部小说所有已记录的章节状态，按章节号排序
    fn list(&self, novel_id: &NovelId) -> Vec<(u32, ChapterStatus)>;
}
