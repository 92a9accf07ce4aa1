//! Chapter Commands

/// 翻译一章命令
#[derive(Debug, Clone)]
pub struct TranslateChapter {
    pub novel_id: String,
    pub chapter_number: u32,
    pub text: String,
    pub title: Option<String>,
}

/// 外部重置章节状态命令（放弃进行中的翻译或重译已完成的章节）
#[derive(Debug, Clone)]
pub struct ResetChapterStatus {
    pub novel_id: String,
    pub chapter_number: u32,
}
