//! Agent Queries

/// 获取术语表投影查询
#[derive(Debug, Clone)]
pub struct GetGlossary {
    pub novel_id: String,
    /// 给出时只投影在这段文本中出现的条目
    pub source_text: Option<String>,
}

/// 列出所有小说 Agent 查询
#[derive(Debug, Clone)]
pub struct ListNovelAgents;

/// 获取章节状态查询
#[derive(Debug, Clone)]
pub struct GetChapterStatuses {
    pub novel_id: String,
}
