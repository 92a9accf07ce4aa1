//! 文本分块器
//!
//! 按空行把章节切成段落，再把相邻段落贪心地装进不超过 token 预算的块中。
//! 每个段落带一个稳定标记 `--para:xxxxxx--`，每个块带位置索引，
//! 块可以乱序完成、按索引重组。

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// 默认每块 token 预算
pub const DEFAULT_MAX_TOKENS: usize = 1500;

/// 分块配置
#[derive(Debug, Clone, Copy)]
pub struct ChunkOptions {
    /// 每块的估算 token 上限
    pub max_tokens: usize,
    /// true: 超长段落单独成块，不拆分
    /// false: 超长段落按句末标点拆分
    pub preserve_paragraphs: bool,
}

impl Default for ChunkOptions {
    fn default() -> Self {
        Self {
            max_tokens: DEFAULT_MAX_TOKENS,
            preserve_paragraphs: true,
        }
    }
}

/// 块内段落
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkParagraph {
    /// 段落标记，形如 `--para:1a2b3c--`
    pub marker: String,
    pub text: String,
    /// 是否是上一段落被拆开的后续部分
    pub continues_previous: bool,
}

/// 文本块 - 一次翻译请求的单位
///
/// 不变量:
/// - index 在一次分块中唯一且连续
/// - content 等于 paragraphs 以空行连接
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextChunk {
    pub id: String,
    pub index: usize,
    pub content: String,
    pub paragraphs: Vec<ChunkParagraph>,
    pub token_estimate: Option<usize>,
}

impl TextChunk {
    fn new(index: usize, paragraphs: Vec<ChunkParagraph>, tokens: usize) -> Self {
        let content = paragraphs
            .iter()
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        Self {
            id: format!("chunk-{}", index),
            index,
            content,
            paragraphs,
            token_estimate: Some(tokens),
        }
    }
}

/// 宽字符（中日韩）按 1 字 1 token，其余按 4 字符 1 token 粗略估算
pub fn estimate_tokens(text: &str) -> usize {
    let mut wide = 0usize;
    let mut narrow = 0usize;
    for ch in text.chars() {
        if is_wide(ch) {
            wide += 1;
        } else if !ch.is_whitespace() || ch == ' ' {
            narrow += 1;
        }
    }
    let estimate = wide + narrow.div_ceil(4);
    if estimate == 0 && !text.trim().is_empty() {
        1
    } else {
        estimate
    }
}

#[inline]
fn is_wide(ch: char) -> bool {
    matches!(ch,
        '\u{3040}'..='\u{30FF}'   // 平假名 / 片假名
        | '\u{3400}'..='\u{4DBF}' // CJK 扩展 A
        | '\u{4E00}'..='\u{9FFF}' // CJK 统一汉字
        | '\u{AC00}'..='\u{D7AF}' // 谚文
        | '\u{F900}'..='\u{FAFF}'
        | '\u{FF00}'..='\u{FFEF}')
}

/// 检查是否为句末标点（拆分超长段落时使用）
#[inline]
fn is_sentence_end(ch: char) -> bool {
    matches!(ch, '。' | '？' | '！' | '.' | '?' | '!' | '…')
}

/// 按空行切分段落（兼容 \r\n），去掉首尾空白并丢弃空段落
pub fn split_paragraphs(text: &str) -> Vec<String> {
    let normalized = text.replace("\r\n", "\n");
    let mut paragraphs = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in normalized.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                paragraphs.push(current.join("\n").trim().to_string());
                current.clear();
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        paragraphs.push(current.join("\n").trim().to_string());
    }

    paragraphs.retain(|p| !p.is_empty());
    paragraphs
}

/// 按句末标点切分，标点留在句子末尾；连续的标点（如 "?!"、"..."）不拆开
fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        current.push(ch);
        if is_sentence_end(ch) {
            while let Some(next) = chars.peek() {
                if is_sentence_end(*next) || matches!(*next, '"' | '\'' | '»' | '”' | ')') {
                    current.push(*next);
                    chars.next();
                } else {
                    break;
                }
            }
            let trimmed = current.trim();
            if !trimmed.is_empty() {
                sentences.push(trimmed.to_string());
            }
            current.clear();
        }
    }

    let trimmed = current.trim();
    if !trimmed.is_empty() {
        sentences.push(trimmed.to_string());
    }
    sentences
}

/// 段落标记: md5(位置 + 内容) 的前 6 位十六进制
pub fn paragraph_marker(position: usize, text: &str) -> String {
    let digest = md5::compute(format!("{}:{}", position, text));
    format!("--para:{}--", &format!("{:x}", digest)[..6])
}

/// 在一组标记中保证唯一
fn unique_marker(position: usize, text: &str, used: &mut HashSet<String>) -> String {
    let mut marker = paragraph_marker(position, text);
    let mut salt = 0usize;
    while used.contains(&marker) {
        salt += 1;
        marker = paragraph_marker(position, &format!("{}#{}", text, salt));
    }
    used.insert(marker.clone());
    marker
}

/// 使用默认估算器分块
pub fn chunk_text(text: &str, options: &ChunkOptions) -> Vec<TextChunk> {
    chunk_text_with(text, options, estimate_tokens)
}

/// 分块
///
/// 分块策略:
/// 1. 按空行切分段落
/// 2. 相邻段落贪心装箱，累计估算不超过 max_tokens
/// 3. 单个段落超出预算时: preserve_paragraphs 为 true 则单独成块，
///    否则按句末标点拆分后再装箱
pub fn chunk_text_with<F>(text: &str, options: &ChunkOptions, estimator: F) -> Vec<TextChunk>
where
    F: Fn(&str) -> usize,
{
    let max_tokens = options.max_tokens.max(1);
    let mut used = HashSet::new();
    let mut position = 0usize;

    // 第一步：切成装箱单位
    let mut units: Vec<(ChunkParagraph, usize)> = Vec::new();
    for paragraph in split_paragraphs(text) {
        let tokens = estimator(&paragraph);
        let pieces = if tokens > max_tokens && !options.preserve_paragraphs {
            split_sentences(&paragraph)
        } else {
            vec![paragraph]
        };

        for (i, piece) in pieces.into_iter().enumerate() {
            let tokens = estimator(&piece);
            let marker = unique_marker(position, &piece, &mut used);
            position += 1;
            units.push((
                ChunkParagraph {
                    marker,
                    text: piece,
                    continues_previous: i > 0,
                },
                tokens,
            ));
        }
    }

    // 第二步：贪心装箱
    let mut chunks = Vec::new();
    let mut current: Vec<ChunkParagraph> = Vec::new();
    let mut current_tokens = 0usize;

    for (unit, tokens) in units {
        if !current.is_empty() && current_tokens + tokens > max_tokens {
            chunks.push(TextChunk::new(
                chunks.len(),
                std::mem::take(&mut current),
                current_tokens,
            ));
            current_tokens = 0;
        }
        current.push(unit);
        current_tokens += tokens;

        // 超出预算的单位独占一块
        if tokens > max_tokens {
            chunks.push(TextChunk::new(
                chunks.len(),
                std::mem::take(&mut current),
                current_tokens,
            ));
            current_tokens = 0;
        }
    }
    if !current.is_empty() {
        chunks.push(TextChunk::new(chunks.len(), current, current_tokens));
    }

    tracing::debug!(chunks = chunks.len(), max_tokens, "Text chunked");
    chunks
}

/// 把一组段落片段按拆分关系还原成段落
pub fn merge_paragraphs<'a, I>(pieces: I) -> Vec<String>
where
    I: IntoIterator<Item = (&'a str, bool)>,
{
    let mut paragraphs: Vec<String> = Vec::new();
    for (text, continues) in pieces {
        match paragraphs.last_mut() {
            Some(last) if continues => {
                last.push(' ');
                last.push_str(text);
            }
            _ => paragraphs.push(text.to_string()),
        }
    }
    paragraphs
}

/// 把 (块索引, 文本) 按索引重组为章节文本，空块忽略
pub fn reassemble<I>(parts: I) -> String
where
    I: IntoIterator<Item = (usize, String)>,
{
    let mut parts: Vec<(usize, String)> = parts.into_iter().collect();
    parts.sort_by_key(|(index, _)| *index);
    parts
        .into_iter()
        .map(|(_, text)| text.trim().to_string())
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// 按索引顺序重组原文（块可以任意顺序给出）
pub fn join_chunks(chunks: &[TextChunk]) -> String {
    let mut ordered: Vec<&TextChunk> = chunks.iter().collect();
    ordered.sort_by_key(|c| c.index);

    merge_paragraphs(
        ordered
            .iter()
            .flat_map(|c| c.paragraphs.iter())
            .map(|p| (p.text.as_str(), p.continues_previous)),
    )
    .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(n: usize) -> String {
        vec!["word"; n].join(" ")
    }

    #[test]
    fn test_split_paragraphs() {
        let text = "First line\nstill first.\r\n\r\nSecond.\n\n\n  \nThird.  ";
        let paragraphs = split_paragraphs(text);
        assert_eq!(paragraphs, vec!["First line\nstill first.", "Second.", "Third."]);
    }

    #[test]
    fn test_estimate_tokens() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens("abcde"), 2);
        assert_eq!(estimate_tokens("你好世界"), 4);
        assert_eq!(estimate_tokens("a"), 1);
    }

    #[test]
    fn test_packs_paragraphs_under_budget() {
        // 每段 "word word word" = 14 字符 ≈ 4 token
        let text = (0..6).map(|_| words(3)).collect::<Vec<_>>().join("\n\n");
        let chunks = chunk_text(&text, &ChunkOptions { max_tokens: 8, preserve_paragraphs: true });
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.paragraphs.len() == 2));
        assert!(chunks.iter().all(|c| c.token_estimate.unwrap() <= 8));
    }

    #[test]
    fn test_oversized_paragraph_becomes_own_chunk() {
        let big = format!("{}.", words(100));
        let text = format!("Short one.\n\n{}\n\nShort two.", big);
        let chunks = chunk_text(&text, &ChunkOptions { max_tokens: 20, preserve_paragraphs: true });
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[1].content, big);
        assert_eq!(chunks[1].paragraphs.len(), 1);
    }

    #[test]
    fn test_split_oversized_paragraph_when_not_preserving() {
        let big = (0..10)
            .map(|i| format!("Sentence number {} is here.", i))
            .collect::<Vec<_>>()
            .join(" ");
        let chunks = chunk_text(&big, &ChunkOptions { max_tokens: 20, preserve_paragraphs: false });
        assert!(chunks.len() > 1);
        assert!(!chunks[0].paragraphs[0].continues_previous);
        assert!(chunks[1].paragraphs[0].continues_previous);
        assert_eq!(join_chunks(&chunks), big);
    }

    #[test]
    fn test_join_restores_paragraph_sequence() {
        let text = "Alpha beta.\n\nGamma delta epsilon.\n\nZeta!\n\nEta theta iota kappa.";
        let chunks = chunk_text(text, &ChunkOptions { max_tokens: 5, preserve_paragraphs: true });
        assert_eq!(join_chunks(&chunks), split_paragraphs(text).join("\n\n"));
    }

    #[test]
    fn test_join_tolerates_any_order() {
        let text = (0..5).map(|i| format!("Paragraph {}.", i)).collect::<Vec<_>>().join("\n\n");
        let mut chunks = chunk_text(&text, &ChunkOptions { max_tokens: 4, preserve_paragraphs: true });
        chunks.reverse();
        assert_eq!(join_chunks(&chunks), text);
    }

    #[test]
    fn test_reassemble_orders_by_index() {
        let parts = vec![
            (2, "three".to_string()),
            (0, "one".to_string()),
            (1, "  ".to_string()),
        ];
        assert_eq!(reassemble(parts), "one\n\nthree");
    }

    #[test]
    fn test_markers_unique_and_stable() {
        let text = "Same.\n\nSame.\n\nSame.";
        let first = chunk_text(text, &ChunkOptions::default());
        let second = chunk_text(text, &ChunkOptions::default());
        let markers: Vec<&str> = first[0].paragraphs.iter().map(|p| p.marker.as_str()).collect();
        let unique: HashSet<&str> = markers.iter().copied().collect();
        assert_eq!(unique.len(), 3);
        assert_eq!(first, second);
        assert!(markers[0].starts_with("--para:") && markers[0].ends_with("--"));
        assert_eq!(markers[0].len(), "--para:".len() + 6 + 2);
    }

    #[test]
    fn test_empty_text_yields_no_chunks() {
        assert!(chunk_text("  \n\n ", &ChunkOptions::default()).is_empty());
    }

    #[test]
    fn test_split_sentences_keeps_trailing_punctuation() {
        let sentences = split_sentences("Really?! Yes... \"Fine.\" ok");
        assert_eq!(sentences, vec!["Really?!", "Yes...", "\"Fine.\"", "ok"]);
    }
}
