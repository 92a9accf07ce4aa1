//! 翻译阶段
//!
//! 每块一次结构化请求，模型需回传每段的标记。按标记回填；
//! 标记部分缺失且剩余数量一致时按位置补齐，否则该块退化为一个无标记整体，
//! 整章不再提供段落对齐。

use std::collections::HashMap;
use std::time::Instant;

use futures_util::stream::{self, StreamExt};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use super::{prompts, retry::with_retry, ParagraphAlignment, PipelineError, StageReport};
use crate::application::ports::{
    ChatMessage, CompletionOptions, LanguageModelExt, LanguageModelPort, ProviderError, TokenUsage,
};
use crate::domain::agent::TranslationConfig;
use crate::domain::chunker::{chunk_text_with, merge_paragraphs, ChunkOptions, TextChunk};
use crate::domain::Stage;

static MARKER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"--\s*para\s*:\s*([0-9A-Za-z]+)\s*--").expect("valid marker regex"));

/// 去掉文本中残留的段落标记
pub fn strip_markers(text: &str) -> String {
    let stripped = MARKER_RE.replace_all(text, "");
    let lines: Vec<&str> = stripped.lines().map(str::trim_end).collect();
    let mut out = lines.join("\n");
    while out.contains("\n\n\n") {
        out = out.replace("\n\n\n", "\n\n");
    }
    out.trim().to_string()
}

/// 统一标记写法：`abc123`、`--para: abc123--` 都视为 `--para:abc123--`
fn normalize_marker(id: &str) -> Option<String> {
    let id = id.trim();
    if let Some(caps) = MARKER_RE.captures(id) {
        return caps.get(1).map(|m| format!("--para:{}--", m.as_str()));
    }
    (!id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric()))
        .then(|| format!("--para:{}--", id))
}

#[derive(Debug, Deserialize)]
struct TranslatedUnit {
    #[serde(default, alias = "marker")]
    id: Option<String>,
    #[serde(alias = "text", alias = "translation")]
    translated: String,
}

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    #[serde(default)]
    paragraphs: Vec<TranslatedUnit>,
}

/// 一块的译文
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ChunkBody {
    /// 与块内段落一一对应
    Aligned(Vec<String>),
    /// 无法对齐，整体作为一段
    Untagged(String),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ChunkTranslation {
    pub index: usize,
    pub body: ChunkBody,
    pub usage: TokenUsage,
}

/// 把模型回传的单元按标记放回块内段落
fn align(chunk: &TextChunk, units: Vec<TranslatedUnit>) -> ChunkBody {
    let slots_by_marker: HashMap<&str, usize> = chunk
        .paragraphs
        .iter()
        .enumerate()
        .map(|(i, p)| (p.marker.as_str(), i))
        .collect();

    let mut slots: Vec<Option<String>> = vec![None; chunk.paragraphs.len()];
    let mut unmatched: Vec<String> = Vec::new();
    let mut ordered: Vec<String> = Vec::new();

    for unit in units {
        let text = strip_markers(&unit.translated);
        ordered.push(text.clone());
        let slot = unit
            .id
            .as_deref()
            .and_then(normalize_marker)
            .and_then(|marker| slots_by_marker.get(marker.as_str()).copied())
            .filter(|&i| slots[i].is_none());
        match slot {
            Some(i) => slots[i] = Some(text),
            None => unmatched.push(text),
        }
    }

    let missing = slots.iter().filter(|s| s.is_none()).count();
    if missing == 0 && unmatched.is_empty() {
        return ChunkBody::Aligned(slots.into_iter().flatten().collect());
    }

    if missing == unmatched.len() {
        tracing::debug!(chunk = chunk.index, missing, "Filling unmatched paragraphs by position");
        let mut rest = unmatched.into_iter();
        let filled = slots
            .into_iter()
            .map(|slot| slot.or_else(|| rest.next()).unwrap_or_default())
            .collect();
        return ChunkBody::Aligned(filled);
    }

    tracing::warn!(
        chunk = chunk.index,
        expected = chunk.paragraphs.len(),
        missing,
        unmatched = unmatched.len(),
        "Paragraph markers did not round-trip, using untagged text"
    );
    ChunkBody::Untagged(
        ordered
            .into_iter()
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n"),
    )
}

/// 翻译一个块
pub(crate) async fn translate_chunk(
    model: &dyn LanguageModelPort,
    system_prompt: &str,
    chunk: &TextChunk,
    config: &TranslationConfig,
    max_output_tokens: Option<u32>,
) -> Result<ChunkTranslation, (PipelineError, TokenUsage)> {
    let messages = vec![
        ChatMessage::system(system_prompt),
        ChatMessage::user(prompts::chunk_user_message(chunk)),
    ];
    let options = CompletionOptions {
        temperature: Some(config.translate_temperature),
        max_tokens: max_output_tokens,
        ..Default::default()
    };

    let result = with_retry(&config.retry, Stage::Translate, || {
        model.complete_structured::<TranslateResponse>(&messages, &options)
    })
    .await;

    match result {
        Ok(structured) if structured.value.paragraphs.is_empty() => Err((
            PipelineError::Parse(format!("chunk {} returned no paragraphs", chunk.index)),
            structured.usage,
        )),
        Ok(structured) => Ok(ChunkTranslation {
            index: chunk.index,
            body: align(chunk, structured.value.paragraphs),
            usage: structured.usage,
        }),
        Err(ProviderError::Parse { message, raw, usage }) => {
            let text = strip_markers(&raw);
            if text.is_empty() {
                return Err((PipelineError::Parse(message), usage));
            }
            tracing::warn!(
                chunk = chunk.index,
                error = %message,
                "Structured reply unreadable, using raw text as untagged translation"
            );
            Ok(ChunkTranslation {
                index: chunk.index,
                body: ChunkBody::Untagged(text),
                usage,
            })
        }
        Err(e) => Err((PipelineError::from(e), TokenUsage::default())),
    }
}

/// 按块索引重组章节译文；所有块都对齐时同时给出段落对齐
pub(crate) fn assemble(
    chunks: &[TextChunk],
    mut translations: Vec<ChunkTranslation>,
) -> (String, Option<Vec<ParagraphAlignment>>) {
    translations.sort_by_key(|t| t.index);
    let by_index: HashMap<usize, &TextChunk> = chunks.iter().map(|c| (c.index, c)).collect();

    let mut pieces: Vec<(&str, bool)> = Vec::new();
    let mut alignment = Some(Vec::new());

    for translation in &translations {
        let chunk = by_index.get(&translation.index);
        match (&translation.body, chunk) {
            (ChunkBody::Aligned(texts), Some(chunk)) => {
                for (paragraph, text) in chunk.paragraphs.iter().zip(texts) {
                    pieces.push((text.as_str(), paragraph.continues_previous));
                    if let Some(alignment) = alignment.as_mut() {
                        alignment.push(ParagraphAlignment {
                            marker: paragraph.marker.clone(),
                            source: paragraph.text.clone(),
                            translated: text.clone(),
                        });
                    }
                }
            }
            (ChunkBody::Aligned(texts), None) => {
                pieces.extend(texts.iter().map(|t| (t.as_str(), false)));
                alignment = None;
            }
            (ChunkBody::Untagged(text), chunk) => {
                // 块从被拆开的段落中间开始时，接在上一块之后
                let continues = chunk
                    .and_then(|c| c.paragraphs.first())
                    .map(|p| p.continues_previous)
                    .unwrap_or(false);
                pieces.push((text.as_str(), continues));
                alignment = None;
            }
        }
    }

    let text = merge_paragraphs(pieces.into_iter().filter(|(t, _)| !t.is_empty())).join("\n\n");
    (text, alignment)
}

/// 执行翻译阶段
pub(crate) async fn run(
    model: &dyn LanguageModelPort,
    system_prompt: &str,
    config: &TranslationConfig,
    max_output_tokens: Option<u32>,
    text: &str,
) -> (StageReport<String>, Option<Vec<ParagraphAlignment>>) {
    let started = Instant::now();
    let options = ChunkOptions {
        max_tokens: config.max_tokens_per_chunk,
        preserve_paragraphs: config.preserve_paragraphs,
    };
    let chunks = chunk_text_with(text, &options, |t| model.estimate_tokens(t));
    if chunks.is_empty() {
        let error = PipelineError::Validation("chapter has no paragraphs".to_string());
        return (StageReport::failed(error, 0, started), None);
    }

    let concurrency = config.max_concurrent_chunks.max(1);
    tracing::debug!(chunks = chunks.len(), concurrency, "Translating chunks");

    let results: Vec<_> = stream::iter(
        chunks
            .iter()
            .map(|chunk| translate_chunk(model, system_prompt, chunk, config, max_output_tokens)),
    )
    .buffer_unordered(concurrency)
    .collect()
    .await;

    let mut usage = TokenUsage::default();
    let mut translations = Vec::with_capacity(results.len());
    let mut first_error: Option<PipelineError> = None;
    for result in results {
        match result {
            Ok(translation) => {
                usage.add(&translation.usage);
                translations.push(translation);
            }
            Err((error, chunk_usage)) => {
                usage.add(&chunk_usage);
                first_error.get_or_insert(error);
            }
        }
    }
    let tokens = u64::from(usage.total_tokens);

    if let Some(error) = first_error {
        tracing::warn!(error = %error, "Translation failed");
        return (StageReport::failed(error, tokens, started), None);
    }

    let (translated, alignment) = assemble(&chunks, translations);
    if translated.trim().is_empty() {
        let error = PipelineError::Validation("translation is empty".to_string());
        return (StageReport::failed(error, tokens, started), None);
    }

    tracing::info!(
        chunks = chunks.len(),
        aligned = alignment.is_some(),
        tokens,
        "Translation completed"
    );
    (StageReport::succeeded(translated, tokens, started), alignment)
}
