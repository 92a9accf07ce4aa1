//! 各阶段的提示词
//!
//! 术语表部分使用 `Glossary::to_prompt_text` 的行式格式，这里只负责拼装。

use std::fmt::Write;

use crate::application::ports::ChatMessage;
use crate::domain::agent::{AgentContext, LanguagePair};
use crate::domain::TextChunk;

fn language_name(code: &str) -> &str {
    match code {
        "en" => "English",
        "ru" => "Russian",
        other => other,
    }
}

/// 文风 + 前情 + 当前状态
pub(crate) fn context_block(context: &AgentContext) -> String {
    let mut out = String::new();
    let style = &context.style_profile;

    if !style.is_empty() {
        out.push_str("STYLE GUIDE:\n");
        for (label, value) in [
            ("Writing style", &style.writing_style),
            ("Tone", &style.tone),
            ("Vocabulary", &style.vocabulary_level),
            ("Dialogue", &style.dialogue_style),
            ("Narrative voice", &style.narrative_voice),
        ] {
            if !value.is_empty() {
                let _ = writeln!(out, "- {}: {}", label, value.replace('\n', "; "));
            }
        }
        out.push('\n');
    }

    if !context.previous_chapters.is_empty() {
        out.push_str("PREVIOUS CHAPTERS:\n");
        for chapter in &context.previous_chapters {
            let _ = write!(out, "- Chapter {}", chapter.chapter_number);
            if let Some(title) = &chapter.title {
                let _ = write!(out, " ({})", title);
            }
            if !chapter.summary.is_empty() {
                let _ = write!(out, ": {}", chapter.summary);
            }
            out.push('\n');
        }
        out.push('\n');
    }

    let current = &context.current_context;
    let mut state = Vec::new();
    if !current.last_events.is_empty() {
        state.push(format!("Recent events: {}", current.last_events.join("; ")));
    }
    if !current.active_characters.is_empty() {
        state.push(format!("Active characters: {}", current.active_characters.join(", ")));
    }
    if let Some(location) = &current.current_location {
        state.push(format!("Location: {}", location));
    }
    if let Some(mood) = &current.current_mood {
        state.push(format!("Mood: {}", mood));
    }
    if !current.open_plot_threads.is_empty() {
        state.push(format!("Open threads: {}", current.open_plot_threads.join("; ")));
    }
    if !state.is_empty() {
        out.push_str("CURRENT STATE:\n");
        for line in state {
            let _ = writeln!(out, "- {}", line);
        }
        out.push('\n');
    }

    out
}

fn glossary_block(glossary_text: &str) -> String {
    if glossary_text.is_empty() {
        String::new()
    } else {
        format!("GLOSSARY (use these target forms exactly):\n{}\n\n", glossary_text)
    }
}

pub(crate) fn analysis_messages(
    context: &AgentContext,
    glossary_text: &str,
    chapter_number: u32,
    text: &str,
) -> Vec<ChatMessage> {
    let system = format!(
        "You are a literary analyst preparing a novel for translation.\n\
         Extract named entities and narrative state from the chapter.\n\n\
         {glossary}{context}\
         Respond with a single JSON object:\n\
         {{\"characters\": [{{\"name\": \"\", \"translated_name\": null, \"gender\": \"male|female|neutral|unknown\", \
         \"description\": \"\", \"aliases\": [], \"is_main_character\": false}}],\n\
         \"locations\": [{{\"name\": \"\", \"translated_name\": null, \"type\": \"city|country|region|building|landmark|realm|other\", \"description\": \"\"}}],\n\
         \"terms\": [{{\"term\": \"\", \"translated\": null, \"category\": \"title|magic|technology|organization|item|creature|concept|other\", \"description\": \"\"}}],\n\
         \"chapter_title\": null, \"summary\": \"\", \"key_events\": [], \"active_characters\": [],\n\
         \"current_location\": null, \"mood\": null, \"open_plot_threads\": [],\n\
         \"style_notes\": {{\"writing_style\": null, \"tone\": null, \"vocabulary_level\": null, \"dialogue_style\": null, \"narrative_voice\": null}}}}\n\
         List every named character, location and special term that appears, including ones already in the glossary.",
        glossary = glossary_block(glossary_text),
        context = context_block(context),
    );
    let user = format!("CHAPTER {}:\n\n{}", chapter_number, text);
    vec![ChatMessage::system(system), ChatMessage::user(user)]
}

pub(crate) fn translation_system_prompt(
    context: &AgentContext,
    languages: &LanguagePair,
    glossary_text: &str,
) -> String {
    format!(
        "You are a professional literary translator from {source} to {target}.\n\
         Translate faithfully, keep the author's voice and keep names consistent with the glossary.\n\
         Decline character names using the case forms given in the glossary.\n\n\
         {glossary}{context}\
         The text is split into paragraphs, each preceded by an identifier line such as --para:1a2b3c--.\n\
         Respond with a single JSON object:\n\
         {{\"paragraphs\": [{{\"id\": \"--para:1a2b3c--\", \"translated\": \"...\"}}]}}\n\
         Return exactly one entry per identifier, echo each identifier unchanged and do not include identifiers inside the translated text.",
        source = language_name(&languages.source),
        target = language_name(&languages.target),
        glossary = glossary_block(glossary_text),
        context = context_block(context),
    )
}

/// 块正文：每段前加标记行
pub(crate) fn chunk_user_message(chunk: &TextChunk) -> String {
    chunk
        .paragraphs
        .iter()
        .map(|p| format!("{}\n{}", p.marker, p.text))
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub(crate) fn edit_messages(
    context: &AgentContext,
    languages: &LanguagePair,
    glossary_text: &str,
    source: &str,
    draft: &str,
) -> Vec<ChatMessage> {
    let system = format!(
        "You are a {target} literary editor polishing a translation from {source_lang}.\n\
         Improve fluency and rhythm without changing meaning.\n\
         Keep every name and term exactly as the glossary gives it, including case forms.\n\
         Keep the paragraph structure: paragraphs separated by one blank line.\n\
         Reply with the edited translation only, no commentary.\n\n\
         {glossary}{context}",
        target = language_name(&languages.target),
        source_lang = language_name(&languages.source),
        glossary = glossary_block(glossary_text),
        context = context_block(context),
    );
    let user = format!("ORIGINAL:\n{}\n\nTRANSLATION:\n{}", source, draft);
    vec![ChatMessage::system(system.trim_end().to_string()), ChatMessage::user(user)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::agent::{ChapterSummary, CreateAgentParams, NovelAgent};
    use crate::domain::chunker::{chunk_text, ChunkOptions};

    fn context() -> AgentContext {
        let mut agent = NovelAgent::create(CreateAgentParams {
            title: "T".to_string(),
            ..Default::default()
        })
        .unwrap();
        let mut summary = ChapterSummary::new(3);
        summary.summary = "The storm arrives.".to_string();
        agent.record_chapter_translation(summary);
        agent.context()
    }

    #[test]
    fn test_context_block_lists_previous_chapters() {
        let block = context_block(&context());
        assert!(block.contains("PREVIOUS CHAPTERS:\n- Chapter 3: The storm arrives."));
        assert!(!block.contains("STYLE GUIDE"));
    }

    #[test]
    fn test_chunk_message_prefixes_markers() {
        let chunks = chunk_text("One.\n\nTwo.", &ChunkOptions::default());
        let message = chunk_user_message(&chunks[0]);
        let lines: Vec<&str> = message.lines().collect();
        assert!(lines[0].starts_with("--para:"));
        assert_eq!(lines[1], "One.");
        assert_eq!(lines[2], "");
        assert!(lines[3].starts_with("--para:"));
    }

    #[test]
    fn test_translation_prompt_includes_glossary() {
        let prompt = translation_system_prompt(
            &context(),
            &LanguagePair::default(),
            "[CHARACTERS]\n- John => Джон (male) | gen: Джона | dat: Джону",
        );
        assert!(prompt.contains("from English to Russian"));
        assert!(prompt.contains("GLOSSARY"));
        assert!(prompt.contains("- John => Джон"));
    }
}
