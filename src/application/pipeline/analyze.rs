//! 分析阶段
//!
//! 抽取人物 / 地点 / 术语、摘要、事件与文风，按术语表判定新旧，
//! 生成只包含新条目的 GlossaryUpdate。

use std::collections::HashSet;
use std::time::Instant;

use serde::Deserialize;

use super::{prompts, retry::with_retry, PipelineError, StageReport};
use crate::application::ports::{CompletionOptions, LanguageModelExt, LanguageModelPort};
use crate::domain::agent::{AgentContext, AnalysisResult, ExtractedEntity, StyleNotes, TranslationConfig};
use crate::domain::glossary::{Glossary, GlossaryUpdate, LocationType, NewCharacter, NewLocation, NewTerm, TermCategory};
use crate::domain::language::Gender;
use crate::domain::Stage;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct RawCharacter {
    pub name: String,
    pub translated_name: Option<String>,
    pub gender: Option<String>,
    pub description: String,
    pub aliases: Vec<String>,
    pub is_main_character: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct RawLocation {
    pub name: String,
    pub translated_name: Option<String>,
    #[serde(rename = "type")]
    pub location_type: Option<String>,
    pub description: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct RawTerm {
    pub term: String,
    pub translated: Option<String>,
    pub category: Option<String>,
    pub description: String,
    pub context: Option<String>,
}

/// 模型返回的分析结构
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct AnalysisResponse {
    pub characters: Vec<RawCharacter>,
    pub locations: Vec<RawLocation>,
    pub terms: Vec<RawTerm>,
    pub chapter_title: Option<String>,
    pub summary: String,
    pub key_events: Vec<String>,
    pub active_characters: Vec<String>,
    pub current_location: Option<String>,
    pub mood: Option<String>,
    pub open_plot_threads: Vec<String>,
    pub style_notes: StyleNotes,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// 同一次响应里重复出现的名字只算一次
fn first_mention(seen: &mut HashSet<String>, name: &str) -> bool {
    seen.insert(name.to_lowercase())
}

/// 按术语表判定新旧（忽略大小写，人物含别名）
pub(crate) fn classify(glossary: &Glossary, response: AnalysisResponse) -> AnalysisResult {
    let mut update = GlossaryUpdate::default();
    let mut seen = HashSet::new();

    let mut characters = Vec::new();
    for raw in response.characters {
        let name = raw.name.trim().to_string();
        if name.is_empty() || !first_mention(&mut seen, &name) {
            continue;
        }
        let is_new = glossary.find_character(&name).is_none();
        if is_new {
            let gender = raw
                .gender
                .as_deref()
                .map(Gender::from_label)
                .filter(|g| *g != Gender::Unknown);
            update.new_characters.push(NewCharacter {
                original_name: name.clone(),
                translated_name: non_empty(raw.translated_name),
                gender,
                description: raw.description.trim().to_string(),
                aliases: raw.aliases,
                first_appearance: None,
                is_main_character: raw.is_main_character,
            });
        }
        characters.push(ExtractedEntity { name, is_new });
    }

    seen.clear();
    let mut locations = Vec::new();
    for raw in response.locations {
        let name = raw.name.trim().to_string();
        if name.is_empty() || !first_mention(&mut seen, &name) {
            continue;
        }
        let is_new = glossary.find_location(&name).is_none();
        if is_new {
            update.new_locations.push(NewLocation {
                original_name: name.clone(),
                translated_name: non_empty(raw.translated_name),
                description: raw.description.trim().to_string(),
                location_type: raw
                    .location_type
                    .as_deref()
                    .map(LocationType::from_label)
                    .unwrap_or_default(),
            });
        }
        locations.push(ExtractedEntity { name, is_new });
    }

    seen.clear();
    let mut terms = Vec::new();
    for raw in response.terms {
        let name = raw.term.trim().to_string();
        if name.is_empty() || !first_mention(&mut seen, &name) {
            continue;
        }
        let is_new = glossary.find_term(&name).is_none();
        if is_new {
            update.new_terms.push(NewTerm {
                original_term: name.clone(),
                translated_term: non_empty(raw.translated),
                category: raw
                    .category
                    .as_deref()
                    .map(TermCategory::from_label)
                    .unwrap_or_default(),
                description: raw.description.trim().to_string(),
                context: non_empty(raw.context),
            });
        }
        terms.push(ExtractedEntity { name, is_new });
    }

    AnalysisResult {
        characters,
        locations,
        terms,
        glossary_update: update,
        chapter_title: non_empty(response.chapter_title),
        summary: response.summary.trim().to_string(),
        key_events: response.key_events,
        active_characters: response.active_characters,
        current_location: non_empty(response.current_location),
        mood: non_empty(response.mood),
        open_plot_threads: response.open_plot_threads,
        style_notes: response.style_notes,
    }
}

/// 执行分析阶段，错误收进报告而不是向上抛
pub(crate) async fn run(
    model: &dyn LanguageModelPort,
    context: &AgentContext,
    config: &TranslationConfig,
    max_output_tokens: Option<u32>,
    chapter_number: u32,
    text: &str,
) -> StageReport<AnalysisResult> {
    let started = Instant::now();
    let glossary_text = context.glossary.to_prompt_text();
    let messages = prompts::analysis_messages(context, &glossary_text, chapter_number, text);
    let options = CompletionOptions {
        temperature: Some(config.analysis_temperature),
        max_tokens: max_output_tokens,
        ..Default::default()
    };

    let result = with_retry(&config.retry, Stage::Analyze, || {
        model.complete_structured::<AnalysisResponse>(&messages, &options)
    })
    .await;

    match result {
        Ok(structured) => {
            let tokens = u64::from(structured.usage.total_tokens);
            let analysis = classify(&context.glossary, structured.value);
            tracing::info!(
                chapter = chapter_number,
                characters = analysis.characters.len(),
                new_characters = analysis.glossary_update.new_characters.len(),
                new_locations = analysis.glossary_update.new_locations.len(),
                new_terms = analysis.glossary_update.new_terms.len(),
                tokens,
                "Analysis completed"
            );
            StageReport::succeeded(analysis, tokens, started)
        }
        Err(e) => {
            let tokens = match &e {
                crate::application::ports::ProviderError::Parse { usage, .. } => {
                    u64::from(usage.total_tokens)
                }
                _ => 0,
            };
            tracing::warn!(chapter = chapter_number, error = %e, "Analysis failed");
            StageReport::failed(PipelineError::from(e), tokens, started)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::glossary::NewCharacter;

    fn response(json: &str) -> AnalysisResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_liam_is_new_john_is_known() {
        let mut glossary = Glossary::new();
        glossary.add_character(NewCharacter::named("John")).unwrap();

        let result = classify(
            &glossary,
            response(
                r#"{"characters": [
                    {"name": "Liam", "gender": "male"},
                    {"name": "john"}
                ]}"#,
            ),
        );

        let liam = result.characters.iter().find(|c| c.name == "Liam").unwrap();
        let john = result.characters.iter().find(|c| c.name == "john").unwrap();
        assert!(liam.is_new);
        assert!(!john.is_new);
        assert_eq!(result.glossary_update.new_characters.len(), 1);
        assert_eq!(result.glossary_update.new_characters[0].original_name, "Liam");
        assert_eq!(result.glossary_update.new_characters[0].gender, Some(Gender::Male));
        assert_eq!(result.new_character_names().collect::<Vec<_>>(), vec!["Liam"]);
    }

    #[test]
    fn test_alias_match_counts_as_known() {
        let mut glossary = Glossary::new();
        let mut john = NewCharacter::named("John");
        john.aliases = vec!["Johnny".to_string()];
        glossary.add_character(john).unwrap();

        let result = classify(&glossary, response(r#"{"characters": [{"name": "JOHNNY"}]}"#));
        assert!(!result.characters[0].is_new);
        assert!(result.glossary_update.is_empty());
    }

    #[test]
    fn test_duplicates_and_blanks_dropped() {
        let result = classify(
            &Glossary::new(),
            response(
                r#"{
                    "characters": [{"name": "Mira"}, {"name": "MIRA"}, {"name": "  "}],
                    "locations": [{"name": "Old Harbor", "type": "town"}],
                    "terms": [{"term": "aether", "category": "spell", "translated": "эфир"}],
                    "mood": "  ",
                    "summary": " Mira reaches the harbor. "
                }"#,
            ),
        );
        assert_eq!(result.characters.len(), 1);
        assert_eq!(result.glossary_update.new_characters.len(), 1);
        assert_eq!(
            result.glossary_update.new_locations[0].location_type,
            LocationType::City
        );
        assert_eq!(result.glossary_update.new_terms[0].category, TermCategory::Magic);
        assert_eq!(
            result.glossary_update.new_terms[0].translated_term.as_deref(),
            Some("эфир")
        );
        assert_eq!(result.mood, None);
        assert_eq!(result.summary, "Mira reaches the harbor.");
    }

    #[test]
    fn test_unknown_gender_left_unresolved() {
        let result = classify(
            &Glossary::new(),
            response(r#"{"characters": [{"name": "Sam", "gender": "unknown"}]}"#),
        );
        assert_eq!(result.glossary_update.new_characters[0].gender, None);
    }
}
