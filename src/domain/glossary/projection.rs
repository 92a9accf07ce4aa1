//! 术语表的文本投影
//!
//! 嵌入模型提示词的行式文本。翻译阶段依赖模型解析这段文本，
//! 格式需保持稳定:
//!
//! ```text
//! [CHARACTERS]
//! - John => Джон (male) | gen: Джона | dat: Джону | aliases: Johnny | main
//! [LOCATIONS]
//! - London => Лондон (city)
//! [TERMS]
//! - mana => мана (magic)
//! ```

use std::fmt::Write;

use super::{Character, Glossary, Location, Term};

/// 每个条目必须占一行：折叠字段内的换行与连续空白
fn one_line(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn character_line(c: &Character) -> String {
    let mut line = format!(
        "- {} => {} ({}) | gen: {} | dat: {}",
        one_line(&c.original_name),
        one_line(&c.translated_name),
        c.gender.as_str(),
        one_line(&c.declensions.genitive),
        one_line(&c.declensions.dative)
    );
    if !c.aliases.is_empty() {
        let aliases: Vec<String> = c.aliases.iter().map(|a| one_line(a)).collect();
        let _ = write!(line, " | aliases: {}", aliases.join(", "));
    }
    if c.is_main_character {
        line.push_str(" | main");
    }
    if !c.description.trim().is_empty() {
        let _ = write!(line, " | note: {}", one_line(&c.description));
    }
    line
}

fn location_line(l: &Location) -> String {
    let mut line = format!(
        "- {} => {} ({})",
        one_line(&l.original_name),
        one_line(&l.translated_name),
        l.location_type.as_str()
    );
    if !l.description.trim().is_empty() {
        let _ = write!(line, " | note: {}", one_line(&l.description));
    }
    line
}

fn term_line(t: &Term) -> String {
    let mut line = format!(
        "- {} => {} ({})",
        one_line(&t.original_term),
        one_line(&t.translated_term),
        t.category.as_str()
    );
    if !t.description.trim().is_empty() {
        let _ = write!(line, " | note: {}", one_line(&t.description));
    }
    line
}

fn render<'a>(
    characters: impl Iterator<Item = &'a Character>,
    locations: impl Iterator<Item = &'a Location>,
    terms: impl Iterator<Item = &'a Term>,
) -> String {
    let mut lines: Vec<String> = Vec::new();

    let characters: Vec<String> = characters.map(character_line).collect();
    if !characters.is_empty() {
        lines.push("[CHARACTERS]".to_string());
        lines.extend(characters);
    }

    let locations: Vec<String> = locations.map(location_line).collect();
    if !locations.is_empty() {
        lines.push("[LOCATIONS]".to_string());
        lines.extend(locations);
    }

    let terms: Vec<String> = terms.map(term_line).collect();
    if !terms.is_empty() {
        lines.push("[TERMS]".to_string());
        lines.extend(terms);
    }

    lines.join("\n")
}

impl Glossary {
    /// 完整投影；空术语表得到空字符串
    pub fn to_prompt_text(&self) -> String {
        render(
            self.characters().iter(),
            self.locations().iter(),
            self.terms().iter(),
        )
    }

    /// 只投影在 `source_text` 中出现过的条目（主角总是保留）
    pub fn to_prompt_text_for(&self, source_text: &str) -> String {
        let haystack = source_text.to_lowercase();
        let mentioned = |name: &str| !name.is_empty() && haystack.contains(&name.to_lowercase());

        render(
            self.characters().iter().filter(|c| {
                c.is_main_character
                    || mentioned(&c.original_name)
                    || c.aliases.iter().any(|a| mentioned(a))
            }),
            self.locations().iter().filter(|l| mentioned(&l.original_name)),
            self.terms().iter().filter(|t| mentioned(&t.original_term)),
        )
    }
}
