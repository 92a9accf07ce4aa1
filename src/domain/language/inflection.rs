//! 变格引擎
//!
//! 为目标语言（俄语）的专有名词生成六个格的形式。
//! 按词尾和语法性别选择变格模式，每种模式对应一个纯函数变换；
//! 无法识别或变换失败时，各格退回原形。

use serde::{Deserialize, Serialize};

/// 语法性别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
    Neutral,
    #[default]
    Unknown,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Neutral => "neutral",
            Gender::Unknown => "unknown",
        }
    }

    /// 宽松解析模型输出中的性别标签
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "male" | "m" | "man" | "masculine" | "he" => Gender::Male,
            "female" | "f" | "woman" | "feminine" | "she" => Gender::Female,
            "neutral" | "neuter" | "n" | "it" => Gender::Neutral,
            _ => Gender::Unknown,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Gender::Male | Gender::Female)
    }
}

/// 语法格
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Case {
    Nominative,
    Genitive,
    Dative,
    Accusative,
    Instrumental,
    Prepositional,
}

impl Case {
    pub const ALL: [Case; 6] = [
        Case::Nominative,
        Case::Genitive,
        Case::Dative,
        Case::Accusative,
        Case::Instrumental,
        Case::Prepositional,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Case::Nominative => "nominative",
            Case::Genitive => "genitive",
            Case::Dative => "dative",
            Case::Accusative => "accusative",
            Case::Instrumental => "instrumental",
            Case::Prepositional => "prepositional",
        }
    }
}

/// 六格形式集合
///
/// 不变量: 对非空输入，六个字段均非空
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseSet {
    pub nominative: String,
    pub genitive: String,
    pub dative: String,
    pub accusative: String,
    pub instrumental: String,
    pub prepositional: String,
}

impl CaseSet {
    /// 所有格都等于原形（不变格）
    pub fn identity(name: &str) -> Self {
        Self {
            nominative: name.to_string(),
            genitive: name.to_string(),
            dative: name.to_string(),
            accusative: name.to_string(),
            instrumental: name.to_string(),
            prepositional: name.to_string(),
        }
    }

    pub fn get(&self, case: Case) -> &str {
        match case {
            Case::Nominative => &self.nominative,
            Case::Genitive => &self.genitive,
            Case::Dative => &self.dative,
            Case::Accusative => &self.accusative,
            Case::Instrumental => &self.instrumental,
            Case::Prepositional => &self.prepositional,
        }
    }

    pub fn set(&mut self, case: Case, form: impl Into<String>) {
        let slot = match case {
            Case::Nominative => &mut self.nominative,
            Case::Genitive => &mut self.genitive,
            Case::Dative => &mut self.dative,
            Case::Accusative => &mut self.accusative,
            Case::Instrumental => &mut self.instrumental,
            Case::Prepositional => &mut self.prepositional,
        };
        *slot = form.into();
    }

    pub fn iter(&self) -> impl Iterator<Item = (Case, &str)> + '_ {
        Case::ALL.iter().map(move |case| (*case, self.get(*case)))
    }

    pub fn is_complete(&self) -> bool {
        self.iter().all(|(_, form)| !form.is_empty())
    }
}

/// 变格模式
///
/// 由词尾和性别推断，每个变体对应一组固定词尾
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeclensionPattern {
    /// 阳性，以辅音结尾: Джон
    ConsonantMasculine,
    /// 阳性，以 ь / й 结尾: Игорь, Андрей
    SoftMasculine,
    /// 阳性，以 -ий 结尾的名字: Дмитрий
    IyMasculine,
    /// 阳性，形容词型: -ый, -ский, -цкий, -ой (Толстой)
    AdjectivalMasculine,
    /// 以 -а 结尾（阴性或阳性）: Анна, Никита
    AFirst,
    /// 以 -я 结尾: Таня, Мария
    YaFirst,
    /// 阴性，以 ь 结尾: Любовь
    SoftFeminine,
    /// 不变格
    Indeclinable,
}

/// 词尾表: 去掉 `strip` 个字符后依次追加 属格/与格/宾格/工具格/前置格
struct Endings {
    strip: usize,
    genitive: &'static str,
    dative: &'static str,
    accusative: &'static str,
    instrumental: &'static str,
    prepositional: &'static str,
}

/// 保持不变的小写前缀词
const PARTICLES: &[&str] = &[
    "де", "ван", "фон", "дер", "дель", "ла", "ле", "ди", "да", "дю", "ибн", "бен", "de", "van",
    "von", "der", "del", "la", "le", "di", "da", "du",
];

const CYRILLIC_VOWELS: &[char] = &['а', 'е', 'ё', 'и', 'о', 'у', 'ы', 'э', 'ю', 'я'];

#[inline]
fn is_cyrillic(ch: char) -> bool {
    matches!(ch, 'а'..='я' | 'ё' | 'А'..='Я' | 'Ё')
}

#[inline]
fn is_cyrillic_consonant(ch: char) -> bool {
    is_cyrillic(ch) && !CYRILLIC_VOWELS.contains(&ch) && !matches!(ch, 'ь' | 'ъ' | 'й')
}

/// 属格 -ы 在这些字母后写作 -и
#[inline]
fn takes_i_after(ch: char) -> bool {
    matches!(ch, 'г' | 'к' | 'х' | 'ж' | 'ш' | 'щ' | 'ч')
}

/// 工具格 -ой/-ом 在这些字母后写作 -ей/-ем（非重读）
#[inline]
fn takes_e_after(ch: char) -> bool {
    matches!(ch, 'ж' | 'ш' | 'щ' | 'ч' | 'ц')
}

impl DeclensionPattern {
    /// 根据词尾和性别推断模式
    pub fn infer(word: &str, gender: Gender) -> Self {
        let lower = word.to_lowercase();
        let last = match lower.chars().last() {
            Some(ch) if is_cyrillic(ch) => ch,
            _ => return DeclensionPattern::Indeclinable,
        };

        match gender {
            Gender::Male => {
                if lower.ends_with("ый")
                    || lower.ends_with("ский")
                    || lower.ends_with("цкий")
                    || is_adjectival_oy(&lower)
                {
                    DeclensionPattern::AdjectivalMasculine
                } else if lower.ends_with("ий") {
                    DeclensionPattern::IyMasculine
                } else if last == 'ь' || last == 'й' {
                    DeclensionPattern::SoftMasculine
                } else if last == 'а' {
                    DeclensionPattern::AFirst
                } else if last == 'я' {
                    DeclensionPattern::YaFirst
                } else if is_cyrillic_consonant(last) {
                    DeclensionPattern::ConsonantMasculine
                } else {
                    DeclensionPattern::Indeclinable
                }
            }
            Gender::Female => match last {
                'а' => DeclensionPattern::AFirst,
                'я' => DeclensionPattern::YaFirst,
                'ь' => DeclensionPattern::SoftFeminine,
                _ => DeclensionPattern::Indeclinable,
            },
            Gender::Neutral | Gender::Unknown => DeclensionPattern::Indeclinable,
        }
    }

    /// 对单个词应用模式；无法应用时返回 None
    fn apply(&self, word: &str) -> Option<CaseSet> {
        let endings = self.endings(word)?;
        let chars: Vec<char> = word.chars().collect();
        if chars.len() <= endings.strip {
            return None;
        }
        let stem: String = chars[..chars.len() - endings.strip].iter().collect();
        let shout = chars.len() > 1 && chars.iter().all(|c| !c.is_lowercase());
        let form = |suffix: &str| -> String {
            if shout {
                format!("{}{}", stem, suffix.to_uppercase())
            } else {
                format!("{}{}", stem, suffix)
            }
        };

        Some(CaseSet {
            nominative: word.to_string(),
            genitive: form(endings.genitive),
            dative: form(endings.dative),
            accusative: form(endings.accusative),
            instrumental: form(endings.instrumental),
            prepositional: form(endings.prepositional),
        })
    }

    fn endings(&self, word: &str) -> Option<Endings> {
        let lower = word.to_lowercase();
        let chars: Vec<char> = lower.chars().collect();
        let last = *chars.last()?;
        // 去掉词尾后的最后一个字母，用于正字法规则
        let before = |strip: usize| -> Option<char> {
            chars.len().checked_sub(strip + 1).map(|i| chars[i])
        };

        let endings = match self {
            DeclensionPattern::Indeclinable => return None,
            DeclensionPattern::ConsonantMasculine => {
                if !is_cyrillic_consonant(last) {
                    return None;
                }
                Endings {
                    strip: 0,
                    genitive: "а",
                    dative: "у",
                    accusative: "а",
                    instrumental: if takes_e_after(last) { "ем" } else { "ом" },
                    prepositional: "е",
                }
            }
            DeclensionPattern::SoftMasculine => {
                if last != 'ь' && last != 'й' {
                    return None;
                }
                Endings {
                    strip: 1,
                    genitive: "я",
                    dative: "ю",
                    accusative: "я",
                    instrumental: "ем",
                    prepositional: "е",
                }
            }
            DeclensionPattern::IyMasculine => {
                if !lower.ends_with("ий") {
                    return None;
                }
                Endings {
                    strip: 1,
                    genitive: "я",
                    dative: "ю",
                    accusative: "я",
                    instrumental: "ем",
                    prepositional: "и",
                }
            }
            DeclensionPattern::AdjectivalMasculine => {
                if !(lower.ends_with("ый") || lower.ends_with("ий") || is_adjectival_oy(&lower)) {
                    return None;
                }
                let velar = before(2).map(takes_i_after).unwrap_or(false);
                Endings {
                    strip: 2,
                    genitive: "ого",
                    dative: "ому",
                    accusative: "ого",
                    instrumental: if velar || lower.ends_with("ий") { "им" } else { "ым" },
                    prepositional: "ом",
                }
            }
            DeclensionPattern::AFirst => {
                if last != 'а' {
                    return None;
                }
                let prev = before(1)?;
                Endings {
                    strip: 1,
                    genitive: if takes_i_after(prev) { "и" } else { "ы" },
                    dative: "е",
                    accusative: "у",
                    instrumental: if takes_e_after(prev) { "ей" } else { "ой" },
                    prepositional: "е",
                }
            }
            DeclensionPattern::YaFirst => {
                if last != 'я' {
                    return None;
                }
                let iya = lower.ends_with("ия");
                Endings {
                    strip: 1,
                    genitive: "и",
                    dative: if iya { "и" } else { "е" },
                    accusative: "ю",
                    instrumental: "ей",
                    prepositional: if iya { "и" } else { "е" },
                }
            }
            DeclensionPattern::SoftFeminine => {
                if last != 'ь' {
                    return None;
                }
                Endings {
                    strip: 1,
                    genitive: "и",
                    dative: "и",
                    accusative: "ь",
                    instrumental: "ью",
                    prepositional: "и",
                }
            }
        };
        Some(endings)
    }
}

/// 对名字进行变格
///
/// 多词名字逐词变格（同一性别），小写的前缀词保持不变。
/// 显式给出 `pattern` 时对每个词使用该模式；否则按词推断。
/// 任何一个词变换失败时，该词在各格中保持原形。
pub fn decline(name: &str, gender: Gender, pattern: Option<DeclensionPattern>) -> CaseSet {
    if name.trim().is_empty() {
        return CaseSet::identity(name);
    }

    let mut result = CaseSet {
        nominative: String::new(),
        genitive: String::new(),
        dative: String::new(),
        accusative: String::new(),
        instrumental: String::new(),
        prepositional: String::new(),
    };

    for token in tokenize(name) {
        let forms = match token {
            Token::Separator(sep) => CaseSet::identity(sep),
            Token::Word(word) => decline_word(word, gender, pattern),
        };
        for case in Case::ALL {
            let mut slot = result.get(case).to_string();
            slot.push_str(forms.get(case));
            result.set(case, slot);
        }
    }

    result.nominative = name.to_string();
    if result.is_complete() {
        result
    } else {
        CaseSet::identity(name)
    }
}

fn decline_word(word: &str, gender: Gender, pattern: Option<DeclensionPattern>) -> CaseSet {
    if PARTICLES.contains(&word) {
        return CaseSet::identity(word);
    }
    let pattern = pattern.unwrap_or_else(|| DeclensionPattern::infer(word, gender));
    pattern
        .apply(word)
        .unwrap_or_else(|| CaseSet::identity(word))
}

enum Token<'a> {
    Word(&'a str),
    Separator(&'a str),
}

/// 按空白和连字符切分，保留分隔符
fn tokenize(name: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut start = 0;
    let mut in_word = false;

    for (i, ch) in name.char_indices() {
        let is_sep = ch.is_whitespace() || ch == '-';
        if is_sep && in_word {
            tokens.push(Token::Word(&name[start..i]));
            start = i;
            in_word = false;
        } else if !is_sep && !in_word {
            if i > start {
                tokens.push(Token::Separator(&name[start..i]));
            }
            start = i;
            in_word = true;
        }
    }
    if start < name.len() {
        let tail = &name[start..];
        if in_word {
            tokens.push(Token::Word(tail));
        } else {
            tokens.push(Token::Separator(tail));
        }
    }
    tokens
}

/// 重音词尾 -ой 的形容词型姓氏；Рой、Гой 这类短词仍按软辅音处理
fn is_adjectival_oy(lower: &str) -> bool {
    lower.ends_with("ой") && lower.chars().count() > 4
}
