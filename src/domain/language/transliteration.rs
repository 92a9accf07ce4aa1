//! 名字映射
//!
//! 把源语言（英文）人名转换为目标语言（俄语）写法:
//! 1. 先查常见名字词典（精确匹配）
//! 2. 未命中时逐字母音译，优先匹配双字母组合
//!
//! 结果交给变格引擎生成六格形式。

use super::inflection::{decline, CaseSet, Gender};

/// 常见名字词典: (源写法, 目标写法, 性别)
const KNOWN_NAMES: &[(&str, &str, Gender)] = &[
    ("Adam", "Адам", Gender::Male),
    ("Alexander", "Александр", Gender::Male),
    ("Alice", "Элис", Gender::Female),
    ("Amelia", "Амелия", Gender::Female),
    ("Andrew", "Эндрю", Gender::Male),
    ("Anna", "Анна", Gender::Female),
    ("Anne", "Энн", Gender::Female),
    ("Arthur", "Артур", Gender::Male),
    ("Ben", "Бен", Gender::Male),
    ("Benjamin", "Бенджамин", Gender::Male),
    ("Catherine", "Кэтрин", Gender::Female),
    ("Charles", "Чарльз", Gender::Male),
    ("Charlotte", "Шарлотта", Gender::Female),
    ("Chloe", "Хлоя", Gender::Female),
    ("Daniel", "Дэниел", Gender::Male),
    ("David", "Дэвид", Gender::Male),
    ("Edward", "Эдвард", Gender::Male),
    ("Elena", "Елена", Gender::Female),
    ("Elizabeth", "Элизабет", Gender::Female),
    ("Emily", "Эмили", Gender::Female),
    ("Emma", "Эмма", Gender::Female),
    ("Ethan", "Итан", Gender::Male),
    ("Eva", "Ева", Gender::Female),
    ("George", "Джордж", Gender::Male),
    ("Grace", "Грейс", Gender::Female),
    ("Harry", "Гарри", Gender::Male),
    ("Helen", "Хелен", Gender::Female),
    ("Henry", "Генри", Gender::Male),
    ("Isabella", "Изабелла", Gender::Female),
    ("Ivan", "Иван", Gender::Male),
    ("Jack", "Джек", Gender::Male),
    ("James", "Джеймс", Gender::Male),
    ("Jane", "Джейн", Gender::Female),
    ("Jessica", "Джессика", Gender::Female),
    ("John", "Джон", Gender::Male),
    ("Joseph", "Джозеф", Gender::Male),
    ("Kate", "Кейт", Gender::Female),
    ("Leo", "Лео", Gender::Male),
    ("Liam", "Лиам", Gender::Male),
    ("Lily", "Лили", Gender::Female),
    ("Lucas", "Лукас", Gender::Male),
    ("Lucy", "Люси", Gender::Female),
    ("Margaret", "Маргарет", Gender::Female),
    ("Maria", "Мария", Gender::Female),
    ("Mark", "Марк", Gender::Male),
    ("Mary", "Мэри", Gender::Female),
    ("Matthew", "Мэттью", Gender::Male),
    ("Max", "Макс", Gender::Male),
    ("Mia", "Миа", Gender::Female),
    ("Michael", "Майкл", Gender::Male),
    ("Nick", "Ник", Gender::Male),
    ("Noah", "Ноа", Gender::Male),
    ("Oliver", "Оливер", Gender::Male),
    ("Olivia", "Оливия", Gender::Female),
    ("Paul", "Пол", Gender::Male),
    ("Peter", "Питер", Gender::Male),
    ("Richard", "Ричард", Gender::Male),
    ("Robert", "Роберт", Gender::Male),
    ("Sam", "Сэм", Gender::Male),
    ("Sarah", "Сара", Gender::Female),
    ("Sophia", "София", Gender::Female),
    ("Sophie", "Софи", Gender::Female),
    ("Thomas", "Томас", Gender::Male),
    ("Tom", "Том", Gender::Male),
    ("Victoria", "Виктория", Gender::Female),
    ("William", "Уильям", Gender::Male),
];

/// 双字母组合，优先于单字母匹配
const DIGRAPHS: &[(&str, &str)] = &[
    ("sh", "ш"),
    ("ch", "ч"),
    ("th", "т"),
    ("ph", "ф"),
    ("kh", "х"),
    ("zh", "ж"),
    ("ts", "ц"),
    ("ck", "к"),
    ("qu", "кв"),
    ("wh", "у"),
    ("ee", "и"),
    ("oo", "у"),
    ("ea", "и"),
    ("ya", "я"),
    ("yu", "ю"),
    ("yo", "ё"),
    ("ye", "е"),
    ("ai", "ай"),
    ("ay", "эй"),
    ("ey", "ей"),
    ("ie", "и"),
    ("ou", "у"),
    ("oy", "ой"),
];

fn single(ch: char) -> Option<&'static str> {
    let mapped = match ch {
        'a' => "а",
        'b' => "б",
        'c' => "к",
        'd' => "д",
        'e' => "е",
        'f' => "ф",
        'g' => "г",
        'h' => "х",
        'i' => "и",
        'j' => "дж",
        'k' => "к",
        'l' => "л",
        'm' => "м",
        'n' => "н",
        'o' => "о",
        'p' => "п",
        'q' => "к",
        'r' => "р",
        's' => "с",
        't' => "т",
        'u' => "у",
        'v' => "в",
        'w' => "у",
        'x' => "кс",
        'y' => "и",
        'z' => "з",
        _ => return None,
    };
    Some(mapped)
}

#[inline]
fn is_latin_vowel(ch: char) -> bool {
    matches!(ch.to_ascii_lowercase(), 'a' | 'e' | 'i' | 'o' | 'u' | 'y')
}

/// 名字映射结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameForms {
    pub surface: String,
    pub cases: CaseSet,
    pub gender: Gender,
}

/// 查询词典（精确匹配）
pub fn lookup_known(name: &str) -> Option<(&'static str, Gender)> {
    KNOWN_NAMES
        .iter()
        .find(|(source, _, _)| *source == name)
        .map(|(_, target, gender)| (*target, *gender))
}

/// 把源语言名字转换为目标语言写法
///
/// 整体先查词典；多词名字逐词处理，每个词同样先查词典。
pub fn transliterate(source_name: &str) -> String {
    let trimmed = source_name.trim();
    if let Some((target, _)) = lookup_known(trimmed) {
        return target.to_string();
    }

    let mut out = String::with_capacity(trimmed.len() * 2);
    let mut word = String::new();
    for ch in trimmed.chars() {
        if ch.is_alphabetic() || ch == '\'' {
            word.push(ch);
        } else {
            flush_word(&mut word, &mut out);
            out.push(ch);
        }
    }
    flush_word(&mut word, &mut out);
    out
}

fn flush_word(word: &mut String, out: &mut String) {
    if word.is_empty() {
        return;
    }
    match lookup_known(word) {
        Some((target, _)) => out.push_str(target),
        None => out.push_str(&transliterate_word(word)),
    }
    word.clear();
}

/// 逐字母音译单个词，保留每个位置的大小写
fn transliterate_word(word: &str) -> String {
    let chars: Vec<char> = word.chars().filter(|c| *c != '\'').collect();
    let n = chars.len();
    let mut out = String::new();
    let mut i = 0;

    while i < n {
        let upper = chars[i].is_uppercase();

        // 词尾不发音的 e: Blake -> Блак
        if i == n - 1 && n > 3 && chars[i].to_ascii_lowercase() == 'e' && !is_latin_vowel(chars[i - 1]) {
            break;
        }

        let digraph = if i + 1 < n {
            let pair = chars[i..i + 2].iter().collect::<String>().to_lowercase();
            DIGRAPHS.iter().find(|(src, _)| *src == pair).map(|(_, target)| *target)
        } else {
            None
        };

        let (text, step) = match digraph {
            Some(target) => (target.to_string(), 2),
            None => {
                let lower = chars[i].to_lowercase().next().unwrap_or(chars[i]);
                match single(lower) {
                    // 词首的 e 读作 э
                    Some(_) if lower == 'e' && i == 0 => ("э".to_string(), 1),
                    Some(target) => (target.to_string(), 1),
                    None => (chars[i].to_string(), 1),
                }
            }
        };

        if upper {
            out.push_str(&capitalize(&text));
        } else {
            out.push_str(&text);
        }
        i += step;
    }
    out
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// 推断名字的性别
///
/// 顺序: 显式给出的已知性别 -> 词典 -> 词尾启发式 -> 默认阳性
pub fn resolve_gender(source_name: &str, target_name: &str, given: Option<Gender>) -> Gender {
    if let Some(gender) = given {
        if gender != Gender::Unknown {
            return gender;
        }
    }

    let first_word = source_name.split_whitespace().next().unwrap_or(source_name);
    if let Some((_, gender)) = lookup_known(source_name.trim()).or_else(|| lookup_known(first_word)) {
        return gender;
    }

    let source = first_word.to_lowercase();
    const FEMININE_ENDINGS: &[&str] = &["a", "ia", "ie", "ette", "elle", "ine"];
    if FEMININE_ENDINGS.iter().any(|e| source.ends_with(e)) {
        return Gender::Female;
    }

    let target_first = target_name
        .split_whitespace()
        .next()
        .unwrap_or(target_name)
        .to_lowercase();
    if target_first.ends_with('а') || target_first.ends_with('я') {
        return Gender::Female;
    }

    Gender::Male
}

/// 名字映射 + 变格
pub fn translate_and_decline(name: &str, gender: Option<Gender>) -> NameForms {
    let surface = transliterate(name);
    let gender = resolve_gender(name, &surface, gender);
    let cases = decline(&surface, gender, None);
    NameForms {
        surface,
        cases,
        gender,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dictionary_hit() {
        assert_eq!(transliterate("John"), "Джон");
        assert_eq!(transliterate("Mary"), "Мэри");
    }

    #[test]
    fn test_dictionary_is_exact_match() {
        // 小写不会命中词典，走逐字母音译
        assert_eq!(transliterate("john"), "джохн");
    }

    #[test]
    fn test_digraphs_preferred() {
        assert_eq!(transliterate("Shelby"), "Шелби");
        assert_eq!(transliterate("Zhukov"), "Жуков");
        assert_eq!(transliterate("Chester"), "Честер");
    }

    #[test]
    fn test_capitalization_preserved_per_position() {
        assert_eq!(transliterate("MacDonald"), "МакДоналд");
    }

    #[test]
    fn test_initial_e_and_silent_e() {
        assert_eq!(transliterate("Edgar"), "Эдгар");
        assert_eq!(transliterate("Blake"), "Блак");
    }

    #[test]
    fn test_multi_word_uses_dictionary_per_word() {
        assert_eq!(transliterate("John Brandon"), "Джон Брандон");
    }

    #[test]
    fn test_non_latin_passes_through() {
        assert_eq!(transliterate("Иван"), "Иван");
    }

    #[test]
    fn test_resolve_gender() {
        assert_eq!(resolve_gender("Xander", "Ксандер", None), Gender::Male);
        assert_eq!(resolve_gender("Rosalind", "Розалинд", None), Gender::Male);
        assert_eq!(resolve_gender("Brianna", "Брианна", None), Gender::Female);
        assert_eq!(resolve_gender("Mary", "Мэри", None), Gender::Female);
        assert_eq!(resolve_gender("Mary", "Мэри", Some(Gender::Unknown)), Gender::Female);
        assert_eq!(resolve_gender("Kim", "Ким", Some(Gender::Female)), Gender::Female);
    }

    #[test]
    fn test_biblical_ah_names_stay_male() {
        for name in ["Jonah", "Micah", "Elijah"] {
            let forms = translate_and_decline(name, None);
            assert_eq!(forms.gender, Gender::Male, "{}", name);
        }
        assert_eq!(translate_and_decline("Jonah", None).surface, "Джонах");
    }

    #[test]
    fn test_translate_and_decline() {
        let forms = translate_and_decline("Liam", None);
        assert_eq!(forms.surface, "Лиам");
        assert_eq!(forms.gender, Gender::Male);
        assert_eq!(forms.cases.genitive, "Лиама");
        assert_eq!(forms.cases.instrumental, "Лиамом");

        let forms = translate_and_decline("Brianna", None);
        assert_eq!(forms.gender, Gender::Female);
        assert_eq!(forms.cases.genitive, "Брианны");
    }
}
