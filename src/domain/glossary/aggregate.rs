//! Glossary Context - Aggregate Root

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{
    ApplyReport, Character, CharacterPatch, EntityId, GlossaryError, GlossaryUpdate, Location,
    LocationPatch, NewCharacter, NewLocation, NewTerm, Term, TermPatch,
};
use crate::domain::language::{
    decline, resolve_gender, translate_and_decline, transliterate, CaseSet, Gender,
};

/// Glossary 聚合根
///
/// 不变量:
/// - 人物的原名与别名在整个术语表内唯一（忽略大小写）
/// - 地点原名、术语原文唯一（忽略大小写）
/// - 每次产生变更的调用（包括批量）version 恰好加一
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Glossary {
    characters: Vec<Character>,
    locations: Vec<Location>,
    terms: Vec<Term>,
    version: u64,
    updated_at: DateTime<Utc>,
}

impl Default for Glossary {
    fn default() -> Self {
        Self::new()
    }
}

fn same(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// 计算人物的译名、性别和六格
fn character_forms(original: &str, translated: Option<&str>, gender: Option<Gender>) -> (String, Gender, CaseSet) {
    match non_empty(translated) {
        Some(translated) => {
            let gender = resolve_gender(original, translated, gender);
            let cases = decline(translated, gender, None);
            (translated.to_string(), gender, cases)
        }
        None => {
            let forms = translate_and_decline(original, gender);
            (forms.surface, forms.gender, forms.cases)
        }
    }
}

impl Glossary {
    pub fn new() -> Self {
        Self {
            characters: Vec::new(),
            locations: Vec::new(),
            terms: Vec::new(),
            version: 0,
            updated_at: Utc::now(),
        }
    }

    // Getters
    pub fn characters(&self) -> &[Character] {
        &self.characters
    }

    pub fn locations(&self) -> &[Location] {
        &self.locations
    }

    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn is_empty(&self) -> bool {
        self.characters.is_empty() && self.locations.is_empty() && self.terms.is_empty()
    }

    fn touch(&mut self) {
        self.version += 1;
        self.updated_at = Utc::now();
    }

    // ------------------------------------------------------------------
    // 人物
    // ------------------------------------------------------------------

    fn character_index(&self, name: &str) -> Option<usize> {
        self.characters.iter().position(|c| c.answers_to(name))
    }

    fn character_index_by_id(&self, id: &EntityId) -> Option<usize> {
        self.characters.iter().position(|c| &c.id == id)
    }

    /// 按原名或别名查找人物（忽略大小写）
    pub fn find_character(&self, name: &str) -> Option<&Character> {
        self.character_index(name).map(|i| &self.characters[i])
    }

    pub fn get_character(&self, id: &EntityId) -> Option<&Character> {
        self.character_index_by_id(id).map(|i| &self.characters[i])
    }

    /// 添加人物（幂等）
    ///
    /// 原名或别名已存在时直接返回已有条目，不做修改，version 不变。
    /// 新别名已属于其他人物时返回 `NameConflict`，不添加。
    pub fn add_character(&mut self, new: NewCharacter) -> Result<&Character, GlossaryError> {
        let (index, created) = self.insert_character(new, true)?;
        if created {
            self.touch();
        }
        Ok(&self.characters[index])
    }

    /// `strict_aliases` 为 false 时冲突别名被丢弃，人物照常添加
    fn insert_character(
        &mut self,
        new: NewCharacter,
        strict_aliases: bool,
    ) -> Result<(usize, bool), GlossaryError> {
        let original = new.original_name.trim();
        if original.is_empty() {
            return Err(GlossaryError::InvalidName(new.original_name.clone()));
        }
        if let Some(index) = self.character_index(original) {
            return Ok((index, false));
        }

        let mut aliases: Vec<String> = Vec::new();
        for alias in new.aliases.iter().map(|a| a.trim()).filter(|a| !a.is_empty()) {
            if same(alias, original) || aliases.iter().any(|a| same(a, alias)) {
                continue;
            }
            if let Some(owner) = self.character_index(alias) {
                if strict_aliases {
                    return Err(GlossaryError::NameConflict {
                        name: alias.to_string(),
                        owner: self.characters[owner].original_name.clone(),
                    });
                }
                tracing::debug!(alias = %alias, character = %original, "Alias already taken, dropped");
                continue;
            }
            aliases.push(alias.to_string());
        }

        let (translated_name, gender, declensions) =
            character_forms(original, new.translated_name.as_deref(), new.gender);

        self.characters.push(Character {
            id: EntityId::new(),
            original_name: original.to_string(),
            translated_name,
            declensions,
            gender,
            description: new.description.trim().to_string(),
            aliases,
            first_appearance: new.first_appearance,
            is_main_character: new.is_main_character,
        });

        tracing::debug!(character = %original, "Character added to glossary");
        Ok((self.characters.len() - 1, true))
    }

    /// 修改人物
    ///
    /// 译名或性别变化时整套六格重新计算，之后再应用单格覆盖；
    /// 未提及的格保持原值。
    pub fn update_character(
        &mut self,
        id: &EntityId,
        patch: CharacterPatch,
    ) -> Result<&Character, GlossaryError> {
        let index = self
            .character_index_by_id(id)
            .ok_or_else(|| GlossaryError::NotFound(id.clone()))?;
        if self.patch_character(index, patch)? {
            self.touch();
        }
        Ok(&self.characters[index])
    }

    fn patch_character(&mut self, index: usize, patch: CharacterPatch) -> Result<bool, GlossaryError> {
        // 先校验别名，避免部分修改
        let mut new_aliases: Vec<String> = Vec::new();
        for alias in patch.add_aliases.iter().map(|a| a.trim()).filter(|a| !a.is_empty()) {
            match self.character_index(alias) {
                Some(owner) if owner != index => {
                    return Err(GlossaryError::NameConflict {
                        name: alias.to_string(),
                        owner: self.characters[owner].original_name.clone(),
                    });
                }
                Some(_) => continue,
                None => {
                    if !new_aliases.iter().any(|a| same(a, alias)) {
                        new_aliases.push(alias.to_string());
                    }
                }
            }
        }

        let character = &mut self.characters[index];
        let mut changed = false;

        let translation = non_empty(patch.translated_name.as_deref())
            .filter(|t| *t != character.translated_name)
            .map(str::to_string);
        let gender = patch.gender.filter(|g| *g != character.gender);

        if translation.is_some() || gender.is_some() {
            let translated = translation.unwrap_or_else(|| character.translated_name.clone());
            let gender = gender.unwrap_or(character.gender);
            character.declensions = decline(&translated, gender, None);
            character.translated_name = translated;
            character.gender = gender;
            changed = true;
        }

        for (case, form) in patch.case_overrides.entries() {
            if character.declensions.get(case) != form {
                character.declensions.set(case, form);
                changed = true;
            }
        }

        if let Some(description) = patch.description {
            if description != character.description {
                character.description = description;
                changed = true;
            }
        }

        if let Some(is_main) = patch.is_main_character {
            if is_main != character.is_main_character {
                character.is_main_character = is_main;
                changed = true;
            }
        }

        if !new_aliases.is_empty() {
            character.aliases.extend(new_aliases);
            changed = true;
        }

        Ok(changed)
    }

    // ------------------------------------------------------------------
    // 地点
    // ------------------------------------------------------------------

    fn location_index(&self, name: &str) -> Option<usize> {
        self.locations.iter().position(|l| same(&l.original_name, name))
    }

    pub fn find_location(&self, name: &str) -> Option<&Location> {
        self.location_index(name).map(|i| &self.locations[i])
    }

    /// 添加地点（幂等）
    pub fn add_location(&mut self, new: NewLocation) -> Result<&Location, GlossaryError> {
        let (index, created) = self.insert_location(new)?;
        if created {
            self.touch();
        }
        Ok(&self.locations[index])
    }

    fn insert_location(&mut self, new: NewLocation) -> Result<(usize, bool), GlossaryError> {
        let original = new.original_name.trim();
        if original.is_empty() {
            return Err(GlossaryError::InvalidName(new.original_name.clone()));
        }
        if let Some(index) = self.location_index(original) {
            return Ok((index, false));
        }

        let translated_name = non_empty(new.translated_name.as_deref())
            .map(str::to_string)
            .unwrap_or_else(|| transliterate(original));

        self.locations.push(Location {
            id: EntityId::new(),
            original_name: original.to_string(),
            translated_name,
            description: new.description.trim().to_string(),
            location_type: new.location_type,
        });
        Ok((self.locations.len() - 1, true))
    }

    pub fn update_location(
        &mut self,
        id: &EntityId,
        patch: LocationPatch,
    ) -> Result<&Location, GlossaryError> {
        let index = self
            .locations
            .iter()
            .position(|l| &l.id == id)
            .ok_or_else(|| GlossaryError::NotFound(id.clone()))?;
        if self.patch_location(index, patch) {
            self.touch();
        }
        Ok(&self.locations[index])
    }

    fn patch_location(&mut self, index: usize, patch: LocationPatch) -> bool {
        let location = &mut self.locations[index];
        let mut changed = false;

        if let Some(translated) = non_empty(patch.translated_name.as_deref()) {
            if translated != location.translated_name {
                location.translated_name = translated.to_string();
                changed = true;
            }
        }
        if let Some(description) = patch.description {
            if description != location.description {
                location.description = description;
                changed = true;
            }
        }
        if let Some(location_type) = patch.location_type {
            if location_type != location.location_type {
                location.location_type = location_type;
                changed = true;
            }
        }
        changed
    }

    // ------------------------------------------------------------------
    // 术语
    // ------------------------------------------------------------------

    fn term_index(&self, term: &str) -> Option<usize> {
        self.terms.iter().position(|t| same(&t.original_term, term))
    }

    pub fn find_term(&self, term: &str) -> Option<&Term> {
        self.term_index(term).map(|i| &self.terms[i])
    }

    /// 添加术语（幂等）
    pub fn add_term(&mut self, new: NewTerm) -> Result<&Term, GlossaryError> {
        let (index, created) = self.insert_term(new)?;
        if created {
            self.touch();
        }
        Ok(&self.terms[index])
    }

    fn insert_term(&mut self, new: NewTerm) -> Result<(usize, bool), GlossaryError> {
        let original = new.original_term.trim();
        if original.is_empty() {
            return Err(GlossaryError::InvalidName(new.original_term.clone()));
        }
        if let Some(index) = self.term_index(original) {
            return Ok((index, false));
        }

        // 术语不是人名，缺省译文保留原文
        let translated_term = non_empty(new.translated_term.as_deref())
            .unwrap_or(original)
            .to_string();

        self.terms.push(Term {
            id: EntityId::new(),
            original_term: original.to_string(),
            translated_term,
            category: new.category,
            description: new.description.trim().to_string(),
            context: new.context,
        });
        Ok((self.terms.len() - 1, true))
    }

    pub fn update_term(&mut self, id: &EntityId, patch: TermPatch) -> Result<&Term, GlossaryError> {
        let index = self
            .terms
            .iter()
            .position(|t| &t.id == id)
            .ok_or_else(|| GlossaryError::NotFound(id.clone()))?;
        if self.patch_term(index, patch) {
            self.touch();
        }
        Ok(&self.terms[index])
    }

    fn patch_term(&mut self, index: usize, patch: TermPatch) -> bool {
        let term = &mut self.terms[index];
        let mut changed = false;

        if let Some(translated) = non_empty(patch.translated_term.as_deref()) {
            if translated != term.translated_term {
                term.translated_term = translated.to_string();
                changed = true;
            }
        }
        if let Some(category) = patch.category {
            if category != term.category {
                term.category = category;
                changed = true;
            }
        }
        if let Some(description) = patch.description {
            if description != term.description {
                term.description = description;
                changed = true;
            }
        }
        if patch.context.is_some() && patch.context != term.context {
            term.context = patch.context;
            changed = true;
        }
        changed
    }

    // ------------------------------------------------------------------
    // 批量
    // ------------------------------------------------------------------

    /// 应用一批变更
    ///
    /// 新条目与已有条目冲突时静默跳过；修改找不到目标时同样跳过。
    /// 整批只在确有变更时使 version 加一。
    pub fn apply_update(&mut self, update: &GlossaryUpdate) -> ApplyReport {
        let mut report = ApplyReport::default();

        for new in &update.new_characters {
            match self.insert_character(new.clone(), false) {
                Ok((_, true)) => report.added += 1,
                _ => report.skipped += 1,
            }
        }
        for named in &update.updated_characters {
            match self.character_index(&named.original_name) {
                Some(index) => match self.patch_character(index, named.patch.clone()) {
                    Ok(true) => report.updated += 1,
                    Ok(false) => {}
                    Err(e) => {
                        tracing::debug!(error = %e, "Character update skipped");
                        report.skipped += 1;
                    }
                },
                None => report.skipped += 1,
            }
        }

        for new in &update.new_locations {
            match self.insert_location(new.clone()) {
                Ok((_, true)) => report.added += 1,
                _ => report.skipped += 1,
            }
        }
        for named in &update.updated_locations {
            match self.location_index(&named.original_name) {
                Some(index) => {
                    if self.patch_location(index, named.patch.clone()) {
                        report.updated += 1;
                    }
                }
                None => report.skipped += 1,
            }
        }

        for new in &update.new_terms {
            match self.insert_term(new.clone()) {
                Ok((_, true)) => report.added += 1,
                _ => report.skipped += 1,
            }
        }
        for named in &update.updated_terms {
            match self.term_index(&named.original_name) {
                Some(index) => {
                    if self.patch_term(index, named.patch.clone()) {
                        report.updated += 1;
                    }
                }
                None => report.skipped += 1,
            }
        }

        if report.changed() {
            self.touch();
        }

        tracing::debug!(
            added = report.added,
            updated = report.updated,
            skipped = report.skipped,
            version = self.version,
            "Glossary update applied"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::glossary::{CaseOverrides, NamedPatch};
    use crate::domain::language::Case;

    #[test]
    fn test_add_character_is_idempotent() {
        let mut glossary = Glossary::new();
        let first_id = glossary.add_character(NewCharacter::named("John")).unwrap().id.clone();
        assert_eq!(glossary.version(), 1);

        let second = glossary
            .add_character(NewCharacter::named("john").with_translation("Иоанн"))
            .unwrap();
        assert_eq!(second.id, first_id);
        assert_eq!(second.translated_name, "Джон");
        assert_eq!(glossary.characters().len(), 1);
        assert_eq!(glossary.version(), 1);
    }

    #[test]
    fn test_add_character_derives_declensions() {
        let mut glossary = Glossary::new();
        let character = glossary.add_character(NewCharacter::named("Liam")).unwrap();
        assert_eq!(character.translated_name, "Лиам");
        assert_eq!(character.gender, Gender::Male);
        assert_eq!(character.declensions.dative, "Лиаму");
        assert!(character.declensions.is_complete());
    }

    #[test]
    fn test_add_character_with_supplied_translation() {
        let mut glossary = Glossary::new();
        let character = glossary
            .add_character(
                NewCharacter::named("Natasha")
                    .with_translation("Наташа")
                    .with_gender(Gender::Female),
            )
            .unwrap();
        assert_eq!(character.declensions.genitive, "Наташи");
        assert_eq!(character.declensions.instrumental, "Наташей");
    }

    #[test]
    fn test_conflicting_alias_is_rejected() {
        let mut glossary = Glossary::new();
        let mut john = NewCharacter::named("John");
        john.aliases = vec!["Johnny".to_string()];
        glossary.add_character(john).unwrap();
        let version = glossary.version();

        let mut other = NewCharacter::named("Jonathan");
        other.aliases = vec!["JOHNNY".to_string(), "Jon".to_string()];
        match glossary.add_character(other) {
            Err(GlossaryError::NameConflict { name, owner }) => {
                assert_eq!(name, "JOHNNY");
                assert_eq!(owner, "John");
            }
            other => panic!("expected NameConflict, got {:?}", other),
        }
        assert!(glossary.find_character("Jonathan").is_none());
        assert_eq!(glossary.version(), version);
        assert_eq!(glossary.find_character("johnny").unwrap().original_name, "John");
    }

    #[test]
    fn test_apply_update_drops_conflicting_alias() {
        let mut glossary = Glossary::new();
        let mut john = NewCharacter::named("John");
        john.aliases = vec!["Johnny".to_string()];
        glossary.add_character(john).unwrap();

        let mut other = NewCharacter::named("Jonathan");
        other.aliases = vec!["JOHNNY".to_string(), "Jon".to_string()];
        let update = GlossaryUpdate {
            new_characters: vec![other],
            ..Default::default()
        };
        let report = glossary.apply_update(&update);
        assert_eq!(report.added, 1);

        let jonathan = glossary.find_character(" jon ").unwrap();
        assert_eq!(jonathan.original_name, "Jonathan");
        assert_eq!(jonathan.aliases, vec!["Jon".to_string()]);
        assert_eq!(glossary.find_character("johnny").unwrap().original_name, "John");
    }

    #[test]
    fn test_add_character_by_alias_returns_existing() {
        let mut glossary = Glossary::new();
        let mut john = NewCharacter::named("John");
        john.aliases = vec!["Johnny".to_string()];
        glossary.add_character(john).unwrap();

        let existing = glossary.add_character(NewCharacter::named("Johnny")).unwrap();
        assert_eq!(existing.original_name, "John");
        assert_eq!(glossary.version(), 1);
    }

    #[test]
    fn test_empty_name_rejected() {
        let mut glossary = Glossary::new();
        assert!(matches!(
            glossary.add_character(NewCharacter::named("  ")),
            Err(GlossaryError::InvalidName(_))
        ));
        assert_eq!(glossary.version(), 0);
    }

    #[test]
    fn test_update_character_recomputes_cases() {
        let mut glossary = Glossary::new();
        let id = glossary.add_character(NewCharacter::named("Liam")).unwrap().id.clone();

        let patch = CharacterPatch {
            translated_name: Some("Уильям".to_string()),
            ..Default::default()
        };
        let updated = glossary.update_character(&id, patch).unwrap();
        assert_eq!(updated.declensions.nominative, "Уильям");
        assert_eq!(updated.declensions.genitive, "Уильяма");
        assert_eq!(glossary.version(), 2);
    }

    #[test]
    fn test_partial_override_keeps_other_cases() {
        let mut glossary = Glossary::new();
        let id = glossary.add_character(NewCharacter::named("John")).unwrap().id.clone();

        let patch = CharacterPatch {
            case_overrides: CaseOverrides {
                instrumental: Some("Джоном-старшим".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        let updated = glossary.update_character(&id, patch).unwrap();
        assert_eq!(updated.declensions.get(Case::Instrumental), "Джоном-старшим");
        assert_eq!(updated.declensions.genitive, "Джона");
        assert!(updated.declensions.is_complete());
    }

    #[test]
    fn test_update_with_conflicting_alias_fails_without_changes() {
        let mut glossary = Glossary::new();
        glossary.add_character(NewCharacter::named("John")).unwrap();
        let mary_id = glossary.add_character(NewCharacter::named("Mary")).unwrap().id.clone();
        let version = glossary.version();

        let patch = CharacterPatch {
            description: Some("changed".to_string()),
            add_aliases: vec!["john".to_string()],
            ..Default::default()
        };
        let result = glossary.update_character(&mary_id, patch);
        assert!(matches!(result, Err(GlossaryError::NameConflict { .. })));
        assert_eq!(glossary.version(), version);
        assert_eq!(glossary.get_character(&mary_id).unwrap().description, "");
    }

    #[test]
    fn test_noop_update_keeps_version() {
        let mut glossary = Glossary::new();
        let id = glossary.add_character(NewCharacter::named("John")).unwrap().id.clone();
        glossary.update_character(&id, CharacterPatch::default()).unwrap();
        assert_eq!(glossary.version(), 1);
    }

    #[test]
    fn test_locations_and_terms() {
        let mut glossary = Glossary::new();
        let mut london = NewLocation::named("London");
        london.translated_name = Some("Лондон".to_string());
        glossary.add_location(london).unwrap();
        glossary.add_location(NewLocation::named("LONDON")).unwrap();
        assert_eq!(glossary.locations().len(), 1);

        let shire = glossary.add_location(NewLocation::named("Shire")).unwrap();
        assert_eq!(shire.translated_name, "Шир");

        let mana = glossary.add_term(NewTerm::named("mana")).unwrap();
        assert_eq!(mana.translated_term, "mana");
        assert!(glossary.find_term("Mana").is_some());
        assert_eq!(glossary.version(), 3);
    }

    #[test]
    fn test_apply_update_bumps_version_once() {
        let mut glossary = Glossary::new();
        glossary.add_character(NewCharacter::named("John")).unwrap();

        let update = GlossaryUpdate {
            new_characters: vec![NewCharacter::named("Liam"), NewCharacter::named("JOHN")],
            updated_characters: vec![NamedPatch {
                original_name: "john".to_string(),
                patch: CharacterPatch {
                    is_main_character: Some(true),
                    ..Default::default()
                },
            }],
            new_locations: vec![NewLocation::named("Paris")],
            new_terms: vec![NewTerm::named("aether")],
            updated_terms: vec![NamedPatch {
                original_name: "missing".to_string(),
                patch: TermPatch::default(),
            }],
            ..Default::default()
        };

        let report = glossary.apply_update(&update);
        assert_eq!(report, ApplyReport { added: 3, updated: 1, skipped: 2 });
        assert_eq!(glossary.version(), 2);
        assert!(glossary.find_character("John").unwrap().is_main_character);
    }

    #[test]
    fn test_apply_empty_update_keeps_version() {
        let mut glossary = Glossary::new();
        let report = glossary.apply_update(&GlossaryUpdate::default());
        assert!(!report.changed());
        assert_eq!(glossary.version(), 0);
    }
}
