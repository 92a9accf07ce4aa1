//! Glossary Context - Value Objects

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 术语表条目唯一标识
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(Uuid);

impl EntityId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 地点类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationType {
    City,
    Country,
    Region,
    Building,
    Landmark,
    Realm,
    #[default]
    Other,
}

impl LocationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LocationType::City => "city",
            LocationType::Country => "country",
            LocationType::Region => "region",
            LocationType::Building => "building",
            LocationType::Landmark => "landmark",
            LocationType::Realm => "realm",
            LocationType::Other => "other",
        }
    }

    /// 宽松解析，未知标签归为 Other
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "city" | "town" | "village" => LocationType::City,
            "country" | "kingdom" | "nation" | "empire" => LocationType::Country,
            "region" | "province" | "area" | "forest" => LocationType::Region,
            "building" | "house" | "castle" | "room" => LocationType::Building,
            "landmark" | "mountain" | "river" | "lake" => LocationType::Landmark,
            "realm" | "world" | "dimension" | "plane" => LocationType::Realm,
            _ => LocationType::Other,
        }
    }
}

/// 术语类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TermCategory {
    Title,
    Magic,
    Technology,
    Organization,
    Item,
    Creature,
    Concept,
    #[default]
    Other,
}

impl TermCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            TermCategory::Title => "title",
            TermCategory::Magic => "magic",
            TermCategory::Technology => "technology",
            TermCategory::Organization => "organization",
            TermCategory::Item => "item",
            TermCategory::Creature => "creature",
            TermCategory::Concept => "concept",
            TermCategory::Other => "other",
        }
    }

    /// 宽松解析，未知标签归为 Other
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "title" | "rank" | "honorific" => TermCategory::Title,
            "magic" | "spell" | "skill" | "ability" => TermCategory::Magic,
            "technology" | "tech" | "device" => TermCategory::Technology,
            "organization" | "organisation" | "faction" | "guild" | "clan" => {
                TermCategory::Organization
            }
            "item" | "artifact" | "weapon" | "object" => TermCategory::Item,
            "creature" | "monster" | "race" | "species" => TermCategory::Creature,
            "concept" | "idea" => TermCategory::Concept,
            _ => TermCategory::Other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lenient_labels() {
        assert_eq!(LocationType::from_label("Kingdom"), LocationType::Country);
        assert_eq!(LocationType::from_label("somewhere"), LocationType::Other);
        assert_eq!(TermCategory::from_label(" Guild "), TermCategory::Organization);
        assert_eq!(TermCategory::from_label(""), TermCategory::Other);
    }

    #[test]
    fn test_entity_id_serializes_as_plain_uuid() {
        let id = EntityId::new();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id));
    }
}
