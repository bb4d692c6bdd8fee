use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One `(quantity, name)` line of a decklist.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct DeckEntry {
    pub quantity: u32,
    pub name: String,
}

impl DeckEntry {
    pub fn new(quantity: u32, name: &str) -> Self {
        Self {
            quantity,
            name: name.to_owned(),
        }
    }

    /// Lookup key into a snapshot's card map.
    pub fn key(&self) -> String {
        card_key(&self.name)
    }
}

pub fn card_key(name: &str) -> String {
    name.trim().to_lowercase()
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Section {
    Main,
    Sideboard,
    Other,
}

impl Section {
    pub const ALL: [Section; 3] = [Section::Main, Section::Sideboard, Section::Other];

    pub fn title(self) -> &'static str {
        match self {
            Section::Main => "Mainboard",
            Section::Sideboard => "Sideboard",
            Section::Other => "Other",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct DecklistSections {
    pub main: Vec<DeckEntry>,
    pub sideboard: Vec<DeckEntry>,
    pub other: Vec<DeckEntry>,
}

impl DecklistSections {
    pub fn get(&self, section: Section) -> &[DeckEntry] {
        match section {
            Section::Main => &self.main,
            Section::Sideboard => &self.sideboard,
            Section::Other => &self.other,
        }
    }

    pub fn push(&mut self, section: Section, entry: DeckEntry) {
        match section {
            Section::Main => self.main.push(entry),
            Section::Sideboard => self.sideboard.push(entry),
            Section::Other => self.other.push(entry),
        }
    }

    pub fn entries(&self) -> impl Iterator<Item = &DeckEntry> {
        self.main
            .iter()
            .chain(self.sideboard.iter())
            .chain(self.other.iter())
    }

    pub fn names(&self) -> Vec<String> {
        self.entries().map(|e| e.name.clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.main.is_empty() && self.sideboard.is_empty() && self.other.is_empty()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct ImageUris {
    #[serde(default)]
    pub small: Option<String>,
    #[serde(default)]
    pub normal: Option<String>,
    #[serde(default)]
    pub large: Option<String>,
    #[serde(default)]
    pub png: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct CardFace {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub image_uris: Option<ImageUris>,
}

/// Catalog metadata for one card, stored the way the catalog sends it.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct CardRecord {
    pub name: String,
    #[serde(default)]
    pub scryfall_uri: String,
    #[serde(default)]
    pub type_line: String,
    #[serde(default)]
    pub rarity: String,
    #[serde(default)]
    pub colors: Vec<String>,
    #[serde(default)]
    pub color_identity: Vec<String>,
    #[serde(default)]
    pub mana_cost: String,
    #[serde(default)]
    pub cmc: Option<f64>,
    #[serde(default)]
    pub image_uris: Option<ImageUris>,
    #[serde(default)]
    pub card_faces: Option<Vec<CardFace>>,
    #[serde(default)]
    pub oracle_id: String,
    #[serde(default)]
    pub id: String,
}

impl CardRecord {
    pub fn image_url(&self) -> Option<&str> {
        self.image_uris
            .as_ref()
            .and_then(|imgs| imgs.normal.as_deref())
            .or_else(|| self.alt_face_image_url())
    }

    pub fn alt_face_image_url(&self) -> Option<&str> {
        self.card_faces
            .as_ref()
            .and_then(|faces| faces.first())
            .and_then(|face| face.image_uris.as_ref())
            .and_then(|imgs| imgs.normal.as_deref())
    }

    pub fn detail_url(&self) -> Option<&str> {
        Some(self.scryfall_uri.as_str()).filter(|u| !u.is_empty())
    }

    pub fn is_land(&self) -> bool {
        self.type_line.to_lowercase().contains("land")
    }
}

/// Lowercase card name to record.
pub type CardMap = BTreeMap<String, CardRecord>;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ResolvedSnapshot {
    pub content_hash: String,
    pub fetched_at: u64,
    #[serde(default)]
    pub cards: CardMap,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Grouping {
    #[default]
    Alpha,
    Mana,
    Color,
}

impl Grouping {
    pub const ALL: [Grouping; 3] = [Grouping::Alpha, Grouping::Mana, Grouping::Color];

    /// Unknown values fall back to alphabetical.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "mana" => Grouping::Mana,
            "color" => Grouping::Color,
            _ => Grouping::Alpha,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Grouping::Alpha => "alpha",
            Grouping::Mana => "mana",
            Grouping::Color => "color",
        }
    }
}

impl std::fmt::Display for Grouping {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Grouping::Alpha => "Alphabetical",
            Grouping::Mana => "Mana value",
            Grouping::Color => "Color identity",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum StyleVariant {
    #[default]
    A,
    B,
    C,
}

impl StyleVariant {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_uppercase().as_str() {
            "B" => StyleVariant::B,
            "C" => StyleVariant::C,
            _ => StyleVariant::A,
        }
    }

    pub fn class_suffix(self) -> &'static str {
        match self {
            StyleVariant::A => "a",
            StyleVariant::B => "b",
            StyleVariant::C => "c",
        }
    }
}

/// A decklist block as it sits inside a document.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct DecklistBlock {
    pub content: String,
    pub instance_id: String,
    #[serde(default)]
    pub style_variant: StyleVariant,
    #[serde(default)]
    pub grouping: Grouping,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(json: &str) -> CardRecord {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn image_url_prefers_card_then_first_face() {
        let single = record(r#"{"name":"Shock","image_uris":{"normal":"https://img/shock.jpg"}}"#);
        assert_eq!(single.image_url(), Some("https://img/shock.jpg"));

        let dfc = record(
            r#"{"name":"Delver of Secrets // Insectile Aberration",
                "card_faces":[{"name":"Delver of Secrets","image_uris":{"normal":"https://img/front.jpg"}},
                              {"name":"Insectile Aberration","image_uris":{"normal":"https://img/back.jpg"}}]}"#,
        );
        assert_eq!(dfc.image_url(), Some("https://img/front.jpg"));

        let bare = record(r#"{"name":"Mystery"}"#);
        assert_eq!(bare.image_url(), None);
        assert_eq!(bare.detail_url(), None);
    }

    #[test]
    fn land_detection_ignores_case() {
        assert!(record(r#"{"name":"Forest","type_line":"Basic Land — Forest"}"#).is_land());
        assert!(record(r#"{"name":"Dryad Arbor","type_line":"LAND CREATURE"}"#).is_land());
        assert!(!record(r#"{"name":"Negate","type_line":"Instant"}"#).is_land());
    }

    #[test]
    fn attribute_fallbacks() {
        assert_eq!(Grouping::parse("COLOR"), Grouping::Color);
        assert_eq!(Grouping::parse("curve"), Grouping::Alpha);
        assert_eq!(StyleVariant::parse("b"), StyleVariant::B);
        assert_eq!(StyleVariant::parse("z"), StyleVariant::A);
    }
}
