use std::{cmp::Ordering, collections::BTreeMap, fmt};

use crate::models::{CardMap, CardRecord, DeckEntry, Grouping};

const CANONICAL_COLORS: [&str; 5] = ["W", "U", "B", "R", "G"];

/// Bucket a spell lands in when grouping by color identity. Declaration
/// order is display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ColorGroup {
    White,
    Blue,
    Black,
    Red,
    Green,
    Multicolor,
    Colorless,
    Other,
}

impl ColorGroup {
    pub fn from_identity(identity: &[String]) -> Self {
        let colors: Vec<&str> = identity
            .iter()
            .map(|c| c.trim())
            .filter(|c| !c.is_empty())
            .collect();
        match colors.as_slice() {
            [] => ColorGroup::Colorless,
            [single] => match single.to_uppercase().as_str() {
                "W" => ColorGroup::White,
                "U" => ColorGroup::Blue,
                "B" => ColorGroup::Black,
                "R" => ColorGroup::Red,
                "G" => ColorGroup::Green,
                _ => ColorGroup::Other,
            },
            _ => ColorGroup::Multicolor,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ColorGroup::White => "White",
            ColorGroup::Blue => "Blue",
            ColorGroup::Black => "Black",
            ColorGroup::Red => "Red",
            ColorGroup::Green => "Green",
            ColorGroup::Multicolor => "Multicolor",
            ColorGroup::Colorless => "Colorless",
            ColorGroup::Other => "Other",
        }
    }
}

impl fmt::Display for ColorGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Color identity as a badge code in WUBRG order, `C` when empty.
pub fn color_identity_code(identity: &[String]) -> String {
    let mut symbols: Vec<String> = identity
        .iter()
        .map(|c| c.trim().to_uppercase())
        .filter(|c| !c.is_empty())
        .collect();
    if symbols.is_empty() {
        return "C".to_owned();
    }
    let rank = |s: &str| CANONICAL_COLORS.iter().position(|&c| c == s).unwrap_or(usize::MAX);
    symbols.sort_by(|a, b| rank(a.as_str()).cmp(&rank(b.as_str())).then_with(|| a.cmp(b)));
    symbols.concat()
}

fn record<'a>(entry: &DeckEntry, cards: &'a CardMap) -> Option<&'a CardRecord> {
    cards.get(&entry.key())
}

fn cmp_names(a: &DeckEntry, b: &DeckEntry) -> Ordering {
    a.name.to_lowercase().cmp(&b.name.to_lowercase())
}

/// Unresolved cards never count as lands.
pub fn split_lands(rows: &[DeckEntry], cards: &CardMap) -> (Vec<DeckEntry>, Vec<DeckEntry>) {
    rows.iter()
        .filter(|row| !row.name.is_empty())
        .cloned()
        .partition(|row| !record(row, cards).is_some_and(CardRecord::is_land))
}

pub fn sort_alpha(rows: &mut [DeckEntry]) {
    rows.sort_by(cmp_names);
}

/// Mana value ascending, names without a value last, ties alphabetical.
pub fn sort_mana(rows: &mut [DeckEntry], cards: &CardMap) {
    let mana_value = |row: &DeckEntry| {
        record(row, cards)
            .and_then(|card| card.cmc)
            .unwrap_or(f64::MAX)
    };
    rows.sort_by(|a, b| {
        mana_value(a)
            .total_cmp(&mana_value(b))
            .then_with(|| cmp_names(a, b))
    });
}

pub fn group_by_color(rows: &[DeckEntry], cards: &CardMap) -> Vec<RowGroup> {
    let mut buckets: BTreeMap<ColorGroup, Vec<DeckEntry>> = BTreeMap::new();
    for row in rows {
        let group = record(row, cards)
            .map(|card| ColorGroup::from_identity(&card.color_identity))
            .unwrap_or(ColorGroup::Colorless);
        buckets.entry(group).or_default().push(row.clone());
    }
    buckets
        .into_iter()
        .map(|(group, mut rows)| {
            sort_alpha(&mut rows);
            RowGroup {
                label: Some(group),
                rows,
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct RowGroup {
    /// Only set when grouping by color.
    pub label: Option<ColorGroup>,
    pub rows: Vec<DeckEntry>,
}

/// One deck section ready for display: the spells in the chosen order and
/// the lands, always alphabetical, underneath.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ClassifiedSection {
    pub groups: Vec<RowGroup>,
    pub lands: Vec<DeckEntry>,
}

impl ClassifiedSection {
    pub fn is_empty(&self) -> bool {
        self.lands.is_empty() && self.groups.iter().all(|g| g.rows.is_empty())
    }

    pub fn spells(&self) -> impl Iterator<Item = &DeckEntry> {
        self.groups.iter().flat_map(|g| g.rows.iter())
    }
}

pub fn classify(rows: &[DeckEntry], grouping: Grouping, cards: &CardMap) -> ClassifiedSection {
    let (mut spells, mut lands) = split_lands(rows, cards);
    sort_alpha(&mut lands);

    let groups = if spells.is_empty() {
        Vec::new()
    } else {
        match grouping {
            Grouping::Color => group_by_color(&spells, cards),
            Grouping::Mana => {
                sort_mana(&mut spells, cards);
                vec![RowGroup { label: None, rows: spells }]
            }
            Grouping::Alpha => {
                sort_alpha(&mut spells);
                vec![RowGroup { label: None, rows: spells }]
            }
        }
    };

    ClassifiedSection { groups, lands }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(name: &str, type_line: &str, cmc: Option<f64>, ci: &[&str]) -> (String, CardRecord) {
        (
            name.to_lowercase(),
            CardRecord {
                name: name.to_owned(),
                type_line: type_line.to_owned(),
                cmc,
                color_identity: ci.iter().map(|c| c.to_string()).collect(),
                ..Default::default()
            },
        )
    }

    fn cards() -> CardMap {
        CardMap::from([
            card("Forest", "Basic Land — Forest", Some(0.0), &["G"]),
            card("Breeding Pool", "Land — Forest Island", Some(0.0), &["G", "U"]),
            card("Opt", "Instant", Some(1.0), &["U"]),
            card("Growth Spiral", "Instant", Some(2.0), &["G", "U"]),
            card("Uro, Titan of Nature's Wrath", "Legendary Creature", Some(3.0), &["G", "U"]),
            card("Llanowar Elves", "Creature — Elf Druid", Some(1.0), &["G"]),
            card("Ornithopter", "Artifact Creature", Some(0.0), &[]),
            card("Swords to Plowshares", "Instant", Some(1.0), &["W"]),
        ])
    }

    fn entries(names: &[&str]) -> Vec<DeckEntry> {
        names.iter().map(|n| DeckEntry::new(1, n)).collect()
    }

    fn names(rows: &[DeckEntry]) -> Vec<&str> {
        rows.iter().map(|r| r.name.as_str()).collect()
    }

    #[test]
    fn identity_codes_follow_wubrg() {
        let ci = |v: &[&str]| v.iter().map(|c| c.to_string()).collect::<Vec<_>>();
        assert_eq!(color_identity_code(&ci(&["G", "W"])), "WG");
        assert_eq!(color_identity_code(&ci(&["g", "u", "b"])), "UBG");
        assert_eq!(color_identity_code(&ci(&[])), "C");
        assert_eq!(color_identity_code(&ci(&["", " "])), "C");
        assert_eq!(color_identity_code(&ci(&["Z", "R", "P"])), "RPZ");
    }

    #[test]
    fn color_labels() {
        let ci = |v: &[&str]| v.iter().map(|c| c.to_string()).collect::<Vec<_>>();
        assert_eq!(ColorGroup::from_identity(&ci(&["G", "W"])), ColorGroup::Multicolor);
        assert_eq!(ColorGroup::from_identity(&ci(&[])), ColorGroup::Colorless);
        assert_eq!(ColorGroup::from_identity(&ci(&["u"])), ColorGroup::Blue);
        assert_eq!(ColorGroup::from_identity(&ci(&["X"])), ColorGroup::Other);
    }

    #[test]
    fn lands_are_split_out_and_unresolved_cards_are_spells() {
        let rows = entries(&["Opt", "Forest", "Mystery Card", "Breeding Pool"]);
        let (spells, lands) = split_lands(&rows, &cards());
        assert_eq!(names(&spells), vec!["Opt", "Mystery Card"]);
        assert_eq!(names(&lands), vec!["Forest", "Breeding Pool"]);
    }

    #[test]
    fn alpha_is_case_insensitive_and_stable() {
        let mut rows = vec![
            DeckEntry::new(1, "opt"),
            DeckEntry::new(2, "Growth Spiral"),
            DeckEntry::new(3, "Opt"),
        ];
        sort_alpha(&mut rows);
        assert_eq!(rows[0].name, "Growth Spiral");
        assert_eq!((rows[1].quantity, rows[2].quantity), (1, 3));
    }

    #[test]
    fn mana_puts_missing_values_last() {
        let section = classify(
            &entries(&["Aardvark Unknown", "Uro, Titan of Nature's Wrath", "Opt", "Ornithopter", "Llanowar Elves"]),
            Grouping::Mana,
            &cards(),
        );
        assert_eq!(
            names(&section.groups[0].rows),
            vec!["Ornithopter", "Llanowar Elves", "Opt", "Uro, Titan of Nature's Wrath", "Aardvark Unknown"]
        );
    }

    #[test]
    fn color_buckets_are_in_fixed_order() {
        let section = classify(
            &entries(&["Ornithopter", "Growth Spiral", "Opt", "Forest", "Swords to Plowshares", "Llanowar Elves", "Unknown"]),
            Grouping::Color,
            &cards(),
        );
        let labels: Vec<ColorGroup> = section.groups.iter().filter_map(|g| g.label).collect();
        assert_eq!(
            labels,
            vec![ColorGroup::White, ColorGroup::Blue, ColorGroup::Green, ColorGroup::Multicolor, ColorGroup::Colorless]
        );
        let colorless = section.groups.last().unwrap();
        assert_eq!(names(&colorless.rows), vec!["Ornithopter", "Unknown"]);
        assert_eq!(names(&section.lands), vec!["Forest"]);
    }

    #[test]
    fn lands_never_appear_in_primary_groups() {
        let rows = entries(&["Forest", "breeding pool", "Opt"]);
        for grouping in Grouping::ALL {
            let section = classify(&rows, grouping, &cards());
            assert_eq!(names(&section.lands), vec!["breeding pool", "Forest"]);
            assert_eq!(section.spells().map(|r| r.name.as_str()).collect::<Vec<_>>(), vec!["Opt"]);
        }
    }

    #[test]
    fn empty_input_has_no_groups() {
        let section = classify(&[], Grouping::Color, &cards());
        assert!(section.is_empty());
        assert!(section.groups.is_empty());
    }
}
