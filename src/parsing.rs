use std::sync::LazyLock;

use regex::Regex;

use crate::{
    models::{DeckEntry, DecklistSections, Section},
    names::clean_card_name,
};

static SIDEBOARD_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(sideboard|sb)\s*:?$").unwrap());
static MAIN_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(deck|maindeck|mainboard|main)\s*:?$").unwrap());
static OTHER_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(commander|companion|maybeboard|considering)\s*:?$").unwrap()
});
static CAPS_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Z][A-Z\s]+):\s*$").unwrap());
// "1 Card Name", "2x Card Name", "3\tCard Name"
static CARD_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(\d+)\s*(?:x\s+)?(.+)$").unwrap());

const META_PREFIXES: [&str; 4] = ["name ", "format ", "description ", "author "];

/// What a single trimmed line means to the parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    Blank,
    Meta,
    Header(Section),
    Card(DeckEntry),
    Junk,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParserState {
    pub section: Section,
    pub seen_card: bool,
    pub in_meta_header: bool,
}

impl Default for ParserState {
    fn default() -> Self {
        Self {
            section: Section::Main,
            seen_card: false,
            in_meta_header: true,
        }
    }
}

impl ParserState {
    fn in_header_phase(&self) -> bool {
        self.in_meta_header && !self.seen_card
    }

    pub fn classify(&self, line: &str) -> Line {
        let line = line.trim();
        if line.is_empty() {
            return Line::Blank;
        }

        if self.in_header_phase() {
            let lower = line.to_lowercase();
            if lower == "about" || META_PREFIXES.iter().any(|p| lower.starts_with(p)) {
                return Line::Meta;
            }
        }

        if let Some(section) = header_section(line) {
            return Line::Header(section);
        }

        card_line(line).map(Line::Card).unwrap_or(Line::Junk)
    }

    /// Advances over one raw line, yielding an entry for card lines.
    pub fn step(self, line: &str) -> (ParserState, Option<DeckEntry>) {
        let mut next = self;
        match self.classify(line) {
            Line::Blank => {
                if self.in_header_phase() {
                    next.in_meta_header = false;
                }
                (next, None)
            }
            Line::Meta => (next, None),
            Line::Header(section) => {
                next.section = section;
                next.seen_card = true;
                next.in_meta_header = false;
                (next, None)
            }
            Line::Card(entry) => {
                next.seen_card = true;
                next.in_meta_header = false;
                (next, Some(entry))
            }
            Line::Junk => {
                next.in_meta_header = false;
                (next, None)
            }
        }
    }
}

fn section_for_word(word: &str) -> Option<Section> {
    match word {
        "sideboard" | "sb" => Some(Section::Sideboard),
        "deck" | "maindeck" | "mainboard" | "main" => Some(Section::Main),
        "commander" | "companion" | "maybeboard" | "considering" => Some(Section::Other),
        _ => None,
    }
}

fn header_section(line: &str) -> Option<Section> {
    if SIDEBOARD_HEADER.is_match(line) {
        return Some(Section::Sideboard);
    }
    if MAIN_HEADER.is_match(line) {
        return Some(Section::Main);
    }
    if OTHER_HEADER.is_match(line) {
        return Some(Section::Other);
    }
    CAPS_HEADER
        .captures(line)
        .and_then(|caps| section_for_word(&caps[1].trim().to_lowercase()))
}

/// Positive counts too large for `u32` saturate.
fn quantity(digits: &str) -> Option<u32> {
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let significant = digits.trim_start_matches('0');
    if significant.is_empty() {
        return None;
    }
    Some(significant.parse().unwrap_or(u32::MAX))
}

fn card_line(line: &str) -> Option<DeckEntry> {
    let caps = CARD_LINE.captures(line)?;
    let quantity = quantity(&caps[1])?;
    let name = clean_card_name(&caps[2]);
    if name.is_empty() {
        return None;
    }
    Some(DeckEntry { quantity, name })
}

fn split_lines(raw: &str) -> impl Iterator<Item = &str> {
    raw.split("\r\n").flat_map(|l| l.split(['\n', '\r']))
}

/// Splits free-form decklist text into main, sideboard and other entries.
/// Never fails: unrecognised lines are dropped.
pub fn parse_decklist(raw: &str) -> DecklistSections {
    let (_, sections) = split_lines(raw).fold(
        (ParserState::default(), DecklistSections::default()),
        |(state, mut sections), line| {
            let (state, entry) = state.step(line);
            if let Some(entry) = entry {
                sections.push(state.section, entry);
            }
            (state, sections)
        },
    );
    sections
}
