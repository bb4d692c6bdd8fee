use std::sync::LazyLock;

use regex::Regex;

// Arena exports: "Card Name (SET) 123"
static ARENA_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+\([A-Z0-9]{3,6}\)\s+\d+$").unwrap());
// MTGO exports: "[SET] Card Name"
static MTGO_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[[A-Z0-9]{3,6}\]\s*").unwrap());
static COLLECTOR_SUFFIX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+#\d+$").unwrap());

/// Strips client export artifacts from the name part of a card line.
pub fn clean_card_name(raw: &str) -> String {
    let name = raw.trim();
    let name = ARENA_SUFFIX.replace(name, "");
    let name = MTGO_PREFIX.replace(&name, "");
    let name = COLLECTOR_SUFFIX.replace(&name, "");
    name.trim().to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_arena_set_and_number() {
        assert_eq!(clean_card_name("Lightning Bolt (2ED) 161"), "Lightning Bolt");
        assert_eq!(clean_card_name("Forest (NEO) 302  "), "Forest");
    }

    #[test]
    fn strips_mtgo_prefix_and_hash_number() {
        assert_eq!(clean_card_name("[M21] Llanowar Elves"), "Llanowar Elves");
        assert_eq!(clean_card_name("Opt #59"), "Opt");
    }

    #[test]
    fn leaves_ordinary_names_alone() {
        assert_eq!(clean_card_name("  Fire // Ice "), "Fire // Ice");
        // lowercase set codes are not client artifacts
        assert_eq!(clean_card_name("Opt (eld) 59"), "Opt (eld) 59");
        assert_eq!(clean_card_name(""), "");
    }
}
