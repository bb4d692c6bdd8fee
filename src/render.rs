use std::{fmt::Write, sync::LazyLock};

use html_escape::{encode_double_quoted_attribute as attr, encode_text as text};
use regex::Regex;

use crate::{
    classify::{classify, color_identity_code, ClassifiedSection},
    models::{CardMap, CardRecord, DeckEntry, DecklistSections, Grouping, Section, StyleVariant},
};

static MANA_TOKEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\{([^}]+)\}").unwrap());
static NON_ALNUM: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^A-Z0-9]+").unwrap());

const SEARCH_URL: &str = "https://scryfall.com/search";

/// Card search link used when a card was never resolved.
pub fn search_url(card_name: &str) -> String {
    let query = format!("!\"{}\"", card_name);
    reqwest::Url::parse_with_params(SEARCH_URL, &[("q", query.as_str())])
        .map(String::from)
        .unwrap_or_else(|_| SEARCH_URL.to_owned())
}

pub fn card_url(name: &str, card: Option<&CardRecord>) -> String {
    card.and_then(CardRecord::detail_url)
        .map(str::to_owned)
        .unwrap_or_else(|| search_url(name))
}

/// `{2}{U}{U}` becomes a single "2" glyph followed by one glyph per symbol.
pub fn mana_cost_html(mana_cost: &str) -> String {
    let mut generic = 0u64;
    let mut symbols = String::new();

    for caps in MANA_TOKEN.captures_iter(mana_cost) {
        let token = caps[1].trim().to_uppercase();
        if token.is_empty() {
            continue;
        }
        if token.chars().all(|c| c.is_ascii_digit()) {
            generic = generic.saturating_add(token.parse::<u64>().unwrap_or(u64::MAX));
            continue;
        }
        let class = NON_ALNUM.replace_all(&token, "-").to_lowercase();
        let _ = write!(
            symbols,
            r#"<span class="mtgdl-mana-sym mtgdl-mana-{}" data-sym="{}">{}</span>"#,
            attr(&class),
            attr(&token),
            text(&token)
        );
    }

    if generic == 0 && symbols.is_empty() {
        return String::new();
    }

    let mut out = String::from(r#"<span class="mtgdl-mana">"#);
    if generic > 0 {
        let _ = write!(
            out,
            r#"<span class="mtgdl-mana-num" data-sym="{0}">{0}</span>"#,
            generic
        );
    }
    out.push_str(&symbols);
    out.push_str("</span>");
    out
}

fn table_header() -> &'static str {
    concat!(
        "<thead><tr>",
        r#"<th class="mtgdl-th-qty">Amount</th>"#,
        r#"<th class="mtgdl-th-ci">CI</th>"#,
        r#"<th class="mtgdl-th-mana">Mana</th>"#,
        r#"<th class="mtgdl-th-name">Card</th>"#,
        "</tr></thead>"
    )
}

fn render_row(out: &mut String, entry: &DeckEntry, cards: &CardMap) {
    let card = cards.get(&entry.key());
    let ci = color_identity_code(card.map(|c| c.color_identity.as_slice()).unwrap_or_default());
    let mana = card.map(|c| c.mana_cost.as_str()).unwrap_or_default();

    let _ = write!(
        out,
        concat!(
            "<tr>",
            r#"<td class="mtgdl-qty">{qty}</td>"#,
            r#"<td class="mtgdl-ci"><span class="mtgdl-ci-badge" data-ci="{ci_attr}">{ci}</span></td>"#,
            r#"<td class="mtgdl-mana-cell">{mana}</td>"#,
            r#"<td class="mtgdl-name"><a class="mtgdl-card-link" href="{url}" target="_blank" rel="noopener noreferrer" data-card-name="{name_attr}">{name}</a></td>"#,
            "</tr>"
        ),
        qty = entry.quantity,
        ci_attr = attr(&ci),
        ci = text(&ci),
        mana = mana_cost_html(mana),
        url = attr(&card_url(&entry.name, card)),
        name_attr = attr(&entry.name),
        name = text(&entry.name),
    );
}

fn render_table<'a>(out: &mut String, groups: impl Iterator<Item = (Option<&'a str>, &'a [DeckEntry])>, cards: &CardMap) {
    out.push_str(r#"<table class="mtgdl-table">"#);
    out.push_str(table_header());
    out.push_str("<tbody>");
    for (label, rows) in groups {
        if let Some(label) = label {
            let _ = write!(
                out,
                r#"<tr class="mtgdl-group-row"><td colspan="4">{}</td></tr>"#,
                text(label)
            );
        }
        for row in rows {
            render_row(out, row, cards);
        }
    }
    out.push_str("</tbody></table>");
}

fn render_section(out: &mut String, title: &str, section: &ClassifiedSection, cards: &CardMap) {
    out.push_str("<section>");
    let _ = write!(out, r#"<h3 class="mtgdl-section-title">{}</h3>"#, text(title));

    if section.spells().next().is_some() {
        let groups = section
            .groups
            .iter()
            .map(|g| (g.label.map(|l| l.label()), g.rows.as_slice()));
        render_table(out, groups, cards);
    }

    if !section.lands.is_empty() {
        out.push_str(r#"<h4 class="mtgdl-subsection-title">Lands</h4>"#);
        render_table(out, std::iter::once((None, section.lands.as_slice())), cards);
    }

    out.push_str("</section>");
}

/// Everything a renderer needs for one decklist instance.
pub struct RenderInput<'a> {
    pub raw: &'a str,
    pub sections: &'a DecklistSections,
    pub cards: &'a CardMap,
    pub grouping: Grouping,
    pub style: StyleVariant,
}

pub fn render_decklist(input: &RenderInput) -> String {
    let mut out = String::new();
    let _ = write!(
        out,
        r#"<div class="mtgdl mtgdl--style-{} mtgdl--group-{}" data-mtgdl="1">"#,
        input.style.class_suffix(),
        input.grouping.as_str()
    );

    out.push_str(r#"<div class="mtgdl-grid">"#);
    for section in Section::ALL {
        let rows = input.sections.get(section);
        if rows.is_empty() {
            continue;
        }
        let classified = classify(rows, input.grouping, input.cards);
        render_section(&mut out, section.title(), &classified, input.cards);
    }
    out.push_str("</div>");

    out.push_str(r#"<div class="mtgdl-controls">"#);
    out.push_str(r#"<button type="button" class="mtgdl-copy" data-mtgdl-copy="1">Copy decklist</button>"#);
    out.push_str(r#"<span class="mtgdl-copy-status" aria-live="polite" aria-atomic="true"></span>"#);
    out.push_str("</div>");

    let _ = write!(
        out,
        r#"<script type="application/json" class="mtgdl-preload">{}</script>"#,
        preload_json(input.cards)
    );
    let _ = write!(
        out,
        r#"<textarea class="mtgdl-source" aria-hidden="true" tabindex="-1">{}</textarea>"#,
        text(input.raw)
    );
    out.push_str("</div>");
    out
}

/// The preload blob embedded next to the tables. Markup characters are
/// written as JSON unicode escapes so the blob stays valid JSON inside a
/// `<script>` element.
pub fn preload_json(cards: &CardMap) -> String {
    serde_json::to_string(cards)
        .map(|json| {
            json.replace('&', "\\u0026")
                .replace('<', "\\u003c")
                .replace('>', "\\u003e")
        })
        .unwrap_or_else(|_| "{}".to_owned())
}
