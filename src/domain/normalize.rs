//! Runner-name and venue normalization.
//!
//! Venue normalization is the dedup primitive: two adapters reporting the
//! same physical track under different spellings must collapse to one key.

use lazy_static::lazy_static;
use std::collections::HashMap;

/// The closed set of tokens that mark the boundary between a track name and
/// a race/sponsorship name (spec GLOSSARY "Racing keywords").
const RACING_KEYWORDS: &[&str] = &[
    "PRIX", "CHASE", "HURDLE", "HANDICAP", "STAKES", "CUP", "LISTED", "GBB", "RACE", "MEETING",
    "NOVICE", "TRIAL", "PLATE", "TROPHY", "CHAMPIONSHIP", "JOCKEY", "TRAINER", "BEST ODDS",
    "GUARANTEED", "PRO/AM", "AUCTION", "HUNT", "MARES", "FILLIES", "COLTS", "GELDINGS",
    "JUVENILE", "SELLING", "CLAIMING", "OPTIONAL", "ALLOWANCE", "MAIDEN", "OPEN", "INVITATIONAL",
    "CLASS", "GRADE", "GROUP", "DERBY", "OAKS", "GUINEAS", "DASH", "MILE", "STAYERS", "BOWL",
    "MEMORIAL", "PURSE", "CONDITION",
];

lazy_static! {
    /// Static venue alias table: cleaned upper-case token -> canonical display name.
    static ref VENUE_ALIASES: HashMap<&'static str, &'static str> = HashMap::from([
        ("AQU", "Aqueduct"),
        ("DUNSTALL PARK", "Wolverhampton"),
        ("YARMOUTH", "Great Yarmouth"),
        ("CD", "Churchill Downs"),
        ("SA", "Santa Anita Park"),
        ("BEL", "Belmont Park"),
        ("GP", "Gulfstream Park"),
        ("SAR", "Saratoga"),
        ("DMR", "Del Mar"),
        ("KEE", "Keeneland"),
        ("OP", "Oaklawn Park"),
        ("PIM", "Pimlico"),
        ("TAM", "Tampa Bay Downs"),
        ("WO", "Woodbine"),
    ]);
}

/// Clean a runner's display name.
///
/// Strips a trailing country suffix in parens, a leading "N. " program
/// number prefix, keeps only letters/digits/space/hyphen/apostrophe,
/// collapses whitespace, and falls back to "Unknown" if empty.
pub fn normalize_runner_name(raw: &str) -> String {
    let mut s = raw.replace('\u{00A0}', " ").trim().to_string();

    if let Some(open) = s.rfind('(') {
        if s[open..].ends_with(')') {
            s.truncate(open);
            s = s.trim().to_string();
        }
    }

    if let Some(dot) = s.find(". ") {
        let prefix = &s[..dot];
        if !prefix.is_empty() && prefix.chars().all(|c| c.is_ascii_digit()) {
            s = s[dot + 2..].to_string();
        }
    }

    let filtered: String = s
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == ' ' || *c == '-' || *c == '\'')
        .collect();

    let collapsed = filtered.split_whitespace().collect::<Vec<_>>().join(" ");

    if collapsed.is_empty() {
        "Unknown".to_string()
    } else {
        collapsed
    }
}

/// Two-stage venue normalizer: strip parenthetical/race-name noise, then
/// alias-lookup or title-case the remainder.
pub fn normalize_venue(raw: &str) -> String {
    let stage1 = strip_venue_noise(raw);
    let upper = stage1.trim().to_uppercase();

    if let Some(alias) = VENUE_ALIASES.get(upper.as_str()) {
        return alias.to_string();
    }

    title_case(&stage1)
}

fn strip_venue_noise(raw: &str) -> String {
    let mut s = raw.to_string();

    if let Some(open) = s.find('(') {
        if let Some(close) = s[open..].find(')') {
            let close_abs = open + close + 1;
            s = format!("{}{}", &s[..open], &s[close_abs..]);
        } else {
            s.truncate(open);
        }
    }

    let upper = s.to_uppercase();
    let mut cut_at = s.len();
    for keyword in RACING_KEYWORDS {
        if let Some(idx) = upper.find(keyword) {
            // Only treat as a boundary if it doesn't sit inside the very
            // first word of the venue name (avoids clipping venues like
            // "Mile End" when "MILE" is a keyword but also the whole name).
            if idx > 0 && idx < cut_at {
                cut_at = idx;
            }
        }
    }
    s.truncate(cut_at);

    s.split('-').next().unwrap_or(&s).trim().to_string()
}

fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str().to_lowercase().as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// The dedup primitive: lowercase, alphanumeric-only form of a normalized venue.
pub fn canonical_venue(normalized_venue: &str) -> String {
    normalized_venue
        .chars()
        .filter(|c| c.is_alphanumeric())
        .collect::<String>()
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_country_suffix_and_program_number() {
        assert_eq!(normalize_runner_name("Horse X (IRE)"), "Horse X");
        assert_eq!(normalize_runner_name("4. Horse X"), "Horse X");
        assert_eq!(normalize_runner_name("  Horse   X  "), "Horse X");
    }

    #[test]
    fn falls_back_to_unknown() {
        assert_eq!(normalize_runner_name("   "), "Unknown");
        assert_eq!(normalize_runner_name("()"), "Unknown");
    }

    #[test]
    fn aliases_known_codes() {
        assert_eq!(normalize_venue("AQU"), "Aqueduct");
        assert_eq!(normalize_venue("Dunstall Park"), "Wolverhampton");
    }

    #[test]
    fn canonicalization_is_insensitive_to_decoration() {
        let base = canonical_venue(&normalize_venue("Gulfstream Park"));
        let with_country = canonical_venue(&normalize_venue("Gulfstream Park (IRE)"));
        let with_race_name = canonical_venue(&normalize_venue("  Gulfstream Park — Handicap"));
        assert_eq!(base, with_country);
        assert_eq!(base, with_race_name);
    }
}
