//! Odds parsing and the per-source odds observation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The common "default/unknown" value several sources emit in place of a
/// real price. Accepted, but flagged untrustworthy.
pub const PLACEHOLDER_ODDS: f64 = 2.75;

pub const MIN_VALID_ODDS: f64 = 1.01;
pub const MAX_VALID_ODDS: f64 = 1000.0;

/// One source's opinion of a runner's price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OddsData {
    pub win: Option<f64>,
    pub place: Option<f64>,
    pub show: Option<f64>,
    pub source: String,
    pub last_updated: DateTime<Utc>,
}

impl OddsData {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            win: None,
            place: None,
            show: None,
            source: source.into(),
            last_updated: Utc::now(),
        }
    }

    /// True if the win price is present and not the common placeholder.
    pub fn is_trustworthy(&self) -> bool {
        match self.win {
            Some(w) => (w - PLACEHOLDER_ODDS).abs() > f64::EPSILON,
            None => false,
        }
    }
}

/// Parse a raw odds string into decimal odds in `[MIN_VALID_ODDS, MAX_VALID_ODDS)`.
///
/// Supports fractional (`7/4`, `7-4`, `7 TO 4`), decimal (`3.50`, `3,50`),
/// American (`+250`, `-150`), even-money tokens, and scratch/void tokens.
/// A bare integer `n` in `[1, 50]` is treated as `n/1`.
pub fn parse_odds(raw: &str) -> Option<f64> {
    let cleaned = raw.trim().to_uppercase();
    if cleaned.is_empty() {
        return None;
    }

    if matches!(cleaned.as_str(), "EVN" | "EVEN" | "EVS" | "EVENS") {
        return Some(2.0);
    }
    if matches!(
        cleaned.as_str(),
        "SCR" | "SCRATCHED" | "N/A" | "NR" | "VOID" | "--"
    ) {
        return None;
    }

    let value = parse_fractional(&cleaned)
        .or_else(|| parse_word_fractional(&cleaned))
        .or_else(|| parse_american(&cleaned))
        .or_else(|| parse_decimal(&cleaned))
        .or_else(|| parse_bare_integer(&cleaned))?;

    if (MIN_VALID_ODDS..MAX_VALID_ODDS).contains(&value) {
        Some(round2(value))
    } else {
        None
    }
}

fn parse_fractional(s: &str) -> Option<f64> {
    let (sep_idx, sep_len) = s.find('/').map(|i| (i, 1)).or_else(|| {
        // Hyphenated fractions ("7-4") but not a leading negative sign.
        s.char_indices()
            .skip(1)
            .find(|(_, c)| *c == '-')
            .map(|(i, _)| (i, 1))
    })?;
    let num: u32 = s[..sep_idx].parse().ok()?;
    let den: u32 = s[sep_idx + sep_len..].parse().ok()?;
    if den == 0 {
        return None;
    }
    Some(num as f64 / den as f64 + 1.0)
}

fn parse_word_fractional(s: &str) -> Option<f64> {
    let mut parts = s.split_whitespace();
    let num: u32 = parts.next()?.parse().ok()?;
    if parts.next()? != "TO" {
        return None;
    }
    let den: u32 = parts.next()?.parse().ok()?;
    if parts.next().is_some() || den == 0 {
        return None;
    }
    Some(num as f64 / den as f64 + 1.0)
}

fn parse_american(s: &str) -> Option<f64> {
    let (sign, rest) = s.split_at(1);
    if sign != "+" && sign != "-" {
        return None;
    }
    let value: f64 = rest.parse().ok()?;
    if value <= 0.0 {
        return None;
    }
    if sign == "+" {
        Some(value / 100.0 + 1.0)
    } else {
        Some(100.0 / value + 1.0)
    }
}

fn parse_decimal(s: &str) -> Option<f64> {
    let normalized = s.replace(',', ".");
    if !normalized.contains('.') {
        // Bare digit strings are handled by `parse_bare_integer` per the
        // fractional-shorthand rule; without a decimal point we don't know
        // whether "9" means decimal odds of 9.0 or "9/1".
        return None;
    }
    if !normalized.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return None;
    }
    let value: f64 = normalized.parse().ok()?;
    if value >= 1.0 {
        Some(value)
    } else {
        None
    }
}

fn parse_bare_integer(s: &str) -> Option<f64> {
    let n: u32 = s.parse().ok()?;
    if (1..=50).contains(&n) {
        Some(n as f64 + 1.0)
    } else {
        None
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
