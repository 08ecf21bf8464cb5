//! The canonical race/runner model all adapters normalize into.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::normalize::{canonical_venue, normalize_venue};
use super::odds::OddsData;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Discipline {
    Thoroughbred,
    Harness,
    Greyhound,
    QuarterHorse,
}

impl Discipline {
    /// The race-id suffix from spec §4.2: `_t`, `_h`, `_g`, `_q`.
    pub fn id_suffix(&self) -> &'static str {
        match self {
            Discipline::Thoroughbred => "_t",
            Discipline::Harness => "_h",
            Discipline::Greyhound => "_g",
            Discipline::QuarterHorse => "_q",
        }
    }

    /// The single-letter initial used in auditor canonical keys.
    pub fn initial(&self) -> char {
        match self {
            Discipline::Thoroughbred => 'T',
            Discipline::Harness => 'H',
            Discipline::Greyhound => 'G',
            Discipline::QuarterHorse => 'Q',
        }
    }
}

/// The closed vocabulary of exotic wager types a race may offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum ExoticBet {
    Superfecta,
    Trifecta,
    Exacta,
    Quinella,
    #[serde(rename = "Daily Double")]
    DailyDouble,
    #[serde(rename = "Pick 3")]
    Pick3,
    #[serde(rename = "Pick 4")]
    Pick4,
    #[serde(rename = "Pick 5")]
    Pick5,
    #[serde(rename = "Pick 6")]
    Pick6,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Runner {
    pub id: Option<String>,
    pub name: String,
    /// Saddle/trap number; may be 0 when unknown.
    pub number: u32,
    pub scratched: bool,
    /// Keyed by adapter (source) name.
    pub odds: HashMap<String, OddsData>,
    pub win_odds: Option<f64>,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

impl Runner {
    pub fn new(raw_name: &str, number: u32) -> Self {
        Self {
            id: None,
            name: super::normalize::normalize_runner_name(raw_name),
            number,
            scratched: false,
            odds: HashMap::new(),
            win_odds: None,
            metadata: HashMap::new(),
        }
    }

    /// Identity key within a parent race (spec §3.1 invariant): `number`
    /// when it's meaningful, otherwise the normalized name.
    pub fn identity_key(&self) -> RunnerKey {
        if self.number > 0 {
            RunnerKey::Number(self.number)
        } else {
            RunnerKey::Name(self.name.clone())
        }
    }

    /// Best (lowest) valid win price across all sources, or `None`.
    pub fn best_win_odds(&self) -> Option<f64> {
        self.odds
            .values()
            .filter_map(|o| o.win)
            .filter(|w| *w >= super::odds::MIN_VALID_ODDS)
            .fold(None, |acc, w| Some(acc.map_or(w, |a: f64| a.min(w))))
    }

    pub fn has_trustworthy_odds(&self) -> bool {
        self.odds.values().any(|o| o.is_trustworthy())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunnerKey {
    Number(u32),
    Name(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Race {
    pub id: String,
    pub venue: String,
    pub race_number: u32,
    pub start_time: DateTime<Utc>,
    pub runners: Vec<Runner>,
    /// Comma-joined adapter names that contributed to this (possibly merged) race.
    pub source: String,
    pub discipline: Discipline,
    pub distance: Option<String>,
    pub field_size: Option<u32>,
    pub qualification_score: Option<f64>,
    #[serde(default)]
    pub available_bets: Vec<ExoticBet>,
    #[serde(default)]
    pub is_error_placeholder: bool,
    pub error_message: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

impl Race {
    /// Dedup key triple: `(lower(venue), race_number, HH:MM in Eastern)`.
    pub fn dedup_key(&self) -> (String, u32, String) {
        let eastern = self.start_time.with_timezone(&chrono_tz::America::New_York);
        (
            canonical_venue(&normalize_venue(&self.venue)),
            self.race_number,
            eastern.format("%H:%M").to_string(),
        )
    }

    pub fn active_runners(&self) -> impl Iterator<Item = &Runner> {
        self.runners.iter().filter(|r| !r.scratched)
    }

    pub fn active_count(&self) -> usize {
        self.active_runners().count()
    }

    /// Fraction of active runners carrying a non-placeholder odds value.
    pub fn trust_ratio(&self) -> f64 {
        let active: Vec<&Runner> = self.active_runners().collect();
        if active.is_empty() {
            return 0.0;
        }
        let trustworthy = active.iter().filter(|r| r.has_trustworthy_odds()).count();
        trustworthy as f64 / active.len() as f64
    }
}
