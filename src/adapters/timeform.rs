//! timeform.com discovery adapter, grounded on `timeform_adapter.py`.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;

use super::base::generate_race_id;
use super::http::{build_runner, fetch_text};
use super::{Adapter, AdapterType, RawPayload};
use crate::domain::{Discipline, Race};
use crate::error::PaddockError;

pub struct TimeformAdapter {
    base_url: String,
}

impl TimeformAdapter {
    pub fn new() -> Self {
        Self { base_url: "https://www.timeform.com/api/racecards".to_string() }
    }
}

impl Default for TimeformAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct TfResponse {
    cards: Vec<TfCard>,
}

#[derive(Debug, Deserialize)]
struct TfCard {
    course_name: String,
    races: Vec<TfRace>,
}

#[derive(Debug, Deserialize)]
struct TfRace {
    number_in_race_order: u32,
    off_time_utc: String,
    horses: Vec<TfHorse>,
}

#[derive(Debug, Deserialize)]
struct TfHorse {
    draw_or_number: u32,
    horse: String,
    #[serde(default)]
    non_runner: bool,
    #[serde(default)]
    timeform_odds: Option<String>,
}

#[async_trait]
impl Adapter for TimeformAdapter {
    fn source_name(&self) -> &str {
        "Timeform"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Discovery
    }

    async fn fetch_data(&self, date: &str) -> Result<RawPayload, PaddockError> {
        fetch_text(&format!("{}/{}", self.base_url, date), self.source_name(), &[]).await
    }

    fn parse_races(&self, raw: &RawPayload) -> Result<Vec<Race>, PaddockError> {
        let value: Value = match raw {
            RawPayload::Text(t) => serde_json::from_str(t)
                .map_err(|e| PaddockError::Parsing { adapter: self.source_name().to_string(), reason: e.to_string() })?,
            RawPayload::Json(v) => v.clone(),
        };
        let parsed: TfResponse = serde_json::from_value(value)
            .map_err(|e| PaddockError::Parsing { adapter: self.source_name().to_string(), reason: e.to_string() })?;

        let mut races = Vec::new();
        for card in parsed.cards {
            for race in card.races {
                let start_time = chrono::DateTime::parse_from_rfc3339(&race.off_time_utc)
                    .map(|dt| dt.with_timezone(&Utc))
                    .unwrap_or_else(|_| Utc::now());
                let runners = race
                    .horses
                    .into_iter()
                    .map(|h| build_runner(self.source_name(), &h.horse, h.draw_or_number, h.non_runner, h.timeform_odds.as_deref()))
                    .collect();
                let id = generate_race_id("tf", &card.course_name, start_time, race.number_in_race_order, Discipline::Thoroughbred);
                races.push(Race {
                    id,
                    venue: card.course_name.clone(),
                    race_number: race.number_in_race_order,
                    start_time,
                    runners,
                    source: self.source_name().to_string(),
                    discipline: Discipline::Thoroughbred,
                    distance: None,
                    field_size: None,
                    qualification_score: None,
                    available_bets: vec![],
                    is_error_placeholder: false,
                    error_message: None,
                    metadata: HashMap::new(),
                });
            }
        }
        Ok(races)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_cards_of_races() {
        let adapter = TimeformAdapter::new();
        let raw = RawPayload::Text(
            r#"{"cards":[{"course_name":"Ascot","races":[{"number_in_race_order":1,"off_time_utc":"2026-07-30T14:00:00Z","horses":[{"draw_or_number":1,"horse":"A"},{"draw_or_number":2,"horse":"B"}]}]}]}"#
                .to_string(),
        );
        let races = adapter.parse_races(&raw).unwrap();
        assert_eq!(races.len(), 1);
    }
}
