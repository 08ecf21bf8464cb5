//! equibase.com discovery adapter, grounded on `equibase_adapter.py`.

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

pub struct EquibaseAdapter {
    base_url: String,
}

impl EquibaseAdapter {
    pub fn new() -> Self {
        Self { base_url: "https://www.equibase.com/api/entries".to_string() }
    }
}

impl Default for EquibaseAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct EqEntriesResponse {
    tracks: Vec<EqTrack>,
}

#[derive(Debug, Deserialize)]
struct EqTrack {
    track_name: String,
    races: Vec<EqRace>,
}

#[derive(Debug, Deserialize)]
struct EqRace {
    race_number: u32,
    post_time_utc: String,
    entries: Vec<EqEntry>,
}

#[derive(Debug, Deserialize)]
struct EqEntry {
    program_number: u32,
    horse_name: String,
    #[serde(default)]
    scratched: bool,
    #[serde(default)]
    morning_line: Option<String>,
}

#[async_trait]
impl Adapter for EquibaseAdapter {
    fn source_name(&self) -> &str {
        "Equibase"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Discovery
    }

    async fn fetch_data(&self, date: &str) -> Result<RawPayload, PaddockError> {
        fetch_text(&format!("{}?date={}", self.base_url, date), self.source_name(), &[]).await
    }

    fn parse_races(&self, raw: &RawPayload) -> Result<Vec<Race>, PaddockError> {
        let value: Value = match raw {
            RawPayload::Text(t) => serde_json::from_str(t)
                .map_err(|e| PaddockError::Parsing { adapter: self.source_name().to_string(), reason: e.to_string() })?,
            RawPayload::Json(v) => v.clone(),
        };
        let parsed: EqEntriesResponse = serde_json::from_value(value)
            .map_err(|e| PaddockError::Parsing { adapter: self.source_name().to_string(), reason: e.to_string() })?;

        let mut races = Vec::new();
        for track in parsed.tracks {
            for race in track.races {
                let start_time = chrono::DateTime::parse_from_rfc3339(&race.post_time_utc)
                    .map(|dt| dt.with_timezone(&Utc))
                    .unwrap_or_else(|_| Utc::now());
                let runners = race
                    .entries
                    .into_iter()
                    .map(|e| {
                        build_runner(
                            self.source_name(),
                            &e.horse_name,
                            e.program_number,
                            e.scratched,
                            e.morning_line.as_deref(),
                        )
                    })
                    .collect();
                let id = generate_race_id("eqb", &track.track_name, start_time, race.race_number, Discipline::Thoroughbred);
                races.push(Race {
                    id,
                    venue: track.track_name.clone(),
                    race_number: race.race_number,
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
    fn parses_tracks_of_races() {
        let adapter = EquibaseAdapter::new();
        let raw = RawPayload::Text(
            r#"{"tracks":[{"track_name":"Churchill Downs","races":[{"race_number":4,"post_time_utc":"2026-07-30T20:00:00Z","entries":[{"program_number":1,"horse_name":"A"},{"program_number":2,"horse_name":"B","morning_line":"9"}]}]}]}"#
                .to_string(),
        );
        let races = adapter.parse_races(&raw).unwrap();
        assert_eq!(races.len(), 1);
        assert_eq!(races[0].runners[1].odds.get("Equibase").unwrap().win, Some(10.0));
    }
}
