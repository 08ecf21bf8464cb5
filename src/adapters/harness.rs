//! Standardbred Canada / USTA harness discovery adapter, grounded on
//! `harness_adapter.py`.

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

pub struct HarnessAdapter {
    base_url: String,
}

impl HarnessAdapter {
    pub fn new() -> Self {
        Self { base_url: "https://standardbredcanada.ca/api/entries".to_string() }
    }
}

impl Default for HarnessAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct HarnessResponse {
    programs: Vec<HarnessProgram>,
}

#[derive(Debug, Deserialize)]
struct HarnessProgram {
    track: String,
    races: Vec<HarnessRace>,
}

#[derive(Debug, Deserialize)]
struct HarnessRace {
    race_number: u32,
    post_time_utc: String,
    horses: Vec<HarnessHorse>,
}

#[derive(Debug, Deserialize)]
struct HarnessHorse {
    post_position: u32,
    name: String,
    #[serde(default)]
    scratched: bool,
    #[serde(default)]
    morning_line_odds: Option<String>,
}

#[async_trait]
impl Adapter for HarnessAdapter {
    fn source_name(&self) -> &str {
        "Harness"
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
        let parsed: HarnessResponse = serde_json::from_value(value)
            .map_err(|e| PaddockError::Parsing { adapter: self.source_name().to_string(), reason: e.to_string() })?;

        let mut races = Vec::new();
        for program in parsed.programs {
            for race in program.races {
                let start_time = chrono::DateTime::parse_from_rfc3339(&race.post_time_utc)
                    .map(|dt| dt.with_timezone(&Utc))
                    .unwrap_or_else(|_| Utc::now());
                let runners = race
                    .horses
                    .into_iter()
                    .map(|h| build_runner(self.source_name(), &h.name, h.post_position, h.scratched, h.morning_line_odds.as_deref()))
                    .collect();
                let id = generate_race_id("hrn", &program.track, start_time, race.race_number, Discipline::Harness);
                races.push(Race {
                    id,
                    venue: program.track.clone(),
                    race_number: race.race_number,
                    start_time,
                    runners,
                    source: self.source_name().to_string(),
                    discipline: Discipline::Harness,
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
