//! gbgb.org.uk (Greyhound Board of Great Britain) discovery adapter,
//! grounded on `gbgb_api_adapter.py`. A genuine JSON API, unlike most of the
//! HTML-scraped sources in this roster.

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

pub struct GbgbApiAdapter {
    base_url: String,
}

impl GbgbApiAdapter {
    pub fn new() -> Self {
        Self { base_url: "https://api.gbgb.org.uk/api/results/meetings".to_string() }
    }
}

impl Default for GbgbApiAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct GbgbResponse {
    meetings: Vec<GbgbMeeting>,
}

#[derive(Debug, Deserialize)]
struct GbgbMeeting {
    stadium_name: String,
    races: Vec<GbgbRace>,
}

#[derive(Debug, Deserialize)]
struct GbgbRace {
    race_number: u32,
    race_time_utc: String,
    traps: Vec<GbgbTrap>,
}

#[derive(Debug, Deserialize)]
struct GbgbTrap {
    trap: u32,
    greyhound_name: String,
    #[serde(default)]
    reserve: bool,
    #[serde(default)]
    sp: Option<String>,
}

#[async_trait]
impl Adapter for GbgbApiAdapter {
    fn source_name(&self) -> &str {
        "GbgbApi"
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
        let parsed: GbgbResponse = serde_json::from_value(value)
            .map_err(|e| PaddockError::Parsing { adapter: self.source_name().to_string(), reason: e.to_string() })?;

        let mut races = Vec::new();
        for meeting in parsed.meetings {
            for race in meeting.races {
                let start_time = chrono::DateTime::parse_from_rfc3339(&race.race_time_utc)
                    .map(|dt| dt.with_timezone(&Utc))
                    .unwrap_or_else(|_| Utc::now());
                let runners = race
                    .traps
                    .into_iter()
                    .map(|t| build_runner(self.source_name(), &t.greyhound_name, t.trap, t.reserve, t.sp.as_deref()))
                    .collect();
                let id = generate_race_id("gbgb", &meeting.stadium_name, start_time, race.race_number, Discipline::Greyhound);
                races.push(Race {
                    id,
                    venue: meeting.stadium_name.clone(),
                    race_number: race.race_number,
                    start_time,
                    runners,
                    source: self.source_name().to_string(),
                    discipline: Discipline::Greyhound,
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
