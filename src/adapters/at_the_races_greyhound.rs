//! attheraces.com greyhound discovery adapter, grounded on
//! `at_the_races_greyhound_adapter.py`. Shares AtTheRaces' wire shape but a
//! distinct endpoint and discipline.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;

use super::base::generate_race_id;
use super::{Adapter, AdapterType, RawPayload};
use crate::domain::{Discipline, OddsData, Race, Runner};
use crate::error::PaddockError;

pub struct AtTheRacesGreyhoundAdapter {
    base_url: String,
}

impl AtTheRacesGreyhoundAdapter {
    pub fn new() -> Self {
        Self { base_url: "https://www.attheraces.com/api/greyhound-racecards".to_string() }
    }
}

impl Default for AtTheRacesGreyhoundAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct GhRacecardsResponse {
    meetings: Vec<GhMeeting>,
}

#[derive(Debug, Deserialize)]
struct GhMeeting {
    track: String,
    races: Vec<GhRace>,
}

#[derive(Debug, Deserialize)]
struct GhRace {
    race_number: u32,
    #[serde(rename = "off_time_utc")]
    off_time_utc: String,
    traps: Vec<GhTrap>,
}

#[derive(Debug, Deserialize)]
struct GhTrap {
    trap_number: u32,
    dog_name: String,
    #[serde(default)]
    withdrawn: bool,
    #[serde(default)]
    forecast_price: Option<String>,
}

#[async_trait]
impl Adapter for AtTheRacesGreyhoundAdapter {
    fn source_name(&self) -> &str {
        "AtTheRacesGreyhound"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Discovery
    }

    async fn fetch_data(&self, date: &str) -> Result<RawPayload, PaddockError> {
        let url = format!("{}/{}", self.base_url, date);
        let client = reqwest::Client::new();
        let response = client
            .get(&url)
            .send()
            .await
            .map_err(|e| PaddockError::Network { adapter: self.source_name().to_string(), reason: e.to_string() })?;
        let status = response.status();
        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(PaddockError::Authentication { adapter: self.source_name().to_string() });
        }
        if !status.is_success() {
            return Err(PaddockError::Http { status: status.as_u16(), url });
        }
        let text = response
            .text()
            .await
            .map_err(|e| PaddockError::Network { adapter: self.source_name().to_string(), reason: e.to_string() })?;
        Ok(RawPayload::Text(text))
    }

    fn parse_races(&self, raw: &RawPayload) -> Result<Vec<Race>, PaddockError> {
        let value: Value = match raw {
            RawPayload::Text(t) => serde_json::from_str(t)
                .map_err(|e| PaddockError::Parsing { adapter: self.source_name().to_string(), reason: e.to_string() })?,
            RawPayload::Json(v) => v.clone(),
        };
        let parsed: GhRacecardsResponse = serde_json::from_value(value)
            .map_err(|e| PaddockError::Parsing { adapter: self.source_name().to_string(), reason: e.to_string() })?;

        let mut races = Vec::new();
        for meeting in parsed.meetings {
            for race in meeting.races {
                let start_time = chrono::DateTime::parse_from_rfc3339(&race.off_time_utc)
                    .map(|dt| dt.with_timezone(&Utc))
                    .unwrap_or_else(|_| Utc::now());

                let runners: Vec<Runner> = race
                    .traps
                    .into_iter()
                    .map(|t| {
                        let mut runner = Runner::new(&t.dog_name, t.trap_number);
                        runner.scratched = t.withdrawn;
                        if let Some(price) = t.forecast_price.as_deref() {
                            if let Some(win) = crate::domain::parse_odds(price) {
                                let mut odds = OddsData::new(self.source_name());
                                odds.win = Some(win);
                                runner.odds.insert(self.source_name().to_string(), odds);
                            }
                        }
                        runner
                    })
                    .collect();

                let id = generate_race_id("atrg", &meeting.track, start_time, race.race_number, Discipline::Greyhound);
                races.push(Race {
                    id,
                    venue: meeting.track.clone(),
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
