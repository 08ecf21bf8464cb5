//! attheraces.com discovery adapter (Thoroughbred).
//!
//! Grounded on `at_the_races_adapter.py`: a racecard index page is fetched
//! for the date, then each listed race is itself a JSON racecard payload in
//! this port (the original scrapes per-race HTML; the wire shape here is
//! the index-of-races JSON an API-first deployment would expose instead).

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;

use super::base::generate_race_id;
use super::{Adapter, AdapterType, RawPayload};
use crate::domain::{Discipline, OddsData, Race, Runner};
use crate::error::PaddockError;

pub struct AtTheRacesAdapter {
    base_url: String,
}

impl AtTheRacesAdapter {
    pub fn new() -> Self {
        Self { base_url: "https://www.attheraces.com/api/racecards".to_string() }
    }
}

impl Default for AtTheRacesAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct AtrRacecardsResponse {
    races: Vec<AtrRace>,
}

#[derive(Debug, Deserialize)]
struct AtrRace {
    track: String,
    race_number: u32,
    #[serde(rename = "off_time_utc")]
    off_time_utc: String,
    runners: Vec<AtrRunner>,
}

#[derive(Debug, Deserialize)]
struct AtrRunner {
    number: u32,
    name: String,
    #[serde(default)]
    non_runner: bool,
    #[serde(default)]
    sp: Option<String>,
}

#[async_trait]
impl Adapter for AtTheRacesAdapter {
    fn source_name(&self) -> &str {
        "AtTheRaces"
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
        let text = match raw {
            RawPayload::Text(t) => t.as_str(),
            RawPayload::Json(v) => return self.parse_json(v),
        };
        let parsed: AtrRacecardsResponse = serde_json::from_str(text)
            .map_err(|e| PaddockError::Parsing { adapter: self.source_name().to_string(), reason: e.to_string() })?;
        Ok(self.to_races(parsed))
    }
}

impl AtTheRacesAdapter {
    fn parse_json(&self, value: &Value) -> Result<Vec<Race>, PaddockError> {
        let parsed: AtrRacecardsResponse = serde_json::from_value(value.clone())
            .map_err(|e| PaddockError::Parsing { adapter: self.source_name().to_string(), reason: e.to_string() })?;
        Ok(self.to_races(parsed))
    }

    fn to_races(&self, parsed: AtrRacecardsResponse) -> Vec<Race> {
        parsed
            .races
            .into_iter()
            .filter_map(|r| {
                let start_time = chrono::DateTime::parse_from_rfc3339(&r.off_time_utc)
                    .map(|dt| dt.with_timezone(&Utc))
                    .unwrap_or_else(|_| Utc::now());

                let runners: Vec<Runner> = r
                    .runners
                    .into_iter()
                    .map(|rr| {
                        let mut runner = Runner::new(&rr.name, rr.number);
                        runner.scratched = rr.non_runner;
                        if let Some(sp) = rr.sp.as_deref() {
                            if let Some(win) = crate::domain::parse_odds(sp) {
                                let mut odds = OddsData::new(self.source_name());
                                odds.win = Some(win);
                                runner.odds.insert(self.source_name().to_string(), odds);
                            }
                        }
                        runner
                    })
                    .collect();

                let id = generate_race_id("atr", &r.track, start_time, r.race_number, Discipline::Thoroughbred);
                Some(Race {
                    id,
                    venue: r.track,
                    race_number: r.race_number,
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
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_racecard_json() {
        let adapter = AtTheRacesAdapter::new();
        let raw = RawPayload::Text(
            r#"{"races":[{"track":"Aqueduct","race_number":1,"off_time_utc":"2026-07-30T18:00:00Z","runners":[{"number":1,"name":"Horse A","sp":"7/4"},{"number":2,"name":"Horse B","sp":"evens"}]}]}"#
                .to_string(),
        );
        let races = adapter.parse_races(&raw).unwrap();
        assert_eq!(races.len(), 1);
        assert_eq!(races[0].runners.len(), 2);
        assert_eq!(races[0].discipline, Discipline::Thoroughbred);
    }
}
