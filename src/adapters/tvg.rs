//! tvg.com discovery adapter, grounded on `tvg_adapter.py`. TVG carries both
//! harness and thoroughbred cards; discipline is read off each event.

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

pub struct TvgAdapter {
    base_url: String,
    api_key: Option<String>,
}

impl TvgAdapter {
    pub fn new(api_key: Option<String>) -> Self {
        Self { base_url: "https://service.tvg.com/api/races".to_string(), api_key }
    }
}

#[derive(Debug, Deserialize)]
struct TvgResponse {
    races: Vec<TvgRace>,
}

#[derive(Debug, Deserialize)]
struct TvgRace {
    track_name: String,
    race_number: u32,
    post_time: String,
    breed: String,
    runners: Vec<TvgRunner>,
}

#[derive(Debug, Deserialize)]
struct TvgRunner {
    program_number: u32,
    runner_name: String,
    #[serde(default)]
    is_scratched: bool,
    #[serde(default)]
    odds: Option<String>,
}

fn discipline_from_breed(breed: &str) -> Discipline {
    match breed.to_lowercase().as_str() {
        "harness" | "standardbred" => Discipline::Harness,
        "quarter horse" | "quarterhorse" => Discipline::QuarterHorse,
        _ => Discipline::Thoroughbred,
    }
}

#[async_trait]
impl Adapter for TvgAdapter {
    fn source_name(&self) -> &str {
        "Tvg"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Discovery
    }

    async fn fetch_data(&self, date: &str) -> Result<RawPayload, PaddockError> {
        let url = format!("{}?date={}", self.base_url, date);
        let headers: Vec<(&str, &str)> =
            self.api_key.as_deref().map(|k| vec![("X-Api-Key", k)]).unwrap_or_default();
        fetch_text(&url, self.source_name(), &headers).await
    }

    fn parse_races(&self, raw: &RawPayload) -> Result<Vec<Race>, PaddockError> {
        let value: Value = match raw {
            RawPayload::Text(t) => serde_json::from_str(t)
                .map_err(|e| PaddockError::Parsing { adapter: self.source_name().to_string(), reason: e.to_string() })?,
            RawPayload::Json(v) => v.clone(),
        };
        let parsed: TvgResponse = serde_json::from_value(value)
            .map_err(|e| PaddockError::Parsing { adapter: self.source_name().to_string(), reason: e.to_string() })?;

        Ok(parsed
            .races
            .into_iter()
            .map(|r| {
                let start_time = chrono::DateTime::parse_from_rfc3339(&r.post_time)
                    .map(|dt| dt.with_timezone(&Utc))
                    .unwrap_or_else(|_| Utc::now());
                let discipline = discipline_from_breed(&r.breed);
                let runners = r
                    .runners
                    .into_iter()
                    .map(|rr| {
                        build_runner(self.source_name(), &rr.runner_name, rr.program_number, rr.is_scratched, rr.odds.as_deref())
                    })
                    .collect();
                let id = generate_race_id("tvg", &r.track_name, start_time, r.race_number, discipline);
                Race {
                    id,
                    venue: r.track_name,
                    race_number: r.race_number,
                    start_time,
                    runners,
                    source: self.source_name().to_string(),
                    discipline,
                    distance: None,
                    field_size: None,
                    qualification_score: None,
                    available_bets: vec![],
                    is_error_placeholder: false,
                    error_message: None,
                    metadata: HashMap::new(),
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn breed_maps_to_discipline() {
        assert_eq!(discipline_from_breed("Harness"), Discipline::Harness);
        assert_eq!(discipline_from_breed("Thoroughbred"), Discipline::Thoroughbred);
    }

    #[test]
    fn parses_mixed_breed_races() {
        let adapter = TvgAdapter::new(None);
        let raw = RawPayload::Text(
            r#"{"races":[{"track_name":"Yonkers","race_number":1,"post_time":"2026-07-30T23:00:00Z","breed":"harness","runners":[{"program_number":1,"runner_name":"A"},{"program_number":2,"runner_name":"B"}]}]}"#
                .to_string(),
        );
        let races = adapter.parse_races(&raw).unwrap();
        assert_eq!(races[0].discipline, Discipline::Harness);
    }
}
