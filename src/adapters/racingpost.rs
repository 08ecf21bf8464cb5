//! racingpost.com discovery adapter, grounded on `racingpost_adapter.py`.

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

pub struct RacingPostAdapter {
    base_url: String,
}

impl RacingPostAdapter {
    pub fn new() -> Self {
        Self { base_url: "https://www.racingpost.com/json/racecards".to_string() }
    }
}

impl Default for RacingPostAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct RpResponse {
    racecards: Vec<RpRace>,
}

#[derive(Debug, Deserialize)]
struct RpRace {
    course: String,
    race_no: u32,
    off_dt: String,
    horses: Vec<RpHorse>,
}

#[derive(Debug, Deserialize)]
struct RpHorse {
    cloth_number: u32,
    horse_name: String,
    #[serde(default)]
    is_non_runner: bool,
    #[serde(default)]
    current_price: Option<String>,
}

#[async_trait]
impl Adapter for RacingPostAdapter {
    fn source_name(&self) -> &str {
        "RacingPost"
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
        let parsed: RpResponse = serde_json::from_value(value)
            .map_err(|e| PaddockError::Parsing { adapter: self.source_name().to_string(), reason: e.to_string() })?;

        Ok(parsed
            .racecards
            .into_iter()
            .map(|r| {
                let start_time = chrono::DateTime::parse_from_rfc3339(&r.off_dt)
                    .map(|dt| dt.with_timezone(&Utc))
                    .unwrap_or_else(|_| Utc::now());
                let runners = r
                    .horses
                    .into_iter()
                    .map(|h| {
                        build_runner(
                            self.source_name(),
                            &h.horse_name,
                            h.cloth_number,
                            h.is_non_runner,
                            h.current_price.as_deref(),
                        )
                    })
                    .collect();
                let id = generate_race_id("rp", &r.course, start_time, r.race_no, Discipline::Thoroughbred);
                Race {
                    id,
                    venue: r.course,
                    race_number: r.race_no,
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
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_racecards() {
        let adapter = RacingPostAdapter::new();
        let raw = RawPayload::Text(
            r#"{"racecards":[{"course":"Ascot","race_no":2,"off_dt":"2026-07-30T14:30:00Z","horses":[{"cloth_number":1,"horse_name":"A"},{"cloth_number":2,"horse_name":"B","current_price":"5/2"}]}]}"#
                .to_string(),
        );
        let races = adapter.parse_races(&raw).unwrap();
        assert_eq!(races.len(), 1);
        assert_eq!(races[0].runners.len(), 2);
    }
}
