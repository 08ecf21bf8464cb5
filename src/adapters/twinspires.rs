//! twinspires.com discovery adapter, grounded on `twinspires_adapter.py`.

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

pub struct TwinSpiresAdapter {
    base_url: String,
}

impl TwinSpiresAdapter {
    pub fn new() -> Self {
        Self { base_url: "https://www.twinspires.com/api/races".to_string() }
    }
}

impl Default for TwinSpiresAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct TsResponse {
    events: Vec<TsEvent>,
}

#[derive(Debug, Deserialize)]
struct TsEvent {
    venue_name: String,
    race_num: u32,
    start_time_utc: String,
    runners: Vec<TsRunner>,
}

#[derive(Debug, Deserialize)]
struct TsRunner {
    saddlecloth: u32,
    name: String,
    #[serde(default)]
    scratched: bool,
    #[serde(default)]
    live_odds: Option<String>,
}

#[async_trait]
impl Adapter for TwinSpiresAdapter {
    fn source_name(&self) -> &str {
        "TwinSpires"
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
        let parsed: TsResponse = serde_json::from_value(value)
            .map_err(|e| PaddockError::Parsing { adapter: self.source_name().to_string(), reason: e.to_string() })?;

        Ok(parsed
            .events
            .into_iter()
            .map(|e| {
                let start_time = chrono::DateTime::parse_from_rfc3339(&e.start_time_utc)
                    .map(|dt| dt.with_timezone(&Utc))
                    .unwrap_or_else(|_| Utc::now());
                let runners = e
                    .runners
                    .into_iter()
                    .map(|r| build_runner(self.source_name(), &r.name, r.saddlecloth, r.scratched, r.live_odds.as_deref()))
                    .collect();
                let id = generate_race_id("tsp", &e.venue_name, start_time, e.race_num, Discipline::Thoroughbred);
                Race {
                    id,
                    venue: e.venue_name,
                    race_number: e.race_num,
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
    fn parses_events() {
        let adapter = TwinSpiresAdapter::new();
        let raw = RawPayload::Text(
            r#"{"events":[{"venue_name":"Saratoga","race_num":5,"start_time_utc":"2026-07-30T21:00:00Z","runners":[{"saddlecloth":1,"name":"A"},{"saddlecloth":2,"name":"B","live_odds":"3.50"}]}]}"#
                .to_string(),
        );
        let races = adapter.parse_races(&raw).unwrap();
        assert_eq!(races.len(), 1);
        assert_eq!(races[0].runners.len(), 2);
    }
}
