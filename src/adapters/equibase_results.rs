//! Equibase summary-chart results adapter (thoroughbred), grounded on
//! `results/equibase_results_adapter.py`. Results adapters parse into
//! `ResultRace`, not `Race`, so they reuse the base fetch/retry policy but
//! bypass the discovery post-parse validation (no win-odds trust ratio to
//! compute over a finished race).

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;

use super::http::fetch_text;
use super::{Adapter, AdapterType, RawPayload};
use crate::domain::{Discipline, Race, ResultRace, ResultRunner};
use crate::error::PaddockError;

pub struct EquibaseResultsAdapter {
    base_url: String,
}

impl EquibaseResultsAdapter {
    pub fn new() -> Self {
        Self { base_url: "https://www.equibase.com/static/chart/summary".to_string() }
    }

}

impl Default for EquibaseResultsAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct EqbResultsResponse {
    charts: Vec<EqbChart>,
}

#[derive(Debug, Deserialize)]
struct EqbChart {
    track: String,
    race_number: u32,
    post_time_utc: String,
    finishers: Vec<EqbFinisher>,
    #[serde(default)]
    trifecta_payout: Option<f64>,
    #[serde(default)]
    trifecta_combo: Option<String>,
    #[serde(default)]
    superfecta_payout: Option<f64>,
    #[serde(default)]
    superfecta_combo: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EqbFinisher {
    program_number: u32,
    horse_name: String,
    #[serde(default)]
    finish_position: Option<u32>,
    #[serde(default)]
    win_odds: Option<String>,
    #[serde(default)]
    place_payout: Option<f64>,
}

#[async_trait]
impl Adapter for EquibaseResultsAdapter {
    fn source_name(&self) -> &str {
        "EquibaseResults"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Results
    }

    async fn fetch_data(&self, date: &str) -> Result<RawPayload, PaddockError> {
        fetch_text(&format!("{}?date={}", self.base_url, date), self.source_name(), &[]).await
    }

    fn parse_races(&self, _raw: &RawPayload) -> Result<Vec<Race>, PaddockError> {
        Ok(Vec::new())
    }

    /// The results-specific parse path; the generic `parse_races` above
    /// returns an empty `Race` list since results don't feed the discovery
    /// pipeline (spec §4.8 reads results separately, via this method).
    fn parse_results(&self, raw: &RawPayload) -> Result<Vec<ResultRace>, PaddockError> {
        let value: Value = match raw {
            RawPayload::Text(t) => serde_json::from_str(t)
                .map_err(|e| PaddockError::Parsing { adapter: self.source_name().to_string(), reason: e.to_string() })?,
            RawPayload::Json(v) => v.clone(),
        };
        let parsed: EqbResultsResponse = serde_json::from_value(value)
            .map_err(|e| PaddockError::Parsing { adapter: self.source_name().to_string(), reason: e.to_string() })?;

        Ok(parsed
            .charts
            .into_iter()
            .map(|c| {
                let start_time = chrono::DateTime::parse_from_rfc3339(&c.post_time_utc)
                    .map(|dt| dt.with_timezone(&Utc))
                    .unwrap_or_else(|_| Utc::now());
                ResultRace {
                    venue: c.track,
                    race_number: c.race_number,
                    start_time,
                    discipline: Discipline::Thoroughbred,
                    runners: c
                        .finishers
                        .into_iter()
                        .map(|f| ResultRunner {
                            number: f.program_number,
                            name: f.horse_name,
                            position_numeric: f.finish_position,
                            final_win_odds: f.win_odds.as_deref().and_then(crate::domain::parse_odds),
                            place_payout: f.place_payout,
                        })
                        .collect(),
                    trifecta_payout: c.trifecta_payout,
                    trifecta_combination: c.trifecta_combo,
                    superfecta_payout: c.superfecta_payout,
                    superfecta_combination: c.superfecta_combo,
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_charts_into_result_races() {
        let adapter = EquibaseResultsAdapter::new();
        let raw = RawPayload::Text(
            r#"{"charts":[{"track":"Churchill Downs","race_number":4,"post_time_utc":"2026-07-30T20:00:00Z","finishers":[{"program_number":1,"horse_name":"A","finish_position":1,"win_odds":"2.40"}],"trifecta_payout":142.0,"trifecta_combo":"1-2-3"}]}"#
                .to_string(),
        );
        let results = adapter.parse_results(&raw).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].places_paid(), 1);
    }
}
