//! attheraces.com results adapter (thoroughbred + greyhound), grounded on
//! `results/at_the_races_results_adapter.py`.

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;

use super::http::fetch_text;
use super::{Adapter, AdapterType, RawPayload};
use crate::domain::{Discipline, Race, ResultRace, ResultRunner};
use crate::error::PaddockError;

pub struct AtTheRacesResultsAdapter {
    base_url: String,
}

impl AtTheRacesResultsAdapter {
    pub fn new() -> Self {
        Self { base_url: "https://www.attheraces.com/api/results".to_string() }
    }
}

impl Default for AtTheRacesResultsAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct AtrResultsResponse {
    results: Vec<AtrResult>,
}

#[derive(Debug, Deserialize)]
struct AtrResult {
    track: String,
    race_number: u32,
    off_time_utc: String,
    #[serde(default)]
    is_greyhound: bool,
    result: Vec<AtrFinisher>,
    #[serde(default)]
    trifecta_dividend: Option<f64>,
    #[serde(default)]
    trifecta_result: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtrFinisher {
    number: u32,
    name: String,
    #[serde(default)]
    position: Option<u32>,
    #[serde(default)]
    sp: Option<String>,
    #[serde(default)]
    place_payout: Option<f64>,
}

#[async_trait]
impl Adapter for AtTheRacesResultsAdapter {
    fn source_name(&self) -> &str {
        "AtTheRacesResults"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Results
    }

    async fn fetch_data(&self, date: &str) -> Result<RawPayload, PaddockError> {
        fetch_text(&format!("{}/{}", self.base_url, date), self.source_name(), &[]).await
    }

    fn parse_races(&self, _raw: &RawPayload) -> Result<Vec<Race>, PaddockError> {
        Ok(Vec::new())
    }

    fn parse_results(&self, raw: &RawPayload) -> Result<Vec<ResultRace>, PaddockError> {
        let value: Value = match raw {
            RawPayload::Text(t) => serde_json::from_str(t)
                .map_err(|e| PaddockError::Parsing { adapter: self.source_name().to_string(), reason: e.to_string() })?,
            RawPayload::Json(v) => v.clone(),
        };
        let parsed: AtrResultsResponse = serde_json::from_value(value)
            .map_err(|e| PaddockError::Parsing { adapter: self.source_name().to_string(), reason: e.to_string() })?;

        Ok(parsed
            .results
            .into_iter()
            .map(|r| {
                let start_time = chrono::DateTime::parse_from_rfc3339(&r.off_time_utc)
                    .map(|dt| dt.with_timezone(&Utc))
                    .unwrap_or_else(|_| Utc::now());
                let discipline = if r.is_greyhound { Discipline::Greyhound } else { Discipline::Thoroughbred };
                ResultRace {
                    venue: r.track,
                    race_number: r.race_number,
                    start_time,
                    discipline,
                    runners: r
                        .result
                        .into_iter()
                        .map(|f| ResultRunner {
                            number: f.number,
                            name: f.name,
                            position_numeric: f.position,
                            final_win_odds: f.sp.as_deref().and_then(crate::domain::parse_odds),
                            place_payout: f.place_payout,
                        })
                        .collect(),
                    trifecta_payout: r.trifecta_dividend,
                    trifecta_combination: r.trifecta_result,
                    superfecta_payout: None,
                    superfecta_combination: None,
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_mixed_discipline_results() {
        let adapter = AtTheRacesResultsAdapter::new();
        let raw = RawPayload::Text(
            r#"{"results":[{"track":"Romford","race_number":1,"off_time_utc":"2026-07-30T18:00:00Z","is_greyhound":true,"result":[{"number":1,"name":"A","position":1}]}]}"#
                .to_string(),
        );
        let results = adapter.parse_results(&raw).unwrap();
        assert_eq!(results[0].discipline, Discipline::Greyhound);
    }
}
