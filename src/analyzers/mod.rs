//! Scoring plugins applied to the merged race set (spec §4.7). Analyzers
//! never mutate input beyond `qualification_score` and `metadata`.

mod favorite_to_place;
mod simply_success;
mod trifecta;

pub use favorite_to_place::{FavoriteToPlaceMonitor, RaceSummary};
pub use simply_success::SimplySuccessAnalyzer;
pub use trifecta::{TinyFieldTrifectaAnalyzer, TrifectaAnalyzer};

use std::collections::HashMap;

use serde_json::Value;

use crate::domain::Race;

#[derive(Debug, Clone, serde::Serialize)]
pub struct QualificationResult {
    pub criteria: HashMap<String, Value>,
    pub races: Vec<Race>,
}

pub trait Analyzer: Send + Sync {
    fn name(&self) -> &str;
    fn qualify_races(&self, races: &[Race]) -> QualificationResult;
}

/// Time-window filter shared by TrifectaAnalyzer and SimplySuccessAnalyzer:
/// `(now - 45min) < start_time < (now + 120min)` in Eastern.
pub(crate) fn within_post_window(start_time: chrono::DateTime<chrono::Utc>, now: chrono::DateTime<chrono::Utc>) -> bool {
    let lower = now - chrono::Duration::minutes(45);
    let upper = now + chrono::Duration::minutes(120);
    start_time > lower && start_time < upper
}

/// Registry of analyzer constructors, by name (spec §4.7: `get_analyzer`).
pub struct AnalyzerEngine;

impl AnalyzerEngine {
    pub fn get_analyzer(name: &str, trustworthy_ratio_min: f64) -> Option<Box<dyn Analyzer>> {
        match name {
            "trifecta" => Some(Box::new(TrifectaAnalyzer::new(trustworthy_ratio_min))),
            "tiny_field_trifecta" => Some(Box::new(TinyFieldTrifectaAnalyzer::new(trustworthy_ratio_min))),
            "simply_success" => Some(Box::new(SimplySuccessAnalyzer::new(trustworthy_ratio_min))),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_analyzer_name_is_none() {
        assert!(AnalyzerEngine::get_analyzer("does_not_exist", 0.7).is_none());
    }

    #[test]
    fn known_names_resolve() {
        assert!(AnalyzerEngine::get_analyzer("trifecta", 0.7).is_some());
        assert!(AnalyzerEngine::get_analyzer("tiny_field_trifecta", 0.7).is_some());
        assert!(AnalyzerEngine::get_analyzer("simply_success", 0.7).is_some());
    }
}
