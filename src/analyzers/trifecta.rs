//! The canonical trifecta-qualification scorer (spec §4.7).

use std::collections::HashMap;

use chrono::Utc;
use serde_json::json;

use super::{within_post_window, Analyzer, QualificationResult};
use crate::domain::Race;

pub struct TrifectaAnalyzer {
    max_field_size: usize,
    min_favorite_odds: f64,
    min_second_favorite_odds: f64,
    trustworthy_ratio_min: f64,
    name: &'static str,
}

impl TrifectaAnalyzer {
    pub fn new(trustworthy_ratio_min: f64) -> Self {
        Self {
            max_field_size: 10,
            min_favorite_odds: 2.0,
            min_second_favorite_odds: 0.0,
            trustworthy_ratio_min,
            name: "trifecta",
        }
    }

    fn score_race(&self, race: &Race, now: chrono::DateTime<Utc>) -> Option<f64> {
        if race.active_count() < 3 {
            return None;
        }
        if !within_post_window(race.start_time, now) {
            return None;
        }
        if race.trust_ratio() < self.trustworthy_ratio_min {
            return None;
        }

        let mut priced: Vec<f64> = race
            .active_runners()
            .filter_map(|r| r.best_win_odds())
            .collect();
        if priced.len() < 2 {
            return None;
        }
        priced.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let fav = priced[0];
        let sec_fav = priced[1];

        let active_count = race.active_count();
        if active_count > self.max_field_size {
            return None;
        }
        if fav < 2.0 || fav < self.min_favorite_odds || sec_fav < self.min_second_favorite_odds {
            return None;
        }

        let field_score = (self.max_field_size - active_count) as f64 / self.max_field_size as f64;
        let fav_odds_score = (fav / 10.0).min(1.0);
        let sec_fav_odds_score = (sec_fav / 15.0).min(1.0);
        let odds_score = 0.6 * fav_odds_score + 0.4 * sec_fav_odds_score;
        let score = (0.3 * field_score + 0.7 * odds_score) * 100.0;
        Some((score * 100.0).round() / 100.0)
    }
}

impl Analyzer for TrifectaAnalyzer {
    fn name(&self) -> &str {
        self.name
    }

    fn qualify_races(&self, races: &[Race]) -> QualificationResult {
        let now = Utc::now();
        let mut qualified: Vec<Race> = races
            .iter()
            .filter_map(|r| {
                self.score_race(r, now).map(|score| {
                    let mut race = r.clone();
                    race.qualification_score = Some(score);
                    race
                })
            })
            .collect();
        qualified.sort_by(|a, b| b.qualification_score.partial_cmp(&a.qualification_score).unwrap());

        let mut criteria = HashMap::new();
        criteria.insert("max_field_size".to_string(), json!(self.max_field_size));
        criteria.insert("min_favorite_odds".to_string(), json!(self.min_favorite_odds));
        criteria.insert("min_second_favorite_odds".to_string(), json!(self.min_second_favorite_odds));
        criteria.insert("trustworthy_ratio_min".to_string(), json!(self.trustworthy_ratio_min));

        QualificationResult { criteria, races: qualified }
    }
}

/// TinyField variant: tighter field cap, both odds floors relaxed to an
/// effectively-always-pass 0.01.
pub struct TinyFieldTrifectaAnalyzer {
    inner: TrifectaAnalyzer,
}

impl TinyFieldTrifectaAnalyzer {
    pub fn new(trustworthy_ratio_min: f64) -> Self {
        Self {
            inner: TrifectaAnalyzer {
                max_field_size: 6,
                min_favorite_odds: 0.01,
                min_second_favorite_odds: 0.01,
                trustworthy_ratio_min,
                name: "tiny_field_trifecta",
            },
        }
    }
}

impl Analyzer for TinyFieldTrifectaAnalyzer {
    fn name(&self) -> &str {
        self.inner.name
    }

    fn qualify_races(&self, races: &[Race]) -> QualificationResult {
        self.inner.qualify_races(races)
    }
}
