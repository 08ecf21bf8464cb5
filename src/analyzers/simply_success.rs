//! Broadest qualifier: every race with a sane field passes, flagged for
//! goldmine/best-bet quality rather than filtered by odds floor (spec §4.7).

use std::collections::HashMap;

use chrono::Utc;
use serde_json::json;

use super::{within_post_window, Analyzer, QualificationResult};
use crate::domain::Race;

pub struct SimplySuccessAnalyzer {
    trustworthy_ratio_min: f64,
}

impl SimplySuccessAnalyzer {
    pub fn new(trustworthy_ratio_min: f64) -> Self {
        Self { trustworthy_ratio_min }
    }
}

impl Analyzer for SimplySuccessAnalyzer {
    fn name(&self) -> &str {
        "simply_success"
    }

    fn qualify_races(&self, races: &[Race]) -> QualificationResult {
        let now = Utc::now();
        let qualified: Vec<Race> = races
            .iter()
            .filter(|r| r.active_count() >= 2)
            .filter(|r| within_post_window(r.start_time, now))
            .filter(|r| r.trust_ratio() >= self.trustworthy_ratio_min)
            .map(|r| {
                let mut race = r.clone();
                race.qualification_score = Some(100.0);

                let mut priced: Vec<f64> = race.active_runners().filter_map(|rr| rr.best_win_odds()).collect();
                priced.sort_by(|a, b| a.partial_cmp(b).unwrap());

                if priced.len() >= 2 {
                    let fav = priced[0];
                    let sec_fav = priced[1];
                    let active_count = race.active_count();
                    let is_goldmine = active_count <= 11 && sec_fav >= 4.5 && (sec_fav - fav) > 0.25;
                    let is_best_bet = active_count <= 11 && sec_fav >= 3.5 && (sec_fav - fav) > 0.25;
                    race.metadata.insert("is_goldmine".to_string(), json!(is_goldmine));
                    race.metadata.insert("is_best_bet".to_string(), json!(is_best_bet));
                }

                race
            })
            .collect();

        let mut criteria = HashMap::new();
        criteria.insert("trustworthy_ratio_min".to_string(), json!(self.trustworthy_ratio_min));

        QualificationResult { criteria, races: qualified }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Discipline, OddsData, Runner};
    use std::collections::HashMap as StdHashMap;

    fn race_with_odds(odds: Vec<f64>) -> Race {
        let runners: Vec<Runner> = odds
            .into_iter()
            .enumerate()
            .map(|(i, w)| {
                let mut r = Runner::new(&format!("Horse {i}"), (i + 1) as u32);
                let mut o = OddsData::new("A");
                o.win = Some(w);
                r.odds.insert("A".into(), o);
                r
            })
            .collect();
        Race {
            id: "x".into(),
            venue: "Aqueduct".into(),
            race_number: 1,
            start_time: Utc::now() + chrono::Duration::minutes(30),
            runners,
            source: "A".into(),
            discipline: Discipline::Thoroughbred,
            distance: None,
            field_size: None,
            qualification_score: None,
            available_bets: vec![],
            is_error_placeholder: false,
            error_message: None,
            metadata: StdHashMap::new(),
        }
    }

    #[test]
    fn flags_goldmine_on_wide_spread() {
        let analyzer = SimplySuccessAnalyzer::new(0.7);
        let races = vec![race_with_odds(vec![2.0, 5.0])];
        let result = analyzer.qualify_races(&races);
        assert_eq!(result.races[0].metadata.get("is_goldmine"), Some(&json!(true)));
    }

    #[test]
    fn score_is_always_100() {
        let analyzer = SimplySuccessAnalyzer::new(0.7);
        let races = vec![race_with_odds(vec![2.0, 3.0])];
        let result = analyzer.qualify_races(&races);
        assert_eq!(result.races[0].qualification_score, Some(100.0));
    }
}
