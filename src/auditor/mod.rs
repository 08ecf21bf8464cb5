//! Matches stored predictions against finished-race results and writes
//! verdicts back exactly once (spec §4.8).

mod store;

pub use store::PredictionStore;

use std::collections::HashMap;

use chrono::{Duration, Utc};
use tracing::{info, warn};

use crate::domain::odds::PLACEHOLDER_ODDS;
use crate::domain::{places_paid_for, Prediction, ResultRace, Verdict};

const STANDARD_BET: f64 = 2.00;
const DEFAULT_LOOKBACK_HOURS: i64 = 48;

pub struct Auditor {
    lookback: Duration,
}

impl Auditor {
    pub fn new() -> Self {
        Self { lookback: Duration::hours(DEFAULT_LOOKBACK_HOURS) }
    }

    pub fn with_lookback_hours(hours: i64) -> Self {
        Self { lookback: Duration::hours(hours) }
    }

    /// Audits every unaudited prediction whose start time falls in the
    /// lookback window, against `results`. Returns the predictions that
    /// were updated (callers persist them via [`PredictionStore`]).
    pub fn audit(&self, predictions: &[Prediction], results: &[ResultRace]) -> Vec<Prediction> {
        let now = Utc::now();
        let cutoff = now - self.lookback;

        let mut strict: HashMap<String, &ResultRace> = HashMap::new();
        let mut relaxed: HashMap<String, &ResultRace> = HashMap::new();
        for result in results {
            strict.insert(result.strict_key(), result);
            relaxed.entry(result.relaxed_key()).or_insert(result);
        }

        predictions
            .iter()
            .filter(|p| !p.audit_completed && p.start_time >= cutoff && p.start_time <= now)
            .filter_map(|p| self.audit_one(p, &strict, &relaxed, results))
            .collect()
    }

    fn audit_one(
        &self,
        prediction: &Prediction,
        strict: &HashMap<String, &ResultRace>,
        relaxed: &HashMap<String, &ResultRace>,
        all_results: &[ResultRace],
    ) -> Option<Prediction> {
        let result = strict
            .get(&prediction.canonical_key())
            .copied()
            .or_else(|| relaxed.get(&prediction.relaxed_key()).copied())
            .or_else(|| {
                let prefix = prediction.discipline_relaxed_prefix();
                let found = all_results.iter().find(|r| r.discipline_relaxed_prefix() == prefix);
                if found.is_some() {
                    warn!(race_id = %prediction.race_id, "auditor matched via discipline-relaxed fallback");
                }
                found
            })?;

        let mut audited = prediction.clone();
        audited.audit_timestamp = Some(Utc::now());
        audited.audit_completed = true;

        let mut by_position: Vec<&crate::domain::ResultRunner> = result.runners.iter().collect();
        by_position.sort_by_key(|r| r.position_numeric.unwrap_or(u32::MAX));

        // Top finishers: ranked by finishing position, not source order, and
        // capped at 5 (mirrors get_top_finishers).
        audited.actual_top_5 = Some(
            by_position
                .iter()
                .filter(|r| r.position_numeric.is_some())
                .take(5)
                .map(|r| r.number.to_string())
                .collect::<Vec<_>>()
                .join(","),
        );

        // "2nd favorite" is a pre-race market concept, not "2nd place
        // finisher" — derive it from an odds-sorted list, excluding
        // scratched/zero/nil odds, as the first price strictly above the
        // favorite's.
        let mut by_odds: Vec<&crate::domain::ResultRunner> =
            result.runners.iter().filter(|r| matches!(r.final_win_odds, Some(o) if o > 0.0)).collect();
        by_odds.sort_by(|a, b| a.final_win_odds.partial_cmp(&b.final_win_odds).unwrap());
        audited.actual_2nd_fav_odds = by_odds.first().and_then(|fav| {
            let fav_odds = fav.final_win_odds?;
            by_odds.iter().skip(1).find_map(|r| r.final_win_odds.filter(|&o| o > fav_odds))
        });

        audited.trifecta_payout = result.trifecta_payout;
        audited.trifecta_combination = result.trifecta_combination.clone();
        audited.superfecta_payout = result.superfecta_payout;
        audited.superfecta_combination = result.superfecta_combination.clone();
        audited.top1_place_payout = by_position.first().and_then(|r| r.place_payout);
        audited.top2_place_payout = by_position.get(1).and_then(|r| r.place_payout);

        let Some(predicted_number) = prediction.predicted_number() else {
            audited.verdict = Some(Verdict::Void);
            audited.net_profit = Some(0.0);
            return Some(audited);
        };

        let Some(runner) = result.runners.iter().find(|r| r.number == predicted_number) else {
            audited.verdict = Some(Verdict::Void);
            audited.net_profit = Some(0.0);
            info!(race_id = %prediction.race_id, predicted_number, "auditor: predicted runner absent from result, voiding");
            return Some(audited);
        };

        audited.selection_position = runner.position_numeric;

        let Some(position) = runner.position_numeric else {
            audited.verdict = Some(Verdict::Burned);
            audited.net_profit = Some(-STANDARD_BET);
            return Some(audited);
        };

        let places_paid = places_paid_for(result.active_field_size());
        if position > places_paid {
            audited.verdict = Some(Verdict::Burned);
            audited.net_profit = Some(-STANDARD_BET);
            return Some(audited);
        }

        match runner.place_payout {
            Some(payout) if payout > 0.0 => {
                audited.verdict = Some(Verdict::Cashed);
                audited.net_profit = Some(payout - STANDARD_BET);
            }
            _ => {
                let final_odds = runner.final_win_odds.unwrap_or(PLACEHOLDER_ODDS);
                let estimated = (0.1_f64).max((final_odds - 1.0) / 5.0) * STANDARD_BET;
                audited.verdict = Some(Verdict::CashedEstimated);
                audited.net_profit = Some(estimated);
            }
        }

        Some(audited)
    }
}

impl Default for Auditor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Discipline, ResultRunner};

    fn prediction(venue: &str, race_number: u32, selection_number: u32, start_time: chrono::DateTime<Utc>) -> Prediction {
        Prediction {
            race_id: "x".into(),
            venue: venue.into(),
            race_number,
            start_time,
            discipline: Discipline::Thoroughbred,
            selection_number: Some(selection_number),
            selection_name: "Horse".into(),
            top_5: vec![],
            predicted_2nd_fav_odds: None,
            is_goldmine: false,
            audit_completed: false,
            verdict: None,
            net_profit: None,
            actual_top_5: None,
            actual_2nd_fav_odds: None,
            selection_position: None,
            trifecta_payout: None,
            trifecta_combination: None,
            superfecta_payout: None,
            superfecta_combination: None,
            top1_place_payout: None,
            top2_place_payout: None,
            audit_timestamp: None,
        }
    }

    fn result(venue: &str, race_number: u32, start_time: chrono::DateTime<Utc>, runners: Vec<ResultRunner>) -> ResultRace {
        ResultRace {
            venue: venue.into(),
            race_number,
            start_time,
            discipline: Discipline::Thoroughbred,
            runners,
            trifecta_payout: None,
            trifecta_combination: None,
            superfecta_payout: None,
            superfecta_combination: None,
        }
    }

    #[test]
    fn cashes_winner_with_known_place_payout() {
        let start = Utc::now() - Duration::hours(1);
        let pred = prediction("Aqueduct", 1, 3, start);
        let res = result(
            "aqueduct",
            1,
            start,
            vec![
                ResultRunner { number: 3, name: "A".into(), position_numeric: Some(1), final_win_odds: Some(3.0), place_payout: Some(4.4) },
                ResultRunner { number: 1, name: "B".into(), position_numeric: Some(2), final_win_odds: Some(5.0), place_payout: Some(3.0) },
            ],
        );
        let audited = Auditor::new().audit(&[pred], &[res]);
        assert_eq!(audited.len(), 1);
        assert_eq!(audited[0].verdict, Some(Verdict::Cashed));
        assert_eq!(audited[0].net_profit, Some(2.4));
    }

    #[test]
    fn burns_when_outside_places_paid() {
        let start = Utc::now() - Duration::hours(1);
        let pred = prediction("Aqueduct", 1, 3, start);
        let res = result(
            "aqueduct",
            1,
            start,
            vec![ResultRunner { number: 3, name: "A".into(), position_numeric: Some(5), final_win_odds: Some(3.0), place_payout: None }],
        );
        let audited = Auditor::new().audit(&[pred], &[res]);
        assert_eq!(audited[0].verdict, Some(Verdict::Burned));
        assert_eq!(audited[0].net_profit, Some(-STANDARD_BET));
    }

    #[test]
    fn voids_when_predicted_runner_absent() {
        let start = Utc::now() - Duration::hours(1);
        let pred = prediction("Aqueduct", 1, 9, start);
        let res = result(
            "aqueduct",
            1,
            start,
            vec![ResultRunner { number: 3, name: "A".into(), position_numeric: Some(1), final_win_odds: Some(3.0), place_payout: Some(4.0) }],
        );
        let audited = Auditor::new().audit(&[pred], &[res]);
        assert_eq!(audited[0].verdict, Some(Verdict::Void));
    }

    #[test]
    fn skips_predictions_outside_lookback_window() {
        let start = Utc::now() - Duration::hours(100);
        let pred = prediction("Aqueduct", 1, 3, start);
        let res = result("aqueduct", 1, start, vec![]);
        let audited = Auditor::new().audit(&[pred], &[res]);
        assert!(audited.is_empty());
    }
}
