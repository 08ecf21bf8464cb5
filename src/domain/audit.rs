//! The auditor's result-race and prediction/tip models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::normalize::{canonical_venue, normalize_venue};
use super::race::Discipline;

/// A runner's outcome within a [`ResultRace`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultRunner {
    pub number: u32,
    pub name: String,
    /// Finishing position, if the result page recorded it (top-5 typically).
    pub position_numeric: Option<u32>,
    pub final_win_odds: Option<f64>,
    pub place_payout: Option<f64>,
}

/// A finished race: a [`Race`](super::race::Race) extended with payouts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultRace {
    pub venue: String,
    pub race_number: u32,
    pub start_time: DateTime<Utc>,
    pub discipline: Discipline,
    pub runners: Vec<ResultRunner>,
    pub trifecta_payout: Option<f64>,
    pub trifecta_combination: Option<String>,
    pub superfecta_payout: Option<f64>,
    pub superfecta_combination: Option<String>,
}

impl ResultRace {
    fn date_and_time_parts(&self) -> (String, String) {
        let eastern = self.start_time.with_timezone(&chrono_tz::America::New_York);
        (
            eastern.format("%Y%m%d").to_string(),
            eastern.format("%H%M").to_string(),
        )
    }

    /// Strict key: `venue|race|yyyymmdd|HHMM|disc`.
    pub fn strict_key(&self) -> String {
        let (ymd, hm) = self.date_and_time_parts();
        format!(
            "{}|{}|{}|{}|{}",
            canonical_venue(&normalize_venue(&self.venue)),
            self.race_number,
            ymd,
            hm,
            self.discipline.initial()
        )
    }

    /// Relaxed key (no time component): `venue|race|yyyymmdd|disc`.
    pub fn relaxed_key(&self) -> String {
        let (ymd, _) = self.date_and_time_parts();
        format!(
            "{}|{}|{}|{}",
            canonical_venue(&normalize_venue(&self.venue)),
            self.race_number,
            ymd,
            self.discipline.initial()
        )
    }

    /// Discipline-relaxed key, used only for the logged-not-rejected third
    /// fallback documented in spec §9's Open Question.
    pub fn discipline_relaxed_prefix(&self) -> String {
        let (ymd, hm) = self.date_and_time_parts();
        format!(
            "{}|{}|{}|{}",
            canonical_venue(&normalize_venue(&self.venue)),
            self.race_number,
            ymd,
            hm
        )
    }

    pub fn active_field_size(&self) -> usize {
        self.runners.len()
    }

    /// Places paid from active field size: 1 for <=4, 2 for 5-7, 3 for 8+.
    pub fn places_paid(&self) -> u32 {
        places_paid_for(self.active_field_size())
    }
}

pub fn places_paid_for(active_field_size: usize) -> u32 {
    match active_field_size {
        0..=4 => 1,
        5..=7 => 2,
        _ => 3,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    Cashed,
    CashedEstimated,
    Burned,
    Void,
    Pending,
}

/// A persisted prediction/tip, mutated exactly once by the auditor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prediction {
    pub race_id: String,
    pub venue: String,
    pub race_number: u32,
    pub start_time: DateTime<Utc>,
    pub discipline: Discipline,
    pub selection_number: Option<u32>,
    pub selection_name: String,
    #[serde(default)]
    pub top_5: Vec<u32>,
    pub predicted_2nd_fav_odds: Option<f64>,
    #[serde(default)]
    pub is_goldmine: bool,
    #[serde(default)]
    pub audit_completed: bool,

    // Populated by the auditor:
    pub verdict: Option<Verdict>,
    pub net_profit: Option<f64>,
    pub actual_top_5: Option<String>,
    pub actual_2nd_fav_odds: Option<f64>,
    pub selection_position: Option<u32>,
    pub trifecta_payout: Option<f64>,
    pub trifecta_combination: Option<String>,
    pub superfecta_payout: Option<f64>,
    pub superfecta_combination: Option<String>,
    pub top1_place_payout: Option<f64>,
    pub top2_place_payout: Option<f64>,
    pub audit_timestamp: Option<DateTime<Utc>>,
}

impl Prediction {
    /// The runner number this tip picked: `selection_number`, falling back
    /// to the first element of `top_5`.
    pub fn predicted_number(&self) -> Option<u32> {
        self.selection_number.or_else(|| self.top_5.first().copied())
    }

    /// Strict canonical key, matching [`ResultRace::strict_key`].
    pub fn canonical_key(&self) -> String {
        let eastern = self.start_time.with_timezone(&chrono_tz::America::New_York);
        format!(
            "{}|{}|{}|{}|{}",
            canonical_venue(&normalize_venue(&self.venue)),
            self.race_number,
            eastern.format("%Y%m%d"),
            eastern.format("%H%M"),
            self.discipline.initial()
        )
    }

    pub fn relaxed_key(&self) -> String {
        let eastern = self.start_time.with_timezone(&chrono_tz::America::New_York);
        format!(
            "{}|{}|{}|{}",
            canonical_venue(&normalize_venue(&self.venue)),
            self.race_number,
            eastern.format("%Y%m%d"),
            self.discipline.initial()
        )
    }

    pub fn discipline_relaxed_prefix(&self) -> String {
        let eastern = self.start_time.with_timezone(&chrono_tz::America::New_York);
        format!(
            "{}|{}|{}|{}",
            canonical_venue(&normalize_venue(&self.venue)),
            self.race_number,
            eastern.format("%Y%m%d"),
            eastern.format("%H%M")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn places_paid_buckets() {
        assert_eq!(places_paid_for(1), 1);
        assert_eq!(places_paid_for(4), 1);
        assert_eq!(places_paid_for(5), 2);
        assert_eq!(places_paid_for(7), 2);
        assert_eq!(places_paid_for(8), 3);
        assert_eq!(places_paid_for(20), 3);
    }
}
