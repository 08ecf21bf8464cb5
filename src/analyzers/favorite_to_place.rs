//! Live scanner producing BET_NOW / YOU_MIGHT_LIKE shortlists (spec §4.7).
//! Not an [`Analyzer`] impl — its output shape (two ranked lists) doesn't
//! fit `qualify_races`, so it's driven directly by the API handler.

use chrono::Utc;
use serde::Serialize;

use crate::domain::Race;

#[derive(Debug, Clone, Serialize)]
pub struct RaceSummary {
    pub discipline_tag: char,
    pub venue: String,
    pub race_number: u32,
    pub field_size: usize,
    pub superfecta_offered: bool,
    pub adapters: Vec<String>,
    pub start_time: chrono::DateTime<Utc>,
    pub mtp: i64,
    pub favorite_name: Option<String>,
    pub favorite_odds: Option<f64>,
    pub second_favorite_name: Option<String>,
    pub second_favorite_odds: Option<f64>,
    pub top_five_numbers: Vec<u32>,
}

pub struct FavoriteToPlaceMonitor;

impl FavoriteToPlaceMonitor {
    fn summarize(race: &Race, now: chrono::DateTime<Utc>) -> Option<RaceSummary> {
        let mtp = (race.start_time - now).num_minutes();

        let mut priced: Vec<(&crate::domain::Runner, f64)> =
            race.active_runners().filter_map(|r| r.best_win_odds().map(|o| (r, o))).collect();
        priced.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap());

        let mut top_five: Vec<(&crate::domain::Runner, f64)> = priced.clone();
        top_five.truncate(5);

        Some(RaceSummary {
            discipline_tag: race.discipline.initial(),
            venue: race.venue.clone(),
            race_number: race.race_number,
            field_size: race.active_count(),
            superfecta_offered: race.available_bets.contains(&crate::domain::ExoticBet::Superfecta),
            adapters: race.source.split(',').map(str::trim).map(String::from).collect(),
            start_time: race.start_time,
            mtp,
            favorite_name: priced.first().map(|(r, _)| r.name.clone()),
            favorite_odds: priced.first().map(|(_, o)| *o),
            second_favorite_name: priced.get(1).map(|(r, _)| r.name.clone()),
            second_favorite_odds: priced.get(1).map(|(_, o)| *o),
            top_five_numbers: top_five.into_iter().map(|(r, _)| r.number).collect(),
        })
    }

    /// Returns `(bet_now, you_might_like)`.
    pub fn scan(races: &[Race]) -> (Vec<RaceSummary>, Vec<RaceSummary>) {
        let now = Utc::now();
        let summaries: Vec<RaceSummary> = races.iter().filter_map(|r| Self::summarize(r, now)).collect();

        let mut bet_now: Vec<RaceSummary> = summaries
            .iter()
            .filter(|s| s.mtp > 0 && s.mtp <= 20)
            .filter(|s| s.second_favorite_odds.map_or(false, |o| o >= 5.0))
            .filter(|s| s.field_size <= 8)
            .cloned()
            .collect();
        bet_now.sort_by_key(|s| (!s.superfecta_offered, s.mtp));

        let bet_now_keys: std::collections::HashSet<(String, u32)> =
            bet_now.iter().map(|s| (s.venue.clone(), s.race_number)).collect();

        let mut you_might_like: Vec<RaceSummary> = summaries
            .into_iter()
            .filter(|s| s.mtp <= 30)
            .filter(|s| s.second_favorite_odds.map_or(false, |o| o >= 4.0))
            .filter(|s| !bet_now_keys.contains(&(s.venue.clone(), s.race_number)))
            .collect();
        you_might_like.sort_by_key(|s| s.mtp);
        you_might_like.truncate(5);

        (bet_now, you_might_like)
    }
}
