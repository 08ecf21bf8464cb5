//! The canonical data model: races, runners, odds, and the audit domain.

pub mod audit;
pub mod normalize;
pub mod odds;
pub mod race;

pub use audit::{places_paid_for, Prediction, ResultRace, ResultRunner, Verdict};
pub use odds::{parse_odds, OddsData};
pub use race::{Discipline, ExoticBet, Race, Runner, RunnerKey};
