//! Merges possibly-overlapping source payloads into one canonical race list
//! (spec §4.4). Lossless by design: odds per source are preserved side by
//! side, never averaged; reconciliation into a single "best" price is the
//! analyzer's job.

use std::collections::HashMap;

use crate::domain::{Race, RunnerKey};

pub struct Deduplicator;

impl Deduplicator {
    /// Groups `races` by dedup key and unions each group into one race.
    /// Input is never mutated; every race in the output is a fresh copy.
    pub fn merge(races: Vec<Race>) -> Vec<Race> {
        let mut groups: HashMap<(String, u32, String), Vec<Race>> = HashMap::new();
        for race in races {
            groups.entry(race.dedup_key()).or_default().push(race);
        }

        let mut merged: Vec<Race> = groups.into_values().map(Self::merge_group).collect();
        merged.sort_by(|a, b| a.dedup_key().cmp(&b.dedup_key()));
        merged
    }

    fn merge_group(mut group: Vec<Race>) -> Race {
        let mut accumulator = group.remove(0);

        for next in group {
            let mut by_number: HashMap<RunnerKey, usize> = HashMap::new();
            for (i, runner) in accumulator.runners.iter().enumerate() {
                by_number.insert(runner.identity_key(), i);
            }

            for runner in next.runners {
                match by_number.get(&runner.identity_key()) {
                    Some(&idx) => {
                        for (source, odds) in runner.odds {
                            accumulator.runners[idx].odds.insert(source, odds);
                        }
                    }
                    None => {
                        accumulator.runners.push(runner);
                    }
                }
            }

            let mut sources: Vec<&str> = accumulator.source.split(',').map(str::trim).collect();
            sources.push(&next.source);
            sources.sort_unstable();
            sources.dedup();
            accumulator.source = sources.join(",");
        }

        accumulator
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Discipline, OddsData, Runner};
    use chrono::Utc;
    use std::collections::HashMap as StdHashMap;

    fn race(venue: &str, source: &str, runners: Vec<Runner>) -> Race {
        Race {
            id: format!("{source}_x"),
            venue: venue.to_string(),
            race_number: 1,
            start_time: chrono::DateTime::parse_from_rfc3339("2026-07-30T19:00:00Z").unwrap().with_timezone(&Utc),
            runners,
            source: source.to_string(),
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
    fn merges_two_sources_unioning_odds() {
        let mut r1 = Runner::new("Horse A", 1);
        let mut o1 = OddsData::new("SourceA");
        o1.win = Some(3.0);
        r1.odds.insert("SourceA".into(), o1);

        let mut r2 = Runner::new("Horse A", 1);
        let mut o2 = OddsData::new("SourceB");
        o2.win = Some(4.0);
        r2.odds.insert("SourceB".into(), o2);

        let races = vec![race("Aqueduct", "SourceA", vec![r1]), race("Aqueduct", "SourceB", vec![r2])];
        let merged = Deduplicator::merge(races);

        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].source, "SourceA,SourceB");
        assert_eq!(merged[0].runners.len(), 1);
        assert_eq!(merged[0].runners[0].odds.len(), 2);
    }

    #[test]
    fn appends_new_runner_not_present_in_accumulator() {
        let r1 = Runner::new("Horse A", 1);
        let r2 = Runner::new("Horse B", 2);

        let races = vec![race("Aqueduct", "SourceA", vec![r1]), race("Aqueduct", "SourceB", vec![r2])];
        let merged = Deduplicator::merge(races);

        assert_eq!(merged[0].runners.len(), 2);
    }

    #[test]
    fn merge_is_order_independent() {
        let mut r1 = Runner::new("Horse A", 1);
        let mut o1 = OddsData::new("SourceA");
        o1.win = Some(3.0);
        r1.odds.insert("SourceA".into(), o1);

        let mut r2 = Runner::new("Horse A", 1);
        let mut o2 = OddsData::new("SourceB");
        o2.win = Some(4.0);
        r2.odds.insert("SourceB".into(), o2);

        let forward = Deduplicator::merge(vec![race("Aqueduct", "SourceA", vec![r1.clone()]), race("Aqueduct", "SourceB", vec![r2.clone()])]);
        let backward = Deduplicator::merge(vec![race("Aqueduct", "SourceB", vec![r2]), race("Aqueduct", "SourceA", vec![r1])]);

        assert_eq!(forward[0].source, backward[0].source);
        assert_eq!(forward[0].runners[0].odds.len(), backward[0].runners[0].odds.len());
    }
}
