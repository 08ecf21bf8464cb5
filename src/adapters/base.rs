//! The shared orchestration every adapter runs through (spec §4.2, §4.2.1,
//! §4.2.2). Grounded on the teacher's backoff/circuit-breaker idiom
//! (`BackoffCalculator`/`EndpointRotator` in the crypto-session module),
//! generalized from WebSocket reconnects to HTTP adapter retries.

use std::time::{Duration, Instant};

use tracing::{info, info_span, warn, Instrument};

use super::{Adapter, AdapterContext, RawPayload};
use crate::domain::{Race, ResultRace};
use crate::error::PaddockError;
use crate::overrides::OverrideKey;

const MAX_RETRIES: u32 = 3;
const BACKOFF_BASE: Duration = Duration::from_secs(1);
const BACKOFF_CAP: Duration = Duration::from_secs(10);

/// Runs `adapter` under its circuit breaker, rate limiter, and retry policy,
/// then applies post-parse validation. Never returns an `Err`: adapter-level
/// failures are swallowed to an empty `Vec`, per the propagation policy in
/// spec §7 ("adapter errors never bubble past the engine").
pub async fn run_adapter(adapter: &(impl Adapter + ?Sized), ctx: &AdapterContext, date: &str) -> Vec<Race> {
    let name = adapter.source_name().to_string();
    let span = info_span!("adapter_fetch", adapter = %name, status = tracing::field::Empty, races_fetched = tracing::field::Empty, duration_ms = tracing::field::Empty);

    async move {
        let start = Instant::now();

        if !ctx.circuit_breaker.allow_request() {
            info!(adapter = %name, "circuit breaker open, skipping this cycle");
            tracing::Span::current().record("status", "circuit_open");
            return Vec::new();
        }

        ctx.rate_limiter.acquire().await;

        let raw = match fetch_with_retry(adapter, ctx, date).await {
            Ok(raw) => raw,
            Err(err) => {
                record_failure(ctx, &name, &err, start);
                tracing::Span::current().record("status", "failed");
                return Vec::new();
            }
        };

        let races = match adapter.parse_races(&raw) {
            Ok(races) => races,
            Err(err) => {
                record_failure(ctx, &name, &err, start);
                tracing::Span::current().record("status", "parse_failed");
                return Vec::new();
            }
        };

        let validated = post_parse_validate(races, &name, adapter.adapter_type());

        ctx.circuit_breaker.record_success();
        let latency_ms = start.elapsed().as_millis() as u64;
        ctx.health_monitor.metrics_for(&name).record_success(latency_ms);

        tracing::Span::current().record("status", "success");
        tracing::Span::current().record("races_fetched", validated.len());
        tracing::Span::current().record("duration_ms", latency_ms);

        validated
    }
    .instrument(span)
    .await
}

/// Same circuit-breaker/retry wrapping as [`run_adapter`], but parses into
/// [`ResultRace`] for the auditor's results pipeline instead of `Race`.
pub async fn run_results_adapter(adapter: &(impl Adapter + ?Sized), ctx: &AdapterContext, date: &str) -> Vec<ResultRace> {
    let name = adapter.source_name().to_string();
    let span = info_span!("adapter_fetch_results", adapter = %name, status = tracing::field::Empty);

    async move {
        let start = Instant::now();

        if !ctx.circuit_breaker.allow_request() {
            info!(adapter = %name, "circuit breaker open, skipping results fetch this cycle");
            tracing::Span::current().record("status", "circuit_open");
            return Vec::new();
        }

        ctx.rate_limiter.acquire().await;

        let raw = match fetch_with_retry(adapter, ctx, date).await {
            Ok(raw) => raw,
            Err(err) => {
                record_failure(ctx, &name, &err, start);
                tracing::Span::current().record("status", "failed");
                return Vec::new();
            }
        };

        let results = match adapter.parse_results(&raw) {
            Ok(results) => results,
            Err(err) => {
                record_failure(ctx, &name, &err, start);
                tracing::Span::current().record("status", "parse_failed");
                return Vec::new();
            }
        };

        ctx.circuit_breaker.record_success();
        let latency_ms = start.elapsed().as_millis() as u64;
        ctx.health_monitor.metrics_for(&name).record_success(latency_ms);
        tracing::Span::current().record("status", "success");

        results
    }
    .instrument(span)
    .await
}

async fn fetch_with_retry(
    adapter: &(impl Adapter + ?Sized),
    ctx: &AdapterContext,
    date: &str,
) -> Result<RawPayload, PaddockError> {
    let name = adapter.source_name();

    if let Some(html) = ctx
        .overrides
        .take_submitted(&OverrideKey { adapter_name: name.to_string(), url: name.to_string(), date: date.to_string() })
    {
        info!(adapter = %name, "using manually submitted content");
        return Ok(RawPayload::Text(html));
    }

    let mut attempt = 0;
    let mut attempt_429 = 0;
    loop {
        match adapter.fetch_data(date).await {
            Ok(raw) => return Ok(raw),
            Err(err) => {
                let retryable = err.is_retryable();
                let is_429 = matches!(&err, PaddockError::Http { status, .. } if *status == 429);
                let is_auth = matches!(&err, PaddockError::Authentication { .. })
                    || matches!(&err, PaddockError::Http { status, .. } if *status == 401 || *status == 403);

                if is_auth {
                    return Err(err);
                }

                if let PaddockError::Http { url, .. } = &err {
                    ctx.overrides.register(OverrideKey {
                        adapter_name: name.to_string(),
                        url: url.clone(),
                        date: date.to_string(),
                    });
                }

                if matches!(err, PaddockError::BotDetection { .. }) {
                    ctx.overrides.register(OverrideKey {
                        adapter_name: name.to_string(),
                        url: name.to_string(),
                        date: date.to_string(),
                    });
                }

                if !retryable && !is_429 {
                    return Err(err);
                }

                // 429 gets its own one-retry budget (at most 2 total attempts),
                // kept separate from the generic MAX_RETRIES budget so it never
                // rides along on the 3-attempt allowance given to transient
                // network/parse failures.
                if is_429 {
                    if attempt_429 >= 1 {
                        return Err(err);
                    }
                    attempt_429 += 1;
                    warn!(adapter = %name, attempt_429, backoff_ms = BACKOFF_CAP.as_millis() as u64, error = %err, "retrying after 429");
                    tokio::time::sleep(BACKOFF_CAP).await;
                    continue;
                }

                attempt += 1;
                if attempt >= MAX_RETRIES {
                    return Err(err);
                }

                let backoff = (BACKOFF_BASE * 2u32.pow(attempt - 1)).min(BACKOFF_CAP);
                warn!(adapter = %name, attempt, backoff_ms = backoff.as_millis() as u64, error = %err, "retrying after failure");
                tokio::time::sleep(backoff).await;
            }
        }
    }
}

fn record_failure(ctx: &AdapterContext, name: &str, err: &PaddockError, start: Instant) {
    ctx.circuit_breaker.record_failure();
    let latency_ms = start.elapsed().as_millis() as u64;
    ctx.health_monitor.metrics_for(name).record_failure(latency_ms, err.to_string());
}

/// Post-parse validation (spec §4.2.1): drop thin fields, re-index runner
/// numbers when the adapter leaked horse IDs into them, and compute
/// win_odds/trustworthiness/trust-ratio.
fn post_parse_validate(races: Vec<Race>, adapter_name: &str, _adapter_type: super::AdapterType) -> Vec<Race> {
    races
        .into_iter()
        .filter_map(|mut race| {
            if race.runners.len() < 2 {
                return None;
            }

            if needs_renumbering(&race) {
                reindex_runner_numbers(&mut race);
            }

            for runner in race.runners.iter_mut().filter(|r| !r.scratched) {
                let best = runner.best_win_odds();
                runner.win_odds = best;
                runner
                    .metadata
                    .insert("odds_source_trustworthy".to_string(), serde_json::Value::Bool(best.is_some()));
            }

            race.field_size = Some(race.active_count() as u32);
            race.metadata.insert(
                "trust_ratio".to_string(),
                serde_json::Value::from(race.trust_ratio()),
            );
            race.metadata.insert("adapter".to_string(), serde_json::Value::String(adapter_name.to_string()));

            Some(race)
        })
        .collect()
}

fn needs_renumbering(race: &Race) -> bool {
    let active = race.active_count().max(1);
    let all_zero = race.runners.iter().all(|r| r.number == 0);
    let any_over_100 = race.runners.iter().any(|r| r.number > 100);
    let any_suspicious = race.runners.iter().any(|r| r.number > 20 && (r.number as usize) > active + 10);
    all_zero || any_over_100 || any_suspicious
}

fn reindex_runner_numbers(race: &mut Race) {
    for (i, runner) in race.runners.iter_mut().enumerate() {
        runner.number = (i + 1) as u32;
    }
}

/// `<prefix>_<slug(venue)>_<yyyymmdd>_<HHMM>_R<race_number><disc_suffix>`.
pub fn generate_race_id(prefix: &str, venue: &str, start_time: chrono::DateTime<chrono::Utc>, race_number: u32, discipline: crate::domain::Discipline) -> String {
    let eastern = start_time.with_timezone(&chrono_tz::America::New_York);
    format!(
        "{}_{}_{}_{}_R{}{}",
        prefix,
        slugify(venue),
        eastern.format("%Y%m%d"),
        eastern.format("%H%M"),
        race_number,
        discipline.id_suffix()
    )
}

fn slugify(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect::<String>()
        .split('_')
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Discipline, Runner};
    use std::collections::HashMap;

    fn race_with_numbers(numbers: Vec<u32>) -> Race {
        Race {
            id: "x".into(),
            venue: "Aqueduct".into(),
            race_number: 1,
            start_time: chrono::Utc::now(),
            runners: numbers.into_iter().map(|n| Runner::new("Horse", n)).collect(),
            source: "a".into(),
            discipline: Discipline::Thoroughbred,
            distance: None,
            field_size: None,
            qualification_score: None,
            available_bets: vec![],
            is_error_placeholder: false,
            error_message: None,
            metadata: HashMap::new(),
        }
    }

    #[test]
    fn drops_thin_fields() {
        let races = vec![race_with_numbers(vec![1])];
        let validated = post_parse_validate(races, "test", super::super::AdapterType::Discovery);
        assert!(validated.is_empty());
    }

    #[test]
    fn renumbers_when_all_zero() {
        let races = vec![race_with_numbers(vec![0, 0, 0])];
        let validated = post_parse_validate(races, "test", super::super::AdapterType::Discovery);
        let numbers: Vec<u32> = validated[0].runners.iter().map(|r| r.number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
    }

    #[test]
    fn renumbers_when_id_leaked_into_number() {
        let races = vec![race_with_numbers(vec![1, 2, 99999])];
        let validated = post_parse_validate(races, "test", super::super::AdapterType::Discovery);
        let numbers: Vec<u32> = validated[0].runners.iter().map(|r| r.number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
    }

    #[test]
    fn leaves_sane_numbering_alone() {
        let races = vec![race_with_numbers(vec![1, 2, 3, 4])];
        let validated = post_parse_validate(races, "test", super::super::AdapterType::Discovery);
        let numbers: Vec<u32> = validated[0].runners.iter().map(|r| r.number).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4]);
    }

    #[test]
    fn race_id_has_expected_shape() {
        let dt = chrono::DateTime::parse_from_rfc3339("2026-07-30T19:05:00Z").unwrap().with_timezone(&chrono::Utc);
        let id = generate_race_id("dsc", "Gulfstream Park", dt, 3, Discipline::Thoroughbred);
        assert!(id.starts_with("dsc_gulfstream_park_"));
        assert!(id.ends_with("_R3_t"));
    }
}
