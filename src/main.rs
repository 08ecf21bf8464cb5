//! Paddock Engine — multi-source race data aggregation, qualification, and
//! tip-auditing service.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use paddock_engine::api::{self, AppState};
use paddock_engine::auditor::{Auditor, PredictionStore};
use paddock_engine::config::Settings;
use paddock_engine::engine::Engine;

#[derive(Parser)]
#[command(name = "paddock-engine", about = "Multi-source race data aggregation and analysis engine")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API (default if no subcommand is given).
    Serve,
    /// One-shot fetch-all-odds, printed to stdout as JSON.
    Fetch {
        #[arg(long)]
        race_date: Option<String>,
        #[arg(long)]
        source: Option<String>,
    },
    /// One-shot auditor run against the persisted prediction store.
    Audit,
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "paddock_engine=info,tower_http=info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let settings = match Settings::from_env() {
        Ok(s) => s,
        Err(e) => {
            error!("configuration error: {e}");
            std::process::exit(1);
        }
    };

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(settings).await,
        Command::Fetch { race_date, source } => fetch_once(settings, race_date, source).await,
        Command::Audit => audit_once(settings).await,
    }
}

async fn serve(settings: Settings) -> Result<()> {
    info!("paddock engine starting");

    let settings = Arc::new(settings);
    let engine = Arc::new(Engine::new(&settings));
    let state = AppState::new(engine.clone(), settings.clone());

    spawn_auditor_cycle(state.clone());

    let addr = format!("{}:{}", settings.bind_addr, settings.port);
    let listener = tokio::net::TcpListener::bind(&addr).await.context("failed to bind HTTP listener")?;
    info!(%addr, "listening");

    let app = api::router(state).into_make_service_with_connect_info::<std::net::SocketAddr>();
    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}

/// Runs the auditor on a fixed interval in the background while the API serves traffic.
fn spawn_auditor_cycle(state: AppState) {
    tokio::spawn(async move {
        let auditor = Auditor::new();
        loop {
            if let Err(e) = run_audit_pass(&state.engine, &state.predictions, &auditor).await {
                error!("background audit cycle failed: {e}");
            }
            tokio::time::sleep(std::time::Duration::from_secs(900)).await;
        }
    });
}

async fn run_audit_pass(engine: &Engine, predictions: &PredictionStore, auditor: &Auditor) -> Result<()> {
    let stored = predictions.load_all().await?;
    if stored.is_empty() {
        return Ok(());
    }
    let today = chrono::Utc::now().format("%Y-%m-%d").to_string();
    let results = engine.fetch_results(&today).await;
    let audited = auditor.audit(&stored, &results);
    if !audited.is_empty() {
        info!(count = audited.len(), "auditor updated verdicts");
        predictions.apply_audit_results(audited).await?;
    }
    Ok(())
}

async fn fetch_once(settings: Settings, race_date: Option<String>, source: Option<String>) -> Result<()> {
    let engine = Engine::new(&settings);
    let date = race_date.unwrap_or_else(|| chrono::Utc::now().format("%Y-%m-%d").to_string());
    let source_filter: Option<Vec<String>> = source.map(|s| s.split(',').map(|p| p.trim().to_string()).collect());

    let response = engine.fetch_all_odds(&date, source_filter.as_deref()).await;
    let succeeded = response.source_info.iter().filter(|s| matches!(s.status, paddock_engine::engine::FetchStatus::Success)).count();

    println!("{}", serde_json::to_string_pretty(&response)?);

    if succeeded == 0 && response.data_freshness != "live" && response.races.is_empty() {
        error!("zero adapters succeeded and stale-cache fallback also missed");
        std::process::exit(1);
    }
    Ok(())
}

async fn audit_once(settings: Settings) -> Result<()> {
    let engine = Engine::new(&settings);
    let predictions = PredictionStore::new(settings.predictions_path.clone());
    let auditor = Auditor::new();

    match run_audit_pass(&engine, &predictions, &auditor).await {
        Ok(()) => Ok(()),
        Err(e) => {
            error!("audit run failed: {e}");
            std::process::exit(1);
        }
    }
}
