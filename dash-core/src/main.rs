use std::process::ExitCode;

use chrono::Local;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use dash_core::config::AppConfig;
use dash_core::domain::parse_dashboards;
use dash_core::reload::SnapshotIngester;
use dash_core::schedule::{Snapshot, Timetable};
use dash_core::state::DashState;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Exiting");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::from_env()?;

    let dashboards = parse_dashboards(&tokio::fs::read_to_string(&config.dashboards).await?)?;
    info!(dashboards = dashboards.len(), "Loaded dashboards");
    let ids: Vec<_> = dashboards.iter().map(|d| d.id).collect();

    let sources = if config.sources.is_empty() {
        Snapshot::load(&config.dataset)?
            .sources
            .iter()
            .map(|s| s.source)
            .collect()
    } else {
        config.sources.clone()
    };
    let ingesters: Vec<SnapshotIngester> = sources
        .into_iter()
        .map(|source| SnapshotIngester::new(source, &config.dataset))
        .collect();

    let state = DashState::new(Timetable::new(), dashboards, config.departures.clone(), &config.cache);

    let report = state.reload(&ingesters).await?;
    for dashboard in report.unresolved_dashboards() {
        warn!(dashboard = %dashboard, "Dashboard has unlinked legs");
    }

    let at = config.at.unwrap_or_else(|| Local::now().naive_local());
    for id in ids {
        if let Some(board) = state.board(id, at).await {
            println!("{}", serde_json::to_string_pretty(&*board)?);
            state.touch(id, at).await?;
        }
    }

    Ok(())
}
