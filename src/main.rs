mod api;
mod config;
mod db;
mod error;
mod fetcher;
mod scheduler;
mod types;
mod updater;

#[cfg(test)]
mod testutil;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::api::routes::{router, ApiState};
use crate::config::Config;
use crate::db::SeriesStore;
use crate::error::Result;
use crate::fetcher::Fetcher;
use crate::scheduler::DailyJob;
use crate::updater::Updater;

#[tokio::main]
async fn main() {
    // A missing .env is fine; the process environment still applies.
    let _ = dotenvy::dotenv();

    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cfg).await {
        error!(kind = e.kind(), "Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<()> {
    // --- Database setup ---
    let store = SeriesStore::connect(&cfg.db_path, cfg.history_limit).await?;
    store.initialize().await?;
    info!(
        history_limit = cfg.history_limit,
        "Database ready at {}",
        cfg.db_path
    );

    // --- Upstream client + updater ---
    let fetcher = Fetcher::new(&cfg)?;
    let updater = Updater::new(store.clone(), fetcher, cfg.update.clone());
    info!(
        series_url = %cfg.series_url,
        obs_url = %cfg.obs_url,
        batch_size = cfg.update.batch_size,
        rotate = cfg.update.rotate,
        "Upstream configured"
    );

    // --- Daily job ---
    if cfg.schedule_enabled {
        let job = DailyJob::new(updater.clone(), cfg.daily_run_at);
        tokio::spawn(async move { job.run().await });
    } else {
        info!("SCHEDULE_ENABLED=false, daily job not started");
    }

    // --- HTTP API server ---
    let app = router(ApiState { store, updater });
    let bind_addr = format!("0.0.0.0:{}", cfg.api_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("HTTP API listening on {bind_addr}");

    axum::serve(listener, app).await?;

    Ok(())
}
