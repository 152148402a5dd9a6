mod config;
mod generator;
mod machine;
mod repository;
mod routes;
mod runner;
mod tester;
mod visualizer;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::info;

use crate::config::AppConfig;
use crate::repository::MemoryStore;
use crate::routes::AppState;
use crate::runner::HostRunner;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("pushswap_tools=info".parse()?),
        )
        .init();

    dotenvy::dotenv().ok();

    info!("Starting Push Swap Tools backend...");

    let config = AppConfig::from_env()?;

    let state = AppState {
        runner: Arc::new(HostRunner::new(Duration::from_millis(
            config.trial_timeout_ms,
        ))),
        store: Arc::new(MemoryStore::new()),
        config: Arc::new(config.clone()),
    };

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    info!("Listening on {}", config.bind_addr);

    axum::serve(listener, routes::router(state))
        .await
        .context("Server terminated")?;

    Ok(())
}
