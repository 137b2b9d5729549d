mod api;
mod config;
mod db;
mod models;

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use crate::api::context::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = config::init()?;

    // Initialize database connection; a failure here is fatal
    let db = db::init(&config).await.context("could not connect to db")?;
    tracing::info!("database connection established");

    api::setup_and_serve(AppState {
        config: Arc::new(config),
        store: Arc::new(db),
    })
    .await
}
