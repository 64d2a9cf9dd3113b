//! FundMe event indexer.
//!
//! A background task follows the FundMe contract through Soroban `getEvents`
//! and stores every `funded` / `withdrawn` event in SQLite. An Axum server
//! answers read queries over the stored events until Ctrl-C.

mod api;
mod config;
mod db;
mod errors;
mod events;
mod indexer;
mod rpc;

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use config::Config;
use indexer::IndexerState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;
    info!(
        rpc = %config.rpc_url,
        contract = %config.contract_id,
        poll_secs = config.poll_interval_secs,
        "Configuration loaded"
    );

    let pool = db::init_pool(&config.database_url).await?;
    let client = Client::builder().timeout(Duration::from_secs(30)).build()?;

    let poller = tokio::spawn(indexer::run(Arc::new(IndexerState {
        pool: pool.clone(),
        config: config.clone(),
        client,
    })));

    let app = api::router(Arc::new(api::ApiState { pool: pool.clone() }))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr = format!("0.0.0.0:{}", config.api_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("API listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    poller.abort();
    pool.close().await;
    info!("Indexer stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Could not listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}
