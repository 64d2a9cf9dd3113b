//! Long-running background task that polls the Soroban RPC and writes
//! decoded FundMe events to the database.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use sqlx::SqlitePool;
use tracing::{error, info};

use crate::config::Config;
use crate::db::{self, Cursor};
use crate::rpc;

pub struct IndexerState {
    pub pool: SqlitePool,
    pub config: Config,
    pub client: Client,
}

/// Poll forever, sleeping `poll_interval_secs` between iterations.
pub async fn run(state: Arc<IndexerState>) {
    info!(contract = %state.config.contract_id, "Indexer starting");

    let mut cursor = match db::load_cursor(&state.pool).await {
        Ok(saved) => resume_point(saved, state.config.start_ledger),
        Err(e) => {
            error!("Could not read saved cursor, starting from config: {e}");
            resume_point(Cursor::default(), state.config.start_ledger)
        }
    };

    info!(ledger = cursor.last_ledger, "Resuming");

    loop {
        match poll_once(&state.pool, &state.client, &state.config, &cursor).await {
            Ok(next) => cursor = next,
            Err(e) => error!("Indexer poll error: {e}"),
        }

        tokio::time::sleep(Duration::from_secs(state.config.poll_interval_secs)).await;
    }
}

/// A saved cursor wins over the configured start ledger.
fn resume_point(saved: Cursor, start_ledger: u32) -> Cursor {
    if saved.last_ledger > 0 || saved.last_cursor.is_some() {
        saved
    } else {
        Cursor {
            last_ledger: i64::from(start_ledger),
            last_cursor: None,
        }
    }
}

/// Perform a single poll iteration and return the cursor for the next one.
async fn poll_once(
    pool: &SqlitePool,
    client: &Client,
    config: &Config,
    cursor: &Cursor,
) -> crate::errors::Result<Cursor> {
    let start_ledger = u32::try_from(cursor.last_ledger).unwrap_or(config.start_ledger);

    let page = rpc::fetch_events(
        client,
        &config.rpc_url,
        &config.contract_id,
        start_ledger,
        cursor.last_cursor.as_deref(),
        config.events_per_page,
    )
    .await?;

    if !page.events.is_empty() {
        let decoded = rpc::decode_events(&page.events, &config.contract_id);
        let inserted = db::insert_events(pool, &decoded).await?;
        info!(
            raw = page.events.len(),
            stored = inserted,
            "Polled events"
        );
    }

    let next = advance(cursor, page.latest_ledger, page.cursor);

    // Persist cursor so restarts are deterministic.
    db::save_cursor(pool, &next).await?;
    Ok(next)
}

/// Keep paginating with the RPC cursor while one is returned; the ledger
/// only moves forward.
fn advance(current: &Cursor, latest_ledger: Option<u64>, next_cursor: Option<String>) -> Cursor {
    let last_ledger = latest_ledger
        .and_then(|l| i64::try_from(l).ok())
        .map(|l| l.max(current.last_ledger))
        .unwrap_or(current.last_ledger);

    Cursor {
        last_ledger,
        last_cursor: next_cursor,
    }
}
