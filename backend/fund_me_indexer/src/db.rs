//! Database layer: migrations, queries, and cursor management.

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::info;

use crate::errors::Result;
use crate::events::{outstanding_balance, EventKind, EventRecord, FundMeEvent};

const EVENT_COLUMNS: &str = "id, event_id, event_type, actor, amount, reference_value, \
     funder_count, ledger, timestamp, contract_id, tx_hash, created_at";

/// Open a SQLite pool (creating the file if needed) and run pending migrations.
pub async fn init_pool(database_url: &str) -> Result<SqlitePool> {
    let url = if database_url.starts_with("sqlite:") {
        database_url.to_string()
    } else {
        format!("sqlite:{database_url}")
    };

    let options = SqliteConnectOptions::from_str(&url)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    migrate(&pool).await?;
    info!("Database migrations applied successfully");
    Ok(pool)
}

pub async fn migrate(pool: &SqlitePool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

// ─────────────────────────────────────────────────────────
// Cursor helpers
// ─────────────────────────────────────────────────────────

/// Persisted resume point of the poller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cursor {
    pub last_ledger: i64,
    pub last_cursor: Option<String>,
}

/// Read the resume cursor. A fresh database yields ledger `0` and no cursor.
pub async fn load_cursor(pool: &SqlitePool) -> Result<Cursor> {
    let row: Option<(i64, Option<String>)> =
        sqlx::query_as("SELECT last_ledger, last_cursor FROM indexer_cursor WHERE id = 1")
            .fetch_optional(pool)
            .await?;
    Ok(row
        .map(|(last_ledger, last_cursor)| Cursor {
            last_ledger,
            last_cursor,
        })
        .unwrap_or_default())
}

/// Persist the resume cursor.
pub async fn save_cursor(pool: &SqlitePool, cursor: &Cursor) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO indexer_cursor (id, last_ledger, last_cursor) VALUES (1, ?1, ?2)
        ON CONFLICT (id) DO UPDATE SET last_ledger = excluded.last_ledger,
                                       last_cursor = excluded.last_cursor
        "#,
    )
    .bind(cursor.last_ledger)
    .bind(cursor.last_cursor.as_deref())
    .execute(pool)
    .await?;
    Ok(())
}

// ─────────────────────────────────────────────────────────
// Event writes
// ─────────────────────────────────────────────────────────

/// Persist a batch of decoded events in one transaction. Events whose
/// `event_id` is already stored are ignored, which makes re-polling a page
/// harmless. Returns the number of new rows.
pub async fn insert_events(pool: &SqlitePool, events: &[FundMeEvent]) -> Result<usize> {
    let mut tx = pool.begin().await?;
    let mut count = 0usize;
    for ev in events {
        let rows_affected = sqlx::query(
            r#"
            INSERT OR IGNORE INTO events
                (event_id, event_type, actor, amount, reference_value, funder_count,
                 ledger, timestamp, contract_id, tx_hash)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&ev.event_id)
        .bind(&ev.event_type)
        .bind(&ev.actor)
        .bind(&ev.amount)
        .bind(&ev.reference_value)
        .bind(ev.funder_count)
        .bind(ev.ledger)
        .bind(ev.timestamp)
        .bind(&ev.contract_id)
        .bind(&ev.tx_hash)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        count += rows_affected as usize;
    }
    tx.commit().await?;
    Ok(count)
}

// ─────────────────────────────────────────────────────────
// Event reads
// ─────────────────────────────────────────────────────────

/// Fetch all events, ordered by ledger ascending.
pub async fn get_all_events(pool: &SqlitePool) -> Result<Vec<EventRecord>> {
    let sql = format!("SELECT {EVENT_COLUMNS} FROM events ORDER BY ledger ASC, id ASC");
    Ok(sqlx::query_as::<_, EventRecord>(&sql)
        .fetch_all(pool)
        .await?)
}

/// Fetch every event whose actor is `address` (contributions, or
/// withdrawals when `address` is the owner).
pub async fn get_events_for_actor(pool: &SqlitePool, address: &str) -> Result<Vec<EventRecord>> {
    let sql = format!(
        "SELECT {EVENT_COLUMNS} FROM events WHERE actor = ?1 ORDER BY ledger ASC, id ASC"
    );
    Ok(sqlx::query_as::<_, EventRecord>(&sql)
        .bind(address)
        .fetch_all(pool)
        .await?)
}

/// Fetch events of one kind, ordered by ledger ascending.
pub async fn get_events_by_kind(pool: &SqlitePool, kind: &EventKind) -> Result<Vec<EventRecord>> {
    let sql = format!(
        "SELECT {EVENT_COLUMNS} FROM events WHERE event_type = ?1 ORDER BY ledger ASC, id ASC"
    );
    Ok(sqlx::query_as::<_, EventRecord>(&sql)
        .bind(kind.as_str())
        .fetch_all(pool)
        .await?)
}

/// What `address` currently has in custody, replayed from indexed events.
pub async fn get_outstanding_balance(pool: &SqlitePool, address: &str) -> Result<i128> {
    let sql = format!(
        "SELECT {EVENT_COLUMNS} FROM events \
         WHERE event_type = ?1 OR (event_type = ?2 AND actor = ?3) \
         ORDER BY ledger ASC, id ASC"
    );
    let records = sqlx::query_as::<_, EventRecord>(&sql)
        .bind(EventKind::Withdrawn.as_str())
        .bind(EventKind::Funded.as_str())
        .bind(address)
        .fetch_all(pool)
        .await?;
    Ok(outstanding_balance(&records, address))
}
