//! Soroban RPC client: polls `getEvents` and decodes FundMe events.
//!
//! ## Resilience
//!
//! * Exponential back-off is applied when the RPC returns a soft error or a
//!   rate-limit response, up to [`MAX_BACKOFF_SECS`] seconds.
//! * Transient network errors (connection reset, timeout) are retried.
//! * Invalid-request / unknown-method errors are returned to the caller.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::errors::{IndexerError, Result};
use crate::events::{EventKind, FundMeEvent};

const MAX_BACKOFF_SECS: u64 = 60;
const INITIAL_BACKOFF_SECS: u64 = 2;

// ─────────────────────────────────────────────────────────
// JSON-RPC response shapes
// ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RpcResponse {
    pub result: Option<EventsResult>,
    pub error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct EventsResult {
    pub events: Vec<RawEvent>,
    pub cursor: Option<String>,
    #[serde(rename = "latestLedger")]
    pub latest_ledger: Option<u64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RawEvent {
    /// Decoded topic list, one JSON-encoded ScVal per entry
    pub topic: Vec<String>,
    /// Decoded event data
    pub value: Value,
    #[serde(rename = "contractId")]
    pub contract_id: Option<String>,
    #[serde(rename = "txHash")]
    pub tx_hash: Option<String>,
    pub id: Option<String>,
    pub ledger: Option<u64>,
    #[serde(rename = "ledgerClosedAt")]
    pub ledger_closed_at: Option<String>,
    #[serde(rename = "inSuccessfulContractCall")]
    pub in_successful_contract_call: Option<bool>,
    #[serde(rename = "pagingToken")]
    pub paging_token: Option<String>,
}

/// One page of `getEvents` output.
#[derive(Debug)]
pub struct EventPage {
    pub events: Vec<RawEvent>,
    pub cursor: Option<String>,
    pub latest_ledger: Option<u64>,
}

// ─────────────────────────────────────────────────────────
// Retry policy
// ─────────────────────────────────────────────────────────

/// Doubling delay between retries, capped at [`MAX_BACKOFF_SECS`].
#[derive(Debug)]
struct Backoff {
    secs: u64,
}

impl Backoff {
    fn new() -> Self {
        Backoff {
            secs: INITIAL_BACKOFF_SECS,
        }
    }

    fn current(&self) -> u64 {
        self.secs
    }

    async fn wait(&mut self) {
        tokio::time::sleep(Duration::from_secs(self.secs)).await;
        self.secs = (self.secs * 2).min(MAX_BACKOFF_SECS);
    }
}

/// Invalid-request and unknown-method errors will not go away on retry.
fn is_hard_error(code: i64) -> bool {
    code == -32600 || code == -32601
}

// ─────────────────────────────────────────────────────────
// Public API
// ─────────────────────────────────────────────────────────

/// Fetch a page of events for `contract_id`.
///
/// * `start_ledger`: the ledger sequence to scan from (inclusive); ignored
///   when `cursor` is set.
/// * `cursor`: opaque pagination cursor from a previous page.
/// * `limit`: maximum number of events to return.
pub async fn fetch_events(
    client: &Client,
    rpc_url: &str,
    contract_id: &str,
    start_ledger: u32,
    cursor: Option<&str>,
    limit: u32,
) -> Result<EventPage> {
    let body = json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": "getEvents",
        "params": build_params(contract_id, start_ledger, cursor, limit),
    });
    let mut backoff = Backoff::new();

    loop {
        let resp = match client.post(rpc_url).json(&body).send().await {
            Ok(resp) => resp,
            Err(e) => {
                warn!("RPC request failed (retry in {}s): {e}", backoff.current());
                backoff.wait().await;
                continue;
            }
        };

        if resp.status() == StatusCode::TOO_MANY_REQUESTS {
            warn!("Rate-limited by RPC (retry in {}s)", backoff.current());
            backoff.wait().await;
            continue;
        }

        let parsed: RpcResponse = resp.json().await?;

        if let Some(err) = parsed.error {
            if is_hard_error(err.code) {
                return Err(IndexerError::Rpc {
                    code: err.code,
                    message: err.message,
                });
            }
            warn!(
                "RPC soft error {} (retry in {}s): {}",
                err.code,
                backoff.current(),
                err.message
            );
            backoff.wait().await;
            continue;
        }

        let result = parsed
            .result
            .ok_or_else(|| IndexerError::EventParse("Empty result from getEvents".to_string()))?;

        debug!(
            events = result.events.len(),
            latest_ledger = ?result.latest_ledger,
            "Fetched events page"
        );

        return Ok(EventPage {
            events: result.events,
            cursor: result.cursor,
            latest_ledger: result.latest_ledger,
        });
    }
}

fn build_params(contract_id: &str, start_ledger: u32, cursor: Option<&str>, limit: u32) -> Value {
    let mut params = json!({
        "filters": [{ "type": "contract", "contractIds": [contract_id] }],
        "pagination": { "limit": limit }
    });

    match cursor {
        Some(cur) => params["pagination"]["cursor"] = json!(cur),
        None => params["startLedger"] = json!(start_ledger),
    }

    params
}

// ─────────────────────────────────────────────────────────
// Event decoding
// ─────────────────────────────────────────────────────────

/// Decode a page of raw RPC events into [`FundMeEvent`]s.
///
/// Events from failed contract calls are dropped; they never changed the
/// ledger.
pub fn decode_events(raw: &[RawEvent], contract_id: &str) -> Vec<FundMeEvent> {
    raw.iter()
        .enumerate()
        .filter(|(_, e)| e.in_successful_contract_call != Some(false))
        .filter_map(|(index, e)| decode_single(e, index, contract_id))
        .collect()
}

fn decode_single(raw: &RawEvent, index: usize, contract_id: &str) -> Option<FundMeEvent> {
    let kind = EventKind::from_topic(&extract_scalar(raw.topic.first()?));

    let ledger = raw.ledger.unwrap_or(0) as i64;
    let timestamp = raw
        .ledger_closed_at
        .as_deref()
        .and_then(parse_iso_to_unix)
        .unwrap_or(0);

    let event_id = raw
        .id
        .clone()
        .or_else(|| raw.paging_token.clone())
        .unwrap_or_else(|| {
            format!(
                "{ledger}-{}-{index}",
                raw.tx_hash.as_deref().unwrap_or("notx")
            )
        });

    // The second topic is the funder (`funded`) or the owner (`withdrawn`).
    let topic_actor = raw.topic.get(1).map(|t| extract_scalar(t));

    let mut event = FundMeEvent {
        event_id,
        event_type: kind.as_str().to_string(),
        actor: None,
        amount: None,
        reference_value: None,
        funder_count: None,
        ledger,
        timestamp,
        contract_id: raw
            .contract_id
            .clone()
            .unwrap_or_else(|| contract_id.to_string()),
        tx_hash: raw.tx_hash.clone(),
    };

    match kind {
        EventKind::Funded => {
            event.actor = extract_field(&raw.value, &["funder"]).or(topic_actor);
            event.amount = extract_field(&raw.value, &["amount"]);
            event.reference_value = extract_field(&raw.value, &["reference_value"]);
        }
        EventKind::Withdrawn => {
            event.actor = extract_field(&raw.value, &["owner"]).or(topic_actor);
            event.amount = extract_field(&raw.value, &["amount"]);
            event.funder_count =
                extract_field(&raw.value, &["funder_count"]).and_then(|c| c.parse().ok());
        }
        EventKind::Unknown => event.actor = topic_actor,
    }

    Some(event)
}

/// Read a scalar out of `value`, looking through `{"type":…,"value":…}`
/// wrappers. Numbers are returned as decimal strings.
fn extract_field(value: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| value.get(key))
        .find_map(scalar_string)
}

fn scalar_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Object(_) => v.get("value").and_then(scalar_string),
        _ => None,
    }
}

/// Extract the scalar carried by a topic entry.
/// The RPC may return `{"type":"symbol","value":"funded"}` or just the raw string.
fn extract_scalar(raw: &str) -> String {
    serde_json::from_str::<Value>(raw)
        .ok()
        .and_then(|v| v.get("value").and_then(scalar_string))
        .unwrap_or_else(|| raw.to_string())
}

/// Parse an ISO-8601 timestamp string into a Unix epoch (seconds).
fn parse_iso_to_unix(s: &str) -> Option<i64> {
    chrono::DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.timestamp())
}

// ─────────────────────────────────────────────────────────
// Unit tests
// ─────────────────────────────────────────────────────────
