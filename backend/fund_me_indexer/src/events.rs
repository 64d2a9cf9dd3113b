//! Canonical event types emitted by the FundMe contract.
//!
//! These mirror the Soroban contract events defined in
//! `contracts/fund_me/src/events.rs`.

use serde::{Deserialize, Serialize};

/// All recognised event kinds from the FundMe contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// A contribution was admitted (`funded` topic).
    Funded,
    /// The owner swept the held balance (`withdrawn` topic).
    Withdrawn,
    /// An event from this contract that we don't recognise yet.
    Unknown,
}

impl EventKind {
    /// Parse the leading topic symbol string produced by Soroban into an [`EventKind`].
    pub fn from_topic(topic: &str) -> Self {
        match topic {
            "funded" => Self::Funded,
            "withdrawn" => Self::Withdrawn,
            _ => Self::Unknown,
        }
    }

    /// Return a short identifier string suitable for storage in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Funded => "funded",
            Self::Withdrawn => "withdrawn",
            Self::Unknown => "unknown",
        }
    }
}

/// A fully decoded FundMe event, ready to be stored in the database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FundMeEvent {
    /// RPC event id; unique per emitted event.
    pub event_id: String,
    pub event_type: String,
    /// Funder for `funded`, owner for `withdrawn`.
    pub actor: Option<String>,
    /// Native amount, decimal string (i128 does not fit SQLite integers).
    pub amount: Option<String>,
    pub reference_value: Option<String>,
    pub funder_count: Option<i64>,
    pub ledger: i64,
    pub timestamp: i64,
    pub contract_id: String,
    pub tx_hash: Option<String>,
}

/// A raw event record as stored in / read from the database.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct EventRecord {
    pub id: i64,
    pub event_id: String,
    pub event_type: String,
    pub actor: Option<String>,
    pub amount: Option<String>,
    pub reference_value: Option<String>,
    pub funder_count: Option<i64>,
    pub ledger: i64,
    pub timestamp: i64,
    pub contract_id: String,
    pub tx_hash: Option<String>,
    pub created_at: i64,
}

impl EventRecord {
    fn amount_value(&self) -> i128 {
        self.amount
            .as_deref()
            .and_then(|a| a.parse::<i128>().ok())
            .unwrap_or(0)
    }
}

/// Replay `records` (ordered by ledger) and return what `funder` still has
/// in custody: the sum of its `funded` amounts since the latest `withdrawn`.
pub fn outstanding_balance(records: &[EventRecord], funder: &str) -> i128 {
    let mut balance: i128 = 0;
    for record in records {
        match EventKind::from_topic(&record.event_type) {
            EventKind::Withdrawn => balance = 0,
            EventKind::Funded if record.actor.as_deref() == Some(funder) => {
                balance = balance.saturating_add(record.amount_value());
            }
            _ => {}
        }
    }
    balance
}
