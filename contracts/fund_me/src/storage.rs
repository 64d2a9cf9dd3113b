//! # Storage
//!
//! Typed helpers over the two Soroban storage tiers used by FundMe. This is
//! the ledger: every read and write of funder state goes through here.
//!
//! ## Instance storage (contract-lifetime TTL)
//!
//! | Key           | Type      | Description                              |
//! |---------------|-----------|------------------------------------------|
//! | `Owner`       | `Address` | Privileged withdrawer, set once          |
//! | `PriceFeed`   | `Address` | Oracle contract, set once                |
//! | `NativeToken` | `Address` | SEP-41 token held in custody, set once   |
//! | `HeldBalance` | `i128`    | Sum of all outstanding contributions     |
//! | `FunderCount` | `u32`     | Length of the funder call log            |
//!
//! Instance TTL is bumped by **7 days** whenever it falls below 1 day remaining.
//!
//! ## Persistent storage (per-entry TTL)
//!
//! | Key                  | Type      | Description                         |
//! |----------------------|-----------|-------------------------------------|
//! | `Funder(i)`          | `Address` | i-th entry of the funder call log   |
//! | `AmountFunded(addr)` | `i128`    | Outstanding contribution of `addr`  |
//!
//! Persistent TTL is bumped by **30 days** whenever it falls below 7 days remaining.
//!
//! A missing `AmountFunded` entry reads as zero, so clearing removes the entry
//! instead of writing an explicit zero.

use soroban_sdk::{contracttype, Address, Env, Vec};

use crate::Error;

// ── TTL Constants ────────────────────────────────────────────────────

/// Approximate ledgers per day (~5 seconds per ledger).
const DAY_IN_LEDGERS: u32 = 17_280;

/// Instance storage: bump by 7 days when below 1 day remaining.
const INSTANCE_BUMP_AMOUNT: u32 = 7 * DAY_IN_LEDGERS;
const INSTANCE_LIFETIME_THRESHOLD: u32 = DAY_IN_LEDGERS;

/// Persistent storage: bump by 30 days when below 7 days remaining.
const PERSISTENT_BUMP_AMOUNT: u32 = 30 * DAY_IN_LEDGERS;
const PERSISTENT_LIFETIME_THRESHOLD: u32 = 7 * DAY_IN_LEDGERS;

// ── Storage Keys ─────────────────────────────────────────────────────

/// All contract storage keys.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum DataKey {
    /// Privileged withdrawer (Instance).
    Owner,
    /// Price feed contract address (Instance).
    PriceFeed,
    /// Token contract for the native unit (Instance).
    NativeToken,
    /// Running custody balance (Instance).
    HeldBalance,
    /// Number of entries in the funder call log (Instance).
    FunderCount,
    /// Funder call log entry keyed by position (Persistent).
    Funder(u32),
    /// Outstanding contribution keyed by funder (Persistent).
    AmountFunded(Address),
}

// ── Instance Storage Helpers ─────────────────────────────────────────

/// Extend instance storage TTL if it falls below the threshold.
fn bump_instance(env: &Env) {
    env.storage()
        .instance()
        .extend_ttl(INSTANCE_LIFETIME_THRESHOLD, INSTANCE_BUMP_AMOUNT);
}

/// Write the construction-time configuration. Called once, from the constructor.
pub fn init_config(env: &Env, owner: &Address, price_feed: &Address, native_token: &Address) {
    env.storage().instance().set(&DataKey::Owner, owner);
    env.storage().instance().set(&DataKey::PriceFeed, price_feed);
    env.storage()
        .instance()
        .set(&DataKey::NativeToken, native_token);
    set_held_balance(env, 0);
    set_funder_count(env, 0);
    bump_instance(env);
}

pub fn get_owner(env: &Env) -> Address {
    bump_instance(env);
    env.storage()
        .instance()
        .get(&DataKey::Owner)
        .expect("owner not set")
}

pub fn get_price_feed(env: &Env) -> Address {
    bump_instance(env);
    env.storage()
        .instance()
        .get(&DataKey::PriceFeed)
        .expect("price feed not set")
}

pub fn get_native_token(env: &Env) -> Address {
    bump_instance(env);
    env.storage()
        .instance()
        .get(&DataKey::NativeToken)
        .expect("native token not set")
}

/// Current custody balance; zero when nothing is held.
pub fn get_held_balance(env: &Env) -> i128 {
    bump_instance(env);
    env.storage()
        .instance()
        .get(&DataKey::HeldBalance)
        .unwrap_or(0)
}

fn set_held_balance(env: &Env, amount: i128) {
    env.storage().instance().set(&DataKey::HeldBalance, &amount);
}

/// Length of the funder call log.
pub fn get_funder_count(env: &Env) -> u32 {
    bump_instance(env);
    env.storage()
        .instance()
        .get(&DataKey::FunderCount)
        .unwrap_or(0)
}

fn set_funder_count(env: &Env, count: u32) {
    env.storage().instance().set(&DataKey::FunderCount, &count);
}

// ── Persistent Storage Helpers ───────────────────────────────────────

/// Extend the TTL for a persistent storage key.
fn bump_persistent(env: &Env, key: &DataKey) {
    env.storage()
        .persistent()
        .extend_ttl(key, PERSISTENT_LIFETIME_THRESHOLD, PERSISTENT_BUMP_AMOUNT);
}

/// Outstanding contribution of `funder`, zero if it has none.
pub fn get_amount_funded(env: &Env, funder: &Address) -> i128 {
    let key = DataKey::AmountFunded(funder.clone());
    match env.storage().persistent().get::<_, i128>(&key) {
        Some(amount) => {
            bump_persistent(env, &key);
            amount
        }
        None => 0,
    }
}

/// Funder recorded at `index` in the call log.
pub fn get_funder(env: &Env, index: u32) -> Result<Address, Error> {
    if index >= get_funder_count(env) {
        return Err(Error::IndexOutOfRange);
    }
    let key = DataKey::Funder(index);
    let funder = env
        .storage()
        .persistent()
        .get(&key)
        .ok_or(Error::IndexOutOfRange)?;
    bump_persistent(env, &key);
    Ok(funder)
}

/// Record an admitted contribution: credit the funder, append to the call
/// log and grow the custody balance.
///
/// The caller has already validated `amount` and taken the tokens into
/// custody in the same invocation.
pub fn record_contribution(env: &Env, funder: &Address, amount: i128) -> Result<(), Error> {
    let funded = get_amount_funded(env, funder)
        .checked_add(amount)
        .ok_or(Error::ArithmeticOverflow)?;
    let held = get_held_balance(env)
        .checked_add(amount)
        .ok_or(Error::ArithmeticOverflow)?;
    let index = get_funder_count(env);
    let next_count = index.checked_add(1).ok_or(Error::ArithmeticOverflow)?;

    let amount_key = DataKey::AmountFunded(funder.clone());
    env.storage().persistent().set(&amount_key, &funded);
    bump_persistent(env, &amount_key);

    let funder_key = DataKey::Funder(index);
    env.storage().persistent().set(&funder_key, funder);
    bump_persistent(env, &funder_key);

    set_funder_count(env, next_count);
    set_held_balance(env, held);
    Ok(())
}

/// Clear the ledger by walking the funder log entry by entry, re-reading the
/// log length from storage on each iteration.
pub fn clear_all(env: &Env) {
    let mut index = 0u32;
    while index < get_funder_count(env) {
        let key = DataKey::Funder(index);
        if let Some(funder) = env.storage().persistent().get::<_, Address>(&key) {
            reset_amount_funded(env, &funder);
        }
        env.storage().persistent().remove(&key);
        index += 1;
    }
    finish_clear(env);
}

/// Clear the ledger from a single snapshot of the funder log: the length is
/// read once and every entry is loaded before any record is reset.
pub fn clear_all_snapshot(env: &Env) {
    let funders = load_funders(env);
    for funder in funders.iter() {
        reset_amount_funded(env, &funder);
    }
    for index in 0..funders.len() {
        env.storage().persistent().remove(&DataKey::Funder(index));
    }
    finish_clear(env);
}

/// Every address in the funder call log, in contribution order.
pub fn load_funders(env: &Env) -> Vec<Address> {
    let count = get_funder_count(env);
    let mut funders = Vec::new(env);
    for index in 0..count {
        if let Some(funder) = env.storage().persistent().get(&DataKey::Funder(index)) {
            funders.push_back(funder);
        }
    }
    funders
}

fn reset_amount_funded(env: &Env, funder: &Address) {
    env.storage()
        .persistent()
        .remove(&DataKey::AmountFunded(funder.clone()));
}

fn finish_clear(env: &Env) {
    set_funder_count(env, 0);
    set_held_balance(env, 0);
}
