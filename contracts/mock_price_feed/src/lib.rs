//! # Mock Price Feed
//!
//! Aggregator-shaped price feed for local networks and tests. It answers the
//! same `decimals` / `latest_answer` / `version` calls FundMe makes against a
//! production feed, and lets an admin push new answers.
//!
//! Every `update_answer` starts a new round; `latest_round` reports it.

#![no_std]

use soroban_sdk::{contract, contractimpl, contracttype, Address, Env};

/// Implementation version reported by `version()`.
pub const VERSION: u32 = 4;

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum DataKey {
    Admin,
    Decimals,
    Answer,
    Round,
}

#[contract]
pub struct MockPriceFeed;

#[contractimpl]
impl MockPriceFeed {
    /// Create a feed reporting `initial_answer` at `decimals` precision.
    pub fn __constructor(env: Env, admin: Address, decimals: u32, initial_answer: i128) {
        env.storage().instance().set(&DataKey::Admin, &admin);
        env.storage().instance().set(&DataKey::Decimals, &decimals);
        env.storage().instance().set(&DataKey::Answer, &initial_answer);
        env.storage().instance().set(&DataKey::Round, &1u64);
    }

    pub fn decimals(env: Env) -> u32 {
        env.storage()
            .instance()
            .get(&DataKey::Decimals)
            .unwrap_or(0)
    }

    pub fn latest_answer(env: Env) -> i128 {
        env.storage().instance().get(&DataKey::Answer).unwrap_or(0)
    }

    pub fn latest_round(env: Env) -> u64 {
        env.storage().instance().get(&DataKey::Round).unwrap_or(0)
    }

    pub fn version() -> u32 {
        VERSION
    }

    /// Publish a new answer. Only the admin may call this.
    pub fn update_answer(env: Env, answer: i128) {
        let admin: Address = env
            .storage()
            .instance()
            .get(&DataKey::Admin)
            .expect("admin not set");
        admin.require_auth();

        let round = Self::latest_round(env.clone()) + 1;
        env.storage().instance().set(&DataKey::Answer, &answer);
        env.storage().instance().set(&DataKey::Round, &round);
    }
}
