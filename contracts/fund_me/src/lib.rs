//! # FundMe Contract
//!
//! A minimal custody ledger. Anyone may contribute the native token as long
//! as the contribution is worth at least [`MINIMUM_REFERENCE_VALUE`] in the
//! reference currency, as priced by an external feed. The owner fixed at
//! construction may sweep the whole balance out at any time.
//!
//! | Phase        | Entry Point(s)                                         |
//! |--------------|--------------------------------------------------------|
//! | Bootstrap    | `__constructor`                                        |
//! | Funding      | [`FundMe::fund`]                                       |
//! | Custody      | [`FundMe::withdraw`], [`FundMe::cheaper_withdraw`]     |
//! | Ledger reads | `balance_of`, `funder_at`, `funder_count`, `funders`, `held_balance` |
//! | Config reads | `owner`, `price_feed`, `native_token`                  |
//! | Pricing      | `latest_price`, `conversion_rate`, `feed_version`, `minimum_reference_value` |
//!
//! ## Architecture
//!
//! Ledger storage lives in [`storage`], price reading and conversion in
//! [`price_converter`]. This file holds the entry points, the owner gate and
//! the custody transfer.
//!
//! ## Atomicity
//!
//! Every entry point runs as one Soroban invocation. Returning an [`Error`]
//! rolls back all storage writes and events of the call, so a withdrawal whose
//! outbound transfer fails leaves the ledger exactly as it was.

#![no_std]

use soroban_sdk::{contract, contracterror, contractimpl, token, Address, Env, Vec};

mod events;
pub mod price_converter;
mod storage;
mod types;

#[cfg(test)]
mod test_withdraw;

pub use events::{FundedEvent, WithdrawnEvent};
pub use price_converter::{MINIMUM_REFERENCE_VALUE, NATIVE_DECIMALS, REFERENCE_DECIMALS};
pub use types::PriceReading;

#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum Error {
    InsufficientContribution = 1,
    NotOwner                 = 2,
    TransferFailed           = 3,
    IndexOutOfRange          = 4,
    OracleReadFailure        = 5,
    ArithmeticOverflow       = 6,
}

#[contract]
pub struct FundMe;

#[contractimpl]
impl FundMe {
    // ─────────────────────────────────────────────────────────
    // Construction
    // ─────────────────────────────────────────────────────────

    /// Fix the owner, the price feed and the custodied token.
    ///
    /// None of the three can be changed afterwards.
    pub fn __constructor(env: Env, owner: Address, price_feed: Address, native_token: Address) {
        storage::init_config(&env, &owner, &price_feed, &native_token);
    }

    // ─────────────────────────────────────────────────────────
    // Funding
    // ─────────────────────────────────────────────────────────

    /// Contribute `amount` of the native token.
    ///
    /// The feed is read once; the same reading and amount drive the minimum
    /// check, the token pull and the ledger record.
    pub fn fund(env: Env, funder: Address, amount: i128) -> Result<(), Error> {
        funder.require_auth();

        let reading = price_converter::get_price(&env, &storage::get_price_feed(&env))?;
        let reference_value = price_converter::require_minimum(&reading, amount)?;

        let token_client = token::Client::new(&env, &storage::get_native_token(&env));
        token_client.transfer(&funder, &env.current_contract_address(), &amount);

        storage::record_contribution(&env, &funder, amount)?;

        events::emit_funded(&env, &funder, amount, reference_value);
        Ok(())
    }

    // ─────────────────────────────────────────────────────────
    // Custody
    // ─────────────────────────────────────────────────────────

    /// Send the whole held balance to the owner and clear the ledger.
    ///
    /// `caller` must be the owner. Returns the amount transferred.
    pub fn withdraw(env: Env, caller: Address) -> Result<i128, Error> {
        settle(&env, &caller, storage::clear_all)
    }

    /// Same as [`FundMe::withdraw`], but reads the funder log length once and
    /// loads the whole log before clearing it.
    pub fn cheaper_withdraw(env: Env, caller: Address) -> Result<i128, Error> {
        settle(&env, &caller, storage::clear_all_snapshot)
    }

    // ─────────────────────────────────────────────────────────
    // Ledger reads
    // ─────────────────────────────────────────────────────────

    pub fn balance_of(env: Env, funder: Address) -> i128 {
        storage::get_amount_funded(&env, &funder)
    }

    /// Funder recorded by the `index`-th contribution since the last withdrawal.
    pub fn funder_at(env: Env, index: u32) -> Result<Address, Error> {
        storage::get_funder(&env, index)
    }

    pub fn funder_count(env: Env) -> u32 {
        storage::get_funder_count(&env)
    }

    pub fn funders(env: Env) -> Vec<Address> {
        storage::load_funders(&env)
    }

    pub fn held_balance(env: Env) -> i128 {
        storage::get_held_balance(&env)
    }

    // ─────────────────────────────────────────────────────────
    // Config reads
    // ─────────────────────────────────────────────────────────

    pub fn owner(env: Env) -> Address {
        storage::get_owner(&env)
    }

    pub fn price_feed(env: Env) -> Address {
        storage::get_price_feed(&env)
    }

    pub fn native_token(env: Env) -> Address {
        storage::get_native_token(&env)
    }

    // ─────────────────────────────────────────────────────────
    // Pricing
    // ─────────────────────────────────────────────────────────

    pub fn latest_price(env: Env) -> Result<PriceReading, Error> {
        price_converter::get_price(&env, &storage::get_price_feed(&env))
    }

    /// Reference-currency value of `amount` at the current feed price.
    pub fn conversion_rate(env: Env, amount: i128) -> Result<i128, Error> {
        let reading = price_converter::get_price(&env, &storage::get_price_feed(&env))?;
        price_converter::convert(&reading, amount)
    }

    pub fn feed_version(env: Env) -> Result<u32, Error> {
        price_converter::get_version(&env, &storage::get_price_feed(&env))
    }

    pub fn minimum_reference_value() -> i128 {
        MINIMUM_REFERENCE_VALUE
    }
}

/// Owner-gated sweep shared by both withdrawal entry points.
///
/// The ledger is cleared before the outbound transfer; a failed transfer
/// returns `TransferFailed`, which reverts the clear with the rest of the call.
fn settle(env: &Env, caller: &Address, clear: fn(&Env)) -> Result<i128, Error> {
    caller.require_auth();

    let owner = storage::get_owner(env);
    if *caller != owner {
        return Err(Error::NotOwner);
    }

    let amount = storage::get_held_balance(env);
    let funder_count = storage::get_funder_count(env);

    clear(env);

    if amount > 0 {
        let token_client = token::Client::new(env, &storage::get_native_token(env));
        match token_client.try_transfer(&env.current_contract_address(), &owner, &amount) {
            Ok(Ok(())) => {}
            _ => return Err(Error::TransferFailed),
        }
    }

    events::emit_withdrawn(env, &owner, amount, funder_count);
    Ok(amount)
}
