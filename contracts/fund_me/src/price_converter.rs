//! # Price Converter
//!
//! Reads the native-unit price from the external feed and turns native
//! amounts into reference-currency value for the admission check.
//!
//! ```text
//! reference = floor(answer * 10^(REFERENCE_DECIMALS - decimals) * amount / 10^NATIVE_DECIMALS)
//! ```
//!
//! Only integer arithmetic is used. The division truncates. To keep the
//! intermediate product inside `i128` the amount is split into whole native
//! units and a sub-unit remainder, which yields the same floor as the single
//! wide division for non-negative operands.

use soroban_sdk::{contractclient, Address, Env};

use crate::types::PriceReading;
use crate::Error;

/// Decimals of the custodied token (stroops for XLM).
pub const NATIVE_DECIMALS: u32 = 7;

/// Decimals of every reference-currency value produced here.
pub const REFERENCE_DECIMALS: u32 = 18;

/// Smallest admissible contribution: 50 reference units.
pub const MINIMUM_REFERENCE_VALUE: i128 = 50 * 10i128.pow(REFERENCE_DECIMALS);

const NATIVE_UNIT: i128 = 10i128.pow(NATIVE_DECIMALS);

/// Aggregator-shaped oracle consumed by FundMe.
#[allow(dead_code)]
#[contractclient(name = "PriceFeedClient")]
pub trait PriceFeed {
    /// Decimals of `latest_answer`.
    fn decimals(env: Env) -> u32;
    /// Latest price of one native unit in reference currency.
    fn latest_answer(env: Env) -> i128;
    /// Feed implementation version.
    fn version(env: Env) -> u32;
}

/// Take a reading from `feed`.
///
/// Any failure of the cross-contract call, a non-positive answer, or a
/// precision finer than `REFERENCE_DECIMALS` is an `OracleReadFailure`.
pub fn get_price(env: &Env, feed: &Address) -> Result<PriceReading, Error> {
    let client = PriceFeedClient::new(env, feed);

    let answer = match client.try_latest_answer() {
        Ok(Ok(answer)) => answer,
        _ => return Err(Error::OracleReadFailure),
    };
    let decimals = match client.try_decimals() {
        Ok(Ok(decimals)) => decimals,
        _ => return Err(Error::OracleReadFailure),
    };

    if answer <= 0 || decimals > REFERENCE_DECIMALS {
        return Err(Error::OracleReadFailure);
    }

    Ok(PriceReading { answer, decimals })
}

/// Version reported by `feed`.
pub fn get_version(env: &Env, feed: &Address) -> Result<u32, Error> {
    match PriceFeedClient::new(env, feed).try_version() {
        Ok(Ok(version)) => Ok(version),
        _ => Err(Error::OracleReadFailure),
    }
}

/// Reference-currency value of `amount` native units at `reading`.
pub fn convert(reading: &PriceReading, amount: i128) -> Result<i128, Error> {
    if amount <= 0 {
        return Ok(0);
    }

    let price = reading
        .answer
        .checked_mul(10i128.pow(REFERENCE_DECIMALS - reading.decimals))
        .ok_or(Error::ArithmeticOverflow)?;

    let whole = amount / NATIVE_UNIT;
    let fraction = amount % NATIVE_UNIT;

    let whole_value = price.checked_mul(whole).ok_or(Error::ArithmeticOverflow)?;
    let fraction_value = price
        .checked_mul(fraction)
        .ok_or(Error::ArithmeticOverflow)?
        / NATIVE_UNIT;

    whole_value
        .checked_add(fraction_value)
        .ok_or(Error::ArithmeticOverflow)
}

/// Admission gate for a contribution of `amount`.
///
/// Returns the converted value on success so the caller records exactly what
/// was checked.
pub fn require_minimum(reading: &PriceReading, amount: i128) -> Result<i128, Error> {
    if amount <= 0 {
        return Err(Error::InsufficientContribution);
    }
    let value = convert(reading, amount)?;
    if value < MINIMUM_REFERENCE_VALUE {
        return Err(Error::InsufficientContribution);
    }
    Ok(value)
}
