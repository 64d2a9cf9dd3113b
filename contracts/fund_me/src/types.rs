//! # Types
//!
//! Shared data structures used across the FundMe contract modules.
//!
//! ## Fixed-point conventions
//!
//! Three precisions meet inside the contract:
//!
//! | Quantity            | Decimals                  | Example                      |
//! |---------------------|---------------------------|------------------------------|
//! | Native amount       | `NATIVE_DECIMALS` (7)     | `10_000_000` = 1 XLM         |
//! | Oracle answer       | reported by the feed      | `2000_00000000` @ 8 decimals |
//! | Reference value     | `REFERENCE_DECIMALS` (18) | `50 * 10^18` = 50 USD        |
//!
//! All of them are carried as `i128`, the amount type used by SEP-41 tokens.

use soroban_sdk::contracttype;

/// A single reading taken from the price feed.
///
/// `answer` is the price of one whole native unit expressed in reference
/// currency, scaled by `10^decimals`.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PriceReading {
    pub answer: i128,
    pub decimals: u32,
}
