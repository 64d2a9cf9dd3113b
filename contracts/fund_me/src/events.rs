//! # Events
//!
//! Events published by FundMe. Each one is emitted after the state change it
//! describes, inside the same invocation, so a rolled-back call leaves no
//! event behind.
//!
//! | Topics                   | Data             |
//! |--------------------------|------------------|
//! | `("funded", funder)`     | [`FundedEvent`]    |
//! | `("withdrawn", owner)`   | [`WithdrawnEvent`] |

use soroban_sdk::{contracttype, symbol_short, Address, Env};

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FundedEvent {
    pub funder: Address,
    /// Native amount taken into custody.
    pub amount: i128,
    /// Reference-currency value the admission check saw.
    pub reference_value: i128,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct WithdrawnEvent {
    pub owner: Address,
    /// Native amount transferred to the owner.
    pub amount: i128,
    /// Length of the funder call log that was cleared.
    pub funder_count: u32,
}

pub fn emit_funded(env: &Env, funder: &Address, amount: i128, reference_value: i128) {
    env.events().publish(
        (symbol_short!("funded"), funder.clone()),
        FundedEvent {
            funder: funder.clone(),
            amount,
            reference_value,
        },
    );
}

pub fn emit_withdrawn(env: &Env, owner: &Address, amount: i128, funder_count: u32) {
    env.events().publish(
        (symbol_short!("withdrawn"), owner.clone()),
        WithdrawnEvent {
            owner: owner.clone(),
            amount,
            funder_count,
        },
    );
}
