extern crate std;

use soroban_sdk::{
    contract, contracterror, contractimpl, contracttype, testutils::Address as _, Address, Env,
};

use crate::invariants::{
    assert_funder_log, assert_held_balance_matches, assert_ledger_cleared, LedgerSnapshot,
};
use crate::test::{register_feed, setup, Setup, FEED_DECIMALS, INITIAL_ANSWER, SEND_VALUE};
use crate::{Error, FundMe, FundMeClient};

// ─────────────────────────────────────────────────────────
// Withdrawal variants
// ─────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug)]
enum Variant {
    Baseline,
    Cheaper,
}

const VARIANTS: [Variant; 2] = [Variant::Baseline, Variant::Cheaper];

impl Variant {
    fn call(self, client: &FundMeClient, caller: &Address) -> i128 {
        match self {
            Variant::Baseline => client.withdraw(caller),
            Variant::Cheaper => client.cheaper_withdraw(caller),
        }
    }

    fn try_call(self, client: &FundMeClient, caller: &Address) -> Result<i128, Error> {
        let result = match self {
            Variant::Baseline => client.try_withdraw(caller),
            Variant::Cheaper => client.try_cheaper_withdraw(caller),
        };
        match result {
            Ok(Ok(amount)) => Ok(amount),
            Err(Ok(error)) => Err(error),
            other => panic!("unexpected host failure: {other:?}"),
        }
    }
}

// ─────────────────────────────────────────────────────────
// A token whose transfers into a frozen address fail
// ─────────────────────────────────────────────────────────

#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum GatedTokenError {
    RecipientFrozen = 1,
    InsufficientBalance = 2,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum GatedTokenKey {
    Balance(Address),
    Frozen(Address),
}

#[contract]
pub struct GatedToken;

#[contractimpl]
impl GatedToken {
    pub fn mint(env: Env, to: Address, amount: i128) {
        let balance = Self::balance(env.clone(), to.clone());
        env.storage()
            .persistent()
            .set(&GatedTokenKey::Balance(to), &(balance + amount));
    }

    pub fn set_frozen(env: Env, id: Address, frozen: bool) {
        env.storage()
            .persistent()
            .set(&GatedTokenKey::Frozen(id), &frozen);
    }

    pub fn balance(env: Env, id: Address) -> i128 {
        env.storage()
            .persistent()
            .get(&GatedTokenKey::Balance(id))
            .unwrap_or(0)
    }

    pub fn transfer(
        env: Env,
        from: Address,
        to: Address,
        amount: i128,
    ) -> Result<(), GatedTokenError> {
        from.require_auth();
        let frozen: bool = env
            .storage()
            .persistent()
            .get(&GatedTokenKey::Frozen(to.clone()))
            .unwrap_or(false);
        if frozen {
            return Err(GatedTokenError::RecipientFrozen);
        }
        let from_balance = Self::balance(env.clone(), from.clone());
        if from_balance < amount {
            return Err(GatedTokenError::InsufficientBalance);
        }
        let to_balance = Self::balance(env.clone(), to.clone());
        env.storage()
            .persistent()
            .set(&GatedTokenKey::Balance(from), &(from_balance - amount));
        env.storage()
            .persistent()
            .set(&GatedTokenKey::Balance(to), &(to_balance + amount));
        Ok(())
    }
}

struct GatedSetup {
    env: Env,
    client: FundMeClient<'static>,
    owner: Address,
    token: GatedTokenClient<'static>,
}

fn setup_gated() -> GatedSetup {
    let env = Env::default();
    env.mock_all_auths();

    let owner = Address::generate(&env);
    let feed = register_feed(&env, FEED_DECIMALS, INITIAL_ANSWER);
    let token_id = env.register(GatedToken, ());
    let token = GatedTokenClient::new(&env, &token_id);
    let contract_id = env.register(FundMe, (owner.clone(), feed.address.clone(), token_id));
    let client = FundMeClient::new(&env, &contract_id);

    GatedSetup {
        env,
        client,
        owner,
        token,
    }
}

fn fund_accounts(s: &Setup, n: usize) -> std::vec::Vec<Address> {
    (0..n)
        .map(|_| {
            let funder = s.funded_account();
            s.client.fund(&funder, &SEND_VALUE);
            funder
        })
        .collect()
}

// ─────────────────────────────────────────────────────────
// Single funder
// ─────────────────────────────────────────────────────────

#[test]
fn test_withdraw_single_funder() {
    for variant in VARIANTS {
        let s = setup();
        let funder = s.funded_account();
        s.client.fund(&funder, &SEND_VALUE);

        assert_eq!(s.client.balance_of(&funder), SEND_VALUE);
        assert_eq!(s.client.funder_at(&0), funder);
        assert_eq!(s.client.held_balance(), SEND_VALUE);

        let owner_before = s.token.balance(&s.owner);
        let contract_before = s.token.balance(&s.client.address);

        let withdrawn = variant.call(&s.client, &s.owner);

        assert_eq!(withdrawn, SEND_VALUE, "{variant:?}");
        assert_eq!(s.token.balance(&s.client.address), 0, "{variant:?}");
        assert_eq!(
            s.token.balance(&s.owner),
            owner_before + contract_before,
            "{variant:?}"
        );
        assert_eq!(
            s.client.try_funder_at(&0),
            Err(Ok(Error::IndexOutOfRange)),
            "{variant:?}"
        );
        assert_ledger_cleared(&s.client, &[funder]);
    }
}

// ─────────────────────────────────────────────────────────
// Multiple funders
// ─────────────────────────────────────────────────────────

#[test]
fn test_withdraw_multiple_funders() {
    for variant in VARIANTS {
        let s = setup();
        let funders = fund_accounts(&s, 6);
        assert_held_balance_matches(&s.client, &funders);

        let owner_before = s.token.balance(&s.owner);
        let withdrawn = variant.call(&s.client, &s.owner);

        assert_eq!(withdrawn, 6 * SEND_VALUE, "{variant:?}");
        assert_eq!(s.token.balance(&s.owner), owner_before + 6 * SEND_VALUE);
        assert_eq!(s.token.balance(&s.client.address), 0);
        assert_eq!(
            s.client.try_funder_at(&0),
            Err(Ok(Error::IndexOutOfRange))
        );
        assert_ledger_cleared(&s.client, &funders);
    }
}

#[test]
fn test_withdraw_clears_repeat_funder_entries() {
    for variant in VARIANTS {
        let s = setup();
        let alice = s.funded_account();
        let bob = s.funded_account();
        s.client.fund(&alice, &SEND_VALUE);
        s.client.fund(&bob, &SEND_VALUE);
        s.client.fund(&alice, &SEND_VALUE);
        assert_funder_log(&s.client, &[alice.clone(), bob.clone(), alice.clone()]);

        assert_eq!(variant.call(&s.client, &s.owner), 3 * SEND_VALUE);
        assert_ledger_cleared(&s.client, &[alice, bob]);
    }
}

// ─────────────────────────────────────────────────────────
// Owner gate
// ─────────────────────────────────────────────────────────

#[test]
fn test_only_owner_can_withdraw() {
    for variant in VARIANTS {
        let s = setup();
        let attacker = s.funded_account();
        let funder = s.funded_account();
        s.client.fund(&funder, &SEND_VALUE);
        s.client.fund(&attacker, &SEND_VALUE);

        let before = LedgerSnapshot::capture(&s.client, &[funder.clone(), attacker.clone()]);
        let attacker_tokens = s.token.balance(&attacker);

        assert_eq!(
            variant.try_call(&s.client, &attacker),
            Err(Error::NotOwner),
            "{variant:?}"
        );

        before.assert_unchanged(&s.client);
        assert_eq!(s.client.balance_of(&attacker), SEND_VALUE);
        assert_eq!(s.token.balance(&attacker), attacker_tokens);
        assert_eq!(s.token.balance(&s.client.address), 2 * SEND_VALUE);
    }
}

#[test]
fn test_owner_may_also_fund() {
    for variant in VARIANTS {
        let s = setup();
        s.token_sac.mint(&s.owner, &(10 * SEND_VALUE));
        s.client.fund(&s.owner, &SEND_VALUE);
        assert_eq!(s.client.funder_at(&0), s.owner);

        assert_eq!(variant.call(&s.client, &s.owner), SEND_VALUE);
        assert_eq!(s.token.balance(&s.owner), 10 * SEND_VALUE);
        assert_ledger_cleared(&s.client, &[s.owner.clone()]);
    }
}

// ─────────────────────────────────────────────────────────
// Empty ledger and reuse
// ─────────────────────────────────────────────────────────

#[test]
fn test_withdraw_empty_ledger_is_noop() {
    for variant in VARIANTS {
        let s = setup();
        assert_eq!(variant.call(&s.client, &s.owner), 0);
        assert_eq!(s.token.balance(&s.owner), 0);
        assert_ledger_cleared(&s.client, &[]);
    }
}

#[test]
fn test_ledger_is_reusable_after_withdrawal() {
    for variant in VARIANTS {
        let s = setup();
        let first = fund_accounts(&s, 2);
        assert_eq!(variant.call(&s.client, &s.owner), 2 * SEND_VALUE);
        assert_ledger_cleared(&s.client, &first);

        let second = s.funded_account();
        s.client.fund(&second, &(3 * SEND_VALUE));
        s.client.fund(&first[0], &SEND_VALUE);
        assert_funder_log(&s.client, &[second.clone(), first[0].clone()]);
        assert_eq!(s.client.balance_of(&first[0]), SEND_VALUE);
        assert_eq!(s.client.balance_of(&first[1]), 0);
        assert_eq!(s.client.held_balance(), 4 * SEND_VALUE);

        assert_eq!(variant.call(&s.client, &s.owner), 4 * SEND_VALUE);
        assert_eq!(s.token.balance(&s.owner), 6 * SEND_VALUE);
        assert_ledger_cleared(&s.client, &[second, first[0].clone(), first[1].clone()]);
    }
}

// ─────────────────────────────────────────────────────────
// Transfer failure
// ─────────────────────────────────────────────────────────

#[test]
fn test_failed_transfer_rolls_back_clear() {
    for variant in VARIANTS {
        let s = setup_gated();
        let alice = Address::generate(&s.env);
        let bob = Address::generate(&s.env);
        s.token.mint(&alice, &(10 * SEND_VALUE));
        s.token.mint(&bob, &(10 * SEND_VALUE));
        s.client.fund(&alice, &SEND_VALUE);
        s.client.fund(&bob, &(2 * SEND_VALUE));
        s.client.fund(&alice, &SEND_VALUE);

        let before = LedgerSnapshot::capture(&s.client, &[alice.clone(), bob.clone()]);
        s.token.set_frozen(&s.owner, &true);

        assert_eq!(
            variant.try_call(&s.client, &s.owner),
            Err(Error::TransferFailed),
            "{variant:?}"
        );

        before.assert_unchanged(&s.client);
        assert_funder_log(&s.client, &[alice.clone(), bob.clone(), alice.clone()]);
        assert_eq!(s.token.balance(&s.client.address), 4 * SEND_VALUE);
        assert_eq!(s.token.balance(&s.owner), 0);

        // Once the owner can receive again the same ledger settles in full.
        s.token.set_frozen(&s.owner, &false);
        assert_eq!(variant.call(&s.client, &s.owner), 4 * SEND_VALUE);
        assert_eq!(s.token.balance(&s.owner), 4 * SEND_VALUE);
        assert_ledger_cleared(&s.client, &[alice, bob]);
    }
}

// ─────────────────────────────────────────────────────────
// Variant parity
// ─────────────────────────────────────────────────────────

/// Run the same sequence of calls under `variant` and return every
/// observable outcome along the way.
fn run_parity_script(
    variant: Variant,
) -> std::vec::Vec<(
    Result<i128, Error>,
    (i128, u32, std::vec::Vec<i128>, std::vec::Vec<Option<usize>>),
)> {
    let s = setup();
    let mut accounts = fund_accounts(&s, 3);
    s.client.fund(&accounts[1], &(2 * SEND_VALUE));
    let attacker = s.funded_account();
    s.client.fund(&attacker, &SEND_VALUE);
    accounts.push(attacker.clone());

    let mut outcomes = std::vec::Vec::new();
    let mut record = |result: Result<i128, Error>| {
        let snapshot = LedgerSnapshot::capture(&s.client, &accounts);
        outcomes.push((result, snapshot.shape()));
    };

    record(variant.try_call(&s.client, &attacker));
    record(variant.try_call(&s.client, &s.owner));
    record(variant.try_call(&s.client, &s.owner));
    s.client.fund(&attacker, &(5 * SEND_VALUE));
    record(variant.try_call(&s.client, &attacker));
    record(variant.try_call(&s.client, &s.owner));

    outcomes
}

#[test]
fn test_withdraw_variants_are_indistinguishable() {
    let baseline = run_parity_script(Variant::Baseline);
    let cheaper = run_parity_script(Variant::Cheaper);

    assert_eq!(baseline, cheaper);
    assert_eq!(baseline[0].0, Err(Error::NotOwner));
    assert_eq!(baseline[1].0, Ok(6 * SEND_VALUE));
    assert_eq!(baseline[2].0, Ok(0));
    assert_eq!(baseline[3].0, Err(Error::NotOwner));
    assert_eq!(baseline[4].0, Ok(5 * SEND_VALUE));
}
