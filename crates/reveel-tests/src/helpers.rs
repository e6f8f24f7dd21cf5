//! Shared fixtures for scenario and invariant tests.

use reveel_core::constants::UNIT;
use reveel_core::{Address, CallContext, Currency, MemoryLedger};
use reveel_path::{PathParams, RevenuePath};
use reveel_registry::{Registry, RegistryConfig};

pub const REGISTRY_OWNER: Address = Address([0x01; 20]);
pub const IMPLEMENTATION: Address = Address([0x11; 20]);
pub const PLATFORM_WALLET: Address = Address([0xFE; 20]);
pub const FORWARDER: Address = Address([0xF0; 20]);
pub const PLATFORM_FEE: u64 = 100_000;

pub const ALEX: Address = Address([0xA1; 20]);
pub const BOB: Address = Address([0xB0; 20]);
pub const TRACY: Address = Address([0x7C; 20]);
pub const KIM: Address = Address([0x4B; 20]);
pub const TIRTHA: Address = Address([0x7A; 20]);

pub const TOKEN: Currency = Currency::Token(Address([0x70; 20]));

/// Address from a single repeated byte.
pub fn wallet(seed: u8) -> Address {
    Address([seed; 20])
}

/// `n` tenths of a unit.
pub fn tenths(n: u128) -> u128 {
    UNIT * n / 10
}

pub fn registry_config() -> RegistryConfig {
    RegistryConfig {
        registry_address: Address([0x99; 20]),
        implementation: IMPLEMENTATION,
        platform_fee: PLATFORM_FEE,
        platform_wallet: PLATFORM_WALLET,
        trusted_forwarder: FORWARDER,
    }
}

pub fn registry() -> Registry {
    Registry::new(REGISTRY_OWNER, &registry_config()).expect("valid registry config")
}

pub fn owner_ctx() -> CallContext {
    CallContext::direct(REGISTRY_OWNER)
}

/// Three tiers over the native currency:
/// - tier 0: bob 20%, tracy 30%, alex 30%, kim 20%, limit 0.8
/// - tier 1: tracy 33%, kim 33%, alex 34%, limit 1.2
/// - tier 2: kim 50%, bob 50%, unlimited
pub fn three_tier_params(name: &str, immutable: bool) -> PathParams {
    PathParams {
        name: name.to_string(),
        wallet_lists: vec![
            vec![BOB, TRACY, ALEX, KIM],
            vec![TRACY, KIM, ALEX],
            vec![KIM, BOB],
        ],
        share_lists: vec![
            vec![2_000_000, 3_000_000, 3_000_000, 2_000_000],
            vec![3_300_000, 3_300_000, 3_400_000],
            vec![5_000_000, 5_000_000],
        ],
        currencies: vec![Currency::Native],
        limit_sequence: vec![vec![tenths(8), tenths(12)]],
        immutable,
    }
}

/// A single tier split evenly between `a` and `b`.
pub fn even_split_params(name: &str, a: Address, b: Address) -> PathParams {
    PathParams {
        name: name.to_string(),
        wallet_lists: vec![vec![a, b]],
        share_lists: vec![vec![5_000_000, 5_000_000]],
        currencies: vec![],
        limit_sequence: vec![],
        immutable: false,
    }
}

/// Create a path through a fresh registry, owned by the registry owner.
pub fn create(params: PathParams) -> (Registry, RevenuePath) {
    let mut registry = registry();
    let path = registry
        .create_revenue_path(&owner_ctx(), params)
        .expect("valid path params");
    (registry, path)
}

/// Send `amount` of `currency` to the path from outside.
pub fn deposit(ledger: &mut MemoryLedger, path: &RevenuePath, currency: Currency, amount: u128) {
    ledger
        .credit(&path.address(), &currency, amount)
        .expect("deposit fits");
}
