//! Events emitted by a revenue path for off-chain indexers.

use serde::{Deserialize, Serialize};

use reveel_core::amount;
use reveel_core::{Address, Currency};

use crate::tier::Tier;

/// A tier as published in events and snapshots.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct TierView {
    pub index: usize,
    pub wallets: Vec<Address>,
    pub shares: Vec<u64>,
}

impl TierView {
    pub fn new(index: usize, tier: &Tier) -> Self {
        Self {
            index,
            wallets: tier.wallets().to_vec(),
            shares: tier.shares().to_vec(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PathEvent {
    /// Pending funds were pulled into the waterfall.
    DepositRecognized {
        currency: Currency,
        #[serde(with = "amount")]
        amount: u128,
        current_tier: usize,
        #[serde(with = "amount")]
        total_accounted: u128,
    },
    /// Platform fee paid out during settlement.
    FeeDistributed {
        currency: Currency,
        platform_wallet: Address,
        #[serde(with = "amount")]
        amount: u128,
    },
    TierAdded {
        tiers: Vec<TierView>,
        total_tiers: usize,
    },
    TierUpdated {
        tiers: Vec<TierView>,
    },
    LimitUpdated {
        tier: usize,
        currencies: Vec<Currency>,
        #[serde(with = "amount::vec")]
        limits: Vec<u128>,
    },
    PaymentReleased {
        currency: Currency,
        wallet: Address,
        #[serde(with = "amount")]
        amount: u128,
    },
    OwnershipTransferred {
        previous: Address,
        new: Address,
    },
}
