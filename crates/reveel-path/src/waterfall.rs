//! Waterfall distribution engine.
//!
//! Settlement runs in two phases. [`plan`] walks the tiers from the
//! currency's current tier, filling each tier's remaining capacity in order
//! and carrying the remainder forward, and produces a [`SettlementPlan`]
//! without touching any state. [`apply`] then commits the plan. Every
//! overflow check happens while planning, so applying cannot fail and a
//! settlement is never left half-written.

use serde::{Deserialize, Serialize};
use tracing::debug;

use reveel_core::amount;
use reveel_core::constants::BASE;
use reveel_core::error::PathError;
use reveel_core::{Address, Currency};

use crate::limits::TierLimits;
use crate::tier::TierRegistry;
use crate::withdrawal::WithdrawalLedger;

/// Settlement state of one currency.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct CurrencySettlement {
    /// Tier currently receiving funds. Never decreases.
    pub current_tier: usize,
    /// Cumulative amount allocated into each tier, indexed by tier.
    #[serde(with = "amount::vec")]
    pub tier_distributed: Vec<u128>,
    /// Cumulative amount ever pulled into the waterfall.
    #[serde(with = "amount")]
    pub total_accounted: u128,
    /// Cumulative platform fee computed on settled chunks.
    #[serde(with = "amount")]
    pub fee_accumulated: u128,
    /// Platform fee already paid out to the platform wallet.
    #[serde(with = "amount")]
    pub fee_released: u128,
}

impl CurrencySettlement {
    /// Amount allocated into `tier` so far.
    pub fn distributed(&self, tier: usize) -> u128 {
        self.tier_distributed.get(tier).copied().unwrap_or(0)
    }

    fn add_distributed(&mut self, tier: usize, amount: u128) {
        if self.tier_distributed.len() <= tier {
            self.tier_distributed.resize(tier + 1, 0);
        }
        self.tier_distributed[tier] += amount;
    }
}

/// One chunk of a settlement, allocated into a single tier.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Allocation {
    pub tier: usize,
    /// Amount taken from pending funds, fee included.
    pub gross: u128,
    pub fee: u128,
    /// Per-wallet credits. Sums to `gross - fee`.
    pub credits: Vec<(Address, u128)>,
}

/// The effects of one settlement, computed but not yet applied.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SettlementPlan {
    pub currency: Currency,
    pub pending: u128,
    pub allocations: Vec<Allocation>,
    /// Current tier after the plan is applied.
    pub final_tier: usize,
}

impl SettlementPlan {
    /// Total platform fee across all chunks.
    pub fn fee(&self) -> u128 {
        self.allocations.iter().map(|a| a.fee).sum()
    }

    /// Total credited to `wallet` across all chunks.
    pub fn credited_to(&self, wallet: &Address) -> u128 {
        self.allocations
            .iter()
            .flat_map(|a| a.credits.iter())
            .filter(|(w, _)| w == wallet)
            .map(|(_, amount)| amount)
            .sum()
    }

    /// True when applying the plan changes nothing.
    pub fn is_empty(&self) -> bool {
        self.pending == 0
    }
}

/// Plan the allocation of `pending` funds of `currency`.
///
/// `fee_rate` is the platform fee over [`BASE`] to skim from every chunk,
/// zero when the path does not require a fee.
pub fn plan(
    tiers: &TierRegistry,
    limits: &TierLimits,
    state: &CurrencySettlement,
    currency: Currency,
    pending: u128,
    fee_rate: u64,
) -> Result<SettlementPlan, PathError> {
    // Every running total in the state is bounded by total_accounted.
    state
        .total_accounted
        .checked_add(pending)
        .ok_or(PathError::ArithmeticOverflow)?;

    let mut tier_index = state.current_tier;
    let mut remaining = pending;
    let mut allocations = Vec::new();

    while remaining > 0 {
        let capacity = if tiers.is_final(tier_index) {
            None
        } else {
            limits
                .limit(&currency, tier_index)
                .map(|limit| limit.saturating_sub(state.distributed(tier_index)))
        };
        let chunk = capacity.map_or(remaining, |c| c.min(remaining));

        let Some(tier) = tiers.get(tier_index) else {
            break;
        };
        if chunk > 0 {
            let fee = chunk
                .checked_mul(u128::from(fee_rate))
                .ok_or(PathError::ArithmeticOverflow)?
                / u128::from(BASE);
            let credits = tier.split(chunk - fee)?;
            debug!(%currency, tier = tier_index, chunk, fee, "waterfall chunk");
            allocations.push(Allocation {
                tier: tier_index,
                gross: chunk,
                fee,
                credits,
            });
        }
        remaining -= chunk;

        match capacity {
            Some(c) if chunk == c => tier_index += 1,
            _ => break,
        }
    }

    Ok(SettlementPlan {
        currency,
        pending,
        allocations,
        final_tier: tier_index,
    })
}

/// Commit a plan to the currency state and the withdrawal ledger.
pub fn apply(plan: &SettlementPlan, state: &mut CurrencySettlement, withdrawals: &mut WithdrawalLedger) {
    for allocation in &plan.allocations {
        state.add_distributed(allocation.tier, allocation.gross);
        state.total_accounted += allocation.gross;
        state.fee_accumulated += allocation.fee;
        for (wallet, amount) in &allocation.credits {
            withdrawals.credit(plan.currency, *wallet, *amount);
        }
    }
    state.current_tier = plan.final_tier;
}

/// Undo the withdrawal credits of an applied plan.
///
/// The caller restores the currency state from its own copy.
pub fn revert(plan: &SettlementPlan, withdrawals: &mut WithdrawalLedger) {
    for allocation in &plan.allocations {
        for (wallet, amount) in &allocation.credits {
            withdrawals.uncredit(plan.currency, *wallet, *amount);
        }
    }
}
