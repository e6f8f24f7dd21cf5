//! The revenue path: tiers, limits, settlement state and withdrawal ledger
//! of one deployed instance.
//!
//! A path never learns about deposits directly. Every settlement starts by
//! diffing the path's live balance on the [`CurrencyLedger`] against what it
//! has already accounted for, so funds sent by any means are picked up by
//! the next [`settle`](RevenuePath::settle) or [`release`](RevenuePath::release).

use std::collections::BTreeMap;
use std::fmt;
use std::ops::Range;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use reveel_core::amount;
use reveel_core::constants::MAX_PLATFORM_FEE;
use reveel_core::error::{LedgerError, PathError, PaymentError, ValidationError};
use reveel_core::{Address, CallContext, Currency, CurrencyLedger, PlatformDirectory, ReveelError};

use crate::events::{PathEvent, TierView};
use crate::limits::{self, TierLimits};
use crate::tier::{self, TierRegistry};
use crate::waterfall::{self, CurrencySettlement, SettlementPlan};
use crate::withdrawal::{WithdrawalEntry, WithdrawalLedger};

/// Caller-supplied description of a new path.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct PathParams {
    pub name: String,
    /// One wallet list per tier.
    pub wallet_lists: Vec<Vec<Address>>,
    /// One share list per tier, parallel to `wallet_lists`.
    pub share_lists: Vec<Vec<u64>>,
    #[serde(default)]
    pub currencies: Vec<Currency>,
    /// One limit list per currency, each empty or one entry per non-final tier.
    #[serde(default, with = "amount::nested")]
    pub limit_sequence: Vec<Vec<u128>>,
    #[serde(default)]
    pub immutable: bool,
}

impl PathParams {
    /// Run every shape check without building anything.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.wallet_lists.is_empty() && self.share_lists.is_empty() {
            return Err(ValidationError::NoTiers);
        }
        tier::validate_lists(0, self.wallet_lists.clone(), self.share_lists.clone())?;
        limits::check_shape(&self.currencies, &self.limit_sequence, self.wallet_lists.len())
    }
}

/// Values fixed by whoever instantiates the path.
#[derive(Clone)]
pub struct PathInit {
    pub address: Address,
    pub owner: Address,
    pub implementation: Address,
    /// Platform fee snapshot, over `BASE`.
    pub platform_fee: u64,
    pub platform: Arc<dyn PlatformDirectory>,
}

pub struct RevenuePath {
    address: Address,
    name: String,
    owner: Address,
    implementation: Address,
    immutable: bool,
    fee_required: bool,
    platform_fee: u64,
    platform: Arc<dyn PlatformDirectory>,
    tiers: TierRegistry,
    limits: TierLimits,
    settlements: BTreeMap<Currency, CurrencySettlement>,
    withdrawals: WithdrawalLedger,
    events: Vec<PathEvent>,
}

/// What a failing settle or release restores.
struct Checkpoint {
    currency: Currency,
    settlement: Option<CurrencySettlement>,
    events: usize,
}

impl fmt::Debug for RevenuePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RevenuePath")
            .field("address", &self.address)
            .field("name", &self.name)
            .field("owner", &self.owner)
            .field("tiers", &self.tiers.len())
            .field("immutable", &self.immutable)
            .finish_non_exhaustive()
    }
}

/// Serializable view of a path's full state.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct PathSnapshot {
    pub address: Address,
    pub name: String,
    pub owner: Address,
    pub implementation: Address,
    pub immutable: bool,
    pub fee_required: bool,
    pub platform_fee: u64,
    pub tiers: Vec<TierView>,
    pub limits: Vec<LimitView>,
    pub currencies: Vec<CurrencyView>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct LimitView {
    pub currency: Currency,
    pub tier: usize,
    #[serde(with = "amount")]
    pub limit: u128,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct CurrencyView {
    pub currency: Currency,
    #[serde(flatten)]
    pub settlement: CurrencySettlement,
    pub beneficiaries: Vec<BeneficiaryView>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct BeneficiaryView {
    pub wallet: Address,
    #[serde(flatten)]
    pub entry: WithdrawalEntry,
}

impl RevenuePath {
    /// Build a path from validated parameters.
    ///
    /// The fee requirement is set when there is more than one tier.
    pub fn initialize(params: PathParams, init: PathInit) -> Result<Self, ReveelError> {
        if init.owner.is_zero() || init.address.is_zero() {
            return Err(ValidationError::ZeroAddressProvided.into());
        }
        if init.platform_fee > MAX_PLATFORM_FEE {
            return Err(ValidationError::PlatformFeeNotAppropriate {
                fee: init.platform_fee,
            }
            .into());
        }

        let tiers = TierRegistry::from_lists(params.wallet_lists, params.share_lists)?;
        let limits = TierLimits::from_sequence(&params.currencies, params.limit_sequence, tiers.len())?;
        let fee_required = tiers.len() > 1;

        info!(
            address = %init.address,
            name = %params.name,
            tiers = tiers.len(),
            immutable = params.immutable,
            "revenue path initialized"
        );

        Ok(Self {
            address: init.address,
            name: params.name,
            owner: init.owner,
            implementation: init.implementation,
            immutable: params.immutable,
            fee_required,
            platform_fee: init.platform_fee,
            platform: init.platform,
            tiers,
            limits,
            settlements: BTreeMap::new(),
            withdrawals: WithdrawalLedger::default(),
            events: Vec::new(),
        })
    }

    // ------------------------------------------------------------------
    // Settlement and release
    // ------------------------------------------------------------------

    /// Funds of `currency` received but not yet pulled into the waterfall.
    ///
    /// Computed as live balance plus everything the path has paid out,
    /// minus everything it has accounted for.
    pub fn pending<L: CurrencyLedger + ?Sized>(
        &self,
        ledger: &L,
        currency: &Currency,
    ) -> Result<u128, LedgerError> {
        let balance = ledger.balance_of(&self.address, currency)?;
        let released = self.total_released(currency);
        let accounted = self.total_accounted(currency);
        balance
            .checked_add(released)
            .ok_or(LedgerError::Overflow)?
            .checked_sub(accounted)
            .ok_or(LedgerError::AccountingDrift {
                currency: *currency,
                balance,
                released,
                accounted,
            })
    }

    /// Run the waterfall over pending funds of `currency`.
    ///
    /// Returns the amount recognized; zero pending is a no-op. Platform fee
    /// not yet paid out is sent to the current platform wallet before
    /// returning. If that payout fails nothing is recorded.
    pub fn settle<L: CurrencyLedger + ?Sized>(
        &mut self,
        ledger: &mut L,
        currency: &Currency,
    ) -> Result<u128, ReveelError> {
        let plan = self.plan_pending(ledger, currency)?;
        let checkpoint = self.checkpoint(currency);
        if let Some(plan) = &plan {
            self.commit(plan);
        }

        if let Err(e) = self.pay_platform_fee(ledger, currency) {
            warn!(%currency, error = %e, "platform fee payout failed");
            self.restore(checkpoint, plan.as_ref());
            return Err(PaymentError::TransferFailed(e).into());
        }
        Ok(plan.map_or(0, |p| p.pending))
    }

    /// Settle `currency`, then pay `wallet` everything it can claim.
    ///
    /// Either the beneficiary is paid or the path is left exactly as it
    /// was: the claim is computed from the planned settlement before
    /// anything is written, and a failed transfer undoes the settlement
    /// along with the release. The platform fee is paid after the
    /// beneficiary; if that payout fails it stays owed and goes out with
    /// the next settlement.
    pub fn release<L: CurrencyLedger + ?Sized>(
        &mut self,
        ledger: &mut L,
        currency: &Currency,
        wallet: &Address,
    ) -> Result<u128, ReveelError> {
        let plan = self.plan_pending(ledger, currency)?;
        let planned = plan.as_ref().map_or(0, |p| p.credited_to(wallet));
        let claimable = self
            .claimable(currency, wallet)
            .checked_add(planned)
            .ok_or(PathError::ArithmeticOverflow)?;
        if claimable == 0 {
            return Err(PaymentError::NoDuePayment {
                currency: *currency,
                wallet: *wallet,
            }
            .into());
        }

        let checkpoint = self.checkpoint(currency);
        if let Some(plan) = &plan {
            self.commit(plan);
        }

        let amount = match self.withdrawals.begin_release(currency, wallet) {
            Ok(amount) => amount,
            Err(e) => {
                self.restore(checkpoint, plan.as_ref());
                return Err(e.into());
            }
        };
        if let Err(e) = ledger.transfer(&self.address, wallet, currency, amount) {
            warn!(%currency, %wallet, amount, error = %e, "release transfer failed");
            self.withdrawals.cancel_release(currency, wallet, amount);
            self.restore(checkpoint, plan.as_ref());
            return Err(PaymentError::TransferFailed(e).into());
        }

        info!(path = %self.address, %currency, %wallet, amount, "payment released");
        self.events.push(PathEvent::PaymentReleased {
            currency: *currency,
            wallet: *wallet,
            amount,
        });

        if let Err(e) = self.pay_platform_fee(ledger, currency) {
            warn!(%currency, error = %e, "platform fee payout deferred");
        }
        Ok(amount)
    }

    /// Plan the settlement of pending funds without recording anything.
    fn plan_pending<L: CurrencyLedger + ?Sized>(
        &self,
        ledger: &L,
        currency: &Currency,
    ) -> Result<Option<SettlementPlan>, ReveelError> {
        let pending = self.pending(ledger, currency)?;
        if pending == 0 {
            return Ok(None);
        }

        let fee_rate = if self.fee_required { self.platform_fee } else { 0 };
        let empty = CurrencySettlement::default();
        let state = self.settlements.get(currency).unwrap_or(&empty);
        let plan = waterfall::plan(&self.tiers, &self.limits, state, *currency, pending, fee_rate)?;
        Ok(Some(plan))
    }

    fn commit(&mut self, plan: &SettlementPlan) {
        let state = self.settlements.entry(plan.currency).or_default();
        let from_tier = state.current_tier;
        waterfall::apply(plan, state, &mut self.withdrawals);

        debug!(
            currency = %plan.currency,
            pending = plan.pending,
            fee = plan.fee(),
            from_tier,
            to_tier = state.current_tier,
            "settled"
        );
        self.events.push(PathEvent::DepositRecognized {
            currency: plan.currency,
            amount: plan.pending,
            current_tier: state.current_tier,
            total_accounted: state.total_accounted,
        });
    }

    /// Send the fee computed but not yet paid out to the live platform wallet.
    fn pay_platform_fee<L: CurrencyLedger + ?Sized>(
        &mut self,
        ledger: &mut L,
        currency: &Currency,
    ) -> Result<u128, LedgerError> {
        let Some(state) = self.settlements.get_mut(currency) else {
            return Ok(0);
        };
        let fee = state.fee_accumulated - state.fee_released;
        if fee == 0 {
            return Ok(0);
        }

        let platform_wallet = self.platform.platform_wallet();
        ledger.transfer(&self.address, &platform_wallet, currency, fee)?;
        state.fee_released += fee;
        self.events.push(PathEvent::FeeDistributed {
            currency: *currency,
            platform_wallet,
            amount: fee,
        });
        Ok(fee)
    }

    fn checkpoint(&self, currency: &Currency) -> Checkpoint {
        Checkpoint {
            currency: *currency,
            settlement: self.settlements.get(currency).cloned(),
            events: self.events.len(),
        }
    }

    /// Undo a committed plan and drop the events recorded since `checkpoint`.
    fn restore(&mut self, checkpoint: Checkpoint, plan: Option<&SettlementPlan>) {
        if let Some(plan) = plan {
            waterfall::revert(plan, &mut self.withdrawals);
        }
        match checkpoint.settlement {
            Some(state) => {
                self.settlements.insert(checkpoint.currency, state);
            }
            None => {
                self.settlements.remove(&checkpoint.currency);
            }
        }
        self.events.truncate(checkpoint.events);
    }

    // ------------------------------------------------------------------
    // Privileged mutations
    // ------------------------------------------------------------------

    fn require_mutable_owner(&self, ctx: &CallContext) -> Result<(), ReveelError> {
        ctx.require_owner(&self.owner, &self.platform.trusted_forwarder())?;
        if self.immutable {
            return Err(PathError::NotMutable.into());
        }
        Ok(())
    }

    /// Append tiers. The previous final tier becomes limited; until a limit
    /// is set for it, it is unlimited for every currency.
    pub fn add_tiers(
        &mut self,
        ctx: &CallContext,
        wallet_lists: Vec<Vec<Address>>,
        share_lists: Vec<Vec<u64>>,
    ) -> Result<Range<usize>, ReveelError> {
        self.require_mutable_owner(ctx)?;

        let added = self.tiers.append(wallet_lists, share_lists)?;
        self.fee_required = self.tiers.len() > 1;

        info!(path = %self.address, added = added.len(), total = self.tiers.len(), "tiers added");
        let tiers = self.tier_views(added.clone());
        self.events.push(PathEvent::TierAdded {
            tiers,
            total_tiers: self.tiers.len(),
        });
        Ok(added)
    }

    /// Overwrite tiers in place. Accrued balances are untouched.
    pub fn update_tiers(
        &mut self,
        ctx: &CallContext,
        wallet_lists: Vec<Vec<Address>>,
        share_lists: Vec<Vec<u64>>,
        indices: &[usize],
    ) -> Result<(), ReveelError> {
        self.require_mutable_owner(ctx)?;

        self.tiers.replace(wallet_lists, share_lists, indices)?;

        info!(path = %self.address, ?indices, "tiers updated");
        let tiers = indices
            .iter()
            .filter_map(|&i| self.tiers.get(i).map(|t| TierView::new(i, t)))
            .collect();
        self.events.push(PathEvent::TierUpdated { tiers });
        Ok(())
    }

    /// Set the limit of `tier` for each listed currency.
    pub fn update_limits(
        &mut self,
        ctx: &CallContext,
        currencies: &[Currency],
        limits: &[u128],
        tier: usize,
    ) -> Result<(), ReveelError> {
        self.require_mutable_owner(ctx)?;

        self.limits.update(tier, currencies, limits, self.tiers.len())?;

        info!(path = %self.address, tier, currencies = currencies.len(), "limits updated");
        self.events.push(PathEvent::LimitUpdated {
            tier,
            currencies: currencies.to_vec(),
            limits: limits.to_vec(),
        });
        Ok(())
    }

    /// Hand the path to a new owner. Allowed on immutable paths.
    pub fn transfer_ownership(&mut self, ctx: &CallContext, new_owner: Address) -> Result<(), ReveelError> {
        ctx.require_owner(&self.owner, &self.platform.trusted_forwarder())?;
        if new_owner.is_zero() {
            return Err(ValidationError::ZeroAddressProvided.into());
        }

        let previous = std::mem::replace(&mut self.owner, new_owner);
        info!(path = %self.address, %previous, new = %new_owner, "path ownership transferred");
        self.events.push(PathEvent::OwnershipTransferred {
            previous,
            new: new_owner,
        });
        Ok(())
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn implementation(&self) -> Address {
        self.implementation
    }

    pub fn is_immutable(&self) -> bool {
        self.immutable
    }

    pub fn fee_required(&self) -> bool {
        self.fee_required
    }

    pub fn platform_fee(&self) -> u64 {
        self.platform_fee
    }

    /// Current platform wallet, read live.
    pub fn platform_wallet(&self) -> Address {
        self.platform.platform_wallet()
    }

    pub fn total_tiers(&self) -> usize {
        self.tiers.len()
    }

    pub fn tiers(&self) -> &TierRegistry {
        &self.tiers
    }

    pub fn limits(&self) -> &TierLimits {
        &self.limits
    }

    pub fn tier_wallets(&self, tier: usize) -> Result<&[Address], ValidationError> {
        Ok(self.tiers.tier(tier)?.wallets())
    }

    pub fn share_of(&self, tier: usize, wallet: &Address) -> Result<u64, ValidationError> {
        Ok(self.tiers.tier(tier)?.share_of(wallet))
    }

    /// Stored limit; `None` for the final tier and for unset limits.
    pub fn tier_limit(&self, tier: usize, currency: &Currency) -> Option<u128> {
        if self.tiers.is_final(tier) {
            return None;
        }
        self.limits.limit(currency, tier)
    }

    pub fn current_tier(&self, currency: &Currency) -> usize {
        self.settlement(currency).map_or(0, |s| s.current_tier)
    }

    pub fn tier_distributed(&self, currency: &Currency, tier: usize) -> u128 {
        self.settlement(currency).map_or(0, |s| s.distributed(tier))
    }

    pub fn total_accounted(&self, currency: &Currency) -> u128 {
        self.settlement(currency).map_or(0, |s| s.total_accounted)
    }

    pub fn fee_accumulated(&self, currency: &Currency) -> u128 {
        self.settlement(currency).map_or(0, |s| s.fee_accumulated)
    }

    pub fn fee_released(&self, currency: &Currency) -> u128 {
        self.settlement(currency).map_or(0, |s| s.fee_released)
    }

    /// Everything paid out in `currency`: releases plus fee payouts.
    pub fn total_released(&self, currency: &Currency) -> u128 {
        self.withdrawals.total_released(currency) + self.fee_released(currency)
    }

    pub fn withdrawable(&self, currency: &Currency, wallet: &Address) -> u128 {
        self.withdrawals.entry(currency, wallet).withdrawable
    }

    pub fn released(&self, currency: &Currency, wallet: &Address) -> u128 {
        self.withdrawals.entry(currency, wallet).released
    }

    pub fn claimable(&self, currency: &Currency, wallet: &Address) -> u128 {
        self.withdrawals.entry(currency, wallet).claimable()
    }

    pub fn settlement(&self, currency: &Currency) -> Option<&CurrencySettlement> {
        self.settlements.get(currency)
    }

    pub fn snapshot(&self) -> PathSnapshot {
        let limits = self
            .limits
            .currencies()
            .flat_map(|currency| {
                self.limits
                    .of_currency(currency)
                    .into_iter()
                    .flatten()
                    .map(move |(&tier, &limit)| LimitView {
                        currency: *currency,
                        tier,
                        limit,
                    })
            })
            .collect();

        let currencies = self
            .settlements
            .iter()
            .map(|(currency, settlement)| CurrencyView {
                currency: *currency,
                settlement: settlement.clone(),
                beneficiaries: self
                    .withdrawals
                    .entries(*currency)
                    .map(|(wallet, entry)| BeneficiaryView { wallet, entry })
                    .collect(),
            })
            .collect();

        PathSnapshot {
            address: self.address,
            name: self.name.clone(),
            owner: self.owner,
            implementation: self.implementation,
            immutable: self.immutable,
            fee_required: self.fee_required,
            platform_fee: self.platform_fee,
            tiers: self.tier_views(0..self.tiers.len()),
            limits,
            currencies,
        }
    }

    /// Drain events emitted since the last call.
    pub fn take_events(&mut self) -> Vec<PathEvent> {
        std::mem::take(&mut self.events)
    }

    fn tier_views(&self, range: Range<usize>) -> Vec<TierView> {
        range
            .filter_map(|i| self.tiers.get(i).map(|t| TierView::new(i, t)))
            .collect()
    }
}
