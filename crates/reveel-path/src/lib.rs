//! # reveel-path — Tiered waterfall revenue path.
//!
//! A revenue path receives native currency and tokens and distributes them to
//! beneficiaries arranged in tiers:
//! - **Tier registry**: ordered tiers of unique wallets whose shares sum to
//!   `BASE`; the last tier is unlimited.
//! - **Limits**: per-currency capacity of each non-final tier.
//! - **Waterfall**: pending funds fill tiers in order, spilling the remainder
//!   into the next tier once a limit is reached, with a platform fee skimmed
//!   from every chunk when the path has more than one tier.
//! - **Withdrawal ledger**: cumulative withdrawable and released amounts per
//!   beneficiary and currency.

pub mod events;
pub mod limits;
pub mod path;
pub mod tier;
pub mod waterfall;
pub mod withdrawal;

pub use events::{PathEvent, TierView};
pub use limits::TierLimits;
pub use path::{PathInit, PathParams, PathSnapshot, RevenuePath};
pub use tier::{Tier, TierRegistry};
pub use waterfall::{CurrencySettlement, SettlementPlan};
pub use withdrawal::{WithdrawalEntry, WithdrawalLedger};
