//! Trait interfaces for Reveel.
//!
//! These traits define the seams to external collaborators:
//! - [`CurrencyLedger`]: balances and transfers of native currency and tokens
//! - [`PlatformDirectory`]: live platform parameters owned by the registry

use crate::address::{Address, Currency};
use crate::error::LedgerError;

/// The external currency/transfer primitive.
///
/// A revenue path never keeps its own notion of how much it holds: it reads
/// its live balance from the ledger and diffs it against what it has already
/// accounted for. All outbound value leaves through [`transfer`](Self::transfer).
pub trait CurrencyLedger {
    /// Current balance of `holder` in `currency`.
    fn balance_of(&self, holder: &Address, currency: &Currency) -> Result<u128, LedgerError>;

    /// Move `amount` of `currency` from `from` to `to`.
    ///
    /// Must either complete fully or fail without effect.
    fn transfer(
        &mut self,
        from: &Address,
        to: &Address,
        currency: &Currency,
        amount: u128,
    ) -> Result<(), LedgerError>;
}

/// Read access to the registry's mutable platform parameters.
///
/// Paths resolve these at call time; they are never frozen into a path.
/// The platform fee is not part of this trait because each path keeps the
/// snapshot taken when it was created.
pub trait PlatformDirectory: Send + Sync {
    /// Wallet that receives platform fees.
    fn platform_wallet(&self) -> Address;

    /// Relay whose forwarded signer is trusted. Zero disables relaying.
    fn trusted_forwarder(&self) -> Address;
}

/// Fixed platform parameters, for paths that live outside a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaticPlatform {
    pub platform_wallet: Address,
    pub trusted_forwarder: Address,
}

impl PlatformDirectory for StaticPlatform {
    fn platform_wallet(&self) -> Address {
        self.platform_wallet
    }

    fn trusted_forwarder(&self) -> Address {
        self.trusted_forwarder
    }
}
