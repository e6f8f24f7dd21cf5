//! Error types for Reveel revenue paths and the registry.
//!
//! Every failure is synchronous and atomic: an operation that returns one of
//! these errors leaves no partial state behind.
use thiserror::Error;

use crate::address::{Address, Currency};
use crate::constants::BASE;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("missing 0x prefix")] MissingPrefix,
    #[error("invalid hex: {0}")] InvalidHex(String),
    #[error("invalid length: {0} bytes, expected 20")] InvalidLength(usize),
}

/// Shape and validation failures. Raised before any state is touched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("no tiers provided")] NoTiers,
    #[error("tier list mismatch: {wallet_lists} wallet lists, {share_lists} share lists")]
    TierListMismatch { wallet_lists: usize, share_lists: usize },
    #[error("tier {tier}: {wallets} wallets but {shares} shares")]
    WalletShareCountMismatch { tier: usize, wallets: usize, shares: usize },
    #[error("tier {tier}: shares sum to {total}, expected {}", BASE)]
    ShareTotalMismatch { tier: usize, total: u128 },
    #[error("tier {tier}: duplicate wallet {wallet}")]
    DuplicateWallet { tier: usize, wallet: Address },
    #[error("zero address provided")] ZeroAddressProvided,
    #[error("{currencies} currencies but {limit_lists} limit lists")]
    CurrencyLimitMismatch { currencies: usize, limit_lists: usize },
    #[error("currency {currency}: {got} limits, expected 0 or {expected}")]
    LimitCountMismatch { currency: Currency, got: usize, expected: usize },
    #[error("duplicate currency {0}")] DuplicateCurrency(Currency),
    #[error("tier index {index} out of range ({tiers} tiers)")]
    TierOutOfRange { index: usize, tiers: usize },
    #[error("{lists} tier lists for {indices} tier indices")]
    UpdateIndexMismatch { lists: usize, indices: usize },
    #[error("tier {0} listed twice in one update")] DuplicateTierIndex(usize),
    #[error("platform fee {fee} not appropriate, must be at most {}", BASE)]
    PlatformFeeNotAppropriate { fee: u64 },
    #[error("invalid amount: {0}")] InvalidAmount(String),
}

/// State and policy failures of a revenue path.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("revenue path is not mutable")] NotMutable,
    #[error("tier {tier} is the final tier and has no limit")]
    FinalTierLimitNotUpdatable { tier: usize },
    #[error("arithmetic overflow")] ArithmeticOverflow,
}

/// Payout failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PaymentError {
    #[error("no due payment for {wallet} in {currency}")]
    NoDuePayment { currency: Currency, wallet: Address },
    #[error("transfer failed: {0}")] TransferFailed(#[source] LedgerError),
}

/// Admission failures: who may call, and when.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AccessError {
    #[error("caller {caller} is not the owner")] NotOwner { caller: Address },
    #[error("paused")] Paused,
    #[error("ownership cannot be renounced")] RenounceForbidden,
}

/// Failures of the external currency ledger.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("insufficient balance for {holder} in {currency}: have {have}, need {need}")]
    InsufficientBalance { holder: Address, currency: Currency, have: u128, need: u128 },
    #[error("balance overflow")] Overflow,
    #[error("accounting drift in {currency}: balance {balance} + released {released} < accounted {accounted}")]
    AccountingDrift { currency: Currency, balance: u128, released: u128, accounted: u128 },
    #[error("transfer rejected: {0}")] Rejected(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReveelError {
    #[error(transparent)] Validation(#[from] ValidationError),
    #[error(transparent)] Path(#[from] PathError),
    #[error(transparent)] Payment(#[from] PaymentError),
    #[error(transparent)] Access(#[from] AccessError),
    #[error(transparent)] Ledger(#[from] LedgerError),
    #[error(transparent)] Address(#[from] AddressError),
    #[error("config: {0}")] Config(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_share_total() {
        let e = ValidationError::ShareTotalMismatch { tier: 1, total: 9_000_000 };
        assert_eq!(e.to_string(), "tier 1: shares sum to 9000000, expected 10000000");
    }

    #[test]
    fn display_no_due_payment() {
        let e = PaymentError::NoDuePayment {
            currency: Currency::Native,
            wallet: Address([1; 20]),
        };
        assert_eq!(
            e.to_string(),
            format!("no due payment for 0x{} in native", "01".repeat(20))
        );
    }

    #[test]
    fn display_fee_not_appropriate() {
        let e = ValidationError::PlatformFeeNotAppropriate { fee: 100_000_000 };
        assert_eq!(
            e.to_string(),
            "platform fee 100000000 not appropriate, must be at most 10000000"
        );
    }

    #[test]
    fn from_path_error() {
        let e: ReveelError = PathError::NotMutable.into();
        assert_eq!(e, ReveelError::Path(PathError::NotMutable));
        assert_eq!(e.to_string(), "revenue path is not mutable");
    }

    #[test]
    fn from_access_error() {
        let e: ReveelError = AccessError::Paused.into();
        assert_eq!(e, ReveelError::Access(AccessError::Paused));
    }

    #[test]
    fn transfer_failed_keeps_source() {
        use std::error::Error as _;
        let e = PaymentError::TransferFailed(LedgerError::Rejected("frozen".into()));
        assert_eq!(e.source().map(|s| s.to_string()), Some("transfer rejected: frozen".into()));
    }
}
