//! Withdrawal ledger: what each beneficiary is owed and has been paid.
//!
//! `withdrawable` is cumulative and only grows; `released` catches up to it
//! on every release. Entries are never removed, so a wallet dropped from a
//! tier can still claim what it accrued before.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use reveel_core::amount;
use reveel_core::error::PaymentError;
use reveel_core::{Address, Currency};

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WithdrawalEntry {
    #[serde(with = "amount")]
    pub withdrawable: u128,
    #[serde(with = "amount")]
    pub released: u128,
}

impl WithdrawalEntry {
    pub fn claimable(&self) -> u128 {
        self.withdrawable - self.released
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WithdrawalLedger {
    entries: BTreeMap<(Currency, Address), WithdrawalEntry>,
    /// Sum of `released` per currency.
    released_totals: BTreeMap<Currency, u128>,
}

impl WithdrawalLedger {
    pub fn entry(&self, currency: &Currency, wallet: &Address) -> WithdrawalEntry {
        self.entries
            .get(&(*currency, *wallet))
            .copied()
            .unwrap_or_default()
    }

    /// Add `amount` to the wallet's withdrawable balance.
    pub(crate) fn credit(&mut self, currency: Currency, wallet: Address, amount: u128) {
        if amount == 0 {
            return;
        }
        self.entries.entry((currency, wallet)).or_default().withdrawable += amount;
    }

    pub(crate) fn uncredit(&mut self, currency: Currency, wallet: Address, amount: u128) {
        if let Some(entry) = self.entries.get_mut(&(currency, wallet)) {
            entry.withdrawable -= amount;
        }
    }

    /// Mark the wallet's whole claimable balance as released.
    ///
    /// Returns the amount the caller must now transfer. Call
    /// [`cancel_release`](Self::cancel_release) if the transfer fails.
    pub fn begin_release(&mut self, currency: &Currency, wallet: &Address) -> Result<u128, PaymentError> {
        let no_due = || PaymentError::NoDuePayment {
            currency: *currency,
            wallet: *wallet,
        };
        let entry = self.entries.get_mut(&(*currency, *wallet)).ok_or_else(no_due)?;
        let amount = entry.claimable();
        if amount == 0 {
            return Err(no_due());
        }
        entry.released = entry.withdrawable;
        *self.released_totals.entry(*currency).or_default() += amount;
        Ok(amount)
    }

    pub fn cancel_release(&mut self, currency: &Currency, wallet: &Address, amount: u128) {
        if let Some(entry) = self.entries.get_mut(&(*currency, *wallet)) {
            entry.released -= amount;
        }
        if let Some(total) = self.released_totals.get_mut(currency) {
            *total -= amount;
        }
    }

    /// Total paid out to beneficiaries in `currency`.
    pub fn total_released(&self, currency: &Currency) -> u128 {
        self.released_totals.get(currency).copied().unwrap_or(0)
    }

    /// All entries of `currency`, ordered by wallet.
    pub fn entries(&self, currency: Currency) -> impl Iterator<Item = (Address, WithdrawalEntry)> + '_ {
        self.entries
            .range((currency, Address::ZERO)..)
            .take_while(move |((c, _), _)| *c == currency)
            .map(|((_, wallet), entry)| (*wallet, *entry))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALICE: Address = Address([0xA1; 20]);
    const BOB: Address = Address([0xB0; 20]);
    const TOKEN: Currency = Currency::Token(Address([0x70; 20]));

    #[test]
    fn credit_accumulates() {
        let mut l = WithdrawalLedger::default();
        l.credit(Currency::Native, ALICE, 5);
        l.credit(Currency::Native, ALICE, 7);
        assert_eq!(l.entry(&Currency::Native, &ALICE).withdrawable, 12);
        assert_eq!(l.entry(&TOKEN, &ALICE), WithdrawalEntry::default());
    }

    #[test]
    fn release_pays_claimable_once() {
        let mut l = WithdrawalLedger::default();
        l.credit(Currency::Native, ALICE, 10);
        assert_eq!(l.begin_release(&Currency::Native, &ALICE), Ok(10));
        assert_eq!(l.entry(&Currency::Native, &ALICE).claimable(), 0);
        assert_eq!(l.total_released(&Currency::Native), 10);
        assert_eq!(
            l.begin_release(&Currency::Native, &ALICE),
            Err(PaymentError::NoDuePayment { currency: Currency::Native, wallet: ALICE })
        );

        l.credit(Currency::Native, ALICE, 3);
        assert_eq!(l.begin_release(&Currency::Native, &ALICE), Ok(3));
        assert_eq!(l.entry(&Currency::Native, &ALICE).released, 13);
    }

    #[test]
    fn unknown_wallet_has_nothing_due() {
        let mut l = WithdrawalLedger::default();
        assert!(matches!(
            l.begin_release(&TOKEN, &BOB),
            Err(PaymentError::NoDuePayment { .. })
        ));
    }

    #[test]
    fn cancel_restores_entry_and_total() {
        let mut l = WithdrawalLedger::default();
        l.credit(TOKEN, BOB, 8);
        let before = l.clone();
        let amount = l.begin_release(&TOKEN, &BOB).unwrap();
        l.cancel_release(&TOKEN, &BOB, amount);
        assert_eq!(l.entry(&TOKEN, &BOB), before.entry(&TOKEN, &BOB));
        assert_eq!(l.total_released(&TOKEN), 0);
    }

    #[test]
    fn entries_filtered_by_currency() {
        let mut l = WithdrawalLedger::default();
        l.credit(Currency::Native, BOB, 1);
        l.credit(Currency::Native, ALICE, 2);
        l.credit(TOKEN, ALICE, 3);
        let native: Vec<_> = l.entries(Currency::Native).map(|(w, e)| (w, e.withdrawable)).collect();
        assert_eq!(native, vec![(ALICE, 2), (BOB, 1)]);
        assert_eq!(l.entries(TOKEN).count(), 1);
    }
}
