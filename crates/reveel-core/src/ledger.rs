//! In-memory currency ledger.
//!
//! [`MemoryLedger`] implements [`CurrencyLedger`] over a `HashMap`. It models
//! the external currency primitive for tests, simulations and the CLI. An
//! external deposit (a native send or an out-of-band token transfer into a
//! path) is modelled with [`MemoryLedger::credit`], which does not notify the
//! receiver.

use std::collections::HashMap;

use tracing::debug;

use crate::address::{Address, Currency};
use crate::error::LedgerError;
use crate::traits::CurrencyLedger;

/// Balances keyed by `(holder, currency)`.
#[derive(Debug, Clone, Default)]
pub struct MemoryLedger {
    balances: HashMap<(Address, Currency), u128>,
    /// Number of successful transfers, for assertions in tests.
    transfers: u64,
}

impl MemoryLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add funds to `holder` from outside the ledger.
    pub fn credit(
        &mut self,
        holder: &Address,
        currency: &Currency,
        amount: u128,
    ) -> Result<(), LedgerError> {
        let slot = self.balances.entry((*holder, *currency)).or_insert(0);
        *slot = slot.checked_add(amount).ok_or(LedgerError::Overflow)?;
        debug!(%holder, %currency, amount, "ledger credit");
        Ok(())
    }

    /// Remove funds from `holder` outside any path's knowledge.
    ///
    /// Used to model an accounting fault in tests.
    pub fn debit(
        &mut self,
        holder: &Address,
        currency: &Currency,
        amount: u128,
    ) -> Result<(), LedgerError> {
        let have = self.balance(holder, currency);
        let rest = have
            .checked_sub(amount)
            .ok_or(LedgerError::InsufficientBalance {
                holder: *holder,
                currency: *currency,
                have,
                need: amount,
            })?;
        self.balances.insert((*holder, *currency), rest);
        Ok(())
    }

    /// Balance lookup that cannot fail.
    pub fn balance(&self, holder: &Address, currency: &Currency) -> u128 {
        self.balances
            .get(&(*holder, *currency))
            .copied()
            .unwrap_or(0)
    }

    /// Sum of all balances in `currency`.
    pub fn supply(&self, currency: &Currency) -> u128 {
        self.balances
            .iter()
            .filter(|((_, c), _)| c == currency)
            .map(|(_, v)| *v)
            .sum()
    }

    /// Number of transfers completed so far.
    pub fn transfer_count(&self) -> u64 {
        self.transfers
    }
}

impl CurrencyLedger for MemoryLedger {
    fn balance_of(&self, holder: &Address, currency: &Currency) -> Result<u128, LedgerError> {
        Ok(self.balance(holder, currency))
    }

    fn transfer(
        &mut self,
        from: &Address,
        to: &Address,
        currency: &Currency,
        amount: u128,
    ) -> Result<(), LedgerError> {
        let have = self.balance(from, currency);
        if have < amount {
            return Err(LedgerError::InsufficientBalance {
                holder: *from,
                currency: *currency,
                have,
                need: amount,
            });
        }
        // Check the credit side before touching either balance.
        let to_balance = self
            .balance(to, currency)
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;
        if from == to {
            return Ok(());
        }
        self.balances.insert((*from, *currency), have - amount);
        self.balances.insert((*to, *currency), to_balance);
        self.transfers += 1;
        debug!(%from, %to, %currency, amount, "ledger transfer");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALICE: Address = Address([0xA1; 20]);
    const BOB: Address = Address([0xB0; 20]);
    const TOKEN: Currency = Currency::Token(Address([0x70; 20]));

    #[test]
    fn credit_and_balance() {
        let mut l = MemoryLedger::new();
        l.credit(&ALICE, &Currency::Native, 100).unwrap();
        assert_eq!(l.balance_of(&ALICE, &Currency::Native).unwrap(), 100);
        assert_eq!(l.balance_of(&ALICE, &TOKEN).unwrap(), 0);
        assert_eq!(l.balance_of(&BOB, &Currency::Native).unwrap(), 0);
    }

    #[test]
    fn transfer_moves_funds() {
        let mut l = MemoryLedger::new();
        l.credit(&ALICE, &TOKEN, 50).unwrap();
        l.transfer(&ALICE, &BOB, &TOKEN, 20).unwrap();
        assert_eq!(l.balance(&ALICE, &TOKEN), 30);
        assert_eq!(l.balance(&BOB, &TOKEN), 20);
        assert_eq!(l.supply(&TOKEN), 50);
        assert_eq!(l.transfer_count(), 1);
    }

    #[test]
    fn transfer_insufficient_fails_without_effect() {
        let mut l = MemoryLedger::new();
        l.credit(&ALICE, &Currency::Native, 10).unwrap();
        let err = l.transfer(&ALICE, &BOB, &Currency::Native, 11).unwrap_err();
        assert_eq!(
            err,
            LedgerError::InsufficientBalance {
                holder: ALICE,
                currency: Currency::Native,
                have: 10,
                need: 11,
            }
        );
        assert_eq!(l.balance(&ALICE, &Currency::Native), 10);
        assert_eq!(l.balance(&BOB, &Currency::Native), 0);
        assert_eq!(l.transfer_count(), 0);
    }

    #[test]
    fn credit_overflow_rejected() {
        let mut l = MemoryLedger::new();
        l.credit(&ALICE, &Currency::Native, u128::MAX).unwrap();
        assert_eq!(
            l.credit(&ALICE, &Currency::Native, 1),
            Err(LedgerError::Overflow)
        );
    }

    #[test]
    fn transfer_to_self_is_noop() {
        let mut l = MemoryLedger::new();
        l.credit(&ALICE, &Currency::Native, 5).unwrap();
        l.transfer(&ALICE, &ALICE, &Currency::Native, 5).unwrap();
        assert_eq!(l.balance(&ALICE, &Currency::Native), 5);
    }

    #[test]
    fn debit_removes_funds() {
        let mut l = MemoryLedger::new();
        l.credit(&ALICE, &Currency::Native, 5).unwrap();
        l.debit(&ALICE, &Currency::Native, 3).unwrap();
        assert_eq!(l.balance(&ALICE, &Currency::Native), 2);
        assert!(l.debit(&ALICE, &Currency::Native, 3).is_err());
    }
}
