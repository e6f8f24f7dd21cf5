//! Per-currency tier limits.
//!
//! A limit is the cumulative amount of a currency that must flow through a
//! tier before the waterfall moves on. Limits are stored sparsely: a
//! non-final tier with no stored limit for a currency is unlimited for that
//! currency, and the final tier never has one.

use std::collections::{BTreeMap, HashSet};

use reveel_core::error::{PathError, ValidationError};
use reveel_core::{Currency, ReveelError};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TierLimits {
    by_currency: BTreeMap<Currency, BTreeMap<usize, u128>>,
}

impl TierLimits {
    /// Build limits from one sequence per currency.
    ///
    /// Each sequence is aligned to tiers `0..tiers-1` and must be either
    /// empty (the currency is unlimited) or exactly `tiers - 1` long.
    pub fn from_sequence(
        currencies: &[Currency],
        limit_sequence: Vec<Vec<u128>>,
        tiers: usize,
    ) -> Result<Self, ValidationError> {
        check_shape(currencies, &limit_sequence, tiers)?;

        let mut by_currency = BTreeMap::new();
        for (currency, row) in currencies.iter().zip(limit_sequence) {
            if row.is_empty() {
                continue;
            }
            by_currency.insert(*currency, row.into_iter().enumerate().collect());
        }
        Ok(Self { by_currency })
    }

    /// Stored limit of `tier` for `currency`, `None` when unlimited.
    pub fn limit(&self, currency: &Currency, tier: usize) -> Option<u128> {
        self.by_currency
            .get(currency)
            .and_then(|tiers| tiers.get(&tier))
            .copied()
    }

    /// Overwrite the limit of one tier for each listed currency.
    ///
    /// `tiers` is the current tier count; the last index is the final tier
    /// and cannot be given a limit. Lowering a limit below what has already
    /// been distributed into the tier is accepted.
    pub fn update(
        &mut self,
        tier: usize,
        currencies: &[Currency],
        limits: &[u128],
        tiers: usize,
    ) -> Result<(), ReveelError> {
        if tier + 1 == tiers {
            return Err(PathError::FinalTierLimitNotUpdatable { tier }.into());
        }
        if tier >= tiers {
            return Err(ValidationError::TierOutOfRange { index: tier, tiers }.into());
        }
        if currencies.len() != limits.len() {
            return Err(ValidationError::CurrencyLimitMismatch {
                currencies: currencies.len(),
                limit_lists: limits.len(),
            }
            .into());
        }
        check_unique(currencies)?;

        for (currency, limit) in currencies.iter().zip(limits) {
            self.by_currency
                .entry(*currency)
                .or_default()
                .insert(tier, *limit);
        }
        Ok(())
    }

    /// Currencies with at least one stored limit.
    pub fn currencies(&self) -> impl Iterator<Item = &Currency> {
        self.by_currency.keys()
    }

    /// All stored limits of `currency`, by tier index.
    pub fn of_currency(&self, currency: &Currency) -> Option<&BTreeMap<usize, u128>> {
        self.by_currency.get(currency)
    }
}

/// Shape checks shared by path initialization and registry creation.
pub fn check_shape(
    currencies: &[Currency],
    limit_sequence: &[Vec<u128>],
    tiers: usize,
) -> Result<(), ValidationError> {
    if currencies.len() != limit_sequence.len() {
        return Err(ValidationError::CurrencyLimitMismatch {
            currencies: currencies.len(),
            limit_lists: limit_sequence.len(),
        });
    }
    check_unique(currencies)?;

    let expected = tiers.saturating_sub(1);
    for (currency, row) in currencies.iter().zip(limit_sequence) {
        if !row.is_empty() && row.len() != expected {
            return Err(ValidationError::LimitCountMismatch {
                currency: *currency,
                got: row.len(),
                expected,
            });
        }
    }
    Ok(())
}

fn check_unique(currencies: &[Currency]) -> Result<(), ValidationError> {
    let mut seen = HashSet::with_capacity(currencies.len());
    for currency in currencies {
        if !seen.insert(*currency) {
            return Err(ValidationError::DuplicateCurrency(*currency));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use reveel_core::Address;

    const TOKEN: Currency = Currency::Token(Address([0x70; 20]));

    #[test]
    fn sequence_maps_to_tiers() {
        let limits =
            TierLimits::from_sequence(&[Currency::Native, TOKEN], vec![vec![10, 20], vec![]], 3)
                .unwrap();
        assert_eq!(limits.limit(&Currency::Native, 0), Some(10));
        assert_eq!(limits.limit(&Currency::Native, 1), Some(20));
        assert_eq!(limits.limit(&Currency::Native, 2), None);
        assert_eq!(limits.limit(&TOKEN, 0), None);
        assert_eq!(limits.currencies().count(), 1);
    }

    #[test]
    fn unknown_currency_is_unlimited() {
        let limits = TierLimits::from_sequence(&[Currency::Native], vec![vec![10]], 2).unwrap();
        assert_eq!(limits.limit(&TOKEN, 0), None);
    }

    #[test]
    fn rejects_wrong_row_length() {
        let err = TierLimits::from_sequence(&[Currency::Native], vec![vec![1, 2]], 2).unwrap_err();
        assert_eq!(
            err,
            ValidationError::LimitCountMismatch { currency: Currency::Native, got: 2, expected: 1 }
        );
    }

    #[test]
    fn rejects_row_count_mismatch() {
        let err = TierLimits::from_sequence(&[Currency::Native], vec![], 2).unwrap_err();
        assert_eq!(err, ValidationError::CurrencyLimitMismatch { currencies: 1, limit_lists: 0 });
    }

    #[test]
    fn rejects_duplicate_currency() {
        let err = TierLimits::from_sequence(&[TOKEN, TOKEN], vec![vec![1], vec![2]], 2)
            .unwrap_err();
        assert_eq!(err, ValidationError::DuplicateCurrency(TOKEN));
    }

    #[test]
    fn update_overwrites_and_adds() {
        let mut limits = TierLimits::from_sequence(&[Currency::Native], vec![vec![10, 20]], 3).unwrap();
        limits.update(1, &[Currency::Native, TOKEN], &[5, 7], 3).unwrap();
        assert_eq!(limits.limit(&Currency::Native, 0), Some(10));
        assert_eq!(limits.limit(&Currency::Native, 1), Some(5));
        assert_eq!(limits.limit(&TOKEN, 1), Some(7));
        assert_eq!(limits.limit(&TOKEN, 0), None);
    }

    #[test]
    fn final_tier_not_updatable() {
        let mut limits = TierLimits::default();
        let before = limits.clone();
        assert_eq!(
            limits.update(2, &[Currency::Native], &[1], 3),
            Err(ReveelError::Path(PathError::FinalTierLimitNotUpdatable { tier: 2 }))
        );
        assert_eq!(limits, before);
    }

    #[test]
    fn update_out_of_range() {
        let mut limits = TierLimits::default();
        assert_eq!(
            limits.update(5, &[Currency::Native], &[1], 3),
            Err(ReveelError::Validation(ValidationError::TierOutOfRange { index: 5, tiers: 3 }))
        );
    }

    #[test]
    fn update_length_mismatch() {
        let mut limits = TierLimits::default();
        assert!(matches!(
            limits.update(0, &[Currency::Native, TOKEN], &[1], 3),
            Err(ReveelError::Validation(ValidationError::CurrencyLimitMismatch { .. }))
        ));
    }
}
