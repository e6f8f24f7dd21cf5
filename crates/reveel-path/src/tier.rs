//! Tier registry: the ordered list of beneficiary tiers and its mutations.
//!
//! A tier is an ordered list of unique wallets with a share each. Shares
//! are integers over [`BASE`] and must sum to exactly `BASE` in every tier
//! at all times. The last tier is the final tier and is unlimited for every
//! currency. Tiers are appended or overwritten in place, never removed.

use std::collections::HashSet;
use std::ops::Range;

use serde::{Deserialize, Serialize};

use reveel_core::constants::BASE;
use reveel_core::error::{PathError, ValidationError};
use reveel_core::Address;

/// One tier of beneficiaries.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Tier {
    wallets: Vec<Address>,
    /// Parallel to `wallets`.
    shares: Vec<u64>,
}

impl Tier {
    /// Validate one tier's wallet and share lists.
    ///
    /// `index` is only used to label errors.
    ///
    /// # Errors
    ///
    /// - [`ValidationError::WalletShareCountMismatch`] if the list lengths differ
    /// - [`ValidationError::ZeroAddressProvided`] if any wallet is zero
    /// - [`ValidationError::DuplicateWallet`] if a wallet repeats
    /// - [`ValidationError::ShareTotalMismatch`] if shares do not sum to `BASE`
    pub fn new(index: usize, wallets: Vec<Address>, shares: Vec<u64>) -> Result<Self, ValidationError> {
        if wallets.len() != shares.len() {
            return Err(ValidationError::WalletShareCountMismatch {
                tier: index,
                wallets: wallets.len(),
                shares: shares.len(),
            });
        }

        let mut seen = HashSet::with_capacity(wallets.len());
        for wallet in &wallets {
            if wallet.is_zero() {
                return Err(ValidationError::ZeroAddressProvided);
            }
            if !seen.insert(*wallet) {
                return Err(ValidationError::DuplicateWallet {
                    tier: index,
                    wallet: *wallet,
                });
            }
        }

        let total: u128 = shares.iter().map(|s| u128::from(*s)).sum();
        if total != u128::from(BASE) {
            return Err(ValidationError::ShareTotalMismatch { tier: index, total });
        }

        Ok(Self { wallets, shares })
    }

    pub fn wallets(&self) -> &[Address] {
        &self.wallets
    }

    pub fn shares(&self) -> &[u64] {
        &self.shares
    }

    /// Share of `wallet` in this tier, zero if it is not a member.
    pub fn share_of(&self, wallet: &Address) -> u64 {
        self.wallets
            .iter()
            .position(|w| w == wallet)
            .map_or(0, |i| self.shares[i])
    }

    /// Split `net` across the tier's wallets.
    ///
    /// Each wallet gets `floor(net * share / BASE)`. The rounding remainder,
    /// at most `wallets - 1` units, goes to the last wallet so the returned
    /// credits always sum to exactly `net`.
    pub fn split(&self, net: u128) -> Result<Vec<(Address, u128)>, PathError> {
        let mut credits = Vec::with_capacity(self.wallets.len());
        let mut assigned: u128 = 0;
        for (wallet, share) in self.wallets.iter().zip(&self.shares) {
            let amount = net
                .checked_mul(u128::from(*share))
                .ok_or(PathError::ArithmeticOverflow)?
                / u128::from(BASE);
            assigned += amount;
            credits.push((*wallet, amount));
        }

        let dust = net - assigned;
        if let Some(last) = credits.last_mut() {
            last.1 += dust;
        }
        Ok(credits)
    }
}

/// The ordered tier list of a revenue path.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct TierRegistry {
    tiers: Vec<Tier>,
}

impl TierRegistry {
    /// Build the initial tier list from parallel wallet and share lists.
    ///
    /// # Errors
    ///
    /// - [`ValidationError::NoTiers`] if no tiers are given
    /// - any error from [`validate_lists`]
    pub fn from_lists(
        wallet_lists: Vec<Vec<Address>>,
        share_lists: Vec<Vec<u64>>,
    ) -> Result<Self, ValidationError> {
        if wallet_lists.is_empty() && share_lists.is_empty() {
            return Err(ValidationError::NoTiers);
        }
        let tiers = validate_lists(0, wallet_lists, share_lists)?;
        Ok(Self { tiers })
    }

    /// Number of tiers.
    pub fn len(&self) -> usize {
        self.tiers.len()
    }

    /// Always false: a registry holds at least one tier.
    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }

    /// Index of the final (unlimited) tier.
    pub fn final_index(&self) -> usize {
        self.tiers.len() - 1
    }

    pub fn is_final(&self, index: usize) -> bool {
        index + 1 >= self.tiers.len()
    }

    pub fn get(&self, index: usize) -> Option<&Tier> {
        self.tiers.get(index)
    }

    /// Like [`get`](Self::get) but reports an out-of-range index as an error.
    pub fn tier(&self, index: usize) -> Result<&Tier, ValidationError> {
        self.tiers.get(index).ok_or(ValidationError::TierOutOfRange {
            index,
            tiers: self.tiers.len(),
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Tier> {
        self.tiers.iter()
    }

    /// Append validated tiers at the end. Returns the range of new indices.
    ///
    /// Nothing is appended if any tier fails validation.
    pub fn append(
        &mut self,
        wallet_lists: Vec<Vec<Address>>,
        share_lists: Vec<Vec<u64>>,
    ) -> Result<Range<usize>, ValidationError> {
        let start = self.tiers.len();
        let new_tiers = validate_lists(start, wallet_lists, share_lists)?;
        self.tiers.extend(new_tiers);
        Ok(start..self.tiers.len())
    }

    /// Overwrite the tiers at `indices` in place.
    ///
    /// Every replacement is validated before any is written.
    pub fn replace(
        &mut self,
        wallet_lists: Vec<Vec<Address>>,
        share_lists: Vec<Vec<u64>>,
        indices: &[usize],
    ) -> Result<(), ValidationError> {
        if wallet_lists.len() != indices.len() {
            return Err(ValidationError::UpdateIndexMismatch {
                lists: wallet_lists.len(),
                indices: indices.len(),
            });
        }
        if wallet_lists.len() != share_lists.len() {
            return Err(ValidationError::TierListMismatch {
                wallet_lists: wallet_lists.len(),
                share_lists: share_lists.len(),
            });
        }

        let mut seen = HashSet::with_capacity(indices.len());
        let mut replacements = Vec::with_capacity(indices.len());
        for ((wallets, shares), &index) in wallet_lists.into_iter().zip(share_lists).zip(indices) {
            if index >= self.tiers.len() {
                return Err(ValidationError::TierOutOfRange {
                    index,
                    tiers: self.tiers.len(),
                });
            }
            if !seen.insert(index) {
                return Err(ValidationError::DuplicateTierIndex(index));
            }
            replacements.push((index, Tier::new(index, wallets, shares)?));
        }

        for (index, tier) in replacements {
            self.tiers[index] = tier;
        }
        Ok(())
    }
}

/// Validate parallel wallet/share lists into tiers numbered from `first_index`.
pub fn validate_lists(
    first_index: usize,
    wallet_lists: Vec<Vec<Address>>,
    share_lists: Vec<Vec<u64>>,
) -> Result<Vec<Tier>, ValidationError> {
    if wallet_lists.len() != share_lists.len() {
        return Err(ValidationError::TierListMismatch {
            wallet_lists: wallet_lists.len(),
            share_lists: share_lists.len(),
        });
    }
    wallet_lists
        .into_iter()
        .zip(share_lists)
        .enumerate()
        .map(|(i, (wallets, shares))| Tier::new(first_index + i, wallets, shares))
        .collect()
}
