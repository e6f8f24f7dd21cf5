//! Account and currency identifiers.
//!
//! An [`Address`] is a 20-byte account identifier written as `0x`-prefixed
//! lowercase hex. A [`Currency`] is either the native currency or a fungible
//! token identified by its contract address.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::ADDRESS_LEN;
use crate::error::AddressError;

/// A 20-byte account identifier.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[serde(try_from = "String", into = "String")]
pub struct Address(pub [u8; ADDRESS_LEN]);

impl Address {
    /// The zero address. Never a valid beneficiary, owner or platform wallet.
    pub const ZERO: Self = Self([0u8; ADDRESS_LEN]);

    /// Create an address from raw bytes.
    pub fn from_bytes(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }

    /// Take the first 20 bytes of a 32-byte digest.
    pub fn from_digest(digest: &[u8; 32]) -> Self {
        let mut bytes = [0u8; ADDRESS_LEN];
        bytes.copy_from_slice(&digest[..ADDRESS_LEN]);
        Self(bytes)
    }

    /// Return the underlying bytes.
    pub fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }

    /// Check if this is the zero address.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; ADDRESS_LEN]
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .ok_or(AddressError::MissingPrefix)?;
        let raw = hex::decode(digits).map_err(|e| AddressError::InvalidHex(e.to_string()))?;
        let bytes: [u8; ADDRESS_LEN] = raw
            .try_into()
            .map_err(|v: Vec<u8>| AddressError::InvalidLength(v.len()))?;
        Ok(Self(bytes))
    }
}

impl TryFrom<String> for Address {
    type Error = AddressError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.to_string()
    }
}

impl From<[u8; ADDRESS_LEN]> for Address {
    fn from(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }
}

/// A currency a revenue path can hold and distribute.
///
/// The ledger and waterfall logic are currency-agnostic; the only
/// difference between variants is how the external ledger reads balances
/// and moves funds.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(try_from = "String", into = "String")]
pub enum Currency {
    /// The chain's native currency.
    Native,
    /// A fungible token, identified by its contract address.
    Token(Address),
}

impl Currency {
    /// Build a currency from an address, treating the zero address as native.
    ///
    /// # Examples
    ///
    /// ```
    /// use reveel_core::{Address, Currency};
    /// assert_eq!(Currency::from_address(Address::ZERO), Currency::Native);
    /// ```
    pub fn from_address(address: Address) -> Self {
        if address.is_zero() {
            Self::Native
        } else {
            Self::Token(address)
        }
    }

    /// The address form of this currency (zero for native).
    pub fn address(&self) -> Address {
        match self {
            Self::Native => Address::ZERO,
            Self::Token(address) => *address,
        }
    }

    pub fn is_native(&self) -> bool {
        matches!(self, Self::Native)
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Native => f.write_str("native"),
            Self::Token(address) => address.fmt(f),
        }
    }
}

impl FromStr for Currency {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("native") {
            return Ok(Self::Native);
        }
        Ok(Self::from_address(s.parse()?))
    }
}

impl TryFrom<String> for Currency {
    type Error = AddressError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Currency> for String {
    fn from(currency: Currency) -> Self {
        currency.to_string()
    }
}
