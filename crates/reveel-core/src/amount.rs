//! Amount parsing and JSON-safe serialization.
//!
//! Amounts are `u128` base units. They serialize as decimal strings so that
//! JSON consumers without 128-bit integers read them exactly, and
//! deserialize from either a string or a plain integer. Strings may use
//! `_` separators and an exact scientific suffix (`"0.8e18"`).
//!
//! Use with `#[serde(with = "reveel_core::amount")]`, or the [`vec`] and
//! [`nested`] submodules for lists.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serializer};

use crate::error::ValidationError;

/// Parse an amount written as an integer or exact scientific notation.
///
/// # Examples
///
/// ```
/// use reveel_core::amount::parse_amount;
/// assert_eq!(parse_amount("1_000").unwrap(), 1000);
/// assert_eq!(parse_amount("0.8e18").unwrap(), 800_000_000_000_000_000);
/// assert!(parse_amount("0.25e1").is_err()); // not a whole number
/// ```
pub fn parse_amount(text: &str) -> Result<u128, ValidationError> {
    let invalid = || ValidationError::InvalidAmount(text.to_string());
    let cleaned: String = text.trim().chars().filter(|c| *c != '_').collect();

    let (mantissa, exponent) = match cleaned.split_once(|c: char| c == 'e' || c == 'E') {
        Some((m, e)) => (m, e.parse::<u32>().map_err(|_| invalid())?),
        None => (cleaned.as_str(), 0),
    };
    let (whole, fraction) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    // Trailing zeros of the fraction carry no value: "0.80e1" is 8.
    let fraction = fraction.trim_end_matches('0');
    let fraction_len = u32::try_from(fraction.len()).map_err(|_| invalid())?;
    if fraction_len > exponent {
        return Err(invalid());
    }

    let digits = format!("{whole}{fraction}");
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    let scale = 10u128
        .checked_pow(exponent - fraction_len)
        .ok_or_else(invalid)?;
    digits
        .parse::<u128>()
        .ok()
        .and_then(|v| v.checked_mul(scale))
        .ok_or_else(invalid)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Repr {
    Text(String),
    Number(u64),
}

impl Repr {
    fn into_amount<E: de::Error>(self) -> Result<u128, E> {
        match self {
            Repr::Text(text) => parse_amount(&text).map_err(E::custom),
            Repr::Number(n) => Ok(u128::from(n)),
        }
    }
}

pub fn serialize<S: Serializer>(value: &u128, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
    Repr::deserialize(deserializer)?.into_amount()
}

/// `Vec<u128>` as a list of decimal strings.
pub mod vec {
    use super::*;
    use serde::ser::SerializeSeq;

    pub fn serialize<S: Serializer>(values: &[u128], serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(values.len()))?;
        for v in values {
            seq.serialize_element(&v.to_string())?;
        }
        seq.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u128>, D::Error> {
        Vec::<Repr>::deserialize(deserializer)?
            .into_iter()
            .map(Repr::into_amount)
            .collect()
    }
}

/// `Vec<Vec<u128>>`, used for per-currency limit sequences.
pub mod nested {
    use super::*;
    use serde::ser::SerializeSeq;

    pub fn serialize<S: Serializer>(values: &[Vec<u128>], serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(values.len()))?;
        for row in values {
            let row: Vec<String> = row.iter().map(u128::to_string).collect();
            seq.serialize_element(&row)?;
        }
        seq.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<Vec<u128>>, D::Error> {
        Vec::<Vec<Repr>>::deserialize(deserializer)?
            .into_iter()
            .map(|row| row.into_iter().map(Repr::into_amount).collect())
            .collect()
    }
}
