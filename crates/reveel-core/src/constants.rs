//! Protocol constants. Proportions and fees are integers over [`BASE`].

/// Denominator for tier shares and the platform fee.
///
/// Five decimal digits of percentage precision: one unit is 0.00001%.
///
/// # Examples
///
/// ```
/// use reveel_core::constants::BASE;
/// // 20% of a tier
/// assert_eq!(BASE / 5, 2_000_000);
/// ```
pub const BASE: u64 = 10_000_000;

/// Largest platform fee a registry accepts (100%).
pub const MAX_PLATFORM_FEE: u64 = BASE;

/// Platform fee used when a registry configuration omits one (1%).
pub const DEFAULT_PLATFORM_FEE: u64 = 100_000;

/// One whole unit of an 18-decimal currency, in base units.
pub const UNIT: u128 = 1_000_000_000_000_000_000;

/// Length of an [`Address`](crate::Address) in bytes.
pub const ADDRESS_LEN: usize = 20;
