//! # reveel-core
//! Foundation types and traits for Reveel revenue paths.
//!
//! - [`address`]: `Address` and `Currency` identifiers
//! - [`amount`]: parsing and string serialization of `u128` amounts
//! - [`auth`]: `CallContext` capability passed to privileged operations
//! - [`constants`]: the `BASE` denominator and platform defaults
//! - [`error`]: error taxonomy shared by every crate in the workspace
//! - [`ledger`]: `MemoryLedger`, an in-memory currency ledger
//! - [`traits`]: `CurrencyLedger` and `PlatformDirectory` seams

pub mod address;
pub mod amount;
pub mod auth;
pub mod constants;
pub mod error;
pub mod ledger;
pub mod traits;

pub use address::{Address, Currency};
pub use auth::CallContext;
pub use error::ReveelError;
pub use ledger::MemoryLedger;
pub use traits::{CurrencyLedger, PlatformDirectory, StaticPlatform};
