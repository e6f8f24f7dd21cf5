//! Scenario and invariant test suite for Reveel revenue paths.
//!
//! Integration tests drive paths end to end through the registry and an
//! in-memory ledger, and check the waterfall invariants under randomized
//! deposits and mutations.

pub mod helpers;
