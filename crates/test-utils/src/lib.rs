//! Shared fixtures and proptest strategies for AgroTrace tests.
//!
//! - [`fixtures`] — a bootstrapped ledger with the standard cast of role
//!   holders, plus helpers that walk products through their lifecycle.
//! - [`strategies`] — proptest generators for domain values.

pub mod fixtures;
pub mod strategies;
