//! # gatekeep_core
//!
//! Core domain logic for Gatekeep: signed session tokens, the session
//! lifecycle, and OAuth identity federation.

pub mod auth;
pub mod migrate;
pub mod models;
pub mod store;
pub mod uuid;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
pub(crate) mod testutil;
