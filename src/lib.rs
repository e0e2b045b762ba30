//! Bisub - Subscription Link Harvester and Connectivity Checker
//!
//! Fetches proxy subscription documents, extracts and deduplicates the
//! configuration links they contain, and concurrently verifies which ones
//! point at a reachable TCP endpoint.

pub mod sub;

pub use sub::*;

/// Application result type
pub type Result<T> = anyhow::Result<T>;
