//! Paddock Engine library.
//!
//! Fetches race cards from a roster of source-specific adapters, dedupes and
//! canonicalizes the result, runs pluggable qualification analyzers over it,
//! and later audits stored predictions against finished-race results.

pub mod adapters;
pub mod analyzers;
pub mod api;
pub mod auditor;
pub mod config;
pub mod dedupe;
pub mod domain;
pub mod engine;
pub mod error;
pub mod fetch;
pub mod middleware;
pub mod overrides;
pub mod resilience;
