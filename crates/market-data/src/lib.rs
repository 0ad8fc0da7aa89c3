//! # Meridian Market Data
//!
//! The synthetic quote feed: a seedable per-symbol random walk that emits
//! timestamped bid/ask/last/volume snapshots. The engine consumes these
//! snapshots without knowing (or caring) that they are synthetic; a live
//! feed producing the same `QuoteSnapshot` shape could be swapped in by the
//! driver.

// Declare the modules that make up this crate.
pub mod error;
pub mod generator;

// Re-export the core types to provide a clean public API.
pub use error::MarketDataError;
pub use generator::QuoteGenerator;
