//! # Meridian Analytics
//!
//! The performance-metrics collaborator. It consumes the outbound streams the
//! engine produces — trade events and equity points — and derives summary
//! statistics (returns, Sharpe, drawdown, win rate) without ever touching the
//! ledger itself.

// Declare the modules that make up this crate.
pub mod error;
pub mod monitor;
pub mod report;

// Re-export the core types to provide a clean public API.
pub use error::AnalyticsError;
pub use monitor::PerformanceMonitor;
pub use report::PerformanceReport;
