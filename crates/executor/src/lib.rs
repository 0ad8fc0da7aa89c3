//! # Meridian Executor Crate
//!
//! This crate provides the core components for trade execution and portfolio
//! state management: a `FillResolver` that decides whether and at what price an
//! order can execute against a quote, and a `Portfolio` that applies the
//! resulting trades to cash, positions and realized P&L.
//!
//! ## Architectural Principles
//!
//! - **State vs. Logic Decoupling:** The `FillResolver` is a pure calculator
//!   that determines the effects of a trade (execution price, commission)
//!   without mutating state. The `Portfolio` struct is the state machine that
//!   applies the results of an execution to the account balance and positions.
//!   This separation is key for testability and clarity.
//! - **Soft no-fill outcomes:** "cannot fill this cycle" (missing quote side,
//!   non-marketable limit) is encoded as `None`, never as an error. Orders
//!   simply wait for the next snapshot.
//!
//! ## Public API
//!
//! - `FillResolver`: execution price and commission arithmetic.
//! - `Portfolio`: the in-memory ledger for the simulated account.

// Declare the modules that constitute this crate.
pub mod portfolio;
pub mod resolver;

// Re-export the key components to provide a clean, public-facing API.
pub use portfolio::Portfolio;
pub use resolver::FillResolver;
