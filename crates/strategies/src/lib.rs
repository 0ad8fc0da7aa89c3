//! # Meridian Strategy Library
//!
//! This crate contains the decision agents of the simulator. It defines a
//! universal `Strategy` trait and provides several concrete implementations.
//!
//! ## Architectural Principles
//!
//! - **Pure logic crate:** strategies consume quote snapshots and the current
//!   position state, and emit `OrderRequest`s. They never touch the engine or
//!   the ledger directly, so the driver can run any strategy without knowing
//!   its internals.
//! - **Local bookkeeping:** each strategy tracks the symbols it has
//!   outstanding requests for and clears them when the corresponding trade
//!   event arrives, so it does not re-issue the same order every tick while a
//!   fill is pending.
//! - **Extensibility:** adding a strategy means a new module implementing
//!   `Strategy`, a `StrategyId` variant and a `factory` arm.

// Declare all the modules that constitute this crate.
pub mod bollinger_bands;
pub mod error;
pub mod factory;
pub mod mean_reversion;
pub mod momentum;

// Re-export the key components to create a clean, public-facing API.
pub use bollinger_bands::BollingerBands;
pub use error::StrategyError;
pub use factory::{create_strategy, StrategyId};
pub use mean_reversion::MeanReversion;
pub use momentum::Momentum;

use core_types::{OrderRequest, Position, QuoteSnapshot, Trade};
use rust_decimal::Decimal;

/// The core trait that all trading strategies must implement.
///
/// The `&mut self` in `evaluate` is crucial, as strategies maintain internal
/// state (indicator windows, previous signals, pending requests). The
/// `Send + Sync` bounds allow strategies to be handed across threads by the
/// driver.
pub trait Strategy: Send + Sync {
    /// A short human-readable name for logs and the end-of-run summary.
    fn name(&self) -> &str;

    /// Evaluates one quote snapshot against the current open positions and
    /// returns the order requests the strategy wants placed this cycle.
    fn evaluate(
        &mut self,
        snapshot: &QuoteSnapshot,
        positions: &[&Position],
    ) -> Result<Vec<OrderRequest>, StrategyError>;

    /// Called for every trade generated by the engine, letting the strategy
    /// clear its local bookkeeping of outstanding requests.
    fn on_trade(&mut self, _trade: &Trade) {}
}

/// Signed net quantity held in `symbol`, zero when the symbol is flat or
/// unknown.
pub fn net_quantity(positions: &[&Position], symbol: &str) -> Decimal {
    positions
        .iter()
        .find(|p| p.symbol == symbol)
        .map(|p| p.quantity)
        .unwrap_or(Decimal::ZERO)
}
