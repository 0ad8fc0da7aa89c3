use crate::enums::{OrderSide, OrderStatus, OrderType};
use crate::error::CoreError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// A request to place an order, as issued by a strategy.
///
/// This is the inbound message shape: it carries no identifier and no fill
/// state. The engine turns it into a validated [`Order`] at placement time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub symbol: String,
    pub side: OrderSide,
    pub order_type: OrderType,
    pub quantity: Decimal,
    /// Required for limit orders, must be absent for market orders.
    pub limit_price: Option<Decimal>,
}

impl OrderRequest {
    /// Convenience constructor for a market order request.
    pub fn market(symbol: impl Into<String>, side: OrderSide, quantity: Decimal) -> Self {
        Self {
            symbol: symbol.into(),
            side,
            order_type: OrderType::Market,
            quantity,
            limit_price: None,
        }
    }

    /// Convenience constructor for a limit order request.
    pub fn limit(
        symbol: impl Into<String>,
        side: OrderSide,
        quantity: Decimal,
        limit_price: Decimal,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            side,
            order_type: OrderType::Limit,
            quantity,
            limit_price: Some(limit_price),
        }
    }
}

/// An order to buy or sell a quantity of one instrument.
///
/// Orders are created in `Pending` state and mutated only through
/// [`Order::record_fill`] and [`Order::cancel`], which enforce the forward-only
/// status transitions. The identifying fields never change after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: Uuid,
    pub symbol: String,
    pub side: OrderSide,
    pub order_type: OrderType,
    /// Requested quantity, strictly positive.
    pub quantity: Decimal,
    /// Limit price. Present exactly when `order_type` is `Limit`.
    pub limit_price: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub status: OrderStatus,
    /// Cumulative filled quantity, never exceeding `quantity`.
    pub filled_quantity: Decimal,
    /// Fill-quantity-weighted average execution price, `None` until the first fill.
    pub avg_fill_price: Option<Decimal>,
}

impl Order {
    /// Constructs a validated order from a placement request.
    ///
    /// Returns `CoreError::Validation` for a non-positive quantity, a limit
    /// order without a (positive) price, or a market order carrying one.
    pub fn new(request: OrderRequest, timestamp: DateTime<Utc>) -> Result<Self, CoreError> {
        if request.quantity <= Decimal::ZERO {
            return Err(CoreError::Validation(format!(
                "order quantity must be positive, got {}",
                request.quantity
            )));
        }

        match (request.order_type, request.limit_price) {
            (OrderType::Limit, None) => {
                return Err(CoreError::Validation(
                    "limit orders must have a limit price".to_string(),
                ));
            }
            (OrderType::Limit, Some(price)) if price <= Decimal::ZERO => {
                return Err(CoreError::Validation(format!(
                    "limit price must be positive, got {price}"
                )));
            }
            (OrderType::Market, Some(_)) => {
                return Err(CoreError::Validation(
                    "market orders must not carry a limit price".to_string(),
                ));
            }
            _ => {}
        }

        Ok(Self {
            order_id: Uuid::new_v4(),
            symbol: request.symbol,
            side: request.side,
            order_type: request.order_type,
            quantity: request.quantity,
            limit_price: request.limit_price,
            created_at: timestamp,
            status: OrderStatus::Pending,
            filled_quantity: Decimal::ZERO,
            avg_fill_price: None,
        })
    }

    pub fn is_buy(&self) -> bool {
        self.side == OrderSide::Buy
    }

    pub fn is_sell(&self) -> bool {
        self.side == OrderSide::Sell
    }

    pub fn is_market(&self) -> bool {
        self.order_type == OrderType::Market
    }

    pub fn is_limit(&self) -> bool {
        self.order_type == OrderType::Limit
    }

    /// An order is active while it can still receive fills or be cancelled.
    pub fn is_active(&self) -> bool {
        matches!(
            self.status,
            OrderStatus::Pending | OrderStatus::PartiallyFilled
        )
    }

    /// Quantity still outstanding.
    pub fn remaining_quantity(&self) -> Decimal {
        self.quantity - self.filled_quantity
    }

    /// Records a (possibly partial) fill against this order.
    ///
    /// Updates the cumulative filled quantity, the fill-weighted average price
    /// and the status. Filling a terminal order is an
    /// `InvalidStateTransition`; over-filling past the requested quantity is a
    /// ledger-corrupting defect and panics rather than clamping.
    pub fn record_fill(&mut self, quantity: Decimal, price: Decimal) -> Result<(), CoreError> {
        if !self.is_active() {
            return Err(CoreError::InvalidStateTransition {
                from: self.status,
                action: "fill",
            });
        }

        let new_filled = self.filled_quantity + quantity;
        assert!(
            new_filled <= self.quantity,
            "fill of {} would overfill order {} ({} of {} already filled)",
            quantity,
            self.order_id,
            self.filled_quantity,
            self.quantity
        );

        self.avg_fill_price = Some(match self.avg_fill_price {
            None => price,
            Some(avg) => (avg * self.filled_quantity + price * quantity) / new_filled,
        });
        self.filled_quantity = new_filled;

        self.status = if self.filled_quantity == self.quantity {
            OrderStatus::Filled
        } else {
            OrderStatus::PartiallyFilled
        };

        Ok(())
    }

    /// Transitions an active order to `Cancelled`.
    pub fn cancel(&mut self) -> Result<(), CoreError> {
        if !self.is_active() {
            return Err(CoreError::InvalidStateTransition {
                from: self.status,
                action: "cancel",
            });
        }
        self.status = OrderStatus::Cancelled;
        Ok(())
    }
}

/// An immutable record of one execution event.
///
/// Every trade references exactly one order and contributes to that order's
/// cumulative filled quantity exactly once. Trades are created only by the
/// execution engine and retained in an append-only log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub trade_id: Uuid,
    pub order_id: Uuid,
    pub symbol: String,
    pub side: OrderSide,
    pub quantity: Decimal,
    pub price: Decimal,
    pub commission: Decimal,
    pub timestamp: DateTime<Utc>,
}

/// The net holding in one instrument.
///
/// `quantity` is signed: positive = long, negative = short, zero = flat.
/// `average_price` and `cost_basis` are meaningful only while the position is
/// open and are reset to zero whenever the quantity returns to zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub quantity: Decimal,
    pub average_price: Decimal,
    /// Total cost of the open quantity (= |quantity| x average_price).
    pub cost_basis: Decimal,
    /// Cumulative profit or loss locked in by reducing or reversing trades.
    pub realized_pnl: Decimal,
    pub last_updated: DateTime<Utc>,
}

impl Position {
    /// Creates a new, flat position for `symbol`.
    pub fn new(symbol: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            symbol: symbol.into(),
            quantity: Decimal::ZERO,
            average_price: Decimal::ZERO,
            cost_basis: Decimal::ZERO,
            realized_pnl: Decimal::ZERO,
            last_updated: timestamp,
        }
    }

    pub fn is_long(&self) -> bool {
        self.quantity > Decimal::ZERO
    }

    pub fn is_short(&self) -> bool {
        self.quantity < Decimal::ZERO
    }

    pub fn is_flat(&self) -> bool {
        self.quantity.is_zero()
    }
}

/// A point-in-time bid/ask reading for one instrument.
///
/// Bid and ask are optional: an external feed may deliver a one-sided or
/// price-only snapshot, and orders for such symbols simply wait for the next
/// complete quote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub bid: Option<Decimal>,
    pub ask: Option<Decimal>,
    /// Last traded price, when the feed provides one.
    pub last: Option<Decimal>,
    pub bid_volume: Option<u64>,
    pub ask_volume: Option<u64>,
    pub volume: Option<u64>,
    pub timestamp: DateTime<Utc>,
}

impl Quote {
    /// Creates a two-sided quote with no last-price or volume information.
    pub fn new(bid: Decimal, ask: Decimal, timestamp: DateTime<Utc>) -> Self {
        Self {
            bid: Some(bid),
            ask: Some(ask),
            last: None,
            bid_volume: None,
            ask_volume: None,
            volume: None,
            timestamp,
        }
    }

    /// Midpoint of the spread, when both sides are present.
    pub fn mid(&self) -> Option<Decimal> {
        match (self.bid, self.ask) {
            (Some(bid), Some(ask)) => Some((bid + ask) / Decimal::TWO),
            _ => None,
        }
    }

    /// The price used for mark-to-market valuation: the last traded price if
    /// the feed supplies one, otherwise the spread midpoint.
    pub fn mark_price(&self) -> Option<Decimal> {
        self.last.or_else(|| self.mid())
    }
}

/// A timestamped mapping from instrument symbol to its latest [`Quote`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteSnapshot {
    pub timestamp: DateTime<Utc>,
    quotes: HashMap<String, Quote>,
}

impl QuoteSnapshot {
    pub fn new(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            quotes: HashMap::new(),
        }
    }

    pub fn insert(&mut self, symbol: impl Into<String>, quote: Quote) {
        self.quotes.insert(symbol.into(), quote);
    }

    pub fn get(&self, symbol: &str) -> Option<&Quote> {
        self.quotes.get(symbol)
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.quotes.contains_key(symbol)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Quote)> {
        self.quotes.iter()
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }
}

/// A pull-based snapshot of the portfolio for display and reporting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSummary {
    pub cash: Decimal,
    pub equity: Decimal,
    pub initial_cash: Decimal,
    /// Return since inception: (equity - initial_cash) / initial_cash.
    pub total_return: Decimal,
    pub open_positions: usize,
    pub active_orders: usize,
    pub total_trades: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn ts() -> DateTime<Utc> {
        Utc::now()
    }

    #[test]
    fn market_order_construction_validates_quantity() {
        let err = Order::new(
            OrderRequest::market("AAPL", OrderSide::Buy, dec!(0)),
            ts(),
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));

        let order = Order::new(
            OrderRequest::market("AAPL", OrderSide::Buy, dec!(10)),
            ts(),
        )
        .unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
        assert!(order.is_active());
        assert_eq!(order.remaining_quantity(), dec!(10));
    }

    #[test]
    fn limit_order_requires_a_price() {
        let request = OrderRequest {
            symbol: "AAPL".to_string(),
            side: OrderSide::Sell,
            order_type: OrderType::Limit,
            quantity: dec!(5),
            limit_price: None,
        };
        assert!(matches!(
            Order::new(request, ts()),
            Err(CoreError::Validation(_))
        ));

        let order = Order::new(
            OrderRequest::limit("AAPL", OrderSide::Sell, dec!(5), dec!(101.5)),
            ts(),
        )
        .unwrap();
        assert!(order.is_limit());
        assert_eq!(order.limit_price, Some(dec!(101.5)));
    }

    #[test]
    fn market_order_rejects_stray_limit_price() {
        let request = OrderRequest {
            symbol: "AAPL".to_string(),
            side: OrderSide::Buy,
            order_type: OrderType::Market,
            quantity: dec!(5),
            limit_price: Some(dec!(100)),
        };
        assert!(matches!(
            Order::new(request, ts()),
            Err(CoreError::Validation(_))
        ));
    }

    #[test]
    fn partial_fill_then_full_fill_walks_the_state_machine() {
        let mut order = Order::new(
            OrderRequest::market("MSFT", OrderSide::Buy, dec!(10)),
            ts(),
        )
        .unwrap();

        order.record_fill(dec!(4), dec!(100)).unwrap();
        assert_eq!(order.status, OrderStatus::PartiallyFilled);
        assert_eq!(order.filled_quantity, dec!(4));
        assert_eq!(order.avg_fill_price, Some(dec!(100)));

        order.record_fill(dec!(6), dec!(110)).unwrap();
        assert_eq!(order.status, OrderStatus::Filled);
        assert_eq!(order.filled_quantity, dec!(10));
        // (4 * 100 + 6 * 110) / 10 = 106
        assert_eq!(order.avg_fill_price, Some(dec!(106)));
    }

    #[test]
    fn filling_a_terminal_order_is_rejected() {
        let mut order = Order::new(
            OrderRequest::market("MSFT", OrderSide::Sell, dec!(1)),
            ts(),
        )
        .unwrap();
        order.record_fill(dec!(1), dec!(50)).unwrap();
        assert_eq!(order.status, OrderStatus::Filled);

        assert!(matches!(
            order.record_fill(dec!(1), dec!(50)),
            Err(CoreError::InvalidStateTransition { .. })
        ));
    }

    #[test]
    fn cancel_is_only_legal_while_active() {
        let mut order = Order::new(
            OrderRequest::market("MSFT", OrderSide::Buy, dec!(2)),
            ts(),
        )
        .unwrap();
        order.cancel().unwrap();
        assert_eq!(order.status, OrderStatus::Cancelled);

        assert!(matches!(
            order.cancel(),
            Err(CoreError::InvalidStateTransition { .. })
        ));
    }

    #[test]
    #[should_panic(expected = "overfill")]
    fn overfilling_is_a_fatal_defect() {
        let mut order = Order::new(
            OrderRequest::market("MSFT", OrderSide::Buy, dec!(1)),
            ts(),
        )
        .unwrap();
        let _ = order.record_fill(dec!(2), dec!(50));
    }

    #[test]
    fn quote_mark_price_prefers_last_over_mid() {
        let mut quote = Quote::new(dec!(99), dec!(101), ts());
        assert_eq!(quote.mid(), Some(dec!(100)));
        assert_eq!(quote.mark_price(), Some(dec!(100)));

        quote.last = Some(dec!(100.5));
        assert_eq!(quote.mark_price(), Some(dec!(100.5)));

        quote.ask = None;
        quote.last = None;
        assert_eq!(quote.mark_price(), None);
    }
}
