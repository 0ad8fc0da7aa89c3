use configuration::Simulation;
use core_types::{Order, OrderType, Quote};
use rust_decimal::Decimal;

/// Decides whether and at what price an order can execute against a quote.
///
/// The resolver is stateless: it holds only the simulation parameters and
/// never mutates the order or the account. Spread-crossing semantics are the
/// standard ones: market orders always cross the spread and pay a slippage
/// penalty; limit orders cross only when marketable and never execute at a
/// price worse than their limit.
pub struct FillResolver {
    params: Simulation,
}

impl FillResolver {
    pub fn new(params: Simulation) -> Self {
        Self { params }
    }

    /// Returns the execution price for `order` against `quote`, or `None`
    /// when no fill is possible this cycle.
    ///
    /// `None` covers two soft outcomes: the quote is missing a bid or ask,
    /// or a limit order is not marketable at the current spread. Neither is
    /// an error; the order simply waits.
    pub fn resolve(&self, order: &Order, quote: &Quote) -> Option<Decimal> {
        let (bid, ask) = match (quote.bid, quote.ask) {
            (Some(bid), Some(ask)) => (bid, ask),
            _ => {
                tracing::debug!(
                    symbol = %order.symbol,
                    "quote is one-sided, order {} waits this cycle",
                    order.order_id
                );
                return None;
            }
        };

        let slippage = self.params.slippage_rate;

        match order.order_type {
            OrderType::Market => {
                if order.is_buy() {
                    // Buy at the ask, slipping against us.
                    Some(ask * (Decimal::ONE + slippage))
                } else {
                    // Sell at the bid, slipping against us.
                    Some(bid * (Decimal::ONE - slippage))
                }
            }
            OrderType::Limit => {
                // Validated at construction: limit orders always carry a price.
                let limit = order.limit_price.expect("limit order without price");
                if order.is_buy() {
                    if limit >= ask {
                        // Marketable. Never pay worse than the limit, but keep
                        // any price improvement the spread offers.
                        Some(limit.min(ask * (Decimal::ONE + slippage)))
                    } else {
                        None
                    }
                } else if limit <= bid {
                    Some(limit.max(bid * (Decimal::ONE - slippage)))
                } else {
                    None
                }
            }
        }
    }

    /// Commission charged for executing `quantity` units at `price`.
    pub fn commission(&self, price: Decimal, quantity: Decimal) -> Decimal {
        price * quantity * self.params.commission_rate
    }

    /// The configured commission rate, needed by the engine's affordability clamp.
    pub fn commission_rate(&self) -> Decimal {
        self.params.commission_rate
    }
}
