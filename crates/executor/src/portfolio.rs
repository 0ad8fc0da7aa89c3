use core_types::{OrderSide, Position, Quote, Trade};
use rust_decimal::Decimal;
use std::collections::HashMap;

/// The ledger of the simulated account: cash, positions and mark prices.
///
/// Its sole responsibility is to accurately reflect account state as trades
/// are applied. It performs no matching and no affordability checks; those
/// belong to the execution engine, which is this struct's single writer.
#[derive(Debug, Clone)]
pub struct Portfolio {
    cash: Decimal,
    initial_cash: Decimal,
    positions: HashMap<String, Position>,
    /// Latest known mark price per symbol. Symbols absent from a quote
    /// snapshot keep their previous mark, so equity carries stale positions
    /// forward instead of valuing them at zero.
    marks: HashMap<String, Decimal>,
}

impl Portfolio {
    /// Creates a new `Portfolio` with a given amount of starting capital.
    pub fn new(initial_cash: Decimal) -> Self {
        Self {
            cash: initial_cash,
            initial_cash,
            positions: HashMap::new(),
            marks: HashMap::new(),
        }
    }

    pub fn cash(&self) -> Decimal {
        self.cash
    }

    pub fn initial_cash(&self) -> Decimal {
        self.initial_cash
    }

    /// Applies one trade to cash and to the position for its symbol.
    ///
    /// Buys debit `price * quantity + commission`; sells credit
    /// `price * quantity - commission`. The position update follows the
    /// signed net-position rule: increases accumulate cost basis at the
    /// fill-weighted average, reductions realize P&L against the average
    /// cost, and a reversal closes the old position before opening the
    /// remainder on the other side at the trade price.
    pub fn apply_trade(&mut self, trade: &Trade) {
        assert!(
            trade.quantity > Decimal::ZERO && trade.price > Decimal::ZERO,
            "malformed trade {} applied to ledger",
            trade.trade_id
        );

        let gross = trade.price * trade.quantity;
        match trade.side {
            OrderSide::Buy => self.cash -= gross + trade.commission,
            OrderSide::Sell => self.cash += gross - trade.commission,
        }

        let position = self
            .positions
            .entry(trade.symbol.clone())
            .or_insert_with(|| Position::new(trade.symbol.clone(), trade.timestamp));
        apply_to_position(position, trade);

        // A freshly opened symbol may not have been marked yet; seed the mark
        // with the execution price until the next snapshot refreshes it.
        self.marks
            .entry(trade.symbol.clone())
            .or_insert(trade.price);

        tracing::debug!(
            symbol = %trade.symbol,
            side = ?trade.side,
            quantity = %trade.quantity,
            price = %trade.price,
            cash = %self.cash,
            "ledger updated"
        );
    }

    /// Refreshes the mark price for `symbol` from a quote.
    ///
    /// Quotes without a usable mark (no last price and a one-sided book)
    /// leave the previous mark in place.
    pub fn observe_quote(&mut self, symbol: &str, quote: &Quote) {
        if let Some(mark) = quote.mark_price() {
            self.marks.insert(symbol.to_string(), mark);
        }
    }

    /// Latest known mark price for `symbol`.
    pub fn mark(&self, symbol: &str) -> Option<Decimal> {
        self.marks.get(symbol).copied()
    }

    /// Total account equity: cash plus the mark-to-market value of every
    /// open position.
    pub fn equity(&self) -> Decimal {
        let positions_value: Decimal = self
            .positions
            .values()
            .filter(|p| !p.is_flat())
            .map(|p| {
                // Every position acquires a mark when its first trade is
                // applied; the average-cost fallback keeps this accessor
                // total even if that assumption is ever broken.
                let mark = self
                    .marks
                    .get(&p.symbol)
                    .copied()
                    .unwrap_or(p.average_price);
                p.quantity * mark
            })
            .sum();

        self.cash + positions_value
    }

    /// Return since inception: `(equity - initial_cash) / initial_cash`.
    pub fn total_return(&self) -> Decimal {
        if self.initial_cash.is_zero() {
            return Decimal::ZERO;
        }
        (self.equity() - self.initial_cash) / self.initial_cash
    }

    /// Cumulative realized P&L across all symbols.
    pub fn realized_pnl(&self) -> Decimal {
        self.positions.values().map(|p| p.realized_pnl).sum()
    }

    /// A snapshot of a single position, if the symbol has ever traded.
    pub fn position(&self, symbol: &str) -> Option<&Position> {
        self.positions.get(symbol)
    }

    /// All positions with a non-zero quantity.
    pub fn open_positions(&self) -> Vec<&Position> {
        self.positions.values().filter(|p| !p.is_flat()).collect()
    }
}

/// The signed net-position update rule, applied once per trade.
fn apply_to_position(position: &mut Position, trade: &Trade) {
    let delta = match trade.side {
        OrderSide::Buy => trade.quantity,
        OrderSide::Sell => -trade.quantity,
    };
    let quantity_before = position.quantity;
    let quantity_after = quantity_before + delta;

    if quantity_before.is_zero()
        || quantity_before.is_sign_positive() == delta.is_sign_positive()
    {
        // Opening or increasing exposure in the same direction: no P&L is
        // realized, the cost basis absorbs the new notional.
        position.cost_basis += trade.price * trade.quantity;
        position.quantity = quantity_after;
        position.average_price = position.cost_basis / quantity_after.abs();
    } else {
        // The trade works against the position: realize P&L on the portion
        // that closes, measured against the average cost. `direction` turns
        // (price - avg) into a gain for longs and a loss for shorts.
        let direction = if quantity_before.is_sign_positive() {
            Decimal::ONE
        } else {
            Decimal::NEGATIVE_ONE
        };
        let closed = quantity_before.abs().min(trade.quantity);
        position.realized_pnl += (trade.price - position.average_price) * closed * direction;

        if quantity_after.is_zero() {
            // Flattened exactly: the average is meaningless for an empty
            // position and must not leak into a later re-open.
            position.average_price = Decimal::ZERO;
            position.cost_basis = Decimal::ZERO;
        } else if quantity_after.is_sign_positive() == quantity_before.is_sign_positive() {
            // Reduced without crossing zero: the average is unchanged, the
            // cost basis scales down to the remaining quantity.
            position.cost_basis = position.average_price * quantity_after.abs();
        } else {
            // Reversal: the excess opens a new position on the other side
            // at the trade price.
            position.average_price = trade.price;
            position.cost_basis = trade.price * quantity_after.abs();
        }
        position.quantity = quantity_after;
    }

    position.last_updated = trade.timestamp;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn trade(side: OrderSide, quantity: Decimal, price: Decimal, commission: Decimal) -> Trade {
        Trade {
            trade_id: Uuid::new_v4(),
            order_id: Uuid::new_v4(),
            symbol: "AAPL".to_string(),
            side,
            quantity,
            price,
            commission,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn accumulation_produces_the_weighted_average_cost() {
        let mut portfolio = Portfolio::new(dec!(100000));
        portfolio.apply_trade(&trade(OrderSide::Buy, dec!(10), dec!(100), dec!(0)));
        portfolio.apply_trade(&trade(OrderSide::Buy, dec!(30), dec!(110), dec!(0)));

        let position = portfolio.position("AAPL").unwrap();
        assert_eq!(position.quantity, dec!(40));
        // (10 * 100 + 30 * 110) / 40 = 107.5
        assert_eq!(position.average_price, dec!(107.5));
        assert_eq!(position.cost_basis, dec!(4300));
        assert_eq!(position.realized_pnl, dec!(0));
    }

    #[test]
    fn accumulation_is_independent_of_fill_slicing() {
        let mut in_one = Portfolio::new(dec!(100000));
        in_one.apply_trade(&trade(OrderSide::Buy, dec!(40), dec!(100), dec!(0)));

        let mut in_four = Portfolio::new(dec!(100000));
        for _ in 0..4 {
            in_four.apply_trade(&trade(OrderSide::Buy, dec!(10), dec!(100), dec!(0)));
        }

        let a = in_one.position("AAPL").unwrap();
        let b = in_four.position("AAPL").unwrap();
        assert_eq!(a.quantity, b.quantity);
        assert_eq!(a.average_price, b.average_price);
        assert_eq!(a.cost_basis, b.cost_basis);
        assert_eq!(in_one.cash(), in_four.cash());
    }

    #[test]
    fn full_round_trip_realizes_the_price_difference() {
        let mut portfolio = Portfolio::new(dec!(100000));
        portfolio.apply_trade(&trade(OrderSide::Buy, dec!(20), dec!(100), dec!(0)));
        portfolio.apply_trade(&trade(OrderSide::Sell, dec!(20), dec!(104), dec!(0)));

        let position = portfolio.position("AAPL").unwrap();
        assert!(position.is_flat());
        assert_eq!(position.realized_pnl, dec!(80));
        assert_eq!(position.average_price, dec!(0));
        assert_eq!(position.cost_basis, dec!(0));
        assert_eq!(portfolio.cash(), dec!(100080));
    }

    #[test]
    fn partial_reduction_keeps_the_average_and_scales_the_basis() {
        let mut portfolio = Portfolio::new(dec!(100000));
        portfolio.apply_trade(&trade(OrderSide::Buy, dec!(10), dec!(100), dec!(0)));
        portfolio.apply_trade(&trade(OrderSide::Sell, dec!(4), dec!(110), dec!(0)));

        let position = portfolio.position("AAPL").unwrap();
        assert_eq!(position.quantity, dec!(6));
        assert_eq!(position.average_price, dec!(100));
        assert_eq!(position.cost_basis, dec!(600));
        assert_eq!(position.realized_pnl, dec!(40));
    }

    #[test]
    fn long_to_short_reversal_splits_close_and_open() {
        let mut portfolio = Portfolio::new(dec!(100000));
        portfolio.apply_trade(&trade(OrderSide::Buy, dec!(10), dec!(100), dec!(0)));
        portfolio.apply_trade(&trade(OrderSide::Sell, dec!(15), dec!(110), dec!(0)));

        let position = portfolio.position("AAPL").unwrap();
        // 10 close at +10 each, 5 open short at 110.
        assert_eq!(position.quantity, dec!(-5));
        assert_eq!(position.realized_pnl, dec!(100));
        assert_eq!(position.average_price, dec!(110));
        assert_eq!(position.cost_basis, dec!(550));
    }

    #[test]
    fn short_side_mirror_of_the_reversal_rule() {
        let mut portfolio = Portfolio::new(dec!(100000));
        // Short 10 at 100.
        portfolio.apply_trade(&trade(OrderSide::Sell, dec!(10), dec!(100), dec!(0)));
        let position = portfolio.position("AAPL").unwrap();
        assert_eq!(position.quantity, dec!(-10));
        assert_eq!(position.average_price, dec!(100));

        // Cover 15 at 90: shorts gain when the price falls.
        portfolio.apply_trade(&trade(OrderSide::Buy, dec!(15), dec!(90), dec!(0)));
        let position = portfolio.position("AAPL").unwrap();
        assert_eq!(position.quantity, dec!(5));
        assert_eq!(position.realized_pnl, dec!(100));
        assert_eq!(position.average_price, dec!(90));
        assert_eq!(position.cost_basis, dec!(450));
    }

    #[test]
    fn deepening_a_short_accumulates_like_a_long() {
        let mut portfolio = Portfolio::new(dec!(100000));
        portfolio.apply_trade(&trade(OrderSide::Sell, dec!(10), dec!(100), dec!(0)));
        portfolio.apply_trade(&trade(OrderSide::Sell, dec!(10), dec!(110), dec!(0)));

        let position = portfolio.position("AAPL").unwrap();
        assert_eq!(position.quantity, dec!(-20));
        assert_eq!(position.average_price, dec!(105));
        assert_eq!(position.cost_basis, dec!(2100));
        assert_eq!(position.realized_pnl, dec!(0));
    }

    #[test]
    fn commissions_strictly_reduce_cash_on_a_flat_round_trip() {
        let mut portfolio = Portfolio::new(dec!(10000));
        let fee = dec!(5);
        portfolio.apply_trade(&trade(OrderSide::Buy, dec!(10), dec!(100), fee));
        portfolio.apply_trade(&trade(OrderSide::Sell, dec!(10), dec!(100), fee));

        assert!(portfolio.position("AAPL").unwrap().is_flat());
        assert_eq!(portfolio.cash(), dec!(10000) - fee - fee);
    }

    #[test]
    fn equity_marks_positions_and_carries_stale_symbols_forward() {
        let mut portfolio = Portfolio::new(dec!(10000));
        portfolio.apply_trade(&trade(OrderSide::Buy, dec!(10), dec!(100), dec!(0)));
        assert_eq!(portfolio.cash(), dec!(9000));

        // First snapshot marks the symbol at its mid of 105.
        let quote = Quote::new(dec!(104), dec!(106), Utc::now());
        portfolio.observe_quote("AAPL", &quote);
        assert_eq!(portfolio.equity(), dec!(9000) + dec!(10) * dec!(105));

        // A markless quote (no last, one-sided book) leaves the mark untouched.
        let empty = Quote {
            bid: None,
            ask: None,
            last: None,
            bid_volume: None,
            ask_volume: None,
            volume: None,
            timestamp: Utc::now(),
        };
        portfolio.observe_quote("AAPL", &empty);
        assert_eq!(portfolio.mark("AAPL"), Some(dec!(105)));
        assert_eq!(portfolio.equity(), dec!(9000) + dec!(1050));
    }

    #[test]
    fn total_return_tracks_equity_against_initial_cash() {
        let mut portfolio = Portfolio::new(dec!(10000));
        portfolio.apply_trade(&trade(OrderSide::Buy, dec!(10), dec!(100), dec!(0)));
        portfolio.apply_trade(&trade(OrderSide::Sell, dec!(10), dec!(150), dec!(0)));

        assert_eq!(portfolio.equity(), dec!(10500));
        assert_eq!(portfolio.total_return(), dec!(0.05));
    }
}
