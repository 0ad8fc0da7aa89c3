use crate::error::StrategyError;
use crate::{net_quantity, Strategy};
use configuration::MomentumParams;
use core_types::{OrderRequest, OrderSide, Position, QuoteSnapshot, Trade};
use rust_decimal::prelude::*;
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use ta::indicators::SimpleMovingAverage as Sma;
use ta::Next;

struct SymbolState {
    short_ma: Sma,
    long_ma: Sma,
    samples: usize,
    // -1 bearish, 0 neutral, +1 bullish; orders fire only on a change.
    previous_signal: i8,
}

/// Dual moving average momentum strategy.
///
/// Goes long when the short MA crosses above the long MA and short on the
/// opposite cross, reversing any existing position to the configured size.
/// Open positions are guarded by stop-loss and take-profit exits evaluated
/// before new signals.
pub struct Momentum {
    params: MomentumParams,
    symbols: Vec<String>,
    states: HashMap<String, SymbolState>,
    entry_prices: HashMap<String, Decimal>,
    /// Symbols with an outstanding request; cleared by `on_trade`.
    pending: HashSet<String>,
}

impl Momentum {
    pub fn new(params: MomentumParams, symbols: Vec<String>) -> Result<Self, StrategyError> {
        if params.short_window >= params.long_window {
            return Err(StrategyError::InvalidParameters(
                "short window must be less than long window".to_string(),
            ));
        }
        if params.max_position <= Decimal::ZERO {
            return Err(StrategyError::InvalidParameters(
                "max_position must be positive".to_string(),
            ));
        }

        let short_ma = Sma::new(params.short_window)
            .map_err(|e| StrategyError::InvalidParameters(e.to_string()))?;
        let long_ma = Sma::new(params.long_window)
            .map_err(|e| StrategyError::InvalidParameters(e.to_string()))?;

        let states = symbols
            .iter()
            .map(|symbol| {
                (
                    symbol.clone(),
                    SymbolState {
                        short_ma: short_ma.clone(),
                        long_ma: long_ma.clone(),
                        samples: 0,
                        previous_signal: 0,
                    },
                )
            })
            .collect();

        Ok(Self {
            params,
            symbols,
            states,
            entry_prices: HashMap::new(),
            pending: HashSet::new(),
        })
    }
}

impl Strategy for Momentum {
    fn name(&self) -> &str {
        "momentum"
    }

    fn evaluate(
        &mut self,
        snapshot: &QuoteSnapshot,
        positions: &[&Position],
    ) -> Result<Vec<OrderRequest>, StrategyError> {
        let mut requests = Vec::new();

        for symbol in &self.symbols {
            let Some(quote) = snapshot.get(symbol) else {
                continue;
            };
            let Some(mark) = quote.mark_price() else {
                continue;
            };
            // The `ta` crate operates on f64; convert at the boundary.
            let Some(price) = mark.to_f64() else {
                continue;
            };

            let Some(state) = self.states.get_mut(symbol) else {
                continue;
            };
            let short = state.short_ma.next(price);
            let long = state.long_ma.next(price);
            state.samples += 1;
            if state.samples < self.params.long_window {
                continue;
            }

            let held = net_quantity(positions, symbol);
            if held.is_zero() {
                self.entry_prices.remove(symbol);
            }
            if self.pending.contains(symbol) {
                continue;
            }

            // Protective exits come before any fresh signal.
            if !held.is_zero() {
                if let Some(&entry) = self.entry_prices.get(symbol) {
                    let exit = if held > Decimal::ZERO {
                        if mark <= entry * (Decimal::ONE - self.params.stop_loss_pct) {
                            tracing::info!(%symbol, %mark, %entry, "momentum: stop loss on long");
                            Some(OrderSide::Sell)
                        } else if mark >= entry * (Decimal::ONE + self.params.take_profit_pct) {
                            tracing::info!(%symbol, %mark, %entry, "momentum: take profit on long");
                            Some(OrderSide::Sell)
                        } else {
                            None
                        }
                    } else if mark >= entry * (Decimal::ONE + self.params.stop_loss_pct) {
                        tracing::info!(%symbol, %mark, %entry, "momentum: stop loss on short");
                        Some(OrderSide::Buy)
                    } else if mark <= entry * (Decimal::ONE - self.params.take_profit_pct) {
                        tracing::info!(%symbol, %mark, %entry, "momentum: take profit on short");
                        Some(OrderSide::Buy)
                    } else {
                        None
                    };

                    if let Some(side) = exit {
                        requests.push(OrderRequest::market(symbol.clone(), side, held.abs()));
                        self.pending.insert(symbol.clone());
                        continue;
                    }
                }
            }

            let signal = if short > long {
                1
            } else if short < long {
                -1
            } else {
                0
            };

            if signal != state.previous_signal {
                if signal == 1 && held <= Decimal::ZERO {
                    // Cover any short and establish the full long.
                    let quantity = held.abs() + self.params.max_position;
                    tracing::info!(%symbol, %quantity, "momentum: bullish crossover");
                    requests.push(OrderRequest::market(
                        symbol.clone(),
                        OrderSide::Buy,
                        quantity,
                    ));
                    self.pending.insert(symbol.clone());
                } else if signal == -1 && held >= Decimal::ZERO {
                    let quantity = held + self.params.max_position;
                    tracing::info!(%symbol, %quantity, "momentum: bearish crossover");
                    requests.push(OrderRequest::market(
                        symbol.clone(),
                        OrderSide::Sell,
                        quantity,
                    ));
                    self.pending.insert(symbol.clone());
                }
            }
            state.previous_signal = signal;
        }

        Ok(requests)
    }

    fn on_trade(&mut self, trade: &Trade) {
        self.pending.remove(&trade.symbol);
        self.entry_prices.insert(trade.symbol.clone(), trade.price);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use core_types::{OrderType, Quote, QuoteSnapshot};
    use rust_decimal_macros::dec;

    fn params() -> MomentumParams {
        MomentumParams {
            short_window: 2,
            long_window: 3,
            max_position: dec!(100),
            stop_loss_pct: dec!(0.02),
            take_profit_pct: dec!(0.05),
        }
    }

    fn snapshot(price: Decimal) -> QuoteSnapshot {
        let mut snapshot = QuoteSnapshot::new(Utc::now());
        snapshot.insert(
            "AAPL",
            Quote::new(price - dec!(0.01), price + dec!(0.01), snapshot.timestamp),
        );
        snapshot
    }

    #[test]
    fn rejects_inverted_windows() {
        let mut bad = params();
        bad.short_window = 5;
        assert!(Momentum::new(bad, vec!["AAPL".to_string()]).is_err());
    }

    #[test]
    fn bullish_crossover_emits_a_market_buy_once() {
        let mut strategy = Momentum::new(params(), vec!["AAPL".to_string()]).unwrap();

        // Warm-up: flat prices produce no signal.
        for _ in 0..3 {
            let requests = strategy.evaluate(&snapshot(dec!(100)), &[]).unwrap();
            assert!(requests.is_empty());
        }

        // An up-move flips the short MA above the long MA.
        let requests = strategy.evaluate(&snapshot(dec!(110)), &[]).unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].side, OrderSide::Buy);
        assert_eq!(requests[0].order_type, OrderType::Market);
        assert_eq!(requests[0].quantity, dec!(100));

        // The request is pending; the same signal does not re-fire.
        let requests = strategy.evaluate(&snapshot(dec!(111)), &[]).unwrap();
        assert!(requests.is_empty());
    }

    #[test]
    fn stop_loss_closes_a_stopped_out_short() {
        let mut strategy = Momentum::new(params(), vec!["AAPL".to_string()]).unwrap();

        // A declining tape produces a bearish signal from flat.
        strategy.evaluate(&snapshot(dec!(100)), &[]).unwrap();
        strategy.evaluate(&snapshot(dec!(100)), &[]).unwrap();
        let requests = strategy.evaluate(&snapshot(dec!(99)), &[]).unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].side, OrderSide::Sell);

        // The engine fills the short at 99.
        strategy.on_trade(&Trade {
            trade_id: uuid::Uuid::nil(),
            order_id: uuid::Uuid::nil(),
            symbol: "AAPL".to_string(),
            side: OrderSide::Sell,
            quantity: dec!(100),
            price: dec!(99),
            commission: dec!(0),
            timestamp: Utc::now(),
        });

        let position = Position {
            symbol: "AAPL".to_string(),
            quantity: dec!(-100),
            average_price: dec!(99),
            cost_basis: dec!(9900),
            realized_pnl: dec!(0),
            last_updated: Utc::now(),
        };
        let positions = [&position];

        // Price rallies through the 2% stop (99 * 1.02 = 100.98): the
        // strategy buys the short back before considering new signals.
        let requests = strategy.evaluate(&snapshot(dec!(101)), &positions).unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].side, OrderSide::Buy);
        assert_eq!(requests[0].quantity, dec!(100));
    }
}
