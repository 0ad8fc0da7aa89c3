use crate::error::StrategyError;
use crate::{net_quantity, Strategy};
use configuration::MeanReversionParams;
use core_types::{OrderRequest, OrderSide, Position, QuoteSnapshot, Trade};
use rust_decimal::prelude::*;
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use ta::indicators::{SimpleMovingAverage as Sma, StandardDeviation as Sd};
use ta::Next;

struct SymbolState {
    sma: Sma,
    sd: Sd,
    samples: usize,
}

/// Z-score mean reversion strategy.
///
/// Enters against moves that stretch beyond `entry_threshold` standard
/// deviations from the rolling mean and exits once the z-score re-enters the
/// `exit_threshold` band. A percentage stop-loss caps the damage when the
/// stretch keeps stretching.
pub struct MeanReversion {
    params: MeanReversionParams,
    symbols: Vec<String>,
    states: HashMap<String, SymbolState>,
    entry_prices: HashMap<String, Decimal>,
    /// Symbols with an outstanding request; cleared by `on_trade`.
    pending: HashSet<String>,
}

impl MeanReversion {
    pub fn new(params: MeanReversionParams, symbols: Vec<String>) -> Result<Self, StrategyError> {
        if params.exit_threshold >= params.entry_threshold {
            return Err(StrategyError::InvalidParameters(
                "exit threshold must be less than entry threshold".to_string(),
            ));
        }
        if params.max_position <= Decimal::ZERO {
            return Err(StrategyError::InvalidParameters(
                "max_position must be positive".to_string(),
            ));
        }

        let sma = Sma::new(params.window_size)
            .map_err(|e| StrategyError::InvalidParameters(e.to_string()))?;
        let sd = Sd::new(params.window_size)
            .map_err(|e| StrategyError::InvalidParameters(e.to_string()))?;

        let states = symbols
            .iter()
            .map(|symbol| {
                (
                    symbol.clone(),
                    SymbolState {
                        sma: sma.clone(),
                        sd: sd.clone(),
                        samples: 0,
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

impl Strategy for MeanReversion {
    fn name(&self) -> &str {
        "mean_reversion"
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
            let Some(price) = mark.to_f64() else {
                continue;
            };

            let Some(state) = self.states.get_mut(symbol) else {
                continue;
            };
            let mean = state.sma.next(price);
            let sigma = state.sd.next(price);
            state.samples += 1;
            if state.samples < self.params.window_size {
                continue;
            }
            if sigma == 0.0 {
                // A perfectly flat window has no dispersion to revert against.
                continue;
            }

            let z_score = (price - mean) / sigma;

            let held = net_quantity(positions, symbol);
            if held.is_zero() {
                self.entry_prices.remove(symbol);
            }
            if self.pending.contains(symbol) {
                continue;
            }

            if !held.is_zero() {
                // Stop-loss first, reversion exit second.
                if let Some(&entry) = self.entry_prices.get(symbol) {
                    let stopped = if held > Decimal::ZERO {
                        mark <= entry * (Decimal::ONE - self.params.stop_loss_pct)
                    } else {
                        mark >= entry * (Decimal::ONE + self.params.stop_loss_pct)
                    };
                    if stopped {
                        let side = if held > Decimal::ZERO {
                            OrderSide::Sell
                        } else {
                            OrderSide::Buy
                        };
                        tracing::info!(%symbol, %mark, %entry, "mean reversion: stop loss");
                        requests.push(OrderRequest::market(symbol.clone(), side, held.abs()));
                        self.pending.insert(symbol.clone());
                        continue;
                    }
                }

                if z_score.abs() <= self.params.exit_threshold {
                    let side = if held > Decimal::ZERO {
                        OrderSide::Sell
                    } else {
                        OrderSide::Buy
                    };
                    tracing::info!(%symbol, z_score, "mean reversion: reverted, closing");
                    requests.push(OrderRequest::market(symbol.clone(), side, held.abs()));
                    self.pending.insert(symbol.clone());
                }
                continue;
            }

            if z_score < -self.params.entry_threshold {
                tracing::info!(%symbol, z_score, "mean reversion: oversold, buying");
                requests.push(OrderRequest::market(
                    symbol.clone(),
                    OrderSide::Buy,
                    self.params.max_position,
                ));
                self.pending.insert(symbol.clone());
            } else if z_score > self.params.entry_threshold {
                tracing::info!(%symbol, z_score, "mean reversion: overbought, selling");
                requests.push(OrderRequest::market(
                    symbol.clone(),
                    OrderSide::Sell,
                    self.params.max_position,
                ));
                self.pending.insert(symbol.clone());
            }
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
    use core_types::{Quote, QuoteSnapshot};
    use rust_decimal_macros::dec;

    fn params() -> MeanReversionParams {
        MeanReversionParams {
            window_size: 5,
            entry_threshold: 1.5,
            exit_threshold: 0.5,
            max_position: dec!(50),
            stop_loss_pct: dec!(0.1),
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
    fn a_deep_dip_below_the_mean_triggers_a_buy() {
        let mut strategy = MeanReversion::new(params(), vec!["AAPL".to_string()]).unwrap();

        for price in [dec!(100), dec!(101), dec!(99), dec!(100), dec!(100)] {
            let requests = strategy.evaluate(&snapshot(price), &[]).unwrap();
            assert!(requests.is_empty());
        }

        // Window is now [101, 99, 100, 100, 90]: z ~ -1.98, beyond the 1.5
        // entry threshold.
        let requests = strategy.evaluate(&snapshot(dec!(90)), &[]).unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].side, OrderSide::Buy);
        assert_eq!(requests[0].quantity, dec!(50));
    }

    #[test]
    fn a_reverted_z_score_closes_the_position() {
        let mut strategy = MeanReversion::new(params(), vec!["AAPL".to_string()]).unwrap();

        for price in [dec!(100), dec!(101), dec!(99), dec!(100), dec!(100)] {
            strategy.evaluate(&snapshot(price), &[]).unwrap();
        }
        let requests = strategy.evaluate(&snapshot(dec!(90)), &[]).unwrap();
        assert_eq!(requests.len(), 1);

        // The engine fills the entry.
        strategy.on_trade(&Trade {
            trade_id: uuid::Uuid::nil(),
            order_id: uuid::Uuid::nil(),
            symbol: "AAPL".to_string(),
            side: OrderSide::Buy,
            quantity: dec!(50),
            price: dec!(90),
            commission: dec!(0),
            timestamp: Utc::now(),
        });

        let position = Position {
            symbol: "AAPL".to_string(),
            quantity: dec!(50),
            average_price: dec!(90),
            cost_basis: dec!(4500),
            realized_pnl: dec!(0),
            last_updated: Utc::now(),
        };

        // Price snaps back toward the mean: |z| falls inside the exit band.
        let requests = strategy.evaluate(&snapshot(dec!(98)), &[&position]).unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].side, OrderSide::Sell);
        assert_eq!(requests[0].quantity, dec!(50));
    }
}
