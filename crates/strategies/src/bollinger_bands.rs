use crate::error::StrategyError;
use crate::{net_quantity, Strategy};
use configuration::BollingerBandsParams;
use core_types::{OrderRequest, OrderSide, Position, QuoteSnapshot, Trade};
use rust_decimal::prelude::*;
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use ta::indicators::BollingerBands as Bb;
use ta::Next;

struct SymbolState {
    bands: Bb,
    samples: usize,
}

/// Bollinger band fade strategy.
///
/// Buys a touch of the lower band, shorts a touch of the upper band, and
/// closes when the price crosses back through the middle band. Stop-loss and
/// take-profit percentages guard open positions.
pub struct BollingerBands {
    params: BollingerBandsParams,
    symbols: Vec<String>,
    states: HashMap<String, SymbolState>,
    entry_prices: HashMap<String, Decimal>,
    /// Symbols with an outstanding request; cleared by `on_trade`.
    pending: HashSet<String>,
}

impl BollingerBands {
    pub fn new(params: BollingerBandsParams, symbols: Vec<String>) -> Result<Self, StrategyError> {
        if params.num_std <= 0.0 {
            return Err(StrategyError::InvalidParameters(
                "num_std must be positive".to_string(),
            ));
        }
        if params.max_position <= Decimal::ZERO {
            return Err(StrategyError::InvalidParameters(
                "max_position must be positive".to_string(),
            ));
        }

        let bands = Bb::new(params.window_size, params.num_std)
            .map_err(|e| StrategyError::InvalidParameters(e.to_string()))?;

        let states = symbols
            .iter()
            .map(|symbol| {
                (
                    symbol.clone(),
                    SymbolState {
                        bands: bands.clone(),
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

impl Strategy for BollingerBands {
    fn name(&self) -> &str {
        "bollinger_bands"
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
            let bands = state.bands.next(price);
            state.samples += 1;
            if state.samples < self.params.window_size {
                continue;
            }

            let held = net_quantity(positions, symbol);
            if held.is_zero() {
                self.entry_prices.remove(symbol);
            }
            if self.pending.contains(symbol) {
                continue;
            }

            if !held.is_zero() {
                if let Some(&entry) = self.entry_prices.get(symbol) {
                    let exit = if held > Decimal::ZERO {
                        if mark <= entry * (Decimal::ONE - self.params.stop_loss_pct) {
                            tracing::info!(%symbol, %mark, %entry, "bollinger: stop loss on long");
                            Some(OrderSide::Sell)
                        } else if mark >= entry * (Decimal::ONE + self.params.take_profit_pct) {
                            tracing::info!(%symbol, %mark, %entry, "bollinger: take profit on long");
                            Some(OrderSide::Sell)
                        } else {
                            None
                        }
                    } else if mark >= entry * (Decimal::ONE + self.params.stop_loss_pct) {
                        tracing::info!(%symbol, %mark, %entry, "bollinger: stop loss on short");
                        Some(OrderSide::Buy)
                    } else if mark <= entry * (Decimal::ONE - self.params.take_profit_pct) {
                        tracing::info!(%symbol, %mark, %entry, "bollinger: take profit on short");
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

                // Mean touch closes the fade.
                let crossed_back = (held > Decimal::ZERO && price >= bands.average)
                    || (held < Decimal::ZERO && price <= bands.average);
                if crossed_back {
                    let side = if held > Decimal::ZERO {
                        OrderSide::Sell
                    } else {
                        OrderSide::Buy
                    };
                    tracing::info!(%symbol, price, "bollinger: middle band touched, closing");
                    requests.push(OrderRequest::market(symbol.clone(), side, held.abs()));
                    self.pending.insert(symbol.clone());
                }
                continue;
            }

            if price <= bands.lower {
                tracing::info!(%symbol, price, lower = bands.lower, "bollinger: lower band touch");
                requests.push(OrderRequest::market(
                    symbol.clone(),
                    OrderSide::Buy,
                    self.params.max_position,
                ));
                self.pending.insert(symbol.clone());
            } else if price >= bands.upper {
                tracing::info!(%symbol, price, upper = bands.upper, "bollinger: upper band touch");
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

    fn params() -> BollingerBandsParams {
        BollingerBandsParams {
            window_size: 3,
            num_std: 1.0,
            max_position: dec!(25),
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
    fn lower_band_touch_buys_and_upper_band_touch_sells() {
        let mut buyer = BollingerBands::new(params(), vec!["AAPL".to_string()]).unwrap();
        buyer.evaluate(&snapshot(dec!(100)), &[]).unwrap();
        buyer.evaluate(&snapshot(dec!(102)), &[]).unwrap();
        // Window [100, 102, 98]: lower band ~ 98.37, touched from below.
        let requests = buyer.evaluate(&snapshot(dec!(98)), &[]).unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].side, OrderSide::Buy);
        assert_eq!(requests[0].quantity, dec!(25));

        let mut seller = BollingerBands::new(params(), vec!["AAPL".to_string()]).unwrap();
        seller.evaluate(&snapshot(dec!(100)), &[]).unwrap();
        seller.evaluate(&snapshot(dec!(98)), &[]).unwrap();
        let requests = seller.evaluate(&snapshot(dec!(102)), &[]).unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].side, OrderSide::Sell);
    }

    #[test]
    fn middle_band_touch_closes_a_long() {
        let mut strategy = BollingerBands::new(params(), vec!["AAPL".to_string()]).unwrap();
        strategy.evaluate(&snapshot(dec!(100)), &[]).unwrap();
        strategy.evaluate(&snapshot(dec!(102)), &[]).unwrap();
        let requests = strategy.evaluate(&snapshot(dec!(98)), &[]).unwrap();
        assert_eq!(requests.len(), 1);

        strategy.on_trade(&Trade {
            trade_id: uuid::Uuid::nil(),
            order_id: uuid::Uuid::nil(),
            symbol: "AAPL".to_string(),
            side: OrderSide::Buy,
            quantity: dec!(25),
            price: dec!(98),
            commission: dec!(0),
            timestamp: Utc::now(),
        });

        let position = Position {
            symbol: "AAPL".to_string(),
            quantity: dec!(25),
            average_price: dec!(98),
            cost_basis: dec!(2450),
            realized_pnl: dec!(0),
            last_updated: Utc::now(),
        };

        // Window [102, 98, 101]: average ~ 100.33, price above it closes.
        let requests = strategy
            .evaluate(&snapshot(dec!(101)), &[&position])
            .unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].side, OrderSide::Sell);
        assert_eq!(requests[0].quantity, dec!(25));
    }
}
