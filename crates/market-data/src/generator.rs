use crate::error::MarketDataError;
use chrono::Utc;
use configuration::MarketData;
use core_types::{Quote, QuoteSnapshot};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, LogNormal, Normal};
use rust_decimal::prelude::*;
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Generates simulated market data for a fixed set of symbols.
///
/// Each symbol follows an independent gaussian random walk with a per-tick
/// sigma of `volatility * price`. The bid/ask spread is drawn uniformly in
/// 1-5 basis points of the price and everything is rounded to the configured
/// tick size. With a fixed seed the price path is fully reproducible.
pub struct QuoteGenerator {
    params: MarketData,
    symbols: Vec<String>,
    // The walk runs in f64, the natural domain of the samplers; prices are
    // converted to Decimal only at the snapshot boundary.
    prices: HashMap<String, f64>,
    rng: StdRng,
}

impl QuoteGenerator {
    pub fn new(symbols: Vec<String>, params: MarketData) -> Result<Self, MarketDataError> {
        if symbols.is_empty() {
            return Err(MarketDataError::NoSymbols);
        }

        let mut rng = match params.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let prices = symbols
            .iter()
            .map(|symbol| {
                let price =
                    rng.gen_range(params.initial_price_min..=params.initial_price_max);
                (symbol.clone(), price)
            })
            .collect();

        tracing::info!(symbols = symbols.len(), seed = ?params.seed, "quote generator ready");

        Ok(Self {
            params,
            symbols,
            prices,
            rng,
        })
    }

    /// Advances every symbol's walk by one step and returns the snapshot.
    pub fn next_snapshot(&mut self) -> QuoteSnapshot {
        let timestamp = Utc::now();
        let mut snapshot = QuoteSnapshot::new(timestamp);
        let tick = self.params.tick_size;
        let tick_f64 = tick.to_f64().unwrap_or(0.01);

        for symbol in &self.symbols {
            let price = self
                .prices
                .get_mut(symbol)
                .expect("prices are seeded for every symbol at construction");

            let sigma = self.params.volatility * *price;
            let step = Normal::new(0.0, sigma)
                .map(|dist| dist.sample(&mut self.rng))
                .unwrap_or(0.0);
            // Prices never walk below one tick.
            *price = (*price + step).max(tick_f64);

            // Spread between 1 and 5 bp of price, never narrower than a tick.
            let spread = (*price * self.rng.gen_range(0.0001..0.0005)).max(tick_f64);

            let mid = round_to_tick(*price, tick);
            let mut bid = round_to_tick(*price - spread / 2.0, tick);
            let mut ask = round_to_tick(*price + spread / 2.0, tick);
            if bid == ask {
                ask += tick;
            }
            if bid <= Decimal::ZERO {
                bid = tick;
                if ask <= bid {
                    ask = bid + tick;
                }
            }

            let lot = LogNormal::new(5.0, 0.5)
                .map(|dist| dist.sample(&mut self.rng))
                .unwrap_or(0.0);
            let bid_volume = (lot as u64) * 100;
            let lot = LogNormal::new(5.0, 0.5)
                .map(|dist| dist.sample(&mut self.rng))
                .unwrap_or(0.0);
            let ask_volume = (lot as u64) * 100;

            snapshot.insert(
                symbol.clone(),
                Quote {
                    bid: Some(bid),
                    ask: Some(ask),
                    last: Some(mid),
                    bid_volume: Some(bid_volume),
                    ask_volume: Some(ask_volume),
                    volume: Some(self.rng.gen_range(1_000..10_000)),
                    timestamp,
                },
            );
        }

        snapshot
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }
}

/// Rounds an f64 price onto the Decimal tick grid.
fn round_to_tick(value: f64, tick: Decimal) -> Decimal {
    let raw = Decimal::from_f64(value).unwrap_or_default();
    (raw / tick).round() * tick
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn params(seed: Option<u64>) -> MarketData {
        MarketData {
            volatility: 0.001,
            tick_size: dec!(0.01),
            tick_interval_ms: 0,
            seed,
            initial_price_min: 50.0,
            initial_price_max: 500.0,
        }
    }

    #[test]
    fn construction_requires_symbols() {
        assert!(matches!(
            QuoteGenerator::new(vec![], params(Some(7))),
            Err(MarketDataError::NoSymbols)
        ));
    }

    #[test]
    fn quotes_are_two_sided_and_positive() {
        let mut generator =
            QuoteGenerator::new(vec!["AAPL".to_string(), "MSFT".to_string()], params(Some(42)))
                .unwrap();

        for _ in 0..200 {
            let snapshot = generator.next_snapshot();
            assert_eq!(snapshot.len(), 2);
            for (_, quote) in snapshot.iter() {
                let bid = quote.bid.unwrap();
                let ask = quote.ask.unwrap();
                assert!(bid > dec!(0));
                assert!(ask > bid);
                assert!(quote.last.unwrap() > dec!(0));
            }
        }
    }

    #[test]
    fn a_fixed_seed_reproduces_the_same_price_path() {
        let symbols = vec!["AAPL".to_string()];
        let mut first = QuoteGenerator::new(symbols.clone(), params(Some(1234))).unwrap();
        let mut second = QuoteGenerator::new(symbols, params(Some(1234))).unwrap();

        for _ in 0..50 {
            let a = first.next_snapshot();
            let b = second.next_snapshot();
            let qa = a.get("AAPL").unwrap();
            let qb = b.get("AAPL").unwrap();
            assert_eq!(qa.bid, qb.bid);
            assert_eq!(qa.ask, qb.ask);
            assert_eq!(qa.last, qb.last);
        }
    }

    #[test]
    fn prices_round_to_the_tick_grid() {
        let tick = dec!(0.05);
        assert_eq!(round_to_tick(100.024, tick), dec!(100.00));
        assert_eq!(round_to_tick(100.026, tick), dec!(100.05));
    }
}
