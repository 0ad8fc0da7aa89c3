use crate::error::ConfigError;
use rust_decimal::Decimal;
use serde::Deserialize;

/// The root configuration structure for the entire application.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub simulation: Simulation,
    pub market_data: MarketData,
    pub strategies: Strategies,
}

impl Config {
    /// Checks cross-field constraints that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.simulation.initial_cash <= Decimal::ZERO {
            return Err(ConfigError::ValidationError(
                "simulation.initial_cash must be positive".to_string(),
            ));
        }
        if self.simulation.commission_rate < Decimal::ZERO
            || self.simulation.slippage_rate < Decimal::ZERO
        {
            return Err(ConfigError::ValidationError(
                "commission and slippage rates must be non-negative".to_string(),
            ));
        }
        if self.market_data.volatility <= 0.0 {
            return Err(ConfigError::ValidationError(
                "market_data.volatility must be positive".to_string(),
            ));
        }
        if self.market_data.tick_size <= Decimal::ZERO {
            return Err(ConfigError::ValidationError(
                "market_data.tick_size must be positive".to_string(),
            ));
        }
        if self.market_data.initial_price_min <= 0.0
            || self.market_data.initial_price_max < self.market_data.initial_price_min
        {
            return Err(ConfigError::ValidationError(
                "market_data initial price range is invalid".to_string(),
            ));
        }
        Ok(())
    }
}

/// Contains parameters for the execution and accounting engine.
#[derive(Debug, Clone, Deserialize)]
pub struct Simulation {
    /// The starting cash balance for the simulated account.
    pub initial_cash: Decimal,

    /// The commission charged per trade, as a fraction of notional.
    /// 0.001 corresponds to 0.1%.
    pub commission_rate: Decimal,

    /// The assumed price slippage for marketable orders.
    /// Market buys pay `ask * (1 + slippage_rate)`; market sells receive
    /// `bid * (1 - slippage_rate)`.
    pub slippage_rate: Decimal,
}

/// Contains parameters for the synthetic quote generator.
#[derive(Debug, Clone, Deserialize)]
pub struct MarketData {
    /// Per-tick volatility as a fraction of the current price.
    pub volatility: f64,
    /// Minimum price increment; all generated prices are rounded to it.
    pub tick_size: Decimal,
    /// Delay between generated ticks in the driver loop, in milliseconds.
    pub tick_interval_ms: u64,
    /// Seed for the random walk. When absent, each run uses fresh entropy.
    pub seed: Option<u64>,
    /// Lower bound for randomly drawn initial prices.
    pub initial_price_min: f64,
    /// Upper bound for randomly drawn initial prices.
    pub initial_price_max: f64,
}

/// Contains the parameter sets for all available strategies.
#[derive(Debug, Deserialize, Clone)]
pub struct Strategies {
    pub momentum: MomentumParams,
    pub mean_reversion: MeanReversionParams,
    pub bollinger_bands: BollingerBandsParams,
}

/// Parameters for the dual moving average Momentum strategy.
#[derive(Debug, Deserialize, Clone)]
pub struct MomentumParams {
    pub short_window: usize,
    pub long_window: usize,
    /// Maximum absolute position size per symbol, in units.
    pub max_position: Decimal,
    pub stop_loss_pct: Decimal,
    pub take_profit_pct: Decimal,
}

/// Parameters for the z-score Mean Reversion strategy.
#[derive(Debug, Deserialize, Clone)]
pub struct MeanReversionParams {
    pub window_size: usize,
    /// Entry threshold in standard deviations from the rolling mean.
    pub entry_threshold: f64,
    /// Exit threshold in standard deviations; positions close once the
    /// z-score re-enters this band.
    pub exit_threshold: f64,
    pub max_position: Decimal,
    pub stop_loss_pct: Decimal,
}

/// Parameters for the Bollinger Bands strategy.
#[derive(Debug, Deserialize, Clone)]
pub struct BollingerBandsParams {
    pub window_size: usize,
    /// Band width in standard deviations around the rolling mean.
    pub num_std: f64,
    pub max_position: Decimal,
    pub stop_loss_pct: Decimal,
    pub take_profit_pct: Decimal,
}
