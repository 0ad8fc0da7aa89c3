use crate::bollinger_bands::BollingerBands;
use crate::error::StrategyError;
use crate::mean_reversion::MeanReversion;
use crate::momentum::Momentum;
use crate::Strategy;
use configuration::Config;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifies which strategy the factory should construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StrategyId {
    Momentum,
    MeanReversion,
    BollingerBands,
}

impl StrategyId {
    /// The names accepted on the command line, in display order.
    pub fn all_names() -> &'static [&'static str] {
        &["momentum", "mean_reversion", "bollinger_bands"]
    }
}

impl FromStr for StrategyId {
    type Err = StrategyError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "momentum" => Ok(StrategyId::Momentum),
            "mean_reversion" | "mean-reversion" => Ok(StrategyId::MeanReversion),
            "bollinger_bands" | "bollinger-bands" => Ok(StrategyId::BollingerBands),
            other => Err(StrategyError::StrategyNotFound(other.to_string())),
        }
    }
}

impl fmt::Display for StrategyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StrategyId::Momentum => "momentum",
            StrategyId::MeanReversion => "mean_reversion",
            StrategyId::BollingerBands => "bollinger_bands",
        };
        write!(f, "{name}")
    }
}

/// Creates a new strategy instance based on the provided ID and configuration.
///
/// The match is exhaustive: the compiler will error if a new `StrategyId` is
/// added but not handled here.
pub fn create_strategy(
    id: StrategyId,
    config: &Config,
    symbols: Vec<String>,
) -> Result<Box<dyn Strategy>, StrategyError> {
    match id {
        StrategyId::Momentum => {
            let params = config.strategies.momentum.clone();
            Ok(Box::new(Momentum::new(params, symbols)?))
        }
        StrategyId::MeanReversion => {
            let params = config.strategies.mean_reversion.clone();
            Ok(Box::new(MeanReversion::new(params, symbols)?))
        }
        StrategyId::BollingerBands => {
            let params = config.strategies.bollinger_bands.clone();
            Ok(Box::new(BollingerBands::new(params, symbols)?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategy_names_round_trip_through_from_str() {
        for name in StrategyId::all_names() {
            let id: StrategyId = name.parse().unwrap();
            assert_eq!(id.to_string(), *name);
        }
        assert!("martingale".parse::<StrategyId>().is_err());
    }
}
