use thiserror::Error;

#[derive(Error, Debug)]
pub enum MarketDataError {
    #[error("Cannot generate quotes without at least one symbol")]
    NoSymbols,
}
