use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Order error: {0}")]
    Order(#[from] core_types::CoreError),
}
