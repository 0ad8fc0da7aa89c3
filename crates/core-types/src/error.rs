use crate::enums::OrderStatus;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Order validation failed: {0}")]
    Validation(String),

    #[error("Illegal order state transition: cannot {action} an order in state {from:?}")]
    InvalidStateTransition {
        from: OrderStatus,
        action: &'static str,
    },
}
