use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalyticsError {
    #[error("An internal calculation error occurred: {0}")]
    InternalError(String),
}
