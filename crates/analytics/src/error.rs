use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum AnalyticsError {
    #[error("Invalid progress window: {0}")]
    InvalidWindow(String),
}
