use thiserror::Error;

/// Failures surfaced by the exchange services. The HTTP layer decides how
/// each maps onto a response; nothing in here depends on axum.
#[derive(Error, Debug)]
pub enum ExchangeError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("payload of {size} bytes exceeds the {limit} byte limit")]
    PayloadTooLarge { size: usize, limit: usize },

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("external processing failed: {0}")]
    Processing(String),

    /// Discovery exhausted both the candidate list and the fallback scan.
    /// Carries the working directory listing for diagnosis.
    #[error("no encrypted output found; working directory contained {listing:?}")]
    OutputNotFound { listing: Vec<String> },

    #[error("token not found")]
    NotFound,

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
