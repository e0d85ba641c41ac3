use thiserror::Error;

/// Top-level error type for the Courier engine.
#[derive(Debug, Error)]
pub enum CourierError {
    /// Network, timeout, or DNS failure at the outbound call.
    #[error("{0}")]
    Transport(String),

    /// A response arrived but could not be used.
    #[error("{0}")]
    Server(String),

    #[error("persistence error: {0}")]
    Persistence(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("Scheduled time {target} is not in the future")]
    InPast { target: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
