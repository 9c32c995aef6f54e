use thiserror::Error;

/// Common error type for modbridge components.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Logging error: {0}")]
    Logging(String),
}

/// Result type alias using modbridge's Error.
pub type Result<T> = std::result::Result<T, Error>;
