use thiserror::Error;

#[derive(Debug, Error)]
pub enum GridError {
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),
    #[error("type encoding missing: {0}")]
    TypeEncodingMissing(String),
    #[error("out of range: {0}")]
    OutOfRange(String),
    #[error("invalid config: {0}")]
    Invalid(String),
    #[error("unsupported: {0}")]
    Unsupported(String),
}

pub type GridResult<T> = Result<T, GridError>;
