use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SimError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("no wait samples recorded, nobody has been served yet")]
    EmptySample,

    #[error("invariant violated: {0}")]
    InvariantViolation(String),
}

pub type SimResult<T> = Result<T, SimError>;
