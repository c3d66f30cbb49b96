use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SimError {
    #[error("observer spread must be finite and >= 0, got {0}")]
    InvalidSpread(f64),
    #[error("observer threshold must be finite, got {0}")]
    InvalidThreshold(f64),
    #[error("scripted responses exhausted after {0} trials")]
    ScriptExhausted(usize),
}

pub type Result<T> = std::result::Result<T, SimError>;
