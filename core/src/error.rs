use thiserror::Error;

/// Errors that surface to the caller. Runtime rule failures and lookup
/// misses are NOT errors; they are `ELResult::Fail` values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ELError {
    #[error("parse error at {line}:{col} near '{found}': {msg}")]
    Parse {
        line: usize,
        col: usize,
        found: String,
        msg: String,
    },

    #[error("consistency error: {0}")]
    Consistency(String),
}

impl ELError {
    pub fn consistency(msg: impl Into<String>) -> Self {
        ELError::Consistency(msg.into())
    }
}
