use thiserror::Error;

use crate::filter::FilterError;

/// Raised when a wire string does not name a known enum variant.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid {kind} value: {value:?}")]
pub struct ParseEnumError {
    kind: &'static str,
    value: String,
}

impl ParseEnumError {
    #[must_use]
    pub fn new(kind: &'static str, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }
}

/// Failures of the core parsers, for callers that accept raw input.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseEnumError),
    #[error(transparent)]
    Filter(#[from] FilterError),
}
