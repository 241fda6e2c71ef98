//! Error types for the sample sort pipeline.
//!
//! Every failure of a run collapses into one [`SortError`]. Worker-side
//! failures carry the index of the bucket they originated from so the caller
//! can tell which worker broke the run.

use std::fmt;

/// Result alias used throughout the crate.
pub type Result<T, E = SortError> = std::result::Result<T, E>;

/// Terminal failure of a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SortError {
    /// Rejected before any bucket was computed.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// A worker met an element that has no place in a total order.
    #[error("bucket {bucket}: element {value} at position {position} cannot be ordered")]
    InvalidElement {
        bucket: usize,
        position: usize,
        value: String,
    },

    /// A bucket never reached its worker, or its reply never came back.
    #[error("bucket {bucket}: transport failure: {reason}")]
    TransportFailure { bucket: usize, reason: String },
}

/// Coarse classification of a [`SortError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Configuration,
    InvalidElement,
    TransportFailure,
}

impl SortError {
    pub fn configuration(reason: impl Into<String>) -> Self {
        SortError::Configuration(reason.into())
    }

    pub fn transport(bucket: usize, reason: impl Into<String>) -> Self {
        SortError::TransportFailure {
            bucket,
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            SortError::Configuration(_) => ErrorKind::Configuration,
            SortError::InvalidElement { .. } => ErrorKind::InvalidElement,
            SortError::TransportFailure { .. } => ErrorKind::TransportFailure,
        }
    }

    /// Bucket the failure originated from. `None` for configuration errors,
    /// which happen before any bucket exists.
    pub fn bucket(&self) -> Option<usize> {
        match self {
            SortError::Configuration(_) => None,
            SortError::InvalidElement { bucket, .. } | SortError::TransportFailure { bucket, .. } => {
                Some(*bucket)
            }
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Configuration => "configuration",
            ErrorKind::InvalidElement => "invalid_element",
            ErrorKind::TransportFailure => "transport_failure",
        };
        f.write_str(name)
    }
}

/// Failure to read an input collection from text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InputError {
    #[error("line {line}: cannot parse {token:?} as a number")]
    InvalidNumber { line: usize, token: String },

    #[error("input contains no values")]
    Empty,
}
