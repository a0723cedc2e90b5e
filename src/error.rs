//! Crate-wide error type

use thiserror::Error;

use crate::traits::{DecodeError, MergeError};

/// Errors raised by accumulators, aggregators and the coercion helpers.
///
/// Every failure is immediate: nothing in this crate retries or performs I/O.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StatsError {
    /// A public parameter has the wrong shape or an unusable value
    #[error("invalid argument `{name}`: {reason}")]
    InvalidArgument { name: &'static str, reason: String },

    /// Moments were requested from fewer than two data points
    #[error("at least two data points must be added, received {count}")]
    InsufficientData { count: u64 },

    /// A value handed to numeric coercion is not null, a number or a string
    #[error("invalid type: {0}")]
    InvalidInputType(&'static str),

    /// A numeric argument falls outside its permitted range
    #[error("argument `{name}` must be between {min} and {max}, received {value}")]
    InvalidArgumentRange {
        name: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    /// Two sketches could not be combined
    #[error(transparent)]
    Merge(#[from] MergeError),

    /// Exported sketch state could not be rebuilt
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

pub type Result<T, E = StatsError> = std::result::Result<T, E>;
