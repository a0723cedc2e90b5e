//! Shared behaviour of the mergeable accumulators
//!
//! Everything that summarizes a stream of numbers and can be combined with a
//! summary of another stream implements [`Sketch`]. The two probabilistic
//! estimators used by [`ExtendedAccumulator`](crate::extended::ExtendedAccumulator)
//! add [`CardinalitySketch`] and [`QuantileSketch`] on top;
//! [`MomentAccumulator`](crate::statistics::MomentAccumulator) is an exact
//! [`Sketch`].

use core::fmt::Debug;
use thiserror::Error;

/// Two sketches could not be merged
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MergeError {
    /// The sketches were built with different parameters
    #[error("incompatible config: expected {expected}, found {found}")]
    IncompatibleConfig { expected: String, found: String },
}

/// Exported sketch state could not be turned back into a sketch
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("length mismatch: expected {expected}, found {found}")]
    LengthMismatch { expected: usize, found: usize },
    /// A parameter outside the range the sketch supports
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    /// Values no sketch could have produced
    #[error("corrupted data: {0}")]
    Corrupted(String),
}

/// Confidence interval around an estimate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ErrorBounds {
    pub lower: f64,
    pub estimate: f64,
    pub upper: f64,
    /// Probability that the true value lies in `[lower, upper]`
    pub confidence: f64,
}

impl ErrorBounds {
    pub fn new(lower: f64, estimate: f64, upper: f64, confidence: f64) -> Self {
        Self {
            lower,
            estimate,
            upper,
            confidence,
        }
    }

    pub fn contains(&self, value: f64) -> bool {
        (self.lower..=self.upper).contains(&value)
    }

    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }
}

/// A mergeable summary of a stream of numbers
pub trait Sketch: Clone + Debug {
    /// Observe one value
    fn insert(&mut self, value: f64);

    /// Fold another summary into this one, as if its values had been
    /// inserted here
    ///
    /// Fails without modifying `self` when the two were configured
    /// differently.
    fn merge(&mut self, other: &Self) -> Result<(), MergeError>;

    /// Forget every value while keeping the configuration
    fn clear(&mut self);

    /// Approximate heap and inline memory in bytes
    fn size_bytes(&self) -> usize;

    /// Number of values observed
    fn count(&self) -> u64;

    fn is_empty(&self) -> bool {
        self.count() == 0
    }
}

/// Distinct-count estimation
pub trait CardinalitySketch: Sketch {
    /// Estimated number of distinct values observed
    fn estimate(&self) -> f64;

    /// Interval holding the true count with the given probability (0 to 1)
    fn error_bounds(&self, confidence: f64) -> ErrorBounds;

    /// Relative standard error of [`estimate`](Self::estimate)
    fn relative_error(&self) -> f64;
}

/// Rank and quantile estimation
///
/// Ranks are fractions in `[0, 1]`; [`percentile`](Self::percentile) takes
/// the 0 to 100 scale instead. Queries on an empty sketch return `None`.
pub trait QuantileSketch: Sketch {
    /// Value below which the fraction `rank` of observations falls
    fn quantile(&self, rank: f64) -> Option<f64>;

    /// Fraction of observations below `value`
    fn rank(&self, value: f64) -> f64;

    fn min(&self) -> Option<f64>;

    fn max(&self) -> Option<f64>;

    fn percentile(&self, rank: f64) -> Option<f64> {
        self.quantile(rank / 100.0)
    }

    fn median(&self) -> Option<f64> {
        self.quantile(0.5)
    }
}
