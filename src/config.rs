//! Accumulator configuration
//!
//! Configuration is fixed when an accumulator is built and carried as plain
//! enums, so a "sample vs population" flag can never be anything but one of
//! its two values.

use crate::error::{Result, StatsError};

/// Default relative error of the cardinality estimator
pub const DEFAULT_ERROR_RATE: f64 = 0.01;

/// Default t-digest compression
pub const DEFAULT_COMPRESSION: f64 = 100.0;

/// Divisor used when normalising sums of squares
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum VarianceMode {
    /// Divide by `n`
    #[default]
    Population,
    /// Divide by `n - 1` (Bessel's correction)
    Sample,
}

impl VarianceMode {
    /// Amount subtracted from the sample count before dividing
    pub fn divisor_offset(self) -> u64 {
        match self {
            VarianceMode::Population => 0,
            VarianceMode::Sample => 1,
        }
    }
}

/// Small-sample correction applied to skewness and kurtosis
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BiasCorrection {
    /// Report the moment coefficients g1 and g2 as-is
    #[default]
    None,
    /// Adjusted Fisher-Pearson coefficients G1 and G2
    AdjustedFisherPearson,
}

/// Configuration of a moment accumulator or aggregation
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MomentConfig {
    pub variance: VarianceMode,
    pub bias: BiasCorrection,
}

impl MomentConfig {
    pub fn new(variance: VarianceMode, bias: BiasCorrection) -> Self {
        Self { variance, bias }
    }

    pub fn with_variance(mut self, variance: VarianceMode) -> Self {
        self.variance = variance;
        self
    }

    pub fn with_bias(mut self, bias: BiasCorrection) -> Self {
        self.bias = bias;
        self
    }
}

/// When an extended accumulator stops buffering raw values
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EstimateThreshold {
    /// Buffer as many values as the cardinality sketch has registers
    #[default]
    FromErrorRate,
    /// Estimate from the first value
    Immediate,
    /// Switch once this many values are buffered
    After(usize),
}

/// Configuration of an [`ExtendedAccumulator`](crate::extended::ExtendedAccumulator)
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExtendedConfig {
    pub moments: MomentConfig,
    /// Relative standard error targeted by the cardinality sketch
    pub error_rate: f64,
    pub threshold: EstimateThreshold,
    /// Compression of the percentile sketch
    pub compression: f64,
}

impl Default for ExtendedConfig {
    fn default() -> Self {
        Self {
            moments: MomentConfig::default(),
            error_rate: DEFAULT_ERROR_RATE,
            threshold: EstimateThreshold::default(),
            compression: DEFAULT_COMPRESSION,
        }
    }
}

impl ExtendedConfig {
    pub fn with_moments(mut self, moments: MomentConfig) -> Self {
        self.moments = moments;
        self
    }

    pub fn with_error_rate(mut self, error_rate: f64) -> Self {
        self.error_rate = error_rate;
        self
    }

    pub fn with_threshold(mut self, threshold: EstimateThreshold) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_compression(mut self, compression: f64) -> Self {
        self.compression = compression;
        self
    }

    /// Check the numeric parameters
    pub fn validate(&self) -> Result<()> {
        if !(self.error_rate.is_finite() && self.error_rate > 0.0 && self.error_rate < 1.0) {
            return Err(StatsError::InvalidArgument {
                name: "error_rate",
                reason: format!("must be in (0, 1), received {}", self.error_rate),
            });
        }
        if !(self.compression.is_finite() && self.compression > 0.0) {
            return Err(StatsError::InvalidArgument {
                name: "compression",
                reason: format!("must be finite and positive, received {}", self.compression),
            });
        }
        Ok(())
    }

    /// Number of buffered values that triggers estimation
    ///
    /// `FromErrorRate` resolves to 2^ceil(log2((1.04 / error_rate)^2)),
    /// saturating at `usize::MAX`.
    pub fn threshold(&self) -> usize {
        match self.threshold {
            EstimateThreshold::FromErrorRate => derived_threshold(self.error_rate),
            EstimateThreshold::Immediate => 0,
            EstimateThreshold::After(n) => n,
        }
    }
}

/// Buffer size whose exact distinct count beats the estimate at `error_rate`
fn derived_threshold(error_rate: f64) -> usize {
    let exponent = (1.04 / error_rate).powi(2).log2().ceil().max(0.0);
    // also covers an infinite exponent from a zero error rate
    if exponent >= f64::from(usize::BITS) {
        return usize::MAX;
    }
    1usize << exponent as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_divisor_offset() {
        assert_eq!(VarianceMode::Population.divisor_offset(), 0);
        assert_eq!(VarianceMode::Sample.divisor_offset(), 1);
    }

    #[test]
    fn test_derived_threshold() {
        // (1.04 / 0.01)^2 = 10816 -> 2^14
        let config = ExtendedConfig::default();
        assert_eq!(config.threshold(), 16384);

        let config = config.with_error_rate(0.05);
        // (1.04 / 0.05)^2 = 432.64 -> 2^9
        assert_eq!(config.threshold(), 512);
    }

    #[test]
    fn test_derived_threshold_outside_precision_range() {
        // (1.04 / 0.5)^2 = 4.3264 -> 2^3, below the smallest sketch precision
        let config = ExtendedConfig::default().with_error_rate(0.5);
        assert_eq!(config.threshold(), 8);

        // (1.04 / 0.001)^2 = 1081600 -> 2^21, above the largest sketch precision
        let config = config.with_error_rate(0.001);
        assert_eq!(config.threshold(), 1 << 21);

        let config = config.with_error_rate(1e-200);
        assert_eq!(config.threshold(), usize::MAX);
    }

    #[test]
    fn test_explicit_thresholds() {
        let config = ExtendedConfig::default().with_threshold(EstimateThreshold::Immediate);
        assert_eq!(config.threshold(), 0);

        let config = config.with_threshold(EstimateThreshold::After(100));
        assert_eq!(config.threshold(), 100);
    }

    #[test]
    fn test_validate() {
        assert!(ExtendedConfig::default().validate().is_ok());

        for rate in [0.0, 1.0, -0.5, f64::NAN] {
            let err = ExtendedConfig::default().with_error_rate(rate).validate();
            assert!(
                matches!(err, Err(StatsError::InvalidArgument { name: "error_rate", .. })),
                "rate={}",
                rate
            );
        }

        let err = ExtendedConfig::default().with_compression(0.0).validate();
        assert!(matches!(
            err,
            Err(StatsError::InvalidArgument { name: "compression", .. })
        ));
    }
}
