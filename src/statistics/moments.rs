//! Running moments (mean, variance, skewness, kurtosis)
//!
//! Computes streaming moments with the extended Welford recurrence for the
//! second to fourth central moments. Supports merging for distributed
//! computation, either accumulator-to-accumulator or through
//! [`aggregate_moments`](super::aggregate_moments) on finished [`Moments`].

use crate::config::{BiasCorrection, MomentConfig};
use crate::error::{Result, StatsError};
use crate::numeric::{to_numeric, Datum};
use crate::traits::{MergeError, Sketch};

/// Moments of a data set
///
/// `kurtosis` is the excess kurtosis: a normal distribution scores 0 and a
/// degenerate (constant or empty) one scores -3.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Moments {
    pub sample_count: u64,
    pub mean: f64,
    pub variance: f64,
    pub standard_deviation: f64,
    pub skewness: f64,
    pub kurtosis: f64,
}

impl Default for Moments {
    fn default() -> Self {
        Self {
            sample_count: 0,
            mean: 0.0,
            variance: 0.0,
            standard_deviation: 0.0,
            skewness: 0.0,
            kurtosis: -3.0,
        }
    }
}

impl Moments {
    /// Build moments from their parts; the standard deviation is derived.
    pub fn new(sample_count: u64, mean: f64, variance: f64, skewness: f64, kurtosis: f64) -> Self {
        Self {
            sample_count,
            mean,
            variance,
            standard_deviation: variance.sqrt(),
            skewness,
            kurtosis,
        }
    }

    /// Moments of a single observation
    pub fn single(value: f64) -> Self {
        Self::new(1, value, 0.0, 0.0, -3.0)
    }

    pub fn is_empty(&self) -> bool {
        self.sample_count == 0
    }

    /// Whether these moments can take part in an aggregation
    pub fn is_valid(&self) -> bool {
        self.mean.is_finite()
            && self.variance.is_finite()
            && self.variance >= 0.0
            && self.skewness.is_finite()
            && self.kurtosis.is_finite()
    }
}

impl BiasCorrection {
    /// Multiplier applied to the skewness coefficient for `n` samples
    pub(crate) fn skew_factor(self, n: f64) -> f64 {
        match self {
            BiasCorrection::AdjustedFisherPearson if n > 2.0 => (n * (n - 1.0)).sqrt() / (n - 2.0),
            _ => 1.0,
        }
    }

    /// Multiplier applied to the Pearson kurtosis for `n` samples
    pub(crate) fn kurtosis_factor(self, n: f64) -> f64 {
        match self {
            BiasCorrection::AdjustedFisherPearson if n > 3.0 => {
                (n + 1.0) * (n - 1.0) / ((n - 2.0) * (n - 3.0))
            }
            _ => 1.0,
        }
    }

    /// Offset turning the scaled Pearson kurtosis into excess kurtosis
    pub(crate) fn excess_offset(self, n: f64) -> f64 {
        match self {
            BiasCorrection::AdjustedFisherPearson if n > 3.0 => {
                -3.0 * (n - 1.0) * (n - 1.0) / ((n - 2.0) * (n - 3.0))
            }
            _ => -3.0,
        }
    }
}

/// Skewness and excess kurtosis from central sums `m2`, `m3`, `m4` of `n` values
pub(crate) fn shape(bias: BiasCorrection, n: f64, m2: f64, m3: f64, m4: f64) -> (f64, f64) {
    // identical inputs leave m2 at exactly zero
    if m2 > 0.0 {
        let skew = bias.skew_factor(n) * n.sqrt() * m3 / m2.powf(1.5);
        let kurt = bias.kurtosis_factor(n) * n * m4 / (m2 * m2) + bias.excess_offset(n);
        (skew, kurt)
    } else {
        (0.0, -3.0)
    }
}

/// Online moment accumulator
///
/// Tracks the count, mean and the central sums M2, M3 and M4 in a single pass
/// with O(1) memory. Each update uses the pre-update lower moments, so M4 is
/// updated before M3, and M3 before M2.
///
/// # Example
///
/// ```
/// use opstats::config::MomentConfig;
/// use opstats::statistics::MomentAccumulator;
///
/// let mut acc = MomentAccumulator::new(MomentConfig::default());
///
/// for value in [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0] {
///     acc.add(value);
/// }
///
/// let moments = acc.get().unwrap();
/// assert!((moments.mean - 5.0).abs() < 1e-12);
/// assert!((moments.variance - 4.0).abs() < 1e-12);
/// assert!((moments.standard_deviation - 2.0).abs() < 1e-12);
/// ```
///
/// # Distributed Usage
///
/// ```
/// use opstats::config::MomentConfig;
/// use opstats::statistics::{aggregate_moments, MomentAccumulator};
///
/// let config = MomentConfig::default();
/// let mut worker1 = MomentAccumulator::new(config);
/// let mut worker2 = MomentAccumulator::new(config);
///
/// for v in [1.0, 2.0, 3.0] {
///     worker1.add(v);
/// }
/// for v in [4.0, 5.0, 6.0] {
///     worker2.add(v);
/// }
///
/// let shards = [worker1.get().unwrap(), worker2.get().unwrap()];
/// let merged = aggregate_moments(&shards, config);
/// assert!((merged.mean - 3.5).abs() < 1e-12);
/// ```
#[derive(Clone, Debug, Default)]
pub struct MomentAccumulator {
    config: MomentConfig,
    /// Number of values seen
    count: u64,
    /// Running mean
    mean: f64,
    /// Sum of squared deviations from the mean
    m2: f64,
    /// Sum of cubed deviations from the mean
    m3: f64,
    /// Sum of fourth-power deviations from the mean
    m4: f64,
}

impl MomentAccumulator {
    /// Create an empty accumulator
    pub fn new(config: MomentConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> MomentConfig {
        self.config
    }

    /// Add a value
    ///
    /// NaN is treated as a missing value and ignored.
    pub fn add(&mut self, value: f64) {
        if value.is_nan() {
            return;
        }

        let n1 = self.count as f64;
        self.count += 1;
        let n = self.count as f64;

        let delta = value - self.mean;
        let delta_n = delta / n;
        let delta_n2 = delta_n * delta_n;
        let term1 = delta * delta_n * n1;

        self.mean += delta_n;
        self.m4 += term1 * delta_n2 * (n * n - 3.0 * n + 3.0) + 6.0 * delta_n2 * self.m2
            - 4.0 * delta_n * self.m3;
        self.m3 += term1 * delta_n * (n - 2.0) - 3.0 * delta_n * self.m2;
        self.m2 += term1;
    }

    /// Coerce and add a loosely typed value; nulls are skipped
    pub fn add_datum(&mut self, value: &Datum) -> Result<()> {
        if let Some(number) = to_numeric(value)? {
            self.add(number.as_f64());
        }
        Ok(())
    }

    /// Number of values added
    pub fn len(&self) -> u64 {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Current running mean (0 when empty)
    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Moments of everything added so far
    ///
    /// # Errors
    ///
    /// [`StatsError::InsufficientData`] when fewer than two values were added.
    /// The accumulator stays usable.
    pub fn get(&self) -> Result<Moments> {
        if self.count < 2 {
            return Err(StatsError::InsufficientData { count: self.count });
        }
        Ok(self.compute())
    }

    /// Like [`get`](Self::get), but defined for fewer than two values:
    /// an empty accumulator yields the zero [`Moments`], a single value yields
    /// that value as mean with zero variance.
    pub fn snapshot(&self) -> Moments {
        match self.count {
            0 => Moments::default(),
            1 => Moments::single(self.mean),
            _ => self.compute(),
        }
    }

    fn compute(&self) -> Moments {
        let n = self.count as f64;
        let divisor = (self.count - self.config.variance.divisor_offset()) as f64;
        let variance = self.m2 / divisor;
        let (skewness, kurtosis) = shape(self.config.bias, n, self.m2, self.m3, self.m4);
        Moments::new(self.count, self.mean, variance, skewness, kurtosis)
    }

    /// Merge another accumulator's raw state into this one
    ///
    /// Uses the pairwise update for central sums up to the fourth order, so the
    /// result equals having added both streams into one accumulator.
    pub fn merge_moments(&mut self, other: &Self) {
        if other.count == 0 {
            return;
        }

        if self.count == 0 {
            let config = self.config;
            *self = other.clone();
            self.config = config;
            return;
        }

        let na = self.count as f64;
        let nb = other.count as f64;
        let n = na + nb;
        let delta = other.mean - self.mean;
        let delta2 = delta * delta;

        let m2 = self.m2 + other.m2 + delta2 * na * nb / n;
        let m3 = self.m3
            + other.m3
            + delta2 * delta * na * nb * (na - nb) / (n * n)
            + 3.0 * delta * (na * other.m2 - nb * self.m2) / n;
        let m4 = self.m4
            + other.m4
            + delta2 * delta2 * na * nb * (na * na - na * nb + nb * nb) / (n * n * n)
            + 6.0 * delta2 * (na * na * other.m2 + nb * nb * self.m2) / (n * n)
            + 4.0 * delta * (na * other.m3 - nb * self.m3) / n;

        self.count += other.count;
        self.mean += delta * nb / n;
        self.m2 = m2;
        self.m3 = m3;
        self.m4 = m4;
    }
}

impl Sketch for MomentAccumulator {
    fn insert(&mut self, value: f64) {
        self.add(value);
    }

    fn merge(&mut self, other: &Self) -> Result<(), MergeError> {
        if self.config != other.config {
            return Err(MergeError::IncompatibleConfig {
                expected: format!("{:?}", self.config),
                found: format!("{:?}", other.config),
            });
        }
        self.merge_moments(other);
        Ok(())
    }

    fn clear(&mut self) {
        *self = Self::new(self.config);
    }

    fn size_bytes(&self) -> usize {
        core::mem::size_of::<Self>()
    }

    fn count(&self) -> u64 {
        self.count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VarianceMode;

    const DATA: [f64; 8] = [2.0, 8.0, 0.0, 4.0, 1.0, 9.0, 9.0, 0.0];

    fn accumulate(values: &[f64], config: MomentConfig) -> MomentAccumulator {
        let mut acc = MomentAccumulator::new(config);
        for &v in values {
            acc.add(v);
        }
        acc
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= 1e-9 * expected.abs().max(1.0),
            "actual={} expected={}",
            actual,
            expected
        );
    }

    #[test]
    fn test_basic() {
        let moments = accumulate(&DATA, MomentConfig::default()).get().unwrap();

        assert_eq!(moments.sample_count, 8);
        assert_close(moments.mean, 4.125);
        assert_close(moments.variance, 13.859375);
        assert_close(moments.standard_deviation, 13.859375f64.sqrt());
        // reference values from scipy.stats.skew / kurtosis
        assert_close(moments.skewness, 0.2650554122698573);
        assert_close(moments.kurtosis, -1.6660010752838508);
    }

    #[test]
    fn test_sample_variance() {
        let config = MomentConfig::default().with_variance(VarianceMode::Sample);
        let moments = accumulate(&DATA, config).get().unwrap();

        assert_close(moments.variance, 110.875 / 7.0);
        // skew and kurtosis do not depend on the variance divisor
        assert_close(moments.skewness, 0.2650554122698573);
    }

    #[test]
    fn test_adjusted_fisher_pearson() {
        let config = MomentConfig::default().with_bias(BiasCorrection::AdjustedFisherPearson);
        let moments = accumulate(&DATA, config).get().unwrap();

        let n = 8.0f64;
        let g1 = 0.2650554122698573;
        let g2 = -1.6660010752838508;
        let expected_skew = g1 * (n * (n - 1.0)).sqrt() / (n - 2.0);
        let expected_kurt = (n - 1.0) / ((n - 2.0) * (n - 3.0)) * ((n + 1.0) * g2 + 6.0);

        assert_close(moments.skewness, expected_skew);
        assert_close(moments.kurtosis, expected_kurt);
    }

    #[test]
    fn test_insufficient_data() {
        let mut acc = MomentAccumulator::new(MomentConfig::default());
        assert_eq!(acc.get(), Err(StatsError::InsufficientData { count: 0 }));

        acc.add(1.0);
        assert_eq!(acc.get(), Err(StatsError::InsufficientData { count: 1 }));

        // still usable afterwards
        acc.add(3.0);
        let moments = acc.get().unwrap();
        assert_eq!(moments.sample_count, 2);
        assert_close(moments.mean, 2.0);
    }

    #[test]
    fn test_snapshot_small_counts() {
        let mut acc = MomentAccumulator::new(MomentConfig::default());
        assert_eq!(acc.snapshot(), Moments::default());

        acc.add(5.0);
        let single = acc.snapshot();
        assert_eq!(single.sample_count, 1);
        assert_eq!(single.mean, 5.0);
        assert_eq!(single.variance, 0.0);
        assert_eq!(single.kurtosis, -3.0);
    }

    #[test]
    fn test_identical_values() {
        for config in [
            MomentConfig::default(),
            MomentConfig::new(VarianceMode::Sample, BiasCorrection::AdjustedFisherPearson),
        ] {
            let moments = accumulate(&[1.0, 1.0, 1.0, 1.0, 1.0], config).get().unwrap();
            assert_eq!(moments.mean, 1.0);
            assert_eq!(moments.variance, 0.0);
            assert_eq!(moments.skewness, 0.0);
            assert_eq!(moments.kurtosis, -3.0);
        }
    }

    #[test]
    fn test_nan_ignored() {
        let moments = accumulate(&[1.0, f64::NAN, 2.0, 3.0], MomentConfig::default())
            .get()
            .unwrap();
        assert_eq!(moments.sample_count, 3);
        assert_close(moments.mean, 2.0);
    }

    #[test]
    fn test_add_datum() {
        let mut acc = MomentAccumulator::new(MomentConfig::default());
        let data = [
            Datum::from(1),
            1.5.into(),
            "2".into(),
            "2.5".into(),
            "abc".into(),
            Datum::Null,
        ];
        for datum in data {
            acc.add_datum(&datum).unwrap();
        }
        let expected = accumulate(&[1.0, 1.5, 2.0, 2.5, 3.0], MomentConfig::default())
            .get()
            .unwrap();
        let moments = acc.get().unwrap();
        assert_eq!(moments.sample_count, 5);
        assert_close(moments.mean, expected.mean);
        assert_close(moments.variance, expected.variance);
        assert_close(moments.skewness, expected.skewness);

        assert!(acc.add_datum(&Datum::Bool(true)).is_err());
        assert_eq!(acc.len(), 5);
    }

    #[test]
    fn test_merge_matches_sequential() {
        let config = MomentConfig::default();
        let mut left = accumulate(&DATA[..3], config);
        let right = accumulate(&DATA[3..], config);
        left.merge(&right).unwrap();

        let whole = accumulate(&DATA, config).get().unwrap();
        let merged = left.get().unwrap();
        assert_eq!(merged.sample_count, whole.sample_count);
        assert_close(merged.mean, whole.mean);
        assert_close(merged.variance, whole.variance);
        assert_close(merged.skewness, whole.skewness);
        assert_close(merged.kurtosis, whole.kurtosis);
    }

    #[test]
    fn test_merge_empty() {
        let config = MomentConfig::default();
        let mut acc = accumulate(&[1.0, 2.0], config);
        acc.merge(&MomentAccumulator::new(config)).unwrap();
        assert_eq!(acc.len(), 2);

        let mut empty = MomentAccumulator::new(config);
        empty.merge(&acc).unwrap();
        assert_close(empty.get().unwrap().mean, 1.5);
    }

    #[test]
    fn test_merge_incompatible() {
        let mut acc = MomentAccumulator::new(MomentConfig::default());
        let sample = MomentConfig::default().with_variance(VarianceMode::Sample);
        let other = MomentAccumulator::new(sample);
        assert!(acc.merge(&other).is_err());
    }

    #[test]
    fn test_clear_keeps_config() {
        let config = MomentConfig::default().with_variance(VarianceMode::Sample);
        let mut acc = accumulate(&DATA, config);
        acc.clear();
        assert!(acc.is_empty());
        assert_eq!(acc.config(), config);
    }

    #[test]
    fn test_numerical_stability() {
        let base = 1e6;
        let values: Vec<f64> = (0..1000).map(|i| base + i as f64).collect();
        let moments = accumulate(&values, MomentConfig::default()).get().unwrap();

        // variance of 0..1000 is (1000^2 - 1) / 12
        assert!((moments.mean - (base + 499.5)).abs() < 1e-6);
        assert!((moments.variance - 83333.25).abs() < 1e-4);
        assert!(moments.skewness.abs() < 1e-6);
    }
}
