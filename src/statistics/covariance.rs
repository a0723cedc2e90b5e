//! Covariance and correlation of paired series
//!
//! Two moment accumulators (one per series) plus a running co-moment, the sum
//! of cross-deviation products. The co-moment is kept unnormalised so partial
//! results can be merged.

use tracing::trace;

use super::aggregate::aggregate_moments;
use super::moments::{MomentAccumulator, Moments};
use crate::config::{MomentConfig, VarianceMode};
use crate::error::{Result, StatsError};
use crate::numeric::{to_numeric, Datum};

/// Covariance statistics of two paired series
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Covariance {
    pub sample_count: u64,
    pub moments_x: Moments,
    pub moments_y: Moments,
    /// Sum of cross-deviation products, not divided by the sample count
    pub comoment: f64,
    pub covariance: f64,
    pub correlation: f64,
}

impl Covariance {
    /// Assemble covariance statistics from their parts.
    ///
    /// # Errors
    ///
    /// [`StatsError::InvalidArgument`] when the two series disagree on their
    /// sample count.
    pub fn new(
        moments_x: Moments,
        moments_y: Moments,
        comoment: f64,
        covariance: f64,
        correlation: f64,
    ) -> Result<Self> {
        if moments_x.sample_count != moments_y.sample_count {
            return Err(StatsError::InvalidArgument {
                name: "moments_y",
                reason: format!(
                    "sample count {} does not match moments_x sample count {}",
                    moments_y.sample_count, moments_x.sample_count
                ),
            });
        }
        Ok(Self {
            sample_count: moments_x.sample_count,
            moments_x,
            moments_y,
            comoment,
            covariance,
            correlation,
        })
    }

    /// Normalise a co-moment over `x` and `y`.
    fn from_comoment(x: Moments, y: Moments, comoment: f64, mode: VarianceMode) -> Self {
        let n = x.sample_count;
        let divisor = n.saturating_sub(mode.divisor_offset()) as f64;
        let covariance = if divisor > 0.0 { comoment / divisor } else { 0.0 };

        // a constant series has no defined correlation
        let correlation = if x.standard_deviation == 0.0 || y.standard_deviation == 0.0 {
            0.0
        } else {
            comoment / (x.standard_deviation * y.standard_deviation) / divisor
        };

        Self {
            sample_count: n,
            moments_x: x,
            moments_y: y,
            comoment,
            covariance,
            correlation,
        }
    }

    fn is_valid(&self) -> bool {
        self.moments_x.sample_count == self.sample_count
            && self.moments_y.sample_count == self.sample_count
            && self.moments_x.is_valid()
            && self.moments_y.is_valid()
            && self.comoment.is_finite()
    }
}

/// Online covariance and correlation accumulator
///
/// # Example
///
/// ```
/// use opstats::config::VarianceMode;
/// use opstats::statistics::CovarianceAccumulator;
///
/// let mut acc = CovarianceAccumulator::new(VarianceMode::Population);
/// for (x, y) in [(1.0, 2.0), (2.0, 4.0), (3.0, 6.0)] {
///     acc.add(x, y);
/// }
///
/// let cov = acc.get();
/// assert!((cov.correlation - 1.0).abs() < 1e-12);
/// ```
#[derive(Clone, Debug, Default)]
pub struct CovarianceAccumulator {
    mode: VarianceMode,
    x: MomentAccumulator,
    y: MomentAccumulator,
    comoment: f64,
}

impl CovarianceAccumulator {
    pub fn new(mode: VarianceMode) -> Self {
        let config = MomentConfig::default().with_variance(mode);
        Self {
            mode,
            x: MomentAccumulator::new(config),
            y: MomentAccumulator::new(config),
            comoment: 0.0,
        }
    }

    /// Add a pair of observations
    ///
    /// The pair is skipped entirely if either value is NaN, so both series
    /// always advance together.
    pub fn add(&mut self, x: f64, y: f64) {
        if x.is_nan() || y.is_nan() {
            return;
        }

        // dx uses the mean of x before it moves; y's mean is read after
        let dx = x - self.x.mean();
        self.x.add(x);
        self.y.add(y);
        self.comoment += dx * (y - self.y.mean());
    }

    /// Coerce and add a loosely typed pair; a pair containing a null is skipped
    pub fn add_datum(&mut self, x: &Datum, y: &Datum) -> Result<()> {
        if let (Some(x), Some(y)) = (to_numeric(x)?, to_numeric(y)?) {
            self.add(x.as_f64(), y.as_f64());
        }
        Ok(())
    }

    pub fn len(&self) -> u64 {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// Covariance statistics of all pairs added so far
    ///
    /// An empty accumulator yields the all-zero [`Covariance`].
    pub fn get(&self) -> Covariance {
        if self.x.is_empty() {
            return Covariance::default();
        }
        Covariance::from_comoment(self.x.snapshot(), self.y.snapshot(), self.comoment, self.mode)
    }
}

/// Combine covariance statistics previously computed over disjoint parts of
/// one paired data set.
///
/// Entries with a zero sample count or inconsistent fields are dropped. No
/// usable entries yield the all-zero [`Covariance`]; a single entry is
/// returned unchanged. Otherwise entries are folded pairwise from the left.
pub fn aggregate_covariance<'a, I>(stats: I, mode: VarianceMode) -> Covariance
where
    I: IntoIterator<Item = &'a Covariance>,
{
    let mut dropped = 0usize;
    let shards: Vec<&Covariance> = stats
        .into_iter()
        .filter(|c| {
            let keep = c.sample_count > 0 && c.is_valid();
            dropped += usize::from(!keep);
            keep
        })
        .collect();

    if dropped > 0 {
        trace!(dropped, "ignoring empty or invalid covariance entries");
    }

    let mut iter = shards.into_iter();
    let Some(first) = iter.next() else {
        return Covariance::default();
    };
    iter.fold(*first, |left, right| merge(&left, right, mode))
}

fn merge(left: &Covariance, right: &Covariance, mode: VarianceMode) -> Covariance {
    let config = MomentConfig::default().with_variance(mode);
    let x = aggregate_moments([&left.moments_x, &right.moments_x], config);
    let y = aggregate_moments([&left.moments_y, &right.moments_y], config);

    let nl = left.sample_count as f64;
    let nr = right.sample_count as f64;
    let comoment = left.comoment
        + right.comoment
        + (left.moments_x.mean - right.moments_x.mean)
            * (left.moments_y.mean - right.moments_y.mean)
            * (nl * nr / (nl + nr));

    Covariance::from_comoment(x, y, comoment, mode)
}
