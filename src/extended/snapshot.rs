//! Mergeable snapshots and the finalized statistics bundle

use std::collections::{BTreeMap, HashSet};

use crate::cardinality::{canonical_bits, CardinalityState, HyperLogLog};
use crate::error::Result;
use crate::percentile::{check_rank, percentile_sorted, Interpolation};
use crate::quantiles::{DigestState, TDigest};
use crate::statistics::Moments;
use crate::traits::{CardinalitySketch, QuantileSketch};

/// Finalized statistics of a data set
///
/// `cardinality` and the percentile fields are exact while the data set was
/// small enough to buffer and estimated afterwards. The moments are always
/// exact.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExtendedStats {
    pub sample_count: u64,
    pub mean: f64,
    pub variance: f64,
    pub standard_deviation: f64,
    pub skewness: f64,
    /// Excess kurtosis
    pub kurtosis: f64,
    /// Number of distinct values
    pub cardinality: u64,
    pub median: f64,
    /// 75th minus 25th percentile
    pub interquartile_range: f64,
    /// Requested percentiles keyed by rank
    pub percentiles: BTreeMap<u8, f64>,
}

impl Default for ExtendedStats {
    fn default() -> Self {
        Self::from_moments(&Moments::default())
    }
}

impl ExtendedStats {
    fn from_moments(m: &Moments) -> Self {
        Self {
            sample_count: m.sample_count,
            mean: m.mean,
            variance: m.variance,
            standard_deviation: m.standard_deviation,
            skewness: m.skewness,
            kurtosis: m.kurtosis,
            cardinality: 0,
            median: 0.0,
            interquartile_range: 0.0,
            percentiles: BTreeMap::new(),
        }
    }

    pub fn moments(&self) -> Moments {
        Moments {
            sample_count: self.sample_count,
            mean: self.mean,
            variance: self.variance,
            standard_deviation: self.standard_deviation,
            skewness: self.skewness,
            kurtosis: self.kurtosis,
        }
    }
}

/// How a snapshot describes the shape of its values
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Distribution {
    /// Every value, in insertion order
    Exact { values: Vec<f64> },
    /// Exported percentile and cardinality sketches
    Estimated {
        digest: DigestState,
        cardinality: CardinalityState,
    },
}

impl Default for Distribution {
    fn default() -> Self {
        Distribution::Exact { values: Vec::new() }
    }
}

/// Intermediate result of an [`ExtendedAccumulator`](super::ExtendedAccumulator)
///
/// Snapshots from disjoint shards are combined with
/// [`aggregate_extended`](super::aggregate_extended) and finalized with
/// [`calculate`](Self::calculate).
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ParallelStats {
    pub moments: Moments,
    pub distribution: Distribution,
}

impl ParallelStats {
    pub fn sample_count(&self) -> u64 {
        self.moments.sample_count
    }

    pub fn is_estimated(&self) -> bool {
        matches!(self.distribution, Distribution::Estimated { .. })
    }

    /// Finalize into [`ExtendedStats`], reporting the requested percentile ranks
    ///
    /// The median and interquartile range are always computed. Percentiles are
    /// exact (midpoint interpolation) for buffered values and read from the
    /// digest otherwise.
    ///
    /// # Errors
    ///
    /// [`StatsError::InvalidArgumentRange`](crate::StatsError::InvalidArgumentRange)
    /// for a rank above 100, or a decode error if the exported sketch state
    /// is malformed.
    pub fn calculate(&self, ranks: &[u8]) -> Result<ExtendedStats> {
        for &rank in ranks {
            check_rank(f64::from(rank))?;
        }

        let mut stats = ExtendedStats::from_moments(&self.moments);
        if self.moments.sample_count == 0 {
            return Ok(stats);
        }

        match &self.distribution {
            Distribution::Exact { values } => {
                let mut sorted = values.clone();
                sorted.sort_by(f64::total_cmp);
                stats.cardinality = values
                    .iter()
                    .map(|&v| canonical_bits(v))
                    .collect::<HashSet<_>>()
                    .len() as u64;
                fill_percentiles(&mut stats, ranks, |rank| {
                    if sorted.is_empty() {
                        return 0.0;
                    }
                    percentile_sorted(&sorted, f64::from(rank), Interpolation::Midpoint)
                });
            }
            Distribution::Estimated {
                digest,
                cardinality,
            } => {
                let digest = TDigest::from_state(digest.clone())?;
                let hll = HyperLogLog::from_state(cardinality.clone())?;
                stats.cardinality = hll.estimate().round() as u64;
                fill_percentiles(&mut stats, ranks, |rank| {
                    digest.percentile(f64::from(rank)).unwrap_or(0.0)
                });
            }
        }

        Ok(stats)
    }
}

fn fill_percentiles(stats: &mut ExtendedStats, ranks: &[u8], query: impl Fn(u8) -> f64) {
    let q1 = query(25);
    let median = query(50);
    let q3 = query(75);

    stats.median = median;
    stats.interquartile_range = q3 - q1;
    stats.percentiles = ranks
        .iter()
        .map(|&rank| {
            let value = match rank {
                25 => q1,
                50 => median,
                75 => q3,
                _ => query(rank),
            };
            (rank, value)
        })
        .collect();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StatsError;

    fn exact(values: &[f64]) -> ParallelStats {
        let mut acc = crate::statistics::MomentAccumulator::default();
        values.iter().for_each(|&v| acc.add(v));
        ParallelStats {
            moments: acc.snapshot(),
            distribution: Distribution::Exact {
                values: values.to_vec(),
            },
        }
    }

    #[test]
    fn test_default() {
        let stats = ExtendedStats::default();
        assert_eq!(stats.sample_count, 0);
        assert_eq!(stats.cardinality, 0);
        assert_eq!(stats.kurtosis, -3.0);
        assert!(stats.percentiles.is_empty());

        let snapshot = ParallelStats::default();
        assert!(!snapshot.is_estimated());
        assert_eq!(snapshot.calculate(&[50]).unwrap(), ExtendedStats::default());
    }

    #[test]
    fn test_exact_calculate() {
        let stats = exact(&[4.0, 1.0, 3.0, 2.0]).calculate(&[0, 50, 100]).unwrap();
        assert_eq!(stats.sample_count, 4);
        assert_eq!(stats.mean, 2.5);
        assert_eq!(stats.cardinality, 4);
        assert_eq!(stats.median, 2.5);
        // p25 = 1.5, p75 = 3.5
        assert_eq!(stats.interquartile_range, 2.0);
        assert_eq!(stats.percentiles[&0], 1.0);
        assert_eq!(stats.percentiles[&50], 2.5);
        assert_eq!(stats.percentiles[&100], 4.0);
    }

    #[test]
    fn test_exact_cardinality_folds_zero() {
        let stats = exact(&[0.0, -0.0, 1.0, 1.0]).calculate(&[]).unwrap();
        assert_eq!(stats.cardinality, 2);
    }

    #[test]
    fn test_rank_out_of_range() {
        let err = exact(&[1.0, 2.0]).calculate(&[50, 101]).unwrap_err();
        assert!(matches!(
            err,
            StatsError::InvalidArgumentRange { value, .. } if value == 101.0
        ));
    }

    #[test]
    fn test_estimated_calculate() {
        let mut digest = TDigest::new(100.0);
        let mut hll = HyperLogLog::new(14);
        let mut acc = crate::statistics::MomentAccumulator::default();
        for i in 0..10_000 {
            let v = i as f64;
            digest.add(v);
            hll.insert_f64(v);
            acc.add(v);
        }
        let snapshot = ParallelStats {
            moments: acc.snapshot(),
            distribution: Distribution::Estimated {
                digest: digest.to_state(),
                cardinality: hll.to_state(),
            },
        };
        assert!(snapshot.is_estimated());

        let stats = snapshot.calculate(&[25, 90]).unwrap();
        assert_eq!(stats.sample_count, 10_000);
        assert!((stats.cardinality as f64 - 10_000.0).abs() < 300.0, "{}", stats.cardinality);
        assert!((stats.median - 5000.0).abs() < 100.0, "median={}", stats.median);
        assert!((stats.percentiles[&90] - 9000.0).abs() < 100.0);
        assert!((stats.interquartile_range - 5000.0).abs() < 200.0);
    }

    #[test]
    fn test_quartiles_are_reused() {
        let stats = exact(&[1.0, 2.0, 3.0, 4.0, 5.0]).calculate(&[25, 50, 75]).unwrap();
        assert_eq!(stats.percentiles[&50], stats.median);
        assert_eq!(
            stats.percentiles[&75] - stats.percentiles[&25],
            stats.interquartile_range
        );
    }
}
