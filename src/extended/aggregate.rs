//! Combining extended snapshots from disjoint shards

use tracing::{debug, trace};

use super::estimators::Estimators;
use super::{Distribution, ParallelStats};
use crate::config::MomentConfig;
use crate::error::Result;
use crate::statistics::aggregate_moments;

/// Combine snapshots computed over disjoint parts of one data set.
///
/// Moments are pooled with [`aggregate_moments`]. Distributions stay exact
/// while every shard is exact; as soon as one shard carries sketches, the
/// combined result switches to estimation and buffered values from the other
/// shards are replayed into the merged sketches. Entries with a zero sample
/// count or invalid moments are dropped.
///
/// # Errors
///
/// Fails when shards were built with incompatible sketch parameters or carry
/// malformed sketch state.
///
/// # Example
///
/// ```
/// use opstats::config::{ExtendedConfig, MomentConfig};
/// use opstats::extended::{aggregate_extended, ExtendedAccumulator};
///
/// let mut left = ExtendedAccumulator::new(ExtendedConfig::default()).unwrap();
/// let mut right = ExtendedAccumulator::new(ExtendedConfig::default()).unwrap();
/// [1.0, 2.0].iter().for_each(|&v| left.add(v));
/// [3.0, 4.0].iter().for_each(|&v| right.add(v));
///
/// let merged = aggregate_extended(
///     &[left.get_parallel(), right.get_parallel()],
///     MomentConfig::default(),
/// )
/// .unwrap();
/// let stats = merged.calculate(&[]).unwrap();
/// assert_eq!(stats.median, 2.5);
/// assert_eq!(stats.cardinality, 4);
/// ```
pub fn aggregate_extended<'a, I>(stats: I, config: MomentConfig) -> Result<ParallelStats>
where
    I: IntoIterator<Item = &'a ParallelStats>,
{
    let mut dropped = 0usize;
    let shards: Vec<&ParallelStats> = stats
        .into_iter()
        .filter(|s| {
            let keep = s.moments.sample_count > 0 && s.moments.is_valid();
            dropped += usize::from(!keep);
            keep
        })
        .collect();

    if dropped > 0 {
        trace!(dropped, "ignoring empty or invalid snapshots");
    }

    match shards.as_slice() {
        [] => return Ok(ParallelStats::default()),
        [single] => return Ok((*single).clone()),
        _ => {}
    }

    let moments = aggregate_moments(shards.iter().map(|s| &s.moments), config);

    let mut pending: Vec<f64> = Vec::new();
    let mut estimators: Option<Estimators> = None;
    for shard in &shards {
        match &shard.distribution {
            Distribution::Exact { values } => match estimators.as_mut() {
                Some(est) => est.extend(values.iter().copied()),
                None => pending.extend_from_slice(values),
            },
            Distribution::Estimated {
                digest,
                cardinality,
            } => match estimators.as_mut() {
                Some(est) => est.merge_states(digest, cardinality)?,
                None => {
                    let mut est = Estimators::from_states(digest, cardinality)?;
                    debug!(backfilled = pending.len(), "combined snapshot switched to estimation");
                    est.extend(pending.drain(..));
                    estimators = Some(est);
                }
            },
        }
    }

    let distribution = match estimators {
        Some(est) => est.to_distribution(),
        None => Distribution::Exact { values: pending },
    };

    Ok(ParallelStats {
        moments,
        distribution,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EstimateThreshold, ExtendedConfig};
    use crate::extended::ExtendedAccumulator;
    use crate::statistics::Moments;
    use crate::StatsError;

    fn snapshot(
        values: impl IntoIterator<Item = f64>,
        threshold: EstimateThreshold,
    ) -> ParallelStats {
        let config = ExtendedConfig::default().with_threshold(threshold);
        let mut acc = ExtendedAccumulator::new(config).unwrap();
        values.into_iter().for_each(|v| acc.add(v));
        acc.get_parallel()
    }

    #[test]
    fn test_empty_and_single() {
        let none: [ParallelStats; 0] = [];
        let merged = aggregate_extended(&none, MomentConfig::default()).unwrap();
        assert_eq!(merged, ParallelStats::default());

        let only = snapshot([1.0, 2.0, 3.0], EstimateThreshold::Immediate);
        let merged = aggregate_extended(&[only.clone()], MomentConfig::default()).unwrap();
        assert_eq!(merged, only);
    }

    #[test]
    fn test_filters_empty_and_invalid() {
        let valid = snapshot([1.0, 2.0], EstimateThreshold::FromErrorRate);
        let invalid = ParallelStats {
            moments: Moments::new(2, f64::NAN, 1.0, 0.0, 0.0),
            ..ParallelStats::default()
        };
        let merged = aggregate_extended(
            &[ParallelStats::default(), valid.clone(), invalid],
            MomentConfig::default(),
        )
        .unwrap();
        assert_eq!(merged, valid);
    }

    #[test]
    fn test_all_exact_stays_exact() {
        let a = snapshot([1.0, 2.0], EstimateThreshold::FromErrorRate);
        let b = snapshot([3.0, 4.0, 5.0], EstimateThreshold::FromErrorRate);
        let merged = aggregate_extended(&[a, b], MomentConfig::default()).unwrap();
        assert_eq!(merged.sample_count(), 5);
        assert_eq!(
            merged.distribution,
            Distribution::Exact {
                values: vec![1.0, 2.0, 3.0, 4.0, 5.0]
            }
        );
    }

    #[test]
    fn test_mixed_shards_ratchet_to_estimation() {
        let exact_first = snapshot((0..300).map(f64::from), EstimateThreshold::FromErrorRate);
        let estimated = snapshot((300..700).map(f64::from), EstimateThreshold::Immediate);
        let exact_last = snapshot((700..1000).map(f64::from), EstimateThreshold::FromErrorRate);

        let merged = aggregate_extended(
            &[exact_first, estimated, exact_last],
            MomentConfig::default(),
        )
        .unwrap();
        assert!(merged.is_estimated());
        assert_eq!(merged.sample_count(), 1000);
        assert!((merged.moments.mean - 499.5).abs() < 1e-9);

        match &merged.distribution {
            Distribution::Estimated { digest, cardinality } => {
                assert_eq!(cardinality.count, 1000);
                assert_eq!(digest.min, 0.0);
                assert_eq!(digest.max, 999.0);
            }
            Distribution::Exact { .. } => panic!("expected estimated snapshot"),
        }

        let stats = merged.calculate(&[]).unwrap();
        assert!((stats.median - 499.5).abs() < 20.0, "median={}", stats.median);
        assert!((stats.cardinality as f64 - 1000.0).abs() < 30.0);
    }

    #[test]
    fn test_incompatible_sketches() {
        let a = snapshot([1.0, 2.0], EstimateThreshold::Immediate);
        let config = ExtendedConfig::default()
            .with_threshold(EstimateThreshold::Immediate)
            .with_compression(200.0);
        let mut acc = ExtendedAccumulator::new(config).unwrap();
        acc.add(3.0);
        acc.add(4.0);

        let err =
            aggregate_extended(&[a, acc.get_parallel()], MomentConfig::default()).unwrap_err();
        assert!(matches!(err, StatsError::Merge(_)));
    }
}
