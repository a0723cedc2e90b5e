//! Combining moments computed over disjoint shards
//!
//! Each shard's variance, skewness and kurtosis are turned back into central
//! sums (SS, SC, SQ) around the shard mean, shifted to the pooled mean, and
//! summed. The result is exactly the moments a single pass over the union
//! would have produced, regardless of shard order.

use tracing::trace;

use super::moments::{shape, Moments};
use crate::config::MomentConfig;

/// Central sums of one shard, rebuilt from its finished moments
struct ShardSums {
    n: f64,
    mean: f64,
    ss: f64,
    sc: f64,
    sq: f64,
}

impl ShardSums {
    fn from_moments(m: &Moments, config: MomentConfig) -> Self {
        let n = m.sample_count as f64;
        let ss = (m.sample_count - config.variance.divisor_offset()) as f64 * m.variance;

        let (sc, sq) = if ss > 0.0 {
            let bias = config.bias;
            let sc = m.skewness * ss.powf(1.5) / (bias.skew_factor(n) * n.sqrt());
            let sq = (m.kurtosis - bias.excess_offset(n)) * ss * ss / (bias.kurtosis_factor(n) * n);
            (sc, sq)
        } else {
            (0.0, 0.0)
        };

        Self {
            n,
            mean: m.mean,
            ss,
            sc,
            sq,
        }
    }
}

/// Combine moments previously computed over disjoint parts of one data set.
///
/// Entries with a zero sample count or non-finite fields are dropped. No
/// usable entries yield the zero [`Moments`]; a single entry is returned
/// unchanged. `config` must match the configuration the shards were computed
/// with.
///
/// # Example
///
/// ```
/// use opstats::config::MomentConfig;
/// use opstats::statistics::{aggregate_moments, Moments};
///
/// let shard = Moments::new(2, 1.0, 0.0, 0.0, -3.0);
/// let merged = aggregate_moments(&[shard, shard], MomentConfig::default());
/// assert_eq!(merged.sample_count, 4);
/// assert_eq!(merged.mean, 1.0);
/// assert_eq!(merged.kurtosis, -3.0);
/// ```
pub fn aggregate_moments<'a, I>(stats: I, config: MomentConfig) -> Moments
where
    I: IntoIterator<Item = &'a Moments>,
{
    let mut dropped = 0usize;
    let shards: Vec<&Moments> = stats
        .into_iter()
        .filter(|m| {
            let keep = m.sample_count > 0 && m.is_valid();
            dropped += usize::from(!keep);
            keep
        })
        .collect();

    if dropped > 0 {
        trace!(dropped, "ignoring empty or invalid moments");
    }

    match shards.as_slice() {
        [] => Moments::default(),
        [single] => **single,
        _ => pool(&shards, config),
    }
}

fn pool(shards: &[&Moments], config: MomentConfig) -> Moments {
    let sums: Vec<ShardSums> = shards
        .iter()
        .map(|m| ShardSums::from_moments(m, config))
        .collect();

    // First pass: pooled count and mean
    let count: u64 = shards.iter().map(|m| m.sample_count).sum();
    let n = count as f64;
    let mean = sums.iter().map(|s| s.mean * s.n).sum::<f64>() / n;

    // Remaining passes: central sums shifted to the pooled mean
    let mut ss = 0.0;
    let mut sc = 0.0;
    let mut sq = 0.0;
    for s in &sums {
        let dev = s.mean - mean;
        let dev2 = dev * dev;
        ss += s.ss + s.n * dev2;
        sc += s.sc + 3.0 * s.ss * dev + s.n * dev2 * dev;
        sq += s.sq + 4.0 * s.sc * dev + 6.0 * s.ss * dev2 + s.n * dev2 * dev2;
    }

    let divisor = (count - config.variance.divisor_offset()) as f64;
    let variance = ss / divisor;

    let (skewness, kurtosis) = shape(config.bias, n, ss, sc, sq);

    Moments::new(count, mean, variance, skewness, kurtosis)
}
