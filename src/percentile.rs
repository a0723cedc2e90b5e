//! Exact percentiles over fully materialised data
//!
//! Used by the extended accumulator while it still holds raw values, and as
//! the reference when checking the estimated percentiles.

use crate::error::{Result, StatsError};

/// How to resolve a rank that falls between two elements
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Interpolation {
    /// Average of the two bracketing elements
    #[default]
    Midpoint,
    /// The upper of the two bracketing elements
    Higher,
}

/// Compute the percentile at `rank` (0 to 100) of `values`.
///
/// The input does not need to be sorted. An empty slice yields 0.
///
/// # Errors
///
/// [`StatsError::InvalidArgumentRange`] if `rank` is outside [0, 100].
///
/// # Example
///
/// ```
/// use opstats::percentile::{percentile, Interpolation};
///
/// let values = [4.0, 1.0, 3.0, 2.0];
/// assert_eq!(percentile(&values, 50.0, Interpolation::Midpoint).unwrap(), 2.5);
/// assert_eq!(percentile(&values, 0.0, Interpolation::Midpoint).unwrap(), 1.0);
/// assert_eq!(percentile(&values, 100.0, Interpolation::Midpoint).unwrap(), 4.0);
/// ```
pub fn percentile(values: &[f64], rank: f64, method: Interpolation) -> Result<f64> {
    check_rank(rank)?;
    if values.is_empty() {
        return Ok(0.0);
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    Ok(percentile_sorted(&sorted, rank, method))
}

/// Percentile of an already sorted, non-empty slice with a validated rank
pub(crate) fn percentile_sorted(sorted: &[f64], rank: f64, method: Interpolation) -> f64 {
    let last = sorted.len() - 1;
    if rank <= 0.0 {
        return sorted[0];
    }
    if rank >= 100.0 {
        return sorted[last];
    }

    let ix = rank / 100.0 * last as f64;
    let lower = ix.floor() as usize;
    match method {
        Interpolation::Higher => sorted[(ix.ceil() as usize).min(last)],
        Interpolation::Midpoint => {
            if ix.fract() == 0.0 {
                sorted[lower]
            } else {
                (sorted[lower] + sorted[lower + 1]) / 2.0
            }
        }
    }
}

pub(crate) fn check_rank(rank: f64) -> Result<()> {
    if (0.0..=100.0).contains(&rank) {
        Ok(())
    } else {
        Err(StatsError::InvalidArgumentRange {
            name: "percentile",
            value: rank,
            min: 0.0,
            max: 100.0,
        })
    }
}
