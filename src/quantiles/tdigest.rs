//! t-digest quantile estimator
//!
//! Implementation of the merging t-digest for streaming quantile estimation.
//! Values are buffered and periodically folded into centroids sized by the
//! arcsine scale function, which keeps the tails (p01, p99) precise. The
//! centroid list can be exported as a [`DigestState`] and rebuilt, which is how
//! partial results travel between workers.
//!
//! Queries take `&self`: if values are still buffered, the query compresses a
//! temporary copy instead of mutating the digest, so a digest can be shared
//! across threads for reading.

use std::borrow::Cow;

use crate::traits::{DecodeError, MergeError, QuantileSketch, Sketch};

/// A cluster of nearby values summarized by their mean
///
/// Serializes as a `(mean, weight)` pair.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Centroid {
    pub mean: f64,
    /// Number of values merged into this centroid
    pub weight: u64,
}

impl Centroid {
    pub fn new(mean: f64, weight: u64) -> Self {
        Self { mean, weight }
    }

    /// Absorb `count` copies of `value`, updating the weighted mean
    fn absorb(&mut self, value: f64, count: u64) {
        self.weight += count;
        self.mean += (value - self.mean) * count as f64 / self.weight as f64;
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Centroid {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        (self.mean, self.weight).serialize(serializer)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Centroid {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let (mean, weight) = <(f64, u64)>::deserialize(deserializer)?;
        Ok(Centroid { mean, weight })
    }
}

/// Exported state of a [`TDigest`]
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DigestState {
    pub compression: f64,
    /// Centroids sorted by mean
    pub centroids: Vec<Centroid>,
    pub min: f64,
    pub max: f64,
}

/// Streaming percentile estimator
///
/// `compression` bounds the number of centroids (roughly `compression / 2`
/// after a full compression pass); larger values trade memory for accuracy.
/// Percentiles use the midpoints of centroids as interpolation anchors, with
/// the exact minimum and maximum at the ends.
///
/// # Example
///
/// ```
/// use opstats::quantiles::TDigest;
/// use opstats::traits::QuantileSketch;
///
/// let mut digest = TDigest::new(100.0);
/// digest.add_batch((0..2_000).map(|i| f64::from(i) / 2.0));
///
/// let p95 = digest.percentile(95.0).unwrap();
/// assert!((p95 - 950.0).abs() < 10.0);
/// assert_eq!(digest.max(), Some(999.5));
/// ```
#[derive(Clone, Debug)]
pub struct TDigest {
    compression: f64,
    /// Compressed centroids, sorted by mean
    centroids: Vec<Centroid>,
    /// Values not yet folded into centroids
    buffer: Vec<f64>,
    buffer_capacity: usize,
    /// Total count of values
    count: u64,
    min: f64,
    max: f64,
}

impl TDigest {
    /// # Panics
    ///
    /// Panics if `compression` is not a positive finite number.
    pub fn new(compression: f64) -> Self {
        assert!(
            compression > 0.0 && compression.is_finite(),
            "compression must be a positive finite number, got {}",
            compression
        );

        let buffer_capacity = ((compression * 2.0) as usize).max(1);
        Self {
            compression,
            centroids: Vec::new(),
            buffer: Vec::new(),
            buffer_capacity,
            count: 0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }

    /// Rebuild a digest from exported state
    pub fn from_state(state: DigestState) -> Result<Self, DecodeError> {
        if !(state.compression.is_finite() && state.compression > 0.0) {
            return Err(DecodeError::InvalidParameter(format!(
                "compression must be finite and positive, found {}",
                state.compression
            )));
        }

        let mut centroids = state.centroids;
        if let Some(bad) = centroids
            .iter()
            .find(|c| c.weight == 0 || !c.mean.is_finite())
        {
            return Err(DecodeError::Corrupted(format!(
                "invalid centroid (mean={}, weight={})",
                bad.mean, bad.weight
            )));
        }
        let count = centroids
            .iter()
            .try_fold(0u64, |total, c| total.checked_add(c.weight))
            .ok_or_else(|| DecodeError::Corrupted("total centroid weight overflows u64".into()))?;
        centroids.sort_by(|a, b| a.mean.total_cmp(&b.mean));

        let mut digest = Self::new(state.compression);
        digest.count = count;
        if let (Some(first), Some(last)) = (centroids.first(), centroids.last()) {
            // fall back to the outer centroid means when the bounds are missing
            digest.min = if state.min <= first.mean { state.min } else { first.mean };
            digest.max = if state.max >= last.mean { state.max } else { last.mean };
        }
        digest.centroids = centroids;
        Ok(digest)
    }

    /// Export the compressed centroid list with the observed range
    pub fn to_state(&self) -> DigestState {
        DigestState {
            compression: self.compression,
            centroids: self.merged().into_owned(),
            min: self.min,
            max: self.max,
        }
    }

    pub fn compression(&self) -> f64 {
        self.compression
    }

    /// Add a value; NaN is ignored
    pub fn add(&mut self, value: f64) {
        if value.is_nan() {
            return;
        }

        self.buffer.push(value);
        self.count += 1;
        if value < self.min {
            self.min = value;
        }
        if value > self.max {
            self.max = value;
        }

        if self.buffer.len() >= self.buffer_capacity {
            self.compress();
        }
    }

    /// Add every value of a batch
    pub fn add_batch<I: IntoIterator<Item = f64>>(&mut self, values: I) {
        for value in values {
            self.add(value);
        }
    }

    /// Fold the buffer into the centroids
    pub fn compress(&mut self) {
        if self.buffer.is_empty() {
            return;
        }
        let buffer = std::mem::take(&mut self.buffer);
        let centroids = std::mem::take(&mut self.centroids);
        self.centroids = Self::fold(centroids, &buffer, self.compression);
        self.buffer = buffer;
        self.buffer.clear();
    }

    /// Centroids including buffered values, compressing a copy if needed
    fn merged(&self) -> Cow<'_, [Centroid]> {
        if self.buffer.is_empty() {
            Cow::Borrowed(&self.centroids)
        } else {
            Cow::Owned(Self::fold(self.centroids.clone(), &self.buffer, self.compression))
        }
    }

    fn fold(mut centroids: Vec<Centroid>, values: &[f64], compression: f64) -> Vec<Centroid> {
        centroids.extend(values.iter().map(|&v| Centroid::new(v, 1)));
        centroids.sort_by(|a, b| a.mean.total_cmp(&b.mean));
        Self::compress_sorted(centroids, compression)
    }

    /// Merge adjacent centroids while they fit within one unit of the scale function
    fn compress_sorted(sorted: Vec<Centroid>, compression: f64) -> Vec<Centroid> {
        let mut iter = sorted.into_iter();
        let Some(mut current) = iter.next() else {
            return Vec::new();
        };

        let rest: Vec<Centroid> = iter.collect();
        let total_weight = current.weight + rest.iter().map(|c| c.weight).sum::<u64>();
        let total = total_weight as f64;
        let mut merged = Vec::new();
        let mut closed = 0u64;

        for centroid in rest {
            let q_start = closed as f64 / total;
            let q_end = (closed + current.weight + centroid.weight) as f64 / total;

            if Self::scale(q_end, compression) - Self::scale(q_start, compression) <= 1.0 {
                current.absorb(centroid.mean, centroid.weight);
            } else {
                closed += current.weight;
                merged.push(current);
                current = centroid;
            }
        }

        merged.push(current);
        merged
    }

    /// Arcsine scale function; the argument is clamped against float drift
    #[inline]
    fn scale(q: f64, compression: f64) -> f64 {
        let centered = (2.0 * q - 1.0).clamp(-1.0, 1.0);
        compression * (0.5 + centered.asin() / std::f64::consts::PI)
    }

    /// Anchors of the piecewise-linear CDF model: `(rank, value)` pairs at
    /// (0, min), each centroid's midpoint, and (count, max).
    fn anchors<'c>(&self, centroids: &'c [Centroid]) -> impl Iterator<Item = (f64, f64)> + 'c {
        let min = self.min;
        let max = self.max;
        let count = self.count as f64;
        let mut cumulative = 0.0;
        std::iter::once((0.0, min))
            .chain(centroids.iter().map(move |c| {
                let mid = cumulative + c.weight as f64 / 2.0;
                cumulative += c.weight as f64;
                (mid, c.mean)
            }))
            .chain(std::iter::once((count, max)))
    }

    fn quantile_of(&self, centroids: &[Centroid], q: f64) -> f64 {
        if q <= 0.0 {
            return self.min;
        }
        if q >= 1.0 {
            return self.max;
        }

        let target = q * self.count as f64;
        let mut prev = (0.0, self.min);
        for (rank, value) in self.anchors(centroids).skip(1) {
            if target < rank {
                let span = rank - prev.0;
                if span <= 0.0 {
                    return prev.1;
                }
                let t = (target - prev.0) / span;
                return prev.1 + t * (value - prev.1);
            }
            prev = (rank, value);
        }
        self.max
    }

    fn rank_of(&self, centroids: &[Centroid], value: f64) -> f64 {
        // >= max first so a constant stream reports rank 1 at its value
        if value >= self.max {
            return 1.0;
        }
        if value <= self.min {
            return 0.0;
        }

        let count = self.count as f64;
        let mut prev = (0.0, self.min);
        for (rank, mean) in self.anchors(centroids).skip(1) {
            if value < mean {
                let span = mean - prev.1;
                if span <= 0.0 {
                    return prev.0 / count;
                }
                let t = (value - prev.1) / span;
                return (prev.0 + t * (rank - prev.0)) / count;
            }
            prev = (rank, mean);
        }
        1.0
    }
}

impl Default for TDigest {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_COMPRESSION)
    }
}

impl Sketch for TDigest {
    fn insert(&mut self, value: f64) {
        self.add(value);
    }

    fn merge(&mut self, other: &Self) -> Result<(), MergeError> {
        // tolerate float drift from a serialization round trip
        let scale = self.compression.max(other.compression);
        if (self.compression - other.compression).abs() > 1e-6 * scale {
            return Err(MergeError::IncompatibleConfig {
                expected: format!("compression={}", self.compression),
                found: format!("compression={}", other.compression),
            });
        }

        let mut all = std::mem::take(&mut self.centroids);
        all.extend_from_slice(&other.centroids);
        all.extend(self.buffer.drain(..).map(|v| Centroid::new(v, 1)));
        all.extend(other.buffer.iter().map(|&v| Centroid::new(v, 1)));
        all.sort_by(|a, b| a.mean.total_cmp(&b.mean));

        self.count += other.count;
        self.min = f64::min(self.min, other.min);
        self.max = f64::max(self.max, other.max);
        self.centroids = Self::compress_sorted(all, self.compression);
        Ok(())
    }

    fn clear(&mut self) {
        self.centroids.clear();
        self.buffer.clear();
        self.count = 0;
        self.min = f64::INFINITY;
        self.max = f64::NEG_INFINITY;
    }

    fn size_bytes(&self) -> usize {
        std::mem::size_of::<Self>()
            + std::mem::size_of_val(self.centroids.as_slice())
            + std::mem::size_of_val(self.buffer.as_slice())
    }

    fn count(&self) -> u64 {
        self.count
    }
}

impl QuantileSketch for TDigest {
    fn quantile(&self, rank: f64) -> Option<f64> {
        if self.count == 0 {
            return None;
        }
        Some(self.quantile_of(&self.merged(), rank))
    }

    fn rank(&self, value: f64) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        self.rank_of(&self.merged(), value)
    }

    fn min(&self) -> Option<f64> {
        (self.count > 0).then_some(self.min)
    }

    fn max(&self) -> Option<f64> {
        (self.count > 0).then_some(self.max)
    }
}
