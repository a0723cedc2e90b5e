//! HyperLogLog distinct-value counter
//!
//! Each value is hashed with xxh3; the top `p` bits pick one of `2^p`
//! registers and the register keeps the longest run of leading zeros seen in
//! the remaining bits. Small cardinalities fall back to linear counting over
//! the empty registers. The registers can be exported as a
//! [`CardinalityState`] and rebuilt on another worker.

use super::{canonical_bits, error_for_precision, precision_for_error};
use crate::traits::{CardinalitySketch, DecodeError, ErrorBounds, MergeError, Sketch};
use xxhash_rust::xxh3::xxh3_64;

const PRECISION_RANGE: std::ops::RangeInclusive<u8> = 4..=18;

/// Two-sided z-scores for common confidence levels, highest first
const Z_SCORES: [(f64, f64); 4] = [(0.99, 2.576), (0.95, 1.96), (0.90, 1.645), (0.80, 1.282)];

/// Exported register state of a [`HyperLogLog`]
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CardinalityState {
    pub precision: u8,
    pub registers: Vec<u8>,
    /// Number of insertions, including duplicates
    pub count: u64,
}

/// Distinct-value counter over `f64` keys
///
/// Uses `2^precision` one-byte registers; the relative standard error is
/// about `1.04 / sqrt(2^precision)`, so precision 14 (16 KiB) gives roughly
/// 0.8%.
///
/// Values are keyed by their bit pattern with `-0.0` folded into `0.0`, the
/// same identity the exact distinct count uses.
///
/// # Example
///
/// ```
/// use opstats::cardinality::HyperLogLog;
/// use opstats::traits::CardinalitySketch;
///
/// let mut hll = HyperLogLog::new(12);
/// for i in 0..10_000 {
///     hll.insert_f64((i % 2_500) as f64);
/// }
///
/// let distinct = hll.estimate();
/// assert!((distinct - 2_500.0).abs() < 250.0);
/// ```
#[derive(Clone, Debug)]
pub struct HyperLogLog {
    precision: u8,
    registers: Vec<u8>,
    count: u64,
}

impl HyperLogLog {
    /// # Panics
    ///
    /// Panics if `precision` is outside 4..=18.
    pub fn new(precision: u8) -> Self {
        assert!(
            PRECISION_RANGE.contains(&precision),
            "precision must be between 4 and 18, got {}",
            precision
        );
        Self {
            precision,
            registers: vec![0; 1 << precision],
            count: 0,
        }
    }

    /// Smallest precision whose standard error is at most `target_error`
    pub fn with_error(target_error: f64) -> Self {
        Self::new(precision_for_error(target_error))
    }

    /// Rebuild a counter from exported state
    pub fn from_state(state: CardinalityState) -> Result<Self, DecodeError> {
        let precision = state.precision;
        if !PRECISION_RANGE.contains(&precision) {
            return Err(DecodeError::InvalidParameter(format!(
                "precision must be between 4 and 18, found {}",
                precision
            )));
        }

        let expected = 1usize << precision;
        if state.registers.len() != expected {
            return Err(DecodeError::LengthMismatch {
                expected,
                found: state.registers.len(),
            });
        }

        let ceiling = max_register(precision);
        if let Some(&value) = state.registers.iter().find(|&&r| r > ceiling) {
            return Err(DecodeError::Corrupted(format!(
                "register value {} exceeds {} for precision {}",
                value, ceiling, precision
            )));
        }

        Ok(Self {
            precision,
            registers: state.registers,
            count: state.count,
        })
    }

    pub fn to_state(&self) -> CardinalityState {
        CardinalityState {
            precision: self.precision,
            registers: self.registers.clone(),
            count: self.count,
        }
    }

    pub fn precision(&self) -> u8 {
        self.precision
    }

    pub fn insert_f64(&mut self, value: f64) {
        self.observe(xxh3_64(&canonical_bits(value).to_le_bytes()));
    }

    fn observe(&mut self, hash: u64) {
        self.count += 1;

        let p = u32::from(self.precision);
        let index = (hash >> (64 - p)) as usize;
        // sentinel bit caps the run length at 64 - p
        let rest = (hash << p) | (1u64 << (p - 1));
        let run = rest.leading_zeros() as u8 + 1;

        let register = &mut self.registers[index];
        *register = (*register).max(run);
    }
}

/// Largest value a register can hold at `precision`
fn max_register(precision: u8) -> u8 {
    64 - precision + 1
}

/// Bias-correction constant for `m` registers
fn alpha(m: usize) -> f64 {
    match m {
        16 => 0.673,
        32 => 0.697,
        64 => 0.709,
        _ => 0.7213 / (1.0 + 1.079 / m as f64),
    }
}

impl Sketch for HyperLogLog {
    fn insert(&mut self, value: f64) {
        self.insert_f64(value);
    }

    fn merge(&mut self, other: &Self) -> Result<(), MergeError> {
        if other.precision != self.precision {
            return Err(MergeError::IncompatibleConfig {
                expected: format!("precision={}", self.precision),
                found: format!("precision={}", other.precision),
            });
        }

        self.registers
            .iter_mut()
            .zip(&other.registers)
            .for_each(|(mine, &theirs)| *mine = (*mine).max(theirs));
        self.count += other.count;
        Ok(())
    }

    fn clear(&mut self) {
        self.registers.iter_mut().for_each(|r| *r = 0);
        self.count = 0;
    }

    fn size_bytes(&self) -> usize {
        std::mem::size_of::<Self>() + self.registers.capacity()
    }

    fn count(&self) -> u64 {
        self.count
    }
}

impl CardinalitySketch for HyperLogLog {
    fn estimate(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }

        let m = self.registers.len() as f64;
        let (harmonic, empty) = self
            .registers
            .iter()
            .fold((0.0, 0usize), |(sum, empty), &r| {
                (sum + (-f64::from(r)).exp2(), empty + usize::from(r == 0))
            });
        let raw = alpha(self.registers.len()) * m * m / harmonic;

        // linear counting is more accurate while many registers are still empty
        if raw <= 2.5 * m && empty > 0 {
            let linear = m * (m / empty as f64).ln();
            if linear <= 2.5 * m {
                return linear;
            }
        }
        raw
    }

    fn error_bounds(&self, confidence: f64) -> ErrorBounds {
        let estimate = self.estimate();
        let z = Z_SCORES
            .iter()
            .find(|&&(level, _)| confidence >= level)
            .map_or(1.0, |&(_, z)| z);
        let margin = z * self.relative_error() * estimate;

        ErrorBounds::new((estimate - margin).max(0.0), estimate, estimate + margin, confidence)
    }

    fn relative_error(&self) -> f64 {
        error_for_precision(self.precision)
    }
}
