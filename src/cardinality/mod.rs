//! Distinct-value counting
//!
//! [`HyperLogLog`] estimates how many different values a stream contains in
//! fixed memory. The helpers here translate between a target relative error
//! and the register precision.
//!
//! ```
//! use opstats::cardinality::{precision_for_error, HyperLogLog};
//! use opstats::traits::CardinalitySketch;
//!
//! let mut hll = HyperLogLog::new(precision_for_error(0.02));
//! (0..5_000).for_each(|i| hll.insert_f64(f64::from(i % 1_000)));
//! println!("~{} distinct values", hll.estimate());
//! ```

mod hyperloglog;

pub use hyperloglog::{CardinalityState, HyperLogLog};

/// Register precision needed for a relative standard error of `target_error`
///
/// The error of `2^p` registers is about `1.04 / sqrt(2^p)`; the result is
/// clamped to the supported 4..=18.
pub fn precision_for_error(target_error: f64) -> u8 {
    let registers = (1.04 / target_error).powi(2);
    registers.log2().ceil().clamp(4.0, 18.0) as u8
}

/// Relative standard error of a counter with `2^precision` registers
pub fn error_for_precision(precision: u8) -> f64 {
    1.04 / f64::from(1u32 << precision).sqrt()
}

/// Identity of a value for distinct counting: its bits, with `-0.0` as `0.0`
pub(crate) fn canonical_bits(value: f64) -> u64 {
    // -0.0 == 0.0, so this also rewrites negative zero
    if value == 0.0 {
        0
    } else {
        value.to_bits()
    }
}
