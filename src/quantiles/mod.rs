//! Quantile estimation
//!
//! # Algorithms
//!
//! - [`TDigest`]: Mergeable quantile sketch with high accuracy at extremes
//!
//! # Example
//!
//! ```
//! use opstats::quantiles::TDigest;
//! use opstats::traits::QuantileSketch;
//!
//! let mut digest = TDigest::default();
//! digest.add_batch([1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0]);
//!
//! println!("Median: {:?}", digest.median());
//! ```

mod tdigest;

pub use tdigest::{Centroid, DigestState, TDigest};
