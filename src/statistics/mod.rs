//! Exact moment statistics for streaming data
//!
//! This module provides single-pass accumulators for mean, variance, skewness,
//! kurtosis and covariance, and pure functions that combine results computed
//! over disjoint shards into the result for the whole data set.
//!
//! # Example
//!
//! ```
//! use opstats::config::MomentConfig;
//! use opstats::statistics::{aggregate_moments, MomentAccumulator};
//!
//! let config = MomentConfig::default();
//! let shards: Vec<_> = [[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]
//!     .iter()
//!     .map(|values| {
//!         let mut acc = MomentAccumulator::new(config);
//!         for &v in values {
//!             acc.add(v);
//!         }
//!         acc.get().unwrap()
//!     })
//!     .collect();
//!
//! let total = aggregate_moments(&shards, config);
//! println!("Mean: {}", total.mean);
//! println!("Kurtosis: {}", total.kurtosis);
//! ```

mod aggregate;
mod covariance;
mod moments;

pub use aggregate::aggregate_moments;
pub use covariance::{aggregate_covariance, Covariance, CovarianceAccumulator};
pub use moments::{MomentAccumulator, Moments};
