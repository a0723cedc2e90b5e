//! # Opstats
//!
//! Single-pass, mergeable descriptive statistics for Rust.
//!
//! Opstats computes statistics over streams too large to keep in memory and
//! over data split across workers. Every accumulator produces a partial
//! result that combines with partial results from disjoint shards into
//! exactly what a single pass over the whole data set would have produced.
//!
//! ## Features
//!
//! - **Moments**: Mean, variance, skewness and excess kurtosis with the
//!   extended Welford recurrence
//! - **Covariance**: Covariance and Pearson correlation of paired series
//! - **Extended statistics**: Distinct count, median, IQR and percentiles,
//!   exact for small streams and estimated with HyperLogLog and t-digest
//!   beyond a configurable threshold
//! - **Parallel aggregation**: Pure functions combine shard results in any
//!   order
//!
//! ## Quick Start
//!
//! ```rust
//! use opstats::prelude::*;
//!
//! let mut acc = MomentAccumulator::new(MomentConfig::default());
//! for v in [2.0, 8.0, 0.0, 4.0, 1.0, 9.0, 9.0, 0.0] {
//!     acc.add(v);
//! }
//! let moments = acc.get().unwrap();
//! assert_eq!(moments.mean, 4.125);
//! ```
//!
//! ## Distributed Computing
//!
//! Partial results are plain values. Ship them to one place and aggregate:
//!
//! ```rust
//! use opstats::prelude::*;
//!
//! let config = ExtendedConfig::default();
//! let mut worker1 = ExtendedAccumulator::new(config).unwrap();
//! let mut worker2 = ExtendedAccumulator::new(config).unwrap();
//!
//! // Each worker processes its partition
//! (0..100).for_each(|i| worker1.add(i as f64));
//! (100..200).for_each(|i| worker2.add(i as f64));
//!
//! let merged = aggregate_extended(
//!     &[worker1.get_parallel(), worker2.get_parallel()],
//!     config.moments,
//! )
//! .unwrap();
//! let stats = merged.calculate(&[90]).unwrap();
//! assert_eq!(stats.sample_count, 200);
//! assert_eq!(stats.cardinality, 200);
//! ```
//!
//! ## Feature Flags
//!
//! - `serde`: Serialization of results, snapshots, sketch state and configuration

#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod cardinality;
pub mod config;
pub mod error;
pub mod extended;
pub mod numeric;
pub mod percentile;
pub mod quantiles;
pub mod statistics;
pub mod traits;

pub mod prelude {
    pub use crate::traits::*;

    pub use crate::cardinality::HyperLogLog;
    pub use crate::config::{
        BiasCorrection, EstimateThreshold, ExtendedConfig, MomentConfig, VarianceMode,
    };
    pub use crate::error::{Result, StatsError};
    pub use crate::extended::{
        aggregate_extended, Distribution, ExtendedAccumulator, ExtendedStats, ParallelStats,
    };
    pub use crate::numeric::Datum;
    pub use crate::quantiles::TDigest;
    pub use crate::statistics::{
        aggregate_covariance, aggregate_moments, Covariance, CovarianceAccumulator,
        MomentAccumulator, Moments,
    };
}

pub use error::{Result, StatsError};
pub use extended::{ExtendedAccumulator, ExtendedStats, ParallelStats};
pub use statistics::{CovarianceAccumulator, MomentAccumulator, Moments};
