//! Extended statistics: moments plus cardinality and percentiles
//!
//! An [`ExtendedAccumulator`] tracks a stream exactly while it is small and
//! switches to a t-digest and a HyperLogLog once the configured number of
//! values is buffered. Its [`ParallelStats`] snapshots combine across shards
//! with [`aggregate_extended`], in any mix of exact and estimated shards, and
//! are finalized into [`ExtendedStats`].
//!
//! # Example
//!
//! ```
//! use opstats::config::{EstimateThreshold, ExtendedConfig};
//! use opstats::extended::{aggregate_extended, ExtendedAccumulator};
//!
//! let config = ExtendedConfig::default().with_threshold(EstimateThreshold::After(500));
//! let shards: Vec<_> = (0..4)
//!     .map(|shard| {
//!         let mut acc = ExtendedAccumulator::new(config).unwrap();
//!         for i in 0..(shard + 1) * 300 {
//!             acc.add(i as f64);
//!         }
//!         acc.get_parallel()
//!     })
//!     .collect();
//!
//! let merged = aggregate_extended(&shards, config.moments).unwrap();
//! let stats = merged.calculate(&[95, 99]).unwrap();
//! println!("median: {}, p99: {}", stats.median, stats.percentiles[&99]);
//! ```

mod accumulator;
mod aggregate;
mod estimators;
mod snapshot;

pub use accumulator::ExtendedAccumulator;
pub use aggregate::aggregate_extended;
pub use snapshot::{Distribution, ExtendedStats, ParallelStats};
