//! Hybrid exact/estimated accumulator

use tracing::debug;

use super::estimators::Estimators;
use super::{Distribution, ExtendedStats, ParallelStats};
use crate::config::ExtendedConfig;
use crate::error::Result;
use crate::numeric::{to_numeric, Datum};
use crate::statistics::MomentAccumulator;

#[derive(Clone, Debug)]
enum State {
    /// Values are kept for exact percentiles and cardinality
    Buffering(Vec<f64>),
    /// Values go straight into the sketches
    Estimating(Estimators),
}

/// Accumulates moments, cardinality and percentiles of a stream
///
/// Values are buffered until the configured threshold is reached. At that
/// point the buffer is replayed into a t-digest and a HyperLogLog and
/// discarded; the switch is one-way. Moments are exact in both states.
///
/// # Example
///
/// ```
/// use opstats::config::{EstimateThreshold, ExtendedConfig};
/// use opstats::extended::ExtendedAccumulator;
///
/// let config = ExtendedConfig::default().with_threshold(EstimateThreshold::After(100));
/// let mut acc = ExtendedAccumulator::new(config).unwrap();
///
/// for i in 0..1000 {
///     acc.add((i % 250) as f64);
/// }
/// assert!(acc.is_estimating());
///
/// let stats = acc.get(&[90]).unwrap();
/// assert_eq!(stats.sample_count, 1000);
/// assert!((stats.median - 125.0).abs() < 10.0);
/// ```
#[derive(Clone, Debug)]
pub struct ExtendedAccumulator {
    config: ExtendedConfig,
    threshold: usize,
    moments: MomentAccumulator,
    state: State,
}

impl ExtendedAccumulator {
    /// Create an accumulator
    ///
    /// # Errors
    ///
    /// [`StatsError::InvalidArgument`](crate::StatsError::InvalidArgument) if
    /// the error rate or compression is out of range.
    pub fn new(config: ExtendedConfig) -> Result<Self> {
        config.validate()?;

        let threshold = config.threshold();
        let state = if threshold == 0 {
            State::Estimating(Estimators::new(&config))
        } else {
            State::Buffering(Vec::new())
        };

        Ok(Self {
            config,
            threshold,
            moments: MomentAccumulator::new(config.moments),
            state,
        })
    }

    pub fn config(&self) -> &ExtendedConfig {
        &self.config
    }

    /// Add a value; NaN is ignored
    pub fn add(&mut self, value: f64) {
        if value.is_nan() {
            return;
        }
        self.moments.add(value);

        let full = match &mut self.state {
            State::Buffering(values) => {
                values.push(value);
                values.len() >= self.threshold
            }
            State::Estimating(estimators) => {
                estimators.add(value);
                false
            }
        };

        if full {
            self.start_estimating();
        }
    }

    /// Coerce and add a loosely typed value; nulls are skipped
    pub fn add_datum(&mut self, value: &Datum) -> Result<()> {
        if let Some(number) = to_numeric(value)? {
            self.add(number.as_f64());
        }
        Ok(())
    }

    fn start_estimating(&mut self) {
        let mut estimators = Estimators::new(&self.config);
        if let State::Buffering(values) = &self.state {
            debug!(
                threshold = self.threshold,
                buffered = values.len(),
                "switching to estimation"
            );
            estimators.extend(values.iter().copied());
        }
        self.state = State::Estimating(estimators);
    }

    /// Whether cardinality and percentiles are being estimated
    pub fn is_estimating(&self) -> bool {
        matches!(self.state, State::Estimating(_))
    }

    /// Number of values added
    pub fn len(&self) -> u64 {
        self.moments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.moments.is_empty()
    }

    /// Mergeable snapshot of the current state
    pub fn get_parallel(&self) -> ParallelStats {
        let distribution = match &self.state {
            State::Buffering(values) => Distribution::Exact {
                values: values.clone(),
            },
            State::Estimating(estimators) => estimators.to_distribution(),
        };

        ParallelStats {
            moments: self.moments.snapshot(),
            distribution,
        }
    }

    /// Finalized statistics with the requested percentile ranks
    pub fn get(&self, ranks: &[u8]) -> Result<ExtendedStats> {
        self.get_parallel().calculate(ranks)
    }
}
