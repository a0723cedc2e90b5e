//! The sketch pair used once a distribution is too large to keep exactly

use crate::cardinality::{CardinalityState, HyperLogLog};
use crate::config::ExtendedConfig;
use crate::error::Result;
use crate::quantiles::{DigestState, TDigest};
use crate::traits::Sketch;

use super::Distribution;

#[derive(Clone, Debug)]
pub(crate) struct Estimators {
    pub(crate) digest: TDigest,
    pub(crate) cardinality: HyperLogLog,
}

impl Estimators {
    /// Fresh sketches sized by a validated configuration
    pub(crate) fn new(config: &ExtendedConfig) -> Self {
        Self {
            digest: TDigest::new(config.compression),
            cardinality: HyperLogLog::with_error(config.error_rate),
        }
    }

    pub(crate) fn from_states(
        digest: &DigestState,
        cardinality: &CardinalityState,
    ) -> Result<Self> {
        Ok(Self {
            digest: TDigest::from_state(digest.clone())?,
            cardinality: HyperLogLog::from_state(cardinality.clone())?,
        })
    }

    pub(crate) fn add(&mut self, value: f64) {
        self.digest.add(value);
        self.cardinality.insert_f64(value);
    }

    pub(crate) fn extend<I: IntoIterator<Item = f64>>(&mut self, values: I) {
        for value in values {
            self.add(value);
        }
    }

    /// Merge exported sketch states into these sketches
    pub(crate) fn merge_states(
        &mut self,
        digest: &DigestState,
        cardinality: &CardinalityState,
    ) -> Result<()> {
        let other = Self::from_states(digest, cardinality)?;
        self.digest.merge(&other.digest)?;
        self.cardinality.merge(&other.cardinality)?;
        Ok(())
    }

    pub(crate) fn to_distribution(&self) -> Distribution {
        Distribution::Estimated {
            digest: self.digest.to_state(),
            cardinality: self.cardinality.to_state(),
        }
    }
}
