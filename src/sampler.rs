//! Seeded bounded sampling for synthetic measurements
//!
//! Draws one pseudo-random value per (app, approach, metric, run) combination
//! from a normal distribution with the combination's target mean and standard
//! deviation, clamped to the metric's valid interval. Each combination owns an
//! independent RNG seeded from an FNV-1a hash of its key, so regenerating the
//! dataset reproduces it exactly and generation order never matters.
//!
//! Clamping (rather than re-drawing) keeps the sample moments close to the
//! targets when bounds are tight; with the calibrated parameters the clamp
//! fires rarely enough that mean and standard deviation stay within a few
//! percent of the configured values.

use std::hash::Hasher;

use fnv::FnvHasher;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use thiserror::Error;

use crate::params::TargetParams;
use crate::schema::{Approach, Metric};

/// Sampling failures; fatal for the affected combination
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("invalid distribution for {key}: {reason}")]
    InvalidDistribution { key: String, reason: String },

    #[error("sampled value {value} outside [{lo}, {hi}] for {key}")]
    OutOfRange {
        key: String,
        value: f64,
        lo: f64,
        hi: f64,
    },
}

/// Derive a 64-bit seed from the base seed and a combination key
///
/// FNV-1a over the key bytes, folded with the run's base seed. The same
/// (base seed, key) pair always yields the same seed, which is the
/// reproducibility guarantee the whole pipeline rests on.
pub fn derive_seed(base_seed: u64, key: &str) -> u64 {
    let mut hasher = FnvHasher::default();
    hasher.write_u64(base_seed);
    hasher.write(key.as_bytes());
    hasher.finish()
}

/// RNG seeded for one combination key
pub fn seeded_rng(base_seed: u64, key: &str) -> StdRng {
    StdRng::seed_from_u64(derive_seed(base_seed, key))
}

/// Canonical key for one run-record combination
pub fn sample_key(app: &str, approach: Approach, metric: Metric, run_index: u32) -> String {
    format!("{}|{}|{}|{}", app, approach.id(), metric.id(), run_index)
}

/// Draws clamped normal samples with per-combination seeding
#[derive(Debug, Clone, Copy)]
pub struct BoundedSampler {
    base_seed: u64,
}

impl BoundedSampler {
    pub fn new(base_seed: u64) -> Self {
        Self { base_seed }
    }

    /// Produce the value for one (app, approach, metric, run) combination
    pub fn sample(
        &self,
        app: &str,
        approach: Approach,
        metric: Metric,
        run_index: u32,
        target: &TargetParams,
    ) -> Result<f64, GenerationError> {
        let key = sample_key(app, approach, metric, run_index);
        let (lo, hi) = metric.bounds();

        let normal =
            Normal::new(target.mean, target.std).map_err(|e| GenerationError::InvalidDistribution {
                key: key.clone(),
                reason: e.to_string(),
            })?;

        let mut rng = seeded_rng(self.base_seed, &key);
        let value = normal.sample(&mut rng).clamp(lo, hi);

        // Clamping guarantees the interval for any finite draw; only a
        // non-finite target could slip through.
        if !(value >= lo && value <= hi) {
            return Err(GenerationError::OutOfRange {
                key,
                value,
                lo,
                hi,
            });
        }

        Ok(value)
    }
}
