//! Synthetic dataset generation
//!
//! Walks the schema registry and emits one run record per (app, approach,
//! metric, run) combination through the bounded sampler, plus the
//! time-indexed coverage progression dataset. Output is deterministic for a
//! fixed configuration and seed: regenerating produces byte-identical
//! artifacts.
//!
//! A configuration problem (missing or invalid targets) aborts before any
//! sampling. A sampling failure is fatal only for its own combination;
//! siblings still generate so every failure gets logged with its full key,
//! and the pipeline refuses to write anything if any combination failed.

use rand::Rng;
use rand_distr::{Distribution, Normal};
use tracing::{debug, error};

use crate::params::{ConfigError, ExperimentConfig};
use crate::sampler::{seeded_rng, BoundedSampler, GenerationError};
use crate::schema::{Approach, Metric, ALL_METRICS, BUCKET_MINUTES, SESSION_MINUTES};

/// Relative noise applied to each coverage-trace increment before
/// normalization
const TRACE_NOISE_STD: f64 = 0.15;

/// Extra per-record counts carried by the detection and reproducibility
/// datasets (seeded mutants, observed bugs)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DerivedCounts {
    pub total: u32,
    pub achieved: u32,
}

/// One sampled observation
#[derive(Debug, Clone, PartialEq)]
pub struct RunRecord {
    pub app: String,
    pub approach: Approach,
    pub run_index: u32,
    pub value: f64,
    pub derived: Option<DerivedCounts>,
}

/// All run records for one metric
#[derive(Debug, Clone, PartialEq)]
pub struct MetricDataset {
    pub metric: Metric,
    pub records: Vec<RunRecord>,
}

impl MetricDataset {
    /// Values for one approach, in record order
    pub fn group(&self, approach: Approach) -> Vec<f64> {
        self.records
            .iter()
            .filter(|r| r.approach == approach)
            .map(|r| r.value)
            .collect()
    }
}

/// One sample of a coverage trace
#[derive(Debug, Clone, PartialEq)]
pub struct CoverageTraceRow {
    pub app: String,
    pub approach: Approach,
    pub run_index: u32,
    pub time_bucket_minutes: u32,
    pub cumulative_coverage_pct: f64,
}

/// Everything the generator emits for one run
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedData {
    pub datasets: Vec<MetricDataset>,
    pub traces: Vec<CoverageTraceRow>,
}

impl GeneratedData {
    /// The dataset for one metric, if generated
    pub fn dataset(&self, metric: Metric) -> Option<&MetricDataset> {
        self.datasets.iter().find(|d| d.metric == metric)
    }
}

/// Generation result plus every per-combination failure encountered
#[derive(Debug)]
pub struct GenerationOutcome {
    pub data: GeneratedData,
    pub failures: Vec<GenerationError>,
}

/// Per-approach saturation rate of the coverage growth curve
///
/// Random exploration plateaus early; scripted and coordinated approaches
/// keep discovering code deeper into the session.
fn growth_rate(approach: Approach) -> f64 {
    match approach {
        Approach::Monkey => 0.12,
        Approach::Dynodroid => 0.08,
        Approach::Adhoc => 0.05,
        Approach::Smata | Approach::SmataReuse => 0.06,
    }
}

/// Orchestrates sampling across the whole registry
pub struct Generator<'a> {
    config: &'a ExperimentConfig,
    sampler: BoundedSampler,
}

impl<'a> Generator<'a> {
    /// Build a generator, validating the configuration up front
    pub fn new(config: &'a ExperimentConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            sampler: BoundedSampler::new(config.seed),
        })
    }

    /// Generate every dataset plus the coverage traces
    pub fn generate_all(&self) -> GenerationOutcome {
        let mut failures = Vec::new();
        let mut datasets = Vec::with_capacity(ALL_METRICS.len());

        for metric in ALL_METRICS {
            datasets.push(self.generate_metric(metric, &mut failures));
        }

        let coverage = datasets
            .iter()
            .find(|d| d.metric == Metric::CoveragePct)
            .expect("coverage dataset is always generated");
        let traces = match self.coverage_traces(coverage) {
            Ok(traces) => traces,
            Err(e) => {
                error!("coverage trace generation failed: {e}");
                failures.push(e);
                Vec::new()
            }
        };

        GenerationOutcome {
            data: GeneratedData { datasets, traces },
            failures,
        }
    }

    /// Generate the run records for one metric
    ///
    /// Failed combinations are logged and skipped; the remaining records are
    /// still returned so every broken combination surfaces in one run.
    pub fn generate_metric(
        &self,
        metric: Metric,
        failures: &mut Vec<GenerationError>,
    ) -> MetricDataset {
        let registry = &self.config.registry;
        let mut records = Vec::with_capacity(registry.expected_rows(metric));

        for app in registry.apps() {
            let derived_total = match metric {
                Metric::DetectionPct => Some(app.mutants_total()),
                Metric::ReproducibilityPct => Some(self.bugs_total(app.name)),
                _ => None,
            };

            for &approach in registry.approaches_for(metric) {
                // Validated at construction; resolve cannot fail here
                let target = match self.config.params.resolve(app, approach, metric) {
                    Ok(target) => target,
                    Err(e) => {
                        error!("unresolvable target: {e}");
                        continue;
                    }
                };

                for run_index in 0..registry.run_count as u32 {
                    match self
                        .sampler
                        .sample(app.name, approach, metric, run_index, &target)
                    {
                        Ok(value) => {
                            let derived = derived_total.map(|total| DerivedCounts {
                                total,
                                achieved: (f64::from(total) * value / 100.0).round() as u32,
                            });
                            records.push(RunRecord {
                                app: app.name.to_string(),
                                approach,
                                run_index,
                                value,
                                derived,
                            });
                        }
                        Err(e) => {
                            error!("generation failed: {e}");
                            failures.push(e);
                        }
                    }
                }
            }
        }

        debug!(
            metric = metric.id(),
            records = records.len(),
            "generated dataset"
        );
        MetricDataset { metric, records }
    }

    /// Number of observed bugs for one app, stable across reruns
    fn bugs_total(&self, app: &str) -> u32 {
        let mut rng = seeded_rng(self.config.seed, &format!("{app}|bugs_total"));
        rng.gen_range(8..25)
    }

    /// Simulate coverage growth over the session for every coverage run
    ///
    /// Each run's final scalar coverage is split across the session's
    /// 5-minute intervals with an exponential-saturation weighting, so early
    /// buckets capture a larger share of the total than later ones. Noise
    /// perturbs the weights before normalization, which keeps every
    /// increment non-negative and makes the 60-minute value equal the
    /// scalar coverage exactly.
    pub fn coverage_traces(
        &self,
        coverage: &MetricDataset,
    ) -> Result<Vec<CoverageTraceRow>, GenerationError> {
        let buckets = self.config.registry.trace_buckets();
        let noise = Normal::new(0.0, TRACE_NOISE_STD).map_err(|e| {
            GenerationError::InvalidDistribution {
                key: "coverage_trace".to_string(),
                reason: e.to_string(),
            }
        })?;

        let mut rows = Vec::with_capacity(coverage.records.len() * buckets);
        for record in &coverage.records {
            let rate = growth_rate(record.approach);
            let key = format!(
                "{}|{}|coverage_trace|{}",
                record.app,
                record.approach.id(),
                record.run_index
            );
            let mut rng = seeded_rng(self.config.seed, &key);

            // Noisy diminishing-returns weights over the 12 intervals
            let mut weights = Vec::with_capacity(buckets - 1);
            for k in 1..buckets {
                let t0 = f64::from((k as u32 - 1) * BUCKET_MINUTES);
                let t1 = f64::from(k as u32 * BUCKET_MINUTES);
                let base = (-rate * t0).exp() - (-rate * t1).exp();
                let factor = (1.0 + noise.sample(&mut rng)).max(0.05);
                weights.push(base * factor);
            }
            let total: f64 = weights.iter().sum();

            let mut cumulative = 0.0;
            rows.push(CoverageTraceRow {
                app: record.app.clone(),
                approach: record.approach,
                run_index: record.run_index,
                time_bucket_minutes: 0,
                cumulative_coverage_pct: 0.0,
            });
            for (k, w) in weights.iter().enumerate() {
                cumulative += record.value * w / total;
                let minutes = (k as u32 + 1) * BUCKET_MINUTES;
                // Pin the terminal bucket to the scalar value; the running
                // sum can drift by a few ulps
                let value = if minutes == SESSION_MINUTES {
                    record.value
                } else {
                    cumulative
                };
                rows.push(CoverageTraceRow {
                    app: record.app.clone(),
                    approach: record.approach,
                    run_index: record.run_index,
                    time_bucket_minutes: minutes,
                    cumulative_coverage_pct: value,
                });
            }
        }

        Ok(rows)
    }
}
