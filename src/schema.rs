//! Schema registry for the evaluation pipeline
//!
//! Canonical enumeration of benchmark applications, testing approaches,
//! metrics, and run counts. Every other component derives its shape from this
//! module, and generated or loaded datasets are validated against it before
//! anything is written.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::generator::MetricDataset;

/// Schema violations detected when validating a dataset against the registry
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("unknown app '{app}' in {metric} dataset")]
    UnknownApp { metric: &'static str, app: String },

    #[error("approach '{approach}' is not declared for metric {metric}")]
    UndeclaredApproach {
        metric: &'static str,
        approach: &'static str,
    },

    #[error("expected {expected} runs for app='{app}' approach={approach} metric={metric}, found {found}")]
    WrongRunCount {
        metric: &'static str,
        app: String,
        approach: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("value {value} outside [{lo}, {hi}] for app='{app}' approach={approach} metric={metric} run={run_index}")]
    ValueOutOfRange {
        metric: &'static str,
        app: String,
        approach: &'static str,
        run_index: u32,
        value: f64,
        lo: f64,
        hi: f64,
    },
}

/// One of the testing strategies compared in the study
///
/// The first four variants form the canonical comparison set. `SmataReuse`
/// models the artifact-reuse setup variant and participates only in the
/// setup-time dataset.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Approach {
    Monkey,
    Dynodroid,
    Adhoc,
    Smata,
    SmataReuse,
}

/// The four approaches every metric is compared across, in canonical order
pub const CANONICAL_APPROACHES: [Approach; 4] = [
    Approach::Monkey,
    Approach::Dynodroid,
    Approach::Adhoc,
    Approach::Smata,
];

/// Approach set for the setup-time dataset (includes the reuse variant)
pub const SETUP_APPROACHES: [Approach; 5] = [
    Approach::Monkey,
    Approach::Dynodroid,
    Approach::Adhoc,
    Approach::Smata,
    Approach::SmataReuse,
];

impl Approach {
    /// Stable identifier used in persisted files
    pub fn id(&self) -> &'static str {
        match self {
            Approach::Monkey => "monkey",
            Approach::Dynodroid => "dynodroid",
            Approach::Adhoc => "adhoc",
            Approach::Smata => "smata",
            Approach::SmataReuse => "smata_reuse",
        }
    }

    /// Parse a persisted identifier back into an approach
    pub fn from_id(id: &str) -> Option<Self> {
        match id {
            "monkey" => Some(Approach::Monkey),
            "dynodroid" => Some(Approach::Dynodroid),
            "adhoc" => Some(Approach::Adhoc),
            "smata" => Some(Approach::Smata),
            "smata_reuse" => Some(Approach::SmataReuse),
            _ => None,
        }
    }
}

/// A measured evaluation metric with a fixed valid range
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    CoveragePct,
    DetectionPct,
    ReproducibilityPct,
    DebugTimeMin,
    SetupTimeHours,
}

/// All scalar metrics, in dataset order
pub const ALL_METRICS: [Metric; 5] = [
    Metric::CoveragePct,
    Metric::DetectionPct,
    Metric::ReproducibilityPct,
    Metric::DebugTimeMin,
    Metric::SetupTimeHours,
];

impl Metric {
    /// Stable identifier used in persisted files
    pub fn id(&self) -> &'static str {
        match self {
            Metric::CoveragePct => "coverage_pct",
            Metric::DetectionPct => "detection_pct",
            Metric::ReproducibilityPct => "reproducibility_pct",
            Metric::DebugTimeMin => "debug_time_min",
            Metric::SetupTimeHours => "setup_time_hours",
        }
    }

    /// Parse a persisted identifier back into a metric
    pub fn from_id(id: &str) -> Option<Self> {
        match id {
            "coverage_pct" => Some(Metric::CoveragePct),
            "detection_pct" => Some(Metric::DetectionPct),
            "reproducibility_pct" => Some(Metric::ReproducibilityPct),
            "debug_time_min" => Some(Metric::DebugTimeMin),
            "setup_time_hours" => Some(Metric::SetupTimeHours),
            _ => None,
        }
    }

    /// File stem of the raw CSV dataset for this metric
    pub fn dataset_stem(&self) -> &'static str {
        match self {
            Metric::CoveragePct => "coverage_data",
            Metric::DetectionPct => "detection_data",
            Metric::ReproducibilityPct => "reproducibility_data",
            Metric::DebugTimeMin => "debug_time_data",
            Metric::SetupTimeHours => "setup_time_data",
        }
    }

    /// Closed valid interval for sampled values
    pub fn bounds(&self) -> (f64, f64) {
        match self {
            Metric::CoveragePct | Metric::DetectionPct | Metric::ReproducibilityPct => {
                (0.0, 100.0)
            }
            Metric::DebugTimeMin => (5.0, 200.0),
            Metric::SetupTimeHours => (0.2, 40.0),
        }
    }
}

/// Relative size class of a benchmark app; scales coverage variance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Complexity {
    Low,
    Medium,
    High,
}

impl Complexity {
    /// Standard-deviation multiplier applied to coverage targets
    pub fn std_scale(&self) -> f64 {
        match self {
            Complexity::Low => 0.85,
            Complexity::Medium => 1.0,
            Complexity::High => 1.2,
        }
    }
}

/// One entry of the fixed benchmark catalog
#[derive(Debug, Clone, Copy)]
pub struct BenchmarkApp {
    pub name: &'static str,
    pub domain: &'static str,
    pub loc: u32,
    pub complexity: Complexity,
    pub has_auth: bool,
    pub available: bool,
}

impl BenchmarkApp {
    /// Number of seeded mutants used for the fault-detection dataset
    pub fn mutants_total(&self) -> u32 {
        (self.loc / 100).max(50)
    }
}

/// The ten open-source benchmark applications
pub const APP_CATALOG: [BenchmarkApp; 10] = [
    BenchmarkApp {
        name: "AnyMemo",
        domain: "flashcards",
        loc: 12_000,
        complexity: Complexity::Medium,
        has_auth: false,
        available: true,
    },
    BenchmarkApp {
        name: "K-9 Mail",
        domain: "email",
        loc: 45_000,
        complexity: Complexity::High,
        has_auth: true,
        available: true,
    },
    BenchmarkApp {
        name: "WordPress",
        domain: "blogging",
        loc: 38_000,
        complexity: Complexity::High,
        has_auth: true,
        available: true,
    },
    BenchmarkApp {
        name: "Aard Dictionary",
        domain: "reference",
        loc: 5_000,
        complexity: Complexity::Low,
        has_auth: false,
        available: true,
    },
    BenchmarkApp {
        name: "ConnectBot",
        domain: "ssh-client",
        loc: 18_000,
        complexity: Complexity::Medium,
        has_auth: true,
        available: true,
    },
    BenchmarkApp {
        name: "Tomdroid",
        domain: "notes",
        loc: 8_000,
        complexity: Complexity::Low,
        has_auth: false,
        available: true,
    },
    BenchmarkApp {
        name: "OI Notepad",
        domain: "notes",
        loc: 6_000,
        complexity: Complexity::Low,
        has_auth: false,
        available: true,
    },
    BenchmarkApp {
        name: "Tippy Tipper",
        domain: "utility",
        loc: 2_000,
        complexity: Complexity::Low,
        has_auth: false,
        available: true,
    },
    BenchmarkApp {
        name: "Book Catalogue",
        domain: "cataloguing",
        loc: 15_000,
        complexity: Complexity::Medium,
        has_auth: false,
        available: true,
    },
    BenchmarkApp {
        name: "OpenSudoku",
        domain: "games",
        loc: 7_000,
        complexity: Complexity::Low,
        has_auth: false,
        available: true,
    },
];

/// Coverage-trace sampling scheme: 5-minute buckets over a 60-minute session
pub const SESSION_MINUTES: u32 = 60;
pub const BUCKET_MINUTES: u32 = 5;

/// Immutable shape declaration for one full experiment
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Registry {
    /// Repetitions per (app, approach) combination
    pub run_count: usize,
}

impl Default for Registry {
    fn default() -> Self {
        Self { run_count: 10 }
    }
}

impl Registry {
    pub fn new(run_count: usize) -> Self {
        Self { run_count }
    }

    /// Benchmark catalog, in fixed order
    pub fn apps(&self) -> &'static [BenchmarkApp] {
        &APP_CATALOG
    }

    /// Look up a catalog entry by name
    pub fn app(&self, name: &str) -> Option<&'static BenchmarkApp> {
        APP_CATALOG.iter().find(|a| a.name == name)
    }

    /// Approaches declared for a metric
    pub fn approaches_for(&self, metric: Metric) -> &'static [Approach] {
        match metric {
            Metric::SetupTimeHours => &SETUP_APPROACHES,
            _ => &CANONICAL_APPROACHES,
        }
    }

    /// Number of rows the raw dataset for `metric` must contain
    pub fn expected_rows(&self, metric: Metric) -> usize {
        APP_CATALOG.len() * self.approaches_for(metric).len() * self.run_count
    }

    /// Number of time buckets per coverage trace, including minute zero
    pub fn trace_buckets(&self) -> usize {
        (SESSION_MINUTES / BUCKET_MINUTES) as usize + 1
    }

    /// Validate a dataset's shape and bounds against the registry
    ///
    /// Checks that every declared (app, approach) combination has exactly
    /// `run_count` records, that no record references an unknown app or an
    /// undeclared approach, and that every value lies within the metric's
    /// bounds.
    pub fn validate_dataset(&self, dataset: &MetricDataset) -> Result<(), SchemaError> {
        let metric = dataset.metric;
        let (lo, hi) = metric.bounds();
        let declared = self.approaches_for(metric);

        for record in &dataset.records {
            if self.app(&record.app).is_none() {
                return Err(SchemaError::UnknownApp {
                    metric: metric.id(),
                    app: record.app.clone(),
                });
            }
            if !declared.contains(&record.approach) {
                return Err(SchemaError::UndeclaredApproach {
                    metric: metric.id(),
                    approach: record.approach.id(),
                });
            }
            if !(record.value >= lo && record.value <= hi) {
                return Err(SchemaError::ValueOutOfRange {
                    metric: metric.id(),
                    app: record.app.clone(),
                    approach: record.approach.id(),
                    run_index: record.run_index,
                    value: record.value,
                    lo,
                    hi,
                });
            }
        }

        for app in self.apps() {
            for &approach in declared {
                let found = dataset
                    .records
                    .iter()
                    .filter(|r| r.app == app.name && r.approach == approach)
                    .count();
                if found != self.run_count {
                    return Err(SchemaError::WrongRunCount {
                        metric: metric.id(),
                        app: app.name.to_string(),
                        approach: approach.id(),
                        expected: self.run_count,
                        found,
                    });
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::RunRecord;

    #[test]
    fn test_catalog_has_ten_apps() {
        assert_eq!(APP_CATALOG.len(), 10);
    }

    #[test]
    fn test_catalog_names_unique() {
        for (i, a) in APP_CATALOG.iter().enumerate() {
            for b in &APP_CATALOG[i + 1..] {
                assert_ne!(a.name, b.name);
            }
        }
    }

    #[test]
    fn test_approach_id_round_trip() {
        for approach in SETUP_APPROACHES {
            assert_eq!(Approach::from_id(approach.id()), Some(approach));
        }
        assert_eq!(Approach::from_id("espresso"), None);
    }

    #[test]
    fn test_metric_id_round_trip() {
        for metric in ALL_METRICS {
            assert_eq!(Metric::from_id(metric.id()), Some(metric));
        }
        assert_eq!(Metric::from_id("crash_count"), None);
    }

    #[test]
    fn test_metric_bounds_are_ordered() {
        for metric in ALL_METRICS {
            let (lo, hi) = metric.bounds();
            assert!(lo < hi);
        }
    }

    #[test]
    fn test_expected_rows_per_protocol() {
        let registry = Registry::default();
        assert_eq!(registry.expected_rows(Metric::CoveragePct), 400);
        assert_eq!(registry.expected_rows(Metric::DetectionPct), 400);
        assert_eq!(registry.expected_rows(Metric::SetupTimeHours), 500);
    }

    #[test]
    fn test_trace_bucket_count() {
        // 0, 5, ..., 60 minutes
        assert_eq!(Registry::default().trace_buckets(), 13);
    }

    #[test]
    fn test_setup_metric_declares_reuse_variant() {
        let registry = Registry::default();
        assert!(registry
            .approaches_for(Metric::SetupTimeHours)
            .contains(&Approach::SmataReuse));
        assert!(!registry
            .approaches_for(Metric::CoveragePct)
            .contains(&Approach::SmataReuse));
    }

    #[test]
    fn test_mutants_total_floor() {
        // Tippy Tipper has 2k LOC; the floor of 50 mutants applies
        let app = APP_CATALOG.iter().find(|a| a.name == "Tippy Tipper").unwrap();
        assert_eq!(app.mutants_total(), 50);
        let k9 = APP_CATALOG.iter().find(|a| a.name == "K-9 Mail").unwrap();
        assert_eq!(k9.mutants_total(), 450);
    }

    #[test]
    fn test_validate_rejects_unknown_app() {
        let registry = Registry::new(1);
        let dataset = MetricDataset {
            metric: Metric::CoveragePct,
            records: vec![RunRecord {
                app: "Angry Birds".to_string(),
                approach: Approach::Monkey,
                run_index: 0,
                value: 50.0,
                derived: None,
            }],
        };
        assert!(matches!(
            registry.validate_dataset(&dataset),
            Err(SchemaError::UnknownApp { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_out_of_range_value() {
        let registry = Registry::new(1);
        let dataset = MetricDataset {
            metric: Metric::DebugTimeMin,
            records: vec![RunRecord {
                app: "AnyMemo".to_string(),
                approach: Approach::Monkey,
                run_index: 0,
                value: 3.0, // below the 5-minute floor
                derived: None,
            }],
        };
        assert!(matches!(
            registry.validate_dataset(&dataset),
            Err(SchemaError::ValueOutOfRange { .. })
        ));
    }

    #[test]
    fn test_validate_detects_missing_runs() {
        let registry = Registry::default();
        let dataset = MetricDataset {
            metric: Metric::CoveragePct,
            records: Vec::new(),
        };
        assert!(matches!(
            registry.validate_dataset(&dataset),
            Err(SchemaError::WrongRunCount { .. })
        ));
    }
}
