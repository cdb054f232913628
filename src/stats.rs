//! Descriptive summary statistics over generated run records
//!
//! Aggregates per (app, approach, metric) and, across apps, per
//! (approach, metric). The aggregate scope uses the unweighted mean of
//! per-app means and the spread across those means, matching how the study
//! reports per-approach numbers. Also builds the 10x4 per-app coverage
//! matrix consumed by the downstream figure generator.

use std::collections::BTreeMap;

use crate::generator::MetricDataset;
use crate::schema::{Approach, Registry, CANONICAL_APPROACHES};

/// Scope key for statistics pooled across all apps
pub const AGGREGATE_SCOPE: &str = "aggregate";

/// Arithmetic mean; 0.0 for an empty slice
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (n-1 denominator); 0.0 below two samples
pub fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    var.sqrt()
}

/// Descriptive statistics for one scope/approach/metric cell
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SummaryEntry {
    pub mean: f64,
    pub std: f64,
    pub count: usize,
}

/// Nested summary: scope -> approach id -> metric id -> entry
///
/// Scopes are the ten app names plus [`AGGREGATE_SCOPE`]. BTreeMaps keep
/// serialization order stable across runs.
#[derive(Debug, Clone, Default)]
pub struct SummaryTable {
    pub scopes: BTreeMap<String, BTreeMap<String, BTreeMap<String, SummaryEntry>>>,
}

impl SummaryTable {
    /// Look up one cell
    pub fn entry(&self, scope: &str, approach: Approach, metric_id: &str) -> Option<&SummaryEntry> {
        self.scopes.get(scope)?.get(approach.id())?.get(metric_id)
    }

    fn insert(&mut self, scope: &str, approach: Approach, metric_id: &str, entry: SummaryEntry) {
        self.scopes
            .entry(scope.to_string())
            .or_default()
            .entry(approach.id().to_string())
            .or_default()
            .insert(metric_id.to_string(), entry);
    }
}

/// Aggregate every dataset into the nested summary table
pub fn summarize(registry: &Registry, datasets: &[MetricDataset]) -> SummaryTable {
    let mut table = SummaryTable::default();

    for dataset in datasets {
        let metric_id = dataset.metric.id();
        for &approach in registry.approaches_for(dataset.metric) {
            let mut per_app_means = Vec::new();

            for app in registry.apps() {
                let values: Vec<f64> = dataset
                    .records
                    .iter()
                    .filter(|r| r.app == app.name && r.approach == approach)
                    .map(|r| r.value)
                    .collect();
                if values.is_empty() {
                    continue;
                }
                let app_mean = mean(&values);
                per_app_means.push(app_mean);
                table.insert(
                    app.name,
                    approach,
                    metric_id,
                    SummaryEntry {
                        mean: app_mean,
                        std: sample_std(&values),
                        count: values.len(),
                    },
                );
            }

            if !per_app_means.is_empty() {
                table.insert(
                    AGGREGATE_SCOPE,
                    approach,
                    metric_id,
                    SummaryEntry {
                        mean: mean(&per_app_means),
                        std: sample_std(&per_app_means),
                        count: per_app_means.len(),
                    },
                );
            }
        }
    }

    table
}

/// Per-app mean coverage, apps as rows and canonical approaches as columns
#[derive(Debug, Clone, PartialEq)]
pub struct HeatmapMatrix {
    pub apps: Vec<String>,
    pub approaches: [Approach; 4],
    pub cells: Vec<[f64; 4]>,
}

impl HeatmapMatrix {
    /// (rows, columns); (10, 4) for the full catalog
    pub fn shape(&self) -> (usize, usize) {
        (self.cells.len(), self.approaches.len())
    }
}

/// Build the coverage heatmap from the coverage dataset
///
/// Rows follow catalog order, so the matrix shape is fixed by the registry
/// regardless of record order.
pub fn coverage_heatmap(registry: &Registry, coverage: &MetricDataset) -> HeatmapMatrix {
    let mut apps = Vec::with_capacity(registry.apps().len());
    let mut cells = Vec::with_capacity(registry.apps().len());

    for app in registry.apps() {
        let mut row = [0.0; 4];
        for (col, &approach) in CANONICAL_APPROACHES.iter().enumerate() {
            let values: Vec<f64> = coverage
                .records
                .iter()
                .filter(|r| r.app == app.name && r.approach == approach)
                .map(|r| r.value)
                .collect();
            row[col] = mean(&values);
        }
        apps.push(app.name.to_string());
        cells.push(row);
    }

    let matrix = HeatmapMatrix {
        apps,
        approaches: CANONICAL_APPROACHES,
        cells,
    };
    assert_eq!(
        matrix.shape(),
        (registry.apps().len(), CANONICAL_APPROACHES.len()),
        "heatmap shape must match the registry"
    );
    matrix
}

/// Print the aggregate scope as a readable table
pub fn print_summary(table: &SummaryTable) {
    let Some(aggregate) = table.scopes.get(AGGREGATE_SCOPE) else {
        println!("No summary statistics computed.");
        return;
    };

    println!("\n=== Aggregate summary (mean of per-app means) ===");
    println!(
        "{:<12} {:<22} {:>10} {:>10} {:>6}",
        "approach", "metric", "mean", "std", "apps"
    );
    for (approach, metrics) in aggregate {
        for (metric, entry) in metrics {
            println!(
                "{:<12} {:<22} {:>10.2} {:>10.2} {:>6}",
                approach, metric, entry.mean, entry.std, entry.count
            );
        }
    }
}
