//! JSON output format for the processed artifacts
//!
//! Serde views of the summary table and the analysis results. Descriptive
//! numbers are rounded to four decimals; p-values keep full precision so
//! very small tail probabilities survive serialization.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::analysis::{
    corrected_alpha, AnalysisOutput, MetricAnalysis, PairwiseComparison, ReuseComparison, ALPHA,
};
use crate::stats::SummaryTable;

/// Round a descriptive value to the persisted 4-decimal precision
fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// One cell of the persisted summary statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonSummaryEntry {
    pub mean: f64,
    pub std: f64,
    pub count: usize,
}

/// Nested scope -> approach -> metric -> entry mapping
pub type JsonSummaryStatistics = BTreeMap<String, BTreeMap<String, BTreeMap<String, JsonSummaryEntry>>>;

/// Convert the in-memory summary table to its persisted form
pub fn summary_statistics(table: &SummaryTable) -> JsonSummaryStatistics {
    table
        .scopes
        .iter()
        .map(|(scope, approaches)| {
            let approaches = approaches
                .iter()
                .map(|(approach, metrics)| {
                    let metrics = metrics
                        .iter()
                        .map(|(metric, entry)| {
                            (
                                metric.clone(),
                                JsonSummaryEntry {
                                    mean: round4(entry.mean),
                                    std: round4(entry.std),
                                    count: entry.count,
                                },
                            )
                        })
                        .collect();
                    (approach.clone(), metrics)
                })
                .collect();
            (scope.clone(), approaches)
        })
        .collect()
}

/// One pairwise comparison record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonPairResult {
    pub status: String,
    pub metric: String,
    pub comparison: String,
    pub approaches: [String; 2],
    /// Shapiro-Wilk p-value per group; absent when undefined for a group
    pub normality_p: [Option<f64>; 2],
    pub u_statistic: f64,
    pub p_value: f64,
    pub tracked: bool,
    pub corrected_significant: bool,
    pub cliffs_delta: f64,
    pub effect_size: String,
    pub mean_first: f64,
    pub mean_second: f64,
}

/// Explicit marker for a metric the engine could not analyze
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonSkippedMetric {
    pub status: String,
    pub metric: String,
    pub reason: String,
}

/// Entry of the persisted results list
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum JsonAnalysisRecord {
    Pair(Box<JsonPairResult>),
    Skipped(JsonSkippedMetric),
}

/// Supplementary reuse-vs-adhoc setup comparison
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonReuseComparison {
    pub u_statistic: f64,
    pub p_value: f64,
    pub cliffs_delta: f64,
    pub effect_size: String,
    pub reuse_mean: f64,
    pub adhoc_mean: f64,
    pub reduction_percent: f64,
}

/// Top-level shape of `statistical_results.json`
#[derive(Debug, Clone, Serialize)]
pub struct JsonStatisticalResults {
    pub alpha: f64,
    pub corrected_alpha: f64,
    pub results: Vec<JsonAnalysisRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub smata_reuse_vs_adhoc: Option<JsonReuseComparison>,
}

fn pair_record(comparison: &PairwiseComparison) -> JsonPairResult {
    JsonPairResult {
        status: "ok".to_string(),
        metric: comparison.metric.id().to_string(),
        comparison: format!("{}_vs_{}", comparison.first.id(), comparison.second.id()),
        approaches: [
            comparison.first.id().to_string(),
            comparison.second.id().to_string(),
        ],
        normality_p: [
            comparison.normality_p[0].map(round4),
            comparison.normality_p[1].map(round4),
        ],
        u_statistic: round4(comparison.u_statistic),
        p_value: comparison.p_value,
        tracked: comparison.tracked,
        corrected_significant: comparison.corrected_significant,
        cliffs_delta: round4(comparison.cliffs_delta),
        effect_size: comparison.effect.label().to_string(),
        mean_first: round4(comparison.first_mean),
        mean_second: round4(comparison.second_mean),
    }
}

fn reuse_record(reuse: &ReuseComparison) -> JsonReuseComparison {
    JsonReuseComparison {
        u_statistic: round4(reuse.u_statistic),
        p_value: reuse.p_value,
        cliffs_delta: round4(reuse.cliffs_delta),
        effect_size: reuse.effect.label().to_string(),
        reuse_mean: round4(reuse.reuse_mean),
        adhoc_mean: round4(reuse.adhoc_mean),
        reduction_percent: round4(reuse.reduction_percent),
    }
}

/// Convert the analysis output to its persisted form
pub fn statistical_results(output: &AnalysisOutput) -> JsonStatisticalResults {
    let mut results = Vec::new();
    for analysis in &output.metrics {
        match analysis {
            MetricAnalysis::Analyzed { comparisons, .. } => {
                for comparison in comparisons {
                    results.push(JsonAnalysisRecord::Pair(Box::new(pair_record(comparison))));
                }
            }
            MetricAnalysis::Skipped { metric, reason } => {
                results.push(JsonAnalysisRecord::Skipped(JsonSkippedMetric {
                    status: "skipped".to_string(),
                    metric: metric.id().to_string(),
                    reason: reason.clone(),
                }));
            }
        }
    }

    JsonStatisticalResults {
        alpha: ALPHA,
        corrected_alpha: corrected_alpha(),
        results,
        smata_reuse_vs_adhoc: output.reuse_vs_adhoc.as_ref().map(reuse_record),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::analyze_all;
    use crate::generator::Generator;
    use crate::params::ExperimentConfig;
    use crate::stats::summarize;

    fn full_results() -> JsonStatisticalResults {
        let config = ExperimentConfig::default();
        let outcome = Generator::new(&config).unwrap().generate_all();
        statistical_results(&analyze_all(&outcome.data.datasets))
    }

    #[test]
    fn test_round4() {
        assert_eq!(round4(68.73125), 68.7313);
        assert_eq!(round4(-0.00004), -0.0);
        assert_eq!(round4(5.0), 5.0);
    }

    #[test]
    fn test_results_have_six_pairs_per_metric() {
        let results = full_results();
        assert!((results.corrected_alpha - 0.05 / 3.0).abs() < 1e-12);
        // Five metrics, six canonical pairs each, nothing skipped
        assert_eq!(results.results.len(), 30);
        assert!(results.smata_reuse_vs_adhoc.is_some());
    }

    #[test]
    fn test_pair_records_serialize_with_status() {
        let results = full_results();
        let json = serde_json::to_string_pretty(&results).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let records = value["results"].as_array().unwrap();
        assert_eq!(records.len(), 30);
        for record in records {
            assert_eq!(record["status"], "ok");
            let p = record["p_value"].as_f64().unwrap();
            assert!((0.0..=1.0).contains(&p));
            let d = record["cliffs_delta"].as_f64().unwrap();
            assert!((-1.0..=1.0).contains(&d));
        }
    }

    #[test]
    fn test_skipped_metric_serializes_marker() {
        use crate::analysis::MetricAnalysis;
        use crate::schema::Metric;

        let output = AnalysisOutput {
            metrics: vec![MetricAnalysis::Skipped {
                metric: Metric::CoveragePct,
                reason: "fewer than two non-empty approach groups (1 present)".to_string(),
            }],
            reuse_vs_adhoc: None,
        };
        let json = serde_json::to_string(&statistical_results(&output)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["results"][0]["status"], "skipped");
        assert_eq!(value["results"][0]["metric"], "coverage_pct");
        assert!(value.get("smata_reuse_vs_adhoc").is_none());
    }

    #[test]
    fn test_summary_statistics_nesting() {
        let config = ExperimentConfig::default();
        let outcome = Generator::new(&config).unwrap().generate_all();
        let table = summarize(&config.registry, &outcome.data.datasets);
        let json_table = summary_statistics(&table);

        let entry = &json_table["aggregate"]["smata"]["coverage_pct"];
        assert_eq!(entry.count, 10);
        // Rounded to four decimals
        let scaled = entry.mean * 10_000.0;
        assert!((scaled - scaled.round()).abs() < 1e-6);
    }

    #[test]
    fn test_summary_serialization_is_deterministic() {
        let config = ExperimentConfig::default();
        let outcome = Generator::new(&config).unwrap().generate_all();
        let table = summarize(&config.registry, &outcome.data.datasets);
        let a = serde_json::to_string_pretty(&summary_statistics(&table)).unwrap();
        let b = serde_json::to_string_pretty(&summary_statistics(&table)).unwrap();
        assert_eq!(a, b);
        assert!(a.contains("\"aggregate\""));
    }
}
