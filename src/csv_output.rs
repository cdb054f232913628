//! CSV rendering and parsing for the raw datasets
//!
//! All numeric values are written with four decimal digits, which is enough
//! precision for the downstream tolerance checks while keeping the files
//! diffable. Rendering is pure string building so the byte-identical
//! determinism guarantee only depends on record order.

use anyhow::{bail, Context, Result};

use crate::generator::{CoverageTraceRow, DerivedCounts, MetricDataset, RunRecord};
use crate::schema::{Approach, Metric};
use crate::stats::HeatmapMatrix;

/// Names of the extra count columns carried by a metric, if any
fn derived_columns(metric: Metric) -> Option<(&'static str, &'static str)> {
    match metric {
        Metric::DetectionPct => Some(("mutants_total", "mutants_detected")),
        Metric::ReproducibilityPct => Some(("bugs_total", "bugs_reproduced")),
        _ => None,
    }
}

/// Escape a CSV field (handle commas, quotes, newlines)
fn escape_field(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Header row for a metric's dataset
fn dataset_header(metric: Metric) -> String {
    let mut headers = vec!["app", "approach", "run_index", "value"];
    if let Some((total, achieved)) = derived_columns(metric) {
        headers.push(total);
        headers.push(achieved);
    }
    headers.join(",")
}

/// Render one metric's run records as CSV
pub fn metric_dataset_csv(dataset: &MetricDataset) -> String {
    let mut output = String::new();
    output.push_str(&dataset_header(dataset.metric));
    output.push('\n');

    for record in &dataset.records {
        let mut fields = vec![
            escape_field(&record.app),
            record.approach.id().to_string(),
            record.run_index.to_string(),
            format!("{:.4}", record.value),
        ];
        if let Some(counts) = record.derived {
            fields.push(counts.total.to_string());
            fields.push(counts.achieved.to_string());
        }
        output.push_str(&fields.join(","));
        output.push('\n');
    }

    output
}

/// Render the coverage progression dataset as CSV
pub fn coverage_traces_csv(rows: &[CoverageTraceRow]) -> String {
    let mut output =
        String::from("app,approach,run_index,time_bucket_minutes,cumulative_coverage_pct\n");
    for row in rows {
        output.push_str(&format!(
            "{},{},{},{},{:.4}\n",
            escape_field(&row.app),
            row.approach.id(),
            row.run_index,
            row.time_bucket_minutes,
            row.cumulative_coverage_pct
        ));
    }
    output
}

/// Render the per-app coverage heatmap as CSV
pub fn heatmap_csv(matrix: &HeatmapMatrix) -> String {
    let mut output = String::from("app");
    for approach in &matrix.approaches {
        output.push(',');
        output.push_str(approach.id());
    }
    output.push('\n');

    for (app, row) in matrix.apps.iter().zip(&matrix.cells) {
        output.push_str(&escape_field(app));
        for cell in row {
            output.push_str(&format!(",{cell:.4}"));
        }
        output.push('\n');
    }
    output
}

/// Split one CSV line into fields, honoring quoted fields with "" escapes
fn split_fields(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    current.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            }
            '"' => in_quotes = true,
            ',' if !in_quotes => {
                fields.push(std::mem::take(&mut current));
            }
            _ => current.push(c),
        }
    }
    fields.push(current);
    fields
}

/// Parse a previously written metric dataset back into run records
///
/// Used by analyze-only runs that start from CSVs on disk instead of an
/// in-process generation pass.
pub fn parse_metric_dataset(metric: Metric, contents: &str) -> Result<MetricDataset> {
    let mut lines = contents.lines();
    let header = lines.next().context("dataset is empty")?;
    let expected = dataset_header(metric);
    if header != expected {
        bail!(
            "unexpected header for {}: got '{header}', want '{expected}'",
            metric.id()
        );
    }

    let expected_fields = if derived_columns(metric).is_some() {
        6
    } else {
        4
    };
    let mut records = Vec::new();
    for (lineno, line) in lines.enumerate() {
        if line.is_empty() {
            continue;
        }
        let fields = split_fields(line);
        if fields.len() != expected_fields {
            bail!(
                "line {} of {}: expected {expected_fields} fields, found {}",
                lineno + 2,
                metric.id(),
                fields.len()
            );
        }

        let approach = Approach::from_id(&fields[1])
            .with_context(|| format!("line {}: unknown approach '{}'", lineno + 2, fields[1]))?;
        let run_index: u32 = fields[2]
            .parse()
            .with_context(|| format!("line {}: bad run_index", lineno + 2))?;
        let value: f64 = fields[3]
            .parse()
            .with_context(|| format!("line {}: bad value", lineno + 2))?;
        let derived = if expected_fields == 6 {
            Some(DerivedCounts {
                total: fields[4]
                    .parse()
                    .with_context(|| format!("line {}: bad total count", lineno + 2))?,
                achieved: fields[5]
                    .parse()
                    .with_context(|| format!("line {}: bad achieved count", lineno + 2))?,
            })
        } else {
            None
        };

        records.push(RunRecord {
            app: fields[0].clone(),
            approach,
            run_index,
            value,
            derived,
        });
    }

    Ok(MetricDataset { metric, records })
}
