// Statistical validation of the full calibrated protocol, exercised through
// the library API the way the binary drives it.

use smata_eval::analysis::{
    analyze_all, analyze_metric, corrected_alpha, EffectMagnitude, MetricAnalysis,
};
use smata_eval::generator::{GeneratedData, Generator, MetricDataset, RunRecord};
use smata_eval::params::ExperimentConfig;
use smata_eval::schema::{Approach, Metric, ALL_METRICS};

fn generated() -> GeneratedData {
    let config = ExperimentConfig::default();
    let outcome = Generator::new(&config).unwrap().generate_all();
    assert!(outcome.failures.is_empty());
    outcome.data
}

fn two_group_dataset(
    metric: Metric,
    first: (Approach, &[f64]),
    second: (Approach, &[f64]),
) -> MetricDataset {
    let mut records = Vec::new();
    for (approach, values) in [first, second] {
        for (i, &value) in values.iter().enumerate() {
            records.push(RunRecord {
                app: "AnyMemo".to_string(),
                approach,
                run_index: i as u32,
                value,
                derived: None,
            });
        }
    }
    MetricDataset { metric, records }
}

#[test]
fn test_every_metric_analyzed_with_six_pairs() {
    let data = generated();
    let output = analyze_all(&data.datasets);

    assert_eq!(output.metrics.len(), ALL_METRICS.len());
    for analysis in &output.metrics {
        let MetricAnalysis::Analyzed {
            normality,
            comparisons,
            ..
        } = analysis
        else {
            panic!("{} unexpectedly skipped", analysis.metric().id());
        };
        // All four canonical groups are continuous samples, so the
        // normality test is defined for each
        assert_eq!(normality.len(), 4);
        assert_eq!(comparisons.len(), 6);
        for n in normality {
            assert!((0.0..=1.0).contains(&n.p_value));
        }
        for c in comparisons {
            assert!(c.normality_p[0].is_some());
            assert!(c.normality_p[1].is_some());
        }
    }
}

#[test]
fn test_monkey_vs_smata_significant_everywhere() {
    // The calibrated targets separate monkey and smata by multiple standard
    // deviations on every metric
    let data = generated();
    let output = analyze_all(&data.datasets);

    for analysis in &output.metrics {
        let MetricAnalysis::Analyzed { comparisons, .. } = analysis else {
            panic!("unexpected skip");
        };
        let pair = comparisons
            .iter()
            .find(|c| c.first == Approach::Monkey && c.second == Approach::Smata)
            .unwrap();
        assert!(pair.tracked);
        assert!(
            pair.corrected_significant,
            "{}: p={} not below {}",
            analysis.metric().id(),
            pair.p_value,
            corrected_alpha()
        );
        assert_eq!(pair.effect, EffectMagnitude::Large);
    }
}

#[test]
fn test_reproducibility_tracked_pairs_all_significant() {
    // Reproducibility has the widest gaps (23/36/57 vs 90); all three
    // tracked comparisons must clear the corrected threshold
    let data = generated();
    let dataset = data.dataset(Metric::ReproducibilityPct).unwrap();
    let MetricAnalysis::Analyzed { comparisons, .. } = analyze_metric(dataset) else {
        panic!("unexpected skip");
    };

    for c in comparisons.iter().filter(|c| c.tracked) {
        assert!(c.corrected_significant, "{:?} vs {:?}", c.first, c.second);
        assert!(c.p_value < 0.001);
        // smata dominates, so the baseline-first delta is strongly negative
        assert!(c.cliffs_delta < -0.9);
    }
}

#[test]
fn test_coverage_effect_directions() {
    let data = generated();
    let dataset = data.dataset(Metric::CoveragePct).unwrap();
    let MetricAnalysis::Analyzed { comparisons, .. } = analyze_metric(dataset) else {
        panic!("unexpected skip");
    };

    // Baseline-vs-smata deltas are negative (smata wins), and the weakest
    // baseline (monkey) loses hardest
    let delta = |a: Approach, b: Approach| {
        comparisons
            .iter()
            .find(|c| c.first == a && c.second == b)
            .unwrap()
            .cliffs_delta
    };
    assert!(delta(Approach::Monkey, Approach::Smata) < -0.7);
    assert!(delta(Approach::Adhoc, Approach::Smata) < -0.5);
    assert!(delta(Approach::Monkey, Approach::Smata) < delta(Approach::Adhoc, Approach::Smata));
}

#[test]
fn test_separated_groups_scenario() {
    // Two groups with clearly separated ranges: [10, 20] vs [80, 90]
    let low: Vec<f64> = (0..10).map(|i| 10.0 + f64::from(i)).collect();
    let high: Vec<f64> = (0..10).map(|i| 80.0 + f64::from(i)).collect();
    let dataset = two_group_dataset(
        Metric::DetectionPct,
        (Approach::Monkey, &low),
        (Approach::Smata, &high),
    );

    let MetricAnalysis::Analyzed { comparisons, .. } = analyze_metric(&dataset) else {
        panic!("unexpected skip");
    };
    assert_eq!(comparisons.len(), 1);
    let pair = &comparisons[0];
    assert!(pair.p_value < 0.001);
    assert!(pair.tracked);
    assert!(pair.corrected_significant);
    assert!(pair.cliffs_delta.abs() > 0.9);
    assert_eq!(pair.effect, EffectMagnitude::Large);
}

#[test]
fn test_untracked_pair_reported_but_uncorrected() {
    // The same separation between two baselines is reported without the
    // corrected-significance flag
    let low: Vec<f64> = (0..10).map(|i| 10.0 + f64::from(i)).collect();
    let high: Vec<f64> = (0..10).map(|i| 80.0 + f64::from(i)).collect();
    let dataset = two_group_dataset(
        Metric::DetectionPct,
        (Approach::Monkey, &low),
        (Approach::Dynodroid, &high),
    );

    let MetricAnalysis::Analyzed { comparisons, .. } = analyze_metric(&dataset) else {
        panic!("unexpected skip");
    };
    let pair = &comparisons[0];
    assert!(pair.p_value < 0.001);
    assert!(!pair.tracked);
    assert!(!pair.corrected_significant);
}

#[test]
fn test_single_group_skip_leaves_other_metrics_alone() {
    let data = generated();
    let smata_only = MetricDataset {
        metric: Metric::CoveragePct,
        records: data
            .dataset(Metric::CoveragePct)
            .unwrap()
            .records
            .iter()
            .filter(|r| r.approach == Approach::Smata)
            .cloned()
            .collect(),
    };
    let detection = data.dataset(Metric::DetectionPct).unwrap().clone();

    let output = analyze_all(&[smata_only, detection]);
    assert_eq!(output.metrics.len(), 2);
    assert!(matches!(
        output.metrics[0],
        MetricAnalysis::Skipped {
            metric: Metric::CoveragePct,
            ..
        }
    ));
    assert!(matches!(
        output.metrics[1],
        MetricAnalysis::Analyzed { .. }
    ));
}

#[test]
fn test_reuse_supplement_present_and_large() {
    let data = generated();
    let output = analyze_all(&data.datasets);
    let reuse = output.reuse_vs_adhoc.expect("setup data carries the reuse variant");

    // 2.1h vs 18.8h configured means
    assert!(reuse.reduction_percent > 70.0);
    assert!(reuse.p_value < 0.001);
    assert_eq!(reuse.effect, EffectMagnitude::Large);
    assert!(reuse.cliffs_delta < -0.9);
}
