//! Statistical validation of the generated datasets
//!
//! Implements the study's inference protocol per metric:
//!
//! - **Shapiro-Wilk** normality check per approach group (descriptive only;
//!   the hypothesis test below is non-parametric and does not depend on it)
//! - **Mann-Whitney U** rank test for every unordered pair of the four
//!   canonical approaches, two-sided, normal approximation with tie and
//!   continuity corrections
//! - **Bonferroni-style correction**: the 0.05 threshold is divided by the
//!   three baseline-vs-smata comparisons the study actually claims, giving
//!   0.0167; the remaining pairs are reported uncorrected by protocol
//! - **Cliff's delta** effect size, independent of significance
//!
//! # References
//!
//! Mann, H. B., & Whitney, D. R. (1947). On a test of whether one of two
//! random variables is stochastically larger than the other.
//! Royston, P. (1995). Remark AS R94: A remark on algorithm AS 181.
//! Cliff, N. (1993). Dominance statistics: Ordinal analyses to answer
//! ordinal questions.

use std::cmp::Ordering;
use std::f64::consts::PI;

use tracing::{debug, warn};

use crate::generator::MetricDataset;
use crate::schema::{Approach, Metric, CANONICAL_APPROACHES};
use crate::stats::mean;

/// Family-wise significance threshold before correction
pub const ALPHA: f64 = 0.05;

/// The three comparisons the study protocol corrects for
pub const TRACKED_PAIRS: [(Approach, Approach); 3] = [
    (Approach::Monkey, Approach::Smata),
    (Approach::Dynodroid, Approach::Smata),
    (Approach::Adhoc, Approach::Smata),
];

/// Per-comparison threshold after dividing alpha across the tracked pairs
pub fn corrected_alpha() -> f64 {
    ALPHA / TRACKED_PAIRS.len() as f64
}

/// Qualitative magnitude of a Cliff's delta value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectMagnitude {
    Negligible,
    Small,
    Medium,
    Large,
}

impl EffectMagnitude {
    /// Classify |delta| using the conventional thresholds
    pub fn from_delta(delta: f64) -> Self {
        let d = delta.abs();
        if d < 0.147 {
            EffectMagnitude::Negligible
        } else if d < 0.33 {
            EffectMagnitude::Small
        } else if d < 0.474 {
            EffectMagnitude::Medium
        } else {
            EffectMagnitude::Large
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            EffectMagnitude::Negligible => "negligible",
            EffectMagnitude::Small => "small",
            EffectMagnitude::Medium => "medium",
            EffectMagnitude::Large => "large",
        }
    }
}

/// Shapiro-Wilk outcome for one approach group
#[derive(Debug, Clone)]
pub struct NormalityResult {
    pub approach: Approach,
    pub w_statistic: f64,
    pub p_value: f64,
}

/// Mann-Whitney U outcome for one pair of groups
#[derive(Debug, Clone, Copy)]
pub struct MannWhitney {
    /// U statistic of the first group
    pub u_statistic: f64,
    pub z_score: f64,
    pub p_value: f64,
}

/// Full comparison record for one (metric, approach pair)
#[derive(Debug, Clone)]
pub struct PairwiseComparison {
    pub metric: Metric,
    pub first: Approach,
    pub second: Approach,
    /// Shapiro-Wilk p-value per group, None when the group is too small or
    /// has zero variance
    pub normality_p: [Option<f64>; 2],
    pub u_statistic: f64,
    pub p_value: f64,
    /// Whether this pair belongs to the corrected baseline-vs-smata family
    pub tracked: bool,
    pub corrected_significant: bool,
    pub cliffs_delta: f64,
    pub effect: EffectMagnitude,
    pub first_mean: f64,
    pub second_mean: f64,
}

/// Analysis outcome for one metric
#[derive(Debug, Clone)]
pub enum MetricAnalysis {
    Analyzed {
        metric: Metric,
        normality: Vec<NormalityResult>,
        comparisons: Vec<PairwiseComparison>,
    },
    Skipped {
        metric: Metric,
        reason: String,
    },
}

impl MetricAnalysis {
    pub fn metric(&self) -> Metric {
        match self {
            MetricAnalysis::Analyzed { metric, .. } | MetricAnalysis::Skipped { metric, .. } => {
                *metric
            }
        }
    }
}

/// Supplementary setup-time comparison of the reuse variant against the
/// strongest manual baseline
#[derive(Debug, Clone)]
pub struct ReuseComparison {
    pub u_statistic: f64,
    pub p_value: f64,
    pub cliffs_delta: f64,
    pub effect: EffectMagnitude,
    pub reuse_mean: f64,
    pub adhoc_mean: f64,
    /// Relative setup-time reduction of reuse over ad-hoc, in percent
    pub reduction_percent: f64,
}

/// Everything the analysis engine produces for one run
#[derive(Debug, Clone)]
pub struct AnalysisOutput {
    pub metrics: Vec<MetricAnalysis>,
    pub reuse_vs_adhoc: Option<ReuseComparison>,
}

/// Analyze every dataset; results are ordered by metric for deterministic
/// serialization regardless of input order
pub fn analyze_all(datasets: &[MetricDataset]) -> AnalysisOutput {
    let mut sorted: Vec<&MetricDataset> = datasets.iter().collect();
    sorted.sort_by_key(|d| d.metric);

    let metrics = sorted.iter().map(|d| analyze_metric(d)).collect();
    let reuse_vs_adhoc = sorted
        .iter()
        .find(|d| d.metric == Metric::SetupTimeHours)
        .and_then(|d| reuse_setup_comparison(d));

    AnalysisOutput {
        metrics,
        reuse_vs_adhoc,
    }
}

/// Run the full protocol for one metric's run records
pub fn analyze_metric(dataset: &MetricDataset) -> MetricAnalysis {
    let metric = dataset.metric;

    // Pooled per-approach groups, canonical order only; the reuse variant is
    // handled by the supplementary comparison
    let groups: Vec<(Approach, Vec<f64>)> = CANONICAL_APPROACHES
        .iter()
        .map(|&a| (a, dataset.group(a)))
        .filter(|(_, values)| !values.is_empty())
        .collect();

    if groups.len() < 2 {
        let reason = format!(
            "fewer than two non-empty approach groups ({} present)",
            groups.len()
        );
        warn!(metric = metric.id(), "analysis skipped: {reason}");
        return MetricAnalysis::Skipped { metric, reason };
    }

    let normality: Vec<NormalityResult> = groups
        .iter()
        .filter_map(|(approach, values)| {
            shapiro_wilk(values).map(|(w_statistic, p_value)| NormalityResult {
                approach: *approach,
                w_statistic,
                p_value,
            })
        })
        .collect();
    let normality_p = |approach: Approach| {
        normality
            .iter()
            .find(|n| n.approach == approach)
            .map(|n| n.p_value)
    };

    let mut comparisons = Vec::new();
    for i in 0..groups.len() {
        for j in (i + 1)..groups.len() {
            let (first, x) = (&groups[i].0, &groups[i].1);
            let (second, y) = (&groups[j].0, &groups[j].1);

            let mw = mann_whitney_u(x, y);
            let delta = cliffs_delta(x, y);
            let tracked = TRACKED_PAIRS.contains(&(*first, *second));

            comparisons.push(PairwiseComparison {
                metric,
                first: *first,
                second: *second,
                normality_p: [normality_p(*first), normality_p(*second)],
                u_statistic: mw.u_statistic,
                p_value: mw.p_value,
                tracked,
                corrected_significant: tracked && mw.p_value < corrected_alpha(),
                cliffs_delta: delta,
                effect: EffectMagnitude::from_delta(delta),
                first_mean: mean(x),
                second_mean: mean(y),
            });
        }
    }

    debug!(
        metric = metric.id(),
        pairs = comparisons.len(),
        "metric analyzed"
    );
    MetricAnalysis::Analyzed {
        metric,
        normality,
        comparisons,
    }
}

/// Compare reuse-mode setup time against the ad-hoc baseline
pub fn reuse_setup_comparison(setup: &MetricDataset) -> Option<ReuseComparison> {
    let reuse = setup.group(Approach::SmataReuse);
    let adhoc = setup.group(Approach::Adhoc);
    if reuse.is_empty() || adhoc.is_empty() {
        return None;
    }

    let mw = mann_whitney_u(&reuse, &adhoc);
    let delta = cliffs_delta(&reuse, &adhoc);
    let reuse_mean = mean(&reuse);
    let adhoc_mean = mean(&adhoc);

    Some(ReuseComparison {
        u_statistic: mw.u_statistic,
        p_value: mw.p_value,
        cliffs_delta: delta,
        effect: EffectMagnitude::from_delta(delta),
        reuse_mean,
        adhoc_mean,
        reduction_percent: (1.0 - reuse_mean / adhoc_mean) * 100.0,
    })
}

/// Two-sided Mann-Whitney U test
///
/// Ranks the pooled sample with midranks for ties, then applies the normal
/// approximation with tie-corrected variance and a 0.5 continuity
/// correction. Returns the U statistic of `x`.
pub fn mann_whitney_u(x: &[f64], y: &[f64]) -> MannWhitney {
    if x.is_empty() || y.is_empty() {
        return MannWhitney {
            u_statistic: 0.0,
            z_score: 0.0,
            p_value: 1.0,
        };
    }

    let n1 = x.len() as f64;
    let n2 = y.len() as f64;
    let (ranks, tie_term, membership) = pooled_ranks(x, y);

    let r1: f64 = ranks
        .iter()
        .zip(&membership)
        .filter(|(_, in_x)| **in_x)
        .map(|(r, _)| *r)
        .sum();
    let u1 = r1 - n1 * (n1 + 1.0) / 2.0;

    let n = n1 + n2;
    let mu = n1 * n2 / 2.0;
    let sigma_sq = n1 * n2 / 12.0 * ((n + 1.0) - tie_term / (n * (n - 1.0)));
    if sigma_sq <= 0.0 {
        // All pooled values identical
        return MannWhitney {
            u_statistic: u1,
            z_score: 0.0,
            p_value: 1.0,
        };
    }

    let diff = u1 - mu;
    let z_score = match diff.partial_cmp(&0.0) {
        Some(Ordering::Greater) => (diff - 0.5) / sigma_sq.sqrt(),
        Some(Ordering::Less) => (diff + 0.5) / sigma_sq.sqrt(),
        _ => 0.0,
    };
    let p_value = (2.0 * (1.0 - normal_cdf(z_score.abs()))).clamp(0.0, 1.0);

    MannWhitney {
        u_statistic: u1,
        z_score,
        p_value,
    }
}

/// Midranks of the pooled sample, the tie correction term sum(t^3 - t), and
/// a flag per pooled position marking membership in `x`
fn pooled_ranks(x: &[f64], y: &[f64]) -> (Vec<f64>, f64, Vec<bool>) {
    let mut pooled: Vec<(f64, bool)> = x
        .iter()
        .map(|&v| (v, true))
        .chain(y.iter().map(|&v| (v, false)))
        .collect();
    pooled.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));

    let n = pooled.len();
    let mut ranks = vec![0.0; n];
    let mut tie_term = 0.0;
    let mut i = 0;
    while i < n {
        let mut j = i;
        while j + 1 < n && pooled[j + 1].0 == pooled[i].0 {
            j += 1;
        }
        let count = (j - i + 1) as f64;
        let midrank = (i + j) as f64 / 2.0 + 1.0;
        for rank in ranks.iter_mut().take(j + 1).skip(i) {
            *rank = midrank;
        }
        if count > 1.0 {
            tie_term += count.powi(3) - count;
        }
        i = j + 1;
    }

    let membership = pooled.iter().map(|(_, in_x)| *in_x).collect();
    (ranks, tie_term, membership)
}

/// Cliff's delta by direct dominance counting
///
/// Positive when `x` tends to exceed `y`; always within [-1, 1].
pub fn cliffs_delta(x: &[f64], y: &[f64]) -> f64 {
    if x.is_empty() || y.is_empty() {
        return 0.0;
    }
    let mut more = 0i64;
    let mut less = 0i64;
    for &xi in x {
        for &yi in y {
            match xi.partial_cmp(&yi) {
                Some(Ordering::Greater) => more += 1,
                Some(Ordering::Less) => less += 1,
                _ => {}
            }
        }
    }
    (more - less) as f64 / (x.len() * y.len()) as f64
}

/// Shapiro-Wilk test of composite normality (Royston's AS R94 approximation)
///
/// Returns (W, p) for 3 <= n <= 5000; None outside that range or for a
/// zero-variance sample, where the statistic is undefined.
pub fn shapiro_wilk(values: &[f64]) -> Option<(f64, f64)> {
    let n = values.len();
    if !(3..=5000).contains(&n) {
        return None;
    }

    let mut x = values.to_vec();
    x.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    let x_mean = mean(&x);
    let ss: f64 = x.iter().map(|v| (v - x_mean).powi(2)).sum();
    if ss <= f64::EPSILON * x_mean.abs().max(1.0) {
        return None;
    }

    let nf = n as f64;

    // Expected normal order statistics (Blom scores)
    let m: Vec<f64> = (1..=n)
        .map(|i| normal_ppf((i as f64 - 0.375) / (nf + 0.25)))
        .collect();
    let m2: f64 = m.iter().map(|v| v * v).sum();

    // Weight vector per Royston's polynomial corrections to the two
    // (or one, for n <= 5) outermost coefficients
    let mut a = vec![0.0; n];
    if n == 3 {
        a[0] = -std::f64::consts::FRAC_1_SQRT_2;
        a[2] = std::f64::consts::FRAC_1_SQRT_2;
    } else {
        let u = 1.0 / nf.sqrt();
        let c_n = m[n - 1] / m2.sqrt();
        let a_n = c_n + 0.221157 * u - 0.147981 * u.powi(2) - 2.071190 * u.powi(3)
            + 4.434685 * u.powi(4)
            - 2.706056 * u.powi(5);

        if n <= 5 {
            let phi = (m2 - 2.0 * m[n - 1].powi(2)) / (1.0 - 2.0 * a_n.powi(2));
            for i in 1..n - 1 {
                a[i] = m[i] / phi.sqrt();
            }
            a[n - 1] = a_n;
            a[0] = -a_n;
        } else {
            let c_n1 = m[n - 2] / m2.sqrt();
            let a_n1 = c_n1 + 0.042981 * u - 0.293762 * u.powi(2) - 1.752461 * u.powi(3)
                + 5.682633 * u.powi(4)
                - 3.582633 * u.powi(5);
            let phi = (m2 - 2.0 * m[n - 1].powi(2) - 2.0 * m[n - 2].powi(2))
                / (1.0 - 2.0 * a_n.powi(2) - 2.0 * a_n1.powi(2));
            for i in 2..n - 2 {
                a[i] = m[i] / phi.sqrt();
            }
            a[n - 1] = a_n;
            a[0] = -a_n;
            a[n - 2] = a_n1;
            a[1] = -a_n1;
        }
    }

    let num: f64 = a.iter().zip(&x).map(|(ai, xi)| ai * xi).sum();
    let w = (num * num / ss).min(1.0);

    let p = if n == 3 {
        // Exact small-sample distribution
        (6.0 / PI) * (w.sqrt().asin() - (0.75f64).sqrt().asin())
    } else if n <= 11 {
        let gamma = -2.273 + 0.459 * nf;
        let arg = (gamma - (1.0 - w).max(1e-12).ln()).max(1e-12);
        let wt = -arg.ln();
        let mu = 0.5440 - 0.39978 * nf + 0.025054 * nf.powi(2) - 0.0006714 * nf.powi(3);
        let sigma = (1.3822 - 0.77857 * nf + 0.062767 * nf.powi(2) - 0.0020322 * nf.powi(3)).exp();
        1.0 - normal_cdf((wt - mu) / sigma)
    } else {
        let lnn = nf.ln();
        let wt = (1.0 - w).max(1e-12).ln();
        let mu = -1.5861 - 0.31082 * lnn - 0.083751 * lnn.powi(2) + 0.0038915 * lnn.powi(3);
        let sigma = (-0.4803 - 0.082676 * lnn + 0.0030302 * lnn.powi(2)).exp();
        1.0 - normal_cdf((wt - mu) / sigma)
    };

    Some((w, p.clamp(0.0, 1.0)))
}

/// Standard normal CDF (Abramowitz & Stegun 7.1.26, |error| < 7.5e-8)
pub fn normal_cdf(x: f64) -> f64 {
    const A1: f64 = 0.254829592;
    const A2: f64 = -0.284496736;
    const A3: f64 = 1.421413741;
    const A4: f64 = -1.453152027;
    const A5: f64 = 1.061405429;
    const P: f64 = 0.3275911;

    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs() / std::f64::consts::SQRT_2;

    let t = 1.0 / (1.0 + P * x);
    let y = 1.0 - (((((A5 * t + A4) * t) + A3) * t + A2) * t + A1) * t * (-x * x).exp();

    0.5 * (1.0 + sign * y)
}

/// Inverse standard normal CDF (Acklam's rational approximation)
fn normal_ppf(p: f64) -> f64 {
    const A: [f64; 6] = [
        -3.969683028665376e+01,
        2.209460984245205e+02,
        -2.759285104469687e+02,
        1.383577518672690e+02,
        -3.066479806614716e+01,
        2.506628277459239e+00,
    ];
    const B: [f64; 5] = [
        -5.447609879822406e+01,
        1.615858368580409e+02,
        -1.556989798598866e+02,
        6.680131188771972e+01,
        -1.328068155288572e+01,
    ];
    const C: [f64; 6] = [
        -7.784894002430293e-03,
        -3.223964580411365e-01,
        -2.400758277161838e+00,
        -2.549732539343734e+00,
        4.374664141464968e+00,
        2.938163982698783e+00,
    ];
    const D: [f64; 4] = [
        7.784695709041462e-03,
        3.224671290700398e-01,
        2.445134137142996e+00,
        3.754408661907416e+00,
    ];
    const P_LOW: f64 = 0.02425;

    if p <= 0.0 {
        return f64::NEG_INFINITY;
    }
    if p >= 1.0 {
        return f64::INFINITY;
    }

    if p < P_LOW {
        let q = (-2.0 * p.ln()).sqrt();
        (((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    } else if p <= 1.0 - P_LOW {
        let q = p - 0.5;
        let r = q * q;
        (((((A[0] * r + A[1]) * r + A[2]) * r + A[3]) * r + A[4]) * r + A[5]) * q
            / (((((B[0] * r + B[1]) * r + B[2]) * r + B[3]) * r + B[4]) * r + 1.0)
    } else {
        let q = (-2.0 * (1.0 - p).ln()).sqrt();
        -(((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    }
}

/// Print a readable per-metric results table
pub fn print_summary(output: &AnalysisOutput) {
    for analysis in &output.metrics {
        match analysis {
            MetricAnalysis::Skipped { metric, reason } => {
                println!("\n=== {} ===", metric.id());
                println!("  skipped: {reason}");
            }
            MetricAnalysis::Analyzed {
                metric,
                normality,
                comparisons,
            } => {
                println!("\n=== {} ===", metric.id());
                println!("Shapiro-Wilk normality:");
                for n in normality {
                    let verdict = if n.p_value > ALPHA {
                        "normal"
                    } else {
                        "non-normal"
                    };
                    println!(
                        "  {:12} W={:.4} p={:.4} [{verdict}]",
                        n.approach.id(),
                        n.w_statistic,
                        n.p_value
                    );
                }
                println!(
                    "Mann-Whitney U (corrected alpha {:.4} over {} tracked pairs):",
                    corrected_alpha(),
                    TRACKED_PAIRS.len()
                );
                for c in comparisons {
                    let sig = if c.corrected_significant {
                        "***"
                    } else if c.tracked {
                        "n.s."
                    } else {
                        "  - "
                    };
                    println!(
                        "  {:>10} vs {:10} U={:8.1} p={:.3e} d={:+.3} ({}) {sig}",
                        c.first.id(),
                        c.second.id(),
                        c.u_statistic,
                        c.p_value,
                        c.cliffs_delta,
                        c.effect.label()
                    );
                }
            }
        }
    }

    if let Some(reuse) = &output.reuse_vs_adhoc {
        println!("\n=== setup_time_hours: smata_reuse vs adhoc ===");
        println!(
            "  reuse mean {:.2}h, adhoc mean {:.2}h, reduction {:.1}%",
            reuse.reuse_mean, reuse.adhoc_mean, reuse.reduction_percent
        );
        println!(
            "  U={:.1} p={:.3e} d={:+.3} ({})",
            reuse.u_statistic,
            reuse.p_value,
            reuse.cliffs_delta,
            reuse.effect.label()
        );
    }
}
