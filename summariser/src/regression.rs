use std::collections::BTreeMap;

use snapshotter_bench_core::prelude::BenchError;
use snapshotter_bench_summary_model::ResultSummary;

use crate::filter::baseline_for;

/// Relative increase over the baseline above which a metric counts as regressed.
pub const DEFAULT_REGRESSION_THRESHOLD: f64 = 0.05;

/// Outcome of comparing a set of metrics against a baseline.
#[derive(Debug, Clone, PartialEq)]
pub enum RegressionCheck {
    NoRegression,
    Regressed {
        key: String,
        old: f64,
        new: f64,
        /// Relative difference, `(new - old) / old`.
        diff: f64,
    },
}

impl RegressionCheck {
    pub fn is_regression(&self) -> bool {
        matches!(self, RegressionCheck::Regressed { .. })
    }

    /// Convert a detected regression into [`BenchError::RegressionDetected`].
    pub fn into_result(self) -> Result<(), BenchError> {
        match self {
            RegressionCheck::NoRegression => Ok(()),
            RegressionCheck::Regressed { key, old, new, diff } => {
                Err(BenchError::RegressionDetected { key, old, new, diff })
            }
        }
    }
}

/// Check that `threshold` is usable as a relative increase, i.e. finite and not negative.
pub fn validate_threshold(threshold: f64) -> anyhow::Result<f64> {
    if !threshold.is_finite() || threshold < 0.0 {
        anyhow::bail!("The regression threshold must be a non-negative number, got {threshold}");
    }

    Ok(threshold)
}

/// Parse and validate a threshold given on the command line.
pub fn parse_threshold(s: &str) -> anyhow::Result<f64> {
    validate_threshold(s.parse::<f64>()?)
}

/// Compare `new` against `old`, stopping at the first key whose relative increase exceeds
/// `threshold`.
///
/// Keys are visited in sorted order. Keys only present in `new` are ignored. Keys missing from
/// `new`, and keys whose baseline is zero or not finite, cannot be compared and are skipped with a
/// warning.
pub fn check_regression(
    old: &BTreeMap<String, f64>,
    new: &BTreeMap<String, f64>,
    threshold: f64,
) -> RegressionCheck {
    for (key, &old_value) in old {
        let Some(&new_value) = new.get(key) else {
            log::warn!("{key}: missing from the new results, skipping");
            continue;
        };
        if old_value == 0.0 || !old_value.is_finite() {
            log::warn!("{key}: baseline value is {old_value}, cannot compute a relative difference");
            continue;
        }

        let diff = (new_value - old_value) / old_value;
        log::info!(
            "{key}: old={old_value}, new={new_value}, diff={:.2}%",
            diff * 100.0
        );
        if diff > threshold {
            log::error!("Performance regression detected in {key}");
            return RegressionCheck::Regressed {
                key: key.clone(),
                old: old_value,
                new: new_value,
                diff,
            };
        }
    }

    RegressionCheck::NoRegression
}

/// The metrics of a summary that take part in regression checks.
///
/// Standard deviations describe noise rather than speed, so only means and medians are compared.
pub fn comparable_metrics(summary: &ResultSummary) -> BTreeMap<String, f64> {
    summary
        .metrics()
        .into_iter()
        .filter(|(key, _)| !key.ends_with("_stddev"))
        .collect()
}

/// Check every summary in `results` against the matching summary in `baseline`.
///
/// Results without a baseline are skipped. Returns [`BenchError::RegressionDetected`] for the
/// first regression found.
pub fn compare_with_baseline(
    baseline: &[ResultSummary],
    results: &[ResultSummary],
    threshold: f64,
) -> Result<(), BenchError> {
    for result in results {
        let case = result.case();
        let Some(old) = baseline_for(&case, baseline) else {
            log::info!(
                "No baseline for image '{}' with snapshotter '{}', skipping regression check",
                case.image,
                case.snapshotter
            );
            continue;
        };

        log::info!("Checking '{}' against baseline", case.image);
        check_regression(&comparable_metrics(old), &comparable_metrics(result), threshold)
            .into_result()?;
    }

    Ok(())
}
