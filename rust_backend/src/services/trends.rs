//! Statistical trend testing between two observation periods.

use crate::algorithms::stats::{mean, mean_confidence_interval, welch_t_test};
use crate::config::SIGNIFICANCE_LEVEL;
use crate::core::domain::{StatisticalTrend, Trackway, TrendMetric};

/// Confidence level of the per-period mean intervals.
pub const CONFIDENCE_LEVEL: f64 = 0.95;

/// Compare every [`TrendMetric`] between the two periods.
pub fn compute_statistical_trends(period1: &[Trackway], period2: &[Trackway]) -> Vec<StatisticalTrend> {
    TrendMetric::ALL
        .iter()
        .map(|&metric| {
            let sample1 = metric_sample(period1, metric);
            let sample2 = metric_sample(period2, metric);
            compare_samples(metric, &sample1, &sample2)
        })
        .collect()
}

/// Finite values of `metric` across the trackways.
fn metric_sample(trackways: &[Trackway], metric: TrendMetric) -> Vec<f64> {
    trackways
        .iter()
        .map(|t| metric.value_of(t))
        .filter(|v| v.is_finite())
        .collect()
}

/// Welch test plus 95% intervals for one metric.
///
/// With fewer than two observations on either side the test is not run: the
/// p-value is `None`, `significant` is false, and an empty sample has mean 0.
pub fn compare_samples(metric: TrendMetric, sample1: &[f64], sample2: &[f64]) -> StatisticalTrend {
    let period1_mean = mean(sample1).unwrap_or(0.0);
    let period2_mean = mean(sample2).unwrap_or(0.0);

    if sample1.len() < 2 || sample2.len() < 2 {
        log::debug!(
            "Not enough trackways to test {} ({} vs {})",
            metric,
            sample1.len(),
            sample2.len()
        );
        return StatisticalTrend {
            metric,
            statistic: None,
            p_value: None,
            significant: false,
            period1_mean,
            period2_mean,
            ci1: None,
            ci2: None,
            n1: sample1.len(),
            n2: sample2.len(),
        };
    }

    let test = welch_t_test(sample1, sample2);
    let p_value = test.map(|t| t.p_value).filter(|p| p.is_finite());

    StatisticalTrend {
        metric,
        statistic: test.map(|t| t.statistic),
        p_value,
        significant: p_value.is_some_and(|p| p < SIGNIFICANCE_LEVEL),
        period1_mean,
        period2_mean,
        ci1: mean_confidence_interval(sample1, CONFIDENCE_LEVEL),
        ci2: mean_confidence_interval(sample2, CONFIDENCE_LEVEL),
        n1: sample1.len(),
        n2: sample2.len(),
    }
}
