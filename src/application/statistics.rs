// Statistical analyzer - Paired and two-sample t-tests with a normal approximation
use crate::domain::errors::StatsError;
use crate::domain::metrics::{DriverImprovement, TripMetric};
use crate::domain::week::parse_timestamp;
use chrono::NaiveDateTime;
use statrs::function::erf::erfc;
use std::collections::BTreeMap;

pub const SIGNIFICANCE_LEVEL: f64 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TTestResult {
    pub t_statistic: f64,
    pub p_value: f64,
}

impl TTestResult {
    /// No evidence either way.
    pub const NEUTRAL: TTestResult = TTestResult {
        t_statistic: 0.0,
        p_value: 1.0,
    };
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairedTTest {
    pub t_statistic: f64,
    pub p_value: f64,
    pub mean_difference: f64,
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample variance (n - 1 denominator).
fn sample_variance(values: &[f64], mean: f64) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64
}

/// Two-sided p-value for a statistic under the standard normal,
/// 2 * (1 - Phi(|t|)) = erfc(|t| / sqrt(2)).
pub fn two_sided_p_value(t: f64) -> f64 {
    erfc(t.abs() / std::f64::consts::SQRT_2)
}

/// Paired t-test on `current[i] - previous[i]`.
///
/// Needs equal lengths and at least two pairs. Differences with zero
/// variance carry no usable spread and are reported the same way.
pub fn paired_t_test(current: &[f64], previous: &[f64]) -> Result<PairedTTest, StatsError> {
    if current.len() != previous.len() {
        return Err(StatsError::InsufficientSamples {
            reason: format!(
                "paired samples differ in length ({} vs {})",
                current.len(),
                previous.len()
            ),
        });
    }
    if current.len() < 2 {
        return Err(StatsError::InsufficientSamples {
            reason: format!("need at least 2 pairs, got {}", current.len()),
        });
    }

    let diffs: Vec<f64> = current.iter().zip(previous).map(|(c, p)| c - p).collect();
    let n = diffs.len() as f64;
    let mean_difference = mean(&diffs);
    let variance = sample_variance(&diffs, mean_difference);
    if variance == 0.0 {
        return Err(StatsError::InsufficientSamples {
            reason: "paired differences have zero variance".to_string(),
        });
    }

    let t_statistic = mean_difference / (variance / n).sqrt();
    Ok(PairedTTest {
        t_statistic,
        p_value: two_sided_p_value(t_statistic),
        mean_difference,
    })
}

/// Pooled-variance two-sample t-test of `a` against `b`. Groups smaller than
/// two, or zero pooled variance, give the neutral result instead of failing.
pub fn two_sample_t_test(a: &[f64], b: &[f64]) -> TTestResult {
    let (n1, n2) = (a.len(), b.len());
    if n1 < 2 || n2 < 2 {
        return TTestResult::NEUTRAL;
    }

    let (m1, m2) = (mean(a), mean(b));
    let (v1, v2) = (sample_variance(a, m1), sample_variance(b, m2));
    let pooled = ((n1 - 1) as f64 * v1 + (n2 - 1) as f64 * v2) / (n1 + n2 - 2) as f64;
    if pooled == 0.0 {
        return TTestResult::NEUTRAL;
    }

    let t_statistic = (m1 - m2) / (pooled * (1.0 / n1 as f64 + 1.0 / n2 as f64)).sqrt();
    TTestResult {
        t_statistic,
        p_value: two_sided_p_value(t_statistic),
    }
}

/// Splits a chronological UBPK series at its midpoint and compares the
/// earlier half with the later half.
pub fn improvement_for_series(driver_id: &str, series: &[f64]) -> DriverImprovement {
    if series.len() < 2 {
        return DriverImprovement {
            driver_id: driver_id.to_string(),
            observations: series.len(),
            improved: false,
            t_statistic: 0.0,
            p_value: 1.0,
        };
    }

    let (earlier, later) = series.split_at(series.len() / 2);
    let test = two_sample_t_test(earlier, later);
    let improved = mean(later) < mean(earlier) && test.p_value < SIGNIFICANCE_LEVEL;

    DriverImprovement {
        driver_id: driver_id.to_string(),
        observations: series.len(),
        improved,
        t_statistic: test.t_statistic,
        p_value: test.p_value,
    }
}

/// Improvement per driver from trip UBPK ordered by start time. Trips with
/// no parsable start time sort first; trips without sensor records are not
/// observations. `driver_ids` lists drivers that must appear even without
/// trips.
pub fn improvement_analysis<'a>(
    driver_ids: impl IntoIterator<Item = &'a str>,
    trip_rows: &[TripMetric],
) -> Vec<DriverImprovement> {
    let mut series: BTreeMap<&str, Vec<(Option<NaiveDateTime>, &str, f64)>> = BTreeMap::new();
    for id in driver_ids {
        series.entry(id).or_default();
    }
    for trip in trip_rows.iter().filter(|trip| trip.is_measured()) {
        let started = trip.start_time.as_deref().and_then(parse_timestamp);
        series
            .entry(trip.driver_id.as_str())
            .or_default()
            .push((started, trip.trip_id.as_str(), trip.ubpk));
    }

    series
        .into_iter()
        .map(|(driver_id, mut observations)| {
            observations.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(b.1)));
            let values: Vec<f64> = observations.iter().map(|o| o.2).collect();
            improvement_for_series(driver_id, &values)
        })
        .collect()
}
