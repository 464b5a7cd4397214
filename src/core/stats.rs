//! Statistic calculators
//!
//! Pure functions over numeric readings. Every calculator returns `None` as
//! the explicit "undefined" result when the inputs cannot produce a number;
//! none of them ever yields NaN, clamps, or rounds.
//!
//! For `mean` and the coefficients of variation a value counts as valid only
//! if it is finite and strictly positive: dosimeter and kV readings cannot
//! be zero or negative, so such entries are treated as not-yet-entered.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Which statistic a table derives from its readings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum StatisticKind {
    Mean,
    PercentDeviation,
    AbsoluteDeviation,
    #[value(name = "cov")]
    CoefficientOfVariation,
    #[value(name = "sample-cov")]
    SampleCoefficientOfVariation,
    #[value(name = "col")]
    LinearityCoefficient,
    Maximum,
}

impl StatisticKind {
    /// Compute this statistic over raw values.
    ///
    /// Deviations compare the mean of `values` with `nominal`; the linearity
    /// coefficient needs exactly two values.
    pub fn compute(&self, values: &[f64], nominal: Option<f64>) -> Option<f64> {
        match self {
            StatisticKind::Mean => mean(values),
            StatisticKind::PercentDeviation => percent_deviation(nominal?, mean(values)?),
            StatisticKind::AbsoluteDeviation => absolute_deviation(nominal?, signed_mean(values)?),
            StatisticKind::CoefficientOfVariation => coefficient_of_variation(values),
            StatisticKind::SampleCoefficientOfVariation => sample_coefficient_of_variation(values),
            StatisticKind::LinearityCoefficient => match values {
                [a, b] => linearity_coefficient(*a, *b),
                _ => None,
            },
            StatisticKind::Maximum => maximum(values),
        }
    }

    /// Statistics reported as a fraction (0.05), not a percentage (5)
    pub fn is_fraction(&self) -> bool {
        matches!(
            self,
            StatisticKind::CoefficientOfVariation
                | StatisticKind::SampleCoefficientOfVariation
                | StatisticKind::LinearityCoefficient
        )
    }
}

impl std::fmt::Display for StatisticKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StatisticKind::Mean => write!(f, "mean"),
            StatisticKind::PercentDeviation => write!(f, "% deviation"),
            StatisticKind::AbsoluteDeviation => write!(f, "deviation"),
            StatisticKind::CoefficientOfVariation => write!(f, "CoV"),
            StatisticKind::SampleCoefficientOfVariation => write!(f, "CoV (n-1)"),
            StatisticKind::LinearityCoefficient => write!(f, "CoL"),
            StatisticKind::Maximum => write!(f, "max"),
        }
    }
}

fn is_valid(v: f64) -> bool {
    v.is_finite() && v > 0.0
}

fn valid(values: &[f64]) -> impl Iterator<Item = f64> + '_ {
    values.iter().copied().filter(|v| is_valid(*v))
}

/// Arithmetic mean of the valid values
pub fn mean(values: &[f64]) -> Option<f64> {
    let (sum, count) = valid(values).fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

/// `|(measured - nominal) / nominal| * 100`
pub fn percent_deviation(nominal: f64, measured: f64) -> Option<f64> {
    if !nominal.is_finite() || !measured.is_finite() || nominal == 0.0 {
        return None;
    }
    Some(((measured - nominal) / nominal).abs() * 100.0)
}

/// Mean over every finite value, zero and negative included. CT numbers
/// are signed (water is 0 HU), so the positive-only filter of [`mean`]
/// does not apply to them.
pub fn signed_mean(values: &[f64]) -> Option<f64> {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() {
        None
    } else {
        Some(finite.iter().sum::<f64>() / finite.len() as f64)
    }
}

/// `|measured - nominal|` in the measurement's own unit
pub fn absolute_deviation(nominal: f64, measured: f64) -> Option<f64> {
    if !nominal.is_finite() || !measured.is_finite() {
        return None;
    }
    Some((measured - nominal).abs())
}

/// Population standard deviation over mean, as a fraction (0.05 = 5%)
pub fn coefficient_of_variation(values: &[f64]) -> Option<f64> {
    cov_with_divisor(values, |n| n as f64)
}

/// Sample (n-1) standard deviation over mean, as a fraction
pub fn sample_coefficient_of_variation(values: &[f64]) -> Option<f64> {
    cov_with_divisor(values, |n| (n - 1) as f64)
}

fn cov_with_divisor(values: &[f64], divisor: impl Fn(usize) -> f64) -> Option<f64> {
    let valid: Vec<f64> = valid(values).collect();
    match valid.len() {
        0 => None,
        // A single reading has no spread: perfectly consistent by convention.
        1 => Some(0.0),
        n => {
            let mean = valid.iter().sum::<f64>() / n as f64;
            let sum_sq: f64 = valid.iter().map(|v| (v - mean).powi(2)).sum();
            let std_dev = (sum_sq / divisor(n)).sqrt();
            Some(std_dev / mean)
        }
    }
}

/// Coefficient of linearity between two averaged outputs:
/// `|a - b| / (a + b)`
pub fn linearity_coefficient(a: f64, b: f64) -> Option<f64> {
    if !a.is_finite() || !b.is_finite() || a < 0.0 || b < 0.0 {
        return None;
    }
    let sum = a + b;
    if sum == 0.0 {
        return None;
    }
    Some((a - b).abs() / sum)
}

/// Largest finite value. Zero and negative values count here: a leakage
/// survey can legitimately read 0.
pub fn maximum(values: &[f64]) -> Option<f64> {
    values
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |m| m.max(v))))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() < tol
    }

    #[test]
    fn test_mean_basic() {
        let m = mean(&[80.1, 80.2, 80.3]).unwrap();
        assert!(approx(m, 80.2, 1e-9), "mean = {}", m);
    }

    #[test]
    fn test_mean_excludes_invalid_values() {
        let m = mean(&[10.0, 0.0, -5.0, f64::NAN, f64::INFINITY, 20.0]).unwrap();
        assert!(approx(m, 15.0, 1e-12));
    }

    #[test]
    fn test_mean_undefined_without_values() {
        assert_eq!(mean(&[]), None);
        assert_eq!(mean(&[0.0, -1.0, f64::NAN]), None);
    }

    #[test]
    fn test_percent_deviation() {
        let d = percent_deviation(80.0, 80.2).unwrap();
        assert!(approx(d, 0.25, 1e-9), "deviation = {}", d);

        let d = percent_deviation(100.0, 120.0).unwrap();
        assert!(approx(d, 20.0, 1e-9));

        // Symmetric in sign
        let d = percent_deviation(100.0, 80.0).unwrap();
        assert!(approx(d, 20.0, 1e-9));
    }

    #[test]
    fn test_percent_deviation_undefined() {
        assert_eq!(percent_deviation(0.0, 5.0), None);
        assert_eq!(percent_deviation(f64::NAN, 5.0), None);
        assert_eq!(percent_deviation(5.0, f64::INFINITY), None);
    }

    #[test]
    fn test_signed_mean_keeps_zero_and_negative() {
        let m = signed_mean(&[-2.0, 0.0, 5.0]).unwrap();
        assert!(approx(m, 1.0, 1e-12));
        assert_eq!(signed_mean(&[f64::NAN]), None);
    }

    #[test]
    fn test_absolute_deviation() {
        assert_eq!(absolute_deviation(0.0, -3.0), Some(3.0));
        assert_eq!(absolute_deviation(f64::NAN, 1.0), None);
    }

    #[test]
    fn test_cov_single_value_is_zero() {
        assert_eq!(coefficient_of_variation(&[10.0]), Some(0.0));
        assert_eq!(sample_coefficient_of_variation(&[10.0]), Some(0.0));
    }

    #[test]
    fn test_cov_population() {
        // mean 100, population variance 800/3
        let cov = coefficient_of_variation(&[100.0, 80.0, 120.0]).unwrap();
        let expected = (800.0_f64 / 3.0).sqrt() / 100.0;
        assert!(approx(cov, expected, 1e-12), "cov = {}", cov);
    }

    #[test]
    fn test_cov_sample() {
        let cov = sample_coefficient_of_variation(&[100.0, 80.0, 120.0]).unwrap();
        assert!(approx(cov, 0.2, 1e-12), "cov = {}", cov);
    }

    #[test]
    fn test_cov_identical_values() {
        assert_eq!(coefficient_of_variation(&[5.0, 5.0, 5.0]), Some(0.0));
    }

    #[test]
    fn test_cov_undefined() {
        assert_eq!(coefficient_of_variation(&[]), None);
        assert_eq!(coefficient_of_variation(&[0.0]), None);
    }

    #[test]
    fn test_linearity_coefficient() {
        let col = linearity_coefficient(1.00, 1.02).unwrap();
        assert!(approx(col, 0.02 / 2.02, 1e-12));
        assert!(col < 0.0100);
    }

    #[test]
    fn test_linearity_undefined() {
        assert_eq!(linearity_coefficient(0.0, 0.0), None);
        assert_eq!(linearity_coefficient(-1.0, 2.0), None);
        assert_eq!(linearity_coefficient(1.0, -2.0), None);
        assert_eq!(linearity_coefficient(f64::NAN, 1.0), None);
    }

    #[test]
    fn test_maximum() {
        assert_eq!(maximum(&[0.2, 0.9, 0.0]), Some(0.9));
        assert_eq!(maximum(&[0.0]), Some(0.0));
        assert_eq!(maximum(&[f64::NAN]), None);
        assert_eq!(maximum(&[]), None);
    }

    #[test]
    fn test_kind_compute() {
        let v = StatisticKind::PercentDeviation
            .compute(&[120.0], Some(100.0))
            .unwrap();
        assert!(approx(v, 20.0, 1e-9));
        assert_eq!(StatisticKind::PercentDeviation.compute(&[120.0], None), None);
        assert!(StatisticKind::LinearityCoefficient
            .compute(&[1.0, 1.02], None)
            .is_some());
        assert_eq!(
            StatisticKind::LinearityCoefficient.compute(&[1.0], None),
            None
        );
    }

    #[test]
    fn test_no_nan_escapes() {
        for v in [
            mean(&[f64::NAN]),
            coefficient_of_variation(&[f64::NAN, f64::NAN]),
            percent_deviation(f64::NAN, f64::NAN),
            linearity_coefficient(f64::NAN, f64::NAN),
        ] {
            assert!(v.is_none());
        }
    }
}
