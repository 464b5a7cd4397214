//! Tolerance engine tests through the public library API

use qat::core::batch::{evaluate_table, ToleranceMode};
use qat::core::reading::{AppliedSetting, MeasurementRow};
use qat::core::stats;
use qat::core::tolerance::{Operator, ThresholdKind, ToleranceError, ToleranceRule, ToleranceSpec};
use qat::core::verdict::{evaluate, Verdict};
use std::collections::HashMap;

fn rule(op: Operator, threshold: f64) -> ToleranceRule {
    ToleranceRule::absolute(op, threshold).unwrap()
}

fn kvp_row(kvp: f64, readings: &[&str]) -> MeasurementRow {
    MeasurementRow::with_raw_readings(
        AppliedSetting {
            kvp: Some(kvp),
            ..AppliedSetting::default()
        },
        readings.iter().copied(),
    )
}

// ============================================================================
// Operator boundaries
// ============================================================================

#[test]
fn test_operator_boundaries_at_threshold() {
    let cases = [
        (Operator::LessOrEqual, 5.0, Verdict::Pass),
        (Operator::LessOrEqual, 5.0001, Verdict::Fail),
        (Operator::Less, 5.0, Verdict::Fail),
        (Operator::Less, 4.9999, Verdict::Pass),
        (Operator::GreaterOrEqual, 5.0, Verdict::Pass),
        (Operator::GreaterOrEqual, 4.9999, Verdict::Fail),
        (Operator::Greater, 5.0, Verdict::Fail),
        (Operator::Greater, 5.0001, Verdict::Pass),
        (Operator::Equal, 5.0, Verdict::Pass),
        (Operator::Equal, 5.0 + 1e-7, Verdict::Pass),
        (Operator::Equal, 5.001, Verdict::Fail),
    ];
    for (op, statistic, expected) in cases {
        assert_eq!(
            evaluate(Some(statistic), &rule(op, 5.0)),
            expected,
            "{} 5 with statistic {}",
            op,
            statistic
        );
    }
}

#[test]
fn test_plus_minus_symmetry() {
    let band = ToleranceRule::plus_minus(100.0, 2.0).unwrap();
    for (statistic, expected) in [
        (98.0, Verdict::Pass),
        (102.0, Verdict::Pass),
        (100.0, Verdict::Pass),
        (97.99, Verdict::Fail),
        (102.01, Verdict::Fail),
    ] {
        assert_eq!(evaluate(Some(statistic), &band), expected, "{}", statistic);
    }
}

#[test]
fn test_undefined_statistic_is_undetermined() {
    let r = rule(Operator::LessOrEqual, 5.0);
    assert_eq!(evaluate(None, &r), Verdict::Undetermined);
    assert_eq!(evaluate(stats::mean(&[]), &r), Verdict::Undetermined);
    assert_eq!(evaluate(Some(f64::NAN), &r), Verdict::Undetermined);
}

#[test]
fn test_evaluation_is_deterministic() {
    let r = rule(Operator::LessOrEqual, 0.05);
    let values = [100.0, 80.0, 120.0];
    let first = evaluate(stats::coefficient_of_variation(&values), &r);
    for _ in 0..10 {
        assert_eq!(evaluate(stats::coefficient_of_variation(&values), &r), first);
    }
}

// ============================================================================
// Tolerance construction
// ============================================================================

#[test]
fn test_spec_text_forms() {
    let spec: ToleranceSpec = "<= 5%".parse().unwrap();
    assert_eq!(spec.threshold_kind, ThresholdKind::Percentage);
    assert_eq!(spec.to_rule().unwrap().operator(), Operator::LessOrEqual);

    let spec: ToleranceSpec = ">= 2.9".parse().unwrap();
    assert_eq!(spec.to_rule().unwrap().threshold(), 2.9);
}

#[test]
fn test_construction_errors() {
    assert!(matches!(
        "?? 5".parse::<ToleranceSpec>().unwrap().to_rule(),
        Err(ToleranceError::UnknownOperator(_))
    ));
    assert!(matches!(
        "± 2".parse::<ToleranceSpec>().unwrap().to_rule(),
        Err(ToleranceError::InvalidToleranceSpec { .. })
    ));
    assert!(matches!(
        ToleranceRule::absolute(Operator::LessOrEqual, -1.0),
        Err(ToleranceError::InvalidToleranceSpec { .. })
    ));
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn test_scenario_kvp_within_band() {
    let row = kvp_row(80.0, &["80.1", "80.2", "80.3"]);
    let mut rules = HashMap::new();
    rules.insert(row.id, ToleranceRule::plus_minus(80.0, 2.0).unwrap());

    let results = evaluate_table(
        std::slice::from_ref(&row),
        |r| stats::mean(&r.values()),
        &ToleranceMode::PerRow(rules),
    );
    assert_eq!(results[0].verdict, Verdict::Pass);
    assert!((results[0].statistic.unwrap() - 80.2).abs() < 1e-9);
}

#[test]
fn test_scenario_timer_deviation() {
    let deviation = stats::percent_deviation(100.0, 120.0);
    let rule = "<= 5%".parse::<ToleranceSpec>().unwrap().to_rule().unwrap();
    assert_eq!(evaluate(deviation, &rule), Verdict::Fail);
}

#[test]
fn test_scenario_linearity() {
    let col = stats::linearity_coefficient(1.00, 1.02);
    assert_eq!(evaluate(col, &rule(Operator::LessOrEqual, 0.1)), Verdict::Pass);
}

#[test]
fn test_shared_mode_keeps_blank_rows() {
    let rows = vec![
        kvp_row(80.0, &["1.0", "1.0"]),
        kvp_row(80.0, &["", ""]),
        kvp_row(80.0, &["1.0", "1.5"]),
    ];
    let results = evaluate_table(
        &rows,
        |r| stats::coefficient_of_variation(&r.values()),
        &ToleranceMode::Shared(rule(Operator::LessOrEqual, 0.05)),
    );

    assert_eq!(results.len(), 3);
    assert_eq!(results[0].verdict, Verdict::Pass);
    assert_eq!(results[1].verdict, Verdict::Undetermined);
    assert_eq!(results[1].row_id, rows[1].id);
    assert_eq!(results[2].verdict, Verdict::Fail);
}

#[test]
fn test_missing_tolerance_is_undetermined() {
    let rows = vec![kvp_row(80.0, &["80.0"])];
    let results = evaluate_table(&rows, |r| stats::mean(&r.values()), &ToleranceMode::Missing);
    assert_eq!(results[0].statistic, Some(80.0));
    assert_eq!(results[0].verdict, Verdict::Undetermined);
}
