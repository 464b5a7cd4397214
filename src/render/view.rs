//! Display-ready view of an evaluated report

use serde::Serialize;

use crate::core::verdict::Verdict;
use crate::entities::report::{QaReport, ReportEvaluation};
use crate::entities::test_table::TableEvaluation;

/// Shown wherever a value or verdict is undetermined
pub const UNDETERMINED: &str = "—";

/// Fixed-point text for a statistic, or [`UNDETERMINED`]
pub fn format_value(value: Option<f64>, decimals: usize) -> String {
    match value {
        Some(v) if v.is_finite() => format!("{:.*}", decimals, v),
        _ => UNDETERMINED.to_string(),
    }
}

fn verdict_class(verdict: Option<Verdict>) -> &'static str {
    match verdict {
        Some(Verdict::Pass) => "pass",
        Some(Verdict::Fail) => "fail",
        Some(Verdict::Undetermined) => "undetermined",
        None => "reference",
    }
}

fn verdict_label(verdict: Option<Verdict>) -> &'static str {
    match verdict {
        Some(v) => v.label(),
        None => "Reference",
    }
}

#[derive(Debug, Serialize)]
pub struct RowView {
    pub setting: String,
    pub readings: Vec<String>,
    pub derived: String,
    pub statistic: String,
    pub tolerance: String,
    pub verdict: &'static str,
    pub verdict_class: &'static str,
}

#[derive(Debug, Serialize)]
pub struct TableView {
    pub title: String,
    pub tube: Option<String>,
    pub unit: &'static str,
    pub statistic: String,
    /// Present when one tolerance covers every row; otherwise each row
    /// carries its own
    pub tolerance: Option<String>,
    pub reading_columns: usize,
    pub has_derived: bool,
    pub rows: Vec<RowView>,
    pub verdict: &'static str,
    pub verdict_class: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ReportView {
    pub id: String,
    pub title: String,
    pub equipment: String,
    pub make: String,
    pub model: String,
    pub serial_number: String,
    pub location: String,
    pub institution: String,
    pub tester: String,
    pub test_date: String,
    pub status: String,
    pub tables: Vec<TableView>,
    pub missing: Vec<String>,
    pub verdict: &'static str,
    pub verdict_class: &'static str,
}

impl TableView {
    fn from_evaluation(eval: &TableEvaluation, decimals: usize) -> Self {
        let reading_columns = eval.rows.iter().map(|r| r.readings.len()).max().unwrap_or(0);
        let has_derived = eval.rows.iter().any(|r| r.derived.is_some());
        let per_row = eval.rows.iter().any(|r| r.tolerance.is_some());

        let rows = eval
            .rows
            .iter()
            .map(|row| {
                let mut readings = row.readings.clone();
                readings.resize(reading_columns, String::new());
                RowView {
                    setting: row.setting.clone(),
                    readings,
                    derived: format_value(row.derived, decimals),
                    statistic: format_value(row.statistic, decimals),
                    tolerance: row
                        .tolerance
                        .clone()
                        .unwrap_or_else(|| UNDETERMINED.to_string()),
                    verdict: verdict_label(row.verdict),
                    verdict_class: verdict_class(row.verdict),
                }
            })
            .collect();

        Self {
            title: eval.test.title().to_string(),
            tube: eval.tube.map(|t| t.to_string()),
            unit: eval.test.reading_unit(),
            statistic: eval.statistic.to_string(),
            tolerance: if per_row { None } else { eval.tolerance.clone() },
            reading_columns,
            has_derived,
            rows,
            verdict: eval.verdict.label(),
            verdict_class: verdict_class(Some(eval.verdict)),
        }
    }
}

impl ReportView {
    pub fn new(report: &QaReport, evaluation: &ReportEvaluation, decimals: usize) -> Self {
        let text = |value: &Option<String>| value.clone().unwrap_or_default();
        Self {
            id: report.id.to_string(),
            title: report.title.clone(),
            equipment: report.equipment.equipment_type.to_string(),
            make: text(&report.equipment.make),
            model: text(&report.equipment.model),
            serial_number: text(&report.equipment.serial_number),
            location: text(&report.equipment.location),
            institution: text(&report.institution),
            tester: report.tester.clone(),
            test_date: report
                .test_date
                .map(|d| d.format("%d-%m-%Y").to_string())
                .unwrap_or_default(),
            status: report.status.to_string(),
            tables: evaluation
                .tables
                .iter()
                .map(|t| TableView::from_evaluation(t, decimals))
                .collect(),
            missing: evaluation.missing.clone(),
            verdict: evaluation.verdict.label(),
            verdict_class: verdict_class(Some(evaluation.verdict)),
        }
    }
}
