//! Terminal tables for evaluation output

use tabled::builder::Builder;
use tabled::settings::Style;

use crate::cli::helpers::{escape_csv, escape_tsv, truncate_str};
use crate::entities::report::ReportEvaluation;
use crate::entities::test_table::TableEvaluation;
use crate::render::format_value;

const MAX_SETTING_WIDTH: usize = 28;

/// Bordered table of one evaluated test table
pub fn evaluation_table(eval: &TableEvaluation, decimals: usize) -> String {
    let mut builder = Builder::default();
    builder.push_record([
        "Setting".to_string(),
        "Readings".to_string(),
        eval.statistic.to_string(),
        "Tolerance".to_string(),
        "Result".to_string(),
    ]);

    for row in &eval.rows {
        let tolerance = row
            .tolerance
            .clone()
            .or_else(|| eval.tolerance.clone())
            .unwrap_or_else(|| "—".to_string());
        builder.push_record([
            truncate_str(&row.setting, MAX_SETTING_WIDTH),
            row.readings.join(", "),
            format_value(row.statistic, decimals),
            tolerance,
            row.verdict.map(|v| v.label()).unwrap_or("ref").to_string(),
        ]);
    }

    let mut table = builder.build();
    table.with(Style::rounded());
    table.to_string()
}

/// Header line of every flat export
pub const FLAT_HEADER: [&str; 8] = [
    "test", "tube", "setting", "readings", "statistic", "value", "tolerance", "verdict",
];

/// One line per evaluated row across the whole report
pub fn flat_rows(eval: &ReportEvaluation, decimals: usize) -> Vec<[String; 8]> {
    let mut lines = Vec::new();
    for table in &eval.tables {
        for row in &table.rows {
            lines.push([
                table.test.to_string(),
                table.tube.map(|t| t.to_string()).unwrap_or_default(),
                row.setting.clone(),
                row.readings.join(" "),
                table.statistic.to_string(),
                row.statistic
                    .map(|v| format!("{:.*}", decimals, v))
                    .unwrap_or_default(),
                row.tolerance
                    .clone()
                    .or_else(|| table.tolerance.clone())
                    .unwrap_or_default(),
                row.verdict.map(|v| v.to_string()).unwrap_or_default(),
            ]);
        }
    }
    lines
}

pub fn to_tsv(lines: &[[String; 8]]) -> String {
    let mut out = FLAT_HEADER.join("\t");
    out.push('\n');
    for line in lines {
        let cells: Vec<String> = line.iter().map(|c| escape_tsv(c)).collect();
        out.push_str(&cells.join("\t"));
        out.push('\n');
    }
    out
}

pub fn to_csv(lines: &[[String; 8]]) -> String {
    let mut out = FLAT_HEADER.join(",");
    out.push('\n');
    for line in lines {
        let cells: Vec<String> = line.iter().map(|c| escape_csv(c)).collect();
        out.push_str(&cells.join(","));
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tsv_header_and_escaping() {
        let lines = vec![[
            "timer_accuracy".to_string(),
            String::new(),
            "100 ms".to_string(),
            "101\t99".to_string(),
            "% deviation".to_string(),
            "1.00".to_string(),
            "<= 10%".to_string(),
            "pass".to_string(),
        ]];
        let tsv = to_tsv(&lines);
        let mut it = tsv.lines();
        assert_eq!(it.next(), Some(FLAT_HEADER.join("\t").as_str()));
        assert_eq!(it.next().map(|l| l.split('\t').count()), Some(8));
    }

    #[test]
    fn test_csv_quotes_commas() {
        let lines = vec![[
            "operating_potential".to_string(),
            String::new(),
            "80 kVp, 100 mA".to_string(),
            "80.1 80.2".to_string(),
            "mean".to_string(),
            "80.15".to_string(),
            "80 ± 2".to_string(),
            "pass".to_string(),
        ]];
        let csv = to_csv(&lines);
        assert!(csv.contains("\"80 kVp, 100 mA\""));
    }
}
