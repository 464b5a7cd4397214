//! Batch evaluation over table rows
//!
//! Every row is evaluated on its own, including in shared-tolerance tables
//! where the printed report shows the tolerance only once. Rows that cannot
//! be evaluated stay in the output as `Undetermined`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, trace};

use crate::core::identity::RowId;
use crate::core::reading::MeasurementRow;
use crate::core::stats;
use crate::core::tolerance::ToleranceRule;
use crate::core::verdict::{self, Verdict};

/// Anything the batch evaluator can key a verdict on
pub trait Row {
    fn row_id(&self) -> RowId;
}

impl Row for MeasurementRow {
    fn row_id(&self) -> RowId {
        self.id
    }
}

/// How tolerances are assigned to rows
#[derive(Debug, Clone)]
pub enum ToleranceMode {
    /// One rule for the whole table
    Shared(ToleranceRule),
    /// Each row has its own rule; rows without one are undetermined
    PerRow(HashMap<RowId, ToleranceRule>),
    /// No tolerance configured yet
    Missing,
}

impl ToleranceMode {
    /// Rule that applies to `row_id`
    pub fn rule_for(&self, row_id: &RowId) -> Option<&ToleranceRule> {
        match self {
            ToleranceMode::Shared(rule) => Some(rule),
            ToleranceMode::PerRow(rules) => rules.get(row_id),
            ToleranceMode::Missing => None,
        }
    }

    pub fn is_shared(&self) -> bool {
        matches!(self, ToleranceMode::Shared(_))
    }
}

/// Per-row evaluation result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerdictRow {
    pub row_id: RowId,
    pub statistic: Option<f64>,
    pub verdict: Verdict,
}

/// Evaluate every row with `calculator` against the rule `mode` assigns it.
///
/// Output has one entry per input row, in input order.
pub fn evaluate_table<R, F>(rows: &[R], calculator: F, mode: &ToleranceMode) -> Vec<VerdictRow>
where
    R: Row,
    F: Fn(&R) -> Option<f64>,
{
    let results: Vec<VerdictRow> = rows
        .iter()
        .map(|row| {
            let row_id = row.row_id();
            let statistic = calculator(row);
            let verdict = verdict::evaluate_optional(statistic, mode.rule_for(&row_id));
            trace!(%row_id, ?statistic, %verdict, "row evaluated");
            VerdictRow {
                row_id,
                statistic,
                verdict,
            }
        })
        .collect();

    debug!(
        rows = results.len(),
        shared = mode.is_shared(),
        "table evaluated"
    );
    results
}

/// Evaluate the coefficient of linearity between each row and the row
/// before it.
///
/// `output` gives the normalised output of a row (e.g. mGy per mAs). The
/// result for a pair is keyed by the later row, so `n` rows produce `n - 1`
/// results and the first row acts as the reference.
pub fn evaluate_pairs<R, F>(rows: &[R], output: F, mode: &ToleranceMode) -> Vec<VerdictRow>
where
    R: Row,
    F: Fn(&R) -> Option<f64>,
{
    let outputs: Vec<Option<f64>> = rows.iter().map(&output).collect();

    let results: Vec<VerdictRow> = rows
        .iter()
        .enumerate()
        .skip(1)
        .map(|(i, row)| {
            let row_id = row.row_id();
            let statistic = match (outputs[i - 1], outputs[i]) {
                (Some(a), Some(b)) => stats::linearity_coefficient(a, b),
                _ => None,
            };
            let verdict = verdict::evaluate_optional(statistic, mode.rule_for(&row_id));
            VerdictRow {
                row_id,
                statistic,
                verdict,
            }
        })
        .collect();

    debug!(pairs = results.len(), "pairwise table evaluated");
    results
}

/// Counts and overall verdict for a table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TableSummary {
    pub pass: usize,
    pub fail: usize,
    pub undetermined: usize,
}

impl TableSummary {
    pub fn from_rows(rows: &[VerdictRow]) -> Self {
        rows.iter().fold(Self::default(), |mut s, r| {
            match r.verdict {
                Verdict::Pass => s.pass += 1,
                Verdict::Fail => s.fail += 1,
                Verdict::Undetermined => s.undetermined += 1,
            }
            s
        })
    }

    pub fn total(&self) -> usize {
        self.pass + self.fail + self.undetermined
    }

    /// Any failure fails the table; otherwise any gap (or an empty table)
    /// leaves it undetermined
    pub fn overall(&self) -> Verdict {
        if self.fail > 0 {
            Verdict::Fail
        } else if self.undetermined > 0 || self.total() == 0 {
            Verdict::Undetermined
        } else {
            Verdict::Pass
        }
    }
}
