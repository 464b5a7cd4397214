//! Test tables - one typed row schema per AERB test type
//!
//! Each variant of [`TestTable`] fixes which fields its rows carry, which
//! statistic is derived from them, and how tolerances are assigned. Row
//! structs require their setting fields, so a kVp table without an applied
//! kVp is rejected when the report is loaded rather than evaluated as blank.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

use crate::core::batch::{self, Row, TableSummary, ToleranceMode, VerdictRow};
use crate::core::config::Config;
use crate::core::identity::RowId;
use crate::core::reading::{valid_values, Reading, ReadingState};
use crate::core::stats::{self, StatisticKind};
use crate::core::tolerance::{
    Operator, ThresholdKind, ToleranceError, ToleranceRule, ToleranceSpec,
};
use crate::core::verdict::Verdict;
use crate::entities::equipment::Tube;

/// Errors that stop a table from being evaluated
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TableError {
    #[error(transparent)]
    Tolerance(#[from] ToleranceError),

    #[error("row id {0} is used by more than one row")]
    DuplicateRowId(RowId),
}

/// Test types
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum TestKind {
    OperatingPotential,
    TimerAccuracy,
    OutputReproducibility,
    Linearity,
    RadiationLeakage,
    HalfValueLayer,
    CtNumberAccuracy,
    ContrastResolution,
}

impl TestKind {
    pub fn all() -> &'static [TestKind] {
        &[
            TestKind::OperatingPotential,
            TestKind::TimerAccuracy,
            TestKind::OutputReproducibility,
            TestKind::Linearity,
            TestKind::RadiationLeakage,
            TestKind::HalfValueLayer,
            TestKind::CtNumberAccuracy,
            TestKind::ContrastResolution,
        ]
    }

    /// Heading used in printed reports
    pub fn title(&self) -> &'static str {
        match self {
            TestKind::OperatingPotential => "Accuracy of Operating Potential (kVp)",
            TestKind::TimerAccuracy => "Accuracy of Irradiation Time",
            TestKind::OutputReproducibility => "Reproducibility of Radiation Output",
            TestKind::Linearity => "Linearity of Radiation Output",
            TestKind::RadiationLeakage => "Radiation Leakage Level from X-ray Tube Housing",
            TestKind::HalfValueLayer => "Total Filtration (Half Value Layer)",
            TestKind::CtNumberAccuracy => "Accuracy of CT Number",
            TestKind::ContrastResolution => "Contrast Resolution",
        }
    }

    /// Unit of the readings in this table
    pub fn reading_unit(&self) -> &'static str {
        match self {
            TestKind::OperatingPotential => "kV",
            TestKind::TimerAccuracy => "ms",
            TestKind::OutputReproducibility | TestKind::Linearity => "mGy",
            TestKind::RadiationLeakage => "mGy/h",
            TestKind::HalfValueLayer => "mm Al",
            TestKind::CtNumberAccuracy => "HU",
            TestKind::ContrastResolution => "lp/cm",
        }
    }

    /// Built-in AERB tolerance, if the test has a single fixed one
    pub fn default_tolerance(&self) -> Option<ToleranceSpec> {
        let spec = |op: &str, threshold: f64, kind: ThresholdKind| {
            Some(ToleranceSpec::new(op, threshold, kind))
        };
        match self {
            TestKind::OperatingPotential => spec("±", 2.0, ThresholdKind::Absolute),
            TestKind::TimerAccuracy => spec("<=", 10.0, ThresholdKind::Percentage),
            TestKind::OutputReproducibility => spec("<=", 0.05, ThresholdKind::Absolute),
            TestKind::Linearity => spec("<=", 0.1, ThresholdKind::Absolute),
            TestKind::RadiationLeakage => spec("<=", 1.0, ThresholdKind::Absolute),
            TestKind::CtNumberAccuracy => spec("±", 4.0, ThresholdKind::Absolute),
            // Filtration depends on kVp; contrast depends on the phantom
            TestKind::HalfValueLayer | TestKind::ContrastResolution => None,
        }
    }
}

impl std::fmt::Display for TestKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TestKind::OperatingPotential => write!(f, "operating_potential"),
            TestKind::TimerAccuracy => write!(f, "timer_accuracy"),
            TestKind::OutputReproducibility => write!(f, "output_reproducibility"),
            TestKind::Linearity => write!(f, "linearity"),
            TestKind::RadiationLeakage => write!(f, "radiation_leakage"),
            TestKind::HalfValueLayer => write!(f, "half_value_layer"),
            TestKind::CtNumberAccuracy => write!(f, "ct_number_accuracy"),
            TestKind::ContrastResolution => write!(f, "contrast_resolution"),
        }
    }
}

/// Minimum half value layer (mm Al) by tube potential for general
/// diagnostic units. Only exact kVp matches are used.
const MIN_HVL_BY_KVP: &[(f64, f64)] = &[
    (50.0, 1.8),
    (60.0, 2.2),
    (70.0, 2.5),
    (80.0, 2.9),
    (90.0, 3.2),
    (100.0, 3.6),
    (110.0, 3.9),
    (120.0, 4.3),
    (130.0, 4.7),
    (140.0, 5.0),
    (150.0, 5.4),
];

/// Required minimum HVL at `kvp`, if the table lists it
pub fn minimum_hvl(kvp: f64) -> Option<f64> {
    MIN_HVL_BY_KVP
        .iter()
        .find(|(k, _)| (k - kvp).abs() < 1e-9)
        .map(|(_, hvl)| *hvl)
}

// ===== Row schemas =====

/// Operating potential: readings in kV at an applied kVp
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KvpRow {
    #[serde(default)]
    pub id: RowId,
    pub applied_kvp: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ma: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_ms: Option<f64>,
    #[serde(default)]
    pub readings: Vec<Reading>,
}

/// Timer accuracy: measured exposure times in ms
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerRow {
    #[serde(default)]
    pub id: RowId,
    pub set_time_ms: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kvp: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ma: Option<f64>,
    #[serde(default)]
    pub readings: Vec<Reading>,
}

/// Output reproducibility: repeated exposures at one setting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputRow {
    #[serde(default)]
    pub id: RowId,
    pub kvp: f64,
    pub mas: f64,
    #[serde(default)]
    pub readings: Vec<Reading>,
}

/// Linearity: output at increasing mAs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearityRow {
    #[serde(default)]
    pub id: RowId,
    pub mas: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kvp: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ma: Option<f64>,
    #[serde(default)]
    pub readings: Vec<Reading>,
}

impl LinearityRow {
    /// Mean output per mAs (mGy/mAs)
    pub fn output_per_mas(&self) -> Option<f64> {
        if !(self.mas.is_finite() && self.mas > 0.0) {
            return None;
        }
        stats::mean(&valid_values(&self.readings)).map(|m| m / self.mas)
    }
}

/// Leakage survey point, readings normalised to mGy in one hour at 1 m
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeakageRow {
    #[serde(default)]
    pub id: RowId,
    pub location: String,
    #[serde(default)]
    pub readings: Vec<Reading>,
}

/// Half value layer at an applied kVp
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HvlRow {
    #[serde(default)]
    pub id: RowId,
    pub applied_kvp: f64,
    /// Overrides the built-in minimum for this kVp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_min: Option<f64>,
    #[serde(default)]
    pub readings: Vec<Reading>,
}

/// CT number of a phantom insert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CtNumberRow {
    #[serde(default)]
    pub id: RowId,
    pub material: String,
    pub expected_hu: f64,
    #[serde(default)]
    pub readings: Vec<Reading>,
}

/// Contrast resolution observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContrastRow {
    #[serde(default)]
    pub id: RowId,
    pub label: String,
    #[serde(default)]
    pub readings: Vec<Reading>,
}

/// Common access to typed rows for evaluation, import and rendering
pub trait TableRow: Row {
    /// Short description of the applied setting
    fn setting_label(&self) -> String;
    fn readings(&self) -> &[Reading];
    fn readings_mut(&mut self) -> &mut Vec<Reading>;

    fn values(&self) -> Vec<f64> {
        valid_values(self.readings())
    }
}

macro_rules! impl_row {
    ($ty:ty, |$r:ident| $label:expr) => {
        impl Row for $ty {
            fn row_id(&self) -> RowId {
                self.id
            }
        }

        impl TableRow for $ty {
            fn setting_label(&self) -> String {
                let $r = self;
                $label
            }

            fn readings(&self) -> &[Reading] {
                &self.readings
            }

            fn readings_mut(&mut self) -> &mut Vec<Reading> {
                &mut self.readings
            }
        }
    };
}

impl_row!(KvpRow, |r| match r.ma {
    Some(ma) => format!("{} kVp, {} mA", r.applied_kvp, ma),
    None => format!("{} kVp", r.applied_kvp),
});
impl_row!(TimerRow, |r| format!("{} ms", r.set_time_ms));
impl_row!(OutputRow, |r| format!("{} kVp, {} mAs", r.kvp, r.mas));
impl_row!(LinearityRow, |r| format!("{} mAs", r.mas));
impl_row!(LeakageRow, |r| r.location.clone());
impl_row!(HvlRow, |r| format!("{} kVp", r.applied_kvp));
impl_row!(CtNumberRow, |r| format!("{} ({} HU)", r.material, r.expected_hu));
impl_row!(ContrastRow, |r| r.label.clone());

// ===== Tables =====

/// Rows of one test plus the options shared by the whole table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "R: Deserialize<'de>"))]
pub struct Table<R> {
    /// Tube the table belongs to on double-tube units
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tube: Option<Tube>,

    /// Overrides the configured tolerance for this table
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tolerance: Option<ToleranceSpec>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,

    #[serde(default)]
    pub rows: Vec<R>,
}

impl<R> Default for Table<R> {
    fn default() -> Self {
        Self {
            tube: None,
            tolerance: None,
            remarks: None,
            rows: Vec::new(),
        }
    }
}

/// A test table of any type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "test", rename_all = "snake_case")]
pub enum TestTable {
    OperatingPotential(Table<KvpRow>),
    TimerAccuracy(Table<TimerRow>),
    OutputReproducibility(Table<OutputRow>),
    Linearity(Table<LinearityRow>),
    RadiationLeakage(Table<LeakageRow>),
    HalfValueLayer(Table<HvlRow>),
    CtNumberAccuracy(Table<CtNumberRow>),
    ContrastResolution(Table<ContrastRow>),
}

/// Apply `$body` to the inner table whatever its row type
macro_rules! with_table {
    ($self:expr, |$t:ident| $body:expr) => {
        match $self {
            TestTable::OperatingPotential($t) => $body,
            TestTable::TimerAccuracy($t) => $body,
            TestTable::OutputReproducibility($t) => $body,
            TestTable::Linearity($t) => $body,
            TestTable::RadiationLeakage($t) => $body,
            TestTable::HalfValueLayer($t) => $body,
            TestTable::CtNumberAccuracy($t) => $body,
            TestTable::ContrastResolution($t) => $body,
        }
    };
}

/// Evaluated row, ready for display
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluatedRow {
    pub row_id: RowId,
    pub setting: String,
    /// Readings as entered
    pub readings: Vec<String>,
    /// Intermediate value shown before the statistic (mean, mGy/mAs)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub derived: Option<f64>,
    pub statistic: Option<f64>,
    /// `None` for the reference row of a pairwise table
    pub verdict: Option<Verdict>,
    /// Row-specific tolerance, when the table has no shared one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tolerance: Option<String>,
}

/// Result of evaluating one table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableEvaluation {
    pub test: TestKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tube: Option<Tube>,
    pub statistic: StatisticKind,
    /// Tolerance shown once for the whole table
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tolerance: Option<String>,
    pub rows: Vec<EvaluatedRow>,
    pub summary: TableSummary,
    pub verdict: Verdict,
}

impl TestTable {
    /// Empty table of the given type
    pub fn empty(kind: TestKind) -> Self {
        match kind {
            TestKind::OperatingPotential => TestTable::OperatingPotential(Table::default()),
            TestKind::TimerAccuracy => TestTable::TimerAccuracy(Table::default()),
            TestKind::OutputReproducibility => TestTable::OutputReproducibility(Table::default()),
            TestKind::Linearity => TestTable::Linearity(Table::default()),
            TestKind::RadiationLeakage => TestTable::RadiationLeakage(Table::default()),
            TestKind::HalfValueLayer => TestTable::HalfValueLayer(Table::default()),
            TestKind::CtNumberAccuracy => TestTable::CtNumberAccuracy(Table::default()),
            TestKind::ContrastResolution => TestTable::ContrastResolution(Table::default()),
        }
    }

    pub fn kind(&self) -> TestKind {
        match self {
            TestTable::OperatingPotential(_) => TestKind::OperatingPotential,
            TestTable::TimerAccuracy(_) => TestKind::TimerAccuracy,
            TestTable::OutputReproducibility(_) => TestKind::OutputReproducibility,
            TestTable::Linearity(_) => TestKind::Linearity,
            TestTable::RadiationLeakage(_) => TestKind::RadiationLeakage,
            TestTable::HalfValueLayer(_) => TestKind::HalfValueLayer,
            TestTable::CtNumberAccuracy(_) => TestKind::CtNumberAccuracy,
            TestTable::ContrastResolution(_) => TestKind::ContrastResolution,
        }
    }

    pub fn tube(&self) -> Option<Tube> {
        with_table!(self, |t| t.tube)
    }

    pub fn set_tube(&mut self, tube: Option<Tube>) {
        with_table!(self, |t| t.tube = tube)
    }

    pub fn tolerance(&self) -> Option<&ToleranceSpec> {
        with_table!(self, |t| t.tolerance.as_ref())
    }

    pub fn set_tolerance(&mut self, tolerance: Option<ToleranceSpec>) {
        with_table!(self, |t| t.tolerance = tolerance)
    }

    pub fn row_count(&self) -> usize {
        with_table!(self, |t| t.rows.len())
    }

    /// Ids of all rows in order
    pub fn row_ids(&self) -> Vec<RowId> {
        with_table!(self, |t| t.rows.iter().map(|r| r.row_id()).collect())
    }

    /// Remove a row by id. Other rows keep their ids.
    pub fn remove_row(&mut self, id: RowId) -> bool {
        with_table!(self, |t| {
            let before = t.rows.len();
            t.rows.retain(|r| r.row_id() != id);
            t.rows.len() != before
        })
    }

    /// Readings whose text is not a number
    pub fn unparseable_readings(&self) -> usize {
        with_table!(self, |t| t
            .rows
            .iter()
            .flat_map(|r| r.readings())
            .filter(|r| r.state() == ReadingState::Unparseable)
            .count())
    }

    pub fn clear_rows(&mut self) {
        with_table!(self, |t| t.rows.clear())
    }

    /// Move the rows of `other` onto the end of this table, returning how
    /// many were added. A table of a different test type is handed back.
    pub fn append(&mut self, other: TestTable) -> Result<usize, TestTable> {
        let added = other.row_count();
        match (self, other) {
            (TestTable::OperatingPotential(a), TestTable::OperatingPotential(b)) => a.rows.extend(b.rows),
            (TestTable::TimerAccuracy(a), TestTable::TimerAccuracy(b)) => a.rows.extend(b.rows),
            (TestTable::OutputReproducibility(a), TestTable::OutputReproducibility(b)) => {
                a.rows.extend(b.rows)
            }
            (TestTable::Linearity(a), TestTable::Linearity(b)) => a.rows.extend(b.rows),
            (TestTable::RadiationLeakage(a), TestTable::RadiationLeakage(b)) => a.rows.extend(b.rows),
            (TestTable::HalfValueLayer(a), TestTable::HalfValueLayer(b)) => a.rows.extend(b.rows),
            (TestTable::CtNumberAccuracy(a), TestTable::CtNumberAccuracy(b)) => a.rows.extend(b.rows),
            (TestTable::ContrastResolution(a), TestTable::ContrastResolution(b)) => {
                a.rows.extend(b.rows)
            }
            (_, other) => return Err(other),
        }
        Ok(added)
    }

    /// Tolerance in force: the table's own, else the configured default
    pub fn effective_tolerance(&self, config: &Config) -> Option<ToleranceSpec> {
        self.tolerance()
            .cloned()
            .or_else(|| config.tolerance_for(self.kind()))
    }

    /// First row id that appears more than once
    pub fn duplicate_row_id(&self) -> Option<RowId> {
        let mut seen = HashSet::new();
        self.row_ids().into_iter().find(|id| !seen.insert(*id))
    }

    /// Check row ids and build every tolerance rule the table would use,
    /// without computing any statistic
    pub fn validate(&self, config: &Config) -> Result<(), TableError> {
        if let Some(id) = self.duplicate_row_id() {
            return Err(TableError::DuplicateRowId(id));
        }
        let spec = self.effective_tolerance(config);
        match self {
            TestTable::OperatingPotential(_)
            | TestTable::TimerAccuracy(_)
            | TestTable::CtNumberAccuracy(_) => {
                if let Some(spec) = &spec {
                    if spec.is_plus_minus() {
                        spec.centered_at(0.0).to_rule()?;
                    } else {
                        spec.to_rule()?;
                    }
                }
            }
            TestTable::HalfValueLayer(t) => {
                spec.as_ref().map(ToleranceSpec::to_rule).transpose()?;
                for min in t.rows.iter().filter_map(|r| r.required_min) {
                    ToleranceRule::absolute(Operator::GreaterOrEqual, min)?;
                }
            }
            _ => {
                spec.as_ref().map(ToleranceSpec::to_rule).transpose()?;
            }
        }
        Ok(())
    }

    /// Evaluate every row of the table
    pub fn evaluate(&self, config: &Config) -> Result<TableEvaluation, TableError> {
        if let Some(id) = self.duplicate_row_id() {
            return Err(TableError::DuplicateRowId(id));
        }
        let spec = self.effective_tolerance(config);
        let kind = self.kind();

        let (statistic, tolerance, rows) = match self {
            TestTable::OperatingPotential(t) => {
                evaluate_against_nominal(&t.rows, spec.as_ref(), |r| r.applied_kvp, stats::mean)?
            }
            TestTable::TimerAccuracy(t) => {
                evaluate_against_nominal(&t.rows, spec.as_ref(), |r| r.set_time_ms, stats::mean)?
            }
            TestTable::CtNumberAccuracy(t) => evaluate_against_nominal(
                &t.rows,
                spec.as_ref(),
                |r| r.expected_hu,
                stats::signed_mean,
            )?,
            TestTable::OutputReproducibility(t) => {
                let mode = shared_mode(spec.as_ref(), StatisticKind::CoefficientOfVariation)?;
                let results = batch::evaluate_table(
                    &t.rows,
                    |r| stats::coefficient_of_variation(&r.values()),
                    &mode,
                );
                let rows = join_rows(&t.rows, &results, |r| stats::mean(&r.values()), None);
                (
                    StatisticKind::CoefficientOfVariation,
                    spec.map(|s| s.to_string()),
                    rows,
                )
            }
            TestTable::Linearity(t) => {
                let mode = shared_mode(spec.as_ref(), StatisticKind::LinearityCoefficient)?;
                let results = batch::evaluate_pairs(&t.rows, LinearityRow::output_per_mas, &mode);
                let rows = join_rows(&t.rows, &results, LinearityRow::output_per_mas, None);
                (
                    StatisticKind::LinearityCoefficient,
                    spec.map(|s| s.to_string()),
                    rows,
                )
            }
            TestTable::RadiationLeakage(t) => {
                let mode = shared_mode(spec.as_ref(), StatisticKind::Maximum)?;
                let results =
                    batch::evaluate_table(&t.rows, |r| stats::maximum(&r.values()), &mode);
                let rows = join_rows(&t.rows, &results, |_| None, None);
                (StatisticKind::Maximum, spec.map(|s| s.to_string()), rows)
            }
            TestTable::ContrastResolution(t) => {
                let mode = shared_mode(spec.as_ref(), StatisticKind::Mean)?;
                let results = batch::evaluate_table(&t.rows, |r| stats::mean(&r.values()), &mode);
                let rows = join_rows(&t.rows, &results, |_| None, None);
                (StatisticKind::Mean, spec.map(|s| s.to_string()), rows)
            }
            TestTable::HalfValueLayer(t) => evaluate_hvl(&t.rows, spec.as_ref())?,
        };

        let summary = summarize(&rows);
        Ok(TableEvaluation {
            test: kind,
            tube: self.tube(),
            statistic,
            tolerance,
            verdict: summary.overall(),
            summary,
            rows,
        })
    }
}

type Evaluated = (StatisticKind, Option<String>, Vec<EvaluatedRow>);

fn summarize(rows: &[EvaluatedRow]) -> TableSummary {
    let verdicts: Vec<VerdictRow> = rows
        .iter()
        .filter_map(|r| {
            r.verdict.map(|verdict| VerdictRow {
                row_id: r.row_id,
                statistic: r.statistic,
                verdict,
            })
        })
        .collect();
    TableSummary::from_rows(&verdicts)
}

/// Shared mode from an optional spec. A missing spec leaves every row
/// undetermined; a malformed one is an error. For fraction statistics
/// such as CoV, `<= 5%` means `<= 0.05`.
fn shared_mode(
    spec: Option<&ToleranceSpec>,
    statistic: StatisticKind,
) -> Result<ToleranceMode, ToleranceError> {
    match spec {
        Some(spec) => {
            let rule = spec.to_rule()?;
            Ok(ToleranceMode::Shared(if statistic.is_fraction() {
                rule.as_fraction()
            } else {
                rule
            }))
        }
        None => Ok(ToleranceMode::Missing),
    }
}

/// Merge batch results back onto their rows by id
fn join_rows<R, D>(
    rows: &[R],
    results: &[VerdictRow],
    derived: D,
    per_row_tolerance: Option<&HashMap<RowId, ToleranceRule>>,
) -> Vec<EvaluatedRow>
where
    R: TableRow,
    D: Fn(&R) -> Option<f64>,
{
    let by_id: HashMap<RowId, &VerdictRow> = results.iter().map(|v| (v.row_id, v)).collect();
    rows.iter()
        .map(|row| {
            let id = row.row_id();
            let result = by_id.get(&id);
            EvaluatedRow {
                row_id: id,
                setting: row.setting_label(),
                readings: row.readings().iter().map(|r| r.raw.clone()).collect(),
                derived: derived(row),
                statistic: result.and_then(|v| v.statistic),
                verdict: result.map(|v| v.verdict),
                tolerance: per_row_tolerance
                    .and_then(|rules| rules.get(&id))
                    .map(|rule| rule.to_string()),
            }
        })
        .collect()
}

/// Tests that compare a measured mean with a nominal setting.
///
/// A `±` spec becomes one rule per row centred on that row's nominal value
/// and the statistic is the mean itself. Any other operator is shared and
/// judged against the deviation from nominal: percent for a percentage
/// threshold, absolute otherwise.
fn evaluate_against_nominal<R, N, M>(
    rows: &[R],
    spec: Option<&ToleranceSpec>,
    nominal: N,
    measured: M,
) -> Result<Evaluated, ToleranceError>
where
    R: TableRow,
    N: Fn(&R) -> f64,
    M: Fn(&[f64]) -> Option<f64>,
{
    let mean_of = |r: &R| measured(&r.values());

    let Some(spec) = spec else {
        let results = batch::evaluate_table(rows, mean_of, &ToleranceMode::Missing);
        return Ok((
            StatisticKind::Mean,
            None,
            join_rows(rows, &results, mean_of, None),
        ));
    };

    if spec.is_plus_minus() {
        let mut rules = HashMap::with_capacity(rows.len());
        for row in rows {
            rules.insert(row.row_id(), spec.centered_at(nominal(row)).to_rule()?);
        }
        // Validates the operator/threshold even for an empty table
        spec.centered_at(0.0).to_rule()?;
        let results =
            batch::evaluate_table(rows, mean_of, &ToleranceMode::PerRow(rules.clone()));
        return Ok((
            StatisticKind::Mean,
            Some(spec.to_string()),
            join_rows(rows, &results, |_| None, Some(&rules)),
        ));
    }

    let rule = spec.to_rule()?;
    let (kind, results) = match rule.threshold_kind() {
        ThresholdKind::Percentage => (
            StatisticKind::PercentDeviation,
            batch::evaluate_table(
                rows,
                |r| stats::percent_deviation(nominal(r), mean_of(r)?),
                &ToleranceMode::Shared(rule),
            ),
        ),
        ThresholdKind::Absolute => (
            StatisticKind::AbsoluteDeviation,
            batch::evaluate_table(
                rows,
                |r| stats::absolute_deviation(nominal(r), mean_of(r)?),
                &ToleranceMode::Shared(rule),
            ),
        ),
    };
    Ok((
        kind,
        Some(spec.to_string()),
        join_rows(rows, &results, mean_of, None),
    ))
}

/// HVL rows: `>= required_min` per row, falling back to a shared table
/// tolerance and then to the built-in minimum for the row's kVp
fn evaluate_hvl(rows: &[HvlRow], spec: Option<&ToleranceSpec>) -> Result<Evaluated, ToleranceError> {
    let shared = spec.map(|s| s.to_rule()).transpose()?;

    let mut rules = HashMap::with_capacity(rows.len());
    for row in rows {
        let rule = match (row.required_min, shared, minimum_hvl(row.applied_kvp)) {
            (Some(min), _, _) => Some(ToleranceRule::absolute(Operator::GreaterOrEqual, min)?),
            (None, Some(rule), _) => Some(rule),
            (None, None, Some(min)) => Some(ToleranceRule::absolute(Operator::GreaterOrEqual, min)?),
            (None, None, None) => None,
        };
        if let Some(rule) = rule {
            rules.insert(row.id, rule);
        }
    }

    let results = batch::evaluate_table(
        rows,
        |r| stats::mean(&r.values()),
        &ToleranceMode::PerRow(rules.clone()),
    );
    Ok((
        StatisticKind::Mean,
        None,
        join_rows(rows, &results, |_| None, Some(&rules)),
    ))
}
