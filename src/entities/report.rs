//! QA report entity - one unit under test and its test tables

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::core::config::Config;
use crate::core::entity::{Entity, Status};
use crate::core::identity::ReportId;
use crate::core::verdict::Verdict;
use crate::entities::equipment::{EquipmentInfo, Tube};
use crate::entities::test_table::{TableError, TableEvaluation, TestKind, TestTable};

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("{test}{}: {source}", .tube.map(|t| format!(" ({} tube)", t)).unwrap_or_default())]
    Table {
        test: TestKind,
        tube: Option<Tube>,
        #[source]
        source: TableError,
    },
}

/// A QA test report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QaReport {
    pub id: ReportId,

    pub title: String,

    pub equipment: EquipmentInfo,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub institution: Option<String>,

    /// Person who performed the tests
    pub tester: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_date: Option<NaiveDate>,

    #[serde(default)]
    pub status: Status,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tests: Vec<TestTable>,

    pub created: DateTime<Utc>,

    #[serde(default = "default_revision")]
    pub revision: u32,
}

fn default_revision() -> u32 {
    1
}

impl Entity for QaReport {
    const PREFIX: &'static str = ReportId::PREFIX;

    fn id_string(&self) -> String {
        self.id.to_string()
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn status(&self) -> Status {
        self.status
    }

    fn created(&self) -> DateTime<Utc> {
        self.created
    }

    fn author(&self) -> &str {
        &self.tester
    }
}

/// Evaluation of a whole report
#[derive(Debug, Clone, Serialize)]
pub struct ReportEvaluation {
    pub report_id: ReportId,
    pub title: String,
    pub tables: Vec<TableEvaluation>,
    /// Required tests with no table
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub missing: Vec<String>,
    pub verdict: Verdict,
}

impl QaReport {
    pub fn new(title: impl Into<String>, equipment: EquipmentInfo, tester: impl Into<String>) -> Self {
        Self {
            id: ReportId::new(),
            title: title.into(),
            equipment,
            institution: None,
            tester: tester.into(),
            test_date: None,
            status: Status::default(),
            tests: Vec::new(),
            created: Utc::now(),
            revision: 1,
        }
    }

    /// New report with an empty table for every required test (and tube)
    pub fn skeleton(
        title: impl Into<String>,
        equipment: EquipmentInfo,
        tester: impl Into<String>,
    ) -> Self {
        let mut report = Self::new(title, equipment, tester);
        for (kind, tube) in report.missing_tests() {
            report.table_or_insert(kind, tube);
        }
        report
    }

    /// Required (test, tube) pairs with no table in the report
    pub fn missing_tests(&self) -> Vec<(TestKind, Option<Tube>)> {
        let mut missing = Vec::new();
        for kind in self.equipment.equipment_type.required_tests() {
            for tube in self.equipment.tubes() {
                if self.table(*kind, tube).is_none() {
                    missing.push((*kind, tube));
                }
            }
        }
        missing
    }

    pub fn table(&self, kind: TestKind, tube: Option<Tube>) -> Option<&TestTable> {
        self.tests
            .iter()
            .find(|t| t.kind() == kind && t.tube() == tube)
    }

    pub fn table_mut(&mut self, kind: TestKind, tube: Option<Tube>) -> Option<&mut TestTable> {
        self.tests
            .iter_mut()
            .find(|t| t.kind() == kind && t.tube() == tube)
    }

    /// Table for (kind, tube), creating an empty one if needed
    pub fn table_or_insert(&mut self, kind: TestKind, tube: Option<Tube>) -> &mut TestTable {
        let index = match self
            .tests
            .iter()
            .position(|t| t.kind() == kind && t.tube() == tube)
        {
            Some(i) => i,
            None => {
                let mut table = TestTable::empty(kind);
                table.set_tube(tube);
                self.tests.push(table);
                self.tests.len() - 1
            }
        };
        &mut self.tests[index]
    }

    /// Evaluate every table against `config`
    pub fn evaluate(&self, config: &Config) -> Result<ReportEvaluation, ReportError> {
        let tables = self
            .tests
            .iter()
            .map(|table| {
                table
                    .evaluate(config)
                    .map_err(|source| ReportError::Table {
                        test: table.kind(),
                        tube: table.tube(),
                        source,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let missing: Vec<String> = self
            .missing_tests()
            .into_iter()
            .map(|(kind, tube)| match tube {
                Some(tube) => format!("{} ({})", kind, tube),
                None => kind.to_string(),
            })
            .collect();

        let verdict = if tables.iter().any(|t| t.verdict.is_fail()) {
            Verdict::Fail
        } else if tables.is_empty()
            || !missing.is_empty()
            || tables.iter().any(|t| t.verdict == Verdict::Undetermined)
        {
            Verdict::Undetermined
        } else {
            Verdict::Pass
        };

        info!(
            report = %self.id,
            tables = tables.len(),
            missing = missing.len(),
            %verdict,
            "report evaluated"
        );

        Ok(ReportEvaluation {
            report_id: self.id,
            title: self.title.clone(),
            tables,
            missing,
            verdict,
        })
    }
}
