//! Report and test table definitions

pub mod equipment;
pub mod report;
pub mod test_table;

pub use equipment::{EquipmentInfo, EquipmentType, Tube};
pub use report::{QaReport, ReportError, ReportEvaluation};
pub use test_table::{TableError, TableEvaluation, TableRow, TestKind, TestTable};
