//! Core module - tolerance evaluation engine and shared types

pub mod batch;
pub mod config;
pub mod entity;
pub mod identity;
pub mod reading;
pub mod stats;
pub mod tolerance;
pub mod verdict;

pub use batch::{evaluate_pairs, evaluate_table, Row, TableSummary, ToleranceMode, VerdictRow};
pub use config::{Config, ConfigError};
pub use entity::{Entity, Status};
pub use identity::{IdParseError, ReportId, RowId};
pub use reading::{AppliedSetting, MeasurementRow, Reading, ReadingState};
pub use stats::StatisticKind;
pub use tolerance::{Operator, ThresholdKind, ToleranceError, ToleranceRule, ToleranceSpec};
pub use verdict::Verdict;
