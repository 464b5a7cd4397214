//! CSV import of test table rows
//!
//! Spreadsheet exports rarely agree on headers, so setting columns are
//! matched by alias and every `reading*`, `r<n>` or `m<n>` column is taken as
//! a reading in header order.

pub mod columns;
pub mod reader;

pub use columns::{Column, ColumnMap};
pub use reader::{read_table, read_table_file};

use std::path::PathBuf;
use thiserror::Error;

use crate::entities::test_table::TestKind;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("{test} import needs a '{column}' column")]
    MissingColumn { test: TestKind, column: &'static str },

    #[error("no reading columns found (expected headers like 'reading 1', 'r1' or 'm1')")]
    NoReadingColumns,

    #[error("line {line}: invalid {column} value '{value}'")]
    InvalidSetting {
        line: u64,
        column: &'static str,
        value: String,
    },
}
