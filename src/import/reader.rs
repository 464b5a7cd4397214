//! Build typed test tables from CSV records

use std::io::Read;
use std::path::Path;
use tracing::{debug, warn};

use crate::core::identity::RowId;
use crate::core::reading::Reading;
use crate::entities::test_table::{
    ContrastRow, CtNumberRow, HvlRow, KvpRow, LeakageRow, LinearityRow, OutputRow, Table,
    TestKind, TestTable, TimerRow,
};
use crate::import::columns::{Column, ColumnMap};
use crate::import::ImportError;

/// One data line of the CSV file
struct Line<'a> {
    number: u64,
    record: &'a csv::StringRecord,
    columns: &'a ColumnMap,
}

impl Line<'_> {
    fn cell(&self, column: Column) -> Option<&str> {
        self.columns
            .get(column)
            .and_then(|i| self.record.get(i))
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    fn number(&self, column: Column) -> Result<f64, ImportError> {
        self.optional_number(column)?
            .ok_or_else(|| self.invalid(column, ""))
    }

    fn optional_number(&self, column: Column) -> Result<Option<f64>, ImportError> {
        match self.cell(column) {
            None => Ok(None),
            Some(text) => Reading::parse(text)
                .value()
                .map(Some)
                .ok_or_else(|| self.invalid(column, text)),
        }
    }

    fn text(&self, column: Column) -> Result<String, ImportError> {
        self.cell(column)
            .map(str::to_string)
            .ok_or_else(|| self.invalid(column, ""))
    }

    fn readings(&self) -> Vec<Reading> {
        self.columns
            .readings()
            .iter()
            .map(|i| Reading::parse(self.record.get(*i).unwrap_or("").trim()))
            .collect()
    }

    fn invalid(&self, column: Column, value: &str) -> ImportError {
        ImportError::InvalidSetting {
            line: self.number,
            column: column.name(),
            value: value.to_string(),
        }
    }
}

/// Read a table of `kind` from CSV data with a header row.
///
/// Lines with every cell blank are skipped; blank reading cells are kept as
/// blank readings so the row stays visible.
pub fn read_table<R: Read>(kind: TestKind, input: R) -> Result<TestTable, ImportError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(input);

    let headers = reader.headers()?.clone();
    let columns = ColumnMap::from_headers(headers.iter());

    if let Some(column) = columns.missing_for(kind) {
        return Err(ImportError::MissingColumn {
            test: kind,
            column: column.name(),
        });
    }
    if columns.readings().is_empty() {
        return Err(ImportError::NoReadingColumns);
    }

    let mut table = TestTable::empty(kind);
    for (index, record) in reader.records().enumerate() {
        let record = record?;
        // Header is line 1
        let number = record
            .position()
            .map(|p| p.line())
            .unwrap_or(index as u64 + 2);

        if record.iter().all(|cell| cell.trim().is_empty()) {
            debug!(line = number, "skipping blank line");
            continue;
        }

        let line = Line {
            number,
            record: &record,
            columns: &columns,
        };
        push_row(&mut table, &line)?;
    }

    if table.row_count() == 0 {
        warn!(test = %kind, "CSV contained no data rows");
    }
    debug!(test = %kind, rows = table.row_count(), "imported table");
    Ok(table)
}

/// [`read_table`] from a file
pub fn read_table_file(kind: TestKind, path: &Path) -> Result<TestTable, ImportError> {
    let file = std::fs::File::open(path).map_err(|source| ImportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    read_table(kind, file)
}

fn push_row(table: &mut TestTable, line: &Line<'_>) -> Result<(), ImportError> {
    let id = RowId::new();
    let readings = line.readings();
    match table {
        TestTable::OperatingPotential(t) => push(t, KvpRow {
            id,
            applied_kvp: line.number(Column::Kvp)?,
            ma: line.optional_number(Column::Ma)?,
            time_ms: line.optional_number(Column::TimeMs)?,
            readings,
        }),
        TestTable::TimerAccuracy(t) => push(t, TimerRow {
            id,
            set_time_ms: line.number(Column::TimeMs)?,
            kvp: line.optional_number(Column::Kvp)?,
            ma: line.optional_number(Column::Ma)?,
            readings,
        }),
        TestTable::OutputReproducibility(t) => push(t, OutputRow {
            id,
            kvp: line.number(Column::Kvp)?,
            mas: line.number(Column::Mas)?,
            readings,
        }),
        TestTable::Linearity(t) => push(t, LinearityRow {
            id,
            mas: line.number(Column::Mas)?,
            kvp: line.optional_number(Column::Kvp)?,
            ma: line.optional_number(Column::Ma)?,
            readings,
        }),
        TestTable::RadiationLeakage(t) => push(t, LeakageRow {
            id,
            location: line.text(Column::Location)?,
            readings,
        }),
        TestTable::HalfValueLayer(t) => push(t, HvlRow {
            id,
            applied_kvp: line.number(Column::Kvp)?,
            required_min: line.optional_number(Column::Required)?,
            readings,
        }),
        TestTable::CtNumberAccuracy(t) => push(t, CtNumberRow {
            id,
            material: line.text(Column::Label)?,
            expected_hu: line.number(Column::Expected)?,
            readings,
        }),
        TestTable::ContrastResolution(t) => push(t, ContrastRow {
            id,
            label: line.text(Column::Label)?,
            readings,
        }),
    }
    Ok(())
}

fn push<R>(table: &mut Table<R>, row: R) {
    table.rows.push(row);
}
