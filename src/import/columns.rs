//! Header aliases

use std::collections::HashMap;

use crate::entities::test_table::TestKind;

/// Setting columns a CSV file can carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Kvp,
    Ma,
    TimeMs,
    Mas,
    Location,
    Expected,
    Required,
    Label,
}

impl Column {
    pub fn name(&self) -> &'static str {
        match self {
            Column::Kvp => "kVp",
            Column::Ma => "mA",
            Column::TimeMs => "time_ms",
            Column::Mas => "mAs",
            Column::Location => "location",
            Column::Expected => "expected",
            Column::Required => "required",
            Column::Label => "label",
        }
    }

    /// Match a header after normalisation
    fn from_header(header: &str) -> Option<Column> {
        let column = match normalize(header).as_str() {
            "kvp" | "appliedkvp" | "setkvp" | "kv" => Column::Kvp,
            "ma" | "setma" | "tubecurrent" => Column::Ma,
            "timems" | "settimems" | "time" | "settime" | "exposuretime" => Column::TimeMs,
            "mas" | "setmas" => Column::Mas,
            "location" | "position" | "point" => Column::Location,
            "expected" | "expectedhu" | "nominal" | "nominalhu" => Column::Expected,
            "required" | "requiredmin" | "requiredhvl" | "minhvl" => Column::Required,
            "label" | "material" | "description" | "object" => Column::Label,
            _ => return None,
        };
        Some(column)
    }
}

/// Setting columns a test type cannot be imported without
pub fn required_columns(kind: TestKind) -> &'static [Column] {
    match kind {
        TestKind::OperatingPotential | TestKind::HalfValueLayer => &[Column::Kvp],
        TestKind::TimerAccuracy => &[Column::TimeMs],
        TestKind::OutputReproducibility => &[Column::Kvp, Column::Mas],
        TestKind::Linearity => &[Column::Mas],
        TestKind::RadiationLeakage => &[Column::Location],
        TestKind::CtNumberAccuracy => &[Column::Label, Column::Expected],
        TestKind::ContrastResolution => &[Column::Label],
    }
}

/// Lowercase alphanumerics only: "Applied kVp" and "applied_kvp" agree
fn normalize(header: &str) -> String {
    header
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(|c| c.to_lowercase())
        .collect()
}

fn is_reading_header(header: &str) -> bool {
    let h = normalize(header);
    if h.starts_with("reading") {
        return true;
    }
    let mut chars = h.chars();
    matches!(chars.next(), Some('r') | Some('m')) && chars.next().is_some_and(|c| c.is_ascii_digit())
}

/// Positions of setting and reading columns in a header row
#[derive(Debug, Clone, Default)]
pub struct ColumnMap {
    settings: HashMap<Column, usize>,
    readings: Vec<usize>,
}

impl ColumnMap {
    pub fn from_headers<'a>(headers: impl IntoIterator<Item = &'a str>) -> Self {
        let mut map = ColumnMap::default();
        for (index, header) in headers.into_iter().enumerate() {
            if is_reading_header(header) {
                map.readings.push(index);
            } else if let Some(column) = Column::from_header(header) {
                // First matching header wins
                map.settings.entry(column).or_insert(index);
            }
        }
        map
    }

    pub fn get(&self, column: Column) -> Option<usize> {
        self.settings.get(&column).copied()
    }

    pub fn readings(&self) -> &[usize] {
        &self.readings
    }

    /// First required column with no header, if any
    pub fn missing_for(&self, kind: TestKind) -> Option<Column> {
        required_columns(kind)
            .iter()
            .copied()
            .find(|c| !self.settings.contains_key(c))
    }
}
