//! Opaque identifiers for measurement rows and reports
//!
//! Rows get a bare ULID so reordering or deleting rows never changes the
//! identity of the remaining ones. Reports carry a `QAR-` prefix so a file
//! name or a log line is recognisable at a glance.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use ulid::Ulid;

/// Stable identity of a measurement row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowId(Ulid);

impl RowId {
    /// Assign a fresh id
    pub fn new() -> Self {
        Self(Ulid::new())
    }

    pub fn as_ulid(&self) -> Ulid {
        self.0
    }
}

impl Default for RowId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RowId {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ulid::from_string(s.trim())
            .map(Self)
            .map_err(|_| IdParseError::InvalidUlid(s.to_string()))
    }
}

/// Errors from parsing textual ids
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdParseError {
    #[error("Invalid ULID: {0}")]
    InvalidUlid(String),

    #[error("Missing '{expected}-' prefix in id: {id}")]
    MissingPrefix { expected: &'static str, id: String },
}

/// Identity of a QA report, rendered as `QAR-<ULID>`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReportId(Ulid);

impl ReportId {
    pub const PREFIX: &'static str = "QAR";

    pub fn new() -> Self {
        Self(Ulid::new())
    }

    /// Parse a `QAR-<ULID>` string
    pub fn parse(s: &str) -> Result<Self, IdParseError> {
        let rest = s
            .strip_prefix(Self::PREFIX)
            .and_then(|r| r.strip_prefix('-'))
            .ok_or_else(|| IdParseError::MissingPrefix {
                expected: Self::PREFIX,
                id: s.to_string(),
            })?;
        Ulid::from_string(rest)
            .map(Self)
            .map_err(|_| IdParseError::InvalidUlid(rest.to_string()))
    }

    /// First 8 ULID characters, enough to tell reports apart in listings
    pub fn short(&self) -> String {
        let ulid = self.0.to_string();
        format!("{}-{}", Self::PREFIX, &ulid[..8])
    }
}

impl Default for ReportId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ReportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", Self::PREFIX, self.0)
    }
}

impl Serialize for ReportId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ReportId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        ReportId::parse(&s).map_err(serde::de::Error::custom)
    }
}
