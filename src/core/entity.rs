//! Documents kept on disk and their lifecycle

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fmt;

/// A document stored as one YAML file
pub trait Entity: Serialize + DeserializeOwned {
    /// Id prefix, e.g. "QAR"
    const PREFIX: &'static str;

    fn id_string(&self) -> String;

    fn title(&self) -> &str;

    fn status(&self) -> Status;

    fn created(&self) -> DateTime<Utc>;

    /// Person responsible for the content
    fn author(&self) -> &str;

    /// Default file name: `<id>.qat.yaml`
    fn file_name(&self) -> String {
        format!("{}.qat.yaml", self.id_string())
    }
}

/// Where a report is in its review cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Readings still being entered
    #[default]
    Draft,
    /// Checked by a second physicist
    Reviewed,
    /// Signed off and handed to the institution
    Issued,
    /// Replaced by a later report
    Superseded,
}

impl Status {
    /// Issued and superseded reports are records; their readings must not
    /// change
    pub fn is_locked(&self) -> bool {
        matches!(self, Status::Issued | Status::Superseded)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Status::Draft => "draft",
            Status::Reviewed => "reviewed",
            Status::Issued => "issued",
            Status::Superseded => "superseded",
        })
    }
}
