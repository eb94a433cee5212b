//! Output formatter trait for CLI results.

use anyhow::Result;
use serde::Serialize;
use sluice_core::Checksum;
use sluice_core::IngestResult;
use sluice_core::formats::shapefile::PlannedItem;
use std::path::Path;
use std::path::PathBuf;

/// Common output formatter trait
pub trait OutputFormatter {
    /// Format the outcome of one upload
    fn format_ingest_result(&self, upload: &Path, result: &IngestResult) -> Result<()>;

    /// Format computed checksums
    fn format_checksums(&self, checksums: &[(PathBuf, Checksum)]) -> Result<()>;

    /// Format a grouping plan for the given entry names
    fn format_plan(&self, archive: &Path, names: &[String], plan: &[PlannedItem]) -> Result<()>;

    /// Format warning message
    fn format_warning(&self, message: &str);
}

/// Generic JSON output structure
#[derive(Debug, Serialize)]
pub struct JsonOutput<T> {
    pub operation: String,
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Partial,
}

impl<T: Serialize> JsonOutput<T> {
    pub fn success(operation: impl Into<String>, data: T) -> Self {
        Self {
            operation: operation.into(),
            status: Status::Success,
            data: Some(data),
            error: None,
        }
    }

    /// Some items failed while others were produced.
    pub fn partial(operation: impl Into<String>, data: T, error: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            status: Status::Partial,
            data: Some(data),
            error: Some(error.into()),
        }
    }
}
