//! JSON output formatter for machine-readable results.

use super::formatter::JsonOutput;
use super::formatter::OutputFormatter;
use anyhow::Result;
use serde::Serialize;
use sluice_core::Checksum;
use sluice_core::IngestResult;
use sluice_core::formats::shapefile::PlannedItem;
use std::io::Write;
use std::io::{self};
use std::path::Path;
use std::path::PathBuf;

pub struct JsonFormatter;

impl JsonFormatter {
    fn output<T: Serialize>(value: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(value)?;
        writeln!(io::stdout(), "{json}")?;
        Ok(())
    }
}

#[derive(Serialize)]
struct FileOutput<'a> {
    label: &'a str,
    directory_label: Option<&'a str>,
    storage_identifier: &'a str,
    storage_path: String,
    size: u64,
    content_type: &'a str,
    checksum_algorithm: &'static str,
    checksum: &'a str,
    source_entries: &'a [String],
}

#[derive(Serialize)]
struct ItemErrorOutput<'a> {
    name: &'a str,
    code: &'static str,
    message: String,
}

#[derive(Serialize)]
struct IngestOutput<'a> {
    upload: String,
    files: Vec<FileOutput<'a>>,
    errors: Vec<ItemErrorOutput<'a>>,
    total_bytes: u64,
    duration_ms: u128,
}

impl OutputFormatter for JsonFormatter {
    fn format_ingest_result(&self, upload: &Path, result: &IngestResult) -> Result<()> {
        let files = result
            .data_files()
            .iter()
            .map(|f| FileOutput {
                label: &f.label,
                directory_label: f.directory_label.as_deref(),
                storage_identifier: f.storage_identifier.as_str(),
                storage_path: f.storage_path.display().to_string(),
                size: f.size,
                content_type: f.content_type.as_str(),
                checksum_algorithm: f.checksum.algorithm.as_str(),
                checksum: &f.checksum.value,
                source_entries: &f.source_entries,
            })
            .collect();
        let errors = result
            .errors()
            .iter()
            .map(|e| ItemErrorOutput {
                name: &e.name,
                code: e.error.code(),
                message: e.message(),
            })
            .collect();

        let data = IngestOutput {
            upload: upload.display().to_string(),
            files,
            errors,
            total_bytes: result.total_bytes(),
            duration_ms: result.duration().as_millis(),
        };

        let output = if result.has_errors() {
            let failed = result.errors().len();
            JsonOutput::partial("ingest", data, format!("{failed} item(s) rejected"))
        } else {
            JsonOutput::success("ingest", data)
        };
        Self::output(&output)
    }

    fn format_checksums(&self, checksums: &[(PathBuf, Checksum)]) -> Result<()> {
        #[derive(Serialize)]
        struct ChecksumOutput {
            path: String,
            algorithm: &'static str,
            value: String,
        }

        let data: Vec<_> = checksums
            .iter()
            .map(|(path, checksum)| ChecksumOutput {
                path: path.display().to_string(),
                algorithm: checksum.algorithm.as_str(),
                value: checksum.value.clone(),
            })
            .collect();

        Self::output(&JsonOutput::success("checksum", data))
    }

    fn format_plan(&self, archive: &Path, names: &[String], plan: &[PlannedItem]) -> Result<()> {
        #[derive(Serialize)]
        #[serde(tag = "kind", rename_all = "lowercase")]
        enum PlanItemOutput<'a> {
            File {
                entry: &'a str,
            },
            Bundle {
                name: String,
                directory_label: Option<&'a str>,
                members: Vec<&'a str>,
            },
        }

        #[derive(Serialize)]
        struct PlanOutput<'a> {
            archive: String,
            entries: usize,
            items: Vec<PlanItemOutput<'a>>,
        }

        let items = plan
            .iter()
            .map(|item| match item {
                PlannedItem::Standalone(i) => PlanItemOutput::File { entry: &names[*i] },
                PlannedItem::Group {
                    directory_label,
                    base_name,
                    members,
                } => PlanItemOutput::Bundle {
                    name: format!("{base_name}.zip"),
                    directory_label: directory_label.as_deref(),
                    members: members.iter().map(|i| names[*i].as_str()).collect(),
                },
            })
            .collect();

        let data = PlanOutput {
            archive: archive.display().to_string(),
            entries: names.len(),
            items,
        };
        Self::output(&JsonOutput::success("plan", data))
    }

    fn format_warning(&self, message: &str) {
        #[derive(Serialize)]
        struct WarningData {
            message: String,
        }

        // stdout carries exactly one document per command
        let output = JsonOutput::success(
            "warning",
            WarningData {
                message: message.to_string(),
            },
        );
        if let Ok(json) = serde_json::to_string(&output) {
            let _ = writeln!(io::stderr(), "{json}");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_status_serializes() {
        let output = JsonOutput::partial("ingest", 1, "1 item(s) rejected");
        let json = serde_json::to_value(&output).unwrap();
        assert_eq!(json["status"], "partial");
        assert_eq!(json["error"], "1 item(s) rejected");
        assert_eq!(json["data"], 1);
    }

    #[test]
    fn test_success_omits_error() {
        let output = JsonOutput::success("plan", "x");
        let json = serde_json::to_value(&output).unwrap();
        assert_eq!(json["status"], "success");
        assert!(json.get("error").is_none());
    }
}
