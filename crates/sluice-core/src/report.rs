//! Ingestion results and progress reporting.

use std::path::PathBuf;
use std::time::Duration;

use crate::IngestError;
use crate::checksum::Checksum;
use crate::formats::ContentType;
use crate::types::StorageIdentifier;

/// One named, checksummed unit produced from an upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalDataFile {
    /// File name shown to users.
    pub label: String,
    /// Folder the file sat in inside the archive, `/`-separated.
    pub directory_label: Option<String>,
    /// Identifier the file is stored under.
    pub storage_identifier: StorageIdentifier,
    /// Where the promoted bytes live.
    pub storage_path: PathBuf,
    /// Size in bytes.
    pub size: u64,
    /// Detected content type.
    pub content_type: ContentType,
    /// Fixity checksum.
    pub checksum: Checksum,
    /// Archive entries that contributed to this file. Empty for a plain
    /// upload, several for a shapefile bundle.
    pub source_entries: Vec<String>,
}

/// A failure confined to one item of the upload.
#[derive(Debug)]
pub struct ItemError {
    /// Entry name, bundle name, or the upload name for archive-level
    /// rejections.
    pub name: String,
    /// What went wrong.
    pub error: IngestError,
}

impl ItemError {
    /// Human-readable message.
    #[must_use]
    pub fn message(&self) -> String {
        self.error.to_string()
    }
}

/// Outcome of one pipeline run.
///
/// Files and errors are kept in encounter order. Each input item appears in
/// exactly one of the two lists.
#[derive(Debug, Default)]
pub struct IngestResult {
    data_files: Vec<LogicalDataFile>,
    errors: Vec<ItemError>,
    duration: Duration,
}

impl IngestResult {
    /// Produced files.
    #[must_use]
    pub fn data_files(&self) -> &[LogicalDataFile] {
        &self.data_files
    }

    /// Per-item failures.
    #[must_use]
    pub fn errors(&self) -> &[ItemError] {
        &self.errors
    }

    /// Wall time of the run.
    #[must_use]
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Sum of produced file sizes.
    #[must_use]
    pub fn total_bytes(&self) -> u64 {
        self.data_files.iter().map(|f| f.size).sum()
    }

    /// Returns whether any item failed.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Splits the result into its two lists.
    #[must_use]
    pub fn into_parts(self) -> (Vec<LogicalDataFile>, Vec<ItemError>) {
        (self.data_files, self.errors)
    }
}

/// Append-only accumulator for [`IngestResult`].
#[derive(Debug, Default)]
pub struct IngestResultBuilder {
    result: IngestResult,
}

impl IngestResultBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a produced file.
    pub fn push_file(&mut self, file: LogicalDataFile) {
        self.result.data_files.push(file);
    }

    /// Records a failed item.
    pub fn push_error(&mut self, name: impl Into<String>, error: IngestError) {
        self.result.errors.push(ItemError {
            name: name.into(),
            error,
        });
    }

    /// Number of outcomes recorded so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.result.data_files.len() + self.result.errors.len()
    }

    /// Returns `true` if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Finishes the result.
    #[must_use]
    pub fn finish(mut self, duration: Duration) -> IngestResult {
        self.result.duration = duration;
        self.result
    }
}

/// Callback trait for progress reporting during ingestion.
///
/// Items are archive entries while expanding and logical files while
/// finalizing. Requires `Send` so a pipeline run can move between threads.
///
/// # Examples
///
/// ```
/// use sluice_core::ProgressCallback;
///
/// struct SimpleProgress;
///
/// impl ProgressCallback for SimpleProgress {
///     fn on_item_start(&mut self, name: &str, total: usize, current: usize) {
///         println!("Processing {current}/{total}: {name}");
///     }
///
///     fn on_bytes_written(&mut self, _bytes: u64) {}
///
///     fn on_item_complete(&mut self, name: &str) {
///         println!("Completed: {name}");
///     }
///
///     fn on_complete(&mut self) {
///         println!("Upload processed");
///     }
/// }
/// ```
pub trait ProgressCallback: Send {
    /// Called when an item starts. `current` is 1-indexed.
    fn on_item_start(&mut self, name: &str, total: usize, current: usize);

    /// Called as bytes are staged.
    fn on_bytes_written(&mut self, bytes: u64);

    /// Called when an item is finished, successfully or not.
    fn on_item_complete(&mut self, name: &str);

    /// Called once at the end of the run.
    fn on_complete(&mut self);
}

/// No-op implementation of `ProgressCallback`.
#[derive(Debug, Default)]
pub struct NoopProgress;

impl ProgressCallback for NoopProgress {
    fn on_item_start(&mut self, _name: &str, _total: usize, _current: usize) {}

    fn on_bytes_written(&mut self, _bytes: u64) {}

    fn on_item_complete(&mut self, _name: &str) {}

    fn on_complete(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksum::ChecksumAlgorithm;

    fn sample_file(label: &str, size: u64) -> LogicalDataFile {
        LogicalDataFile {
            label: label.to_string(),
            directory_label: None,
            storage_identifier: StorageIdentifier::generate(),
            storage_path: PathBuf::from("/tmp").join(label),
            size,
            content_type: ContentType::from("text/plain"),
            checksum: Checksum {
                algorithm: ChecksumAlgorithm::Md5,
                value: "0".repeat(32),
            },
            source_entries: vec![label.to_string()],
        }
    }

    #[test]
    fn test_empty_result() {
        let result = IngestResultBuilder::new().finish(Duration::ZERO);
        assert!(result.data_files().is_empty());
        assert!(!result.has_errors());
        assert_eq!(result.total_bytes(), 0);
    }

    #[test]
    fn test_builder_preserves_order() {
        let mut builder = IngestResultBuilder::new();
        builder.push_file(sample_file("a.txt", 1));
        builder.push_error("b.txt", IngestError::SizeLimitExceeded { size: 9, limit: 5 });
        builder.push_file(sample_file("c.txt", 2));
        assert_eq!(builder.len(), 3);

        let result = builder.finish(Duration::from_millis(5));
        let labels: Vec<_> = result.data_files().iter().map(|f| f.label.as_str()).collect();
        assert_eq!(labels, ["a.txt", "c.txt"]);
        assert_eq!(result.errors()[0].name, "b.txt");
        assert_eq!(
            result.errors()[0].message(),
            "This file size (9 B) exceeds the size limit of 5 B."
        );
        assert_eq!(result.total_bytes(), 3);
        assert_eq!(result.duration(), Duration::from_millis(5));
    }

    #[test]
    fn test_into_parts() {
        let mut builder = IngestResultBuilder::new();
        builder.push_file(sample_file("a.txt", 1));
        let (files, errors) = builder.finish(Duration::ZERO).into_parts();
        assert_eq!(files.len(), 1);
        assert!(errors.is_empty());
    }
}
