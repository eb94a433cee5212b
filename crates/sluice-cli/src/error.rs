//! Error conversion utilities for CLI.
//!
//! Converts sluice-core's typed errors (thiserror) into user-friendly
//! contextual errors (anyhow) with actionable guidance.

use anyhow::anyhow;
use sluice_core::IngestError;
use sluice_core::units::format_size;
use std::path::Path;

/// Converts `IngestError` to user-friendly anyhow error with context
pub fn convert_ingest_error(err: IngestError, upload: &Path) -> anyhow::Error {
    match err {
        IngestError::SizeLimitExceeded { .. } => {
            anyhow!(
                "Upload '{}' rejected: {err}\n\
                 HINT: Use --max-size to raise the limit, or --store to target a store with a higher one.",
                upload.display()
            )
        }
        IngestError::QuotaExceeded { remaining, .. } => {
            anyhow!(
                "Upload '{}' rejected: {err}\n\
                 HINT: The session has {} left. Pass a larger --quota or free up space in the dataset.",
                upload.display(),
                format_size(remaining)
            )
        }
        IngestError::StagingIo { ref path, .. } => {
            let dir = path.display().to_string();
            anyhow::Error::from(err).context(format!(
                "Could not stage '{}' under '{dir}'\n\
                 HINT: Check that the directory exists and is writable (mkdir -p {dir}).",
                upload.display()
            ))
        }
        IngestError::TooManyArchiveEntries { .. } => {
            anyhow!(
                "Upload '{}' rejected: {err}\n\
                 HINT: Use --zip-limit to allow more files, or 0 to remove the limit.",
                upload.display()
            )
        }
        IngestError::PathTraversal { path } => {
            anyhow!(
                "Security violation: Archive '{}' attempted path traversal with '{}'\n\
                 HINT: This archive may be malicious. Do not ingest from untrusted sources.",
                upload.display(),
                path.display()
            )
        }
        IngestError::InvalidConfig { reason } => {
            anyhow!(
                "Invalid configuration: {reason}\n\
                 HINT: Set --files-dir or files_directory in the config file."
            )
        }
        IngestError::Io(io_err) => {
            anyhow!(
                "I/O error while processing '{}': {}",
                upload.display(),
                io_err
            )
        }
        _ => anyhow::Error::from(err)
            .context(format!("Error processing upload '{}'", upload.display())),
    }
}

/// Adds upload context to a core result
pub fn add_upload_context<T>(result: Result<T, IngestError>, upload: &Path) -> anyhow::Result<T> {
    result.map_err(|e| convert_ingest_error(e, upload))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::path::PathBuf;

    #[test]
    fn test_convert_size_limit_error() {
        let err = IngestError::SizeLimitExceeded {
            size: 462,
            limit: 50,
        };
        let converted = convert_ingest_error(err, Path::new("big.txt"));
        let msg = format!("{converted:?}");
        assert!(msg.contains("This file size (462 B) exceeds the size limit of 50 B."));
        assert!(msg.contains("big.txt"));
        assert!(msg.contains("--max-size"));
    }

    #[test]
    fn test_convert_quota_error() {
        let err = IngestError::QuotaExceeded {
            size: 56 * 1024,
            remaining: 500,
        };
        let converted = convert_ingest_error(err, Path::new("data.bin"));
        let msg = format!("{converted:?}");
        assert!(msg.contains("remaining storage quota of 500 B"));
        assert!(msg.contains("HINT"));
    }

    #[test]
    fn test_convert_staging_error_keeps_cause() {
        let err = IngestError::StagingIo {
            path: PathBuf::from("/srv/files/temp"),
            source: io::Error::new(io::ErrorKind::NotFound, "no such directory"),
        };
        let converted = convert_ingest_error(err, Path::new("a.txt"));
        let msg = format!("{converted:?}");
        assert!(msg.contains("/srv/files/temp"));
        assert!(msg.contains("Failed to save the upload as a temp file"));
        assert!(msg.contains("no such directory"));
    }

    #[test]
    fn test_convert_io_error() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let converted = convert_ingest_error(IngestError::Io(io_err), Path::new("upload.zip"));
        assert!(format!("{converted:?}").contains("I/O error"));
    }
}
