//! Error types for upload ingestion.

use std::path::PathBuf;
use thiserror::Error;

use crate::checksum::ChecksumAlgorithm;
use crate::units::format_size;

/// Result type alias using `IngestError`.
pub type Result<T> = std::result::Result<T, IngestError>;

/// Errors that can occur while ingesting an upload.
///
/// The same enum serves both severities: returned from
/// [`IngestPipeline::ingest`](crate::IngestPipeline::ingest) it aborts the
/// whole run, wrapped in an [`ItemError`](crate::ItemError) it describes one
/// failed entry while its siblings carry on.
#[derive(Error, Debug)]
pub enum IngestError {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The upload could not be written to temporary storage.
    #[error("Failed to save the upload as a temp file (temp disk space?)")]
    StagingIo {
        /// Directory the temp file was being created in.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// A file is larger than the per-store upload size limit.
    #[error(
        "This file size ({}) exceeds the size limit of {}.",
        format_size(*.size),
        format_size(*.limit)
    )]
    SizeLimitExceeded {
        /// Measured size in bytes.
        size: u64,
        /// Configured limit in bytes.
        limit: u64,
    },

    /// A file does not fit in the remaining storage quota.
    #[error(
        "This file's size ({}) exceeds the remaining storage quota of {}.",
        format_size(*.size),
        format_size(*.remaining)
    )]
    QuotaExceeded {
        /// Size of the rejected file in bytes.
        size: u64,
        /// Bytes left in the quota at the time of the check.
        remaining: u64,
    },

    /// The archive holds more files than the zip upload limit allows.
    #[error(
        "The number of files in the zip archive ({count}) is over the limit ({limit}); \
         please upload a zip archive with fewer files, if you want them to be ingested \
         as individual files."
    )]
    TooManyArchiveEntries {
        /// Number of file entries found.
        count: usize,
        /// Configured maximum.
        limit: usize,
    },

    /// The archive (or one of its entries) cannot be read.
    #[error("unreadable archive: {reason}")]
    UnreadableArchive {
        /// Description from the archive reader.
        reason: String,
    },

    /// An archive entry resolves outside the staging directory.
    #[error("path traversal detected: {path}")]
    PathTraversal {
        /// The offending entry name.
        path: PathBuf,
    },

    /// A bag payload file does not match the digest in its manifest.
    #[error("{algorithm} checksum mismatch for {name}: manifest has {expected}, file has {actual}")]
    ChecksumMismatch {
        /// Entry name inside the bag.
        name: String,
        /// Manifest algorithm.
        algorithm: ChecksumAlgorithm,
        /// Digest recorded in the manifest.
        expected: String,
        /// Digest computed from the staged bytes.
        actual: String,
    },

    /// Configuration values are unusable.
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// What is wrong.
        reason: String,
    },
}

impl IngestError {
    /// Returns a stable, machine-readable code for this error.
    ///
    /// # Examples
    ///
    /// ```
    /// use sluice_core::IngestError;
    ///
    /// let err = IngestError::SizeLimitExceeded { size: 462, limit: 50 };
    /// assert_eq!(err.code(), "SIZE_LIMIT_EXCEEDED");
    /// ```
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Io(_) => "IO_ERROR",
            Self::StagingIo { .. } => "STAGING_IO_ERROR",
            Self::SizeLimitExceeded { .. } => "SIZE_LIMIT_EXCEEDED",
            Self::QuotaExceeded { .. } => "QUOTA_EXCEEDED",
            Self::TooManyArchiveEntries { .. } => "TOO_MANY_ARCHIVE_ENTRIES",
            Self::UnreadableArchive { .. } => "UNREADABLE_ARCHIVE",
            Self::PathTraversal { .. } => "PATH_TRAVERSAL",
            Self::ChecksumMismatch { .. } => "CHECKSUM_MISMATCH",
            Self::InvalidConfig { .. } => "INVALID_CONFIG",
        }
    }

    /// Returns `true` if this error is one of the configured limits
    /// (upload size, storage quota, zip file count).
    #[must_use]
    pub const fn is_limit_violation(&self) -> bool {
        matches!(
            self,
            Self::SizeLimitExceeded { .. }
                | Self::QuotaExceeded { .. }
                | Self::TooManyArchiveEntries { .. }
        )
    }

    /// Returns `true` if this error represents a hostile input.
    #[must_use]
    pub const fn is_security_violation(&self) -> bool {
        matches!(self, Self::PathTraversal { .. })
    }

    pub(crate) fn unreadable(err: impl std::fmt::Display) -> Self {
        Self::UnreadableArchive {
            reason: err.to_string(),
        }
    }
}

impl From<zip::result::ZipError> for IngestError {
    fn from(err: zip::result::ZipError) -> Self {
        match err {
            zip::result::ZipError::Io(io) => Self::Io(io),
            other => Self::unreadable(other),
        }
    }
}
