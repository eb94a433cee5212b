//! Upload request handed to the pipeline.

use std::fmt;
use std::io::Read;

use crate::checksum::ChecksumAlgorithm;
use crate::security::QuotaLimit;

/// Dataset version the upload is destined for.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DatasetVersionRef {
    /// Version identifier, opaque to the pipeline.
    pub id: String,
    /// Storage driver the files will end up in; selects the size limit.
    pub storage_driver: Option<String>,
}

impl DatasetVersionRef {
    /// Creates a reference on the default storage driver.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            storage_driver: None,
        }
    }

    /// Sets the storage driver.
    #[must_use]
    pub fn with_storage_driver(mut self, driver: impl Into<String>) -> Self {
        self.storage_driver = Some(driver.into());
        self
    }
}

impl fmt::Display for DatasetVersionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.storage_driver {
            Some(driver) => write!(f, "{}@{driver}", self.id),
            None => f.write_str(&self.id),
        }
    }
}

/// One upload: a byte stream plus what the caller claims about it.
///
/// Consumed by value by a single pipeline run.
///
/// # Examples
///
/// ```
/// use sluice_core::{DatasetVersionRef, UploadSession};
/// use sluice_core::security::QuotaLimit;
/// use std::io::Cursor;
///
/// let session = UploadSession::new(Cursor::new(b"hello".to_vec()), "hello.txt")
///     .with_content_type("text/plain")
///     .with_dataset_version(DatasetVersionRef::new("doi:10.5072/FK2/ABC/1.0"))
///     .with_quota(QuotaLimit::new(1000, 500));
///
/// assert_eq!(session.file_name(), "hello.txt");
/// ```
pub struct UploadSession<R> {
    source: R,
    file_name: String,
    content_type: Option<String>,
    dataset_version: DatasetVersionRef,
    quota: Option<QuotaLimit>,
    checksum_algorithm: Option<ChecksumAlgorithm>,
}

impl<R: Read> UploadSession<R> {
    /// Creates a session for `source` declared as `file_name`.
    pub fn new(source: R, file_name: impl Into<String>) -> Self {
        Self {
            source,
            file_name: file_name.into(),
            content_type: None,
            dataset_version: DatasetVersionRef::default(),
            quota: None,
            checksum_algorithm: None,
        }
    }

    /// Sets the client-declared content type.
    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Sets the target dataset version.
    #[must_use]
    pub fn with_dataset_version(mut self, version: DatasetVersionRef) -> Self {
        self.dataset_version = version;
        self
    }

    /// Attaches the session quota.
    #[must_use]
    pub fn with_quota(mut self, quota: QuotaLimit) -> Self {
        self.quota = Some(quota);
        self
    }

    /// Overrides the configured fixity algorithm for this upload.
    #[must_use]
    pub fn with_checksum_algorithm(mut self, algorithm: ChecksumAlgorithm) -> Self {
        self.checksum_algorithm = Some(algorithm);
        self
    }

    /// Declared file name.
    #[must_use]
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Declared content type.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Target dataset version.
    #[must_use]
    pub fn dataset_version(&self) -> &DatasetVersionRef {
        &self.dataset_version
    }

    /// Session quota, if any.
    #[must_use]
    pub fn quota(&self) -> Option<QuotaLimit> {
        self.quota
    }

    /// Checksum override, if any.
    #[must_use]
    pub fn checksum_algorithm(&self) -> Option<ChecksumAlgorithm> {
        self.checksum_algorithm
    }

    pub(crate) fn into_source(self) -> R {
        self.source
    }
}

impl<R> fmt::Debug for UploadSession<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadSession")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("dataset_version", &self.dataset_version)
            .field("quota", &self.quota)
            .field("checksum_algorithm", &self.checksum_algorithm)
            .finish_non_exhaustive()
    }
}
