//! Ingestion settings.
//!
//! The pipeline never reads process-wide state: everything it needs is asked
//! of a [`ConfigProvider`] handed to it at construction. [`IngestConfig`] is
//! the plain-struct implementation used by the CLI and most tests.

use std::collections::HashMap;
use std::path::Path;
use std::path::PathBuf;

use crate::IngestError;
use crate::Result;
use crate::checksum::ChecksumAlgorithm;

/// Default cap on the number of files expanded from one zip upload.
pub const DEFAULT_ZIP_UPLOAD_FILES_LIMIT: usize = 1000;

/// Name of the directory under `files_directory` that holds temp files.
pub const TEMP_DIR_NAME: &str = "temp";

/// Read-only configuration consumed by the pipeline.
pub trait ConfigProvider {
    /// Maximum upload size for the given storage driver, `None` when
    /// unlimited.
    fn max_upload_size(&self, store: Option<&str>) -> Option<u64>;

    /// Whether per-session storage quotas are enforced.
    fn storage_quotas_enforced(&self) -> bool;

    /// Fixity algorithm applied when the session does not override it.
    fn fixity_algorithm(&self) -> ChecksumAlgorithm;

    /// Maximum number of files expanded from one zip, 0 for unlimited.
    fn zip_upload_files_limit(&self) -> usize;

    /// Base directory for temp files; uploads are staged in its `temp`
    /// subdirectory.
    fn files_directory(&self) -> &Path;

    /// Shapefile grouping rules.
    fn shapefile_rules(&self) -> ShapefileRules {
        ShapefileRules::default()
    }

    /// Directory the pipeline stages uploads in.
    fn temp_directory(&self) -> PathBuf {
        self.files_directory().join(TEMP_DIR_NAME)
    }
}

impl<T: ConfigProvider + ?Sized> ConfigProvider for &T {
    fn max_upload_size(&self, store: Option<&str>) -> Option<u64> {
        (**self).max_upload_size(store)
    }

    fn storage_quotas_enforced(&self) -> bool {
        (**self).storage_quotas_enforced()
    }

    fn fixity_algorithm(&self) -> ChecksumAlgorithm {
        (**self).fixity_algorithm()
    }

    fn zip_upload_files_limit(&self) -> usize {
        (**self).zip_upload_files_limit()
    }

    fn files_directory(&self) -> &Path {
        (**self).files_directory()
    }

    fn shapefile_rules(&self) -> ShapefileRules {
        (**self).shapefile_rules()
    }
}

/// Which companion files make a shapefile bundle complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShapefileRules {
    /// Require `.prj` in addition to `.shp`, `.shx` and `.dbf`.
    pub require_prj: bool,
}

impl Default for ShapefileRules {
    fn default() -> Self {
        Self { require_prj: true }
    }
}

/// Plain configuration struct.
///
/// # Examples
///
/// ```
/// use sluice_core::IngestConfig;
/// use sluice_core::checksum::ChecksumAlgorithm;
///
/// let config = IngestConfig::new("/srv/uploads")
///     .with_max_upload_size(Some(10 * 1024 * 1024))
///     .with_store_upload_limit("s3", 2 * 1024 * 1024 * 1024)
///     .with_fixity_algorithm(ChecksumAlgorithm::Sha256)
///     .with_zip_upload_files_limit(500);
///
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Base directory; temp files go into its `temp` subdirectory.
    pub files_directory: PathBuf,

    /// Size limit applied to stores without an override. `None` = unlimited.
    pub max_upload_size: Option<u64>,

    /// Per-store size limits, keyed by storage driver id.
    pub store_upload_limits: HashMap<String, u64>,

    /// Enforce per-session storage quotas.
    pub storage_quotas_enforced: bool,

    /// Default fixity algorithm.
    pub fixity_algorithm: ChecksumAlgorithm,

    /// Zip file-count limit, 0 = unlimited.
    pub zip_upload_files_limit: usize,

    /// Shapefile grouping rules.
    pub shapefile_rules: ShapefileRules,
}

impl Default for IngestConfig {
    /// Defaults:
    /// - `files_directory`: `<system temp>/sluice`
    /// - `max_upload_size`: unlimited
    /// - `storage_quotas_enforced`: false
    /// - `fixity_algorithm`: MD5
    /// - `zip_upload_files_limit`: 1000
    /// - `shapefile_rules`: `.prj` required
    fn default() -> Self {
        Self {
            files_directory: std::env::temp_dir().join("sluice"),
            max_upload_size: None,
            store_upload_limits: HashMap::new(),
            storage_quotas_enforced: false,
            fixity_algorithm: ChecksumAlgorithm::default(),
            zip_upload_files_limit: DEFAULT_ZIP_UPLOAD_FILES_LIMIT,
            shapefile_rules: ShapefileRules::default(),
        }
    }
}

impl IngestConfig {
    /// Creates a configuration rooted at `files_directory` with default
    /// limits.
    #[must_use]
    pub fn new(files_directory: impl Into<PathBuf>) -> Self {
        Self {
            files_directory: files_directory.into(),
            ..Default::default()
        }
    }

    /// Sets the default upload size limit.
    #[must_use]
    pub fn with_max_upload_size(mut self, limit: Option<u64>) -> Self {
        self.max_upload_size = limit;
        self
    }

    /// Sets the size limit for one storage driver.
    #[must_use]
    pub fn with_store_upload_limit(mut self, store: impl Into<String>, limit: u64) -> Self {
        self.store_upload_limits.insert(store.into(), limit);
        self
    }

    /// Turns quota enforcement on or off.
    #[must_use]
    pub fn with_storage_quotas_enforced(mut self, enforced: bool) -> Self {
        self.storage_quotas_enforced = enforced;
        self
    }

    /// Sets the default fixity algorithm.
    #[must_use]
    pub fn with_fixity_algorithm(mut self, algorithm: ChecksumAlgorithm) -> Self {
        self.fixity_algorithm = algorithm;
        self
    }

    /// Sets the zip file-count limit (0 = unlimited).
    #[must_use]
    pub fn with_zip_upload_files_limit(mut self, limit: usize) -> Self {
        self.zip_upload_files_limit = limit;
        self
    }

    /// Sets the shapefile grouping rules.
    #[must_use]
    pub fn with_shapefile_rules(mut self, rules: ShapefileRules) -> Self {
        self.shapefile_rules = rules;
        self
    }

    /// Checks that the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns `IngestError::InvalidConfig` if the files directory is empty.
    pub fn validate(&self) -> Result<()> {
        if self.files_directory.as_os_str().is_empty() {
            return Err(IngestError::InvalidConfig {
                reason: "files directory must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

impl ConfigProvider for IngestConfig {
    fn max_upload_size(&self, store: Option<&str>) -> Option<u64> {
        store
            .and_then(|id| self.store_upload_limits.get(id).copied())
            .or(self.max_upload_size)
    }

    fn storage_quotas_enforced(&self) -> bool {
        self.storage_quotas_enforced
    }

    fn fixity_algorithm(&self) -> ChecksumAlgorithm {
        self.fixity_algorithm
    }

    fn zip_upload_files_limit(&self) -> usize {
        self.zip_upload_files_limit
    }

    fn files_directory(&self) -> &Path {
        &self.files_directory
    }

    fn shapefile_rules(&self) -> ShapefileRules {
        self.shapefile_rules
    }
}
