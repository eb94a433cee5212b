//! Configuration file loading.
//!
//! Settings come from three layers: the library defaults, an optional TOML
//! file, and command-line flags. Later layers win.
//!
//! ```toml
//! files_directory = "/srv/dataverse/files"
//! max_upload_size = "2G"
//! zip_upload_files_limit = 1000
//! storage_quotas_enforced = true
//! fixity_algorithm = "SHA-256"
//! require_prj = true
//!
//! [store_upload_limits]
//! s3 = "5G"
//! ```

use crate::cli::ConfigArgs;
use crate::cli::parse_byte_size;
use anyhow::Context;
use anyhow::Result;
use anyhow::anyhow;
use serde::Deserialize;
use sluice_core::ChecksumAlgorithm;
use sluice_core::IngestConfig;
use sluice_core::ShapefileRules;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

/// A byte count, written either as an integer or with a unit suffix.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ByteSize {
    Bytes(u64),
    Text(String),
}

impl ByteSize {
    fn bytes(&self) -> Result<u64> {
        match self {
            Self::Bytes(n) => Ok(*n),
            Self::Text(s) => parse_byte_size(s).map_err(|e| anyhow!(e)),
        }
    }
}

/// Contents of a `sluice.toml` file.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub files_directory: Option<PathBuf>,
    pub max_upload_size: Option<ByteSize>,
    pub store_upload_limits: HashMap<String, ByteSize>,
    pub storage_quotas_enforced: Option<bool>,
    pub fixity_algorithm: Option<String>,
    pub zip_upload_files_limit: Option<usize>,
    pub require_prj: Option<bool>,
}

impl FileConfig {
    /// Reads and parses a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file '{}'", path.display()))?;
        toml::from_str(&text)
            .with_context(|| format!("invalid config file '{}'", path.display()))
    }

    fn apply(self, mut config: IngestConfig) -> Result<IngestConfig> {
        if let Some(dir) = self.files_directory {
            config.files_directory = dir;
        }
        if let Some(size) = self.max_upload_size {
            config = config.with_max_upload_size(Some(size.bytes()?));
        }
        for (store, size) in self.store_upload_limits {
            let limit = size
                .bytes()
                .with_context(|| format!("store_upload_limits.{store}"))?;
            config = config.with_store_upload_limit(store, limit);
        }
        if let Some(enforced) = self.storage_quotas_enforced {
            config = config.with_storage_quotas_enforced(enforced);
        }
        if let Some(name) = self.fixity_algorithm {
            let algorithm: ChecksumAlgorithm = name.parse()?;
            config = config.with_fixity_algorithm(algorithm);
        }
        if let Some(limit) = self.zip_upload_files_limit {
            config = config.with_zip_upload_files_limit(limit);
        }
        if let Some(require_prj) = self.require_prj {
            config = config.with_shapefile_rules(ShapefileRules { require_prj });
        }
        Ok(config)
    }
}

fn apply_flags(args: &ConfigArgs, mut config: IngestConfig) -> IngestConfig {
    if let Some(dir) = &args.files_dir {
        config.files_directory.clone_from(dir);
    }
    if args.max_size.is_some() {
        config = config.with_max_upload_size(args.max_size);
    }
    if let Some(limit) = args.zip_limit {
        config = config.with_zip_upload_files_limit(limit);
    }
    if let Some(algorithm) = args.checksum {
        config = config.with_fixity_algorithm(algorithm);
    }
    if args.enforce_quota {
        config = config.with_storage_quotas_enforced(true);
    }
    if args.allow_missing_prj {
        config = config.with_shapefile_rules(ShapefileRules { require_prj: false });
    }
    config
}

/// Builds the effective configuration.
pub fn resolve(file: Option<&Path>, args: &ConfigArgs) -> Result<IngestConfig> {
    let mut config = IngestConfig::default();
    if let Some(path) = file {
        config = FileConfig::load(path)?.apply(config)?;
        tracing::debug!(path = %path.display(), "loaded config file");
    }
    let config = apply_flags(args, config);
    tracing::debug!(?config, "effective configuration");
    Ok(config)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sluice_core::ConfigProvider;
    use tempfile::TempDir;

    fn write_config(text: &str) -> (TempDir, PathBuf) {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("sluice.toml");
        fs::write(&path, text).unwrap();
        (temp, path)
    }

    #[test]
    fn test_file_settings_are_applied() {
        let (_temp, path) = write_config(
            r#"
files_directory = "/srv/files"
max_upload_size = "2M"
zip_upload_files_limit = 10
storage_quotas_enforced = true
fixity_algorithm = "SHA-256"
require_prj = false

[store_upload_limits]
s3 = 4096
"#,
        );

        let config = resolve(Some(&path), &ConfigArgs::default()).unwrap();
        assert_eq!(config.files_directory, PathBuf::from("/srv/files"));
        assert_eq!(config.max_upload_size(None), Some(2 * 1024 * 1024));
        assert_eq!(config.max_upload_size(Some("s3")), Some(4096));
        assert_eq!(config.zip_upload_files_limit(), 10);
        assert!(config.storage_quotas_enforced());
        assert_eq!(config.fixity_algorithm(), ChecksumAlgorithm::Sha256);
        assert!(!config.shapefile_rules().require_prj);
    }

    #[test]
    fn test_flags_override_file() {
        let (_temp, path) = write_config("zip_upload_files_limit = 10\nmax_upload_size = 100\n");
        let args = ConfigArgs {
            zip_limit: Some(3),
            max_size: Some(50),
            ..ConfigArgs::default()
        };

        let config = resolve(Some(&path), &args).unwrap();
        assert_eq!(config.zip_upload_files_limit(), 3);
        assert_eq!(config.max_upload_size(None), Some(50));
    }

    #[test]
    fn test_defaults_without_file() {
        let config = resolve(None, &ConfigArgs::default()).unwrap();
        assert_eq!(config.zip_upload_files_limit(), 1000);
        assert_eq!(config.fixity_algorithm(), ChecksumAlgorithm::Md5);
        assert!(!config.storage_quotas_enforced());
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let (_temp, path) = write_config("zip_limit = 3\n");
        let err = resolve(Some(&path), &ConfigArgs::default()).unwrap_err();
        assert!(format!("{err:?}").contains("invalid config file"));
    }

    #[test]
    fn test_bad_algorithm_is_rejected() {
        let (_temp, path) = write_config("fixity_algorithm = \"crc32\"\n");
        assert!(resolve(Some(&path), &ConfigArgs::default()).is_err());
    }
}
