//! Upload ingestion for research data repositories.
//!
//! `sluice-core` turns one uploaded byte stream into a validated,
//! quota-checked set of logical data files: zip archives are expanded with
//! zip-slip protection, shapefile companion sets are rebuilt into single
//! bundles, BagIt bags are verified against their manifests, and every
//! produced file carries a fixity checksum.
//!
//! # Examples
//!
//! ```no_run
//! use sluice_core::{IngestConfig, ingest_file};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = IngestConfig::new("/srv/files").with_max_upload_size(Some(2 << 30));
//! let result = ingest_file("survey.zip", &config)?;
//! println!("Produced {} files", result.data_files().len());
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod api;
pub mod checksum;
pub mod config;
pub mod copy;
pub mod error;
pub mod formats;
pub mod pipeline;
pub mod report;
pub mod security;
pub mod session;
pub mod types;
pub mod units;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

// Re-export main API types
pub use api::ingest_file;
pub use api::ingest_upload;
pub use api::plan_archive;
pub use checksum::Checksum;
pub use checksum::ChecksumAlgorithm;
pub use config::ConfigProvider;
pub use config::IngestConfig;
pub use config::ShapefileRules;
pub use error::IngestError;
pub use error::Result;
pub use formats::ContentClassifier;
pub use formats::ContentType;
pub use formats::SniffingClassifier;
pub use pipeline::IngestPipeline;
pub use report::IngestResult;
pub use report::ItemError;
pub use report::LogicalDataFile;
pub use report::NoopProgress;
pub use report::ProgressCallback;
pub use session::DatasetVersionRef;
pub use session::UploadSession;
