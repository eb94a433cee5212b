//! Validated wrappers used while staging archive contents.
//!
//! Each type is checked on construction; there is no `From<RawType>` path
//! around the validation.

pub mod safe_path;
pub mod staging_dir;
pub mod storage_id;

pub use safe_path::SafePath;
pub use staging_dir::StagingDir;
pub use storage_id::StorageIdentifier;
