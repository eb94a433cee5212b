//! Zip-slip validation for whole archive listings.

use std::path::PathBuf;

use crate::IngestError;
use crate::Result;
use crate::types::SafePath;
use crate::types::StagingDir;

/// Validates one entry name against the staging directory.
///
/// Delegates to [`SafePath::validate`].
///
/// # Errors
///
/// Returns `IngestError::PathTraversal` if the name would escape.
///
/// # Examples
///
/// ```no_run
/// use sluice_core::security::validate_path;
/// use sluice_core::types::StagingDir;
/// use std::path::Path;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let staging = StagingDir::create_in(Path::new("/tmp"))?;
/// assert!(validate_path("data/file1.txt", &staging).is_ok());
/// assert!(validate_path("../../etc/passwd", &staging).is_err());
/// # Ok(())
/// # }
/// ```
pub fn validate_path(name: &str, staging: &StagingDir) -> Result<SafePath> {
    SafePath::validate(name, staging)
}

/// Validates every name before anything is written.
///
/// Stops at the first offending name; the archive is rejected as a whole.
///
/// # Errors
///
/// Returns `IngestError::PathTraversal` naming the first bad entry.
pub fn validate_all<'a, I>(names: I, staging: &StagingDir) -> Result<Vec<SafePath>>
where
    I: IntoIterator<Item = &'a str>,
{
    names
        .into_iter()
        .map(|name| {
            validate_path(name, staging).map_err(|err| match err {
                IngestError::Io(_) => IngestError::PathTraversal {
                    path: PathBuf::from(name),
                },
                other => other,
            })
        })
        .collect()
}
