//! Scoped working directory for one expansion.

use crate::IngestError;
use crate::Result;
use std::path::Path;
use std::path::PathBuf;
use tempfile::TempDir;

/// A private directory under the temp root that holds extracted entries and
/// rebuilt shapefile bundles while an archive is being expanded.
///
/// The directory is created fresh, canonicalized once, and removed when the
/// value is dropped. Files that must outlive the expansion are moved out with
/// a rename before that happens.
///
/// Scratch files are named by the directory itself (see
/// [`StagingDir::allocate`]), never by archive entry names, so nothing an
/// archive contains decides where bytes land on disk.
#[derive(Debug)]
pub struct StagingDir {
    dir: TempDir,
    root: PathBuf,
    next: usize,
}

impl StagingDir {
    /// Creates a new staging directory inside `base`.
    ///
    /// # Errors
    ///
    /// Returns `IngestError::StagingIo` if `base` is missing or not writable.
    pub fn create_in(base: &Path) -> Result<Self> {
        let staging_err = |source| IngestError::StagingIo {
            path: base.to_path_buf(),
            source,
        };

        let dir = tempfile::Builder::new()
            .prefix("unpack")
            .tempdir_in(base)
            .map_err(staging_err)?;
        let root = dir.path().canonicalize().map_err(staging_err)?;

        Ok(Self { dir, root, next: 0 })
    }

    /// Canonical path of the directory.
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Returns a fresh, unused path inside the directory.
    ///
    /// `stem` only decorates the name for debugging; uniqueness comes from a
    /// counter.
    pub fn allocate(&mut self, stem: &str) -> PathBuf {
        let n = self.next;
        self.next += 1;
        self.root.join(format!("{stem}-{n:05}"))
    }

    /// Removes the directory now, reporting failures instead of ignoring them.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if removal fails.
    pub fn close(self) -> Result<()> {
        self.dir.close().map_err(IngestError::Io)
    }
}
