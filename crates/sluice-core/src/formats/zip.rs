//! Zip archive expansion.
//!
//! Expansion runs in three passes over one opened archive: the central
//! directory is listed, every entry name is validated, and only then are
//! entries streamed to disk one at a time.

use std::fs::File;
use std::io::BufWriter;
use std::io::Write;
use std::path::Path;

use crate::IngestError;
use crate::ItemError;
use crate::ProgressCallback;
use crate::Result;
use crate::copy::CopyBuffer;
use crate::copy::CopyOutcome;
use crate::copy::copy_bounded;
use crate::security::validate_all;
use crate::types::SafePath;
use crate::types::StagingDir;

use super::ItemOutcome;
use super::StagedFile;

/// A file entry from the central directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Position in the archive.
    pub index: usize,
    /// Raw entry name.
    pub name: String,
    /// Uncompressed size claimed by the header. Informational only.
    pub declared_size: u64,
}

/// Opened zip archive.
pub struct ZipExpander {
    archive: zip::ZipArchive<File>,
    entries: Vec<ArchiveEntry>,
}

impl ZipExpander {
    /// Opens the archive and reads its central directory.
    ///
    /// # Errors
    ///
    /// Returns `IngestError::Io` if the file cannot be opened and
    /// `IngestError::UnreadableArchive` if it is not a readable zip.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let mut archive = zip::ZipArchive::new(file).map_err(IngestError::unreadable)?;

        let mut entries = Vec::new();
        for index in 0..archive.len() {
            let entry = archive.by_index_raw(index).map_err(IngestError::unreadable)?;
            if entry.is_dir() || is_platform_metadata(entry.name()) {
                continue;
            }
            entries.push(ArchiveEntry {
                index,
                name: entry.name().to_string(),
                declared_size: entry.size(),
            });
        }

        tracing::debug!(entries = entries.len(), total = archive.len(), "read zip listing");
        Ok(Self { archive, entries })
    }

    /// File entries in archive order, without directories or macOS
    /// metadata.
    #[must_use]
    pub fn listing(&self) -> &[ArchiveEntry] {
        &self.entries
    }

    /// Entry names in archive order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    /// Validates every entry name before anything is written.
    ///
    /// # Errors
    ///
    /// Returns `IngestError::PathTraversal` for the first hostile name.
    pub fn validate_paths(&self, staging: &StagingDir) -> Result<Vec<SafePath>> {
        validate_all(self.names(), staging)
    }

    /// Streams every listed entry into a fresh staging file.
    ///
    /// `paths` must come from [`validate_paths`](Self::validate_paths) and
    /// lines up with [`listing`](Self::listing). Entries larger than
    /// `max_entry_size` and entries that fail to decompress become
    /// per-entry errors; earlier entries stay staged.
    ///
    /// # Errors
    ///
    /// Returns `IngestError::StagingIo` if the staging directory cannot be
    /// written, which ends the whole expansion.
    pub fn expand(
        &mut self,
        staging: &mut StagingDir,
        paths: &[SafePath],
        max_entry_size: Option<u64>,
        buffer: &mut CopyBuffer,
        progress: &mut dyn ProgressCallback,
    ) -> Result<Vec<ItemOutcome>> {
        let total = self.entries.len();
        let mut outcomes = Vec::with_capacity(total);

        for (position, (entry, safe)) in self.entries.iter().zip(paths).enumerate() {
            progress.on_item_start(&entry.name, total, position + 1);
            let outcome =
                stage_entry(&mut self.archive, entry, safe, staging, max_entry_size, buffer)?;
            if let Ok(staged) = &outcome {
                progress.on_bytes_written(staged.size);
            }
            progress.on_item_complete(&entry.name);
            outcomes.push(outcome);
        }

        Ok(outcomes)
    }
}

impl std::fmt::Debug for ZipExpander {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZipExpander")
            .field("entries", &self.entries.len())
            .finish_non_exhaustive()
    }
}

fn stage_entry(
    archive: &mut zip::ZipArchive<File>,
    entry: &ArchiveEntry,
    safe: &SafePath,
    staging: &mut StagingDir,
    max_entry_size: Option<u64>,
    buffer: &mut CopyBuffer,
) -> Result<ItemOutcome> {
    let item_error = |error| {
        Ok(Err(ItemError {
            name: entry.name.clone(),
            error,
        }))
    };

    let mut reader = match archive.by_index(entry.index) {
        Ok(reader) => reader,
        Err(err) => return item_error(IngestError::unreadable(err)),
    };

    let target = staging.allocate("entry");
    let file = File::create(&target).map_err(|source| IngestError::StagingIo {
        path: staging.path().to_path_buf(),
        source,
    })?;
    let mut writer = StagingWriter::new(file);

    match copy_bounded(&mut reader, &mut writer, buffer, max_entry_size) {
        Ok(CopyOutcome::Complete(size)) => {
            writer.finish().map_err(|source| IngestError::StagingIo {
                path: target.clone(),
                source,
            })?;
            tracing::debug!(entry = %entry.name, size, "staged zip entry");
            Ok(Ok(StagedFile {
                path: target,
                file_name: safe.file_name(),
                directory_label: safe.directory_label(),
                size,
                content_type: None,
                source_entries: vec![entry.name.clone()],
            }))
        }
        Ok(CopyOutcome::Exceeded(read)) => {
            let limit = max_entry_size.unwrap_or_default();
            item_error(IngestError::SizeLimitExceeded {
                size: read.max(entry.declared_size),
                limit,
            })
        }
        Err(err) => match writer.take_error() {
            Some(source) => Err(IngestError::StagingIo {
                path: target,
                source,
            }),
            None => item_error(IngestError::unreadable(err)),
        },
    }
}

/// Buffered staging file that remembers whether a failure came from the
/// disk side of the copy.
struct StagingWriter {
    inner: BufWriter<File>,
    error: Option<std::io::Error>,
}

impl StagingWriter {
    fn new(file: File) -> Self {
        Self {
            inner: BufWriter::new(file),
            error: None,
        }
    }

    fn take_error(&mut self) -> Option<std::io::Error> {
        self.error.take()
    }

    fn finish(mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

impl Write for StagingWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.inner.write(buf).inspect_err(|e| {
            self.error = Some(std::io::Error::new(e.kind(), e.to_string()));
        })
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

/// macOS resource forks and Finder files.
fn is_platform_metadata(name: &str) -> bool {
    let mut last = "";
    for component in name.split(['/', '\\']).filter(|c| !c.is_empty()) {
        if component == "__MACOSX" {
            return true;
        }
        last = component;
    }
    last.starts_with("._") || last == ".DS_Store"
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::NoopProgress;
    use crate::test_utils::ZipTestBuilder;
    use crate::test_utils::create_test_zip;
    use tempfile::TempDir;

    fn write_zip(dir: &Path, data: &[u8]) -> std::path::PathBuf {
        let path = dir.join("upload.zip");
        std::fs::write(&path, data).unwrap();
        path
    }

    #[test]
    fn test_listing_skips_dirs_and_metadata() {
        let temp = TempDir::new().unwrap();
        let data = ZipTestBuilder::new()
            .add_directory("data/")
            .add_file("data/file1.txt", b"one")
            .add_file("__MACOSX/data/._file1.txt", b"fork")
            .add_file("data/._file2.txt", b"fork")
            .add_file(".DS_Store", b"finder")
            .add_file("data/file2.txt", b"two")
            .build();
        let expander = ZipExpander::open(&write_zip(temp.path(), &data)).unwrap();

        let names: Vec<_> = expander.names().collect();
        assert_eq!(names, ["data/file1.txt", "data/file2.txt"]);
        assert_eq!(expander.listing()[1].index, 5);
    }

    #[test]
    fn test_open_rejects_garbage() {
        let temp = TempDir::new().unwrap();
        let path = write_zip(temp.path(), b"PK\x03\x04 definitely not a zip");
        assert!(matches!(
            ZipExpander::open(&path),
            Err(IngestError::UnreadableArchive { .. })
        ));
    }

    #[test]
    fn test_expand_stages_every_entry() {
        let temp = TempDir::new().unwrap();
        let data = create_test_zip(&[("file1.txt", b"one"), ("dir/file2.txt", b"two!")]);
        let mut expander = ZipExpander::open(&write_zip(temp.path(), &data)).unwrap();
        let mut staging = StagingDir::create_in(temp.path()).unwrap();
        let paths = expander.validate_paths(&staging).unwrap();

        let outcomes = expander
            .expand(
                &mut staging,
                &paths,
                None,
                &mut CopyBuffer::new(),
                &mut NoopProgress,
            )
            .unwrap();

        let staged: Vec<_> = outcomes.into_iter().map(std::result::Result::unwrap).collect();
        assert_eq!(staged[0].file_name, "file1.txt");
        assert_eq!(staged[0].directory_label, None);
        assert_eq!(staged[1].file_name, "file2.txt");
        assert_eq!(staged[1].directory_label.as_deref(), Some("dir"));
        assert_eq!(staged[1].size, 4);
        assert_eq!(std::fs::read(&staged[1].path).unwrap(), b"two!");
        assert!(staged[1].path.starts_with(staging.path()));
    }

    #[test]
    fn test_expand_entry_over_limit_is_item_error() {
        let temp = TempDir::new().unwrap();
        let big = vec![b'x'; 100];
        let data = create_test_zip(&[("small.txt", b"ok"), ("big.txt", &big)]);
        let mut expander = ZipExpander::open(&write_zip(temp.path(), &data)).unwrap();
        let mut staging = StagingDir::create_in(temp.path()).unwrap();
        let paths = expander.validate_paths(&staging).unwrap();

        let outcomes = expander
            .expand(
                &mut staging,
                &paths,
                Some(50),
                &mut CopyBuffer::new(),
                &mut NoopProgress,
            )
            .unwrap();

        assert!(outcomes[0].is_ok());
        let failure = outcomes[1].as_ref().unwrap_err();
        assert_eq!(failure.name, "big.txt");
        assert!(matches!(
            failure.error,
            IngestError::SizeLimitExceeded { size: 100, limit: 50 }
        ));
    }

    #[test]
    fn test_validate_paths_rejects_traversal() {
        let temp = TempDir::new().unwrap();
        let data = create_test_zip(&[("ok.txt", b"ok"), ("../../evil.sh", b"#!")]);
        let expander = ZipExpander::open(&write_zip(temp.path(), &data)).unwrap();
        let staging = StagingDir::create_in(temp.path()).unwrap();
        assert!(matches!(
            expander.validate_paths(&staging),
            Err(IngestError::PathTraversal { .. })
        ));
    }

    #[test]
    fn test_platform_metadata() {
        assert!(is_platform_metadata("__MACOSX/a/b.txt"));
        assert!(is_platform_metadata("dir/._b.txt"));
        assert!(is_platform_metadata("dir/.DS_Store"));
        assert!(!is_platform_metadata("dir/b.txt"));
        assert!(!is_platform_metadata("dir/_b.txt"));
    }
}
