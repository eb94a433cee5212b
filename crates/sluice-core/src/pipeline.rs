//! Upload ingestion orchestrator.
//!
//! One run takes an [`UploadSession`] through these stages:
//!
//! 1. the stream is staged to a `tmp*` file under `<files_directory>/temp`,
//!    measuring its real size;
//! 2. the size limit of the target store and the session quota are checked
//!    against the whole upload;
//! 3. the upload is classified and takes the plain, zip or bag path;
//! 4. every resulting item is classified, charged to the quota,
//!    checksummed and promoted to `<temp>/<storage identifier>`.
//!
//! Failures in stages 1 and 2 abort the run. Everything later is recorded
//! per item in the [`IngestResult`] while the other items carry on.

use std::collections::HashMap;
use std::fs;
use std::io::BufWriter;
use std::io::Read;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::time::Instant;

use tempfile::NamedTempFile;

use crate::IngestError;
use crate::IngestResult;
use crate::LogicalDataFile;
use crate::NoopProgress;
use crate::ProgressCallback;
use crate::Result;
use crate::UploadSession;
use crate::checksum::ChecksumAlgorithm;
use crate::checksum::digest_file;
use crate::config::ConfigProvider;
use crate::config::ShapefileRules;
use crate::copy::CopyBuffer;
use crate::copy::CopyOutcome;
use crate::copy::copy_bounded;
use crate::formats::BagHandler;
use crate::formats::ContentClassifier;
use crate::formats::ContentType;
use crate::formats::GroupedItem;
use crate::formats::ItemOutcome;
use crate::formats::ManifestBagHandler;
use crate::formats::StagedFile;
use crate::formats::ZipExpander;
use crate::formats::bagit::Bag;
use crate::formats::bagit::detect_bag_root;
use crate::formats::detect::classify_path;
use crate::formats::shapefile;
use crate::report::IngestResultBuilder;
use crate::security::QuotaTracker;
use crate::types::StagingDir;
use crate::types::StorageIdentifier;

/// An over-limit zip is still expanded when its entries collapse into at
/// least one and at most this many shapefile bundles.
pub const SHAPEFILE_EXEMPTION_MAX_GROUPS: usize = 2;

/// Turns uploads into logical data files.
///
/// The pipeline holds only read-only collaborators; all per-upload state
/// lives in the run, so one pipeline can serve concurrent uploads.
///
/// # Examples
///
/// ```no_run
/// use sluice_core::{IngestConfig, IngestPipeline, SniffingClassifier, UploadSession};
/// use std::fs::File;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = IngestConfig::new("/srv/dataverse/files").with_zip_upload_files_limit(1000);
/// let pipeline = IngestPipeline::new(config, SniffingClassifier::new());
///
/// let upload = File::open("survey.zip")?;
/// let result = pipeline.ingest(UploadSession::new(upload, "survey.zip"))?;
/// for file in result.data_files() {
///     println!("{} -> {} ({})", file.label, file.storage_identifier, file.checksum);
/// }
/// for failure in result.errors() {
///     eprintln!("{}: {}", failure.name, failure.message());
/// }
/// # Ok(())
/// # }
/// ```
pub struct IngestPipeline<C, K> {
    config: C,
    classifier: K,
    bag_handler: Box<dyn BagHandler>,
}

impl<C: ConfigProvider, K: ContentClassifier> IngestPipeline<C, K> {
    /// Creates a pipeline with the default bag handler.
    pub fn new(config: C, classifier: K) -> Self {
        Self {
            config,
            classifier,
            bag_handler: Box::new(ManifestBagHandler::new()),
        }
    }

    /// Replaces the bag handler.
    #[must_use]
    pub fn with_bag_handler(mut self, handler: impl BagHandler + 'static) -> Self {
        self.bag_handler = Box::new(handler);
        self
    }

    /// Configuration in use.
    pub fn config(&self) -> &C {
        &self.config
    }

    /// Ingests one upload.
    ///
    /// # Errors
    ///
    /// Returns an error only for whole-upload failures: the upload cannot
    /// be staged (`StagingIo`), is over the size limit
    /// (`SizeLimitExceeded`) or over the quota (`QuotaExceeded`). Nothing is
    /// produced in that case.
    pub fn ingest<R: Read>(&self, session: UploadSession<R>) -> Result<IngestResult> {
        self.ingest_with_progress(session, &mut NoopProgress)
    }

    /// Ingests one upload, reporting progress.
    ///
    /// # Errors
    ///
    /// Same as [`ingest`](Self::ingest).
    pub fn ingest_with_progress<R: Read>(
        &self,
        session: UploadSession<R>,
        progress: &mut dyn ProgressCallback,
    ) -> Result<IngestResult> {
        let started = Instant::now();
        let span = tracing::info_span!(
            "ingest",
            file = %session.file_name(),
            version = %session.dataset_version(),
        );
        let _guard = span.enter();

        let store = session.dataset_version().storage_driver.clone();
        let mut run = Run {
            pipeline: self,
            temp_root: self.config.temp_directory(),
            size_limit: self.config.max_upload_size(store.as_deref()),
            quota: QuotaTracker::new(session.quota(), self.config.storage_quotas_enforced()),
            algorithm: session
                .checksum_algorithm()
                .unwrap_or_else(|| self.config.fixity_algorithm()),
            rules: self.config.shapefile_rules(),
            buffer: CopyBuffer::new(),
            results: IngestResultBuilder::new(),
        };

        let file_name = session.file_name().to_string();
        let declared = session.content_type().map(str::to_string);

        let (upload, size) = run.stage_upload(session.into_source())?;
        tracing::debug!(size, path = %upload.path().display(), "staged upload");

        if let Some(limit) = run.size_limit
            && size > limit
        {
            return Err(IngestError::SizeLimitExceeded { size, limit });
        }
        run.quota.check(size)?;

        let content_type = classify_path(
            &self.classifier,
            upload.path(),
            &file_name,
            declared.as_deref(),
        );
        tracing::debug!(%content_type, "classified upload");

        let upload = Upload {
            file: upload,
            name: file_name,
            size,
            content_type,
        };
        if upload.content_type.is_zip() {
            run.ingest_zip(upload, progress)?;
        } else {
            run.ingest_plain(upload, progress);
        }
        progress.on_complete();

        let result = run.results.finish(started.elapsed());
        tracing::info!(
            files = result.data_files().len(),
            errors = result.errors().len(),
            bytes = result.total_bytes(),
            "upload ingested"
        );
        Ok(result)
    }
}

impl<C, K> std::fmt::Debug for IngestPipeline<C, K>
where
    C: std::fmt::Debug,
    K: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IngestPipeline")
            .field("config", &self.config)
            .field("classifier", &self.classifier)
            .finish_non_exhaustive()
    }
}

/// The staged upload.
struct Upload {
    file: NamedTempFile,
    name: String,
    size: u64,
    content_type: ContentType,
}

/// State of one pipeline run.
struct Run<'p, C, K> {
    pipeline: &'p IngestPipeline<C, K>,
    temp_root: PathBuf,
    size_limit: Option<u64>,
    quota: QuotaTracker,
    algorithm: ChecksumAlgorithm,
    rules: ShapefileRules,
    buffer: CopyBuffer,
    results: IngestResultBuilder,
}

impl<C: ConfigProvider, K: ContentClassifier> Run<'_, C, K> {
    fn staging_io(&self, source: std::io::Error) -> IngestError {
        IngestError::StagingIo {
            path: self.temp_root.clone(),
            source,
        }
    }

    /// Writes the stream to a temp file. Past the size limit the rest of the
    /// stream is only counted, so the reported size is exact.
    fn stage_upload<R: Read>(&mut self, mut source: R) -> Result<(NamedTempFile, u64)> {
        let mut temp = tempfile::Builder::new()
            .prefix("tmp")
            .tempfile_in(&self.temp_root)
            .map_err(|e| self.staging_io(e))?;

        let outcome = {
            let mut writer = BufWriter::new(temp.as_file_mut());
            let outcome = copy_bounded(&mut source, &mut writer, &mut self.buffer, self.size_limit);
            let flushed = writer.flush();
            match (outcome, flushed) {
                (Ok(outcome), Ok(())) => Ok(outcome),
                (Err(err), _) => Err(err),
                (Ok(_), Err(e)) => Err(IngestError::Io(e)),
            }
        };

        let size = match outcome {
            Ok(CopyOutcome::Complete(size)) => size,
            Ok(CopyOutcome::Exceeded(read)) => {
                let rest = std::io::copy(&mut source, &mut std::io::sink())
                    .map_err(|e| self.staging_io(e))?;
                read + rest
            }
            Err(IngestError::Io(e)) => return Err(self.staging_io(e)),
            Err(other) => return Err(other),
        };

        Ok((temp, size))
    }

    fn ingest_plain(&mut self, upload: Upload, progress: &mut dyn ProgressCallback) {
        progress.on_item_start(&upload.name, 1, 1);
        progress.on_bytes_written(upload.size);

        let name = upload.name.clone();
        let staged = StagedFile {
            path: upload.file.path().to_path_buf(),
            file_name: upload.name,
            directory_label: None,
            size: upload.size,
            content_type: Some(upload.content_type),
            source_entries: Vec::new(),
        };
        let temp_path = upload.file.into_temp_path();
        let outcome = self.finalize(staged, |target| {
            temp_path.persist(target).map_err(|e| e.error)
        });
        self.record(&name, outcome);

        progress.on_item_complete(&name);
    }

    fn ingest_zip(&mut self, upload: Upload, progress: &mut dyn ProgressCallback) -> Result<()> {
        let mut expander = match ZipExpander::open(upload.file.path()) {
            Ok(expander) => expander,
            Err(err) => {
                tracing::warn!(error = %err, "cannot read zip upload");
                self.results.push_error(upload.name, err);
                return Ok(());
            }
        };

        let count = expander.listing().len();
        if count <= 1 {
            tracing::debug!(count, "zip kept as a single file");
            drop(expander);
            self.ingest_plain(upload, progress);
            return Ok(());
        }

        let mut staging = StagingDir::create_in(&self.temp_root)?;
        let paths = match expander.validate_paths(&staging) {
            Ok(paths) => paths,
            Err(err) => {
                tracing::warn!(error = %err, "zip rejected");
                self.results.push_error(upload.name, err);
                return Ok(());
            }
        };

        let bag_prefix = detect_bag_root(expander.names());
        let limit = self.pipeline.config.zip_upload_files_limit();
        if limit > 0 && count > limit {
            let exempt = bag_prefix.is_none() && {
                let names: Vec<&str> = expander.names().collect();
                let groups = shapefile::count_groups(&names, self.rules);
                (1..=SHAPEFILE_EXEMPTION_MAX_GROUPS).contains(&groups)
            };
            if !exempt {
                tracing::warn!(count, limit, "too many files in zip");
                self.results
                    .push_error(upload.name, IngestError::TooManyArchiveEntries { count, limit });
                return Ok(());
            }
            tracing::debug!(count, limit, "zip over the file limit, exempt as shapefile bundle");
        }

        let outcomes = expander.expand(
            &mut staging,
            &paths,
            self.size_limit,
            &mut self.buffer,
            progress,
        )?;
        // the upload itself is no longer needed
        drop(expander);
        drop(upload.file);

        // failures wait at their entry position so errors come out in
        // archive order, interleaved with the finalize failures
        let mut staged = Vec::with_capacity(outcomes.len());
        let mut failures = Vec::new();
        let mut positions = HashMap::new();
        let mut entry_positions = HashMap::new();
        for (position, outcome) in outcomes.into_iter().enumerate() {
            match outcome {
                Ok(file) => {
                    positions.insert(file.path.clone(), position);
                    entry_positions.insert(file.display_name().to_string(), position);
                    staged.push(file);
                }
                Err(failure) => {
                    tracing::warn!(entry = %failure.name, error = %failure.error, "entry skipped");
                    failures.push((position, failure));
                }
            }
        }
        let position_of = |file: &StagedFile| positions.get(&file.path).copied();

        let items: Vec<(usize, ItemOutcome)> = match bag_prefix {
            Some(prefix) => {
                tracing::debug!(prefix = %prefix, "expanding as BagIt bag");
                let mut last = 0;
                self.pipeline
                    .bag_handler
                    .handle(Bag {
                        prefix,
                        files: staged,
                    })
                    .into_iter()
                    .map(|outcome| {
                        let position = match &outcome {
                            Ok(file) => position_of(file),
                            Err(failure) => entry_positions.get(&failure.name).copied(),
                        };
                        last = position.unwrap_or(last);
                        (last, outcome)
                    })
                    .collect()
            }
            None => shapefile::group(staged, self.rules)
                .into_iter()
                .map(|item| match item {
                    GroupedItem::Standalone(file) => {
                        (position_of(&file).unwrap_or(usize::MAX), Ok(file))
                    }
                    GroupedItem::Group(group) => {
                        let position = group
                            .members
                            .iter()
                            .filter_map(position_of)
                            .min()
                            .unwrap_or(usize::MAX);
                        let outcome =
                            shapefile::rezip(&group, &mut staging, &mut self.buffer).map_err(
                                |error| crate::ItemError {
                                    name: group.zip_name(),
                                    error,
                                },
                            );
                        (position, outcome)
                    }
                })
                .collect(),
        };

        let mut failures = failures.into_iter().peekable();
        for (position, outcome) in items {
            while let Some((_, failure)) = failures.next_if(|(p, _)| *p < position) {
                self.results.push_error(failure.name, failure.error);
            }
            self.finalize_staged(outcome);
        }
        for (_, failure) in failures {
            self.results.push_error(failure.name, failure.error);
        }

        if let Err(err) = staging.close() {
            tracing::warn!(error = %err, "could not remove staging directory");
        }
        Ok(())
    }

    fn finalize_staged(&mut self, outcome: ItemOutcome) {
        match outcome {
            Ok(file) => {
                let name = file.display_name().to_string();
                let source = file.path.clone();
                let outcome = self.finalize(file, |target| fs::rename(&source, target));
                self.record(&name, outcome);
            }
            Err(failure) => {
                tracing::warn!(entry = %failure.name, error = %failure.error, "item rejected");
                self.results.push_error(failure.name, failure.error);
            }
        }
    }

    fn record(&mut self, name: &str, outcome: Result<LogicalDataFile>) {
        match outcome {
            Ok(file) => {
                tracing::debug!(
                    label = %file.label,
                    id = %file.storage_identifier,
                    size = file.size,
                    "file accepted"
                );
                self.results.push_file(file);
            }
            Err(error) => {
                tracing::warn!(entry = name, error = %error, "file rejected");
                self.results.push_error(name, error);
            }
        }
    }

    /// Classify, charge the quota, checksum, promote.
    fn finalize<F>(&mut self, staged: StagedFile, promote: F) -> Result<LogicalDataFile>
    where
        F: FnOnce(&Path) -> std::io::Result<()>,
    {
        let content_type = match staged.content_type {
            Some(ct) => ct,
            None => classify_path(
                &self.pipeline.classifier,
                &staged.path,
                &staged.file_name,
                None,
            ),
        };

        self.quota.reserve(staged.size)?;
        let checksum = digest_file(&staged.path, self.algorithm, &mut self.buffer)?;

        let storage_identifier = StorageIdentifier::generate();
        let storage_path = self.temp_root.join(storage_identifier.as_str());
        promote(&storage_path).map_err(|source| IngestError::StagingIo {
            path: storage_path.clone(),
            source,
        })?;

        Ok(LogicalDataFile {
            label: staged.file_name,
            directory_label: staged.directory_label,
            storage_identifier,
            storage_path,
            size: staged.size,
            content_type,
            checksum,
            source_entries: staged.source_entries,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::IngestConfig;
    use crate::SniffingClassifier;
    use crate::security::QuotaLimit;
    use crate::test_utils::ZipTestBuilder;
    use crate::test_utils::create_test_zip;
    use std::io::Cursor;
    use tempfile::TempDir;

    fn setup() -> (TempDir, IngestConfig) {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("temp")).unwrap();
        let config = IngestConfig::new(temp.path());
        (temp, config)
    }

    fn session(data: Vec<u8>, name: &str) -> UploadSession<Cursor<Vec<u8>>> {
        UploadSession::new(Cursor::new(data), name)
    }

    #[test]
    fn test_plain_file() {
        let (_temp, config) = setup();
        let pipeline = IngestPipeline::new(&config, SniffingClassifier::new());
        let result = pipeline.ingest(session(b"abc".to_vec(), "a.txt")).unwrap();

        assert_eq!(result.data_files().len(), 1);
        let file = &result.data_files()[0];
        assert_eq!(file.label, "a.txt");
        assert_eq!(file.size, 3);
        assert_eq!(file.checksum.value, "900150983cd24fb0d6963f7d28e17f72");
        assert_eq!(fs::read(&file.storage_path).unwrap(), b"abc");
    }

    #[test]
    fn test_size_measured_past_limit() {
        let (_temp, config) = setup();
        let config = config.with_max_upload_size(Some(10));
        let pipeline = IngestPipeline::new(&config, SniffingClassifier::new());
        let data = vec![b'x'; 200 * 1024];
        let err = pipeline.ingest(session(data, "big.bin")).unwrap_err();
        assert!(matches!(
            err,
            IngestError::SizeLimitExceeded {
                size: 204_800,
                limit: 10
            }
        ));
    }

    #[test]
    fn test_session_checksum_override() {
        let (_temp, config) = setup();
        let pipeline = IngestPipeline::new(&config, SniffingClassifier::new());
        let upload = session(b"abc".to_vec(), "a.txt")
            .with_checksum_algorithm(ChecksumAlgorithm::Sha1);
        let result = pipeline.ingest(upload).unwrap();
        assert_eq!(
            result.data_files()[0].checksum.algorithm,
            ChecksumAlgorithm::Sha1
        );
    }

    #[test]
    fn test_entry_quota_is_per_item() {
        let (_temp, config) = setup();
        let config = config.with_storage_quotas_enforced(true);
        let pipeline = IngestPipeline::new(&config, SniffingClassifier::new());
        // the deflated archive fits in the remaining 500 bytes, its second
        // entry does not once the first one is charged
        let data = ZipTestBuilder::new()
            .add_file("small.txt", b"tiny")
            .add_deflated("large.txt", &[b'b'; 600])
            .add_file("last.txt", b"ok")
            .build();
        assert!(data.len() < 500);
        let upload = session(data, "bundle.zip").with_quota(QuotaLimit::new(1000, 500));

        let result = pipeline.ingest(upload).unwrap();
        let labels: Vec<_> = result.data_files().iter().map(|f| f.label.as_str()).collect();
        assert_eq!(labels, ["small.txt", "last.txt"]);
        assert_eq!(result.errors().len(), 1);
        assert_eq!(result.errors()[0].name, "large.txt");
        assert!(matches!(
            result.errors()[0].error,
            IngestError::QuotaExceeded {
                size: 600,
                remaining: 496
            }
        ));
    }

    #[test]
    fn test_empty_zip_is_opaque() {
        let (_temp, config) = setup();
        let pipeline = IngestPipeline::new(&config, SniffingClassifier::new());
        let data = ZipTestBuilder::new().build();
        let result = pipeline.ingest(session(data, "empty.zip")).unwrap();

        assert_eq!(result.data_files().len(), 1);
        assert_eq!(result.data_files()[0].label, "empty.zip");
        assert!(result.data_files()[0].source_entries.is_empty());
        assert!(!result.has_errors());
    }

    #[test]
    fn test_errors_follow_entry_order() {
        let (_temp, config) = setup();
        let config = config
            .with_max_upload_size(Some(5000))
            .with_storage_quotas_enforced(true);
        let pipeline = IngestPipeline::new(&config, SniffingClassifier::new());
        // first.txt passes the size limit but not the quota, second.csv
        // fails the size limit while expanding
        let data = ZipTestBuilder::new()
            .add_deflated("first.txt", &[b'a'; 3000])
            .add_deflated("second.csv", &[b'0'; 50_000])
            .add_file("third.txt", b"ok")
            .build();
        assert!(data.len() < 2000);
        let upload = session(data, "mixed.zip").with_quota(QuotaLimit::new(2500, 500));

        let result = pipeline.ingest(upload).unwrap();
        let labels: Vec<_> = result.data_files().iter().map(|f| f.label.as_str()).collect();
        assert_eq!(labels, ["third.txt"]);
        let names: Vec<_> = result.errors().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["first.txt", "second.csv"]);
        assert!(matches!(
            result.errors()[0].error,
            IngestError::QuotaExceeded { size: 3000, .. }
        ));
        assert!(matches!(
            result.errors()[1].error,
            IngestError::SizeLimitExceeded { limit: 5000, .. }
        ));
    }

    #[test]
    fn test_single_entry_zip_is_opaque() {
        let (_temp, config) = setup();
        let pipeline = IngestPipeline::new(&config, SniffingClassifier::new());
        let data = create_test_zip(&[("only.txt", b"one")]);
        let result = pipeline.ingest(session(data, "single.zip")).unwrap();

        assert_eq!(result.data_files().len(), 1);
        assert_eq!(result.data_files()[0].label, "single.zip");
        assert_eq!(result.data_files()[0].content_type, ContentType::ZIP);
    }
}
