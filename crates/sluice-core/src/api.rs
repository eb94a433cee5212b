//! High-level entry points.

use std::fs::File;
use std::path::Path;

use crate::IngestConfig;
use crate::IngestError;
use crate::IngestPipeline;
use crate::IngestResult;
use crate::Result;
use crate::UploadSession;
use crate::formats::SniffingClassifier;
use crate::formats::shapefile::PlannedItem;
use crate::formats::shapefile::plan_groups;
use crate::formats::zip::ZipExpander;

/// Ingests a prepared upload session with the production classifier.
///
/// # Errors
///
/// Returns `InvalidConfig` for an unusable configuration and otherwise the
/// whole-upload failures described on
/// [`IngestPipeline::ingest`](crate::IngestPipeline::ingest).
///
/// # Examples
///
/// ```no_run
/// use sluice_core::{IngestConfig, UploadSession, ingest_upload};
/// use std::io::Cursor;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = IngestConfig::new("/srv/files");
/// let session = UploadSession::new(Cursor::new(b"a,b\n1,2\n".to_vec()), "table.csv");
/// let result = ingest_upload(session, &config)?;
/// println!("{} file(s)", result.data_files().len());
/// # Ok(())
/// # }
/// ```
pub fn ingest_upload<R: std::io::Read>(
    session: UploadSession<R>,
    config: &IngestConfig,
) -> Result<IngestResult> {
    config.validate()?;
    IngestPipeline::new(config, SniffingClassifier::new()).ingest(session)
}

/// Ingests a file on disk, declared under its own file name.
///
/// # Errors
///
/// Returns `IngestError::Io` if the file cannot be opened, otherwise as
/// [`ingest_upload`].
pub fn ingest_file<P: AsRef<Path>>(path: P, config: &IngestConfig) -> Result<IngestResult> {
    let path = path.as_ref();
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| IngestError::InvalidConfig {
            reason: format!("upload path has no file name: {}", path.display()),
        })?;
    let file = File::open(path)?;
    ingest_upload(UploadSession::new(file, name), config)
}

/// Shows how the entries of a zip would be grouped, without staging
/// anything.
///
/// Returns the entry names alongside the plan.
///
/// # Errors
///
/// Returns `UnreadableArchive` if the zip cannot be read.
pub fn plan_archive<P: AsRef<Path>>(
    path: P,
    config: &IngestConfig,
) -> Result<(Vec<String>, Vec<PlannedItem>)> {
    let expander = ZipExpander::open(path.as_ref())?;
    let names: Vec<String> = expander.names().map(str::to_string).collect();
    let plan = plan_groups(&names, config.shapefile_rules);
    Ok((names, plan))
}
