//! Ingest command implementation.

use crate::cli::IngestArgs;
use crate::config;
use crate::error::add_upload_context;
use crate::output::OutputFormatter;
use crate::progress::CliProgress;
use anyhow::Context;
use anyhow::Result;
use anyhow::bail;
use sluice_core::DatasetVersionRef;
use sluice_core::IngestPipeline;
use sluice_core::SniffingClassifier;
use sluice_core::UploadSession;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

pub fn execute(
    args: &IngestArgs,
    config_file: Option<&Path>,
    formatter: &dyn OutputFormatter,
    show_progress: bool,
) -> Result<()> {
    let config = config::resolve(config_file, &args.settings)?;
    add_upload_context(config.validate(), &args.file)?;

    let name = match &args.name {
        Some(name) => name.clone(),
        None => args
            .file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .context("upload path has no file name; pass --name")?,
    };
    let file = File::open(&args.file)
        .with_context(|| format!("failed to open '{}'", args.file.display()))?;

    let mut version = DatasetVersionRef::new(&args.dataset_version);
    if let Some(store) = &args.store {
        version = version.with_storage_driver(store);
    }
    let mut session = UploadSession::new(BufReader::new(file), name).with_dataset_version(version);
    if let Some(content_type) = &args.content_type {
        session = session.with_content_type(content_type);
    }
    if let Some(quota) = args.quota {
        session = session.with_quota(quota);
    }

    let pipeline = IngestPipeline::new(&config, SniffingClassifier::new());
    let result = if show_progress {
        let mut progress = CliProgress::new("Ingesting");
        pipeline.ingest_with_progress(session, &mut progress)
    } else {
        pipeline.ingest(session)
    };
    let result = add_upload_context(result, &args.file)?;

    formatter.format_ingest_result(&args.file, &result)?;

    if result.data_files().is_empty() {
        formatter.format_warning("No data files were produced");
    }
    if args.strict && result.has_errors() {
        bail!(
            "{} item(s) of '{}' were rejected",
            result.errors().len(),
            args.file.display()
        );
    }

    Ok(())
}
