//! Checksum command implementation

use crate::cli::ChecksumArgs;
use crate::error::add_upload_context;
use crate::output::OutputFormatter;
use anyhow::Result;
use sluice_core::checksum::digest_file;
use sluice_core::copy::CopyBuffer;

pub fn execute(args: &ChecksumArgs, formatter: &dyn OutputFormatter) -> Result<()> {
    let mut buffer = CopyBuffer::new();
    let mut checksums = Vec::with_capacity(args.files.len());

    for path in &args.files {
        let checksum = add_upload_context(digest_file(path, args.algorithm, &mut buffer), path)?;
        checksums.push((path.clone(), checksum));
    }

    formatter.format_checksums(&checksums)
}
