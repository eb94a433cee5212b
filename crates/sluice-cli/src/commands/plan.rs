//! Plan command implementation

use crate::cli::PlanArgs;
use crate::config;
use crate::error::add_upload_context;
use crate::output::OutputFormatter;
use anyhow::Result;
use sluice_core::plan_archive;
use std::path::Path;

pub fn execute(
    args: &PlanArgs,
    config_file: Option<&Path>,
    formatter: &dyn OutputFormatter,
) -> Result<()> {
    let config = config::resolve(config_file, &args.settings)?;

    // Nothing is staged, so the files directory is not needed here.
    let (names, plan) = add_upload_context(plan_archive(&args.archive, &config), &args.archive)?;

    formatter.format_plan(&args.archive, &names, &plan)
}
