//! CLI argument parsing using clap.

use clap::Parser;
use clap::Subcommand;
use clap_complete::Shell;
use sluice_core::ChecksumAlgorithm;
use sluice_core::security::QuotaLimit;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sluice")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Output results in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Read settings from a TOML file (flags take precedence)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Ingest an upload into the files directory
    Ingest(IngestArgs),
    /// Compute fixity checksums
    Checksum(ChecksumArgs),
    /// Show how a zip would be split into data files
    Plan(PlanArgs),
    /// Generate shell completions
    Completion(CompletionArgs),
}

/// Settings that override the configuration file.
#[derive(clap::Args, Default)]
pub struct ConfigArgs {
    /// Files directory; uploads are staged under its `temp` folder
    #[arg(long, value_name = "DIR")]
    pub files_dir: Option<PathBuf>,

    /// Maximum upload size (accepts K, M, G, T suffixes)
    #[arg(long, value_parser = parse_byte_size)]
    pub max_size: Option<u64>,

    /// Maximum number of files expanded from one zip (0 = unlimited)
    #[arg(long, value_name = "COUNT")]
    pub zip_limit: Option<usize>,

    /// Fixity algorithm (MD5, SHA-1, SHA-256, SHA-512)
    #[arg(long, value_name = "ALGORITHM")]
    pub checksum: Option<ChecksumAlgorithm>,

    /// Enforce storage quotas
    #[arg(long)]
    pub enforce_quota: bool,

    /// Bundle shapefiles even without a .prj companion
    #[arg(long)]
    pub allow_missing_prj: bool,
}

#[derive(clap::Args)]
pub struct IngestArgs {
    /// Path to the uploaded file
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Declared file name (default: the file's own name)
    #[arg(long)]
    pub name: Option<String>,

    /// Declared content type
    #[arg(long, value_name = "MIME")]
    pub content_type: Option<String>,

    /// Target dataset version identifier
    #[arg(long, value_name = "ID", default_value = "draft")]
    pub dataset_version: String,

    /// Storage driver of the target dataset
    #[arg(long, value_name = "STORE")]
    pub store: Option<String>,

    /// Session quota as ALLOCATED:USED (sizes accept K, M, G, T suffixes)
    #[arg(long, value_parser = parse_quota)]
    pub quota: Option<QuotaLimit>,

    /// Fail if any item of the upload was rejected
    #[arg(long)]
    pub strict: bool,

    #[command(flatten)]
    pub settings: ConfigArgs,
}

#[derive(clap::Args)]
pub struct ChecksumArgs {
    /// Files to hash
    #[arg(value_name = "FILE", required = true)]
    pub files: Vec<PathBuf>,

    /// Digest algorithm
    #[arg(short, long, default_value = "MD5")]
    pub algorithm: ChecksumAlgorithm,
}

#[derive(clap::Args)]
pub struct PlanArgs {
    /// Path to the zip archive
    #[arg(value_name = "ARCHIVE")]
    pub archive: PathBuf,

    #[command(flatten)]
    pub settings: ConfigArgs,
}

#[derive(clap::Args)]
pub struct CompletionArgs {
    /// Target shell
    #[arg(value_enum)]
    pub shell: Shell,
}

/// Parse byte size with optional suffix (K, M, G, T)
#[allow(clippy::option_if_let_else)]
pub fn parse_byte_size(s: &str) -> Result<u64, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty byte size".to_string());
    }

    let (num_str, multiplier) = if let Some(stripped) = s.strip_suffix('T') {
        (stripped, 1024_u64.pow(4))
    } else if let Some(stripped) = s.strip_suffix('G') {
        (stripped, 1024_u64.pow(3))
    } else if let Some(stripped) = s.strip_suffix('M') {
        (stripped, 1024_u64.pow(2))
    } else if let Some(stripped) = s.strip_suffix('K') {
        (stripped, 1024)
    } else {
        (s, 1)
    };

    num_str
        .parse::<u64>()
        .map_err(|_| format!("invalid byte size: {s}"))
        .and_then(|n| {
            n.checked_mul(multiplier)
                .ok_or_else(|| format!("byte size overflow: {s}"))
        })
}

/// Parse `ALLOCATED:USED`
fn parse_quota(s: &str) -> Result<QuotaLimit, String> {
    let (allocated, used) = s
        .split_once(':')
        .ok_or_else(|| format!("expected ALLOCATED:USED, got: {s}"))?;
    Ok(QuotaLimit::new(
        parse_byte_size(allocated)?,
        parse_byte_size(used)?,
    ))
}
