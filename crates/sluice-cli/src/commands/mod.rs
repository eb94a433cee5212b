//! Subcommand implementations.

pub mod checksum;
pub mod completion;
pub mod ingest;
pub mod plan;
