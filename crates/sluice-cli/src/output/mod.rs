//! Rendering of command results.
//!
//! `--json` selects a single machine-readable document on stdout;
//! otherwise results are printed for a terminal, honouring `--verbose`
//! and `--quiet`.

mod formatter;
mod human;
mod json;

pub use formatter::OutputFormatter;

use human::HumanFormatter;
use json::JsonFormatter;

/// Picks the formatter for the global output flags.
pub fn create_formatter(json: bool, verbose: bool, quiet: bool) -> Box<dyn OutputFormatter> {
    if json {
        return Box::new(JsonFormatter);
    }
    Box::new(HumanFormatter::new(verbose, quiet))
}
