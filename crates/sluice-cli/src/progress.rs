//! Progress bar implementation for CLI operations.

use console::Term;
use indicatif::ProgressBar;
use indicatif::ProgressState;
use indicatif::ProgressStyle;
use sluice_core::ProgressCallback;
use sluice_core::units::format_size;
use std::fmt::Write;

/// CLI progress bar wrapper implementing `ProgressCallback`.
///
/// Counts items as they are staged and shows the bytes written so far.
/// The length is learned from the first item, so a plain upload shows
/// a bar of one. Cleans up on drop.
pub struct CliProgress {
    bar: ProgressBar,
    bytes_written: u64,
}

impl CliProgress {
    /// Creates a new CLI progress bar.
    #[must_use]
    pub fn new(message: &str) -> Self {
        let bar = ProgressBar::new(0);

        // Template: "Ingesting [████████░░░░] 42/100 files (15.2 MB, 12s)"
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{prefix} [{bar:40.cyan/blue}] {pos}/{len} files ({msg}, {eta})")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .with_key("eta", |state: &ProgressState, w: &mut dyn Write| {
                    write!(w, "{}", humanize_duration(state.eta())).unwrap_or(());
                })
                .progress_chars("█▓░"),
        );

        bar.set_prefix(message.to_string());
        bar.set_message(format_size(0));

        Self {
            bar,
            bytes_written: 0,
        }
    }

    /// Checks if we should show progress (TTY detection).
    #[must_use]
    pub fn should_show(quiet: bool, json: bool) -> bool {
        !quiet && !json && Term::stderr().is_term()
    }
}

impl Drop for CliProgress {
    fn drop(&mut self) {
        self.bar.finish_and_clear();
    }
}

impl ProgressCallback for CliProgress {
    fn on_item_start(&mut self, _name: &str, total: usize, _current: usize) {
        self.bar.set_length(total as u64);
    }

    fn on_bytes_written(&mut self, bytes: u64) {
        self.bytes_written += bytes;
        self.bar.set_message(format_size(self.bytes_written));
    }

    fn on_item_complete(&mut self, _name: &str) {
        self.bar.inc(1);
    }

    fn on_complete(&mut self) {
        self.bar.finish_and_clear();
    }
}

/// Converts duration to human-readable format.
fn humanize_duration(duration: std::time::Duration) -> String {
    let secs = duration.as_secs();
    if secs >= 3600 {
        format!("{}h{}m", secs / 3600, (secs % 3600) / 60)
    } else if secs >= 60 {
        format!("{}m{}s", secs / 60, secs % 60)
    } else {
        format!("{secs}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_humanize_duration() {
        assert_eq!(humanize_duration(std::time::Duration::from_secs(0)), "0s");
        assert_eq!(humanize_duration(std::time::Duration::from_secs(30)), "30s");
        assert_eq!(
            humanize_duration(std::time::Duration::from_secs(90)),
            "1m30s"
        );
        assert_eq!(
            humanize_duration(std::time::Duration::from_secs(3661)),
            "1h1m"
        );
    }

    #[test]
    fn test_progress_callback() {
        let mut progress = CliProgress::new("Testing");

        progress.on_item_start("roads.shp", 4, 1);
        progress.on_bytes_written(1024);
        progress.on_item_complete("roads.shp");
        progress.on_item_start("roads.shx", 4, 2);
        progress.on_bytes_written(512);
        progress.on_item_complete("roads.shx");

        assert_eq!(progress.bytes_written, 1536);
        assert_eq!(progress.bar.position(), 2);
        assert_eq!(progress.bar.length(), Some(4));
    }
}
