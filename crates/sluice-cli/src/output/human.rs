//! Human-readable output formatter with colors and styling.

use super::formatter::OutputFormatter;
use anyhow::Result;
use console::Term;
use console::style;
use sluice_core::Checksum;
use sluice_core::IngestResult;
use sluice_core::LogicalDataFile;
use sluice_core::formats::shapefile::PlannedItem;
use sluice_core::units::format_size;
use std::path::Path;
use std::path::PathBuf;

pub struct HumanFormatter {
    verbose: bool,
    quiet: bool,
    use_colors: bool,
    term: Term,
}

impl HumanFormatter {
    pub fn new(verbose: bool, quiet: bool) -> Self {
        Self {
            verbose,
            quiet,
            use_colors: console::colors_enabled(),
            term: Term::stdout(),
        }
    }

    fn format_number(n: usize) -> String {
        let s = n.to_string();
        let mut result = String::new();
        let mut count = 0;

        for c in s.chars().rev() {
            if count == 3 {
                result.push(',');
                count = 0;
            }
            result.push(c);
            count += 1;
        }

        result.chars().rev().collect()
    }

    fn display_path(file: &LogicalDataFile) -> String {
        match &file.directory_label {
            Some(dir) => format!("{dir}/{}", file.label),
            None => file.label.clone(),
        }
    }

    fn heading(&self, mark: &str, text: &str, ok: bool) {
        if self.use_colors {
            let mark = if ok {
                style(mark).green().bold()
            } else {
                style(mark).yellow().bold()
            };
            let _ = self.term.write_line(&format!("{mark} {text}"));
        } else {
            let _ = self.term.write_line(text);
        }
    }
}

impl OutputFormatter for HumanFormatter {
    fn format_ingest_result(&self, upload: &Path, result: &IngestResult) -> Result<()> {
        if self.quiet {
            return Ok(());
        }

        let title = format!("Ingested {}", upload.display());
        if result.has_errors() {
            self.heading("⚠", &title, false);
        } else {
            self.heading("✓", &title, true);
        }

        let _ = self.term.write_line(&format!(
            "  Data files: {}",
            Self::format_number(result.data_files().len())
        ));
        let _ = self.term.write_line(&format!(
            "  Total size: {}",
            format_size(result.total_bytes())
        ));
        if self.verbose {
            let _ = self
                .term
                .write_line(&format!("  Duration: {:?}", result.duration()));
        }

        if !result.data_files().is_empty() {
            let _ = self.term.write_line("");
            for file in result.data_files() {
                let _ = self.term.write_line(&format!(
                    "  {:<40} {:>10}  {}",
                    Self::display_path(file),
                    format_size(file.size),
                    file.content_type
                ));
                if self.verbose {
                    let _ = self.term.write_line(&format!(
                        "      {}  {}",
                        file.storage_identifier, file.checksum
                    ));
                }
            }
        }

        if result.has_errors() {
            let _ = self.term.write_line("");
            if self.use_colors {
                let _ = self
                    .term
                    .write_line(&format!("{}", style("Rejected:").yellow().bold()));
            } else {
                let _ = self.term.write_line("Rejected:");
            }
            for failure in result.errors() {
                let _ = self
                    .term
                    .write_line(&format!("  - {}: {}", failure.name, failure.message()));
            }
        }

        Ok(())
    }

    fn format_checksums(&self, checksums: &[(PathBuf, Checksum)]) -> Result<()> {
        // checksums are the output itself, quiet does not hide them
        for (path, checksum) in checksums {
            let _ = self
                .term
                .write_line(&format!("{}  {}", checksum.value, path.display()));
        }
        if self.verbose
            && !self.quiet
            && let Some((_, first)) = checksums.first()
        {
            let _ = self
                .term
                .write_line(&format!("({} digests)", first.algorithm));
        }
        Ok(())
    }

    fn format_plan(&self, archive: &Path, names: &[String], plan: &[PlannedItem]) -> Result<()> {
        if self.quiet {
            return Ok(());
        }

        let groups = plan.iter().filter(|item| item.is_group()).count();
        let _ = self.term.write_line(&format!(
            "{}: {} entries -> {} data files ({} shapefile bundles)",
            archive.display(),
            Self::format_number(names.len()),
            Self::format_number(plan.len()),
            groups
        ));

        for item in plan {
            match item {
                PlannedItem::Standalone(i) => {
                    let _ = self.term.write_line(&format!("  {}", names[*i]));
                }
                PlannedItem::Group {
                    directory_label,
                    base_name,
                    members,
                } => {
                    let bundle = match directory_label {
                        Some(dir) => format!("{dir}/{base_name}.zip"),
                        None => format!("{base_name}.zip"),
                    };
                    let bundle = if self.use_colors {
                        style(bundle).cyan().bold().to_string()
                    } else {
                        bundle
                    };
                    let _ = self.term.write_line(&format!("  {bundle}"));
                    for i in members {
                        let _ = self.term.write_line(&format!("    + {}", names[*i]));
                    }
                }
            }
        }

        Ok(())
    }

    fn format_warning(&self, message: &str) {
        if self.quiet {
            return;
        }

        if self.use_colors {
            let _ = self
                .term
                .write_line(&format!("{} {message}", style("⚠").yellow().bold()));
        } else {
            let _ = self.term.write_line(&format!("WARNING: {message}"));
        }
    }
}
