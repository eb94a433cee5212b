//! `sluice completion`: print a completion script for a shell.

use crate::cli::Cli;
use clap::CommandFactory;
use clap_complete::Shell;
use std::io;
use std::io::Write;

const BIN_NAME: &str = "sluice";

/// Writes the completion script for `shell` to stdout.
pub fn execute(shell: Shell) {
    write_completions(shell, &mut io::stdout());
}

fn write_completions(shell: Shell, out: &mut dyn Write) {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, BIN_NAME, out);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_shell_gets_a_script() {
        for shell in [
            Shell::Bash,
            Shell::Zsh,
            Shell::Fish,
            Shell::PowerShell,
            Shell::Elvish,
        ] {
            let mut script = Vec::new();
            write_completions(shell, &mut script);
            assert!(!script.is_empty(), "no completions for {shell:?}");
        }
    }

    #[test]
    fn test_bash_script_lists_subcommands() {
        let mut script = Vec::new();
        write_completions(Shell::Bash, &mut script);
        let script = String::from_utf8_lossy(&script);
        for subcommand in ["ingest", "checksum", "plan"] {
            assert!(script.contains(subcommand), "missing {subcommand}");
        }
    }
}
