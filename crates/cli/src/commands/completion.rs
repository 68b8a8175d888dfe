//! Shell completion command implementation

use crate::error::{CliError, CliResult};
use crate::get_cli_command;
use clap_complete::{generate, Shell};
use std::io;

const SHELLS: &[(&str, Shell)] = &[("bash", Shell::Bash), ("zsh", Shell::Zsh), ("fish", Shell::Fish)];

pub struct Options {
    pub shell: String,
}

/// Writes the completion script for `cumulus` to stdout
pub fn run(options: &Options) -> i32 {
    match run_inner(options) {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("✗ Completion generation failed");
            eprintln!("  Error: {e}");
            1
        }
    }
}

fn run_inner(options: &Options) -> CliResult<()> {
    let shell = parse_shell(&options.shell)?;
    let mut cmd = get_cli_command();
    generate(shell, &mut cmd, "cumulus", &mut io::stdout());
    Ok(())
}

fn parse_shell(name: &str) -> CliResult<Shell> {
    let supported = SHELLS
        .iter()
        .map(|(shell, _)| *shell)
        .collect::<Vec<_>>()
        .join(", ");
    if name.is_empty() {
        return Err(CliError::Message(format!(
            "Shell name is required. Supported shells: {supported}"
        )));
    }

    let lowered = name.to_lowercase();
    if let Some((_, shell)) = SHELLS.iter().find(|(candidate, _)| *candidate == lowered) {
        return Ok(*shell);
    }
    let hint = suggest_shell(&lowered)
        .map(|shell| format!(" Did you mean '{shell}'?"))
        .unwrap_or_default();
    Err(CliError::Message(format!(
        "Unsupported shell: {name}.{hint} Supported shells: {supported}"
    )))
}

fn suggest_shell(name: &str) -> Option<&'static str> {
    SHELLS
        .iter()
        .map(|(shell, _)| (*shell, strsim::levenshtein(name, shell)))
        .filter(|(_, distance)| *distance <= 2)
        .min_by_key(|(_, distance)| *distance)
        .map(|(shell, _)| shell)
}
