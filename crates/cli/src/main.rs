//! Cumulus CLI
//!
//! Copyright 2025 Release Workshop Ltd
//! Licensed under the Elastic License 2.0; you may not use this file except in compliance with the Elastic License 2.0.
//! See the LICENSE file in the project root for details.

mod commands;
mod config;
mod error;
mod provider;
#[cfg(test)]
mod test_helpers;

use clap::{ArgAction, CommandFactory, Parser, Subcommand};
use commands::{compile, completion, validate, version};

/// Cumulus CLI - Compile and validate infrastructure modules
#[derive(Parser)]
#[command(name = "cumulus")]
#[command(about = "Cumulus CLI - Compile and validate infrastructure modules", long_about = None)]
#[command(version = env!("CUMULUS_VERSION"))]
struct Cli {
    /// Increase logging verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a module into a template and manifest
    Compile {
        /// Path to the module file
        module: String,
        /// Output directory (defaults to .cumulus next to the module)
        #[arg(long)]
        output: Option<String>,
        /// Path to a resource specification JSON file
        #[arg(long)]
        resource_spec: Option<String>,
        /// Region whose resource specification is used
        #[arg(long)]
        region: Option<String>,
        /// Tool version recorded in the manifest
        #[arg(long)]
        tool_version: Option<String>,
        /// Manifest date (RFC 3339) instead of the current time
        #[arg(long)]
        timestamp: Option<String>,
    },
    /// Parse and analyze a module without writing output
    Validate {
        /// Path to the module file
        module: String,
        /// Path to a resource specification JSON file
        #[arg(long)]
        resource_spec: Option<String>,
        /// Region whose resource specification is used
        #[arg(long)]
        region: Option<String>,
    },
    /// Compare versions and check their compatibility
    Version {
        #[command(subcommand)]
        action: VersionAction,
    },
    /// Generate shell completion scripts
    Completion {
        /// Shell name (bash, zsh, fish)
        shell: String,
    },
}

#[derive(Subcommand)]
enum VersionAction {
    /// Compare two versions
    Compare {
        left: String,
        right: String,
        /// Treat versions with different suffixes as incomparable
        #[arg(long)]
        strict: bool,
    },
    /// Check tool, tier and module core versions against each other
    Check {
        #[arg(long)]
        tool: Option<String>,
        #[arg(long)]
        tier: Option<String>,
        #[arg(long)]
        core: Option<String>,
    },
    /// Select the newest candidate satisfying a required version
    Select {
        /// Candidate versions
        #[arg(required = true)]
        candidates: Vec<String>,
        #[arg(long)]
        required: Option<String>,
        /// Allow pre-release candidates
        #[arg(long)]
        pre_release: bool,
    },
    /// Show the parts of a module reference (Namespace.Name[:Version][@origin])
    Module { reference: String },
}

/// Get the CLI command structure (used for shell completion)
pub fn get_cli_command() -> clap::Command {
    Cli::command()
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::from_env(env_logger::Env::default())
        .filter_level(level)
        .format_timestamp(None)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let exit_code = match cli.command {
        Commands::Compile {
            module,
            output,
            resource_spec,
            region,
            tool_version,
            timestamp,
        } => {
            let opts = compile::Options {
                module,
                output,
                resource_spec,
                region,
                tool_version,
                timestamp,
            };
            compile::run(&opts)
        }
        Commands::Validate {
            module,
            resource_spec,
            region,
        } => {
            let opts = validate::Options {
                module,
                resource_spec,
                region,
            };
            validate::run(&opts)
        }
        Commands::Version { action } => {
            let action = match action {
                VersionAction::Compare {
                    left,
                    right,
                    strict,
                } => version::Action::Compare {
                    left,
                    right,
                    strict,
                },
                VersionAction::Check { tool, tier, core } => {
                    version::Action::Check { tool, tier, core }
                }
                VersionAction::Select {
                    candidates,
                    required,
                    pre_release,
                } => version::Action::Select {
                    required,
                    candidates,
                    pre_release,
                },
                VersionAction::Module { reference } => version::Action::Module { reference },
            };
            version::run(&version::Options { action })
        }
        Commands::Completion { shell } => completion::run(&completion::Options { shell }),
    };

    std::process::exit(exit_code);
}
