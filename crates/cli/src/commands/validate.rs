//! Validate command implementation

use crate::commands::compile::{compile_options, resource_spec_provider};
use crate::config::{Overrides, Settings};
use crate::error::{CliError, CliResult};
use crate::provider::DiskFileProvider;
use cumulus_compiler::{format_diagnostics, validate, ResourceSpecProvider};
use std::path::PathBuf;

pub struct Options {
    pub module: String,
    pub resource_spec: Option<String>,
    pub region: Option<String>,
}

pub fn run(options: &Options) -> i32 {
    match run_inner(options) {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("✗ Validation failed");
            eprintln!("  Error: {e}");
            1
        }
    }
}

fn run_inner(options: &Options) -> CliResult<()> {
    let settings = Settings::load(&Overrides {
        region: options.region.clone(),
        resource_spec: options.resource_spec.clone(),
        ..Overrides::default()
    })?;

    let module_path = PathBuf::from(&options.module);
    if !module_path.exists() {
        return Err(CliError::Message(format!(
            "Module file not found: {}",
            module_path.display()
        )));
    }

    let (provider, entry) = DiskFileProvider::for_module(&module_path);
    let spec_provider = resource_spec_provider(&settings);
    let result = validate(
        &entry,
        &provider,
        spec_provider
            .as_ref()
            .map(|provider| provider as &dyn ResourceSpecProvider),
        &compile_options(&settings),
    )?;

    let report = format_diagnostics(&result.diagnostics);
    if !report.is_empty() {
        eprintln!("{report}");
    }
    if result.has_errors() {
        let count = result
            .diagnostics
            .iter()
            .filter(|d| d.severity().is_error())
            .count();
        return Err(CliError::Message(format!(
            "{} has {count} error(s)",
            module_path.display()
        )));
    }

    println!("✓ {} is valid", module_path.display());
    Ok(())
}
