//! Compile command implementation

use crate::config::{Overrides, Settings};
use crate::error::{CliError, CliResult};
use crate::provider::{DiskFileProvider, FileResourceSpecProvider};
use chrono::{DateTime, Utc};
use cumulus_compiler::{compile, format_diagnostics, CompileOptions, ResourceSpecProvider};
use std::fs;
use std::path::{Path, PathBuf};

pub const TEMPLATE_FILE: &str = "cloudformation.json";
pub const MANIFEST_FILE: &str = "manifest.json";

pub struct Options {
    pub module: String,
    pub output: Option<String>,
    pub resource_spec: Option<String>,
    pub region: Option<String>,
    pub tool_version: Option<String>,
    /// Manifest date as RFC 3339, for reproducible builds
    pub timestamp: Option<String>,
}

/// Output directory: the `--output` flag, then the project file, then
/// `.cumulus` next to the module.
fn determine_output_dir(settings: &Settings, module_path: &Path) -> PathBuf {
    settings.output.clone().unwrap_or_else(|| {
        module_path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(".cumulus")
    })
}

pub fn compile_options(settings: &Settings) -> CompileOptions {
    CompileOptions {
        region: settings.region.clone(),
        resource_spec_version: settings.resource_spec_version.clone(),
        tool_version: Some(
            settings
                .tool_version
                .clone()
                .unwrap_or_else(|| env!("CUMULUS_VERSION").to_string()),
        ),
        timestamp: None,
    }
}

fn parse_timestamp(text: &str) -> CliResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|timestamp| timestamp.with_timezone(&Utc))
        .map_err(|e| CliError::Message(format!("Invalid timestamp '{text}': {e}")))
}

pub fn resource_spec_provider(settings: &Settings) -> Option<FileResourceSpecProvider> {
    settings
        .resource_spec
        .as_ref()
        .map(FileResourceSpecProvider::new)
}

pub fn run(options: &Options) -> i32 {
    match run_inner(options) {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("✗ Compilation failed");
            eprintln!("  Error: {e}");
            1
        }
    }
}

fn run_inner(options: &Options) -> CliResult<()> {
    let settings = Settings::load(&Overrides {
        region: options.region.clone(),
        resource_spec: options.resource_spec.clone(),
        output: options.output.clone(),
        tool_version: options.tool_version.clone(),
    })?;

    let module_path = PathBuf::from(&options.module);
    if !module_path.exists() {
        return Err(CliError::Message(format!(
            "Module file not found: {}",
            module_path.display()
        )));
    }

    let mut compile_options = compile_options(&settings);
    compile_options.timestamp = options
        .timestamp
        .as_deref()
        .map(parse_timestamp)
        .transpose()?;

    let (provider, entry) = DiskFileProvider::for_module(&module_path);
    let spec_provider = resource_spec_provider(&settings);
    let result = compile(
        &entry,
        &provider,
        spec_provider
            .as_ref()
            .map(|provider| provider as &dyn ResourceSpecProvider),
        &compile_options,
    )?;

    let report = format_diagnostics(&result.diagnostics);
    if !report.is_empty() {
        eprintln!("{report}");
    }

    let output = match result.output {
        Some(output) if !result.has_errors() => output,
        _ => {
            return Err(CliError::Message(format!(
                "{} has errors",
                module_path.display()
            )))
        }
    };

    let output_dir = determine_output_dir(&settings, &module_path);
    if !output_dir.exists() {
        fs::create_dir_all(&output_dir)?;
    }

    let template_path = output_dir.join(TEMPLATE_FILE);
    fs::write(&template_path, output.template.to_json_pretty()?)?;
    let manifest_path = output_dir.join(MANIFEST_FILE);
    fs::write(&manifest_path, output.manifest.to_json_pretty()?)?;

    println!(
        "✓ Compiled {} to {}",
        output.manifest.module,
        output_dir.display()
    );
    log::info!("Template hash {}", output.manifest.hash);
    Ok(())
}
