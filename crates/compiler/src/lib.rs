//! Cumulus Compiler Library
//!
//! Copyright 2025 Release Workshop Ltd
//! Licensed under the Elastic License 2.0; you may not use this file except in compliance with the Elastic License 2.0.
//! See the LICENSE file in the project root for details.
//!
//! This library compiles Cumulus module YAML files into an infrastructure
//! template and a module manifest. It works only with in-memory data: source
//! text comes from a [`FileProvider`] and the resource specification from a
//! [`ResourceSpecProvider`], so it stays WASM-compatible.
//!
//! # Example
//!
//! ```rust,no_run
//! use cumulus_compiler::{compile, CompileOptions, MemoryFileProvider};
//!
//! let provider = MemoryFileProvider::new().with_file(
//!     "module.yml",
//!     "Module: Acme.Demo\nItems:\n  - Resource: Queue\n    Type: AWS::SQS::Queue\n",
//! );
//! let result = compile("module.yml", &provider, None, &CompileOptions::default())?;
//! if let Some(output) = result.output {
//!     println!("{}", output.template.to_json_pretty()?);
//! }
//! # Ok::<(), cumulus_compiler::CompilerError>(())
//! ```

pub mod analyzer;
pub mod ast;
pub mod diagnostics;
pub mod error;
pub mod generator;
pub mod parser;
pub mod resource_spec;
pub mod schemas;
pub mod source;
pub mod version;

use chrono::{DateTime, Utc};

pub use analyzer::{analyze, SemanticModel};
pub use ast::{Ast, NodeId};
pub use diagnostics::{
    format_diagnostics, Diagnostic, DiagnosticCollector, DiagnosticSink, ErrorCode, Severity,
};
pub use error::{CompilerError, ResourceSpecError, SerializationError, VersionError};
pub use generator::{generate, Generated, GeneratorOptions, Manifest, Template};
pub use parser::parse_module;
pub use resource_spec::{ResourceSpecProvider, ResourceSpecification};
pub use source::{FileProvider, MemoryFileProvider, SourceLocation};
pub use version::{ModuleInfo, VersionInfo};

pub const DEFAULT_REGION: &str = "us-east-1";
pub const DEFAULT_RESOURCE_SPEC_VERSION: &str = "latest";

/// Settings of one compilation.
#[derive(Debug, Clone)]
pub struct CompileOptions {
    /// Region whose resource specification is requested.
    pub region: String,
    pub resource_spec_version: String,
    /// Recorded in the manifest.
    pub tool_version: Option<String>,
    /// Manifest creation time; `None` uses the current time.
    pub timestamp: Option<DateTime<Utc>>,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            region: DEFAULT_REGION.to_string(),
            resource_spec_version: DEFAULT_RESOURCE_SPEC_VERSION.to_string(),
            tool_version: None,
            timestamp: None,
        }
    }
}

/// Diagnostics of a compilation and, when it succeeded, its output.
#[derive(Debug, Clone)]
pub struct CompileResult {
    pub diagnostics: Vec<Diagnostic>,
    pub output: Option<Generated>,
}

impl CompileResult {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(|d| d.severity().is_error())
    }
}

/// Compile the module at `entry_path` into a template and manifest
///
/// User mistakes are returned as diagnostics with `output` left empty.
///
/// # Errors
///
/// Returns `ResourceSpec` if the specification cannot be loaded and
/// `Internal` if the compiler breaks one of its own invariants.
pub fn compile(
    entry_path: &str,
    provider: &dyn FileProvider,
    resource_spec: Option<&dyn ResourceSpecProvider>,
    options: &CompileOptions,
) -> Result<CompileResult, CompilerError> {
    run(entry_path, provider, resource_spec, options, true)
}

/// Parse and analyze the module at `entry_path` without generating output
///
/// # Errors
///
/// Returns `ResourceSpec` if the specification cannot be loaded.
pub fn validate(
    entry_path: &str,
    provider: &dyn FileProvider,
    resource_spec: Option<&dyn ResourceSpecProvider>,
    options: &CompileOptions,
) -> Result<CompileResult, CompilerError> {
    run(entry_path, provider, resource_spec, options, false)
}

fn run(
    entry_path: &str,
    provider: &dyn FileProvider,
    resource_spec: Option<&dyn ResourceSpecProvider>,
    options: &CompileOptions,
    emit: bool,
) -> Result<CompileResult, CompilerError> {
    let spec = resource_spec
        .map(|provider| {
            provider.read_resource_type_spec(&options.region, &options.resource_spec_version)
        })
        .transpose()?;
    if spec.is_none() {
        log::debug!("No resource specification; AWS types are not checked");
    }

    let mut collector = DiagnosticCollector::new();
    let output = match parse_module(entry_path, provider, &mut collector) {
        Some(mut ast) => match analyze(&mut ast, spec.as_ref(), &mut collector) {
            Some(model) if emit => {
                let generator_options = GeneratorOptions {
                    tool_version: options.tool_version.clone(),
                    timestamp: options.timestamp.unwrap_or_else(Utc::now),
                };
                generate(&ast, &model, spec.as_ref(), &generator_options, &mut collector)?
            }
            _ => None,
        },
        None => None,
    };
    log::debug!(
        "Compiled '{}' with {} errors",
        entry_path,
        collector.error_count()
    );
    Ok(CompileResult {
        diagnostics: collector.into_diagnostics(),
        output,
    })
}
