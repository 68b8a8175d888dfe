//! Version command implementation
//!
//! Exposes the version ordering and compatibility rules used when modules,
//! deployment tiers and the tool are matched against each other.

use crate::error::{CliError, CliResult};
use cumulus_compiler::version::{
    is_module_core_version_compatible_with_tier_version,
    is_module_core_version_compatible_with_tool_version,
    is_tier_version_compatible_with_tool_version, select_best_version,
};
use cumulus_compiler::{ModuleInfo, VersionInfo};
use std::cmp::Ordering;

pub enum Action {
    Compare {
        left: String,
        right: String,
        strict: bool,
    },
    Check {
        tool: Option<String>,
        tier: Option<String>,
        core: Option<String>,
    },
    Select {
        required: Option<String>,
        candidates: Vec<String>,
        pre_release: bool,
    },
    Module {
        reference: String,
    },
}

pub struct Options {
    pub action: Action,
}

pub fn run(options: &Options) -> i32 {
    match run_inner(options) {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("✗ Version check failed");
            eprintln!("  Error: {e}");
            1
        }
    }
}

fn run_inner(options: &Options) -> CliResult<()> {
    match &options.action {
        Action::Compare {
            left,
            right,
            strict,
        } => {
            println!("{}", compare(left, right, *strict)?);
            Ok(())
        }
        Action::Check { tool, tier, core } => {
            check(tool.as_deref(), tier.as_deref(), core.as_deref())?;
            Ok(())
        }
        Action::Select {
            required,
            candidates,
            pre_release,
        } => {
            println!(
                "{}",
                select(required.as_deref(), candidates, *pre_release)?
            );
            Ok(())
        }
        Action::Module { reference } => {
            for line in describe_module(reference)? {
                println!("{line}");
            }
            Ok(())
        }
    }
}

fn compare(left: &str, right: &str, strict: bool) -> CliResult<String> {
    let left_version = VersionInfo::parse(left)?;
    let right_version = VersionInfo::parse(right)?;
    Ok(match left_version.compare_to_version(&right_version, strict) {
        Some(Ordering::Less) => format!("{left_version} < {right_version}"),
        Some(Ordering::Equal) => format!("{left_version} = {right_version}"),
        Some(Ordering::Greater) => format!("{left_version} > {right_version}"),
        None => format!("{left_version} and {right_version} are incomparable"),
    })
}

/// Check every pair of the given versions; fails on the first incompatible pair.
fn check(tool: Option<&str>, tier: Option<&str>, core: Option<&str>) -> CliResult<Vec<String>> {
    let tool = tool.map(VersionInfo::parse).transpose()?;
    let tier = tier.map(VersionInfo::parse).transpose()?;
    let core = core.map(VersionInfo::parse).transpose()?;

    let mut checks = Vec::new();
    if let (Some(tier), Some(tool)) = (&tier, &tool) {
        checks.push((
            format!("tier {tier} with tool {tool}"),
            is_tier_version_compatible_with_tool_version(tier, tool),
        ));
    }
    if let (Some(core), Some(tool)) = (&core, &tool) {
        checks.push((
            format!("module core {core} with tool {tool}"),
            is_module_core_version_compatible_with_tool_version(core, tool),
        ));
    }
    if let (Some(core), Some(tier)) = (&core, &tier) {
        checks.push((
            format!("module core {core} with tier {tier}"),
            is_module_core_version_compatible_with_tier_version(core, tier),
        ));
    }
    if checks.is_empty() {
        return Err(CliError::Message(
            "At least two of --tool, --tier and --core must be provided".to_string(),
        ));
    }

    let mut compatible = Vec::new();
    for (description, ok) in checks {
        if !ok {
            return Err(CliError::Message(format!("{description} is incompatible")));
        }
        println!("✓ {description} is compatible");
        compatible.push(description);
    }
    Ok(compatible)
}

fn select(required: Option<&str>, candidates: &[String], pre_release: bool) -> CliResult<String> {
    let required = required.map(VersionInfo::parse).transpose()?;
    let candidates = candidates
        .iter()
        .map(|candidate| VersionInfo::parse(candidate))
        .collect::<Result<Vec<_>, _>>()?;
    select_best_version(required.as_ref(), &candidates, pre_release)
        .map(ToString::to_string)
        .ok_or_else(|| {
            CliError::Message(match &required {
                Some(required) => format!("No candidate satisfies version {required}"),
                None => "No suitable candidate version".to_string(),
            })
        })
}

fn describe_module(reference: &str) -> CliResult<Vec<String>> {
    let module = ModuleInfo::parse(reference)?;
    let mut lines = vec![
        format!("Module:    {}", module.full_name()),
        format!(
            "Version:   {}",
            module
                .version()
                .map_or_else(|| "(any)".to_string(), ToString::to_string)
        ),
    ];
    if let Some(origin) = module.origin() {
        lines.push(format!("Origin:    {origin}"));
    }
    if let Some(path) = module.template_path() {
        lines.push(format!("Template:  {path}"));
    }
    Ok(lines)
}
