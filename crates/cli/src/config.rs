//! Reading the optional cumulus.yaml project file

use crate::error::{CliError, CliResult};
use cumulus_compiler::{DEFAULT_REGION, DEFAULT_RESOURCE_SPEC_VERSION};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

const PROJECT_CONFIG_FILE: &str = "cumulus.yaml";

/// Settings shared by every command of a project.
///
/// All fields are optional; command-line flags take precedence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ProjectConfig {
    pub region: Option<String>,
    /// Path to a resource specification JSON document
    pub resource_spec: Option<String>,
    pub resource_spec_version: Option<String>,
    /// Output directory for compiled artifacts
    pub output: Option<String>,
    pub tool_version: Option<String>,
}

/// Get the path to the project configuration file.
///
/// Returns the path to `cumulus.yaml` in the current directory.
pub fn get_project_config_path() -> PathBuf {
    PathBuf::from(PROJECT_CONFIG_FILE)
}

/// Read the project configuration, if there is one.
///
/// # Errors
///
/// Returns an error if the file exists but can't be read or isn't valid YAML.
pub fn read_project_config() -> CliResult<Option<ProjectConfig>> {
    read_project_config_from(&get_project_config_path())
}

fn read_project_config_from(path: &Path) -> CliResult<Option<ProjectConfig>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)
        .map_err(|e| CliError::Message(format!("Failed to read {}: {e}", path.display())))?;
    if content.trim().is_empty() {
        return Ok(Some(ProjectConfig::default()));
    }
    let config = serde_yaml::from_str(&content)?;
    log::debug!("Loaded project configuration from {}", path.display());
    Ok(Some(config))
}

/// Effective settings after merging flags over the project file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub region: String,
    pub resource_spec: Option<PathBuf>,
    pub resource_spec_version: String,
    pub output: Option<PathBuf>,
    pub tool_version: Option<String>,
}

/// Flags given on the command line; `None` falls back to the project file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub region: Option<String>,
    pub resource_spec: Option<String>,
    pub output: Option<String>,
    pub tool_version: Option<String>,
}

impl Settings {
    pub fn merge(config: Option<ProjectConfig>, overrides: &Overrides) -> Self {
        let config = config.unwrap_or_default();
        Self {
            region: overrides
                .region
                .clone()
                .or(config.region)
                .unwrap_or_else(|| DEFAULT_REGION.to_string()),
            resource_spec: overrides
                .resource_spec
                .clone()
                .or(config.resource_spec)
                .map(PathBuf::from),
            resource_spec_version: config
                .resource_spec_version
                .unwrap_or_else(|| DEFAULT_RESOURCE_SPEC_VERSION.to_string()),
            output: overrides.output.clone().or(config.output).map(PathBuf::from),
            tool_version: overrides.tool_version.clone().or(config.tool_version),
        }
    }

    /// Read the project file from the current directory and merge `overrides`.
    ///
    /// # Errors
    ///
    /// Returns an error if the project file is unreadable.
    pub fn load(overrides: &Overrides) -> CliResult<Self> {
        Ok(Self::merge(read_project_config()?, overrides))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_project_file() {
        let temp_dir = TempDir::new().unwrap();
        let result = read_project_config_from(&temp_dir.path().join(PROJECT_CONFIG_FILE)).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_read_project_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(PROJECT_CONFIG_FILE);
        fs::write(
            &path,
            "region: eu-west-1\nresourceSpec: spec.json\ntoolVersion: 0.9.0\n",
        )
        .unwrap();

        let config = read_project_config_from(&path).unwrap().unwrap();
        assert_eq!(config.region.as_deref(), Some("eu-west-1"));
        assert_eq!(config.resource_spec.as_deref(), Some("spec.json"));
        assert_eq!(config.tool_version.as_deref(), Some("0.9.0"));
        assert!(config.output.is_none());
    }

    #[test]
    fn test_empty_project_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(PROJECT_CONFIG_FILE);
        fs::write(&path, "\n").unwrap();
        assert_eq!(
            read_project_config_from(&path).unwrap(),
            Some(ProjectConfig::default())
        );
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(PROJECT_CONFIG_FILE);
        fs::write(&path, "regoin: eu-west-1\n").unwrap();
        assert!(matches!(
            read_project_config_from(&path),
            Err(CliError::Config(_))
        ));
    }

    #[test]
    fn test_defaults_without_config() {
        let settings = Settings::merge(None, &Overrides::default());
        assert_eq!(settings.region, DEFAULT_REGION);
        assert_eq!(settings.resource_spec_version, DEFAULT_RESOURCE_SPEC_VERSION);
        assert!(settings.resource_spec.is_none());
        assert!(settings.output.is_none());
    }

    #[test]
    fn test_flags_override_project_file() {
        let config = ProjectConfig {
            region: Some("eu-west-1".to_string()),
            output: Some("build".to_string()),
            tool_version: Some("0.9.0".to_string()),
            ..ProjectConfig::default()
        };
        let overrides = Overrides {
            region: Some("ap-south-1".to_string()),
            ..Overrides::default()
        };

        let settings = Settings::merge(Some(config), &overrides);
        assert_eq!(settings.region, "ap-south-1");
        assert_eq!(settings.output, Some(PathBuf::from("build")));
        assert_eq!(settings.tool_version.as_deref(), Some("0.9.0"));
    }
}
