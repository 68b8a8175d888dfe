/*!
 * Copyright 2025 Release Workshop Ltd
 * Licensed under the Elastic License 2.0; you may not use this file except in compliance with the Elastic License 2.0.
 * See the LICENSE file in the project root for details.
 */
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::VersionError;
use crate::version::VersionInfo;

static MODULE_INFO_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<namespace>\w+)\.(?P<name>[\w\.]+)(:(?P<version>\*|[\w\.\-]+))?(@(?P<origin>[\w\-\.%]+))?$",
    )
    .expect("module reference pattern is valid")
});

/// A module reference: `Namespace.Name[:Version|*][@Origin]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModuleInfo {
    namespace: String,
    name: String,
    version: Option<VersionInfo>,
    origin: Option<String>,
}

impl ModuleInfo {
    pub fn new(
        namespace: impl Into<String>,
        name: impl Into<String>,
        version: Option<VersionInfo>,
        origin: Option<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            version,
            origin,
        }
    }

    pub fn parse(text: &str) -> Result<Self, VersionError> {
        Self::try_parse(text).ok_or_else(|| VersionError::InvalidModuleReference(text.to_string()))
    }

    pub fn try_parse(text: &str) -> Option<Self> {
        let captures = MODULE_INFO_PATTERN.captures(text)?;
        let version = match captures.name("version").map(|m| m.as_str()) {
            None | Some("*") => None,
            Some(version) => Some(VersionInfo::try_parse(version)?),
        };
        Some(Self {
            namespace: captures["namespace"].to_string(),
            name: captures["name"].to_string(),
            version,
            origin: captures.name("origin").map(|m| m.as_str().to_string()),
        })
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `None` means any version.
    pub fn version(&self) -> Option<&VersionInfo> {
        self.version.as_ref()
    }

    /// Bucket the module is published to, when pinned.
    pub fn origin(&self) -> Option<&str> {
        self.origin.as_deref()
    }

    pub fn full_name(&self) -> String {
        format!("{}.{}", self.namespace, self.name)
    }

    pub fn with_version(&self, version: Option<VersionInfo>) -> Self {
        Self {
            version,
            ..self.clone()
        }
    }

    pub fn with_origin(&self, origin: Option<String>) -> Self {
        Self {
            origin,
            ..self.clone()
        }
    }

    /// Object key of the module's published template, relative to its
    /// origin. Requires a pinned version.
    pub fn template_path(&self) -> Option<String> {
        let version = self.version.as_ref()?;
        Some(format!(
            "{}/{}/.templates/{}/cloudformation.json",
            self.namespace, self.name, version
        ))
    }
}

impl fmt::Display for ModuleInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.namespace, self.name)?;
        if let Some(version) = &self.version {
            write!(f, ":{version}")?;
        }
        if let Some(origin) = &self.origin {
            write!(f, "@{origin}")?;
        }
        Ok(())
    }
}

impl FromStr for ModuleInfo {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_reference() {
        let info = ModuleInfo::parse("Acme.Widgets:1.0@my-bucket").unwrap();
        assert_eq!(info.namespace(), "Acme");
        assert_eq!(info.name(), "Widgets");
        assert_eq!(info.version().map(ToString::to_string), Some("1.0".to_string()));
        assert_eq!(info.origin(), Some("my-bucket"));
        assert_eq!(info.full_name(), "Acme.Widgets");
        assert_eq!(info.to_string(), "Acme.Widgets:1.0@my-bucket");
    }

    #[test]
    fn test_round_trip() {
        for text in [
            "Acme.Widgets",
            "Acme.Widgets:1.0",
            "Acme.Widgets@origin",
            "Acme.Widgets.Extra:0.4.2-rc1@some.bucket",
        ] {
            assert_eq!(ModuleInfo::parse(text).unwrap().to_string(), text);
        }
    }

    #[test]
    fn test_star_means_any_version() {
        let info = ModuleInfo::parse("Acme.Widgets:*").unwrap();
        assert!(info.version().is_none());
        assert_eq!(info.to_string(), "Acme.Widgets");
    }

    #[test]
    fn test_reject_invalid() {
        for text in ["Acme", "Acme.", ".Widgets", "Acme.Widgets:", "Acme.Widgets:1.2.3.4", "Acme.Widgets@", "Acme Widgets"] {
            assert!(ModuleInfo::try_parse(text).is_none(), "{text} should be invalid");
        }
    }

    #[test]
    fn test_template_path() {
        let info = ModuleInfo::parse("Acme.Widgets:1.2").unwrap();
        assert_eq!(
            info.template_path().as_deref(),
            Some("Acme/Widgets/.templates/1.2/cloudformation.json")
        );
        assert!(info.with_version(None).template_path().is_none());
    }
}
