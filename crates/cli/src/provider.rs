//! Disk-backed providers for the compiler

use cumulus_compiler::{
    FileProvider, ResourceSpecError, ResourceSpecProvider, ResourceSpecification,
};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Reads module sources relative to a root directory.
pub struct DiskFileProvider {
    root: PathBuf,
}

impl DiskFileProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Split a module path into a provider rooted at its directory and the
    /// entry path the compiler should open.
    pub fn for_module(module: &Path) -> (Self, String) {
        let root = module
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
        let entry = module
            .file_name()
            .map_or_else(String::new, |name| name.to_string_lossy().into_owned());
        (Self::new(root), entry)
    }
}

impl FileProvider for DiskFileProvider {
    fn read_file(&self, path: &str) -> io::Result<String> {
        let path = Path::new(path);
        let full_path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        };
        log::trace!("Reading {}", full_path.display());
        fs::read_to_string(full_path)
    }
}

/// Loads the resource specification from a JSON file.
///
/// The same document serves every region and version.
pub struct FileResourceSpecProvider {
    path: PathBuf,
}

impl FileResourceSpecProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ResourceSpecProvider for FileResourceSpecProvider {
    fn read_resource_type_spec(
        &self,
        region: &str,
        version: &str,
    ) -> Result<ResourceSpecification, ResourceSpecError> {
        let text = fs::read_to_string(&self.path).map_err(|e| ResourceSpecError::Unavailable {
            region: region.to_string(),
            version: version.to_string(),
            reason: format!("{}: {e}", self.path.display()),
        })?;
        log::debug!(
            "Loaded resource specification from {} for {region}",
            self.path.display()
        );
        ResourceSpecification::from_json(&text)
    }
}
