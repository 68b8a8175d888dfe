//! Test helpers for unit tests
//!
//! For integration tests, see `tests/integration_test_helpers.rs`.

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Changes the current directory and restores it when dropped, even if the
/// test panics. Tests using it must be `#[serial]`.
pub struct DirGuard {
    original_dir: PathBuf,
}

impl DirGuard {
    /// # Errors
    ///
    /// Returns an error if the directory can't be created or entered.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, std::io::Error> {
        let path = path.as_ref();
        fs::create_dir_all(path)?;
        let original_dir = std::env::current_dir()?;
        std::env::set_current_dir(path)?;
        Ok(DirGuard { original_dir })
    }
}

impl Drop for DirGuard {
    fn drop(&mut self) {
        let _ = std::env::set_current_dir(&self.original_dir);
    }
}

/// A temporary project directory that is also the current directory.
pub struct ProjectDir {
    // Field order matters: the guard must leave the directory before it is removed.
    _guard: DirGuard,
    temp_dir: TempDir,
}

impl ProjectDir {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let guard = DirGuard::new(temp_dir.path()).unwrap();
        Self {
            _guard: guard,
            temp_dir,
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Write `content` to `relative_path`, creating parent directories.
    pub fn write(&self, relative_path: &str, content: &str) {
        let path = self.path().join(relative_path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    pub fn exists(&self, relative_path: &str) -> bool {
        self.path().join(relative_path).exists()
    }
}
