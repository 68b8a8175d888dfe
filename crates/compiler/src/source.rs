/*!
 * Copyright 2025 Release Workshop Ltd
 * Licensed under the Elastic License 2.0; you may not use this file except in compliance with the Elastic License 2.0.
 * See the LICENSE file in the project root for details.
 */
//! Source positions and the file-reading capability used by the parser.

use std::collections::HashMap;
use std::fmt;
use std::io;
use std::sync::Arc;

/// A span in a source file. Lines and columns are 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceLocation {
    file: Arc<str>,
    start_line: u32,
    start_column: u32,
    end_line: u32,
    end_column: u32,
}

impl SourceLocation {
    pub fn new(
        file: impl Into<Arc<str>>,
        start_line: u32,
        start_column: u32,
        end_line: u32,
        end_column: u32,
    ) -> Self {
        Self {
            file: file.into(),
            start_line,
            start_column,
            end_line,
            end_column,
        }
    }

    /// A zero-width location.
    pub fn point(file: impl Into<Arc<str>>, line: u32, column: u32) -> Self {
        Self::new(file, line, column, line, column)
    }

    /// Location used for synthesized values that have no source text.
    pub fn unknown() -> Self {
        Self::new("", 0, 0, 0, 0)
    }

    pub fn is_unknown(&self) -> bool {
        self.file.is_empty() || self.start_line == 0
    }

    pub fn file(&self) -> &str {
        &self.file
    }

    pub fn start_line(&self) -> u32 {
        self.start_line
    }

    pub fn start_column(&self) -> u32 {
        self.start_column
    }

    pub fn end_line(&self) -> u32 {
        self.end_line
    }

    pub fn end_column(&self) -> u32 {
        self.end_column
    }

    pub fn same_file(&self, other: &SourceLocation) -> bool {
        self.file == other.file
    }

    /// True when this location begins strictly before `other` in the same file.
    pub fn starts_before(&self, other: &SourceLocation) -> bool {
        self.same_file(other)
            && (self.start_line, self.start_column) < (other.start_line, other.start_column)
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_unknown() {
            write!(f, "<unknown>")
        } else {
            write!(f, "{}:{}:{}", self.file, self.start_line, self.start_column)
        }
    }
}

/// Supplies raw source text keyed by path.
///
/// The compiler never touches the file system itself; the CLI provides a
/// disk-backed implementation and tests use [`MemoryFileProvider`].
pub trait FileProvider {
    fn read_file(&self, path: &str) -> io::Result<String>;
}

/// In-memory [`FileProvider`].
#[derive(Debug, Clone, Default)]
pub struct MemoryFileProvider {
    files: HashMap<String, String>,
}

impl MemoryFileProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<String>, content: impl Into<String>) {
        self.files.insert(normalize_path(&path.into()), content.into());
    }

    pub fn with_file(mut self, path: impl Into<String>, content: impl Into<String>) -> Self {
        self.insert(path, content);
        self
    }
}

impl FileProvider for MemoryFileProvider {
    fn read_file(&self, path: &str) -> io::Result<String> {
        self.files
            .get(&normalize_path(path))
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("'{path}' not found")))
    }
}

/// Resolves `target` relative to the directory of `base`.
///
/// Paths use `/` separators. Absolute targets are returned normalized.
pub fn resolve_relative(base: &str, target: &str) -> String {
    if target.starts_with('/') {
        return normalize_path(target);
    }
    match base.rsplit_once('/') {
        Some((directory, _)) if !directory.is_empty() => {
            normalize_path(&format!("{directory}/{target}"))
        }
        Some(_) => normalize_path(&format!("/{target}")),
        None => normalize_path(target),
    }
}

/// Collapses `.` and `..` segments and repeated separators.
pub fn normalize_path(path: &str) -> String {
    let absolute = path.starts_with('/');
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if matches!(segments.last(), Some(last) if *last != "..") {
                    segments.pop();
                } else if !absolute {
                    segments.push("..");
                }
            }
            other => segments.push(other),
        }
    }
    let joined = segments.join("/");
    if absolute {
        format!("/{joined}")
    } else {
        joined
    }
}
