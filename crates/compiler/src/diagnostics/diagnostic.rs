/*!
 * Copyright 2025 Release Workshop Ltd
 * Licensed under the Elastic License 2.0; you may not use this file except in compliance with the Elastic License 2.0.
 * See the LICENSE file in the project root for details.
 */
//! The core diagnostic type.

use std::fmt;

use crate::diagnostics::{ErrorCode, Severity};
use crate::source::SourceLocation;

/// A single message about a module, tied to a source location when one is known.
///
/// `exact` is false when the location only points near the problem, for
/// example a `${Name}` token inside a `Sub` format string that is reported
/// at the whole string.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    severity: Severity,
    code: ErrorCode,
    message: String,
    location: Option<SourceLocation>,
    exact: bool,
    suggestion: Option<String>,
}

impl Diagnostic {
    pub fn info(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::new(Severity::Info, code, message)
    }

    pub fn warning(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, code, message)
    }

    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, code, message)
    }

    pub fn fatal(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::new(Severity::Fatal, code, message)
    }

    /// Attach the exact location of the problem.
    pub fn at(mut self, location: &SourceLocation) -> Self {
        self.location = Some(location.clone());
        self.exact = true;
        self
    }

    /// Attach a location close to the problem.
    pub fn near(mut self, location: &SourceLocation) -> Self {
        self.location = Some(location.clone());
        self.exact = false;
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn location(&self) -> Option<&SourceLocation> {
        self.location.as_ref()
    }

    pub fn is_exact(&self) -> bool {
        self.exact
    }

    pub fn suggestion(&self) -> Option<&str> {
        self.suggestion.as_deref()
    }

    fn new(severity: Severity, code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            severity,
            code,
            message: message.into(),
            location: None,
            exact: false,
            suggestion: None,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]: {}", self.severity, self.code, self.message)
    }
}
