/*!
 * Copyright 2025 Release Workshop Ltd
 * Licensed under the Elastic License 2.0; you may not use this file except in compliance with the Elastic License 2.0.
 * See the LICENSE file in the project root for details.
 */
use thiserror::Error;

/// Top-level error type for the compiler.
///
/// User mistakes in a module are reported as diagnostics and never surface
/// here. These variants cover failing collaborators and broken compiler
/// invariants.
#[derive(Error, Debug)]
pub enum CompilerError {
    #[error("Internal compiler fault: {0}")]
    Internal(String),

    #[error("Version error: {0}")]
    Version(#[from] VersionError),

    #[error("Resource specification error: {0}")]
    ResourceSpec(#[from] ResourceSpecError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] SerializationError),
}

impl CompilerError {
    pub(crate) fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}

/// Errors raised while reading version strings and module references
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VersionError {
    #[error("Invalid version: '{0}'")]
    InvalidVersion(String),

    #[error("Invalid module reference: '{0}'")]
    InvalidModuleReference(String),
}

/// Errors raised while loading the resource-type specification document
#[derive(Error, Debug)]
pub enum ResourceSpecError {
    #[error("Specification for region '{region}' (version '{version}') is unavailable: {reason}")]
    Unavailable {
        region: String,
        version: String,
        reason: String,
    },

    #[error("Invalid JSON: {0}")]
    InvalidJson(String),

    #[error("Schema validation failed: {0}")]
    SchemaValidation(String),
}

/// Errors raised while turning generated values into JSON
#[derive(Error, Debug)]
pub enum SerializationError {
    #[error("JSON serialization failed: {0}")]
    Json(String),

    #[error("Invalid template structure: {0}")]
    InvalidTemplate(String),
}

impl From<serde_json::Error> for SerializationError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}
