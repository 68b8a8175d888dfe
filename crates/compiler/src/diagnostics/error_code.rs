/*!
 * Copyright 2025 Release Workshop Ltd
 * Licensed under the Elastic License 2.0; you may not use this file except in compliance with the Elastic License 2.0.
 * See the LICENSE file in the project root for details.
 */
//! Error codes for module diagnostics.
//!
//! Codes are organized by stage:
//! - `E1xx` - Syntax errors (parser)
//! - `E2xx` - Structural errors (structure pass)
//! - `E3xx` - Reference errors (reference pass)
//! - `E4xx` - Generation errors
//! - `E9xx` - Internal faults

use std::fmt;

/// Error codes for categorizing diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // =========================================================================
    // Syntax Errors (E1xx)
    // =========================================================================
    /// The YAML scanner rejected the document.
    E100,

    /// A source file could not be read.
    E101,

    /// An `!Include` chain includes itself.
    E102,

    /// A node has the wrong shape for its position.
    ///
    /// For example a list where a string is expected.
    E103,

    /// Unknown YAML tag.
    E104,

    /// Unknown key in a declaration or function.
    E105,

    /// A mapping repeats a key.
    E106,

    /// A required key is missing.
    E107,

    /// A function call has the wrong number or kind of arguments.
    E108,

    /// The first key of a declaration is not a keyword accepted here.
    E109,

    /// A scalar does not match the type its core-schema tag demands.
    E110,

    // =========================================================================
    // Structural Errors (E2xx)
    // =========================================================================
    /// Two declarations share a full name or logical id.
    E200,

    /// A name contains characters other than letters and digits.
    E201,

    /// The name is reserved for generated items.
    E202,

    /// The declaration is not allowed at this nesting level.
    E203,

    /// A module reference does not match `Namespace.Name[:Version][@Origin]`.
    E204,

    /// A version string cannot be parsed.
    E205,

    /// A `Scope` entry names no function.
    E206,

    /// An `Allow` entry is not `service:Action`, `Full`, `None` or `*`.
    E207,

    /// The resource type is unknown.
    E208,

    /// A resource property is not defined by its type.
    E209,

    /// A required resource property is missing.
    E210,

    /// A function lacks a required setting.
    E211,

    /// An event source has an invalid value.
    E212,

    /// A declaration has an invalid combination of keys.
    E213,

    // =========================================================================
    // Reference Errors (E3xx)
    // =========================================================================
    /// A name does not resolve to any declaration.
    E300,

    /// A name resolves to a declaration of the wrong kind.
    E301,

    /// `GetAtt` names an attribute the resource type does not have.
    E302,

    /// Variables reference each other in a cycle.
    E303,

    // =========================================================================
    // Generation Errors (E4xx)
    // =========================================================================
    /// A function is used where it is not allowed.
    E400,

    /// A mapping contains a non-literal value.
    E401,

    // =========================================================================
    // Internal Faults (E9xx)
    // =========================================================================
    /// The AST violates the parent/child hierarchy invariants.
    E900,
}

impl ErrorCode {
    /// Returns the code as a string (e.g., "E100").
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::E100 => "E100",
            ErrorCode::E101 => "E101",
            ErrorCode::E102 => "E102",
            ErrorCode::E103 => "E103",
            ErrorCode::E104 => "E104",
            ErrorCode::E105 => "E105",
            ErrorCode::E106 => "E106",
            ErrorCode::E107 => "E107",
            ErrorCode::E108 => "E108",
            ErrorCode::E109 => "E109",
            ErrorCode::E110 => "E110",
            ErrorCode::E200 => "E200",
            ErrorCode::E201 => "E201",
            ErrorCode::E202 => "E202",
            ErrorCode::E203 => "E203",
            ErrorCode::E204 => "E204",
            ErrorCode::E205 => "E205",
            ErrorCode::E206 => "E206",
            ErrorCode::E207 => "E207",
            ErrorCode::E208 => "E208",
            ErrorCode::E209 => "E209",
            ErrorCode::E210 => "E210",
            ErrorCode::E211 => "E211",
            ErrorCode::E212 => "E212",
            ErrorCode::E213 => "E213",
            ErrorCode::E300 => "E300",
            ErrorCode::E301 => "E301",
            ErrorCode::E302 => "E302",
            ErrorCode::E303 => "E303",
            ErrorCode::E400 => "E400",
            ErrorCode::E401 => "E401",
            ErrorCode::E900 => "E900",
        }
    }

    /// Returns a short description of what this error code means.
    pub fn description(&self) -> &'static str {
        match self {
            ErrorCode::E100 => "invalid YAML",
            ErrorCode::E101 => "unreadable file",
            ErrorCode::E102 => "include cycle",
            ErrorCode::E103 => "unexpected node",
            ErrorCode::E104 => "unknown tag",
            ErrorCode::E105 => "unknown key",
            ErrorCode::E106 => "duplicate key",
            ErrorCode::E107 => "missing required key",
            ErrorCode::E108 => "invalid function arguments",
            ErrorCode::E109 => "unexpected declaration keyword",
            ErrorCode::E110 => "invalid tagged literal",
            ErrorCode::E200 => "duplicate declaration",
            ErrorCode::E201 => "invalid name",
            ErrorCode::E202 => "reserved name",
            ErrorCode::E203 => "illegal nesting",
            ErrorCode::E204 => "invalid module reference",
            ErrorCode::E205 => "invalid version",
            ErrorCode::E206 => "unknown scope target",
            ErrorCode::E207 => "invalid allow entry",
            ErrorCode::E208 => "unknown resource type",
            ErrorCode::E209 => "unknown property",
            ErrorCode::E210 => "missing required property",
            ErrorCode::E211 => "missing function setting",
            ErrorCode::E212 => "invalid event source",
            ErrorCode::E213 => "invalid declaration",
            ErrorCode::E300 => "unresolved reference",
            ErrorCode::E301 => "invalid reference target",
            ErrorCode::E302 => "unknown attribute",
            ErrorCode::E303 => "cyclic reference",
            ErrorCode::E400 => "illegal function position",
            ErrorCode::E401 => "invalid mapping value",
            ErrorCode::E900 => "hierarchy violation",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
