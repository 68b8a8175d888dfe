/*!
 * Copyright 2025 Release Workshop Ltd
 * Licensed under the Elastic License 2.0; you may not use this file except in compliance with the Elastic License 2.0.
 * See the LICENSE file in the project root for details.
 */
//! Diagnostics reported while compiling a module.

mod collector;
mod diagnostic;
mod error_code;
mod severity;

pub use collector::{DiagnosticCollector, DiagnosticSink, StageSink};
pub use diagnostic::Diagnostic;
pub use error_code::ErrorCode;
pub use severity::Severity;

use strsim::levenshtein;

/// The candidate closest to `name`, phrased as a suggestion.
pub fn did_you_mean<'a>(name: &str, candidates: impl IntoIterator<Item = &'a str>) -> Option<String> {
    candidates
        .into_iter()
        .map(|candidate| (levenshtein(name, candidate), candidate))
        .filter(|(distance, candidate)| {
            *distance > 0 && *distance <= name.len().max(candidate.len()) / 2
        })
        .min_by_key(|(distance, _)| *distance)
        .map(|(_, candidate)| format!("did you mean `{candidate}`?"))
}

/// Render diagnostics as a human-readable report.
pub fn format_diagnostics(diagnostics: &[Diagnostic]) -> String {
    if diagnostics.is_empty() {
        return String::new();
    }

    let failed = diagnostics.iter().any(|d| d.severity().is_error());
    let mut lines = vec![if failed {
        "✗ Compilation failed\n".to_string()
    } else {
        "⚠ Compilation reported warnings\n".to_string()
    }];

    for diagnostic in diagnostics {
        lines.push(diagnostic.to_string());
        if let Some(location) = diagnostic.location() {
            let qualifier = if diagnostic.is_exact() { "" } else { " (near)" };
            lines.push(format!("  --> {location}{qualifier}"));
        }
        if let Some(suggestion) = diagnostic.suggestion() {
            lines.push(format!("  Suggestion: {suggestion}"));
        }
        lines.push(String::new());
    }

    lines.join("\n")
}
