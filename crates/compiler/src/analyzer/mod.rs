/*!
 * Copyright 2025 Release Workshop Ltd
 * Licensed under the Elastic License 2.0; you may not use this file except in compliance with the Elastic License 2.0.
 * See the LICENSE file in the project root for details.
 */
//! Semantic analysis.
//!
//! Runs three passes over a parsed module: parent assignment, structure and
//! references. A pass that reports an error stops the pipeline.

mod hierarchy;
mod model;
mod references;
mod structure;

#[cfg(test)]
mod tests;

pub use hierarchy::assign_parents;
pub use model::{Grant, Scope, SemanticModel, Symbol};
pub use references::{is_pseudo_parameter, resolve_references};
pub use structure::{
    analyze_structure, expand_allow, is_reserved_name, language_defaults, logical_id,
    DEFAULT_MODULE_VERSION, RESERVED_NAMES,
};

use crate::ast::Ast;
use crate::diagnostics::{DiagnosticSink, StageSink};
use crate::resource_spec::ResourceSpecification;

/// Analyzes a parsed module.
///
/// Returns the semantic model when every pass completed without errors.
pub fn analyze(
    ast: &mut Ast,
    resource_spec: Option<&ResourceSpecification>,
    sink: &mut dyn DiagnosticSink,
) -> Option<SemanticModel> {
    {
        let mut stage = StageSink::new(sink);
        assign_parents(ast, &mut stage);
        if stage.has_errors() {
            log::debug!("Hierarchy pass reported {} errors", stage.error_count());
            return None;
        }
    }

    let mut model = {
        let mut stage = StageSink::new(sink);
        let model = analyze_structure(ast, resource_spec, &mut stage)?;
        if stage.has_errors() {
            log::debug!("Structure pass reported {} errors", stage.error_count());
            return None;
        }
        model
    };

    let mut stage = StageSink::new(sink);
    resolve_references(ast, &mut model, resource_spec, &mut stage);
    if stage.has_errors() {
        log::debug!("Reference pass reported {} errors", stage.error_count());
        return None;
    }
    Some(model)
}
