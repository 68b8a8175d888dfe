/*!
 * Copyright 2025 Release Workshop Ltd
 * Licensed under the Elastic License 2.0; you may not use this file except in compliance with the Elastic License 2.0.
 * See the LICENSE file in the project root for details.
 */
//! Parent assignment.
//!
//! Any violation found here means the parser built a malformed tree, so
//! every diagnostic is `Fatal`.

use crate::ast::{walk, Ast, NodeId, Visitor};
use crate::diagnostics::{Diagnostic, DiagnosticSink, ErrorCode};

#[derive(Default)]
struct ParentCollector {
    stack: Vec<NodeId>,
    visited: Vec<bool>,
    links: Vec<(NodeId, NodeId)>,
    revisited: Vec<NodeId>,
}

impl Visitor for ParentCollector {
    fn visit_start(&mut self, _ast: &Ast, id: NodeId) {
        if std::mem::replace(&mut self.visited[id.index()], true) {
            self.revisited.push(id);
        }
        if let Some(&parent) = self.stack.last() {
            self.links.push((id, parent));
        }
        self.stack.push(id);
    }

    fn visit_end(&mut self, _ast: &Ast, _id: NodeId) {
        self.stack.pop();
    }
}

/// Assigns every node its parent.
pub fn assign_parents(ast: &mut Ast, sink: &mut dyn DiagnosticSink) {
    let Some(root) = ast.root() else {
        sink.emit(Diagnostic::fatal(ErrorCode::E900, "the module has no root declaration"));
        return;
    };

    let mut collector = ParentCollector {
        visited: vec![false; ast.len()],
        ..ParentCollector::default()
    };
    walk(ast, root, &mut collector);

    for id in collector.revisited {
        sink.emit(
            Diagnostic::fatal(ErrorCode::E900, format!("node {id} is reachable more than once"))
                .at(ast.location(id)),
        );
    }
    for id in ast.ids() {
        if !collector.visited[id.index()] {
            sink.emit(
                Diagnostic::fatal(ErrorCode::E900, format!("node {id} is unreachable from the module"))
                    .at(ast.location(id)),
            );
        }
    }

    for (child, parent) in collector.links {
        let child_location = ast.location(child);
        if child_location.is_unknown() {
            sink.emit(Diagnostic::fatal(
                ErrorCode::E900,
                format!("node {child} has no source location"),
            ));
        } else if child_location.starts_before(ast.location(parent)) {
            sink.emit(
                Diagnostic::fatal(
                    ErrorCode::E900,
                    format!("node {child} starts before its parent {parent}"),
                )
                .at(child_location),
            );
        }
        if ast.parent(child).is_none() {
            ast.set_parent(child, parent);
        }
    }
    if ast.location(root).is_unknown() {
        sink.emit(Diagnostic::fatal(
            ErrorCode::E900,
            "the module declaration has no source location",
        ));
    }
    log::debug!("Assigned parents to {} nodes", ast.len());
}
