/*!
 * Copyright 2025 Release Workshop Ltd
 * Licensed under the Elastic License 2.0; you may not use this file except in compliance with the Elastic License 2.0.
 * See the LICENSE file in the project root for details.
 */
//! Source-located syntax tree for a module.
//!
//! Every node lives in one [`Ast`] arena and is addressed by a [`NodeId`].
//! The parser builds nodes bottom-up and never sets parents; the hierarchy
//! pass fills them in afterwards.

mod declarations;
mod expressions;

use std::fmt;

pub use declarations::*;
pub use expressions::{sub_references, Expression, Intrinsic, LiteralType, ObjectEntry, SubReference};

use crate::source::SourceLocation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Declaration(Declaration),
    Expression(Expression),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub location: SourceLocation,
    pub parent: Option<NodeId>,
}

#[derive(Debug, Clone, Default)]
pub struct Ast {
    nodes: Vec<Node>,
    root: Option<NodeId>,
}

impl Ast {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_declaration(&mut self, declaration: Declaration, location: SourceLocation) -> NodeId {
        self.push(NodeKind::Declaration(declaration), location)
    }

    pub fn add_expression(&mut self, expression: Expression, location: SourceLocation) -> NodeId {
        self.push(NodeKind::Expression(expression), location)
    }

    fn push(&mut self, kind: NodeKind, location: SourceLocation) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            kind,
            location,
            parent: None,
        });
        id
    }

    /// The module declaration, once the parser has set it.
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn set_root(&mut self, root: NodeId) {
        self.root = Some(root);
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.nodes.len() as u32).map(NodeId)
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn location(&self, id: NodeId) -> &SourceLocation {
        &self.nodes[id.index()].location
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.index()].parent
    }

    pub(crate) fn set_parent(&mut self, id: NodeId, parent: NodeId) {
        self.nodes[id.index()].parent = Some(parent);
    }

    pub fn declaration(&self, id: NodeId) -> Option<&Declaration> {
        match &self.nodes[id.index()].kind {
            NodeKind::Declaration(declaration) => Some(declaration),
            NodeKind::Expression(_) => None,
        }
    }

    pub fn expression(&self, id: NodeId) -> Option<&Expression> {
        match &self.nodes[id.index()].kind {
            NodeKind::Expression(expression) => Some(expression),
            NodeKind::Declaration(_) => None,
        }
    }

    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        match &self.nodes[id.index()].kind {
            NodeKind::Declaration(declaration) => declaration.children(),
            NodeKind::Expression(expression) => expression.children(),
        }
    }

    /// Walks the parent chain starting at `id`'s parent.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |current| self.parent(*current))
    }

    /// Nearest enclosing declaration, including `id` itself.
    pub fn owning_declaration(&self, id: NodeId) -> Option<NodeId> {
        std::iter::once(id)
            .chain(self.ancestors(id))
            .find(|candidate| self.declaration(*candidate).is_some())
    }
}

/// Callbacks for a pre/post-order traversal driven by [`walk`].
pub trait Visitor {
    fn visit_start(&mut self, _ast: &Ast, _id: NodeId) {}
    fn visit_end(&mut self, _ast: &Ast, _id: NodeId) {}
}

/// Depth-first traversal of the subtree at `id`.
pub fn walk<V: Visitor + ?Sized>(ast: &Ast, id: NodeId, visitor: &mut V) {
    visitor.visit_start(ast, id);
    for child in ast.children(id) {
        walk(ast, child, visitor);
    }
    visitor.visit_end(ast, id);
}
