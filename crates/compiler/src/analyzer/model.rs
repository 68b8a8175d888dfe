/*!
 * Copyright 2025 Release Workshop Ltd
 * Licensed under the Elastic License 2.0; you may not use this file except in compliance with the Elastic License 2.0.
 * See the LICENSE file in the project root for details.
 */
//! Side tables produced by semantic analysis, keyed by [`NodeId`].

use std::collections::HashMap;

use crate::ast::{Ast, Declaration, DeclarationKind, NodeId};
use crate::version::ModuleInfo;

/// A named declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub node: NodeId,
    /// Name as declared.
    pub name: String,
    /// Group path and name joined by `::`, e.g. `Storage::Bucket`.
    pub full_name: String,
    /// Alphanumeric concatenation of the path, e.g. `StorageBucket`.
    pub logical_id: String,
    pub kind: DeclarationKind,
}

/// Resolved `Scope` of a declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scope {
    /// Functions that receive the value as an environment variable.
    pub functions: Vec<NodeId>,
    /// The value is exported as a stack output.
    pub public: bool,
}

/// IAM permissions granted to the module role on a declaration's resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grant {
    pub declaration: NodeId,
    pub actions: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct SemanticModel {
    module: ModuleInfo,
    symbols: Vec<Symbol>,
    by_node: HashMap<NodeId, usize>,
    by_full_name: HashMap<String, usize>,
    by_logical_id: HashMap<String, usize>,
    scopes: HashMap<NodeId, Scope>,
    grants: Vec<Grant>,
    bindings: HashMap<NodeId, NodeId>,
    name_bindings: HashMap<(NodeId, String), NodeId>,
    implicit_conditions: HashMap<NodeId, String>,
}

impl SemanticModel {
    pub(crate) fn new(module: ModuleInfo) -> Self {
        Self {
            module,
            symbols: Vec::new(),
            by_node: HashMap::new(),
            by_full_name: HashMap::new(),
            by_logical_id: HashMap::new(),
            scopes: HashMap::new(),
            grants: Vec::new(),
            bindings: HashMap::new(),
            name_bindings: HashMap::new(),
            implicit_conditions: HashMap::new(),
        }
    }

    /// Identity and version of the module being compiled.
    pub fn module(&self) -> &ModuleInfo {
        &self.module
    }

    /// Registers a symbol. Returns the existing symbol when the full name
    /// or logical id is already taken.
    pub(crate) fn add_symbol(&mut self, symbol: Symbol) -> Result<(), &Symbol> {
        let existing = self
            .by_full_name
            .get(&symbol.full_name)
            .or_else(|| self.by_logical_id.get(&symbol.logical_id))
            .copied();
        if let Some(index) = existing {
            return Err(&self.symbols[index]);
        }
        let index = self.symbols.len();
        self.by_node.insert(symbol.node, index);
        self.by_full_name.insert(symbol.full_name.clone(), index);
        self.by_logical_id.insert(symbol.logical_id.clone(), index);
        self.symbols.push(symbol);
        Ok(())
    }

    /// Symbols in declaration order.
    pub fn symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.iter()
    }

    pub fn symbol(&self, node: NodeId) -> Option<&Symbol> {
        self.by_node.get(&node).map(|&index| &self.symbols[index])
    }

    pub fn symbol_by_full_name(&self, full_name: &str) -> Option<&Symbol> {
        self.by_full_name.get(full_name).map(|&index| &self.symbols[index])
    }

    pub fn symbol_by_logical_id(&self, logical_id: &str) -> Option<&Symbol> {
        self.by_logical_id.get(logical_id).map(|&index| &self.symbols[index])
    }

    pub fn logical_id(&self, node: NodeId) -> Option<&str> {
        self.symbol(node).map(|symbol| symbol.logical_id.as_str())
    }

    /// Resolves `name` as written inside declaration `from`.
    ///
    /// Tries each enclosing group from the innermost outward, then the
    /// absolute name, then the logical id.
    pub fn resolve(&self, ast: &Ast, from: NodeId, name: &str) -> Option<&Symbol> {
        let groups = std::iter::once(from)
            .chain(ast.ancestors(from))
            .filter(|&id| matches!(ast.declaration(id), Some(Declaration::Group(_))))
            .filter_map(|id| self.symbol(id));
        for group in groups {
            if let Some(symbol) = self.symbol_by_full_name(&format!("{}::{name}", group.full_name)) {
                return Some(symbol);
            }
        }
        self.symbol_by_full_name(name)
            .or_else(|| self.symbol_by_logical_id(name))
    }

    /// Full names of every symbol, for suggestions.
    pub fn full_names(&self) -> impl Iterator<Item = &str> {
        self.symbols.iter().map(|symbol| symbol.full_name.as_str())
    }

    pub(crate) fn set_scope(&mut self, declaration: NodeId, scope: Scope) {
        self.scopes.insert(declaration, scope);
    }

    pub fn scope(&self, declaration: NodeId) -> Option<&Scope> {
        self.scopes.get(&declaration)
    }

    /// Declarations scoped to `function`, in declaration order.
    pub fn scoped_to(&self, function: NodeId) -> Vec<&Symbol> {
        self.symbols
            .iter()
            .filter(|symbol| {
                self.scopes
                    .get(&symbol.node)
                    .is_some_and(|scope| scope.functions.contains(&function))
            })
            .collect()
    }

    pub(crate) fn add_grant(&mut self, grant: Grant) {
        self.grants.push(grant);
    }

    pub fn grants(&self) -> &[Grant] {
        &self.grants
    }

    pub(crate) fn bind(&mut self, node: NodeId, target: NodeId) {
        self.bindings.insert(node, target);
    }

    /// Declaration a `Ref`, `GetAtt`, `Condition`, `FindInMap` or literal
    /// condition name is bound to.
    pub fn binding(&self, node: NodeId) -> Option<NodeId> {
        self.bindings.get(&node).copied()
    }

    pub(crate) fn bind_name(&mut self, node: NodeId, name: &str, target: NodeId) {
        self.name_bindings.insert((node, name.to_string()), target);
    }

    /// Declaration bound to `name` as used by `node`: a `Sub` token, a
    /// `DependsOn` entry, a handler or an event-source target.
    pub fn name_binding(&self, node: NodeId, name: &str) -> Option<NodeId> {
        self.name_bindings.get(&(node, name.to_string())).copied()
    }

    pub(crate) fn set_implicit_condition(&mut self, declaration: NodeId, name: String) {
        self.implicit_conditions.insert(declaration, name);
    }

    /// Generated condition name for a declaration whose `If` is an inline
    /// expression.
    pub fn implicit_condition(&self, declaration: NodeId) -> Option<&str> {
        self.implicit_conditions.get(&declaration).map(String::as_str)
    }
}
