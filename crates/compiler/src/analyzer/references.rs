/*!
 * Copyright 2025 Release Workshop Ltd
 * Licensed under the Elastic License 2.0; you may not use this file except in compliance with the Elastic License 2.0.
 * See the LICENSE file in the project root for details.
 */
//! Reference pass: binds every name used by an expression or declaration to
//! the declaration it denotes.

use std::collections::HashMap;

use crate::analyzer::model::SemanticModel;
use crate::ast::{
    sub_references, walk, Ast, Declaration, DeclarationKind, Expression, NodeId, Visitor,
};
use crate::diagnostics::{did_you_mean, Diagnostic, DiagnosticSink, ErrorCode};
use crate::resource_spec::ResourceSpecification;
use crate::source::SourceLocation;

/// Declaration kinds `Ref` may point at.
const REF_TARGETS: &[DeclarationKind] = &[
    DeclarationKind::Parameter,
    DeclarationKind::Import,
    DeclarationKind::Variable,
    DeclarationKind::Resource,
    DeclarationKind::Nested,
    DeclarationKind::Package,
    DeclarationKind::Function,
];

/// Declaration kinds `GetAtt` may point at.
const ATTRIBUTE_TARGETS: &[DeclarationKind] = &[
    DeclarationKind::Resource,
    DeclarationKind::Nested,
    DeclarationKind::Function,
];

/// Declaration kinds an event source can subscribe to.
const SOURCE_TARGETS: &[DeclarationKind] = &[
    DeclarationKind::Parameter,
    DeclarationKind::Import,
    DeclarationKind::Resource,
];

const DEPENDENCY_TARGETS: &[DeclarationKind] = &[
    DeclarationKind::Resource,
    DeclarationKind::Nested,
    DeclarationKind::Function,
];

const FUNCTION_ATTRIBUTES: &[&str] = &["Arn"];

/// Declarations whose value is substituted or evaluated where they are named:
/// variables, resources with a `Value`, and conditions.
fn is_evaluated(ast: &Ast, id: NodeId) -> bool {
    match ast.declaration(id) {
        Some(Declaration::Variable(_) | Declaration::Condition(_)) => true,
        Some(Declaration::Resource(resource)) => resource.value.is_some(),
        _ => false,
    }
}

/// `AWS::Region`, `AWS::StackName` and the other pseudo parameters.
pub fn is_pseudo_parameter(name: &str) -> bool {
    name.starts_with("AWS::")
}

/// Binds references in `ast` and records them in `model`.
pub fn resolve_references(
    ast: &Ast,
    model: &mut SemanticModel,
    resource_spec: Option<&ResourceSpecification>,
    sink: &mut dyn DiagnosticSink,
) {
    let Some(root) = ast.root() else {
        return;
    };
    let mut resolver = ReferenceResolver {
        model,
        resource_spec,
        sink,
        declarations: Vec::new(),
        dependencies: HashMap::new(),
    };
    walk(ast, root, &mut resolver);
    resolver.report_cycles(ast);
}

struct ReferenceResolver<'a> {
    model: &'a mut SemanticModel,
    resource_spec: Option<&'a ResourceSpecification>,
    sink: &'a mut dyn DiagnosticSink,
    /// Declarations being visited, innermost last.
    declarations: Vec<NodeId>,
    /// Declaration to the evaluated declarations it references, in source order.
    dependencies: HashMap<NodeId, Vec<NodeId>>,
}

impl Visitor for ReferenceResolver<'_> {
    fn visit_start(&mut self, ast: &Ast, id: NodeId) {
        if let Some(declaration) = ast.declaration(id) {
            self.declarations.push(id);
            self.bind_declaration(ast, id, declaration);
        } else if let Some(expression) = ast.expression(id) {
            self.bind_expression(ast, id, expression);
        }
    }

    fn visit_end(&mut self, ast: &Ast, id: NodeId) {
        if ast.declaration(id).is_some() {
            self.declarations.pop();
        }
    }
}

/// How an unresolved name is reported.
enum Site<'l> {
    /// The expression names it directly.
    Exact(&'l SourceLocation),
    /// The name sits inside the node, e.g. a `Sub` token.
    Near(&'l SourceLocation),
}

impl ReferenceResolver<'_> {
    /// Resolves `name` from `from` and checks the kind of the target.
    fn lookup(
        &mut self,
        ast: &Ast,
        from: NodeId,
        name: &str,
        allowed: &[DeclarationKind],
        usage: &str,
        site: Site<'_>,
    ) -> Option<NodeId> {
        let resolved = self
            .model
            .resolve(ast, from, name)
            .map(|symbol| (symbol.node, symbol.kind));
        let diagnostic = match resolved {
            Some((node, kind)) if allowed.contains(&kind) => {
                self.record_dependency(ast, node);
                return Some(node);
            }
            Some((_, kind)) => Diagnostic::error(
                ErrorCode::E301,
                format!("`{name}` is a {} and cannot be used with {usage}", kind.describe()),
            ),
            None => {
                let mut diagnostic =
                    Diagnostic::error(ErrorCode::E300, format!("`{name}` is not declared"));
                if let Some(suggestion) = did_you_mean(name, self.model.full_names()) {
                    diagnostic = diagnostic.with_suggestion(suggestion);
                }
                diagnostic
            }
        };
        self.sink.emit(match site {
            Site::Exact(location) => diagnostic.at(location),
            Site::Near(location) => diagnostic.near(location),
        });
        None
    }

    fn record_dependency(&mut self, ast: &Ast, target: NodeId) {
        if !is_evaluated(ast, target) {
            return;
        }
        if let Some(&source) = self.declarations.last() {
            let targets = self.dependencies.entry(source).or_default();
            if !targets.contains(&target) {
                targets.push(target);
            }
        }
    }

    fn bind_expression(&mut self, ast: &Ast, id: NodeId, expression: &Expression) {
        let Some(owner) = ast.owning_declaration(id) else {
            return;
        };
        let location = ast.location(id);
        match expression {
            Expression::Ref { reference_name } => {
                if is_pseudo_parameter(reference_name) {
                    return;
                }
                if let Some(target) = self.lookup(
                    ast,
                    owner,
                    reference_name,
                    REF_TARGETS,
                    "`Ref`",
                    Site::Exact(location),
                ) {
                    self.model.bind(id, target);
                }
            }
            Expression::GetAtt {
                reference_name,
                attribute_name,
            } => {
                if let Some(target) = self.lookup(
                    ast,
                    owner,
                    reference_name,
                    ATTRIBUTE_TARGETS,
                    "`Fn::GetAtt`",
                    Site::Exact(location),
                ) {
                    self.model.bind(id, target);
                    if let Some(attribute) = ast.expression(*attribute_name).and_then(Expression::as_str) {
                        self.check_attribute(ast, target, reference_name, attribute, location);
                    }
                }
            }
            Expression::Condition { name } => {
                if let Some(target) = self.lookup(
                    ast,
                    owner,
                    name,
                    &[DeclarationKind::Condition],
                    "`Condition`",
                    Site::Exact(location),
                ) {
                    self.model.bind(id, target);
                }
            }
            Expression::FindInMap { map_name, .. } => {
                if let Some(name) = ast.expression(*map_name).and_then(Expression::as_str) {
                    if let Some(target) = self.lookup(
                        ast,
                        owner,
                        name,
                        &[DeclarationKind::Mapping],
                        "`Fn::FindInMap`",
                        Site::Exact(ast.location(*map_name)),
                    ) {
                        self.model.bind(id, target);
                    }
                }
            }
            Expression::Sub {
                format_string,
                parameters,
            } => {
                let local: Vec<&str> = match parameters.and_then(|p| ast.expression(p)) {
                    Some(Expression::Object { entries }) => {
                        entries.iter().map(|entry| entry.key.as_str()).collect()
                    }
                    _ => Vec::new(),
                };
                for token in sub_references(format_string) {
                    if is_pseudo_parameter(&token.name) || local.contains(&token.name.as_str()) {
                        continue;
                    }
                    let (allowed, usage) = if token.attribute.is_some() {
                        (ATTRIBUTE_TARGETS, "an attribute reference in `Fn::Sub`")
                    } else {
                        (REF_TARGETS, "`Fn::Sub`")
                    };
                    if let Some(target) =
                        self.lookup(ast, owner, &token.name, allowed, usage, Site::Near(location))
                    {
                        self.model.bind_name(id, &token.name, target);
                    }
                }
            }
            _ => {}
        }
    }

    fn check_attribute(
        &mut self,
        ast: &Ast,
        target: NodeId,
        reference_name: &str,
        attribute: &str,
        location: &SourceLocation,
    ) {
        let known: Vec<String> = match ast.declaration(target) {
            Some(Declaration::Function(_)) => {
                FUNCTION_ATTRIBUTES.iter().map(|name| name.to_string()).collect()
            }
            Some(Declaration::Nested(_)) => {
                if attribute.starts_with("Outputs.") {
                    return;
                }
                Vec::new()
            }
            Some(Declaration::Resource(resource)) => {
                let Some(r#type) = resource.r#type.as_deref() else {
                    return;
                };
                if let Some(local) = self.model.symbol_by_full_name(r#type).and_then(|symbol| {
                    match ast.declaration(symbol.node) {
                        Some(Declaration::ResourceType(declaration)) => Some(declaration),
                        _ => None,
                    }
                }) {
                    local.attributes.iter().map(|a| a.name.clone()).collect()
                } else if let Some(type_spec) =
                    self.resource_spec.and_then(|spec| spec.resource_type(r#type))
                {
                    type_spec.attributes.keys().cloned().collect()
                } else {
                    return;
                }
            }
            _ => return,
        };
        if known.iter().any(|name| name == attribute) {
            return;
        }
        let mut diagnostic = Diagnostic::error(
            ErrorCode::E302,
            format!("`{reference_name}` has no attribute `{attribute}`"),
        )
        .at(location);
        if let Some(suggestion) = did_you_mean(attribute, known.iter().map(String::as_str)) {
            diagnostic = diagnostic.with_suggestion(suggestion);
        }
        self.sink.emit(diagnostic);
    }

    fn bind_declaration(&mut self, ast: &Ast, id: NodeId, declaration: &Declaration) {
        let location = ast.location(id);
        match declaration {
            Declaration::Resource(resource) => {
                self.bind_names(ast, id, &resource.depends_on, DEPENDENCY_TARGETS, "`DependsOn`");
                self.bind_condition_name(ast, id, resource.condition);
            }
            Declaration::Nested(nested) => {
                self.bind_names(ast, id, &nested.depends_on, DEPENDENCY_TARGETS, "`DependsOn`");
            }
            Declaration::Function(function) => {
                self.bind_condition_name(ast, id, function.condition);
            }
            Declaration::ResourceType(resource_type) => {
                self.bind_name(
                    ast,
                    id,
                    &resource_type.handler,
                    &[DeclarationKind::Function, DeclarationKind::Resource],
                    "`Handler`",
                    location,
                );
            }
            Declaration::Macro(declaration) => {
                self.bind_name(
                    ast,
                    id,
                    &declaration.handler,
                    &[DeclarationKind::Function],
                    "`Handler`",
                    location,
                );
            }
            Declaration::Topic(source) => {
                self.bind_name(ast, id, &source.topic, SOURCE_TARGETS, "a `Topic` source", location)
            }
            Declaration::S3(source) => {
                self.bind_name(ast, id, &source.bucket, SOURCE_TARGETS, "an `S3` source", location)
            }
            Declaration::Sqs(source) => {
                self.bind_name(ast, id, &source.queue, SOURCE_TARGETS, "an `Sqs` source", location)
            }
            Declaration::DynamoDb(source) => {
                self.bind_name(ast, id, &source.table, SOURCE_TARGETS, "a `DynamoDB` source", location)
            }
            Declaration::Kinesis(source) => {
                self.bind_name(ast, id, &source.stream, SOURCE_TARGETS, "a `Kinesis` source", location)
            }
            Declaration::EventBus(source) if source.bus != "default" => {
                self.bind_name(ast, id, &source.bus, SOURCE_TARGETS, "an `EventBus` source", location)
            }
            _ => {}
        }
    }

    fn bind_name(
        &mut self,
        ast: &Ast,
        id: NodeId,
        name: &str,
        allowed: &[DeclarationKind],
        usage: &str,
        location: &SourceLocation,
    ) {
        if let Some(target) = self.lookup(ast, id, name, allowed, usage, Site::Exact(location)) {
            self.model.bind_name(id, name, target);
        }
    }

    fn bind_names(
        &mut self,
        ast: &Ast,
        id: NodeId,
        names: &[String],
        allowed: &[DeclarationKind],
        usage: &str,
    ) {
        for name in names {
            self.bind_name(ast, id, name, allowed, usage, ast.location(id));
        }
    }

    /// `If: ConditionName` on a resource or function.
    fn bind_condition_name(&mut self, ast: &Ast, id: NodeId, condition: Option<NodeId>) {
        let Some(condition) = condition else {
            return;
        };
        let Some(name) = ast.expression(condition).and_then(Expression::as_str) else {
            return;
        };
        if let Some(target) = self.lookup(
            ast,
            id,
            name,
            &[DeclarationKind::Condition],
            "`If`",
            Site::Exact(ast.location(condition)),
        ) {
            self.model.bind(condition, target);
        }
    }

    fn report_cycles(&mut self, ast: &Ast) {
        // 0 = unvisited, 1 = on the current path, 2 = done
        let mut state: HashMap<NodeId, u8> = HashMap::new();
        let mut sources: Vec<NodeId> = self.dependencies.keys().copied().collect();
        sources.sort_by_key(|id| id.index());
        for source in sources {
            let mut path = Vec::new();
            self.visit_dependency(ast, source, &mut state, &mut path);
        }
    }

    fn visit_dependency(
        &mut self,
        ast: &Ast,
        node: NodeId,
        state: &mut HashMap<NodeId, u8>,
        path: &mut Vec<NodeId>,
    ) {
        match state.get(&node).copied().unwrap_or(0) {
            2 => return,
            1 => {
                let start = path.iter().position(|&id| id == node).unwrap_or(0);
                let names: Vec<&str> = path[start..]
                    .iter()
                    .chain(std::iter::once(&node))
                    .filter_map(|&id| self.model.symbol(id).map(|s| s.full_name.as_str()))
                    .collect();
                let message = format!("references form a cycle: {}", names.join(" -> "));
                self.sink
                    .emit(Diagnostic::error(ErrorCode::E303, message).at(ast.location(node)));
                return;
            }
            _ => {}
        }
        state.insert(node, 1);
        path.push(node);
        let targets = self.dependencies.get(&node).cloned().unwrap_or_default();
        for target in targets {
            self.visit_dependency(ast, target, state, path);
        }
        path.pop();
        state.insert(node, 2);
    }
}
