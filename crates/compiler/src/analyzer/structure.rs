/*!
 * Copyright 2025 Release Workshop Ltd
 * Licensed under the Elastic License 2.0; you may not use this file except in compliance with the Elastic License 2.0.
 * See the LICENSE file in the project root for details.
 */
//! Structure pass: module identity, the symbol table and every check that
//! needs declarations but not references.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::analyzer::model::{Grant, Scope, SemanticModel, Symbol};
use crate::ast::{
    walk, Ast, Declaration, DeclarationKind, Expression, FunctionDeclaration, LiteralType,
    ModuleDeclaration, NodeId, ResourceDeclaration, ResourceTypeDeclaration, Visitor,
};
use crate::diagnostics::{did_you_mean, Diagnostic, DiagnosticSink, ErrorCode};
use crate::resource_spec::ResourceSpecification;
use crate::version::{ModuleInfo, VersionInfo};

static NAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9]*$").expect("name pattern is valid"));

static TYPE_NAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9]*(::[A-Za-z][A-Za-z0-9]*)+$").expect("type name pattern is valid")
});

/// Version assumed when a module declares none.
pub const DEFAULT_MODULE_VERSION: &str = "1.0-DEV";

/// Logical ids the generator emits for its own resources.
pub const RESERVED_NAMES: &[&str] = &["DeploymentBucketName", "DeploymentPrefix", "ModuleRole"];
const RESERVED_PREFIXES: &[&str] = &["ModuleRestApi", "ModuleWebSocket"];

const API_METHODS: &[&str] = &["ANY", "DELETE", "GET", "HEAD", "OPTIONS", "PATCH", "POST", "PUT"];
const AUTHORIZATION_TYPES: &[&str] = &["NONE", "AWS_IAM", "CUSTOM", "COGNITO_USER_POOLS", "JWT"];
const STARTING_POSITIONS: &[&str] = &["TRIM_HORIZON", "LATEST", "AT_TIMESTAMP"];

/// `Language` to default runtime and handler.
const LANGUAGES: &[(&str, &str, &str)] = &[
    ("go", "provided.al2023", "bootstrap"),
    ("javascript", "nodejs20.x", "index.handler"),
    ("python", "python3.12", "index.handler"),
    ("rust", "provided.al2023", "bootstrap"),
    ("typescript", "nodejs20.x", "index.handler"),
];

/// Default runtime and handler of a function `Language`.
pub fn language_defaults(language: &str) -> Option<(&'static str, &'static str)> {
    LANGUAGES
        .iter()
        .find(|(name, _, _)| name.eq_ignore_ascii_case(language))
        .map(|&(_, runtime, handler)| (runtime, handler))
}

/// Builds the semantic model for the module rooted at `ast.root()`.
///
/// Returns `None` only when the tree has no module root; all other problems
/// are reported to `sink`.
pub fn analyze_structure(
    ast: &Ast,
    resource_spec: Option<&ResourceSpecification>,
    sink: &mut dyn DiagnosticSink,
) -> Option<SemanticModel> {
    let root = ast.root()?;
    let Some(Declaration::Module(module)) = ast.declaration(root) else {
        sink.emit(
            Diagnostic::fatal(ErrorCode::E900, "the root node is not a module declaration")
                .at(ast.location(root)),
        );
        return None;
    };

    let info = module_identity(ast, root, module, sink);
    log::debug!("Analyzing structure of module '{info}'");

    let mut checker = StructureChecker {
        model: SemanticModel::new(info),
        groups: Vec::new(),
        sink,
    };
    walk(ast, root, &mut checker);

    let has_dependencies = !module.using.is_empty();
    for &using in &module.using {
        if let Some(Declaration::Using(declaration)) = ast.declaration(using) {
            if ModuleInfo::try_parse(&declaration.module).is_none() {
                checker.error(
                    ErrorCode::E204,
                    format!("`{}` is not a valid module reference", declaration.module),
                    ast,
                    using,
                );
            }
        }
    }

    let nodes: Vec<NodeId> = checker.model.symbols().map(|symbol| symbol.node).collect();
    for id in nodes {
        let Some(declaration) = ast.declaration(id) else {
            continue;
        };
        checker.resolve_scope(ast, id, declaration);
        checker.collect_grants(ast, id, declaration);
        match declaration {
            Declaration::Resource(resource) => {
                checker.check_resource(ast, id, resource, resource_spec, has_dependencies);
                checker.name_inline_condition(ast, id, resource.condition);
            }
            Declaration::Function(function) => {
                checker.check_function(ast, id, function);
                checker.name_inline_condition(ast, id, function.condition);
                for &source in &function.sources {
                    checker.check_event_source(ast, source);
                }
            }
            Declaration::Nested(nested) => match ModuleInfo::try_parse(&nested.module) {
                None => checker.error(
                    ErrorCode::E204,
                    format!("`{}` is not a valid module reference", nested.module),
                    ast,
                    id,
                ),
                Some(info) if info.version().is_none() => checker.error(
                    ErrorCode::E205,
                    format!("nested module `{}` must specify a version", nested.module),
                    ast,
                    id,
                ),
                Some(_) => {}
            },
            Declaration::Import(import) => {
                let valid = import
                    .module
                    .split_once("::")
                    .filter(|(_, export)| NAME_PATTERN.is_match(export))
                    .and_then(|(module, _)| ModuleInfo::try_parse(module))
                    .is_some();
                if !valid {
                    checker.error(
                        ErrorCode::E204,
                        format!(
                            "`{}` is not a valid import; expected `Namespace.Module::Export`",
                            import.module
                        ),
                        ast,
                        id,
                    );
                }
            }
            _ => {}
        }
    }

    Some(checker.model)
}

fn module_identity(
    ast: &Ast,
    root: NodeId,
    module: &ModuleDeclaration,
    sink: &mut dyn DiagnosticSink,
) -> ModuleInfo {
    let location = ast.location(root);
    let version_text = module.version.as_deref().unwrap_or(DEFAULT_MODULE_VERSION);
    let version = VersionInfo::try_parse(version_text);
    if version.is_none() {
        sink.emit(
            Diagnostic::error(ErrorCode::E205, format!("`{version_text}` is not a valid version"))
                .at(location),
        );
    }
    match ModuleInfo::try_parse(&module.module) {
        Some(info) if info.version().is_none() && info.origin().is_none() => info.with_version(version),
        _ => {
            sink.emit(
                Diagnostic::error(
                    ErrorCode::E204,
                    format!("`{}` is not a valid module name; expected `Namespace.Name`", module.module),
                )
                .at(location),
            );
            ModuleInfo::new("", module.module.clone(), version, None)
        }
    }
}

/// Alphanumeric concatenation of a full name.
pub fn logical_id(full_name: &str) -> String {
    full_name.chars().filter(char::is_ascii_alphanumeric).collect()
}

pub fn is_reserved_name(logical_id: &str) -> bool {
    RESERVED_NAMES.contains(&logical_id)
        || RESERVED_PREFIXES
            .iter()
            .any(|prefix| logical_id.starts_with(prefix))
}

fn literal(ast: &Ast, id: NodeId) -> Option<(&str, LiteralType)> {
    match ast.expression(id)? {
        Expression::Literal { value, kind } => Some((value.as_str(), *kind)),
        _ => None,
    }
}

struct StructureChecker<'a> {
    model: SemanticModel,
    groups: Vec<String>,
    sink: &'a mut dyn DiagnosticSink,
}

impl Visitor for StructureChecker<'_> {
    fn visit_start(&mut self, ast: &Ast, id: NodeId) {
        let Some(declaration) = ast.declaration(id) else {
            return;
        };

        if matches!(
            declaration.kind(),
            DeclarationKind::Parameter | DeclarationKind::ResourceType | DeclarationKind::Macro
        ) && !self.groups.is_empty()
        {
            self.error(
                ErrorCode::E203,
                format!(
                    "a {} must be declared at module level, not inside a group",
                    declaration.kind().describe()
                ),
                ast,
                id,
            );
        }

        if let Some(name) = declaration.name() {
            self.declare(ast, id, declaration, name);
        }
        if let Declaration::Group(group) = declaration {
            self.groups.push(group.name.clone());
        }
    }

    fn visit_end(&mut self, ast: &Ast, id: NodeId) {
        if let Some(Declaration::Group(_)) = ast.declaration(id) {
            self.groups.pop();
        }
    }
}

impl StructureChecker<'_> {
    fn error(&mut self, code: ErrorCode, message: impl Into<String>, ast: &Ast, id: NodeId) {
        self.sink
            .emit(Diagnostic::error(code, message).at(ast.location(id)));
    }

    fn declare(&mut self, ast: &Ast, id: NodeId, declaration: &Declaration, name: &str) {
        let kind = declaration.kind();
        let valid = if kind == DeclarationKind::ResourceType {
            TYPE_NAME_PATTERN.is_match(name) && !name.starts_with("AWS::") && !name.starts_with("Custom::")
        } else {
            NAME_PATTERN.is_match(name)
        };
        if !valid {
            self.error(
                ErrorCode::E201,
                format!("`{name}` is not a valid {} name", kind.describe()),
                ast,
                id,
            );
            return;
        }

        let full_name = if kind == DeclarationKind::ResourceType {
            name.to_string()
        } else {
            self.groups
                .iter()
                .map(String::as_str)
                .chain(std::iter::once(name))
                .collect::<Vec<_>>()
                .join("::")
        };
        let logical_id = logical_id(&full_name);
        if is_reserved_name(&logical_id) {
            self.error(
                ErrorCode::E202,
                format!("`{full_name}` uses a reserved name"),
                ast,
                id,
            );
            return;
        }

        log::trace!("Declared {} '{full_name}' as {logical_id}", kind.describe());
        let symbol = Symbol {
            node: id,
            name: name.to_string(),
            full_name: full_name.clone(),
            logical_id,
            kind,
        };
        if let Err(existing) = self.model.add_symbol(symbol) {
            let previous = ast.location(existing.node).to_string();
            self.error(
                ErrorCode::E200,
                format!("`{full_name}` is already declared at {previous}"),
                ast,
                id,
            );
        }
    }

    fn function_names(&self) -> Vec<String> {
        self.model
            .symbols()
            .filter(|symbol| symbol.kind == DeclarationKind::Function)
            .map(|symbol| symbol.full_name.clone())
            .collect()
    }

    fn resolve_scope(&mut self, ast: &Ast, id: NodeId, declaration: &Declaration) {
        let entries = declaration.scope();
        if entries.is_empty() {
            return;
        }
        let mut scope = Scope::default();
        for entry in entries {
            match entry.as_str() {
                "*" | "all" => {
                    let functions = self
                        .model
                        .symbols()
                        .filter(|symbol| symbol.kind == DeclarationKind::Function && symbol.node != id)
                        .map(|symbol| symbol.node);
                    scope.functions.extend(functions);
                }
                "public" => scope.public = true,
                name => match self.model.resolve(ast, id, name) {
                    Some(symbol) if symbol.kind == DeclarationKind::Function => {
                        scope.functions.push(symbol.node)
                    }
                    _ => {
                        let candidates = self.function_names();
                        let mut diagnostic = Diagnostic::error(
                            ErrorCode::E206,
                            format!("scope entry `{name}` is not a function, `*`, `all` or `public`"),
                        )
                        .at(ast.location(id));
                        if let Some(suggestion) =
                            did_you_mean(name, candidates.iter().map(String::as_str))
                        {
                            diagnostic = diagnostic.with_suggestion(suggestion);
                        }
                        self.sink.emit(diagnostic);
                    }
                },
            }
        }
        let mut seen = HashSet::new();
        scope.functions.retain(|function| seen.insert(*function));
        self.model.set_scope(id, scope);
    }

    fn collect_grants(&mut self, ast: &Ast, id: NodeId, declaration: &Declaration) {
        let entries = declaration.allow();
        if entries.is_empty() {
            return;
        }
        let r#type = match declaration {
            Declaration::Parameter(d) => d.r#type.as_deref(),
            Declaration::Import(d) => d.r#type.as_deref(),
            Declaration::Resource(d) => d.r#type.as_deref(),
            _ => None,
        };
        let mut actions: Vec<String> = Vec::new();
        for entry in entries {
            match expand_allow(entry, r#type) {
                Ok(expanded) => {
                    for action in expanded {
                        if !actions.contains(&action) {
                            actions.push(action);
                        }
                    }
                }
                Err(message) => self.error(ErrorCode::E207, message, ast, id),
            }
        }
        if !actions.is_empty() {
            self.model.add_grant(Grant {
                declaration: id,
                actions,
            });
        }
    }

    fn check_resource(
        &mut self,
        ast: &Ast,
        id: NodeId,
        resource: &ResourceDeclaration,
        resource_spec: Option<&ResourceSpecification>,
        has_dependencies: bool,
    ) {
        let r#type = match (&resource.r#type, resource.value) {
            (None, None) => {
                self.error(
                    ErrorCode::E213,
                    format!("resource `{}` needs a `Type` or a `Value`", resource.name),
                    ast,
                    id,
                );
                return;
            }
            (_, Some(_)) if resource.properties.is_some() => {
                self.error(
                    ErrorCode::E213,
                    format!(
                        "resource `{}` cannot have both `Value` and `Properties`",
                        resource.name
                    ),
                    ast,
                    id,
                );
                return;
            }
            (None, Some(_)) => return,
            (Some(r#type), _) => r#type.as_str(),
        };

        // declared property names with their required flag
        let properties: Vec<(String, bool)> = if let Some(local) = self.local_type(ast, r#type) {
            local
                .properties
                .iter()
                .map(|property| (property.name.clone(), property.required))
                .collect()
        } else if r#type.starts_with("AWS::") {
            let Some(spec) = resource_spec else {
                log::debug!("No resource specification; skipping checks for '{}'", r#type);
                return;
            };
            let Some(type_spec) = spec.resource_type(r#type) else {
                let mut diagnostic = Diagnostic::error(
                    ErrorCode::E208,
                    format!("unknown resource type `{}`", r#type),
                )
                .at(ast.location(id));
                if let Some(suggestion) =
                    did_you_mean(r#type, spec.resource_types.keys().map(String::as_str))
                {
                    diagnostic = diagnostic.with_suggestion(suggestion);
                }
                self.sink.emit(diagnostic);
                return;
            };
            type_spec
                .properties
                .iter()
                .map(|(name, property)| (name.clone(), property.required))
                .collect()
        } else if r#type.starts_with("Custom::") || has_dependencies {
            return;
        } else {
            self.sink.emit(
                Diagnostic::error(
                    ErrorCode::E208,
                    format!("unknown resource type `{}`", r#type),
                )
                .at(ast.location(id))
                .with_suggestion(
                    "declare it with `ResourceType` or add the module exporting it to `Using`",
                ),
            );
            return;
        };

        // an existing resource has no properties to check
        if resource.value.is_some() {
            return;
        }

        let entries = match resource.properties.and_then(|p| ast.expression(p)) {
            Some(Expression::Object { entries }) => entries.as_slice(),
            _ => &[][..],
        };
        for entry in entries {
            if !properties.iter().any(|(name, _)| *name == entry.key) {
                let mut diagnostic = Diagnostic::error(
                    ErrorCode::E209,
                    format!("`{}` is not a property of `{}`", entry.key, r#type),
                )
                .at(&entry.key_location);
                if let Some(suggestion) =
                    did_you_mean(&entry.key, properties.iter().map(|(name, _)| name.as_str()))
                {
                    diagnostic = diagnostic.with_suggestion(suggestion);
                }
                self.sink.emit(diagnostic);
            }
        }
        for (name, _) in properties.iter().filter(|(_, required)| *required) {
            if !entries.iter().any(|entry| entry.key == *name) {
                self.error(
                    ErrorCode::E210,
                    format!("resource `{}` is missing required property `{name}`", resource.name),
                    ast,
                    id,
                );
            }
        }
    }

    fn local_type<'t>(&self, ast: &'t Ast, r#type: &str) -> Option<&'t ResourceTypeDeclaration> {
        let symbol = self.model.symbol_by_full_name(r#type)?;
        match ast.declaration(symbol.node)? {
            Declaration::ResourceType(declaration) => Some(declaration),
            _ => None,
        }
    }

    fn check_function(&mut self, ast: &Ast, id: NodeId, function: &FunctionDeclaration) {
        let name = &function.name;
        for (setting, value) in [("Memory", function.memory), ("Timeout", function.timeout)] {
            match value {
                None => self.error(
                    ErrorCode::E211,
                    format!("function `{name}` is missing `{setting}`"),
                    ast,
                    id,
                ),
                Some(value) => {
                    if let Some((text, kind)) = literal(ast, value) {
                        if kind != LiteralType::Integer {
                            self.error(
                                ErrorCode::E211,
                                format!("`{setting}` of function `{name}` must be an integer, found `{text}`"),
                                ast,
                                value,
                            );
                        }
                    }
                }
            }
        }
        if let Some(language) = function.language.as_deref() {
            if language_defaults(language).is_none() {
                let known: Vec<&str> = LANGUAGES.iter().map(|(name, _, _)| *name).collect();
                self.error(
                    ErrorCode::E211,
                    format!(
                        "`{language}` of function `{name}` is not a known language; expected one of {}",
                        known.join(", ")
                    ),
                    ast,
                    id,
                );
            }
        }
        if function.runtime.is_none() && function.language.is_none() {
            self.error(
                ErrorCode::E211,
                format!("function `{name}` needs a `Runtime` or a `Language`"),
                ast,
                id,
            );
        }
        if function.handler.is_none() && function.language.is_none() {
            self.error(
                ErrorCode::E211,
                format!("function `{name}` is missing `Handler`"),
                ast,
                id,
            );
        }
    }

    fn check_event_source(&mut self, ast: &Ast, id: NodeId) {
        let Some(declaration) = ast.declaration(id) else {
            return;
        };
        let mut problems: Vec<String> = Vec::new();
        match declaration {
            Declaration::Api(api) => {
                match api.api.split_once(':') {
                    Some((method, path)) => {
                        if !API_METHODS.contains(&method.to_ascii_uppercase().as_str()) {
                            problems.push(format!("`{method}` is not an HTTP method"));
                        }
                        if !path.starts_with('/') {
                            problems.push(format!("API path `{path}` must start with `/`"));
                        }
                    }
                    None => problems.push(format!("`{}` must have the form `METHOD:/path`", api.api)),
                }
                check_authorization(&mut problems, api.authorization_type.as_deref());
            }
            Declaration::Schedule(schedule) => {
                if let Some((text, _)) = literal(ast, schedule.expression) {
                    let valid = (text.starts_with("rate(") || text.starts_with("cron("))
                        && text.ends_with(')');
                    if !valid {
                        problems.push(format!("`{text}` is not a `rate(...)` or `cron(...)` expression"));
                    }
                }
            }
            Declaration::S3(s3) => {
                for event in &s3.events {
                    if !event.starts_with("s3:") {
                        problems.push(format!("`{event}` is not an S3 event name"));
                    }
                }
            }
            Declaration::SlackCommand(slack) => {
                if !slack.path.starts_with('/') {
                    problems.push(format!("Slack command path `{}` must start with `/`", slack.path));
                }
            }
            Declaration::Sqs(sqs) => check_batch_size(ast, &mut problems, sqs.batch_size, 1..=10),
            Declaration::DynamoDb(stream) => {
                check_batch_size(ast, &mut problems, stream.batch_size, 1..=10_000);
                check_starting_position(&mut problems, stream.starting_position.as_deref());
            }
            Declaration::Kinesis(stream) => {
                check_batch_size(ast, &mut problems, stream.batch_size, 1..=10_000);
                check_starting_position(&mut problems, stream.starting_position.as_deref());
            }
            Declaration::WebSocket(web_socket) => {
                if web_socket.route.is_empty() {
                    problems.push("WebSocket route must not be empty".to_string());
                }
                check_authorization(&mut problems, web_socket.authorization_type.as_deref());
            }
            _ => {}
        }
        for problem in problems {
            self.error(ErrorCode::E212, problem, ast, id);
        }
    }

    /// Names the condition of a declaration whose `If` is an inline
    /// expression rather than a condition name.
    fn name_inline_condition(&mut self, ast: &Ast, id: NodeId, condition: Option<NodeId>) {
        let Some(condition) = condition else {
            return;
        };
        let named = match ast.expression(condition) {
            Some(Expression::Condition { .. }) => true,
            Some(Expression::Literal { kind, .. }) => *kind == LiteralType::String,
            _ => false,
        };
        if named {
            return;
        }
        let Some(logical_id) = self.model.logical_id(id).map(str::to_string) else {
            return;
        };
        let name = format!("{logical_id}Condition");
        if self.model.symbol_by_logical_id(&name).is_some() {
            self.error(
                ErrorCode::E200,
                format!("condition `{name}` generated for `{logical_id}` is already declared"),
                ast,
                condition,
            );
            return;
        }
        self.model.set_implicit_condition(id, name);
    }
}

/// Expands one `Allow` entry into IAM actions.
///
/// `service:Action` is kept verbatim, `Full` and `*` grant every action of
/// the service named by the AWS type, `None` grants nothing.
pub fn expand_allow(entry: &str, r#type: Option<&str>) -> Result<Vec<String>, String> {
    match entry {
        "None" => Ok(Vec::new()),
        "Full" | "*" => {
            let service = r#type
                .and_then(|r#type| r#type.strip_prefix("AWS::"))
                .and_then(|rest| rest.split("::").next())
                .filter(|service| !service.is_empty())
                .ok_or_else(|| format!("`Allow: {entry}` needs an AWS resource `Type`"))?;
            Ok(vec![format!("{}:*", service.to_ascii_lowercase())])
        }
        action => match action.split_once(':') {
            Some((service, name)) if !service.is_empty() && !name.is_empty() => {
                Ok(vec![action.to_string()])
            }
            _ => Err(format!("`{action}` is not an IAM action of the form `service:Action`")),
        },
    }
}

fn check_authorization(problems: &mut Vec<String>, authorization_type: Option<&str>) {
    if let Some(authorization_type) = authorization_type {
        if !AUTHORIZATION_TYPES.contains(&authorization_type) {
            problems.push(format!("`{authorization_type}` is not an authorization type"));
        }
    }
}

fn check_starting_position(problems: &mut Vec<String>, position: Option<&str>) {
    if let Some(position) = position {
        if !STARTING_POSITIONS.contains(&position) {
            problems.push(format!("`{position}` is not a stream starting position"));
        }
    }
}

fn check_batch_size(
    ast: &Ast,
    problems: &mut Vec<String>,
    batch_size: Option<NodeId>,
    range: std::ops::RangeInclusive<i64>,
) {
    let Some((text, kind)) = batch_size.and_then(|id| literal(ast, id)) else {
        return;
    };
    let value = (kind == LiteralType::Integer)
        .then(|| text.parse::<i64>().ok())
        .flatten();
    if !value.is_some_and(|value| range.contains(&value)) {
        problems.push(format!(
            "batch size `{text}` must be an integer from {} to {}",
            range.start(),
            range.end()
        ));
    }
}
