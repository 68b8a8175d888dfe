/*!
 * Copyright 2025 Release Workshop Ltd
 * Licensed under the Elastic License 2.0; you may not use this file except in compliance with the Elastic License 2.0.
 * See the LICENSE file in the project root for details.
 */
//! Declaration nodes.
//!
//! Fields holding expressions or nested declarations are [`NodeId`]s into the
//! owning [`Ast`](crate::ast::Ast). Names of other declarations (`DependsOn`,
//! handlers, event-source targets) stay strings and are bound by the
//! reference pass.

use crate::ast::NodeId;

#[derive(Debug, Clone, PartialEq)]
pub enum Declaration {
    Module(ModuleDeclaration),
    Using(UsingDeclaration),
    Parameter(ParameterDeclaration),
    Import(ImportDeclaration),
    Variable(VariableDeclaration),
    Group(GroupDeclaration),
    Condition(ConditionDeclaration),
    Resource(ResourceDeclaration),
    Nested(NestedDeclaration),
    Package(PackageDeclaration),
    Function(FunctionDeclaration),
    Mapping(MappingDeclaration),
    ResourceType(ResourceTypeDeclaration),
    Macro(MacroDeclaration),
    Api(ApiSource),
    Schedule(ScheduleSource),
    S3(S3Source),
    SlackCommand(SlackCommandSource),
    Topic(TopicSource),
    Sqs(SqsSource),
    Alexa(AlexaSource),
    DynamoDb(DynamoDbSource),
    Kinesis(KinesisSource),
    WebSocket(WebSocketSource),
    EventBus(EventBusSource),
}

/// Coarse classification used by the semantic model and in messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeclarationKind {
    Module,
    Using,
    Parameter,
    Import,
    Variable,
    Group,
    Condition,
    Resource,
    Nested,
    Package,
    Function,
    Mapping,
    ResourceType,
    Macro,
    EventSource,
}

impl DeclarationKind {
    pub fn describe(self) -> &'static str {
        match self {
            DeclarationKind::Module => "module",
            DeclarationKind::Using => "module dependency",
            DeclarationKind::Parameter => "parameter",
            DeclarationKind::Import => "import",
            DeclarationKind::Variable => "variable",
            DeclarationKind::Group => "group",
            DeclarationKind::Condition => "condition",
            DeclarationKind::Resource => "resource",
            DeclarationKind::Nested => "nested module",
            DeclarationKind::Package => "package",
            DeclarationKind::Function => "function",
            DeclarationKind::Mapping => "mapping",
            DeclarationKind::ResourceType => "resource type",
            DeclarationKind::Macro => "macro",
            DeclarationKind::EventSource => "event source",
        }
    }
}

impl Declaration {
    /// The keyword that introduces this declaration.
    pub fn keyword(&self) -> &'static str {
        match self {
            Declaration::Module(_) => "Module",
            Declaration::Using(_) => "Module",
            Declaration::Parameter(_) => "Parameter",
            Declaration::Import(_) => "Import",
            Declaration::Variable(_) => "Variable",
            Declaration::Group(_) => "Group",
            Declaration::Condition(_) => "Condition",
            Declaration::Resource(_) => "Resource",
            Declaration::Nested(_) => "Nested",
            Declaration::Package(_) => "Package",
            Declaration::Function(_) => "Function",
            Declaration::Mapping(_) => "Mapping",
            Declaration::ResourceType(_) => "ResourceType",
            Declaration::Macro(_) => "Macro",
            Declaration::Api(_) => "Api",
            Declaration::Schedule(_) => "Schedule",
            Declaration::S3(_) => "S3",
            Declaration::SlackCommand(_) => "SlackCommand",
            Declaration::Topic(_) => "Topic",
            Declaration::Sqs(_) => "Sqs",
            Declaration::Alexa(_) => "Alexa",
            Declaration::DynamoDb(_) => "DynamoDB",
            Declaration::Kinesis(_) => "Kinesis",
            Declaration::WebSocket(_) => "WebSocket",
            Declaration::EventBus(_) => "EventBus",
        }
    }

    pub fn kind(&self) -> DeclarationKind {
        match self {
            Declaration::Module(_) => DeclarationKind::Module,
            Declaration::Using(_) => DeclarationKind::Using,
            Declaration::Parameter(_) => DeclarationKind::Parameter,
            Declaration::Import(_) => DeclarationKind::Import,
            Declaration::Variable(_) => DeclarationKind::Variable,
            Declaration::Group(_) => DeclarationKind::Group,
            Declaration::Condition(_) => DeclarationKind::Condition,
            Declaration::Resource(_) => DeclarationKind::Resource,
            Declaration::Nested(_) => DeclarationKind::Nested,
            Declaration::Package(_) => DeclarationKind::Package,
            Declaration::Function(_) => DeclarationKind::Function,
            Declaration::Mapping(_) => DeclarationKind::Mapping,
            Declaration::ResourceType(_) => DeclarationKind::ResourceType,
            Declaration::Macro(_) => DeclarationKind::Macro,
            Declaration::Api(_)
            | Declaration::Schedule(_)
            | Declaration::S3(_)
            | Declaration::SlackCommand(_)
            | Declaration::Topic(_)
            | Declaration::Sqs(_)
            | Declaration::Alexa(_)
            | Declaration::DynamoDb(_)
            | Declaration::Kinesis(_)
            | Declaration::WebSocket(_)
            | Declaration::EventBus(_) => DeclarationKind::EventSource,
        }
    }

    /// Name of a named declaration.
    pub fn name(&self) -> Option<&str> {
        let name = match self {
            Declaration::Parameter(d) => &d.name,
            Declaration::Import(d) => &d.name,
            Declaration::Variable(d) => &d.name,
            Declaration::Group(d) => &d.name,
            Declaration::Condition(d) => &d.name,
            Declaration::Resource(d) => &d.name,
            Declaration::Nested(d) => &d.name,
            Declaration::Package(d) => &d.name,
            Declaration::Function(d) => &d.name,
            Declaration::Mapping(d) => &d.name,
            Declaration::ResourceType(d) => &d.name,
            Declaration::Macro(d) => &d.name,
            _ => return None,
        };
        Some(name)
    }

    pub fn description(&self) -> Option<&str> {
        match self {
            Declaration::Module(d) => d.description.as_deref(),
            Declaration::Using(d) => d.description.as_deref(),
            Declaration::Parameter(d) => d.description.as_deref(),
            Declaration::Import(d) => d.description.as_deref(),
            Declaration::Variable(d) => d.description.as_deref(),
            Declaration::Group(d) => d.description.as_deref(),
            Declaration::Condition(d) => d.description.as_deref(),
            Declaration::Resource(d) => d.description.as_deref(),
            Declaration::Nested(d) => d.description.as_deref(),
            Declaration::Package(d) => d.description.as_deref(),
            Declaration::Function(d) => d.description.as_deref(),
            Declaration::Mapping(d) => d.description.as_deref(),
            Declaration::ResourceType(d) => d.description.as_deref(),
            Declaration::Macro(d) => d.description.as_deref(),
            _ => None,
        }
    }

    /// `Scope` entries, for declarations that accept them.
    pub fn scope(&self) -> &[String] {
        match self {
            Declaration::Parameter(d) => &d.scope,
            Declaration::Import(d) => &d.scope,
            Declaration::Variable(d) => &d.scope,
            Declaration::Resource(d) => &d.scope,
            Declaration::Package(d) => &d.scope,
            Declaration::Function(d) => &d.scope,
            _ => &[],
        }
    }

    /// `Allow` entries, for declarations that accept them.
    pub fn allow(&self) -> &[String] {
        match self {
            Declaration::Parameter(d) => &d.allow,
            Declaration::Import(d) => &d.allow,
            Declaration::Resource(d) => &d.allow,
            _ => &[],
        }
    }

    /// Child nodes in source order.
    pub fn children(&self) -> Vec<NodeId> {
        match self {
            Declaration::Module(d) => d.using.iter().chain(&d.items).copied().collect(),
            Declaration::Using(_)
            | Declaration::Parameter(_)
            | Declaration::Import(_)
            | Declaration::Package(_)
            | Declaration::ResourceType(_)
            | Declaration::Macro(_)
            | Declaration::Api(_)
            | Declaration::S3(_)
            | Declaration::SlackCommand(_)
            | Declaration::WebSocket(_) => Vec::new(),
            Declaration::Variable(d) => vec![d.value],
            Declaration::Group(d) => d.items.clone(),
            Declaration::Condition(d) => vec![d.value],
            Declaration::Resource(d) => [d.value, d.properties, d.condition]
                .into_iter()
                .flatten()
                .collect(),
            Declaration::Nested(d) => d.parameters.into_iter().collect(),
            Declaration::Function(d) => [d.condition, d.memory, d.timeout, d.environment, d.properties]
                .into_iter()
                .flatten()
                .chain(d.sources.iter().copied())
                .collect(),
            Declaration::Mapping(d) => vec![d.value],
            Declaration::Schedule(d) => vec![d.expression],
            Declaration::Topic(d) => d.filters.into_iter().collect(),
            Declaration::Sqs(d) => d.batch_size.into_iter().collect(),
            Declaration::Alexa(d) => d.skill.into_iter().collect(),
            Declaration::DynamoDb(d) => [d.batch_size, d.maximum_batching_window]
                .into_iter()
                .flatten()
                .collect(),
            Declaration::Kinesis(d) => [d.batch_size, d.maximum_batching_window]
                .into_iter()
                .flatten()
                .collect(),
            Declaration::EventBus(d) => vec![d.pattern],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModuleDeclaration {
    /// `Namespace.Name` as written.
    pub module: String,
    pub version: Option<String>,
    pub description: Option<String>,
    pub transforms: Vec<String>,
    pub using: Vec<NodeId>,
    pub items: Vec<NodeId>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UsingDeclaration {
    pub module: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterDeclaration {
    pub name: String,
    pub section: Option<String>,
    pub label: Option<String>,
    pub description: Option<String>,
    pub r#type: Option<String>,
    pub scope: Vec<String>,
    pub no_echo: Option<bool>,
    pub default: Option<String>,
    pub constraint_description: Option<String>,
    pub allowed_pattern: Option<String>,
    pub allowed_values: Vec<String>,
    pub max_length: Option<String>,
    pub max_value: Option<String>,
    pub min_length: Option<String>,
    pub min_value: Option<String>,
    pub allow: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportDeclaration {
    pub name: String,
    /// `Namespace.Name::ExportName`.
    pub module: String,
    pub description: Option<String>,
    pub r#type: Option<String>,
    pub scope: Vec<String>,
    pub allow: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariableDeclaration {
    pub name: String,
    pub description: Option<String>,
    pub r#type: Option<String>,
    pub scope: Vec<String>,
    pub value: NodeId,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupDeclaration {
    pub name: String,
    pub description: Option<String>,
    pub items: Vec<NodeId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConditionDeclaration {
    pub name: String,
    pub description: Option<String>,
    pub value: NodeId,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceDeclaration {
    pub name: String,
    pub description: Option<String>,
    pub r#type: Option<String>,
    pub scope: Vec<String>,
    pub allow: Vec<String>,
    /// An existing resource; references inline this value.
    pub value: Option<NodeId>,
    pub depends_on: Vec<String>,
    pub properties: Option<NodeId>,
    pub default_attribute: Option<String>,
    /// Condition name literal, `!Condition` or an inline conditional expression.
    pub condition: Option<NodeId>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NestedDeclaration {
    pub name: String,
    pub description: Option<String>,
    pub module: String,
    pub depends_on: Vec<String>,
    pub parameters: Option<NodeId>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PackageDeclaration {
    pub name: String,
    pub description: Option<String>,
    pub scope: Vec<String>,
    pub files: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FunctionDeclaration {
    pub name: String,
    pub description: Option<String>,
    pub scope: Vec<String>,
    pub condition: Option<NodeId>,
    pub memory: Option<NodeId>,
    pub timeout: Option<NodeId>,
    pub project: Option<String>,
    pub runtime: Option<String>,
    pub language: Option<String>,
    pub handler: Option<String>,
    /// Object of environment variable name to value.
    pub environment: Option<NodeId>,
    pub properties: Option<NodeId>,
    pub sources: Vec<NodeId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MappingDeclaration {
    pub name: String,
    pub description: Option<String>,
    pub value: NodeId,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceTypeDeclaration {
    /// Type name, e.g. `Acme::Widget`.
    pub name: String,
    pub description: Option<String>,
    /// Name of the function or topic that handles the custom resource.
    pub handler: String,
    pub properties: Vec<ResourceTypeProperty>,
    pub attributes: Vec<ResourceTypeAttribute>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceTypeProperty {
    pub name: String,
    pub description: Option<String>,
    pub r#type: Option<String>,
    pub required: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceTypeAttribute {
    pub name: String,
    pub description: Option<String>,
    pub r#type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MacroDeclaration {
    pub name: String,
    pub description: Option<String>,
    pub handler: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApiSource {
    /// `METHOD:/path`.
    pub api: String,
    pub integration: Option<String>,
    pub operation_name: Option<String>,
    pub api_key_required: Option<bool>,
    pub authorization_type: Option<String>,
    pub authorization_scopes: Vec<String>,
    pub authorizer: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleSource {
    /// `rate(...)` or `cron(...)` expression.
    pub expression: NodeId,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct S3Source {
    pub bucket: String,
    pub events: Vec<String>,
    pub prefix: Option<String>,
    pub suffix: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SlackCommandSource {
    pub path: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TopicSource {
    pub topic: String,
    pub filters: Option<NodeId>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SqsSource {
    pub queue: String,
    pub batch_size: Option<NodeId>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlexaSource {
    /// Skill id; `None` accepts any skill.
    pub skill: Option<NodeId>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DynamoDbSource {
    pub table: String,
    pub batch_size: Option<NodeId>,
    pub starting_position: Option<String>,
    pub maximum_batching_window: Option<NodeId>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct KinesisSource {
    pub stream: String,
    pub batch_size: Option<NodeId>,
    pub starting_position: Option<String>,
    pub maximum_batching_window: Option<NodeId>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WebSocketSource {
    pub route: String,
    pub operation_name: Option<String>,
    pub api_key_required: Option<bool>,
    pub authorization_type: Option<String>,
    pub authorizer: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EventBusSource {
    pub bus: String,
    pub pattern: NodeId,
}
