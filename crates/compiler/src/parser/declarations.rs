/*!
 * Copyright 2025 Release Workshop Ltd
 * Licensed under the Elastic License 2.0; you may not use this file except in compliance with the Elastic License 2.0.
 * See the LICENSE file in the project root for details.
 *
 * Declaration parsing. A declaration is a mapping whose first key is its
 * keyword; the keyword's value is the declaration's name or target.
 */

use crate::ast::{
    AlexaSource, ApiSource, ConditionDeclaration, Declaration, DynamoDbSource, EventBusSource,
    FunctionDeclaration, GroupDeclaration, ImportDeclaration, KinesisSource, MacroDeclaration,
    MappingDeclaration, ModuleDeclaration, NestedDeclaration, NodeId, PackageDeclaration,
    ParameterDeclaration, ResourceDeclaration, ResourceTypeAttribute, ResourceTypeDeclaration,
    ResourceTypeProperty, S3Source, ScheduleSource, SlackCommandSource, SqsSource, TopicSource,
    UsingDeclaration, VariableDeclaration, WebSocketSource,
};
use crate::diagnostics::{did_you_mean, Diagnostic, ErrorCode};
use crate::parser::events::{EventCursor, ScalarEvent};
use crate::parser::ModuleParser;

const ITEM_KEYWORDS: &[&str] = &[
    "Parameter",
    "Import",
    "Variable",
    "Group",
    "Condition",
    "Resource",
    "Nested",
    "Package",
    "Function",
    "Mapping",
    "ResourceType",
    "Macro",
];

const SOURCE_KEYWORDS: &[&str] = &[
    "Api",
    "Schedule",
    "S3",
    "SlackCommand",
    "Topic",
    "Sqs",
    "Alexa",
    "DynamoDB",
    "Kinesis",
    "WebSocket",
    "EventBus",
];

const USING_KEYWORDS: &[&str] = &["Module"];

const MODULE_KEYS: &[&str] = &["Version", "Description", "Transforms", "Using", "Items"];
const USING_KEYS: &[&str] = &["Description"];
const PARAMETER_KEYS: &[&str] = &[
    "Section",
    "Label",
    "Description",
    "Type",
    "Scope",
    "NoEcho",
    "Default",
    "ConstraintDescription",
    "AllowedPattern",
    "AllowedValues",
    "MaxLength",
    "MaxValue",
    "MinLength",
    "MinValue",
    "Allow",
];
const IMPORT_KEYS: &[&str] = &["Module", "Description", "Type", "Scope", "Allow"];
const VARIABLE_KEYS: &[&str] = &["Description", "Type", "Scope", "Value"];
const GROUP_KEYS: &[&str] = &["Description", "Items"];
const CONDITION_KEYS: &[&str] = &["Description", "Value"];
const RESOURCE_KEYS: &[&str] = &[
    "Description",
    "Type",
    "Scope",
    "Allow",
    "Value",
    "DependsOn",
    "Properties",
    "DefaultAttribute",
    "If",
];
const NESTED_KEYS: &[&str] = &["Description", "Module", "DependsOn", "Parameters"];
const PACKAGE_KEYS: &[&str] = &["Description", "Scope", "Files"];
const FUNCTION_KEYS: &[&str] = &[
    "Description",
    "Scope",
    "If",
    "Memory",
    "Timeout",
    "Project",
    "Runtime",
    "Language",
    "Handler",
    "Environment",
    "Properties",
    "Sources",
];
const MAPPING_KEYS: &[&str] = &["Description", "Value"];
const RESOURCE_TYPE_KEYS: &[&str] = &["Description", "Handler", "Properties", "Attributes"];
const RESOURCE_TYPE_PROPERTY_KEYS: &[&str] = &["Name", "Description", "Type", "Required"];
const RESOURCE_TYPE_ATTRIBUTE_KEYS: &[&str] = &["Name", "Description", "Type"];
const MACRO_KEYS: &[&str] = &["Description", "Handler"];
const API_KEYS: &[&str] = &[
    "Integration",
    "OperationName",
    "ApiKeyRequired",
    "AuthorizationType",
    "AuthorizationScopes",
    "Authorizer",
];
const SCHEDULE_KEYS: &[&str] = &["Name"];
const S3_KEYS: &[&str] = &["Events", "Prefix", "Suffix"];
const TOPIC_KEYS: &[&str] = &["Filters"];
const SQS_KEYS: &[&str] = &["BatchSize"];
const STREAM_KEYS: &[&str] = &["BatchSize", "StartingPosition", "MaximumBatchingWindowInSeconds"];
const WEB_SOCKET_KEYS: &[&str] = &[
    "OperationName",
    "ApiKeyRequired",
    "AuthorizationType",
    "Authorizer",
];
const EVENT_BUS_KEYS: &[&str] = &["Pattern"];

/// Where a declaration list appears; decides which keywords are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum DeclarationContext {
    Items,
    Sources,
    Using,
}

impl DeclarationContext {
    fn keywords(self) -> &'static [&'static str] {
        match self {
            DeclarationContext::Items => ITEM_KEYWORDS,
            DeclarationContext::Sources => SOURCE_KEYWORDS,
            DeclarationContext::Using => USING_KEYWORDS,
        }
    }

    fn describe(self) -> &'static str {
        match self {
            DeclarationContext::Items => "`Items`",
            DeclarationContext::Sources => "`Sources`",
            DeclarationContext::Using => "`Using`",
        }
    }
}

impl ModuleParser<'_> {
    /// Parses the root mapping of a module file.
    pub(super) fn parse_module_declaration(&mut self, cursor: &mut EventCursor) -> Option<NodeId> {
        if !cursor.at_mapping() || cursor.peek_tag().is_some() {
            self.unexpected(cursor, "a module declaration");
            return None;
        }
        if cursor.peek_plain_key(1) != Some("Module") {
            let location = cursor.current_location();
            self.error(
                ErrorCode::E109,
                "a module file must start with the `Module` keyword",
                &location,
            );
            cursor.skip_node();
            return None;
        }

        let start = cursor.position();
        let errors = self.errors;
        cursor.next();
        let keyword = cursor.next_scalar()?;
        let module = self.parse_string(cursor, "Module");

        let mut declaration = ModuleDeclaration::default();
        self.parse_entries(cursor, "the module", MODULE_KEYS, |this, cursor, key| {
            let k = key.value.as_str();
            match k {
                "Version" => declaration.version = this.parse_string(cursor, k),
                "Description" => declaration.description = this.parse_string(cursor, k),
                "Transforms" => {
                    declaration.transforms = this.parse_string_list(cursor, k, false).unwrap_or_default()
                }
                "Using" => {
                    declaration.using = this.parse_declaration_list(cursor, DeclarationContext::Using)
                }
                "Items" => {
                    declaration.items = this.parse_declaration_list(cursor, DeclarationContext::Items)
                }
                _ => return false,
            }
            true
        });

        declaration.module = module?;
        if self.errors > errors {
            return None;
        }
        log::trace!("Parsed module '{}' declared at {}", declaration.module, keyword.location);
        let location = cursor.span_from(start);
        Some(self.ast.add_declaration(Declaration::Module(declaration), location))
    }

    /// A list of declarations, an `!Include` of one, or a list with
    /// included entries.
    pub(super) fn parse_declaration_list(
        &mut self,
        cursor: &mut EventCursor,
        context: DeclarationContext,
    ) -> Vec<NodeId> {
        if Self::at_include(cursor) {
            return self
                .parse_include(cursor, |this, included| {
                    Some(this.parse_included_declarations(included, context))
                })
                .unwrap_or_default();
        }
        if !cursor.at_sequence() || cursor.peek_tag().is_some() {
            self.unexpected(cursor, &format!("a list of declarations for {}", context.describe()));
            return Vec::new();
        }

        cursor.next();
        let mut items = Vec::new();
        while !cursor.at_sequence_end() && cursor.peek().is_some() {
            if Self::at_include(cursor) {
                let included = self.parse_include(cursor, |this, included| {
                    Some(this.parse_included_declarations(included, context))
                });
                items.extend(included.unwrap_or_default());
            } else if let Some(item) = self.parse_declaration(cursor, context) {
                items.push(item);
            }
        }
        cursor.next();
        items
    }

    // an included document holds either a list or a single declaration
    fn parse_included_declarations(
        &mut self,
        cursor: &mut EventCursor,
        context: DeclarationContext,
    ) -> Vec<NodeId> {
        if cursor.at_sequence() {
            self.parse_declaration_list(cursor, context)
        } else {
            self.parse_declaration(cursor, context).into_iter().collect()
        }
    }

    /// Parses one declaration. Nothing is allocated when any error was
    /// reported inside it.
    pub(super) fn parse_declaration(
        &mut self,
        cursor: &mut EventCursor,
        context: DeclarationContext,
    ) -> Option<NodeId> {
        if !cursor.at_mapping() || cursor.peek_tag().is_some() {
            self.unexpected(cursor, &format!("a declaration in {}", context.describe()));
            return None;
        }
        let keyword = cursor
            .peek_plain_key(1)
            .filter(|keyword| context.keywords().contains(keyword))
            .map(str::to_string);
        let Some(keyword) = keyword else {
            self.unexpected_keyword(cursor, context);
            return None;
        };

        let start = cursor.position();
        let errors = self.errors;
        cursor.next();
        let key = cursor.next_scalar()?;
        let declaration = match keyword.as_str() {
            "Module" => self.parse_using(cursor, &key),
            "Parameter" => self.parse_parameter(cursor, &key),
            "Import" => self.parse_import(cursor, &key),
            "Variable" => self.parse_variable(cursor, &key),
            "Group" => self.parse_group(cursor, &key),
            "Condition" => self.parse_condition(cursor, &key),
            "Resource" => self.parse_resource(cursor, &key),
            "Nested" => self.parse_nested(cursor, &key),
            "Package" => self.parse_package(cursor, &key),
            "Function" => self.parse_function(cursor, &key),
            "Mapping" => self.parse_mapping_declaration(cursor, &key),
            "ResourceType" => self.parse_resource_type(cursor, &key),
            "Macro" => self.parse_macro(cursor, &key),
            "Api" => self.parse_api(cursor, &key),
            "Schedule" => self.parse_schedule(cursor, &key),
            "S3" => self.parse_s3(cursor, &key),
            "SlackCommand" => self.parse_slack_command(cursor, &key),
            "Topic" => self.parse_topic(cursor, &key),
            "Sqs" => self.parse_sqs(cursor, &key),
            "Alexa" => self.parse_alexa(cursor, &key),
            "DynamoDB" => self.parse_dynamo_db(cursor, &key),
            "Kinesis" => self.parse_kinesis(cursor, &key),
            "WebSocket" => self.parse_web_socket(cursor, &key),
            "EventBus" => self.parse_event_bus(cursor, &key),
            _ => {
                cursor.skip_to_end();
                None
            }
        };

        let declaration = declaration?;
        if self.errors > errors {
            return None;
        }
        let location = cursor.span_from(start);
        Some(self.ast.add_declaration(declaration, location))
    }

    fn unexpected_keyword(&mut self, cursor: &mut EventCursor, context: DeclarationContext) {
        let location = cursor.current_location();
        let found = cursor.peek_plain_key(1).map(str::to_string);
        let mut diagnostic = match &found {
            Some(found) => Diagnostic::error(
                ErrorCode::E109,
                format!(
                    "`{found}` does not start a declaration in {}",
                    context.describe()
                ),
            ),
            None => Diagnostic::error(
                ErrorCode::E109,
                format!("expected a declaration keyword in {}", context.describe()),
            ),
        }
        .at(&location);
        if let Some(suggestion) = found
            .as_deref()
            .and_then(|found| did_you_mean(found, context.keywords().iter().copied()))
        {
            diagnostic = diagnostic.with_suggestion(suggestion);
        }
        self.report(diagnostic);
        cursor.skip_node();
    }

    fn parse_using(&mut self, cursor: &mut EventCursor, key: &ScalarEvent) -> Option<Declaration> {
        let module = self.parse_string(cursor, "Module");
        let mut declaration = UsingDeclaration::default();
        self.parse_entries(cursor, "`Using` entry", USING_KEYS, |this, cursor, key| {
            match key.value.as_str() {
                "Description" => declaration.description = this.parse_string(cursor, "Description"),
                _ => return false,
            }
            true
        });
        log::trace!("Module dependency at {}", key.location);
        declaration.module = module?;
        Some(Declaration::Using(declaration))
    }

    fn parse_parameter(&mut self, cursor: &mut EventCursor, _key: &ScalarEvent) -> Option<Declaration> {
        let name = self.parse_string(cursor, "Parameter");
        let mut d = ParameterDeclaration::default();
        self.parse_entries(cursor, "`Parameter` declaration", PARAMETER_KEYS, |this, cursor, key| {
            let k = key.value.as_str();
            match k {
                "Section" => d.section = this.parse_string(cursor, k),
                "Label" => d.label = this.parse_string(cursor, k),
                "Description" => d.description = this.parse_string(cursor, k),
                "Type" => d.r#type = this.parse_string(cursor, k),
                "Scope" => d.scope = this.parse_string_list(cursor, k, true).unwrap_or_default(),
                "NoEcho" => d.no_echo = this.parse_bool(cursor, k),
                "Default" => d.default = this.parse_string(cursor, k),
                "ConstraintDescription" => d.constraint_description = this.parse_string(cursor, k),
                "AllowedPattern" => d.allowed_pattern = this.parse_string(cursor, k),
                "AllowedValues" => {
                    d.allowed_values = this.parse_string_list(cursor, k, false).unwrap_or_default()
                }
                "MaxLength" => d.max_length = this.parse_string(cursor, k),
                "MaxValue" => d.max_value = this.parse_string(cursor, k),
                "MinLength" => d.min_length = this.parse_string(cursor, k),
                "MinValue" => d.min_value = this.parse_string(cursor, k),
                "Allow" => d.allow = this.parse_string_list(cursor, k, true).unwrap_or_default(),
                _ => return false,
            }
            true
        });
        d.name = name?;
        Some(Declaration::Parameter(d))
    }

    fn parse_import(&mut self, cursor: &mut EventCursor, key: &ScalarEvent) -> Option<Declaration> {
        let name = self.parse_string(cursor, "Import");
        let mut module = None;
        let mut d = ImportDeclaration::default();
        let seen = self.parse_entries(cursor, "`Import` declaration", IMPORT_KEYS, |this, cursor, key| {
            let k = key.value.as_str();
            match k {
                "Module" => module = this.parse_string(cursor, k),
                "Description" => d.description = this.parse_string(cursor, k),
                "Type" => d.r#type = this.parse_string(cursor, k),
                "Scope" => d.scope = this.parse_string_list(cursor, k, true).unwrap_or_default(),
                "Allow" => d.allow = this.parse_string_list(cursor, k, true).unwrap_or_default(),
                _ => return false,
            }
            true
        });
        let module = self.require(module, &seen, "Module", "`Import` declaration", &key.location);
        d.name = name?;
        d.module = module?;
        Some(Declaration::Import(d))
    }

    fn parse_variable(&mut self, cursor: &mut EventCursor, key: &ScalarEvent) -> Option<Declaration> {
        let name = self.parse_string(cursor, "Variable");
        let (mut description, mut r#type, mut scope, mut value) = (None, None, Vec::new(), None);
        let seen = self.parse_entries(cursor, "`Variable` declaration", VARIABLE_KEYS, |this, cursor, key| {
            let k = key.value.as_str();
            match k {
                "Description" => description = this.parse_string(cursor, k),
                "Type" => r#type = this.parse_string(cursor, k),
                "Scope" => scope = this.parse_string_list(cursor, k, true).unwrap_or_default(),
                "Value" => value = this.parse_expression(cursor),
                _ => return false,
            }
            true
        });
        let value = self.require(value, &seen, "Value", "`Variable` declaration", &key.location);
        Some(Declaration::Variable(VariableDeclaration {
            name: name?,
            description,
            r#type,
            scope,
            value: value?,
        }))
    }

    fn parse_group(&mut self, cursor: &mut EventCursor, _key: &ScalarEvent) -> Option<Declaration> {
        let name = self.parse_string(cursor, "Group");
        let mut d = GroupDeclaration::default();
        self.parse_entries(cursor, "`Group` declaration", GROUP_KEYS, |this, cursor, key| {
            match key.value.as_str() {
                "Description" => d.description = this.parse_string(cursor, "Description"),
                "Items" => d.items = this.parse_declaration_list(cursor, DeclarationContext::Items),
                _ => return false,
            }
            true
        });
        d.name = name?;
        Some(Declaration::Group(d))
    }

    fn parse_condition(&mut self, cursor: &mut EventCursor, key: &ScalarEvent) -> Option<Declaration> {
        let name = self.parse_string(cursor, "Condition");
        let (mut description, mut value) = (None, None);
        let seen = self.parse_entries(cursor, "`Condition` declaration", CONDITION_KEYS, |this, cursor, key| {
            match key.value.as_str() {
                "Description" => description = this.parse_string(cursor, "Description"),
                "Value" => value = this.parse_expression(cursor),
                _ => return false,
            }
            true
        });
        let value = self.require(value, &seen, "Value", "`Condition` declaration", &key.location);
        Some(Declaration::Condition(ConditionDeclaration {
            name: name?,
            description,
            value: value?,
        }))
    }

    fn parse_resource(&mut self, cursor: &mut EventCursor, _key: &ScalarEvent) -> Option<Declaration> {
        let name = self.parse_string(cursor, "Resource");
        let mut d = ResourceDeclaration::default();
        self.parse_entries(cursor, "`Resource` declaration", RESOURCE_KEYS, |this, cursor, key| {
            let k = key.value.as_str();
            match k {
                "Description" => d.description = this.parse_string(cursor, k),
                "Type" => d.r#type = this.parse_string(cursor, k),
                "Scope" => d.scope = this.parse_string_list(cursor, k, true).unwrap_or_default(),
                "Allow" => d.allow = this.parse_string_list(cursor, k, true).unwrap_or_default(),
                "Value" => d.value = this.parse_expression(cursor),
                "DependsOn" => d.depends_on = this.parse_string_list(cursor, k, false).unwrap_or_default(),
                "Properties" => d.properties = this.parse_object(cursor, "`Properties`"),
                "DefaultAttribute" => d.default_attribute = this.parse_string(cursor, k),
                "If" => d.condition = this.parse_expression(cursor),
                _ => return false,
            }
            true
        });
        d.name = name?;
        Some(Declaration::Resource(d))
    }

    fn parse_nested(&mut self, cursor: &mut EventCursor, key: &ScalarEvent) -> Option<Declaration> {
        let name = self.parse_string(cursor, "Nested");
        let mut module = None;
        let mut d = NestedDeclaration::default();
        let seen = self.parse_entries(cursor, "`Nested` declaration", NESTED_KEYS, |this, cursor, key| {
            let k = key.value.as_str();
            match k {
                "Description" => d.description = this.parse_string(cursor, k),
                "Module" => module = this.parse_string(cursor, k),
                "DependsOn" => d.depends_on = this.parse_string_list(cursor, k, false).unwrap_or_default(),
                "Parameters" => d.parameters = this.parse_object(cursor, "`Parameters`"),
                _ => return false,
            }
            true
        });
        let module = self.require(module, &seen, "Module", "`Nested` declaration", &key.location);
        d.name = name?;
        d.module = module?;
        Some(Declaration::Nested(d))
    }

    fn parse_package(&mut self, cursor: &mut EventCursor, key: &ScalarEvent) -> Option<Declaration> {
        let name = self.parse_string(cursor, "Package");
        let mut files = None;
        let mut d = PackageDeclaration::default();
        let seen = self.parse_entries(cursor, "`Package` declaration", PACKAGE_KEYS, |this, cursor, key| {
            let k = key.value.as_str();
            match k {
                "Description" => d.description = this.parse_string(cursor, k),
                "Scope" => d.scope = this.parse_string_list(cursor, k, true).unwrap_or_default(),
                "Files" => files = this.parse_string(cursor, k),
                _ => return false,
            }
            true
        });
        let files = self.require(files, &seen, "Files", "`Package` declaration", &key.location);
        d.name = name?;
        d.files = files?;
        Some(Declaration::Package(d))
    }

    fn parse_function(&mut self, cursor: &mut EventCursor, _key: &ScalarEvent) -> Option<Declaration> {
        let name = self.parse_string(cursor, "Function");
        let mut d = FunctionDeclaration::default();
        self.parse_entries(cursor, "`Function` declaration", FUNCTION_KEYS, |this, cursor, key| {
            let k = key.value.as_str();
            match k {
                "Description" => d.description = this.parse_string(cursor, k),
                "Scope" => d.scope = this.parse_string_list(cursor, k, true).unwrap_or_default(),
                "If" => d.condition = this.parse_expression(cursor),
                "Memory" => d.memory = this.parse_expression(cursor),
                "Timeout" => d.timeout = this.parse_expression(cursor),
                "Project" => d.project = this.parse_string(cursor, k),
                "Runtime" => d.runtime = this.parse_string(cursor, k),
                "Language" => d.language = this.parse_string(cursor, k),
                "Handler" => d.handler = this.parse_string(cursor, k),
                "Environment" => d.environment = this.parse_object(cursor, "`Environment`"),
                "Properties" => d.properties = this.parse_object(cursor, "`Properties`"),
                "Sources" => d.sources = this.parse_declaration_list(cursor, DeclarationContext::Sources),
                _ => return false,
            }
            true
        });
        d.name = name?;
        Some(Declaration::Function(d))
    }

    fn parse_mapping_declaration(&mut self, cursor: &mut EventCursor, key: &ScalarEvent) -> Option<Declaration> {
        let name = self.parse_string(cursor, "Mapping");
        let (mut description, mut value) = (None, None);
        let seen = self.parse_entries(cursor, "`Mapping` declaration", MAPPING_KEYS, |this, cursor, key| {
            match key.value.as_str() {
                "Description" => description = this.parse_string(cursor, "Description"),
                "Value" => value = this.parse_object(cursor, "the value of a `Mapping`"),
                _ => return false,
            }
            true
        });
        let value = self.require(value, &seen, "Value", "`Mapping` declaration", &key.location);
        Some(Declaration::Mapping(MappingDeclaration {
            name: name?,
            description,
            value: value?,
        }))
    }

    fn parse_resource_type(&mut self, cursor: &mut EventCursor, key: &ScalarEvent) -> Option<Declaration> {
        let name = self.parse_string(cursor, "ResourceType");
        let mut handler = None;
        let mut d = ResourceTypeDeclaration::default();
        let seen = self.parse_entries(
            cursor,
            "`ResourceType` declaration",
            RESOURCE_TYPE_KEYS,
            |this, cursor, key| {
                let k = key.value.as_str();
                match k {
                    "Description" => d.description = this.parse_string(cursor, k),
                    "Handler" => handler = this.parse_string(cursor, k),
                    "Properties" => {
                        d.properties = this.parse_mapping_list(cursor, k, Self::parse_type_property)
                    }
                    "Attributes" => {
                        d.attributes = this.parse_mapping_list(cursor, k, Self::parse_type_attribute)
                    }
                    _ => return false,
                }
                true
            },
        );
        let handler = self.require(handler, &seen, "Handler", "`ResourceType` declaration", &key.location);
        d.name = name?;
        d.handler = handler?;
        Some(Declaration::ResourceType(d))
    }

    // A list whose entries are mappings read by `parse`.
    fn parse_mapping_list<T>(
        &mut self,
        cursor: &mut EventCursor,
        key: &str,
        parse: fn(&mut Self, &mut EventCursor) -> Option<T>,
    ) -> Vec<T> {
        if !cursor.at_sequence() || cursor.peek_tag().is_some() {
            self.unexpected(cursor, &format!("a list for `{key}`"));
            return Vec::new();
        }
        cursor.next();
        let mut items = Vec::new();
        while !cursor.at_sequence_end() && cursor.peek().is_some() {
            if !cursor.at_mapping() || cursor.peek_tag().is_some() {
                self.unexpected(cursor, &format!("a mapping in `{key}`"));
                continue;
            }
            items.extend(parse(self, cursor));
        }
        cursor.next();
        items
    }

    fn parse_type_property(&mut self, cursor: &mut EventCursor) -> Option<ResourceTypeProperty> {
        let location = cursor.current_location();
        cursor.next();
        let mut name = None;
        let mut property = ResourceTypeProperty::default();
        let seen = self.parse_entries(
            cursor,
            "resource type property",
            RESOURCE_TYPE_PROPERTY_KEYS,
            |this, cursor, key| {
                let k = key.value.as_str();
                match k {
                    "Name" => name = this.parse_string(cursor, k),
                    "Description" => property.description = this.parse_string(cursor, k),
                    "Type" => property.r#type = this.parse_string(cursor, k),
                    "Required" => property.required = this.parse_bool(cursor, k).unwrap_or_default(),
                    _ => return false,
                }
                true
            },
        );
        property.name = self.require(name, &seen, "Name", "resource type property", &location)?;
        Some(property)
    }

    fn parse_type_attribute(&mut self, cursor: &mut EventCursor) -> Option<ResourceTypeAttribute> {
        let location = cursor.current_location();
        cursor.next();
        let mut name = None;
        let mut attribute = ResourceTypeAttribute::default();
        let seen = self.parse_entries(
            cursor,
            "resource type attribute",
            RESOURCE_TYPE_ATTRIBUTE_KEYS,
            |this, cursor, key| {
                let k = key.value.as_str();
                match k {
                    "Name" => name = this.parse_string(cursor, k),
                    "Description" => attribute.description = this.parse_string(cursor, k),
                    "Type" => attribute.r#type = this.parse_string(cursor, k),
                    _ => return false,
                }
                true
            },
        );
        attribute.name = self.require(name, &seen, "Name", "resource type attribute", &location)?;
        Some(attribute)
    }

    fn parse_macro(&mut self, cursor: &mut EventCursor, key: &ScalarEvent) -> Option<Declaration> {
        let name = self.parse_string(cursor, "Macro");
        let (mut description, mut handler) = (None, None);
        let seen = self.parse_entries(cursor, "`Macro` declaration", MACRO_KEYS, |this, cursor, key| {
            match key.value.as_str() {
                "Description" => description = this.parse_string(cursor, "Description"),
                "Handler" => handler = this.parse_string(cursor, "Handler"),
                _ => return false,
            }
            true
        });
        let handler = self.require(handler, &seen, "Handler", "`Macro` declaration", &key.location);
        Some(Declaration::Macro(MacroDeclaration {
            name: name?,
            description,
            handler: handler?,
        }))
    }

    fn parse_api(&mut self, cursor: &mut EventCursor, _key: &ScalarEvent) -> Option<Declaration> {
        let api = self.parse_string(cursor, "Api");
        let mut d = ApiSource::default();
        self.parse_entries(cursor, "`Api` source", API_KEYS, |this, cursor, key| {
            let k = key.value.as_str();
            match k {
                "Integration" => d.integration = this.parse_string(cursor, k),
                "OperationName" => d.operation_name = this.parse_string(cursor, k),
                "ApiKeyRequired" => d.api_key_required = this.parse_bool(cursor, k),
                "AuthorizationType" => d.authorization_type = this.parse_string(cursor, k),
                "AuthorizationScopes" => {
                    d.authorization_scopes = this.parse_string_list(cursor, k, false).unwrap_or_default()
                }
                "Authorizer" => d.authorizer = this.parse_string(cursor, k),
                _ => return false,
            }
            true
        });
        d.api = api?;
        Some(Declaration::Api(d))
    }

    fn parse_schedule(&mut self, cursor: &mut EventCursor, _key: &ScalarEvent) -> Option<Declaration> {
        let expression = self.parse_expression(cursor);
        let mut name = None;
        self.parse_entries(cursor, "`Schedule` source", SCHEDULE_KEYS, |this, cursor, key| {
            match key.value.as_str() {
                "Name" => name = this.parse_string(cursor, "Name"),
                _ => return false,
            }
            true
        });
        Some(Declaration::Schedule(ScheduleSource {
            expression: expression?,
            name,
        }))
    }

    fn parse_s3(&mut self, cursor: &mut EventCursor, _key: &ScalarEvent) -> Option<Declaration> {
        let bucket = self.parse_string(cursor, "S3");
        let mut d = S3Source::default();
        self.parse_entries(cursor, "`S3` source", S3_KEYS, |this, cursor, key| {
            let k = key.value.as_str();
            match k {
                "Events" => d.events = this.parse_string_list(cursor, k, false).unwrap_or_default(),
                "Prefix" => d.prefix = this.parse_string(cursor, k),
                "Suffix" => d.suffix = this.parse_string(cursor, k),
                _ => return false,
            }
            true
        });
        d.bucket = bucket?;
        Some(Declaration::S3(d))
    }

    fn parse_slack_command(&mut self, cursor: &mut EventCursor, _key: &ScalarEvent) -> Option<Declaration> {
        let path = self.parse_string(cursor, "SlackCommand");
        self.parse_entries(cursor, "`SlackCommand` source", &[], |_, _, _| false);
        Some(Declaration::SlackCommand(SlackCommandSource { path: path? }))
    }

    fn parse_topic(&mut self, cursor: &mut EventCursor, _key: &ScalarEvent) -> Option<Declaration> {
        let topic = self.parse_string(cursor, "Topic");
        let mut filters = None;
        self.parse_entries(cursor, "`Topic` source", TOPIC_KEYS, |this, cursor, key| {
            match key.value.as_str() {
                "Filters" => filters = this.parse_object(cursor, "`Filters`"),
                _ => return false,
            }
            true
        });
        Some(Declaration::Topic(TopicSource {
            topic: topic?,
            filters,
        }))
    }

    fn parse_sqs(&mut self, cursor: &mut EventCursor, _key: &ScalarEvent) -> Option<Declaration> {
        let queue = self.parse_string(cursor, "Sqs");
        let mut batch_size = None;
        self.parse_entries(cursor, "`Sqs` source", SQS_KEYS, |this, cursor, key| {
            match key.value.as_str() {
                "BatchSize" => batch_size = this.parse_expression(cursor),
                _ => return false,
            }
            true
        });
        Some(Declaration::Sqs(SqsSource {
            queue: queue?,
            batch_size,
        }))
    }

    fn parse_alexa(&mut self, cursor: &mut EventCursor, _key: &ScalarEvent) -> Option<Declaration> {
        // `*` accepts any skill
        let skill = if cursor.peek_plain_key(0) == Some("*") {
            cursor.next();
            None
        } else {
            Some(self.parse_expression(cursor))
        };
        self.parse_entries(cursor, "`Alexa` source", &[], |_, _, _| false);
        let skill = match skill {
            Some(parsed) => Some(parsed?),
            None => None,
        };
        Some(Declaration::Alexa(AlexaSource { skill }))
    }

    fn parse_dynamo_db(&mut self, cursor: &mut EventCursor, _key: &ScalarEvent) -> Option<Declaration> {
        let table = self.parse_string(cursor, "DynamoDB");
        let mut d = DynamoDbSource::default();
        self.parse_entries(cursor, "`DynamoDB` source", STREAM_KEYS, |this, cursor, key| {
            let k = key.value.as_str();
            match k {
                "BatchSize" => d.batch_size = this.parse_expression(cursor),
                "StartingPosition" => d.starting_position = this.parse_string(cursor, k),
                "MaximumBatchingWindowInSeconds" => d.maximum_batching_window = this.parse_expression(cursor),
                _ => return false,
            }
            true
        });
        d.table = table?;
        Some(Declaration::DynamoDb(d))
    }

    fn parse_kinesis(&mut self, cursor: &mut EventCursor, _key: &ScalarEvent) -> Option<Declaration> {
        let stream = self.parse_string(cursor, "Kinesis");
        let mut d = KinesisSource::default();
        self.parse_entries(cursor, "`Kinesis` source", STREAM_KEYS, |this, cursor, key| {
            let k = key.value.as_str();
            match k {
                "BatchSize" => d.batch_size = this.parse_expression(cursor),
                "StartingPosition" => d.starting_position = this.parse_string(cursor, k),
                "MaximumBatchingWindowInSeconds" => d.maximum_batching_window = this.parse_expression(cursor),
                _ => return false,
            }
            true
        });
        d.stream = stream?;
        Some(Declaration::Kinesis(d))
    }

    fn parse_web_socket(&mut self, cursor: &mut EventCursor, _key: &ScalarEvent) -> Option<Declaration> {
        let route = self.parse_string(cursor, "WebSocket");
        let mut d = WebSocketSource::default();
        self.parse_entries(cursor, "`WebSocket` source", WEB_SOCKET_KEYS, |this, cursor, key| {
            let k = key.value.as_str();
            match k {
                "OperationName" => d.operation_name = this.parse_string(cursor, k),
                "ApiKeyRequired" => d.api_key_required = this.parse_bool(cursor, k),
                "AuthorizationType" => d.authorization_type = this.parse_string(cursor, k),
                "Authorizer" => d.authorizer = this.parse_string(cursor, k),
                _ => return false,
            }
            true
        });
        d.route = route?;
        Some(Declaration::WebSocket(d))
    }

    fn parse_event_bus(&mut self, cursor: &mut EventCursor, key: &ScalarEvent) -> Option<Declaration> {
        let bus = self.parse_string(cursor, "EventBus");
        let mut pattern = None;
        let seen = self.parse_entries(cursor, "`EventBus` source", EVENT_BUS_KEYS, |this, cursor, key| {
            match key.value.as_str() {
                "Pattern" => pattern = this.parse_object(cursor, "`Pattern`"),
                _ => return false,
            }
            true
        });
        let pattern = self.require(pattern, &seen, "Pattern", "`EventBus` source", &key.location);
        Some(Declaration::EventBus(EventBusSource {
            bus: bus?,
            pattern: pattern?,
        }))
    }
}
