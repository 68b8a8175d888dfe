/*!
 * Copyright 2025 Release Workshop Ltd
 * Licensed under the Elastic License 2.0; you may not use this file except in compliance with the Elastic License 2.0.
 * See the LICENSE file in the project root for details.
 */
use serde_json::{json, Map, Value};

use crate::analyzer;
use crate::ast::{
    Declaration, LiteralType, MacroDeclaration, NestedDeclaration, NodeId, ParameterDeclaration,
    ResourceDeclaration, ResourceTypeDeclaration,
};
use crate::error::CompilerError;
use crate::generator::expressions::literal_value;
use crate::generator::{
    attribute, reference, sub, DependencyKind, FieldDescriptor, Generator, OutputDescriptor,
    ParameterDescriptor, ParameterSection, Position, ResourceTypeExport, DEFAULT_SECTION,
    DEPLOYMENT_BUCKET_NAME, DEPLOYMENT_PREFIX,
};
use crate::version::ModuleInfo;

/// Parameter types the template accepts as declared; any other type is
/// passed as a `String` holding an ARN.
const NATIVE_PARAMETER_TYPES: &[&str] = &["String", "Number", "List<Number>", "CommaDelimitedList"];
const NATIVE_PARAMETER_PREFIXES: &[&str] = &["AWS::EC2::", "AWS::Route53::", "AWS::SSM::Parameter::", "List<AWS::"];

/// Types whose ARN is the `Arn` attribute, used when no resource
/// specification is loaded.
const ARN_ATTRIBUTE_TYPES: &[&str] = &[
    "AWS::DynamoDB::Table",
    "AWS::Events::EventBus",
    "AWS::Kinesis::Stream",
    "AWS::Lambda::Function",
    "AWS::S3::Bucket",
    "AWS::SQS::Queue",
    "AWS::StepFunctions::StateMachine",
];

fn parameter_type(r#type: Option<&str>) -> &str {
    match r#type {
        Some(name)
            if NATIVE_PARAMETER_TYPES.contains(&name)
                || NATIVE_PARAMETER_PREFIXES.iter().any(|prefix| name.starts_with(prefix)) =>
        {
            name
        }
        _ => "String",
    }
}

fn declared_type(declaration: &Declaration) -> Option<String> {
    match declaration {
        Declaration::Parameter(d) => d.r#type.clone(),
        Declaration::Import(d) => d.r#type.clone(),
        Declaration::Variable(d) => d.r#type.clone(),
        Declaration::Resource(d) => d.r#type.clone(),
        Declaration::Function(_) => Some("AWS::Lambda::Function".to_string()),
        Declaration::Nested(_) => Some("AWS::CloudFormation::Stack".to_string()),
        _ => None,
    }
}

impl<'a> Generator<'a> {
    pub(super) fn generate_declaration(&mut self, id: NodeId) -> Result<(), CompilerError> {
        let ast = self.ast;
        let declaration = ast
            .declaration(id)
            .ok_or_else(|| CompilerError::internal(format!("node {id} is not a declaration")))?;
        log::trace!("Generating {} {id}", declaration.kind().describe());

        match declaration {
            Declaration::Module(_) => {
                return Err(CompilerError::internal("module declaration inside a module"))
            }
            Declaration::Using(using) => {
                self.manifest
                    .add_dependency(using.module.clone(), DependencyKind::Shared);
            }
            Declaration::Parameter(parameter) => self.generate_parameter(id, parameter)?,
            Declaration::Import(import) => {
                let module = import
                    .module
                    .split_once("::")
                    .map_or(import.module.as_str(), |(module, _)| module);
                self.manifest
                    .add_dependency(module.to_string(), DependencyKind::Root);
            }
            Declaration::Variable(_) | Declaration::Package(_) => {}
            Declaration::Group(group) => {
                for &item in &group.items {
                    self.generate_declaration(item)?;
                }
            }
            Declaration::Condition(condition) => {
                let value = self.lower(condition.value, Position::Condition)?;
                let name = self.logical_id(id)?;
                self.template.conditions.insert(name.to_string(), value);
            }
            Declaration::Resource(resource) => self.generate_resource(id, resource)?,
            Declaration::Nested(nested) => self.generate_nested(id, nested)?,
            Declaration::Function(function) => self.generate_function(id, function)?,
            Declaration::Mapping(mapping) => {
                let value = self.lower(mapping.value, Position::Mapping)?;
                let name = self.logical_id(id)?;
                self.template.mappings.insert(name.to_string(), value);
            }
            Declaration::ResourceType(resource_type) => self.generate_resource_type(id, resource_type)?,
            Declaration::Macro(declaration) => self.generate_macro(id, declaration)?,
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
            | Declaration::EventBus(_) => {
                return Err(CompilerError::internal(format!(
                    "event source {id} outside a function"
                )))
            }
        }
        self.generate_public_output(id, declaration)
    }

    fn generate_parameter(
        &mut self,
        id: NodeId,
        parameter: &ParameterDeclaration,
    ) -> Result<(), CompilerError> {
        let logical_id = self.logical_id(id)?;
        let r#type = parameter_type(parameter.r#type.as_deref());

        let mut definition = Map::new();
        definition.insert("Type".to_string(), json!(r#type));
        if let Some(description) = &parameter.description {
            definition.insert("Description".to_string(), json!(description));
        }
        if let Some(default) = &parameter.default {
            definition.insert("Default".to_string(), json!(default));
        }
        if let Some(no_echo) = parameter.no_echo {
            definition.insert("NoEcho".to_string(), json!(no_echo));
        }
        if !parameter.allowed_values.is_empty() {
            definition.insert("AllowedValues".to_string(), json!(parameter.allowed_values));
        }
        if let Some(pattern) = &parameter.allowed_pattern {
            definition.insert("AllowedPattern".to_string(), json!(pattern));
        }
        if let Some(description) = &parameter.constraint_description {
            definition.insert("ConstraintDescription".to_string(), json!(description));
        }
        for (key, bound) in [
            ("MaxLength", &parameter.max_length),
            ("MaxValue", &parameter.max_value),
            ("MinLength", &parameter.min_length),
            ("MinValue", &parameter.min_value),
        ] {
            if let Some(bound) = bound {
                definition.insert(key.to_string(), literal_value(bound, LiteralType::Integer));
            }
        }
        self.template
            .parameters
            .insert(logical_id.to_string(), Value::Object(definition));

        let section = parameter.section.as_deref().unwrap_or(DEFAULT_SECTION);
        self.add_to_section(section, logical_id, parameter.label.as_deref());
        let descriptor = ParameterDescriptor {
            name: logical_id.to_string(),
            r#type: parameter
                .r#type
                .clone()
                .unwrap_or_else(|| "String".to_string()),
            label: parameter.label.clone(),
            default: parameter.default.clone(),
        };
        let sections = &mut self.manifest.parameter_sections;
        match sections.iter_mut().find(|s| s.title == section) {
            Some(existing) => existing.parameters.push(descriptor),
            None => sections.push(ParameterSection {
                title: section.to_string(),
                parameters: vec![descriptor],
            }),
        }
        Ok(())
    }

    fn generate_resource(&mut self, id: NodeId, resource: &ResourceDeclaration) -> Result<(), CompilerError> {
        let Some(declared) = resource.r#type.as_deref() else {
            // a resource with a `Value` is an existing resource
            return Ok(());
        };
        let logical_id = self.logical_id(id)?;

        let mut properties = Map::new();
        let r#type = match self.local_resource_type(declared) {
            Some((type_id, resource_type)) => {
                let token = self.handler_value(type_id, &resource_type.handler)?;
                properties.insert("ServiceToken".to_string(), token);
                format!("Custom::{}", analyzer::logical_id(declared))
            }
            None if declared.starts_with("AWS::") || declared.starts_with("Custom::") => {
                declared.to_string()
            }
            None => {
                let token = json!({
                    "Fn::ImportValue": sub(format!("${{{DEPLOYMENT_PREFIX}}}{declared}"))
                });
                properties.insert("ServiceToken".to_string(), token);
                format!("Custom::{}", analyzer::logical_id(declared))
            }
        };
        if let Some(declared_properties) = resource.properties {
            if let Value::Object(entries) = self.lower(declared_properties, Position::Value)? {
                properties.extend(entries);
            }
        }

        let mut definition = Map::new();
        definition.insert("Type".to_string(), json!(r#type));
        if !properties.is_empty() {
            definition.insert("Properties".to_string(), Value::Object(properties));
        }
        let depends_on = self.depends_on(id, &resource.depends_on)?;
        if !depends_on.is_empty() {
            definition.insert("DependsOn".to_string(), json!(depends_on));
        }
        self.add_implicit_condition(id, resource.condition)?;
        if let Some(condition) = self.declaration_condition(id, resource.condition)? {
            definition.insert("Condition".to_string(), json!(condition));
        }
        self.add_resource(logical_id, Value::Object(definition));
        Ok(())
    }

    fn local_resource_type(&self, name: &str) -> Option<(NodeId, &'a ResourceTypeDeclaration)> {
        let symbol = self.model.symbol_by_full_name(name)?;
        match self.ast.declaration(symbol.node)? {
            Declaration::ResourceType(declaration) => Some((symbol.node, declaration)),
            _ => None,
        }
    }

    /// ARN of the function or topic handling a resource type or macro.
    fn handler_value(&self, declaration: NodeId, handler: &str) -> Result<Value, CompilerError> {
        let target = self.name_binding(declaration, handler)?;
        let logical_id = self.logical_id(target)?;
        match self.ast.declaration(target) {
            Some(Declaration::Function(_)) => Ok(attribute(logical_id, "Arn")),
            Some(Declaration::Resource(_)) => Ok(reference(logical_id)),
            _ => Err(CompilerError::internal(format!(
                "handler `{handler}` is not a function or topic"
            ))),
        }
    }

    pub(super) fn depends_on(&self, id: NodeId, names: &[String]) -> Result<Vec<String>, CompilerError> {
        names
            .iter()
            .map(|name| {
                let target = self.name_binding(id, name)?;
                Ok(self.logical_id(target)?.to_string())
            })
            .collect()
    }

    /// Adds the generated condition of a declaration whose `If` is inline.
    pub(super) fn add_implicit_condition(
        &mut self,
        id: NodeId,
        condition: Option<NodeId>,
    ) -> Result<(), CompilerError> {
        let (Some(condition), Some(name)) = (condition, self.model.implicit_condition(id)) else {
            return Ok(());
        };
        let value = self.lower(condition, Position::Condition)?;
        self.template.conditions.insert(name.to_string(), value);
        Ok(())
    }

    /// Name of the condition a declaration is deployed under.
    pub(super) fn declaration_condition(
        &self,
        id: NodeId,
        condition: Option<NodeId>,
    ) -> Result<Option<&'a str>, CompilerError> {
        let Some(condition) = condition else {
            return Ok(None);
        };
        if let Some(name) = self.model.implicit_condition(id) {
            return Ok(Some(name));
        }
        let target = self.binding(condition)?;
        Ok(Some(self.logical_id(target)?))
    }

    fn generate_nested(&mut self, id: NodeId, nested: &NestedDeclaration) -> Result<(), CompilerError> {
        let logical_id = self.logical_id(id)?;
        let info = ModuleInfo::try_parse(&nested.module).ok_or_else(|| {
            CompilerError::internal(format!("invalid nested module `{}`", nested.module))
        })?;
        let path = info.template_path().ok_or_else(|| {
            CompilerError::internal(format!("nested module `{}` has no version", nested.module))
        })?;
        let url = match info.origin() {
            Some(origin) => json!(format!("https://{origin}.s3.amazonaws.com/{path}")),
            None => sub(format!(
                "https://${{{DEPLOYMENT_BUCKET_NAME}}}.s3.amazonaws.com/{path}"
            )),
        };

        let mut parameters = Map::new();
        parameters.insert(DEPLOYMENT_BUCKET_NAME.to_string(), reference(DEPLOYMENT_BUCKET_NAME));
        parameters.insert(DEPLOYMENT_PREFIX.to_string(), reference(DEPLOYMENT_PREFIX));
        if let Some(declared) = nested.parameters {
            if let Value::Object(entries) = self.lower(declared, Position::Value)? {
                parameters.extend(entries);
            }
        }

        let mut definition = Map::new();
        definition.insert("Type".to_string(), json!("AWS::CloudFormation::Stack"));
        definition.insert(
            "Properties".to_string(),
            json!({ "TemplateURL": url, "Parameters": parameters }),
        );
        let depends_on = self.depends_on(id, &nested.depends_on)?;
        if !depends_on.is_empty() {
            definition.insert("DependsOn".to_string(), json!(depends_on));
        }
        self.add_resource(logical_id, Value::Object(definition));
        self.manifest
            .add_dependency(info.to_string(), DependencyKind::Nested);
        Ok(())
    }

    fn generate_resource_type(
        &mut self,
        id: NodeId,
        resource_type: &ResourceTypeDeclaration,
    ) -> Result<(), CompilerError> {
        let logical_id = self.logical_id(id)?;
        let mut output = Map::new();
        if let Some(description) = &resource_type.description {
            output.insert("Description".to_string(), json!(description));
        }
        output.insert(
            "Value".to_string(),
            self.handler_value(id, &resource_type.handler)?,
        );
        output.insert(
            "Export".to_string(),
            json!({ "Name": sub(format!("${{{DEPLOYMENT_PREFIX}}}{}", resource_type.name)) }),
        );
        self.template
            .outputs
            .insert(logical_id.to_string(), Value::Object(output));

        self.manifest.resource_types.push(ResourceTypeExport {
            r#type: resource_type.name.clone(),
            description: resource_type.description.clone(),
            properties: resource_type
                .properties
                .iter()
                .map(|property| FieldDescriptor {
                    name: property.name.clone(),
                    description: property.description.clone(),
                    r#type: property.r#type.clone().unwrap_or_else(|| "String".to_string()),
                    required: property.required,
                })
                .collect(),
            attributes: resource_type
                .attributes
                .iter()
                .map(|attribute| FieldDescriptor {
                    name: attribute.name.clone(),
                    description: attribute.description.clone(),
                    r#type: attribute.r#type.clone().unwrap_or_else(|| "String".to_string()),
                    required: false,
                })
                .collect(),
        });
        Ok(())
    }

    fn generate_macro(&mut self, id: NodeId, declaration: &MacroDeclaration) -> Result<(), CompilerError> {
        let logical_id = self.logical_id(id)?;
        let mut properties = Map::new();
        properties.insert(
            "Name".to_string(),
            sub(format!("${{{DEPLOYMENT_PREFIX}}}{}", declaration.name)),
        );
        if let Some(description) = &declaration.description {
            properties.insert("Description".to_string(), json!(description));
        }
        properties.insert(
            "FunctionName".to_string(),
            self.handler_value(id, &declaration.handler)?,
        );
        self.add_resource(
            logical_id,
            json!({ "Type": "AWS::CloudFormation::Macro", "Properties": properties }),
        );
        Ok(())
    }

    /// Value a declaration stands for in outputs and environment variables.
    pub(super) fn declaration_value(&mut self, id: NodeId) -> Result<Value, CompilerError> {
        let logical_id = self.logical_id(id)?;
        match self.ast.declaration(id) {
            Some(Declaration::Function(_)) => Ok(attribute(logical_id, "Arn")),
            Some(Declaration::Resource(resource)) if resource.value.is_none() => {
                Ok(match &resource.default_attribute {
                    Some(name) => attribute(logical_id, name),
                    None => reference(logical_id),
                })
            }
            _ => self.reference_value(id, Position::Value, id),
        }
    }

    /// ARN of a declaration, for grants and event-source subscriptions.
    pub(super) fn arn_value(&mut self, id: NodeId) -> Result<Value, CompilerError> {
        let logical_id = self.logical_id(id)?;
        match self.ast.declaration(id) {
            Some(Declaration::Resource(resource)) if resource.value.is_none() => {
                let has_arn = resource.r#type.as_deref().is_some_and(|name| {
                    match self.resource_spec.and_then(|spec| spec.resource_type(name)) {
                        Some(spec) => spec.has_attribute("Arn"),
                        None => ARN_ATTRIBUTE_TYPES.contains(&name),
                    }
                });
                Ok(if has_arn {
                    attribute(logical_id, "Arn")
                } else {
                    reference(logical_id)
                })
            }
            Some(Declaration::Function(_)) => Ok(attribute(logical_id, "Arn")),
            _ => self.reference_value(id, Position::Value, id),
        }
    }

    /// Condition a declaration is deployed under, if any.
    pub(super) fn condition_of(&self, id: NodeId) -> Result<Option<&'a str>, CompilerError> {
        match self.ast.declaration(id) {
            Some(Declaration::Resource(resource)) => self.declaration_condition(id, resource.condition),
            Some(Declaration::Function(function)) => self.declaration_condition(id, function.condition),
            _ => Ok(None),
        }
    }

    fn generate_public_output(&mut self, id: NodeId, declaration: &Declaration) -> Result<(), CompilerError> {
        if !self.model.scope(id).is_some_and(|scope| scope.public) {
            return Ok(());
        }
        let logical_id = self.logical_id(id)?;
        let full_name = self.full_name(id)?;

        let mut output = Map::new();
        if let Some(description) = declaration.description() {
            output.insert("Description".to_string(), json!(description));
        }
        output.insert("Value".to_string(), self.declaration_value(id)?);
        output.insert(
            "Export".to_string(),
            json!({ "Name": sub(format!("${{AWS::StackName}}::{full_name}")) }),
        );
        if let Some(condition) = self.condition_of(id)? {
            output.insert("Condition".to_string(), json!(condition));
        }
        self.template
            .outputs
            .insert(logical_id.to_string(), Value::Object(output));
        self.manifest.outputs.push(OutputDescriptor {
            name: full_name.to_string(),
            description: declaration.description().map(str::to_string),
            r#type: declared_type(declaration),
        });
        Ok(())
    }
}
