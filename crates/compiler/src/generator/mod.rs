/*!
 * Copyright 2025 Release Workshop Ltd
 * Licensed under the Elastic License 2.0; you may not use this file except in compliance with the Elastic License 2.0.
 * See the LICENSE file in the project root for details.
 */
//! Code generator - lowers an analyzed module into a template and manifest
//!
//! This module handles:
//! - Expression lowering with position checks (`expressions`)
//! - Parameters, conditions, mappings, resources and outputs (`declarations`)
//! - Functions, the module role and scoped environment (`functions`)
//! - Event sources, REST and WebSocket APIs (`events`)

mod declarations;
mod events;
mod expressions;
mod functions;
pub mod manifest;
pub mod template;

#[cfg(test)]
mod tests;

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Map, Value};

use crate::analyzer::SemanticModel;
use crate::ast::{Ast, Declaration, NodeId};
use crate::diagnostics::{Diagnostic, DiagnosticSink, ErrorCode};
use crate::error::{CompilerError, SerializationError};
use crate::resource_spec::ResourceSpecification;

pub use expressions::{literal_value, Position};
pub use manifest::{
    checksum, DependencyKind, FieldDescriptor, Manifest, ModuleDependency, OutputDescriptor,
    ParameterDescriptor, ParameterSection, ResourceTypeExport, MANIFEST_METADATA_KEY,
};
pub use template::{Template, TEMPLATE_FORMAT_VERSION};

use events::{RestRoute, WebSocketRoute};

/// Implicit parameter naming the bucket holding deployment artifacts.
pub const DEPLOYMENT_BUCKET_NAME: &str = "DeploymentBucketName";
/// Implicit parameter holding the deployment tier prefix.
pub const DEPLOYMENT_PREFIX: &str = "DeploymentPrefix";
/// IAM role shared by every function of the module.
pub const MODULE_ROLE: &str = "ModuleRole";

const DEFAULT_SECTION: &str = "Module Settings";
const DEPLOYMENT_SECTION: &str = "Deployment Settings";

#[derive(Debug, Clone)]
pub struct GeneratorOptions {
    pub tool_version: Option<String>,
    /// Creation time recorded in the manifest.
    pub timestamp: DateTime<Utc>,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            tool_version: None,
            timestamp: Utc::now(),
        }
    }
}

/// Output of a successful generation.
#[derive(Debug, Clone, PartialEq)]
pub struct Generated {
    pub template: Template,
    pub manifest: Manifest,
}

/// Generates the template and manifest for an analyzed module.
///
/// Returns `Ok(None)` when a user error was reported to `sink`, such as an
/// intrinsic function in a position that does not allow it.
///
/// # Errors
///
/// Returns `CompilerError::Internal` when the tree and model disagree or the
/// generated template violates the template schema.
pub fn generate(
    ast: &Ast,
    model: &SemanticModel,
    resource_spec: Option<&ResourceSpecification>,
    options: &GeneratorOptions,
    sink: &mut dyn DiagnosticSink,
) -> Result<Option<Generated>, CompilerError> {
    let root = ast
        .root()
        .ok_or_else(|| CompilerError::internal("the module has no root declaration"))?;
    let Some(Declaration::Module(module)) = ast.declaration(root) else {
        return Err(CompilerError::internal("the root node is not a module declaration"));
    };
    log::debug!("Generating template for module '{}'", model.module());

    let mut generator = Generator::new(ast, model, resource_spec, options, sink);
    generator.add_deployment_parameters();
    for &using in &module.using {
        generator.generate_declaration(using)?;
    }
    for &item in &module.items {
        generator.generate_declaration(item)?;
    }
    generator.generate_rest_api()?;
    generator.generate_web_socket()?;
    generator.generate_module_role()?;
    generator.add_parameter_interface();

    if generator.errors > 0 {
        log::debug!("Generation reported {} errors", generator.errors);
        return Ok(None);
    }

    let Generator {
        mut template,
        mut manifest,
        ..
    } = generator;
    template.description = module.description.clone();
    template.transform = module.transforms.clone();

    let value = template.to_value()?;
    template.validate().map_err(|err| {
        CompilerError::internal(format!("generated template violates its schema: {err}"))
    })?;
    manifest.hash = checksum(&value)?;
    manifest.description = module.description.clone();
    let embedded = serde_json::to_value(&manifest).map_err(SerializationError::from)?;
    template
        .metadata
        .insert(MANIFEST_METADATA_KEY.to_string(), embedded);
    log::debug!(
        "Generated {} resources and {} outputs",
        template.resources.len(),
        template.outputs.len()
    );
    Ok(Some(Generated { template, manifest }))
}

pub(crate) struct Generator<'a> {
    ast: &'a Ast,
    model: &'a SemanticModel,
    resource_spec: Option<&'a ResourceSpecification>,
    sink: &'a mut dyn DiagnosticSink,
    errors: usize,
    template: Template,
    manifest: Manifest,
    /// Parameter logical ids per interface section, in declaration order.
    sections: Vec<(String, Vec<String>)>,
    labels: Map<String, Value>,
    /// Policy statements of the module role.
    statements: Vec<Value>,
    has_functions: bool,
    rest_routes: Vec<RestRoute>,
    web_socket_routes: Vec<WebSocketRoute>,
}

impl<'a> Generator<'a> {
    fn new(
        ast: &'a Ast,
        model: &'a SemanticModel,
        resource_spec: Option<&'a ResourceSpecification>,
        options: &GeneratorOptions,
        sink: &'a mut dyn DiagnosticSink,
    ) -> Self {
        let manifest = Manifest {
            module: model.module().to_string(),
            description: None,
            hash: String::new(),
            date: options.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
            tool_version: options.tool_version.clone(),
            parameter_sections: Vec::new(),
            dependencies: Vec::new(),
            resource_types: Vec::new(),
            outputs: Vec::new(),
        };
        Self {
            ast,
            model,
            resource_spec,
            sink,
            errors: 0,
            template: Template::default(),
            manifest,
            sections: Vec::new(),
            labels: Map::new(),
            statements: Vec::new(),
            has_functions: false,
            rest_routes: Vec::new(),
            web_socket_routes: Vec::new(),
        }
    }

    fn error(&mut self, code: ErrorCode, message: impl Into<String>, id: NodeId) {
        self.errors += 1;
        self.sink
            .emit(Diagnostic::error(code, message).at(self.ast.location(id)));
    }

    fn logical_id(&self, id: NodeId) -> Result<&'a str, CompilerError> {
        self.model
            .logical_id(id)
            .ok_or_else(|| CompilerError::internal(format!("node {id} has no logical id")))
    }

    fn full_name(&self, id: NodeId) -> Result<&'a str, CompilerError> {
        self.model
            .symbol(id)
            .map(|symbol| symbol.full_name.as_str())
            .ok_or_else(|| CompilerError::internal(format!("node {id} is not declared")))
    }

    fn binding(&self, id: NodeId) -> Result<NodeId, CompilerError> {
        self.model
            .binding(id)
            .ok_or_else(|| CompilerError::internal(format!("node {id} has no binding")))
    }

    fn name_binding(&self, id: NodeId, name: &str) -> Result<NodeId, CompilerError> {
        self.model.name_binding(id, name).ok_or_else(|| {
            CompilerError::internal(format!("`{name}` used by node {id} has no binding"))
        })
    }

    fn add_resource(&mut self, logical_id: impl Into<String>, resource: Value) {
        self.template.resources.insert(logical_id.into(), resource);
    }

    fn add_deployment_parameters(&mut self) {
        self.template.parameters.insert(
            DEPLOYMENT_BUCKET_NAME.to_string(),
            json!({ "Type": "String", "Description": "Deployment S3 bucket name" }),
        );
        self.template.parameters.insert(
            DEPLOYMENT_PREFIX.to_string(),
            json!({ "Type": "String", "Description": "Deployment tier prefix" }),
        );
    }

    /// Records a parameter under its interface section.
    fn add_to_section(&mut self, section: &str, logical_id: &str, label: Option<&str>) {
        match self.sections.iter_mut().find(|(title, _)| title == section) {
            Some((_, parameters)) => parameters.push(logical_id.to_string()),
            None => self
                .sections
                .push((section.to_string(), vec![logical_id.to_string()])),
        }
        if let Some(label) = label {
            self.labels
                .insert(logical_id.to_string(), json!({ "default": label }));
        }
    }

    fn add_parameter_interface(&mut self) {
        self.sections.push((
            DEPLOYMENT_SECTION.to_string(),
            vec![DEPLOYMENT_BUCKET_NAME.to_string(), DEPLOYMENT_PREFIX.to_string()],
        ));
        let groups: Vec<Value> = self
            .sections
            .iter()
            .map(|(title, parameters)| {
                json!({ "Label": { "default": title }, "Parameters": parameters })
            })
            .collect();
        let mut interface = Map::new();
        interface.insert("ParameterGroups".to_string(), Value::Array(groups));
        if !self.labels.is_empty() {
            interface.insert(
                "ParameterLabels".to_string(),
                Value::Object(std::mem::take(&mut self.labels)),
            );
        }
        self.template.metadata.insert(
            "AWS::CloudFormation::Interface".to_string(),
            Value::Object(interface),
        );
    }
}

/// `{"Ref": name}`
pub(crate) fn reference(name: &str) -> Value {
    json!({ "Ref": name })
}

/// `{"Fn::GetAtt": [name, attribute]}`
pub(crate) fn attribute(name: &str, attribute: &str) -> Value {
    json!({ "Fn::GetAtt": [name, attribute] })
}

/// `{"Fn::Sub": text}`
pub(crate) fn sub(text: impl Into<String>) -> Value {
    json!({ "Fn::Sub": text.into() })
}
