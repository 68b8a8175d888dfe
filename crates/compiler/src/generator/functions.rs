/*!
 * Copyright 2025 Release Workshop Ltd
 * Licensed under the Elastic License 2.0; you may not use this file except in compliance with the Elastic License 2.0.
 * See the LICENSE file in the project root for details.
 */
use serde_json::{json, Map, Value};

use crate::analyzer::language_defaults;
use crate::ast::{FunctionDeclaration, NodeId};
use crate::error::CompilerError;
use crate::generator::{
    attribute, reference, sub, Generator, Position, DEPLOYMENT_BUCKET_NAME, DEPLOYMENT_PREFIX,
    MODULE_ROLE,
};

const POLICY_VERSION: &str = "2012-10-17";

/// Environment variable holding a scoped declaration's value.
pub fn scoped_variable_name(logical_id: &str) -> String {
    format!("STR_{}", logical_id.to_ascii_uppercase())
}

/// `{"Fn::If": [condition, value, AWS::NoValue]}`
fn when(condition: Option<&str>, value: Value) -> Value {
    match condition {
        Some(condition) => json!({ "Fn::If": [condition, value, reference("AWS::NoValue")] }),
        None => value,
    }
}

impl Generator<'_> {
    pub(super) fn generate_function(
        &mut self,
        id: NodeId,
        function: &FunctionDeclaration,
    ) -> Result<(), CompilerError> {
        self.has_functions = true;
        let logical_id = self.logical_id(id)?;
        let defaults = function.language.as_deref().and_then(language_defaults);
        let runtime = function
            .runtime
            .as_deref()
            .or(defaults.map(|(runtime, _)| runtime))
            .ok_or_else(|| CompilerError::internal(format!("function `{logical_id}` has no runtime")))?;
        let handler = function
            .handler
            .as_deref()
            .or(defaults.map(|(_, handler)| handler))
            .ok_or_else(|| CompilerError::internal(format!("function `{logical_id}` has no handler")))?;
        let (Some(memory), Some(timeout)) = (function.memory, function.timeout) else {
            return Err(CompilerError::internal(format!(
                "function `{logical_id}` has no memory or timeout"
            )));
        };

        let module = self.model.module();
        let mut properties = Map::new();
        if let Some(description) = &function.description {
            properties.insert("Description".to_string(), json!(description));
        }
        properties.insert(
            "Code".to_string(),
            json!({
                "S3Bucket": reference(DEPLOYMENT_BUCKET_NAME),
                "S3Key": sub(format!(
                    "${{{DEPLOYMENT_PREFIX}}}{}/{}/.artifacts/{logical_id}.zip",
                    module.namespace(),
                    module.name()
                )),
            }),
        );
        properties.insert("Handler".to_string(), json!(handler));
        properties.insert("Runtime".to_string(), json!(runtime));
        properties.insert("MemorySize".to_string(), self.lower(memory, Position::Value)?);
        properties.insert("Timeout".to_string(), self.lower(timeout, Position::Value)?);
        properties.insert("Role".to_string(), attribute(MODULE_ROLE, "Arn"));
        let variables = self.function_environment(id, function)?;
        properties.insert(
            "Environment".to_string(),
            json!({ "Variables": variables }),
        );
        if let Some(declared) = function.properties {
            if let Value::Object(entries) = self.lower(declared, Position::Value)? {
                properties.extend(entries);
            }
        }

        let mut definition = Map::new();
        definition.insert("Type".to_string(), json!("AWS::Lambda::Function"));
        definition.insert("Properties".to_string(), Value::Object(properties));
        self.add_implicit_condition(id, function.condition)?;
        if let Some(condition) = self.declaration_condition(id, function.condition)? {
            definition.insert("Condition".to_string(), json!(condition));
        }
        self.add_resource(logical_id, Value::Object(definition));

        for (index, &source) in function.sources.iter().enumerate() {
            self.generate_event_source(id, source, index + 1)?;
        }
        Ok(())
    }

    fn function_environment(
        &mut self,
        id: NodeId,
        function: &FunctionDeclaration,
    ) -> Result<Map<String, Value>, CompilerError> {
        let model = self.model;
        let mut variables = Map::new();
        variables.insert("MODULE_ID".to_string(), reference("AWS::StackName"));
        variables.insert("MODULE_INFO".to_string(), json!(model.module().to_string()));

        for symbol in model.scoped_to(id) {
            let mut value = self.declaration_value(symbol.node)?;
            if value.is_array() {
                value = json!({ "Fn::Join": [",", value] });
            }
            let condition = self.condition_of(symbol.node)?;
            variables.insert(scoped_variable_name(&symbol.logical_id), when(condition, value));
        }

        if let Some(environment) = function.environment {
            if let Value::Object(entries) = self.lower(environment, Position::Value)? {
                variables.extend(entries);
            }
        }
        Ok(variables)
    }

    /// Adds a statement to the module role policy.
    pub(super) fn allow(&mut self, sid: String, actions: &[&str], resource: Value) {
        self.statements.push(json!({
            "Sid": sid,
            "Effect": "Allow",
            "Action": actions,
            "Resource": resource,
        }));
    }

    /// Emits the IAM role shared by all functions, with one statement per
    /// `Allow` grant followed by the event-source statements.
    pub(super) fn generate_module_role(&mut self) -> Result<(), CompilerError> {
        if !self.has_functions {
            return Ok(());
        }
        let model = self.model;
        let mut statements = Vec::new();
        for grant in model.grants() {
            let logical_id = self.logical_id(grant.declaration)?;
            let arn = self.arn_value(grant.declaration)?;
            let statement = json!({
                "Sid": logical_id,
                "Effect": "Allow",
                "Action": grant.actions,
                "Resource": [arn.clone(), { "Fn::Join": ["", [arn, "/*"]] }],
            });
            let condition = self.condition_of(grant.declaration)?;
            statements.push(when(condition, statement));
        }
        statements.append(&mut self.statements);

        let mut properties = Map::new();
        properties.insert(
            "AssumeRolePolicyDocument".to_string(),
            json!({
                "Version": POLICY_VERSION,
                "Statement": [{
                    "Sid": "ModuleLambdaPrincipal",
                    "Effect": "Allow",
                    "Principal": { "Service": "lambda.amazonaws.com" },
                    "Action": "sts:AssumeRole",
                }],
            }),
        );
        properties.insert(
            "ManagedPolicyArns".to_string(),
            json!([sub(
                "arn:${AWS::Partition}:iam::aws:policy/service-role/AWSLambdaBasicExecutionRole"
            )]),
        );
        if !statements.is_empty() {
            properties.insert(
                "Policies".to_string(),
                json!([{
                    "PolicyName": sub("${AWS::StackName}ModulePolicy"),
                    "PolicyDocument": { "Version": POLICY_VERSION, "Statement": statements },
                }]),
            );
        }
        self.add_resource(
            MODULE_ROLE,
            json!({ "Type": "AWS::IAM::Role", "Properties": properties }),
        );
        Ok(())
    }
}
