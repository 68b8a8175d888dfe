/*!
 * Copyright 2025 Release Workshop Ltd
 * Licensed under the Elastic License 2.0; you may not use this file except in compliance with the Elastic License 2.0.
 * See the LICENSE file in the project root for details.
 */
//! Expression lowering.

use serde_json::{json, Map, Value};

use crate::analyzer::is_pseudo_parameter;
use crate::ast::{sub_references, Declaration, Expression, Intrinsic, LiteralType, NodeId};
use crate::diagnostics::ErrorCode;
use crate::error::CompilerError;
use crate::generator::{reference, sub, Generator, DEPLOYMENT_BUCKET_NAME, DEPLOYMENT_PREFIX};

/// Where an expression is lowered; decides which functions are legal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    /// Property values, outputs, environment variables.
    Value,
    /// Condition declarations and inline `If` conditions.
    Condition,
    /// Mapping values: literals, lists and objects only.
    Mapping,
}

impl Position {
    fn describe(self) -> &'static str {
        match self {
            Position::Value => "a value",
            Position::Condition => "a condition",
            Position::Mapping => "a mapping",
        }
    }

    fn allows(self, intrinsic: Intrinsic) -> bool {
        match self {
            Position::Value => !intrinsic.is_conditional(),
            Position::Condition => {
                intrinsic.is_conditional() || matches!(intrinsic, Intrinsic::Ref | Intrinsic::FindInMap)
            }
            Position::Mapping => false,
        }
    }
}

/// JSON value of a literal.
///
/// Integers that fit `i64` become numbers and booleans become `true` or
/// `false`. Floats and timestamps keep their normalized text.
pub fn literal_value(text: &str, kind: LiteralType) -> Value {
    match kind {
        LiteralType::Integer => text
            .parse::<i64>()
            .map(Value::from)
            .unwrap_or_else(|_| Value::String(text.to_string())),
        LiteralType::Bool => Value::Bool(text == "true"),
        LiteralType::Null => Value::Null,
        LiteralType::String | LiteralType::Float | LiteralType::Timestamp => {
            Value::String(text.to_string())
        }
    }
}

fn function(intrinsic: Intrinsic, arguments: Value) -> Value {
    let mut object = Map::new();
    object.insert(intrinsic.long_name().to_string(), arguments);
    Value::Object(object)
}

impl Generator<'_> {
    pub(super) fn lower(&mut self, id: NodeId, position: Position) -> Result<Value, CompilerError> {
        let ast = self.ast;
        let expression = ast
            .expression(id)
            .ok_or_else(|| CompilerError::internal(format!("node {id} is not an expression")))?;

        if let Some(intrinsic) = expression.intrinsic() {
            if !position.allows(intrinsic) {
                let code = if position == Position::Mapping {
                    ErrorCode::E401
                } else {
                    ErrorCode::E400
                };
                self.error(
                    code,
                    format!("`{intrinsic}` cannot be used in {}", position.describe()),
                    id,
                );
                return Ok(Value::Null);
            }
        }

        let value = match expression {
            Expression::Literal { value, kind } => literal_value(value, *kind),
            Expression::Object { entries } => {
                let mut object = Map::new();
                for entry in entries {
                    object.insert(entry.key.clone(), self.lower(entry.value, position)?);
                }
                Value::Object(object)
            }
            Expression::List { items } => Value::Array(self.lower_all(items, position)?),
            Expression::Equals { left, right } => function(
                Intrinsic::Equals,
                json!([self.lower(*left, position)?, self.lower(*right, position)?]),
            ),
            Expression::Not { value } => {
                function(Intrinsic::Not, json!([self.lower(*value, position)?]))
            }
            Expression::And { values } => {
                function(Intrinsic::And, Value::Array(self.lower_all(values, position)?))
            }
            Expression::Or { values } => {
                function(Intrinsic::Or, Value::Array(self.lower_all(values, position)?))
            }
            Expression::Condition { .. } => {
                let target = self.binding(id)?;
                json!({ "Condition": self.logical_id(target)? })
            }
            Expression::Base64 { value } => function(Intrinsic::Base64, self.lower(*value, position)?),
            Expression::Cidr {
                ip_block,
                count,
                cidr_bits,
            } => function(
                Intrinsic::Cidr,
                json!([
                    self.lower(*ip_block, position)?,
                    self.lower(*count, position)?,
                    self.lower(*cidr_bits, position)?
                ]),
            ),
            Expression::FindInMap {
                map_name,
                top_level_key,
                second_level_key,
            } => {
                let map = match self.model.binding(id) {
                    Some(mapping) => Value::String(self.logical_id(mapping)?.to_string()),
                    None => self.lower(*map_name, position)?,
                };
                function(
                    Intrinsic::FindInMap,
                    json!([
                        map,
                        self.lower(*top_level_key, position)?,
                        self.lower(*second_level_key, position)?
                    ]),
                )
            }
            Expression::GetAtt {
                reference_name,
                attribute_name,
            } => {
                let target = self.binding(id)?;
                if let Some(Declaration::Resource(resource)) = ast.declaration(target) {
                    if resource.r#type.is_none() {
                        self.error(
                            ErrorCode::E400,
                            format!("`Fn::GetAtt` needs a resource with a `Type`, but `{reference_name}` only has a `Value`"),
                            id,
                        );
                        return Ok(Value::Null);
                    }
                }
                function(
                    Intrinsic::GetAtt,
                    json!([self.logical_id(target)?, self.lower(*attribute_name, position)?]),
                )
            }
            Expression::GetAzs { region } => function(Intrinsic::GetAzs, self.lower(*region, position)?),
            Expression::If {
                condition,
                if_true,
                if_false,
            } => {
                let name = self.condition_name(*condition)?;
                function(
                    Intrinsic::If,
                    json!([
                        name,
                        self.lower(*if_true, position)?,
                        self.lower(*if_false, position)?
                    ]),
                )
            }
            Expression::ImportValue { shared_value } => {
                function(Intrinsic::ImportValue, self.lower(*shared_value, position)?)
            }
            Expression::Join { separator, values } => function(
                Intrinsic::Join,
                json!([separator, self.lower(*values, position)?]),
            ),
            Expression::Select { index, values } => function(
                Intrinsic::Select,
                json!([self.lower(*index, position)?, self.lower(*values, position)?]),
            ),
            Expression::Split { delimiter, source } => function(
                Intrinsic::Split,
                json!([delimiter, self.lower(*source, position)?]),
            ),
            Expression::Sub {
                format_string,
                parameters,
            } => self.lower_sub(id, format_string, *parameters, position)?,
            Expression::Transform {
                macro_name,
                parameters,
            } => {
                let mut arguments = Map::new();
                arguments.insert("Name".to_string(), Value::String(macro_name.clone()));
                if let Some(parameters) = parameters {
                    arguments.insert("Parameters".to_string(), self.lower(*parameters, position)?);
                }
                function(Intrinsic::Transform, Value::Object(arguments))
            }
            Expression::Ref { reference_name } => {
                if is_pseudo_parameter(reference_name) {
                    reference(reference_name)
                } else {
                    let target = self.binding(id)?;
                    self.reference_value(target, position, id)?
                }
            }
        };
        Ok(value)
    }

    fn lower_all(&mut self, items: &[NodeId], position: Position) -> Result<Vec<Value>, CompilerError> {
        items.iter().map(|&item| self.lower(item, position)).collect()
    }

    /// Logical id of the condition named by the first argument of `If`.
    fn condition_name(&mut self, condition: NodeId) -> Result<Value, CompilerError> {
        if !matches!(self.ast.expression(condition), Some(Expression::Condition { .. })) {
            self.error(
                ErrorCode::E400,
                "the first argument of `Fn::If` must be a condition name",
                condition,
            );
            return Ok(Value::Null);
        }
        let target = self.binding(condition)?;
        Ok(Value::String(self.logical_id(target)?.to_string()))
    }

    /// What a `Ref` to `target` lowers to.
    ///
    /// Variables, imports, packages and resources with a `Value` are
    /// inlined; everything else becomes a `Ref` to its logical id.
    pub(super) fn reference_value(
        &mut self,
        target: NodeId,
        position: Position,
        at: NodeId,
    ) -> Result<Value, CompilerError> {
        let ast = self.ast;
        let declaration = ast
            .declaration(target)
            .ok_or_else(|| CompilerError::internal(format!("node {target} is not a declaration")))?;

        if position == Position::Condition
            && !matches!(declaration, Declaration::Parameter(_) | Declaration::Variable(_))
        {
            self.error(
                ErrorCode::E400,
                format!(
                    "`Ref` to {} `{}` cannot be used in a condition",
                    declaration.kind().describe(),
                    self.full_name(target)?
                ),
                at,
            );
            return Ok(Value::Null);
        }

        match declaration {
            Declaration::Variable(variable) => self.lower(variable.value, position),
            Declaration::Import(import) => Ok(import_value(&import.module)),
            Declaration::Package(_) => self.package_value(target),
            Declaration::Resource(resource) => match resource.value {
                Some(value) => self.lower(value, position),
                None => Ok(reference(self.logical_id(target)?)),
            },
            Declaration::Parameter(_) | Declaration::Nested(_) | Declaration::Function(_) => {
                Ok(reference(self.logical_id(target)?))
            }
            other => Err(CompilerError::internal(format!(
                "`Ref` bound to a {}",
                other.kind().describe()
            ))),
        }
    }

    fn is_inlined(&self, target: NodeId) -> bool {
        match self.ast.declaration(target) {
            Some(Declaration::Variable(_) | Declaration::Import(_) | Declaration::Package(_)) => true,
            Some(Declaration::Resource(resource)) => resource.value.is_some(),
            _ => false,
        }
    }

    /// S3 location of a package artifact.
    pub(super) fn package_value(&self, package: NodeId) -> Result<Value, CompilerError> {
        let module = self.model.module();
        Ok(sub(format!(
            "s3://${{{DEPLOYMENT_BUCKET_NAME}}}/${{{DEPLOYMENT_PREFIX}}}{}/{}/.artifacts/{}.zip",
            module.namespace(),
            module.name(),
            self.logical_id(package)?
        )))
    }

    /// Rewrites `${Group::Item}` tokens to logical ids and turns tokens that
    /// name inlined declarations into `Sub` parameters.
    fn lower_sub(
        &mut self,
        id: NodeId,
        format_string: &str,
        parameters: Option<NodeId>,
        position: Position,
    ) -> Result<Value, CompilerError> {
        let mut arguments = match parameters {
            Some(parameters) => match self.lower(parameters, position)? {
                Value::Object(object) => object,
                _ => Map::new(),
            },
            None => Map::new(),
        };
        let local: Vec<String> = arguments.keys().cloned().collect();

        let mut text = String::with_capacity(format_string.len());
        let mut copied = 0;
        for token in sub_references(format_string) {
            if is_pseudo_parameter(&token.name) || local.contains(&token.name) {
                continue;
            }
            let target = self.name_binding(id, &token.name)?;
            let logical_id = self.logical_id(target)?;
            let replacement = match (&token.attribute, self.is_inlined(target)) {
                (None, true) => {
                    if !arguments.contains_key(logical_id) {
                        let value = self.reference_value(target, position, id)?;
                        arguments.insert(logical_id.to_string(), value);
                    }
                    format!("${{{logical_id}}}")
                }
                (Some(attribute), true) => {
                    self.error(
                        ErrorCode::E400,
                        format!(
                            "`${{{}.{attribute}}}` needs a resource with a `Type`",
                            token.name
                        ),
                        id,
                    );
                    continue;
                }
                (Some(attribute), false) => format!("${{{logical_id}.{attribute}}}"),
                (None, false) => format!("${{{logical_id}}}"),
            };
            text.push_str(&format_string[copied..token.start]);
            text.push_str(&replacement);
            copied = token.end;
        }
        text.push_str(&format_string[copied..]);

        Ok(if arguments.is_empty() {
            json!({ "Fn::Sub": text })
        } else {
            json!({ "Fn::Sub": [text, Value::Object(arguments)] })
        })
    }
}

/// `Fn::ImportValue` of an export of another module of the same tier.
pub(super) fn import_value(module: &str) -> Value {
    let export = match module.split_once("::") {
        Some((module, export)) => format!("{}::{export}", module.replacen('.', "-", 1)),
        None => module.to_string(),
    };
    json!({ "Fn::ImportValue": sub(format!("${{{DEPLOYMENT_PREFIX}}}{export}")) })
}
