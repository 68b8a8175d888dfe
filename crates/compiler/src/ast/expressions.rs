/*!
 * Copyright 2025 Release Workshop Ltd
 * Licensed under the Elastic License 2.0; you may not use this file except in compliance with the Elastic License 2.0.
 * See the LICENSE file in the project root for details.
 */
//! Expression nodes.

use std::fmt;

use crate::ast::NodeId;
use crate::source::SourceLocation;

/// The resolved type of a literal scalar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LiteralType {
    String,
    Bool,
    Integer,
    Float,
    Timestamp,
    Null,
}

impl fmt::Display for LiteralType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LiteralType::String => "string",
            LiteralType::Bool => "bool",
            LiteralType::Integer => "integer",
            LiteralType::Float => "float",
            LiteralType::Timestamp => "timestamp",
            LiteralType::Null => "null",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectEntry {
    pub key: String,
    pub key_location: SourceLocation,
    pub value: NodeId,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// Normalized scalar text plus its resolved type.
    Literal { value: String, kind: LiteralType },
    /// Entries in source order; keys are unique.
    Object { entries: Vec<ObjectEntry> },
    List { items: Vec<NodeId> },

    // conditional functions
    Equals { left: NodeId, right: NodeId },
    Not { value: NodeId },
    And { values: Vec<NodeId> },
    Or { values: Vec<NodeId> },
    Condition { name: String },

    // value functions
    Base64 { value: NodeId },
    Cidr { ip_block: NodeId, count: NodeId, cidr_bits: NodeId },
    FindInMap { map_name: NodeId, top_level_key: NodeId, second_level_key: NodeId },
    GetAtt { reference_name: String, attribute_name: NodeId },
    GetAzs { region: NodeId },
    If { condition: NodeId, if_true: NodeId, if_false: NodeId },
    ImportValue { shared_value: NodeId },
    Join { separator: String, values: NodeId },
    Select { index: NodeId, values: NodeId },
    Split { delimiter: String, source: NodeId },
    Sub { format_string: String, parameters: Option<NodeId> },
    Transform { macro_name: String, parameters: Option<NodeId> },
    Ref { reference_name: String },
}

impl Expression {
    pub fn string(value: impl Into<String>) -> Self {
        Expression::Literal {
            value: value.into(),
            kind: LiteralType::String,
        }
    }

    /// The intrinsic function this expression calls, if any.
    pub fn intrinsic(&self) -> Option<Intrinsic> {
        let intrinsic = match self {
            Expression::Literal { .. } | Expression::Object { .. } | Expression::List { .. } => {
                return None
            }
            Expression::Equals { .. } => Intrinsic::Equals,
            Expression::Not { .. } => Intrinsic::Not,
            Expression::And { .. } => Intrinsic::And,
            Expression::Or { .. } => Intrinsic::Or,
            Expression::Condition { .. } => Intrinsic::Condition,
            Expression::Base64 { .. } => Intrinsic::Base64,
            Expression::Cidr { .. } => Intrinsic::Cidr,
            Expression::FindInMap { .. } => Intrinsic::FindInMap,
            Expression::GetAtt { .. } => Intrinsic::GetAtt,
            Expression::GetAzs { .. } => Intrinsic::GetAzs,
            Expression::If { .. } => Intrinsic::If,
            Expression::ImportValue { .. } => Intrinsic::ImportValue,
            Expression::Join { .. } => Intrinsic::Join,
            Expression::Select { .. } => Intrinsic::Select,
            Expression::Split { .. } => Intrinsic::Split,
            Expression::Sub { .. } => Intrinsic::Sub,
            Expression::Transform { .. } => Intrinsic::Transform,
            Expression::Ref { .. } => Intrinsic::Ref,
        };
        Some(intrinsic)
    }

    /// Literal string value, if this is a string literal.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Expression::Literal {
                value,
                kind: LiteralType::String,
            } => Some(value),
            _ => None,
        }
    }

    pub fn children(&self) -> Vec<NodeId> {
        match self {
            Expression::Literal { .. } | Expression::Condition { .. } | Expression::Ref { .. } => {
                Vec::new()
            }
            Expression::Object { entries } => entries.iter().map(|e| e.value).collect(),
            Expression::List { items } => items.clone(),
            Expression::Equals { left, right } => vec![*left, *right],
            Expression::Not { value } | Expression::Base64 { value } => vec![*value],
            Expression::And { values } | Expression::Or { values } => values.clone(),
            Expression::Cidr {
                ip_block,
                count,
                cidr_bits,
            } => vec![*ip_block, *count, *cidr_bits],
            Expression::FindInMap {
                map_name,
                top_level_key,
                second_level_key,
            } => vec![*map_name, *top_level_key, *second_level_key],
            Expression::GetAtt { attribute_name, .. } => vec![*attribute_name],
            Expression::GetAzs { region } => vec![*region],
            Expression::If {
                condition,
                if_true,
                if_false,
            } => vec![*condition, *if_true, *if_false],
            Expression::ImportValue { shared_value } => vec![*shared_value],
            Expression::Join { values, .. } => vec![*values],
            Expression::Select { index, values } => vec![*index, *values],
            Expression::Split { source, .. } => vec![*source],
            Expression::Sub { parameters, .. } | Expression::Transform { parameters, .. } => {
                parameters.iter().copied().collect()
            }
        }
    }
}

/// Intrinsic functions available in expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Intrinsic {
    Base64,
    Cidr,
    FindInMap,
    GetAtt,
    GetAzs,
    If,
    ImportValue,
    Join,
    Select,
    Split,
    Sub,
    Transform,
    Ref,
    Condition,
    Equals,
    Not,
    And,
    Or,
}

impl Intrinsic {
    const ALL: [Intrinsic; 18] = [
        Intrinsic::Base64,
        Intrinsic::Cidr,
        Intrinsic::FindInMap,
        Intrinsic::GetAtt,
        Intrinsic::GetAzs,
        Intrinsic::If,
        Intrinsic::ImportValue,
        Intrinsic::Join,
        Intrinsic::Select,
        Intrinsic::Split,
        Intrinsic::Sub,
        Intrinsic::Transform,
        Intrinsic::Ref,
        Intrinsic::Condition,
        Intrinsic::Equals,
        Intrinsic::Not,
        Intrinsic::And,
        Intrinsic::Or,
    ];

    /// Name used in the `!Name` short form.
    pub fn short_name(self) -> &'static str {
        match self {
            Intrinsic::Base64 => "Base64",
            Intrinsic::Cidr => "Cidr",
            Intrinsic::FindInMap => "FindInMap",
            Intrinsic::GetAtt => "GetAtt",
            Intrinsic::GetAzs => "GetAZs",
            Intrinsic::If => "If",
            Intrinsic::ImportValue => "ImportValue",
            Intrinsic::Join => "Join",
            Intrinsic::Select => "Select",
            Intrinsic::Split => "Split",
            Intrinsic::Sub => "Sub",
            Intrinsic::Transform => "Transform",
            Intrinsic::Ref => "Ref",
            Intrinsic::Condition => "Condition",
            Intrinsic::Equals => "Equals",
            Intrinsic::Not => "Not",
            Intrinsic::And => "And",
            Intrinsic::Or => "Or",
        }
    }

    /// Key used in the long form and in generated templates.
    pub fn long_name(self) -> &'static str {
        match self {
            Intrinsic::Base64 => "Fn::Base64",
            Intrinsic::Cidr => "Fn::Cidr",
            Intrinsic::FindInMap => "Fn::FindInMap",
            Intrinsic::GetAtt => "Fn::GetAtt",
            Intrinsic::GetAzs => "Fn::GetAZs",
            Intrinsic::If => "Fn::If",
            Intrinsic::ImportValue => "Fn::ImportValue",
            Intrinsic::Join => "Fn::Join",
            Intrinsic::Select => "Fn::Select",
            Intrinsic::Split => "Fn::Split",
            Intrinsic::Sub => "Fn::Sub",
            Intrinsic::Transform => "Fn::Transform",
            Intrinsic::Ref => "Ref",
            Intrinsic::Condition => "Condition",
            Intrinsic::Equals => "Fn::Equals",
            Intrinsic::Not => "Fn::Not",
            Intrinsic::And => "Fn::And",
            Intrinsic::Or => "Fn::Or",
        }
    }

    pub fn from_short_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|i| i.short_name() == name)
    }

    pub fn from_long_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|i| i.long_name() == name)
    }

    /// Equals, Not, And, Or and Condition.
    pub fn is_conditional(self) -> bool {
        matches!(
            self,
            Intrinsic::Equals
                | Intrinsic::Not
                | Intrinsic::And
                | Intrinsic::Or
                | Intrinsic::Condition
        )
    }
}

impl fmt::Display for Intrinsic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.long_name())
    }
}

/// A `${Name}` or `${Name.Attribute}` token inside a `Sub` format string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubReference {
    pub name: String,
    pub attribute: Option<String>,
    /// Byte range of the whole `${...}` token.
    pub start: usize,
    pub end: usize,
}

/// Extracts the references of a `Sub` format string.
///
/// `${!Literal}` escapes are skipped. Unterminated tokens are ignored.
pub fn sub_references(format: &str) -> Vec<SubReference> {
    let mut references = Vec::new();
    let mut offset = 0;
    while let Some(found) = format[offset..].find("${") {
        let start = offset + found;
        let Some(length) = format[start + 2..].find('}') else {
            break;
        };
        let end = start + 2 + length + 1;
        let body = format[start + 2..end - 1].trim();
        if !body.is_empty() && !body.starts_with('!') {
            let (name, attribute) = match body.split_once('.') {
                Some((name, attribute)) => (name.to_string(), Some(attribute.to_string())),
                None => (body.to_string(), None),
            };
            references.push(SubReference {
                name,
                attribute,
                start,
                end,
            });
        }
        offset = end;
    }
    references
}
