/*!
 * Copyright 2025 Release Workshop Ltd
 * Licensed under the Elastic License 2.0; you may not use this file except in compliance with the Elastic License 2.0.
 * See the LICENSE file in the project root for details.
 *
 * Expression parsing: literals, lists, objects and intrinsic function calls
 * in both `!Name` short form and `Fn::Name` long form.
 */

use std::collections::HashSet;
use std::ops::RangeInclusive;

use crate::ast::{Expression, Intrinsic, LiteralType, NodeId, ObjectEntry};
use crate::diagnostics::ErrorCode;
use crate::parser::events::{EventCursor, NodeTag, Position};
use crate::parser::{literals, ModuleParser};

impl ModuleParser<'_> {
    /// Parses one node as an expression. Always consumes exactly one node.
    pub(super) fn parse_expression(&mut self, cursor: &mut EventCursor) -> Option<NodeId> {
        if let Some(tag) = cursor.peek_tag() {
            return self.parse_tagged(cursor, tag);
        }
        if cursor.at_scalar() {
            self.parse_scalar(cursor)
        } else if cursor.at_sequence() {
            self.parse_list(cursor)
        } else if cursor.at_mapping() {
            self.parse_mapping(cursor)
        } else {
            self.unexpected(cursor, "an expression");
            None
        }
    }

    /// Parses an expression that must turn out to be an object.
    pub(super) fn parse_object(&mut self, cursor: &mut EventCursor, what: &str) -> Option<NodeId> {
        let location = cursor.current_location();
        let id = self.parse_expression(cursor)?;
        if matches!(self.ast.expression(id), Some(Expression::Object { .. })) {
            Some(id)
        } else {
            self.error(ErrorCode::E103, format!("{what} must be a mapping"), &location);
            None
        }
    }

    fn parse_tagged(&mut self, cursor: &mut EventCursor, tag: NodeTag) -> Option<NodeId> {
        if tag.is_local() {
            if tag.suffix == "Include" {
                return self.parse_include(cursor, |this, included| this.parse_expression(included));
            }
            if let Some(intrinsic) = Intrinsic::from_short_name(&tag.suffix) {
                let start = cursor.position();
                cursor.strip_tag();
                let expression = self.parse_arguments(cursor, intrinsic)?;
                let location = cursor.span_from(start);
                return Some(self.ast.add_expression(expression, location));
            }
        }
        if tag.is_core_schema() {
            if cursor.at_scalar() {
                return self.parse_core_scalar(cursor, &tag);
            }
            if (tag.suffix == "seq" && cursor.at_sequence()) || (tag.suffix == "map" && cursor.at_mapping()) {
                cursor.strip_tag();
                return self.parse_expression(cursor);
            }
        }
        let location = cursor.current_location();
        self.error(ErrorCode::E104, format!("unknown tag `{tag}`"), &location);
        cursor.skip_node();
        None
    }

    fn parse_scalar(&mut self, cursor: &mut EventCursor) -> Option<NodeId> {
        let scalar = cursor.next_scalar()?;
        let (kind, value) = if scalar.plain {
            literals::resolve_plain(&scalar.value)
        } else {
            (LiteralType::String, scalar.value)
        };
        Some(
            self.ast
                .add_expression(Expression::Literal { value, kind }, scalar.location),
        )
    }

    fn parse_core_scalar(&mut self, cursor: &mut EventCursor, tag: &NodeTag) -> Option<NodeId> {
        let scalar = cursor.next_scalar()?;
        match literals::resolve_tagged(&tag.suffix, &scalar.value) {
            Some((kind, value)) => Some(
                self.ast
                    .add_expression(Expression::Literal { value, kind }, scalar.location),
            ),
            None => {
                self.error(
                    ErrorCode::E110,
                    format!("`{}` is not a valid `{tag}` value", scalar.value),
                    &scalar.location,
                );
                None
            }
        }
    }

    fn parse_list(&mut self, cursor: &mut EventCursor) -> Option<NodeId> {
        let start = cursor.position();
        cursor.next();
        let mut items = Vec::new();
        let mut valid = true;
        while !cursor.at_sequence_end() && cursor.peek().is_some() {
            match self.parse_expression(cursor) {
                Some(item) => items.push(item),
                None => valid = false,
            }
        }
        cursor.next();
        let location = cursor.span_from(start);
        valid.then(|| self.ast.add_expression(Expression::List { items }, location))
    }

    fn parse_mapping(&mut self, cursor: &mut EventCursor) -> Option<NodeId> {
        let start = cursor.position();
        if let Some(intrinsic) = cursor.peek_plain_key(1).and_then(Intrinsic::from_long_name) {
            // a lone `Condition` key is a call, otherwise it is an ordinary property
            if intrinsic != Intrinsic::Condition || cursor.mapping_len() == 1 {
                return self.parse_long_form(cursor, intrinsic, start);
            }
        }

        cursor.next();
        let mut entries = Vec::new();
        let mut seen = HashSet::new();
        let mut valid = true;
        while !cursor.at_mapping_end() && cursor.peek().is_some() {
            if !cursor.at_scalar() || cursor.peek_tag().is_some() {
                let location = cursor.current_location();
                self.error(ErrorCode::E103, "object keys must be plain strings", &location);
                cursor.skip_node();
                cursor.skip_node();
                valid = false;
                continue;
            }
            let Some(key) = cursor.next_scalar() else {
                break;
            };
            if !seen.insert(key.value.clone()) {
                self.error(
                    ErrorCode::E106,
                    format!("duplicate key `{}`", key.value),
                    &key.location,
                );
                cursor.skip_node();
                valid = false;
                continue;
            }
            match self.parse_expression(cursor) {
                Some(value) => entries.push(ObjectEntry {
                    key: key.value,
                    key_location: key.location,
                    value,
                }),
                None => valid = false,
            }
        }
        cursor.next();
        let location = cursor.span_from(start);
        valid.then(|| self.ast.add_expression(Expression::Object { entries }, location))
    }

    fn parse_long_form(
        &mut self,
        cursor: &mut EventCursor,
        intrinsic: Intrinsic,
        start: Position,
    ) -> Option<NodeId> {
        cursor.next();
        let key = cursor.next_scalar()?;
        let expression = self.parse_arguments(cursor, intrinsic);
        if !cursor.at_mapping_end() {
            self.error(
                ErrorCode::E108,
                format!("`{intrinsic}` must be the only key of its mapping"),
                &key.location,
            );
            cursor.skip_to_end();
            return None;
        }
        cursor.next();
        let expression = expression?;
        let location = cursor.span_from(start);
        Some(self.ast.add_expression(expression, location))
    }

    /// Reads the argument node of `intrinsic`. Short and long forms share
    /// this reader, so both produce identical nodes.
    fn parse_arguments(&mut self, cursor: &mut EventCursor, intrinsic: Intrinsic) -> Option<Expression> {
        match intrinsic {
            Intrinsic::Ref => self
                .parse_name_argument(cursor, intrinsic)
                .map(|reference_name| Expression::Ref { reference_name }),
            Intrinsic::Condition => self
                .parse_name_argument(cursor, intrinsic)
                .map(|name| Expression::Condition { name }),
            Intrinsic::GetAtt => self.parse_get_att(cursor),
            Intrinsic::Sub => self.parse_sub(cursor),
            Intrinsic::Transform => self.parse_transform(cursor),
            Intrinsic::If => self.parse_if(cursor),
            Intrinsic::Join => {
                let (separator, values) = self.parse_separated(cursor, intrinsic)?;
                Some(Expression::Join { separator, values })
            }
            Intrinsic::Split => {
                let (delimiter, source) = self.parse_separated(cursor, intrinsic)?;
                Some(Expression::Split { delimiter, source })
            }
            Intrinsic::Base64 => Some(Expression::Base64 {
                value: self.parse_expression(cursor)?,
            }),
            Intrinsic::GetAzs => Some(Expression::GetAzs {
                region: self.parse_expression(cursor)?,
            }),
            Intrinsic::ImportValue => Some(Expression::ImportValue {
                shared_value: self.parse_expression(cursor)?,
            }),
            Intrinsic::Not => {
                let [value] = self.parse_fixed(cursor, intrinsic)?;
                Some(Expression::Not { value })
            }
            Intrinsic::Equals => {
                let [left, right] = self.parse_fixed(cursor, intrinsic)?;
                Some(Expression::Equals { left, right })
            }
            Intrinsic::Select => {
                let [index, values] = self.parse_fixed(cursor, intrinsic)?;
                Some(Expression::Select { index, values })
            }
            Intrinsic::Cidr => {
                let [ip_block, count, cidr_bits] = self.parse_fixed(cursor, intrinsic)?;
                Some(Expression::Cidr {
                    ip_block,
                    count,
                    cidr_bits,
                })
            }
            Intrinsic::FindInMap => {
                let [map_name, top_level_key, second_level_key] = self.parse_fixed(cursor, intrinsic)?;
                Some(Expression::FindInMap {
                    map_name,
                    top_level_key,
                    second_level_key,
                })
            }
            Intrinsic::And => Some(Expression::And {
                values: self.parse_argument_list(cursor, intrinsic, 2..=10)?,
            }),
            Intrinsic::Or => Some(Expression::Or {
                values: self.parse_argument_list(cursor, intrinsic, 2..=10)?,
            }),
        }
    }

    fn arguments_error(&mut self, cursor: &mut EventCursor, message: String) {
        let location = cursor.current_location();
        self.error(ErrorCode::E108, message, &location);
        cursor.skip_node();
    }

    fn parse_name_argument(&mut self, cursor: &mut EventCursor, intrinsic: Intrinsic) -> Option<String> {
        if !cursor.at_scalar() || cursor.peek_tag().is_some() {
            let found = cursor.describe_next();
            self.arguments_error(cursor, format!("`{intrinsic}` expects a literal name, found {found}"));
            return None;
        }
        let scalar = cursor.next_scalar()?;
        if scalar.value.is_empty() {
            self.error(
                ErrorCode::E108,
                format!("`{intrinsic}` expects a name"),
                &scalar.location,
            );
            return None;
        }
        Some(scalar.value)
    }

    fn parse_fixed<const N: usize>(&mut self, cursor: &mut EventCursor, intrinsic: Intrinsic) -> Option<[NodeId; N]> {
        let items = self.parse_argument_list(cursor, intrinsic, N..=N)?;
        items.try_into().ok()
    }

    fn parse_argument_list(
        &mut self,
        cursor: &mut EventCursor,
        intrinsic: Intrinsic,
        count: RangeInclusive<usize>,
    ) -> Option<Vec<NodeId>> {
        let expected = if count.start() == count.end() {
            count.start().to_string()
        } else {
            format!("{} to {}", count.start(), count.end())
        };
        if !cursor.at_sequence() || cursor.peek_tag().is_some() {
            self.arguments_error(cursor, format!("`{intrinsic}` expects a list of {expected} argument(s)"));
            return None;
        }
        let location = cursor.current_location();
        cursor.next();
        let mut items = Vec::new();
        let mut valid = true;
        while !cursor.at_sequence_end() && cursor.peek().is_some() {
            match self.parse_expression(cursor) {
                Some(item) => items.push(item),
                None => valid = false,
            }
        }
        cursor.next();
        if valid && !count.contains(&items.len()) {
            self.error(
                ErrorCode::E108,
                format!("`{intrinsic}` expects {expected} argument(s), found {}", items.len()),
                &location,
            );
            return None;
        }
        valid.then_some(items)
    }

    // `[literal, expression]`, as taken by Join and Split
    fn parse_separated(&mut self, cursor: &mut EventCursor, intrinsic: Intrinsic) -> Option<(String, NodeId)> {
        if !cursor.at_sequence() || cursor.peek_tag().is_some() {
            self.arguments_error(cursor, format!("`{intrinsic}` expects a list of 2 arguments"));
            return None;
        }
        let location = cursor.current_location();
        cursor.next();
        if !cursor.at_scalar() {
            self.error(
                ErrorCode::E108,
                format!("the first argument of `{intrinsic}` must be a literal string"),
                &location,
            );
            cursor.skip_to_end();
            return None;
        }
        let separator = self.parse_string(cursor, intrinsic.long_name());
        if cursor.at_sequence_end() {
            self.error(ErrorCode::E108, format!("`{intrinsic}` expects 2 arguments, found 1"), &location);
            cursor.next();
            return None;
        }
        let value = self.parse_expression(cursor);
        if !cursor.at_sequence_end() {
            self.error(ErrorCode::E108, format!("`{intrinsic}` expects 2 arguments"), &location);
            cursor.skip_to_end();
            return None;
        }
        cursor.next();
        Some((separator?, value?))
    }

    fn parse_get_att(&mut self, cursor: &mut EventCursor) -> Option<Expression> {
        if cursor.at_scalar() && cursor.peek_tag().is_none() {
            let scalar = cursor.next_scalar()?;
            let parts = scalar
                .value
                .split_once('.')
                .filter(|(name, attribute)| !name.is_empty() && !attribute.is_empty());
            let Some((name, attribute)) = parts else {
                self.error(
                    ErrorCode::E108,
                    format!("`Fn::GetAtt` expects `Resource.Attribute`, found `{}`", scalar.value),
                    &scalar.location,
                );
                return None;
            };
            let reference_name = name.to_string();
            let attribute_name = self
                .ast
                .add_expression(Expression::string(attribute), scalar.location.clone());
            return Some(Expression::GetAtt {
                reference_name,
                attribute_name,
            });
        }
        if !cursor.at_sequence() || cursor.peek_tag().is_some() {
            self.arguments_error(
                cursor,
                "`Fn::GetAtt` expects `Resource.Attribute` or [resource, attribute]".to_string(),
            );
            return None;
        }

        let location = cursor.current_location();
        cursor.next();
        if !cursor.at_scalar() || cursor.peek_tag().is_some() {
            self.error(
                ErrorCode::E108,
                "the resource name of `Fn::GetAtt` must be a literal string",
                &location,
            );
            cursor.skip_to_end();
            return None;
        }
        let reference_name = cursor.next_scalar()?.value;
        if cursor.at_sequence_end() {
            self.error(ErrorCode::E108, "`Fn::GetAtt` expects 2 arguments, found 1", &location);
            cursor.next();
            return None;
        }
        let attribute_name = self.parse_expression(cursor);
        if !cursor.at_sequence_end() {
            self.error(ErrorCode::E108, "`Fn::GetAtt` expects 2 arguments", &location);
            cursor.skip_to_end();
            return None;
        }
        cursor.next();
        Some(Expression::GetAtt {
            reference_name,
            attribute_name: attribute_name?,
        })
    }

    fn parse_sub(&mut self, cursor: &mut EventCursor) -> Option<Expression> {
        if cursor.at_scalar() {
            let format_string = self.parse_string(cursor, "Fn::Sub")?;
            return Some(Expression::Sub {
                format_string,
                parameters: None,
            });
        }
        if !cursor.at_sequence() || cursor.peek_tag().is_some() {
            self.arguments_error(
                cursor,
                "`Fn::Sub` expects a format string or [format string, parameters]".to_string(),
            );
            return None;
        }

        let location = cursor.current_location();
        cursor.next();
        if !cursor.at_scalar() {
            self.error(
                ErrorCode::E108,
                "the format string of `Fn::Sub` must be a literal string",
                &location,
            );
            cursor.skip_to_end();
            return None;
        }
        let format_string = self.parse_string(cursor, "Fn::Sub");
        if cursor.at_sequence_end() {
            cursor.next();
            return Some(Expression::Sub {
                format_string: format_string?,
                parameters: None,
            });
        }
        let parameters = self.parse_object(cursor, "the parameters of `Fn::Sub`");
        if !cursor.at_sequence_end() {
            self.error(ErrorCode::E108, "`Fn::Sub` expects at most 2 arguments", &location);
            cursor.skip_to_end();
            return None;
        }
        cursor.next();
        Some(Expression::Sub {
            format_string: format_string?,
            parameters: Some(parameters?),
        })
    }

    fn parse_if(&mut self, cursor: &mut EventCursor) -> Option<Expression> {
        if !cursor.at_sequence() || cursor.peek_tag().is_some() {
            self.arguments_error(
                cursor,
                "`Fn::If` expects [condition, value if true, value if false]".to_string(),
            );
            return None;
        }
        let location = cursor.current_location();
        cursor.next();
        let mut items = Vec::new();
        let mut index = 0;
        let mut valid = true;
        while !cursor.at_sequence_end() && cursor.peek().is_some() {
            // a plain first argument names a condition
            let item = if index == 0 && cursor.at_scalar() && cursor.peek_tag().is_none() {
                cursor.next_scalar().map(|scalar| {
                    self.ast
                        .add_expression(Expression::Condition { name: scalar.value }, scalar.location)
                })
            } else {
                self.parse_expression(cursor)
            };
            match item {
                Some(item) => items.push(item),
                None => valid = false,
            }
            index += 1;
        }
        cursor.next();
        if !valid {
            return None;
        }
        let Ok([condition, if_true, if_false]) = <[NodeId; 3]>::try_from(items) else {
            self.error(
                ErrorCode::E108,
                format!("`Fn::If` expects 3 arguments, found {index}"),
                &location,
            );
            return None;
        };
        Some(Expression::If {
            condition,
            if_true,
            if_false,
        })
    }

    fn parse_transform(&mut self, cursor: &mut EventCursor) -> Option<Expression> {
        if !cursor.at_mapping() || cursor.peek_tag().is_some() {
            self.arguments_error(
                cursor,
                "`Fn::Transform` expects a mapping with `Name` and `Parameters`".to_string(),
            );
            return None;
        }
        let location = cursor.current_location();
        cursor.next();
        let mut name = None;
        let mut parameters = None;
        let seen = self.parse_entries(
            cursor,
            "`Fn::Transform`",
            &["Name", "Parameters"],
            |this, cursor, key| {
                match key.value.as_str() {
                    "Name" => name = this.parse_string(cursor, "Name"),
                    "Parameters" => {
                        parameters = this.parse_object(cursor, "the parameters of `Fn::Transform`")
                    }
                    _ => return false,
                }
                true
            },
        );
        let macro_name = self.require(name, &seen, "Name", "`Fn::Transform`", &location)?;
        Some(Expression::Transform {
            macro_name,
            parameters,
        })
    }
}
