/*!
 * Copyright 2025 Release Workshop Ltd
 * Licensed under the Elastic License 2.0; you may not use this file except in compliance with the Elastic License 2.0.
 * See the LICENSE file in the project root for details.
 */
use jsonschema::JSONSchema;
use serde_json::Value;

/// Embed resource specification schema at compile time
/// This avoids file I/O which is not available in WASM environments
const RESOURCE_SPECIFICATION_SCHEMA_JSON: &str =
    include_str!("../../../schemas/resource-specification.schema.v1.json");

/// Embed generated template schema at compile time
const TEMPLATE_SCHEMA_JSON: &str = include_str!("../../../schemas/template.schema.v1.json");

/// Load the resource specification schema
///
/// # Panics
///
/// Panics if the embedded schema JSON is invalid (this should never happen).
#[must_use]
pub fn load_resource_specification_schema() -> Value {
    serde_json::from_str(RESOURCE_SPECIFICATION_SCHEMA_JSON)
        .expect("Failed to parse embedded resource specification schema - this should never happen")
}

/// Load the template schema
///
/// # Panics
///
/// Panics if the embedded schema JSON is invalid (this should never happen).
#[must_use]
pub fn load_template_schema() -> Value {
    serde_json::from_str(TEMPLATE_SCHEMA_JSON)
        .expect("Failed to parse embedded template schema - this should never happen")
}

/// Validates `data` against `schema`, returning one message per violation.
pub fn validate_with_schema(schema: &Value, data: &Value) -> Result<(), Vec<String>> {
    let compiled = JSONSchema::compile(schema)
        .map_err(|err| vec![format!("Failed to compile schema: {err}")])?;

    let result = compiled.validate(data);
    if let Err(errors) = result {
        let messages: Vec<String> = errors
            .map(|error| {
                let path = error.instance_path.to_string();
                if path.is_empty() {
                    error.to_string()
                } else {
                    format!("{path}: {error}")
                }
            })
            .collect();
        return Err(messages);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_load_resource_specification_schema() {
        let schema = load_resource_specification_schema();
        assert!(schema.is_object());
        assert_eq!(schema["$schema"], "http://json-schema.org/draft-07/schema#");
    }

    #[test]
    fn test_load_template_schema() {
        let schema = load_template_schema();
        assert!(schema.is_object());
        assert_eq!(schema["$schema"], "http://json-schema.org/draft-07/schema#");
    }

    #[test]
    fn test_template_schema_accepts_minimal_template() {
        let template = json!({
            "AWSTemplateFormatVersion": "2010-09-09",
            "Resources": {
                "Topic": { "Type": "AWS::SNS::Topic" }
            }
        });
        assert!(validate_with_schema(&load_template_schema(), &template).is_ok());
    }

    #[test]
    fn test_template_schema_rejects_resource_without_type() {
        let template = json!({
            "AWSTemplateFormatVersion": "2010-09-09",
            "Resources": {
                "Topic": { "Properties": {} }
            }
        });
        let errors = validate_with_schema(&load_template_schema(), &template).unwrap_err();
        assert!(!errors.is_empty());
        assert!(errors[0].contains("/Resources/Topic"));
    }
}
