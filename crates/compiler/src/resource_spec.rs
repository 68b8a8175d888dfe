/*!
 * Copyright 2025 Release Workshop Ltd
 * Licensed under the Elastic License 2.0; you may not use this file except in compliance with the Elastic License 2.0.
 * See the LICENSE file in the project root for details.
 */
//! Resource-type specification: the known resource types with their
//! properties and attributes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ResourceSpecError;
use crate::schemas::{load_resource_specification_schema, validate_with_schema};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResourceSpecification {
    #[serde(default)]
    pub resource_specification_version: Option<String>,
    #[serde(default)]
    pub resource_types: BTreeMap<String, ResourceTypeSpec>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResourceTypeSpec {
    #[serde(default)]
    pub documentation: Option<String>,
    #[serde(default)]
    pub properties: BTreeMap<String, PropertySpec>,
    #[serde(default)]
    pub attributes: BTreeMap<String, AttributeSpec>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PropertySpec {
    #[serde(default)]
    pub documentation: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub primitive_type: Option<String>,
    #[serde(default)]
    pub primitive_item_type: Option<String>,
    #[serde(default)]
    pub r#type: Option<String>,
    #[serde(default)]
    pub item_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AttributeSpec {
    #[serde(default)]
    pub primitive_type: Option<String>,
    #[serde(default)]
    pub primitive_item_type: Option<String>,
    #[serde(default)]
    pub r#type: Option<String>,
}

impl ResourceSpecification {
    /// Parses and schema-checks a specification document.
    pub fn from_json(text: &str) -> Result<Self, ResourceSpecError> {
        let document: Value = serde_json::from_str(text)
            .map_err(|err| ResourceSpecError::InvalidJson(err.to_string()))?;
        Self::from_value(document)
    }

    pub fn from_value(document: Value) -> Result<Self, ResourceSpecError> {
        validate_with_schema(&load_resource_specification_schema(), &document)
            .map_err(|errors| ResourceSpecError::SchemaValidation(errors.join("; ")))?;
        serde_json::from_value(document).map_err(|err| ResourceSpecError::InvalidJson(err.to_string()))
    }

    pub fn resource_type(&self, name: &str) -> Option<&ResourceTypeSpec> {
        self.resource_types.get(name)
    }

    pub fn has_resource_type(&self, name: &str) -> bool {
        self.resource_types.contains_key(name)
    }
}

impl ResourceTypeSpec {
    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    pub fn required_properties(&self) -> impl Iterator<Item = &str> {
        self.properties
            .iter()
            .filter(|(_, property)| property.required)
            .map(|(name, _)| name.as_str())
    }
}

/// Supplies the resource specification for a region and version.
pub trait ResourceSpecProvider {
    fn read_resource_type_spec(
        &self,
        region: &str,
        version: &str,
    ) -> Result<ResourceSpecification, ResourceSpecError>;
}

/// Serves one already-loaded document regardless of region and version.
impl ResourceSpecProvider for ResourceSpecification {
    fn read_resource_type_spec(
        &self,
        _region: &str,
        _version: &str,
    ) -> Result<ResourceSpecification, ResourceSpecError> {
        Ok(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPEC: &str = r#"{
        "ResourceSpecificationVersion": "1.0.0",
        "ResourceTypes": {
            "AWS::SNS::Topic": {
                "Properties": {
                    "TopicName": { "PrimitiveType": "String", "Required": false }
                },
                "Attributes": {
                    "TopicName": { "PrimitiveType": "String" }
                }
            },
            "AWS::SQS::Queue": {
                "Properties": {
                    "QueueName": { "PrimitiveType": "String" },
                    "Tags": { "Type": "List", "ItemType": "Tag", "Required": true }
                },
                "Attributes": {
                    "Arn": { "PrimitiveType": "String" }
                }
            }
        }
    }"#;

    #[test]
    fn test_from_json() {
        let spec = ResourceSpecification::from_json(SPEC).unwrap();
        assert_eq!(spec.resource_specification_version.as_deref(), Some("1.0.0"));
        assert!(spec.has_resource_type("AWS::SNS::Topic"));
        let queue = spec.resource_type("AWS::SQS::Queue").unwrap();
        assert!(queue.has_attribute("Arn"));
        assert_eq!(queue.required_properties().collect::<Vec<_>>(), vec!["Tags"]);
    }

    #[test]
    fn test_invalid_json() {
        let err = ResourceSpecification::from_json("{").unwrap_err();
        assert!(matches!(err, ResourceSpecError::InvalidJson(_)));
    }

    #[test]
    fn test_schema_violation() {
        let err = ResourceSpecification::from_json(r#"{"ResourceTypes": {"X": {"Properties": {"A": {"Required": "yes"}}}}}"#)
            .unwrap_err();
        assert!(matches!(err, ResourceSpecError::SchemaValidation(_)));
    }

    #[test]
    fn test_specification_is_its_own_provider() {
        let spec = ResourceSpecification::from_json(SPEC).unwrap();
        let served = spec.read_resource_type_spec("us-east-1", "latest").unwrap();
        assert_eq!(served, spec);
    }
}
