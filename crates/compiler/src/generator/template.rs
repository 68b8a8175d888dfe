/*!
 * Copyright 2025 Release Workshop Ltd
 * Licensed under the Elastic License 2.0; you may not use this file except in compliance with the Elastic License 2.0.
 * See the LICENSE file in the project root for details.
 */
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::SerializationError;
use crate::schemas::{load_template_schema, validate_with_schema};

pub const TEMPLATE_FORMAT_VERSION: &str = "2010-09-09";

/// Generated infrastructure template. Sections serialize in this order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Template {
    #[serde(rename = "AWSTemplateFormatVersion")]
    pub format_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub transform: Vec<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub parameters: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub mappings: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub conditions: Map<String, Value>,
    #[serde(default)]
    pub resources: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub outputs: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
}

impl Default for Template {
    fn default() -> Self {
        Self {
            format_version: TEMPLATE_FORMAT_VERSION.to_string(),
            description: None,
            transform: Vec::new(),
            parameters: Map::new(),
            mappings: Map::new(),
            conditions: Map::new(),
            resources: Map::new(),
            outputs: Map::new(),
            metadata: Map::new(),
        }
    }
}

impl Template {
    pub fn to_value(&self) -> Result<Value, SerializationError> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn to_json_pretty(&self) -> Result<String, SerializationError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Checks the template against the embedded template schema.
    pub fn validate(&self) -> Result<(), SerializationError> {
        validate_with_schema(&load_template_schema(), &self.to_value()?)
            .map_err(|errors| SerializationError::InvalidTemplate(errors.join("; ")))
    }

    pub fn resource(&self, logical_id: &str) -> Option<&Value> {
        self.resources.get(logical_id)
    }
}
