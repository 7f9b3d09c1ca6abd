//! Theme System - Attribute Default Authority
//!
//! Names where an attribute's effective value comes from, and carries
//! validated per-schema default overrides. Overrides pass the same
//! transform/validate gate as user assignments, so a theme can never
//! smuggle in a value the attribute's kind would reject.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::properties::ValidationError;
use crate::schema::SchemaRegistry;
use crate::value::Value;

/// ValueSource determines where an attribute's effective value comes from.
/// This prevents if/else sprawl at read sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueSource {
    /// No value anywhere: never set, no theme override, no schema default.
    Unset,
    /// The default declared on the schema attribute.
    SchemaDefault,
    /// A theme override.
    Theme,
    /// An explicit assignment on the instance.
    User,
}

impl Default for ValueSource {
    fn default() -> Self {
        Self::Unset
    }
}

#[derive(Debug, Error)]
pub enum ThemeError {
    #[error("Theme override targets unknown schema: {0}")]
    UnknownSchema(String),

    #[error("Theme override targets unknown attribute {schema}.{attribute}")]
    UnknownAttribute { schema: String, attribute: String },

    #[error("Theme override for {schema}.{attribute} is not a representable value")]
    UnsupportedValue { schema: String, attribute: String },

    #[error("Theme override for {schema}.{attribute} rejected: {source}")]
    Rejected {
        schema: String,
        attribute: String,
        #[source]
        source: ValidationError,
    },

    #[error("Failed to read theme spec: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed theme spec: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// On-disk JSON form of a theme: schema name -> attribute -> value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemeSpec {
    #[serde(default)]
    pub overrides: BTreeMap<String, BTreeMap<String, serde_json::Value>>,
}

/// Validated attribute-default overrides, stored in canonical form.
#[derive(Debug, Clone, Default)]
pub struct Theme {
    overrides: BTreeMap<String, BTreeMap<String, Value>>,
}

impl Theme {
    /// Validate a spec against the registry. Every override must target a
    /// registered schema and attribute, and pass that attribute's gate.
    pub fn from_spec(spec: ThemeSpec, registry: &SchemaRegistry) -> Result<Self, ThemeError> {
        let mut overrides = BTreeMap::new();
        for (schema_name, attrs) in spec.overrides {
            let schema = registry
                .get(&schema_name)
                .ok_or_else(|| ThemeError::UnknownSchema(schema_name.clone()))?;

            let mut validated = BTreeMap::new();
            for (attribute, json) in attrs {
                let descriptor = schema.descriptor(&attribute).ok_or_else(|| {
                    ThemeError::UnknownAttribute {
                        schema: schema_name.clone(),
                        attribute: attribute.clone(),
                    }
                })?;
                let value =
                    Value::from_json(&json).ok_or_else(|| ThemeError::UnsupportedValue {
                        schema: schema_name.clone(),
                        attribute: attribute.clone(),
                    })?;
                let normalized = descriptor.kind.transform(value);
                descriptor
                    .kind
                    .validate(&normalized, true)
                    .map_err(|source| ThemeError::Rejected {
                        schema: schema_name.clone(),
                        attribute: attribute.clone(),
                        source,
                    })?;
                validated.insert(attribute, normalized);
            }
            overrides.insert(schema_name, validated);
        }
        Ok(Self { overrides })
    }

    /// Load and validate a theme spec from a JSON file.
    pub fn load(path: &Path, registry: &SchemaRegistry) -> Result<Self, ThemeError> {
        let content = fs::read_to_string(path)?;
        let spec: ThemeSpec = serde_json::from_str(&content)?;
        Self::from_spec(spec, registry)
    }

    pub fn override_for(&self, schema: &str, attribute: &str) -> Option<&Value> {
        self.overrides.get(schema)?.get(attribute)
    }

    pub fn is_empty(&self) -> bool {
        self.overrides.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::properties::{PropertyDescriptor, PropertyKind};
    use crate::schema::ModelSchema;

    fn registry() -> SchemaRegistry {
        let schema = ModelSchema::builder("time_annotation")
            .attribute("start", PropertyDescriptor::new(PropertyKind::Datetime))
            .attribute("label_date", PropertyDescriptor::new(PropertyKind::Date))
            .build()
            .unwrap();
        let mut registry = SchemaRegistry::new();
        registry.register(schema);
        registry
    }

    #[test]
    fn test_valid_overrides_are_normalized() {
        let spec: ThemeSpec = serde_json::from_str(
            r#"{"overrides": {"time_annotation": {"start": "2024-01-15T08:30:00"}}}"#,
        )
        .unwrap();
        let theme = Theme::from_spec(spec, &registry()).unwrap();
        let value = theme.override_for("time_annotation", "start").unwrap();
        assert!(matches!(value, Value::Datetime(_)));
    }

    #[test]
    fn test_invalid_override_value_is_rejected() {
        let spec: ThemeSpec = serde_json::from_str(
            r#"{"overrides": {"time_annotation": {"label_date": "soon"}}}"#,
        )
        .unwrap();
        assert!(matches!(
            Theme::from_spec(spec, &registry()),
            Err(ThemeError::Rejected { .. })
        ));
    }

    #[test]
    fn test_unknown_targets_are_rejected() {
        let spec: ThemeSpec =
            serde_json::from_str(r#"{"overrides": {"missing": {"x": 1}}}"#).unwrap();
        assert!(matches!(
            Theme::from_spec(spec, &registry()),
            Err(ThemeError::UnknownSchema(_))
        ));

        let spec: ThemeSpec = serde_json::from_str(
            r#"{"overrides": {"time_annotation": {"missing": 1}}}"#,
        )
        .unwrap();
        assert!(matches!(
            Theme::from_spec(spec, &registry()),
            Err(ThemeError::UnknownAttribute { .. })
        ));
    }
}
