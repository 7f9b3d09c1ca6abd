//! Model Schema System - Declarative Attribute Contracts
//!
//! A schema names a model type and declares its typed attributes once,
//! statically. Declared defaults are pushed through the same
//! transform/validate gate as runtime assignments, so a schema can never
//! carry a default its own kind would reject.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

use crate::properties::{PropertyDefault, PropertyDescriptor, PropertyKind, ValidationError};
use crate::value::Value;

pub type SchemaName = String;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("Invalid default for {schema}.{attribute}: {source}")]
    InvalidDefault {
        schema: String,
        attribute: String,
        #[source]
        source: ValidationError,
    },

    #[error("Default for {schema}.{attribute} is not a representable value")]
    UnsupportedDefault { schema: String, attribute: String },

    #[error("Failed to read schema spec: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed schema spec: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// A model type: a name plus its attribute declarations.
#[derive(Debug, Clone)]
pub struct ModelSchema {
    name: SchemaName,
    attributes: BTreeMap<String, PropertyDescriptor>,
}

impl ModelSchema {
    pub fn builder(name: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder {
            name: name.into(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn descriptor(&self, attribute: &str) -> Option<&PropertyDescriptor> {
        self.attributes.get(attribute)
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&str, &PropertyDescriptor)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn attribute_count(&self) -> usize {
        self.attributes.len()
    }
}

/// Builds a [`ModelSchema`], gating every declared default.
pub struct SchemaBuilder {
    name: SchemaName,
    attributes: BTreeMap<String, PropertyDescriptor>,
}

impl SchemaBuilder {
    pub fn attribute(mut self, name: impl Into<String>, descriptor: PropertyDescriptor) -> Self {
        self.attributes.insert(name.into(), descriptor);
        self
    }

    /// Finalize the schema. Declared defaults are normalized and validated
    /// here, and stored in canonical form.
    pub fn build(self) -> Result<ModelSchema, SchemaError> {
        let mut attributes = BTreeMap::new();
        for (attr, mut descriptor) in self.attributes {
            if let PropertyDefault::Value(value) = descriptor.default {
                let normalized = descriptor.kind.transform(value);
                descriptor.kind.validate(&normalized, true).map_err(|source| {
                    SchemaError::InvalidDefault {
                        schema: self.name.clone(),
                        attribute: attr.clone(),
                        source,
                    }
                })?;
                descriptor.default = PropertyDefault::Value(normalized);
            }
            attributes.insert(attr, descriptor);
        }
        Ok(ModelSchema {
            name: self.name,
            attributes,
        })
    }
}

/// On-disk JSON form of a schema, for the CLI bridge.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaSpec {
    pub name: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, AttributeSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeSpec {
    pub kind: PropertyKind,
    #[serde(default)]
    pub default: Option<serde_json::Value>,
    #[serde(default)]
    pub help: Option<String>,
}

impl SchemaSpec {
    /// Turn the spec into a validated [`ModelSchema`].
    pub fn into_schema(self) -> Result<ModelSchema, SchemaError> {
        let mut builder = ModelSchema::builder(self.name.clone());
        for (attr, spec) in self.attributes {
            let mut descriptor = PropertyDescriptor::new(spec.kind);
            if let Some(json) = &spec.default {
                let value =
                    Value::from_json(json).ok_or_else(|| SchemaError::UnsupportedDefault {
                        schema: self.name.clone(),
                        attribute: attr.clone(),
                    })?;
                descriptor = descriptor.with_default(value);
            }
            if let Some(help) = spec.help {
                descriptor = descriptor.with_help(help);
            }
            builder = builder.attribute(attr, descriptor);
        }
        builder.build()
    }
}

/// Schema registry - loads and caches model schemas.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    schemas: HashMap<SchemaName, Arc<ModelSchema>>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self {
            schemas: HashMap::new(),
        }
    }

    /// Load every `*.json` schema spec in a directory. Files that fail to
    /// read, parse, or validate are skipped with a warning.
    pub fn load_from_dir(dir: &Path) -> Result<Self, std::io::Error> {
        let mut registry = Self::new();
        if dir.exists() {
            for entry in fs::read_dir(dir)? {
                let entry = entry?;
                let path = entry.path();
                if path.extension().map_or(false, |e| e == "json") {
                    let loaded = fs::read_to_string(&path)
                        .map_err(SchemaError::from)
                        .and_then(|content| {
                            serde_json::from_str::<SchemaSpec>(&content).map_err(SchemaError::from)
                        })
                        .and_then(SchemaSpec::into_schema);
                    match loaded {
                        Ok(schema) => registry.register(schema),
                        Err(error) => {
                            warn!(path = %path.display(), %error, "skipping schema spec");
                        }
                    }
                }
            }
        }
        Ok(registry)
    }

    pub fn get(&self, name: &str) -> Option<&Arc<ModelSchema>> {
        self.schemas.get(name)
    }

    /// All registered schemas, ordered by name for deterministic output.
    pub fn list(&self) -> Vec<&ModelSchema> {
        let mut schemas: Vec<_> = self.schemas.values().map(Arc::as_ref).collect();
        schemas.sort_by_key(|s| s.name());
        schemas
    }

    pub fn register(&mut self, schema: ModelSchema) {
        self.schemas.insert(schema.name().to_string(), Arc::new(schema));
    }
}
