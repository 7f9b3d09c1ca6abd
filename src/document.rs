//! Document - Single Entry Point for Model State
//!
//! CRITICAL: every attribute write flows through transform + validate. No
//! bypass. A rejected write leaves the previous value untouched, and a
//! rejected bulk apply changes nothing at all.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::properties::{PropertyDefault, ValidationError};
use crate::schema::{ModelSchema, SchemaRegistry};
use crate::theme::{Theme, ValueSource};
use crate::value::Value;
use crate::MODEL_VERSION;

#[cfg(feature = "test-hooks")]
use std::sync::atomic::{AtomicU32, Ordering};

#[cfg(feature = "test-hooks")]
static VALIDATION_CALL_COUNT: AtomicU32 = AtomicU32::new(0);

#[cfg(feature = "test-hooks")]
pub fn get_validation_call_count() -> u32 {
    VALIDATION_CALL_COUNT.load(Ordering::SeqCst)
}

#[cfg(feature = "test-hooks")]
pub fn reset_validation_call_count() {
    VALIDATION_CALL_COUNT.store(0, Ordering::SeqCst);
}

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("Schema not found: {0}")]
    SchemaNotFound(String),

    #[error("Model not found: {0}")]
    ModelNotFound(Uuid),

    #[error("Unknown attribute {attribute} on {schema}")]
    UnknownAttribute { schema: String, attribute: String },

    #[error("Attribute {attribute} rejected: {source}")]
    Rejected {
        attribute: String,
        #[source]
        source: ValidationError,
    },

    #[error("Payload entry {attribute} is not a representable value")]
    UnsupportedPayload { attribute: String },
}

/// One model: an id, its schema, and the attributes explicitly set on it.
///
/// Invariant: `values` only ever holds values that passed validation for
/// their declared kind. Unset attributes are simply absent.
#[derive(Debug, Clone)]
pub struct ModelInstance {
    id: Uuid,
    schema: Arc<ModelSchema>,
    values: BTreeMap<String, Value>,
}

impl ModelInstance {
    pub fn new(schema: Arc<ModelSchema>) -> Self {
        Self {
            id: Uuid::new_v4(),
            schema,
            values: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn schema(&self) -> &ModelSchema {
        &self.schema
    }

    /// Assign one attribute: transform, validate, store. Validation re-runs
    /// on every assignment; a rejected write changes nothing.
    pub fn set(&mut self, attribute: &str, value: Value) -> Result<(), DocumentError> {
        let descriptor = self.schema.descriptor(attribute).ok_or_else(|| {
            DocumentError::UnknownAttribute {
                schema: self.schema.name().to_string(),
                attribute: attribute.to_string(),
            }
        })?;

        #[cfg(feature = "test-hooks")]
        VALIDATION_CALL_COUNT.fetch_add(1, Ordering::SeqCst);

        let normalized = descriptor.kind.transform(value);
        descriptor
            .kind
            .validate(&normalized, true)
            .map_err(|source| DocumentError::Rejected {
                attribute: attribute.to_string(),
                source,
            })?;

        self.values.insert(attribute.to_string(), normalized);
        Ok(())
    }

    /// The explicitly-set value, if any. Defaults and themes are resolved
    /// through [`ModelInstance::resolved`].
    pub fn get(&self, attribute: &str) -> Option<&Value> {
        self.values.get(attribute)
    }

    /// Effective value under User -> Theme -> SchemaDefault precedence,
    /// tagged with where it came from.
    pub fn resolved(&self, attribute: &str, theme: &Theme) -> (ValueSource, Option<Value>) {
        if let Some(value) = self.values.get(attribute) {
            return (ValueSource::User, Some(value.clone()));
        }
        if let Some(value) = theme.override_for(self.schema.name(), attribute) {
            return (ValueSource::Theme, Some(value.clone()));
        }
        if let Some(descriptor) = self.schema.descriptor(attribute) {
            if let PropertyDefault::Value(value) = &descriptor.default {
                return (ValueSource::SchemaDefault, Some(value.clone()));
            }
        }
        (ValueSource::Unset, None)
    }

    /// Atomic multi-attribute update from a JSON payload.
    ///
    /// Every entry is vetted first (the bulk pass skips message formatting);
    /// only if all pass is anything committed. On failure the offender is
    /// re-validated with detail on for the caller-facing report.
    pub fn apply(
        &mut self,
        payload: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<(), DocumentError> {
        let mut staged = Vec::with_capacity(payload.len());

        for (attribute, json) in payload {
            let descriptor = self.schema.descriptor(attribute).ok_or_else(|| {
                DocumentError::UnknownAttribute {
                    schema: self.schema.name().to_string(),
                    attribute: attribute.clone(),
                }
            })?;
            let value = Value::from_json(json).ok_or_else(|| {
                DocumentError::UnsupportedPayload {
                    attribute: attribute.clone(),
                }
            })?;

            #[cfg(feature = "test-hooks")]
            VALIDATION_CALL_COUNT.fetch_add(1, Ordering::SeqCst);

            let normalized = descriptor.kind.transform(value);
            descriptor
                .kind
                .validate(&normalized, false)
                .or_else(|_| descriptor.kind.validate(&normalized, true))
                .map_err(|source| {
                    debug!(model = %self.id, attribute = %attribute, "bulk apply rejected");
                    DocumentError::Rejected {
                        attribute: attribute.clone(),
                        source,
                    }
                })?;
            staged.push((attribute.clone(), normalized));
        }

        for (attribute, value) in staged {
            self.values.insert(attribute, value);
        }
        Ok(())
    }

    /// JSON dump of this instance with attributes in canonical form.
    pub fn to_json(&self) -> serde_json::Value {
        let attributes: serde_json::Map<String, serde_json::Value> = self
            .values
            .iter()
            .map(|(name, value)| (name.clone(), value.to_json()))
            .collect();
        serde_json::json!({
            "id": self.id.to_string(),
            "type": self.schema.name(),
            "attributes": attributes,
        })
    }
}

/// The document: owns the registry, the active theme, and the model
/// instances, in creation order.
#[derive(Debug, Default)]
pub struct Document {
    registry: SchemaRegistry,
    theme: Theme,
    models: Vec<ModelInstance>,
    index: HashMap<Uuid, usize>,
}

impl Document {
    pub fn new(registry: SchemaRegistry) -> Self {
        Self {
            registry,
            theme: Theme::default(),
            models: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    pub fn set_theme(&mut self, theme: Theme) {
        self.theme = theme;
    }

    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    /// Instantiate a registered schema, returning the new model's id.
    pub fn create(&mut self, schema_name: &str) -> Result<Uuid, DocumentError> {
        let schema = self
            .registry
            .get(schema_name)
            .ok_or_else(|| DocumentError::SchemaNotFound(schema_name.to_string()))?;
        let instance = ModelInstance::new(Arc::clone(schema));
        let id = instance.id();
        debug!(model = %id, schema = schema_name, "created model instance");
        self.index.insert(id, self.models.len());
        self.models.push(instance);
        Ok(id)
    }

    pub fn instance(&self, id: Uuid) -> Result<&ModelInstance, DocumentError> {
        self.index
            .get(&id)
            .map(|&i| &self.models[i])
            .ok_or(DocumentError::ModelNotFound(id))
    }

    fn instance_mut(&mut self, id: Uuid) -> Result<&mut ModelInstance, DocumentError> {
        match self.index.get(&id) {
            Some(&i) => Ok(&mut self.models[i]),
            None => Err(DocumentError::ModelNotFound(id)),
        }
    }

    pub fn set(&mut self, id: Uuid, attribute: &str, value: Value) -> Result<(), DocumentError> {
        self.instance_mut(id)?.set(attribute, value)
    }

    pub fn get(&self, id: Uuid, attribute: &str) -> Result<Option<&Value>, DocumentError> {
        Ok(self.instance(id)?.get(attribute))
    }

    /// Effective value for an attribute under the document's theme.
    pub fn resolved(
        &self,
        id: Uuid,
        attribute: &str,
    ) -> Result<(ValueSource, Option<Value>), DocumentError> {
        Ok(self.instance(id)?.resolved(attribute, &self.theme))
    }

    /// Atomically apply a JSON payload to one model.
    pub fn apply(
        &mut self,
        id: Uuid,
        payload: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<(), DocumentError> {
        self.instance_mut(id)?.apply(payload)
    }

    /// Deterministic dump of the whole document, models in creation order.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "version": MODEL_VERSION,
            "models": self.models.iter().map(ModelInstance::to_json).collect::<Vec<_>>(),
        })
    }
}
