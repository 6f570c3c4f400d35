//! Schema model: record types, attributes and relationships, validated once and immutable afterwards.

pub mod inflector;
pub mod types;
pub mod validator;

pub use inflector::Inflections;
pub use types::*;
pub use validator::validate;

use crate::error::SchemaError;
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Clone, Debug)]
pub struct Schema {
    models: BTreeMap<String, ModelDefinition>,
    inflections: Inflections,
}

impl Schema {
    /// Build and validate a schema. Fails on unknown relationship targets or asymmetric inverses.
    pub fn new(definition: SchemaDefinition) -> Result<Self, SchemaError> {
        let overrides = definition
            .inflections
            .as_ref()
            .map(|i| i.plurals.clone())
            .unwrap_or_default();
        let inflections = Inflections::for_types(definition.models.keys().map(String::as_str), &overrides);
        validate(&definition, &inflections)?;
        Ok(Schema {
            models: definition.models,
            inflections,
        })
    }

    pub fn from_models<K: Into<String>>(
        models: impl IntoIterator<Item = (K, ModelDefinition)>,
    ) -> Result<Self, SchemaError> {
        Schema::new(SchemaDefinition {
            models: models.into_iter().map(|(k, v)| (k.into(), v)).collect(),
            inflections: None,
        })
    }

    pub fn from_json(value: Value) -> Result<Self, SchemaError> {
        let definition: SchemaDefinition =
            serde_json::from_value(value).map_err(|e| SchemaError::Load(e.to_string()))?;
        Schema::new(definition)
    }

    pub fn models(&self) -> impl Iterator<Item = (&String, &ModelDefinition)> {
        self.models.iter()
    }

    pub fn model_names(&self) -> impl Iterator<Item = &str> {
        self.models.keys().map(String::as_str)
    }

    pub fn has_model(&self, type_name: &str) -> bool {
        self.models.contains_key(type_name)
    }

    pub fn model(&self, type_name: &str) -> Result<&ModelDefinition, SchemaError> {
        self.models
            .get(type_name)
            .ok_or_else(|| SchemaError::UnknownModel(type_name.to_string()))
    }

    pub fn attribute(&self, type_name: &str, name: &str) -> Option<&AttributeDefinition> {
        self.models.get(type_name)?.attributes.get(name)
    }

    pub fn relationship(&self, type_name: &str, name: &str) -> Option<&RelationshipDefinition> {
        self.models.get(type_name)?.relationships.get(name)
    }

    pub fn inflections(&self) -> &Inflections {
        &self.inflections
    }

    pub fn pluralize(&self, word: &str) -> String {
        self.inflections.pluralize(word)
    }

    pub fn singularize(&self, word: &str) -> String {
        self.inflections.singularize(word)
    }

    pub fn generate_id(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }

    /// Introspection document served at `GET /schema`.
    pub fn to_json(&self, include_inflections: bool) -> Value {
        let models = serde_json::to_value(&self.models).unwrap_or(Value::Null);
        if include_inflections {
            serde_json::json!({
                "models": models,
                "inflections": {
                    "plurals": self.inflections.plurals(),
                    "singulars": self.inflections.singulars(),
                }
            })
        } else {
            serde_json::json!({ "models": models })
        }
    }
}
