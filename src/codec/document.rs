//! JSON:API resource documents.
//!
//! Wire type names are the dasherized plural of the model type (`solarSystem` -> `solar-systems`),
//! wire field names the dasherized property. Plurals always come from the schema's inflection
//! table. Whether `data` is an object or an array is decided by the caller, never by the count.

use crate::case::dasherize;
use crate::codec::validation::check_attribute;
use crate::error::{AppError, SchemaError};
use crate::record::{Identity, Linkage, Record};
use crate::schema::{RelationshipDefinition, Schema};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

/// How a deserialized resource obtains its id.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IdPolicy<'a> {
    /// Keep a client-supplied id, otherwise generate one.
    Generate,
    /// The id must be present in the document.
    Require,
    /// Route id: a document id must match it; a missing one takes it.
    Path(&'a str),
}

pub struct ResourceCodec {
    schema: Arc<Schema>,
    /// Wire resource type -> model type.
    record_types: BTreeMap<String, String>,
}

impl ResourceCodec {
    /// Fails when two model types map to the same wire resource type.
    pub fn new(schema: Arc<Schema>) -> Result<Self, SchemaError> {
        let mut record_types = BTreeMap::new();
        for type_name in schema.model_names() {
            let wire = dasherize(&schema.pluralize(type_name));
            if record_types.insert(wire.clone(), type_name.to_string()).is_some() {
                return Err(SchemaError::DuplicateResourceType(wire));
            }
        }
        Ok(ResourceCodec { schema, record_types })
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn resource_type(&self, type_name: &str) -> String {
        dasherize(&self.schema.pluralize(type_name))
    }

    pub fn record_type(&self, resource_type: &str) -> Option<&str> {
        self.record_types.get(resource_type).map(String::as_str)
    }

    pub fn resource_field(&self, property: &str) -> String {
        dasherize(property)
    }

    /// Internal attribute for a wire field; `id` maps to itself. `None` for anything undeclared.
    pub fn record_attribute(&self, type_name: &str, field: &str) -> Option<String> {
        if field == "id" {
            return Some("id".to_string());
        }
        let model = self.schema.model(type_name).ok()?;
        model
            .attributes
            .keys()
            .find(|name| dasherize(name) == field)
            .cloned()
    }

    pub fn record_relationship(&self, type_name: &str, field: &str) -> Option<String> {
        let model = self.schema.model(type_name).ok()?;
        model
            .relationships
            .keys()
            .find(|name| dasherize(name) == field)
            .cloned()
    }

    pub fn resource_identity(&self, identity: &Identity) -> Value {
        json!({ "type": self.resource_type(&identity.type_name), "id": identity.id })
    }

    pub fn serialize_record(&self, record: &Record) -> Value {
        let attributes: Map<String, Value> = record
            .attributes
            .iter()
            .map(|(k, v)| (self.resource_field(k), v.clone()))
            .collect();
        let relationships: Map<String, Value> = record
            .relationships
            .iter()
            .map(|(k, linkage)| {
                let data = match linkage {
                    Linkage::Many(ids) => Value::Array(ids.iter().map(|i| self.resource_identity(i)).collect()),
                    Linkage::One(Some(id)) => self.resource_identity(id),
                    Linkage::One(None) => Value::Null,
                };
                (self.resource_field(k), json!({ "data": data }))
            })
            .collect();
        let mut resource = Map::new();
        resource.insert("type".into(), Value::String(self.resource_type(&record.type_name)));
        resource.insert("id".into(), Value::String(record.id.clone()));
        resource.insert("attributes".into(), Value::Object(attributes));
        if !relationships.is_empty() {
            resource.insert("relationships".into(), Value::Object(relationships));
        }
        Value::Object(resource)
    }

    pub fn serialize_one(&self, record: Option<&Record>) -> Value {
        json!({ "data": record.map(|r| self.serialize_record(r)) })
    }

    pub fn serialize_many(&self, records: &[Record]) -> Value {
        json!({ "data": records.iter().map(|r| self.serialize_record(r)).collect::<Vec<_>>() })
    }

    /// Parse `{data: resource}` for `expected_type`.
    pub fn deserialize_document(&self, document: &Value, expected_type: &str, ids: IdPolicy<'_>) -> Result<Record, AppError> {
        let data = document
            .get("data")
            .ok_or_else(|| AppError::Validation("document has no 'data' member".into()))?;
        self.deserialize_resource(data, expected_type, ids)
    }

    /// Parse one resource object. Undeclared attributes and relationships are dropped; relationships
    /// that are absent stay absent so updates leave them untouched.
    pub fn deserialize_resource(&self, resource: &Value, expected_type: &str, ids: IdPolicy<'_>) -> Result<Record, AppError> {
        let object = resource
            .as_object()
            .ok_or_else(|| AppError::Validation("resource must be a JSON object".into()))?;
        let wire_type = object
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| AppError::Validation("resource has no 'type'".into()))?;
        let type_name = self.record_type(wire_type).ok_or_else(|| {
            AppError::Validation(format!("unknown resource type '{}'", wire_type))
        })?;
        if type_name != expected_type {
            return Err(AppError::Validation(format!(
                "resource type '{}' does not match '{}'",
                wire_type,
                self.resource_type(expected_type)
            )));
        }

        let supplied = match object.get("id") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            Some(_) => return Err(AppError::Validation("resource 'id' must be a string".into())),
        };
        let id = match (ids, supplied) {
            (IdPolicy::Path(path), Some(id)) if id != path => {
                return Err(AppError::Validation(format!(
                    "resource id '{}' does not match the URL id '{}'",
                    id, path
                )))
            }
            (IdPolicy::Path(path), _) => path.to_string(),
            (_, Some(id)) => id,
            (IdPolicy::Generate, None) => self.schema.generate_id(),
            (IdPolicy::Require, None) => {
                return Err(AppError::Validation("resource has no 'id'".into()))
            }
        };

        let mut record = Record::new(type_name, id);
        if let Some(attributes) = object.get("attributes") {
            let attributes = attributes
                .as_object()
                .ok_or_else(|| AppError::Validation("'attributes' must be an object".into()))?;
            for (field, value) in attributes {
                let Some(name) = self.record_attribute(type_name, field).filter(|n| n != "id") else { continue };
                if let Some(def) = self.schema.attribute(type_name, &name) {
                    check_attribute(type_name, &name, &def.kind, value)?;
                }
                record.attributes.insert(name, value.clone());
            }
        }
        if let Some(relationships) = object.get("relationships") {
            let relationships = relationships
                .as_object()
                .ok_or_else(|| AppError::Validation("'relationships' must be an object".into()))?;
            for (field, value) in relationships {
                let Some(name) = self.record_relationship(type_name, field) else { continue };
                let Some(data) = value.get("data") else { continue };
                let Some(def) = self.schema.relationship(type_name, &name) else { continue };
                let linkage = self.deserialize_linkage(type_name, &name, def, data)?;
                record.relationships.insert(name, linkage);
            }
        }
        Ok(record)
    }

    /// Parse relationship `data` (`null`, an identifier object or an array of them) for `def`.
    pub fn deserialize_linkage(&self, type_name: &str, relationship: &str, def: &RelationshipDefinition, data: &Value) -> Result<Linkage, AppError> {
        match (def.is_many(), data) {
            (true, Value::Array(items)) => items
                .iter()
                .map(|item| self.deserialize_identity(type_name, relationship, def, item))
                .collect::<Result<Vec<_>, _>>()
                .map(Linkage::Many),
            (false, Value::Null) => Ok(Linkage::One(None)),
            (false, Value::Object(_)) => self
                .deserialize_identity(type_name, relationship, def, data)
                .map(|i| Linkage::One(Some(i))),
            (true, _) => Err(AppError::Validation(format!(
                "{}.{} is hasMany and expects an array",
                type_name, relationship
            ))),
            (false, _) => Err(AppError::Validation(format!(
                "{}.{} is hasOne and expects an object or null",
                type_name, relationship
            ))),
        }
    }

    /// Parse a `{data: ...}` relationship document as sent to the relationship routes.
    pub fn deserialize_linkage_document(&self, type_name: &str, relationship: &str, document: &Value) -> Result<Linkage, AppError> {
        let def = self.schema.relationship(type_name, relationship).ok_or_else(|| {
            AppError::NotFound(format!("relationship {}.{}", type_name, relationship))
        })?;
        let data = document
            .get("data")
            .ok_or_else(|| AppError::Validation("document has no 'data' member".into()))?;
        self.deserialize_linkage(type_name, relationship, def, data)
    }

    fn deserialize_identity(&self, type_name: &str, relationship: &str, def: &RelationshipDefinition, value: &Value) -> Result<Identity, AppError> {
        let wire_type = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| AppError::Validation("resource identifier has no 'type'".into()))?;
        let id = match value.get("id") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => return Err(AppError::Validation("resource identifier has no 'id'".into())),
        };
        let target = self
            .record_type(wire_type)
            .filter(|t| def.target.accepts(t))
            .ok_or_else(|| {
                AppError::Validation(format!(
                    "{}.{} cannot reference resources of type '{}'",
                    type_name, relationship, wire_type
                ))
            })?;
        Ok(Identity::new(target, id))
    }
}
