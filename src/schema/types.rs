//! Raw schema definition types matching the JSON schema document (`{models, inflections}`).

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;

/// Primitive kind of an attribute. Unrecognized kinds are kept so consumers can decide
/// whether they support them (the GraphQL builder rejects them, the codec passes values through).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AttributeKind {
    String,
    Number,
    Boolean,
    Date,
    DateTime,
    Other(String),
}

impl AttributeKind {
    pub fn as_str(&self) -> &str {
        match self {
            AttributeKind::String => "string",
            AttributeKind::Number => "number",
            AttributeKind::Boolean => "boolean",
            AttributeKind::Date => "date",
            AttributeKind::DateTime => "datetime",
            AttributeKind::Other(s) => s.as_str(),
        }
    }
}

impl From<&str> for AttributeKind {
    fn from(s: &str) -> Self {
        match s {
            "string" => AttributeKind::String,
            "number" => AttributeKind::Number,
            "boolean" => AttributeKind::Boolean,
            "date" => AttributeKind::Date,
            "datetime" => AttributeKind::DateTime,
            other => AttributeKind::Other(other.to_string()),
        }
    }
}

impl Serialize for AttributeKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for AttributeKind {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(AttributeKind::from(s.as_str()))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AttributeDefinition {
    #[serde(rename = "type")]
    pub kind: AttributeKind,
}

impl AttributeDefinition {
    pub fn new(kind: AttributeKind) -> Self {
        AttributeDefinition { kind }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RelationshipKind {
    HasOne,
    HasMany,
}

/// Target model of a relationship: one type, or a union of types (polymorphic).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RelationshipTarget {
    Single(String),
    Polymorphic(Vec<String>),
}

impl RelationshipTarget {
    pub fn single(&self) -> Option<&str> {
        match self {
            RelationshipTarget::Single(s) => Some(s.as_str()),
            RelationshipTarget::Polymorphic(v) if v.len() == 1 => Some(v[0].as_str()),
            RelationshipTarget::Polymorphic(_) => None,
        }
    }

    pub fn types(&self) -> Vec<&str> {
        match self {
            RelationshipTarget::Single(s) => vec![s.as_str()],
            RelationshipTarget::Polymorphic(v) => v.iter().map(String::as_str).collect(),
        }
    }

    pub fn accepts(&self, type_name: &str) -> bool {
        self.types().contains(&type_name)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dependent {
    Remove,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RelationshipDefinition {
    #[serde(alias = "type")]
    pub kind: RelationshipKind,
    #[serde(rename = "model")]
    pub target: RelationshipTarget,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inverse: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependent: Option<Dependent>,
}

impl RelationshipDefinition {
    pub fn has_one(target: impl Into<String>) -> Self {
        RelationshipDefinition {
            kind: RelationshipKind::HasOne,
            target: RelationshipTarget::Single(target.into()),
            inverse: None,
            dependent: None,
        }
    }

    pub fn has_many(target: impl Into<String>) -> Self {
        RelationshipDefinition {
            kind: RelationshipKind::HasMany,
            target: RelationshipTarget::Single(target.into()),
            inverse: None,
            dependent: None,
        }
    }

    pub fn inverse(mut self, inverse: impl Into<String>) -> Self {
        self.inverse = Some(inverse.into());
        self
    }

    pub fn dependent_remove(mut self) -> Self {
        self.dependent = Some(Dependent::Remove);
        self
    }

    pub fn is_many(&self) -> bool {
        self.kind == RelationshipKind::HasMany
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelDefinition {
    #[serde(default)]
    pub attributes: BTreeMap<String, AttributeDefinition>,
    #[serde(default)]
    pub relationships: BTreeMap<String, RelationshipDefinition>,
}

impl ModelDefinition {
    pub fn new() -> Self {
        ModelDefinition::default()
    }

    pub fn attribute(mut self, name: impl Into<String>, kind: AttributeKind) -> Self {
        self.attributes.insert(name.into(), AttributeDefinition::new(kind));
        self
    }

    pub fn relationship(mut self, name: impl Into<String>, def: RelationshipDefinition) -> Self {
        self.relationships.insert(name.into(), def);
        self
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct InflectionConfig {
    /// Singular type -> plural overrides, e.g. `{"person": "people"}`.
    #[serde(default)]
    pub plurals: BTreeMap<String, String>,
}

/// Full schema document as loaded from JSON.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaDefinition {
    pub models: BTreeMap<String, ModelDefinition>,
    #[serde(default)]
    pub inflections: Option<InflectionConfig>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_schema_document() {
        let doc = serde_json::json!({
            "models": {
                "planet": {
                    "attributes": {"name": {"type": "string"}, "mass": {"type": "number"}},
                    "relationships": {
                        "moons": {"kind": "hasMany", "model": "moon", "inverse": "planet", "dependent": "remove"}
                    }
                },
                "moon": {
                    "attributes": {"name": {"type": "string"}, "tags": {"type": "array"}},
                    "relationships": {"planet": {"type": "hasOne", "model": "planet", "inverse": "moons"}}
                },
                "comment": {
                    "relationships": {"subject": {"kind": "hasOne", "model": ["planet", "moon"]}}
                }
            }
        });
        let def: SchemaDefinition = serde_json::from_value(doc).unwrap();
        let planet = &def.models["planet"];
        assert_eq!(planet.attributes["mass"].kind, AttributeKind::Number);
        let moons = &planet.relationships["moons"];
        assert!(moons.is_many());
        assert_eq!(moons.dependent, Some(Dependent::Remove));
        assert_eq!(moons.target.single(), Some("moon"));
        assert_eq!(
            def.models["moon"].attributes["tags"].kind,
            AttributeKind::Other("array".into())
        );
        let subject = &def.models["comment"].relationships["subject"];
        assert_eq!(subject.target.single(), None);
        assert!(subject.target.accepts("moon"));
    }
}
