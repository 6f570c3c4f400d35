//! Internal record representation: identities, relationship linkage, records.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// `{type, id}` pair uniquely addressing a record.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Identity {
    #[serde(rename = "type")]
    pub type_name: String,
    pub id: String,
}

impl Identity {
    pub fn new(type_name: impl Into<String>, id: impl Into<String>) -> Self {
        Identity {
            type_name: type_name.into(),
            id: id.into(),
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.type_name, self.id)
    }
}

/// Relationship data. A hasOne slot holds zero or one identity; a hasMany slot holds an ordered set.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Linkage {
    Many(Vec<Identity>),
    One(Option<Identity>),
}

impl Linkage {
    pub fn identities(&self) -> Vec<&Identity> {
        match self {
            Linkage::Many(ids) => ids.iter().collect(),
            Linkage::One(id) => id.iter().collect(),
        }
    }

    pub fn contains(&self, identity: &Identity) -> bool {
        match self {
            Linkage::Many(ids) => ids.contains(identity),
            Linkage::One(id) => id.as_ref() == Some(identity),
        }
    }
}

/// A record: `{type, id, attributes, relationships}`.
///
/// A relationship key that is absent means "unspecified" (leave as is on update);
/// a key present with `One(None)` or `Many(vec![])` means "clear".
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Record {
    #[serde(rename = "type")]
    pub type_name: String,
    pub id: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, Value>,
    #[serde(default)]
    pub relationships: BTreeMap<String, Linkage>,
}

impl Record {
    pub fn new(type_name: impl Into<String>, id: impl Into<String>) -> Self {
        Record {
            type_name: type_name.into(),
            id: id.into(),
            attributes: BTreeMap::new(),
            relationships: BTreeMap::new(),
        }
    }

    pub fn identity(&self) -> Identity {
        Identity::new(self.type_name.clone(), self.id.clone())
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn with_has_one(mut self, name: impl Into<String>, related: Option<Identity>) -> Self {
        self.relationships.insert(name.into(), Linkage::One(related));
        self
    }

    pub fn with_has_many(mut self, name: impl Into<String>, related: Vec<Identity>) -> Self {
        self.relationships.insert(name.into(), Linkage::Many(related));
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    pub fn relationship(&self, name: &str) -> Option<&Linkage> {
        self.relationships.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linkage_deserializes_by_shape() {
        let many: Linkage = serde_json::from_value(serde_json::json!([{"type": "moon", "id": "1"}])).unwrap();
        assert_eq!(many, Linkage::Many(vec![Identity::new("moon", "1")]));
        let none: Linkage = serde_json::from_value(Value::Null).unwrap();
        assert_eq!(none, Linkage::One(None));
        let one: Linkage = serde_json::from_value(serde_json::json!({"type": "planet", "id": "p"})).unwrap();
        assert_eq!(one, Linkage::One(Some(Identity::new("planet", "p"))));
    }

    #[test]
    fn identity_display() {
        assert_eq!(Identity::new("planet", "earth").to_string(), "planet:earth");
    }
}
