//! Route table generated from the schema.
//!
//! The table is plain data built once per schema: one route group per model type plus the batch
//! operations route. Readonly mode is applied here, so mutation routes are never mounted.

use crate::codec::ResourceCodec;
use crate::schema::Schema;
use axum::http::Method;
use std::fmt;

/// Generic handler a route is bound to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HandlerKind {
    FindRecords,
    FindRecord,
    CreateRecord,
    UpdateRecord,
    RemoveRecord,
    FindRelated,
    AddToRelationship,
    RemoveFromRelationship,
    ReplaceRelationship,
    ApplyOperations,
}

impl HandlerKind {
    pub fn is_mutation(self) -> bool {
        !matches!(
            self,
            HandlerKind::FindRecords | HandlerKind::FindRecord | HandlerKind::FindRelated
        )
    }
}

/// Schema coordinates a route is bound to at build time.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BoundParams {
    pub type_name: Option<String>,
    pub relationship: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RouteDefinition {
    pub method: Method,
    /// axum path pattern, e.g. `/planets/:id/relationships/moons`.
    pub url_pattern: String,
    pub bound: BoundParams,
    pub handler: HandlerKind,
}

impl fmt::Display for RouteDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} -> {:?}", self.method, self.url_pattern, self.handler)
    }
}

#[derive(Clone, Debug, Default)]
pub struct RouteTable {
    routes: Vec<RouteDefinition>,
}

impl RouteTable {
    pub fn build(schema: &Schema, codec: &ResourceCodec, readonly: bool) -> Self {
        let mut routes = Vec::new();
        for (type_name, model) in schema.models() {
            let collection = format!("/{}", codec.resource_type(type_name));
            let member = format!("{}/:id", collection);
            let bound = BoundParams {
                type_name: Some(type_name.clone()),
                relationship: None,
            };
            let mut push = |method: Method, url_pattern: &str, bound: &BoundParams, handler: HandlerKind| {
                routes.push(RouteDefinition {
                    method,
                    url_pattern: url_pattern.to_string(),
                    bound: bound.clone(),
                    handler,
                });
            };
            push(Method::GET, &collection, &bound, HandlerKind::FindRecords);
            push(Method::POST, &collection, &bound, HandlerKind::CreateRecord);
            push(Method::GET, &member, &bound, HandlerKind::FindRecord);
            push(Method::PATCH, &member, &bound, HandlerKind::UpdateRecord);
            push(Method::DELETE, &member, &bound, HandlerKind::RemoveRecord);

            for (relationship, def) in &model.relationships {
                let field = codec.resource_field(relationship);
                let bound = BoundParams {
                    type_name: Some(type_name.clone()),
                    relationship: Some(relationship.clone()),
                };
                let related = format!("{}/{}", member, field);
                let linkage = format!("{}/relationships/{}", member, field);
                push(Method::GET, &related, &bound, HandlerKind::FindRelated);
                if def.is_many() {
                    push(Method::POST, &linkage, &bound, HandlerKind::AddToRelationship);
                    push(Method::DELETE, &linkage, &bound, HandlerKind::RemoveFromRelationship);
                }
                push(Method::PATCH, &linkage, &bound, HandlerKind::ReplaceRelationship);
            }
        }
        routes.push(RouteDefinition {
            method: Method::PATCH,
            url_pattern: "/operations".to_string(),
            bound: BoundParams::default(),
            handler: HandlerKind::ApplyOperations,
        });
        if readonly {
            routes.retain(|r| !r.handler.is_mutation());
        }
        RouteTable { routes }
    }

    pub fn routes(&self) -> &[RouteDefinition] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn find(&self, method: &Method, url_pattern: &str) -> Option<&RouteDefinition> {
        self.routes
            .iter()
            .find(|r| &r.method == method && r.url_pattern == url_pattern)
    }

    /// Routes grouped by path in build order; each path is mounted once with all its methods.
    pub fn by_path(&self) -> Vec<(&str, Vec<&RouteDefinition>)> {
        let mut groups: Vec<(&str, Vec<&RouteDefinition>)> = Vec::new();
        for route in &self.routes {
            match groups.iter_mut().find(|(path, _)| *path == route.url_pattern) {
                Some((_, group)) => group.push(route),
                None => groups.push((route.url_pattern.as_str(), vec![route])),
            }
        }
        groups
    }

    /// One line per route, for startup logs and diagnostics.
    pub fn describe(&self) -> Vec<String> {
        self.routes.iter().map(ToString::to_string).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{AttributeKind, ModelDefinition, RelationshipDefinition};
    use std::sync::Arc;

    fn table(readonly: bool) -> RouteTable {
        let schema = Arc::new(
            Schema::from_models([
                (
                    "planet",
                    ModelDefinition::new()
                        .attribute("name", AttributeKind::String)
                        .relationship("moons", RelationshipDefinition::has_many("moon").inverse("planet")),
                ),
                (
                    "moon",
                    ModelDefinition::new().relationship("planet", RelationshipDefinition::has_one("planet").inverse("moons")),
                ),
            ])
            .unwrap(),
        );
        let codec = ResourceCodec::new(schema.clone()).unwrap();
        RouteTable::build(&schema, &codec, readonly)
    }

    #[test]
    fn builds_full_surface() {
        let table = table(false);
        let expect = [
            (Method::GET, "/planets", HandlerKind::FindRecords),
            (Method::POST, "/planets", HandlerKind::CreateRecord),
            (Method::PATCH, "/planets/:id", HandlerKind::UpdateRecord),
            (Method::GET, "/planets/:id/moons", HandlerKind::FindRelated),
            (Method::POST, "/planets/:id/relationships/moons", HandlerKind::AddToRelationship),
            (Method::DELETE, "/planets/:id/relationships/moons", HandlerKind::RemoveFromRelationship),
            (Method::PATCH, "/moons/:id/relationships/planet", HandlerKind::ReplaceRelationship),
            (Method::PATCH, "/operations", HandlerKind::ApplyOperations),
        ];
        for (method, path, handler) in expect {
            let route = table.find(&method, path).unwrap_or_else(|| panic!("missing {} {}", method, path));
            assert_eq!(route.handler, handler);
        }
        assert!(table.find(&Method::POST, "/moons/:id/relationships/planet").is_none());
        let moons = table.find(&Method::GET, "/planets/:id/moons").unwrap();
        assert_eq!(moons.bound.relationship.as_deref(), Some("moons"));
        // 5 member/collection routes per type, related + linkage routes per relationship, batch.
        assert_eq!(table.len(), 5 + 4 + 5 + 2 + 1);
    }

    #[test]
    fn readonly_keeps_only_reads() {
        let table = table(true);
        assert!(table.routes().iter().all(|r| r.method == Method::GET));
        assert_eq!(table.len(), 6);
        assert!(table.describe().contains(&"GET /planets/:id -> FindRecord".to_string()));
    }

    #[test]
    fn groups_methods_by_path() {
        let table = table(false);
        let groups = table.by_path();
        let (_, member) = groups.iter().find(|(p, _)| *p == "/planets/:id").unwrap();
        assert_eq!(member.len(), 3);
    }
}
