//! Executable GraphQL schema derived from the record schema.
//!
//! One object type per model (PascalCase), a `Query` root with `{type}(id)` and
//! `{plural}(where, orderBy)` per model, and the generated where/orderBy inputs. Resolvers read
//! the per-request [`RequestScope`] from the request data; relationship fields go through its
//! batched loader. Polymorphic relationships and unknown attribute kinds fail the build.

use crate::case::classify;
use crate::error::{SchemaError, SourceError};
use crate::graphql::filter::{order_by, order_by_name, where_filters, where_input_name};
use crate::graphql::loader::RequestScope;
use crate::record::{Identity, Record};
use crate::schema::{AttributeKind, Schema};
use async_graphql::dynamic::{
    Enum, Field, FieldFuture, FieldValue, InputObject, InputValue, Object, ResolverContext, Scalar,
    Schema as GraphqlSchema, TypeRef,
};
use async_graphql::Value as GqlValue;
use chrono::{DateTime, NaiveDate};
use std::sync::Arc;

pub const DATE_SCALAR: &str = "Date";
pub const DATETIME_SCALAR: &str = "DateTime";

/// Fixed scalar table. Any other kind is a configuration error.
pub fn scalar_for(type_name: &str, attribute: &str, kind: &AttributeKind) -> Result<&'static str, SchemaError> {
    match kind {
        AttributeKind::String => Ok(TypeRef::STRING),
        AttributeKind::Number => Ok(TypeRef::INT),
        AttributeKind::Boolean => Ok(TypeRef::BOOLEAN),
        AttributeKind::Date => Ok(DATE_SCALAR),
        AttributeKind::DateTime => Ok(DATETIME_SCALAR),
        AttributeKind::Other(other) => Err(SchemaError::UnsupportedAttributeKind {
            model: type_name.to_string(),
            attribute: attribute.to_string(),
            kind: other.clone(),
        }),
    }
}

fn date_scalar() -> Scalar {
    Scalar::new(DATE_SCALAR)
        .description("Calendar date, `YYYY-MM-DD`")
        .validator(|value| match value {
            GqlValue::String(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok(),
            _ => false,
        })
}

fn datetime_scalar() -> Scalar {
    Scalar::new(DATETIME_SCALAR)
        .description("RFC 3339 timestamp")
        .validator(|value| match value {
            GqlValue::String(s) => DateTime::parse_from_rfc3339(s).is_ok(),
            _ => false,
        })
}

fn parent_record<'a>(ctx: &ResolverContext<'a>) -> async_graphql::Result<&'a Record> {
    ctx.parent_value.try_downcast_ref::<Record>()
}

fn id_field() -> Field {
    Field::new("id", TypeRef::named_nn(TypeRef::ID), |ctx| {
        FieldFuture::new(async move {
            let record = parent_record(&ctx)?;
            Ok(Some(FieldValue::value(GqlValue::String(record.id.clone()))))
        })
    })
}

fn attribute_field(attribute: String, scalar: &str) -> Field {
    Field::new(attribute.clone(), TypeRef::named(scalar), move |ctx| {
        let attribute = attribute.clone();
        FieldFuture::new(async move {
            let record = parent_record(&ctx)?;
            match record.attributes.get(&attribute) {
                Some(value) if !value.is_null() => Ok(Some(FieldValue::value(GqlValue::from_json(value.clone())?))),
                _ => Ok(None),
            }
        })
    })
}

fn relationship_field(relationship: String, many: bool, target_object: String) -> Field {
    let ty = if many {
        TypeRef::named_nn_list_nn(target_object)
    } else {
        TypeRef::named(target_object)
    };
    Field::new(relationship.clone(), ty, move |ctx| {
        let relationship = relationship.clone();
        FieldFuture::new(async move {
            let record = parent_record(&ctx)?;
            let scope = ctx.data::<RequestScope>()?;
            let related = scope.related(record.identity(), relationship).await?;
            if many {
                Ok(Some(FieldValue::list(related.into_iter().map(FieldValue::owned_any))))
            } else {
                Ok(related.into_iter().next().map(FieldValue::owned_any))
            }
        })
    })
}

fn find_record_field(type_name: String, object_name: &str) -> Field {
    Field::new(type_name.clone(), TypeRef::named(object_name), move |ctx| {
        let type_name = type_name.clone();
        FieldFuture::new(async move {
            let id = match ctx.args.try_get("id")?.as_value() {
                GqlValue::String(s) => s.clone(),
                GqlValue::Number(n) => n.to_string(),
                other => return Err(async_graphql::Error::new(format!("invalid id: {}", other))),
            };
            let scope = ctx.data::<RequestScope>()?;
            match scope.find_record(Identity::new(type_name, id)).await {
                Ok(record) => Ok(record.map(FieldValue::owned_any)),
                Err(SourceError::RecordNotFound(_)) => Ok(None),
                Err(e) => Err(async_graphql::Error::new(e.to_string())),
            }
        })
    })
    .argument(InputValue::new("id", TypeRef::named_nn(TypeRef::ID)))
}

fn enum_item(value: &GqlValue) -> Option<&str> {
    match value {
        GqlValue::Enum(name) => Some(name.as_str()),
        GqlValue::String(s) => Some(s.as_str()),
        _ => None,
    }
}

fn find_records_field(type_name: String, plural: String, object_name: &str, schema: Arc<Schema>) -> Field {
    Field::new(plural, TypeRef::named_nn_list_nn(object_name), move |ctx| {
        let type_name = type_name.clone();
        let schema = schema.clone();
        FieldFuture::new(async move {
            let filter = match ctx.args.get("where") {
                Some(input) => where_filters(&schema, &type_name, &input.as_value().clone().into_json()?)?,
                None => Vec::new(),
            };
            let sort = match ctx.args.get("orderBy") {
                Some(input) => {
                    // a single enum value is accepted where the list is expected
                    let items: Vec<&str> = match input.as_value() {
                        GqlValue::List(items) => items.iter().filter_map(enum_item).collect(),
                        other => enum_item(other).into_iter().collect(),
                    };
                    order_by(&schema, &type_name, items)?
                }
                None => Vec::new(),
            };
            let scope = ctx.data::<RequestScope>()?;
            let records = scope.find_records(&type_name, filter, sort).await?;
            Ok(Some(FieldValue::list(records.into_iter().map(FieldValue::owned_any))))
        })
    })
    .argument(InputValue::new("where", TypeRef::named(where_input_name(object_name))))
    .argument(InputValue::new("orderBy", TypeRef::named_nn_list(order_by_name(object_name))))
}

fn filter_inputs(input: InputObject, field: &str, scalar: &str) -> InputObject {
    input
        .field(InputValue::new(field, TypeRef::named(scalar)))
        .field(InputValue::new(format!("{}_not", field), TypeRef::named(scalar)))
        .field(InputValue::new(format!("{}_in", field), TypeRef::named_nn_list(scalar)))
        .field(InputValue::new(format!("{}_not_in", field), TypeRef::named_nn_list(scalar)))
}

/// Build the executable schema. Runs once per record schema.
pub fn build_schema(schema: Arc<Schema>) -> Result<GraphqlSchema, SchemaError> {
    let mut query = Object::new("Query");
    let mut objects = Vec::new();
    let mut inputs = Vec::new();
    let mut enums = Vec::new();

    for (type_name, model) in schema.models() {
        let object_name = classify(type_name);
        let mut object = Object::new(object_name.as_str()).field(id_field());
        let mut where_input = filter_inputs(InputObject::new(where_input_name(&object_name)), "id", TypeRef::ID);
        let mut order = Enum::new(order_by_name(&object_name)).item("id_ASC").item("id_DESC");

        for (attribute, def) in &model.attributes {
            let scalar = scalar_for(type_name, attribute, &def.kind)?;
            object = object.field(attribute_field(attribute.clone(), scalar));
            where_input = filter_inputs(where_input, attribute, scalar);
            order = order
                .item(format!("{}_ASC", attribute))
                .item(format!("{}_DESC", attribute));
        }
        for (relationship, def) in &model.relationships {
            let target = def
                .target
                .single()
                .ok_or_else(|| SchemaError::PolymorphicRelationship {
                    model: type_name.clone(),
                    relationship: relationship.clone(),
                })?;
            object = object.field(relationship_field(relationship.clone(), def.is_many(), classify(target)));
        }

        query = query
            .field(find_record_field(type_name.clone(), &object_name))
            .field(find_records_field(
                type_name.clone(),
                schema.pluralize(type_name),
                &object_name,
                schema.clone(),
            ));
        objects.push(object);
        inputs.push(where_input);
        enums.push(order);
    }

    let mut builder = GraphqlSchema::build("Query", None, None)
        .register(date_scalar())
        .register(datetime_scalar());
    for object in objects {
        builder = builder.register(object);
    }
    for input in inputs {
        builder = builder.register(input);
    }
    for order in enums {
        builder = builder.register(order);
    }
    let built = builder
        .register(query)
        .finish()
        .map_err(|e| SchemaError::Graphql(e.to_string()))?;
    tracing::info!(models = schema.model_names().count(), "graphql schema built");
    Ok(built)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ModelDefinition, RelationshipDefinition, RelationshipTarget};
    use std::sync::Arc;

    fn planets() -> Schema {
        Schema::from_models([
            (
                "planet",
                ModelDefinition::new()
                    .attribute("name", AttributeKind::String)
                    .attribute("mass", AttributeKind::Number)
                    .attribute("discovered", AttributeKind::Date)
                    .relationship("moons", RelationshipDefinition::has_many("moon").inverse("planet")),
            ),
            (
                "moon",
                ModelDefinition::new()
                    .attribute("name", AttributeKind::String)
                    .relationship("planet", RelationshipDefinition::has_one("planet").inverse("moons")),
            ),
        ])
        .unwrap()
    }

    #[test]
    fn derives_types_and_root_fields() {
        let gql = build_schema(Arc::new(planets())).unwrap();
        let sdl = gql.sdl();
        assert!(sdl.contains("type Planet"));
        assert!(sdl.contains("moons: [Moon!]!"));
        assert!(sdl.contains("planet(id: ID!): Planet"));
        assert!(sdl.contains("planets(where: PlanetWhereInput, orderBy: [PlanetOrderByInput!]): [Planet!]!"));
        assert!(sdl.contains("name_not_in: [String!]"));
        assert!(sdl.contains("mass_DESC"));
        assert!(sdl.contains("scalar Date"));
    }

    #[test]
    fn rejects_polymorphic_relationships() {
        let mut def = RelationshipDefinition::has_one("planet");
        def.target = RelationshipTarget::Polymorphic(vec!["planet".into(), "moon".into()]);
        let schema = Schema::from_models([
            ("planet", ModelDefinition::new()),
            ("moon", ModelDefinition::new()),
            ("comment", ModelDefinition::new().relationship("subject", def)),
        ])
        .unwrap();
        assert_eq!(
            build_schema(Arc::new(schema)).unwrap_err(),
            SchemaError::PolymorphicRelationship {
                model: "comment".into(),
                relationship: "subject".into()
            }
        );
    }

    #[test]
    fn rejects_unknown_attribute_kinds() {
        let schema = Schema::from_models([(
            "moon",
            ModelDefinition::new().attribute("tags", AttributeKind::Other("array".into())),
        )])
        .unwrap();
        assert!(matches!(
            build_schema(Arc::new(schema)),
            Err(SchemaError::UnsupportedAttributeKind { .. })
        ));
    }
}
