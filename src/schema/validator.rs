//! Schema validation: relationship targets exist and declared inverses are symmetric. Any pairing of
//! hasOne and hasMany is accepted; the source keeps both sides in step.

use crate::error::SchemaError;
use crate::schema::inflector::Inflections;
use crate::schema::types::SchemaDefinition;
use std::collections::HashSet;

pub fn validate(definition: &SchemaDefinition, inflections: &Inflections) -> Result<(), SchemaError> {
    for (model_name, model) in &definition.models {
        for (rel_name, rel) in &model.relationships {
            for target in rel.target.types() {
                if !definition.models.contains_key(target) {
                    return Err(SchemaError::MissingTarget {
                        model: model_name.clone(),
                        relationship: rel_name.clone(),
                        target: target.to_string(),
                    });
                }
            }

            let Some(inverse) = rel.inverse.as_deref() else { continue };
            for target in rel.target.types() {
                let target_model = &definition.models[target];
                let inverse_def = target_model.relationships.get(inverse).ok_or_else(|| {
                    SchemaError::MissingInverse {
                        model: model_name.clone(),
                        relationship: rel_name.clone(),
                        target: target.to_string(),
                        inverse: inverse.to_string(),
                    }
                })?;
                let points_back = inverse_def.target.accepts(model_name)
                    && inverse_def.inverse.as_deref().map(|i| i == rel_name).unwrap_or(true);
                if !points_back {
                    return Err(SchemaError::InverseMismatch {
                        model: model_name.clone(),
                        relationship: rel_name.clone(),
                        target: target.to_string(),
                        inverse: inverse.to_string(),
                    });
                }
            }
        }
    }

    let mut resource_types = HashSet::new();
    for model_name in definition.models.keys() {
        let plural = inflections.pluralize(model_name);
        if !resource_types.insert(plural.clone()) {
            return Err(SchemaError::DuplicateResourceType(plural));
        }
    }

    Ok(())
}
