//! Load a schema document from disk.

use crate::error::{ConfigError, SchemaError};
use crate::schema::{Schema, SchemaDefinition};
use std::path::Path;

pub fn load_schema_from_path(path: impl AsRef<Path>) -> Result<Schema, ConfigError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    load_schema_from_str(&text)
}

pub fn load_schema_from_str(text: &str) -> Result<Schema, ConfigError> {
    let definition: SchemaDefinition =
        serde_json::from_str(text).map_err(|e| SchemaError::Load(e.to_string()))?;
    let schema = Schema::new(definition)?;
    tracing::info!(models = schema.model_names().count(), "schema loaded");
    Ok(schema)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_and_validates() {
        let schema = load_schema_from_str(r#"{"models": {"planet": {"attributes": {"name": {"type": "string"}}}}}"#).unwrap();
        assert!(schema.has_model("planet"));

        let err = load_schema_from_str(
            r#"{"models": {"planet": {"relationships": {"moons": {"kind": "hasMany", "model": "moon"}}}}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Schema(SchemaError::MissingTarget { .. })));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_schema_from_path("/nonexistent/schema.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
