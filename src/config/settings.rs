//! Server feature toggles.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const ENV_PREFIX: &str = "SCHEMA_SERVER_";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Mount the JSON:API routes.
    pub jsonapi: bool,
    /// Mount `POST /graphql`.
    pub graphql: bool,
    /// Strip every mutation route when the route table is built.
    pub readonly: bool,
    /// Include the inflection tables in `GET /schema`.
    pub inflections: bool,
    /// Bridge source transforms to the pub/sub and mount `GET /feed/{type}`.
    pub feed: bool,
    /// Maximum request body size in bytes.
    pub body_limit: usize,
    pub bind_address: String,
    pub schema_path: Option<PathBuf>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        ServerSettings {
            jsonapi: true,
            graphql: true,
            readonly: false,
            inflections: true,
            feed: true,
            body_limit: 1024 * 1024,
            bind_address: "127.0.0.1:3000".to_string(),
            schema_path: None,
        }
    }
}

impl ServerSettings {
    /// Defaults overridden by `SCHEMA_SERVER_*` environment variables
    /// (`SCHEMA_SERVER_READONLY=true`, `SCHEMA_SERVER_BODY_LIMIT=65536`, ...).
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut settings = ServerSettings::default();
        let var = |name: &str| {
            let key = format!("{}{}", ENV_PREFIX, name);
            lookup(&key).map(|value| (key, value))
        };
        let flag = |name: &str, target: &mut bool| -> Result<(), ConfigError> {
            if let Some((key, value)) = var(name) {
                *target = parse_bool(&value).ok_or(ConfigError::InvalidValue { key, value })?;
            }
            Ok(())
        };
        flag("JSONAPI", &mut settings.jsonapi)?;
        flag("GRAPHQL", &mut settings.graphql)?;
        flag("READONLY", &mut settings.readonly)?;
        flag("INFLECTIONS", &mut settings.inflections)?;
        flag("FEED", &mut settings.feed)?;
        if let Some((key, value)) = var("BODY_LIMIT") {
            settings.body_limit = value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue { key, value: value.clone() })?;
        }
        if let Some((_, value)) = var("BIND_ADDRESS") {
            settings.bind_address = value;
        }
        if let Some((_, value)) = var("SCHEMA_PATH") {
            settings.schema_path = Some(PathBuf::from(value));
        }
        Ok(settings)
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn env_overrides_defaults() {
        let settings = ServerSettings::from_lookup(lookup(&[
            ("SCHEMA_SERVER_READONLY", "true"),
            ("SCHEMA_SERVER_GRAPHQL", "off"),
            ("SCHEMA_SERVER_BODY_LIMIT", "2048"),
        ]))
        .unwrap();
        assert!(settings.readonly);
        assert!(!settings.graphql);
        assert!(settings.jsonapi);
        assert_eq!(settings.body_limit, 2048);
    }

    #[test]
    fn rejects_bad_values() {
        let err = ServerSettings::from_lookup(lookup(&[("SCHEMA_SERVER_FEED", "maybe")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "SCHEMA_SERVER_FEED"));
    }

    #[test]
    fn deserializes_partial_documents() {
        let settings: ServerSettings = serde_json::from_value(serde_json::json!({"readonly": true})).unwrap();
        assert!(settings.readonly);
        assert!(settings.inflections);
    }
}
