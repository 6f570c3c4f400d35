//! Example consumer: boots schema-server over the in-memory source.
//!
//! Run from repo root: `cargo run -p example-consumer`
//! Set `SCHEMA_SERVER_SCHEMA_PATH` to serve your own schema; otherwise a planets/moons demo
//! schema is served with a couple of seeded records.

use schema_server::{
    load_schema_from_path, load_schema_from_str, Identity, MemorySource, Record, Server, ServerSettings,
};
use serde_json::json;
use std::sync::Arc;
use tokio::net::TcpListener;

const DEMO_SCHEMA: &str = r#"{
  "models": {
    "planet": {
      "attributes": {
        "name": {"type": "string"},
        "classification": {"type": "string"},
        "mass": {"type": "number"}
      },
      "relationships": {
        "moons": {"kind": "hasMany", "model": "moon", "inverse": "planet", "dependent": "remove"}
      }
    },
    "moon": {
      "attributes": {"name": {"type": "string"}},
      "relationships": {
        "planet": {"kind": "hasOne", "model": "planet", "inverse": "moons"}
      }
    }
  }
}"#;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("schema_server=info")),
        )
        .init();

    let settings = ServerSettings::from_env()?;
    let schema = match &settings.schema_path {
        Some(path) => load_schema_from_path(path)?,
        None => load_schema_from_str(DEMO_SCHEMA)?,
    };
    let demo = settings.schema_path.is_none();
    let source = Arc::new(MemorySource::new(Arc::new(schema)));
    if demo {
        let earth = Identity::new("planet", "earth");
        source.seed(vec![
            Record::new("planet", "earth")
                .with_attribute("name", json!("Earth"))
                .with_attribute("classification", json!("terrestrial"))
                .with_has_many("moons", vec![Identity::new("moon", "luna")]),
            Record::new("moon", "luna")
                .with_attribute("name", json!("Luna"))
                .with_has_one("planet", Some(earth)),
        ])?;
    }

    let listener = TcpListener::bind(&settings.bind_address).await?;
    let server = Server::new(source, settings)?;
    server.start().await?;
    for line in server.state().routes.describe() {
        tracing::debug!("{}", line);
    }
    let served = server.serve(listener).await;
    server.shutdown().await?;
    served?;
    Ok(())
}
