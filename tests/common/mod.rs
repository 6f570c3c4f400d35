//! Shared fixtures for the integration suites: a planets/moons schema, a counting source double
//! and a request helper driving the router with `oneshot`.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use schema_server::operation::Transform;
use schema_server::schema::{AttributeKind, ModelDefinition, RelationshipDefinition};
use schema_server::source::{Query, QueryResult, TransformObservers};
use schema_server::{Identity, MemorySource, Record, RequestOptions, Schema, Server, ServerSettings, Source, SourceError};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

pub fn planets_schema() -> Schema {
    Schema::from_models([
        (
            "planet",
            ModelDefinition::new()
                .attribute("name", AttributeKind::String)
                .attribute("classification", AttributeKind::String)
                .attribute("mass", AttributeKind::Number)
                .relationship("moons", RelationshipDefinition::has_many("moon").inverse("planet")),
        ),
        (
            "moon",
            ModelDefinition::new()
                .attribute("name", AttributeKind::String)
                .relationship("planet", RelationshipDefinition::has_one("planet").inverse("moons")),
        ),
    ])
    .expect("fixture schema is valid")
}

pub fn planet(id: &str, name: &str, classification: &str) -> Record {
    Record::new("planet", id)
        .with_attribute("name", json!(name))
        .with_attribute("classification", json!(classification))
}

pub fn moon(id: &str, name: &str, planet: &str) -> Record {
    Record::new("moon", id)
        .with_attribute("name", json!(name))
        .with_has_one("planet", Some(Identity::new("planet", planet)))
}

/// Memory source that counts calls, records the last options and can be told to fail updates.
pub struct CountingSource {
    pub inner: MemorySource,
    pub queries: AtomicUsize,
    pub updates: AtomicUsize,
    pub cleared: AtomicUsize,
    pub last_options: Mutex<Option<RequestOptions>>,
    pub fail_updates: Mutex<Option<SourceError>>,
}

impl CountingSource {
    pub fn new(schema: Schema) -> Self {
        CountingSource {
            inner: MemorySource::new(Arc::new(schema)),
            queries: AtomicUsize::new(0),
            updates: AtomicUsize::new(0),
            cleared: AtomicUsize::new(0),
            last_options: Mutex::new(None),
            fail_updates: Mutex::new(None),
        }
    }

    pub fn query_calls(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.queries.store(0, Ordering::SeqCst);
        self.updates.store(0, Ordering::SeqCst);
        self.cleared.store(0, Ordering::SeqCst);
    }

    pub fn fail_with(&self, error: SourceError) {
        *self.fail_updates.lock().unwrap() = Some(error);
    }
}

#[async_trait]
impl Source for CountingSource {
    fn schema(&self) -> Arc<Schema> {
        self.inner.schema()
    }

    async fn query(&self, query: Query, options: &RequestOptions) -> Result<Vec<QueryResult>, SourceError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        *self.last_options.lock().unwrap() = Some(options.clone());
        self.inner.query(query, options).await
    }

    async fn update(&self, transform: Transform, options: &RequestOptions) -> Result<Vec<Option<Record>>, SourceError> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        *self.last_options.lock().unwrap() = Some(options.clone());
        if let Some(error) = self.fail_updates.lock().unwrap().clone() {
            return Err(error);
        }
        self.inner.update(transform, options).await
    }

    fn observers(&self) -> &TransformObservers {
        self.inner.observers()
    }

    async fn activate(&self) -> Result<(), SourceError> {
        self.inner.activate().await
    }

    async fn deactivate(&self) -> Result<(), SourceError> {
        self.inner.deactivate().await
    }

    fn is_activated(&self) -> bool {
        self.inner.is_activated()
    }

    async fn clear_pending(&self) -> Result<(), SourceError> {
        self.cleared.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Started server over a counting source seeded with `records`.
pub async fn started(settings: ServerSettings, records: Vec<Record>) -> (Server, Arc<CountingSource>) {
    let source = Arc::new(CountingSource::new(planets_schema()));
    source.inner.seed(records).unwrap();
    let server = Server::new(source.clone(), settings).unwrap();
    server.start().await.unwrap();
    (server, source)
}

pub async fn send(router: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, HeaderMap, Value) {
    send_with(router, method, uri, body, &[]).await
}

pub async fn send_with(
    router: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
    headers: &[(&str, &str)],
) -> (StatusCode, HeaderMap, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/vnd.api+json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, headers, value)
}

/// `attributes.name` of every resource in a collection document, in document order.
pub fn names(document: &Value) -> Vec<String> {
    document["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["attributes"]["name"].as_str().unwrap().to_string())
        .collect()
}
