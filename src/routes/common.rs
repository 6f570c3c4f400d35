//! Common routes: health, version, schema introspection.

use crate::state::AppState;
use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

#[derive(Serialize)]
struct HealthBody {
    status: &'static str,
    activated: bool,
}

async fn health(State(state): State<AppState>) -> Json<HealthBody> {
    Json(HealthBody {
        status: "ok",
        activated: state.source.is_activated(),
    })
}

async fn version() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// `{models, inflections: {plurals, singulars}}`; inflections omitted when disabled in settings.
async fn schema(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(state.source.schema().to_json(state.settings.inflections))
}

/// GET /health, GET /version, GET /schema.
pub fn common_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/version", get(version))
        .route("/schema", get(schema))
        .with_state(state)
}
