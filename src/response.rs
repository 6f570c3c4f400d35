//! Response envelope shared by the JSON:API handlers.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;

pub const JSON_API_CONTENT_TYPE: &str = "application/vnd.api+json";

/// Normalized handler output: status, optional `Location`, optional JSON:API body.
#[derive(Debug, Clone, PartialEq)]
pub struct HandlerResponse {
    pub status: StatusCode,
    pub location: Option<String>,
    pub body: Option<Value>,
}

impl HandlerResponse {
    pub fn ok(body: Value) -> Self {
        HandlerResponse {
            status: StatusCode::OK,
            location: None,
            body: Some(body),
        }
    }

    pub fn created(location: String, body: Value) -> Self {
        HandlerResponse {
            status: StatusCode::CREATED,
            location: Some(location),
            body: Some(body),
        }
    }

    pub fn no_content() -> Self {
        HandlerResponse {
            status: StatusCode::NO_CONTENT,
            location: None,
            body: None,
        }
    }
}

impl IntoResponse for HandlerResponse {
    fn into_response(self) -> Response {
        let mut response = match self.body {
            Some(body) => (
                self.status,
                [(header::CONTENT_TYPE, JSON_API_CONTENT_TYPE)],
                Json(body),
            )
                .into_response(),
            None => self.status.into_response(),
        };
        if let Some(location) = self.location.and_then(|l| HeaderValue::from_str(&l).ok()) {
            response.headers_mut().insert(header::LOCATION, location);
        }
        response
    }
}
