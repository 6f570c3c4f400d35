//! Typed errors and HTTP mapping. `AppError` is the only place REST status codes are assigned.

use crate::record::Identity;
use crate::response::JSON_API_CONTENT_TYPE;
use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    #[error("unknown model: {0}")]
    UnknownModel(String),
    #[error("missing reference: {model}.{relationship} targets unknown model '{target}'")]
    MissingTarget {
        model: String,
        relationship: String,
        target: String,
    },
    #[error("missing inverse: {model}.{relationship} declares inverse '{inverse}' not found on '{target}'")]
    MissingInverse {
        model: String,
        relationship: String,
        target: String,
        inverse: String,
    },
    #[error("inverse mismatch: {model}.{relationship} and {target}.{inverse} do not point at each other")]
    InverseMismatch {
        model: String,
        relationship: String,
        target: String,
        inverse: String,
    },
    #[error("polymorphic relationship {model}.{relationship} is not supported")]
    PolymorphicRelationship { model: String, relationship: String },
    #[error("unsupported attribute kind '{kind}' for {model}.{attribute}")]
    UnsupportedAttributeKind {
        model: String,
        attribute: String,
        kind: String,
    },
    #[error("duplicate resource type: {0}")]
    DuplicateResourceType(String),
    #[error("schema load: {0}")]
    Load(String),
    #[error("graphql schema: {0}")]
    Graphql(String),
}

/// Errors raised by a record source. Cloneable so batched loaders can fan one failure out to every waiter.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SourceError {
    #[error("record not found: {0}")]
    RecordNotFound(Identity),
    #[error("unknown model: {0}")]
    ModelNotFound(String),
    #[error("relationship not found: {model}.{relationship}")]
    RelationshipNotFound { model: String, relationship: String },
    #[error("validation: {0}")]
    Validation(String),
    #[error("upstream error {status}: {message}")]
    Upstream { status: u16, message: String },
    #[error("source is not activated")]
    NotActivated,
    #[error("internal: {0}")]
    Internal(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid value for {key}: '{value}'")]
    InvalidValue { key: String, value: String },
    #[error("cannot read {path}: {message}")]
    Io { path: String, message: String },
    #[error(transparent)]
    Schema(#[from] SchemaError),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("validation: {0}")]
    Validation(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Schema(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Source(e) => match e {
                SourceError::RecordNotFound(_)
                | SourceError::ModelNotFound(_)
                | SourceError::RelationshipNotFound { .. } => StatusCode::NOT_FOUND,
                SourceError::Validation(_) => StatusCode::BAD_REQUEST,
                SourceError::Upstream { status, .. } => {
                    StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
                }
                SourceError::NotActivated | SourceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Longer human-readable explanation for the `detail` member of an error entry.
    pub fn detail(&self) -> String {
        match self {
            AppError::Source(SourceError::RecordNotFound(identity)) => format!(
                "no record of type '{}' with id '{}' exists",
                identity.type_name, identity.id
            ),
            AppError::Source(SourceError::Upstream { status, message }) => {
                format!("the upstream source responded with status {}: {}", status, message)
            }
            AppError::Source(SourceError::Validation(m)) | AppError::Validation(m) => {
                format!("the request document is invalid: {}", m)
            }
            AppError::Schema(e) => format!("schema configuration error: {}", e),
            other => other.to_string(),
        }
    }
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub errors: Vec<ErrorDetail>,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub id: String,
    pub title: String,
    pub detail: String,
    pub code: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = %status, error = %self, "request failed");
        } else {
            tracing::debug!(status = %status, error = %self, "request rejected");
        }
        let body = ErrorBody {
            errors: vec![ErrorDetail {
                id: uuid::Uuid::new_v4().to_string(),
                title: self.to_string(),
                detail: self.detail(),
                code: status.as_u16().to_string(),
            }],
        };
        (status, [(header::CONTENT_TYPE, JSON_API_CONTENT_TYPE)], Json(body)).into_response()
    }
}
