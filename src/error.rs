//! Typed errors and HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::num::{ParseFloatError, ParseIntError};
use thiserror::Error;

/// Registration-time failures. Fatal for the model being registered.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("tag `{tag}`: unterminated quote")]
    UnterminatedQuote { tag: String },
    #[error("field {field}: invalid value '{value}' for option `{key}`: {reason}")]
    InvalidOption {
        field: String,
        key: &'static str,
        value: String,
        reason: String,
    },
    #[error("model {model}: first column can't be skipped")]
    FirstColumnSkipped { model: String },
    #[error("model {0} has no members")]
    EmptyModel(String),
    #[error("model {model}: duplicate member {member}")]
    DuplicateMember { model: String, member: String },
    #[error("a field with the name {0} already exists")]
    DuplicateCustomField(String),
    #[error("invalid custom field name '{0}'")]
    InvalidCustomField(String),
    #[error("field {field}: unknown field type '{name}'")]
    UnknownFieldType { field: String, name: String },
    #[error("duplicate model: {0}")]
    DuplicateModel(String),
    #[error("invalid identifier '{0}'")]
    InvalidIdentifier(String),
    #[error("unresolved relationships: {}", .0.join(", "))]
    DanglingReferences(Vec<String>),
    #[error("config load: {0}")]
    Load(String),
}

/// Per-field validation failure. Collected into a field-name to message map, never fatal.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("This field is required.")]
    Required,
    #[error("Value is too long (at most {max} characters)")]
    TooLong { max: usize },
    #[error("{0}")]
    InvalidInteger(#[from] ParseIntError),
    #[error("{0}")]
    InvalidFloat(#[from] ParseFloatError),
    #[error("Value must be between {min} and {max}")]
    OutOfRange { min: String, max: String },
    #[error("expected format {format}: {reason}")]
    InvalidTimestamp { format: String, reason: String },
    #[error("{0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("invalid id '{entry}': {source}")]
    InvalidIds { entry: String, source: ParseIntError },
    #[error("{0}")]
    Custom(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
    #[error("storage: {0}")]
    Storage(#[from] std::io::Error),
    #[error("render: {0}")]
    Render(String),
    #[error("bad request: {0}")]
    BadRequest(String),
}

impl From<tera::Error> for AppError {
    fn from(e: tera::Error) -> Self {
        // tera nests the useful message in the source chain
        let mut message = e.to_string();
        let mut source = std::error::Error::source(&e);
        while let Some(inner) = source {
            message.push_str(": ");
            message.push_str(&inner.to_string());
            source = inner.source();
        }
        AppError::Render(message)
    }
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            AppError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::Db(e) => {
                if let sqlx::Error::RowNotFound = e {
                    (StatusCode::NOT_FOUND, "not_found")
                } else {
                    (StatusCode::INTERNAL_SERVER_ERROR, "database_error")
                }
            }
            AppError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "storage_error"),
            AppError::Render(_) => (StatusCode::INTERNAL_SERVER_ERROR, "render_error"),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
        };
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message: self.to_string(),
                details: None,
            },
        };
        (status, Json(body)).into_response()
    }
}
