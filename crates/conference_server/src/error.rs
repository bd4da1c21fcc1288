//! HTTP error mapping.
//!
//! # Responsibility
//! - Translate `CrudError` and transport failures into status codes.
//! - Render every failure as an `application/problem+json` body.
//!
//! # Invariants
//! - Client errors carry `entityName` and a stable `errorKey`.
//! - Store failures return a generic 500 body; details only reach the log.

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use conference_core::{CrudError, RepoError, ValidationError};
use log::error;
use serde::Serialize;
use std::fmt::{Display, Formatter};

pub const PROBLEM_CONTENT_TYPE: &str = "application/problem+json";

/// One offending field of a validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldError {
    pub object_name: &'static str,
    pub field: &'static str,
    pub message: &'static str,
}

/// Problem document returned with every error status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Problem {
    pub title: String,
    pub status: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_name: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_key: Option<&'static str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub field_errors: Vec<FieldError>,
}

/// Error returned by request handlers.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    problem: Problem,
}

impl ApiError {
    /// 400 with a machine-readable reason key.
    pub fn bad_request(entity: &'static str, key: &'static str, title: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            problem: Problem {
                title: title.into(),
                status: StatusCode::BAD_REQUEST.as_u16(),
                message: format!("error.{key}"),
                entity_name: Some(entity),
                error_key: Some(key),
                field_errors: Vec::new(),
            },
        }
    }

    pub fn body_invalid(entity: &'static str, detail: impl Display) -> Self {
        Self::bad_request(entity, "bodyinvalid", format!("Invalid request body: {detail}"))
    }

    pub fn not_found(entity: &'static str) -> Self {
        Self::plain(StatusCode::NOT_FOUND, Some(entity))
    }

    pub fn unsupported_media_type(entity: &'static str) -> Self {
        Self::plain(StatusCode::UNSUPPORTED_MEDIA_TYPE, Some(entity))
    }

    /// 500 with a generic body; `detail` is logged, never returned.
    pub fn internal(detail: impl Display) -> Self {
        error!("event=request_failed module=server status=error error={detail}");
        Self::plain(StatusCode::INTERNAL_SERVER_ERROR, None)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn problem(&self) -> &Problem {
        &self.problem
    }

    fn plain(status: StatusCode, entity: Option<&'static str>) -> Self {
        Self {
            status,
            problem: Problem {
                title: status.canonical_reason().unwrap_or("Error").to_string(),
                status: status.as_u16(),
                message: format!("error.http.{}", status.as_u16()),
                entity_name: entity,
                error_key: None,
                field_errors: Vec::new(),
            },
        }
    }

    fn validation(err: &ValidationError) -> Self {
        let mut api_error = Self::bad_request(err.entity, "validation", "Method argument not valid");
        api_error.problem.field_errors = err
            .missing_fields
            .iter()
            .map(|field| FieldError {
                object_name: err.entity,
                field: *field,
                message: "NotNull",
            })
            .collect();
        api_error
    }
}

impl Display for ApiError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.status.as_u16(), self.problem.title)
    }
}

impl std::error::Error for ApiError {}

impl From<CrudError> for ApiError {
    fn from(value: CrudError) -> Self {
        match value {
            CrudError::BadRequest { entity, reason } => {
                Self::bad_request(entity, reason.key(), reason.title())
            }
            CrudError::Validation(err) => Self::validation(&err),
            CrudError::InvalidSort { entity, error } => {
                Self::bad_request(entity, "sortinvalid", error.to_string())
            }
            CrudError::Repo(err) => Self::internal(err),
        }
    }
}

impl From<RepoError> for ApiError {
    fn from(value: RepoError) -> Self {
        Self::from(CrudError::from(value))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            [(header::CONTENT_TYPE, PROBLEM_CONTENT_TYPE)],
            Json(self.problem),
        )
            .into_response()
    }
}
