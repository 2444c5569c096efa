use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use roster_types::errors::{ApplicationError, ErrorKind};

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

/// Error returned by handlers; renders as `{"error": ...}`.
#[derive(Debug)]
pub enum WebError {
    BadRequest(String),
    App(ApplicationError),
}

impl From<ApplicationError> for WebError {
    fn from(err: ApplicationError) -> Self {
        WebError::App(err)
    }
}

impl From<JsonRejection> for WebError {
    fn from(rejection: JsonRejection) -> Self {
        WebError::BadRequest(format!("unmarshal request body: {}", rejection.body_text()))
    }
}

impl From<PathRejection> for WebError {
    fn from(rejection: PathRejection) -> Self {
        WebError::BadRequest(format!("parse id: {}", rejection.body_text()))
    }
}

impl From<QueryRejection> for WebError {
    fn from(rejection: QueryRejection) -> Self {
        WebError::BadRequest(format!("decode query: {}", rejection.body_text()))
    }
}

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Conflict | ErrorKind::VersionMismatch => StatusCode::CONFLICT,
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::EmptyRequest
        | ErrorKind::IdMismatch
        | ErrorKind::Store
        | ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            WebError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            WebError::App(err) => {
                let kind = err.kind();
                let status = status_for(kind);

                if status.is_server_error() {
                    tracing::error!(%kind, error = %err, "request failed");
                    (status, "internal server error".to_string())
                } else {
                    tracing::debug!(%kind, error = %err, "request rejected");
                    (status, err.to_string())
                }
            }
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}
