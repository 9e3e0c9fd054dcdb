use axum::{
    Json,
    extract::rejection::{FormRejection, JsonRejection, PathRejection, QueryRejection},
    http::{HeaderValue, StatusCode, header::WWW_AUTHENTICATE},
    response::IntoResponse,
};
use serde::Serialize;
use thiserror::Error as ThisError;

use super::runtime::RuntimeError;

#[derive(Debug, ThisError)]
pub enum CodeboxError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("User not found")]
    UserNotFound,

    #[error("Email already registered")]
    EmailTaken,

    #[error("Container not found or does not belong to the user")]
    ContainerNotFound,

    #[error("Container is not running")]
    ContainerNotRunning,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// A command inside the container exited non-zero.
    #[error("Error {action}")]
    CommandFailed { action: &'static str },

    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    #[error("Token error: {0}")]
    TokenError(#[from] jsonwebtoken::errors::Error),

    #[error("Password hashing error: {0}")]
    PasswordHash(String),

    #[error("Archive error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unexpected error: {0}")]
    UnexpectedError(String),

    #[error("Ractor error: {0}")]
    RactorError(String),

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

impl CodeboxError {
    pub fn status(&self) -> StatusCode {
        match self {
            CodeboxError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            CodeboxError::UserNotFound
            | CodeboxError::ContainerNotFound
            | CodeboxError::Runtime(RuntimeError::ContainerNotFound)
            | CodeboxError::Runtime(RuntimeError::ImageNotFound(_)) => StatusCode::NOT_FOUND,
            CodeboxError::EmailTaken => StatusCode::CONFLICT,
            CodeboxError::ContainerNotRunning | CodeboxError::InvalidRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for CodeboxError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        let (code, message) = match &self {
            CodeboxError::InvalidCredentials => ("UNAUTHORIZED", self.to_string()),
            CodeboxError::UserNotFound => ("USER_NOT_FOUND", self.to_string()),
            CodeboxError::EmailTaken => ("EMAIL_TAKEN", self.to_string()),
            CodeboxError::ContainerNotFound => ("CONTAINER_NOT_FOUND", self.to_string()),
            CodeboxError::ContainerNotRunning => ("CONTAINER_NOT_RUNNING", self.to_string()),
            CodeboxError::InvalidRequest(msg) => ("INVALID_ARGUMENT", msg.clone()),
            CodeboxError::CommandFailed { .. } => ("COMMAND_FAILED", self.to_string()),
            CodeboxError::Runtime(RuntimeError::ContainerNotFound) => {
                ("DOCKER_CONTAINER_NOT_FOUND", self.to_string())
            }
            CodeboxError::Runtime(RuntimeError::ImageNotFound(_)) => {
                ("IMAGE_NOT_FOUND", self.to_string())
            }
            CodeboxError::Runtime(RuntimeError::Engine(_)) => (
                "ENGINE_ERROR",
                "The container engine failed to process the request.".to_string(),
            ),
            CodeboxError::TokenError(_)
            | CodeboxError::PasswordHash(_)
            | CodeboxError::IoError(_)
            | CodeboxError::Config(_)
            | CodeboxError::UnexpectedError(_)
            | CodeboxError::RactorError(_)
            | CodeboxError::DatabaseError(_) => (
                "INTERNAL_ERROR",
                "An internal server error occurred.".to_string(),
            ),
        };

        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let body = ApiErrorBody {
            inner: ApiErrorObject {
                code: code.to_string(),
                message,
            },
        };
        let mut resp = (status, Json(body)).into_response();
        if status == StatusCode::UNAUTHORIZED {
            resp.headers_mut()
                .insert(WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        resp
    }
}

impl From<JsonRejection> for CodeboxError {
    fn from(rejection: JsonRejection) -> Self {
        CodeboxError::InvalidRequest(rejection.body_text())
    }
}

impl From<FormRejection> for CodeboxError {
    fn from(rejection: FormRejection) -> Self {
        CodeboxError::InvalidRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for CodeboxError {
    fn from(rejection: QueryRejection) -> Self {
        CodeboxError::InvalidRequest(rejection.body_text())
    }
}

impl From<PathRejection> for CodeboxError {
    fn from(rejection: PathRejection) -> Self {
        CodeboxError::InvalidRequest(rejection.body_text())
    }
}

/// Standardized API error response payload.
#[derive(Serialize)]
pub struct ApiErrorObject {
    pub code: String,
    pub message: String,
}

#[derive(Serialize)]
pub struct ApiErrorBody {
    #[serde(rename = "error")]
    pub inner: ApiErrorObject,
}
