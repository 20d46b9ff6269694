//! Auth errors and their HTTP mapping

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::auth::models::UserType;
use crate::database::StoreError;

#[derive(Error, Debug)]
pub enum AuthError {
    /// Unknown email, wrong password, inactive account or user-type mismatch.
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("User with this email already exists")]
    DuplicateIdentity,

    /// Missing, malformed, forged or expired token.
    #[error("Authentication failed")]
    Unauthenticated,

    #[error("{} access required", capitalize(.0.as_str()))]
    Forbidden(UserType),

    #[error("Session expired or invalid")]
    SessionInvalid,

    #[error("{0}")]
    Validation(String),

    #[error("credential store error: {0}")]
    Store(#[from] StoreError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AuthError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidCredentials | Self::Unauthenticated | Self::SessionInvalid => {
                StatusCode::UNAUTHORIZED
            }
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::DuplicateIdentity | Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Store(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::DuplicateIdentity => "DUPLICATE_IDENTITY",
            Self::Unauthenticated => "UNAUTHENTICATED",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::SessionInvalid => "SESSION_INVALID",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Store(_) | Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        // Server-side detail stays in the logs.
        let message = match &self {
            Self::Store(e) => {
                tracing::error!("Credential store failure: {}", e);
                "Something went wrong, please try again later.".to_string()
            }
            Self::Internal(e) => {
                tracing::error!("Internal auth failure: {}", e);
                "Something went wrong, please try again later.".to_string()
            }
            other => other.to_string(),
        };

        (
            status,
            Json(json!({ "error": self.error_code(), "message": message })),
        )
            .into_response()
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
