//! Session identity collaborator.
//!
//! Handlers never see credentials beyond the bearer token; the provider maps
//! it to the stable user id that keys claim state and application ownership.

use std::fmt;

use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Stable identifier for a signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub String);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

/// Resolves the current user for a session token.
pub trait IdentityProvider: Send + Sync {
    fn current_user(&self, token: &str) -> Result<Option<UserId>, IdentityError>;
}

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("missing bearer token")]
    MissingToken,
    #[error("session not recognised")]
    UnknownSession,
    #[error("identity provider unavailable: {0}")]
    Unavailable(String),
}

impl IntoResponse for IdentityError {
    fn into_response(self) -> Response {
        let status = match self {
            IdentityError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            IdentityError::MissingToken | IdentityError::UnknownSession => StatusCode::UNAUTHORIZED,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// Pulls the token out of an `Authorization: Bearer ...` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

/// Resolves the caller or explains why the request is anonymous.
pub fn authenticate<P>(provider: &P, headers: &HeaderMap) -> Result<UserId, IdentityError>
where
    P: IdentityProvider + ?Sized,
{
    let token = bearer_token(headers).ok_or(IdentityError::MissingToken)?;
    provider
        .current_user(token)?
        .ok_or(IdentityError::UnknownSession)
}
