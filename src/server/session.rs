use super::state::ServerState;

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use serde_json::json;
use tracing::debug;

/// The caller identified by a valid access token.
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: usize,
    pub email: String,
    pub username: String,
}

/// The raw bearer token, for endpoints that take a refresh token.
#[derive(Debug)]
pub struct BearerToken(pub String);

#[derive(Debug)]
pub enum SessionExtractionError {
    MissingToken,
    AccessDenied,
}

impl IntoResponse for SessionExtractionError {
    fn into_response(self) -> Response {
        let message = match self {
            SessionExtractionError::MissingToken => "Missing bearer token",
            SessionExtractionError::AccessDenied => "Invalid or expired token",
        };
        (StatusCode::UNAUTHORIZED, Json(json!({ "error": message }))).into_response()
    }
}

async fn extract_bearer(parts: &mut Parts, ctx: &ServerState) -> Option<String> {
    TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, ctx)
        .await
        .ok()
        .map(|TypedHeader(Authorization(bearer))| bearer.token().to_string())
}

impl FromRequestParts<ServerState> for BearerToken {
    type Rejection = SessionExtractionError;

    async fn from_request_parts(
        parts: &mut Parts,
        ctx: &ServerState,
    ) -> Result<Self, Self::Rejection> {
        extract_bearer(parts, ctx)
            .await
            .map(BearerToken)
            .ok_or(SessionExtractionError::MissingToken)
    }
}

impl FromRequestParts<ServerState> for Session {
    type Rejection = SessionExtractionError;

    async fn from_request_parts(
        parts: &mut Parts,
        ctx: &ServerState,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_bearer(parts, ctx)
            .await
            .ok_or(SessionExtractionError::MissingToken)?;
        match ctx.user_manager.verify_access_token(&token) {
            Ok(claims) => Ok(Session {
                user_id: claims.sub,
                email: claims.email,
                username: claims.username,
            }),
            Err(err) => {
                debug!("Rejected access token: {}", err);
                Err(SessionExtractionError::AccessDenied)
            }
        }
    }
}
