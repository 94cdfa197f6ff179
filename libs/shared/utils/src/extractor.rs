use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, Request},
    middleware::Next,
    response::Response,
    body::Body,
};
use chrono::Utc;
use tracing::debug;

use shared_config::AppConfig;
use shared_models::auth::Session;
use shared_models::error::AppError;

use crate::jwt::decode_token;

/// Pulls the token out of an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AppError> {
    let auth_header = headers
        .get("Authorization")
        .ok_or_else(|| AppError::Auth("Missing authorization header".to_string()))?;

    let auth_value = auth_header
        .to_str()
        .map_err(|_| AppError::Auth("Invalid authorization header format".to_string()))?;

    auth_value
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::Auth("Invalid authorization header format".to_string()))
}

/// Admits requests carrying an unexpired token whose role the dashboard allows.
pub async fn session_middleware(
    State(config): State<Arc<AppConfig>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(request.headers())?;

    let claims = decode_token(token).map_err(|e| {
        debug!("Rejecting session: {}", e);
        AppError::from(e)
    })?;

    if claims.is_expired_at(Utc::now()) {
        debug!("Rejecting session: token expired (exp: {:?})", claims.exp());
        return Err(AppError::Auth("Token expired".to_string()));
    }

    let session = Session::from_claims(claims);
    if !config.allows(&session.role) {
        debug!("Rejecting session: role {:?} not allowed", session.role.role);
        return Err(AppError::Forbidden("Role not allowed".to_string()));
    }

    debug!("Session admitted for subject: {:?}", session.user_id());
    request.extensions_mut().insert(session);

    Ok(next.run(request).await)
}

pub fn extract_session<B>(request: &Request<B>) -> Result<Session, AppError> {
    request
        .extensions()
        .get::<Session>()
        .cloned()
        .ok_or_else(|| AppError::Auth("Session not found in request extensions".to_string()))
}
