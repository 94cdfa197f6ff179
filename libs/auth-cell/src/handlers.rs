use axum::{
    extract::{Json, Request},
    http::HeaderMap,
};
use serde::Serialize;
use serde_json::json;
use tracing::debug;

use shared_models::auth::{Claims, DerivedRole, Session};
use shared_models::error::AppError;
use shared_utils::extractor::{bearer_token, extract_session};
use shared_utils::jwt::{decode, is_expired};

#[derive(Debug, Serialize)]
pub struct InspectResponse {
    pub claims: Option<Claims>,
    pub expired: bool,
    pub role: DerivedRole,
}

/// Decoded view of the bearer token. Undecodable tokens get the safe defaults.
pub async fn inspect_token(headers: HeaderMap) -> Result<Json<InspectResponse>, AppError> {
    debug!("Inspecting token");

    let token = bearer_token(&headers)?;
    let claims = decode(token);

    Ok(Json(InspectResponse {
        expired: claims.as_ref().map_or(true, Claims::is_expired),
        role: DerivedRole::from_claims(claims.as_ref()),
        claims,
    }))
}

pub async fn verify_token(headers: HeaderMap) -> Result<Json<serde_json::Value>, AppError> {
    debug!("Verifying token");

    let token = bearer_token(&headers)?;

    Ok(Json(json!({ "valid": !is_expired(token) })))
}

pub async fn get_session(request: Request) -> Result<Json<Session>, AppError> {
    let session = extract_session(&request)?;
    debug!("Getting session for subject: {:?}", session.user_id());

    Ok(Json(session))
}
