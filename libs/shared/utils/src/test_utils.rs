use std::sync::Arc;
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use base64::{Engine as _, engine::general_purpose};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::Role;

pub struct TestConfig {
    pub dashboard_roles: Vec<Role>,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            dashboard_roles: vec![Role::Admin, Role::EvmStaff],
        }
    }
}

impl TestConfig {
    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            dashboard_roles: self.dashboard_roles.clone(),
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct TestUser {
    pub id: String,
    pub email: String,
    pub role: String,
}

impl Default for TestUser {
    fn default() -> Self {
        Self::new("staff@dealer.example", Role::EvmStaff.tag())
    }
}

impl TestUser {
    pub fn new(email: &str, role: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            role: role.to_string(),
        }
    }

    pub fn admin(email: &str) -> Self {
        Self::new(email, Role::Admin.tag())
    }

    pub fn staff(email: &str) -> Self {
        Self::new(email, Role::EvmStaff.tag())
    }

    pub fn customer(email: &str) -> Self {
        Self::new(email, Role::User.tag())
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub const SECRET: &'static str = "test-secret-key-for-fixture-signing";

    /// HS256-signed token for `user`, expiring `exp_hours` from now (default 24).
    pub fn create_test_token(user: &TestUser, exp_hours: Option<i64>) -> String {
        let now = Utc::now();
        let exp = now + Duration::hours(exp_hours.unwrap_or(24));

        let payload = json!({
            "sub": user.id,
            "email": user.email,
            "role": user.role,
            "iat": now.timestamp(),
            "exp": exp.timestamp()
        });

        Self::sign_payload(&payload, Self::SECRET)
    }

    pub fn create_expired_token(user: &TestUser) -> String {
        Self::create_test_token(user, Some(-1))
    }

    pub fn create_malformed_token() -> String {
        "not-a-token".to_string()
    }

    pub fn sign_payload(payload: &Value, secret: &str) -> String {
        let signing_input = Self::signing_input(payload);

        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(signing_input.as_bytes());
        let signature = mac.finalize().into_bytes();
        let signature_encoded = general_purpose::URL_SAFE_NO_PAD.encode(signature);

        format!("{}.{}", signing_input, signature_encoded)
    }

    /// Compact token with an arbitrary payload and a placeholder signature.
    pub fn create_unsigned_token(payload: &Value) -> String {
        format!("{}.signature", Self::signing_input(payload))
    }

    fn signing_input(payload: &Value) -> String {
        let header = json!({
            "alg": "HS256",
            "typ": "JWT"
        });

        let header_encoded = general_purpose::URL_SAFE_NO_PAD.encode(header.to_string());
        let payload_encoded = general_purpose::URL_SAFE_NO_PAD.encode(payload.to_string());

        format!("{}.{}", header_encoded, payload_encoded)
    }
}
