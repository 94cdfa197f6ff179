use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::UnknownRole;

/// Decoded payload segment of a compact token.
///
/// Wraps the raw JSON object so unrecognized claims survive a
/// decode/serialize cycle untouched. The recognized claims are exposed
/// through typed accessors that return `None` when the key is missing or
/// holds a value of the wrong JSON type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Claims(Map<String, Value>);

impl Claims {
    pub fn new(map: Map<String, Value>) -> Self {
        Self(map)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    pub fn sub(&self) -> Option<&str> {
        self.str_claim("sub")
    }

    pub fn email(&self) -> Option<&str> {
        self.str_claim("email")
    }

    pub fn role(&self) -> Option<&str> {
        self.str_claim("role")
    }

    pub fn role_id(&self) -> Option<i64> {
        self.0.get("roleId").and_then(Value::as_i64)
    }

    pub fn role_name(&self) -> Option<&str> {
        self.str_claim("roleName")
    }

    /// Expiry in whole seconds since the epoch.
    pub fn exp(&self) -> Option<i64> {
        self.0.get("exp").and_then(Value::as_i64)
    }

    /// Issued-at in whole seconds since the epoch.
    pub fn iat(&self) -> Option<i64> {
        self.0.get("iat").and_then(Value::as_i64)
    }

    /// `exp` scaled to milliseconds. Fractional and out-of-range numbers are
    /// accepted; anything that is not a JSON number yields `None`.
    pub fn expires_at_millis(&self) -> Option<i64> {
        match self.0.get("exp")? {
            Value::Number(n) => n
                .as_i64()
                .map(|secs| secs.saturating_mul(1000))
                .or_else(|| n.as_f64().map(|secs| (secs * 1000.0) as i64)),
            _ => None,
        }
    }

    /// A token without a usable `exp` is treated as expired.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at_millis() {
            Some(expires_at) => expires_at < now.timestamp_millis(),
            None => true,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    fn str_claim(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }
}

impl From<Map<String, Value>> for Claims {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Role tags issued by the dealership backend, with their legacy numeric ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "ROLE_USER")]
    User,
    #[serde(rename = "ROLE_ADMIN")]
    Admin,
    #[serde(rename = "ROLE_EVMSTAFF")]
    EvmStaff,
}

static ROLE_TABLE: [(Role, &str, i32); 3] = [
    (Role::User, "ROLE_USER", 1),
    (Role::Admin, "ROLE_ADMIN", 2),
    (Role::EvmStaff, "ROLE_EVMSTAFF", 3),
];

impl Role {
    pub fn all() -> impl Iterator<Item = Role> {
        ROLE_TABLE.iter().map(|(role, _, _)| *role)
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        ROLE_TABLE
            .iter()
            .find(|(_, t, _)| *t == tag)
            .map(|(role, _, _)| *role)
    }

    pub fn tag(self) -> &'static str {
        ROLE_TABLE
            .iter()
            .find(|(role, _, _)| *role == self)
            .map_or("", |(_, tag, _)| *tag)
    }

    pub fn legacy_id(self) -> i32 {
        ROLE_TABLE
            .iter()
            .find(|(role, _, _)| *role == self)
            .map_or(0, |(_, _, id)| *id)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_tag(s).ok_or_else(|| UnknownRole(s.to_string()))
    }
}

/// Role identity normalized from the `role` claim.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedRole {
    pub role_id: Option<i32>,
    pub role_name: Option<String>,
    pub role: Option<String>,
}

impl DerivedRole {
    /// Missing claims (a failed decode) produce all fields absent.
    pub fn from_claims(claims: Option<&Claims>) -> Self {
        let tag = claims.and_then(Claims::role);

        Self {
            role_id: tag.and_then(Role::from_tag).map(Role::legacy_id),
            role_name: tag.map(str::to_string),
            role: tag.map(str::to_string),
        }
    }

    pub fn known_role(&self) -> Option<Role> {
        self.role.as_deref().and_then(Role::from_tag)
    }
}

/// Request-scoped view of the caller's token, inserted by the session middleware.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub claims: Claims,
    pub role: DerivedRole,
}

impl Session {
    pub fn from_claims(claims: Claims) -> Self {
        let role = DerivedRole::from_claims(Some(&claims));
        Self { claims, role }
    }

    pub fn user_id(&self) -> Option<&str> {
        self.claims.sub()
    }
}
