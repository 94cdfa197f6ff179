//! Structural decoding of compact bearer tokens.
//!
//! Nothing here verifies signatures. A successful decode only means the
//! payload segment is well-formed base64 holding a JSON object.

use base64::{
    alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
    Engine,
};
use chrono::{DateTime, Utc};
use tracing::debug;
use shared_models::auth::{Claims, DerivedRole};
use shared_models::error::TokenError;

/// Standard alphabet, padding must be canonical, trailing bits tolerated.
const PAYLOAD_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_allow_trailing_bits(true)
        .with_decode_padding_mode(DecodePaddingMode::RequireCanonical),
);

/// Decodes the payload segment of `token`, reporting which step failed.
pub fn decode_token(token: &str) -> Result<Claims, TokenError> {
    // Split token into parts
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return Err(TokenError::MalformedToken { segments: parts.len() });
    }

    let payload = PAYLOAD_ENGINE.decode(restore_padding(parts[1]))?;
    let claims = serde_json::from_slice(&payload)?;

    Ok(claims)
}

/// Best-effort decode: every failure collapses to `None`.
pub fn decode(token: &str) -> Option<Claims> {
    match decode_token(token) {
        Ok(claims) => Some(claims),
        Err(e) => {
            debug!("Failed to decode token: {}", e);
            None
        }
    }
}

/// Undecodable tokens and tokens without `exp` count as expired.
pub fn is_expired(token: &str) -> bool {
    is_expired_at(token, Utc::now())
}

pub fn is_expired_at(token: &str, now: DateTime<Utc>) -> bool {
    decode(token).map_or(true, |claims| claims.is_expired_at(now))
}

pub fn derive_role(token: &str) -> DerivedRole {
    DerivedRole::from_claims(decode(token).as_ref())
}

/// Maps the URL-safe alphabet onto the standard one and appends
/// `(4 - len % 4) % 4` padding characters. A remainder of 1 gets three `=`
/// and is left for the decoder to reject.
fn restore_padding(segment: &str) -> String {
    let padding = (4 - segment.len() % 4) % 4;

    let mut padded: String = segment
        .chars()
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            c => c,
        })
        .collect();
    padded.extend(std::iter::repeat('=').take(padding));
    padded
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::TimeZone;
    use serde_json::json;

    use crate::test_utils::JwtTestUtils;

    #[test]
    fn test_restore_padding() {
        assert_eq!(restore_padding("abcd"), "abcd");
        assert_eq!(restore_padding("abc"), "abc=");
        assert_eq!(restore_padding("ab"), "ab==");
        assert_eq!(restore_padding("a"), "a===");
        assert_eq!(restore_padding("a-_b"), "a+/b");
    }

    #[test]
    fn test_wrong_segment_count() {
        for token in ["", "abc", "a.b", "a.b.c.d", "....", JwtTestUtils::create_malformed_token().as_str()] {
            assert!(decode(token).is_none(), "token {:?} should not decode", token);
        }

        assert_matches!(
            decode_token("a.b.c.d"),
            Err(TokenError::MalformedToken { segments: 4 })
        );
    }

    #[test]
    fn test_decode_exact_payload() {
        let payload = json!({ "sub": "u1", "role": "ROLE_ADMIN", "exp": 9999999999i64 });
        let token = JwtTestUtils::create_unsigned_token(&payload);

        let claims = decode(&token).unwrap();

        assert_eq!(serde_json::to_value(&claims).unwrap(), payload);
    }

    #[test]
    fn test_round_trip_signed_fixture() {
        let payload = json!({
            "sub": "7c1f",
            "email": "staff@dealer.example",
            "role": "ROLE_EVMSTAFF",
            "iat": 1_700_000_000i64,
            "exp": 1_700_003_600i64,
            "warehouse": { "id": 12, "name": "North" }
        });
        let token = JwtTestUtils::sign_payload(&payload, "secret");

        let claims = decode(&token).unwrap();

        assert_eq!(serde_json::to_value(&claims).unwrap(), payload);
        assert_eq!(claims.iat(), Some(1_700_000_000));
        assert_eq!(claims.email(), Some("staff@dealer.example"));
    }

    #[test]
    fn test_decode_accepts_padded_and_standard_alphabet() {
        // {"a":">>>"} encodes with '+' in the standard alphabet and '-' in the URL-safe one
        let standard = "eyJhIjoiPj4+In0=";
        let url_safe = "eyJhIjoiPj4-In0";

        let a = decode(&format!("h.{}.s", standard)).unwrap();
        let b = decode(&format!("h.{}.s", url_safe)).unwrap();

        assert_eq!(a, b);
        assert_eq!(a.get("a"), Some(&json!(">>>")));
    }

    #[test]
    fn test_invalid_base64() {
        assert_matches!(decode_token("h.not*base64.s"), Err(TokenError::Decode(_)));
        // remainder of 1 cannot be repaired
        assert_matches!(decode_token("h.eyJhIjoxfQxyz.s"), Err(TokenError::Decode(_)));
    }

    #[test]
    fn test_invalid_json() {
        let not_json = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode("not json");
        assert_matches!(decode_token(&format!("h.{}.s", not_json)), Err(TokenError::Parse(_)));

        let array = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode("[1,2]");
        assert_matches!(decode_token(&format!("h.{}.s", array)), Err(TokenError::Parse(_)));

        assert_matches!(decode_token(".."), Err(TokenError::Parse(_)));
    }

    #[test]
    fn test_decode_is_idempotent() {
        let token = JwtTestUtils::create_unsigned_token(&json!({ "sub": "u1", "n": [1, 2, 3] }));

        assert_eq!(decode(&token), decode(&token));
    }

    #[test]
    fn test_is_expired() {
        let past = JwtTestUtils::create_unsigned_token(&json!({ "exp": 1 }));
        let future = JwtTestUtils::create_unsigned_token(&json!({ "exp": 9999999999i64 }));
        let no_exp = JwtTestUtils::create_unsigned_token(&json!({ "sub": "u1" }));

        assert!(is_expired(&past));
        assert!(!is_expired(&future));
        assert!(is_expired(&no_exp));
        assert!(is_expired("not-a-token"));
    }

    #[test]
    fn test_is_expired_at_fixed_clock() {
        let token = JwtTestUtils::create_unsigned_token(&json!({ "exp": 1_700_000_000i64 }));
        let before = Utc.timestamp_opt(1_699_999_999, 0).unwrap();
        let after = Utc.timestamp_opt(1_700_000_001, 0).unwrap();

        assert!(!is_expired_at(&token, before));
        assert!(is_expired_at(&token, after));
    }

    #[test]
    fn test_derive_role_known_tags() {
        let staff = JwtTestUtils::create_unsigned_token(&json!({ "role": "ROLE_EVMSTAFF" }));
        let admin = JwtTestUtils::create_unsigned_token(&json!({ "role": "ROLE_ADMIN" }));
        let user = JwtTestUtils::create_unsigned_token(&json!({ "role": "ROLE_USER" }));

        assert_eq!(
            derive_role(&staff),
            DerivedRole {
                role_id: Some(3),
                role_name: Some("ROLE_EVMSTAFF".to_string()),
                role: Some("ROLE_EVMSTAFF".to_string()),
            }
        );
        assert_eq!(derive_role(&admin).role_id, Some(2));
        assert_eq!(derive_role(&user).role_id, Some(1));
    }

    #[test]
    fn test_derive_role_unknown_and_missing() {
        let unknown = JwtTestUtils::create_unsigned_token(&json!({ "role": "ROLE_UNKNOWN" }));
        let missing = JwtTestUtils::create_unsigned_token(&json!({ "sub": "u1" }));

        let derived = derive_role(&unknown);
        assert_eq!(derived.role_id, None);
        assert_eq!(derived.role_name.as_deref(), Some("ROLE_UNKNOWN"));
        assert_eq!(derived.role.as_deref(), Some("ROLE_UNKNOWN"));

        assert_eq!(derive_role(&missing), DerivedRole::default());
        assert_eq!(derive_role("a.b"), DerivedRole::default());
    }
}
