//! Bearer token payload decoding and expiry checks.
//!
//! Tokens are three dot-separated base64url segments. Only the payload is
//! read; the signature is never verified on the client.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

use crate::types::lenient_id;

/// Decoded token claims.
///
/// Claims of an unexpected type read as absent rather than failing the
/// decode: a numeric `userId` becomes its decimal string, and `exp` may be
/// fractional.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPayload {
    /// Subject user id
    #[serde(default, deserialize_with = "lenient_id")]
    pub user_id: Option<String>,
    /// Expiry in Unix seconds
    #[serde(default, deserialize_with = "numeric_date")]
    pub exp: Option<f64>,
    /// Remaining claims, kept verbatim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TokenPayload {
    /// `exp` in Unix milliseconds.
    pub fn expires_at_millis(&self) -> Option<i64> {
        self.exp.map(|exp| (exp * 1000.0) as i64)
    }
}

fn numeric_date<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    Ok(Value::deserialize(deserializer)?.as_f64())
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Decodes the payload segment of `token`.
///
/// Returns `None` for anything that is not three segments with a base64url
/// JSON object in the middle.
pub fn decode(token: &str) -> Option<TokenPayload> {
    let mut parts = token.split('.');
    let (Some(_header), Some(payload), Some(_signature), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return None;
    };

    // Some issuers emit padded or standard-alphabet segments.
    let normalized: String = payload
        .trim_end_matches('=')
        .chars()
        .map(|c| match c {
            '+' => '-',
            '/' => '_',
            other => other,
        })
        .collect();
    if normalized.is_empty() {
        return None;
    }

    let bytes = URL_SAFE_NO_PAD.decode(normalized).ok()?;
    let value: Value = serde_json::from_slice(&bytes).ok()?;
    if !value.is_object() {
        return None;
    }
    serde_json::from_value(value).ok()
}

/// Returns true if `token` is unusable at `now_ms`: undecodable, missing
/// `exp`, or `exp * 1000 <= now_ms`.
pub fn is_expired_at(token: &str, now_ms: i64) -> bool {
    match decode(token).and_then(|p| p.expires_at_millis()) {
        Some(expires_ms) => now_ms >= expires_ms,
        None => true,
    }
}

/// Returns true if `token` is expired against the local clock.
pub fn is_expired(token: &str) -> bool {
    is_expired_at(token, now_millis())
}

/// Returns a masked version of a token for display (first 12 chars + ...).
pub fn mask_token(token: &str) -> String {
    match token.char_indices().nth(12) {
        Some((idx, _)) if token.len() > 16 => format!("{}...", &token[..idx]),
        _ => "***".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use base64::engine::general_purpose::STANDARD;
    use serde_json::json;

    use super::*;

    fn make_token(payload: &Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let body = URL_SAFE_NO_PAD.encode(payload.to_string());
        format!("{header}.{body}.c2lnbmF0dXJl")
    }

    #[test]
    fn test_decode_reads_claims() {
        let token = make_token(&json!({"userId": "user-1", "exp": 1_700_000_000, "role": "admin"}));
        let payload = decode(&token).unwrap();
        assert_eq!(payload.user_id.as_deref(), Some("user-1"));
        assert_eq!(payload.exp, Some(1_700_000_000.0));
        assert_eq!(payload.expires_at_millis(), Some(1_700_000_000_000));
        assert_eq!(payload.extra.get("role"), Some(&json!("admin")));
    }

    /// Test: malformed tokens decode to `None` and count as expired.
    #[test]
    fn test_malformed_tokens_are_rejected() {
        let valid_body = URL_SAFE_NO_PAD.encode(r#"{"exp":9999999999}"#);
        let cases = [
            String::new(),
            "not-a-token".to_string(),
            format!("a.{valid_body}"),
            format!("a.{valid_body}.c.d"),
            "a..c".to_string(),
            "a.!!!.c".to_string(),
            format!("a.{}.c", URL_SAFE_NO_PAD.encode("not json")),
            format!("a.{}.c", URL_SAFE_NO_PAD.encode("[1,2,3]")),
        ];
        for token in &cases {
            assert!(decode(token).is_none(), "decoded {token:?}");
            assert!(is_expired(token), "not expired {token:?}");
        }
    }

    /// Test: padded standard base64 payloads (as produced by `btoa`) decode.
    #[test]
    fn test_decode_accepts_padded_standard_alphabet() {
        let body = STANDARD.encode(r#"{"userId":"u?>>","exp":4102444800}"#);
        assert!(body.ends_with('='));
        let token = format!("aGVhZA.{body}.c2ln");
        let payload = decode(&token).unwrap();
        assert_eq!(payload.user_id.as_deref(), Some("u?>>"));
    }

    #[test]
    fn test_expiry_compares_against_clock() {
        let now_ms = 1_700_000_000_000;
        let past = make_token(&json!({"userId": "u", "exp": 1_699_999_999}));
        let exact = make_token(&json!({"userId": "u", "exp": 1_700_000_000}));
        let future = make_token(&json!({"userId": "u", "exp": 1_700_000_060}));

        assert!(is_expired_at(&past, now_ms));
        assert!(is_expired_at(&exact, now_ms));
        assert!(!is_expired_at(&future, now_ms));
    }

    #[test]
    fn test_decode_accepts_numeric_user_id() {
        let token = make_token(&json!({"userId": 42, "exp": 4_102_444_800_i64}));
        let payload = decode(&token).unwrap();
        assert_eq!(payload.user_id.as_deref(), Some("42"));
        assert!(!is_expired(&token));
    }

    /// Test: NumericDate may carry a fraction of a second.
    #[test]
    fn test_fractional_exp() {
        let token = make_token(&json!({"userId": "u1", "exp": 4_102_444_800.5}));
        let payload = decode(&token).unwrap();
        assert_eq!(payload.expires_at_millis(), Some(4_102_444_800_500));
        assert!(!is_expired(&token));

        let now_ms = 1_700_000_000_000;
        let edge = make_token(&json!({"exp": 1_699_999_999.5}));
        assert!(is_expired_at(&edge, now_ms));
        assert!(!is_expired_at(&edge, now_ms - 600));
    }

    /// Test: claims of an unexpected type read as absent.
    #[test]
    fn test_odd_claim_types_read_as_absent() {
        let token = make_token(&json!({"userId": true, "exp": "soon", "role": null}));
        let payload = decode(&token).unwrap();
        assert!(payload.user_id.is_none());
        assert!(payload.exp.is_none());
        assert!(is_expired(&token));
    }

    #[test]
    fn test_missing_exp_is_expired() {
        let token = make_token(&json!({"userId": "u"}));
        assert!(decode(&token).is_some());
        assert!(is_expired(&token));
    }

    #[test]
    fn test_wall_clock_expiry() {
        let now_secs = chrono::Utc::now().timestamp();
        let past = make_token(&json!({"exp": now_secs - 60}));
        let future = make_token(&json!({"exp": now_secs + 900}));
        assert!(is_expired(&past));
        assert!(!is_expired(&future));
    }

    /// Test: Token masking.
    #[test]
    fn test_mask_token() {
        assert_eq!(mask_token("eyJhbGciOiJIUzI1NiJ9.payload"), "eyJhbGciOiJI...");
        assert_eq!(mask_token("short"), "***");
    }
}
