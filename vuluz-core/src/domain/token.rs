//! Bearer token inspection
//!
//! The backend issues JWTs. The client never verifies signatures; it only
//! reads the `exp` claim to drop sessions that can no longer work.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde_json::Value;

/// Expiry time from the token's `exp` claim, if it has one
pub fn token_expiry(token: &str) -> Option<DateTime<Utc>> {
    let payload = token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    let claims: Value = serde_json::from_slice(&bytes).ok()?;

    let exp = claims.get("exp")?;
    let seconds = exp.as_i64().or_else(|| exp.as_f64().map(|f| f as i64))?;
    DateTime::from_timestamp(seconds, 0)
}

/// True when the token has no readable expiry or it has passed
pub fn is_token_expired(token: &str, now: DateTime<Utc>) -> bool {
    token_expiry(token).map_or(true, |exp| exp <= now)
}

/// Build an unsigned JWT carrying `sub` and `exp`
///
/// Used by the in-memory backend, which issues tokens without a secret.
pub fn unsigned_token(subject: &str, expires_at: DateTime<Utc>) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
    let claims = serde_json::json!({
        "sub": subject,
        "exp": expires_at.timestamp(),
    });
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{}.{}.", header, payload)
}
