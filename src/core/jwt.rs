//! JWT Inspector
//!
//! Reads the `exp` claim from a token's payload segment. No signature check
//! and no network I/O: this only answers "is it worth sending".

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use chrono::Utc;
use serde::Deserialize;

/// Tokens are treated as expired this long before their `exp`.
pub const EXPIRY_BUFFER_MS: i64 = 60_000;

// base64url, tolerant of both padded and unpadded segments.
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

#[derive(Debug, Deserialize)]
struct ExpClaim {
    #[serde(default)]
    exp: Option<serde_json::Number>,
}

/// Current time in epoch milliseconds.
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Decode the payload segment of a three-part token as JSON.
pub fn decode_payload(token: &str) -> Option<serde_json::Value> {
    let mut parts = token.split('.');
    let (_header, payload, _signature) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }

    let bytes = URL_SAFE_LENIENT.decode(payload).ok()?;
    serde_json::from_slice(&bytes).ok()
}

/// Expiry of a JWT in epoch milliseconds, from its `exp` claim (seconds).
pub fn expires_at_ms(token: &str) -> Option<i64> {
    let claims: ExpClaim = serde_json::from_value(decode_payload(token)?).ok()?;
    let exp = claims.exp?;
    let secs = exp.as_i64().or_else(|| exp.as_f64().map(|f| f as i64))?;
    secs.checked_mul(1000)
}

/// Whether an expiry lies beyond now plus the 60-second buffer.
pub fn is_expiry_valid(expires_at_ms: i64, now_ms: i64) -> bool {
    now_ms < expires_at_ms - EXPIRY_BUFFER_MS
}

/// Local validity check: parseable `exp` more than 60 seconds away.
pub fn is_token_valid(token: &str) -> bool {
    expires_at_ms(token).is_some_and(|exp| is_expiry_valid(exp, now_ms()))
}
