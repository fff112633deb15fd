//! JWT payload handling
//!
//! Signatures are never verified client side; only the payload is decoded.

use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD, URL_SAFE_NO_PAD};
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Claims carried in the token payload
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Expiry, seconds since the epoch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
}

fn decode_segment(segment: &str) -> Option<Vec<u8>> {
    [URL_SAFE_NO_PAD, STANDARD, STANDARD_NO_PAD]
        .iter()
        .find_map(|engine| engine.decode(segment).ok())
}

/// Decode the payload segment, or `None` if it is not a readable JWT.
pub fn decode_claims(token: &str) -> Option<TokenClaims> {
    let payload = token.split('.').nth(1)?;
    let bytes = decode_segment(payload)?;
    serde_json::from_slice(&bytes).ok()
}

/// Undecodable tokens count as expired; tokens without `exp` never expire.
pub fn is_expired(token: &str, now: DateTime<Utc>) -> bool {
    match decode_claims(token) {
        Some(claims) => claims.exp.is_some_and(|exp| now.timestamp() >= exp),
        None => true,
    }
}

/// Build an unsigned token for `claims` with a placeholder signature.
pub fn encode_unsigned(claims: &TokenClaims, signature: &str) -> Result<String, serde_json::Error> {
    let header = serde_json::to_vec(&serde_json::json!({"alg": "HS256", "typ": "JWT"}))?;
    let payload = serde_json::to_vec(claims)?;
    Ok(format!(
        "{}.{}.{signature}",
        STANDARD.encode(header),
        STANDARD.encode(payload)
    ))
}
