//! Decoding of the claims carried in a compact JWT payload.
//!
//! The signature is never checked here: the server is the authority, the
//! client only reads roles, permissions and expiry for display and gating.

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use chrono::Utc;
use serde::{Deserialize, Deserializer};
use thiserror::Error;

/// Standard alphabet, accepting payloads with or without `=` padding.
const PAYLOAD_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

#[derive(Error, Debug)]
pub enum TokenError {
    #[error("token has no payload segment")]
    MissingPayload,

    #[error("payload is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("payload is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("payload is not a valid claims object: {0}")]
    Json(#[from] serde_json::Error),
}

/// Claims read from a token payload. `TokenClaims::default()` means "no claims".
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TokenClaims {
    /// Expiry as a unix timestamp in seconds. NumericDate may be fractional.
    #[serde(default)]
    pub exp: Option<f64>,
    #[serde(default)]
    pub iat: Option<f64>,
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(rename = "ROLES", default, deserialize_with = "null_as_empty")]
    pub roles: Vec<String>,
    #[serde(rename = "PERMISSIONS", default, deserialize_with = "null_as_empty")]
    pub permissions: Vec<String>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

impl TokenClaims {
    /// Decode the payload segment, reporting the step that failed.
    pub fn decode(token: &str) -> Result<Self, TokenError> {
        let payload = token.split('.').nth(1).ok_or(TokenError::MissingPayload)?;
        let standard = payload.replace('-', "+").replace('_', "/");
        let bytes = PAYLOAD_ENGINE.decode(standard)?;
        let text = String::from_utf8(bytes)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Decode the payload segment, falling back to no claims on any failure.
    pub fn decode_lenient(token: &str) -> Self {
        match Self::decode(token) {
            Ok(claims) => claims,
            Err(e) => {
                tracing::warn!(error = %e, "Could not decode token claims, using none");
                Self::default()
            }
        }
    }

    /// True when an expiry is present and lies strictly before `now` (unix seconds).
    /// An `exp` of zero counts as absent.
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.exp
            .filter(|exp| *exp != 0.0)
            .map(|exp| exp < now as f64)
            .unwrap_or(false)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now().timestamp())
    }

    /// Display role picked from the role list by fixed priority.
    pub fn primary_role(&self) -> String {
        primary_role(&self.roles)
    }
}

/// ADMIN, then TEACHER, then STUDENT; otherwise the first role lowercased,
/// or `user` when there are no roles at all.
pub fn primary_role(roles: &[String]) -> String {
    const PRIORITY: [(&str, &str); 3] = [("ADMIN", "admin"), ("TEACHER", "teacher"), ("STUDENT", "student")];

    for (claim, display) in PRIORITY {
        if roles.iter().any(|r| r == claim) {
            return display.to_string();
        }
    }

    roles
        .first()
        .filter(|r| !r.is_empty())
        .map(|r| r.to_lowercase())
        .unwrap_or_else(|| "user".to_string())
}
