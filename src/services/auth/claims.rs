use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, de};
use serde_json::{Map, Value};

use crate::services::auth::error::RejectReason;

/// Claims as they arrive from a provider, before normalization.
///
/// NOTE:
/// - `aud` may be a string or an array of strings, so it stays a `Value` here.
/// - tokeninfo-style endpoints send numbers and booleans as strings
///   (`"exp": "1700000000"`, `"email_verified": "true"`); both shapes are accepted.
#[derive(Debug, Clone, Deserialize)]
pub struct RawClaims {
    #[serde(default)]
    pub iss: String,
    #[serde(default)]
    pub sub: String,
    #[serde(default)]
    pub aud: Value,

    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub exp: Option<i64>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub iat: Option<i64>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub auth_time: Option<i64>,

    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub email_verified: bool,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub picture: Option<String>,

    #[serde(flatten)]
    pub custom: Map<String, Value>,
}

/// Provider-verified claims, in the shape the rest of the service uses.
///
/// Only ever built from a token a provider accepted.
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedClaims {
    pub subject: String,
    pub issuer: String,
    pub audience: Vec<String>,
    pub expires_at: DateTime<Utc>,
    pub issued_at: Option<DateTime<Utc>>,
    pub auth_time: Option<DateTime<Utc>>,

    pub email: Option<String>,
    pub email_verified: bool,
    pub name: Option<String>,
    pub picture: Option<String>,

    pub custom: Map<String, Value>,
}

impl VerifiedClaims {
    /// The principal id (`sub`).
    pub fn uid(&self) -> &str {
        &self.subject
    }

    pub fn has_audience(&self, audience: &str) -> bool {
        self.audience.iter().any(|a| a == audience)
    }
}

impl TryFrom<RawClaims> for VerifiedClaims {
    type Error = RejectReason;

    fn try_from(raw: RawClaims) -> Result<Self, Self::Error> {
        if raw.iss.trim().is_empty() {
            return Err(RejectReason::Claim("iss"));
        }
        if raw.sub.trim().is_empty() {
            return Err(RejectReason::Claim("sub"));
        }

        let audience = audiences(&raw.aud);
        if audience.is_empty() {
            return Err(RejectReason::Claim("aud"));
        }

        let expires_at = raw
            .exp
            .filter(|exp| *exp > 0)
            .and_then(|exp| DateTime::from_timestamp(exp, 0))
            .ok_or(RejectReason::Claim("exp"))?;

        Ok(Self {
            subject: raw.sub,
            issuer: raw.iss,
            audience,
            expires_at,
            issued_at: raw.iat.and_then(|t| DateTime::from_timestamp(t, 0)),
            auth_time: raw.auth_time.and_then(|t| DateTime::from_timestamp(t, 0)),
            email: raw.email,
            email_verified: raw.email_verified,
            name: raw.name,
            picture: raw.picture,
            custom: raw.custom,
        })
    }
}

fn audiences(aud: &Value) -> Vec<String> {
    match aud {
        Value::String(s) if !s.trim().is_empty() => vec![s.clone()],
        Value::Array(arr) => arr
            .iter()
            .filter_map(|v| v.as_str())
            .filter(|s| !s.trim().is_empty())
            .map(str::to_string)
            .collect(),
        // Missing claim ends up as Null due to #[serde(default)]
        _ => Vec::new(),
    }
}

fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .map(Some)
            .ok_or_else(|| de::Error::custom("timestamp out of range")),
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(|_| de::Error::custom("timestamp is not an integer")),
        other => Err(de::Error::custom(format!(
            "expected a numeric timestamp, got {other}"
        ))),
    }
}

fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(false),
        Value::Bool(b) => Ok(b),
        Value::String(s) => match s.as_str() {
            "true" => Ok(true),
            "false" => Ok(false),
            _ => Err(de::Error::custom("expected \"true\" or \"false\"")),
        },
        other => Err(de::Error::custom(format!("expected a boolean, got {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: Value) -> RawClaims {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn normalizes_jwt_shaped_claims() {
        let claims = VerifiedClaims::try_from(raw(json!({
            "iss": "https://securetoken.google.com/demo",
            "aud": "demo",
            "sub": "user-42",
            "exp": 1_900_000_000,
            "iat": 1_899_996_400,
            "email": "u@example.com",
            "email_verified": true,
            "firebase": { "sign_in_provider": "password" }
        })))
        .unwrap();

        assert_eq!(claims.uid(), "user-42");
        assert_eq!(claims.audience, vec!["demo".to_string()]);
        assert_eq!(claims.expires_at.timestamp(), 1_900_000_000);
        assert_eq!(claims.issued_at.map(|t| t.timestamp()), Some(1_899_996_400));
        assert!(claims.email_verified);
        assert!(claims.custom.contains_key("firebase"));
    }

    #[test]
    fn accepts_stringly_typed_tokeninfo_fields() {
        let claims = VerifiedClaims::try_from(raw(json!({
            "iss": "accounts.google.com",
            "aud": ["a", "", "b"],
            "sub": "1234",
            "exp": "1900000000",
            "email_verified": "true"
        })))
        .unwrap();

        assert_eq!(claims.audience, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(claims.expires_at.timestamp(), 1_900_000_000);
        assert!(claims.email_verified);
        assert!(claims.has_audience("b"));
    }

    #[test]
    fn rejects_empty_subject() {
        let err = VerifiedClaims::try_from(raw(json!({
            "iss": "issuer",
            "aud": "demo",
            "sub": "  ",
            "exp": 1_900_000_000
        })))
        .unwrap_err();

        assert_eq!(err, RejectReason::Claim("sub"));
    }

    #[test]
    fn rejects_missing_audience_and_expiry() {
        let no_aud = VerifiedClaims::try_from(raw(json!({
            "iss": "issuer",
            "sub": "user",
            "exp": 1_900_000_000
        })))
        .unwrap_err();
        assert_eq!(no_aud, RejectReason::Claim("aud"));

        let no_exp = VerifiedClaims::try_from(raw(json!({
            "iss": "issuer",
            "aud": "demo",
            "sub": "user"
        })))
        .unwrap_err();
        assert_eq!(no_exp, RejectReason::Claim("exp"));
    }
}
