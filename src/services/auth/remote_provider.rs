use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use url::Url;

use crate::services::auth::{
    claims::{RawClaims, VerifiedClaims},
    error::{ProviderInitError, RejectReason, VerifyError},
    provider::IdentityProvider,
};

/// Error body returned by tokeninfo-style endpoints on rejection.
///
/// e.g. `{"error": "invalid_token", "error_description": "Token expired"}`
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

/// ID-token verifier that asks an external verification endpoint.
///
/// Request: `GET <verify_url>?id_token=<token>`
///
/// Response handling:
/// - 2xx: body is the claim set
/// - 400 / 401 / 403: the provider rejected the token
/// - anything else, transport errors, timeouts: provider unavailable
#[derive(Debug, Clone)]
pub struct RemoteIdentityProvider {
    http: reqwest::Client,
    verify_url: Url,
    expected_audience: Option<String>,
}

impl RemoteIdentityProvider {
    /// `timeout` bounds every request made by the underlying client, so it also
    /// caps any longer limit passed to `TokenVerifier::verify_within`.
    pub fn new(
        verify_url: Url,
        expected_audience: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ProviderInitError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()?;

        Ok(Self::with_client(http, verify_url, expected_audience))
    }

    pub fn with_client(
        http: reqwest::Client,
        verify_url: Url,
        expected_audience: Option<String>,
    ) -> Self {
        Self {
            http,
            verify_url,
            expected_audience,
        }
    }
}

/// Turn a transport failure into `ProviderUnavailable`.
///
/// The request URL carries the token in its query string, so it is stripped
/// before the error is rendered.
fn transport_error(context: &str, e: reqwest::Error) -> VerifyError {
    if e.is_timeout() {
        VerifyError::unavailable("verification endpoint timed out")
    } else {
        VerifyError::unavailable(format!("{context}: {}", e.without_url()))
    }
}

/// Best-effort mapping from an endpoint's error body to a reject reason.
fn reason_from_body(body: &ErrorBody) -> RejectReason {
    let text = [body.error.as_deref(), body.error_description.as_deref()]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ")
        .to_ascii_lowercase();

    if text.contains("expired") {
        RejectReason::Expired
    } else if text.contains("revoked") {
        RejectReason::Revoked
    } else if text.contains("signature") {
        RejectReason::BadSignature
    } else if text.contains("audience") {
        RejectReason::Claim("aud")
    } else if text.contains("issuer") {
        RejectReason::Claim("iss")
    } else {
        RejectReason::Malformed
    }
}

#[async_trait]
impl IdentityProvider for RemoteIdentityProvider {
    fn name(&self) -> &'static str {
        "remote"
    }

    async fn verify_id_token(&self, token: &str) -> Result<VerifiedClaims, VerifyError> {
        let resp = self
            .http
            .get(self.verify_url.clone())
            .query(&[("id_token", token)])
            .send()
            .await
            .map_err(|e| transport_error("verification request failed", e))?;

        let status = resp.status();

        if matches!(
            status,
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
        ) {
            // A body we cannot parse still means "rejected".
            let body = resp.json::<ErrorBody>().await.unwrap_or_default();
            let reason = reason_from_body(&body);
            tracing::debug!(%status, ?body, %reason, "verification endpoint rejected token");
            return Err(VerifyError::rejected(reason));
        }

        if !status.is_success() {
            return Err(VerifyError::unavailable(format!(
                "verification endpoint returned {status}"
            )));
        }

        let raw = resp
            .json::<RawClaims>()
            .await
            .map_err(|e| transport_error("unreadable verification response", e))?;

        let claims = VerifiedClaims::try_from(raw).map_err(VerifyError::rejected)?;

        if let Some(expected) = self.expected_audience.as_deref()
            && !claims.has_audience(expected)
        {
            return Err(VerifyError::rejected(RejectReason::Claim("aud")));
        }

        Ok(claims)
    }
}
