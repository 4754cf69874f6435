use std::{sync::Arc, time::Duration};

use crate::services::auth::{
    claims::VerifiedClaims,
    error::{RejectReason, VerifyError},
    provider::IdentityProvider,
};

pub const DEFAULT_SCHEME_PREFIX: &str = "Bearer ";
pub const DEFAULT_VERIFY_TIMEOUT: Duration = Duration::from_secs(5);

/// Remove `prefix` from the start of `header`, once, if present.
///
/// Exact, case-sensitive match. Anything else passes through unchanged.
pub fn strip_scheme<'a>(header: &'a str, prefix: &str) -> &'a str {
    header.strip_prefix(prefix).unwrap_or(header)
}

/// Bearer-credential verifier.
///
/// Holds no mutable state: the provider handle and settings are fixed at
/// construction, so one instance is shared by all requests.
#[derive(Clone)]
pub struct TokenVerifier {
    provider: Arc<dyn IdentityProvider>,
    scheme_prefix: String,
    timeout: Duration,
}

impl std::fmt::Debug for TokenVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenVerifier")
            .field("provider", &self.provider.name())
            .field("scheme_prefix", &self.scheme_prefix)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl TokenVerifier {
    pub fn new(provider: Arc<dyn IdentityProvider>) -> Self {
        Self {
            provider,
            scheme_prefix: DEFAULT_SCHEME_PREFIX.to_string(),
            timeout: DEFAULT_VERIFY_TIMEOUT,
        }
    }

    pub fn with_scheme_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.scheme_prefix = prefix.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    /// Verify a raw credential (no scheme prefix) with the default timeout.
    pub async fn verify(&self, credential: &str) -> Result<VerifiedClaims, VerifyError> {
        self.verify_within(credential, self.timeout).await
    }

    /// Verify a raw credential, giving the provider at most `timeout`.
    ///
    /// On timeout the provider call is dropped (cancelled) and
    /// `ProviderUnavailable` is returned. Rejections are never retried.
    ///
    /// Providers may enforce their own, shorter limit (the remote provider's
    /// HTTP client is built with the configured `IDP_TIMEOUT_MS`).
    pub async fn verify_within(
        &self,
        credential: &str,
        timeout: Duration,
    ) -> Result<VerifiedClaims, VerifyError> {
        if credential.trim().is_empty() {
            return Err(VerifyError::rejected(RejectReason::Malformed));
        }

        let provider = self.provider.name();

        match tokio::time::timeout(timeout, self.provider.verify_id_token(credential)).await {
            Ok(Ok(claims)) => Ok(claims),
            Ok(Err(err)) => {
                tracing::debug!(provider, error = %err, "credential not verified");
                Err(err)
            }
            Err(_) => {
                tracing::warn!(provider, ?timeout, "identity provider timed out");
                Err(VerifyError::unavailable(format!(
                    "{provider} provider did not answer within {timeout:?}"
                )))
            }
        }
    }

    /// Strip the scheme prefix from an `Authorization` header value and verify the rest.
    pub async fn authenticate(&self, header: &str) -> Result<VerifiedClaims, VerifyError> {
        self.verify(strip_scheme(header, &self.scheme_prefix)).await
    }

    /// Header value in, principal id (`sub`) out.
    pub async fn extract_principal_id(&self, header: &str) -> Result<String, VerifyError> {
        let claims = self.authenticate(header).await?;
        Ok(claims.subject)
    }
}
