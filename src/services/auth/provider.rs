//! Identity provider interface: the external collaborator that actually decides
//! whether a token is valid.
use async_trait::async_trait;

use crate::services::auth::{claims::VerifiedClaims, error::VerifyError};

/// Verifies a raw ID token and returns the claims it carries.
///
/// Implementations must:
/// - return `VerifyError::InvalidCredential` for anything the provider rejects
/// - return `VerifyError::ProviderUnavailable` when the provider cannot be reached
/// - never produce claims for a token they did not accept
#[async_trait]
pub trait IdentityProvider: Send + Sync + 'static {
    // Provider name (for logging).
    fn name(&self) -> &'static str;

    async fn verify_id_token(&self, token: &str) -> Result<VerifiedClaims, VerifyError>;
}
