/// Factory: build `TokenVerifier` from application `Config`.
use std::sync::Arc;

use crate::config::{Config, IdpConfig};
use crate::services::auth::{
    IdentityProvider, ProviderInitError, TokenVerifier, jwt_provider::JwtIdentityProvider,
    remote_provider::RemoteIdentityProvider,
};

pub fn build_token_verifier(config: &Config) -> Result<Arc<TokenVerifier>, ProviderInitError> {
    let provider: Arc<dyn IdentityProvider> = match &config.idp {
        IdpConfig::Jwt {
            algorithm,
            key,
            issuer,
            audience,
            leeway_seconds,
        } => Arc::new(JwtIdentityProvider::new(
            *algorithm,
            key,
            issuer,
            audience,
            *leeway_seconds,
        )?),
        IdpConfig::Remote {
            verify_url,
            expected_audience,
        } => Arc::new(RemoteIdentityProvider::new(
            verify_url.clone(),
            expected_audience.clone(),
            config.idp_timeout,
        )?),
    };

    tracing::info!(
        provider = provider.name(),
        timeout = ?config.idp_timeout,
        "token verifier ready"
    );

    let verifier = TokenVerifier::new(provider)
        .with_scheme_prefix(config.auth_scheme_prefix.clone())
        .with_timeout(config.idp_timeout);

    Ok(Arc::new(verifier))
}
