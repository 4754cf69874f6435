use async_trait::async_trait;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, errors::ErrorKind};

use crate::services::auth::{
    claims::{RawClaims, VerifiedClaims},
    error::{ProviderInitError, RejectReason, VerifyError},
    provider::IdentityProvider,
};

/// Key material for [`JwtIdentityProvider`].
#[derive(Clone)]
pub enum KeyMaterial {
    // Shared secret (HS256 / HS384 / HS512)
    Secret(Vec<u8>),
    // PEM-encoded public key (RSA / EC / Ed25519)
    PublicPem(String),
}

impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Secret(_) => f.write_str("Secret(..)"),
            Self::PublicPem(_) => f.write_str("PublicPem(..)"),
        }
    }
}

/// ID-token verifier backed by `jsonwebtoken` and statically configured key material.
///
/// `jsonwebtoken::Validation` checks:
/// - signature and algorithm
/// - `exp` / `nbf` (with leeway)
/// - `iss` and `aud` (because we set them)
/// - presence of `exp`, `iss`, `aud`, `sub`
///
/// Non-empty `iss` / `sub` / `aud` are enforced afterwards by the claims conversion.
#[derive(Clone)]
pub struct JwtIdentityProvider {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for JwtIdentityProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Do not print key material
        f.debug_struct("JwtIdentityProvider")
            .field("validation", &self.validation)
            .finish()
    }
}

impl JwtIdentityProvider {
    pub fn new(
        algorithm: Algorithm,
        key: &KeyMaterial,
        issuer: &str,
        audience: &str,
        leeway_seconds: u64,
    ) -> Result<Self, ProviderInitError> {
        let decoding_key = decoding_key(algorithm, key)?;

        let mut validation = Validation::new(algorithm);
        validation.set_issuer(&[issuer]);
        validation.set_audience(&[audience]);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);
        validation.validate_nbf = true;
        validation.leeway = leeway_seconds;

        Ok(Self {
            decoding_key,
            validation,
        })
    }
}

fn decoding_key(algorithm: Algorithm, key: &KeyMaterial) -> Result<DecodingKey, ProviderInitError> {
    let invalid = |detail: String| ProviderInitError::InvalidKey { algorithm, detail };

    match (algorithm, key) {
        (Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512, KeyMaterial::Secret(secret)) => {
            if secret.is_empty() {
                return Err(invalid("empty secret".into()));
            }
            Ok(DecodingKey::from_secret(secret))
        }
        (
            Algorithm::RS256
            | Algorithm::RS384
            | Algorithm::RS512
            | Algorithm::PS256
            | Algorithm::PS384
            | Algorithm::PS512,
            KeyMaterial::PublicPem(pem),
        ) => DecodingKey::from_rsa_pem(pem.as_bytes()).map_err(|e| invalid(e.to_string())),
        (Algorithm::ES256 | Algorithm::ES384, KeyMaterial::PublicPem(pem)) => {
            DecodingKey::from_ec_pem(pem.as_bytes()).map_err(|e| invalid(e.to_string()))
        }
        (Algorithm::EdDSA, KeyMaterial::PublicPem(pem)) => {
            DecodingKey::from_ed_pem(pem.as_bytes()).map_err(|e| invalid(e.to_string()))
        }
        _ => Err(invalid("key type does not match algorithm".into())),
    }
}

/// Map a `jsonwebtoken` failure onto the reason we report.
fn reject_reason(err: &jsonwebtoken::errors::Error) -> RejectReason {
    match err.kind() {
        ErrorKind::ExpiredSignature => RejectReason::Expired,
        ErrorKind::ImmatureSignature => RejectReason::NotYetValid,
        ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => RejectReason::BadSignature,
        ErrorKind::InvalidIssuer => RejectReason::Claim("iss"),
        ErrorKind::InvalidAudience => RejectReason::Claim("aud"),
        ErrorKind::InvalidSubject => RejectReason::Claim("sub"),
        ErrorKind::MissingRequiredClaim(name) => match name.as_str() {
            "exp" => RejectReason::Claim("exp"),
            "iss" => RejectReason::Claim("iss"),
            "aud" => RejectReason::Claim("aud"),
            "sub" => RejectReason::Claim("sub"),
            _ => RejectReason::Malformed,
        },
        _ => RejectReason::Malformed,
    }
}

#[async_trait]
impl IdentityProvider for JwtIdentityProvider {
    fn name(&self) -> &'static str {
        "jwt"
    }

    async fn verify_id_token(&self, token: &str) -> Result<VerifiedClaims, VerifyError> {
        let data = jsonwebtoken::decode::<RawClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| {
                tracing::debug!(error = %e, "jwt rejected");
                VerifyError::rejected(reject_reason(&e))
            })?;

        VerifiedClaims::try_from(data.claims).map_err(VerifyError::rejected)
    }
}
