use std::fmt;

use thiserror::Error;

/// Why a credential was turned down.
///
/// Every variant means "this token will never verify"; none of them is
/// worth retrying.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    Expired,
    NotYetValid,
    Malformed,
    BadSignature,
    Revoked,
    // issuer / audience / subject mismatch or empty
    Claim(&'static str),
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Expired => write!(f, "token expired"),
            Self::NotYetValid => write!(f, "token not yet valid"),
            Self::Malformed => write!(f, "malformed token"),
            Self::BadSignature => write!(f, "signature mismatch"),
            Self::Revoked => write!(f, "token revoked"),
            Self::Claim(name) => write!(f, "missing or invalid '{}' claim", name),
        }
    }
}

/// Errors returned by token verification.
///
/// `InvalidCredential` covers every provider-side rejection. `ProviderUnavailable`
/// says nothing about the credential: the provider could not be asked.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerifyError {
    #[error("invalid credential: {0}")]
    InvalidCredential(RejectReason),

    #[error("identity provider unavailable: {0}")]
    ProviderUnavailable(String),
}

impl VerifyError {
    pub fn rejected(reason: RejectReason) -> Self {
        Self::InvalidCredential(reason)
    }

    pub fn unavailable(detail: impl Into<String>) -> Self {
        Self::ProviderUnavailable(detail.into())
    }

    pub fn is_invalid_credential(&self) -> bool {
        matches!(self, Self::InvalidCredential(_))
    }
}

/// Provider construction errors (bad key material, HTTP client setup).
#[derive(Debug, Error)]
pub enum ProviderInitError {
    #[error("invalid key material for {algorithm:?}: {detail}")]
    InvalidKey {
        algorithm: jsonwebtoken::Algorithm,
        detail: String,
    },

    #[error("failed to build http client: {0}")]
    HttpClient(#[from] reqwest::Error),
}
