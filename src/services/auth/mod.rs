pub mod claims;
pub mod error;
pub mod factory;
pub mod jwt_provider;
pub mod provider;
pub mod remote_provider;
pub mod token_verifier;

pub use claims::VerifiedClaims;
pub use error::{ProviderInitError, RejectReason, VerifyError};
pub use factory::build_token_verifier;
pub use provider::IdentityProvider;
pub use token_verifier::{TokenVerifier, strip_scheme};
